use std::collections::BTreeMap;

use super::error::ModelError;
use super::tax::marginal_rates;
use super::types::{ComparisonInputs, TaxRules, Vehicle, VehicleComparison, VehicleOutcome};

/// Compares how far one net pound (scaled by `net_investment`) travels through
/// each savings vehicle, from take-home pay to spendable money in retirement.
pub fn compare_vehicles(
    rules: &TaxRules,
    inputs: &ComparisonInputs,
) -> Result<VehicleComparison, ModelError> {
    rules.validate()?;
    inputs.validate()?;

    let net = inputs.net_investment;
    let marginal = marginal_rates(rules, inputs.salary);
    let retirement_tax_rate = inputs.retirement_band.tax_rate(rules);
    let retention = marginal.retention();
    let retention_degenerate = retention <= 0.0;
    if retention_degenerate {
        tracing::warn!(
            salary = inputs.salary,
            combined_rate = marginal.combined(),
            "marginal deductions reach 100%, pre-tax vehicles reported as zero"
        );
    }

    let pension_payout = |pot: f64| {
        let tax_free = pot * rules.pension_tax_free_fraction;
        tax_free + (pot - tax_free) * (1.0 - retirement_tax_rate)
    };

    let sacrifice_pot = if retention_degenerate {
        0.0
    } else {
        net / retention
    };
    let match_ratio = if inputs.employee_pct > 0.0 {
        inputs.employer_pct / inputs.employee_pct
    } else {
        0.0
    };
    let relief_rate = marginal.tax_rate.max(rules.basic_rate);
    let relief_pot = if relief_rate < 1.0 {
        net / (1.0 - relief_rate)
    } else {
        0.0
    };

    let mut outcomes = BTreeMap::new();
    for vehicle in Vehicle::ALL {
        let (pot, net_withdrawal) = match vehicle {
            Vehicle::Isa => (net, net),
            Vehicle::Lisa => {
                let pot = net * (1.0 + inputs.lisa_bonus_rate);
                (pot, pot)
            }
            Vehicle::SalarySacrifice => (sacrifice_pot, pension_payout(sacrifice_pot)),
            Vehicle::EmployerMatch => {
                let pot = sacrifice_pot * (1.0 + match_ratio);
                (pot, pension_payout(pot))
            }
            Vehicle::ReliefAtSource => (relief_pot, pension_payout(relief_pot)),
        };
        outcomes.insert(
            vehicle,
            VehicleOutcome {
                vehicle,
                pot,
                net_withdrawal,
                uplift: (net_withdrawal - net) / net,
            },
        );
    }

    let best = best_vehicle(&outcomes);
    tracing::debug!(salary = inputs.salary, best = %best, "vehicle comparison complete");

    Ok(VehicleComparison {
        salary: inputs.salary,
        retirement_band: inputs.retirement_band,
        retirement_tax_rate,
        net_investment: net,
        marginal,
        retention_degenerate,
        outcomes,
        best,
    })
}

/// First vehicle in ranking order with the highest net withdrawal.
fn best_vehicle(outcomes: &BTreeMap<Vehicle, VehicleOutcome>) -> Vehicle {
    let mut best = Vehicle::ALL[0];
    let mut best_value = f64::NEG_INFINITY;
    for vehicle in Vehicle::ALL {
        let Some(outcome) = outcomes.get(&vehicle) else {
            continue;
        };
        if outcome.net_withdrawal > best_value {
            best = vehicle;
            best_value = outcome.net_withdrawal;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RetirementBand;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-2;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn withdrawal(comparison: &VehicleComparison, vehicle: Vehicle) -> f64 {
        comparison
            .outcome(vehicle)
            .map(|o| o.net_withdrawal)
            .expect("every vehicle is reported")
    }

    #[test]
    fn oracle_higher_rate_saver_with_employer_match() {
        let rules = TaxRules::default();
        let inputs = ComparisonInputs::new(55_000.0, RetirementBand::Basic, 5.0, 3.0);
        let c = compare_vehicles(&rules, &inputs).expect("valid inputs");

        assert_approx(c.marginal.tax_rate, 0.40);
        assert_approx(c.marginal.insurance_rate, 0.02);
        assert!(!c.retention_degenerate);

        assert_approx(withdrawal(&c, Vehicle::Isa), 1_000.0);
        assert_approx(withdrawal(&c, Vehicle::Lisa), 1_250.0);

        let sacrifice = c.outcome(Vehicle::SalarySacrifice).expect("reported");
        assert_approx(sacrifice.pot, 1_724.14);
        assert_approx(sacrifice.net_withdrawal, 1_465.52);

        let matched = c.outcome(Vehicle::EmployerMatch).expect("reported");
        assert_approx(matched.pot, 2_758.62);
        assert_approx(matched.net_withdrawal, 2_344.83);
        assert_approx(matched.uplift, 1.3448);

        let sipp = c.outcome(Vehicle::ReliefAtSource).expect("reported");
        assert_approx(sipp.pot, 1_666.67);
        assert_approx(sipp.net_withdrawal, 1_416.67);

        assert_eq!(c.best, Vehicle::EmployerMatch);
        assert_eq!(c.ranked()[0].vehicle, Vehicle::EmployerMatch);
    }

    #[test]
    fn lisa_pays_exact_bonus_for_every_salary_and_band() {
        let rules = TaxRules::default();
        for band in [
            RetirementBand::Zero,
            RetirementBand::Basic,
            RetirementBand::Higher,
            RetirementBand::Additional,
        ] {
            for salary in [0.0, 25_000.0, 110_000.0, 200_000.0] {
                let inputs = ComparisonInputs::new(salary, band, 5.0, 5.0);
                let c = compare_vehicles(&rules, &inputs).expect("valid inputs");
                assert_eq!(withdrawal(&c, Vehicle::Lisa), 1_250.0);
                assert_eq!(withdrawal(&c, Vehicle::Isa), 1_000.0);
            }
        }
    }

    #[test]
    fn sipp_grosses_up_at_basic_rate_for_non_taxpayers() {
        let rules = TaxRules::default();
        let inputs = ComparisonInputs::new(10_000.0, RetirementBand::Zero, 0.0, 0.0);
        let c = compare_vehicles(&rules, &inputs).expect("valid inputs");

        let sipp = c.outcome(Vehicle::ReliefAtSource).expect("reported");
        assert_approx(sipp.pot, 1_250.0);
        assert_approx(sipp.net_withdrawal, 1_250.0);
    }

    #[test]
    fn zero_employee_share_gives_no_match_uplift() {
        let rules = TaxRules::default();
        let inputs = ComparisonInputs::new(40_000.0, RetirementBand::Basic, 0.0, 5.0);
        let c = compare_vehicles(&rules, &inputs).expect("valid inputs");

        assert_eq!(
            withdrawal(&c, Vehicle::EmployerMatch),
            withdrawal(&c, Vehicle::SalarySacrifice)
        );
    }

    #[test]
    fn ties_resolve_to_earlier_vehicle() {
        let rules = TaxRules::default();
        let mut inputs = ComparisonInputs::new(0.0, RetirementBand::Additional, 0.0, 0.0);
        inputs.lisa_bonus_rate = 0.0;
        let c = compare_vehicles(&rules, &inputs).expect("valid inputs");

        assert_eq!(withdrawal(&c, Vehicle::Isa), withdrawal(&c, Vehicle::Lisa));
        assert_eq!(c.best, Vehicle::Isa);
        assert_eq!(c.ranked()[1].vehicle, Vehicle::Lisa);
    }

    #[test]
    fn full_marginal_deduction_is_flagged_not_divided_by_zero() {
        let rules = TaxRules {
            higher_rate: 1.0,
            ..TaxRules::default()
        };
        let inputs = ComparisonInputs::new(60_000.0, RetirementBand::Basic, 5.0, 5.0);
        let c = compare_vehicles(&rules, &inputs).expect("valid inputs");

        assert!(c.retention_degenerate);
        for vehicle in [
            Vehicle::SalarySacrifice,
            Vehicle::EmployerMatch,
            Vehicle::ReliefAtSource,
        ] {
            let outcome = c.outcome(vehicle).expect("reported");
            assert_eq!(outcome.pot, 0.0);
            assert_eq!(outcome.net_withdrawal, 0.0);
        }
        assert_eq!(c.best, Vehicle::Lisa);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let rules = TaxRules::default();
        let mut inputs = ComparisonInputs::new(-1.0, RetirementBand::Basic, 5.0, 5.0);
        assert!(matches!(
            compare_vehicles(&rules, &inputs),
            Err(ModelError::InvalidParameter { field: "salary", .. })
        ));

        inputs.salary = 30_000.0;
        inputs.net_investment = 0.0;
        assert!(matches!(
            compare_vehicles(&rules, &inputs),
            Err(ModelError::InvalidParameter {
                field: "net_investment",
                ..
            })
        ));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_comparison_is_deterministic_and_best_is_maximal(
            salary in 0u32..300_000,
            employee in 0u32..20,
            employer in 0u32..20,
            band in 0u8..4
        ) {
            let band = match band {
                0 => RetirementBand::Zero,
                1 => RetirementBand::Basic,
                2 => RetirementBand::Higher,
                _ => RetirementBand::Additional,
            };
            let rules = TaxRules::default();
            let inputs = ComparisonInputs::new(salary as f64, band, employee as f64, employer as f64);
            let a = compare_vehicles(&rules, &inputs).expect("valid inputs");
            let b = compare_vehicles(&rules, &inputs).expect("valid inputs");
            prop_assert_eq!(&a, &b);

            let best = withdrawal(&a, a.best);
            for outcome in a.outcomes.values() {
                prop_assert!(outcome.net_withdrawal <= best);
                prop_assert!(outcome.pot >= 0.0);
            }
        }
    }
}

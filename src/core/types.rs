use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::{ModelError, ensure_amount, ensure_rate, ensure_unit_rate};

/// Fixed snapshot of the UK income tax, National Insurance and student loan rules.
///
/// Every threshold is an annual amount in today's money; every rate is a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRules {
    pub personal_allowance: f64,
    pub basic_rate_limit: f64,
    pub basic_rate: f64,
    pub higher_rate: f64,
    pub additional_rate: f64,
    pub allowance_taper_start: f64,
    pub additional_rate_threshold: f64,
    /// Marginal rate applied across the allowance taper band. Held as a constant
    /// rather than derived from `higher_rate` and the £1-per-£2 taper.
    pub taper_band_rate: f64,
    pub ni_lower_threshold: f64,
    pub ni_upper_threshold: f64,
    pub ni_main_rate: f64,
    pub ni_upper_rate: f64,
    pub student_loan_threshold: f64,
    pub student_loan_rate: f64,
    pub pension_tax_free_fraction: f64,
}

impl Default for TaxRules {
    fn default() -> Self {
        Self::uk_2024_25()
    }
}

impl TaxRules {
    pub fn uk_2024_25() -> Self {
        Self {
            personal_allowance: 12_570.0,
            basic_rate_limit: 50_270.0,
            basic_rate: 0.20,
            higher_rate: 0.40,
            additional_rate: 0.45,
            allowance_taper_start: 100_000.0,
            additional_rate_threshold: 125_140.0,
            taper_band_rate: 0.60,
            ni_lower_threshold: 12_570.0,
            ni_upper_threshold: 50_270.0,
            ni_main_rate: 0.08,
            ni_upper_rate: 0.02,
            student_loan_threshold: 28_470.0,
            student_loan_rate: 0.09,
            pension_tax_free_fraction: 0.25,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        for (field, value) in [
            ("personal_allowance", self.personal_allowance),
            ("basic_rate_limit", self.basic_rate_limit),
            ("allowance_taper_start", self.allowance_taper_start),
            ("additional_rate_threshold", self.additional_rate_threshold),
            ("ni_lower_threshold", self.ni_lower_threshold),
            ("ni_upper_threshold", self.ni_upper_threshold),
            ("student_loan_threshold", self.student_loan_threshold),
        ] {
            ensure_amount(field, value)?;
        }

        for (field, value) in [
            ("basic_rate", self.basic_rate),
            ("higher_rate", self.higher_rate),
            ("additional_rate", self.additional_rate),
            ("taper_band_rate", self.taper_band_rate),
            ("ni_main_rate", self.ni_main_rate),
            ("ni_upper_rate", self.ni_upper_rate),
            ("student_loan_rate", self.student_loan_rate),
            ("pension_tax_free_fraction", self.pension_tax_free_fraction),
        ] {
            ensure_unit_rate(field, value)?;
        }

        if self.basic_rate_limit < self.personal_allowance {
            return Err(ModelError::invalid(
                "basic_rate_limit",
                "must be >= personal_allowance",
            ));
        }
        if self.allowance_taper_start < self.basic_rate_limit {
            return Err(ModelError::invalid(
                "allowance_taper_start",
                "must be >= basic_rate_limit",
            ));
        }
        if self.additional_rate_threshold < self.allowance_taper_start {
            return Err(ModelError::invalid(
                "additional_rate_threshold",
                "must be >= allowance_taper_start",
            ));
        }
        if self.ni_upper_threshold < self.ni_lower_threshold {
            return Err(ModelError::invalid(
                "ni_upper_threshold",
                "must be >= ni_lower_threshold",
            ));
        }
        Ok(())
    }
}

/// Everything taken out of one gross salary, so a caller can print a receipt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionBreakdown {
    pub gross: f64,
    pub pension_sacrifice: f64,
    pub taxable: f64,
    pub income_tax: f64,
    pub national_insurance: f64,
    pub student_loan: f64,
    pub net: f64,
}

impl DeductionBreakdown {
    pub fn total_deductions(&self) -> f64 {
        self.pension_sacrifice + self.income_tax + self.national_insurance + self.student_loan
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginalRates {
    pub tax_rate: f64,
    pub insurance_rate: f64,
}

impl MarginalRates {
    pub fn combined(self) -> f64 {
        self.tax_rate + self.insurance_rate
    }

    /// Share of the next pound that reaches take-home pay.
    pub fn retention(self) -> f64 {
        1.0 - self.combined()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockedContributionPolicy {
    /// Pay a fixed share of net pay, capped, every accumulating year before purchase.
    FractionOfNet,
    /// Pay only what is still needed to reach this year's deposit.
    DepositTarget,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawdownCeiling {
    /// An account can give up to its whole growth-adjusted balance.
    GrownBalance,
    /// An account can give up only this year's growth.
    GrowthOnly,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Accumulating,
    Drawing,
}

/// Longest projection horizon accepted, in years.
pub const MAX_PROJECTION_YEARS: u32 = 150;
/// Oldest age a projection may reach.
pub const MAX_AGE: u32 = 150;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionParameters {
    pub base_salary: f64,
    pub years: u32,
    pub start_age: u32,
    pub salary_growth_rate: f64,
    pub inflation_rate: f64,

    pub pension_start: f64,
    pub isa_start: f64,
    pub lisa_start: f64,
    pub cash_start: f64,
    pub pension_growth_rate: f64,
    pub isa_growth_rate: f64,
    pub lisa_growth_rate: f64,
    pub cash_growth_rate: f64,

    pub employee_pension_rate: f64,
    pub employer_pension_rate: f64,
    pub isa_contribution_rate: f64,
    pub lisa_contribution_rate: f64,
    pub lisa_contribution_cap: f64,
    /// Fixed monthly LISA payment; 0 falls back to `lisa_contribution_rate` of net pay.
    pub lisa_monthly_amount: f64,
    pub lisa_bonus_rate: f64,
    pub lisa_policy: LockedContributionPolicy,

    pub property_price_start: f64,
    pub deposit_rate: f64,
    pub house_price_growth: f64,
    pub mortgage_rate: f64,
    pub mortgage_term_years: u32,

    pub retirement_age: u32,
    pub retirement_income: f64,
    pub state_pension_age: u32,
    pub state_pension_amount: f64,
    pub pension_access_age: u32,
    pub lisa_access_age: u32,
    pub drawdown_ceiling: DrawdownCeiling,

    pub tax_rules: TaxRules,
}

impl Default for ProjectionParameters {
    fn default() -> Self {
        Self {
            base_salary: 32_000.0,
            years: 40,
            start_age: 22,
            salary_growth_rate: 0.06,
            inflation_rate: 0.03,
            pension_start: 2_000.0,
            isa_start: 20_000.0,
            lisa_start: 0.0,
            cash_start: 11_000.0,
            pension_growth_rate: 0.08,
            isa_growth_rate: 0.11,
            lisa_growth_rate: 0.07,
            cash_growth_rate: 0.045,
            employee_pension_rate: 0.05,
            employer_pension_rate: 0.10,
            isa_contribution_rate: 0.15,
            lisa_contribution_rate: 0.20,
            lisa_contribution_cap: 4_000.0,
            lisa_monthly_amount: 0.0,
            lisa_bonus_rate: 0.25,
            lisa_policy: LockedContributionPolicy::FractionOfNet,
            property_price_start: 170_000.0,
            deposit_rate: 0.10,
            house_price_growth: 0.05,
            mortgage_rate: 0.045,
            mortgage_term_years: 30,
            retirement_age: 60,
            retirement_income: 25_000.0,
            state_pension_age: 67,
            state_pension_amount: 12_000.0,
            pension_access_age: 57,
            lisa_access_age: 60,
            drawdown_ceiling: DrawdownCeiling::GrowthOnly,
            tax_rules: TaxRules::default(),
        }
    }
}

impl ProjectionParameters {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.years == 0 {
            return Err(ModelError::invalid("years", "must be > 0"));
        }
        if self.years > MAX_PROJECTION_YEARS {
            return Err(ModelError::invalid(
                "years",
                format!("must be <= {MAX_PROJECTION_YEARS}"),
            ));
        }
        match self.start_age.checked_add(self.years) {
            Some(end_age) if end_age <= MAX_AGE => {}
            _ => {
                return Err(ModelError::invalid(
                    "start_age",
                    format!("start age plus years must not exceed {MAX_AGE}"),
                ));
            }
        }
        if self.mortgage_term_years == 0 {
            return Err(ModelError::invalid("mortgage_term_years", "must be > 0"));
        }

        for (field, value) in [
            ("base_salary", self.base_salary),
            ("pension_start", self.pension_start),
            ("isa_start", self.isa_start),
            ("lisa_start", self.lisa_start),
            ("cash_start", self.cash_start),
            ("lisa_contribution_cap", self.lisa_contribution_cap),
            ("lisa_monthly_amount", self.lisa_monthly_amount),
            ("property_price_start", self.property_price_start),
            ("retirement_income", self.retirement_income),
            ("state_pension_amount", self.state_pension_amount),
        ] {
            ensure_amount(field, value)?;
        }

        for (field, value) in [
            ("salary_growth_rate", self.salary_growth_rate),
            ("inflation_rate", self.inflation_rate),
            ("pension_growth_rate", self.pension_growth_rate),
            ("isa_growth_rate", self.isa_growth_rate),
            ("lisa_growth_rate", self.lisa_growth_rate),
            ("cash_growth_rate", self.cash_growth_rate),
            ("lisa_bonus_rate", self.lisa_bonus_rate),
            ("house_price_growth", self.house_price_growth),
            ("mortgage_rate", self.mortgage_rate),
        ] {
            ensure_rate(field, value)?;
        }

        for (field, value) in [
            ("employee_pension_rate", self.employee_pension_rate),
            ("employer_pension_rate", self.employer_pension_rate),
            ("isa_contribution_rate", self.isa_contribution_rate),
            ("lisa_contribution_rate", self.lisa_contribution_rate),
            ("deposit_rate", self.deposit_rate),
        ] {
            ensure_unit_rate(field, value)?;
        }

        if self.isa_contribution_rate + self.lisa_contribution_rate > 1.0 {
            return Err(ModelError::invalid(
                "lisa_contribution_rate",
                "ISA and LISA shares of net pay cannot exceed 100% together",
            ));
        }

        self.tax_rules.validate()
    }

    pub fn age_at(&self, year: u32) -> u32 {
        self.start_age.saturating_add(year)
    }

    pub fn phase_at_age(&self, age: u32) -> Phase {
        if age >= self.retirement_age {
            Phase::Drawing
        } else {
            Phase::Accumulating
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionFlow {
    pub pension: f64,
    pub isa: f64,
    pub lisa: f64,
    pub lisa_bonus: f64,
}

impl ContributionFlow {
    pub fn total(self) -> f64 {
        self.pension + self.isa + self.lisa + self.lisa_bonus
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalFlow {
    pub pension: f64,
    pub isa: f64,
    pub lisa: f64,
    pub cash: f64,
}

impl WithdrawalFlow {
    pub fn total(self) -> f64 {
        self.pension + self.isa + self.lisa + self.cash
    }
}

/// One simulated year. Index 0 is the starting position before any growth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyState {
    pub year: u32,
    pub age: u32,
    pub phase: Phase,
    pub nominal_salary: f64,
    pub real_salary: f64,
    pub net_pay: f64,
    pub pension: f64,
    pub isa: f64,
    pub lisa: f64,
    pub cash: f64,
    pub home_equity: f64,
    pub property_value: f64,
    pub mortgage_balance: f64,
    pub contributions: ContributionFlow,
    pub withdrawals: WithdrawalFlow,
    pub required_income: f64,
    pub income_drawn: f64,
    pub shortfall: f64,
}

impl YearlyState {
    pub fn net_worth(&self) -> f64 {
        self.pension + self.isa + self.lisa + self.cash + self.home_equity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    pub year: u32,
    pub age: u32,
    pub price: f64,
    pub deposit: f64,
    pub initial_mortgage: f64,
    pub annual_repayment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub years: Vec<YearlyState>,
    pub purchase: Option<PurchaseEvent>,
}

impl ProjectionResult {
    pub fn total_shortfall(&self) -> f64 {
        self.years.iter().map(|y| y.shortfall).sum()
    }

    pub fn shortfall_years(&self) -> Vec<u32> {
        self.years
            .iter()
            .filter(|y| y.shortfall > 0.0)
            .map(|y| y.year)
            .collect()
    }

    pub fn year_at_age(&self, age: u32) -> Option<&YearlyState> {
        self.years.iter().find(|y| y.age == age)
    }

    pub fn final_net_worth(&self) -> f64 {
        self.years.last().map(YearlyState::net_worth).unwrap_or(0.0)
    }
}

/// Income tax band expected to apply to pension withdrawals in retirement.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetirementBand {
    Zero,
    Basic,
    Higher,
    Additional,
}

impl RetirementBand {
    pub fn tax_rate(self, rules: &TaxRules) -> f64 {
        match self {
            RetirementBand::Zero => 0.0,
            RetirementBand::Basic => rules.basic_rate,
            RetirementBand::Higher => rules.higher_rate,
            RetirementBand::Additional => rules.additional_rate,
        }
    }
}

impl FromStr for RetirementBand {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "none" => Ok(RetirementBand::Zero),
            "basic" => Ok(RetirementBand::Basic),
            "higher" => Ok(RetirementBand::Higher),
            "additional" => Ok(RetirementBand::Additional),
            _ => Err(ModelError::UnknownRetirementBand(s.to_string())),
        }
    }
}

/// Savings vehicles in ranking order; ties go to the earlier variant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Vehicle {
    Isa,
    Lisa,
    SalarySacrifice,
    EmployerMatch,
    ReliefAtSource,
}

impl Vehicle {
    pub const ALL: [Vehicle; 5] = [
        Vehicle::Isa,
        Vehicle::Lisa,
        Vehicle::SalarySacrifice,
        Vehicle::EmployerMatch,
        Vehicle::ReliefAtSource,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Vehicle::Isa => "ISA",
            Vehicle::Lisa => "LISA",
            Vehicle::SalarySacrifice => "Pension (Sal. Sac.)",
            Vehicle::EmployerMatch => "Workplace (Matched)",
            Vehicle::ReliefAtSource => "Pension (SIPP)",
        }
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonInputs {
    pub salary: f64,
    pub retirement_band: RetirementBand,
    pub employee_pct: f64,
    pub employer_pct: f64,
    pub net_investment: f64,
    pub lisa_bonus_rate: f64,
}

impl ComparisonInputs {
    pub fn new(
        salary: f64,
        retirement_band: RetirementBand,
        employee_pct: f64,
        employer_pct: f64,
    ) -> Self {
        Self {
            salary,
            retirement_band,
            employee_pct,
            employer_pct,
            net_investment: 1_000.0,
            lisa_bonus_rate: 0.25,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        ensure_amount("salary", self.salary)?;
        ensure_amount("employee_pct", self.employee_pct)?;
        ensure_amount("employer_pct", self.employer_pct)?;
        ensure_rate("lisa_bonus_rate", self.lisa_bonus_rate)?;
        if !self.net_investment.is_finite() || self.net_investment <= 0.0 {
            return Err(ModelError::invalid("net_investment", "must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleOutcome {
    pub vehicle: Vehicle,
    pub pot: f64,
    pub net_withdrawal: f64,
    pub uplift: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleComparison {
    pub salary: f64,
    pub retirement_band: RetirementBand,
    pub retirement_tax_rate: f64,
    pub net_investment: f64,
    pub marginal: MarginalRates,
    /// Set when tax plus insurance at the margin reaches 100%; salary sacrifice
    /// and matched pots are then reported as zero.
    pub retention_degenerate: bool,
    pub outcomes: BTreeMap<Vehicle, VehicleOutcome>,
    pub best: Vehicle,
}

impl VehicleComparison {
    pub fn outcome(&self, vehicle: Vehicle) -> Option<&VehicleOutcome> {
        self.outcomes.get(&vehicle)
    }

    pub fn ranked(&self) -> Vec<VehicleOutcome> {
        let mut ranked: Vec<VehicleOutcome> = self.outcomes.values().copied().collect();
        ranked.sort_by(|a, b| {
            b.net_withdrawal
                .total_cmp(&a.net_withdrawal)
                .then(a.vehicle.cmp(&b.vehicle))
        });
        ranked
    }
}

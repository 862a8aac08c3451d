use super::types::{DeductionBreakdown, MarginalRates, TaxRules};

/// Take-home pay for one gross salary after salary-sacrifice pension, income tax,
/// National Insurance and student loan repayment.
///
/// The sacrifice rate is held to `[0, 1]`, so at most the whole salary is given up.
/// Tax, NI and loan all use the post-sacrifice income as their base. Each band
/// is summed segment by segment, so totals are continuous at every threshold.
pub fn net_pay(rules: &TaxRules, gross: f64, pension_sacrifice_rate: f64) -> DeductionBreakdown {
    let gross = gross.max(0.0);
    let pension_sacrifice = pension_sacrifice_rate.max(0.0).min(1.0) * gross;
    let taxable = (gross - pension_sacrifice).max(0.0);

    let income_tax = income_tax(rules, taxable);
    let national_insurance = national_insurance(rules, taxable);
    let student_loan =
        ((taxable - rules.student_loan_threshold) * rules.student_loan_rate).max(0.0);

    DeductionBreakdown {
        gross,
        pension_sacrifice,
        taxable,
        income_tax,
        national_insurance,
        student_loan,
        net: gross - pension_sacrifice - income_tax - national_insurance - student_loan,
    }
}

fn income_tax(rules: &TaxRules, taxable: f64) -> f64 {
    let basic_band_width = (rules.basic_rate_limit - rules.personal_allowance).max(0.0);
    let basic_taxable = (taxable - rules.personal_allowance).clamp(0.0, basic_band_width);
    let higher_taxable = (taxable - rules.basic_rate_limit).max(0.0);

    basic_taxable * rules.basic_rate + higher_taxable * rules.higher_rate
}

fn national_insurance(rules: &TaxRules, taxable: f64) -> f64 {
    let main_band_width = (rules.ni_upper_threshold - rules.ni_lower_threshold).max(0.0);
    let main_band = (taxable - rules.ni_lower_threshold).clamp(0.0, main_band_width);
    let upper_band = (taxable - rules.ni_upper_threshold).max(0.0);

    main_band * rules.ni_main_rate + upper_band * rules.ni_upper_rate
}

/// Income tax and NI rates on the next pound earned at `gross_salary`.
pub fn marginal_rates(rules: &TaxRules, gross_salary: f64) -> MarginalRates {
    let gross = gross_salary.max(0.0);

    let tax_rate = if gross < rules.personal_allowance {
        0.0
    } else if gross < rules.basic_rate_limit {
        rules.basic_rate
    } else if gross < rules.allowance_taper_start {
        rules.higher_rate
    } else if gross < rules.additional_rate_threshold {
        rules.taper_band_rate
    } else {
        rules.additional_rate
    };

    let insurance_rate = if gross < rules.ni_lower_threshold {
        0.0
    } else if gross < rules.ni_upper_threshold {
        rules.ni_main_rate
    } else {
        rules.ni_upper_rate
    };

    MarginalRates {
        tax_rate,
        insurance_rate,
    }
}

use clap::{Args, ValueEnum};

use crate::core::{
    BudgetSplit, ComparisonInputs, DrawdownCeiling, LockedContributionPolicy, ModelError,
    PayReceipt, ProjectionParameters, RetirementBand, TaxRules, net_pay, receipt_for_age,
    run_projection,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliLisaPolicy {
    FractionOfNet,
    DepositTarget,
}

impl From<CliLisaPolicy> for LockedContributionPolicy {
    fn from(value: CliLisaPolicy) -> Self {
        match value {
            CliLisaPolicy::FractionOfNet => LockedContributionPolicy::FractionOfNet,
            CliLisaPolicy::DepositTarget => LockedContributionPolicy::DepositTarget,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliDrawdownCeiling {
    GrowthOnly,
    GrownBalance,
}

impl From<CliDrawdownCeiling> for DrawdownCeiling {
    fn from(value: CliDrawdownCeiling) -> Self {
        match value {
            CliDrawdownCeiling::GrowthOnly => DrawdownCeiling::GrowthOnly,
            CliDrawdownCeiling::GrownBalance => DrawdownCeiling::GrownBalance,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliRetirementBand {
    Zero,
    Basic,
    Higher,
    Additional,
}

impl From<CliRetirementBand> for RetirementBand {
    fn from(value: CliRetirementBand) -> Self {
        match value {
            CliRetirementBand::Zero => RetirementBand::Zero,
            CliRetirementBand::Basic => RetirementBand::Basic,
            CliRetirementBand::Higher => RetirementBand::Higher,
            CliRetirementBand::Additional => RetirementBand::Additional,
        }
    }
}

/// Rule constants. Thresholds in pounds, rates in percent.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct TaxArgs {
    #[arg(long, default_value_t = 12_570.0)]
    pub uk_personal_allowance: f64,
    #[arg(long, default_value_t = 50_270.0)]
    pub uk_basic_rate_limit: f64,
    #[arg(long, default_value_t = 20.0)]
    pub uk_basic_rate: f64,
    #[arg(long, default_value_t = 40.0)]
    pub uk_higher_rate: f64,
    #[arg(long, default_value_t = 45.0)]
    pub uk_additional_rate: f64,
    #[arg(long, default_value_t = 100_000.0)]
    pub uk_allowance_taper_start: f64,
    #[arg(long, default_value_t = 125_140.0)]
    pub uk_additional_rate_threshold: f64,
    #[arg(
        long,
        default_value_t = 60.0,
        help = "Effective marginal tax rate while the personal allowance is withdrawn"
    )]
    pub uk_taper_band_rate: f64,
    #[arg(long, default_value_t = 12_570.0)]
    pub ni_lower_threshold: f64,
    #[arg(long, default_value_t = 50_270.0)]
    pub ni_upper_threshold: f64,
    #[arg(long, default_value_t = 8.0)]
    pub ni_main_rate: f64,
    #[arg(long, default_value_t = 2.0)]
    pub ni_upper_rate: f64,
    #[arg(long, default_value_t = 28_470.0)]
    pub student_loan_threshold: f64,
    #[arg(long, default_value_t = 9.0)]
    pub student_loan_rate: f64,
    #[arg(long, default_value_t = 25.0)]
    pub pension_tax_free_lump_sum: f64,
}

impl Default for TaxArgs {
    fn default() -> Self {
        Self {
            uk_personal_allowance: 12_570.0,
            uk_basic_rate_limit: 50_270.0,
            uk_basic_rate: 20.0,
            uk_higher_rate: 40.0,
            uk_additional_rate: 45.0,
            uk_allowance_taper_start: 100_000.0,
            uk_additional_rate_threshold: 125_140.0,
            uk_taper_band_rate: 60.0,
            ni_lower_threshold: 12_570.0,
            ni_upper_threshold: 50_270.0,
            ni_main_rate: 8.0,
            ni_upper_rate: 2.0,
            student_loan_threshold: 28_470.0,
            student_loan_rate: 9.0,
            pension_tax_free_lump_sum: 25.0,
        }
    }
}

pub fn build_tax_rules(args: &TaxArgs) -> Result<TaxRules, ModelError> {
    let rules = TaxRules {
        personal_allowance: args.uk_personal_allowance,
        basic_rate_limit: args.uk_basic_rate_limit,
        basic_rate: args.uk_basic_rate / 100.0,
        higher_rate: args.uk_higher_rate / 100.0,
        additional_rate: args.uk_additional_rate / 100.0,
        allowance_taper_start: args.uk_allowance_taper_start,
        additional_rate_threshold: args.uk_additional_rate_threshold,
        taper_band_rate: args.uk_taper_band_rate / 100.0,
        ni_lower_threshold: args.ni_lower_threshold,
        ni_upper_threshold: args.ni_upper_threshold,
        ni_main_rate: args.ni_main_rate / 100.0,
        ni_upper_rate: args.ni_upper_rate / 100.0,
        student_loan_threshold: args.student_loan_threshold,
        student_loan_rate: args.student_loan_rate / 100.0,
        pension_tax_free_fraction: args.pension_tax_free_lump_sum / 100.0,
    };
    rules.validate()?;
    Ok(rules)
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ProjectArgs {
    #[arg(long, default_value_t = 32_000.0)]
    pub base_salary: f64,
    #[arg(long, default_value_t = 40, help = "Number of simulated years, including the start year")]
    pub years: u32,
    #[arg(long, default_value_t = 22)]
    pub start_age: u32,
    #[arg(long, default_value_t = 6.0, help = "Annual nominal pay rise in percent")]
    pub salary_growth_rate: f64,
    #[arg(long, default_value_t = 3.0, help = "Annual inflation in percent")]
    pub inflation_rate: f64,

    #[arg(long, default_value_t = 2_000.0)]
    pub pension_start: f64,
    #[arg(long, default_value_t = 20_000.0)]
    pub isa_start: f64,
    #[arg(long, default_value_t = 0.0)]
    pub lisa_start: f64,
    #[arg(long, default_value_t = 11_000.0)]
    pub cash_start: f64,
    #[arg(long, default_value_t = 8.0, help = "Nominal pension return in percent")]
    pub pension_growth_rate: f64,
    #[arg(long, default_value_t = 11.0, help = "Nominal ISA return in percent")]
    pub isa_growth_rate: f64,
    #[arg(long, default_value_t = 7.0, help = "Nominal LISA return in percent")]
    pub lisa_growth_rate: f64,
    #[arg(long, default_value_t = 4.5, help = "Nominal cash interest in percent")]
    pub cash_growth_rate: f64,

    #[arg(long, default_value_t = 5.0, help = "Employee salary sacrifice in percent of salary")]
    pub employee_pension_rate: f64,
    #[arg(long, default_value_t = 10.0, help = "Employer pension in percent of salary")]
    pub employer_pension_rate: f64,
    #[arg(long, default_value_t = 15.0, help = "ISA contribution in percent of net pay")]
    pub isa_contribution_rate: f64,
    #[arg(long, default_value_t = 20.0, help = "LISA contribution in percent of net pay")]
    pub lisa_contribution_rate: f64,
    #[arg(long, default_value_t = 4_000.0)]
    pub lisa_contribution_cap: f64,
    #[arg(long, default_value_t = 0.0, help = "Fixed monthly LISA payment; 0 uses --lisa-contribution-rate")]
    pub lisa_monthly_amount: f64,
    #[arg(long, default_value_t = 25.0)]
    pub lisa_bonus_rate: f64,
    #[arg(long, value_enum, default_value_t = CliLisaPolicy::FractionOfNet)]
    pub lisa_policy: CliLisaPolicy,

    #[arg(long, default_value_t = 170_000.0, help = "Starting house price; 0 disables the purchase")]
    pub property_price: f64,
    #[arg(long, default_value_t = 10.0)]
    pub deposit_rate: f64,
    #[arg(long, default_value_t = 5.0)]
    pub house_price_growth: f64,
    #[arg(long, default_value_t = 4.5)]
    pub mortgage_rate: f64,
    #[arg(long, default_value_t = 30)]
    pub mortgage_term_years: u32,

    #[arg(long, default_value_t = 60)]
    pub retirement_age: u32,
    #[arg(long, default_value_t = 25_000.0, help = "Target annual income in retirement, today's money")]
    pub retirement_income: f64,
    #[arg(long, default_value_t = 67)]
    pub state_pension_age: u32,
    #[arg(long, default_value_t = 12_000.0)]
    pub state_pension_amount: f64,
    #[arg(long, default_value_t = 57)]
    pub pension_access_age: u32,
    #[arg(long, default_value_t = 60)]
    pub lisa_access_age: u32,
    #[arg(long, value_enum, default_value_t = CliDrawdownCeiling::GrowthOnly)]
    pub drawdown_ceiling: CliDrawdownCeiling,

    #[command(flatten)]
    pub tax: TaxArgs,
}

impl Default for ProjectArgs {
    fn default() -> Self {
        Self {
            base_salary: 32_000.0,
            years: 40,
            start_age: 22,
            salary_growth_rate: 6.0,
            inflation_rate: 3.0,
            pension_start: 2_000.0,
            isa_start: 20_000.0,
            lisa_start: 0.0,
            cash_start: 11_000.0,
            pension_growth_rate: 8.0,
            isa_growth_rate: 11.0,
            lisa_growth_rate: 7.0,
            cash_growth_rate: 4.5,
            employee_pension_rate: 5.0,
            employer_pension_rate: 10.0,
            isa_contribution_rate: 15.0,
            lisa_contribution_rate: 20.0,
            lisa_contribution_cap: 4_000.0,
            lisa_monthly_amount: 0.0,
            lisa_bonus_rate: 25.0,
            lisa_policy: CliLisaPolicy::FractionOfNet,
            property_price: 170_000.0,
            deposit_rate: 10.0,
            house_price_growth: 5.0,
            mortgage_rate: 4.5,
            mortgage_term_years: 30,
            retirement_age: 60,
            retirement_income: 25_000.0,
            state_pension_age: 67,
            state_pension_amount: 12_000.0,
            pension_access_age: 57,
            lisa_access_age: 60,
            drawdown_ceiling: CliDrawdownCeiling::GrowthOnly,
            tax: TaxArgs::default(),
        }
    }
}

pub fn build_parameters(args: &ProjectArgs) -> Result<ProjectionParameters, ModelError> {
    if args.lisa_access_age < args.pension_access_age {
        return Err(ModelError::invalid(
            "lisa_access_age",
            "must be >= pension_access_age",
        ));
    }

    let params = ProjectionParameters {
        base_salary: args.base_salary,
        years: args.years,
        start_age: args.start_age,
        salary_growth_rate: args.salary_growth_rate / 100.0,
        inflation_rate: args.inflation_rate / 100.0,
        pension_start: args.pension_start,
        isa_start: args.isa_start,
        lisa_start: args.lisa_start,
        cash_start: args.cash_start,
        pension_growth_rate: args.pension_growth_rate / 100.0,
        isa_growth_rate: args.isa_growth_rate / 100.0,
        lisa_growth_rate: args.lisa_growth_rate / 100.0,
        cash_growth_rate: args.cash_growth_rate / 100.0,
        employee_pension_rate: args.employee_pension_rate / 100.0,
        employer_pension_rate: args.employer_pension_rate / 100.0,
        isa_contribution_rate: args.isa_contribution_rate / 100.0,
        lisa_contribution_rate: args.lisa_contribution_rate / 100.0,
        lisa_contribution_cap: args.lisa_contribution_cap,
        lisa_monthly_amount: args.lisa_monthly_amount,
        lisa_bonus_rate: args.lisa_bonus_rate / 100.0,
        lisa_policy: args.lisa_policy.into(),
        property_price_start: args.property_price,
        deposit_rate: args.deposit_rate / 100.0,
        house_price_growth: args.house_price_growth / 100.0,
        mortgage_rate: args.mortgage_rate / 100.0,
        mortgage_term_years: args.mortgage_term_years,
        retirement_age: args.retirement_age,
        retirement_income: args.retirement_income,
        state_pension_age: args.state_pension_age,
        state_pension_amount: args.state_pension_amount,
        pension_access_age: args.pension_access_age,
        lisa_access_age: args.lisa_access_age,
        drawdown_ceiling: args.drawdown_ceiling.into(),
        tax_rules: build_tax_rules(&args.tax)?,
    };
    params.validate()?;
    Ok(params)
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct CompareArgs {
    #[arg(long, help = "Current gross salary")]
    pub salary: f64,
    #[arg(long, value_enum, default_value_t = CliRetirementBand::Basic)]
    pub retirement_band: CliRetirementBand,
    #[arg(long, default_value_t = 5.0, help = "Employee pension contribution in percent")]
    pub employee_pct: f64,
    #[arg(long, default_value_t = 5.0, help = "Employer matched contribution in percent")]
    pub employer_pct: f64,
    #[arg(long, default_value_t = 1_000.0, help = "Net amount given up today")]
    pub net_investment: f64,
    #[arg(long, default_value_t = 25.0)]
    pub lisa_bonus_rate: f64,

    #[command(flatten)]
    pub tax: TaxArgs,
}

impl CompareArgs {
    /// Command-line defaults for every flag except the required salary.
    pub fn for_salary(salary: f64) -> Self {
        Self {
            salary,
            retirement_band: CliRetirementBand::Basic,
            employee_pct: 5.0,
            employer_pct: 5.0,
            net_investment: 1_000.0,
            lisa_bonus_rate: 25.0,
            tax: TaxArgs::default(),
        }
    }
}

pub fn build_comparison(args: &CompareArgs) -> Result<(TaxRules, ComparisonInputs), ModelError> {
    let rules = build_tax_rules(&args.tax)?;
    let mut inputs = ComparisonInputs::new(
        args.salary,
        args.retirement_band.into(),
        args.employee_pct,
        args.employer_pct,
    );
    inputs.net_investment = args.net_investment;
    inputs.lisa_bonus_rate = args.lisa_bonus_rate / 100.0;
    inputs.validate()?;
    Ok((rules, inputs))
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ReceiptArgs {
    #[arg(long, help = "Show the receipt for this gross salary instead of a simulated age")]
    pub gross: Option<f64>,
    #[arg(long, help = "Age whose simulated real salary is shown; defaults to start age")]
    pub age: Option<u32>,
    #[arg(long, default_value_t = 60.0)]
    pub budget_needs: f64,
    #[arg(long, default_value_t = 15.0)]
    pub budget_isa: f64,
    #[arg(long, default_value_t = 5.0)]
    pub budget_savings: f64,
    #[arg(long, default_value_t = 20.0)]
    pub budget_wants: f64,

    #[command(flatten)]
    pub project: ProjectArgs,
}

impl Default for ReceiptArgs {
    fn default() -> Self {
        Self {
            gross: None,
            age: None,
            budget_needs: 60.0,
            budget_isa: 15.0,
            budget_savings: 5.0,
            budget_wants: 20.0,
            project: ProjectArgs::default(),
        }
    }
}

pub fn build_receipt(args: &ReceiptArgs) -> Result<PayReceipt, ModelError> {
    let budget = BudgetSplit {
        needs: args.budget_needs / 100.0,
        isa: args.budget_isa / 100.0,
        savings: args.budget_savings / 100.0,
        wants: args.budget_wants / 100.0,
    };
    budget.validate()?;

    let params = build_parameters(&args.project)?;
    if let Some(gross) = args.gross {
        if !gross.is_finite() || gross < 0.0 {
            return Err(ModelError::invalid("gross", "must be a finite amount >= 0"));
        }
        let breakdown = net_pay(&params.tax_rules, gross, params.employee_pension_rate);
        return Ok(PayReceipt::new(
            breakdown,
            params.employee_pension_rate,
            params.employer_pension_rate,
            budget,
        ));
    }

    let age = args.age.unwrap_or(params.start_age);
    let result = run_projection(&params)?;
    let last_age = params.age_at(params.years - 1);
    receipt_for_age(&result, &params, age)
        .map(|receipt| receipt.with_budget(budget))
        .ok_or_else(|| {
            ModelError::invalid(
                "age",
                format!("must be between {} and {last_age}", params.start_age),
            )
        })
}

mod engine;
mod error;
mod property;
mod receipt;
mod tax;
mod types;
mod vehicles;

pub use engine::{required_income, run_projection};
pub use error::ModelError;
pub use property::{deposit_required, house_price, real_mortgage_rate};
pub use receipt::{BudgetLine, BudgetSplit, PayReceipt, format_money, receipt_for_age};
pub use tax::{marginal_rates, net_pay};
pub use types::{
    ComparisonInputs, ContributionFlow, DeductionBreakdown, DrawdownCeiling,
    LockedContributionPolicy, MarginalRates, Phase, ProjectionParameters, ProjectionResult,
    PurchaseEvent, RetirementBand, TaxRules, Vehicle, VehicleComparison, VehicleOutcome,
    WithdrawalFlow, YearlyState,
};
pub use vehicles::compare_vehicles;

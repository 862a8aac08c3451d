pub mod args;
pub mod render;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    ModelError, ProjectionParameters, ProjectionResult, PurchaseEvent, VehicleComparison,
    VehicleOutcome, YearlyState, compare_vehicles, run_projection,
};

use args::{
    CliDrawdownCeiling, CliLisaPolicy, CliRetirementBand, CompareArgs, ProjectArgs, ReceiptArgs,
    build_comparison, build_parameters, build_receipt,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiLisaPolicy {
    #[serde(alias = "fractionOfNet", alias = "fraction_of_net", alias = "fraction")]
    FractionOfNet,
    #[serde(alias = "depositTarget", alias = "deposit_target", alias = "target")]
    DepositTarget,
}

impl From<ApiLisaPolicy> for CliLisaPolicy {
    fn from(value: ApiLisaPolicy) -> Self {
        match value {
            ApiLisaPolicy::FractionOfNet => CliLisaPolicy::FractionOfNet,
            ApiLisaPolicy::DepositTarget => CliLisaPolicy::DepositTarget,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiDrawdownCeiling {
    #[serde(alias = "growthOnly", alias = "growth_only", alias = "growth")]
    GrowthOnly,
    #[serde(alias = "grownBalance", alias = "grown_balance", alias = "balance")]
    GrownBalance,
}

impl From<ApiDrawdownCeiling> for CliDrawdownCeiling {
    fn from(value: ApiDrawdownCeiling) -> Self {
        match value {
            ApiDrawdownCeiling::GrowthOnly => CliDrawdownCeiling::GrowthOnly,
            ApiDrawdownCeiling::GrownBalance => CliDrawdownCeiling::GrownBalance,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiRetirementBand {
    #[serde(alias = "none", alias = "0")]
    Zero,
    #[serde(alias = "20")]
    Basic,
    #[serde(alias = "40")]
    Higher,
    #[serde(alias = "45")]
    Additional,
}

impl From<ApiRetirementBand> for CliRetirementBand {
    fn from(value: ApiRetirementBand) -> Self {
        match value {
            ApiRetirementBand::Zero => CliRetirementBand::Zero,
            ApiRetirementBand::Basic => CliRetirementBand::Basic,
            ApiRetirementBand::Higher => CliRetirementBand::Higher,
            ApiRetirementBand::Additional => CliRetirementBand::Additional,
        }
    }
}

/// Projection overrides. Rates are in percent, like the command line.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    base_salary: Option<f64>,
    years: Option<u32>,
    start_age: Option<u32>,
    salary_growth: Option<f64>,
    inflation: Option<f64>,

    pension_start: Option<f64>,
    isa_start: Option<f64>,
    lisa_start: Option<f64>,
    cash_start: Option<f64>,
    pension_growth: Option<f64>,
    isa_growth: Option<f64>,
    lisa_growth: Option<f64>,
    cash_growth: Option<f64>,

    employee_pension: Option<f64>,
    employer_pension: Option<f64>,
    isa_contribution: Option<f64>,
    lisa_contribution: Option<f64>,
    lisa_cap: Option<f64>,
    lisa_monthly: Option<f64>,
    lisa_bonus: Option<f64>,
    lisa_policy: Option<ApiLisaPolicy>,

    property_price: Option<f64>,
    deposit: Option<f64>,
    house_price_growth: Option<f64>,
    mortgage_rate: Option<f64>,
    mortgage_term: Option<u32>,

    retirement_age: Option<u32>,
    retirement_income: Option<f64>,
    state_pension_age: Option<u32>,
    state_pension_amount: Option<f64>,
    pension_access_age: Option<u32>,
    lisa_access_age: Option<u32>,
    drawdown_ceiling: Option<ApiDrawdownCeiling>,

    uk_personal_allowance: Option<f64>,
    uk_basic_rate_limit: Option<f64>,
    uk_basic_rate: Option<f64>,
    uk_higher_rate: Option<f64>,
    uk_additional_rate: Option<f64>,
    uk_allowance_taper_start: Option<f64>,
    uk_additional_rate_threshold: Option<f64>,
    uk_taper_band_rate: Option<f64>,
    student_loan_threshold: Option<f64>,
    student_loan_rate: Option<f64>,
}

impl ProjectionPayload {
    fn apply(self, args: &mut ProjectArgs) {
        if let Some(v) = self.base_salary {
            args.base_salary = v;
        }
        if let Some(v) = self.years {
            args.years = v;
        }
        if let Some(v) = self.start_age {
            args.start_age = v;
        }
        if let Some(v) = self.salary_growth {
            args.salary_growth_rate = v;
        }
        if let Some(v) = self.inflation {
            args.inflation_rate = v;
        }
        if let Some(v) = self.pension_start {
            args.pension_start = v;
        }
        if let Some(v) = self.isa_start {
            args.isa_start = v;
        }
        if let Some(v) = self.lisa_start {
            args.lisa_start = v;
        }
        if let Some(v) = self.cash_start {
            args.cash_start = v;
        }
        if let Some(v) = self.pension_growth {
            args.pension_growth_rate = v;
        }
        if let Some(v) = self.isa_growth {
            args.isa_growth_rate = v;
        }
        if let Some(v) = self.lisa_growth {
            args.lisa_growth_rate = v;
        }
        if let Some(v) = self.cash_growth {
            args.cash_growth_rate = v;
        }
        if let Some(v) = self.employee_pension {
            args.employee_pension_rate = v;
        }
        if let Some(v) = self.employer_pension {
            args.employer_pension_rate = v;
        }
        if let Some(v) = self.isa_contribution {
            args.isa_contribution_rate = v;
        }
        if let Some(v) = self.lisa_contribution {
            args.lisa_contribution_rate = v;
        }
        if let Some(v) = self.lisa_cap {
            args.lisa_contribution_cap = v;
        }
        if let Some(v) = self.lisa_monthly {
            args.lisa_monthly_amount = v;
        }
        if let Some(v) = self.lisa_bonus {
            args.lisa_bonus_rate = v;
        }
        if let Some(v) = self.lisa_policy {
            args.lisa_policy = v.into();
        }
        if let Some(v) = self.property_price {
            args.property_price = v;
        }
        if let Some(v) = self.deposit {
            args.deposit_rate = v;
        }
        if let Some(v) = self.house_price_growth {
            args.house_price_growth = v;
        }
        if let Some(v) = self.mortgage_rate {
            args.mortgage_rate = v;
        }
        if let Some(v) = self.mortgage_term {
            args.mortgage_term_years = v;
        }
        if let Some(v) = self.retirement_age {
            args.retirement_age = v;
        }
        if let Some(v) = self.retirement_income {
            args.retirement_income = v;
        }
        if let Some(v) = self.state_pension_age {
            args.state_pension_age = v;
        }
        if let Some(v) = self.state_pension_amount {
            args.state_pension_amount = v;
        }
        if let Some(v) = self.pension_access_age {
            args.pension_access_age = v;
        }
        if let Some(v) = self.lisa_access_age {
            args.lisa_access_age = v;
        }
        if let Some(v) = self.drawdown_ceiling {
            args.drawdown_ceiling = v.into();
        }

        let tax = &mut args.tax;
        if let Some(v) = self.uk_personal_allowance {
            tax.uk_personal_allowance = v;
        }
        if let Some(v) = self.uk_basic_rate_limit {
            tax.uk_basic_rate_limit = v;
        }
        if let Some(v) = self.uk_basic_rate {
            tax.uk_basic_rate = v;
        }
        if let Some(v) = self.uk_higher_rate {
            tax.uk_higher_rate = v;
        }
        if let Some(v) = self.uk_additional_rate {
            tax.uk_additional_rate = v;
        }
        if let Some(v) = self.uk_allowance_taper_start {
            tax.uk_allowance_taper_start = v;
        }
        if let Some(v) = self.uk_additional_rate_threshold {
            tax.uk_additional_rate_threshold = v;
        }
        if let Some(v) = self.uk_taper_band_rate {
            tax.uk_taper_band_rate = v;
        }
        if let Some(v) = self.student_loan_threshold {
            tax.student_loan_threshold = v;
        }
        if let Some(v) = self.student_loan_rate {
            tax.student_loan_rate = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ComparePayload {
    salary: Option<f64>,
    retirement_band: Option<ApiRetirementBand>,
    employee_pct: Option<f64>,
    employer_pct: Option<f64>,
    net_investment: Option<f64>,
    lisa_bonus: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReceiptPayload {
    gross: Option<f64>,
    age: Option<u32>,
    base_salary: Option<f64>,
    years: Option<u32>,
    start_age: Option<u32>,
    salary_growth: Option<f64>,
    inflation: Option<f64>,
    employee_pension: Option<f64>,
    employer_pension: Option<f64>,
    needs: Option<f64>,
    isa: Option<f64>,
    savings: Option<f64>,
    wants: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    purchase: Option<PurchaseEvent>,
    total_shortfall: f64,
    shortfall_years: Vec<u32>,
    final_net_worth: f64,
    years: Vec<YearlyState>,
}

impl From<ProjectionResult> for ProjectionResponse {
    fn from(result: ProjectionResult) -> Self {
        Self {
            purchase: result.purchase,
            total_shortfall: result.total_shortfall(),
            shortfall_years: result.shortfall_years(),
            final_net_worth: result.final_net_worth(),
            years: result.years,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    #[serde(flatten)]
    comparison: VehicleComparison,
    ranked: Vec<VehicleOutcome>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route(
            "/api/compare",
            get(compare_get_handler).post(compare_post_handler),
        )
        .route(
            "/api/receipt",
            get(receipt_get_handler).post(receipt_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "hearth HTTP API listening");
    tracing::info!("local access: http://127.0.0.1:{port}/api/projection");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    projection_response(payload)
}

async fn projection_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    projection_response(payload)
}

async fn compare_get_handler(Query(payload): Query<ComparePayload>) -> Response {
    compare_response(payload)
}

async fn compare_post_handler(Json(payload): Json<ComparePayload>) -> Response {
    compare_response(payload)
}

async fn receipt_get_handler(Query(payload): Query<ReceiptPayload>) -> Response {
    receipt_response(payload)
}

async fn receipt_post_handler(Json(payload): Json<ReceiptPayload>) -> Response {
    receipt_response(payload)
}

fn projection_response(payload: ProjectionPayload) -> Response {
    let result = parameters_from_payload(payload).and_then(|params| run_projection(&params));
    match result {
        Ok(result) => json_response(StatusCode::OK, ProjectionResponse::from(result)),
        Err(e) => rejected("projection", e),
    }
}

fn compare_response(payload: ComparePayload) -> Response {
    let result = compare_args_from_payload(payload)
        .and_then(|args| build_comparison(&args))
        .and_then(|(rules, inputs)| compare_vehicles(&rules, &inputs));
    match result {
        Ok(comparison) => {
            let ranked = comparison.ranked();
            json_response(StatusCode::OK, CompareResponse { comparison, ranked })
        }
        Err(e) => rejected("compare", e),
    }
}

fn receipt_response(payload: ReceiptPayload) -> Response {
    match build_receipt(&receipt_args_from_payload(payload)) {
        Ok(receipt) => with_cache_control((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            receipt.render(),
        )),
        Err(e) => rejected("receipt", e),
    }
}

fn rejected(endpoint: &'static str, error: ModelError) -> Response {
    tracing::warn!(endpoint, %error, "request rejected");
    error_response(StatusCode::BAD_REQUEST, &error.to_string())
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn parameters_from_payload(payload: ProjectionPayload) -> Result<ProjectionParameters, ModelError> {
    let mut args = ProjectArgs::default();
    payload.apply(&mut args);
    build_parameters(&args)
}

fn compare_args_from_payload(payload: ComparePayload) -> Result<CompareArgs, ModelError> {
    let Some(salary) = payload.salary else {
        return Err(ModelError::invalid("salary", "is required"));
    };
    let mut args = CompareArgs::for_salary(salary);
    if let Some(v) = payload.retirement_band {
        args.retirement_band = v.into();
    }
    if let Some(v) = payload.employee_pct {
        args.employee_pct = v;
    }
    if let Some(v) = payload.employer_pct {
        args.employer_pct = v;
    }
    if let Some(v) = payload.net_investment {
        args.net_investment = v;
    }
    if let Some(v) = payload.lisa_bonus {
        args.lisa_bonus_rate = v;
    }
    Ok(args)
}

fn receipt_args_from_payload(payload: ReceiptPayload) -> ReceiptArgs {
    let mut args = ReceiptArgs {
        gross: payload.gross,
        age: payload.age,
        ..ReceiptArgs::default()
    };
    if let Some(v) = payload.base_salary {
        args.project.base_salary = v;
    }
    if let Some(v) = payload.years {
        args.project.years = v;
    }
    if let Some(v) = payload.start_age {
        args.project.start_age = v;
    }
    if let Some(v) = payload.salary_growth {
        args.project.salary_growth_rate = v;
    }
    if let Some(v) = payload.inflation {
        args.project.inflation_rate = v;
    }
    if let Some(v) = payload.employee_pension {
        args.project.employee_pension_rate = v;
    }
    if let Some(v) = payload.employer_pension {
        args.project.employer_pension_rate = v;
    }
    if let Some(v) = payload.needs {
        args.budget_needs = v;
    }
    if let Some(v) = payload.isa {
        args.budget_isa = v;
    }
    if let Some(v) = payload.savings {
        args.budget_savings = v;
    }
    if let Some(v) = payload.wants {
        args.budget_wants = v;
    }
    args
}

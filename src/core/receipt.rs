use std::fmt;

use serde::Serialize;

use super::error::{ModelError, ensure_unit_rate};
use super::tax::net_pay;
use super::types::{DeductionBreakdown, ProjectionParameters, ProjectionResult};

const RULE_WIDTH: usize = 45;
const LABEL_WIDTH: usize = 28;

/// How take-home pay is divided on the receipt. Shares are fractions of net pay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSplit {
    pub needs: f64,
    pub isa: f64,
    pub savings: f64,
    pub wants: f64,
}

impl Default for BudgetSplit {
    fn default() -> Self {
        Self {
            needs: 0.60,
            isa: 0.15,
            savings: 0.05,
            wants: 0.20,
        }
    }
}

impl BudgetSplit {
    pub fn validate(&self) -> Result<(), ModelError> {
        ensure_unit_rate("needs", self.needs)?;
        ensure_unit_rate("isa", self.isa)?;
        ensure_unit_rate("savings", self.savings)?;
        ensure_unit_rate("wants", self.wants)?;
        if self.needs + self.isa + self.savings + self.wants > 1.0 + 1e-9 {
            return Err(ModelError::invalid(
                "budget",
                "shares of net pay cannot exceed 100% together",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLine {
    pub label: &'static str,
    pub share: f64,
    pub annual: f64,
    pub monthly: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayReceipt {
    pub breakdown: DeductionBreakdown,
    pub employee_rate: f64,
    pub employer_rate: f64,
    pub budget: BudgetSplit,
}

impl PayReceipt {
    pub fn new(
        breakdown: DeductionBreakdown,
        employee_rate: f64,
        employer_rate: f64,
        budget: BudgetSplit,
    ) -> Self {
        Self {
            breakdown,
            employee_rate,
            employer_rate,
            budget,
        }
    }

    pub fn with_budget(mut self, budget: BudgetSplit) -> Self {
        self.budget = budget;
        self
    }

    pub fn employer_pension(&self) -> f64 {
        self.employer_rate * self.breakdown.gross
    }

    pub fn budget_lines(&self) -> [BudgetLine; 4] {
        let net = self.breakdown.net;
        let line = |label, share: f64| BudgetLine {
            label,
            share,
            annual: net * share,
            monthly: net * share / 12.0,
        };
        [
            line("Needs", self.budget.needs),
            line("ISA / Investment", self.budget.isa),
            line("Savings", self.budget.savings),
            line("Wants / Fun", self.budget.wants),
        ]
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PayReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.breakdown;
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);

        writeln!(f, "{heavy}")?;
        writeln!(f, "{:^width$}", "TAX & PAY RECEIPT", width = RULE_WIDTH)?;
        writeln!(f, "{heavy}")?;
        money_line(f, "Gross salary (annual):", b.gross)?;
        money_line(f, "Gross salary (monthly):", b.gross / 12.0)?;
        writeln!(f, "{light}")?;

        writeln!(f, "DEDUCTIONS (EMPLOYEE)")?;
        money_line(
            f,
            &format!("Pension ({}%):", percent(self.employee_rate)),
            b.pension_sacrifice,
        )?;
        money_line(f, "Income tax:", b.income_tax)?;
        money_line(f, "National Insurance:", b.national_insurance)?;
        money_line(f, "Student loan:", b.student_loan)?;
        writeln!(f, "{light}")?;

        writeln!(f, "EMPLOYER CONTRIBUTIONS")?;
        money_line(
            f,
            &format!("Employer pension ({}%):", percent(self.employer_rate)),
            self.employer_pension(),
        )?;
        writeln!(f, "{light}")?;

        money_line(f, "Net take-home (annual):", b.net)?;
        money_line(f, "Net take-home (monthly):", b.net / 12.0)?;
        writeln!(f, "{light}")?;

        writeln!(f, "NET PAY BUDGET ALLOCATION")?;
        for line in self.budget_lines() {
            writeln!(
                f,
                "{:<LABEL_WIDTH$}{} ({}/month)",
                format!("{} ({}%):", line.label, percent(line.share)),
                format_money(line.annual),
                format_money(line.monthly),
            )?;
        }
        write!(f, "{heavy}")
    }
}

fn money_line(f: &mut fmt::Formatter<'_>, label: &str, amount: f64) -> fmt::Result {
    writeln!(f, "{label:<LABEL_WIDTH$}{}", format_money(amount))
}

fn percent(rate: f64) -> String {
    let pct = rate * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{pct:.0}")
    } else {
        format!("{pct:.1}")
    }
}

/// Pounds with thousands separators and pence, e.g. `£12,345.67`.
pub fn format_money(amount: f64) -> String {
    let pence = (amount.abs() * 100.0).round() as u64;
    let pounds = (pence / 100).to_string();

    let mut grouped = String::with_capacity(pounds.len() + pounds.len() / 3);
    for (i, ch) in pounds.chars().enumerate() {
        if i > 0 && (pounds.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && pence > 0 { "-" } else { "" };
    format!("{sign}£{grouped}.{:02}", pence % 100)
}

/// Receipt for the real salary simulated at `age`, or `None` outside the run.
pub fn receipt_for_age(
    result: &ProjectionResult,
    params: &ProjectionParameters,
    age: u32,
) -> Option<PayReceipt> {
    let state = result.year_at_age(age)?;
    let breakdown = net_pay(
        &params.tax_rules,
        state.real_salary,
        params.employee_pension_rate,
    );
    Some(PayReceipt::new(
        breakdown,
        params.employee_pension_rate,
        params.employer_pension_rate,
        BudgetSplit::default(),
    ))
}

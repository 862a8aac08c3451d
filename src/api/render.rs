use std::fmt::Write;

use crate::core::{Phase, ProjectionResult, VehicleComparison, format_money};

pub fn projection_table(result: &ProjectionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4} {:>5} {:<6} {:>11} {:>11} {:>11} {:>11} {:>10} {:>10} {:>11} {:>11} {:>10}",
        "Year",
        "Age",
        "Phase",
        "Real pay",
        "Net pay",
        "Pension",
        "ISA",
        "LISA",
        "Cash",
        "Home eq.",
        "Net worth",
        "Shortfall",
    );

    for y in &result.years {
        let phase = match y.phase {
            Phase::Accumulating => "work",
            Phase::Drawing => "draw",
        };
        let _ = writeln!(
            out,
            "{:>4} {:>5} {:<6} {:>11.0} {:>11.0} {:>11.0} {:>11.0} {:>10.0} {:>10.0} {:>11.0} {:>11.0} {:>10.0}",
            y.year,
            y.age,
            phase,
            y.real_salary,
            y.net_pay,
            y.pension,
            y.isa,
            y.lisa,
            y.cash,
            y.home_equity,
            y.net_worth(),
            y.shortfall,
        );
    }

    out.push('\n');
    match result.purchase {
        Some(p) => {
            let _ = writeln!(
                out,
                "Home bought in year {} (age {}) for {} with a {} deposit; repayment {} a year.",
                p.year,
                p.age,
                format_money(p.price),
                format_money(p.deposit),
                format_money(p.annual_repayment),
            );
        }
        None => out.push_str("No home purchase within the horizon.\n"),
    }

    let shortfall_years = result.shortfall_years();
    if shortfall_years.is_empty() {
        out.push_str("Retirement income fully met in every year.\n");
    } else {
        let _ = writeln!(
            out,
            "Income shortfall in {} year(s), {} in total.",
            shortfall_years.len(),
            format_money(result.total_shortfall()),
        );
    }
    let _ = writeln!(
        out,
        "Final net worth (today's money): {}",
        format_money(result.final_net_worth())
    );
    out
}

pub fn comparison_table(comparison: &VehicleComparison) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Salary {}: marginal tax {:.0}%, NI {:.0}%; retirement band {:.0}%",
        format_money(comparison.salary),
        comparison.marginal.tax_rate * 100.0,
        comparison.marginal.insurance_rate * 100.0,
        comparison.retirement_tax_rate * 100.0,
    );
    if comparison.retention_degenerate {
        out.push_str("Marginal deductions reach 100%: pre-tax pension routes shown as zero.\n");
    }
    let _ = writeln!(
        out,
        "Net cost today: {}\n",
        format_money(comparison.net_investment)
    );

    let _ = writeln!(
        out,
        "{:<22} {:>12} {:>16} {:>8}",
        "Vehicle", "Pot", "Net withdrawal", "Uplift"
    );
    for outcome in comparison.ranked() {
        let marker = if outcome.vehicle == comparison.best {
            " *"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:<22} {:>12} {:>16} {:>7.1}%{marker}",
            outcome.vehicle.label(),
            format_money(outcome.pot),
            format_money(outcome.net_withdrawal),
            outcome.uplift * 100.0,
        );
    }
    out
}

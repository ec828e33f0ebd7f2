use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{
    CategoryRollup, ComplianceSummary, CorrelationPoint, ImpactSummary, RankedImpact, TrendLine,
};

/// Dollar values are rounded to whole units here and nowhere earlier, so the
/// aggregation paths never compound rounding error.
fn dollars(value: f64) -> i64 {
    value.round() as i64
}

fn write_impact_lines(output: &mut String, ranked: &[RankedImpact], with_contribution: bool) {
    if ranked.is_empty() {
        let _ = writeln!(output, "No work orders recorded for this window.");
        return;
    }
    for entry in ranked {
        let contribution = if with_contribution {
            format!(", {:.1}% of total", entry.contribution_pct)
        } else {
            String::new()
        };
        let _ = writeln!(
            output,
            "{}. {}: ${} impact, ${} recoverable ({:.1}% compliant across {} work orders{})",
            entry.rank,
            entry.name,
            dollars(entry.costs.total),
            dollars(entry.potential_savings),
            entry.compliance_rate,
            entry.work_order_count,
            contribution
        );
    }
}

#[allow(clippy::too_many_arguments)]
pub fn build_report(
    start_date: NaiveDate,
    end_date: NaiveDate,
    facilities: &[RankedImpact],
    procedures: &[RankedImpact],
    categories: &[CategoryRollup],
    points: &[CorrelationPoint],
    trend: &TrendLine,
    impact_summary: &ImpactSummary,
    compliance: &ComplianceSummary,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Compliance Profit Impact Report");
    let _ = writeln!(output, "Window: {start_date} to {end_date}");
    let _ = writeln!(output);

    let _ = writeln!(output, "## Facility Impact Ranking");
    write_impact_lines(&mut output, facilities, false);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Procedure Impact Ranking");
    write_impact_lines(&mut output, procedures, true);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Rollup");
    if categories.is_empty() {
        let _ = writeln!(output, "No categorized procedures in this window.");
    } else {
        for rollup in categories {
            let _ = writeln!(
                output,
                "- {}: ${} across {} procedures (avg compliance {:.1}%)",
                rollup.category,
                dollars(rollup.total_cost),
                rollup.procedure_count,
                rollup.avg_compliance
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Compliance vs. Incident Reduction");
    if points.is_empty() {
        let _ = writeln!(
            output,
            "Not enough work orders per procedure to fit a trend."
        );
    } else {
        let _ = writeln!(
            output,
            "Trend: reduction = {:.3} x compliance + {:.3} (R2 {:.3})",
            trend.slope, trend.intercept, trend.r_squared
        );
        for point in points.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} at {:.1}% compliance: {:.1}% incident reduction (${} impact)",
                point.name,
                point.compliance_rate,
                point.incident_rate_reduction,
                dollars(point.cost_impact)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    if let Some(top) = &impact_summary.top_cost_entity {
        let _ = writeln!(output, "- Highest impact: {top}");
    }
    let _ = writeln!(
        output,
        "- Total profit impact: ${}",
        dollars(impact_summary.total_profit_impact)
    );
    let _ = writeln!(
        output,
        "- Total potential savings: ${}",
        dollars(impact_summary.total_potential_savings)
    );
    let _ = writeln!(
        output,
        "- Overall compliance: {:.1}%",
        compliance.overall_compliance_rate
    );
    let _ = writeln!(
        output,
        "- Incident rate {:.1} per 100 compliant vs {:.1} per 100 non-compliant ({:.1}x reduction)",
        compliance.compliant_incident_rate,
        compliance.noncompliant_incident_rate,
        compliance.incident_reduction
    );

    output
}

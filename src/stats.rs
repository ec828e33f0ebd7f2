use crate::cost::{self, CostConfig};
use crate::models::{
    ComplianceCounts, ComplianceSummary, CorrelationPoint, ProcedureComplianceRow, TrendLine,
};

/// Turns a split-count procedure row into a scatter point: x is the
/// compliance rate, y the relative incident-rate drop between non-compliant
/// and compliant executions, and the cost total weights the point visually.
pub fn correlation_points(
    config: &CostConfig,
    rows: &[ProcedureComplianceRow],
) -> Vec<CorrelationPoint> {
    rows.iter()
        .map(|row| {
            let compliant_rate = per_order_incident_rate(row.compliant_incidents, row.compliant_count);
            let noncompliant_rate =
                per_order_incident_rate(row.noncompliant_incidents, row.noncompliant_count);
            let costs = cost::cost_breakdown(config, &row.aggregate);
            CorrelationPoint {
                entity_id: row.aggregate.entity_id,
                name: row.aggregate.name.clone(),
                category: row.aggregate.category.clone(),
                compliance_rate: row.aggregate.compliance_rate,
                incident_rate_reduction: incident_rate_reduction(noncompliant_rate, compliant_rate),
                cost_impact: costs.total,
            }
        })
        .collect()
}

fn per_order_incident_rate(incidents: i64, count: i64) -> f64 {
    if count > 0 {
        incidents as f64 / count as f64 * 100.0
    } else {
        0.0
    }
}

/// Ordinary least squares over (compliance rate, incident-rate reduction).
/// Degenerate inputs never produce NaN: an empty list yields the all-zero
/// line, and a constant-x list is treated as slope 0 through the mean of y
/// with no explanatory power.
pub fn fit_trend(points: &[CorrelationPoint]) -> TrendLine {
    let n = points.len() as f64;
    if points.is_empty() {
        return TrendLine {
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
        };
    }

    let sum_x: f64 = points.iter().map(|p| p.compliance_rate).sum();
    let sum_y: f64 = points.iter().map(|p| p.incident_rate_reduction).sum();
    let sum_xy: f64 = points
        .iter()
        .map(|p| p.compliance_rate * p.incident_rate_reduction)
        .sum();
    let sum_x2: f64 = points
        .iter()
        .map(|p| p.compliance_rate * p.compliance_rate)
        .sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        // All x identical: the slope is undefined, so report a flat line
        // through the mean with zero explanatory power.
        return TrendLine {
            slope: 0.0,
            intercept: sum_y / n,
            r_squared: 0.0,
        };
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = points
        .iter()
        .map(|p| (p.incident_rate_reduction - mean_y).powi(2))
        .sum();
    let ss_res: f64 = points
        .iter()
        .map(|p| {
            let predicted = slope * p.compliance_rate + intercept;
            (p.incident_rate_reduction - predicted).powi(2)
        })
        .sum();

    let r_squared = if ss_tot > 0.0 {
        (1.0 - ss_res / ss_tot).max(0.0)
    } else {
        0.0
    };

    TrendLine {
        slope,
        intercept,
        r_squared,
    }
}

/// Relative drop in incident rate attributable to compliance, in percent.
/// When non-compliant work orders had no incidents there is nothing to
/// reduce: a clean compliant record counts as a full reduction, any
/// compliant incidents count as none.
pub fn incident_rate_reduction(noncompliant_rate: f64, compliant_rate: f64) -> f64 {
    if noncompliant_rate > 0.0 {
        (noncompliant_rate - compliant_rate) / noncompliant_rate * 100.0
    } else if compliant_rate == 0.0 {
        100.0
    } else {
        0.0
    }
}

/// Dashboard-wide rates from the global compliant/non-compliant counts.
/// Note `incident_reduction` here is a raw ratio between the two rates, not
/// the relative-drop percentage used per procedure.
pub fn compliance_summary(counts: &ComplianceCounts) -> ComplianceSummary {
    let compliant_incident_rate = if counts.compliant_count > 0 {
        counts.compliant_incidents as f64 / counts.compliant_count as f64 * 100.0
    } else {
        0.0
    };
    let noncompliant_incident_rate = if counts.noncompliant_count > 0 {
        counts.noncompliant_incidents as f64 / counts.noncompliant_count as f64 * 100.0
    } else {
        0.0
    };
    let incident_reduction = if compliant_incident_rate > 0.0 {
        noncompliant_incident_rate / compliant_incident_rate
    } else {
        0.0
    };

    let total = counts.compliant_count + counts.noncompliant_count;
    let overall_compliance_rate = if total > 0 {
        counts.compliant_count as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    ComplianceSummary {
        overall_compliance_rate,
        compliant_incident_rate,
        noncompliant_incident_rate,
        incident_reduction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn point(compliance_rate: f64, incident_rate_reduction: f64) -> CorrelationPoint {
        CorrelationPoint {
            entity_id: Uuid::new_v4(),
            name: "Lockout Tagout".to_string(),
            category: Some("safety".to_string()),
            compliance_rate,
            incident_rate_reduction,
            cost_impact: 1_000.0,
        }
    }

    #[test]
    fn perfect_linear_fit_is_recovered() {
        let points = vec![
            point(50.0, 0.0),
            point(60.0, 10.0),
            point(70.0, 20.0),
            point(80.0, 30.0),
            point(90.0, 40.0),
        ];
        let trend = fit_trend(&points);
        assert!((trend.slope - 1.0).abs() < 1e-9);
        assert!((trend.intercept - (-50.0)).abs() < 1e-9);
        assert!((trend.r_squared - 1.0).abs() < 1e-9);
        assert!((trend.predict(75.0) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn empty_points_yield_zero_line() {
        let trend = fit_trend(&[]);
        assert_eq!(trend.slope, 0.0);
        assert_eq!(trend.intercept, 0.0);
        assert_eq!(trend.r_squared, 0.0);
        assert_eq!(trend.predict(88.0), 0.0);
    }

    #[test]
    fn constant_x_falls_back_to_mean_line() {
        let points = vec![point(80.0, 10.0), point(80.0, 30.0), point(80.0, 50.0)];
        let trend = fit_trend(&points);
        assert_eq!(trend.slope, 0.0);
        assert!((trend.intercept - 30.0).abs() < 1e-9);
        assert_eq!(trend.r_squared, 0.0);
    }

    #[test]
    fn noisy_fit_never_produces_nan() {
        let points = vec![point(50.0, 40.0), point(60.0, 5.0), point(90.0, 35.0)];
        let trend = fit_trend(&points);
        assert!(trend.slope.is_finite());
        assert!(trend.intercept.is_finite());
        assert!(trend.r_squared.is_finite());
        assert!(trend.r_squared >= 0.0);
    }

    #[test]
    fn reduction_policy_covers_all_three_branches() {
        assert_eq!(incident_rate_reduction(20.0, 10.0), 50.0);
        assert_eq!(incident_rate_reduction(0.0, 0.0), 100.0);
        assert_eq!(incident_rate_reduction(0.0, 5.0), 0.0);
    }

    #[test]
    fn correlation_points_carry_the_reduction_policy() {
        use crate::models::WorkOrderAggregate;

        let config = CostConfig::default();
        let aggregate = WorkOrderAggregate {
            entity_id: Uuid::new_v4(),
            name: "Confined Space Entry".to_string(),
            category: Some("safety".to_string()),
            work_order_count: 10,
            compliance_rate: 60.0,
            incident_count: 3,
            rework_count: 0,
            downtime_hours: 0.0,
            avg_quality_score: 10.0,
            duration_variance_minutes: 0.0,
        };
        let rows = vec![ProcedureComplianceRow {
            aggregate,
            compliant_count: 6,
            compliant_incidents: 0,
            noncompliant_count: 4,
            noncompliant_incidents: 2,
        }];

        let points = correlation_points(&config, &rows);
        assert_eq!(points.len(), 1);
        // Non-compliant incident rate 50, compliant 0: full relative drop.
        assert!((points[0].incident_rate_reduction - 100.0).abs() < 1e-9);
        assert_eq!(points[0].compliance_rate, 60.0);
        assert!(points[0].cost_impact > 0.0);
    }

    #[test]
    fn summary_guards_zero_counts() {
        let summary = compliance_summary(&ComplianceCounts::default());
        assert_eq!(summary.compliant_incident_rate, 0.0);
        assert_eq!(summary.noncompliant_incident_rate, 0.0);
        assert_eq!(summary.incident_reduction, 0.0);
        assert_eq!(summary.overall_compliance_rate, 0.0);
    }

    #[test]
    fn summary_reduction_is_a_ratio() {
        let counts = ComplianceCounts {
            compliant_count: 100,
            compliant_incidents: 5,
            noncompliant_count: 50,
            noncompliant_incidents: 10,
        };
        let summary = compliance_summary(&counts);
        assert!((summary.compliant_incident_rate - 5.0).abs() < 1e-9);
        assert!((summary.noncompliant_incident_rate - 20.0).abs() < 1e-9);
        assert!((summary.incident_reduction - 4.0).abs() < 1e-9);
        assert!((summary.overall_compliance_rate - 100.0 / 150.0 * 100.0).abs() < 1e-9);
    }
}

use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_QUALITY_SCORE: f64 = 7.0;

/// One aggregate row per facility or procedure over the queried window,
/// produced by the query layer. Optional inputs carry the coercion policy:
/// missing counts become zero, a missing quality score becomes 7.0.
#[derive(Debug, Clone)]
pub struct WorkOrderAggregate {
    pub entity_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub work_order_count: i64,
    pub compliance_rate: f64,
    pub incident_count: i64,
    pub rework_count: i64,
    pub downtime_hours: f64,
    pub avg_quality_score: f64,
    pub duration_variance_minutes: f64,
}

impl WorkOrderAggregate {
    /// Builds an aggregate from raw query output, coercing absent values
    /// rather than letting one bad row abort the whole entity list.
    #[allow(clippy::too_many_arguments)]
    pub fn from_row(
        entity_id: Uuid,
        name: String,
        category: Option<String>,
        work_order_count: Option<i64>,
        compliance_rate: Option<f64>,
        incident_count: Option<i64>,
        rework_count: Option<i64>,
        downtime_hours: Option<f64>,
        avg_quality_score: Option<f64>,
        duration_variance_minutes: Option<f64>,
    ) -> Self {
        Self {
            entity_id,
            name,
            category,
            work_order_count: work_order_count.unwrap_or(0),
            compliance_rate: compliance_rate.unwrap_or(0.0),
            incident_count: incident_count.unwrap_or(0),
            rework_count: rework_count.unwrap_or(0),
            downtime_hours: downtime_hours.unwrap_or(0.0),
            avg_quality_score: avg_quality_score.unwrap_or(DEFAULT_QUALITY_SCORE),
            duration_variance_minutes: duration_variance_minutes.unwrap_or(0.0),
        }
    }
}

/// Dollar cost attributed to non-ideal execution, split by driver.
/// `total` is always the exact unrounded sum of the five components.
#[derive(Debug, Clone, Serialize)]
pub struct CostBreakdown {
    pub labor: f64,
    pub material: f64,
    pub safety: f64,
    pub downtime: f64,
    pub quality: f64,
    pub total: f64,
}

/// A facility or procedure with its cost breakdown, rank, and share of the
/// grand total across its list.
#[derive(Debug, Clone, Serialize)]
pub struct RankedImpact {
    pub entity_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub work_order_count: i64,
    pub compliance_rate: f64,
    pub costs: CostBreakdown,
    pub potential_savings: f64,
    pub rank: usize,
    pub contribution_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactSummary {
    pub top_cost_entity: Option<String>,
    pub total_profit_impact: f64,
    pub total_potential_savings: f64,
    pub avg_compliance_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRollup {
    pub category: String,
    pub total_cost: f64,
    pub procedure_count: usize,
    pub avg_compliance: f64,
}

/// One scatter point per procedure for the compliance vs. incident-reduction
/// fit. Only procedures above the work-order significance floor appear here.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationPoint {
    pub entity_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub compliance_rate: f64,
    pub incident_rate_reduction: f64,
    pub cost_impact: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl TrendLine {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Per-procedure aggregate with incident counts split by the compliant flag,
/// as needed to derive the incident-rate-reduction y values.
#[derive(Debug, Clone)]
pub struct ProcedureComplianceRow {
    pub aggregate: WorkOrderAggregate,
    pub compliant_count: i64,
    pub compliant_incidents: i64,
    pub noncompliant_count: i64,
    pub noncompliant_incidents: i64,
}

/// Dashboard-wide compliant/non-compliant work-order and incident totals.
#[derive(Debug, Clone, Default)]
pub struct ComplianceCounts {
    pub compliant_count: i64,
    pub compliant_incidents: i64,
    pub noncompliant_count: i64,
    pub noncompliant_incidents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceSummary {
    pub overall_compliance_rate: f64,
    pub compliant_incident_rate: f64,
    pub noncompliant_incident_rate: f64,
    pub incident_reduction: f64,
}

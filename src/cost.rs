use crate::models::{CostBreakdown, WorkOrderAggregate};

/// Industry cost coefficients. Passed explicitly so tests and callers can
/// override individual rates without touching global state.
#[derive(Debug, Clone)]
pub struct CostConfig {
    pub hourly_rate: f64,
    pub avg_rework_hours: f64,
    pub incident_direct_cost: f64,
    pub osha_multiplier: f64,
    pub production_loss_per_hour: f64,
    pub equipment_damage_avg: f64,
    pub material_waste_avg: f64,
    pub quality_customer_impact: f64,
    pub target_compliance: f64,
    pub savings_realization_factor: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            hourly_rate: 85.0,
            avg_rework_hours: 4.0,
            incident_direct_cost: 25_000.0,
            osha_multiplier: 4.0,
            production_loss_per_hour: 1_200.0,
            equipment_damage_avg: 2_500.0,
            material_waste_avg: 500.0,
            quality_customer_impact: 150.0,
            target_compliance: 95.0,
            savings_realization_factor: 0.7,
        }
    }
}

/// Rework hours plus overrun hours, both at the shop hourly rate. Negative
/// duration variance (finished early) contributes nothing.
pub fn labor_cost(config: &CostConfig, rework_count: i64, duration_variance_minutes: f64) -> f64 {
    let rework = rework_count as f64 * config.avg_rework_hours * config.hourly_rate;
    let overrun = (duration_variance_minutes / 60.0).max(0.0) * config.hourly_rate;
    rework + overrun
}

pub fn material_cost(config: &CostConfig, incident_count: i64, rework_count: i64) -> f64 {
    incident_count as f64 * config.equipment_damage_avg
        + rework_count as f64 * config.material_waste_avg
}

/// Direct incident cost scaled by the OSHA indirect-cost multiplier.
pub fn safety_cost(config: &CostConfig, incident_count: i64) -> f64 {
    incident_count as f64 * config.incident_direct_cost * config.osha_multiplier
}

pub fn downtime_cost(config: &CostConfig, downtime_hours: f64) -> f64 {
    downtime_hours * config.production_loss_per_hour
}

/// Customer-facing cost of a quality shortfall below a perfect 10, per work
/// order. Scores at or above 10 cost nothing.
pub fn quality_cost(config: &CostConfig, quality_score: f64, work_order_count: i64) -> f64 {
    (10.0 - quality_score).max(0.0) * work_order_count as f64 * config.quality_customer_impact
}

pub fn cost_breakdown(config: &CostConfig, aggregate: &WorkOrderAggregate) -> CostBreakdown {
    let labor = labor_cost(config, aggregate.rework_count, aggregate.duration_variance_minutes);
    let material = material_cost(config, aggregate.incident_count, aggregate.rework_count);
    let safety = safety_cost(config, aggregate.incident_count);
    let downtime = downtime_cost(config, aggregate.downtime_hours);
    let quality = quality_cost(config, aggregate.avg_quality_score, aggregate.work_order_count);

    CostBreakdown {
        labor,
        material,
        safety,
        downtime,
        quality,
        total: labor + material + safety + downtime + quality,
    }
}

/// Savings realizable by closing the gap to the target compliance rate.
/// Only 70% of the theoretical gap is assumed recoverable; entities already
/// at or above target have nothing to recover.
pub fn potential_savings(config: &CostConfig, total_cost: f64, compliance_rate: f64) -> f64 {
    let gap = ((config.target_compliance - compliance_rate) / 100.0).max(0.0);
    total_cost * gap * config.savings_realization_factor
}

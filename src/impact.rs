use crate::cost::{self, CostConfig};
use crate::models::{CategoryRollup, ImpactSummary, RankedImpact, WorkOrderAggregate};

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Computes each entity's cost breakdown and potential savings, ranks the
/// list descending by total impact, and assigns contribution percentages of
/// the grand total. Ties keep input order; a zero grand total yields zero
/// contributions everywhere.
pub fn rank_impacts(config: &CostConfig, aggregates: &[WorkOrderAggregate]) -> Vec<RankedImpact> {
    let mut ranked: Vec<RankedImpact> = aggregates
        .iter()
        .map(|aggregate| {
            let costs = cost::cost_breakdown(config, aggregate);
            let potential_savings =
                cost::potential_savings(config, costs.total, aggregate.compliance_rate);
            RankedImpact {
                entity_id: aggregate.entity_id,
                name: aggregate.name.clone(),
                category: aggregate.category.clone(),
                work_order_count: aggregate.work_order_count,
                compliance_rate: aggregate.compliance_rate,
                costs,
                potential_savings,
                rank: 0,
                contribution_pct: 0.0,
            }
        })
        .collect();

    // sort_by is stable, so equal totals retain their input order.
    ranked.sort_by(|a, b| {
        b.costs
            .total
            .partial_cmp(&a.costs.total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let grand_total: f64 = ranked.iter().map(|r| r.costs.total).sum();
    for (index, entry) in ranked.iter_mut().enumerate() {
        entry.rank = index + 1;
        entry.contribution_pct = if grand_total > 0.0 {
            round_one_decimal(entry.costs.total / grand_total * 100.0)
        } else {
            0.0
        };
    }

    ranked
}

/// Grand-total summary fields over an already ranked list.
pub fn summarize_impacts(ranked: &[RankedImpact]) -> ImpactSummary {
    let total_profit_impact: f64 = ranked.iter().map(|r| r.costs.total).sum();
    let total_potential_savings: f64 = ranked.iter().map(|r| r.potential_savings).sum();
    let avg_compliance_rate = if ranked.is_empty() {
        0.0
    } else {
        ranked.iter().map(|r| r.compliance_rate).sum::<f64>() / ranked.len() as f64
    };

    ImpactSummary {
        top_cost_entity: ranked.first().map(|r| r.name.clone()),
        total_profit_impact,
        total_potential_savings,
        avg_compliance_rate,
    }
}

struct CategoryAccumulator {
    category: String,
    total_cost: f64,
    compliance_sum: f64,
    procedure_count: usize,
}

/// Groups procedure impacts by exact category string in a single pass,
/// preserving first-seen order so iteration is deterministic, then sorts
/// the groups descending by total cost. Compliance is averaged across the
/// group and rounded once at the end.
pub fn rollup_by_category(ranked: &[RankedImpact]) -> Vec<CategoryRollup> {
    let mut groups: Vec<CategoryAccumulator> = Vec::new();

    for entry in ranked {
        let Some(category) = entry.category.as_deref() else {
            continue;
        };
        let index = match groups.iter().position(|g| g.category == category) {
            Some(existing) => existing,
            None => {
                groups.push(CategoryAccumulator {
                    category: category.to_string(),
                    total_cost: 0.0,
                    compliance_sum: 0.0,
                    procedure_count: 0,
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        group.total_cost += entry.costs.total;
        group.compliance_sum += entry.compliance_rate;
        group.procedure_count += 1;
    }

    let mut rollups: Vec<CategoryRollup> = groups
        .into_iter()
        .map(|group| CategoryRollup {
            avg_compliance: round_one_decimal(group.compliance_sum / group.procedure_count as f64),
            category: group.category,
            total_cost: group.total_cost,
            procedure_count: group.procedure_count,
        })
        .collect();

    rollups.sort_by(|a, b| {
        b.total_cost
            .partial_cmp(&a.total_cost)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rollups
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn aggregate(
        name: &str,
        category: Option<&str>,
        work_order_count: i64,
        compliance_rate: f64,
        incident_count: i64,
        rework_count: i64,
        downtime_hours: f64,
        avg_quality_score: f64,
    ) -> WorkOrderAggregate {
        WorkOrderAggregate {
            entity_id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.map(str::to_string),
            work_order_count,
            compliance_rate,
            incident_count,
            rework_count,
            downtime_hours,
            avg_quality_score,
            duration_variance_minutes: 0.0,
        }
    }

    #[test]
    fn two_facility_scenario_ranks_and_savings() {
        let config = CostConfig::default();
        let aggregates = vec![
            aggregate("Facility A", None, 10, 60.0, 1, 2, 5.0, 8.0),
            aggregate("Facility B", None, 10, 95.0, 0, 0, 0.0, 10.0),
        ];
        let ranked = rank_impacts(&config, &aggregates);

        assert_eq!(ranked[0].name, "Facility A");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].name, "Facility B");
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[1].costs.total, 0.0);
        assert!(ranked[0].costs.total > 0.0);
        assert_eq!(ranked[1].potential_savings, 0.0);

        let expected_savings = ranked[0].costs.total * 0.35 * 0.7;
        assert!((ranked[0].potential_savings - expected_savings).abs() < 1e-9);
    }

    #[test]
    fn ranks_are_contiguous_and_top_rank_has_max_total() {
        let config = CostConfig::default();
        let aggregates = vec![
            aggregate("P1", Some("safety"), 10, 80.0, 0, 1, 0.0, 9.0),
            aggregate("P2", Some("safety"), 10, 70.0, 2, 0, 3.0, 8.0),
            aggregate("P3", Some("quality"), 10, 90.0, 0, 0, 1.0, 9.5),
        ];
        let ranked = rank_impacts(&config, &aggregates);

        let mut ranks: Vec<usize> = ranked.iter().map(|r| r.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3]);

        let max_total = ranked
            .iter()
            .map(|r| r.costs.total)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(ranked[0].costs.total, max_total);
    }

    #[test]
    fn contributions_sum_to_one_hundred() {
        let config = CostConfig::default();
        let aggregates = vec![
            aggregate("P1", Some("safety"), 10, 80.0, 1, 1, 2.0, 8.0),
            aggregate("P2", Some("safety"), 10, 70.0, 2, 0, 3.0, 8.0),
            aggregate("P3", Some("quality"), 10, 90.0, 0, 2, 1.0, 9.5),
        ];
        let ranked = rank_impacts(&config, &aggregates);
        let sum: f64 = ranked.iter().map(|r| r.contribution_pct).sum();
        assert!((sum - 100.0).abs() <= 0.5, "contributions summed to {sum}");
    }

    #[test]
    fn zero_grand_total_yields_zero_contributions() {
        let config = CostConfig::default();
        let aggregates = vec![
            aggregate("P1", Some("safety"), 10, 100.0, 0, 0, 0.0, 10.0),
            aggregate("P2", Some("quality"), 10, 100.0, 0, 0, 0.0, 10.0),
        ];
        let ranked = rank_impacts(&config, &aggregates);
        assert!(ranked.iter().all(|r| r.contribution_pct == 0.0));
    }

    #[test]
    fn summary_derives_from_ranked_list() {
        let config = CostConfig::default();
        let aggregates = vec![
            aggregate("Facility A", None, 10, 60.0, 1, 2, 5.0, 8.0),
            aggregate("Facility B", None, 10, 90.0, 0, 0, 0.0, 10.0),
        ];
        let ranked = rank_impacts(&config, &aggregates);
        let summary = summarize_impacts(&ranked);

        assert_eq!(summary.top_cost_entity.as_deref(), Some("Facility A"));
        let total: f64 = ranked.iter().map(|r| r.costs.total).sum();
        assert_eq!(summary.total_profit_impact, total);
        assert!((summary.avg_compliance_rate - 75.0).abs() < 1e-9);
    }

    #[test]
    fn rollup_conserves_total_cost() {
        let config = CostConfig::default();
        let aggregates = vec![
            aggregate("P1", Some("safety"), 10, 80.0, 1, 1, 2.0, 8.0),
            aggregate("P2", Some("safety"), 10, 70.0, 2, 0, 3.0, 8.0),
            aggregate("P3", Some("quality"), 10, 90.0, 0, 2, 1.0, 9.5),
        ];
        let ranked = rank_impacts(&config, &aggregates);
        let rollups = rollup_by_category(&ranked);

        let procedure_total: f64 = ranked.iter().map(|r| r.costs.total).sum();
        let rollup_total: f64 = rollups.iter().map(|r| r.total_cost).sum();
        assert!((rollup_total - procedure_total).abs() < 1e-9);

        assert_eq!(rollups.len(), 2);
        assert!(rollups[0].total_cost >= rollups[1].total_cost);
        let safety = rollups.iter().find(|r| r.category == "safety").unwrap();
        assert_eq!(safety.procedure_count, 2);
        assert_eq!(safety.avg_compliance, 75.0);
    }

    #[test]
    fn empty_input_yields_empty_rollup() {
        assert!(rollup_by_category(&[]).is_empty());
        let summary = summarize_impacts(&[]);
        assert!(summary.top_cost_entity.is_none());
        assert_eq!(summary.total_profit_impact, 0.0);
        assert_eq!(summary.avg_compliance_rate, 0.0);
    }
}

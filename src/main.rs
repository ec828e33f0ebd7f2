use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod cost;
mod db;
mod impact;
mod models;
mod report;
mod stats;

use cost::CostConfig;
use models::{CategoryRollup, ImpactSummary, RankedImpact};

#[derive(Parser)]
#[command(name = "profit-impact")]
#[command(about = "Compliance profit-impact analytics over work orders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import work orders from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank facilities by profit impact
    Facilities {
        #[arg(long, default_value = "2024-01-01")]
        start_date: NaiveDate,
        #[arg(long, default_value = "2025-12-31")]
        end_date: NaiveDate,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Rank procedures by profit impact with category rollups
    Procedures {
        #[arg(long, default_value = "2024-01-01")]
        start_date: NaiveDate,
        #[arg(long, default_value = "2025-12-31")]
        end_date: NaiveDate,
        #[arg(long)]
        json: bool,
    },
    /// Fit the compliance vs. incident-reduction trend line
    Trend {
        #[arg(long, default_value = "2024-01-01")]
        start_date: NaiveDate,
        #[arg(long, default_value = "2025-12-31")]
        end_date: NaiveDate,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "2024-01-01")]
        start_date: NaiveDate,
        #[arg(long, default_value = "2025-12-31")]
        end_date: NaiveDate,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

// Monetary fields stay unrounded through aggregation and are rounded to
// whole dollars only when they leave the process.
fn round_money(mut ranked: Vec<RankedImpact>) -> Vec<RankedImpact> {
    for entry in &mut ranked {
        entry.costs.labor = entry.costs.labor.round();
        entry.costs.material = entry.costs.material.round();
        entry.costs.safety = entry.costs.safety.round();
        entry.costs.downtime = entry.costs.downtime.round();
        entry.costs.quality = entry.costs.quality.round();
        entry.costs.total = entry.costs.total.round();
        entry.potential_savings = entry.potential_savings.round();
    }
    ranked
}

fn round_summary(mut summary: ImpactSummary) -> ImpactSummary {
    summary.total_profit_impact = summary.total_profit_impact.round();
    summary.total_potential_savings = summary.total_potential_savings.round();
    summary
}

fn round_rollups(mut rollups: Vec<CategoryRollup>) -> Vec<CategoryRollup> {
    for rollup in &mut rollups {
        rollup.total_cost = rollup.total_cost.round();
    }
    rollups
}

fn print_impact_table(ranked: &[RankedImpact], limit: usize) {
    for entry in ranked.iter().take(limit) {
        println!(
            "{}. {}: impact ${:.0}, recoverable ${:.0} ({:.1}% compliant, {} work orders)",
            entry.rank,
            entry.name,
            entry.costs.total,
            entry.potential_savings,
            entry.compliance_rate,
            entry.work_order_count
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let config = CostConfig::default();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} work orders from {}.", csv.display());
        }
        Commands::Facilities {
            start_date,
            end_date,
            limit,
            json,
        } => {
            let aggregates = db::fetch_facility_aggregates(&pool, start_date, end_date).await?;
            let ranked = impact::rank_impacts(&config, &aggregates);
            let summary = impact::summarize_impacts(&ranked);

            if json {
                let payload = serde_json::json!({
                    "facilities": round_money(ranked),
                    "summary": round_summary(summary),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if ranked.is_empty() {
                println!("No facilities with work orders in this window.");
            } else {
                println!("Facilities by profit impact:");
                print_impact_table(&ranked, limit);
                println!(
                    "Total impact ${:.0}, recoverable ${:.0}, avg compliance {:.1}%",
                    summary.total_profit_impact,
                    summary.total_potential_savings,
                    summary.avg_compliance_rate
                );
            }
        }
        Commands::Procedures {
            start_date,
            end_date,
            json,
        } => {
            let aggregates = db::fetch_procedure_aggregates(&pool, start_date, end_date).await?;
            let ranked = impact::rank_impacts(&config, &aggregates);
            let rollups = impact::rollup_by_category(&ranked);
            let summary = impact::summarize_impacts(&ranked);

            if json {
                let payload = serde_json::json!({
                    "procedures": round_money(ranked),
                    "categories": round_rollups(rollups),
                    "summary": round_summary(summary),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if ranked.is_empty() {
                println!("No procedures with work orders in this window.");
            } else {
                println!("Procedures by profit impact:");
                print_impact_table(&ranked, ranked.len());
                println!("Categories:");
                for rollup in &rollups {
                    println!(
                        "- {}: ${:.0} across {} procedures (avg compliance {:.1}%)",
                        rollup.category,
                        rollup.total_cost,
                        rollup.procedure_count,
                        rollup.avg_compliance
                    );
                }
            }
        }
        Commands::Trend {
            start_date,
            end_date,
            json,
        } => {
            let rows = db::fetch_procedure_compliance_rows(&pool, start_date, end_date).await?;
            let points = stats::correlation_points(&config, &rows);
            let trend = stats::fit_trend(&points);

            if json {
                let payload = serde_json::json!({
                    "points": points,
                    "trend": trend,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if points.is_empty() {
                println!("Not enough work orders per procedure to fit a trend.");
            } else {
                println!(
                    "Trend: reduction = {:.3} x compliance + {:.3} (R2 {:.3})",
                    trend.slope, trend.intercept, trend.r_squared
                );
                for point in &points {
                    println!(
                        "- {} at {:.1}% compliance: {:.1}% incident reduction",
                        point.name, point.compliance_rate, point.incident_rate_reduction
                    );
                }
            }
        }
        Commands::Report {
            start_date,
            end_date,
            out,
        } => {
            let facility_aggregates =
                db::fetch_facility_aggregates(&pool, start_date, end_date).await?;
            let procedure_aggregates =
                db::fetch_procedure_aggregates(&pool, start_date, end_date).await?;
            let compliance_rows =
                db::fetch_procedure_compliance_rows(&pool, start_date, end_date).await?;
            let counts = db::fetch_compliance_counts(&pool, start_date, end_date).await?;

            let facilities = impact::rank_impacts(&config, &facility_aggregates);
            let procedures = impact::rank_impacts(&config, &procedure_aggregates);
            let rollups = impact::rollup_by_category(&procedures);
            let summary = impact::summarize_impacts(&facilities);
            let points = stats::correlation_points(&config, &compliance_rows);
            let trend = stats::fit_trend(&points);
            let compliance = stats::compliance_summary(&counts);

            let report = report::build_report(
                start_date,
                end_date,
                &facilities,
                &procedures,
                &rollups,
                &points,
                &trend,
                &summary,
                &compliance,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

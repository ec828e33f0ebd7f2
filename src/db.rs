use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{ComplianceCounts, ProcedureComplianceRow, WorkOrderAggregate};

/// Procedures need at least this many work orders in the window before they
/// count toward the trend fit.
pub const CORRELATION_MIN_WORK_ORDERS: i64 = 5;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let facilities = vec![
        (
            Uuid::parse_str("7c1e2f4a-5b3d-4e6f-9a8b-1c2d3e4f5a6b")?,
            "Riverside Plant",
        ),
        (
            Uuid::parse_str("2a9b8c7d-6e5f-4a3b-8c9d-0e1f2a3b4c5d")?,
            "Harbor Works",
        ),
    ];

    for (id, name) in &facilities {
        sqlx::query(
            r#"
            INSERT INTO compliance_impact.facilities (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let procedures = vec![
        (
            Uuid::parse_str("5f6e7d8c-9b0a-4c1d-8e2f-3a4b5c6d7e8f")?,
            "Lockout Tagout",
            "safety",
        ),
        (
            Uuid::parse_str("1b2c3d4e-5f6a-4b7c-9d8e-0f1a2b3c4d5e")?,
            "Line Changeover",
            "operations",
        ),
        (
            Uuid::parse_str("9d8e7f6a-5b4c-4d3e-8f2a-1b0c9d8e7f6a")?,
            "Final Inspection",
            "quality",
        ),
    ];

    for (id, name, category) in &procedures {
        sqlx::query(
            r#"
            INSERT INTO compliance_impact.procedures (id, name, category)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET category = EXCLUDED.category
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(category)
        .execute(pool)
        .await?;
    }

    // (source_key, facility, procedure, compliant, incidents, reworks,
    //  downtime_hours, quality, variance_minutes, completed_at)
    let work_orders = vec![
        ("seed-001", 0, 0, true, 0, 0, 0.0, 9.5, -15.0, (2024, 3, 4)),
        ("seed-002", 0, 0, false, 1, 1, 4.0, 6.0, 90.0, (2024, 3, 11)),
        ("seed-003", 0, 1, true, 0, 0, 0.0, 8.5, 10.0, (2024, 4, 2)),
        ("seed-004", 0, 1, false, 0, 2, 2.5, 7.0, 120.0, (2024, 4, 18)),
        ("seed-005", 0, 2, true, 0, 0, 0.0, 9.0, 0.0, (2024, 5, 6)),
        ("seed-006", 1, 0, true, 0, 0, 0.0, 9.0, -5.0, (2024, 5, 20)),
        ("seed-007", 1, 0, false, 2, 0, 8.0, 5.5, 60.0, (2024, 6, 3)),
        ("seed-008", 1, 1, true, 0, 0, 0.0, 8.0, 0.0, (2024, 6, 17)),
        ("seed-009", 1, 2, false, 0, 1, 1.0, 6.5, 45.0, (2024, 7, 1)),
        ("seed-010", 1, 2, true, 0, 0, 0.0, 9.5, -30.0, (2024, 7, 15)),
        ("seed-011", 0, 0, true, 0, 0, 0.0, 9.0, 0.0, (2024, 8, 5)),
        ("seed-012", 1, 0, false, 1, 0, 3.0, 6.0, 75.0, (2024, 8, 19)),
        ("seed-013", 0, 1, true, 0, 0, 0.0, 8.5, -10.0, (2024, 9, 2)),
        ("seed-014", 1, 1, false, 0, 1, 1.5, 7.5, 30.0, (2024, 9, 16)),
        ("seed-015", 0, 2, true, 0, 0, 0.0, 9.5, 0.0, (2024, 10, 7)),
        ("seed-016", 1, 2, false, 1, 0, 2.0, 6.0, 50.0, (2024, 10, 21)),
    ];

    for (source_key, facility_ix, procedure_ix, compliant, incidents, reworks, downtime, quality, variance, (y, m, d)) in
        work_orders
    {
        let completed_at = NaiveDate::from_ymd_opt(y, m, d).context("invalid seed date")?;
        sqlx::query(
            r#"
            INSERT INTO compliance_impact.work_orders
            (id, facility_id, procedure_id, compliant, incident_count, rework_count,
             downtime_hours, quality_score, duration_variance_minutes, completed_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(facilities[facility_ix].0)
        .bind(procedures[procedure_ix].0)
        .bind(compliant)
        .bind(incidents)
        .bind(reworks)
        .bind(downtime)
        .bind(quality)
        .bind(variance)
        .bind(completed_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

fn aggregate_from_row(row: &sqlx::postgres::PgRow, with_category: bool) -> WorkOrderAggregate {
    WorkOrderAggregate::from_row(
        row.get("entity_id"),
        row.get("name"),
        if with_category { row.get("category") } else { None },
        row.get("work_order_count"),
        row.get("compliance_rate"),
        row.get("incident_count"),
        row.get("rework_count"),
        row.get("downtime_hours"),
        row.get("avg_quality_score"),
        row.get("duration_variance_minutes"),
    )
}

pub async fn fetch_facility_aggregates(
    pool: &PgPool,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> anyhow::Result<Vec<WorkOrderAggregate>> {
    let rows = sqlx::query(
        r#"
        SELECT f.id AS entity_id, f.name,
               COUNT(w.id)::bigint AS work_order_count,
               AVG(CASE WHEN w.compliant THEN 100.0 ELSE 0.0 END)::float8 AS compliance_rate,
               SUM(w.incident_count)::bigint AS incident_count,
               SUM(w.rework_count)::bigint AS rework_count,
               SUM(w.downtime_hours)::float8 AS downtime_hours,
               AVG(w.quality_score)::float8 AS avg_quality_score,
               SUM(w.duration_variance_minutes)::float8 AS duration_variance_minutes
        FROM compliance_impact.facilities f
        LEFT JOIN compliance_impact.work_orders w
          ON w.facility_id = f.id AND w.completed_at BETWEEN $1 AND $2
        GROUP BY f.id, f.name
        ORDER BY f.name
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| aggregate_from_row(row, false)).collect())
}

pub async fn fetch_procedure_aggregates(
    pool: &PgPool,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> anyhow::Result<Vec<WorkOrderAggregate>> {
    let rows = sqlx::query(
        r#"
        SELECT p.id AS entity_id, p.name, p.category,
               COUNT(w.id)::bigint AS work_order_count,
               AVG(CASE WHEN w.compliant THEN 100.0 ELSE 0.0 END)::float8 AS compliance_rate,
               SUM(w.incident_count)::bigint AS incident_count,
               SUM(w.rework_count)::bigint AS rework_count,
               SUM(w.downtime_hours)::float8 AS downtime_hours,
               AVG(w.quality_score)::float8 AS avg_quality_score,
               SUM(w.duration_variance_minutes)::float8 AS duration_variance_minutes
        FROM compliance_impact.procedures p
        LEFT JOIN compliance_impact.work_orders w
          ON w.procedure_id = p.id AND w.completed_at BETWEEN $1 AND $2
        GROUP BY p.id, p.name, p.category
        ORDER BY p.name
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| aggregate_from_row(row, true)).collect())
}

/// Per-procedure aggregates with incidents split by the compliant flag.
/// The HAVING clause applies the statistical floor so sub-floor procedures
/// never reach the trend engine.
pub async fn fetch_procedure_compliance_rows(
    pool: &PgPool,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> anyhow::Result<Vec<ProcedureComplianceRow>> {
    let rows = sqlx::query(
        r#"
        SELECT p.id AS entity_id, p.name, p.category,
               COUNT(w.id)::bigint AS work_order_count,
               AVG(CASE WHEN w.compliant THEN 100.0 ELSE 0.0 END)::float8 AS compliance_rate,
               SUM(w.incident_count)::bigint AS incident_count,
               SUM(w.rework_count)::bigint AS rework_count,
               SUM(w.downtime_hours)::float8 AS downtime_hours,
               AVG(w.quality_score)::float8 AS avg_quality_score,
               SUM(w.duration_variance_minutes)::float8 AS duration_variance_minutes,
               SUM(CASE WHEN w.compliant THEN 1 ELSE 0 END)::bigint AS compliant_count,
               SUM(CASE WHEN w.compliant THEN w.incident_count ELSE 0 END)::bigint AS compliant_incidents,
               SUM(CASE WHEN NOT w.compliant THEN 1 ELSE 0 END)::bigint AS noncompliant_count,
               SUM(CASE WHEN NOT w.compliant THEN w.incident_count ELSE 0 END)::bigint AS noncompliant_incidents
        FROM compliance_impact.procedures p
        JOIN compliance_impact.work_orders w
          ON w.procedure_id = p.id AND w.completed_at BETWEEN $1 AND $2
        GROUP BY p.id, p.name, p.category
        HAVING COUNT(w.id) >= $3
        ORDER BY p.name
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .bind(CORRELATION_MIN_WORK_ORDERS)
    .fetch_all(pool)
    .await?;

    let mut results = Vec::new();
    for row in &rows {
        results.push(ProcedureComplianceRow {
            aggregate: aggregate_from_row(row, true),
            compliant_count: row.get::<Option<i64>, _>("compliant_count").unwrap_or(0),
            compliant_incidents: row.get::<Option<i64>, _>("compliant_incidents").unwrap_or(0),
            noncompliant_count: row.get::<Option<i64>, _>("noncompliant_count").unwrap_or(0),
            noncompliant_incidents: row
                .get::<Option<i64>, _>("noncompliant_incidents")
                .unwrap_or(0),
        });
    }

    Ok(results)
}

pub async fn fetch_compliance_counts(
    pool: &PgPool,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> anyhow::Result<ComplianceCounts> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) FILTER (WHERE compliant)::bigint AS compliant_count,
               COALESCE(SUM(incident_count) FILTER (WHERE compliant), 0)::bigint AS compliant_incidents,
               COUNT(*) FILTER (WHERE NOT compliant)::bigint AS noncompliant_count,
               COALESCE(SUM(incident_count) FILTER (WHERE NOT compliant), 0)::bigint AS noncompliant_incidents
        FROM compliance_impact.work_orders
        WHERE completed_at BETWEEN $1 AND $2
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await?;

    Ok(ComplianceCounts {
        compliant_count: row.get("compliant_count"),
        compliant_incidents: row.get("compliant_incidents"),
        noncompliant_count: row.get("noncompliant_count"),
        noncompliant_incidents: row.get("noncompliant_incidents"),
    })
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        facility: String,
        procedure: String,
        category: Option<String>,
        compliant: bool,
        incident_count: i32,
        rework_count: i32,
        downtime_hours: f64,
        quality_score: Option<f64>,
        duration_variance_minutes: f64,
        completed_at: NaiveDate,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;

        let facility_id: Uuid = sqlx::query(
            r#"
            INSERT INTO compliance_impact.facilities (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.facility)
        .fetch_one(pool)
        .await?
        .get("id");

        let procedure_id: Uuid = sqlx::query(
            r#"
            INSERT INTO compliance_impact.procedures (id, name, category)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
            SET category = COALESCE(EXCLUDED.category, compliance_impact.procedures.category)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.procedure)
        .bind(&row.category)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO compliance_impact.work_orders
            (id, facility_id, procedure_id, compliant, incident_count, rework_count,
             downtime_hours, quality_score, duration_variance_minutes, completed_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(facility_id)
        .bind(procedure_id)
        .bind(row.compliant)
        .bind(row.incident_count)
        .bind(row.rework_count)
        .bind(row.downtime_hours)
        .bind(row.quality_score)
        .bind(row.duration_variance_minutes)
        .bind(row.completed_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    billing::{PlanTier, ProjectQuota, Subscription, UsageRecord, UsageType},
};

pub struct BillingRepository;

impl BillingRepository {
    /// Creates or replaces a project's subscription and resets its quota
    /// ceilings to the new tier's defaults, preserving usage-to-date.
    pub async fn subscribe(
        pool: &SqlitePool,
        project_id: Uuid,
        tier: PlanTier,
    ) -> Result<Subscription, RepoError> {
        let mut tx = pool.begin().await.map_err(RepoError::Database)?;

        let subscription = sqlx::query_as::<Sqlite, Subscription>(
            r#"
            INSERT INTO subscriptions (project_id, tier, is_active, created_at)
            VALUES (?, ?, 1, datetime('now'))
            ON CONFLICT(project_id) DO UPDATE SET
                tier = excluded.tier,
                is_active = 1
            RETURNING *
            "#,
        )
        .bind(project_id.as_bytes().as_slice())
        .bind(tier.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(RepoError::Database)?;

        sqlx::query(
            r#"
            INSERT INTO project_quotas (
                project_id, storage_quota_bytes, storage_quota_used,
                compute_quota_seconds, compute_quota_used,
                api_rate_limit_per_hour, api_requests_this_hour, api_hour_reset_at,
                training_gpu_hours_quota, training_gpu_hours_used, updated_at
            )
            VALUES (?, ?, 0, ?, 0, ?, 0, datetime('now', '+1 hour'), ?, 0, datetime('now'))
            ON CONFLICT(project_id) DO UPDATE SET
                storage_quota_bytes = excluded.storage_quota_bytes,
                compute_quota_seconds = excluded.compute_quota_seconds,
                api_rate_limit_per_hour = excluded.api_rate_limit_per_hour,
                training_gpu_hours_quota = excluded.training_gpu_hours_quota,
                updated_at = datetime('now')
            "#,
        )
        .bind(project_id.as_bytes().as_slice())
        .bind(tier.default_storage_quota_bytes())
        .bind(tier.default_compute_quota_seconds())
        .bind(tier.default_api_rate_limit_per_hour())
        .bind(tier.default_training_gpu_hours_quota())
        .execute(&mut *tx)
        .await
        .map_err(RepoError::Database)?;

        tx.commit().await.map_err(RepoError::Database)?;
        Ok(subscription)
    }

    pub async fn find_subscription(pool: &SqlitePool, project_id: Uuid) -> Result<Option<Subscription>, RepoError> {
        sqlx::query_as::<Sqlite, Subscription>("SELECT * FROM subscriptions WHERE project_id = ?")
            .bind(project_id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn find_quota(pool: &SqlitePool, project_id: Uuid) -> Result<Option<ProjectQuota>, RepoError> {
        sqlx::query_as::<Sqlite, ProjectQuota>("SELECT * FROM project_quotas WHERE project_id = ?")
            .bind(project_id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    /// Appends a usage record and bumps the matching quota counter in the
    /// same transaction so the two never drift apart.
    pub async fn record_usage(
        pool: &SqlitePool,
        project_id: Uuid,
        user_id: Option<Uuid>,
        usage_type: UsageType,
        quantity: f64,
        unit: &str,
        metadata: serde_json::Value,
    ) -> Result<UsageRecord, RepoError> {
        let id = Uuid::new_v4();
        let mut tx = pool.begin().await.map_err(RepoError::Database)?;

        let record = sqlx::query_as::<Sqlite, UsageRecord>(
            r#"
            INSERT INTO usage_records (id, project_id, user_id, usage_type, quantity, unit, metadata, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(project_id.as_bytes().as_slice())
        .bind(user_id.map(|u| u.simple().to_string()))
        .bind(usage_type.to_string())
        .bind(quantity)
        .bind(unit)
        .bind(sqlx::types::Json(metadata))
        .fetch_one(&mut *tx)
        .await
        .map_err(RepoError::Database)?;

        let column = match usage_type {
            UsageType::StorageBytes => "storage_quota_used",
            UsageType::ComputeSeconds => "compute_quota_used",
            UsageType::ApiRequest => "api_requests_this_hour",
            UsageType::TrainingGpuHours => "training_gpu_hours_used",
        };
        let sql = format!(
            "UPDATE project_quotas SET {column} = {column} + ?, updated_at = datetime('now') WHERE project_id = ?"
        );
        sqlx::query(&sql)
            .bind(quantity)
            .bind(project_id.as_bytes().as_slice())
            .execute(&mut *tx)
            .await
            .map_err(RepoError::Database)?;

        tx.commit().await.map_err(RepoError::Database)?;
        Ok(record)
    }

    /// Rolls the per-hour API counter back to zero for any project whose
    /// reset time has passed; called opportunistically by rate-limit middleware.
    pub async fn reset_expired_api_windows(pool: &SqlitePool) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE project_quotas
            SET api_requests_this_hour = 0, api_hour_reset_at = datetime('now', '+1 hour'), updated_at = datetime('now')
            WHERE api_hour_reset_at <= datetime('now')
            "#,
        )
        .execute(pool)
        .await
        .map_err(RepoError::Database)?;
        Ok(())
    }

    pub async fn reset_monthly_training_counts(pool: &SqlitePool) -> Result<(), RepoError> {
        sqlx::query("UPDATE project_quotas SET training_gpu_hours_used = 0, updated_at = datetime('now')")
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }

    /// Lifetime usage per type, for the `usage_totals` field of a project's
    /// usage summary. Recomputed from `usage_records` rather than read off
    /// `project_quotas`, since the quota columns reset on their own windows
    /// (hourly for API requests) while totals are cumulative.
    pub async fn sum_usage_by_type(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<(UsageType, f64)>, RepoError> {
        let rows: Vec<(String, f64)> = sqlx::query_as(
            "SELECT usage_type, SUM(quantity) FROM usage_records WHERE project_id = ? GROUP BY usage_type",
        )
        .bind(project_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)?;

        Ok(rows
            .into_iter()
            .filter_map(|(kind, total)| kind.parse::<UsageType>().ok().map(|k| (k, total)))
            .collect())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

/// Subscription tiers gate the limits enforced by `ProjectQuota`; a project
/// without a `Subscription` row falls back to `PlanTier::Free` defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PlanTier {
    Free,
    Team,
    Enterprise,
}

impl PlanTier {
    pub fn default_storage_quota_bytes(&self) -> i64 {
        match self {
            PlanTier::Free => 5 * 1024 * 1024 * 1024,
            PlanTier::Team => 200 * 1024 * 1024 * 1024,
            PlanTier::Enterprise => -1,
        }
    }

    pub fn default_compute_quota_seconds(&self) -> i64 {
        match self {
            PlanTier::Free => 3_600,
            PlanTier::Team => 50_000,
            PlanTier::Enterprise => -1,
        }
    }

    pub fn default_api_rate_limit_per_hour(&self) -> i64 {
        match self {
            PlanTier::Free => 1_000,
            PlanTier::Team => 20_000,
            PlanTier::Enterprise => -1,
        }
    }

    pub fn default_training_gpu_hours_quota(&self) -> i64 {
        match self {
            PlanTier::Free => 2,
            PlanTier::Team => 100,
            PlanTier::Enterprise => -1,
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlanTier::Free => "free",
            PlanTier::Team => "team",
            PlanTier::Enterprise => "enterprise",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PlanTier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PlanTier::Free),
            "team" => Ok(PlanTier::Team),
            "enterprise" => Ok(PlanTier::Enterprise),
            other => Err(format!("invalid plan tier: {other}")),
        }
    }
}

impl TryFrom<String> for PlanTier {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Subscription {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub project_id: Uuid,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub tier: PlanTier,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Denormalized running counters refreshed by the billing service after
/// each metered event, so quota checks in request middleware stay a single
/// indexed lookup rather than an aggregate query.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProjectQuota {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub project_id: Uuid,
    pub storage_quota_bytes: i64,
    pub storage_quota_used: i64,
    pub compute_quota_seconds: i64,
    pub compute_quota_used: i64,
    pub api_rate_limit_per_hour: i64,
    pub api_requests_this_hour: i64,
    pub api_hour_reset_at: DateTime<Utc>,
    pub training_gpu_hours_quota: i64,
    pub training_gpu_hours_used: i64,
    pub updated_at: DateTime<Utc>,
}

impl ProjectQuota {
    /// A limit of `-1` means unlimited, matching the original service's
    /// convention for enterprise tiers.
    pub fn storage_quota_exceeded(&self) -> bool {
        self.storage_quota_bytes >= 0 && self.storage_quota_used >= self.storage_quota_bytes
    }

    pub fn compute_quota_exceeded(&self) -> bool {
        self.compute_quota_seconds >= 0 && self.compute_quota_used >= self.compute_quota_seconds
    }

    pub fn training_gpu_quota_exceeded(&self) -> bool {
        self.training_gpu_hours_quota >= 0 && self.training_gpu_hours_used >= self.training_gpu_hours_quota
    }

    /// Rate limiting is time-windowed: the caller must roll `api_requests_this_hour`
    /// back to zero and bump `api_hour_reset_at` once `now` passes it.
    pub fn api_rate_limit_exceeded(&self) -> bool {
        self.api_rate_limit_per_hour >= 0 && self.api_requests_this_hour >= self.api_rate_limit_per_hour
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UsageType {
    StorageBytes,
    ComputeSeconds,
    ApiRequest,
    TrainingGpuHours,
}

impl std::fmt::Display for UsageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UsageType::StorageBytes => "storage_bytes",
            UsageType::ComputeSeconds => "compute_seconds",
            UsageType::ApiRequest => "api_request",
            UsageType::TrainingGpuHours => "training_gpu_hours",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UsageType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "storage_bytes" => Ok(UsageType::StorageBytes),
            "compute_seconds" => Ok(UsageType::ComputeSeconds),
            "api_request" => Ok(UsageType::ApiRequest),
            "training_gpu_hours" => Ok(UsageType::TrainingGpuHours),
            other => Err(format!("invalid usage type: {other}")),
        }
    }
}

impl TryFrom<String> for UsageType {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Append-only ledger backing the quota counters; kept separately so usage
/// can be audited or recomputed if a `ProjectQuota` row drifts.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UsageRecord {
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub id: Uuid,
    #[sqlx(try_from = "Vec<u8>")]
    #[ts(type = "string")]
    pub project_id: Uuid,
    /// Nullable: some usage (bulk ingestion jobs, scheduled sweeps) has no
    /// single attributable user.
    #[ts(type = "string | null")]
    pub user_id: Option<String>,
    #[sqlx(try_from = "String")]
    #[ts(type = "string")]
    pub usage_type: UsageType,
    pub quantity: f64,
    pub unit: String,
    pub metadata: sqlx::types::Json<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unlimited_quota() -> ProjectQuota {
        ProjectQuota {
            project_id: Uuid::new_v4(),
            storage_quota_bytes: -1,
            storage_quota_used: i64::MAX,
            compute_quota_seconds: -1,
            compute_quota_used: i64::MAX,
            api_rate_limit_per_hour: -1,
            api_requests_this_hour: i64::MAX,
            api_hour_reset_at: Utc::now(),
            training_gpu_hours_quota: -1,
            training_gpu_hours_used: i64::MAX,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unlimited_tier_never_exceeds_quota() {
        let quota = unlimited_quota();
        assert!(!quota.storage_quota_exceeded());
        assert!(!quota.compute_quota_exceeded());
        assert!(!quota.training_gpu_quota_exceeded());
        assert!(!quota.api_rate_limit_exceeded());
    }

    #[test]
    fn bounded_tier_flags_exceeded_usage() {
        let mut quota = unlimited_quota();
        quota.storage_quota_bytes = 1024;
        quota.storage_quota_used = 2048;
        quota.compute_quota_seconds = 10;
        quota.compute_quota_used = 10;
        quota.api_rate_limit_per_hour = 5;
        quota.api_requests_this_hour = 5;
        quota.training_gpu_hours_quota = 1;
        quota.training_gpu_hours_used = 1;

        assert!(quota.storage_quota_exceeded());
        assert!(quota.compute_quota_exceeded());
        assert!(quota.api_rate_limit_exceeded());
        assert!(quota.training_gpu_quota_exceeded());
    }
}

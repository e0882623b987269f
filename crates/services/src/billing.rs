use std::collections::HashMap;

use db::models::billing::{PlanTier, ProjectQuota, Subscription, UsageType};
use db::repositories::billing_repository::BillingRepository;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::ServiceError;

/// Why a quota check failed; carried through to `ApiError::RateLimited` by
/// the caller, matching `original_source`'s `check_quota` returning
/// `(false, reason)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaRejection {
    Storage,
    Compute,
    ApiRate,
    TrainingGpuHours,
}

impl QuotaRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            QuotaRejection::Storage => "storage quota exceeded",
            QuotaRejection::Compute => "compute quota exceeded",
            QuotaRejection::ApiRate => "API rate limit exceeded for this hour",
            QuotaRejection::TrainingGpuHours => "training GPU hours quota exceeded",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub billing_enabled: bool,
    pub subscription: Option<Subscription>,
    pub quotas: Option<ProjectQuota>,
    pub usage_totals: HashMap<UsageType, f64>,
}

/// Feature-flagged quota metering layer. When `enabled` is false every
/// check is a no-op — callers don't need a separate code path, they just
/// get a `BillingService` constructed with the project's `BILLING_ENABLED`
/// setting.
pub struct BillingService {
    pool: SqlitePool,
    enabled: bool,
}

impl BillingService {
    pub fn new(pool: SqlitePool, enabled: bool) -> Self {
        Self { pool, enabled }
    }

    pub async fn subscribe(&self, project_id: Uuid, tier: PlanTier) -> Result<Subscription, ServiceError> {
        Ok(BillingRepository::subscribe(&self.pool, project_id, tier).await?)
    }

    /// Returns `Ok(None)` when billing is disabled or the project has no
    /// quota row, in which case the caller should treat the request as
    /// unconstrained rather than erroring.
    pub async fn check_quota(&self, project_id: Uuid, usage_type: UsageType) -> Result<Option<QuotaRejection>, ServiceError> {
        if !self.enabled {
            return Ok(None);
        }
        BillingRepository::reset_expired_api_windows(&self.pool).await?;

        let Some(quota) = BillingRepository::find_quota(&self.pool, project_id).await? else {
            return Ok(None);
        };

        let rejection = match usage_type {
            UsageType::StorageBytes if quota.storage_quota_exceeded() => Some(QuotaRejection::Storage),
            UsageType::ComputeSeconds if quota.compute_quota_exceeded() => Some(QuotaRejection::Compute),
            UsageType::ApiRequest if quota.api_rate_limit_exceeded() => Some(QuotaRejection::ApiRate),
            UsageType::TrainingGpuHours if quota.training_gpu_quota_exceeded() => Some(QuotaRejection::TrainingGpuHours),
            _ => None,
        };
        Ok(rejection)
    }

    pub async fn record_usage(
        &self,
        project_id: Uuid,
        user_id: Option<Uuid>,
        usage_type: UsageType,
        quantity: f64,
        unit: &str,
    ) -> Result<(), ServiceError> {
        if !self.enabled {
            return Ok(());
        }
        BillingRepository::record_usage(&self.pool, project_id, user_id, usage_type, quantity, unit, serde_json::json!({})).await?;
        Ok(())
    }

    pub async fn usage_summary(&self, project_id: Uuid) -> Result<UsageSummary, ServiceError> {
        if !self.enabled {
            return Ok(UsageSummary { billing_enabled: false, subscription: None, quotas: None, usage_totals: HashMap::new() });
        }
        let subscription = BillingRepository::find_subscription(&self.pool, project_id).await?;
        let quotas = BillingRepository::find_quota(&self.pool, project_id).await?;
        let usage_totals = BillingRepository::sum_usage_by_type(&self.pool, project_id).await?.into_iter().collect();
        Ok(UsageSummary { billing_enabled: true, subscription, quotas, usage_totals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_reasons_are_human_readable() {
        assert_eq!(QuotaRejection::Storage.reason(), "storage quota exceeded");
        assert_eq!(QuotaRejection::ApiRate.reason(), "API rate limit exceeded for this hour");
    }
}

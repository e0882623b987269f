//! Quota enforcement is applied at the specific call sites named in
//! `original_source`'s billing service (media upload against the storage
//! quota, training job creation against GPU-hours, general API traffic
//! against the hourly request quota) rather than as one blanket layer —
//! each site needs a different `UsageType` and a project id that's only
//! available once the route's path params are extracted. This helper just
//! centralizes the `QuotaRejection -> ApiError` mapping so every call site
//! produces the same 429 shape.

use db::models::billing::UsageType;
use services::billing::{BillingService, QuotaRejection};
use uuid::Uuid;

use crate::error::ApiError;

pub async fn enforce_quota(billing: &BillingService, project_id: Uuid, usage_type: UsageType) -> Result<(), ApiError> {
    match billing.check_quota(project_id, usage_type).await? {
        Some(rejection) => Err(quota_rejection_to_api_error(rejection)),
        None => Ok(()),
    }
}

fn quota_rejection_to_api_error(rejection: QuotaRejection) -> ApiError {
    let retry_after = match rejection {
        QuotaRejection::ApiRate => Some(3600),
        _ => None,
    };
    ApiError::RateLimited(rejection.reason().to_string(), retry_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_rate_rejection_carries_retry_after() {
        let err = quota_rejection_to_api_error(QuotaRejection::ApiRate);
        match err {
            ApiError::RateLimited(_, Some(secs)) => assert_eq!(secs, 3600),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn storage_rejection_has_no_retry_after() {
        let err = quota_rejection_to_api_error(QuotaRejection::Storage);
        match err {
            ApiError::RateLimited(_, None) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }
}

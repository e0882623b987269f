//! Active-learning candidate ranking and per-dataset completion stats.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use db::models::annotation::AnnotationSource;
use db::models::project_member::ProjectRole;
use db::repositories::{AnnotationRepository, DatasetItemRepository, DatasetRepository, MediaRepository};
use serde::Deserialize;
use services::active_learning::{ActiveLearningStats, ActiveLearningStrategy, Candidate, Suggestion, compute_stats, suggest};
use utils::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, middleware::AccessContext, state::AppState};

const CANDIDATE_PAGE_SIZE: i64 = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/datasets/{id}/suggestions", post(suggestions))
        .route("/datasets/{id}/stats", get(stats))
}

#[derive(Debug, Deserialize)]
struct SuggestionsRequest {
    #[serde(default = "default_strategy")]
    strategy: ActiveLearningStrategy,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    shuffle_seed: u64,
}

fn default_strategy() -> ActiveLearningStrategy {
    ActiveLearningStrategy::Uncertainty
}

fn default_limit() -> usize {
    20
}

async fn suggestions(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<SuggestionsRequest>,
) -> Result<Json<ApiResponse<Vec<Suggestion>>>, ApiError> {
    let dataset = DatasetRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("dataset"))?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Viewer).await?;

    let items = DatasetItemRepository::next_unannotated(&state.pool, id, CANDIDATE_PAGE_SIZE).await?;
    let mut candidates = Vec::with_capacity(items.len());
    for item in items {
        let Some(media) = MediaRepository::find_by_id(&state.pool, item.media_id).await? else { continue };
        candidates.push(Candidate {
            item_id: item.id.to_string(),
            media_id: media.id.to_string(),
            auto_tags: media.auto_tags.0,
            auto_caption: media.auto_caption,
        });
    }

    let suggestions = suggest(body.strategy, &candidates, body.limit, body.shuffle_seed);
    Ok(Json(ApiResponse::ok(suggestions)))
}

async fn stats(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ActiveLearningStats>>, ApiError> {
    let dataset = DatasetRepository::find_by_id(&state.pool, id).await?.ok_or(ApiError::NotFound("dataset"))?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Viewer).await?;

    let mut auto_annotations = 0i64;
    let mut manual_annotations = 0i64;
    let mut offset = 0;
    loop {
        let page = DatasetItemRepository::list_for_dataset(&state.pool, id, None, CANDIDATE_PAGE_SIZE, offset).await?;
        if page.is_empty() {
            break;
        }
        let page_len = page.len();
        for item in &page {
            if !item.is_annotated {
                continue;
            }
            for annotation in AnnotationRepository::list_for_item(&state.pool, item.id).await? {
                if annotation.source == AnnotationSource::Manual {
                    manual_annotations += 1;
                } else {
                    auto_annotations += 1;
                }
            }
        }
        if (page_len as i64) < CANDIDATE_PAGE_SIZE {
            break;
        }
        offset += CANDIDATE_PAGE_SIZE;
    }

    let stats = compute_stats(dataset.item_count, dataset.annotated_count, auto_annotations, manual_annotations);
    Ok(Json(ApiResponse::ok(stats)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_request_defaults_to_uncertainty_and_twenty() {
        let body: SuggestionsRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(body.strategy, ActiveLearningStrategy::Uncertainty);
        assert_eq!(body.limit, 20);
        assert_eq!(body.shuffle_seed, 0);
    }

    #[test]
    fn suggestions_request_honors_explicit_fields() {
        let body: SuggestionsRequest =
            serde_json::from_str(r#"{"strategy":"diversity","limit":5,"shuffle_seed":7}"#).unwrap();
        assert_eq!(body.strategy, ActiveLearningStrategy::Diversity);
        assert_eq!(body.limit, 5);
        assert_eq!(body.shuffle_seed, 7);
    }
}

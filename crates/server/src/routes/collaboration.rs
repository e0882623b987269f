//! WebSocket endpoints for the real-time collaboration fabric: one
//! project-scoped channel (presence, chat) and one item-scoped channel
//! (cursor/annotation/region-lock traffic), both backed by [`crate::collaboration::Hub`].

use axum::{
    Extension, Router,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use chrono::Utc;
use db::models::project_member::ProjectRole;
use db::repositories::UserRepository;
use futures::{SinkExt, StreamExt};
use tokio::time::timeout;
use uuid::Uuid;

use crate::{
    collaboration::{ClientMessage, ServerMessage, IDLE_TIMEOUT},
    error::ApiError,
    middleware::AccessContext,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_id}/collab/ws", get(project_ws))
        .route("/dataset-items/{item_id}/collab/ws", get(item_ws))
}

async fn project_ws(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(project_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    access.check_project_access(&state.pool, project_id, ProjectRole::Viewer).await?;
    let user = UserRepository::find_by_id(&state.pool, access.user_id).await?.ok_or(ApiError::NotFound("user"))?;

    Ok(ws.on_upgrade(move |socket| run_project_channel(state, socket, project_id, access.user_id, user.display_name)))
}

async fn run_project_channel(state: AppState, socket: WebSocket, project_id: Uuid, user_id: Uuid, user_name: String) {
    let mut rx = state.hub.connect_project(project_id, user_id, user_name);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            broadcasted = rx.recv() => {
                let Ok(message) = broadcasted else { break };
                let Ok(text) = serde_json::to_string(&message) else { continue };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = timeout(IDLE_TIMEOUT, receiver.next()) => {
                let Ok(Some(result)) = incoming else { break };
                match result {
                    Ok(Message::Text(text)) => {
                        let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else { continue };
                        if let ClientMessage::Chat { message } = client_msg {
                            state.hub.broadcast_project(
                                project_id,
                                ServerMessage::Chat { user_id, message, at: Utc::now() },
                                Some(user_id),
                            );
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
        }
    }

    state.hub.disconnect_project(project_id, user_id);
}

async fn item_ws(
    State(state): State<AppState>,
    Extension(access): Extension<AccessContext>,
    Path(item_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let item = db::repositories::DatasetItemRepository::find_by_id(&state.pool, item_id).await?.ok_or(ApiError::NotFound("dataset item"))?;
    let dataset = db::repositories::DatasetRepository::find_by_id(&state.pool, item.dataset_id).await?.ok_or(ApiError::NotFound("dataset"))?;
    access.check_project_access(&state.pool, dataset.project_id, ProjectRole::Viewer).await?;
    let user = UserRepository::find_by_id(&state.pool, access.user_id).await?.ok_or(ApiError::NotFound("user"))?;

    Ok(ws.on_upgrade(move |socket| run_item_channel(state, socket, item_id, access.user_id, user.display_name)))
}

async fn run_item_channel(state: AppState, socket: WebSocket, item_id: Uuid, user_id: Uuid, user_name: String) {
    let mut rx = state.hub.connect_item(item_id, user_id, user_name);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            broadcasted = rx.recv() => {
                let Ok(message) = broadcasted else { break };
                let Ok(text) = serde_json::to_string(&message) else { continue };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = timeout(IDLE_TIMEOUT, receiver.next()) => {
                let Ok(Some(result)) = incoming else { break };
                match result {
                    Ok(Message::Text(text)) => {
                        let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else { continue };
                        handle_item_message(&state, item_id, user_id, client_msg);
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
        }
    }

    state.hub.disconnect_item(item_id, user_id);
}

fn handle_item_message(state: &AppState, item_id: Uuid, user_id: Uuid, client_msg: ClientMessage) {
    let message = match client_msg {
        ClientMessage::CursorMove { x, y, item_id: moved_item } => {
            ServerMessage::CursorMove { user_id, x, y, item_id: moved_item }
        }
        ClientMessage::AnnotationUpdate { item_id: ann_item, annotation } => {
            ServerMessage::AnnotationUpdate { user_id, item_id: ann_item, annotation }
        }
        ClientMessage::AnnotationPreview { annotation } => ServerMessage::AnnotationPreview { user_id, annotation },
        ClientMessage::AnnotationCommitted { annotation } => ServerMessage::AnnotationCommitted { user_id, annotation },
        ClientMessage::RegionLock { region } => ServerMessage::RegionLock { user_id, region },
        ClientMessage::RegionUnlock { region } => ServerMessage::RegionUnlock { user_id, region },
        ClientMessage::Chat { message } => ServerMessage::Chat { user_id, message, at: Utc::now() },
        ClientMessage::Ping => ServerMessage::Pong,
    };
    state.hub.broadcast_item(item_id, message, Some(user_id));
}

//! Real-time collaboration fabric: two namespaces (project channel, item
//! channel), each a map of channel id to member id to a dedicated
//! broadcast sender, grounded on `multiplayer.rs`'s `DashMap<ChannelId,
//! DashMap<UserId, broadcast::Sender<ServerMessage>>>` pattern. A member's
//! sender is also their own receiver's source, so "send to just this
//! member" and "broadcast to the channel" are the same primitive.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use ts_rs::TS;
use uuid::Uuid;

/// Per-session receive idle timeout before the fabric reaps the connection,
/// per `SPEC_FULL.md` §5's suspension-point discipline.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CursorMove { x: f64, y: f64, item_id: Option<Uuid> },
    AnnotationUpdate { item_id: Uuid, annotation: Value },
    AnnotationPreview { annotation: Value },
    AnnotationCommitted { annotation: Value },
    RegionLock { region: Value },
    RegionUnlock { region: Value },
    Chat { message: String },
    Ping,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    UserJoined { user_id: Uuid, user_name: String },
    UserLeft { user_id: Uuid },
    UserList { users: Vec<(Uuid, String)> },
    AnnotatorJoined { user_id: Uuid, user_name: String },
    AnnotatorLeft { user_id: Uuid },
    AnnotatorList { users: Vec<(Uuid, String)> },
    IndexingProgress { media_id: Uuid, status: String },
    MediaUploaded { media_id: Uuid, filename: String },
    AutoCategorized { media_id: Uuid, tags: Vec<String> },
    CursorMove { user_id: Uuid, x: f64, y: f64, item_id: Option<Uuid> },
    AnnotationUpdate { user_id: Uuid, item_id: Uuid, annotation: Value },
    AnnotationPreview { user_id: Uuid, annotation: Value },
    AnnotationCommitted { user_id: Uuid, annotation: Value },
    RegionLock { user_id: Uuid, region: Value },
    RegionUnlock { user_id: Uuid, region: Value },
    Chat { user_id: Uuid, message: String, at: DateTime<Utc> },
    Pong,
}

type ChannelMembers = DashMap<Uuid, (String, broadcast::Sender<ServerMessage>)>;

/// Process-wide singleton holding both namespaces' membership maps.
#[derive(Default)]
pub struct Hub {
    project_channels: DashMap<Uuid, Arc<ChannelMembers>>,
    item_channels: DashMap<Uuid, Arc<ChannelMembers>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_project(&self, project_id: Uuid, user_id: Uuid, user_name: String) -> broadcast::Receiver<ServerMessage> {
        let members = self.project_channels.entry(project_id).or_insert_with(|| Arc::new(DashMap::new())).clone();
        connect(&members, user_id, user_name, ServerMessage::UserJoined { user_id, user_name: String::new() }, |snapshot| {
            ServerMessage::UserList { users: snapshot }
        })
    }

    pub fn disconnect_project(&self, project_id: Uuid, user_id: Uuid) {
        if let Some(members) = self.project_channels.get(&project_id) {
            disconnect(&members, user_id, ServerMessage::UserLeft { user_id });
        }
    }

    pub fn broadcast_project(&self, project_id: Uuid, message: ServerMessage, exclude: Option<Uuid>) {
        if let Some(members) = self.project_channels.get(&project_id) {
            broadcast_to(&members, message, exclude);
        }
    }

    pub fn connect_item(&self, item_id: Uuid, user_id: Uuid, user_name: String) -> broadcast::Receiver<ServerMessage> {
        let members = self.item_channels.entry(item_id).or_insert_with(|| Arc::new(DashMap::new())).clone();
        connect(&members, user_id, user_name, ServerMessage::AnnotatorJoined { user_id, user_name: String::new() }, |snapshot| {
            ServerMessage::AnnotatorList { users: snapshot }
        })
    }

    pub fn disconnect_item(&self, item_id: Uuid, user_id: Uuid) {
        if let Some(members) = self.item_channels.get(&item_id) {
            disconnect(&members, user_id, ServerMessage::AnnotatorLeft { user_id });
        }
    }

    pub fn broadcast_item(&self, item_id: Uuid, message: ServerMessage, exclude: Option<Uuid>) {
        if let Some(members) = self.item_channels.get(&item_id) {
            broadcast_to(&members, message, exclude);
        }
    }
}

/// Registers `user_id` in `members`, announces it to the existing members
/// (the announcement carries the real `user_name`, the placeholder in
/// `joined_template` is discarded), then delivers a snapshot of everyone
/// who was already present to the new member alone.
fn connect(
    members: &ChannelMembers,
    user_id: Uuid,
    user_name: String,
    joined_template: ServerMessage,
    snapshot_fn: impl FnOnce(Vec<(Uuid, String)>) -> ServerMessage,
) -> broadcast::Receiver<ServerMessage> {
    let snapshot: Vec<(Uuid, String)> = members.iter().map(|e| (*e.key(), e.value().0.clone())).collect();

    let joined = match joined_template {
        ServerMessage::UserJoined { .. } => ServerMessage::UserJoined { user_id, user_name: user_name.clone() },
        ServerMessage::AnnotatorJoined { .. } => ServerMessage::AnnotatorJoined { user_id, user_name: user_name.clone() },
        other => other,
    };
    broadcast_to(members, joined, Some(user_id));

    let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
    members.insert(user_id, (user_name, tx.clone()));
    let _ = tx.send(snapshot_fn(snapshot));
    rx
}

fn disconnect(members: &ChannelMembers, user_id: Uuid, left_message: ServerMessage) {
    if members.remove(&user_id).is_none() {
        return;
    }
    broadcast_to(members, left_message, None);
}

/// Iterates current members, sending `message` to each one's own channel;
/// a send failure (receiver dropped) removes that member, since a closed
/// receiver means the session already disconnected.
fn broadcast_to(members: &ChannelMembers, message: ServerMessage, exclude: Option<Uuid>) {
    let mut dead = Vec::new();
    for entry in members.iter() {
        let member_id = *entry.key();
        if Some(member_id) == exclude {
            continue;
        }
        if entry.value().1.send(message.clone()).is_err() {
            dead.push(member_id);
        }
    }
    for id in dead {
        members.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connecting_announces_join_and_snapshots_existing_members() {
        let hub = Hub::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let project = Uuid::new_v4();

        let mut alice_rx = hub.connect_project(project, alice, "alice".to_string());
        let mut bob_rx = hub.connect_project(project, bob, "bob".to_string());

        match alice_rx.try_recv().unwrap() {
            ServerMessage::UserJoined { user_id, user_name } => {
                assert_eq!(user_id, bob);
                assert_eq!(user_name, "bob");
            }
            other => panic!("unexpected message: {other:?}"),
        }

        match bob_rx.try_recv().unwrap() {
            ServerMessage::UserList { users } => assert_eq!(users, vec![(alice, "alice".to_string())]),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn disconnect_is_idempotent_for_unknown_member() {
        let hub = Hub::new();
        hub.disconnect_project(Uuid::new_v4(), Uuid::new_v4());
    }

    #[test]
    fn broadcast_excludes_the_sender() {
        let hub = Hub::new();
        let project = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut alice_rx = hub.connect_project(project, alice, "alice".to_string());
        let mut bob_rx = hub.connect_project(project, bob, "bob".to_string());
        let _ = alice_rx.try_recv();
        let _ = bob_rx.try_recv();

        hub.broadcast_project(project, ServerMessage::Chat { user_id: alice, message: "hi".to_string(), at: Utc::now() }, Some(alice));

        assert!(alice_rx.try_recv().is_err());
        assert!(bob_rx.try_recv().is_ok());
    }
}

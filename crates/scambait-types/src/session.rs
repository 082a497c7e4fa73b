//! Session, message, and intelligence-event domain types.
//!
//! A session is one persistent conversation thread with a scammer,
//! identified by a stable id and spanning one or more turns. Intelligence
//! events are durable write-once facts (a detection, an engagement failure)
//! that the learning index queries across sessions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntitySet;

/// Lifecycle status of a session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(format!("invalid session status: '{other}'")),
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Active
    }
}

/// Role of a stored message.
///
/// The scammer speaks as `user`; the honeypot persona replies as
/// `assistant`. Only `user` messages are ever embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// One turn of the in-memory conversation transcript as the orchestrator
/// tracks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub message: String,
    #[serde(default)]
    pub turn_number: u32,
    /// Set once the turn has been embedded; prevents re-embedding on the
    /// next persistence call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Speaker of a conversation turn, in orchestrator vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Scammer,
    Honeypot,
}

impl TurnRole {
    /// Map orchestrator vocabulary onto storage roles.
    pub fn message_role(self) -> MessageRole {
        match self {
            TurnRole::Scammer => MessageRole::User,
            TurnRole::Honeypot => MessageRole::Assistant,
        }
    }
}

/// Kind of a durable intelligence event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ScamDetected,
    EngagementFailure,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::ScamDetected => write!(f, "scam_detected"),
            EventType::EngagementFailure => write!(f, "engagement_failure"),
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scam_detected" => Ok(EventType::ScamDetected),
            "engagement_failure" => Ok(EventType::EngagementFailure),
            other => Err(format!("invalid event type: '{other}'")),
        }
    }
}

/// A durable, independently queryable fact about a session.
///
/// Append-only, write-once. The embedding, when present, corresponds to the
/// exact summary text embedded at write time; embeddings are never
/// regenerated for existing rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelligenceEvent {
    pub id: Uuid,
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub event_type: EventType,
    pub scam_type: Option<String>,
    pub summary: String,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// One message as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// What `load_memory` returns: everything the orchestrator needs to resume
/// a conversation.
///
/// "No memory yet" is a normal state: a missing session yields the default
/// (empty) snapshot, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub prior_messages: Vec<SnapshotMessage>,
    pub prior_entities: EntitySet,
    pub scam_type: Option<String>,
    pub persona_name: Option<String>,
    #[serde(default)]
    pub persona_traits: serde_json::Map<String, serde_json::Value>,
    pub persona_context: Option<String>,
    #[serde(default)]
    pub conversation_summary: String,
    #[serde(default)]
    pub engagement_count: u32,
    #[serde(default)]
    pub engagement_complete: bool,
    #[serde(default)]
    pub scam_detected: bool,
    #[serde(default)]
    pub extraction_complete: bool,
}

/// The authoritative turn state the orchestrator hands to `persist`.
///
/// The stored message list is replaced wholesale from
/// `conversation_history` each call, so the database always matches this
/// transcript exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnState {
    #[serde(default)]
    pub original_message: String,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    #[serde(default)]
    pub extracted_entities: EntitySet,
    #[serde(default)]
    pub scam_detected: bool,
    pub scam_type: Option<String>,
    pub persona_name: Option<String>,
    #[serde(default)]
    pub persona_traits: serde_json::Map<String, serde_json::Value>,
    pub persona_context: Option<String>,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub engagement_count: u32,
    #[serde(default)]
    pub engagement_complete: bool,
    #[serde(default)]
    pub extraction_complete: bool,
    #[serde(default)]
    pub conversation_summary: String,
}

impl TurnState {
    /// The metadata blob persisted onto the session row.
    ///
    /// Keys present here overwrite the stored values; keys a turn does not
    /// write are preserved by the store's shallow merge. Empty optional
    /// fields are therefore omitted entirely -- a turn that only updates
    /// entities must not clobber persona data written by an earlier turn.
    pub fn metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut meta = serde_json::Map::new();
        if let Some(name) = &self.persona_name {
            meta.insert("persona_name".into(), name.clone().into());
        }
        if let Some(context) = &self.persona_context {
            meta.insert("persona_context".into(), context.clone().into());
        }
        if !self.persona_traits.is_empty() {
            meta.insert(
                "persona_traits".into(),
                serde_json::Value::Object(self.persona_traits.clone()),
            );
        }
        if !self.extracted_entities.is_empty() {
            if let Ok(entities) = serde_json::to_value(&self.extracted_entities) {
                meta.insert("extracted_entities".into(), entities);
            }
        }
        if let Some(scam_type) = &self.scam_type {
            meta.insert("scam_type".into(), scam_type.clone().into());
        }
        if !self.conversation_summary.is_empty() {
            meta.insert("summary".into(), self.conversation_summary.clone().into());
        }
        meta.insert("engagement_count".into(), self.engagement_count.into());
        meta.insert("engagement_complete".into(), self.engagement_complete.into());
        meta.insert("scam_detected".into(), self.scam_detected.into());
        meta.insert("extraction_complete".into(), self.extraction_complete.into());
        meta
    }
}

impl SessionSnapshot {
    /// Rebuild a snapshot from a stored metadata blob plus the message
    /// list read back from the store.
    ///
    /// Tolerant of missing or malformed keys: anything unusable falls back
    /// to its default rather than erroring.
    pub fn from_metadata(
        meta: &serde_json::Map<String, serde_json::Value>,
        scam_type: Option<String>,
        prior_messages: Vec<SnapshotMessage>,
    ) -> Self {
        let prior_entities = meta
            .get("extracted_entities")
            .and_then(|v| serde_json::from_value::<EntitySet>(v.clone()).ok())
            .unwrap_or_default();

        // Older writers stored persona_context as an object; the
        // orchestrator expects a string either way.
        let persona_context = meta.get("persona_context").and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => serde_json::to_string(v).ok(),
            _ => None,
        });

        let persona_traits = meta
            .get("persona_traits")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        Self {
            prior_messages,
            prior_entities,
            scam_type: scam_type.or_else(|| string_key(meta, "scam_type")),
            persona_name: string_key(meta, "persona_name"),
            persona_traits,
            persona_context,
            conversation_summary: string_key(meta, "summary").unwrap_or_default(),
            engagement_count: meta
                .get("engagement_count")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
            engagement_complete: bool_key(meta, "engagement_complete"),
            scam_detected: bool_key(meta, "scam_detected"),
            extraction_complete: bool_key(meta, "extraction_complete"),
        }
    }
}

fn string_key(meta: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    meta.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn bool_key(meta: &serde_json::Map<String, serde_json::Value>, key: &str) -> bool {
    meta.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

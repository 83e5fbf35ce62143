use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a review session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Closed => "closed",
        }
    }
}

/// One browser page-visit being annotated.
///
/// Immutable once created except `status` and `updated_at`. The id is
/// unique for the process lifetime; everything outside the store refers
/// to sessions by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// The page this session observes.
    pub url: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optional correlation tag supplied by the reviewer UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// A session joined with every annotation that belongs to it. Serialized
/// flat, so the wire shape is the session object with an `annotations`
/// array alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWithAnnotations {
    #[serde(flatten)]
    pub session: Session,
    pub annotations: Vec<crate::Annotation>,
}

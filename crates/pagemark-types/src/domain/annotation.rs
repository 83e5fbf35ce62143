use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who performed an action: the reviewer in the browser or the coding
/// agent behind the tool channel. Doubles as the thread message role and
/// the `resolvedBy` stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Human,
    Agent,
}

/// Annotation lifecycle.
///
/// `pending` is the initial state; `resolved` and `dismissed` are
/// terminal. The store records transitions without judging them (last
/// write wins), so the variants carry no ordering of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStatus {
    Pending,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AnnotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationStatus::Pending => "pending",
            AnnotationStatus::Acknowledged => "acknowledged",
            AnnotationStatus::Resolved => "resolved",
            AnnotationStatus::Dismissed => "dismissed",
        }
    }

    /// True once the annotation has been resolved or dismissed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnnotationStatus::Resolved | AnnotationStatus::Dismissed)
    }
}

/// One message in an annotation's conversation thread.
///
/// Immutable once appended; thread order is insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessage {
    pub id: String,
    pub role: Actor,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One piece of structured feedback tied to a DOM element within a
/// session.
///
/// `comment`, `element`, and `element_path` identify what and where the
/// feedback applies and are required at creation. The remaining context
/// fields are captured by the reviewer UI and passed through unmodified;
/// the store never interprets them (hence `Value` where the UI sends
/// non-string shapes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,
    /// Owning session; guaranteed to have existed when the annotation was
    /// created.
    pub session_id: String,
    pub comment: String,
    pub element: String,
    pub element_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearby_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub react_components: Option<Value>,
    pub status: AnnotationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<Actor>,
    /// Append-only conversation attached to this annotation.
    #[serde(default)]
    pub thread: Vec<ThreadMessage>,
}

/// Creation payload for an annotation, as posted by the reviewer UI.
///
/// The required fields use `#[serde(default)]` so a missing field
/// surfaces as an empty string; validation then reports every missing
/// field at once instead of stopping at the first serde error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnotation {
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub element: String,
    #[serde(default)]
    pub element_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearby_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub react_components: Option<Value>,
}

impl NewAnnotation {
    /// Wire names of required fields that are absent or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.comment.trim().is_empty() {
            missing.push("comment");
        }
        if self.element.trim().is_empty() {
            missing.push("element");
        }
        if self.element_path.trim().is_empty() {
            missing.push("elementPath");
        }
        missing
    }
}

/// Partial update for an annotation. Every field is optional; absent
/// fields are left untouched. Identity fields (`id`, `session_id`,
/// `created_at`) and the thread are not patchable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPatch {
    pub comment: Option<String>,
    pub element: Option<String>,
    pub element_path: Option<String>,
    pub url: Option<String>,
    pub intent: Option<String>,
    pub severity: Option<String>,
    pub timestamp: Option<Value>,
    pub nearby_text: Option<String>,
    pub react_components: Option<Value>,
    pub status: Option<AnnotationStatus>,
    pub resolved_by: Option<Actor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&AnnotationStatus::Acknowledged).unwrap(),
            "\"acknowledged\""
        );
        assert_eq!(serde_json::to_string(&Actor::Agent).unwrap(), "\"agent\"");
    }

    #[test]
    fn new_annotation_reports_every_missing_field() {
        let payload: NewAnnotation = serde_json::from_str("{}").unwrap();
        assert_eq!(
            payload.missing_fields(),
            vec!["comment", "element", "elementPath"]
        );

        let payload: NewAnnotation =
            serde_json::from_str(r#"{"comment":"fix button","element":"<button>"}"#).unwrap();
        assert_eq!(payload.missing_fields(), vec!["elementPath"]);
    }

    #[test]
    fn annotation_wire_names_are_camel_case() {
        let raw = r#"{
            "comment": "fix button",
            "element": "<button>",
            "elementPath": "/div/button",
            "nearbyText": "Submit",
            "reactComponents": ["SubmitButton"]
        }"#;
        let payload: NewAnnotation = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.element_path, "/div/button");
        assert_eq!(payload.nearby_text.as_deref(), Some("Submit"));
        assert!(payload.react_components.is_some());
    }
}

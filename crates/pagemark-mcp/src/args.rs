//! Tool argument types.
//!
//! Each struct doubles as the serde target for `tools/call` arguments and
//! the source of the advertised input schema (via `schemars`), so the
//! schema the agent sees and the validation that runs are one definition.

use schemars::JsonSchema;
use serde::Deserialize;

/// Fetch one session together with all of its annotations.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetSessionArgs {
    /// Id of the session, as returned by pagemark_list_sessions.
    pub session_id: String,
}

/// List the annotations in a session that still await the agent.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetPendingArgs {
    /// Id of the session to check for pending feedback.
    pub session_id: String,
}

/// Mark an annotation as seen without addressing it yet.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeArgs {
    /// Id of the annotation to acknowledge.
    pub annotation_id: String,
}

/// Mark an annotation as resolved by the agent.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveArgs {
    /// Id of the annotation to resolve.
    pub annotation_id: String,
    /// Optional note describing what was done; recorded on the
    /// annotation's thread as "Resolved: {summary}".
    pub summary: Option<String>,
}

/// Decline an annotation, with a reason the reviewer will see.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DismissArgs {
    /// Id of the annotation to dismiss.
    pub annotation_id: String,
    /// Why the feedback is not being addressed; recorded on the
    /// annotation's thread as "Dismissed: {reason}".
    pub reason: String,
}

/// Post a message on an annotation's thread as the agent.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyArgs {
    /// Id of the annotation to reply on.
    pub annotation_id: String,
    /// Message content to append.
    pub message: String,
}

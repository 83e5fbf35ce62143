//! The authoritative record of review sessions and annotations.
//!
//! Both protocol adapters (HTTP for the browser reviewer, MCP for the
//! agent runtime) hold a clone of one [`Store`] and see each other's
//! writes immediately. All lifecycle logic lives here; adapters only
//! validate input and map errors onto their protocol.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use pagemark_types::{
    Actor, Annotation, AnnotationPatch, AnnotationStatus, Error, NewAnnotation, Result, Session,
    SessionStatus, SessionWithAnnotations, ThreadMessage,
};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    annotations: HashMap<String, Annotation>,
    // Insertion order for deterministic listings. The maps stay the
    // lookup path; these only drive iteration order.
    session_order: Vec<String>,
    annotation_order: Vec<String>,
}

/// Process-wide session/annotation store.
///
/// Cheap to clone; clones share one set of collections behind a single
/// mutex. Every operation locks, completes without suspending, and
/// returns owned copies, so no caller ever holds a reference into the
/// maps and a write that has returned is visible to every subsequent
/// read from either adapter.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    // ==========================================
    // Sessions
    // ==========================================

    pub fn create_session(&self, url: &str, project_id: Option<String>) -> Result<Session> {
        if url.trim().is_empty() {
            return Err(Error::invalid_input("url is required"));
        }

        let now = Utc::now();
        let session = Session {
            id: new_id(),
            url: url.to_string(),
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
            project_id,
        };

        let mut inner = self.lock();
        inner.session_order.push(session.id.clone());
        inner.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    pub fn get_session(&self, id: &str) -> Result<Session> {
        self.lock()
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("session {}", id)))
    }

    /// The session together with every annotation pointing at it, in
    /// creation order.
    pub fn get_session_with_annotations(&self, id: &str) -> Result<SessionWithAnnotations> {
        let inner = self.lock();
        let session = inner
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("session {}", id)))?;
        let annotations = inner
            .annotation_order
            .iter()
            .filter_map(|aid| inner.annotations.get(aid))
            .filter(|a| a.session_id == id)
            .cloned()
            .collect();
        Ok(SessionWithAnnotations {
            session,
            annotations,
        })
    }

    /// All sessions, in creation order.
    pub fn list_sessions(&self) -> Vec<Session> {
        let inner = self.lock();
        inner
            .session_order
            .iter()
            .filter_map(|id| inner.sessions.get(id))
            .cloned()
            .collect()
    }

    pub fn update_session_status(&self, id: &str, status: SessionStatus) -> Result<Session> {
        let mut inner = self.lock();
        let session = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("session {}", id)))?;
        session.status = status;
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    // ==========================================
    // Annotations
    // ==========================================

    pub fn add_annotation(&self, session_id: &str, new: NewAnnotation) -> Result<Annotation> {
        let missing = new.missing_fields();
        if !missing.is_empty() {
            return Err(Error::invalid_input(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let mut inner = self.lock();
        if !inner.sessions.contains_key(session_id) {
            return Err(Error::not_found(format!("session {}", session_id)));
        }

        let now = Utc::now();
        let annotation = Annotation {
            id: new_id(),
            session_id: session_id.to_string(),
            comment: new.comment,
            element: new.element,
            element_path: new.element_path,
            url: new.url,
            intent: new.intent,
            severity: new.severity,
            timestamp: new.timestamp,
            nearby_text: new.nearby_text,
            react_components: new.react_components,
            status: AnnotationStatus::Pending,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            resolved_by: None,
            thread: Vec::new(),
        };

        inner.annotation_order.push(annotation.id.clone());
        inner
            .annotations
            .insert(annotation.id.clone(), annotation.clone());
        Ok(annotation)
    }

    pub fn get_annotation(&self, id: &str) -> Result<Annotation> {
        self.lock()
            .annotations
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("annotation {}", id)))
    }

    /// Record a status change. The store does not police the transition
    /// graph (last write wins); entering `resolved` or `dismissed` stamps
    /// `resolved_at` and `resolved_by`, the latter defaulting to the
    /// agent.
    pub fn update_annotation_status(
        &self,
        id: &str,
        status: AnnotationStatus,
        resolved_by: Option<Actor>,
    ) -> Result<Annotation> {
        let mut inner = self.lock();
        let annotation = inner
            .annotations
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("annotation {}", id)))?;

        annotation.status = status;
        annotation.updated_at = Utc::now();
        if status.is_terminal() {
            annotation.resolved_at = Some(annotation.updated_at);
            annotation.resolved_by = Some(resolved_by.unwrap_or(Actor::Agent));
        }
        Ok(annotation.clone())
    }

    /// Merge a partial update into an annotation. Absent fields are left
    /// untouched; identity fields and the thread are not reachable from a
    /// patch. A status set through here is recorded as-is, without the
    /// resolution stamping that `update_annotation_status` performs.
    pub fn patch_annotation(&self, id: &str, patch: AnnotationPatch) -> Result<Annotation> {
        let mut inner = self.lock();
        let annotation = inner
            .annotations
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("annotation {}", id)))?;

        if let Some(comment) = patch.comment {
            annotation.comment = comment;
        }
        if let Some(element) = patch.element {
            annotation.element = element;
        }
        if let Some(element_path) = patch.element_path {
            annotation.element_path = element_path;
        }
        if let Some(url) = patch.url {
            annotation.url = Some(url);
        }
        if let Some(intent) = patch.intent {
            annotation.intent = Some(intent);
        }
        if let Some(severity) = patch.severity {
            annotation.severity = Some(severity);
        }
        if let Some(timestamp) = patch.timestamp {
            annotation.timestamp = Some(timestamp);
        }
        if let Some(nearby_text) = patch.nearby_text {
            annotation.nearby_text = Some(nearby_text);
        }
        if let Some(react_components) = patch.react_components {
            annotation.react_components = Some(react_components);
        }
        if let Some(status) = patch.status {
            annotation.status = status;
        }
        if let Some(resolved_by) = patch.resolved_by {
            annotation.resolved_by = Some(resolved_by);
        }
        annotation.updated_at = Utc::now();
        Ok(annotation.clone())
    }

    pub fn append_thread_message(
        &self,
        annotation_id: &str,
        role: Actor,
        content: &str,
    ) -> Result<Annotation> {
        if content.trim().is_empty() {
            return Err(Error::invalid_input("content is required"));
        }

        let mut inner = self.lock();
        let annotation = inner
            .annotations
            .get_mut(annotation_id)
            .ok_or_else(|| Error::not_found(format!("annotation {}", annotation_id)))?;

        let now = Utc::now();
        annotation.thread.push(ThreadMessage {
            id: new_id(),
            role,
            content: content.to_string(),
            timestamp: now,
        });
        annotation.updated_at = now;
        Ok(annotation.clone())
    }

    /// The `pending`-status subset of a session's annotations, in
    /// creation order. Empty when the session has none (or is unknown).
    pub fn pending_annotations(&self, session_id: &str) -> Vec<Annotation> {
        let inner = self.lock();
        inner
            .annotation_order
            .iter()
            .filter_map(|id| inner.annotations.get(id))
            .filter(|a| a.session_id == session_id && a.status == AnnotationStatus::Pending)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation_input(comment: &str) -> NewAnnotation {
        NewAnnotation {
            comment: comment.to_string(),
            element: "<button>".to_string(),
            element_path: "/div/button".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn created_sessions_are_active_with_unique_ids() {
        let store = Store::new();
        let a = store.create_session("http://x", None).unwrap();
        let b = store.create_session("http://y", Some("proj".into())).unwrap();

        assert_eq!(a.status, SessionStatus::Active);
        assert_eq!(b.status, SessionStatus::Active);
        assert_ne!(a.id, b.id);
        assert_eq!(b.project_id.as_deref(), Some("proj"));
    }

    #[test]
    fn create_session_rejects_empty_url() {
        let store = Store::new();
        let err = store.create_session("", None).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(store.list_sessions().is_empty());
    }

    #[test]
    fn session_round_trips_by_id() {
        let store = Store::new();
        let created = store.create_session("http://x", None).unwrap();
        let fetched = store.get_session(&created.id).unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.url, created.url);
        assert_eq!(fetched.status, created.status);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[test]
    fn get_session_reports_not_found() {
        let store = Store::new();
        assert!(matches!(
            store.get_session("nope"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn list_sessions_preserves_creation_order() {
        let store = Store::new();
        let ids: Vec<String> = (0..5)
            .map(|i| {
                store
                    .create_session(&format!("http://page/{}", i), None)
                    .unwrap()
                    .id
            })
            .collect();
        let listed: Vec<String> = store.list_sessions().into_iter().map(|s| s.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn update_session_status_refreshes_updated_at() {
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();
        let closed = store
            .update_session_status(&session.id, SessionStatus::Closed)
            .unwrap();

        assert_eq!(closed.status, SessionStatus::Closed);
        assert!(closed.updated_at >= session.updated_at);
        assert_eq!(closed.created_at, session.created_at);
    }

    #[test]
    fn annotations_start_pending() {
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();
        let annotation = store
            .add_annotation(&session.id, annotation_input("fix button"))
            .unwrap();

        assert_eq!(annotation.status, AnnotationStatus::Pending);
        assert_eq!(annotation.session_id, session.id);
        assert!(annotation.thread.is_empty());
        assert!(annotation.resolved_at.is_none());
    }

    #[test]
    fn add_annotation_to_unknown_session_creates_nothing() {
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();

        let err = store
            .add_annotation("missing", annotation_input("fix"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(store
            .get_session_with_annotations(&session.id)
            .unwrap()
            .annotations
            .is_empty());
    }

    #[test]
    fn add_annotation_lists_all_missing_fields() {
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();

        let err = store
            .add_annotation(&session.id, NewAnnotation::default())
            .unwrap_err();
        match err {
            Error::InvalidInput(msg) => {
                assert_eq!(msg, "Missing required fields: comment, element, elementPath")
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn resolving_stamps_resolved_at_and_by() {
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();
        let annotation = store
            .add_annotation(&session.id, annotation_input("fix"))
            .unwrap();

        let resolved = store
            .update_annotation_status(&annotation.id, AnnotationStatus::Resolved, None)
            .unwrap();
        assert_eq!(resolved.status, AnnotationStatus::Resolved);
        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.resolved_by, Some(Actor::Agent));
    }

    #[test]
    fn dismissing_by_human_records_the_actor() {
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();
        let annotation = store
            .add_annotation(&session.id, annotation_input("fix"))
            .unwrap();

        let dismissed = store
            .update_annotation_status(
                &annotation.id,
                AnnotationStatus::Dismissed,
                Some(Actor::Human),
            )
            .unwrap();
        assert_eq!(dismissed.resolved_by, Some(Actor::Human));
    }

    #[test]
    fn acknowledging_does_not_stamp_resolution() {
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();
        let annotation = store
            .add_annotation(&session.id, annotation_input("fix"))
            .unwrap();

        let acked = store
            .update_annotation_status(&annotation.id, AnnotationStatus::Acknowledged, None)
            .unwrap();
        assert_eq!(acked.status, AnnotationStatus::Acknowledged);
        assert!(acked.resolved_at.is_none());
        assert!(acked.resolved_by.is_none());
    }

    #[test]
    fn status_writes_are_permissive_and_never_corrupt() {
        // Last write wins, even for transitions the lifecycle does not
        // define; earlier resolution stamps survive.
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();
        let annotation = store
            .add_annotation(&session.id, annotation_input("fix"))
            .unwrap();

        store
            .update_annotation_status(&annotation.id, AnnotationStatus::Resolved, None)
            .unwrap();
        let reopened = store
            .update_annotation_status(&annotation.id, AnnotationStatus::Pending, None)
            .unwrap();

        assert_eq!(reopened.status, AnnotationStatus::Pending);
        assert!(reopened.resolved_at.is_some());
        assert_eq!(reopened.comment, "fix");
    }

    #[test]
    fn patch_merges_subset_and_keeps_identity() {
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();
        let annotation = store
            .add_annotation(&session.id, annotation_input("fix"))
            .unwrap();

        let patched = store
            .patch_annotation(
                &annotation.id,
                AnnotationPatch {
                    comment: Some("fix it properly".to_string()),
                    severity: Some("high".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(patched.comment, "fix it properly");
        assert_eq!(patched.severity.as_deref(), Some("high"));
        assert_eq!(patched.element, annotation.element);
        assert_eq!(patched.id, annotation.id);
        assert_eq!(patched.session_id, annotation.session_id);
        assert_eq!(patched.created_at, annotation.created_at);
        assert!(patched.updated_at >= annotation.updated_at);
    }

    #[test]
    fn thread_appends_in_exact_call_order() {
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();
        let annotation = store
            .add_annotation(&session.id, annotation_input("fix"))
            .unwrap();

        for i in 0..4 {
            let role = if i % 2 == 0 { Actor::Agent } else { Actor::Human };
            store
                .append_thread_message(&annotation.id, role, &format!("message {}", i))
                .unwrap();
        }

        let thread = store.get_annotation(&annotation.id).unwrap().thread;
        assert_eq!(thread.len(), 4);
        let contents: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["message 0", "message 1", "message 2", "message 3"]);
        assert_eq!(thread[0].role, Actor::Agent);
        assert_eq!(thread[1].role, Actor::Human);
    }

    #[test]
    fn pending_returns_exactly_the_pending_subset() {
        let store = Store::new();
        let session = store.create_session("http://x", None).unwrap();
        let other = store.create_session("http://y", None).unwrap();

        let keep = store
            .add_annotation(&session.id, annotation_input("keep"))
            .unwrap();
        let resolve = store
            .add_annotation(&session.id, annotation_input("resolve"))
            .unwrap();
        store
            .add_annotation(&other.id, annotation_input("elsewhere"))
            .unwrap();

        store
            .update_annotation_status(&resolve.id, AnnotationStatus::Resolved, None)
            .unwrap();

        let pending = store.pending_annotations(&session.id);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, keep.id);

        assert!(store.pending_annotations("unknown").is_empty());
    }

    #[test]
    fn writes_from_one_handle_are_visible_through_another() {
        // Both adapters hold clones of the same store; a returned write
        // must be observable through any clone.
        let store = Store::new();
        let other_handle = store.clone();

        let session = store.create_session("http://x", None).unwrap();
        store
            .add_annotation(&session.id, annotation_input("fix"))
            .unwrap();

        assert_eq!(other_handle.pending_annotations(&session.id).len(), 1);
    }
}

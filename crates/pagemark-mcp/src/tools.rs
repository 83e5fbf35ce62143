//! MCP tool handlers.
//!
//! Thin translation from validated arguments to store operations. Every
//! handler returns the affected entity as a JSON value; argument-shape
//! problems are rejected here before any store mutation happens.

use serde_json::Value;

use pagemark_store::Store;
use pagemark_types::{Actor, AnnotationStatus, Error, Result};

use crate::args::{
    AcknowledgeArgs, DismissArgs, GetPendingArgs, GetSessionArgs, ReplyArgs, ResolveArgs,
};

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::Internal(anyhow::anyhow!("serialization failed: {}", e)))
}

pub fn handle_list_sessions(store: &Store) -> Result<Value> {
    to_value(&store.list_sessions())
}

pub fn handle_get_session(store: &Store, args: GetSessionArgs) -> Result<Value> {
    let session = store.get_session_with_annotations(&args.session_id)?;
    to_value(&session)
}

pub fn handle_get_pending(store: &Store, args: GetPendingArgs) -> Result<Value> {
    to_value(&store.pending_annotations(&args.session_id))
}

pub fn handle_acknowledge(store: &Store, args: AcknowledgeArgs) -> Result<Value> {
    let annotation =
        store.update_annotation_status(&args.annotation_id, AnnotationStatus::Acknowledged, None)?;
    to_value(&annotation)
}

pub fn handle_resolve(store: &Store, args: ResolveArgs) -> Result<Value> {
    let mut annotation = store.update_annotation_status(
        &args.annotation_id,
        AnnotationStatus::Resolved,
        Some(Actor::Agent),
    )?;
    if let Some(summary) = args.summary.as_deref() {
        if !summary.trim().is_empty() {
            annotation = store.append_thread_message(
                &args.annotation_id,
                Actor::Agent,
                &format!("Resolved: {}", summary),
            )?;
        }
    }
    to_value(&annotation)
}

pub fn handle_dismiss(store: &Store, args: DismissArgs) -> Result<Value> {
    if args.reason.trim().is_empty() {
        return Err(Error::invalid_input("reason must not be empty"));
    }
    store.update_annotation_status(
        &args.annotation_id,
        AnnotationStatus::Dismissed,
        Some(Actor::Agent),
    )?;
    let annotation = store.append_thread_message(
        &args.annotation_id,
        Actor::Agent,
        &format!("Dismissed: {}", args.reason),
    )?;
    to_value(&annotation)
}

pub fn handle_reply(store: &Store, args: ReplyArgs) -> Result<Value> {
    if args.message.trim().is_empty() {
        return Err(Error::invalid_input("message must not be empty"));
    }
    let annotation =
        store.append_thread_message(&args.annotation_id, Actor::Agent, &args.message)?;
    to_value(&annotation)
}

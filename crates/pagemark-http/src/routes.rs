//! Route table and per-route handlers.

use serde::Deserialize;
use serde_json::json;

use pagemark_store::Store;
use pagemark_types::{Actor, AnnotationPatch, Error, NewAnnotation, SessionStatus};

use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionBody {
    #[serde(default)]
    url: String,
    #[serde(default)]
    project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateSessionBody {
    #[serde(default)]
    status: Option<SessionStatus>,
}

#[derive(Debug, Deserialize)]
struct ThreadPostBody {
    #[serde(default)]
    content: String,
    #[serde(default)]
    role: Option<Actor>,
}

pub(crate) fn route(store: &Store, req: &Request) -> Response {
    // CORS preflight, any path.
    if req.method == "OPTIONS" {
        return Response::no_content();
    }

    let segments: Vec<&str> = req.path.split('/').filter(|s| !s.is_empty()).collect();

    match (req.method.as_str(), segments.as_slice()) {
        ("GET", ["health"]) => Response::json(200, &json!({ "status": "ok" })),

        ("POST", ["sessions"]) => create_session(store, req),
        ("GET", ["sessions"]) => Response::json(200, &store.list_sessions()),
        ("GET", ["sessions", id]) => match store.get_session_with_annotations(id) {
            Ok(session) => Response::json(200, &session),
            Err(err) => store_error(err),
        },
        ("PATCH", ["sessions", id]) => update_session(store, req, id),
        ("POST", ["sessions", id, "annotations"]) => add_annotation(store, req, id),

        ("GET", ["annotations", id]) => match store.get_annotation(id) {
            Ok(annotation) => Response::json(200, &annotation),
            Err(err) => store_error(err),
        },
        ("PATCH", ["annotations", id]) => patch_annotation(store, req, id),
        ("POST", ["annotations", id, "thread"]) => post_thread_message(store, req, id),

        _ => Response::error(404, "Not found"),
    }
}

fn create_session(store: &Store, req: &Request) -> Response {
    let body: CreateSessionBody = match parse_body(req) {
        Ok(body) => body,
        Err(response) => return response,
    };
    if body.url.trim().is_empty() {
        return Response::error(400, "Missing required fields: url");
    }
    match store.create_session(&body.url, body.project_id) {
        Ok(session) => Response::json(201, &session),
        Err(err) => store_error(err),
    }
}

fn update_session(store: &Store, req: &Request, id: &str) -> Response {
    let body: UpdateSessionBody = match parse_body(req) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(status) = body.status else {
        return Response::error(400, "Missing required fields: status");
    };
    match store.update_session_status(id, status) {
        Ok(session) => Response::json(200, &session),
        Err(err) => store_error(err),
    }
}

fn add_annotation(store: &Store, req: &Request, session_id: &str) -> Response {
    let body: NewAnnotation = match parse_body(req) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let missing = body.missing_fields();
    if !missing.is_empty() {
        return Response::error(
            400,
            &format!("Missing required fields: {}", missing.join(", ")),
        );
    }
    match store.add_annotation(session_id, body) {
        Ok(annotation) => Response::json(201, &annotation),
        Err(err) => store_error(err),
    }
}

fn patch_annotation(store: &Store, req: &Request, id: &str) -> Response {
    let patch: AnnotationPatch = match parse_body(req) {
        Ok(patch) => patch,
        Err(response) => return response,
    };
    match store.patch_annotation(id, patch) {
        Ok(annotation) => Response::json(200, &annotation),
        Err(err) => store_error(err),
    }
}

fn post_thread_message(store: &Store, req: &Request, id: &str) -> Response {
    let body: ThreadPostBody = match parse_body(req) {
        Ok(body) => body,
        Err(response) => return response,
    };
    if body.content.trim().is_empty() {
        return Response::error(400, "Missing required fields: content");
    }
    // The browser side of the thread is the reviewer.
    let role = body.role.unwrap_or(Actor::Human);
    match store.append_thread_message(id, role, &body.content) {
        Ok(annotation) => Response::json(200, &annotation),
        Err(err) => store_error(err),
    }
}

/// An empty body is treated as `{}` so that field-level validation can
/// name what is missing instead of rejecting the payload wholesale.
fn parse_body<T: for<'de> Deserialize<'de>>(req: &Request) -> Result<T, Response> {
    let raw = if req.body.trim().is_empty() {
        "{}"
    } else {
        req.body.as_str()
    };
    serde_json::from_str(raw).map_err(|_| Response::error(400, "Invalid payload"))
}

fn store_error(err: Error) -> Response {
    match err {
        Error::NotFound(what) => Response::error(404, &format!("Not found: {}", what)),
        Error::InvalidInput(msg) => Response::error(400, &msg),
        Error::Internal(inner) => {
            eprintln!("pagemark: request handler failed: {}", inner);
            Response::error(500, "Internal server error")
        }
    }
}

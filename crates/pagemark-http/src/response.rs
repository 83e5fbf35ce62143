//! HTTP response assembly.

use serde::Serialize;
use serde_json::json;

#[derive(Debug)]
pub(crate) struct Response {
    status: u16,
    body: Option<String>,
}

impl Response {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                body: Some(body),
            },
            Err(err) => {
                eprintln!("pagemark: response serialization failed: {}", err);
                Self::error(500, "Internal server error")
            }
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: Some(json!({ "error": message }).to_string()),
        }
    }

    /// 204 for CORS preflight; no body, no Content-Type.
    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }

    pub fn to_http(&self) -> String {
        let body = self.body.as_deref().unwrap_or("");
        let content_type = if self.body.is_some() {
            "Content-Type: application/json\r\n"
        } else {
            ""
        };
        format!(
            "HTTP/1.1 {} {}\r\n{}Content-Length: {}\r\nAccess-Control-Allow-Origin: *\r\nAccess-Control-Allow-Methods: GET, POST, PATCH, DELETE, OPTIONS\r\nAccess-Control-Allow-Headers: Content-Type\r\nConnection: close\r\n\r\n{}",
            self.status,
            status_text(self.status),
            content_type,
            body.len(),
            body
        )
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}

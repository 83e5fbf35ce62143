//! MCP JSON-RPC server.

use schemars::schema_for;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};

use pagemark_store::Store;
use pagemark_types::Error;

use crate::args::{
    AcknowledgeArgs, DismissArgs, GetPendingArgs, GetSessionArgs, ReplyArgs, ResolveArgs,
};
use crate::tools::{
    handle_acknowledge, handle_dismiss, handle_get_pending, handle_get_session,
    handle_list_sessions, handle_reply, handle_resolve,
};

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

pub struct PagemarkServer {
    store: Store,
}

impl PagemarkServer {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Convert serde deserialization error to MCP-compliant JSON-RPC error
    fn parse_validation_error(tool_name: &str, error: serde_json::Error) -> JsonRpcError {
        let error_msg = error.to_string();

        // Check if it's a "missing field" error
        if error_msg.contains("missing field") {
            if let Some(field_start) = error_msg.find('`') {
                if let Some(field_end) = error_msg[field_start + 1..].find('`') {
                    let field_name = &error_msg[field_start + 1..field_start + 1 + field_end];
                    return JsonRpcError {
                        code: -32602,
                        message: format!(
                            "Invalid params: missing required field \"{}\"",
                            field_name
                        ),
                        data: Some(json!({
                            "missing": [field_name],
                            "tool": tool_name,
                        })),
                    };
                }
            }
        }

        JsonRpcError {
            code: -32602,
            message: format!("Invalid params: {}", error),
            data: Some(json!({
                "tool": tool_name,
                "detail": error_msg,
            })),
        }
    }

    /// Handle one request. Returns `None` for notifications, which must
    /// not be answered on the wire.
    fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.method.starts_with("notifications/") {
            return None;
        }

        let id = request
            .id
            .clone()
            .unwrap_or_else(|| Value::Number(serde_json::Number::from(0)));

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::result(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params),
            _ => JsonRpcResponse::error(
                id,
                JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                    data: None,
                },
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::result(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "pagemark",
                    "version": env!("CARGO_PKG_VERSION")
                },
                "instructions": "pagemark MCP server - structured feedback left by a human reviewer on the running web page. WORKFLOW: call pagemark_list_sessions to discover review sessions, pagemark_get_pending to fetch unaddressed feedback, then pagemark_acknowledge / pagemark_resolve / pagemark_dismiss as you work through it. Use pagemark_reply to ask the reviewer questions on an annotation's thread."
            }),
        )
    }

    fn handle_list_tools(&self, id: Value) -> JsonRpcResponse {
        // Input schemas are generated from the same structs the dispatch
        // deserializes into.
        let get_session_schema = schema_for!(GetSessionArgs);
        let get_pending_schema = schema_for!(GetPendingArgs);
        let acknowledge_schema = schema_for!(AcknowledgeArgs);
        let resolve_schema = schema_for!(ResolveArgs);
        let dismiss_schema = schema_for!(DismissArgs);
        let reply_schema = schema_for!(ReplyArgs);

        JsonRpcResponse::result(
            id,
            json!({
                "tools": [
                    {
                        "name": "pagemark_list_sessions",
                        "description": "List every review session in this process, newest last. WORKFLOW: call this first to discover session IDs, then use them with the other tools. Safe to call repeatedly.",
                        "inputSchema": {
                            "type": "object",
                            "properties": {}
                        }
                    },
                    {
                        "name": "pagemark_get_session",
                        "description": "Fetch one session with every annotation attached to it, including resolved and dismissed ones.",
                        "inputSchema": serde_json::to_value(&get_session_schema).unwrap(),
                    },
                    {
                        "name": "pagemark_get_pending",
                        "description": "List the annotations in a session that are still pending. This is the feedback the reviewer is waiting on; work through it with acknowledge/resolve/dismiss.",
                        "inputSchema": serde_json::to_value(&get_pending_schema).unwrap(),
                    },
                    {
                        "name": "pagemark_acknowledge",
                        "description": "Mark an annotation as acknowledged: you have seen the feedback and will address it. Does not close the annotation.",
                        "inputSchema": serde_json::to_value(&acknowledge_schema).unwrap(),
                    },
                    {
                        "name": "pagemark_resolve",
                        "description": "Mark an annotation as resolved after addressing the feedback. Pass a short summary of the fix so the reviewer sees what was done.",
                        "inputSchema": serde_json::to_value(&resolve_schema).unwrap(),
                    },
                    {
                        "name": "pagemark_dismiss",
                        "description": "Dismiss an annotation you are deliberately not addressing. The reason is required and is posted on the annotation's thread for the reviewer.",
                        "inputSchema": serde_json::to_value(&dismiss_schema).unwrap(),
                    },
                    {
                        "name": "pagemark_reply",
                        "description": "Post a message on an annotation's conversation thread as the agent, e.g. to ask the reviewer for clarification.",
                        "inputSchema": serde_json::to_value(&reply_schema).unwrap(),
                    }
                ]
            }),
        )
    }

    fn handle_call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params = match params {
            Some(p) => p,
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError {
                        code: -32602,
                        message: "Missing params".to_string(),
                        data: None,
                    },
                );
            }
        };

        let tool_name = match params.get("name").and_then(|v| v.as_str()) {
            Some(name) => name,
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError {
                        code: -32602,
                        message: "Missing tool name".to_string(),
                        data: None,
                    },
                );
            }
        };

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        // Deserialize-then-dispatch. An argument-shape failure is a
        // protocol error and reaches no store operation; a store failure
        // is a tool result with isError set.
        let result = match tool_name {
            "pagemark_list_sessions" => handle_list_sessions(&self.store),
            "pagemark_get_session" => {
                let args: GetSessionArgs = match serde_json::from_value(arguments) {
                    Ok(args) => args,
                    Err(e) => {
                        return JsonRpcResponse::error(
                            id,
                            Self::parse_validation_error(tool_name, e),
                        );
                    }
                };
                handle_get_session(&self.store, args)
            }
            "pagemark_get_pending" => {
                let args: GetPendingArgs = match serde_json::from_value(arguments) {
                    Ok(args) => args,
                    Err(e) => {
                        return JsonRpcResponse::error(
                            id,
                            Self::parse_validation_error(tool_name, e),
                        );
                    }
                };
                handle_get_pending(&self.store, args)
            }
            "pagemark_acknowledge" => {
                let args: AcknowledgeArgs = match serde_json::from_value(arguments) {
                    Ok(args) => args,
                    Err(e) => {
                        return JsonRpcResponse::error(
                            id,
                            Self::parse_validation_error(tool_name, e),
                        );
                    }
                };
                handle_acknowledge(&self.store, args)
            }
            "pagemark_resolve" => {
                let args: ResolveArgs = match serde_json::from_value(arguments) {
                    Ok(args) => args,
                    Err(e) => {
                        return JsonRpcResponse::error(
                            id,
                            Self::parse_validation_error(tool_name, e),
                        );
                    }
                };
                handle_resolve(&self.store, args)
            }
            "pagemark_dismiss" => {
                let args: DismissArgs = match serde_json::from_value(arguments) {
                    Ok(args) => args,
                    Err(e) => {
                        return JsonRpcResponse::error(
                            id,
                            Self::parse_validation_error(tool_name, e),
                        );
                    }
                };
                handle_dismiss(&self.store, args)
            }
            "pagemark_reply" => {
                let args: ReplyArgs = match serde_json::from_value(arguments) {
                    Ok(args) => args,
                    Err(e) => {
                        return JsonRpcResponse::error(
                            id,
                            Self::parse_validation_error(tool_name, e),
                        );
                    }
                };
                handle_reply(&self.store, args)
            }
            _ => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError {
                        code: -32601,
                        message: format!("Unknown tool: {}", tool_name),
                        data: None,
                    },
                );
            }
        };

        match result {
            Ok(content) => JsonRpcResponse::result(
                id,
                json!({
                    "content": [
                        {
                            "type": "text",
                            "text": serde_json::to_string(&content).unwrap_or_else(|_| content.to_string())
                        }
                    ]
                }),
            ),
            Err(err) => {
                let message = match &err {
                    Error::Internal(inner) => {
                        eprintln!("pagemark: tool {} failed: {}", tool_name, inner);
                        "Internal error".to_string()
                    }
                    other => other.to_string(),
                };
                JsonRpcResponse::result(
                    id,
                    json!({
                        "content": [
                            {
                                "type": "text",
                                "text": message
                            }
                        ],
                        "isError": true
                    }),
                )
            }
        }
    }
}

/// Run the MCP server over stdio until stdin closes.
pub async fn run_server(store: Store) -> anyhow::Result<()> {
    let server = PagemarkServer::new(store);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let reader = BufReader::new(stdin);

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
            Ok(req) => req,
            Err(e) => {
                // For parse errors, we can't get a valid id, so we use a sentinel value
                let error_response = JsonRpcResponse::error(
                    Value::Number(serde_json::Number::from(-1)),
                    JsonRpcError {
                        code: -32700,
                        message: format!("Parse error: {}", e),
                        data: None,
                    },
                );
                let response_json = serde_json::to_string(&error_response)?;
                writeln!(stdout, "{}", response_json)?;
                stdout.flush()?;
                continue;
            }
        };

        if let Some(response) = server.handle_request(request) {
            let response_json = serde_json::to_string(&response)?;
            writeln!(stdout, "{}", response_json)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

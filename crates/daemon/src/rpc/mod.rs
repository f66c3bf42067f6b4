// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 method layer.
//!
//! Top-level methods: `initialize`, `initialized`, `tools/list`,
//! `tools/call`, `resources/*`, `prompts/list`. Requests without
//! `"jsonrpc": "2.0"` are rejected; notifications (no `id`) produce no
//! response; response IDs must be string, number, or null.

pub mod framing;

use masc_core::Clock;
use serde_json::{json, Value};
use tracing::debug;

use crate::dispatch::{self, ServerCtx};
use crate::resources;
use crate::tools;

pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Newest protocol revision this server speaks; handshakes normalize to it.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

const SERVER_NAME: &str = "masc";

const INSTRUCTIONS: &str = "MASC coordinates fleets of autonomous agents: join the room, claim \
tasks from the shared backlog, broadcast to the ordered message log, take \
key-scoped locks, and call memento_mori as your context fills so work \
hands off to a successor.";

fn ok(id: Value, result: Value) -> String {
    json!({ "jsonrpc": "2.0", "id": id, "result": result }).to_string()
}

fn err(id: Value, code: i64, message: impl Into<String>) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() }
    })
    .to_string()
}

/// Handle one raw JSON-RPC message. Returns `None` for notifications.
pub async fn handle_message<C: Clock>(ctx: &ServerCtx<C>, raw: &str) -> Option<String> {
    let request: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return Some(err(Value::Null, codes::PARSE_ERROR, format!("parse error: {e}"))),
    };

    // Response IDs must be string, number, or null.
    let id = request.get("id").cloned();
    let is_notification = id.is_none();
    let id = match id {
        Some(Value::String(_)) | Some(Value::Number(_)) | Some(Value::Null) | None => {
            id.unwrap_or(Value::Null)
        }
        Some(_) => {
            return Some(err(
                Value::Null,
                codes::INVALID_REQUEST,
                "id must be a string, number, or null",
            ))
        }
    };

    if request.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Some(err(id, codes::INVALID_REQUEST, "jsonrpc must be \"2.0\""));
    }
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return Some(err(id, codes::INVALID_REQUEST, "missing method"));
    };
    let params = request.get("params").cloned().unwrap_or(Value::Null);
    debug!(method, notification = is_notification, "rpc request");

    let result = match method {
        "initialize" => match handle_initialize(&params) {
            Ok(result) => result,
            Err(message) => return Some(err(id, codes::INVALID_PARAMS, message)),
        },

        // Acknowledgement, no-op either way.
        "initialized" | "notifications/initialized" => json!({}),

        "tools/list" => handle_tools_list(ctx).await,

        "tools/call" => {
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return Some(err(id, codes::INVALID_PARAMS, "missing tool name"));
            };
            let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
            let response = dispatch::dispatch(ctx, name, &arguments).await;
            json!({
                "content": [{ "type": "text", "text": response.text }],
                "isError": response.is_error,
            })
        }

        "resources/list" => resources::list(),

        "resources/read" => {
            let Some(uri) = params.get("uri").and_then(Value::as_str) else {
                return Some(err(id, codes::INVALID_PARAMS, "missing uri"));
            };
            match resources::read(ctx, uri).await {
                Ok(contents) => contents,
                Err(e) => return Some(err(id, codes::INTERNAL_ERROR, e.to_string())),
            }
        }

        "resources/templates/list" => resources::templates(),

        "prompts/list" => json!({ "prompts": [] }),

        other => {
            return Some(err(
                id,
                codes::METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            ))
        }
    };

    if is_notification {
        return None;
    }
    Some(ok(id, result))
}

/// Internal-error response for a request whose handler hit the deadline.
/// Notifications time out silently.
pub fn timeout_response(raw: &str) -> Option<String> {
    let request: Value = serde_json::from_str(raw).ok()?;
    let id = request.get("id")?.clone();
    Some(err(id, codes::INTERNAL_ERROR, "request deadline exceeded"))
}

/// Validate the handshake and answer with server info and capabilities.
/// The protocol version is normalized to the latest supported.
fn handle_initialize(params: &Value) -> Result<Value, String> {
    let Some(params) = params.as_object() else {
        return Err("params must be an object".to_string());
    };
    if !params
        .get("protocolVersion")
        .is_some_and(Value::is_string)
    {
        return Err("missing protocolVersion".to_string());
    }
    let client_ok = params.get("clientInfo").is_some_and(|info| {
        info.get("name").is_some_and(Value::is_string)
            && info.get("version").is_some_and(Value::is_string)
    });
    if !client_ok {
        return Err("clientInfo must carry name and version".to_string());
    }
    if !params.get("capabilities").is_some_and(Value::is_object) {
        return Err("capabilities must be an object".to_string());
    }

    Ok(json!({
        "protocolVersion": LATEST_PROTOCOL_VERSION,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "tools": {},
            "resources": {},
        },
        "instructions": INSTRUCTIONS,
    }))
}

/// Tool catalogue filtered by the room's current mode: a paused room
/// offers only reads and room management.
async fn handle_tools_list<C: Clock>(ctx: &ServerCtx<C>) -> Value {
    let paused = ctx
        .engine
        .room_state()
        .await
        .map(|s| s.paused)
        .unwrap_or(false);

    let tools: Vec<Value> = tools::all_specs()
        .into_iter()
        .filter(|spec| {
            !paused
                || dispatch::is_read_tool(spec.name)
                || matches!(
                    spec.name,
                    "init" | "resume" | "pause" | "reset" | "join" | "leave"
                )
        })
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "inputSchema": spec.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

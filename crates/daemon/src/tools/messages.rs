// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messaging tools: the broadcast log surface.

use masc_core::{AgentStatus, Clock, CoordError};
use serde_json::{json, Value};
use std::time::Duration;

use crate::dispatch::{CallCtx, ServerCtx};

use super::{opt_bool, opt_u64, req_str, ToolSpec};

/// Cap on the caller-supplied wait, in seconds.
const WAIT_MAX_SECS: u64 = 300;

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "broadcast",
            description: "Append a message to the room log (@name mentions)",
            input_schema: json!({
                "type": "object",
                "properties": { "content": { "type": "string" } },
                "required": ["content"]
            }),
        },
        ToolSpec {
            name: "get_messages",
            description: "Messages after since_seq, ascending",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "since_seq": { "type": "integer" },
                    "limit": { "type": "integer" }
                }
            }),
        },
        ToolSpec {
            name: "wait_for_message",
            description: "Block until a message addressed to you arrives",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "since_seq": { "type": "integer" },
                    "timeout_seconds": { "type": "integer" }
                }
            }),
        },
        ToolSpec {
            name: "listen",
            description: "Toggle listening mode and drain queued messages",
            input_schema: json!({
                "type": "object",
                "properties": { "enabled": { "type": "boolean" } }
            }),
        },
    ]
}

pub async fn call<C: Clock>(
    ctx: &ServerCtx<C>,
    call: &CallCtx,
    tool: &str,
    args: &Value,
) -> Result<Option<Value>, CoordError> {
    let out = match tool {
        "broadcast" => {
            let content = req_str(args, "content")?;
            let message = ctx.engine.broadcast(&call.agent, content).await?;
            json!({ "message": message })
        }

        "get_messages" => {
            let since = opt_u64(args, "since_seq").unwrap_or(0);
            let limit = opt_u64(args, "limit").unwrap_or(50) as usize;
            let messages = ctx.engine.get_messages(since, limit).await?;
            json!({ "messages": messages })
        }

        "wait_for_message" => {
            let since = opt_u64(args, "since_seq").unwrap_or(0);
            let timeout = opt_u64(args, "timeout_seconds")
                .unwrap_or(30)
                .min(WAIT_MAX_SECS);
            let found = ctx
                .engine
                .wait_for_message(&call.agent, since, Duration::from_secs(timeout))
                .await?;
            match found {
                Some(message) => json!({ "message": message, "timed_out": false }),
                None => json!({ "message": null, "timed_out": true }),
            }
        }

        "listen" => {
            let enabled = opt_bool(args, "enabled").unwrap_or(true);
            ctx.sessions.set_listening(&call.agent, enabled).await?;
            let status = if enabled {
                AgentStatus::Listening
            } else {
                AgentStatus::Active
            };
            ctx.engine.set_agent_status(&call.agent, status).await?;
            let pending = ctx.sessions.drain_pending(&call.agent);
            json!({ "listening": enabled, "pending": pending })
        }

        _ => return Ok(None),
    };
    Ok(Some(out))
}

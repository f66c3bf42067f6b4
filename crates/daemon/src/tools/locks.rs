// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock tools: key-scoped exclusive reservations.

use masc_core::{Clock, CoordError, EventType};
use serde_json::{json, Value};

use crate::dispatch::{CallCtx, ServerCtx};

use super::{opt_i64, req_str, ToolSpec};

/// Default TTL when the caller doesn't pass one.
const DEFAULT_TTL_SECS: i64 = 60;

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "acquire_lock",
            description: "Acquire an exclusive lock on a key",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string" },
                    "ttl_seconds": { "type": "integer" }
                },
                "required": ["key"]
            }),
        },
        ToolSpec {
            name: "release_lock",
            description: "Release a lock you own",
            input_schema: json!({
                "type": "object",
                "properties": { "key": { "type": "string" } },
                "required": ["key"]
            }),
        },
        ToolSpec {
            name: "extend_lock",
            description: "Extend a lock you own",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string" },
                    "ttl_seconds": { "type": "integer" }
                },
                "required": ["key"]
            }),
        },
        ToolSpec {
            name: "list_locks",
            description: "Live locks with owners and expiry",
            input_schema: json!({ "type": "object", "properties": {} }),
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
        "acquire_lock" => {
            let key = req_str(args, "key")?;
            let ttl = opt_i64(args, "ttl_seconds").unwrap_or(DEFAULT_TTL_SECS);
            let acquired = ctx.engine.locks().acquire(key, &call.agent, ttl).await?;
            if acquired {
                ctx.engine
                    .append_event(EventType::LockAcquire, &call.agent, json!({ "key": key }))
                    .await?;
            }
            json!({ "acquired": acquired, "key": key })
        }

        "release_lock" => {
            let key = req_str(args, "key")?;
            let released = ctx.engine.locks().release(key, &call.agent).await?;
            if released {
                ctx.engine
                    .append_event(EventType::LockRelease, &call.agent, json!({ "key": key }))
                    .await?;
            }
            json!({ "released": released, "key": key })
        }

        "extend_lock" => {
            let key = req_str(args, "key")?;
            let ttl = opt_i64(args, "ttl_seconds").unwrap_or(DEFAULT_TTL_SECS);
            let extended = ctx.engine.locks().extend(key, ttl, &call.agent).await?;
            json!({ "extended": extended, "key": key })
        }

        "list_locks" => {
            let locks: Vec<Value> = ctx
                .engine
                .locks()
                .list()
                .await?
                .into_iter()
                .map(|(key, info)| json!({ "key": key, "lock": info }))
                .collect();
            json!({ "locks": locks })
        }

        _ => return Ok(None),
    };
    Ok(Some(out))
}

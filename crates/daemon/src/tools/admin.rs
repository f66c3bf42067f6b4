// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin tools: credential issuance.

use masc_core::{AgentRole, Clock, CoordError};
use serde_json::{json, Value};

use crate::dispatch::{CallCtx, ServerCtx};

use super::{opt_str, opt_u64, req_str, ToolSpec};

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "issue_token",
            description: "Issue a credential; the token is shown exactly once",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "target_agent": { "type": "string" },
                    "role": { "type": "string", "enum": ["reader", "worker", "admin"] },
                    "ttl_seconds": { "type": "integer" }
                },
                "required": ["target_agent"]
            }),
        },
        ToolSpec {
            name: "revoke_token",
            description: "Revoke an agent's credential",
            input_schema: json!({
                "type": "object",
                "properties": { "target_agent": { "type": "string" } },
                "required": ["target_agent"]
            }),
        },
    ]
}

pub async fn call<C: Clock>(
    ctx: &ServerCtx<C>,
    _call: &CallCtx,
    tool: &str,
    args: &Value,
) -> Result<Option<Value>, CoordError> {
    let out = match tool {
        "issue_token" => {
            let target = req_str(args, "target_agent")?;
            let role: AgentRole = opt_str(args, "role").unwrap_or("worker").parse()?;
            let ttl = opt_u64(args, "ttl_seconds");
            let token = ctx.auth.issue(target, role, ttl).await?;
            json!({
                "agent": target,
                "role": role,
                "token": token,
                "note": "store this token now; only a hash is persisted",
            })
        }

        "revoke_token" => {
            let target = req_str(args, "target_agent")?;
            let revoked = ctx.auth.revoke(target).await?;
            json!({ "agent": target, "revoked": revoked })
        }

        _ => return Ok(None),
    };
    Ok(Some(out))
}

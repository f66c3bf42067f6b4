// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Portal tools: direct agent-to-agent messaging.

use masc_core::{Clock, CoordError};
use serde_json::{json, Value};

use crate::dispatch::{CallCtx, ServerCtx};

use super::{req_str, ToolSpec};

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "open_portal",
            description: "Open a two-way portal to another agent",
            input_schema: json!({
                "type": "object",
                "properties": { "target": { "type": "string" } },
                "required": ["target"]
            }),
        },
        ToolSpec {
            name: "close_portal",
            description: "Close a portal (both directions)",
            input_schema: json!({
                "type": "object",
                "properties": { "target": { "type": "string" } },
                "required": ["target"]
            }),
        },
        ToolSpec {
            name: "portal_send",
            description: "Send a direct message through an open portal",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "target": { "type": "string" },
                    "content": { "type": "string" }
                },
                "required": ["target", "content"]
            }),
        },
        ToolSpec {
            name: "list_portals",
            description: "All portal records",
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
        "open_portal" => {
            let target = req_str(args, "target")?;
            let portal = ctx.engine.open_portal(&call.agent, target).await?;
            json!({ "portal": portal })
        }

        "close_portal" => {
            let target = req_str(args, "target")?;
            ctx.engine.close_portal(&call.agent, target).await?;
            json!({ "closed": true, "target": target })
        }

        "portal_send" => {
            let target = req_str(args, "target")?;
            let content = req_str(args, "content")?;
            let message = ctx.engine.portal_send(&call.agent, target, content).await?;
            json!({ "message": message })
        }

        "list_portals" => {
            let portals = ctx.engine.list_portals().await?;
            json!({ "portals": portals })
        }

        _ => return Ok(None),
    };
    Ok(Some(out))
}

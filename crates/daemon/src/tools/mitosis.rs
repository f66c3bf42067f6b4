// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mitosis tools: the agent-facing handoff surface.

use masc_core::{Clock, CoordError};
use masc_engine::MitosisOutcome;
use serde_json::{json, Value};

use crate::dispatch::{CallCtx, ServerCtx};

use super::{opt_str, req_f64, ToolSpec};

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "memento_mori",
            description: "Check context usage; prepare or hand off when due",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "context_ratio": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                    "full_context": { "type": "string" },
                    "current_task": { "type": "string" }
                },
                "required": ["context_ratio"]
            }),
        },
        ToolSpec {
            name: "mitosis_status",
            description: "Cell state for this node and the fleet",
            input_schema: json!({ "type": "object", "properties": {} }),
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
        "memento_mori" => {
            let ratio = req_f64(args, "context_ratio")?;
            if !(0.0..=1.0).contains(&ratio) {
                return Err(CoordError::OperationFailed(format!(
                    "context_ratio must be in [0, 1], got {ratio}"
                )));
            }
            let full_context = opt_str(args, "full_context").unwrap_or_default();
            let current_task = opt_str(args, "current_task").unwrap_or_default();

            let outcome = ctx
                .mitosis
                .memento_mori(ratio, full_context, current_task, &ctx.spawn_fn)
                .await?;
            let cell = ctx.mitosis.cell();
            match outcome {
                MitosisOutcome::Continue => json!({ "status": "continue", "cell": cell }),
                MitosisOutcome::Prepared => json!({ "status": "prepared", "cell": cell }),
                MitosisOutcome::Divided { generation } => {
                    json!({ "status": "divided", "generation": generation, "cell": cell })
                }
            }
        }

        "mitosis_status" => {
            // Fleet view straight off storage, no tool calls needed by peers.
            let mut fleet = Vec::new();
            for (key, raw) in ctx.engine.store().get_all("mitosis:").await? {
                if let Ok(cell) = serde_json::from_str::<masc_core::Cell>(&raw) {
                    let node = key.strip_prefix("mitosis:").unwrap_or(&key).to_string();
                    fleet.push(json!({ "node": node, "cell": cell }));
                }
            }
            json!({ "cell": ctx.mitosis.cell(), "fleet": fleet })
        }

        _ => return Ok(None),
    };
    Ok(Some(out))
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task tools: the backlog state machine surface.

use masc_core::{Clock, CoordError, TaskAction};
use masc_engine::NewTask;
use serde_json::{json, Value};

use crate::dispatch::{CallCtx, ServerCtx};

use super::{opt_i64, opt_str, opt_u64, req_str, ToolSpec};

fn transition_schema(extra: &str) -> Value {
    let mut properties = json!({
        "task_id": { "type": "string" },
        "expected_version": { "type": "integer" }
    });
    if !extra.is_empty() {
        properties[extra] = json!({ "type": "string" });
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": ["task_id"]
    })
}

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "add_task",
            description: "Add a task to the backlog",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "priority": { "type": "integer" },
                    "files": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["title"]
            }),
        },
        ToolSpec {
            name: "claim",
            description: "Claim a todo task",
            input_schema: transition_schema(""),
        },
        ToolSpec {
            name: "claim_next",
            description: "Claim the highest-priority todo task",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "start",
            description: "Start a claimed task",
            input_schema: transition_schema(""),
        },
        ToolSpec {
            name: "done",
            description: "Complete a task you hold",
            input_schema: transition_schema("notes"),
        },
        ToolSpec {
            name: "cancel",
            description: "Cancel a task",
            input_schema: transition_schema("reason"),
        },
        ToolSpec {
            name: "release",
            description: "Release a held task back to todo",
            input_schema: transition_schema(""),
        },
        ToolSpec {
            name: "list_tasks",
            description: "The backlog document",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "update_priority",
            description: "Change a task's priority",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "string" },
                    "priority": { "type": "integer" }
                },
                "required": ["task_id", "priority"]
            }),
        },
        ToolSpec {
            name: "gc_tasks",
            description: "Archive terminal tasks older than N days",
            input_schema: json!({
                "type": "object",
                "properties": { "days": { "type": "integer" } }
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
    let action = match tool {
        "claim" => Some(TaskAction::Claim),
        "start" => Some(TaskAction::Start),
        "done" => Some(TaskAction::Done {
            notes: opt_str(args, "notes").map(str::to_string),
        }),
        "cancel" => Some(TaskAction::Cancel {
            reason: opt_str(args, "reason").map(str::to_string),
        }),
        "release" => Some(TaskAction::Release),
        _ => None,
    };
    if let Some(action) = action {
        let task_id = req_str(args, "task_id")?;
        let expected_version = opt_u64(args, "expected_version");
        let task = ctx
            .engine
            .transition_task(task_id, action, &call.agent, expected_version)
            .await?;
        if tool == "claim" {
            let _ = ctx.mitosis.record_task().await;
        }
        let version = ctx.engine.backlog().await?.version;
        return Ok(Some(json!({ "task": task, "version": version })));
    }

    let out = match tool {
        "add_task" => {
            let task = ctx
                .engine
                .add_task(NewTask {
                    title: req_str(args, "title")?.to_string(),
                    description: opt_str(args, "description").unwrap_or_default().to_string(),
                    priority: opt_i64(args, "priority").unwrap_or(0),
                    files: args
                        .get("files")
                        .and_then(Value::as_array)
                        .map(|files| {
                            files
                                .iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                })
                .await?;
            let version = ctx.engine.backlog().await?.version;
            json!({ "task": task, "version": version })
        }

        "claim_next" => {
            let task = ctx.engine.claim_next(&call.agent).await?;
            let _ = ctx.mitosis.record_task().await;
            let version = ctx.engine.backlog().await?.version;
            json!({ "task": task, "version": version })
        }

        "list_tasks" => {
            let backlog = ctx.engine.backlog().await?;
            json!({ "backlog": backlog })
        }

        "update_priority" => {
            let task_id = req_str(args, "task_id")?;
            let priority = opt_i64(args, "priority").ok_or_else(|| {
                CoordError::OperationFailed("missing required argument: priority".to_string())
            })?;
            let task = ctx.engine.update_priority(task_id, priority).await?;
            json!({ "task": task })
        }

        "gc_tasks" => {
            let days = opt_u64(args, "days").unwrap_or(7);
            let archived = ctx.engine.gc_tasks(days).await?;
            json!({ "archived": archived })
        }

        _ => return Ok(None),
    };
    Ok(Some(out))
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Room tools: lifecycle, presence, and the read-only views.

use masc_core::{AgentStatus, Clock, CoordError, SessionMeta};
use serde_json::{json, Value};

use crate::dispatch::{CallCtx, ServerCtx};

use super::{opt_str, opt_u64, ToolSpec};

pub fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "init",
            description: "Initialize the room (admin)",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "join",
            description: "Join the room; assigns a stable nickname",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "agent_name": { "type": "string" },
                    "agent_type": { "type": "string" },
                    "pid": { "type": "integer" },
                    "host": { "type": "string" },
                    "tty": { "type": "string" },
                    "worktree": { "type": "string" }
                }
            }),
        },
        ToolSpec {
            name: "leave",
            description: "Leave the room and release held locks",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "status",
            description: "Room state, counters, and backend health",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "list_agents",
            description: "Active agents (zombies swept first)",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "heartbeat",
            description: "Refresh this agent's last_seen",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "set_status",
            description: "Set this agent's presence status",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "status": { "type": "string", "enum": ["active", "busy", "listening", "inactive"] }
                },
                "required": ["status"]
            }),
        },
        ToolSpec {
            name: "get_events",
            description: "Audit events after since_seq",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "since_seq": { "type": "integer" },
                    "limit": { "type": "integer" }
                }
            }),
        },
        ToolSpec {
            name: "pause",
            description: "Pause the room; mutating tools are gated (admin)",
            input_schema: json!({
                "type": "object",
                "properties": { "reason": { "type": "string" } }
            }),
        },
        ToolSpec {
            name: "resume",
            description: "Resume a paused room (admin)",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "reset",
            description: "Reset the room to a fresh state (admin)",
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
        "init" => {
            let state = ctx.engine.init_room().await?;
            json!({ "initialized": true, "state": state })
        }

        "join" => {
            let agent_type = opt_str(args, "agent_type").unwrap_or("agent");
            let meta = SessionMeta {
                pid: opt_u64(args, "pid").map(|p| p as u32),
                host: opt_str(args, "host").map(str::to_string),
                tty: opt_str(args, "tty").map(str::to_string),
                worktree: opt_str(args, "worktree").map(str::to_string),
            };
            let meta = (!meta.is_empty()).then_some(meta);
            let (agent, rejoined) = ctx.engine.join(&call.agent, agent_type, meta).await?;
            ctx.sessions.register(&agent.name).await?;
            json!({ "nickname": agent.name, "rejoined": rejoined, "agent": agent })
        }

        "leave" => {
            ctx.engine.leave(&call.agent).await?;
            ctx.sessions.unregister(&call.agent).await?;
            ctx.limiter.forget(&call.agent);
            json!({ "left": call.agent })
        }

        "status" => {
            let state = ctx.engine.room_state().await?;
            let backlog = ctx.engine.backlog().await?;
            let healthy = ctx.engine.health_check().await.unwrap_or(false);
            json!({
                "state": state,
                "backlog_version": backlog.version,
                "task_count": backlog.tasks.len(),
                "healthy": healthy,
                "uptime_secs": ctx.start_time.elapsed().as_secs(),
            })
        }

        "list_agents" => {
            let agents = ctx.engine.list_agents().await?;
            json!({ "agents": agents })
        }

        "heartbeat" => {
            ctx.engine.heartbeat(&call.agent).await?;
            json!({ "ok": true, "agent": call.agent })
        }

        "set_status" => {
            let status = match super::req_str(args, "status")? {
                "active" => AgentStatus::Active,
                "busy" => AgentStatus::Busy,
                "listening" => AgentStatus::Listening,
                "inactive" => AgentStatus::Inactive,
                other => {
                    return Err(CoordError::OperationFailed(format!(
                        "unknown status: {other}"
                    )))
                }
            };
            let agent = ctx.engine.set_agent_status(&call.agent, status).await?;
            json!({ "agent": agent })
        }

        "get_events" => {
            let since = opt_u64(args, "since_seq").unwrap_or(0);
            let limit = opt_u64(args, "limit").unwrap_or(50) as usize;
            let events = ctx.engine.get_events(since, limit).await?;
            json!({ "events": events })
        }

        "pause" => {
            let reason = opt_str(args, "reason").map(str::to_string);
            let state = ctx.engine.pause(&call.agent, reason).await?;
            json!({ "state": state })
        }

        "resume" => {
            let state = ctx.engine.resume(&call.agent).await?;
            json!({ "state": state })
        }

        "reset" => {
            let state = ctx.engine.reset_room().await?;
            json!({ "reset": true, "state": state })
        }

        _ => return Ok(None),
    };
    Ok(Some(out))
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool dispatch router.
//!
//! Explicit pipeline, in order: resolve the caller's agent name →
//! authorize (auth first, rate-limit second) → auto-heartbeat/auto-join
//! for write tools → "join required" gate for the fixed mutating list →
//! walk the per-subsystem dispatch tables, first match wins → wrap the
//! outcome as `{isError, text}`.

use masc_core::{fallback_agent_name, AgentRole, Clock, CoordError, SystemClock};
use masc_engine::{Engine, MitosisController, SpawnFn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::auth::AuthService;
use crate::rate_limit::{Category, RateLimiter};
use crate::session::SessionRegistry;
use crate::tools;

/// Read-only tools: no heartbeat, no join, no pause gate.
const READ_TOOLS: &[&str] = &[
    "status",
    "list_agents",
    "list_tasks",
    "get_messages",
    "get_events",
    "list_locks",
    "list_portals",
    "mitosis_status",
    "wait_for_message",
];

/// Mutating tools that demand a prior join instead of auto-joining:
/// their semantics depend on an established identity.
const JOIN_REQUIRED: &[&str] = &[
    "claim",
    "claim_next",
    "start",
    "done",
    "cancel",
    "release",
    "leave",
    "listen",
    "open_portal",
    "close_portal",
    "portal_send",
    "memento_mori",
];

/// Tools that manage the room itself and bypass the pause gate.
const PAUSE_EXEMPT: &[&str] = &["init", "reset", "pause", "resume", "join", "leave"];

pub fn is_read_tool(tool: &str) -> bool {
    READ_TOOLS.contains(&tool)
}

/// Identity of one tool call after resolution.
#[derive(Debug, Clone)]
pub struct CallCtx {
    pub agent: String,
    pub role: AgentRole,
}

/// Transport-shaped tool outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub is_error: bool,
    pub text: String,
}

impl ToolResponse {
    fn ok(value: Value) -> Self {
        Self {
            is_error: false,
            text: serde_json::to_string_pretty(&value)
                .unwrap_or_else(|_| "{}".to_string()),
        }
    }

    fn error(e: &CoordError) -> Self {
        Self {
            is_error: true,
            text: e.to_string(),
        }
    }
}

/// Shared server context for all tool calls.
pub struct ServerCtx<C: Clock = SystemClock> {
    pub engine: Arc<Engine<C>>,
    pub sessions: Arc<SessionRegistry<C>>,
    pub limiter: RateLimiter<C>,
    pub auth: AuthService<C>,
    pub mitosis: MitosisController<C>,
    pub spawn_fn: SpawnFn,
    pub start_time: Instant,
}

/// Run one tool call through the full pipeline.
pub async fn dispatch<C: Clock>(ctx: &ServerCtx<C>, tool: &str, args: &Value) -> ToolResponse {
    match dispatch_inner(ctx, tool, args).await {
        Ok(value) => {
            debug!(tool, "tool ok");
            ToolResponse::ok(value)
        }
        Err(e) => {
            info!(tool, error = %e, "tool error");
            ToolResponse::error(&e)
        }
    }
}

async fn dispatch_inner<C: Clock>(
    ctx: &ServerCtx<C>,
    tool: &str,
    args: &Value,
) -> Result<Value, CoordError> {
    if !tools::is_known(tool) {
        return Err(unknown_tool(tool));
    }

    // (1) Resolve the caller: explicit argument, then the most recent
    // session, then a generated fallback.
    let requested = args
        .get("agent_name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| ctx.sessions.last_active())
        .unwrap_or_else(fallback_agent_name);

    // (2) Auth first, rate-limit second.
    let token = args.get("token").and_then(Value::as_str);
    let role = ctx.auth.authorize(&requested, token, tool).await?;
    ctx.limiter
        .check(&requested, role, Category::for_tool(tool))?;

    // (3)–(4) Identity plumbing for write tools.
    let agent = resolve_caller(ctx, tool, &requested).await?;

    // Paused rooms accept only reads, room management, and admins.
    if !is_read_tool(tool) && !PAUSE_EXEMPT.contains(&tool) && role < AgentRole::Admin {
        if let Ok(state) = ctx.engine.room_state().await {
            if state.paused {
                let by = state.paused_by.unwrap_or_default();
                return Err(CoordError::OperationFailed(format!(
                    "room is paused by {by}"
                )));
            }
        }
    }

    // Every dispatched call counts against the cell.
    let _ = ctx.mitosis.record_activity().await;

    let call = CallCtx { agent, role };

    // (5) Ordered dispatch tables, one per subsystem; first match wins.
    if let Some(out) = tools::room::call(ctx, &call, tool, args).await? {
        return Ok(out);
    }
    if let Some(out) = tools::tasks::call(ctx, &call, tool, args).await? {
        return Ok(out);
    }
    if let Some(out) = tools::messages::call(ctx, &call, tool, args).await? {
        return Ok(out);
    }
    if let Some(out) = tools::locks::call(ctx, &call, tool, args).await? {
        return Ok(out);
    }
    if let Some(out) = tools::portals::call(ctx, &call, tool, args).await? {
        return Ok(out);
    }
    if let Some(out) = tools::mitosis::call(ctx, &call, tool, args).await? {
        return Ok(out);
    }
    if let Some(out) = tools::admin::call(ctx, &call, tool, args).await? {
        return Ok(out);
    }
    Err(unknown_tool(tool))
}

/// Resolve the acting identity for a tool call.
///
/// Read tools pass the requested name through. Write tools auto-heartbeat
/// an existing agent; unknown callers are auto-joined unless the tool is
/// on the join-required list.
async fn resolve_caller<C: Clock>(
    ctx: &ServerCtx<C>,
    tool: &str,
    requested: &str,
) -> Result<String, CoordError> {
    if is_read_tool(tool) || tool == "join" || tool == "init" {
        return Ok(requested.to_string());
    }

    // The caller may pass either its nickname or the base name it joined
    // under; both resolve to the same record.
    if let Some(agent) = ctx.engine.resolve_agent(requested).await? {
        ctx.sessions.touch(&agent.name);
        let _ = ctx.engine.heartbeat(&agent.name).await;
        return Ok(agent.name);
    }

    if JOIN_REQUIRED.contains(&tool) {
        return Err(CoordError::AgentNotFound(requested.to_string()));
    }

    // Auto-join for the remaining write tools.
    let (agent, _) = ctx.engine.join(requested, "agent", None).await?;
    ctx.sessions.register(&agent.name).await?;
    debug!(agent = %agent.name, tool, "auto-joined");
    Ok(agent.name)
}

/// Unknown-tool error with recovery hints.
fn unknown_tool(tool: &str) -> CoordError {
    let prefix: String = tool.chars().take(3).collect();
    let mut near: Vec<&str> = tools::tool_names()
        .into_iter()
        .filter(|known| known.starts_with(&prefix) || known.contains(tool))
        .take(3)
        .collect();
    near.sort();
    let hint = if near.is_empty() {
        "call tools/list for the catalogue".to_string()
    } else {
        format!("did you mean {}? call tools/list for the catalogue", near.join(", "))
    };
    CoordError::OperationFailed(format!("unknown tool {tool:?}; {hint}"))
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;

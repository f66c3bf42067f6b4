// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only `masc://` resource views.

use masc_core::{Clock, CoordError};
use serde_json::{json, Value};

use crate::dispatch::ServerCtx;
use crate::tools;

const VIEWS: &[(&str, &str)] = &[
    ("masc://status", "Room state and counters"),
    ("masc://tasks", "The task backlog"),
    ("masc://messages", "The ordered message log"),
    ("masc://events", "The audit event log"),
    ("masc://agents", "Active agents"),
    ("masc://schema", "Tool catalogue with input schemas"),
];

pub fn list() -> Value {
    let resources: Vec<Value> = VIEWS
        .iter()
        .map(|(uri, description)| {
            json!({
                "uri": uri,
                "name": uri.trim_start_matches("masc://"),
                "description": description,
                "mimeType": "application/json",
            })
        })
        .collect();
    json!({ "resources": resources })
}

pub fn templates() -> Value {
    json!({
        "resourceTemplates": [
            {
                "uriTemplate": "masc://messages?since_seq={since_seq}&limit={limit}",
                "name": "messages-window",
                "description": "Messages after since_seq, up to limit",
                "mimeType": "application/json",
            },
            {
                "uriTemplate": "masc://events?since_seq={since_seq}&limit={limit}",
                "name": "events-window",
                "description": "Audit events after since_seq, up to limit",
                "mimeType": "application/json",
            },
        ]
    })
}

/// Read one resource URI into a contents payload.
pub async fn read<C: Clock>(ctx: &ServerCtx<C>, uri: &str) -> Result<Value, CoordError> {
    let Some(rest) = uri.strip_prefix("masc://") else {
        return Err(CoordError::OperationFailed(format!(
            "unsupported resource uri: {uri}"
        )));
    };
    let (view, query) = match rest.split_once('?') {
        Some((view, query)) => (view, Some(query)),
        None => (rest, None),
    };
    let since_seq = query_param(query, "since_seq").unwrap_or(0);
    let limit = query_param(query, "limit").unwrap_or(50) as usize;

    let body = match view {
        "status" => json!(ctx.engine.room_state().await?),
        "tasks" => json!(ctx.engine.backlog().await?),
        "messages" => json!(ctx.engine.get_messages(since_seq, limit).await?),
        "events" => json!(ctx.engine.get_events(since_seq, limit).await?),
        "agents" => json!(ctx.engine.list_agents().await?),
        "schema" => {
            let specs: Vec<Value> = tools::all_specs()
                .into_iter()
                .map(|s| {
                    json!({
                        "name": s.name,
                        "description": s.description,
                        "inputSchema": s.input_schema,
                    })
                })
                .collect();
            json!(specs)
        }
        other => {
            return Err(CoordError::KeyNotFound(format!("masc://{other}")));
        }
    };

    Ok(json!({
        "contents": [{
            "uri": uri,
            "mimeType": "application/json",
            "text": serde_json::to_string_pretty(&body)
                .unwrap_or_else(|_| "{}".to_string()),
        }]
    }))
}

fn query_param(query: Option<&str>, name: &str) -> Option<u64> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;

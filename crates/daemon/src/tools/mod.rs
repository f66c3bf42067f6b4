// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool handlers, grouped by subsystem.
//!
//! Each module owns one dispatch table: a `specs()` catalogue for
//! `tools/list` and a `call()` entry that returns `Ok(None)` when the tool
//! isn't its own. Handlers are stateless functions of (server context,
//! call context, arguments).

pub mod admin;
pub mod locks;
pub mod messages;
pub mod mitosis;
pub mod portals;
pub mod room;
pub mod tasks;

use masc_core::CoordError;
use serde_json::Value;

/// One entry of the tool catalogue.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Full catalogue in dispatch order.
pub fn all_specs() -> Vec<ToolSpec> {
    let mut specs = room::specs();
    specs.extend(tasks::specs());
    specs.extend(messages::specs());
    specs.extend(locks::specs());
    specs.extend(portals::specs());
    specs.extend(mitosis::specs());
    specs.extend(admin::specs());
    specs
}

pub fn tool_names() -> Vec<&'static str> {
    all_specs().into_iter().map(|s| s.name).collect()
}

pub fn is_known(tool: &str) -> bool {
    tool_names().contains(&tool)
}

// -- argument helpers --

pub(crate) fn req_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, CoordError> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoordError::OperationFailed(format!("missing required argument: {field}")))
}

pub(crate) fn opt_str<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(Value::as_str)
}

pub(crate) fn opt_u64(args: &Value, field: &str) -> Option<u64> {
    args.get(field).and_then(Value::as_u64)
}

pub(crate) fn opt_i64(args: &Value, field: &str) -> Option<i64> {
    args.get(field).and_then(Value::as_i64)
}

pub(crate) fn opt_f64(args: &Value, field: &str) -> Option<f64> {
    args.get(field).and_then(Value::as_f64)
}

pub(crate) fn opt_bool(args: &Value, field: &str) -> Option<bool> {
    args.get(field).and_then(Value::as_bool)
}

pub(crate) fn req_f64(args: &Value, field: &str) -> Result<f64, CoordError> {
    opt_f64(args, field)
        .ok_or_else(|| CoordError::OperationFailed(format!("missing required argument: {field}")))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

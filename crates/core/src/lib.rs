// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! masc-core: entity types and validation for the MASC coordination server

pub mod agent;
pub mod cell;
pub mod clock;
pub mod credential;
pub mod error;
pub mod event;
pub mod key;
pub mod message;
pub mod nickname;
pub mod portal;
pub mod room;
pub mod session;
pub mod task;
pub mod time;

pub use agent::{Agent, AgentRole, AgentStatus, SessionMeta};
pub use cell::{Cell, CellPhase, CellState};
pub use clock::{Clock, FakeClock, SystemClock};
pub use credential::Credential;
pub use error::CoordError;
pub use event::{EventRecord, EventType};
pub use key::{validate_key, Key, KeyError};
pub use message::{extract_mention, Message, MessageType};
pub use nickname::assign_nickname;
pub use portal::{Portal, PortalStatus};
pub use room::{RoomState, PROTOCOL_VERSION};
pub use session::{fallback_agent_name, SessionId};
pub use task::{Backlog, Task, TaskAction, TaskStatus};
pub use time::{epoch_secs_from_iso, iso_from_epoch_secs};

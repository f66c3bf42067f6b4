// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tasks, the backlog document, and the task state machine.
//!
//! The backlog is a single versioned JSON document; `version` is the CAS
//! guard for optimistic concurrency. Transitions are pure functions here;
//! the engine layer wires them through `atomic_update`.

use serde::{Deserialize, Serialize};

use crate::error::CoordError;
use crate::event::EventType;
use crate::time::epoch_secs_from_iso;

/// Lifecycle state of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    Claimed {
        assignee: String,
        claimed_at: String,
    },
    InProgress {
        assignee: String,
        started_at: String,
    },
    Done {
        assignee: String,
        completed_at: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    Cancelled {
        cancelled_by: String,
        cancelled_at: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Claimed { .. } => "claimed",
            TaskStatus::InProgress { .. } => "in_progress",
            TaskStatus::Done { .. } => "done",
            TaskStatus::Cancelled { .. } => "cancelled",
        }
    }

    /// Current assignee, if the state carries one.
    pub fn assignee(&self) -> Option<&str> {
        match self {
            TaskStatus::Claimed { assignee, .. }
            | TaskStatus::InProgress { assignee, .. }
            | TaskStatus::Done { assignee, .. } => Some(assignee),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done { .. } | TaskStatus::Cancelled { .. })
    }

    /// Timestamp at which the task entered a terminal state.
    pub fn terminal_at(&self) -> Option<&str> {
        match self {
            TaskStatus::Done { completed_at, .. } => Some(completed_at),
            TaskStatus::Cancelled { cancelled_at, .. } => Some(cancelled_at),
            _ => None,
        }
    }
}

/// A unit of work in the backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i64,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(flatten)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<String>,
}

/// Mutating action applied to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    Claim,
    Start,
    Done { notes: Option<String> },
    Cancel { reason: Option<String> },
    Release,
}

impl TaskAction {
    pub fn verb(&self) -> &'static str {
        match self {
            TaskAction::Claim => "claim",
            TaskAction::Start => "start",
            TaskAction::Done { .. } => "done",
            TaskAction::Cancel { .. } => "cancel",
            TaskAction::Release => "release",
        }
    }
}

/// The versioned task document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Backlog {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub last_updated: String,
}

impl Backlog {
    /// Next task id: `T{n}` where `n` is one past the highest existing
    /// numeric suffix.
    pub fn next_task_id(&self) -> String {
        let max = self
            .tasks
            .iter()
            .filter_map(|t| t.id.strip_prefix('T'))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("T{}", max + 1)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Highest-priority `Todo` task; ties break to earliest creation.
    pub fn next_claimable(&self) -> Option<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Todo)
            .min_by_key(|t| {
                (
                    std::cmp::Reverse(t.priority),
                    epoch_secs_from_iso(&t.created_at).unwrap_or(u64::MAX),
                )
            })
    }

    /// Apply a state-machine action to one task.
    ///
    /// Returns the audit event type for the transition. Does NOT bump
    /// `version`; the caller finalizes the write with `touch`.
    pub fn apply(
        &mut self,
        id: &str,
        action: TaskAction,
        caller: &str,
        now_iso: &str,
    ) -> Result<EventType, CoordError> {
        let task = self
            .task_mut(id)
            .ok_or_else(|| CoordError::TaskNotFound(id.to_string()))?;

        let status = &task.status;
        let new_status = match (&action, status) {
            (TaskAction::Claim, TaskStatus::Todo) => TaskStatus::Claimed {
                assignee: caller.to_string(),
                claimed_at: now_iso.to_string(),
            },
            (TaskAction::Claim, TaskStatus::Claimed { assignee, .. })
            | (TaskAction::Claim, TaskStatus::InProgress { assignee, .. }) => {
                return Err(CoordError::TaskAlreadyClaimed {
                    id: id.to_string(),
                    by: assignee.clone(),
                });
            }

            (TaskAction::Start, TaskStatus::Claimed { assignee, .. }) => {
                require_assignee(id, assignee, caller)?;
                TaskStatus::InProgress {
                    assignee: assignee.clone(),
                    started_at: now_iso.to_string(),
                }
            }
            (TaskAction::Start, TaskStatus::Todo) => {
                return Err(CoordError::TaskNotClaimed(id.to_string()));
            }

            (TaskAction::Done { notes }, TaskStatus::Claimed { assignee, .. })
            | (TaskAction::Done { notes }, TaskStatus::InProgress { assignee, .. }) => {
                require_assignee(id, assignee, caller)?;
                TaskStatus::Done {
                    assignee: assignee.clone(),
                    completed_at: now_iso.to_string(),
                    notes: notes.clone(),
                }
            }
            (TaskAction::Done { .. }, TaskStatus::Todo) => {
                return Err(CoordError::TaskNotClaimed(id.to_string()));
            }

            (TaskAction::Cancel { reason }, TaskStatus::Todo) => TaskStatus::Cancelled {
                cancelled_by: caller.to_string(),
                cancelled_at: now_iso.to_string(),
                reason: reason.clone(),
            },
            (TaskAction::Cancel { reason }, TaskStatus::Claimed { assignee, .. })
            | (TaskAction::Cancel { reason }, TaskStatus::InProgress { assignee, .. }) => {
                require_assignee(id, assignee, caller)?;
                TaskStatus::Cancelled {
                    cancelled_by: caller.to_string(),
                    cancelled_at: now_iso.to_string(),
                    reason: reason.clone(),
                }
            }

            (TaskAction::Release, TaskStatus::Claimed { assignee, .. })
            | (TaskAction::Release, TaskStatus::InProgress { assignee, .. }) => {
                require_assignee(id, assignee, caller)?;
                TaskStatus::Todo
            }
            (TaskAction::Release, TaskStatus::Todo) => {
                return Err(CoordError::TaskNotClaimed(id.to_string()));
            }

            (_, terminal) => {
                return Err(CoordError::TaskInvalidState {
                    id: id.to_string(),
                    msg: format!("cannot {} a {} task", action.verb(), terminal.label()),
                });
            }
        };

        task.status = new_status;
        Ok(match action {
            TaskAction::Claim => EventType::TaskClaim,
            TaskAction::Start => EventType::TaskStart,
            TaskAction::Done { .. } => EventType::TaskDone,
            TaskAction::Cancel { .. } => EventType::TaskCancel,
            TaskAction::Release => EventType::TaskRelease,
        })
    }

    /// Finalize a mutating write: bump the CAS guard and stamp the time.
    pub fn touch(&mut self, now_iso: &str) {
        self.version += 1;
        self.last_updated = now_iso.to_string();
    }

    /// Split out tasks whose terminal state is older than `cutoff_secs`.
    pub fn drain_archivable(&mut self, cutoff_secs: u64) -> Vec<Task> {
        let (archived, live): (Vec<Task>, Vec<Task>) =
            self.tasks.drain(..).partition(|t| {
                t.status
                    .terminal_at()
                    .and_then(epoch_secs_from_iso)
                    .is_some_and(|at| at < cutoff_secs)
            });
        self.tasks = live;
        archived
    }
}

fn require_assignee(id: &str, assignee: &str, caller: &str) -> Result<(), CoordError> {
    if assignee != caller {
        return Err(CoordError::TaskInvalidState {
            id: id.to_string(),
            msg: format!("assigned to {assignee}, not {caller}"),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

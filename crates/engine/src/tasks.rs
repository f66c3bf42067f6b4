// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task store: CAS-guarded backlog mutations.

use masc_core::{Backlog, Clock, CoordError, EventType, Task, TaskAction, TaskStatus};
use serde_json::json;
use tracing::info;

use crate::{keys, Engine};

/// Arguments for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub files: Vec<String>,
}

impl<C: Clock> Engine<C> {
    fn empty_backlog(&self) -> Backlog {
        Backlog {
            tasks: Vec::new(),
            version: 0,
            last_updated: self.clock.now_iso(),
        }
    }

    /// Current backlog document (empty when never written).
    pub async fn backlog(&self) -> Result<Backlog, CoordError> {
        Ok(self
            .load_doc::<Backlog>(keys::BACKLOG)
            .await?
            .unwrap_or_else(|| self.empty_backlog()))
    }

    /// Append a new `Todo` task; bumps the backlog version.
    pub async fn add_task(&self, new: NewTask) -> Result<Task, CoordError> {
        let now = self.clock.now_iso();
        let (_, task) = self
            .update_doc(
                keys::BACKLOG,
                || Ok(self.empty_backlog()),
                |backlog: &mut Backlog| {
                    let task = Task {
                        id: backlog.next_task_id(),
                        title: new.title.clone(),
                        description: new.description.clone(),
                        priority: new.priority,
                        created_at: now.clone(),
                        files: new.files.clone(),
                        status: TaskStatus::Todo,
                        worktree: None,
                    };
                    backlog.tasks.push(task.clone());
                    backlog.touch(&now);
                    Ok(task)
                },
            )
            .await?;
        info!(task = %task.id, title = %task.title, "task added");
        self.notify_tasks_changed(&task.id, "add").await;
        Ok(task)
    }

    /// Apply one state-machine action to a task.
    ///
    /// `expected_version`, when supplied, must equal the stored backlog
    /// version or the call fails with `VersionConflict` and no write
    /// happens. Emits the transition's audit event (explicit `claim` is
    /// silent; `claim_next` audits the pick).
    pub async fn transition_task(
        &self,
        task_id: &str,
        action: TaskAction,
        caller: &str,
        expected_version: Option<u64>,
    ) -> Result<Task, CoordError> {
        let now = self.clock.now_iso();
        let (backlog, event) = self
            .update_doc(
                keys::BACKLOG,
                || Ok(self.empty_backlog()),
                |backlog: &mut Backlog| {
                    if let Some(expected) = expected_version {
                        if expected != backlog.version {
                            return Err(CoordError::VersionConflict {
                                expected,
                                actual: backlog.version,
                            });
                        }
                    }
                    let event = backlog.apply(task_id, action.clone(), caller, &now)?;
                    backlog.touch(&now);
                    Ok(event)
                },
            )
            .await?;

        let task = backlog
            .task(task_id)
            .cloned()
            .ok_or_else(|| CoordError::TaskNotFound(task_id.to_string()))?;

        if event != EventType::TaskClaim {
            self.append_event(event, caller, json!({ "task_id": task_id }))
                .await?;
        }
        info!(task = task_id, action = action.verb(), caller, "task transition");
        self.notify_tasks_changed(task_id, action.verb()).await;
        Ok(task)
    }

    /// Claim the highest-priority `Todo` task (ties: earliest created).
    pub async fn claim_next(&self, caller: &str) -> Result<Task, CoordError> {
        let now = self.clock.now_iso();
        let (backlog, task_id) = self
            .update_doc(
                keys::BACKLOG,
                || Ok(self.empty_backlog()),
                |backlog: &mut Backlog| {
                    let id = backlog
                        .next_claimable()
                        .map(|t| t.id.clone())
                        .ok_or_else(|| CoordError::TaskNotFound("no claimable tasks".into()))?;
                    backlog.apply(&id, TaskAction::Claim, caller, &now)?;
                    backlog.touch(&now);
                    Ok(id)
                },
            )
            .await?;

        let task = backlog
            .task(&task_id)
            .cloned()
            .ok_or_else(|| CoordError::TaskNotFound(task_id.clone()))?;

        self.append_event(EventType::TaskClaim, caller, json!({ "task_id": task_id }))
            .await?;
        info!(task = %task_id, caller, "task claimed from queue");
        self.notify_tasks_changed(&task_id, "claim").await;
        Ok(task)
    }

    /// Unrestricted priority change; bumps the backlog version.
    pub async fn update_priority(&self, task_id: &str, priority: i64) -> Result<Task, CoordError> {
        let now = self.clock.now_iso();
        let (backlog, _) = self
            .update_doc(
                keys::BACKLOG,
                || Ok(self.empty_backlog()),
                |backlog: &mut Backlog| {
                    let task = backlog
                        .tasks
                        .iter_mut()
                        .find(|t| t.id == task_id)
                        .ok_or_else(|| CoordError::TaskNotFound(task_id.to_string()))?;
                    task.priority = priority;
                    backlog.touch(&now);
                    Ok(())
                },
            )
            .await?;
        self.notify_tasks_changed(task_id, "priority").await;
        backlog
            .task(task_id)
            .cloned()
            .ok_or_else(|| CoordError::TaskNotFound(task_id.to_string()))
    }

    /// Move terminal tasks older than `days` into the archive container.
    /// Returns how many were archived.
    pub async fn gc_tasks(&self, days: u64) -> Result<usize, CoordError> {
        let cutoff = self.clock.epoch_secs().saturating_sub(days * 86_400);
        let now = self.clock.now_iso();

        let (_, archived) = self
            .update_doc(
                keys::BACKLOG,
                || Ok(self.empty_backlog()),
                |backlog: &mut Backlog| {
                    let archived = backlog.drain_archivable(cutoff);
                    if !archived.is_empty() {
                        backlog.touch(&now);
                    }
                    Ok(archived)
                },
            )
            .await?;

        if archived.is_empty() {
            return Ok(0);
        }

        let count = archived.len();
        self.update_doc(
            keys::BACKLOG_ARCHIVE,
            || Ok(self.empty_backlog()),
            |archive: &mut Backlog| {
                archive.tasks.extend(archived.iter().cloned());
                archive.touch(&now);
                Ok(())
            },
        )
        .await?;
        info!(count, "archived terminal tasks");
        Ok(count)
    }

    /// Advisory pub/sub signal that the backlog changed.
    async fn notify_tasks_changed(&self, task_id: &str, action: &str) {
        let payload = json!({ "task_id": task_id, "action": action }).to_string();
        self.publish_external(keys::TASKS_CHANNEL, &payload).await;
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;

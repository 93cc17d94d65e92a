use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = i32;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "TODO")]
    Todo,
    #[serde(rename = "INPROGRESS")]
    InProgress,
    #[serde(rename = "BLOCKED")]
    Blocked,
    #[serde(rename = "DONE")]
    Done,
}

impl TaskStatus {
    /// Column order on the board.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Done,
    ];

    pub fn index(self) -> usize {
        match self {
            TaskStatus::Todo => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Blocked => 2,
            TaskStatus::Done => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "INPROGRESS",
            TaskStatus::Blocked => "BLOCKED",
            TaskStatus::Done => "DONE",
        }
    }

    /// Column heading.
    pub fn display_name(self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::Done => "Done",
        }
    }

    /// Label used by the status selector in the details form.
    pub fn select_label(self) -> &'static str {
        match self {
            TaskStatus::InProgress => "IN PROGRESS",
            other => other.as_str(),
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status: {0}")]
pub struct InvalidStatus(pub String);

impl FromStr for TaskStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
    pub status: TaskStatus,
    #[serde(default)]
    pub deleted_at: Option<NaiveDateTime>,
}

impl Task {
    /// Full-replace body that keeps every field but the status.
    pub fn to_new_task(&self, status: TaskStatus) -> NewTask {
        NewTask {
            title: self.title.clone(),
            content: self.content.clone(),
            deadline: self.deadline,
            status,
        }
    }
}

/// The mutable subset of a task, sent on create and update.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct NewTask {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
    pub status: TaskStatus,
}

impl From<Task> for NewTask {
    fn from(task: Task) -> Self {
        NewTask {
            title: task.title,
            content: task.content,
            deadline: task.deadline,
            status: task.status,
        }
    }
}

use crate::error::{ApiError, Failure};
use crate::failure::FailureSlot;
use crate::router::Route;
use crate::task::{NewTask, Task, TaskId};
use chrono::{NaiveDateTime, ParseError};
use tracing::info;

const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailsCall {
    FetchTask(TaskId),
    SaveTask { id: TaskId, task: NewTask },
    DeleteTask(TaskId),
}

#[derive(Debug)]
pub enum DetailsReply {
    Fetched(Result<Task, ApiError>),
    Saved(Result<Option<Task>, ApiError>),
    Deleted(Result<(), ApiError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Content,
    Deadline,
    Status,
}

impl Field {
    const ORDER: [Field; 4] = [Field::Title, Field::Content, Field::Deadline, Field::Status];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn previous(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Local minute-precision text for the deadline input.
pub fn datetime_input(deadline: NaiveDateTime) -> String {
    deadline.format(INPUT_FORMAT).to_string()
}

/// Canonical deadline for an input value; seconds are always `:00`.
pub fn parse_datetime_input(input: &str) -> Result<Option<NaiveDateTime>, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(&format!("{input}:00"), "%Y-%m-%dT%H:%M:%S").map(Some)
}

#[derive(Debug)]
pub struct TaskDetails {
    raw_id: String,
    id: Option<TaskId>,
    task: NewTask,
    datetime: String,
    deadline_valid: bool,
    loading: bool,
    confirming_delete: bool,
    hint: Option<&'static str>,
    failure: FailureSlot,
    pub focus: Field,
}

impl TaskDetails {
    pub fn new(raw_id: impl Into<String>) -> Self {
        Self {
            raw_id: raw_id.into(),
            id: None,
            task: NewTask::default(),
            datetime: String::new(),
            deadline_valid: true,
            loading: true,
            confirming_delete: false,
            hint: None,
            failure: FailureSlot::default(),
            focus: Field::Title,
        }
    }

    pub fn mount(&mut self) -> Result<DetailsCall, Failure> {
        match self.raw_id.parse::<TaskId>() {
            Ok(id) => {
                self.id = Some(id);
                Ok(DetailsCall::FetchTask(id))
            }
            Err(_) => {
                self.loading = false;
                self.failure.signal(Failure::invalid_task_id())
            }
        }
    }

    pub fn check(&self) -> Result<(), Failure> {
        self.failure.check()
    }

    pub fn id(&self) -> Option<TaskId> {
        self.id
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn working_copy(&self) -> &NewTask {
        &self.task
    }

    pub fn datetime(&self) -> &str {
        &self.datetime
    }

    pub fn deadline_valid(&self) -> bool {
        self.deadline_valid
    }

    pub fn is_confirming_delete(&self) -> bool {
        self.confirming_delete
    }

    pub fn hint(&self) -> Option<&'static str> {
        self.hint
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.task.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.task.content = content.into();
    }

    pub fn cycle_status(&mut self, forward: bool) {
        self.task.status = if forward {
            self.task.status.next()
        } else {
            self.task.status.previous()
        };
    }

    /// Stores the raw input and, when it parses, the canonical deadline.
    pub fn set_datetime(&mut self, input: impl Into<String>) {
        self.datetime = input.into();
        match parse_datetime_input(&self.datetime) {
            Ok(deadline) => {
                self.task.deadline = deadline;
                self.deadline_valid = true;
            }
            Err(_) => self.deadline_valid = false,
        }
    }

    /// Types into the focused text field.
    pub fn push_char(&mut self, c: char) {
        match self.focus {
            Field::Title => self.task.title.push(c),
            Field::Content => self.task.content.push(c),
            Field::Deadline => {
                let mut input = self.datetime.clone();
                input.push(c);
                self.set_datetime(input);
            }
            Field::Status => {}
        }
        self.hint = None;
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            Field::Title => {
                self.task.title.pop();
            }
            Field::Content => {
                self.task.content.pop();
            }
            Field::Deadline => {
                let mut input = self.datetime.clone();
                input.pop();
                self.set_datetime(input);
            }
            Field::Status => {}
        }
    }

    /// Full-record update of the four mutable fields.
    pub fn save(&mut self) -> Option<DetailsCall> {
        let id = self.id?;
        if self.loading {
            return None;
        }
        if self.task.title.trim().is_empty() {
            self.hint = Some("Title is required");
            return None;
        }
        if !self.deadline_valid {
            self.hint = Some("Deadline must look like YYYY-MM-DDTHH:MM");
            return None;
        }
        self.hint = None;
        Some(DetailsCall::SaveTask {
            id,
            task: self.task.clone(),
        })
    }

    pub fn request_delete(&mut self) {
        if self.id.is_some() && !self.loading {
            self.confirming_delete = true;
        }
    }

    /// Answer to the confirmation prompt. Declining changes nothing else.
    pub fn confirm_delete(&mut self, confirmed: bool) -> Option<DetailsCall> {
        if !std::mem::take(&mut self.confirming_delete) || !confirmed {
            return None;
        }
        self.id.map(DetailsCall::DeleteTask)
    }

    /// Leaves without sending anything; the working copy is dropped with the view.
    pub fn cancel(&self) -> Route {
        Route::Board
    }

    pub fn apply(&mut self, reply: DetailsReply) -> Result<Option<Route>, Failure> {
        match reply {
            DetailsReply::Fetched(result) => {
                self.loading = false;
                let task = match result {
                    Ok(task) => task,
                    Err(err) => return self.failure.signal(err),
                };
                if let Some(deadline) = task.deadline {
                    self.datetime = datetime_input(deadline);
                }
                self.task = task.into();
                Ok(None)
            }
            DetailsReply::Saved(result) => {
                if let Err(err) = result {
                    return self.failure.signal(err);
                }
                info!(id = ?self.id, "task saved");
                Ok(Some(Route::Board))
            }
            DetailsReply::Deleted(result) => {
                if let Err(err) = result {
                    return self.failure.signal(err);
                }
                info!(id = ?self.id, "task deleted");
                Ok(Some(Route::Board))
            }
        }
    }
}

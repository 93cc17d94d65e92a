use crate::error::{ApiError, Failure};
use crate::failure::FailureSlot;
use crate::task::{NewTask, Task, TaskId, TaskStatus};
use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};

/// Requests the board view asks the shell to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCall {
    ListTasks,
    CreateTask(NewTask),
    MoveTask { id: TaskId, task: NewTask },
    DeleteTask(TaskId),
}

/// Completed requests routed back to the board view.
#[derive(Debug)]
pub enum BoardReply {
    Listed(Result<Vec<Task>, ApiError>),
    Created {
        column: TaskStatus,
        result: Result<Task, ApiError>,
    },
    Moved {
        id: TaskId,
        status: TaskStatus,
        result: Result<Option<Task>, ApiError>,
    },
    Deleted {
        id: TaskId,
        result: Result<(), ApiError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Overdue,
    Upcoming,
    Normal,
}

impl Urgency {
    pub fn classify(deadline: NaiveDateTime, now: NaiveDateTime, window: Duration) -> Self {
        if deadline < now {
            Urgency::Overdue
        } else if now
            .checked_add_signed(window)
            .map_or(true, |horizon| deadline <= horizon)
        {
            Urgency::Upcoming
        } else {
            Urgency::Normal
        }
    }
}

/// Orders a column for display: earliest deadline first, undated tasks last.
/// The sort is stable, so undated tasks keep their input order.
pub fn sort_for_display(tasks: &mut [&Task]) {
    tasks.sort_by(|a, b| match (a.deadline, b.deadline) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

pub fn truncate_title(title: &str, limit: usize) -> String {
    if title.chars().count() <= limit {
        return title.to_string();
    }
    let mut cut: String = title.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

#[derive(Debug)]
pub struct KanbanBoard {
    tasks: Vec<Task>,
    loading: bool,
    drafts: [String; 4],
    dragging: Option<TaskId>,
    failure: FailureSlot,
    pub selected_status: usize,
    pub selected_task: usize,
    pub editing_draft: bool,
}

impl Default for KanbanBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl KanbanBoard {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            loading: true,
            drafts: Default::default(),
            dragging: None,
            failure: FailureSlot::default(),
            selected_status: 0,
            selected_task: 0,
            editing_draft: false,
        }
    }

    /// The single fetch issued when the board is mounted.
    pub fn mount(&self) -> BoardCall {
        BoardCall::ListTasks
    }

    pub fn check(&self) -> Result<(), Failure> {
        self.failure.check()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn column_tasks(&self, status: TaskStatus) -> Vec<&Task> {
        let mut column: Vec<&Task> = self.tasks.iter().filter(|t| t.status == status).collect();
        sort_for_display(&mut column);
        column
    }

    pub fn selected_column(&self) -> TaskStatus {
        TaskStatus::from_index(self.selected_status).unwrap_or_default()
    }

    pub fn selected(&self) -> Option<&Task> {
        self.column_tasks(self.selected_column())
            .get(self.selected_task)
            .copied()
    }

    pub fn move_selection(&mut self, columns: isize, cards: isize) {
        let last_column = TaskStatus::ALL.len() as isize - 1;
        self.selected_status = (self.selected_status as isize + columns).clamp(0, last_column) as usize;
        if columns != 0 {
            self.selected_task = 0;
        }
        let len = self.column_tasks(self.selected_column()).len() as isize;
        self.selected_task = (self.selected_task as isize + cards).clamp(0, (len - 1).max(0)) as usize;
    }

    pub fn select_task(&mut self, id: TaskId) {
        let Some(task) = self.task(id) else {
            return;
        };
        let status = task.status;
        if let Some(pos) = self.column_tasks(status).iter().position(|t| t.id == id) {
            self.selected_status = status.index();
            self.selected_task = pos;
        }
    }

    fn clamp_selection(&mut self) {
        self.move_selection(0, 0);
    }

    pub fn draft(&self, status: TaskStatus) -> &str {
        &self.drafts[status.index()]
    }

    pub fn set_draft(&mut self, status: TaskStatus, value: impl Into<String>) {
        self.drafts[status.index()] = value.into();
    }

    pub fn push_draft(&mut self, status: TaskStatus, c: char) {
        self.drafts[status.index()].push(c);
    }

    pub fn pop_draft(&mut self, status: TaskStatus) {
        self.drafts[status.index()].pop();
    }

    /// Turns a column's draft into a create request. Blank drafts send nothing.
    pub fn commit_draft(&self, status: TaskStatus) -> Option<BoardCall> {
        let title = self.draft(status).trim();
        if title.is_empty() {
            return None;
        }
        Some(BoardCall::CreateTask(NewTask {
            title: title.to_string(),
            content: String::new(),
            deadline: None,
            status,
        }))
    }

    pub fn delete(&self, id: TaskId) -> BoardCall {
        BoardCall::DeleteTask(id)
    }

    pub fn drag_start(&mut self, id: TaskId) {
        debug!(id, "drag start");
        self.dragging = Some(id);
    }

    pub fn drag_cancel(&mut self) {
        self.dragging = None;
    }

    pub fn dragging(&self) -> Option<TaskId> {
        self.dragging
    }

    /// Ends a drag over `status`. Returns nothing when the payload is gone,
    /// the task is unknown, or it already sits in that column.
    pub fn drop_on(&mut self, status: TaskStatus) -> Option<BoardCall> {
        let id = self.dragging.take()?;
        let task = self.task(id)?;
        if task.status == status {
            debug!(id, %status, "drop on own column ignored");
            return None;
        }
        Some(BoardCall::MoveTask {
            id,
            task: task.to_new_task(status),
        })
    }

    pub fn apply(&mut self, reply: BoardReply) -> Result<(), Failure> {
        match reply {
            BoardReply::Listed(result) => {
                self.loading = false;
                match result {
                    Ok(tasks) => {
                        info!(count = tasks.len(), "board loaded");
                        self.tasks = tasks;
                    }
                    Err(err) => return self.failure.signal(err),
                }
            }
            BoardReply::Created { column, result } => {
                let task = match result {
                    Ok(task) => task,
                    Err(err) => return self.failure.signal(err),
                };
                info!(id = task.id, %column, "task created");
                self.tasks.push(task);
                self.drafts[column.index()].clear();
            }
            BoardReply::Moved { id, status, result } => {
                if let Err(err) = result {
                    return self.failure.signal(err);
                }
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    info!(id, from = %task.status, to = %status, "task moved");
                    task.status = status;
                }
            }
            BoardReply::Deleted { id, result } => {
                if let Err(err) = result {
                    return self.failure.signal(err);
                }
                info!(id, "task deleted");
                self.tasks.retain(|t| t.id != id);
            }
        }
        self.clamp_selection();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use reqwest::StatusCode;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn task(id: TaskId, status: TaskStatus, deadline: Option<NaiveDateTime>) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            content: format!("content {id}"),
            deadline,
            status,
            deleted_at: None,
        }
    }

    fn loaded(tasks: Vec<Task>) -> KanbanBoard {
        let mut board = KanbanBoard::new();
        board.apply(BoardReply::Listed(Ok(tasks))).unwrap();
        board
    }

    fn server_error(action: &'static str) -> ApiError {
        ApiError::Status {
            action,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[test]
    fn mount_fetches_everything_once() {
        let board = KanbanBoard::new();
        assert!(board.is_loading());
        assert_eq!(board.mount(), BoardCall::ListTasks);
    }

    #[test]
    fn failed_load_signals_instead_of_showing_empty_board() {
        let mut board = KanbanBoard::new();
        let err = board
            .apply(BoardReply::Listed(Err(server_error("fetch tasks"))))
            .unwrap_err();
        assert!(err.message().starts_with("Failed to fetch tasks"));
        assert!(board.check().is_err());
        assert!(!board.is_loading());
    }

    #[test]
    fn undated_tasks_sort_last_and_keep_order() {
        let board = loaded(vec![
            task(1, TaskStatus::Todo, None),
            task(2, TaskStatus::Todo, Some(at(9, 12))),
            task(3, TaskStatus::Todo, None),
            task(4, TaskStatus::Todo, Some(at(2, 8))),
            task(5, TaskStatus::Done, Some(at(1, 1))),
        ]);
        let ids: Vec<TaskId> = board
            .column_tasks(TaskStatus::Todo)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![4, 2, 1, 3]);

        // stored order is untouched
        let stored: Vec<TaskId> = board.tasks().iter().map(|t| t.id).collect();
        assert_eq!(stored, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn drop_on_own_column_is_a_no_op() {
        let mut board = loaded(vec![task(1, TaskStatus::Todo, None)]);
        board.drag_start(1);
        assert_eq!(board.drop_on(TaskStatus::Todo), None);
        assert_eq!(board.tasks()[0].status, TaskStatus::Todo);
        assert_eq!(board.dragging(), None);
    }

    #[test]
    fn drop_without_payload_or_unknown_task_is_a_no_op() {
        let mut board = loaded(vec![task(1, TaskStatus::Todo, None)]);
        assert_eq!(board.drop_on(TaskStatus::Done), None);
        board.drag_start(42);
        assert_eq!(board.drop_on(TaskStatus::Done), None);
    }

    #[test]
    fn successful_move_changes_only_that_status() {
        let before = vec![
            task(1, TaskStatus::Todo, Some(at(4, 10))),
            task(2, TaskStatus::Todo, None),
            task(3, TaskStatus::Blocked, None),
        ];
        let mut board = loaded(before.clone());
        board.drag_start(1);
        let call = board.drop_on(TaskStatus::Done).unwrap();
        assert_eq!(
            call,
            BoardCall::MoveTask {
                id: 1,
                task: NewTask {
                    title: "task 1".into(),
                    content: "content 1".into(),
                    deadline: Some(at(4, 10)),
                    status: TaskStatus::Done,
                },
            }
        );
        // nothing changes until the server confirms
        assert_eq!(board.tasks(), before.as_slice());

        board
            .apply(BoardReply::Moved {
                id: 1,
                status: TaskStatus::Done,
                result: Ok(None),
            })
            .unwrap();
        let mut expected = before;
        expected[0].status = TaskStatus::Done;
        assert_eq!(board.tasks(), expected.as_slice());
    }

    #[test]
    fn failed_move_leaves_state_unchanged() {
        let before = vec![task(1, TaskStatus::Todo, None)];
        let mut board = loaded(before.clone());
        board.drag_start(1);
        board.drop_on(TaskStatus::Blocked).unwrap();
        let result = board.apply(BoardReply::Moved {
            id: 1,
            status: TaskStatus::Blocked,
            result: Err(server_error("update task")),
        });
        assert!(result.is_err());
        assert_eq!(board.tasks(), before.as_slice());
    }

    #[test]
    fn create_in_blocked_column() {
        let mut board = loaded(vec![]);
        board.set_draft(TaskStatus::Blocked, "  Buy milk ");
        let call = board.commit_draft(TaskStatus::Blocked).unwrap();
        let BoardCall::CreateTask(body) = call else {
            panic!("expected create, got {call:?}");
        };
        assert_eq!(body.title, "Buy milk");
        assert_eq!(body.content, "");
        assert_eq!(body.deadline, None);
        assert_eq!(body.status, TaskStatus::Blocked);

        let created = Task {
            id: 10,
            title: body.title.clone(),
            content: body.content.clone(),
            deadline: None,
            status: body.status,
            deleted_at: None,
        };
        board
            .apply(BoardReply::Created {
                column: TaskStatus::Blocked,
                result: Ok(created.clone()),
            })
            .unwrap();
        assert_eq!(board.tasks(), &[created]);
        assert_eq!(board.draft(TaskStatus::Blocked), "");
    }

    #[test]
    fn blank_draft_sends_nothing() {
        let mut board = loaded(vec![]);
        assert_eq!(board.commit_draft(TaskStatus::Todo), None);
        board.set_draft(TaskStatus::Todo, "   ");
        assert_eq!(board.commit_draft(TaskStatus::Todo), None);
    }

    #[test]
    fn failed_create_keeps_draft() {
        let mut board = loaded(vec![]);
        board.set_draft(TaskStatus::Todo, "Write report");
        let result = board.apply(BoardReply::Created {
            column: TaskStatus::Todo,
            result: Err(server_error("create task")),
        });
        assert!(result.is_err());
        assert_eq!(board.draft(TaskStatus::Todo), "Write report");
        assert!(board.tasks().is_empty());
    }

    #[test]
    fn delete_removes_exactly_one_id() {
        let mut board = loaded(vec![
            task(1, TaskStatus::Todo, None),
            task(2, TaskStatus::Todo, None),
            task(3, TaskStatus::Done, None),
        ]);
        assert_eq!(board.delete(2), BoardCall::DeleteTask(2));
        board
            .apply(BoardReply::Deleted { id: 2, result: Ok(()) })
            .unwrap();
        let ids: Vec<TaskId> = board.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn failed_delete_keeps_collection() {
        let before = vec![
            task(1, TaskStatus::Todo, None),
            task(2, TaskStatus::Done, None),
        ];
        let mut board = loaded(before.clone());
        let err = board
            .apply(BoardReply::Deleted {
                id: 2,
                result: Err(server_error("delete task")),
            })
            .unwrap_err();
        assert!(err.message().starts_with("Failed to delete task"));
        assert_eq!(board.tasks(), before.as_slice());
        for _ in 0..2 {
            assert_eq!(board.check().unwrap_err(), err);
        }
    }

    #[test]
    fn replies_apply_to_latest_state() {
        let mut board = loaded(vec![task(1, TaskStatus::Todo, None)]);
        board
            .apply(BoardReply::Created {
                column: TaskStatus::Todo,
                result: Ok(task(2, TaskStatus::Todo, None)),
            })
            .unwrap();
        board
            .apply(BoardReply::Moved {
                id: 1,
                status: TaskStatus::Done,
                result: Ok(None),
            })
            .unwrap();
        // the create is not lost by the later move
        assert_eq!(board.tasks().len(), 2);
        assert_eq!(board.task(1).unwrap().status, TaskStatus::Done);
    }

    #[test]
    fn urgency_bands() {
        let now = at(10, 12);
        let week = Duration::days(7);
        assert_eq!(Urgency::classify(at(10, 11), now, week), Urgency::Overdue);
        assert_eq!(Urgency::classify(now, now, week), Urgency::Upcoming);
        assert_eq!(Urgency::classify(at(16, 12), now, week), Urgency::Upcoming);
        assert_eq!(Urgency::classify(at(20, 12), now, week), Urgency::Normal);
    }

    #[test]
    fn huge_window_does_not_overflow() {
        let now = at(10, 12);
        let window = Duration::MAX;
        assert_eq!(Urgency::classify(at(20, 12), now, window), Urgency::Upcoming);
        assert_eq!(Urgency::classify(at(1, 12), now, window), Urgency::Overdue);
    }

    #[test]
    fn long_titles_are_cut_for_display() {
        let title = "This is a very long task title exceeding fifty characters for sure";
        let shown = truncate_title(title, 50);
        assert_eq!(shown, "This is a very long task title exceeding fifty cha...");
        assert_eq!(shown.chars().count(), 53);
        assert_eq!(truncate_title("short", 50), "short");
        assert_eq!(truncate_title("ééééé", 3), "ééé...");
    }

    #[test]
    fn selection_stays_inside_column() {
        let mut board = loaded(vec![
            task(1, TaskStatus::Todo, None),
            task(2, TaskStatus::Todo, None),
        ]);
        board.move_selection(0, 5);
        assert_eq!(board.selected().map(|t| t.id), Some(2));
        board.move_selection(1, 0);
        assert_eq!(board.selected(), None);
        board.move_selection(-5, 0);
        assert_eq!(board.selected_column(), TaskStatus::Todo);
        board.select_task(2);
        assert_eq!(board.selected_task, 1);
    }
}

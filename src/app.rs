//! The shell: current page, error boundary and the outgoing/incoming request
//! plumbing between the pages and the runtime loop.

use crate::api::TaskClient;
use crate::boundary::ErrorBoundary;
use crate::config::Config;
use crate::error::Failure;
use crate::kanban_board::{BoardCall, BoardReply, KanbanBoard};
use crate::router::{NotFoundPage, Route};
use crate::task::{TaskId, TaskStatus};
use crate::task_details::{DetailsCall, DetailsReply, Field, TaskDetails};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Board(BoardCall),
    Details(DetailsCall),
}

#[derive(Debug)]
pub enum Reply {
    Board(BoardReply),
    Details(DetailsReply),
}

/// Tags a call or reply with the mount it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<T> {
    pub generation: u64,
    pub body: T,
}

/// Sends one call and wraps the outcome for the page that issued it.
pub async fn perform(client: &TaskClient, call: Call) -> Reply {
    match call {
        Call::Board(BoardCall::ListTasks) => Reply::Board(BoardReply::Listed(client.list_tasks().await)),
        Call::Board(BoardCall::CreateTask(task)) => Reply::Board(BoardReply::Created {
            column: task.status,
            result: client.create_task(&task).await,
        }),
        Call::Board(BoardCall::MoveTask { id, task }) => Reply::Board(BoardReply::Moved {
            id,
            status: task.status,
            result: client.update_task(id, &task).await,
        }),
        Call::Board(BoardCall::DeleteTask(id)) => Reply::Board(BoardReply::Deleted {
            id,
            result: client.delete_task(id).await,
        }),
        Call::Details(DetailsCall::FetchTask(id)) => {
            Reply::Details(DetailsReply::Fetched(client.get_task(id).await))
        }
        Call::Details(DetailsCall::SaveTask { id, task }) => {
            Reply::Details(DetailsReply::Saved(client.update_task(id, &task).await))
        }
        Call::Details(DetailsCall::DeleteTask(id)) => {
            Reply::Details(DetailsReply::Deleted(client.delete_task(id).await))
        }
    }
}

#[derive(Debug)]
pub enum Page {
    Board(KanbanBoard),
    Details(TaskDetails),
    NotFound(NotFoundPage),
}

/// Screen regions from the last frame, used to resolve mouse drags.
#[derive(Debug, Default, Clone)]
pub struct HitMap {
    pub columns: Vec<(Rect, TaskStatus)>,
    pub cards: Vec<(Rect, TaskId)>,
}

impl HitMap {
    pub fn column_at(&self, x: u16, y: u16) -> Option<TaskStatus> {
        self.columns
            .iter()
            .find(|(rect, _)| rect.contains(Position::new(x, y)))
            .map(|(_, status)| *status)
    }

    pub fn card_at(&self, x: u16, y: u16) -> Option<TaskId> {
        self.cards
            .iter()
            .find(|(rect, _)| rect.contains(Position::new(x, y)))
            .map(|(_, id)| *id)
    }
}

#[derive(Debug)]
pub struct App {
    config: Config,
    route: Route,
    page: Page,
    boundary: ErrorBoundary,
    generation: u64,
    outbox: Vec<Envelope<Call>>,
    prompt: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: Config, path: &str, now: Instant) -> Self {
        let mut app = Self {
            config,
            route: Route::Board,
            page: Page::Board(KanbanBoard::new()),
            boundary: ErrorBoundary::new(),
            generation: 0,
            outbox: Vec::new(),
            prompt: None,
            should_quit: false,
        };
        app.navigate(Route::parse(path), now);
        app
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn boundary(&self) -> &ErrorBoundary {
        &self.boundary
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Calls queued since the last drain, for the runtime to send.
    pub fn take_calls(&mut self) -> Vec<Envelope<Call>> {
        std::mem::take(&mut self.outbox)
    }

    fn send(&mut self, call: Call) {
        debug!(generation = self.generation, ?call, "queueing call");
        self.outbox.push(Envelope {
            generation: self.generation,
            body: call,
        });
    }

    /// Client-side navigation: unmounts the current page and mounts the next.
    pub fn navigate(&mut self, route: Route, now: Instant) {
        info!(path = %route.path(), "navigate");
        self.generation += 1;
        self.route = route.clone();
        match route {
            Route::Board => {
                let board = KanbanBoard::new();
                let call = board.mount();
                self.page = Page::Board(board);
                self.send(Call::Board(call));
            }
            Route::Task(id) => {
                let mut details = TaskDetails::new(id);
                let mounted = details.mount();
                self.page = Page::Details(details);
                if let Some(call) = self.boundary.catch(mounted) {
                    self.send(Call::Details(call));
                }
            }
            Route::NotFound(_) => {
                self.page = Page::NotFound(NotFoundPage::new(now, self.config.redirect_delay));
            }
        }
    }

    /// Full navigation to `/`: every page, draft and pending reply is discarded.
    pub fn hard_reset(&mut self, now: Instant) {
        info!("hard reset to /");
        self.boundary = ErrorBoundary::new();
        self.prompt = None;
        self.outbox.clear();
        self.navigate(Route::Board, now);
    }

    fn check_page(&mut self) {
        let check = match &self.page {
            Page::Board(board) => board.check(),
            Page::Details(details) => details.check(),
            Page::NotFound(_) => Ok(()),
        };
        let _ = self.boundary.catch(check);
    }

    pub fn is_failed(&self) -> bool {
        self.boundary.failure_message().is_some()
    }

    pub fn receive(&mut self, reply: Envelope<Reply>, now: Instant) {
        if reply.generation != self.generation {
            debug!(
                generation = reply.generation,
                current = self.generation,
                "dropping reply for unmounted page"
            );
            return;
        }
        if self.is_failed() {
            return;
        }
        let navigation = match (&mut self.page, reply.body) {
            (Page::Board(board), Reply::Board(reply)) => {
                let _ = self.boundary.catch(board.apply(reply));
                None
            }
            (Page::Details(details), Reply::Details(reply)) => {
                self.boundary.catch(details.apply(reply)).flatten()
            }
            (_, body) => {
                debug!(?body, "reply does not match the mounted page");
                None
            }
        };
        if let Some(route) = navigation {
            self.navigate(route, now);
        }
    }

    /// Periodic work: re-raise recorded failures and fire the not-found redirect.
    pub fn tick(&mut self, now: Instant) {
        self.check_page();
        let redirect = matches!(&self.page, Page::NotFound(page) if page.should_redirect(now));
        if redirect && !self.is_failed() {
            self.hard_reset(now);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.is_failed() {
            match key.code {
                KeyCode::Enter | KeyCode::Char('h') => self.hard_reset(now),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(key, now);
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('g') {
            self.prompt = Some(String::new());
            return;
        }
        match self.page {
            Page::Board(_) => self.handle_board_key(key, now),
            Page::Details(_) => self.handle_details_key(key, now),
            Page::NotFound(_) => match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('g') => self.prompt = Some(String::new()),
                _ => {}
            },
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent, now: Instant) {
        let Some(input) = self.prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Enter => {
                let route = Route::parse(input);
                self.prompt = None;
                self.navigate(route, now);
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent, now: Instant) {
        let Page::Board(board) = &mut self.page else {
            return;
        };
        if board.is_loading() {
            if key.code == KeyCode::Char('q') {
                self.should_quit = true;
            }
            return;
        }

        let column = board.selected_column();
        if board.editing_draft {
            match key.code {
                KeyCode::Esc => board.editing_draft = false,
                KeyCode::Backspace => board.pop_draft(column),
                KeyCode::Enter => {
                    if let Some(call) = board.commit_draft(column) {
                        self.send(Call::Board(call));
                    }
                }
                KeyCode::Char(c) => board.push_draft(column, c),
                _ => {}
            }
            return;
        }

        let mut call = None;
        let mut open = None;
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('g') => self.prompt = Some(String::new()),
            KeyCode::Left | KeyCode::Char('h') => board.move_selection(-1, 0),
            KeyCode::Right | KeyCode::Char('l') => board.move_selection(1, 0),
            KeyCode::Up | KeyCode::Char('k') => board.move_selection(0, -1),
            KeyCode::Down | KeyCode::Char('j') => board.move_selection(0, 1),
            KeyCode::Char('a') | KeyCode::Char('i') => board.editing_draft = true,
            KeyCode::Esc => board.drag_cancel(),
            KeyCode::Char(' ') => {
                if board.dragging().is_some() {
                    call = board.drop_on(column);
                } else if let Some(id) = board.selected().map(|t| t.id) {
                    board.drag_start(id);
                }
            }
            KeyCode::Enter => {
                if board.dragging().is_some() {
                    call = board.drop_on(column);
                } else {
                    open = board.selected().map(|t| t.id);
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                call = board.selected().map(|t| board.delete(t.id));
            }
            _ => {}
        }
        if let Some(call) = call {
            self.send(Call::Board(call));
        }
        if let Some(id) = open {
            self.navigate(Route::Task(id.to_string()), now);
        }
    }

    fn handle_details_key(&mut self, key: KeyEvent, now: Instant) {
        let Page::Details(details) = &mut self.page else {
            return;
        };
        if details.is_loading() {
            return;
        }

        if details.is_confirming_delete() {
            let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
            if let Some(call) = details.confirm_delete(confirmed) {
                self.send(Call::Details(call));
            }
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let mut call = None;
        match key.code {
            KeyCode::Esc => {
                let route = details.cancel();
                self.navigate(route, now);
                return;
            }
            KeyCode::Char('s') if ctrl => call = details.save(),
            KeyCode::Char('d') if ctrl => details.request_delete(),
            KeyCode::Tab | KeyCode::Down => details.focus = details.focus.next(),
            KeyCode::BackTab | KeyCode::Up => details.focus = details.focus.previous(),
            KeyCode::Left if details.focus == Field::Status => details.cycle_status(false),
            KeyCode::Right | KeyCode::Char(' ') if details.focus == Field::Status => {
                details.cycle_status(true)
            }
            KeyCode::Enter if details.focus == Field::Content => details.push_char('\n'),
            KeyCode::Enter => call = details.save(),
            KeyCode::Backspace => details.pop_char(),
            KeyCode::Char(c) if !ctrl => details.push_char(c),
            _ => {}
        }
        if let Some(call) = call {
            self.send(Call::Details(call));
        }
    }

    /// Mouse drag and drop on the board: press on a card, release over a column.
    pub fn handle_mouse(&mut self, event: MouseEvent, hits: &HitMap) {
        if self.is_failed() || self.prompt.is_some() {
            return;
        }
        let Page::Board(board) = &mut self.page else {
            return;
        };
        let mut call = None;
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(id) = hits.card_at(event.column, event.row) {
                    board.select_task(id);
                    board.drag_start(id);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                match hits.column_at(event.column, event.row) {
                    Some(status) => call = board.drop_on(status),
                    None => board.drag_cancel(),
                }
            }
            _ => {}
        }
        if let Some(call) = call {
            self.send(Call::Board(call));
        }
    }

    /// Used by tests and the status line.
    pub fn failure(&self) -> Option<Failure> {
        self.boundary.failure_message().map(Failure::new)
    }
}

use std::time::{Duration, Instant};

/// The three pages the shell knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Board,
    /// Raw `:id` segment; the details view decides whether it is valid.
    Task(String),
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let path = path.trim();
        if path == "/" {
            return Route::Board;
        }
        match path.strip_prefix("/task/") {
            Some(id) if !id.is_empty() && !id.contains('/') => Route::Task(id.to_string()),
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Board => "/".to_string(),
            Route::Task(id) => format!("/task/{id}"),
            Route::NotFound(path) => path.clone(),
        }
    }
}

/// Shown for unknown paths; sends the user home once the delay runs out.
///
/// The deadline lives here, so dropping the page on navigation also drops the
/// pending redirect.
#[derive(Debug)]
pub struct NotFoundPage {
    redirect_at: Instant,
}

impl NotFoundPage {
    pub fn new(now: Instant, delay: Duration) -> Self {
        Self {
            redirect_at: now + delay,
        }
    }

    pub fn should_redirect(&self, now: Instant) -> bool {
        now >= self.redirect_at
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.redirect_at.saturating_duration_since(now)
    }
}

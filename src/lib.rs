//! Terminal Kanban board backed by the `/api/tasks` REST API.
//!
//! Four fixed status columns, inline task creation, drag-and-drop status
//! changes, a task details form and a recovery panel for failed operations.

pub mod api;
pub mod app;
pub mod boundary;
pub mod config;
pub mod error;
pub mod failure;
pub mod kanban_board;
pub mod router;
pub mod task;
pub mod task_details;
pub mod ui;

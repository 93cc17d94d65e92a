use crate::app::{App, HitMap, Page};
use crate::kanban_board::{truncate_title, KanbanBoard, Urgency};
use crate::router::NotFoundPage;
use crate::task::{Task, TaskStatus};
use crate::task_details::{Field, TaskDetails};
use chrono::{Local, NaiveDateTime};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;

const DUE_FORMAT: &str = "%b %-d, %Y %H:%M";

/// Draws the whole screen and returns the regions a mouse drag can hit.
pub fn draw(f: &mut Frame, app: &App) -> HitMap {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    if let Some(message) = app.boundary().failure_message() {
        draw_recovery_panel(f, chunks[0], message);
        draw_footer(f, chunks[1], "enter: go to home   q: quit");
        return HitMap::default();
    }

    let mut hits = HitMap::default();
    match app.page() {
        Page::Board(board) if board.is_loading() => draw_loading(f, chunks[0]),
        Page::Board(board) => {
            hits = draw_board(f, chunks[0], board, app);
            draw_footer(f, chunks[1], &board_footer(board));
        }
        Page::Details(details) if details.is_loading() => draw_loading(f, chunks[0]),
        Page::Details(details) => {
            draw_details(f, chunks[0], details);
            let footer = details.hint().unwrap_or(
                "tab: next field   ctrl+s: save   ctrl+d: delete   esc: cancel",
            );
            draw_footer(f, chunks[1], footer);
        }
        Page::NotFound(page) => {
            draw_not_found(f, chunks[0], page);
            draw_footer(f, chunks[1], "g: go to path   q: quit");
        }
    }

    if let Some(input) = app.prompt() {
        let area = centered(f.area(), 50, 3);
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(format!("{input}_")).block(
                Block::default()
                    .title("Go to path")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            ),
            area,
        );
    }
    hits
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn draw_footer(f: &mut Frame, area: Rect, text: &str) {
    f.render_widget(
        Paragraph::new(text.to_string()).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn draw_loading(f: &mut Frame, area: Rect) {
    f.render_widget(
        Paragraph::new("Loading...").alignment(Alignment::Center),
        centered(area, area.width, 1),
    );
}

fn draw_recovery_panel(f: &mut Frame, area: Rect, message: &str) {
    let panel = centered(area, 60, 9);
    f.render_widget(Clear, panel);
    let lines = vec![
        Line::from(Span::styled(
            "Something went wrong",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "[ Go to Home ]",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL)),
        panel,
    );
}

fn draw_not_found(f: &mut Frame, area: Rect, page: &NotFoundPage) {
    let remaining = page.remaining(Instant::now()).as_secs_f32().ceil();
    let panel = centered(area, 50, 4);
    f.render_widget(
        Paragraph::new(vec![
            Line::from("Page not found. Redirecting to home..."),
            Line::from(format!("({remaining:.0}s)")),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        ),
        panel,
    );
}

fn board_footer(board: &KanbanBoard) -> String {
    if board.editing_draft {
        return "type a title, enter: add task   esc: stop typing".to_string();
    }
    if let Some(id) = board.dragging() {
        return format!("moving #{id}: ←/→ pick a column   space/enter: drop   esc: cancel");
    }
    match board.selected() {
        Some(task) => format!(
            "{}   |   a: add  space: move  enter: open  x: delete  g: go to  q: quit",
            task.title
        ),
        None => "a: add  space: move  enter: open  x: delete  g: go to  q: quit".to_string(),
    }
}

fn draw_board(f: &mut Frame, area: Rect, board: &KanbanBoard, app: &App) -> HitMap {
    let config = app.config();
    let now = Local::now().naive_local();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    let mut hits = HitMap::default();
    for status in TaskStatus::ALL {
        let i = status.index();
        let column_area = columns[i];
        hits.columns.push((column_area, status));

        let selected_column = board.selected_status == i;
        let border = match (selected_column, board.dragging().is_some()) {
            (true, true) => Style::default().fg(Color::Yellow),
            (true, false) => Style::default().fg(Color::Cyan),
            _ => Style::default(),
        };
        let block = Block::default()
            .title(status.display_name())
            .borders(Borders::ALL)
            .border_style(border);
        let inner = block.inner(column_area);
        f.render_widget(block, column_area);

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(inner);

        let draft = board.draft(status);
        let typing = selected_column && board.editing_draft;
        let input = if draft.is_empty() && !typing {
            Paragraph::new("Add new task (press Enter)").style(Style::default().fg(Color::DarkGray))
        } else if typing {
            Paragraph::new(format!("{draft}_"))
        } else {
            Paragraph::new(draft.to_string())
        };
        f.render_widget(
            input.block(Block::default().borders(Borders::ALL).border_style(if typing {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            })),
            parts[0],
        );

        let list_area = parts[1];
        let mut y = list_area.y;
        for (pos, task) in board.column_tasks(status).into_iter().enumerate() {
            let lines = card_lines(task, now, config.title_limit, config.upcoming_window);
            let height = lines.len() as u16 + 2;
            if y + height > list_area.y + list_area.height {
                break;
            }
            let card = Rect::new(list_area.x, y, list_area.width, height);
            let selected = selected_column && board.selected_task == pos;
            let dragged = board.dragging() == Some(task.id);
            let style = if dragged {
                Style::default().fg(Color::Yellow)
            } else if selected {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            f.render_widget(
                Paragraph::new(lines).block(Block::default().borders(Borders::ALL).border_style(style)),
                card,
            );
            hits.cards.push((card, task.id));
            y += height;
        }
    }
    hits
}

fn card_lines(
    task: &Task,
    now: NaiveDateTime,
    title_limit: usize,
    window: chrono::Duration,
) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::raw(format!("[#{}] ", task.id)),
        Span::styled(
            truncate_title(&task.title, title_limit),
            Style::default().fg(Color::White),
        ),
    ])];
    if let Some(deadline) = task.deadline {
        let style = match Urgency::classify(deadline, now, window) {
            Urgency::Overdue => Style::default().fg(Color::Red),
            Urgency::Upcoming => Style::default().fg(Color::Yellow),
            Urgency::Normal => Style::default(),
        };
        lines.push(Line::from(Span::styled(
            format!("Due: {}", deadline.format(DUE_FORMAT)),
            style,
        )));
    }
    if let Some(first) = task.content.lines().find(|l| !l.trim().is_empty()) {
        lines.push(Line::from(Span::styled(
            first.to_string(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn draw_details(f: &mut Frame, area: Rect, details: &TaskDetails) {
    let form = centered(area, 80, area.height);
    let outer = Block::default().title("Edit Task").borders(Borders::ALL);
    let inner = outer.inner(form);
    f.render_widget(outer, form);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(inner);

    let task = details.working_copy();
    let field_block = |title: &'static str, field: Field| {
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(if details.focus == field {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            })
    };
    let cursor = |field: Field| if details.focus == field { "_" } else { "" };

    f.render_widget(
        Paragraph::new(format!("{}{}", task.title, cursor(Field::Title)))
            .block(field_block("Title", Field::Title)),
        rows[0],
    );
    f.render_widget(
        Paragraph::new(format!("{}{}", task.content, cursor(Field::Content)))
            .wrap(Wrap { trim: false })
            .block(field_block("Content", Field::Content)),
        rows[1],
    );

    let deadline_title = if details.deadline_valid() {
        "Deadline (YYYY-MM-DDTHH:MM)"
    } else {
        "Deadline (invalid)"
    };
    let mut deadline = field_block(deadline_title, Field::Deadline);
    if !details.deadline_valid() {
        deadline = deadline.border_style(Style::default().fg(Color::Red));
    }
    f.render_widget(
        Paragraph::new(format!("{}{}", details.datetime(), cursor(Field::Deadline))).block(deadline),
        rows[2],
    );

    let options: Vec<Span> = TaskStatus::ALL
        .iter()
        .flat_map(|status| {
            let style = if *status == task.status {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            [Span::styled(format!(" {} ", status.select_label()), style), Span::raw(" ")]
        })
        .collect();
    f.render_widget(
        Paragraph::new(Line::from(options)).block(field_block("Status", Field::Status)),
        rows[3],
    );

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[ Delete Task ]", Style::default().fg(Color::Red)),
            Span::raw("   [ Cancel ]   "),
            Span::styled("[ Save Changes ]", Style::default().fg(Color::Cyan)),
        ])),
        rows[4],
    );

    if details.is_confirming_delete() {
        let modal = centered(area, 50, 3);
        f.render_widget(Clear, modal);
        f.render_widget(
            Paragraph::new("Are you sure you want to delete this task? (y/n)")
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Red)),
                ),
            modal,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Envelope, Reply};
    use crate::config::Config;
    use crate::error::ApiError;
    use crate::kanban_board::BoardReply;
    use ratatui::{backend::TestBackend, Terminal};
    use reqwest::StatusCode;

    fn render(app: &App) -> (String, HitMap) {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        let mut hits = HitMap::default();
        terminal
            .draw(|f| {
                hits = draw(f, app);
            })
            .unwrap();
        let text = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        (text, hits)
    }

    fn task(id: i32, title: &str, status: TaskStatus) -> Task {
        Task {
            id,
            title: title.to_string(),
            content: String::new(),
            deadline: None,
            status,
            deleted_at: None,
        }
    }

    #[test]
    fn failed_load_renders_recovery_panel_not_board() {
        let now = Instant::now();
        let mut app = App::new(Config::default(), "/", now);
        let generation = app.generation();
        app.receive(
            Envelope {
                generation,
                body: Reply::Board(BoardReply::Listed(Err(ApiError::Status {
                    action: "fetch tasks",
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                }))),
            },
            now,
        );
        let (text, hits) = render(&app);
        assert!(text.contains("Something went wrong"));
        assert!(text.contains("Go to Home"));
        assert!(!text.contains("In Progress"));
        assert!(hits.columns.is_empty());
    }

    #[test]
    fn board_shows_columns_and_truncated_titles() {
        let now = Instant::now();
        let mut app = App::new(Config::default(), "/", now);
        let generation = app.generation();
        let long = "This is a very long task title exceeding fifty characters for sure";
        app.receive(
            Envelope {
                generation,
                body: Reply::Board(BoardReply::Listed(Ok(vec![task(1, long, TaskStatus::Todo)]))),
            },
            now,
        );
        let mut terminal = Terminal::new(TestBackend::new(400, 30)).unwrap();
        let mut hits = HitMap::default();
        terminal.draw(|f| hits = draw(f, &app)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        for name in ["To Do", "In Progress", "Blocked", "Done"] {
            assert!(text.contains(name), "missing column {name}");
        }
        assert!(text.contains("[#1] This is a very long task title exceeding fifty cha..."));
        assert_eq!(hits.columns.len(), 4);
        assert_eq!(hits.cards.len(), 1);
    }

    #[test]
    fn loading_and_not_found_pages() {
        let now = Instant::now();
        let app = App::new(Config::default(), "/", now);
        assert!(render(&app).0.contains("Loading..."));

        let app = App::new(Config::default(), "/missing", now);
        assert!(render(&app).0.contains("Page not found. Redirecting to home..."));
    }
}

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{fs::OpenOptions, io, path::Path, sync::Mutex, time::Instant};
use taskboard::{
    api::TaskClient,
    app::{perform, App, Envelope, HitMap, Reply},
    config::{Args, Config},
    ui,
};
use tokio::{runtime::Runtime, sync::mpsc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskboard=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;
    let config = Config::resolve(&args)?;
    info!(api_url = %config.api_url, "starting taskboard");

    let runtime = Runtime::new().context("failed to start async runtime")?;
    let client = TaskClient::new(&config.api_url, config.request_timeout)?;
    let mut app = App::new(config, &args.path, Instant::now());

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &runtime, client);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %err, "taskboard exited with an error");
    }
    result
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runtime: &Runtime,
    client: TaskClient,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope<Reply>>();
    let tick_rate = app.config().tick_rate;
    let mut hits = HitMap::default();

    loop {
        for call in app.take_calls() {
            let client = client.clone();
            let tx = tx.clone();
            runtime.spawn(async move {
                let body = perform(&client, call.body).await;
                // the receiver only goes away when the UI has quit
                let _ = tx.send(Envelope {
                    generation: call.generation,
                    body,
                });
            });
        }

        while let Ok(reply) = rx.try_recv() {
            app.receive(reply, Instant::now());
        }
        app.tick(Instant::now());

        terminal.draw(|f| hits = ui::draw(f, app))?;
        if app.should_quit {
            info!("quit");
            return Ok(());
        }

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key, Instant::now())
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse, &hits),
                _ => {}
            }
        }
    }
}

mod app;
mod cli;
mod components;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::cli::{Command, Mode};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use log::{error, info};
use mlb_api::config::{ConfigError, ConfigLayer, SensorConfig, config_path};
use mlb_api::coordinator::Coordinator;
use mlb_api::sensor::{Sensor, SensorHandle};
use std::io::Stdout;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Duration;
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let command = match cli::parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}\n\n{}", cli::usage_text());
            std::process::exit(2);
        }
    };

    let (mode, overrides) = match command {
        Command::Help => {
            println!("{}", cli::usage_text());
            return Ok(());
        }
        Command::Version => {
            println!("mlbtui {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Run { mode, overrides } => (mode, overrides),
    };

    match mode {
        Mode::Tui => {
            tui_logger::init_logger(log::LevelFilter::Info)?;
            tui_logger::set_default_level(log::LevelFilter::Info);
        }
        Mode::Json | Mode::Watch => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
                .init();
        }
    }

    let config = match load_config(overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}\n\n{}", cli::usage_text());
            std::process::exit(2);
        }
    };
    info!("following {} as {:?}", config.team_id, config.name);

    match mode {
        Mode::Json => run_once(&config).await,
        Mode::Watch => run_watch(&config).await,
        Mode::Tui => run_tui(&config).await,
    }
}

/// File, then environment, then command line; later layers win.
fn load_config(overrides: ConfigLayer) -> Result<SensorConfig, ConfigError> {
    let file = ConfigLayer::from_file(&config_path())?.unwrap_or_default();
    let env = ConfigLayer::from_env()?;
    SensorConfig::resolve([file, env, overrides])
}

async fn run_once(config: &SensorConfig) -> anyhow::Result<()> {
    let handle = SensorHandle::new();
    let sensor = Sensor::new(config, handle.clone());
    let coordinator = Coordinator::new(config, handle);

    let result = coordinator.refresh().await;
    println!("{}", serde_json::to_string_pretty(&sensor.document())?);
    result?;
    Ok(())
}

async fn run_watch(config: &SensorConfig) -> anyhow::Result<()> {
    let handle = SensorHandle::new();
    let sensor = Sensor::new(config, handle.clone());

    // Held for the lifetime of the loop; dropping it stops the worker.
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(8);
    let (network_resp_tx, mut network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    let coordinator = Coordinator::new(config, handle);
    let network_worker =
        NetworkWorker::new(coordinator, network_req_rx, network_resp_tx).without_animation();
    let network_task = tokio::spawn(network_worker.run());

    loop {
        tokio::select! {
            response = network_resp_rx.recv() => match response {
                Some(NetworkResponse::SensorUpdated { .. } | NetworkResponse::UpdateFailed { .. }) => {
                    println!("{}", serde_json::to_string(&sensor.document())?);
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping");
                break;
            }
        }
    }

    drop(network_req_tx);
    network_task.abort();
    Ok(())
}

async fn run_tui(config: &SensorConfig) -> anyhow::Result<()> {
    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    let handle = SensorHandle::new();
    let app = Arc::new(Mutex::new(App::new(Sensor::new(config, handle.clone()))));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread: polls immediately, then on the coordinator's interval
    let coordinator = Coordinator::new(config, handle);
    let network_worker = NetworkWorker::new(coordinator, network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Clock thread, keeps the countdown and "updated ... ago" current
    let clock_tx = ui_event_tx.clone();
    let clock_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            if clock_tx.send(UiEvent::ClockTick).await.is_err() {
                break;
            }
        }
    });

    main_ui_loop(terminal, app, ui_event_rx, network_req_tx, network_resp_rx).await;

    input_handler.abort();
    network_task.abort();
    clock_task.abort();
    cleanup_terminal();

    Ok(())
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw = handle_network_response(response, &app, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            else => break,
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) -> bool {
    match ui_event {
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests).await;
            true
        }
        UiEvent::Resize | UiEvent::ClockTick => true,
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    loading: &mut LoadingState,
) -> bool {
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::SensorUpdated { status } => {
            let mut guard = app.lock().await;
            guard.on_sensor_updated(status);
        }
        NetworkResponse::UpdateFailed { message } => {
            error!("Update failed: {message}");
            let mut guard = app.lock().await;
            guard.on_update_failed(message);
        }
        NetworkResponse::Scheduled { next_refresh } => {
            let mut guard = app.lock().await;
            guard.on_scheduled(next_refresh);
        }
    }
    !loading.is_loading
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    terminal::enable_raw_mode()
}

/// Best effort; also runs from the panic hook.
pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}

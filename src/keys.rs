use crate::app::{App, MenuItem};
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) {
    let mut guard = app.lock().await;

    match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Game),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Attributes),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => guard.exit_help(),

        // Attribute table scrolling
        (MenuItem::Attributes, Char('j') | KeyCode::Down, _) => guard.attributes_scroll_down(),
        (MenuItem::Attributes, Char('k') | KeyCode::Up, _) => guard.attributes_scroll_up(),
        (MenuItem::Attributes, KeyCode::Esc, _) => guard.update_tab(MenuItem::Game),

        // Poll now
        (_, Char('r'), _) => {
            drop(guard);
            debug!("refresh requested from keyboard");
            let _ = network_requests.send(NetworkRequest::Refresh).await;
        }

        // Global
        (_, Char('f'), _) => guard.toggle_full_screen(),
        (_, Char('"'), _) => guard.toggle_show_logs(),

        _ => {}
    }
}

use crate::state::network::LoadingState;
use crossterm::event::KeyEvent;
use mlb_api::GameStatus;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    /// Cut the current wait short and poll now.
    Refresh,
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    /// A poll cycle succeeded; the data itself lives in the sensor handle.
    SensorUpdated { status: GameStatus },
    UpdateFailed { message: String },
    Scheduled { next_refresh: Instant },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    ClockTick,
}

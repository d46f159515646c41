use crate::state::app_settings::AppSettings;
use crate::state::app_state::AppState;
use log::info;
use mlb_api::GameStatus;
use mlb_api::sensor::Sensor;
use std::time::Instant;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Game,
    Attributes,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
    pub sensor: Sensor,
}

impl App {
    pub fn new(sensor: Sensor) -> Self {
        let settings = AppSettings::load();

        let app = Self {
            state: AppState::new(),
            settings,
            sensor,
        };

        if let Some(level) = app.settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        app
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_sensor_updated(&mut self, status: GameStatus) {
        if self.state.last_error.is_some() {
            info!("{} recovered, state {status}", self.sensor.name());
        }
        self.state.last_error = None;
        self.state.schedule.record_cycle(true);
        let total = self.sensor.attributes().len();
        if usize::from(self.state.attributes.scroll_offset) >= total {
            self.state.attributes.scroll_offset = total.saturating_sub(1) as u16;
        }
    }

    pub fn on_update_failed(&mut self, message: String) {
        self.state.schedule.record_cycle(false);
        self.state.last_error = Some(message);
    }

    pub fn on_scheduled(&mut self, next_refresh: Instant) {
        self.state.schedule.next_refresh = Some(next_refresh);
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
        if self.state.active_tab == MenuItem::Attributes {
            self.state.attributes.scroll_offset = 0;
        }
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    pub fn attributes_scroll_down(&mut self) {
        let total = self.sensor.attributes().len();
        self.state.attributes.scroll_down(total);
    }

    pub fn attributes_scroll_up(&mut self) {
        self.state.attributes.scroll_up();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlb_api::config::SensorConfig;
    use mlb_api::sensor::SensorHandle;

    fn app() -> App {
        let config = SensorConfig::new("NYY");
        App::new(Sensor::new(&config, SensorHandle::new()))
    }

    #[test]
    fn help_returns_to_previous_tab() {
        let mut app = app();
        app.update_tab(MenuItem::Attributes);
        app.update_tab(MenuItem::Help);
        app.exit_help();
        assert_eq!(app.state.active_tab, MenuItem::Attributes);
    }

    #[test]
    fn failure_then_success_clears_error() {
        let mut app = app();
        app.on_update_failed("Request timed out".into());
        assert_eq!(app.state.last_error.as_deref(), Some("Request timed out"));
        app.on_sensor_updated(GameStatus::Pre);
        assert!(app.state.last_error.is_none());
        assert_eq!(app.state.schedule.cycles, 2);
        assert_eq!(app.state.schedule.failures, 1);
    }

    #[test]
    fn scrolling_without_data_stays_at_top() {
        let mut app = app();
        app.attributes_scroll_down();
        assert_eq!(app.state.attributes.scroll_offset, 0);
    }
}

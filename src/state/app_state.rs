use crate::app::MenuItem;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Poll schedule as seen by the UI
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ScheduleState {
    /// When the worker will poll next; set after every cycle.
    pub next_refresh: Option<Instant>,
    /// Completed cycles, successful or not.
    pub cycles: u64,
    pub failures: u64,
}

impl ScheduleState {
    pub fn record_cycle(&mut self, ok: bool) {
        self.cycles += 1;
        if !ok {
            self.failures += 1;
        }
    }

    /// Time left until the next poll, rounded down to whole seconds.
    pub fn countdown(&self, now: Instant) -> Option<Duration> {
        self.next_refresh
            .map(|at| at.saturating_duration_since(now))
            .map(|d| Duration::from_secs(d.as_secs()))
    }
}

// ---------------------------------------------------------------------------
// Attribute table state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AttributesState {
    pub scroll_offset: u16,
}

impl AttributesState {
    pub fn scroll_down(&mut self, total: usize) {
        let max = total.saturating_sub(1) as u16;
        self.scroll_offset = (self.scroll_offset + 1).min(max);
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub schedule: ScheduleState,
    pub attributes: AttributesState,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_is_none_before_first_cycle() {
        let schedule = ScheduleState::default();
        assert!(schedule.countdown(Instant::now()).is_none());
    }

    #[test]
    fn countdown_saturates_at_zero() {
        let now = Instant::now();
        let schedule = ScheduleState { next_refresh: Some(now), ..Default::default() };
        let later = now + Duration::from_secs(3);
        assert_eq!(schedule.countdown(later), Some(Duration::ZERO));
    }

    #[test]
    fn countdown_rounds_down() {
        let now = Instant::now();
        let schedule = ScheduleState {
            next_refresh: Some(now + Duration::from_millis(4_900)),
            ..Default::default()
        };
        assert_eq!(schedule.countdown(now), Some(Duration::from_secs(4)));
    }

    #[test]
    fn cycles_count_failures() {
        let mut schedule = ScheduleState::default();
        schedule.record_cycle(true);
        schedule.record_cycle(false);
        assert_eq!(schedule.cycles, 2);
        assert_eq!(schedule.failures, 1);
    }

    #[test]
    fn attribute_scroll_is_clamped() {
        let mut attrs = AttributesState::default();
        attrs.scroll_up();
        assert_eq!(attrs.scroll_offset, 0);
        for _ in 0..10 {
            attrs.scroll_down(3);
        }
        assert_eq!(attrs.scroll_offset, 2);
    }
}

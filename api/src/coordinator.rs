//! Poll coordination for one configured team.
//!
//! The coordinator owns the fetch; callers own the clock. Each call to
//! [`Coordinator::refresh`] runs one cycle and records its outcome in the
//! [`SensorHandle`]; [`Coordinator::update_interval`] says how long to wait
//! before the next one.

use crate::GameState;
use crate::client::{ApiError, ApiResult, MlbApi};
use crate::config::SensorConfig;
use crate::sensor::SensorHandle;
use log::{debug, warn};
use std::time::Duration;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const FAST_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Coordinator {
    api: MlbApi,
    team_id: String,
    /// Bounds a whole cycle, scoreboard and team feed together.
    timeout: Duration,
    handle: SensorHandle,
}

impl Coordinator {
    pub fn new(config: &SensorConfig, handle: SensorHandle) -> Self {
        let api = MlbApi::new().with_timeout(config.timeout());
        Self::with_api(api, config, handle)
    }

    pub fn with_api(api: MlbApi, config: &SensorConfig, handle: SensorHandle) -> Self {
        debug!(
            "{}: data will be updated every {:?}",
            config.name, DEFAULT_UPDATE_INTERVAL
        );
        Self {
            api,
            team_id: config.team_id.clone(),
            timeout: config.timeout(),
            handle,
        }
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn handle(&self) -> &SensorHandle {
        &self.handle
    }

    /// Run one poll cycle. On success the interval is recomputed from the
    /// game; on failure the previous interval and game are kept and the
    /// error is returned for the host to surface.
    pub async fn refresh(&self) -> ApiResult<GameState> {
        let fetch = self.api.fetch_game_state(&self.team_id);
        let result = tokio::time::timeout(self.timeout, fetch)
            .await
            .unwrap_or_else(|_| Err(ApiError::Timeout(self.timeout)));

        match result {
            Ok(game) => {
                let interval = interval_for(&game);
                debug!(
                    "{} is {}, next update in {:?}",
                    self.team_id, game.status, interval
                );
                self.handle.record_success(game.clone(), interval);
                Ok(game)
            }
            Err(e) => {
                warn!("update failed for {}: {e}", self.team_id);
                self.handle.record_failure(e.to_string());
                Err(e)
            }
        }
    }

    pub fn update_interval(&self) -> Duration {
        self.handle.update_interval()
    }
}

pub fn interval_for(game: &GameState) -> Duration {
    if game.fast_refresh {
        FAST_UPDATE_INTERVAL
    } else {
        DEFAULT_UPDATE_INTERVAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameStatus;
    use crate::client::fixtures::{
        scoreboard_competitor, scoreboard_event, team_feed, team_feed_competitor,
    };
    use crate::sensor::Sensor;
    use serde_json::json;

    fn config() -> SensorConfig {
        SensorConfig::new("NYY")
    }

    fn scoreboard(state: &str, description: &str, date: &str) -> String {
        json!({
            "events": [scoreboard_event(
                state,
                description,
                date,
                vec![
                    scoreboard_competitor("NYY", "home", "2", &[2.0]),
                    scoreboard_competitor("BOS", "away", "0", &[0.0]),
                ],
            )]
        })
        .to_string()
    }

    async fn coordinator_for(server: &mockito::ServerGuard, handle: SensorHandle) -> Coordinator {
        let api = MlbApi::new().with_base_url(server.url());
        Coordinator::with_api(api, &config(), handle)
    }

    #[tokio::test]
    async fn live_game_switches_to_fast_interval() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scoreboard")
            .with_status(200)
            .with_body(scoreboard("in", "In Progress", "2026-07-04T21:05Z"))
            .create_async()
            .await;

        let handle = SensorHandle::new();
        let coordinator = coordinator_for(&server, handle.clone()).await;
        assert_eq!(coordinator.update_interval(), DEFAULT_UPDATE_INTERVAL);

        let game = coordinator.refresh().await.unwrap();
        assert_eq!(game.status, GameStatus::In);
        assert_eq!(coordinator.update_interval(), FAST_UPDATE_INTERVAL);
        assert!(handle.last_update_success());
    }

    #[tokio::test]
    async fn finished_game_returns_to_default_interval() {
        let mut server = mockito::Server::new_async().await;
        let live = server
            .mock("GET", "/scoreboard")
            .with_status(200)
            .with_body(scoreboard("in", "In Progress", "2026-07-04T21:05Z"))
            .expect(1)
            .create_async()
            .await;

        let handle = SensorHandle::new();
        let coordinator = coordinator_for(&server, handle.clone()).await;
        coordinator.refresh().await.unwrap();
        assert_eq!(coordinator.update_interval(), FAST_UPDATE_INTERVAL);
        live.remove_async().await;

        server
            .mock("GET", "/scoreboard")
            .with_status(200)
            .with_body(scoreboard("post", "Final", "2026-07-04T21:05Z"))
            .create_async()
            .await;
        let game = coordinator.refresh().await.unwrap();
        assert_eq!(game.status, GameStatus::Post);
        assert_eq!(coordinator.update_interval(), DEFAULT_UPDATE_INTERVAL);
    }

    #[tokio::test]
    async fn failure_leaves_interval_and_data_in_place() {
        let mut server = mockito::Server::new_async().await;
        let live = server
            .mock("GET", "/scoreboard")
            .with_status(200)
            .with_body(scoreboard("in", "In Progress", "2026-07-04T21:05Z"))
            .create_async()
            .await;

        let handle = SensorHandle::new();
        let sensor = Sensor::new(&config(), handle.clone());
        let coordinator = coordinator_for(&server, handle.clone()).await;
        coordinator.refresh().await.unwrap();
        live.remove_async().await;

        server
            .mock("GET", "/scoreboard")
            .with_status(500)
            .create_async()
            .await;
        assert!(coordinator.refresh().await.is_err());

        assert_eq!(coordinator.update_interval(), FAST_UPDATE_INTERVAL);
        assert!(!sensor.available());
        assert_eq!(sensor.state(), Some(GameStatus::In));
        assert!(handle.last_error().is_some());
    }

    #[tokio::test]
    async fn timeout_covers_scoreboard_and_team_feed_together() {
        let mut server = mockito::Server::new_async().await;
        let stall = |body: String| {
            move |w: &mut dyn std::io::Write| {
                std::thread::sleep(Duration::from_millis(700));
                w.write_all(body.as_bytes())
            }
        };
        server
            .mock("GET", "/scoreboard")
            .with_status(200)
            .with_chunked_body(stall(json!({ "events": [] }).to_string()))
            .create_async()
            .await;
        server
            .mock("GET", "/teams/NYY")
            .with_status(200)
            .with_chunked_body(stall(
                team_feed(
                    "pre",
                    "Scheduled",
                    "2099-07-06T23:10Z",
                    vec![team_feed_competitor("BOS", "home"), team_feed_competitor("NYY", "away")],
                )
                .to_string(),
            ))
            .create_async()
            .await;

        let mut config = config();
        config.timeout = 1;
        let handle = SensorHandle::new();
        let api = MlbApi::new().with_base_url(server.url());
        let coordinator = Coordinator::with_api(api, &config, handle.clone());

        let started = std::time::Instant::now();
        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(_)), "got {err}");
        assert!(started.elapsed() < Duration::from_millis(1_300));
        assert!(!handle.last_update_success());
        assert_eq!(coordinator.update_interval(), DEFAULT_UPDATE_INTERVAL);
    }

    #[tokio::test]
    async fn first_cycle_failure_leaves_sensor_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scoreboard")
            .with_status(500)
            .create_async()
            .await;

        let handle = SensorHandle::new();
        let sensor = Sensor::new(&config(), handle.clone());
        let coordinator = coordinator_for(&server, handle).await;
        assert!(coordinator.refresh().await.is_err());

        assert!(sensor.state().is_none());
        assert!(sensor.attributes().is_empty());
        assert_eq!(coordinator.update_interval(), DEFAULT_UPDATE_INTERVAL);
    }
}

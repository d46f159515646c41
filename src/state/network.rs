use crate::state::messages::{NetworkRequest, NetworkResponse};
use log::{debug, error};
use mlb_api::coordinator::Coordinator;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

/// Polls the coordinator forever: fetch, report, sleep for the interval the
/// coordinator picked, repeat. A `Refresh` request ends the sleep early.
/// Fetches never overlap since this is the only task that runs them.
pub struct NetworkWorker {
    coordinator: Coordinator,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
    animate: bool,
}

impl NetworkWorker {
    pub fn new(
        coordinator: Coordinator,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            coordinator,
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
            animate: true,
        }
    }

    /// No spinner frames; for consumers that are not drawing anything.
    pub fn without_animation(mut self) -> Self {
        self.animate = false;
        self
    }

    pub async fn run(mut self) {
        loop {
            self.start_loading_animation().await;
            let result = self.coordinator.refresh().await;
            debug!("poll cycle for {} complete", self.coordinator.team_id());

            // Refresh requests that piled up during the fetch are already satisfied.
            while self.requests.try_recv().is_ok() {}

            self.stop_loading_animation(result.is_ok()).await;

            let interval = self.coordinator.update_interval();
            let outcome = match result {
                Ok(game) => NetworkResponse::SensorUpdated { status: game.status },
                Err(err) => NetworkResponse::UpdateFailed { message: err.to_string() },
            };
            let scheduled = NetworkResponse::Scheduled { next_refresh: Instant::now() + interval };
            if !self.report(outcome).await || !self.report(scheduled).await {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                request = self.requests.recv() => match request {
                    Some(NetworkRequest::Refresh) => debug!("manual refresh requested"),
                    None => break,
                }
            }
        }
    }

    /// False once the host has gone away.
    async fn report(&self, response: NetworkResponse) -> bool {
        match self.responses.send(response).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send network response: {e}");
                false
            }
        }
    }

    async fn start_loading_animation(&self) {
        if !self.animate {
            return;
        }
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        if !self.animate {
            return;
        }
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlb_api::GameStatus;
    use mlb_api::client::MlbApi;
    use mlb_api::config::SensorConfig;
    use mlb_api::coordinator::{DEFAULT_UPDATE_INTERVAL, FAST_UPDATE_INTERVAL};
    use mlb_api::sensor::SensorHandle;
    use serde_json::json;
    use tokio::task::JoinHandle;

    fn scoreboard(state: &str, description: &str) -> String {
        let status = json!({ "period": 3, "type": { "state": state, "description": description } });
        json!({
            "events": [{
                "id": "401",
                "date": "2026-07-04T21:05Z",
                "shortName": "BOS @ NYY",
                "status": status,
                "competitions": [{
                    "status": status,
                    "competitors": [
                        {
                            "homeAway": "home",
                            "score": "2",
                            "team": { "id": "10", "abbreviation": "NYY", "shortDisplayName": "Yankees" }
                        },
                        {
                            "homeAway": "away",
                            "score": "1",
                            "team": { "id": "2", "abbreviation": "BOS", "shortDisplayName": "Red Sox" }
                        }
                    ]
                }]
            }]
        })
        .to_string()
    }

    struct Harness {
        requests: mpsc::Sender<NetworkRequest>,
        responses: mpsc::Receiver<NetworkResponse>,
        task: JoinHandle<()>,
    }

    fn spawn_worker(server: &mockito::ServerGuard) -> Harness {
        let config = SensorConfig::new("NYY");
        let api = MlbApi::new().with_base_url(server.url());
        let coordinator = Coordinator::with_api(api, &config, SensorHandle::new());

        let (req_tx, req_rx) = mpsc::channel(8);
        let (resp_tx, resp_rx) = mpsc::channel(32);
        let worker = NetworkWorker::new(coordinator, req_rx, resp_tx).without_animation();
        Harness {
            requests: req_tx,
            responses: resp_rx,
            task: tokio::spawn(worker.run()),
        }
    }

    async fn next(responses: &mut mpsc::Receiver<NetworkResponse>) -> NetworkResponse {
        tokio::time::timeout(Duration::from_secs(5), responses.recv())
            .await
            .expect("worker should respond without waiting out the interval")
            .expect("worker channel closed")
    }

    /// Wait from now until the scheduled poll, as seen by the host.
    async fn next_wait(responses: &mut mpsc::Receiver<NetworkResponse>) -> Duration {
        match next(responses).await {
            NetworkResponse::Scheduled { next_refresh } => {
                next_refresh.saturating_duration_since(Instant::now())
            }
            other => panic!("expected Scheduled, got {other:?}"),
        }
    }

    fn assert_close(wait: Duration, interval: Duration) {
        assert!(wait <= interval, "{wait:?} > {interval:?}");
        assert!(wait + Duration::from_secs(2) > interval, "{wait:?} far below {interval:?}");
    }

    #[tokio::test]
    async fn first_poll_is_immediate_and_final_game_waits_default_interval() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scoreboard")
            .with_status(200)
            .with_body(scoreboard("post", "Final"))
            .create_async()
            .await;

        let mut h = spawn_worker(&server);
        assert!(matches!(
            next(&mut h.responses).await,
            NetworkResponse::SensorUpdated { status: GameStatus::Post }
        ));
        assert_close(next_wait(&mut h.responses).await, DEFAULT_UPDATE_INTERVAL);
        h.task.abort();
    }

    #[tokio::test]
    async fn live_game_waits_fast_interval() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scoreboard")
            .with_status(200)
            .with_body(scoreboard("in", "In Progress"))
            .create_async()
            .await;

        let mut h = spawn_worker(&server);
        assert!(matches!(
            next(&mut h.responses).await,
            NetworkResponse::SensorUpdated { status: GameStatus::In }
        ));
        assert_close(next_wait(&mut h.responses).await, FAST_UPDATE_INTERVAL);
        h.task.abort();
    }

    #[tokio::test]
    async fn failed_cycle_is_reported_and_loop_keeps_running() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/scoreboard")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let mut h = spawn_worker(&server);
        match next(&mut h.responses).await {
            NetworkResponse::UpdateFailed { message } => assert!(message.contains("API error")),
            other => panic!("expected UpdateFailed, got {other:?}"),
        }
        assert_close(next_wait(&mut h.responses).await, DEFAULT_UPDATE_INTERVAL);

        h.requests.send(NetworkRequest::Refresh).await.unwrap();
        assert!(matches!(next(&mut h.responses).await, NetworkResponse::UpdateFailed { .. }));
        assert_close(next_wait(&mut h.responses).await, DEFAULT_UPDATE_INTERVAL);

        failing.assert_async().await;
        h.task.abort();
    }

    #[tokio::test]
    async fn refresh_request_cuts_the_wait_short() {
        let mut server = mockito::Server::new_async().await;
        let scoreboard = server
            .mock("GET", "/scoreboard")
            .with_status(200)
            .with_body(scoreboard("post", "Final"))
            .expect(2)
            .create_async()
            .await;

        let mut h = spawn_worker(&server);
        assert!(matches!(next(&mut h.responses).await, NetworkResponse::SensorUpdated { .. }));
        next_wait(&mut h.responses).await;

        h.requests.send(NetworkRequest::Refresh).await.unwrap();
        assert!(matches!(next(&mut h.responses).await, NetworkResponse::SensorUpdated { .. }));
        assert_close(next_wait(&mut h.responses).await, DEFAULT_UPDATE_INTERVAL);

        // One fetch per cycle, nothing in between.
        scoreboard.assert_async().await;
        h.task.abort();
    }

    #[tokio::test]
    async fn dropping_the_request_sender_stops_the_worker() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scoreboard")
            .with_status(200)
            .with_body(scoreboard("post", "Final"))
            .create_async()
            .await;

        let Harness { requests, mut responses, task } = spawn_worker(&server);
        next(&mut responses).await;
        next_wait(&mut responses).await;

        drop(requests);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("worker should stop when its request channel closes")
            .unwrap();
    }

    #[tokio::test]
    async fn dropping_the_host_stops_the_worker() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scoreboard")
            .with_status(200)
            .with_body(scoreboard("post", "Final"))
            .create_async()
            .await;

        let Harness { requests, responses, task } = spawn_worker(&server);
        drop(responses);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("worker should stop once nobody listens")
            .unwrap();
        drop(requests);
    }
}

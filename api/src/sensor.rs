//! The sensor entity: a primary state plus a flat attribute set, read from
//! the shared [`SensorHandle`] the coordinator writes into.

use crate::config::{SensorConfig, slugify};
use crate::coordinator::DEFAULT_UPDATE_INTERVAL;
use crate::{GameState, GameStatus, INNINGS, TeamSide};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

pub const ATTRIBUTION: &str = "Data provided by ESPN";
pub const DEFAULT_ICON: &str = "mdi:baseball";

/// Outcome of the most recent poll cycles for one configured team.
#[derive(Debug, Clone)]
pub struct SensorData {
    /// Last successfully fetched game. Survives later failures.
    pub game: Option<GameState>,
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub update_interval: Duration,
    pub last_attempt: Option<DateTime<Utc>>,
}

impl Default for SensorData {
    fn default() -> Self {
        Self {
            game: None,
            last_update_success: false,
            last_error: None,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            last_attempt: None,
        }
    }
}

/// Per-instance state shared by the coordinator (writer) and the sensor
/// (reader). Cloning yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct SensorHandle {
    inner: Arc<RwLock<SensorData>>,
}

impl SensorHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, game: GameState, interval: Duration) {
        let mut data = self.inner.write();
        data.last_attempt = Some(game.last_update);
        data.game = Some(game);
        data.last_update_success = true;
        data.last_error = None;
        data.update_interval = interval;
    }

    /// Keeps the previous game and interval.
    pub fn record_failure(&self, message: String) {
        let mut data = self.inner.write();
        data.last_attempt = Some(Utc::now());
        data.last_update_success = false;
        data.last_error = Some(message);
    }

    pub fn snapshot(&self) -> SensorData {
        self.inner.read().clone()
    }

    pub fn game(&self) -> Option<GameState> {
        self.inner.read().game.clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.read().last_update_success
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    pub fn update_interval(&self) -> Duration {
        self.inner.read().update_interval
    }
}

/// The entity shown to the host.
#[derive(Debug, Clone)]
pub struct Sensor {
    name: String,
    entry_id: String,
    handle: SensorHandle,
}

impl Sensor {
    pub fn new(config: &SensorConfig, handle: SensorHandle) -> Self {
        Self {
            name: config.name.clone(),
            entry_id: config.entry_id(),
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> String {
        format!("{}_{}", slugify(&self.name), self.entry_id)
    }

    pub fn icon(&self) -> &'static str {
        DEFAULT_ICON
    }

    /// None until the first successful fetch.
    pub fn state(&self) -> Option<GameStatus> {
        self.handle.game().map(|g| g.status)
    }

    pub fn available(&self) -> bool {
        self.handle.last_update_success()
    }

    pub fn attributes(&self) -> Attributes {
        self.handle
            .game()
            .map(|g| project(&g))
            .unwrap_or_default()
    }

    pub fn handle(&self) -> &SensorHandle {
        &self.handle
    }

    /// Everything a host needs in one document.
    pub fn document(&self) -> SensorDocument {
        SensorDocument {
            name: self.name.clone(),
            unique_id: self.unique_id(),
            icon: self.icon(),
            state: self.state(),
            available: self.available(),
            attributes: self.attributes(),
        }
    }
}

/// Serializes field by field, so attributes keep their display order in the
/// output text.
#[derive(Debug, Clone, Serialize)]
pub struct SensorDocument {
    pub name: String,
    pub unique_id: String,
    pub icon: &'static str,
    pub state: Option<GameStatus>,
    pub available: bool,
    pub attributes: Attributes,
}

/// Ordered name → value pairs. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(&'static str, Value)>);

impl Attributes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    fn push(&mut self, name: &'static str, value: impl Into<Value>) {
        self.0.push((name, value.into()));
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

const TEAM_INNING_KEYS: [&str; INNINGS] = [
    "team_inning_1", "team_inning_2", "team_inning_3",
    "team_inning_4", "team_inning_5", "team_inning_6",
    "team_inning_7", "team_inning_8", "team_inning_9",
];

const OPPONENT_INNING_KEYS: [&str; INNINGS] = [
    "opponent_inning_1", "opponent_inning_2", "opponent_inning_3",
    "opponent_inning_4", "opponent_inning_5", "opponent_inning_6",
    "opponent_inning_7", "opponent_inning_8", "opponent_inning_9",
];

struct SideKeys {
    abbr: &'static str,
    id: &'static str,
    name: &'static str,
    record: &'static str,
    homeaway: &'static str,
    logo: &'static str,
    colors: &'static str,
    score: &'static str,
    innings: &'static [&'static str; INNINGS],
}

const TEAM_KEYS: SideKeys = SideKeys {
    abbr: "team_abbr",
    id: "team_id",
    name: "team_name",
    record: "team_record",
    homeaway: "team_homeaway",
    logo: "team_logo",
    colors: "team_colors",
    score: "team_score",
    innings: &TEAM_INNING_KEYS,
};

const OPPONENT_KEYS: SideKeys = SideKeys {
    abbr: "opponent_abbr",
    id: "opponent_id",
    name: "opponent_name",
    record: "opponent_record",
    homeaway: "opponent_homeaway",
    logo: "opponent_logo",
    colors: "opponent_colors",
    score: "opponent_score",
    innings: &OPPONENT_INNING_KEYS,
};

/// Flatten a game into display attributes.
pub fn project(game: &GameState) -> Attributes {
    let mut attrs = Attributes::default();
    attrs.push("attribution", ATTRIBUTION);
    attrs.push("date", game.date.to_rfc3339_opts(SecondsFormat::Secs, true));
    attrs.push("first_pitch", game.first_pitch.clone());
    attrs.push("inning", game.inning);
    attrs.push("venue", game.venue.clone());
    attrs.push("location", game.location.clone());
    attrs.push("tv_network", game.tv_network.clone());
    push_side(&mut attrs, &TEAM_KEYS, &game.team);
    push_side(&mut attrs, &OPPONENT_KEYS, &game.opponent);
    attrs.push(
        "last_update",
        game.last_update
            .with_timezone(&Local)
            .to_rfc3339_opts(SecondsFormat::Secs, false),
    );
    attrs.push("last_play", game.last_play.clone());
    attrs
}

fn push_side(attrs: &mut Attributes, keys: &SideKeys, side: &TeamSide) {
    attrs.push(keys.abbr, side.abbr.clone());
    attrs.push(keys.id, side.id.clone());
    attrs.push(keys.name, side.name.clone());
    attrs.push(keys.record, side.record.clone());
    attrs.push(keys.homeaway, side.home_away.clone());
    attrs.push(keys.logo, side.logo.clone());
    attrs.push(keys.colors, json!(side.colors));
    attrs.push(keys.score, side.score);
    for (&key, runs) in keys.innings.iter().zip(side.innings) {
        attrs.push(key, runs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn game(status: GameStatus) -> GameState {
        let date = Utc.with_ymd_and_hms(2026, 7, 4, 23, 5, 0).unwrap();
        GameState {
            status,
            date,
            first_pitch: "in an hour".into(),
            inning: Some(3),
            venue: Some("Yankee Stadium".into()),
            location: Some("Bronx, NY".into()),
            tv_network: None,
            team: TeamSide {
                abbr: "NYY".into(),
                id: "10".into(),
                name: "Yankees".into(),
                record: Some("50-30".into()),
                home_away: "home".into(),
                logo: Some("nyy.png".into()),
                colors: ["#132448".into(), "#c4ced4".into()],
                score: Some(3),
                innings: [1, 0, 2, 0, 0, 0, 0, 0, 0],
            },
            opponent: TeamSide {
                abbr: "BOS".into(),
                home_away: "away".into(),
                score: Some(1),
                innings: [0, 1, 0, 0, 0, 0, 0, 0, 0],
                ..Default::default()
            },
            last_play: Some("Single to right.".into()),
            last_update: date,
            fast_refresh: true,
        }
    }

    fn config() -> SensorConfig {
        SensorConfig::resolve([crate::config::ConfigLayer {
            team_id: Some("NYY".into()),
            name: Some("Bronx Bombers".into()),
            timeout: None,
        }])
        .unwrap()
    }

    #[test]
    fn nothing_fetched_yet_means_no_state_and_no_attributes() {
        let sensor = Sensor::new(&config(), SensorHandle::new());
        assert!(sensor.state().is_none());
        assert!(!sensor.available());
        assert!(sensor.attributes().is_empty());
    }

    #[test]
    fn entity_identity() {
        let sensor = Sensor::new(&config(), SensorHandle::new());
        assert_eq!(sensor.name(), "Bronx Bombers");
        assert_eq!(sensor.unique_id(), "bronx_bombers_nyy");
        assert_eq!(sensor.icon(), "mdi:baseball");
    }

    #[test]
    fn projection_flattens_both_sides() {
        let attrs = project(&game(GameStatus::In));
        assert_eq!(attrs.get("attribution"), Some(&json!(ATTRIBUTION)));
        assert_eq!(attrs.get("team_abbr"), Some(&json!("NYY")));
        assert_eq!(attrs.get("team_score"), Some(&json!(3)));
        assert_eq!(attrs.get("team_inning_3"), Some(&json!(2)));
        assert_eq!(attrs.get("opponent_inning_2"), Some(&json!(1)));
        assert_eq!(attrs.get("opponent_inning_9"), Some(&json!(0)));
        assert_eq!(attrs.get("team_colors"), Some(&json!(["#132448", "#c4ced4"])));
        assert_eq!(attrs.get("tv_network"), Some(&Value::Null));
        assert_eq!(attrs.get("opponent_record"), Some(&Value::Null));
        assert_eq!(attrs.get("inning"), Some(&json!(3)));
        assert_eq!(attrs.get("date"), Some(&json!("2026-07-04T23:05:00Z")));
        assert_eq!(attrs.len(), 7 + 2 * (8 + INNINGS) + 2);
    }

    #[test]
    fn projection_serializes_in_display_order() {
        let attrs = project(&game(GameStatus::Post));
        let value = serde_json::to_value(&attrs).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), attrs.len());
        let names: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(names.first(), Some(&"attribution"));
        assert_eq!(names.last(), Some(&"last_play"));
    }

    #[test]
    fn document_text_keeps_attribute_order() {
        let handle = SensorHandle::new();
        let sensor = Sensor::new(&config(), handle.clone());
        handle.record_success(game(GameStatus::In), Duration::from_secs(5));

        let text = serde_json::to_string(&sensor.document()).unwrap();
        let position = |key: &str| {
            text.find(&format!("\"{key}\":"))
                .unwrap_or_else(|| panic!("{key} missing from {text}"))
        };
        let order = [
            "name", "unique_id", "icon", "state", "available", "attributes",
            "attribution", "date", "first_pitch", "inning", "venue", "location",
            "tv_network", "team_abbr", "team_inning_9", "opponent_abbr",
            "opponent_inning_9", "last_update", "last_play",
        ];
        let positions: Vec<usize> = order.iter().map(|&k| position(k)).collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "keys out of order in {text}"
        );
    }

    #[test]
    fn failure_keeps_last_game_but_marks_unavailable() {
        let handle = SensorHandle::new();
        let sensor = Sensor::new(&config(), handle.clone());

        handle.record_success(game(GameStatus::In), Duration::from_secs(5));
        assert_eq!(sensor.state(), Some(GameStatus::In));
        assert!(sensor.available());

        handle.record_failure("Network error".into());
        assert!(!sensor.available());
        assert_eq!(sensor.state(), Some(GameStatus::In));
        assert!(!sensor.attributes().is_empty());
        assert_eq!(handle.update_interval(), Duration::from_secs(5));
        assert_eq!(handle.last_error().as_deref(), Some("Network error"));
    }

    #[test]
    fn json_document_carries_state_and_attributes() {
        let handle = SensorHandle::new();
        let sensor = Sensor::new(&config(), handle.clone());
        handle.record_success(game(GameStatus::Pre), Duration::from_secs(600));

        let doc = serde_json::to_value(sensor.document()).unwrap();
        assert_eq!(doc["state"], json!("PRE"));
        assert_eq!(doc["available"], json!(true));
        assert_eq!(doc["unique_id"], json!("bronx_bombers_nyy"));
        assert_eq!(doc["attributes"]["team_name"], json!("Yankees"));
    }
}

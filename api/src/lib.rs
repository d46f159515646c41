pub mod client;
pub mod config;
pub mod coordinator;
pub mod espn;
pub mod sensor;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Number of per-inning slots carried for each side of the line score.
pub const INNINGS: usize = 9;

/// A PRE game starting within this many seconds switches to fast refresh.
pub const FAST_REFRESH_WINDOW_SECS: i64 = 1200;

// ---------------------------------------------------------------------------
// Domain types, independent of the ESPN wire format
// ---------------------------------------------------------------------------

/// Primary sensor state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameStatus {
    #[default]
    Pre,
    In,
    Post,
    Postponed,
}

impl GameStatus {
    /// Map ESPN's `status.type.state` ("pre" | "in" | "post") plus its
    /// description onto a status. A "post" game described as "Postponed"
    /// becomes `Postponed`.
    pub fn from_feed(state: &str, description: Option<&str>) -> Option<Self> {
        match state.to_ascii_lowercase().as_str() {
            "pre" => Some(GameStatus::Pre),
            "in" => Some(GameStatus::In),
            "post" if description == Some("Postponed") => Some(GameStatus::Postponed),
            "post" => Some(GameStatus::Post),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Pre => "PRE",
            GameStatus::In => "IN",
            GameStatus::Post => "POST",
            GameStatus::Postponed => "POSTPONED",
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of the game: the configured team or its opponent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSide {
    pub abbr: String,
    pub id: String,
    pub name: String,             // shortDisplayName, e.g. "Yankees"
    pub record: Option<String>,   // "12-7"
    pub home_away: String,        // "home" | "away"
    pub logo: Option<String>,
    pub colors: [String; 2],      // primary, alternate as "#RRGGBB"
    pub score: Option<u16>,
    pub innings: [u16; INNINGS],
}

impl TeamSide {
    pub fn is_home(&self) -> bool {
        self.home_away == "home"
    }
}

/// Snapshot of the tracked team's current or next game, rebuilt every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub status: GameStatus,
    pub date: DateTime<Utc>,
    /// `date` relative to the fetch time, e.g. "in 2 hours".
    pub first_pitch: String,
    /// Current inning, only while the game is live.
    pub inning: Option<u8>,
    pub venue: Option<String>,
    pub location: Option<String>,
    pub tv_network: Option<String>,
    pub team: TeamSide,
    pub opponent: TeamSide,
    pub last_play: Option<String>,
    pub last_update: DateTime<Utc>,
    pub fast_refresh: bool,
}

impl GameState {
    pub fn is_live(&self) -> bool {
        self.status == GameStatus::In
    }

    /// (away, home) in scoreboard order.
    pub fn away_home(&self) -> (&TeamSide, &TeamSide) {
        if self.team.is_home() {
            (&self.opponent, &self.team)
        } else {
            (&self.team, &self.opponent)
        }
    }
}

/// Live games always poll fast; scheduled games poll fast once first pitch
/// is less than twenty minutes out (or already past while still PRE).
pub fn needs_fast_refresh(status: GameStatus, date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match status {
        GameStatus::In => true,
        GameStatus::Pre => (date - now).num_seconds() < FAST_REFRESH_WINDOW_SECS,
        GameStatus::Post | GameStatus::Postponed => false,
    }
}

/// Render a signed offset from now the way a person would say it:
/// "in 5 minutes", "2 hours ago", "just now".
pub fn humanize(delta: TimeDelta) -> String {
    let secs = delta.num_seconds();
    let abs = secs.unsigned_abs();

    let phrase = match abs {
        0..10 => return "just now".to_string(),
        10..45 => format!("{abs} seconds"),
        45..90 => "a minute".to_string(),
        90..2_700 => format!("{} minutes", (abs + 30) / 60),
        2_700..5_400 => "an hour".to_string(),
        5_400..79_200 => format!("{} hours", (abs + 1_800) / 3_600),
        79_200..129_600 => "a day".to_string(),
        129_600..2_592_000 => format!("{} days", (abs + 43_200) / 86_400),
        2_592_000..3_888_000 => "a month".to_string(),
        3_888_000..31_536_000 => format!("{} months", (abs + 1_296_000) / 2_592_000),
        31_536_000..47_304_000 => "a year".to_string(),
        _ => format!("{} years", (abs + 15_768_000) / 31_536_000),
    };

    if secs > 0 {
        format!("in {phrase}")
    } else {
        format!("{phrase} ago")
    }
}

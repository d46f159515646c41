/// ESPN API raw wire types: serde shapes for the scoreboard and team feeds.
/// These map to our clean domain types via the mapping functions in client.rs.
///
/// The scoreboard and team endpoints describe the same event with slightly
/// different layouts, so most fields here are optional and a single struct
/// often carries the variant fields of both.
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Scoreboard  (site v2 API, /scoreboard)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScoreboardResponse {
    pub events: Option<Vec<EspnEvent>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnEvent {
    pub id: Option<String>,
    pub date: Option<String>, // "2026-07-04T23:05Z"
    pub name: Option<String>,
    #[serde(rename = "shortName")]
    pub short_name: Option<String>, // "BOS @ NYY"
    pub status: Option<EspnStatus>,
    pub competitions: Option<Vec<EspnCompetition>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnCompetition {
    pub competitors: Option<Vec<EspnCompetitor>>,
    pub status: Option<EspnStatus>,
    pub venue: Option<EspnVenue>,
    pub broadcasts: Option<Vec<EspnBroadcast>>,
    pub situation: Option<EspnSituation>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStatus {
    #[serde(rename = "type")]
    pub status_type: Option<EspnStatusType>,
    pub period: Option<u8>,
    #[serde(rename = "displayClock")]
    pub display_clock: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnStatusType {
    pub name: Option<String>,        // "STATUS_SCHEDULED", "STATUS_IN_PROGRESS", ...
    pub state: Option<String>,       // "pre" | "in" | "post"
    pub description: Option<String>, // "Scheduled", "In Progress", "Final", "Postponed"
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnCompetitor {
    pub id: Option<String>,
    #[serde(rename = "homeAway")]
    pub home_away: Option<String>,
    pub team: Option<EspnTeam>,
    pub score: Option<EspnScore>,
    /// Scoreboard layout: `[{ "summary": "12-7" }]`
    pub records: Option<Vec<EspnRecord>>,
    /// Team-feed layout: `[{ "displayValue": "12-7" }]`
    pub record: Option<Vec<EspnRecord>>,
    pub linescores: Option<Vec<EspnLineScore>>,
}

/// Scores arrive as a bare string on the scoreboard and as an object with a
/// numeric `value` on the team feed.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum EspnScore {
    Text(String),
    Detail(EspnScoreDetail),
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnScoreDetail {
    pub value: Option<f64>,
    #[serde(rename = "displayValue")]
    pub display_value: Option<String>,
}

impl EspnScore {
    /// Runs from the scoreboard's string form.
    pub fn text_runs(&self) -> Option<u16> {
        match self {
            EspnScore::Text(s) => s.trim().parse().ok(),
            EspnScore::Detail(_) => None,
        }
    }

    /// Runs from the team feed's `.value` form.
    pub fn value_runs(&self) -> Option<u16> {
        match self {
            EspnScore::Detail(d) => d.value.map(runs_from_f64),
            EspnScore::Text(_) => None,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnTeam {
    pub id: Option<String>,
    pub abbreviation: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "shortDisplayName")]
    pub short_display_name: Option<String>,
    pub color: Option<String>, // hex without '#'
    #[serde(rename = "alternateColor")]
    pub alternate_color: Option<String>,
    /// Scoreboard layout: a single logo URL.
    pub logo: Option<String>,
    /// Team-feed layout: several sizes/variants.
    pub logos: Option<Vec<EspnLogo>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnLogo {
    pub href: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnRecord {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub summary: Option<String>,
    #[serde(rename = "displayValue")]
    pub display_value: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnLineScore {
    pub value: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnVenue {
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub address: Option<EspnAddress>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnAddress {
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnBroadcast {
    /// Scoreboard layout: `["ESPN", "MLB.tv"]`
    pub names: Option<Vec<String>>,
    /// Team-feed layout: `{ "shortName": "ESPN" }`
    pub media: Option<EspnMedia>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnMedia {
    #[serde(rename = "shortName")]
    pub short_name: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnSituation {
    #[serde(rename = "lastPlay")]
    pub last_play: Option<EspnLastPlay>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnLastPlay {
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// Team  (site v2 API, /teams/{abbr})
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TeamResponse {
    pub team: Option<EspnTeamDetail>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EspnTeamDetail {
    pub id: Option<String>,
    pub abbreviation: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "nextEvent")]
    pub next_event: Option<Vec<EspnEvent>>,
}

/// ESPN reports runs as floats ("value": 3.0); negatives and NaN clamp to 0.
pub(crate) fn runs_from_f64(value: f64) -> u16 {
    if value.is_finite() && value > 0.0 {
        value.round().min(f64::from(u16::MAX)) as u16
    } else {
        0
    }
}

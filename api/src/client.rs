use crate::espn::{
    EspnCompetition, EspnCompetitor, EspnEvent, EspnStatus, ScoreboardResponse, TeamResponse,
    runs_from_f64,
};
use crate::{GameState, GameStatus, INNINGS, TeamSide, humanize, needs_fast_refresh};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

const ESPN_MLB: &str = "https://site.api.espn.com/apis/site/v2/sports/baseball/mlb";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 6.1; Win64; x64; rv:47.0) Gecko/20100101 Firefox/47.0";
const ACCEPT_JSON_LD: &str = "application/ld+json";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Team-feed events carry no colors; both slots fall back to black.
const NO_COLOR: &str = "#000000";
/// Scoreboard competitors without a `records` entry report this record.
const NO_RECORD: &str = "0-0-0";
/// The team feed lists several logo variants; this one is the scoreboard-sized logo.
const TEAM_FEED_LOGO_INDEX: usize = 3;

/// MLB API client backed by ESPN's public endpoints.
#[derive(Debug, Clone)]
pub struct MlbApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for MlbApi {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON_LD));
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .default_headers(headers)
                .build()
                .unwrap_or_default(),
            base_url: ESPN_MLB.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    /// The JSON parsed but lacks a field the mapping cannot do without.
    Schema(String),
    NotFound(String),
    /// The whole poll cycle, fallback included, ran past the configured timeout.
    Timeout(Duration),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) if e.is_timeout() => write!(f, "Request timed out for {url}"),
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::Schema(msg) => write!(f, "Unexpected response: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Timeout(limit) => write!(f, "Update timed out after {}s", limit.as_secs()),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Network(e, _) | ApiError::Api(e, _) | ApiError::Parsing(e, _) => Some(e),
            ApiError::Schema(_) | ApiError::NotFound(_) | ApiError::Timeout(_) => None,
        }
    }
}

impl MlbApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-request timeout. Covers connect, headers and body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point the client somewhere other than ESPN (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the current or next game for `team_id` (an ESPN abbreviation
    /// such as "NYY").
    ///
    /// The scoreboard is tried first; if no event there involves the team,
    /// the team endpoint's next scheduled event is used instead.
    pub async fn fetch_game_state(&self, team_id: &str) -> ApiResult<GameState> {
        let scoreboard = self.fetch_scoreboard().await?;
        let now = Utc::now();

        let events = scoreboard.events.unwrap_or_default();
        if let Some(event) = find_team_event(&events, team_id) {
            info!("found {team_id} on scoreboard feed");
            return map_scoreboard_event(event, team_id, now);
        }

        info!("{team_id} not on scoreboard feed, using team feed");
        let raw = self.fetch_team(team_id).await?;
        let next_event = raw
            .team
            .and_then(|t| t.next_event)
            .and_then(|events| events.into_iter().next())
            .ok_or_else(|| {
                ApiError::NotFound(format!("no current or upcoming game for {team_id}"))
            })?;
        map_next_event(&next_event, team_id, now)
    }

    pub async fn fetch_scoreboard(&self) -> ApiResult<ScoreboardResponse> {
        let url = format!("{}/scoreboard", self.base_url);
        self.get(&url).await
    }

    /// A 4xx from the team endpoint means ESPN does not know the abbreviation.
    pub async fn fetch_team(&self, team_id: &str) -> ApiResult<TeamResponse> {
        let url = format!("{}/teams/{team_id}", self.base_url);
        match self.get(&url).await {
            Err(ApiError::Api(e, url))
                if e.status().map(|s| s.is_client_error()).unwrap_or(false) =>
            {
                Err(ApiError::NotFound(format!("team {team_id} ({url})")))
            }
            other => other,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => Err(ApiError::Api(e, url.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Mapping: ESPN wire types → clean domain types
// ---------------------------------------------------------------------------

/// The scoreboard event whose short name ("BOS @ NYY") mentions the team.
/// On doubleheader days the later listing wins.
pub fn find_team_event<'a>(events: &'a [EspnEvent], team_id: &str) -> Option<&'a EspnEvent> {
    events
        .iter()
        .filter(|e| e.short_name.as_deref().is_some_and(|n| n.contains(team_id)))
        .last()
}

/// Map a scoreboard event. Line scores fill in once the game has started.
pub fn map_scoreboard_event(
    event: &EspnEvent,
    team_id: &str,
    now: DateTime<Utc>,
) -> ApiResult<GameState> {
    let competition = first_competition(event)?;
    let (raw_state, status, espn_status) = competition_status(event, competition)?;
    let date = event_date(event)?;
    let competitors = competition.competitors.as_deref().unwrap_or_default();
    let (team_idx, oppo_idx) = side_indices(competitors, team_id)?;
    debug!("team index {team_idx}, opponent index {oppo_idx}");

    let started = matches!(raw_state.as_str(), "in" | "post");
    let live = raw_state == "in";

    let tv_network = competition
        .broadcasts
        .as_ref()
        .and_then(|b| b.first())
        .and_then(|b| b.names.as_ref())
        .and_then(|names| names.first())
        .cloned();

    let last_play = if live {
        competition
            .situation
            .as_ref()
            .and_then(|s| s.last_play.as_ref())
            .and_then(|p| p.text.clone())
    } else {
        None
    };

    let (venue, location) = venue_fields(competition);

    Ok(GameState {
        status,
        date,
        first_pitch: humanize(date - now),
        inning: if live { espn_status.period } else { None },
        venue,
        location,
        tv_network,
        team: scoreboard_side(&competitors[team_idx], started),
        opponent: scoreboard_side(&competitors[oppo_idx], started),
        last_play,
        last_update: now,
        fast_refresh: needs_fast_refresh(status, date, now),
    })
}

/// Map the team feed's `nextEvent[0]`. This layout nests scores under
/// `.value`, lists logos, and carries no colors or line scores.
pub fn map_next_event(
    event: &EspnEvent,
    team_id: &str,
    now: DateTime<Utc>,
) -> ApiResult<GameState> {
    let competition = first_competition(event)?;
    let (raw_state, status, _) = competition_status(event, competition)?;
    let date = event_date(event)?;
    let competitors = competition.competitors.as_deref().unwrap_or_default();
    let (team_idx, oppo_idx) = side_indices(competitors, team_id)?;

    let finished = raw_state == "post";

    let tv_network = competition
        .broadcasts
        .as_ref()
        .and_then(|b| b.first())
        .and_then(|b| b.media.as_ref())
        .and_then(|m| m.short_name.clone());

    let (venue, location) = venue_fields(competition);

    Ok(GameState {
        status,
        date,
        first_pitch: humanize(date - now),
        inning: None,
        venue,
        location,
        tv_network,
        team: team_feed_side(&competitors[team_idx], finished),
        opponent: team_feed_side(&competitors[oppo_idx], finished),
        last_play: None,
        last_update: now,
        fast_refresh: needs_fast_refresh(status, date, now),
    })
}

fn first_competition(event: &EspnEvent) -> ApiResult<&EspnCompetition> {
    event
        .competitions
        .as_deref()
        .and_then(|c| c.first())
        .ok_or_else(|| ApiError::Schema(format!("event {} has no competitions", event_label(event))))
}

/// Lower-cased feed state, the mapped status, and the status block it came from.
/// The competition's status is authoritative; the event-level one is a fallback.
fn competition_status<'a>(
    event: &'a EspnEvent,
    competition: &'a EspnCompetition,
) -> ApiResult<(String, GameStatus, &'a EspnStatus)> {
    let espn_status = competition
        .status
        .as_ref()
        .or(event.status.as_ref())
        .ok_or_else(|| ApiError::Schema(format!("event {} has no status", event_label(event))))?;
    let status_type = espn_status.status_type.as_ref();
    let raw_state = status_type
        .and_then(|t| t.state.as_deref())
        .ok_or_else(|| ApiError::Schema(format!("event {} has no state", event_label(event))))?
        .to_ascii_lowercase();
    let description = status_type.and_then(|t| t.description.as_deref());

    let status = GameStatus::from_feed(&raw_state, description).ok_or_else(|| {
        ApiError::Schema(format!("unrecognized game state {raw_state:?}"))
    })?;
    if status == GameStatus::Postponed {
        info!("event {} is postponed", event_label(event));
    }
    Ok((raw_state, status, espn_status))
}

fn event_date(event: &EspnEvent) -> ApiResult<DateTime<Utc>> {
    let raw = event
        .date
        .as_deref()
        .ok_or_else(|| ApiError::Schema(format!("event {} has no date", event_label(event))))?;
    parse_espn_date(raw).ok_or_else(|| ApiError::Schema(format!("invalid event date {raw:?}")))
}

/// ESPN dates usually omit seconds ("2026-07-04T23:05Z"), which RFC 3339
/// parsing rejects.
pub fn parse_espn_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
                .ok()
                .map(|dt| dt.and_utc())
        })
}

/// Index of the configured team and of its opponent. One of the first two
/// competitors must carry the team's abbreviation.
fn side_indices(competitors: &[EspnCompetitor], team_id: &str) -> ApiResult<(usize, usize)> {
    if competitors.len() < 2 {
        return Err(ApiError::Schema(format!(
            "expected two competitors, found {}",
            competitors.len()
        )));
    }
    let abbr = |i: usize| {
        competitors[i]
            .team
            .as_ref()
            .and_then(|t| t.abbreviation.as_deref())
    };
    if abbr(0) == Some(team_id) {
        Ok((0, 1))
    } else if abbr(1) == Some(team_id) {
        Ok((1, 0))
    } else {
        Err(ApiError::Schema(format!(
            "{team_id} is not a competitor in {:?} vs {:?}",
            abbr(0).unwrap_or("?"),
            abbr(1).unwrap_or("?")
        )))
    }
}

fn venue_fields(competition: &EspnCompetition) -> (Option<String>, Option<String>) {
    let Some(venue) = competition.venue.as_ref() else {
        return (None, None);
    };
    let location = venue.address.as_ref().and_then(|a| match (&a.city, &a.state) {
        (Some(city), Some(state)) => Some(format!("{city}, {state}")),
        (Some(city), None) => Some(city.clone()),
        (None, Some(state)) => Some(state.clone()),
        (None, None) => None,
    });
    (venue.full_name.clone(), location)
}

fn scoreboard_side(c: &EspnCompetitor, started: bool) -> TeamSide {
    let team = c.team.clone().unwrap_or_default();
    let record = c
        .records
        .as_ref()
        .and_then(|r| r.first())
        .and_then(|r| r.summary.clone())
        .unwrap_or_else(|| NO_RECORD.to_owned());

    TeamSide {
        abbr: team.abbreviation.unwrap_or_default(),
        id: team.id.unwrap_or_default(),
        name: team.short_display_name.unwrap_or_default(),
        record: Some(record),
        home_away: c.home_away.clone().unwrap_or_default(),
        logo: team.logo,
        colors: [hex_color(team.color.as_deref()), hex_color(team.alternate_color.as_deref())],
        score: c.score.as_ref().and_then(|s| s.text_runs()),
        innings: if started { line_score(c) } else { [0; INNINGS] },
    }
}

fn team_feed_side(c: &EspnCompetitor, finished: bool) -> TeamSide {
    let team = c.team.clone().unwrap_or_default();
    let (score, record) = if finished {
        (
            c.score.as_ref().and_then(|s| s.value_runs()),
            c.record
                .as_ref()
                .and_then(|r| r.first())
                .and_then(|r| r.display_value.clone()),
        )
    } else {
        (None, None)
    };
    let logo = team
        .logos
        .as_ref()
        .and_then(|logos| logos.get(TEAM_FEED_LOGO_INDEX))
        .and_then(|l| l.href.clone());

    TeamSide {
        abbr: team.abbreviation.unwrap_or_default(),
        id: team.id.unwrap_or_default(),
        name: team.short_display_name.unwrap_or_default(),
        record,
        home_away: c.home_away.clone().unwrap_or_default(),
        logo,
        colors: [NO_COLOR.to_owned(), NO_COLOR.to_owned()],
        score,
        innings: [0; INNINGS],
    }
}

fn line_score(c: &EspnCompetitor) -> [u16; INNINGS] {
    let mut innings = [0; INNINGS];
    let scores = c.linescores.as_deref().unwrap_or_default();
    if scores.len() > INNINGS {
        debug!("dropping {} extra innings from line score", scores.len() - INNINGS);
    }
    for (slot, score) in innings.iter_mut().zip(scores) {
        *slot = score.value.map(runs_from_f64).unwrap_or_default();
    }
    innings
}

fn hex_color(raw: Option<&str>) -> String {
    match raw {
        Some(c) if !c.is_empty() => format!("#{}", c.trim_start_matches('#')),
        _ => NO_COLOR.to_owned(),
    }
}

fn event_label(event: &EspnEvent) -> &str {
    event
        .short_name
        .as_deref()
        .or(event.id.as_deref())
        .unwrap_or("<unnamed>")
}

use mlb_api::{GameState, GameStatus, INNINGS, TeamSide};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};
use tui::widgets::Widget;

/// Width of the abbreviation column.
const TEAM_W: u16 = 5;
/// Width of one inning or total column.
const CELL_W: u16 = 3;
/// Header row plus away and home.
pub const LINESCORE_HEIGHT: u16 = 3;
pub const LINESCORE_WIDTH: u16 = TEAM_W + CELL_W * (INNINGS as u16 + 1);

/// Classic box-score grid, away team on top:
///
/// ```text
///         1  2  3  4  5  6  7  8  9  R
///  BOS    0  1  0  0  -  -  -  -  -  1
///  NYY    2  0  0  -  -  -  -  -  -  2
/// ```
pub struct LineScore<'a> {
    pub game: &'a GameState,
}

impl Widget for LineScore<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < LINESCORE_HEIGHT || area.width < LINESCORE_WIDTH {
            return;
        }

        let header = Style::default().fg(Color::Indexed(240));
        let total = Style::default().add_modifier(Modifier::BOLD);

        for i in 0..=INNINGS {
            let label = if i == INNINGS { "R".to_string() } else { (i + 1).to_string() };
            buf.set_string(column_x(area, i), area.y, format!("{label:>3}"), header);
        }

        let (away, home) = self.game.away_home();
        for (row, side) in [away, home].into_iter().enumerate() {
            let y = area.y + 1 + row as u16;
            buf.set_string(area.x + 1, y, &side.abbr, team_style(side));
            for (i, cell) in row_cells(self.game, side).iter().enumerate() {
                let style = if i == INNINGS { total } else { Style::default() };
                buf.set_string(column_x(area, i), y, format!("{cell:>3}"), style);
            }
        }
    }
}

fn column_x(area: Rect, index: usize) -> u16 {
    area.x + TEAM_W + CELL_W * index as u16
}

/// Nine inning cells followed by the run total.
fn row_cells(game: &GameState, side: &TeamSide) -> Vec<String> {
    let played = innings_played(game);
    let mut cells: Vec<String> = side
        .innings
        .iter()
        .enumerate()
        .map(|(i, runs)| if i < played { runs.to_string() } else { "-".to_string() })
        .collect();
    cells.push(side.score.map_or_else(|| "-".to_string(), |s| s.to_string()));
    cells
}

fn innings_played(game: &GameState) -> usize {
    match game.status {
        GameStatus::Pre | GameStatus::Postponed => 0,
        GameStatus::In => game.inning.map_or(0, |i| usize::from(i).min(INNINGS)),
        GameStatus::Post => INNINGS,
    }
}

fn team_style(side: &TeamSide) -> Style {
    match parse_hex(&side.colors[0]) {
        Some(color) if color != Color::Rgb(0, 0, 0) => Style::default().fg(color).add_modifier(Modifier::BOLD),
        _ => Style::default().add_modifier(Modifier::BOLD),
    }
}

pub fn parse_hex(raw: &str) -> Option<Color> {
    let hex = raw.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

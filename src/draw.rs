use chrono::Utc;
use serde_json::Value;
use std::time::{Duration, Instant};
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap};
use tui::{Frame, Terminal};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::components::linescore::{LINESCORE_HEIGHT, LINESCORE_WIDTH, LineScore, parse_hex};
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use mlb_api::sensor::SensorData;
use mlb_api::{GameState, GameStatus, TeamSide, humanize};

static TABS: &[&str; 2] = &["Game", "Attributes"];

const HELP_TEXT: &str = "q=quit  1=Game  2=Attributes  r=refresh now  j/k=scroll attributes  f=full screen  \"=logs  Esc=back";

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);
    let data = app.sensor.handle().snapshot();

    let _ = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
        }

        match app.state.active_tab {
            MenuItem::Game => draw_game(f, layout.main, app, &data),
            MenuItem::Attributes => draw_attributes(f, layout.main, app),
            MenuItem::Help => draw_placeholder(f, layout.main, HELP_TEXT),
        }

        if app.state.show_logs {
            draw_logs(f, layout.logs);
        }

        draw_loading_spinner(f, f.area(), app, loading);
    });
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Game => 0,
        MenuItem::Attributes => 1,
        MenuItem::Help => 0,
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new("Help: ? ")
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

// ---------------------------------------------------------------------------
// Game tab
// ---------------------------------------------------------------------------

fn draw_game(f: &mut Frame, area: Rect, app: &App, data: &SensorData) {
    let border = if data.last_update_success { Color::White } else { Color::Red };
    let block = default_border(border).title(format!(" {} ", app.sensor.name()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(game) = data.game.as_ref() else {
        let msg = match data.last_error.as_deref() {
            Some(err) => format!("Update failed:\n{err}"),
            None => "Waiting for first update...".to_string(),
        };
        f.render_widget(
            Paragraph::new(msg)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            inner,
        );
        return;
    };

    let [header, _gap, linescore, details, footer] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Length(LINESCORE_HEIGHT),
        Constraint::Fill(1),
        Constraint::Length(2),
    ])
    .areas(inner);

    f.render_widget(Paragraph::new(header_lines(game, data)), header);

    let [score_area] = Layout::horizontal([Constraint::Length(LINESCORE_WIDTH)])
        .flex(Flex::Center)
        .areas(linescore);
    f.render_widget(LineScore { game }, score_area);

    f.render_widget(
        Paragraph::new(detail_lines(game)).wrap(Wrap { trim: true }),
        details,
    );
    f.render_widget(Paragraph::new(footer_lines(app, data)), footer);
}

fn header_lines<'a>(game: &GameState, data: &SensorData) -> Vec<Line<'a>> {
    let (away, home) = game.away_home();
    let matchup = Line::from(vec![
        team_span(away),
        Span::raw(" @ "),
        team_span(home),
    ])
    .alignment(Alignment::Center);

    let status = match game.status {
        GameStatus::Pre => format!("PRE  first pitch {}", game.first_pitch),
        GameStatus::In => format!("IN  inning {}", game.inning.unwrap_or_default()),
        GameStatus::Post => "FINAL".to_string(),
        GameStatus::Postponed => "POSTPONED".to_string(),
    };
    let mut spans = vec![Span::styled(status, status_style(game.status))];
    if !data.last_update_success {
        spans.push(Span::styled("  unavailable", Style::default().fg(Color::Red)));
    }

    vec![matchup, Line::from(spans).alignment(Alignment::Center)]
}

fn team_span<'a>(side: &TeamSide) -> Span<'a> {
    let mut style = Style::default().add_modifier(Modifier::BOLD);
    if let Some(color) = parse_hex(&side.colors[0])
        && color != Color::Rgb(0, 0, 0)
    {
        style = style.fg(color);
    }
    let text = match &side.record {
        Some(record) => format!("{} ({record})", side.name),
        None => side.name.clone(),
    };
    Span::styled(text, style)
}

fn status_style(status: GameStatus) -> Style {
    match status {
        GameStatus::In => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        GameStatus::Pre => Style::default().fg(Color::Yellow),
        GameStatus::Post => Style::default().fg(Color::Gray),
        GameStatus::Postponed => Style::default().fg(Color::Red),
    }
}

fn detail_lines<'a>(game: &GameState) -> Vec<Line<'a>> {
    let label = Style::default().fg(Color::DarkGray);
    let row = |name: &str, value: String| {
        Line::from(vec![Span::styled(format!("{name:<11}"), label), Span::raw(value)])
    };

    let venue = match (&game.venue, &game.location) {
        (Some(venue), Some(location)) => format!("{venue}, {location}"),
        (Some(venue), None) => venue.clone(),
        (None, Some(location)) => location.clone(),
        (None, None) => "-".to_string(),
    };

    let mut lines = vec![
        row("Start", game.date.format("%a %b %-d %H:%M UTC").to_string()),
        row("Venue", venue),
        row("TV", game.tv_network.clone().unwrap_or_else(|| "-".to_string())),
    ];
    if let Some(play) = &game.last_play {
        lines.push(Line::from(""));
        lines.push(row("Last play", play.clone()));
    }
    lines
}

fn footer_lines<'a>(app: &App, data: &SensorData) -> Vec<Line<'a>> {
    let dim = Style::default().fg(Color::DarkGray);
    let mut parts = Vec::new();

    if let Some(game) = &data.game {
        parts.push(format!("updated {}", humanize(game.last_update - Utc::now())));
    }
    parts.push(format!("every {}", format_duration(data.update_interval)));
    if let Some(left) = app.state.schedule.countdown(Instant::now()) {
        parts.push(format!("next poll in {}", format_duration(left)));
    }

    let mut lines = vec![Line::from(Span::styled(parts.join("  |  "), dim))];
    if let Some(err) = app.state.last_error.as_deref().or(data.last_error.as_deref()) {
        lines.push(Line::from(Span::styled(err.to_string(), Style::default().fg(Color::Red))));
    }
    lines
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("{}:{:02}", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

// ---------------------------------------------------------------------------
// Attributes tab
// ---------------------------------------------------------------------------

fn draw_attributes(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(format!(
        " {} | {} | {} ",
        app.sensor.unique_id(),
        app.sensor.state().map_or("unknown", |s| s.as_str()),
        if app.sensor.available() { "available" } else { "unavailable" },
    ));

    let attributes = app.sensor.attributes();
    if attributes.is_empty() {
        let inner = block.inner(area);
        f.render_widget(block, area);
        f.render_widget(
            Paragraph::new("No attributes until the first successful update")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let rows: Vec<Row> = attributes
        .iter()
        .skip(usize::from(app.state.attributes.scroll_offset))
        .map(|(key, value)| {
            Row::new(vec![
                Cell::from(key).style(Style::default().fg(Color::Gray)),
                Cell::from(value_text(value)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(22), Constraint::Fill(1)])
        .header(
            Row::new(vec!["attribute", "value"])
                .style(Style::default().add_modifier(Modifier::UNDERLINED)),
        )
        .block(block);
    f.render_widget(table, area);
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

fn draw_logs(f: &mut Frame, area: Rect) {
    let logs = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Cyan))
        .style_debug(Style::default().fg(Color::DarkGray));
    f.render_widget(logs, area);
}

fn draw_placeholder(f: &mut Frame, area: Rect, msg: &str) {
    let block = default_border(Color::DarkGray);
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(11), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}

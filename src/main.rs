use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use tracing::{info, warn};

use prode_terminal::api::ApiClient;
use prode_terminal::config::Config;
use prode_terminal::leaderboard::{ordinal, ranked};
use prode_terminal::models::{Game, Side, format_date_heading, match_status_label};
use prode_terminal::persist::{JsonFilePort, MemoryPort, PersistencePort};
use prode_terminal::phase::{GamePhase, phase_label};
use prode_terminal::provider::spawn_provider;
use prode_terminal::state::{AppState, Delta, ProviderCommand, Screen, apply_delta};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    persistence: Box<dyn PersistencePort>,
    matches_refresh: Duration,
    last_matches_refresh: Instant,
}

impl App {
    fn on_key(&mut self, key: KeyEvent) {
        if self.state.login.open {
            self.on_login_key(key);
            return;
        }
        let now = Utc::now();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('m') => self.state.screen = Screen::Matches,
            KeyCode::Char('b') if self.state.screen != Screen::Leaderboard => {
                self.state.screen = Screen::Leaderboard;
                self.state.request_leaderboard();
            }
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Char('a') => self.state.open_login(),
            KeyCode::Char('o') => self.state.logout(),
            KeyCode::Char('r') => match self.state.screen {
                Screen::Matches => self.request_matches(),
                Screen::Leaderboard => self.state.request_leaderboard(),
            },
            _ => match self.state.screen {
                Screen::Matches => self.on_matches_key(key, now),
                Screen::Leaderboard => self.on_leaderboard_key(key),
            },
        }
    }

    fn on_matches_key(&mut self, key: KeyEvent, now: chrono::DateTime<Utc>) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Tab | KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => {
                self.state.toggle_side()
            }
            KeyCode::Char(c) if c.is_ascii_digit() => self.state.type_digit(c, now),
            KeyCode::Backspace => self.state.backspace(now),
            KeyCode::Char('x') | KeyCode::Delete => self.state.remove_selected(now),
            KeyCode::Char('s') => self.state.request_save(now),
            KeyCode::Char('p') => self.state.show_others = !self.state.show_others,
            _ => {}
        }
    }

    fn on_leaderboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.state.leaderboard_scroll = self.state.leaderboard_scroll.saturating_add(1)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.state.leaderboard_scroll = self.state.leaderboard_scroll.saturating_sub(1)
            }
            _ => {}
        }
    }

    fn on_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.state.close_login(),
            KeyCode::Enter => self.state.submit_login(),
            KeyCode::Backspace => {
                self.state.login.input.pop();
            }
            KeyCode::Char(c) => self.state.login.input.push(c),
            _ => {}
        }
    }

    fn request_matches(&mut self) {
        self.state.request_refresh();
        self.last_matches_refresh = Instant::now();
    }

    fn maybe_refresh_matches(&mut self) {
        if self.state.matches_loading {
            return;
        }
        if self.last_matches_refresh.elapsed() >= self.matches_refresh {
            self.request_matches();
        }
    }

    fn flush_commands(&mut self) {
        for cmd in self.state.take_commands() {
            if self.cmd_tx.send(cmd).is_err() {
                self.state.push_log("[WARN] Backend worker unavailable");
                break;
            }
        }
    }

    fn persist_if_dirty(&mut self) {
        if !self.state.take_dirty() {
            return;
        }
        if let Err(err) = self.persistence.save(&self.state.persisted()) {
            warn!(error = %err, "failed to persist store");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing()?;
    info!(api = %config.api_url, competition = %config.competition, "prode terminal starting");

    let persistence: Box<dyn PersistencePort> = match config
        .state_file
        .clone()
        .map(JsonFilePort::new)
        .or_else(JsonFilePort::default_location)
    {
        Some(port) => {
            info!(path = %port.path().display(), "persisting store");
            Box::new(port)
        }
        None => Box::new(MemoryPort::new()),
    };

    let mut state = match persistence.load() {
        Some(stored) => AppState::from_persisted(&config, stored),
        None => AppState::new(&config),
    };

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let hook_tx = tx.clone();
    let api = ApiClient::new(&config)?.on_unauthorized(move || {
        let _ = hook_tx.send(Delta::SessionExpired);
    });
    spawn_provider(api, tx, cmd_rx);

    if let Some(credential) = config.google_credential.clone()
        && !state.session.is_authenticated()
    {
        state.login_with(credential);
    }
    state.request_refresh();

    let mut app = App {
        state,
        should_quit: false,
        cmd_tx,
        persistence,
        matches_refresh: config.matches_poll,
        last_matches_refresh: Instant::now(),
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;
    app.persist_if_dirty();

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    info!("prode terminal shut down");
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.maybe_refresh_matches();
        app.flush_commands();
        app.persist_if_dirty();

        terminal.draw(|f| ui(f, &app.state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Paste(text) if app.state.login.open => {
                    app.state.login.input.push_str(text.trim())
                }
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::File::create(log_dir.join("prode_terminal.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("prode_terminal=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;
    Ok(())
}

fn ui(frame: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match state.screen {
        Screen::Matches => render_matches(frame, chunks[1], state),
        Screen::Leaderboard => render_leaderboard(frame, chunks[1], state),
    }

    render_save_bar(frame, chunks[2], state);
    let footer = Paragraph::new(footer_text(state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if state.login.open {
        render_login_dialog(frame, frame.size(), state);
    }
    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let screen = match state.screen {
        Screen::Matches => "Matches",
        Screen::Leaderboard => "Leaderboard",
    };
    let who = state
        .session
        .user()
        .map(|u| format!("Signed in: {}", u.display_name()))
        .unwrap_or_else(|| "Not signed in (a)".to_string());
    let round = state
        .matchday
        .as_ref()
        .map(|m| m.round_name.clone())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "-".to_string());
    let updated = state
        .last_updated
        .map(|t| t.with_timezone(&state.utc_offset).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    format!(" PRODE | {screen} | {round}\n {who} | updated {updated}")
}

fn footer_text(state: &AppState) -> String {
    let last = state.logs.back().cloned().unwrap_or_default();
    let keys = match state.screen {
        Screen::Matches => "j/k Move | Tab Side | 0-9 Score | x Remove | s Save | p Picks | b Board | ? Help | q Quit",
        Screen::Leaderboard => "m Matches | j/k Scroll | r Refresh | ? Help | q Quit",
    };
    if last.is_empty() {
        keys.to_string()
    } else {
        format!("{keys} | {last}")
    }
}

fn render_save_bar(frame: &mut Frame, area: Rect, state: &AppState) {
    let pending = state.predictions.count_pending();
    if !state.session.is_authenticated() || pending == 0 {
        return;
    }
    let text = if state.saving_predictions {
        "Saving predictions...".to_string()
    } else {
        format!("Save {pending} prediction(s) (s)")
    };
    let bar = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Black).bg(Color::Blue));
    frame.render_widget(bar, area);
}

fn render_matches(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(matchday) = state.matchday.as_ref() else {
        let msg = if state.matches_loading {
            "Loading matches...".to_string()
        } else if let Some(err) = &state.matches_error {
            format!("Could not load matches: {err}")
        } else {
            "No matches".to_string()
        };
        let empty = Paragraph::new(msg).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    };

    let (list_area, side_area) = if state.show_others {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(32)])
            .split(area);
        (cols[0], Some(cols[1]))
    } else {
        (area, None)
    };

    let now = Utc::now();
    let mut lines: Vec<Line> = Vec::new();
    let mut selected_line = 0usize;
    let mut game_idx = 0usize;
    for group in &matchday.games_by_date {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            format_date_heading(&group.date),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        for game in &group.matches {
            let selected = game_idx == state.selected;
            if selected {
                selected_line = lines.len();
            }
            lines.push(match_line(state, game, selected, now));
            game_idx += 1;
        }
    }

    let visible = list_area.height as usize;
    let scroll = selected_line.saturating_sub(visible.saturating_sub(2));
    let list = Paragraph::new(lines).scroll((scroll as u16, 0));
    frame.render_widget(list, list_area);

    if let Some(side_area) = side_area {
        render_others_panel(frame, side_area, state);
    }
}

fn match_line<'a>(state: &AppState, game: &Game, selected: bool, now: chrono::DateTime<Utc>) -> Line<'a> {
    let phase = state.phase_of(game, now);
    let base = if selected {
        Style::default().fg(Color::White).bg(Color::DarkGray)
    } else {
        Style::default()
    };
    let (live_home, live_away) = match game.live_score() {
        Some([h, a]) => (h.to_string(), a.to_string()),
        None => ("-".to_string(), "-".to_string()),
    };

    let mut spans = vec![
        Span::styled(if selected { "> " } else { "  " }, base),
        Span::styled(format!("{:<6} ", match_status_label(game, state.utc_offset)), base),
        Span::styled(format!("{:>20} ", game.home_name()), base),
        Span::styled(format!("{live_home:>2} "), base.fg(Color::Green)),
    ];
    if state.session.is_authenticated() {
        spans.push(prediction_cell(state, game, Side::Home, selected, phase, base));
        spans.push(Span::styled(" vs ", base.fg(Color::DarkGray)));
        spans.push(prediction_cell(state, game, Side::Away, selected, phase, base));
    } else {
        spans.push(Span::styled(" vs ", base.fg(Color::DarkGray)));
    }
    spans.push(Span::styled(format!(" {live_away:<2}"), base.fg(Color::Green)));
    spans.push(Span::styled(format!(" {:<20}", game.away_name()), base));
    spans.push(Span::styled(format!(" {}", status_tag(state, game, phase)), base.fg(Color::Yellow)));
    Line::from(spans)
}

fn prediction_cell<'a>(
    state: &AppState,
    game: &Game,
    side: Side,
    selected: bool,
    phase: GamePhase,
    base: Style,
) -> Span<'a> {
    let value = state.predictions.get_score(&game.id, side);
    let shown = match (value.is_empty(), phase) {
        (false, _) => value,
        (true, GamePhase::Open) => "_".to_string(),
        (true, _) => "-".to_string(),
    };
    let mut style = base.fg(Color::Blue);
    if selected && phase.is_editable() && state.focus_side == side {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("[{shown:>2}]"), style)
}

fn status_tag(state: &AppState, game: &Game, phase: GamePhase) -> String {
    let saved = match state.predictions.prediction(&game.id) {
        Some(p) if p.submitted => " saved",
        Some(_) => " pending",
        None => "",
    };
    format!("{}{saved}", phase_label(phase))
}

fn render_others_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut lines: Vec<Line> = Vec::new();
    match state.selected_game() {
        None => lines.push(Line::from("No match selected")),
        Some(game) => {
            let picks = state.predictions.predictions_for_game(&game.id);
            if picks.is_empty() {
                lines.push(Line::from("No predictions yet"));
            }
            for pick in picks {
                let [h, a] = pick.score_pair();
                let points = if pick.processed {
                    format!("{} pts", pick.live_points)
                } else {
                    String::new()
                };
                lines.push(Line::from(format!(
                    "{:<16} {h}-{a} {points}",
                    truncate(pick.owner_name(), 16)
                )));
            }
        }
    }
    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Predictions").borders(Borders::ALL));
    frame.render_widget(panel, area);
}

fn render_leaderboard(frame: &mut Frame, area: Rect, state: &AppState) {
    if state.leaderboard_loading && state.leaderboard.is_empty() {
        let msg = Paragraph::new("Loading leaderboard...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(msg, area);
        return;
    }
    if state.leaderboard.is_empty() {
        let msg = match &state.leaderboard_error {
            Some(err) => format!("Could not load leaderboard: {err}"),
            None => "No participants yet".to_string(),
        };
        frame.render_widget(Paragraph::new(msg).style(Style::default().fg(Color::DarkGray)), area);
        return;
    }

    let rows_data = ranked(&state.leaderboard, state.session.user_id());
    let skip = (state.leaderboard_scroll as usize).min(rows_data.len().saturating_sub(1));
    let rows = rows_data.iter().skip(skip).map(|row| {
        let style = match (row.is_me, row.rank) {
            (true, _) => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            (false, 1) => Style::default().fg(Color::Yellow),
            (false, 2) => Style::default().fg(Color::Gray),
            (false, 3) => Style::default().fg(Color::LightRed),
            _ => Style::default(),
        };
        Row::new(vec![
            Cell::from(ordinal(row.rank)),
            Cell::from(row.name.clone()),
            Cell::from(format!("{:>6}", row.points)),
        ])
        .style(style)
    });
    let table = Table::new(
        rows,
        [Constraint::Length(6), Constraint::Min(20), Constraint::Length(8)],
    )
    .header(
        Row::new(vec!["Rank", "Participant", "Points"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().title("Rankings").borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_login_dialog(frame: &mut Frame, area: Rect, state: &AppState) {
    let popup_area = centered_rect(70, 40, area);
    frame.render_widget(Clear, popup_area);

    let masked = if state.login.input.is_empty() {
        "<paste Google credential>".to_string()
    } else {
        format!("{}… ({} chars)", truncate(&state.login.input, 24), state.login.input.len())
    };
    let mut lines = vec![
        Line::from("Sign in with Google to save your predictions."),
        Line::from(""),
        Line::from(masked),
        Line::from(""),
    ];
    if state.login.pending {
        lines.push(Line::from("Verifying..."));
    }
    if let Some(err) = &state.login.error {
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::from("Enter submit | Esc cancel"));

    let dialog = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Sign in").borders(Borders::ALL));
    frame.render_widget(dialog, popup_area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Prode Terminal - Help",
        "",
        "Global:",
        "  m / b        Matches / Leaderboard",
        "  a            Sign in",
        "  o            Sign out",
        "  r            Refresh",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Matches:",
        "  j/k or ↑/↓   Move",
        "  Tab / ←/→    Switch home/away",
        "  0-9          Type score",
        "  Backspace    Delete digit",
        "  x / Del      Remove prediction",
        "  s            Save pending predictions",
        "  p            Everyone's predictions",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

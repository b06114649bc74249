//! neo-telemetry: terminal dashboard for running neo demos.
//!
//! Listens on UDP `127.0.0.1:9100` for the JSON snapshots a neo engine sends
//! when built with the `diagnostics` feature, and shows them live with
//! ratatui.
//!
//! Start a demo (`cargo run -p neo --example vfc`), then run
//! `cargo run -p neo-telemetry` in another terminal.

use std::collections::VecDeque;
use std::io;
use std::net::UdpSocket;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Sparkline};
use serde::Deserialize;

const LISTEN_ADDR: &str = "127.0.0.1:9100";

// ── Wire types (mirror neo::diag) ───────────────────────────────────────

#[derive(Deserialize, Clone, Default)]
#[serde(default)]
struct DiagSnapshot {
    app_name: String,
    fps: f32,
    delta_ms: f32,
    frame_count: u64,
    elapsed_secs: f32,
    game_object_count: usize,
    archetype_count: usize,
    components: Vec<ComponentCount>,
    system_timings: Vec<SystemTiming>,
    passes: Vec<Pass>,
    frame_budget: FrameBudget,
    pool: Pool,
    logs: Vec<LogEntry>,
}

#[derive(Deserialize, Clone, Default)]
struct ComponentCount {
    name: String,
    count: usize,
}

#[derive(Deserialize, Clone, Default)]
struct SystemTiming {
    name: String,
    active: bool,
    duration_us: f64,
}

#[derive(Deserialize, Clone, Default)]
struct Pass {
    name: String,
    phase: String,
    active: bool,
    draws: u32,
    culled: u32,
}

#[derive(Deserialize, Clone, Default)]
struct FrameBudget {
    systems_us: f64,
    render_us: f64,
}

#[derive(Deserialize, Clone, Default)]
struct Pool {
    total_slots: u32,
    free_count: usize,
    alive_count: usize,
    created_this_frame: u32,
    destroyed_this_frame: u32,
    fragmentation_pct: f32,
}

#[derive(Deserialize, Clone, Default)]
struct LogEntry {
    level: String,
    target: String,
    message: String,
    timestamp_secs: f32,
}

// ── Tabs ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Tab {
    Overview,
    Systems,
    Render,
    Logs,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Overview, Tab::Systems, Tab::Render, Tab::Logs];

    fn next(self) -> Self {
        match self {
            Tab::Overview => Tab::Systems,
            Tab::Systems => Tab::Render,
            Tab::Render => Tab::Logs,
            Tab::Logs => Tab::Overview,
        }
    }

    fn prev(self) -> Self {
        match self {
            Tab::Overview => Tab::Logs,
            Tab::Systems => Tab::Overview,
            Tab::Render => Tab::Systems,
            Tab::Logs => Tab::Render,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Systems => "Systems",
            Tab::Render => "Render",
            Tab::Logs => "Logs",
        }
    }
}

// ── Log level filter ────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum LogFilter {
    All,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogFilter {
    fn next(self) -> Self {
        match self {
            LogFilter::All => LogFilter::Debug,
            LogFilter::Debug => LogFilter::Info,
            LogFilter::Info => LogFilter::Warn,
            LogFilter::Warn => LogFilter::Error,
            LogFilter::Error => LogFilter::All,
        }
    }

    fn label(self) -> &'static str {
        match self {
            LogFilter::All => "ALL",
            LogFilter::Debug => "DEBUG+",
            LogFilter::Info => "INFO+",
            LogFilter::Warn => "WARN+",
            LogFilter::Error => "ERROR",
        }
    }

    fn passes(self, level: &str) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::Debug => level != "TRACE",
            LogFilter::Info => matches!(level, "INFO" | "WARN" | "ERROR"),
            LogFilter::Warn => matches!(level, "WARN" | "ERROR"),
            LogFilter::Error => level == "ERROR",
        }
    }
}

// ── App state ────────────────────────────────────────────────────────────

const HISTORY_CAP: usize = 1200;
const LOG_CAP: usize = 2000;

struct App {
    latest: DiagSnapshot,
    fps_history: VecDeque<u64>,
    /// Frame time in microseconds.
    delta_history: VecDeque<u64>,
    draw_history: VecDeque<u64>,
    active_tab: Tab,
    paused: bool,
    connected: bool,
    component_scroll: usize,
    log_entries: Vec<LogEntry>,
    log_filter: LogFilter,
    log_auto_scroll: bool,
    log_scroll_offset: usize,
}

fn push_capped(history: &mut VecDeque<u64>, value: u64) {
    if history.len() >= HISTORY_CAP {
        history.pop_front();
    }
    history.push_back(value);
}

impl App {
    fn new() -> Self {
        Self {
            latest: DiagSnapshot::default(),
            fps_history: VecDeque::with_capacity(HISTORY_CAP),
            delta_history: VecDeque::with_capacity(HISTORY_CAP),
            draw_history: VecDeque::with_capacity(HISTORY_CAP),
            active_tab: Tab::Overview,
            paused: false,
            connected: false,
            component_scroll: 0,
            log_entries: Vec::new(),
            log_filter: LogFilter::Info,
            log_auto_scroll: true,
            log_scroll_offset: 0,
        }
    }

    fn push_snapshot(&mut self, snap: DiagSnapshot) {
        if self.paused {
            return;
        }
        push_capped(&mut self.fps_history, snap.fps.round().max(0.0) as u64);
        push_capped(&mut self.delta_history, (snap.delta_ms * 1000.0).round().max(0.0) as u64);
        push_capped(&mut self.draw_history, snap.passes.iter().map(|p| p.draws as u64).sum());

        self.log_entries.extend(snap.logs.iter().cloned());
        if self.log_entries.len() > LOG_CAP {
            let excess = self.log_entries.len() - LOG_CAP;
            self.log_entries.drain(..excess);
        }

        self.latest = snap;
        self.connected = true;
    }

    fn log_counts(&self) -> [usize; 5] {
        let mut counts = [0; 5];
        for entry in &self.log_entries {
            let slot = match entry.level.as_str() {
                "TRACE" => 0,
                "DEBUG" => 1,
                "INFO" => 2,
                "WARN" => 3,
                "ERROR" => 4,
                _ => continue,
            };
            counts[slot] += 1;
        }
        counts
    }

    fn filtered_logs(&self) -> Vec<&LogEntry> {
        self.log_entries
            .iter()
            .filter(|e| self.log_filter.passes(&e.level))
            .collect()
    }
}

// ── Main ─────────────────────────────────────────────────────────────────

fn main() -> io::Result<()> {
    let socket = UdpSocket::bind(LISTEN_ADDR).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("cannot bind {LISTEN_ADDR} ({e}), is another neo-telemetry running?"),
        )
    })?;
    socket.set_nonblocking(true)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, &socket);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, socket: &UdpSocket) -> io::Result<()> {
    let mut app = App::new();
    let mut buf = [0u8; 65536];

    loop {
        while let Ok(n) = socket.recv(&mut buf) {
            if let Ok(snap) = serde_json::from_slice::<DiagSnapshot>(&buf[..n]) {
                app.push_snapshot(snap);
            }
        }

        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if handle_key(&mut app, key) {
                    return Ok(());
                }
            }
        }
    }
}

// ── Key handling ─────────────────────────────────────────────────────────

/// Returns `true` if the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('p') => app.paused = !app.paused,

        KeyCode::Char('1') => app.active_tab = Tab::Overview,
        KeyCode::Char('2') => app.active_tab = Tab::Systems,
        KeyCode::Char('3') => app.active_tab = Tab::Render,
        KeyCode::Char('4') => app.active_tab = Tab::Logs,
        KeyCode::Tab => app.active_tab = app.active_tab.next(),
        KeyCode::BackTab => app.active_tab = app.active_tab.prev(),

        KeyCode::Up if app.active_tab == Tab::Overview => {
            app.component_scroll = app.component_scroll.saturating_sub(1);
        }
        KeyCode::Down if app.active_tab == Tab::Overview => {
            if app.component_scroll + 1 < app.latest.components.len() {
                app.component_scroll += 1;
            }
        }

        KeyCode::Char('l') if app.active_tab == Tab::Logs => app.log_filter = app.log_filter.next(),
        KeyCode::Char('g') if app.active_tab == Tab::Logs => app.log_auto_scroll = !app.log_auto_scroll,
        KeyCode::Up if app.active_tab == Tab::Logs => {
            app.log_auto_scroll = false;
            app.log_scroll_offset = app.log_scroll_offset.saturating_sub(1);
        }
        KeyCode::Down if app.active_tab == Tab::Logs => {
            app.log_auto_scroll = false;
            app.log_scroll_offset += 1;
        }

        _ => {}
    }
    false
}

// ── UI rendering ─────────────────────────────────────────────────────────

fn ui(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(1), // tab bar
            Constraint::Min(6),    // tab content
            Constraint::Length(1), // help bar
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_tab_bar(f, app, chunks[1]);
    match app.active_tab {
        Tab::Overview => draw_overview_tab(f, app, chunks[2]),
        Tab::Systems => draw_systems_tab(f, app, chunks[2]),
        Tab::Render => draw_render_tab(f, app, chunks[2]),
        Tab::Logs => draw_logs_tab(f, app, chunks[2]),
    }
    draw_help_bar(f, app, chunks[3]);
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn white() -> Style {
    Style::default().fg(Color::White)
}

fn panel(title: impl Into<String>) -> Block<'static> {
    Block::default()
        .title(title.into())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
}

fn draw_header(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let s = &app.latest;
    let (status, status_color) = if app.paused {
        (" PAUSED ", Color::Yellow)
    } else if app.connected {
        (" LIVE ", Color::Green)
    } else {
        (" WAITING ", Color::DarkGray)
    };

    let text = Line::from(vec![
        Span::styled(status, Style::default().bg(status_color).fg(Color::Black)),
        Span::raw("  "),
        Span::styled("FPS: ", dim()),
        Span::styled(
            format!("{:.1}", s.fps),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled("Frame: ", dim()),
        Span::styled(s.frame_count.to_string(), white()),
        Span::raw("  |  "),
        Span::styled("\u{0394}: ", dim()),
        Span::styled(format!("{:.1}ms", s.delta_ms), white()),
        Span::raw("  |  "),
        Span::styled("Up: ", dim()),
        Span::styled(format_uptime(s.elapsed_secs), white()),
    ]);

    let title = if s.app_name.is_empty() {
        " neo-telemetry ".to_string()
    } else {
        format!(" neo-telemetry: {} ", s.app_name)
    };
    f.render_widget(Paragraph::new(text).block(panel(title)), area);
}

fn draw_tab_bar(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        let (num_style, label_style) = if *tab == app.active_tab {
            (
                Style::default().bg(Color::Cyan).fg(Color::Black).add_modifier(Modifier::BOLD),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )
        } else {
            (dim(), dim())
        };
        spans.push(Span::styled(format!(" {} ", i + 1), num_style));
        spans.push(Span::styled(format!("{} ", tab.label()), label_style));
        spans.push(Span::raw("  "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Overview Tab ─────────────────────────────────────────────────────────

fn draw_overview_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Length(1), Constraint::Min(4)])
        .split(area);
    let sparks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    draw_sparkline(f, sparks[0], " FPS History ", &app.fps_history, Color::Green, |v| format!("{v:.0}"));
    draw_sparkline(f, sparks[1], " Frame Time ", &app.delta_history, Color::Yellow, |v| {
        format!("{:.1}ms", v / 1000.0)
    });
    draw_pool_line(f, app, chunks[1]);
    draw_components(f, app, chunks[2]);
}

fn draw_sparkline(
    f: &mut ratatui::Frame,
    area: Rect,
    title: &'static str,
    history: &VecDeque<u64>,
    color: Color,
    fmt: impl Fn(f64) -> String,
) {
    let block = Block::default().title(title).borders(Borders::ALL).border_style(dim());
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let data: Vec<u64> = history.iter().copied().collect();
    let (min, avg, max) = stats(&data);
    let spark_area = Rect {
        height: inner.height - 1,
        ..inner
    };
    let stats_area = Rect {
        y: inner.y + inner.height - 1,
        height: 1,
        ..inner
    };
    f.render_widget(Sparkline::default().data(&data).style(Style::default().fg(color)), spark_area);
    f.render_widget(
        Paragraph::new(Span::styled(
            format!("min: {}  avg: {}  max: {}", fmt(min), fmt(avg), fmt(max)),
            dim(),
        )),
        stats_area,
    );
}

fn draw_pool_line(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let pool = &app.latest.pool;
    let frag = pool.fragmentation_pct;
    let frag_color = if frag < 25.0 {
        Color::Green
    } else if frag < 50.0 {
        Color::Yellow
    } else {
        Color::Red
    };

    let mut spans = vec![
        Span::styled("  GameObjects: ", dim()),
        Span::styled(pool.alive_count.to_string(), white()),
        Span::styled("  Slots: ", dim()),
        Span::styled(pool.total_slots.to_string(), white()),
        Span::styled("  Free: ", dim()),
        Span::styled(pool.free_count.to_string(), white()),
        Span::styled("  Frag: ", dim()),
        Span::styled(format!("{frag:.0}%"), Style::default().fg(frag_color)),
        Span::raw("  "),
        Span::styled(
            bar(pool.alive_count as f64, pool.total_slots.max(1) as f64, 16),
            Style::default().fg(frag_color),
        ),
    ];
    if pool.created_this_frame > 0 || pool.destroyed_this_frame > 0 {
        spans.push(Span::styled(
            format!("  +{}", pool.created_this_frame),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::styled(
            format!("/-{}", pool.destroyed_this_frame),
            Style::default().fg(Color::Red),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_components(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let s = &app.latest;
    let block = panel(format!(
        " Components  GameObjects: {}  Archetypes: {} ",
        s.game_object_count, s.archetype_count
    ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if s.components.is_empty() {
        f.render_widget(Paragraph::new(Span::styled("  No components", dim())), inner);
        return;
    }

    let max = s.components.iter().map(|c| c.count).max().unwrap_or(1).max(1) as f64;
    let name_width = s.components.iter().map(|c| c.name.len()).max().unwrap_or(10).min(36);
    let bar_width = inner.width.saturating_sub(name_width as u16 + 12) as usize;
    let lines: Vec<Line> = s
        .components
        .iter()
        .skip(app.component_scroll)
        .take(inner.height as usize)
        .map(|c| {
            Line::from(vec![
                Span::styled(format!("  {:width$}", c.name, width = name_width), white()),
                Span::styled(format!(" {:>6} ", c.count), dim()),
                Span::styled(bar(c.count as f64, max, bar_width), Style::default().fg(Color::Green)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

// ── Systems Tab ──────────────────────────────────────────────────────────

fn draw_systems_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(4)])
        .split(area);
    draw_frame_budget(f, app, chunks[0]);
    draw_system_timings(f, app, chunks[1]);
}

fn draw_frame_budget(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = panel(" Frame Budget (16.6ms target) ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let fb = &app.latest.frame_budget;
    let systems_ms = fb.systems_us / 1000.0;
    let render_ms = fb.render_us / 1000.0;
    let total_ms = systems_ms + render_ms;
    let pct = total_ms / 16.6;
    let color = if pct < 0.8 {
        Color::Green
    } else if pct <= 1.0 {
        Color::Yellow
    } else {
        Color::Red
    };

    let width = inner.width.saturating_sub(48) as usize;
    let text = Line::from(vec![
        Span::raw(" "),
        Span::styled(
            format!("{total_ms:.2}ms"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" (systems: {systems_ms:.2}ms | render: {render_ms:.2}ms) "), dim()),
        Span::styled(bar(pct.min(1.5), 1.5, width), Style::default().fg(color)),
    ]);
    f.render_widget(Paragraph::new(text), inner);
}

fn draw_system_timings(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = panel(" Systems (registration order) ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let timings = &app.latest.system_timings;
    if timings.is_empty() {
        f.render_widget(Paragraph::new(Span::styled("  No systems", dim())), inner);
        return;
    }

    let max = timings.iter().map(|t| t.duration_us).fold(1.0, f64::max);
    let name_width = timings.iter().map(|t| t.name.len()).max().unwrap_or(10).min(30);
    let bar_width = inner.width.saturating_sub(name_width as u16 + 20) as usize;
    let lines: Vec<Line> = timings
        .iter()
        .take(inner.height as usize)
        .map(|t| {
            let ms = t.duration_us / 1000.0;
            let color = if !t.active {
                Color::DarkGray
            } else if ms < 2.0 {
                Color::Green
            } else if ms < 5.0 {
                Color::Yellow
            } else {
                Color::Red
            };
            let state = if t.active { "" } else { " off" };
            Line::from(vec![
                Span::styled(format!("  {:width$}", t.name, width = name_width), white()),
                Span::styled(format!(" {ms:>7.3}ms{state:<4} "), dim()),
                Span::styled(bar(t.duration_us, max, bar_width), Style::default().fg(color)),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

// ── Render Tab ───────────────────────────────────────────────────────────

fn draw_render_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(4)])
        .split(area);
    draw_sparkline(f, chunks[0], " Draw Calls ", &app.draw_history, Color::Magenta, |v| {
        format!("{v:.0}")
    });

    let passes = &app.latest.passes;
    let draws: u32 = passes.iter().map(|p| p.draws).sum();
    let culled: u32 = passes.iter().map(|p| p.culled).sum();
    let block = panel(format!(" Shaders  draws: {draws}  culled: {culled} "));
    let inner = block.inner(chunks[1]);
    f.render_widget(block, chunks[1]);

    if passes.is_empty() {
        f.render_widget(Paragraph::new(Span::styled("  No shaders", dim())), inner);
        return;
    }
    let name_width = passes.iter().map(|p| p.name.len()).max().unwrap_or(10).min(30);
    let lines: Vec<Line> = passes
        .iter()
        .take(inner.height as usize)
        .map(|p| {
            let name_style = if p.active { white() } else { dim() };
            Line::from(vec![
                Span::styled(format!("  {:<12}", p.phase), Style::default().fg(Color::Cyan)),
                Span::styled(format!("{:width$}", p.name, width = name_width), name_style),
                Span::styled("  draws ", dim()),
                Span::styled(format!("{:>5}", p.draws), white()),
                Span::styled("  culled ", dim()),
                Span::styled(format!("{:>5}", p.culled), Style::default().fg(Color::Yellow)),
                Span::styled(if p.active { "" } else { "  (inactive)" }, dim()),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

// ── Logs Tab ─────────────────────────────────────────────────────────────

fn draw_logs_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let [t, d, i, w, e] = app.log_counts();
    let scroll_label = if app.log_auto_scroll { "auto" } else { "manual" };
    let block = panel(format!(
        " Logs [{}]  T:{t} D:{d} I:{i} W:{w} E:{e}  scroll:{scroll_label} ",
        app.log_filter.label(),
    ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let filtered = app.filtered_logs();
    if filtered.is_empty() {
        f.render_widget(Paragraph::new(Span::styled("  No log messages", dim())), inner);
        return;
    }

    let visible = inner.height as usize;
    let total = filtered.len();
    let offset = if app.log_auto_scroll {
        total.saturating_sub(visible)
    } else {
        app.log_scroll_offset.min(total.saturating_sub(visible))
    };

    let lines: Vec<Line> = filtered
        .iter()
        .skip(offset)
        .take(visible)
        .map(|entry| {
            let level_color = match entry.level.as_str() {
                "TRACE" => Color::DarkGray,
                "DEBUG" => Color::Gray,
                "INFO" => Color::Cyan,
                "WARN" => Color::Yellow,
                "ERROR" => Color::Red,
                _ => Color::White,
            };
            Line::from(vec![
                Span::styled(format!("  [{:>6.1}s] ", entry.timestamp_secs), dim()),
                Span::styled(
                    format!("{:<5} ", entry.level),
                    Style::default().fg(level_color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("{} ", entry.target), dim()),
                Span::styled(entry.message.clone(), white()),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_help_bar(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Cyan));
    let mut spans = vec![key(" [1-4]"), Span::raw(" tab  "), key("[Tab]"), Span::raw(" next  ")];
    match app.active_tab {
        Tab::Overview => {
            spans.push(key("[\u{2191}\u{2193}]"));
            spans.push(Span::raw(" scroll  "));
        }
        Tab::Logs => {
            spans.push(key("[l]"));
            spans.push(Span::raw(" filter  "));
            spans.push(key("[g]"));
            spans.push(Span::raw(" auto-scroll  "));
            spans.push(key("[\u{2191}\u{2193}]"));
            spans.push(Span::raw(" scroll  "));
        }
        Tab::Systems | Tab::Render => {}
    }
    spans.push(key("[p]"));
    spans.push(Span::raw(" pause  "));
    spans.push(key("[q]"));
    spans.push(Span::raw(" quit"));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn stats(data: &[u64]) -> (f64, f64, f64) {
    let (Some(min), Some(max)) = (data.iter().min(), data.iter().max()) else {
        return (0.0, 0.0, 0.0);
    };
    let avg = data.iter().sum::<u64>() as f64 / data.len() as f64;
    (*min as f64, avg, *max as f64)
}

/// `width` cells, filled in proportion to `value / max`.
fn bar(value: f64, max: f64, width: usize) -> String {
    let filled = if max > 0.0 {
        ((value / max).clamp(0.0, 1.0) * width as f64).round() as usize
    } else {
        0
    };
    format!("{}{}", "\u{2588}".repeat(filled), "\u{2591}".repeat(width - filled))
}

fn format_uptime(secs: f32) -> String {
    let total = secs as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{secs:.1}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "app_name": "VFC",
        "fps": 59.8, "delta_ms": 16.7, "frame_count": 120, "elapsed_secs": 2.0,
        "game_object_count": 3, "archetype_count": 2,
        "components": [{ "name": "SpatialComponent", "count": 3 }],
        "system_timings": [{ "name": "Frustum System", "active": true, "duration_us": 4.0 }],
        "passes": [{ "name": "Phong Shader", "phase": "Scene", "active": true, "draws": 7, "culled": 2 }],
        "frame_budget": { "systems_us": 10.0, "render_us": 30.0 },
        "pool": { "total_slots": 4, "free_count": 1, "alive_count": 3,
                  "created_this_frame": 0, "destroyed_this_frame": 0, "fragmentation_pct": 25.0 },
        "logs": [{ "level": "WARN", "target": "neo", "message": "hi", "timestamp_secs": 1.5 }]
    }"#;

    #[test]
    fn snapshots_accumulate_history_and_logs() {
        let mut app = App::new();
        let snap: DiagSnapshot = serde_json::from_str(SAMPLE).unwrap();
        app.push_snapshot(snap.clone());
        app.push_snapshot(snap);

        assert!(app.connected);
        assert_eq!(app.fps_history.iter().copied().collect::<Vec<_>>(), vec![60, 60]);
        assert_eq!(app.draw_history.back(), Some(&7));
        assert_eq!(app.log_counts(), [0, 0, 0, 2, 0]);
        assert_eq!(app.latest.passes[0].culled, 2);
    }

    #[test]
    fn paused_ignores_snapshots() {
        let mut app = App::new();
        app.paused = true;
        app.push_snapshot(serde_json::from_str(SAMPLE).unwrap());
        assert!(!app.connected);
        assert!(app.fps_history.is_empty());
    }

    #[test]
    fn missing_fields_default() {
        let snap: DiagSnapshot = serde_json::from_str(r#"{ "fps": 30.0 }"#).unwrap();
        assert_eq!(snap.fps, 30.0);
        assert!(snap.logs.is_empty());
    }

    #[test]
    fn log_filter_levels() {
        assert!(LogFilter::Info.passes("WARN"));
        assert!(!LogFilter::Info.passes("DEBUG"));
        assert!(LogFilter::Debug.passes("DEBUG"));
        assert_eq!(LogFilter::Error.next(), LogFilter::All);
    }

    #[test]
    fn helpers() {
        assert_eq!(stats(&[]), (0.0, 0.0, 0.0));
        assert_eq!(stats(&[1, 2, 3]), (1.0, 2.0, 3.0));
        assert_eq!(bar(5.0, 10.0, 4), "\u{2588}\u{2588}\u{2591}\u{2591}");
        assert_eq!(format_uptime(75.0), "1m15s");
        assert_eq!(format_uptime(3.25), "3.2s");
        assert_eq!(Tab::Logs.next(), Tab::Overview);
        assert_eq!(Tab::Overview.prev(), Tab::Logs);
    }
}

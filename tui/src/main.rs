//! Stagehand DevOps Simulations: interactive Ratatui dashboard
//!
//! Keys: [1-4] module, [Tab] script, [s] scenario, [r] run, [p] pause or
//! resume, [x] reset, [q] quit.
//!
//! Layout:
//!   ┌─── header ──────────────────────────────────────────────────────────┐
//!   │  [1] CI/CD  [2] GitHub Actions  [3] Agile  [4] Git Branching        │
//!   ├─── left panel ──────────────────┬─── right panel ───────────────────┤
//!   │  Stages                         │  Console                          │
//!   ├─────────────────────────────────┴───────────────────────────────────┤
//!   │  Run Details & Journal                                              │
//!   ├─────────────────────────────────────────────────────────────────────┤
//!   │  footer (key bindings)                                              │
//!   └─────────────────────────────────────────────────────────────────────┘
//!
//! The dashboard only reads published snapshots. Playback itself runs on a
//! tokio runtime owned by `main`; the draw loop never waits on it.

use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};

use stagehand_catalog::{catalog, ScriptEntry, SimulationModule};
use stagehand_contracts::{
    error::StageResult,
    scenario::ScenarioConfig,
    state::{RunPhase, RunState, StepStatus},
};
use stagehand_core::{RunController, StartOutcome};
use stagehand_journal::InMemoryJournal;
use stagehand_policy::PlaybackConfig;
use stagehand_verify::RunAuditor;

// ── Journal view ──────────────────────────────────────────────────────────────

/// What the details panel shows about the journal. Rebuilt only when the
/// journal grows or shrinks.
#[derive(Default)]
struct JournalView {
    len: usize,
    intact: bool,
    terminal_hash: String,
    recent: Vec<(u64, &'static str, String)>,
    audit: String,
    audit_passed: bool,
}

impl JournalView {
    const RECENT: usize = 4;

    fn build(journal: &InMemoryJournal) -> Self {
        let entries = journal.entries();
        let report = RunAuditor::new().audit(
            &entries.iter().map(|e| &e.snapshot).collect::<Vec<_>>(),
        );
        let recent = entries
            .iter()
            .rev()
            .take(Self::RECENT)
            .map(|e| (e.sequence, e.event.kind(), shorten_hash(&e.this_hash)))
            .collect();
        Self {
            len: entries.len(),
            intact: journal.verify_integrity(),
            terminal_hash: entries
                .last()
                .map(|e| shorten_hash(&e.this_hash))
                .unwrap_or_default(),
            recent,
            audit: if report.passed {
                "all run invariants hold".to_string()
            } else {
                report.summary()
            },
            audit_passed: report.passed,
        }
    }
}

// ── App state ─────────────────────────────────────────────────────────────────

struct App {
    modules: Vec<SimulationModule>,
    selected: usize,
    script_index: usize,
    scenario_index: usize,

    // One controller per mounted module; replaced on module switch.
    controller: RunController,
    journal: Arc<InMemoryJournal>,
    journal_view: JournalView,

    // Last message for the details panel (busy start, config errors).
    notice: Option<String>,

    last_tick: Instant,
}

impl App {
    fn new() -> StageResult<Self> {
        let modules = catalog()?;
        let journal = Arc::new(InMemoryJournal::new());
        let controller = mount_controller(&modules[0], &modules[0].scripts[0], &journal)?;
        Ok(Self {
            modules,
            selected: 0,
            script_index: 0,
            scenario_index: 0,
            controller,
            journal,
            journal_view: JournalView::default(),
            notice: None,
            last_tick: Instant::now(),
        })
    }

    fn module(&self) -> &SimulationModule {
        &self.modules[self.selected]
    }

    fn entry(&self) -> &ScriptEntry {
        &self.module().scripts[self.script_index]
    }

    fn scenario(&self) -> &ScenarioConfig {
        &self.module().scenarios[self.scenario_index]
    }

    /// Switch to module `index`. The old controller is dropped, which cancels
    /// its run; nothing it had scheduled reaches the new module.
    fn select_module(&mut self, index: usize) {
        if index >= self.modules.len() || index == self.selected {
            return;
        }
        let journal = Arc::new(InMemoryJournal::new());
        let module = &self.modules[index];
        match mount_controller(module, &module.scripts[0], &journal) {
            Ok(controller) => {
                self.controller = controller;
                self.journal = journal;
                self.journal_view = JournalView::default();
                self.selected = index;
                self.script_index = 0;
                self.scenario_index = 0;
                self.notice = None;
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    /// Mount the next script of the current module.
    fn cycle_script(&mut self) {
        self.script_index = (self.script_index + 1) % self.module().scripts.len();
        self.controller.mount(Arc::clone(&self.entry().script));
        self.notice = None;
    }

    /// Pick the next scenario. A run in flight is reset.
    fn cycle_scenario(&mut self) {
        self.scenario_index = (self.scenario_index + 1) % self.module().scenarios.len();
        self.controller.reset();
        self.notice = None;
    }

    fn run(&mut self) {
        // Each run gets a fresh journal; a busy start keeps the current one.
        if !self.controller.is_running() {
            self.journal.clear();
            self.journal_view = JournalView::default();
        }
        let script = Arc::clone(&self.entry().script);
        let scenario = self.scenario().clone();
        self.notice = match self.controller.start(script, scenario) {
            Ok(StartOutcome::Started(_)) => None,
            Ok(StartOutcome::AlreadyRunning) => {
                Some("A run is already playing; press [x] to reset.".to_string())
            }
            Err(e) => Some(e.to_string()),
        };
    }

    fn toggle_pause(&mut self) {
        if !self.controller.resume() && !self.controller.pause() {
            self.notice = Some("Nothing is playing.".to_string());
        }
    }

    fn reset(&mut self) {
        self.controller.reset();
        self.notice = None;
    }

    /// Refresh derived views from the journal.
    fn tick(&mut self) {
        if self.journal.len() != self.journal_view.len {
            self.journal_view = JournalView::build(&self.journal);
        }
    }
}

fn mount_controller(
    module: &SimulationModule,
    entry: &ScriptEntry,
    journal: &Arc<InMemoryJournal>,
) -> StageResult<RunController> {
    let controller = module.controller(&PlaybackConfig::default(), None)?;
    controller.add_observer(Box::new(Arc::clone(journal)));
    controller.mount(Arc::clone(&entry.script));
    Ok(controller)
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn ui(f: &mut Frame, app: &App) {
    let full = f.area();
    let state = app.controller.snapshot();

    // Split into: header, main body, details panel, footer.
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // header
            Constraint::Min(10),    // stages + console (left/right split)
            Constraint::Length(10), // details
            Constraint::Length(3),  // footer
        ])
        .split(full);

    render_header(f, outer_chunks[0], app);

    let mid_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(outer_chunks[1]);

    render_stages(f, mid_chunks[0], app, &state);
    render_console(f, mid_chunks[1], app.entry(), &state);
    render_details(f, outer_chunks[2], app, &state);
    render_footer(f, outer_chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let title_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let mut spans: Vec<Span> = vec![Span::styled("STAGEHAND DevOps Simulations    ", title_style)];

    for (i, module) in app.modules.iter().enumerate() {
        let style = if i == app.selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("[{}] {}  ", i + 1, module.title()), style));
    }

    let header = Paragraph::new(Line::from(spans)).block(panel(""));
    f.render_widget(header, area);
}

fn phase_style(phase: RunPhase) -> (&'static str, Color) {
    match phase {
        RunPhase::Idle => ("IDLE", Color::DarkGray),
        RunPhase::Running => ("RUNNING", Color::Yellow),
        RunPhase::Success => ("SUCCESS", Color::Green),
        RunPhase::Failed => ("FAILED", Color::Red),
    }
}

fn render_stages(f: &mut Frame, area: Rect, app: &App, state: &RunState) {
    let mut items: Vec<ListItem> = Vec::new();

    let (phase_label, phase_color) = if app.controller.is_paused() {
        ("PAUSED", Color::Cyan)
    } else {
        phase_style(state.phase)
    };
    items.push(ListItem::new(Line::from(vec![
        Span::styled("State: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            phase_label,
            Style::default().fg(phase_color).add_modifier(Modifier::BOLD),
        ),
    ])));
    items.push(ListItem::new(""));

    for (i, step) in app.entry().script.steps().iter().enumerate() {
        let status = state.status_at(i).unwrap_or(StepStatus::Pending);
        let (icon, color) = match status {
            StepStatus::Pending => ("  ○", Color::DarkGray),
            StepStatus::Running => ("  ◐", Color::Yellow),
            StepStatus::Success => ("  ✓", Color::Green),
            StepStatus::Failed => ("  ✗", Color::Red),
        };
        let duration = state
            .duration_of(&step.id)
            .map(|d| format!(" {:.1}s", d))
            .unwrap_or_default();
        let name_style = if state.active_step_index == Some(i) {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let line = Line::from(vec![
            Span::styled(icon, Style::default().fg(color)),
            Span::styled(format!(" {} ", truncate(&step.name, 28)), name_style),
            Span::styled(
                status.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(duration, Style::default().fg(Color::Gray)),
        ]);
        items.push(ListItem::new(line));
    }

    let block = panel(format!(" {} ", app.entry().script.title()));

    f.render_widget(List::new(items).block(block), area);
}

fn render_console(f: &mut Frame, area: Rect, entry: &ScriptEntry, state: &RunState) {
    let block = panel(" Console ");

    // Before a run: the workflow file, if the script has one, under the hint.
    if state.log_lines.is_empty() {
        let dim = Style::default().fg(Color::DarkGray);
        let mut lines = vec![Line::from(Span::styled(
            "  Press [r] to run the selected scenario.",
            dim,
        ))];
        if entry.source_text.is_some() {
            lines.push(Line::from(""));
            lines.extend(
                entry
                    .source_lines()
                    .map(|l| Line::from(Span::styled(format!("  {l}"), Style::default().fg(Color::Gray)))),
            );
        }
        f.render_widget(Paragraph::new(lines).block(block), area);
        return;
    }

    // Follow the tail of the log.
    let visible = area.height.saturating_sub(2) as usize;
    let skip = state.log_lines.len().saturating_sub(visible);
    let lines: Vec<Line> = state
        .log_lines
        .iter()
        .skip(skip)
        .map(|line| {
            let color = if line.contains('✗') || line.contains("FAIL") || line.contains("ERROR") {
                Color::Red
            } else if line.starts_with('$') || line.starts_with('>') {
                Color::Cyan
            } else if line.contains('✓') || line.contains('✅') {
                Color::Green
            } else {
                Color::Gray
            };
            Line::from(Span::styled(line.as_str(), Style::default().fg(color)))
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_details(f: &mut Frame, area: Rect, app: &App, state: &RunState) {
    let block = panel(" Run Details & Journal ");

    let scenario = app.scenario();
    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            Span::styled("  Scenario:  ", Style::default().fg(Color::Gray)),
            Span::styled(
                scenario.label.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", scenario.description),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Run:       ", Style::default().fg(Color::Gray)),
            Span::raw(
                state
                    .run_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            ),
        ]),
    ];

    let view = &app.journal_view;
    let (chain_label, chain_color) = match (view.len, view.intact) {
        (0, _) => ("empty", Color::DarkGray),
        (_, true) => ("VERIFIED", Color::Green),
        (_, false) => ("BROKEN", Color::Red),
    };
    lines.push(Line::from(vec![
        Span::styled("  Journal:   ", Style::default().fg(Color::Gray)),
        Span::raw(format!("{} entries, chain ", view.len)),
        Span::styled(
            chain_label,
            Style::default().fg(chain_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  head {}", view.terminal_hash),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    for (sequence, kind, hash) in &view.recent {
        lines.push(Line::from(vec![
            Span::styled(format!("    #{:<4}", sequence), Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{:<15}", kind), Style::default().fg(Color::Gray)),
            Span::styled(hash.as_str(), Style::default().fg(Color::DarkGray)),
        ]));
    }

    let audit_color = if view.audit_passed { Color::Green } else { Color::Red };
    lines.push(Line::from(vec![
        Span::styled("  Audit:     ", Style::default().fg(Color::Gray)),
        Span::styled(truncate(&view.audit, 80), Style::default().fg(audit_color)),
    ]));

    if let Some(notice) = &app.notice {
        lines.push(Line::from(Span::styled(
            format!("  {}", notice),
            Style::default().fg(Color::Yellow),
        )));
    }

    let p = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let key = Style::default().fg(Color::Cyan);
    let mut spans: Vec<Span> = vec![
        Span::styled(" [1-4] ", key),
        Span::raw("Module  "),
    ];

    if app.module().scripts.len() > 1 {
        spans.push(Span::styled("[Tab] ", key));
        spans.push(Span::raw(format!("Script: {}  ", app.entry().id())));
    }
    if app.module().scenarios.len() > 1 {
        spans.push(Span::styled("[s] ", key));
        spans.push(Span::raw(format!("Scenario: {}  ", app.scenario().scenario_id.as_str())));
    }

    spans.push(Span::styled("[r] ", key));
    spans.push(Span::raw("Run  "));
    spans.push(Span::styled("[p] ", key));
    spans.push(Span::raw(if app.controller.is_paused() { "Resume  " } else { "Pause  " }));
    spans.push(Span::styled("[x] ", key));
    spans.push(Span::raw("Reset  "));
    spans.push(Span::styled("[q] ", key));
    spans.push(Span::raw("Quit"));

    let footer = Paragraph::new(Line::from(spans)).block(panel(""));
    f.render_widget(footer, area);
}

// ── Utility helpers ───────────────────────────────────────────────────────────

/// A bordered panel with an optional title.
fn panel<'a>(title: impl Into<Line<'a>>) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
}

/// Truncate a string to at most `max` chars, appending "…" if truncated.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Shorten a hex hash to its first and last six characters.
fn shorten_hash(h: &str) -> String {
    if h.len() > 12 {
        format!("{}…{}", &h[..6], &h[h.len() - 6..])
    } else {
        h.to_string()
    }
}

// ── Terminal setup / teardown ─────────────────────────────────────────────────

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

// ── Main event loop ───────────────────────────────────────────────────────────

fn main() -> io::Result<()> {
    // Playback tasks run here; `enter` lets the controller spawn onto it.
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let mut app = App::new().map_err(|e| io::Error::other(e.to_string()))?;

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        default_hook(info);
    }));

    let mut terminal = setup_terminal()?;

    // Redraw interval; line pacing is never shorter than this.
    const TICK_MS: u64 = 100;

    loop {
        terminal.draw(|f| ui(f, &app))?;

        let timeout = Duration::from_millis(TICK_MS).saturating_sub(app.last_tick.elapsed());

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => break,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,

                    KeyCode::Char(c @ '1'..='4') => {
                        app.select_module(c as usize - '1' as usize);
                    }

                    KeyCode::Tab => app.cycle_script(),
                    KeyCode::Char('s') | KeyCode::Char('S') => app.cycle_scenario(),
                    KeyCode::Char('r') | KeyCode::Char('R') => app.run(),
                    KeyCode::Char('p') | KeyCode::Char('P') => app.toggle_pause(),
                    KeyCode::Char('x') | KeyCode::Char('X') => app.reset(),

                    _ => {}
                }
            }
        }

        if app.last_tick.elapsed() >= Duration::from_millis(TICK_MS) {
            app.tick();
            app.last_tick = Instant::now();
        }
    }

    // Dropping the controller cancels whatever is still playing.
    drop(app);
    restore_terminal(&mut terminal)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use stagehand_contracts::state::RunPhase;

    use super::App;

    async fn play_out(app: &App) {
        while app.controller.is_running() {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// Every run starts a fresh journal, so the details panel only ever
    /// audits the run on screen. A busy start keeps the journal intact.
    #[tokio::test(start_paused = true)]
    async fn test_each_run_starts_a_fresh_journal() {
        let mut app = App::new().unwrap();
        app.run();
        play_out(&app).await;
        app.tick();
        let first_run = app.journal_view.len;
        assert!(first_run > 10);
        assert!(app.journal_view.audit_passed);

        app.run();
        let entries = app.journal.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sequence, 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let during = app.journal.len();
        app.run();
        assert!(app.notice.is_some());
        assert!(app.journal.len() >= during);
        assert!(app.journal.verify_integrity());
    }

    /// `p` pauses a playing run and resumes it; with nothing playing it
    /// only leaves a notice.
    #[tokio::test(start_paused = true)]
    async fn test_toggle_pause() {
        let mut app = App::new().unwrap();
        app.toggle_pause();
        assert!(app.notice.is_some());

        app.run();
        tokio::time::sleep(Duration::from_secs(1)).await;
        app.toggle_pause();
        assert!(app.controller.is_paused());
        let frozen = app.controller.snapshot();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(app.controller.snapshot(), frozen);

        app.toggle_pause();
        assert!(!app.controller.is_paused());
        play_out(&app).await;
        assert_eq!(app.controller.snapshot().phase, RunPhase::Success);
    }
}

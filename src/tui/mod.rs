mod help;
mod state;

use crate::cli::Cli;
use crate::model::{
    InfoEvent, LaunchEvent, LaunchPhase, PollOutcome, ReadinessResult, SessionRequest,
};
use crate::orchestrator::{self, UiCommand};
use crate::settings::SettingsStore;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Terminal,
};
use state::{push_wrapped_status_kv, FormField, LastPoll, Screen, UiState};
use std::path::PathBuf;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure between the session and the render loop.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<LaunchEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // Disk lookups happen once, before the UI thread starts.
    let deps = crate::cli::system_deps(&args);
    let (store, settings) = crate::cli::load_settings(deps.cfg.remember_choices);
    let mut state = UiState {
        settings: settings.clone(),
        detected_path: crate::cli::resolve_executable(&args, &settings),
        // The welcome marker is not a user choice, so --no-save doesn't suppress it.
        first_run: note_first_run(SettingsStore::default_location().ok().as_ref()),
        ..Default::default()
    };
    seed_inputs(&args, &mut state);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(state, store, event_rx, cmd_tx));

    let res = orchestrator::run_controller(deps, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// True the first time the wizard runs for this user; leaves the marker behind.
fn note_first_run(marker: Option<&SettingsStore>) -> bool {
    let Some(marker) = marker else {
        return false;
    };
    if !marker.is_first_run() {
        return false;
    }
    if let Err(e) = marker.mark_returning_user() {
        tracing::debug!(error = %format!("{e:#}"), "could not write first-run marker");
    }
    true
}

/// Prefill the wizard from flags and remembered settings, skipping screens already answered.
fn seed_inputs(args: &Cli, state: &mut UiState) {
    if let Some(p) = state.detected_path.as_ref() {
        state.path_input = p.display().to_string();
    }
    let folder = args
        .project_folder
        .clone()
        .or_else(|| state.settings.last_project_folder.clone());
    if let Some(f) = folder {
        state.folder_input = f.display().to_string();
    }
    if let Ok(params) = crate::cli::build_params(args) {
        state.params = params;
    }
    if state.first_run {
        state.info = "Welcome to quickpremiere! Press F1 for keybinds.".into();
    }
    // A remembered installation that still exists needs no confirmation, as before.
    let confirmed =
        args.premiere_path.is_some() || state.settings.premiere_path == state.detected_path;
    if state.detected_path.is_some() && confirmed {
        state.executable = state.detected_path.clone();
        state.screen = Screen::Folder;
    }
}

/// What a key press asks the loop to do besides mutating state.
#[derive(Debug)]
enum KeyAction {
    Nothing,
    Quit,
    Command(UiCommand),
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    store: Option<SettingsStore>,
    mut event_rx: UnboundedReceiver<LaunchEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, store.as_ref(), ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut state, store.as_ref(), k.modifiers, k.code) {
                    KeyAction::Nothing => {}
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyAction::Command(cmd) => {
                        let _ = cmd_tx.send(cmd);
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn handle_key(
    state: &mut UiState,
    store: Option<&SettingsStore>,
    modifiers: KeyModifiers,
    code: KeyCode,
) -> KeyAction {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }
    if code == KeyCode::F(1) {
        state.show_help = !state.show_help;
        return KeyAction::Nothing;
    }

    match (state.screen, code) {
        (Screen::Install, KeyCode::Enter) => {
            let path = PathBuf::from(state.path_input.trim());
            if !crate::install::is_usable(&path) {
                state.info = format!("No executable at {}", path.display());
                return KeyAction::Nothing;
            }
            if let Some(store) = store {
                state.settings.premiere_path = Some(path.clone());
                if let Err(e) = store.save(&state.settings) {
                    state.info = format!("Saving settings failed: {e:#}");
                }
            }
            state.executable = Some(path);
            state.screen = Screen::Folder;
            KeyAction::Nothing
        }
        (Screen::Install, KeyCode::Esc) => KeyAction::Quit,
        (Screen::Folder, KeyCode::Enter) => {
            let folder = state.folder_input.trim();
            if folder.is_empty() {
                state.info = "Choose where your files will go for this project".into();
                return KeyAction::Nothing;
            }
            state.project_folder = Some(PathBuf::from(folder));
            state.info.clear();
            state.screen = Screen::Params;
            KeyAction::Nothing
        }
        (Screen::Folder, KeyCode::Esc) => {
            state.screen = Screen::Install;
            KeyAction::Nothing
        }
        (Screen::Params, KeyCode::Enter) => {
            if state.submitted {
                return KeyAction::Nothing;
            }
            let (Some(executable), Some(project_folder)) =
                (state.executable.clone(), state.project_folder.clone())
            else {
                state.screen = Screen::Install;
                return KeyAction::Nothing;
            };
            state.error = None;
            state.submitted = true;
            KeyAction::Command(UiCommand::Create(SessionRequest {
                executable,
                project_folder,
                params: state.params.clone(),
            }))
        }
        (Screen::Params, KeyCode::Esc) => {
            state.screen = Screen::Folder;
            KeyAction::Nothing
        }
        (Screen::Params, KeyCode::Tab) | (Screen::Params, KeyCode::Down) => {
            state.field = state.field.next();
            KeyAction::Nothing
        }
        (Screen::Params, KeyCode::BackTab) | (Screen::Params, KeyCode::Up) => {
            state.field = state.field.prev();
            KeyAction::Nothing
        }
        (Screen::Params, KeyCode::Left | KeyCode::Right | KeyCode::Char(' '))
            if state.field != FormField::Name =>
        {
            let forward = code != KeyCode::Left;
            match state.field {
                FormField::Orientation => state.params.toggle_orientation(),
                FormField::Resolution => state.params.cycle_resolution(forward),
                FormField::Fps => state.params.cycle_fps(),
                FormField::Name => {}
            }
            KeyAction::Nothing
        }
        (Screen::Launching, KeyCode::Esc) => KeyAction::Command(UiCommand::Cancel),
        (Screen::Done, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')) => KeyAction::Quit,
        (_, KeyCode::Backspace) => {
            if let Some(input) = state.active_input() {
                input.pop();
            }
            KeyAction::Nothing
        }
        (_, KeyCode::Char(c)) => {
            if let Some(input) = state.active_input() {
                input.push(c);
            }
            KeyAction::Nothing
        }
        _ => KeyAction::Nothing,
    }
}

fn apply_event(state: &mut UiState, store: Option<&SettingsStore>, ev: LaunchEvent) {
    match ev {
        LaunchEvent::PhaseStarted { phase } => {
            state.phase = Some(phase);
            state.last_poll = None;
            state.push_log(format!("== {phase:?} =="));
        }
        LaunchEvent::Poll {
            phase,
            attempt,
            budget,
            outcome,
        } => {
            if let PollOutcome::ProbeFailed(e) = &outcome {
                state.push_log(format!("{phase:?} {attempt}/{budget}: {e} (ignored)"));
            }
            state.last_poll = Some(LastPoll {
                phase,
                attempt,
                budget,
                outcome,
            });
        }
        LaunchEvent::Info(info) => {
            if matches!(info, InfoEvent::ProjectCopied { .. }) {
                state.screen = Screen::Launching;
            }
            if matches!(info, InfoEvent::NotReady | InfoEvent::HandOffFailed { .. }) {
                state.warning = Some(info.to_message());
            }
            let msg = info.to_message();
            state.push_log(msg.clone());
            state.info = msg;
        }
        LaunchEvent::SessionCompleted { report } => {
            let processed =
                orchestrator::process_session_completion(store, &state.settings, &report);
            state.settings = processed.settings;
            if !processed.messages.is_empty() {
                state.info = processed.messages.join("; ");
            } else if report.readiness == ReadinessResult::Ready && report.handed_off {
                state.info = "Done. Press Enter to exit.".into();
            }
            state.report = Some(*report);
            state.submitted = false;
            state.screen = Screen::Done;
        }
        LaunchEvent::SessionFailed { error, retryable } => {
            state.submitted = false;
            state.error = Some(error.clone());
            state.info = error;
            // Input problems keep the form as it was; anything else ends the run.
            state.screen = if retryable { Screen::Params } else { Screen::Done };
        }
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let steps = ["Installation", "Folder", "Project", "Launch"];
    let current = match state.screen {
        Screen::Install => 0,
        Screen::Folder => 1,
        Screen::Params => 2,
        Screen::Launching | Screen::Done => 3,
    };
    let mut spans = Vec::new();
    for (i, s) in steps.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" › ", Style::default().fg(Color::DarkGray)));
        }
        let style = if i == current {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(*s, style));
    }
    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("quickpremiere v{}", env!("CARGO_PKG_VERSION"))),
    );
    f.render_widget(header, chunks[0]);

    if state.show_help {
        draw_help(chunks[1], f);
    } else {
        match state.screen {
            Screen::Install => draw_install(chunks[1], f, state),
            Screen::Folder => draw_folder(chunks[1], f, state),
            Screen::Params => draw_params(chunks[1], f, state),
            Screen::Launching => draw_launching(chunks[1], f, state),
            Screen::Done => draw_done(chunks[1], f, state),
        }
    }

    let status = Paragraph::new(state.info.as_str())
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[2]);
}

fn input_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let cursor = if focused { "▏" } else { "" };
    Line::from(vec![
        Span::styled(format!("{label:<14}"), Style::default().fg(Color::Gray)),
        Span::styled(format!("{value}{cursor}"), style),
    ])
}

fn draw_install(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = vec![
        Line::from(Span::styled(
            "Select Premiere Installation",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    match state.detected_path.as_ref() {
        Some(p) => push_wrapped_status_kv(
            &mut lines,
            "Detected",
            &p.display().to_string(),
            area.width,
        ),
        None => lines.push(Line::from(
            "No installation detected. Type the path to Adobe Premiere Pro.exe.",
        )),
    }
    lines.push(Line::from(""));
    lines.push(input_line("Executable", &state.path_input, true));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Enter: use this   Esc: quit",
        Style::default().fg(Color::DarkGray),
    )));
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Installation"));
    f.render_widget(p, area);
}

fn draw_folder(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let lines = vec![
        Line::from(Span::styled(
            "Choose where your files will go for this project",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        input_line("Folder", &state.folder_input, true),
        Line::from(""),
        Line::from(Span::styled(
            "Missing folders are created. Enter: continue   Esc: back",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Project folder"));
    f.render_widget(p, area);
}

fn draw_params(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let p = &state.params;
    let choice = |field: FormField, value: String| {
        if state.field == field {
            format!("‹ {value} ›")
        } else {
            value
        }
    };
    let mut lines = vec![
        input_line("Project name", &p.name, state.field == FormField::Name),
        input_line(
            "Orientation",
            &choice(FormField::Orientation, format!("{:?}", p.orientation)),
            state.field == FormField::Orientation,
        ),
        input_line(
            "Resolution",
            &choice(FormField::Resolution, p.resolution.clone()),
            state.field == FormField::Resolution,
        ),
        input_line(
            "Frame rate",
            &choice(FormField::Fps, p.fps.to_string()),
            state.field == FormField::Fps,
        ),
        Line::from(""),
    ];
    if let Some(folder) = state.project_folder.as_ref() {
        let dest = crate::project::destination_path(folder, &p.name);
        push_wrapped_status_kv(&mut lines, "Creates", &dest.display().to_string(), area.width);
    }
    if let Some(err) = state.error.as_ref() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        if state.submitted {
            "Creating project…"
        } else {
            "Enter: Create Project   Tab: next field   Esc: back"
        },
        Style::default().fg(Color::DarkGray),
    )));
    let para = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Project"));
    f.render_widget(para, area);
}

fn draw_launching(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let (ratio, label) = match (state.phase, state.last_poll.as_ref()) {
        (_, Some(poll)) => {
            let what = match &poll.outcome {
                PollOutcome::NotFound => "not running yet".to_string(),
                PollOutcome::Found { pid, state } => format!("pid {pid} {state:?}"),
                PollOutcome::ProbeFailed(_) => "process list unavailable".to_string(),
            };
            (
                poll.attempt as f64 / poll.budget.max(1) as f64,
                format!("{:?} {}/{}: {what}", poll.phase, poll.attempt, poll.budget),
            )
        }
        (Some(LaunchPhase::Settle), None) => {
            (0.0, "Letting Premiere finish loading…".to_string())
        }
        (Some(phase), None) => (0.0, format!("{phase:?}")),
        (None, None) => (0.0, "Starting…".to_string()),
    };
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Waiting for Premiere (Esc to stop waiting)"),
        )
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(label);
    f.render_widget(gauge, chunks[0]);

    draw_log(chunks[1], f, state);
}

fn draw_log(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = state.log.len().saturating_sub(visible);
    let lines: Vec<Line> = state.log[start..]
        .iter()
        .map(|l| Line::from(l.as_str()))
        .collect();
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Log"));
    f.render_widget(p, area);
}

fn draw_done(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(area);

    let mut lines = Vec::new();
    if let Some((label, color)) = state.outcome_label() {
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
    }
    if let Some(w) = state.warning.as_ref() {
        lines.push(Line::from(Span::styled(
            format!("Warning: {w}"),
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(err) = state.error.as_ref() {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    if let Some(r) = state.report.as_ref() {
        push_wrapped_status_kv(
            &mut lines,
            "Project",
            &r.request.target_document_path.display().to_string(),
            chunks[0].width,
        );
    }
    lines.push(Line::from(Span::styled(
        "Enter: exit",
        Style::default().fg(Color::DarkGray),
    )));
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Result"));
    f.render_widget(p, chunks[0]);

    draw_log(chunks[1], f, state);
}

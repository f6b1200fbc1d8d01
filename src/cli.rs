use crate::engine::probe::SysinfoProbe;
use crate::engine::EngineControl;
use crate::error::LaunchError;
use crate::launcher::SystemLauncher;
use crate::model::{
    AppConfig, LaunchEvent, LaunchPhase, NameMatch, Orientation, PollOutcome, ProjectParams,
    ReadinessConfig, ReadinessResult, SessionRequest, DEFAULT_APP_IDENTIFIER, FRAME_RATES,
};
use crate::orchestrator::{Session, SessionDeps};
use crate::settings::{Settings, SettingsStore};
use crate::text_summary::PollStats;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "quickpremiere",
    version,
    about = "Create a Premiere Pro project from a template and open it once the editor is ready"
)]
pub struct Cli {
    /// Path to the Premiere Pro executable (detected or remembered when omitted)
    #[arg(long)]
    pub premiere_path: Option<PathBuf>,

    /// Folder the project file is created in (last used folder when omitted)
    #[arg(long)]
    pub project_folder: Option<PathBuf>,

    /// Project name; the file becomes <name>.prproj
    #[arg(long)]
    pub name: Option<String>,

    /// Create a vertical project
    #[arg(long)]
    pub vertical: bool,

    /// Resolution, e.g. 1920x1080 (first option for the orientation when omitted)
    #[arg(long)]
    pub resolution: Option<String>,

    /// Frame rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Directory holding the <resolution>_<fps>.prproj templates
    #[arg(long)]
    pub templates_dir: Option<PathBuf>,

    /// Substring identifying the editor's process name
    #[arg(long, default_value = DEFAULT_APP_IDENTIFIER)]
    pub app_identifier: String,

    /// Match the process name case-insensitively
    #[arg(long)]
    pub ignore_case: bool,

    /// Delay before the first process check
    #[arg(long, default_value = "2s")]
    pub initial_delay: humantime::Duration,

    /// How long to wait for the editor's process to appear
    #[arg(long, default_value = "60s")]
    pub appearance_timeout: humantime::Duration,

    /// Interval between appearance checks
    #[arg(long, default_value = "1s")]
    pub appearance_poll: humantime::Duration,

    /// Pause after the process appears, while the splash screen is up
    #[arg(long, default_value = "5s")]
    pub settle_delay: humantime::Duration,

    /// How long to wait for the process to report a running state
    #[arg(long, default_value = "40s")]
    pub stability_timeout: humantime::Duration,

    /// Interval between stability checks
    #[arg(long, default_value = "1s")]
    pub stability_poll: humantime::Duration,

    /// Print JSON report and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text progress and summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except errors
    #[arg(long)]
    pub silent: bool,

    /// Do not remember the executable and project folder
    #[arg(long)]
    pub no_save: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }

    if args.silent {
        return run_report(args, true).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    if args.json {
        return run_report(args, false).await;
    }

    run_text(args).await
}

/// Templates live next to the binary unless told otherwise.
fn default_templates_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("templates")))
        .unwrap_or_else(|| PathBuf::from("templates"))
}

/// Build an `AppConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> AppConfig {
    AppConfig {
        templates_dir: args
            .templates_dir
            .clone()
            .unwrap_or_else(default_templates_dir),
        app_identifier: args.app_identifier.clone(),
        name_match: if args.ignore_case {
            NameMatch::CaseInsensitive
        } else {
            NameMatch::CaseSensitive
        },
        readiness: ReadinessConfig {
            initial_delay: Duration::from(args.initial_delay),
            appearance_timeout: Duration::from(args.appearance_timeout),
            appearance_poll: Duration::from(args.appearance_poll),
            settle_delay: Duration::from(args.settle_delay),
            stability_timeout: Duration::from(args.stability_timeout),
            stability_poll: Duration::from(args.stability_poll),
        },
        remember_choices: !args.no_save,
    }
}

/// Project parameters from the command line, checked against the offered options.
pub fn build_params(args: &Cli) -> Result<ProjectParams> {
    let orientation = if args.vertical {
        Orientation::Vertical
    } else {
        Orientation::Horizontal
    };
    let resolution = match args.resolution.as_deref() {
        Some(r) if orientation.resolutions().contains(&r) => r.to_string(),
        Some(r) => {
            return Err(anyhow::anyhow!(
                "resolution {r} is not offered for {orientation:?} projects (choose one of {})",
                orientation.resolutions().join(", ")
            ))
        }
        None => orientation.default_resolution().to_string(),
    };
    if !FRAME_RATES.contains(&args.fps) {
        return Err(anyhow::anyhow!(
            "frame rate {} is not offered (choose 30 or 60)",
            args.fps
        ));
    }
    Ok(ProjectParams {
        name: args.name.clone().unwrap_or_default(),
        orientation,
        resolution,
        fps: args.fps,
    })
}

/// Executable to launch: flag, then remembered path, then a scan of the install roots.
pub fn resolve_executable(args: &Cli, settings: &Settings) -> Option<PathBuf> {
    if let Some(p) = args.premiere_path.clone() {
        return Some(p);
    }
    if let Some(p) = settings.premiere_path.as_ref() {
        if crate::install::is_usable(p) {
            return Some(p.clone());
        }
        tracing::info!(path = %p.display(), "remembered executable is gone");
    }
    crate::install::find_installation(&crate::install::default_roots())
}

/// Settings store plus whatever it currently holds. A broken settings file is not fatal.
///
/// Without `remember_choices` the settings are still read but no store is handed out,
/// so nothing gets written back.
pub(crate) fn load_settings(remember_choices: bool) -> (Option<SettingsStore>, Settings) {
    let store = match SettingsStore::default_location() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "settings unavailable");
            return (None, Settings::default());
        }
    };
    let settings = store.load().unwrap_or_else(|e| {
        tracing::warn!(error = %format!("{e:#}"), "ignoring unreadable settings");
        Settings::default()
    });
    let store = remember_choices.then_some(store);
    (store, settings)
}

pub(crate) fn system_deps(args: &Cli) -> SessionDeps {
    SessionDeps {
        cfg: build_config(args),
        launcher: Arc::new(SystemLauncher),
        probe: Arc::new(SysinfoProbe::new()),
    }
}

/// Assemble a session request from flags and settings for the non-interactive modes.
fn build_request(args: &Cli, settings: &Settings) -> Result<SessionRequest> {
    let executable = resolve_executable(args, settings).context(
        "Premiere Pro installation not found; pass --premiere-path <path to Adobe Premiere Pro.exe>",
    )?;
    let project_folder = args
        .project_folder
        .clone()
        .or_else(|| settings.last_project_folder.clone())
        .context("no project folder; pass --project-folder <dir>")?;
    Ok(SessionRequest {
        executable,
        project_folder,
        params: build_params(args)?,
    })
}

/// Run a session without progress output and print the JSON report.
/// `silent` suppresses the report and turns a timeout into an error exit.
async fn run_report(args: Cli, silent: bool) -> Result<()> {
    let deps = system_deps(&args);
    let (store, settings) = load_settings(deps.cfg.remember_choices);
    let req = build_request(&args, &settings)?;

    let (evt_tx, _) = mpsc::unbounded_channel::<LaunchEvent>();
    let (_, ctrl_rx) = mpsc::unbounded_channel::<EngineControl>();
    let session = Session::new(deps.cfg, deps.launcher, deps.probe);
    // LaunchError's own message names the missing template or the bad input.
    let report = session.run(req, evt_tx, ctrl_rx).await?;

    crate::orchestrator::process_session_completion(store.as_ref(), &settings, &report);

    if silent {
        if report.readiness == ReadinessResult::TimedOut {
            return Err(LaunchError::ReadinessTimedOut.into());
        }
        return Ok(());
    }

    let (out_tx, out_handle) = spawn_output_writer();
    let out = serde_json::to_string_pretty(&report)?;
    let _ = out_tx.send(OutputLine::Stdout(out));
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

async fn run_text(args: Cli) -> Result<()> {
    let deps = system_deps(&args);
    let (store, settings) = load_settings(deps.cfg.remember_choices);
    let req = build_request(&args, &settings)?;

    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<LaunchEvent>();
    let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel::<EngineControl>();

    let session = Session::new(deps.cfg, deps.launcher, deps.probe);
    let mut handle = tokio::spawn(async move { session.run(req, evt_tx, ctrl_rx).await });

    let mut stats = PollStats::default();
    let joined = loop {
        tokio::select! {
            ev = evt_rx.recv() => match ev {
                Some(ev) => {
                    if let Some(line) = describe_event(&ev, &mut stats) {
                        let _ = out_tx.send(OutputLine::Stderr(line));
                    }
                }
                // Sender dropped: the session is finishing, wait for it below.
                None => break (&mut handle).await,
            },
            _ = tokio::signal::ctrl_c() => {
                let _ = out_tx.send(OutputLine::Stderr(
                    "Cancelling… (the editor keeps running)".into(),
                ));
                let _ = ctrl_tx.send(EngineControl::Cancel);
            }
            res = &mut handle => {
                // Flush anything still queued before reporting.
                while let Ok(ev) = evt_rx.try_recv() {
                    if let Some(line) = describe_event(&ev, &mut stats) {
                        let _ = out_tx.send(OutputLine::Stderr(line));
                    }
                }
                break res;
            }
        }
    };
    let report = joined.context("launch task failed")??;

    let processed =
        crate::orchestrator::process_session_completion(store.as_ref(), &settings, &report);
    for msg in processed.messages {
        let _ = out_tx.send(OutputLine::Stderr(msg));
    }
    if let Some(path) = processed.saved_path {
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Remembered choices in {}",
            path.display()
        )));
    }

    let summary = crate::text_summary::build_text_summary(&report, &stats);
    for line in summary.lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// One stderr line per event worth showing; poll outcomes are tallied instead.
fn describe_event(ev: &LaunchEvent, stats: &mut PollStats) -> Option<String> {
    match ev {
        LaunchEvent::PhaseStarted { phase } => Some(format!("== {phase:?} ==")),
        LaunchEvent::Poll {
            phase,
            attempt,
            budget,
            outcome,
        } => {
            stats.record(*phase, outcome);
            match outcome {
                PollOutcome::Found { pid, state } => Some(format!(
                    "{phase:?} {attempt}/{budget}: pid {pid} is {state:?}"
                )),
                PollOutcome::ProbeFailed(e) => {
                    Some(format!("{phase:?} {attempt}/{budget}: {e} (ignored)"))
                }
                PollOutcome::NotFound if *phase == LaunchPhase::Appearance && attempt % 10 == 0 => {
                    Some(format!("{phase:?} {attempt}/{budget}: still waiting"))
                }
                PollOutcome::NotFound => None,
            }
        }
        LaunchEvent::Info(info) => Some(info.to_message()),
        LaunchEvent::SessionCompleted { .. } | LaunchEvent::SessionFailed { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Cli {
        let mut argv = vec!["quickpremiere"];
        argv.extend_from_slice(extra);
        Cli::parse_from(argv)
    }

    #[test]
    fn default_timings() {
        let cfg = build_config(&parse(&[]));
        assert_eq!(cfg.readiness, ReadinessConfig::default());
        assert_eq!(cfg.app_identifier, DEFAULT_APP_IDENTIFIER);
        assert_eq!(cfg.name_match, NameMatch::CaseSensitive);
        assert!(cfg.remember_choices);
    }

    #[test]
    fn timing_and_matching_flags_are_applied() {
        let cfg = build_config(&parse(&[
            "--appearance-timeout",
            "2m",
            "--stability-poll",
            "500ms",
            "--ignore-case",
            "--no-save",
            "--templates-dir",
            "/srv/templates",
        ]));
        assert_eq!(cfg.readiness.appearance_timeout, Duration::from_secs(120));
        assert_eq!(cfg.readiness.stability_poll, Duration::from_millis(500));
        assert_eq!(cfg.name_match, NameMatch::CaseInsensitive);
        assert!(!cfg.remember_choices);
        assert_eq!(cfg.templates_dir, PathBuf::from("/srv/templates"));
    }

    #[test]
    fn params_default_per_orientation() {
        let p = build_params(&parse(&["--vertical", "--name", "Reel"])).unwrap();
        assert_eq!(p.orientation, Orientation::Vertical);
        assert_eq!(p.resolution, "1080x1920");
        assert_eq!(p.fps, 30);
        assert_eq!(p.name, "Reel");
    }

    #[test]
    fn params_reject_options_the_form_does_not_offer() {
        assert!(build_params(&parse(&["--resolution", "1080x1920"])).is_err());
        assert!(build_params(&parse(&["--fps", "24"])).is_err());
        assert!(build_params(&parse(&["--resolution", "3840x2160", "--fps", "60"])).is_ok());
    }

    #[test]
    fn explicit_executable_wins() {
        let args = parse(&["--premiere-path", "/x/Adobe Premiere Pro.exe"]);
        let settings = Settings {
            premiere_path: Some(PathBuf::from("/y/old.exe")),
            last_project_folder: None,
        };
        assert_eq!(
            resolve_executable(&args, &settings),
            Some(PathBuf::from("/x/Adobe Premiere Pro.exe"))
        );
    }

    #[test]
    fn request_falls_back_to_the_last_folder() {
        let args = parse(&["--premiere-path", "/x/pp.exe", "--name", "Demo"]);
        let settings = Settings {
            premiere_path: None,
            last_project_folder: Some(PathBuf::from("/work")),
        };
        let req = build_request(&args, &settings).unwrap();
        assert_eq!(req.project_folder, PathBuf::from("/work"));

        assert!(build_request(&args, &Settings::default()).is_err());
    }

    #[tokio::test]
    async fn silent_mode_error_names_the_missing_template() {
        let templates = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let templates_dir = templates.path().display().to_string();
        let folder = out.path().display().to_string();
        let args = parse(&[
            "--silent",
            "--json",
            "--no-save",
            "--premiere-path",
            "/x/pp.exe",
            "--templates-dir",
            &templates_dir,
            "--project-folder",
            &folder,
            "--name",
            "Demo",
        ]);

        let err = run(args).await.unwrap_err();

        let shown = err.to_string();
        assert!(shown.starts_with("Template not found: "), "{shown}");
        assert!(shown.ends_with("1920x1080_30.prproj"), "{shown}");
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn not_found_polls_are_summarised_not_printed() {
        let mut stats = PollStats::default();
        let poll = |attempt| LaunchEvent::Poll {
            phase: LaunchPhase::Appearance,
            attempt,
            budget: 60,
            outcome: PollOutcome::NotFound,
        };
        assert!(describe_event(&poll(3), &mut stats).is_none());
        assert!(describe_event(&poll(10), &mut stats).is_some());
        assert_eq!(stats.appearance_polls, 2);
    }
}

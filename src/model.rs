use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Everything a session needs that stays fixed for the life of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub templates_dir: PathBuf,
    pub app_identifier: String,
    pub name_match: NameMatch,
    pub readiness: ReadinessConfig,
    pub remember_choices: bool,
}

/// Substring Premiere Pro's process name carries on every platform it ships for.
pub const DEFAULT_APP_IDENTIFIER: &str = "Adobe Premiere Pro";

/// Timing knobs for the two polling phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub appearance_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub appearance_poll: Duration,
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub stability_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub stability_poll: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            appearance_timeout: Duration::from_secs(60),
            appearance_poll: Duration::from_secs(1),
            settle_delay: Duration::from_secs(5),
            stability_timeout: Duration::from_secs(40),
            stability_poll: Duration::from_secs(1),
        }
    }
}

/// Number of probes a phase gets: `ceil(timeout / poll)`, never less than one.
pub fn attempt_budget(timeout: Duration, poll: Duration) -> u32 {
    if poll.is_zero() {
        return 1;
    }
    let t = timeout.as_nanos();
    let p = poll.as_nanos();
    let n = t.div_ceil(p).max(1);
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// How a process name is compared against the application identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NameMatch {
    /// Exact-case substring match. Premiere reports its name unlocalized on Windows and macOS.
    #[default]
    CaseSensitive,
    CaseInsensitive,
}

impl NameMatch {
    pub fn matches(self, process_name: &str, identifier: &str) -> bool {
        match self {
            NameMatch::CaseSensitive => process_name.contains(identifier),
            NameMatch::CaseInsensitive => process_name
                .to_lowercase()
                .contains(&identifier.to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    Sleeping,
    Idle,
    Stopped,
    Zombie,
    Unknown(String),
}

/// One row of the process table as seen by a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub state: RunState,
}

/// Outcome of waiting for the editor to come up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessResult {
    Ready,
    TimedOut,
    /// The wait was abandoned by the caller before either phase finished.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchPhase {
    InitialDelay,
    Appearance,
    Settle,
    Stability,
    HandOff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollOutcome {
    NotFound,
    Found { pid: u32, state: RunState },
    ProbeFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }

    pub fn resolutions(self) -> &'static [&'static str] {
        match self {
            Orientation::Horizontal => &[
                "1920x1080",
                "2560x1440",
                "3840x2160",
                "1280x720",
                "1440x1080",
            ],
            Orientation::Vertical => &[
                "1080x1920",
                "1440x2560",
                "2160x3840",
                "720x1280",
                "1080x1440",
            ],
        }
    }

    pub fn default_resolution(self) -> &'static str {
        self.resolutions()[0]
    }
}

pub const FRAME_RATES: &[u32] = &[30, 60];

/// What the user filled in on the parameters form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectParams {
    pub name: String,
    pub orientation: Orientation,
    pub resolution: String,
    pub fps: u32,
}

impl Default for ProjectParams {
    fn default() -> Self {
        Self {
            name: String::new(),
            orientation: Orientation::Horizontal,
            resolution: Orientation::Horizontal.default_resolution().to_string(),
            fps: FRAME_RATES[0],
        }
    }
}

impl ProjectParams {
    /// Flip orientation and reset the resolution to the new orientation's first option.
    pub fn toggle_orientation(&mut self) {
        self.orientation = self.orientation.toggled();
        self.resolution = self.orientation.default_resolution().to_string();
    }

    pub fn cycle_resolution(&mut self, forward: bool) {
        let options = self.orientation.resolutions();
        let idx = options
            .iter()
            .position(|r| *r == self.resolution)
            .unwrap_or(0);
        let next = if forward {
            (idx + 1) % options.len()
        } else {
            (idx + options.len() - 1) % options.len()
        };
        self.resolution = options[next].to_string();
    }

    pub fn cycle_fps(&mut self) {
        let idx = FRAME_RATES.iter().position(|f| *f == self.fps).unwrap_or(0);
        self.fps = FRAME_RATES[(idx + 1) % FRAME_RATES.len()];
    }
}

/// Created once the project file is in place; consumed by the session that launches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub executable_path: PathBuf,
    pub target_document_path: PathBuf,
}

/// One create-and-launch request from a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub executable: PathBuf,
    pub project_folder: PathBuf,
    pub params: ProjectParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub timestamp_utc: String,
    pub params: ProjectParams,
    pub request: LaunchRequest,
    pub readiness: ReadinessResult,
    pub handed_off: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LaunchEvent {
    PhaseStarted {
        phase: LaunchPhase,
    },
    Poll {
        phase: LaunchPhase,
        attempt: u32,
        budget: u32,
        outcome: PollOutcome,
    },
    Info(InfoEvent),
    SessionCompleted {
        // Boxed to keep the per-poll events small.
        report: Box<SessionReport>,
    },
    SessionFailed {
        error: String,
        /// The form can be corrected and resubmitted as is.
        retryable: bool,
    },
}

/// Structured info events emitted by the session and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InfoEvent {
    Message(String),
    ProjectCopied { template: PathBuf, destination: PathBuf },
    Spawned { executable: PathBuf },
    HandedOff { document: PathBuf },
    HandOffFailed { document: PathBuf, error: String },
    NotReady,
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::ProjectCopied {
                template,
                destination,
            } => format!(
                "Copied template {} to {}",
                template.display(),
                destination.display()
            ),
            InfoEvent::Spawned { executable } => {
                format!("Started {}", executable.display())
            }
            InfoEvent::HandedOff { document } => {
                format!("Opened {}", document.display())
            }
            InfoEvent::HandOffFailed { document, error } => format!(
                "Could not open {} ({}). Please open the project manually.",
                document.display(),
                error
            ),
            InfoEvent::NotReady => crate::error::LaunchError::ReadinessTimedOut.to_string(),
        }
    }
}

//! Text summary builder for CLI output.
//!
//! This module tallies poll outcomes and formats human-readable lines for text mode.

use crate::model::{LaunchPhase, PollOutcome, ReadinessResult, SessionReport};

/// Poll counts gathered while the session ran.
#[derive(Debug, Default, Clone)]
pub(crate) struct PollStats {
    pub appearance_polls: u32,
    pub stability_polls: u32,
    pub probe_failures: u32,
}

impl PollStats {
    pub fn record(&mut self, phase: LaunchPhase, outcome: &PollOutcome) {
        match phase {
            LaunchPhase::Appearance => self.appearance_polls += 1,
            LaunchPhase::Stability => self.stability_polls += 1,
            _ => {}
        }
        if matches!(outcome, PollOutcome::ProbeFailed(_)) {
            self.probe_failures += 1;
        }
    }
}

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(report: &SessionReport, stats: &PollStats) -> TextSummary {
    let mut lines = Vec::new();
    let p = &report.params;

    lines.push(format!(
        "Project: {}",
        report.request.target_document_path.display()
    ));
    lines.push(format!(
        "Template: {} @ {} fps ({:?})",
        p.resolution, p.fps, p.orientation
    ));
    lines.push(format!(
        "Editor: {}",
        report.request.executable_path.display()
    ));

    let polls = format!(
        "{} appearance / {} stability checks",
        stats.appearance_polls, stats.stability_polls
    );
    lines.push(match report.readiness {
        ReadinessResult::Ready => format!("Readiness: ready after {polls}"),
        ReadinessResult::TimedOut => format!("Readiness: timed out after {polls}"),
        ReadinessResult::Cancelled => format!("Readiness: cancelled after {polls}"),
    });
    if stats.probe_failures > 0 {
        lines.push(format!(
            "Process list errors ignored: {}",
            stats.probe_failures
        ));
    }

    lines.push(if report.handed_off {
        "Hand-off: project opened".to_string()
    } else {
        "Hand-off: skipped, open the project manually".to_string()
    });

    TextSummary { lines }
}

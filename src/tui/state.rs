use crate::model::{
    LaunchPhase, PollOutcome, ProjectParams, ReadinessResult, SessionReport,
};
use crate::settings::Settings;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Install,
    Folder,
    Params,
    Launching,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Orientation,
    Resolution,
    Fps,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            FormField::Name => FormField::Orientation,
            FormField::Orientation => FormField::Resolution,
            FormField::Resolution => FormField::Fps,
            FormField::Fps => FormField::Name,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FormField::Name => FormField::Fps,
            FormField::Orientation => FormField::Name,
            FormField::Resolution => FormField::Orientation,
            FormField::Fps => FormField::Resolution,
        }
    }
}

/// Most recent poll, for the progress gauge.
#[derive(Debug, Clone)]
pub struct LastPoll {
    pub phase: LaunchPhase,
    pub attempt: u32,
    pub budget: u32,
    pub outcome: PollOutcome,
}

pub struct UiState {
    pub screen: Screen,
    pub show_help: bool,
    pub info: String,
    pub first_run: bool,
    pub settings: Settings,

    // Install screen
    pub detected_path: Option<PathBuf>,
    pub path_input: String,
    pub executable: Option<PathBuf>,

    // Folder screen
    pub folder_input: String,
    pub project_folder: Option<PathBuf>,

    // Params screen
    pub params: ProjectParams,
    pub field: FormField,
    pub error: Option<String>,
    pub submitted: bool,

    // Launching / Done
    pub phase: Option<LaunchPhase>,
    pub last_poll: Option<LastPoll>,
    pub log: Vec<String>,
    pub report: Option<SessionReport>,
    pub warning: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            screen: Screen::Install,
            show_help: false,
            info: String::new(),
            first_run: false,
            settings: Settings::default(),
            detected_path: None,
            path_input: String::new(),
            executable: None,
            folder_input: String::new(),
            project_folder: None,
            params: ProjectParams::default(),
            field: FormField::Name,
            error: None,
            submitted: false,
            phase: None,
            last_poll: None,
            log: Vec::new(),
            report: None,
            warning: None,
        }
    }
}

impl UiState {
    pub fn push_log(&mut self, line: String) {
        const MAX: usize = 200;
        self.log.push(line);
        if self.log.len() > MAX {
            let _ = self.log.drain(0..(self.log.len() - MAX));
        }
    }

    /// Text input bound to the current screen/field, if any.
    pub fn active_input(&mut self) -> Option<&mut String> {
        match self.screen {
            Screen::Install => Some(&mut self.path_input),
            Screen::Folder => Some(&mut self.folder_input),
            Screen::Params if self.field == FormField::Name => Some(&mut self.params.name),
            _ => None,
        }
    }

    pub fn outcome_label(&self) -> Option<(&'static str, Color)> {
        self.report.as_ref().map(|r| match (r.readiness, r.handed_off) {
            (ReadinessResult::Ready, true) => ("Project opened", Color::Green),
            (ReadinessResult::Ready, false) => ("Editor ready, open failed", Color::Yellow),
            (ReadinessResult::TimedOut, _) => ("Editor not ready in time", Color::Yellow),
            (ReadinessResult::Cancelled, _) => ("Cancelled", Color::Gray),
        })
    }
}

/// Append `label: value`, breaking long values (paths mostly) onto indented continuation lines.
pub fn push_wrapped_status_kv(out: &mut Vec<Line<'static>>, label: &str, value: &str, width: u16) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    let inner = usize::from(width.saturating_sub(4)).max(1);
    let head = format!("{label}:");
    let first_width = inner.saturating_sub(head.chars().count() + 1).max(1);
    let rest_width = inner.saturating_sub(2).max(1);

    let chars: Vec<char> = value.chars().collect();
    let (first, mut rest) = chars.split_at(first_width.min(chars.len()));
    out.push(Line::from(vec![
        Span::styled(head, Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::raw(first.iter().collect::<String>()),
    ]));
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest_width.min(rest.len()));
        out.push(Line::from(vec![
            Span::raw("  "),
            Span::raw(line.iter().collect::<String>()),
        ]));
        rest = tail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_paths_wrap_under_their_label() {
        let mut out = Vec::new();
        push_wrapped_status_kv(
            &mut out,
            "Project",
            "C:/Users/someone/Videos/Clients/Acme/Launch Teaser.prproj",
            30,
        );
        assert!(out.len() > 1);
        assert!(out[1].spans[0].content == "  ");
    }

    #[test]
    fn blank_values_are_skipped() {
        let mut out = Vec::new();
        push_wrapped_status_kv(&mut out, "Editor", "   ", 40);
        assert!(out.is_empty());
    }

    #[test]
    fn name_field_is_the_only_text_input_on_the_form() {
        let mut s = UiState {
            screen: Screen::Params,
            ..Default::default()
        };
        assert!(s.active_input().is_some());
        s.field = FormField::Resolution;
        assert!(s.active_input().is_none());
        assert_eq!(FormField::Fps.next(), FormField::Name);
        assert_eq!(FormField::Name.prev(), FormField::Fps);
    }
}

//! Post-session processing utilities.
//!
//! Remembers the user's choices after a project has been created.

use crate::model::SessionReport;
use crate::settings::{Settings, SettingsStore};

/// Result of post-session processing, ready for presentation layers.
pub(crate) struct ProcessedSession {
    pub settings: Settings,
    pub saved_path: Option<std::path::PathBuf>,
    pub messages: Vec<String>,
}

/// Fold the executable and project folder of a finished session into the settings and save them.
pub(crate) fn process_session_completion(
    store: Option<&SettingsStore>,
    settings: &Settings,
    report: &SessionReport,
) -> ProcessedSession {
    let mut updated = settings.clone();
    updated.premiere_path = Some(report.request.executable_path.clone());
    updated.last_project_folder = report
        .request
        .target_document_path
        .parent()
        .map(|p| p.to_path_buf());

    let mut messages = Vec::new();
    let saved_path = match store {
        Some(store) if updated != *settings => match store.save(&updated) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "could not save settings");
                messages.push(format!("Saving settings failed: {e:#}"));
                None
            }
        },
        _ => None,
    };

    ProcessedSession {
        settings: updated,
        saved_path,
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LaunchRequest, ProjectParams, ReadinessResult};
    use std::path::PathBuf;

    fn report(folder: &str) -> SessionReport {
        SessionReport {
            timestamp_utc: "2024-01-01T00:00:00Z".into(),
            params: ProjectParams::default(),
            request: LaunchRequest {
                executable_path: PathBuf::from("/opt/pp.exe"),
                target_document_path: PathBuf::from(folder).join("Demo.prproj"),
            },
            readiness: ReadinessResult::TimedOut,
            handed_off: false,
        }
    }

    #[test]
    fn remembers_executable_and_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());

        let processed =
            process_session_completion(Some(&store), &Settings::default(), &report("/work/a"));

        assert!(processed.saved_path.is_some());
        assert!(processed.messages.is_empty());
        let loaded = store.load().unwrap();
        assert_eq!(loaded.premiere_path, Some(PathBuf::from("/opt/pp.exe")));
        assert_eq!(loaded.last_project_folder, Some(PathBuf::from("/work/a")));
    }

    #[test]
    fn unchanged_settings_are_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        let current = Settings {
            premiere_path: Some(PathBuf::from("/opt/pp.exe")),
            last_project_folder: Some(PathBuf::from("/work/a")),
        };

        let processed = process_session_completion(Some(&store), &current, &report("/work/a"));

        assert!(processed.saved_path.is_none());
        assert!(!dir.path().join("settings.json").exists());
    }

    #[test]
    fn no_store_means_nothing_is_written() {
        let processed = process_session_completion(None, &Settings::default(), &report("/work/b"));
        assert!(processed.saved_path.is_none());
        assert_eq!(
            processed.settings.last_project_folder,
            Some(PathBuf::from("/work/b"))
        );
    }
}

//! A single create-and-launch session.
//!
//! Copies the template, starts the editor, waits for it to become ready and hands it the project.

use crate::engine::probe::ProcessProbe;
use crate::engine::{EngineControl, ReadinessSequencer};
use crate::error::LaunchError;
use crate::launcher::Launcher;
use crate::model::{
    AppConfig, InfoEvent, LaunchEvent, LaunchPhase, ReadinessResult, SessionReport, SessionRequest,
};
use crate::project;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Session {
    cfg: AppConfig,
    launcher: Arc<dyn Launcher>,
    probe: Arc<dyn ProcessProbe>,
}

impl Session {
    pub fn new(cfg: AppConfig, launcher: Arc<dyn Launcher>, probe: Arc<dyn ProcessProbe>) -> Self {
        Self {
            cfg,
            launcher,
            probe,
        }
    }

    pub async fn run(
        self,
        req: SessionRequest,
        event_tx: mpsc::UnboundedSender<LaunchEvent>,
        control_rx: mpsc::UnboundedReceiver<EngineControl>,
    ) -> Result<SessionReport, LaunchError> {
        let (template, request) = project::prepare_project(
            &req.params,
            &self.cfg.templates_dir,
            &req.project_folder,
            &req.executable,
        )?;
        let _ = event_tx.send(LaunchEvent::Info(InfoEvent::ProjectCopied {
            template,
            destination: request.target_document_path.clone(),
        }));

        self.launcher
            .spawn(&request.executable_path)
            .map_err(|source| LaunchError::Spawn {
                path: request.executable_path.clone(),
                source,
            })?;
        let _ = event_tx.send(LaunchEvent::Info(InfoEvent::Spawned {
            executable: request.executable_path.clone(),
        }));

        let sequencer = ReadinessSequencer::new(
            self.cfg.readiness.clone(),
            self.cfg.app_identifier.clone(),
            self.cfg.name_match,
            self.probe.clone(),
        );
        let readiness = sequencer.run(event_tx.clone(), control_rx).await;

        // The editor is left running whatever happens below.
        let handed_off = match readiness {
            ReadinessResult::Ready => {
                let _ = event_tx.send(LaunchEvent::PhaseStarted {
                    phase: LaunchPhase::HandOff,
                });
                let document = request.target_document_path.clone();
                match self.launcher.open_document(&document) {
                    Ok(()) => {
                        let _ = event_tx.send(LaunchEvent::Info(InfoEvent::HandedOff { document }));
                        true
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, path = %document.display(), "hand-off failed");
                        let _ = event_tx.send(LaunchEvent::Info(InfoEvent::HandOffFailed {
                            document,
                            error: e.to_string(),
                        }));
                        false
                    }
                }
            }
            ReadinessResult::TimedOut => {
                tracing::warn!("{}", LaunchError::ReadinessTimedOut);
                let _ = event_tx.send(LaunchEvent::Info(InfoEvent::NotReady));
                false
            }
            ReadinessResult::Cancelled => {
                tracing::info!("readiness wait cancelled");
                false
            }
        };

        Ok(SessionReport {
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            params: req.params,
            request,
            readiness,
            handed_off,
        })
    }
}

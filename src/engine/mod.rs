pub mod probe;
mod readiness;

use crate::model::{LaunchEvent, NameMatch, ReadinessConfig, ReadinessResult};
use probe::ProcessProbe;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum EngineControl {
    /// Stop waiting; the launched editor keeps running.
    Cancel,
}

/// Waits for an external application to appear in the process table and settle into a running state.
pub struct ReadinessSequencer {
    cfg: ReadinessConfig,
    app_identifier: String,
    name_match: NameMatch,
    probe: Arc<dyn ProcessProbe>,
}

impl ReadinessSequencer {
    pub fn new(
        cfg: ReadinessConfig,
        app_identifier: impl Into<String>,
        name_match: NameMatch,
        probe: Arc<dyn ProcessProbe>,
    ) -> Self {
        Self {
            cfg,
            app_identifier: app_identifier.into(),
            name_match,
            probe,
        }
    }

    pub async fn run(
        self,
        event_tx: mpsc::UnboundedSender<LaunchEvent>,
        mut control_rx: mpsc::UnboundedReceiver<EngineControl>,
    ) -> ReadinessResult {
        let cancel = Arc::new(AtomicBool::new(false));

        let cancel2 = cancel.clone();
        let control_handle = tokio::spawn(async move {
            while let Some(msg) = control_rx.recv().await {
                match msg {
                    EngineControl::Cancel => {
                        cancel2.store(true, Ordering::Relaxed);
                        break;
                    }
                }
            }
        });

        let result = readiness::await_ready(readiness::SequenceParams {
            probe: self.probe.as_ref(),
            identifier: &self.app_identifier,
            name_match: self.name_match,
            cfg: &self.cfg,
            event_tx: &event_tx,
            cancel,
        })
        .await;

        // Dropping a JoinHandle does not stop the task; it would sit in recv() forever.
        control_handle.abort();

        result
    }
}

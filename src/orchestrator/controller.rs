//! Session lifecycle controller.
//!
//! Owns start/cancel/quit orchestration and emits events for presentation layers.

use super::session::Session;
use crate::engine::probe::ProcessProbe;
use crate::engine::EngineControl;
use crate::error::LaunchError;
use crate::launcher::Launcher;
use crate::model::{AppConfig, InfoEvent, LaunchEvent, SessionReport, SessionRequest};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to drive sessions.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Create(SessionRequest),
    /// Stop waiting for the editor. It keeps running.
    Cancel,
    Quit,
}

/// Shared collaborators every session is built from.
#[derive(Clone)]
pub(crate) struct SessionDeps {
    pub cfg: AppConfig,
    pub launcher: Arc<dyn Launcher>,
    pub probe: Arc<dyn ProcessProbe>,
}

/// Internal handle for a running session task.
struct RunCtx {
    ctrl_tx: UnboundedSender<EngineControl>,
    handle: Option<tokio::task::JoinHandle<Result<SessionReport, LaunchError>>>,
}

/// Spawn a session and return its control handle.
fn start_session(
    deps: &SessionDeps,
    req: SessionRequest,
    event_tx: UnboundedSender<LaunchEvent>,
) -> RunCtx {
    let (ctrl_tx, ctrl_rx) = tokio::sync::mpsc::unbounded_channel::<EngineControl>();
    let session = Session::new(deps.cfg.clone(), deps.launcher.clone(), deps.probe.clone());
    let handle = tokio::spawn(async move { session.run(req, event_tx, ctrl_rx).await });
    RunCtx {
        ctrl_tx,
        handle: Some(handle),
    }
}

/// Run sessions on request from the UI and report their outcome back to it.
pub(crate) async fn run_controller(
    deps: SessionDeps,
    event_tx: UnboundedSender<LaunchEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut run_ctx: Option<RunCtx> = None;
    let mut quit_pending = false;

    let res = loop {
        tokio::select! {
            // Once quitting, stop reading: a closed channel would resolve on every iteration.
            cmd = cmd_rx.recv(), if !quit_pending => {
                match cmd {
                    Some(UiCommand::Create(req)) => {
                        if run_ctx.is_some() {
                            let _ = event_tx.send(LaunchEvent::Info(InfoEvent::Message(
                                "A launch is already in progress".into(),
                            )));
                        } else {
                            run_ctx = Some(start_session(&deps, req, event_tx.clone()));
                        }
                    }
                    Some(UiCommand::Cancel) => {
                        if let Some(ctx) = &run_ctx {
                            let _ = ctx.ctrl_tx.send(EngineControl::Cancel);
                            let _ = event_tx.send(LaunchEvent::Info(InfoEvent::Message(
                                "Cancelling…".into(),
                            )));
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        // Quit waits for the session to wind down so its report still reaches the UI.
                        quit_pending = true;
                        if let Some(ctx) = &run_ctx {
                            let _ = ctx.ctrl_tx.send(EngineControl::Cancel);
                        } else {
                            break Ok(());
                        }
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            maybe_done = async {
                if let Some(ctx) = &mut run_ctx {
                    if let Some(h) = ctx.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                if let Some(join_res) = maybe_done {
                    if let Some(ctx) = &mut run_ctx {
                        ctx.handle.take();
                    }
                    let ev = match join_res {
                        Ok(Ok(report)) => LaunchEvent::SessionCompleted {
                            report: Box::new(report),
                        },
                        Ok(Err(e)) => LaunchEvent::SessionFailed {
                            retryable: e.is_retryable_input(),
                            error: format!("{:#}", anyhow::Error::new(e)),
                        },
                        Err(e) => LaunchEvent::SessionFailed {
                            retryable: false,
                            error: format!("Session task failed: {e}"),
                        },
                    };
                    let _ = event_tx.send(ev);
                    run_ctx = None;
                    if quit_pending {
                        break Ok(());
                    }
                }
            }
        }
    };

    res
}

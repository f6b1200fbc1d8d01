use super::probe::ProcessProbe;
use crate::model::{
    attempt_budget, LaunchEvent, LaunchPhase, NameMatch, PollOutcome, ProcessSnapshot,
    ReadinessConfig, ReadinessResult, RunState,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Upper bound on how long a cancel request can go unnoticed during a sleep.
const CANCEL_CHECK: Duration = Duration::from_millis(50);

/// Parameters for one readiness wait.
pub(crate) struct SequenceParams<'a> {
    pub probe: &'a dyn ProcessProbe,
    pub identifier: &'a str,
    pub name_match: NameMatch,
    pub cfg: &'a ReadinessConfig,
    pub event_tx: &'a mpsc::UnboundedSender<LaunchEvent>,
    pub cancel: Arc<AtomicBool>,
}

/// Wait for `identifier` to appear and then reach a running state.
///
/// Emits a [`LaunchEvent`] per phase and per poll, and stops early once `cancel` is set.
pub(crate) async fn await_ready(params: SequenceParams<'_>) -> ReadinessResult {
    let SequenceParams {
        probe,
        identifier,
        name_match,
        cfg,
        event_tx,
        cancel,
    } = params;

    let _ = event_tx.send(LaunchEvent::PhaseStarted {
        phase: LaunchPhase::InitialDelay,
    });
    if !pause(cfg.initial_delay, &cancel).await {
        return ReadinessResult::Cancelled;
    }

    // Phase 1: wait for any matching process to show up at all.
    let _ = event_tx.send(LaunchEvent::PhaseStarted {
        phase: LaunchPhase::Appearance,
    });
    let budget = attempt_budget(cfg.appearance_timeout, cfg.appearance_poll);
    tracing::info!(identifier, budget, "waiting for process to appear");
    let mut appeared = false;
    for attempt in 1..=budget {
        if cancel.load(Ordering::Relaxed) {
            return ReadinessResult::Cancelled;
        }
        let outcome = poll_once(probe, identifier, name_match);
        tracing::debug!(attempt, ?outcome, "appearance poll");
        let found = matches!(outcome, PollOutcome::Found { .. });
        let _ = event_tx.send(LaunchEvent::Poll {
            phase: LaunchPhase::Appearance,
            attempt,
            budget,
            outcome,
        });
        if found {
            appeared = true;
            break;
        }
        if attempt < budget && !pause(cfg.appearance_poll, &cancel).await {
            return ReadinessResult::Cancelled;
        }
    }
    if !appeared {
        tracing::warn!(identifier, budget, "process never appeared");
        return ReadinessResult::TimedOut;
    }

    // Let the splash screen and plugin loading get out of the way.
    let _ = event_tx.send(LaunchEvent::PhaseStarted {
        phase: LaunchPhase::Settle,
    });
    if !pause(cfg.settle_delay, &cancel).await {
        return ReadinessResult::Cancelled;
    }

    // Phase 2: the first matching process must report a running state.
    let _ = event_tx.send(LaunchEvent::PhaseStarted {
        phase: LaunchPhase::Stability,
    });
    let budget = attempt_budget(cfg.stability_timeout, cfg.stability_poll);
    tracing::info!(identifier, budget, "waiting for process to stabilize");
    for attempt in 1..=budget {
        if cancel.load(Ordering::Relaxed) {
            return ReadinessResult::Cancelled;
        }
        let outcome = poll_once(probe, identifier, name_match);
        tracing::debug!(attempt, ?outcome, "stability poll");
        let running = matches!(
            outcome,
            PollOutcome::Found {
                state: RunState::Running,
                ..
            }
        );
        let _ = event_tx.send(LaunchEvent::Poll {
            phase: LaunchPhase::Stability,
            attempt,
            budget,
            outcome,
        });
        if running {
            tracing::info!(identifier, attempt, "process is ready");
            return ReadinessResult::Ready;
        }
        if attempt < budget && !pause(cfg.stability_poll, &cancel).await {
            return ReadinessResult::Cancelled;
        }
    }

    tracing::warn!(identifier, budget, "process did not stabilize");
    ReadinessResult::TimedOut
}

/// One probe of the process table. Errors are reported as an outcome, never propagated.
fn poll_once(probe: &dyn ProcessProbe, identifier: &str, name_match: NameMatch) -> PollOutcome {
    match probe.enumerate() {
        Ok(procs) => match first_match(&procs, identifier, name_match) {
            Some(p) => PollOutcome::Found {
                pid: p.pid,
                state: p.state.clone(),
            },
            None => PollOutcome::NotFound,
        },
        Err(e) => {
            tracing::debug!(error = %e, "ignoring process enumeration failure");
            PollOutcome::ProbeFailed(e.to_string())
        }
    }
}

fn first_match<'a>(
    procs: &'a [ProcessSnapshot],
    identifier: &str,
    name_match: NameMatch,
) -> Option<&'a ProcessSnapshot> {
    procs
        .iter()
        .find(|p| name_match.matches(&p.name, identifier))
}

/// Sleep for `d` unless cancelled first. Returns false on cancel.
async fn pause(d: Duration, cancel: &AtomicBool) -> bool {
    let deadline = Instant::now() + d;
    loop {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        tokio::time::sleep((deadline - now).min(CANCEL_CHECK)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::probe::testing::{failure, nothing, premiere, proc, ScriptedProbe};
    use crate::engine::{EngineControl, ReadinessSequencer};
    use crate::model::DEFAULT_APP_IDENTIFIER;

    fn cfg() -> ReadinessConfig {
        ReadinessConfig::default()
    }

    async fn wait(probe: &ScriptedProbe, name_match: NameMatch) -> ReadinessResult {
        let (event_tx, _) = mpsc::unbounded_channel();
        await_ready(SequenceParams {
            probe,
            identifier: DEFAULT_APP_IDENTIFIER,
            name_match,
            cfg: &cfg(),
            event_tx: &event_tx,
            cancel: Arc::new(AtomicBool::new(false)),
        })
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn running_on_first_stability_check_is_ready() {
        let probe = ScriptedProbe::new(vec![premiere(RunState::Running)]);
        let start = Instant::now();

        let result = wait(&probe, NameMatch::CaseSensitive).await;

        assert_eq!(result, ReadinessResult::Ready);
        // one appearance poll, one stability poll
        assert_eq!(probe.calls(), 2);
        let c = cfg();
        assert!(start.elapsed() < c.initial_delay + c.settle_delay + c.stability_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn never_appearing_times_out_after_exact_appearance_budget() {
        let probe = ScriptedProbe::new(vec![nothing()]);
        let start = Instant::now();

        let result = wait(&probe, NameMatch::CaseSensitive).await;

        assert_eq!(result, ReadinessResult::TimedOut);
        let c = cfg();
        let budget = attempt_budget(c.appearance_timeout, c.appearance_poll);
        assert_eq!(probe.calls(), budget);
        // no settle delay, no stability polling
        let expected = c.initial_delay + c.appearance_poll * (budget - 1);
        let elapsed = start.elapsed();
        assert!(elapsed >= expected);
        assert!(elapsed < expected + Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_separates_the_two_phases() {
        let probe = ScriptedProbe::new(vec![nothing(), nothing(), premiere(RunState::Running)]);
        let start = Instant::now();

        assert_eq!(
            wait(&probe, NameMatch::CaseSensitive).await,
            ReadinessResult::Ready
        );

        let c = cfg();
        let at = probe.called_at();
        assert_eq!(at.len(), 4);
        let slack = Duration::from_millis(10);
        let first = at[0] - start;
        assert!(first >= c.initial_delay && first < c.initial_delay + slack);
        for gap in [at[1] - at[0], at[2] - at[1]] {
            assert!(gap >= c.appearance_poll && gap < c.appearance_poll + slack);
        }
        let settle = at[3] - at[2];
        assert!(settle >= c.settle_delay && settle < c.settle_delay + slack);
        assert!(at[3] - start >= c.initial_delay + c.appearance_poll * 2 + c.settle_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn never_running_times_out_after_stability_budget() {
        let probe = ScriptedProbe::new(vec![premiere(RunState::Sleeping)]);

        let result = wait(&probe, NameMatch::CaseSensitive).await;

        assert_eq!(result, ReadinessResult::TimedOut);
        let c = cfg();
        assert_eq!(
            probe.calls(),
            1 + attempt_budget(c.stability_timeout, c.stability_poll)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_enumeration_error_is_tolerated() {
        let probe = ScriptedProbe::new(vec![
            premiere(RunState::Running),
            failure(),
            premiere(RunState::Idle),
            premiere(RunState::Running),
        ]);

        let result = wait(&probe, NameMatch::CaseSensitive).await;

        assert_eq!(result, ReadinessResult::Ready);
        assert_eq!(probe.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_during_appearance_count_as_not_found() {
        let probe = ScriptedProbe::new(vec![failure(), failure(), premiere(RunState::Running)]);

        assert_eq!(
            wait(&probe, NameMatch::CaseSensitive).await,
            ReadinessResult::Ready
        );
        assert_eq!(probe.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn process_exiting_after_appearance_times_out() {
        let probe = ScriptedProbe::new(vec![premiere(RunState::Running), nothing()]);

        let result = wait(&probe, NameMatch::CaseSensitive).await;

        assert_eq!(result, ReadinessResult::TimedOut);
        let c = cfg();
        assert_eq!(
            probe.calls(),
            1 + attempt_budget(c.stability_timeout, c.stability_poll)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_first_match_is_considered() {
        let probe = ScriptedProbe::new(vec![Ok(vec![
            proc(10, "Adobe Premiere Pro Helper", RunState::Sleeping),
            proc(20, "Adobe Premiere Pro.exe", RunState::Running),
        ])]);

        assert_eq!(
            wait(&probe, NameMatch::CaseSensitive).await,
            ReadinessResult::TimedOut
        );
    }

    #[tokio::test(start_paused = true)]
    async fn same_timeline_gives_same_result() {
        let timeline = || {
            vec![
                nothing(),
                premiere(RunState::Running),
                failure(),
                premiere(RunState::Running),
            ]
        };
        let a = ScriptedProbe::new(timeline());
        let b = ScriptedProbe::new(timeline());

        let ra = wait(&a, NameMatch::CaseSensitive).await;
        let rb = wait(&b, NameMatch::CaseSensitive).await;

        assert_eq!(ra, rb);
        assert_eq!(ra, ReadinessResult::Ready);
        assert_eq!(a.calls(), b.calls());
    }

    #[tokio::test(start_paused = true)]
    async fn case_sensitivity_is_explicit() {
        let lower = || vec![Ok(vec![proc(7, "adobe premiere pro.exe", RunState::Running)])];

        let strict = ScriptedProbe::new(lower());
        assert_eq!(
            wait(&strict, NameMatch::CaseSensitive).await,
            ReadinessResult::TimedOut
        );

        let relaxed = ScriptedProbe::new(lower());
        assert_eq!(
            wait(&relaxed, NameMatch::CaseInsensitive).await,
            ReadinessResult::Ready
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sequencer_emits_phases_and_honours_cancel() {
        let probe = Arc::new(ScriptedProbe::new(vec![nothing()]));
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();
        let seq = ReadinessSequencer::new(
            cfg(),
            DEFAULT_APP_IDENTIFIER,
            NameMatch::CaseSensitive,
            probe.clone(),
        );
        let handle = tokio::spawn(seq.run(event_tx, ctrl_rx));

        // Wait until the appearance phase is polling, then cancel.
        loop {
            match event_rx.recv().await {
                Some(LaunchEvent::Poll { attempt: 3, .. }) => break,
                Some(_) => {}
                None => panic!("sequencer finished before cancel"),
            }
        }
        ctrl_tx.send(EngineControl::Cancel).unwrap();

        assert_eq!(handle.await.unwrap(), ReadinessResult::Cancelled);
        assert!(probe.calls() < 60);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_control_sender_does_not_cancel() {
        let probe = Arc::new(ScriptedProbe::new(vec![premiere(RunState::Running)]));
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let (_, ctrl_rx) = mpsc::unbounded_channel();
        let seq = ReadinessSequencer::new(
            cfg(),
            DEFAULT_APP_IDENTIFIER,
            NameMatch::CaseSensitive,
            probe,
        );

        assert_eq!(seq.run(event_tx, ctrl_rx).await, ReadinessResult::Ready);
    }
}

use crate::error::ProbeError;
use crate::model::{ProcessSnapshot, RunState};
use std::sync::Mutex;
use sysinfo::{ProcessStatus, ProcessesToUpdate, System};

/// Read-only view of the OS process table.
pub trait ProcessProbe: Send + Sync {
    fn enumerate(&self) -> Result<Vec<ProcessSnapshot>, ProbeError>;
}

/// Probe backed by `sysinfo`. Keeps one `System` around so refreshes reuse its buffers.
pub struct SysinfoProbe {
    system: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SysinfoProbe {
    fn enumerate(&self) -> Result<Vec<ProcessSnapshot>, ProbeError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ProbeError(
                "process listing is not supported on this platform".into(),
            ));
        }
        let mut sys = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sys.refresh_processes(ProcessesToUpdate::All, true);

        let mut out: Vec<ProcessSnapshot> = sys
            .processes()
            .values()
            .map(|p| ProcessSnapshot {
                pid: p.pid().as_u32(),
                name: p.name().to_string_lossy().into_owned(),
                state: run_state(p.status()),
            })
            .collect();
        // HashMap order is arbitrary; "first match" must be stable across polls.
        out.sort_by_key(|p| p.pid);
        Ok(out)
    }
}

fn run_state(status: ProcessStatus) -> RunState {
    match status {
        ProcessStatus::Run => RunState::Running,
        ProcessStatus::Sleep => RunState::Sleeping,
        ProcessStatus::Idle => RunState::Idle,
        ProcessStatus::Stop => RunState::Stopped,
        ProcessStatus::Zombie => RunState::Zombie,
        other => RunState::Unknown(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    pub(crate) type Step = Result<Vec<ProcessSnapshot>, ProbeError>;

    /// Replays a fixed process timeline, one step per `enumerate` call.
    /// The final step repeats forever once the script runs out.
    pub(crate) struct ScriptedProbe {
        steps: Mutex<VecDeque<Step>>,
        last: Mutex<Step>,
        calls: AtomicU32,
        called_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedProbe {
        pub(crate) fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                last: Mutex::new(Ok(Vec::new())),
                calls: AtomicU32::new(0),
                called_at: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        /// Clock reading at each `enumerate` call, in call order.
        pub(crate) fn called_at(&self) -> Vec<Instant> {
            self.called_at.lock().unwrap().clone()
        }
    }

    impl ProcessProbe for ScriptedProbe {
        fn enumerate(&self) -> Result<Vec<ProcessSnapshot>, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.called_at.lock().unwrap().push(Instant::now());
            let mut steps = self.steps.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(step) = steps.pop_front() {
                *last = step.clone();
                step
            } else {
                last.clone()
            }
        }
    }

    pub(crate) fn proc(pid: u32, name: &str, state: RunState) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            name: name.to_string(),
            state,
        }
    }

    pub(crate) fn premiere(state: RunState) -> Step {
        Ok(vec![
            proc(4, "explorer.exe", RunState::Running),
            proc(1200, "Adobe Premiere Pro.exe", state),
        ])
    }

    pub(crate) fn nothing() -> Step {
        Ok(vec![proc(4, "explorer.exe", RunState::Running)])
    }

    pub(crate) fn failure() -> Step {
        Err(ProbeError("access denied".into()))
    }
}

//! Process control for the editor: start it, then hand it a document.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

pub trait Launcher: Send + Sync {
    /// Start `executable` without waiting for it.
    fn spawn(&self, executable: &Path) -> io::Result<()>;

    /// Open `document` with whatever the OS associates with it.
    fn open_document(&self, document: &Path) -> io::Result<()>;
}

pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn spawn(&self, executable: &Path) -> io::Result<()> {
        let child = Command::new(executable)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        tracing::info!(pid = child.id(), path = %executable.display(), "spawned editor");
        // The editor outlives us; the Child handle is dropped without waiting.
        Ok(())
    }

    fn open_document(&self, document: &Path) -> io::Result<()> {
        let mut cmd = open_command(document);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        tracing::info!(path = %document.display(), "handed document to the OS");
        Ok(())
    }
}

#[cfg(windows)]
fn open_command(document: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    // Empty title argument so a quoted path isn't taken as the window title.
    cmd.args(["/C", "start", ""]).arg(document);
    cmd
}

#[cfg(target_os = "macos")]
fn open_command(document: &Path) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(document);
    cmd
}

#[cfg(not(any(windows, target_os = "macos")))]
fn open_command(document: &Path) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(document);
    cmd
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Spawn(PathBuf),
        Open(PathBuf),
    }

    /// Records calls instead of touching the OS.
    #[derive(Default)]
    pub(crate) struct RecordingLauncher {
        pub calls: Mutex<Vec<Call>>,
        pub fail_spawn: bool,
        pub fail_open: bool,
    }

    impl RecordingLauncher {
        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Launcher for RecordingLauncher {
        fn spawn(&self, executable: &Path) -> io::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Spawn(executable.to_path_buf()));
            if self.fail_spawn {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such executable"));
            }
            Ok(())
        }

        fn open_document(&self, document: &Path) -> io::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Open(document.to_path_buf()));
            if self.fail_open {
                return Err(io::Error::new(io::ErrorKind::Other, "no handler"));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawning_a_missing_executable_fails() {
        let err = SystemLauncher
            .spawn(Path::new("/definitely/not/here/Adobe Premiere Pro.exe"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn open_command_passes_document_as_last_argument() {
        let doc = Path::new("/tmp/My Project.prproj");
        let cmd = open_command(doc);
        let last = cmd.get_args().last().unwrap();
        assert_eq!(last, doc.as_os_str());
    }
}

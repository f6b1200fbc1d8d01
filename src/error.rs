use std::path::PathBuf;
use thiserror::Error;

/// Failure to read the process table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("process enumeration failed: {0}")]
pub struct ProbeError(pub String);

/// Errors a create-and-launch session can surface.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Please enter a project name.")]
    UserInputMissing,

    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Premiere did not stabilize in time. Please open the project manually.")]
    ReadinessTimedOut,

    #[error("filesystem error at {}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    ProcessEnumeration(#[from] ProbeError),

    #[error("failed to start {}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    /// Errors that leave the form as it was so the user can fix the input and retry.
    pub fn is_retryable_input(&self) -> bool {
        matches!(
            self,
            LaunchError::UserInputMissing | LaunchError::TemplateNotFound(_)
        )
    }
}

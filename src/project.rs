//! Template lookup and project file creation.

use crate::error::LaunchError;
use crate::model::{LaunchRequest, ProjectParams};
use std::path::{Path, PathBuf};

pub const PROJECT_EXTENSION: &str = "prproj";

/// `<dir>/<resolution>_<fps>.prproj`
pub fn template_path(templates_dir: &Path, resolution: &str, fps: u32) -> PathBuf {
    templates_dir.join(format!("{resolution}_{fps}.{PROJECT_EXTENSION}"))
}

pub fn destination_path(project_folder: &Path, name: &str) -> PathBuf {
    project_folder.join(format!("{}.{PROJECT_EXTENSION}", name.trim()))
}

/// Validate input, copy the template into the project folder and build the launch request.
///
/// Nothing touches the filesystem unless the name is non-empty and the template exists.
pub fn prepare_project(
    params: &ProjectParams,
    templates_dir: &Path,
    project_folder: &Path,
    executable: &Path,
) -> Result<(PathBuf, LaunchRequest), LaunchError> {
    if params.name.trim().is_empty() {
        return Err(LaunchError::UserInputMissing);
    }

    let template = template_path(templates_dir, &params.resolution, params.fps);
    if !template.is_file() {
        return Err(LaunchError::TemplateNotFound(template));
    }

    let dest = destination_path(project_folder, &params.name);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|source| LaunchError::Filesystem {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::copy(&template, &dest).map_err(|source| LaunchError::Filesystem {
        path: dest.clone(),
        source,
    })?;
    tracing::info!(template = %template.display(), dest = %dest.display(), "project file created");

    Ok((
        template,
        LaunchRequest {
            executable_path: executable.to_path_buf(),
            target_document_path: dest,
        },
    ))
}

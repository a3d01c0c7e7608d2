use anyhow::{Context, Result};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{codec::NumberFormat, persist, project::Project};

#[derive(Serialize, Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(skip_serializing, skip_deserializing)]
    pub modified: bool,
    pub project_dir: Option<PathBuf>,
    #[serde(default)]
    pub number_format: NumberFormat,
}

pub struct EditorState {
    pub global_config_path: PathBuf,
    pub global_config: GlobalConfig,

    // Project data:
    pub project: Project,
}

pub fn get_global_config_path() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("", "", "MsxTileEditor")
        .context("Unable to open global config directory.")?;
    let config_dir = project_dirs.config_dir();
    let config_path = config_dir.join("config.json");
    Ok(config_path)
}

/// Loads the global config (if one was saved) and then the project it points
/// at. `project_dir` replaces the configured directory when given.
pub fn get_initial_state(project_dir: Option<PathBuf>) -> Result<EditorState> {
    let mut editor_state = EditorState {
        global_config_path: get_global_config_path()?,
        global_config: GlobalConfig::default(),
        project: Project::default(),
    };
    if editor_state.global_config_path.exists() {
        persist::load_global_config(&mut editor_state)?;
    }
    if let Some(dir) = project_dir {
        editor_state.global_config.project_dir = Some(dir);
        editor_state.global_config.modified = true;
    }
    persist::load_project(&mut editor_state)?;
    Ok(editor_state)
}

//! Project files: a flow, its tile library and generator settings in one
//! document, stored as JSON or TOML.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::flow::DungeonFlow;
use crate::generator::Generator;
use crate::library::TileLibrary;
use crate::settings::GeneratorSettings;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub flow: DungeonFlow,
    pub library: TileLibrary,
    #[serde(default)]
    pub settings: GeneratorSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectLoadError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid JSON project: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML project: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to encode TOML project: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("unsupported project format for {0} (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectFormat {
    Json,
    Toml,
}

impl ProjectFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

impl Project {
    pub fn parse(text: &str, format: ProjectFormat) -> Result<Self, ProjectLoadError> {
        Ok(match format {
            ProjectFormat::Json => serde_json::from_str(text)?,
            ProjectFormat::Toml => toml::from_str(text)?,
        })
    }

    pub fn to_text(&self, format: ProjectFormat) -> Result<String, ProjectLoadError> {
        Ok(match format {
            ProjectFormat::Json => serde_json::to_string_pretty(self)?,
            ProjectFormat::Toml => toml::to_string_pretty(self)?,
        })
    }

    /// A generator for this project. The caller may still adjust settings.
    pub fn generator(&self) -> Result<Generator, GenerationError> {
        Generator::new(&self.flow, &self.library, self.settings.clone())
    }
}

pub fn load_project_from_file(path: &Path) -> Result<Project, ProjectLoadError> {
    let format = ProjectFormat::from_path(path)
        .ok_or_else(|| ProjectLoadError::UnsupportedFormat(path.to_path_buf()))?;
    let text = fs::read_to_string(path)
        .map_err(|source| ProjectLoadError::Io { path: path.to_path_buf(), source })?;
    let project = Project::parse(&text, format)?;
    log::debug!(
        "loaded project {} ({} prefabs, {} tile sets)",
        path.display(),
        project.library.prefabs.len(),
        project.flow.tile_sets.len()
    );
    Ok(project)
}

pub fn save_project_to_file(project: &Project, path: &Path) -> Result<(), ProjectLoadError> {
    let format = ProjectFormat::from_path(path)
        .ok_or_else(|| ProjectLoadError::UnsupportedFormat(path.to_path_buf()))?;
    let text = project.to_text(format)?;
    fs::write(path, text)
        .map_err(|source| ProjectLoadError::Io { path: path.to_path_buf(), source })
}

//! Installation layout resolution.
//!
//! All external collaborators (the OpenFL venv Python, the federation weight
//! files, the label-fusion script, and the DeepMedic binary) live at fixed
//! locations relative to the FeTS installation root. The root itself is
//! resolved in priority order:
//! 1. Explicit path (command-line argument)
//! 2. `FETS_INSTALL_DIR` environment variable
//! 3. Directory containing the running executable
//!
//! Individual tool paths can be overridden by a `fets_layout.toml` file in the
//! root, for installations that relocate pieces.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// Environment variable naming the installation root.
pub const INSTALL_DIR_ENV: &str = "FETS_INSTALL_DIR";

/// Optional per-installation overrides file.
const LAYOUT_FILE: &str = "fets_layout.toml";

#[derive(Debug, Default, Deserialize)]
struct LayoutOverrides {
    python: Option<PathBuf>,
    weights_dir: Option<PathBuf>,
    label_fusion_script: Option<PathBuf>,
    deepmedic_exe: Option<PathBuf>,
    deepmedic_model_dir: Option<PathBuf>,
}

/// Resolved locations of every external tool the orchestrator shells out to.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    root: PathBuf,
    python: PathBuf,
    openfl_bin: PathBuf,
    weights_dir: PathBuf,
    label_fusion_script: PathBuf,
    deepmedic_exe: PathBuf,
    deepmedic_model_dir: PathBuf,
}

impl InstallLayout {
    /// Resolve the installation root and derive tool paths from it.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(path) = std::env::var(INSTALL_DIR_ENV) {
            PathBuf::from(path)
        } else {
            std::env::current_exe()?
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| {
                    Error::Config("cannot determine the installation directory".to_string())
                })?
        };
        Self::from_root(root)
    }

    /// Build the layout from a known installation root.
    pub fn from_root(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let overrides = load_overrides(&root)?;

        let openfl = root.join("OpenFederatedLearning");
        let layout = Self {
            python: overrides
                .python
                .unwrap_or_else(|| openfl.join("venv/bin/python")),
            openfl_bin: openfl.join("bin"),
            weights_dir: overrides
                .weights_dir
                .unwrap_or_else(|| openfl.join("bin/federations/weights")),
            label_fusion_script: overrides
                .label_fusion_script
                .unwrap_or_else(|| root.join("LabelFusion/label_fusion")),
            deepmedic_exe: overrides
                .deepmedic_exe
                .unwrap_or_else(|| root.join("DeepMedic/DeepMedic")),
            deepmedic_model_dir: overrides.deepmedic_model_dir.unwrap_or_else(|| {
                root.join("data/fets/deepMedic/saved_models/brainTumorSegmentation")
            }),
            root,
        };

        debug!(root = %layout.root.display(), "Resolved installation layout");
        Ok(layout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The OpenFL virtual-environment interpreter.
    pub fn python(&self) -> &Path {
        &self.python
    }

    /// Directory holding `{plan}_best` / `{plan}_init` weight files.
    pub fn weights_dir(&self) -> &Path {
        &self.weights_dir
    }

    pub fn label_fusion_script(&self) -> &Path {
        &self.label_fusion_script
    }

    pub fn deepmedic_exe(&self) -> &Path {
        &self.deepmedic_exe
    }

    /// Saved-model directory passed to the DeepMedic binary via `-md`.
    pub fn deepmedic_model_dir(&self) -> &Path {
        &self.deepmedic_model_dir
    }

    /// Per-subject inference entry point.
    pub fn inference_script(&self) -> PathBuf {
        self.openfl_bin.join("run_inference_from_flplan.py")
    }

    /// Collaborator entry point for the final federated task.
    pub fn collaborator_script(&self) -> PathBuf {
        self.openfl_bin.join("run_collaborator_from_flplan.py")
    }

    /// Whether the venv interpreter was found. Architecture dispatch through
    /// the generic Python path is skipped entirely when it is absent.
    pub fn python_available(&self) -> bool {
        self.python.is_file()
    }

    /// Label fusion requires both the venv and the fusion script.
    pub fn fusion_available(&self) -> bool {
        self.python_available() && self.label_fusion_script.is_file()
    }
}

fn load_overrides(root: &Path) -> Result<LayoutOverrides> {
    let path = root.join(LAYOUT_FILE);
    if !path.is_file() {
        return Ok(LayoutOverrides::default());
    }
    let text = std::fs::read_to_string(&path)?;
    toml::from_str(&text)
        .map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))
}

//! Core domain types for the orchestrator.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use fets_common::{Error, Result};

/// The four MRI modalities every subject must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    T1,
    T1Gd,
    T2,
    Flair,
}

impl Modality {
    pub const ALL: [Modality; 4] = [Modality::T1, Modality::T1Gd, Modality::T2, Modality::Flair];

    /// Fixed per-subject filename convention.
    pub fn file_name(self) -> &'static str {
        match self {
            Modality::T1 => "brain_t1.nii.gz",
            Modality::T1Gd => "brain_t1gd.nii.gz",
            Modality::T2 => "brain_t2.nii.gz",
            Modality::Flair => "brain_flair.nii.gz",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modality::T1 => "t1",
            Modality::T1Gd => "t1gd",
            Modality::T2 => "t2",
            Modality::Flair => "flair",
        };
        f.write_str(name)
    }
}

/// Resolved modality paths for one complete subject.
#[derive(Debug, Clone)]
pub struct ModalitySet {
    pub t1: PathBuf,
    pub t1gd: PathBuf,
    pub t2: PathBuf,
    pub flair: PathBuf,
}

impl ModalitySet {
    /// Comma-joined in the order the segmentation binary expects:
    /// t1, t1gd, t2, flair.
    pub fn joined_for_segmentation(&self) -> String {
        format!(
            "{},{},{},{}",
            self.t1.display(),
            self.t1gd.display(),
            self.t2.display(),
            self.flair.display()
        )
    }
}

/// A subject with all modalities resolved, ready for dispatch.
#[derive(Debug, Clone)]
pub struct SubjectCase {
    /// Directory name under the data root; doubles as the patient identifier
    /// handed to the inference script.
    pub id: String,
    pub dir: PathBuf,
    pub modalities: ModalitySet,
}

/// Supported segmentation architectures.
///
/// Each variant carries its own dispatch policy (binary vs. Python plan vs.
/// declared placeholder), so adding an architecture means adding a variant
/// here rather than editing the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    DeepMedic,
    ThreeDResUnet,
    ThreeDUnet,
    NnUnet,
}

impl Architecture {
    /// Parse a lowercase architecture token. Unknown names yield `None` and
    /// are dropped from the request list without complaint.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "deepmedic" => Some(Self::DeepMedic),
            "3dresunet" => Some(Self::ThreeDResUnet),
            "3dunet" => Some(Self::ThreeDUnet),
            "nnunet" => Some(Self::NnUnet),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DeepMedic => "deepmedic",
            Self::ThreeDResUnet => "3dresunet",
            Self::ThreeDUnet => "3dunet",
            Self::NnUnet => "nnunet",
        }
    }

    /// OpenFL plan driving the generic inference script, when one exists.
    /// Placeholder architectures have no plan yet and dispatch as no-ops.
    pub fn plan(self) -> Option<&'static str> {
        match self {
            Self::ThreeDResUnet => Some("pt_3dresunet_brainmagebrats"),
            Self::DeepMedic | Self::ThreeDUnet | Self::NnUnet => None,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Label-fusion strategy, normalized to lowercase and passed through to the
/// fusion script, which owns validation of the method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionMethod(String);

impl FusionMethod {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Per-method output filename inside the subject directory.
    pub fn output_file_name(&self) -> String {
        format!("fused_{}_seg.nii.gz", self.0)
    }
}

impl fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute device forwarded to the Python entry points via `-md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    pub fn from_gpu_flag(gpu: bool) -> Self {
        if gpu {
            Self::Cuda
        } else {
            Self::Cpu
        }
    }

    pub fn flag(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
        }
    }
}

/// Whether this run trains a collaborator or performs inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Training { collaborator: String },
    Inference,
}

impl RunMode {
    /// Training requires a collaborator name; inference ignores it.
    pub fn from_flags(training: bool, collaborator: Option<String>) -> Result<Self> {
        if training {
            match collaborator {
                Some(name) => Ok(Self::Training { collaborator: name }),
                None => Err(Error::Config(
                    "collaborator name is required to begin training; please specify this using '--col-name'"
                        .to_string(),
                )),
            }
        } else {
            Ok(Self::Inference)
        }
    }

    pub fn is_training(&self) -> bool {
        matches!(self, Self::Training { .. })
    }
}

//! Shared helpers for integration tests: a recording process runner and
//! filesystem fixtures for the installation and data directories.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use fets_common::layout::InstallLayout;
use fets_common::process::{ExitOutcome, Invocation, ProcessRunner};
use fets_common::Result;

/// Records every invocation instead of spawning processes. Specific commands
/// can be made to fail by substring match on the rendered command line.
#[derive(Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    fail_matching: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any invocation whose rendered command line contains `needle` reports
    /// exit code 1.
    pub fn fail_when_contains(&self, needle: &str) {
        self.fail_matching.lock().unwrap().push(needle.to_string());
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Rendered command lines, in execution order.
    pub fn rendered(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ExitOutcome> {
        self.invocations.lock().unwrap().push(invocation.clone());
        let rendered = invocation.to_string();
        let fail = self
            .fail_matching
            .lock()
            .unwrap()
            .iter()
            .any(|needle| rendered.contains(needle));
        Ok(if fail {
            ExitOutcome::failed(1)
        } else {
            ExitOutcome::succeeded()
        })
    }
}

/// An installation root with a live venv python, weights directory, fusion
/// script and DeepMedic binary stub.
pub struct InstallFixture {
    // owns the temp directory for the duration of the test
    pub temp: TempDir,
    pub layout: InstallLayout,
}

pub fn install_fixture() -> InstallFixture {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    std::fs::create_dir_all(root.join("OpenFederatedLearning/venv/bin")).unwrap();
    std::fs::write(root.join("OpenFederatedLearning/venv/bin/python"), b"").unwrap();
    std::fs::create_dir_all(root.join("OpenFederatedLearning/bin/federations/weights")).unwrap();
    std::fs::create_dir_all(root.join("LabelFusion")).unwrap();
    std::fs::write(root.join("LabelFusion/label_fusion"), b"").unwrap();
    std::fs::create_dir_all(root.join("DeepMedic")).unwrap();
    std::fs::write(root.join("DeepMedic/DeepMedic"), b"").unwrap();

    let layout = InstallLayout::from_root(root).unwrap();
    InstallFixture { temp, layout }
}

/// An installation root without the venv python (and hence no fusion).
pub fn install_fixture_without_python() -> InstallFixture {
    let fixture = install_fixture();
    std::fs::remove_file(
        fixture
            .temp
            .path()
            .join("OpenFederatedLearning/venv/bin/python"),
    )
    .unwrap();
    fixture
}

pub fn write_weight(layout: &InstallLayout, file_name: &str) {
    std::fs::write(layout.weights_dir().join(file_name), b"weights").unwrap();
}

/// Create a subject directory holding the named modality files
/// (e.g. `["t1", "t1gd", "t2", "flair"]`). Returns the subject directory.
pub fn write_subject(data_dir: &Path, id: &str, modalities: &[&str]) -> PathBuf {
    let dir = data_dir.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    for modality in modalities {
        std::fs::write(dir.join(format!("brain_{modality}.nii.gz")), b"nifti").unwrap();
    }
    dir
}

pub const ALL_MODALITIES: [&str; 4] = ["t1", "t1gd", "t2", "flair"];

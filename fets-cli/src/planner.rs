//! Top-level run sequencing.
//!
//! Validates the request, then (in inference mode) walks every subject under
//! the data directory through modality resolution, architecture dispatch and
//! label fusion, strictly one subject / one architecture / one fusion method
//! at a time. Both modes finish with a single federated task invocation.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use fets_common::layout::InstallLayout;
use fets_common::process::{Invocation, ProcessRunner};
use fets_common::{Error, Result};

use crate::dispatch::ArchitectureDispatcher;
use crate::fusion::FusionPlanner;
use crate::modalities::ModalityResolver;
use crate::report::RunReport;
use crate::types::{Architecture, Device, FusionMethod, RunMode, SubjectCase};
use crate::weights;

/// Default OpenFL plan driving the final train/collaborator call.
const DEFAULT_PLAN: &str = "pt_3dresunet_brainmagebrats";
/// Skull-stripping plan variant, selected by model-name convention.
const SKULL_STRIP_PLAN: &str = "pt_3dresunet_ss_brainmagebrats";
/// Substring of the model name that selects the skull-stripping plan.
const SKULL_STRIP_MARKER: &str = "_3dresunet_ss";

/// Operator request for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Data directory with one subdirectory per subject.
    pub data_dir: PathBuf,
    /// Model weights file name; its naming convention selects the final plan.
    pub model_name: String,
    pub logging_dir: PathBuf,
    /// Raw comma-separated architecture list as supplied on the command line.
    pub archs: String,
    /// Raw comma-separated fusion method list.
    pub label_fusion: String,
    pub device: Device,
    pub mode: RunMode,
}

pub struct RunPlanner<'a> {
    layout: &'a InstallLayout,
    runner: &'a dyn ProcessRunner,
}

impl<'a> RunPlanner<'a> {
    pub fn new(layout: &'a InstallLayout, runner: &'a dyn ProcessRunner) -> Self {
        Self { layout, runner }
    }

    /// Execute a full run. Configuration problems fail here, before any
    /// subject directory is touched.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        let arch_tokens = split_list(&request.archs);
        let fusion_methods: Vec<FusionMethod> = split_list(&request.label_fusion)
            .iter()
            .map(|token| FusionMethod::new(token))
            .collect();

        // the token count is checked before parsing, so unknown names still
        // count against the training limit
        if request.mode.is_training() && arch_tokens.len() > 1 {
            return Err(Error::Config(
                "training cannot currently be performed on more than 1 architecture".to_string(),
            ));
        }

        // unknown architecture names drop out silently; order and duplicates
        // are preserved
        let architectures: Vec<Architecture> = arch_tokens
            .iter()
            .filter_map(|token| Architecture::parse(token))
            .collect();

        let mut report = RunReport::new();

        if !request.mode.is_training() {
            self.run_inference_loop(request, &architectures, &fusion_methods, &mut report)
                .await?;
        }

        self.run_final_task(request).await?;

        info!("Finished.");
        Ok(report)
    }

    async fn run_inference_loop(
        &self,
        request: &RunRequest,
        architectures: &[Architecture],
        fusion_methods: &[FusionMethod],
        report: &mut RunReport,
    ) -> Result<()> {
        let dispatcher = ArchitectureDispatcher::new(
            self.layout,
            self.runner,
            &request.data_dir,
            &request.logging_dir,
            request.device,
        );
        let fusion = FusionPlanner::new(self.layout, self.runner);

        for subject_dir in subject_directories(&request.data_dir)? {
            let id = subject_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            match ModalityResolver::resolve(&subject_dir) {
                Ok(modalities) => {
                    let subject = SubjectCase {
                        id,
                        dir: subject_dir,
                        modalities,
                    };
                    dispatcher.dispatch(&subject, architectures, report).await?;
                    fusion.fuse(&subject, fusion_methods, report).await?;
                }
                Err(missing) => {
                    debug!(subject = %id, "Subject incomplete, skipping");
                    report.record_missing_modalities(&id, missing);
                }
            }
        }
        Ok(())
    }

    /// Final model invocation shared by both modes: plan/weight selection,
    /// venv check, then one training or collaborator call. Nonzero exit is
    /// fatal.
    async fn run_final_task(&self, request: &RunRequest) -> Result<()> {
        let (plan, special_args) = self.select_final_plan(request)?;

        if !self.layout.python_available() {
            return Err(Error::Config(
                "the python virtual environment was not found, please refer to documentation to initialize it"
                    .to_string(),
            ));
        }

        let script = match &request.mode {
            RunMode::Training { .. } => self.layout.inference_script(),
            RunMode::Inference => self.layout.collaborator_script(),
        };

        let invocation = Invocation::new(self.layout.python())
            .arg(script.display().to_string())
            .arg("-p")
            .arg(format!("{plan}.yaml"))
            .arg("-d")
            .arg(request.data_dir.display().to_string())
            .arg("-ld")
            .arg(request.logging_dir.display().to_string())
            .arg("-md")
            .arg(request.device.flag())
            .args(special_args);

        info!(
            plan = plan,
            training = request.mode.is_training(),
            "Running final federated task"
        );
        let outcome = self.runner.run(&invocation).await?;
        if !outcome.success {
            return Err(Error::TaskFailed {
                task: "final federated task".to_string(),
                code: outcome.code,
            });
        }
        Ok(())
    }

    /// Plan and mode-specific arguments for the final task.
    ///
    /// The skull-stripped branch performs no existence check on its weight
    /// file and uses the `.pt` suffix with the `-nmwf` flag; the default
    /// branch resolves `.pbuf` weights with best→init fallback and fails hard
    /// when neither exists. Both behaviors match the shipped workflow.
    fn select_final_plan(&self, request: &RunRequest) -> Result<(&'static str, Vec<String>)> {
        let mut special = Vec::new();
        if let RunMode::Training { collaborator } = &request.mode {
            special.push("-col".to_string());
            special.push(collaborator.clone());
        }

        let plan = if request.model_name.contains(SKULL_STRIP_MARKER) {
            let weight_file = self
                .layout
                .weights_dir()
                .join(format!("{SKULL_STRIP_PLAN}_best.pt"));
            if !request.mode.is_training() {
                special.push("-nmwf".to_string());
                special.push(weight_file.display().to_string());
            }
            SKULL_STRIP_PLAN
        } else {
            let weight_file = weights::resolve_pbuf(self.layout.weights_dir(), DEFAULT_PLAN)
                .ok_or_else(|| Error::MissingWeights {
                    plan: DEFAULT_PLAN.to_string(),
                    weights_dir: self.layout.weights_dir().to_path_buf(),
                })?;
            if !request.mode.is_training() {
                special.push("-mwf".to_string());
                special.push(weight_file.display().to_string());
            }
            DEFAULT_PLAN
        };

        Ok((plan, special))
    }
}

/// Immediate subdirectories of the data directory, sorted by name for
/// deterministic iteration.
fn subject_directories(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        return Err(Error::Config(format!(
            "data directory not found: {}",
            data_dir.display()
        )));
    }

    let mut dirs: Vec<PathBuf> = WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.path().to_path_buf())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Lowercase and comma-split an operator-supplied list, dropping empty tokens.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

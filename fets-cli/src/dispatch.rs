//! Per-subject, per-architecture inference dispatch.
//!
//! Two dispatch paths exist. DeepMedic is the special-cased native binary; a
//! nonzero exit there is recorded in the run report and iteration continues.
//! Every other architecture goes through the OpenFL Python inference script,
//! where a nonzero exit aborts the whole run. The asymmetry is inherited from
//! the shipped workflow and is preserved deliberately.

use std::path::Path;

use tracing::{debug, error, info};

use fets_common::layout::InstallLayout;
use fets_common::process::{Invocation, ProcessRunner};
use fets_common::{Error, Result};

use crate::report::RunReport;
use crate::types::{Architecture, Device, SubjectCase};
use crate::weights;

/// Output filename produced by the DeepMedic binary in the subject directory.
pub const DEEPMEDIC_OUTPUT: &str = "deepmedic_seg.nii.gz";

pub struct ArchitectureDispatcher<'a> {
    layout: &'a InstallLayout,
    runner: &'a dyn ProcessRunner,
    data_dir: &'a Path,
    logging_dir: &'a Path,
    device: Device,
}

impl<'a> ArchitectureDispatcher<'a> {
    pub fn new(
        layout: &'a InstallLayout,
        runner: &'a dyn ProcessRunner,
        data_dir: &'a Path,
        logging_dir: &'a Path,
        device: Device,
    ) -> Self {
        Self {
            layout,
            runner,
            data_dir,
            logging_dir,
            device,
        }
    }

    /// Dispatch every requested architecture for one complete subject, in
    /// request order. The list is not deduplicated: a duplicated architecture
    /// dispatches twice.
    pub async fn dispatch(
        &self,
        subject: &SubjectCase,
        architectures: &[Architecture],
        report: &mut RunReport,
    ) -> Result<()> {
        for &architecture in architectures {
            match architecture {
                Architecture::DeepMedic => self.run_deepmedic(subject, report).await?,
                other => self.run_plan(subject, other, report).await?,
            }
        }
        Ok(())
    }

    /// DeepMedic branch: native binary, non-fatal on failure.
    async fn run_deepmedic(&self, subject: &SubjectCase, report: &mut RunReport) -> Result<()> {
        let output = subject.dir.join(DEEPMEDIC_OUTPUT);
        let invocation = Invocation::new(self.layout.deepmedic_exe())
            .arg("-md")
            .arg(self.layout.deepmedic_model_dir().display().to_string())
            .arg("-i")
            .arg(subject.modalities.joined_for_segmentation())
            .arg("-o")
            .arg(output.display().to_string());

        info!(subject = %subject.id, "Running DeepMedic segmentation");
        let outcome = self.runner.run(&invocation).await?;
        if !outcome.success {
            error!(subject = %subject.id, code = ?outcome.code, "DeepMedic segmentation failed");
            report.record_subject_error(
                &subject.id,
                format!("deepmedic segmentation exited with code {:?}", outcome.code),
            );
        }
        Ok(())
    }

    /// Generic Python-plan branch. Skipped silently when the venv is absent
    /// or the architecture is a declared placeholder without a plan. A
    /// missing weight file skips only this architecture; a nonzero exit from
    /// the inference script is fatal.
    async fn run_plan(
        &self,
        subject: &SubjectCase,
        architecture: Architecture,
        report: &mut RunReport,
    ) -> Result<()> {
        if !self.layout.python_available() {
            debug!(
                architecture = %architecture,
                "Python environment not found, skipping architecture"
            );
            return Ok(());
        }

        let Some(plan) = architecture.plan() else {
            debug!(
                architecture = %architecture,
                "Architecture has no inference plan yet, skipping"
            );
            return Ok(());
        };

        let Some(weight_file) = weights::resolve_pbuf(self.layout.weights_dir(), plan) else {
            error!(
                architecture = %architecture,
                "A compatible model weight file was not found. Please contact admin@fets.ai for help."
            );
            report.record_subject_error(
                &subject.id,
                format!("no weight file for architecture '{architecture}'"),
            );
            return Ok(());
        };

        let invocation = Invocation::new(self.layout.python())
            .arg(self.layout.inference_script().display().to_string())
            .arg("-mwf")
            .arg(weight_file.display().to_string())
            .arg("-p")
            .arg(format!("{plan}.yaml"))
            .arg("-d")
            .arg(self.data_dir.display().to_string())
            .arg("-inference_patient")
            .arg(subject.id.clone())
            .arg("-ld")
            .arg(self.logging_dir.display().to_string())
            .arg("-md")
            .arg(self.device.flag());

        info!(subject = %subject.id, architecture = %architecture, plan = plan, "Running inference plan");
        let outcome = self.runner.run(&invocation).await?;
        if !outcome.success {
            return Err(Error::TaskFailed {
                task: format!("{architecture} inference for subject '{}'", subject.id),
                code: outcome.code,
            });
        }
        Ok(())
    }
}

//! Label fusion across per-architecture segmentation outputs.
//!
//! Candidate inputs are the subject's `*_seg.nii.gz` files that are not
//! already marked `final`. An empty candidate set skips fusion for the
//! subject outright rather than handing the script a malformed input list.
//! Fusion failures are independent per method: one bad method never blocks
//! the next.

use std::path::Path;

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use fets_common::layout::InstallLayout;
use fets_common::process::{Invocation, ProcessRunner};
use fets_common::Result;

use crate::report::RunReport;
use crate::types::{FusionMethod, SubjectCase};

/// Marker identifying per-architecture segmentation outputs.
const SEG_MARKER: &str = "_seg.nii.gz";
/// Outputs already fused/finalized are never used as fusion inputs.
const FINAL_MARKER: &str = "final";
/// Segmentation label set shared by all current architectures.
const FUSION_CLASSES: &str = "0,1,2,4";

pub struct FusionPlanner<'a> {
    layout: &'a InstallLayout,
    runner: &'a dyn ProcessRunner,
}

impl<'a> FusionPlanner<'a> {
    pub fn new(layout: &'a InstallLayout, runner: &'a dyn ProcessRunner) -> Self {
        Self { layout, runner }
    }

    /// Fuse the subject's candidate outputs once per requested method.
    pub async fn fuse(
        &self,
        subject: &SubjectCase,
        methods: &[FusionMethod],
        report: &mut RunReport,
    ) -> Result<()> {
        if !self.layout.fusion_available() {
            debug!("Label fusion prerequisites not found, skipping fusion");
            return Ok(());
        }

        let candidates = candidate_inputs(&subject.dir);
        if candidates.is_empty() {
            warn!(subject = %subject.id, "No fusable segmentation outputs, skipping fusion");
            report.record_fusion_skipped(&subject.id);
            return Ok(());
        }
        let inputs = candidates.join(",");

        for method in methods {
            let output = subject.dir.join(method.output_file_name());
            let invocation = Invocation::new(self.layout.python())
                .arg(self.layout.label_fusion_script().display().to_string())
                .arg("-inputs")
                .arg(inputs.clone())
                .arg("-classes")
                .arg(FUSION_CLASSES)
                .arg("-method")
                .arg(method.as_str())
                .arg("-output")
                .arg(output.display().to_string());

            info!(subject = %subject.id, method = %method, "Running label fusion");
            let outcome = self.runner.run(&invocation).await?;
            if !outcome.success {
                error!(
                    subject = %subject.id,
                    method = %method,
                    code = ?outcome.code,
                    "Label fusion failed"
                );
                report.record_fusion_error(
                    &subject.id,
                    format!("fusion method '{method}' exited with code {:?}", outcome.code),
                );
            }
        }
        Ok(())
    }
}

/// Candidate fusion inputs for a subject directory, sorted by path so the
/// joined list is deterministic.
fn candidate_inputs(subject_dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(subject_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?;
            if name.contains(SEG_MARKER) && !name.contains(FINAL_MARKER) {
                Some(entry.path().display().to_string())
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn candidates_keep_seg_outputs_and_drop_final_ones() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("deepmedic_seg.nii.gz"), b"s").unwrap();
        std::fs::write(temp.path().join("3dresunet_seg.nii.gz"), b"s").unwrap();
        std::fs::write(temp.path().join("final_seg.nii.gz"), b"s").unwrap();
        std::fs::write(temp.path().join("brain_t1.nii.gz"), b"img").unwrap();

        let candidates = candidate_inputs(temp.path());
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].ends_with("3dresunet_seg.nii.gz"));
        assert!(candidates[1].ends_with("deepmedic_seg.nii.gz"));
    }

    #[test]
    fn previous_fusion_outputs_remain_candidates() {
        // fused_* outputs match the seg marker and lack the final marker, so a
        // re-run feeds them back in; this mirrors the shipped behavior
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("fused_staple_seg.nii.gz"), b"s").unwrap();

        let candidates = candidate_inputs(temp.path());
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn empty_directory_yields_no_candidates() {
        let temp = TempDir::new().unwrap();
        assert!(candidate_inputs(temp.path()).is_empty());
    }
}

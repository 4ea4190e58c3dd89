//! Per-subject modality resolution.
//!
//! A subject is processed only when all four modality files exist in its
//! directory. The check is existence-only (no file content is read) and never
//! short-circuits, so the missing list reported for an incomplete subject is
//! always complete.

use std::path::Path;

use crate::types::{Modality, ModalitySet};

pub struct ModalityResolver;

impl ModalityResolver {
    /// Check the four fixed filenames inside `subject_dir`.
    ///
    /// Returns the resolved paths for a complete subject, or the full list of
    /// missing modalities otherwise.
    pub fn resolve(subject_dir: &Path) -> std::result::Result<ModalitySet, Vec<Modality>> {
        let mut missing = Vec::new();

        let mut check = |modality: Modality| {
            let path = subject_dir.join(modality.file_name());
            if path.is_file() {
                Some(path)
            } else {
                missing.push(modality);
                None
            }
        };

        // every modality is checked even after the first miss
        let t1 = check(Modality::T1);
        let t1gd = check(Modality::T1Gd);
        let t2 = check(Modality::T2);
        let flair = check(Modality::Flair);

        match (t1, t1gd, t2, flair) {
            (Some(t1), Some(t1gd), Some(t2), Some(flair)) => Ok(ModalitySet {
                t1,
                t1gd,
                t2,
                flair,
            }),
            _ => Err(missing),
        }
    }
}

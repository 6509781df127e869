//! Sync report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::SpecSyncError;

/// Aggregate counters and diagnostics for one sync run.
///
/// In dry-run mode the counters describe what would have happened.
#[derive(Debug, Default, Clone)]
pub struct ReportSync {
    /// Total source entries seen by the traversal.
    pub cnt_scanned: u64,
    /// Number of copy jobs that completed successfully.
    pub cnt_copied: u64,
    /// Number of destination directories created.
    pub cnt_created_dirs: u64,
    /// Number of destination entries removed (each a whole subtree).
    pub cnt_deleted: u64,
    /// Number of entries skipped (excluded, special files, revisits).
    pub cnt_skipped: u64,
    /// Non-fatal warnings collected during traversal/copy.
    pub warnings: Vec<String>,
    /// Per-job copy failures.
    pub errors: Vec<SpecSyncError>,
}

impl ReportSync {
    /// Number of collected copy failures.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_created_dirs".to_string(), self.cnt_created_dirs);
        dict_counts.insert("cnt_deleted".to_string(), self.cnt_deleted);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} copied={} created_dirs={} deleted={} skipped={} errors={} warnings={}",
            self.cnt_scanned,
            self.cnt_copied,
            self.cnt_created_dirs,
            self.cnt_deleted,
            self.cnt_skipped,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[SYNC]"))
    }
}

/// Mutable accumulator for sync statistics.
///
/// The traversal and the error aggregator each own one; they are merged once
/// both have finished.
#[derive(Debug, Default, Clone)]
pub struct ReportSyncBuilder {
    /// See [`ReportSync::cnt_scanned`].
    pub cnt_scanned: u64,
    /// See [`ReportSync::cnt_copied`].
    pub cnt_copied: u64,
    /// See [`ReportSync::cnt_created_dirs`].
    pub cnt_created_dirs: u64,
    /// See [`ReportSync::cnt_deleted`].
    pub cnt_deleted: u64,
    /// See [`ReportSync::cnt_skipped`].
    pub cnt_skipped: u64,
    /// See [`ReportSync::errors`].
    pub errors: Vec<SpecSyncError>,
    /// See [`ReportSync::warnings`].
    pub warnings: Vec<String>,
}

impl ReportSyncBuilder {
    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    pub fn add_copied(&mut self) {
        self.cnt_copied += 1;
    }

    pub fn add_created_dir(&mut self) {
        self.cnt_created_dirs += 1;
    }

    pub fn add_deleted(&mut self) {
        self.cnt_deleted += 1;
    }

    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Add one path-scoped error.
    pub fn add_error(&mut self, path: std::path::PathBuf, exception: String) {
        self.errors.push(SpecSyncError { path, exception });
    }

    /// Fold another builder's counts and diagnostics into this one.
    pub fn merge(&mut self, other: ReportSyncBuilder) {
        self.cnt_scanned += other.cnt_scanned;
        self.cnt_copied += other.cnt_copied;
        self.cnt_created_dirs += other.cnt_created_dirs;
        self.cnt_deleted += other.cnt_deleted;
        self.cnt_skipped += other.cnt_skipped;
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportSync {
        ReportSync {
            cnt_scanned: self.cnt_scanned,
            cnt_copied: self.cnt_copied,
            cnt_created_dirs: self.cnt_created_dirs,
            cnt_deleted: self.cnt_deleted,
            cnt_skipped: self.cnt_skipped,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

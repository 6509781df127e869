use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{
    EnumSyncPatternMode, InputError, N_SIZE_JOB_QUEUE_DEFAULT, N_WORKERS_MAX_DEFAULT,
};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypeSyncPatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

/// Compiled exclude list; empty when no patterns were configured.
#[derive(Debug, Clone, Default)]
pub(crate) struct SpecSyncPatterns {
    pub(crate) patterns_exclude: Option<TypeSyncPatternSeq>,
}

impl SpecSyncPatterns {
    pub(crate) fn from_raw(
        patterns_exclude: Option<&[String]>,
        rule_pattern: EnumSyncPatternMode,
    ) -> Result<Self, InputError> {
        Ok(Self {
            patterns_exclude: _compile(patterns_exclude, rule_pattern)?,
        })
    }

    pub(crate) fn is_excluded(&self, name: &str) -> bool {
        _is_pattern_matching(name, self.patterns_exclude.as_ref())
    }
}

fn _compile(
    patterns: Option<&[String]>,
    rule_pattern: EnumSyncPatternMode,
) -> Result<Option<TypeSyncPatternSeq>, InputError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumSyncPatternMode::Literal => Ok(Some(TypeSyncPatternSeq::Literal(patterns.to_vec()))),
        EnumSyncPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| InputError::InvalidPattern(format!("{pattern}: {e}")))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypeSyncPatternSeq::Glob(l_glob)))
        }
        EnumSyncPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = Regex::new(pattern)
                    .map_err(|e| InputError::InvalidPattern(format!("{pattern}: {e}")))?;
                l_regex.push(regex);
            }
            Ok(Some(TypeSyncPatternSeq::Regex(l_regex)))
        }
    }
}

fn _is_pattern_matching(value: &str, patterns: Option<&TypeSyncPatternSeq>) -> bool {
    match patterns {
        None => false,
        Some(TypeSyncPatternSeq::Literal(v)) => v.iter().any(|p| value.contains(p.as_str())),
        Some(TypeSyncPatternSeq::Glob(v)) => v.iter().any(|p| p.is_match(value)),
        Some(TypeSyncPatternSeq::Regex(v)) => v.iter().any(|p| p.is_match(value)),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    // Destination may not exist yet: resolve its closest existing ancestor.
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name())
        && !parent.as_os_str().is_empty()
    {
        return _normalize_path(parent).join(name);
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// `true` when one directory contains the other (or both resolve to the same place).
pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Limits

/// Concurrency ceiling for the copy dispatcher; `0` falls back to the default.
pub(crate) fn calculate_worker_limit(num_workers_max: usize) -> usize {
    match num_workers_max {
        0 => N_WORKERS_MAX_DEFAULT,
        n => n,
    }
}

/// Job queue capacity; `0` falls back to the default so the queue never
/// degenerates into a rendezvous channel.
pub(crate) fn calculate_queue_size(size_job_queue: usize) -> usize {
    match size_job_queue {
        0 => N_SIZE_JOB_QUEUE_DEFAULT,
        n => n,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

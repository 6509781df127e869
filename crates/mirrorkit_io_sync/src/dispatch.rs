//! Bounded-concurrency copy dispatcher and copy-outcome aggregator.
//!
//! Threads involved in one run:
//! - the traversal (caller thread) pushes [`CopyJob`]s into a bounded queue,
//! - one supervisor drains the queue, takes a permit per job and spawns the
//!   copy into a rayon pool,
//! - one aggregator is the only receiver of copy outcomes.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use rayon::ThreadPoolBuilder;

use crate::copier::FileCopier;
use crate::report::ReportSyncBuilder;
use crate::spec::{EnumEntryKind, SpecSyncError};

/// One file or symlink to reproduce at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub path_src: PathBuf,
    pub path_dst: PathBuf,
    pub kind: EnumEntryKind,
}

#[derive(Debug)]
enum CopyOutcome {
    Copied,
    Failed(SpecSyncError),
}

/// Running dispatcher; dropped queue sender ends the run.
pub(crate) struct CopyDispatcher {
    tx_jobs: Sender<CopyJob>,
    handle_supervisor: JoinHandle<()>,
    handle_aggregator: JoinHandle<ReportSyncBuilder>,
}

impl CopyDispatcher {
    /// Spawn the aggregator and the supervisor.
    pub(crate) fn start(
        file_copier: Arc<dyn FileCopier>,
        n_workers_max: usize,
        n_size_job_queue: usize,
    ) -> io::Result<Self> {
        let (tx_jobs, rx_jobs) = bounded::<CopyJob>(n_size_job_queue);
        let (tx_outcomes, rx_outcomes) = unbounded::<CopyOutcome>();

        let handle_aggregator = thread::Builder::new()
            .name("mirrorkit-aggregator".to_string())
            .spawn(move || run_aggregator(rx_outcomes))?;
        let handle_supervisor = thread::Builder::new()
            .name("mirrorkit-dispatcher".to_string())
            .spawn(move || run_supervisor(rx_jobs, tx_outcomes, file_copier, n_workers_max))?;

        Ok(Self {
            tx_jobs,
            handle_supervisor,
            handle_aggregator,
        })
    }

    /// Queue one job, blocking while the queue is full.
    ///
    /// Fails only if the supervisor is gone.
    pub(crate) fn submit(&self, spec_job: CopyJob) -> io::Result<()> {
        self.tx_jobs
            .send(spec_job)
            .map_err(|_| io::Error::other("copy dispatcher stopped accepting jobs"))
    }

    /// Close the queue, wait for every in-flight copy, and return the tally.
    pub(crate) fn finish(self) -> ReportSyncBuilder {
        let Self {
            tx_jobs,
            handle_supervisor,
            handle_aggregator,
        } = self;
        drop(tx_jobs);

        let b_supervisor_ok = handle_supervisor.join().is_ok();
        let mut builder_report = handle_aggregator.join().unwrap_or_else(|_| {
            let mut builder_report = ReportSyncBuilder::default();
            builder_report.add_error(
                PathBuf::new(),
                "copy outcome aggregator panicked; results are incomplete".to_string(),
            );
            builder_report
        });
        if !b_supervisor_ok {
            builder_report.add_error(
                PathBuf::new(),
                "copy dispatcher panicked; some jobs may not have run".to_string(),
            );
        }
        builder_report
    }
}

fn run_aggregator(rx_outcomes: Receiver<CopyOutcome>) -> ReportSyncBuilder {
    let mut builder_report = ReportSyncBuilder::default();
    for outcome in rx_outcomes {
        match outcome {
            CopyOutcome::Copied => builder_report.add_copied(),
            CopyOutcome::Failed(spec_error) => {
                builder_report.add_error(spec_error.path, spec_error.exception)
            }
        }
    }
    builder_report
}

fn run_supervisor(
    rx_jobs: Receiver<CopyJob>,
    tx_outcomes: Sender<CopyOutcome>,
    file_copier: Arc<dyn FileCopier>,
    n_workers_max: usize,
) {
    let thread_pool = ThreadPoolBuilder::new()
        .num_threads(n_workers_max)
        .thread_name(|n_idx| format!("mirrorkit-copy-{n_idx}"))
        .build();
    let Ok(thread_pool) = thread_pool else {
        tracing::warn!(
            workers = n_workers_max,
            "failed to initialize copy thread pool; falling back to serial copy"
        );
        for spec_job in rx_jobs {
            run_copy_job(file_copier.as_ref(), spec_job, &tx_outcomes);
        }
        return;
    };

    // Permits: a slot is taken before spawning and freed when the copy ends.
    let (tx_permits, rx_permits) = bounded::<()>(n_workers_max);
    let file_copier = file_copier.as_ref();
    let rx_permits = &rx_permits;

    // The scope returns only after every spawned copy has finished.
    thread_pool.in_place_scope(|scope| {
        for spec_job in rx_jobs.iter() {
            if tx_permits.send(()).is_err() {
                break;
            }
            let tx_outcomes = tx_outcomes.clone();
            scope.spawn(move |_| {
                let _permit = PermitGuard(rx_permits);
                run_copy_job(file_copier, spec_job, &tx_outcomes);
            });
        }
    });
}

/// Frees one permit when the copy task ends, unwinding included.
struct PermitGuard<'a>(&'a Receiver<()>);

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.recv();
    }
}

fn run_copy_job(file_copier: &dyn FileCopier, spec_job: CopyJob, tx_outcomes: &Sender<CopyOutcome>) {
    let if_symlink = spec_job.kind == EnumEntryKind::Symlink;
    // A panicking copier is reported as a failed job so the run keeps going.
    let res_copy = panic::catch_unwind(AssertUnwindSafe(|| {
        file_copier.copy(&spec_job.path_src, &spec_job.path_dst, if_symlink)
    }))
    .unwrap_or_else(|payload| {
        Err(io::Error::other(format!(
            "copy panicked: {}",
            panic_message(&*payload)
        )))
    });
    let outcome = match res_copy {
        Ok(()) => {
            tracing::debug!(
                src = %spec_job.path_src.display(),
                dst = %spec_job.path_dst.display(),
                kind = %spec_job.kind,
                "copied"
            );
            CopyOutcome::Copied
        }
        Err(e) => {
            tracing::warn!(dst = %spec_job.path_dst.display(), error = %e, "copy failed");
            CopyOutcome::Failed(SpecSyncError {
                path: spec_job.path_dst,
                exception: e.to_string(),
            })
        }
    };
    // The aggregator outlives every sender.
    let _ = tx_outcomes.send(outcome);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(c_msg) = payload.downcast_ref::<&str>() {
        c_msg
    } else if let Some(c_msg) = payload.downcast_ref::<String>() {
        c_msg
    } else {
        "unknown panic payload"
    }
}

//! The fixed-slot worker pool.
//!
//! The parent enumerates projects, keeps one persistent `base_file_id` per
//! slot, and dispatches batches through a bounded return queue: a worker
//! reports `(slot, files_processed)` when its batch is done, the parent folds
//! the count into the slot's base and respawns the slot with the next batch.
//! Priming the queue with one zero-count report per slot makes every slot
//! initially available.
//!
//! File ids are disjoint across workers by construction: each slot owns the
//! range `slot * FILE_ID_MULTIPLIER + base_file_id + 0..n`, and the
//! multiplier exceeds any plausible per-worker file count.
pub mod worker;

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};
use log::{error, info};
use thiserror::Error;

use crate::language::LanguageProfile;
use crate::output::OutputLayout;
use crate::tokenize::Granularity;

/// Gap between the file-id ranges of neighbouring worker slots.
pub const FILE_ID_MULTIPLIER: u64 = 50_000_000;

/// One project from the batch list: a 1-based positional id and the path of
/// its archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: usize,
    pub archive_path: PathBuf,
}

/// Reads the project list: one archive path per line, line number (from 1)
/// becoming the project id. Blank lines still consume an id; their archive
/// open fails later and is logged like any other missing project.
pub fn read_project_list(path: &Path) -> io::Result<Vec<Project>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .enumerate()
        .map(|(index, line)| Project {
            id: index + 1,
            archive_path: PathBuf::from(line.trim_end_matches('\r')),
        })
        .collect())
}

/// Immutable per-run inputs shared by every worker.
pub struct RunContext {
    pub profile: LanguageProfile,
    pub layout: OutputLayout,
    pub granularity: Granularity,
    /// Decimal flag prepended to every emitted project id.
    pub proj_id_flag: u64,
    /// Starting `base_file_id` for every slot.
    pub init_file_id: u64,
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("the worker return queue closed unexpectedly")]
    QueueClosed,
    #[error("failed to spawn a worker thread: {0}")]
    Spawn(#[from] io::Error),
}

struct WorkerSlot {
    base_file_id: u64,
    handle: Option<JoinHandle<()>>,
}

/// Runs the pool to completion and returns the total number of files
/// processed across all workers.
pub fn run(
    context: RunContext,
    projects: Vec<Project>,
    n_processes: usize,
    projects_batch: usize,
) -> Result<u64, PoolError> {
    let slots_count = n_processes.max(1);
    let batch_size = projects_batch.max(1);
    let context = Arc::new(context);

    // The queue never holds more than one report per slot.
    let (report_tx, report_rx) = bounded::<worker::WorkerReport>(slots_count);
    for slot in 0..slots_count {
        report_tx
            .send(worker::WorkerReport {
                slot,
                files_processed: 0,
            })
            .expect("priming a fresh queue cannot fail");
    }

    let mut slots: Vec<WorkerSlot> = (0..slots_count)
        .map(|_| WorkerSlot {
            base_file_id: context.init_file_id,
            handle: None,
        })
        .collect();
    let mut pending: VecDeque<Project> = projects.into();
    let mut total_files: u64 = 0;

    while !pending.is_empty() {
        let report = next_report(&report_rx)?;
        retire(&mut slots[report.slot], &mut total_files, &report);

        let batch: Vec<Project> = pending
            .drain(..batch_size.min(pending.len()))
            .collect();
        info!(
            "Starting new process {} with {} project(s)",
            report.slot,
            batch.len()
        );
        let worker_context = Arc::clone(&context);
        let worker_tx = report_tx.clone();
        let base_file_id = slots[report.slot].base_file_id;
        let slot = report.slot;
        let handle = thread::Builder::new()
            .name(format!("tokenizer-{}", slot))
            .spawn(move || worker::process_batch(slot, batch, base_file_id, worker_context, worker_tx))?;
        slots[slot].handle = Some(handle);
    }

    info!("*** No more projects to process. Waiting for children to finish...");
    while slots.iter().any(|slot| slot.handle.is_some()) {
        let report = next_report(&report_rx)?;
        retire(&mut slots[report.slot], &mut total_files, &report);
    }

    Ok(total_files)
}

fn next_report(report_rx: &Receiver<worker::WorkerReport>) -> Result<worker::WorkerReport, PoolError> {
    report_rx.recv().map_err(|_| PoolError::QueueClosed)
}

/// Folds a finished (or primed) slot report back into the parent's state.
fn retire(slot: &mut WorkerSlot, total_files: &mut u64, report: &worker::WorkerReport) {
    slot.base_file_id += report.files_processed;
    *total_files += report.files_processed;
    if let Some(handle) = slot.handle.take() {
        if handle.join().is_err() {
            error!(
                "Worker {} panicked; its in-flight batch is lost",
                report.slot
            );
        } else if report.files_processed > 0 {
            info!(
                "Process {} finished, {} files processed. Current total: {}",
                report.slot, report.files_processed, *total_files
            );
        }
    }
}

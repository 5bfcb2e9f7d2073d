//! The worker side of the pool: one batch of projects, processed
//! sequentially against the slot's own output streams.
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use log::{error, info, warn};

use crate::archive;
use crate::extract::FunctionExtractor;
use crate::output::SidecarWriter;
use crate::tokenize::Granularity;

use super::{Project, RunContext, FILE_ID_MULTIPLIER};

/// End-of-batch report back to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub slot: usize,
    pub files_processed: u64,
}

/// Mutable per-invocation worker state: the id counter and the extractor the
/// slot owns for this batch.
pub struct WorkerState {
    slot: usize,
    base_file_id: u64,
    files_processed: u64,
    pub(crate) extractor: FunctionExtractor,
}

impl WorkerState {
    fn new(slot: usize, base_file_id: u64, context: &RunContext) -> Self {
        // File mode never touches the extractor; skip grammar setup there.
        let extractor = match context.granularity {
            Granularity::Block => FunctionExtractor::for_profile(&context.profile),
            Granularity::File => FunctionExtractor::Unsupported,
        };
        Self {
            slot,
            base_file_id,
            files_processed: 0,
            extractor,
        }
    }

    /// Allocates the next global file id:
    /// `slot * MULTIPLIER + base + counter`. Ids are consumed even for
    /// entries that are later skipped, so gaps are normal; only disjointness
    /// matters.
    pub(crate) fn next_file_id(&mut self) -> u64 {
        let file_id =
            self.slot as u64 * FILE_ID_MULTIPLIER + self.base_file_id + self.files_processed;
        self.files_processed += 1;
        file_id
    }
}

#[cfg(test)]
impl WorkerState {
    pub(crate) fn for_tests(slot: usize, base_file_id: u64) -> Self {
        Self {
            slot,
            base_file_id,
            files_processed: 0,
            extractor: FunctionExtractor::Unsupported,
        }
    }

    pub(crate) fn files_processed(&self) -> u64 {
        self.files_processed
    }
}

/// Entry point of a worker thread: processes `batch` and reports the number
/// of files it consumed ids for. The report is sent on every exit path short
/// of a panic; a panicking worker loses its batch, which the parent logs.
pub fn process_batch(
    slot: usize,
    batch: Vec<Project>,
    base_file_id: u64,
    context: Arc<RunContext>,
    report_tx: Sender<WorkerReport>,
) {
    info!("Process {} starting", slot);
    let started = Instant::now();

    let mut state = WorkerState::new(slot, base_file_id, &context);
    let mut writer = match SidecarWriter::open(&context.layout, slot) {
        Ok(writer) => writer,
        Err(err) => {
            error!(
                "Process {} could not open its output streams: {}",
                slot, err
            );
            let _ = report_tx.send(WorkerReport {
                slot,
                files_processed: 0,
            });
            return;
        }
    };

    for project in &batch {
        process_one_project(&context, &mut state, &mut writer, project);
    }
    writer.flush();

    info!(
        "Process {} finished. {} files in {} s",
        slot,
        state.files_processed,
        started.elapsed().as_secs()
    );
    let _ = report_tx.send(WorkerReport {
        slot,
        files_processed: state.files_processed,
    });
}

fn process_one_project(
    context: &RunContext,
    state: &mut WorkerState,
    writer: &mut SidecarWriter,
    project: &Project,
) {
    let display_proj_id = format!("{}{}", context.proj_id_flag, project.id);
    let archive_path = project.archive_path.display().to_string();
    info!(
        "Starting project <{},{}> (process {})",
        display_proj_id, archive_path, state.slot
    );

    if !project.archive_path.is_file() {
        warn!(
            "Unable to open project <{},{}> (process {})",
            display_proj_id, archive_path, state.slot
        );
        return;
    }

    let project_started = Instant::now();
    match archive::process_archive(
        &context.profile,
        context.granularity,
        state,
        writer,
        &display_proj_id,
        &project.archive_path,
    ) {
        Ok(timings) => {
            info!(
                "Project finished <{},{}> (process {}) in {:?}: zip {:?}, read {:?}, tokenize {:?}",
                display_proj_id,
                archive_path,
                state.slot,
                project_started.elapsed(),
                timings.zip,
                timings.read,
                timings.tokenize
            );
        }
        Err(err) => {
            // A malformed archive abandons the project; its bookkeeping
            // record below still marks the attempt.
            error!("Incorrect zip file {}: {}", archive_path, err);
        }
    }
    writer.project(&display_proj_id, &archive_path);
}

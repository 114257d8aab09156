use tracing::{debug, error};

use crate::shuffle::Group;
use crate::transport::{Report, ReturnPath};
use crate::{Job, MapReduceError};

/// Reduces every group of one partition, in key order, and reports the
/// output lines tagged with their group index.
///
/// A group the job rejects is dropped and counted; the rest of the
/// partition still runs.
pub(crate) fn run_reducer<J: Job>(
    job: &J,
    partition: usize,
    groups: Vec<Group<J::Record>>,
    return_path: &ReturnPath<'_>,
) -> Result<(), MapReduceError> {
    debug!(partition, groups = groups.len(), "reducer running");
    let mut lines = Vec::with_capacity(groups.len());
    let mut failed = 0;
    for Group {
        index,
        key,
        records,
    } in groups
    {
        match job.reduce(&key, records) {
            Ok(line) => lines.push((index, line)),
            Err(err) => {
                failed += 1;
                error!(partition, %key, %err, "reduce failed, dropping group");
            }
        }
    }
    debug!(partition, returned = lines.len(), failed, "reducer returning");

    let report = Report::Reduce {
        partition,
        failed,
        lines,
    };
    return_path.send(&report)
}

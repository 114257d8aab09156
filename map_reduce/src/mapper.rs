use tracing::{debug, warn};

use crate::transport::{Report, ReturnPath};
use crate::{Job, MapReduceError};

/// Maps one chunk of input lines and reports the emitted records, encoded
/// in their wire format, back to the collector.
///
/// A line the job cannot map is logged and counted, never fatal.
pub(crate) fn run_mapper<J: Job>(
    job: &J,
    mapper: usize,
    input: Vec<String>,
    return_path: &ReturnPath<'_>,
) -> Result<(), MapReduceError> {
    debug!(mapper, lines = input.len(), "mapper running");
    let mut records = Vec::new();
    let mut skipped = 0;
    for line in &input {
        match job.map(line) {
            Ok(mapped) => records.extend(mapped.iter().map(ToString::to_string)),
            Err(err) => {
                skipped += 1;
                warn!(mapper, line = line.as_str(), %err, "skipping malformed input line");
            }
        }
    }
    debug!(mapper, emitted = records.len(), skipped, "mapper finished");

    let report = Report::Map {
        mapper,
        read: input.len(),
        skipped,
        records,
    };
    return_path.send(&report)
}

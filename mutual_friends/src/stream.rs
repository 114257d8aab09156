//! Line-oriented stages for running the pipeline under an external
//! grouping layer, Hadoop streaming style: the mapper writes the canonical
//! observation lines and the reducer reads them back in any order.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use map_reduce::JobSummary;
use tracing::{error, warn};

use crate::aggregator::recommend;
use crate::expander::expand_line;
use crate::{Observation, UserId};

/// Reads adjacency lines and writes one `subject<TAB>other<TAB>kind` line per
/// observation. Malformed lines are skipped and counted.
pub fn map_stream<R: BufRead, W: Write>(input: R, mut output: W) -> io::Result<JobSummary> {
    let mut summary = JobSummary::default();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        summary.records_read += 1;
        match expand_line(&line) {
            Ok(observations) => {
                for observation in &observations {
                    writeln!(output, "{}", observation)?;
                }
                summary.records_emitted += observations.len();
            }
            Err(err) => {
                summary.records_skipped += 1;
                warn!(line = line.as_str(), %err, "skipping malformed adjacency line");
            }
        }
    }
    output.flush()?;
    Ok(summary)
}

/// Reads observation lines, applies each to both of its endpoints, and
/// writes one ranked recommendation line per user in ascending id order.
pub fn reduce_stream<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    top_n: Option<usize>,
) -> io::Result<JobSummary> {
    let mut summary = JobSummary::default();
    let mut batches: BTreeMap<UserId, Vec<Observation>> = BTreeMap::new();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        summary.records_read += 1;
        let observation: Observation = match line.parse() {
            Ok(observation) => observation,
            Err(err) => {
                summary.records_skipped += 1;
                warn!(line = line.as_str(), %err, "skipping malformed observation line");
                continue;
            }
        };
        for endpoint in observation.both_endpoints() {
            batches.entry(endpoint.subject).or_default().push(endpoint);
            summary.records_emitted += 1;
        }
    }

    summary.groups = batches.len();
    for (user, batch) in &batches {
        match recommend(*user, batch, top_n) {
            Ok(list) => writeln!(output, "{}", list)?,
            Err(err) => {
                summary.groups_failed += 1;
                error!(user, %err, "dropping recommendations");
            }
        }
    }
    output.flush()?;
    Ok(summary)
}

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ScopedJoinHandle};

use tracing::{debug, info, warn};

use crate::config::ClusterConfig;
use crate::shuffle::{assign_partitions, group_by_key, partition_data, Group};
use crate::transport::{Collector, Report, ReturnPath};
use crate::{mapper, reducer, Job, MapReduceError};

/// Counters of one finished job.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobSummary {
    /// Non-blank input lines handed to the mappers.
    pub records_read: usize,
    /// Input lines and mapped records that failed to parse.
    pub records_skipped: usize,
    /// Records that made it through the shuffle.
    pub records_emitted: usize,
    /// Distinct keys.
    pub groups: usize,
    /// Groups whose reduce failed and produced no output.
    pub groups_failed: usize,
}

impl JobSummary {
    pub fn error_count(&self) -> usize {
        self.records_skipped + self.groups_failed
    }
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read={} skipped={} emitted={} groups={} failed_groups={}",
            self.records_read,
            self.records_skipped,
            self.records_emitted,
            self.groups,
            self.groups_failed
        )
    }
}

/// A single-machine map/reduce cluster: mapper and reducer workers are
/// threads that report to one collector socket.
pub struct Cluster {
    collector: Collector,
    context: zmq::Context,
    config: ClusterConfig,
    runs: AtomicU64,
}

impl Cluster {
    pub fn new(config: ClusterConfig) -> Result<Self, MapReduceError> {
        config.validate()?;
        let context = zmq::Context::new();
        let collector = Collector::bind(
            &context,
            &config.main_thread_addr,
            config.socket_timeout_ms(),
        )?;
        Ok(Cluster {
            collector,
            context,
            config,
            runs: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Runs `job` over every line of `input_file` and writes one output line
    /// per key, in ascending key order, to `output_location`.
    pub fn run_mapred<J: Job>(
        &self,
        job: &J,
        input_file: &Path,
        output_location: &Path,
    ) -> Result<JobSummary, MapReduceError> {
        let file = File::open(input_file)?;
        let lines = BufReader::new(file)
            .lines()
            .collect::<Result<Vec<_>, _>>()?;

        let (output, summary) = self.run(job, lines)?;

        let mut file = BufWriter::new(File::create(output_location)?);
        for line in &output {
            writeln!(file, "{}", line)?;
        }
        file.flush()?;
        info!(
            input = %input_file.display(),
            output = %output_location.display(),
            lines = output.len(),
            "output written"
        );
        Ok(summary)
    }

    /// Runs `job` over in-memory lines and returns the output lines in
    /// ascending key order.
    pub fn run<J: Job>(
        &self,
        job: &J,
        lines: Vec<String>,
    ) -> Result<(Vec<String>, JobSummary), MapReduceError> {
        let mut summary = JobSummary::default();
        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let return_path = ReturnPath {
            context: self.context.clone(),
            addr: &self.config.main_thread_addr,
            timeout_ms: self.config.socket_timeout_ms(),
            run,
        };

        let chunks = partition_data(lines, self.config.num_mappers);
        info!(run, mappers = chunks.len(), "starting map phase");
        let records = self.map_phase(job, chunks, &return_path, &mut summary)?;

        let groups = group_by_key(records);
        summary.groups = groups.len();
        let partitions = assign_partitions(groups, self.config.num_reducers);
        info!(
            groups = summary.groups,
            reducers = partitions.len(),
            "starting reduce phase"
        );
        let output = self.reduce_phase(job, partitions, &return_path, &mut summary)?;

        if summary.error_count() > 0 {
            warn!(%summary, errors = summary.error_count(), "job finished with errors");
        } else {
            info!(%summary, "job finished");
        }
        Ok((output, summary))
    }

    fn map_phase<J: Job>(
        &self,
        job: &J,
        chunks: Vec<Vec<String>>,
        return_path: &ReturnPath<'_>,
        summary: &mut JobSummary,
    ) -> Result<Vec<J::Record>, MapReduceError> {
        let expected = chunks.len();

        let reports = thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .into_iter()
                .enumerate()
                .map(|(id, chunk)| {
                    let return_path = return_path.clone();
                    scope.spawn(move || mapper::run_mapper(job, id, chunk, &return_path))
                })
                .collect();
            let gathered = self.collector.gather(return_path.run, "map", expected);
            let joined = join_workers("map", handles);
            settle(gathered, joined)
        })?;

        let mut records = Vec::new();
        for report in reports {
            let Report::Map {
                mapper,
                read,
                skipped,
                records: encoded,
            } = report
            else {
                return Err(MapReduceError::Protocol(
                    "reduce report during map phase".into(),
                ));
            };
            debug!(mapper, read, skipped, emitted = encoded.len(), "map report");
            summary.records_read += read;
            summary.records_skipped += skipped;
            for wire in encoded {
                match job.decode(&wire) {
                    Ok(record) => records.push(record),
                    Err(err) => {
                        summary.records_skipped += 1;
                        warn!(record = wire.as_str(), %err, "skipping malformed mapped record");
                    }
                }
            }
        }
        summary.records_emitted = records.len();
        Ok(records)
    }

    fn reduce_phase<J: Job>(
        &self,
        job: &J,
        partitions: Vec<Vec<Group<J::Record>>>,
        return_path: &ReturnPath<'_>,
        summary: &mut JobSummary,
    ) -> Result<Vec<String>, MapReduceError> {
        let expected = partitions.len();

        let reports = thread::scope(|scope| {
            let handles: Vec<_> = partitions
                .into_iter()
                .enumerate()
                .map(|(partition, groups)| {
                    let return_path = return_path.clone();
                    scope.spawn(move || {
                        reducer::run_reducer(job, partition, groups, &return_path)
                    })
                })
                .collect();
            let gathered = self.collector.gather(return_path.run, "reduce", expected);
            let joined = join_workers("reduce", handles);
            settle(gathered, joined)
        })?;

        let mut indexed = Vec::new();
        for report in reports {
            let Report::Reduce {
                partition,
                failed,
                lines,
            } = report
            else {
                return Err(MapReduceError::Protocol(
                    "map report during reduce phase".into(),
                ));
            };
            debug!(partition, returned = lines.len(), failed, "reduce report");
            summary.groups_failed += failed;
            indexed.extend(lines);
        }
        indexed.sort_unstable_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, line)| line).collect())
    }
}

/// A failed gather explains a phase better than the worker errors it
/// causes, so it wins over them.
fn settle(
    gathered: Result<Vec<Report>, MapReduceError>,
    joined: Result<(), MapReduceError>,
) -> Result<Vec<Report>, MapReduceError> {
    let reports = gathered?;
    joined?;
    Ok(reports)
}

fn join_workers(
    stage: &'static str,
    handles: Vec<ScopedJoinHandle<'_, Result<(), MapReduceError>>>,
) -> Result<(), MapReduceError> {
    let mut first_err = None;
    for handle in handles {
        let outcome = handle
            .join()
            .map_err(|_| MapReduceError::WorkerPanicked(stage))
            .and_then(|result| result);
        if let Err(err) = outcome {
            first_err.get_or_insert(err);
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fmt;
    use std::fs;
    use std::time::Duration;

    use super::*;
    use crate::Keyed;

    /// The classic word count, with `!`-prefixed lines treated as malformed
    /// and the word "poison" failing its reduce.
    struct WordCount;

    #[derive(Debug, Clone, PartialEq)]
    struct Tally {
        word: String,
        count: u32,
    }

    impl Keyed for Tally {
        type Key = String;

        fn key(&self) -> String {
            self.word.clone()
        }
    }

    impl fmt::Display for Tally {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}\t{}", self.word, self.count)
        }
    }

    impl Job for WordCount {
        type Record = Tally;
        type Error = String;

        fn map(&self, line: &str) -> Result<Vec<Tally>, String> {
            if line.starts_with('!') {
                return Err(format!("not a sentence: {line}"));
            }
            Ok(line
                .split_whitespace()
                .map(|word| Tally {
                    word: word.to_lowercase(),
                    count: 1,
                })
                .collect())
        }

        fn decode(&self, wire: &str) -> Result<Tally, String> {
            let (word, count) = wire.split_once('\t').ok_or("missing tab")?;
            let count = count.parse().map_err(|_| "bad count".to_string())?;
            Ok(Tally {
                word: word.to_string(),
                count,
            })
        }

        fn reduce(&self, word: &String, records: Vec<Tally>) -> Result<String, String> {
            if word == "poison" {
                return Err("poisoned group".into());
            }
            let total: u32 = records.iter().map(|t| t.count).sum();
            Ok(format!("{word} {total}"))
        }
    }

    /// Word count whose mapper sleeps before every line.
    struct Sleepy(Duration);

    impl Job for Sleepy {
        type Record = Tally;
        type Error = String;

        fn map(&self, line: &str) -> Result<Vec<Tally>, String> {
            thread::sleep(self.0);
            WordCount.map(line)
        }

        fn decode(&self, wire: &str) -> Result<Tally, String> {
            WordCount.decode(wire)
        }

        fn reduce(&self, word: &String, records: Vec<Tally>) -> Result<String, String> {
            WordCount.reduce(word, records)
        }
    }

    fn text() -> Vec<String> {
        [
            "the work of the day",
            "what the work of art",
            "! not counted",
            "",
            "the end of the story of it",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn parse_output(lines: &[String]) -> HashMap<String, u32> {
        lines
            .iter()
            .map(|line| {
                let (word, count) = line.split_once(' ').unwrap();
                (word.to_string(), count.parse().unwrap())
            })
            .collect()
    }

    fn cluster(mappers: usize, reducers: usize, addr: &str) -> Cluster {
        let config = ClusterConfig {
            main_thread_addr: addr.to_string(),
            collect_timeout_ms: Some(10_000),
            ..ClusterConfig::default()
        };
        Cluster::new(config.with_mappers(mappers).with_reducers(reducers)).unwrap()
    }

    #[test]
    fn counts_words() {
        let cluster = cluster(2, 3, "inproc://counts-words");
        let (output, summary) = cluster.run(&WordCount, text()).unwrap();
        let counts = parse_output(&output);

        assert_eq!(counts["the"], 5);
        assert_eq!(counts["what"], 1);
        assert_eq!(counts["work"], 2);
        assert_eq!(counts["of"], 4);
        assert_eq!(summary.records_read, 4);
        assert_eq!(summary.records_skipped, 1);
        assert_eq!(summary.groups, counts.len());
    }

    #[test]
    fn output_is_in_key_order_for_any_worker_count() {
        let baseline = cluster(1, 1, "inproc://order-1")
            .run(&WordCount, text())
            .unwrap()
            .0;
        let mut sorted = baseline.clone();
        sorted.sort();
        assert_eq!(baseline, sorted);

        for (mappers, reducers) in [(2, 2), (3, 5), (8, 8)] {
            let addr = format!("inproc://order-{mappers}-{reducers}");
            let output = cluster(mappers, reducers, &addr)
                .run(&WordCount, text())
                .unwrap()
                .0;
            assert_eq!(output, baseline);
        }
    }

    #[test]
    fn failed_group_does_not_stop_the_job() {
        let lines = vec!["poison apple".to_string(), "apple pie".to_string()];
        let (output, summary) = cluster(2, 2, "inproc://poison")
            .run(&WordCount, lines)
            .unwrap();

        assert_eq!(output, vec!["apple 2".to_string(), "pie 1".to_string()]);
        assert_eq!(summary.groups, 3);
        assert_eq!(summary.groups_failed, 1);
        assert_eq!(summary.error_count(), 1);
    }

    #[test]
    fn empty_input_produces_nothing() {
        let (output, summary) = cluster(4, 4, "inproc://empty")
            .run(&WordCount, Vec::new())
            .unwrap();
        assert!(output.is_empty());
        assert_eq!(summary, JobSummary::default());
    }

    #[test]
    fn cluster_can_run_twice() {
        let cluster = cluster(2, 2, "inproc://twice");
        let first = cluster.run(&WordCount, text()).unwrap();
        let second = cluster.run(&WordCount, text()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn run_mapred_reads_and_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        let output = dir.path().join("word_count.txt");
        fs::write(&input, text().join("\n")).unwrap();

        let summary = cluster(2, 2, "inproc://files")
            .run_mapred(&WordCount, &input, &output)
            .unwrap();

        let written: Vec<String> = fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        assert_eq!(written.len(), summary.groups);
        assert_eq!(parse_output(&written)["the"], 5);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ClusterConfig::default().with_mappers(0);
        assert!(matches!(
            Cluster::new(config),
            Err(MapReduceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn timed_out_run_does_not_leak_into_the_next() {
        let config = ClusterConfig {
            main_thread_addr: "inproc://late-report".into(),
            collect_timeout_ms: Some(200),
            ..ClusterConfig::default()
        };
        let cluster = Cluster::new(config.with_mappers(1).with_reducers(1)).unwrap();

        let err = cluster
            .run(&Sleepy(Duration::from_millis(400)), vec!["a".into()])
            .unwrap_err();
        assert!(
            matches!(
                err,
                MapReduceError::Timeout {
                    stage: "map",
                    received: 0,
                    expected: 1
                }
            ),
            "unexpected error: {err}"
        );

        let (output, summary) = cluster
            .run(&Sleepy(Duration::ZERO), vec!["b".into()])
            .unwrap();
        assert_eq!(output, vec!["b 1".to_string()]);
        assert_eq!(summary.records_read, 1);
    }

    #[test]
    fn slow_workers_are_awaited_without_a_timeout() {
        let config = ClusterConfig {
            main_thread_addr: "inproc://patient".into(),
            ..ClusterConfig::default()
        };
        assert_eq!(config.collect_timeout_ms, None);
        let cluster = Cluster::new(config.with_mappers(2).with_reducers(2)).unwrap();

        let (output, _) = cluster
            .run(
                &Sleepy(Duration::from_millis(300)),
                vec!["a b".into(), "b".into()],
            )
            .unwrap();
        assert_eq!(output, vec!["a 1".to_string(), "b 2".to_string()]);
    }
}

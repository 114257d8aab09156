//! A map/reduce runner bounded to one machine.
//!
//! Input lines are split over mapper threads, the mapped records travel to a
//! collector over ZeroMQ in their text wire format, get sorted and grouped
//! by key, and every partition of groups is reduced by its own thread.

use std::fmt::{Debug, Display};

mod cluster;
mod config;
mod error;
mod mapper;
mod reducer;
mod shuffle;
mod transport;

pub use cluster::{Cluster, JobSummary};
pub use config::ClusterConfig;
pub use error::MapReduceError;
pub use shuffle::{assign_partitions, group_by_key, partition_data, Group};

/// A record that carries its own shuffle key.
pub trait Keyed {
    type Key: Ord + Clone + Debug + Display + Send;

    fn key(&self) -> Self::Key;
}

/// A map/reduce job.
///
/// `map` turns one input line into records, `decode` parses a record back
/// from its `Display` form after it crossed the transport, and `reduce`
/// turns every record of one key into a single output line.
pub trait Job: Sync {
    type Record: Keyed + Display + Send;
    type Error: Display;

    fn map(&self, line: &str) -> Result<Vec<Self::Record>, Self::Error>;

    fn decode(&self, wire: &str) -> Result<Self::Record, Self::Error>;

    fn reduce(
        &self,
        key: &<Self::Record as Keyed>::Key,
        records: Vec<Self::Record>,
    ) -> Result<String, Self::Error>;
}

/// Validates `config` and starts a [`Cluster`] with its collector bound to
/// `MAIN_THREAD_ADDR`. The cluster can run any number of jobs.
pub fn init(config: ClusterConfig) -> Result<Cluster, MapReduceError> {
    Cluster::new(config)
}

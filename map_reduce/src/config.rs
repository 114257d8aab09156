use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::MapReduceError;

/// Cluster settings, read from a `config.json` such as
///
/// ```json
/// { "NUM_MAPPERS": 4, "NUM_REDUCERS": 2, "MAIN_THREAD_ADDR": "inproc://collector" }
/// ```
///
/// Missing keys fall back to [`ClusterConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ClusterConfig {
    pub num_mappers: usize,
    pub num_reducers: usize,
    /// Endpoint the collector binds and workers report to.
    pub main_thread_addr: String,
    /// How long the collector waits for the next report, in milliseconds.
    /// The wait includes worker compute time. `None` waits forever.
    pub collect_timeout_ms: Option<i32>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            num_mappers: 4,
            num_reducers: 4,
            main_thread_addr: String::from("inproc://map-reduce-collector"),
            collect_timeout_ms: None,
        }
    }
}

impl ClusterConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MapReduceError> {
        let file = File::open(path)?;
        let config: ClusterConfig =
            serde_json::from_reader(BufReader::new(file)).map_err(MapReduceError::Config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_mappers(mut self, num_mappers: usize) -> Self {
        self.num_mappers = num_mappers;
        self
    }

    pub fn with_reducers(mut self, num_reducers: usize) -> Self {
        self.num_reducers = num_reducers;
        self
    }

    pub fn validate(&self) -> Result<(), MapReduceError> {
        if self.num_mappers == 0 {
            return Err(MapReduceError::InvalidConfig(
                "NUM_MAPPERS must be at least 1".into(),
            ));
        }
        if self.num_reducers == 0 {
            return Err(MapReduceError::InvalidConfig(
                "NUM_REDUCERS must be at least 1".into(),
            ));
        }
        if self.main_thread_addr.is_empty() {
            return Err(MapReduceError::InvalidConfig(
                "MAIN_THREAD_ADDR must not be empty".into(),
            ));
        }
        if matches!(self.collect_timeout_ms, Some(ms) if ms <= 0) {
            return Err(MapReduceError::InvalidConfig(
                "COLLECT_TIMEOUT_MS must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The socket timeout in zmq terms, where -1 blocks.
    pub(crate) fn socket_timeout_ms(&self) -> i32 {
        self.collect_timeout_ms.unwrap_or(-1)
    }
}

use map_reduce::Job;

use crate::aggregator::recommend;
use crate::expander::expand_line;
use crate::{Error, Observation, UserId};

/// The recommendation pipeline as a [`map_reduce::Job`].
///
/// The map step emits every expanded observation from both endpoints, so
/// the shuffle's group for a user holds every fact about that user.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutualFriends {
    top_n: Option<usize>,
}

impl MutualFriends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `top_n` recommendations per user.
    pub fn with_top_n(top_n: Option<usize>) -> Self {
        MutualFriends { top_n }
    }
}

impl Job for MutualFriends {
    type Record = Observation;
    type Error = Error;

    fn map(&self, line: &str) -> Result<Vec<Observation>, Error> {
        Ok(expand_line(line)?
            .into_iter()
            .flat_map(Observation::both_endpoints)
            .collect())
    }

    fn decode(&self, wire: &str) -> Result<Observation, Error> {
        Ok(wire.parse()?)
    }

    fn reduce(&self, user: &UserId, records: Vec<Observation>) -> Result<String, Error> {
        Ok(recommend(*user, &records, self.top_n)?.to_string())
    }
}

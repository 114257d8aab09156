//! The reduce side: every observation about one user in, a ranked list of
//! people the user is not yet friends with out.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;

use crate::{Error, Kind, Observation, Result, UserId};

/// What one user knows about one peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerTally {
    /// Candidate occurrences; every friend observation nets to zero.
    pub count: i64,
    pub direct_friend: bool,
}

/// Per-user tallies, owned by whoever is aggregating that user's batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAggregate {
    user: UserId,
    peers: HashMap<UserId, PeerTally>,
}

impl UserAggregate {
    pub fn new(user: UserId) -> Self {
        UserAggregate {
            user,
            peers: HashMap::new(),
        }
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn tally(&self, peer: UserId) -> Option<PeerTally> {
        self.peers.get(&peer).copied()
    }

    /// Folds one observation into the aggregate. The observation must be
    /// keyed by this user; its `other` is the peer.
    pub fn absorb(mut self, observation: &Observation) -> Result<Self> {
        if observation.subject != self.user {
            return Err(Error::GroupingViolation {
                expected: self.user,
                found: observation.subject,
            });
        }

        let tally = self.peers.entry(observation.other).or_default();
        tally.count += 1;
        if observation.kind == Kind::Friend {
            tally.count -= 1;
            tally.direct_friend = true;
        }
        Ok(self)
    }

    /// Drops direct friends and ranks the rest by count, highest first,
    /// ties by ascending id.
    pub fn into_recommendations(self, top_n: Option<usize>) -> RecommendationList {
        let mut entries: Vec<Recommendation> = self
            .peers
            .into_iter()
            .filter(|(_, tally)| !tally.direct_friend)
            .map(|(peer, tally)| Recommendation {
                peer,
                score: tally.count,
            })
            .collect();
        entries.sort_unstable_by(|a, b| b.score.cmp(&a.score).then(a.peer.cmp(&b.peer)));
        if let Some(limit) = top_n {
            entries.truncate(limit);
        }
        RecommendationList {
            user: self.user,
            entries,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recommendation {
    pub peer: UserId,
    pub score: i64,
}

/// A user's ranked recommendations, printed as `user<TAB>p1,p2,...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationList {
    pub user: UserId,
    pub entries: Vec<Recommendation>,
}

impl RecommendationList {
    pub fn peers(&self) -> impl Iterator<Item = UserId> + '_ {
        self.entries.iter().map(|entry| entry.peer)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for RecommendationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.user, self.peers().join(","))
    }
}

/// Builds the aggregate for `user` from its batch, in any order. Fails on
/// the first observation keyed by somebody else.
pub fn aggregate<'a, I>(user: UserId, observations: I) -> Result<UserAggregate>
where
    I: IntoIterator<Item = &'a Observation>,
{
    observations
        .into_iter()
        .try_fold(UserAggregate::new(user), UserAggregate::absorb)
}

pub fn recommend<'a, I>(
    user: UserId,
    observations: I,
    top_n: Option<usize>,
) -> Result<RecommendationList>
where
    I: IntoIterator<Item = &'a Observation>,
{
    Ok(aggregate(user, observations)?.into_recommendations(top_n))
}

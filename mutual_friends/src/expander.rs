//! The map side: one adjacency record in, pair observations out.

use itertools::Itertools;

use crate::{AdjacencyRecord, Observation, ParseError};

/// Expands one friend list into observations:
///
/// - a FRIEND observation per friend, keyed by the smaller of the two ids;
/// - a CANDIDATE observation per unordered pair of friends, keyed by the
///   smaller friend, since both share `record.user`.
///
/// Friends are sorted and deduplicated first so the same pair always comes
/// out in the same orientation, whichever record produced it. Unlike a
/// plain streaming mapper, a friend listed twice yields one FRIEND
/// observation, not two, and adds no CANDIDATE pair with itself.
pub fn expand(record: &AdjacencyRecord) -> Vec<Observation> {
    let mut friends = record.friends.clone();
    friends.sort_unstable();
    friends.dedup();

    let pairs = friends.len() * friends.len().saturating_sub(1) / 2;
    let mut observations = Vec::with_capacity(friends.len() + pairs);
    observations.extend(
        friends
            .iter()
            .map(|&friend| Observation::friend(record.user, friend)),
    );
    observations.extend(
        friends
            .iter()
            .tuple_combinations()
            .map(|(&a, &b)| Observation::candidate(a, b)),
    );
    observations
}

pub fn expand_line(line: &str) -> Result<Vec<Observation>, ParseError> {
    let record: AdjacencyRecord = line.parse()?;
    Ok(expand(&record))
}

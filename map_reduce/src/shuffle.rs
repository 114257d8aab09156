use itertools::Itertools;

use crate::Keyed;

/// Every record that shares one key, in arrival order. `index` is the
/// position of the key in ascending key order and fixes where the group's
/// output lands.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<R: Keyed> {
    pub index: usize,
    pub key: R::Key,
    pub records: Vec<R>,
}

/// Splits input lines into at most `num_mappers` contiguous chunks of
/// `ceil(lines / num_mappers)` lines each. Blank lines are dropped.
pub fn partition_data(lines: Vec<String>, num_mappers: usize) -> Vec<Vec<String>> {
    let lines: Vec<String> = lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() || num_mappers == 0 {
        return Vec::new();
    }

    let per_mapper = (lines.len() + num_mappers - 1) / num_mappers;
    let mut parts = Vec::with_capacity(num_mappers);
    let mut lines = lines.into_iter().peekable();
    while lines.peek().is_some() {
        parts.push(lines.by_ref().take(per_mapper).collect());
    }
    parts
}

/// Sorts records by key and groups them, one [`Group`] per distinct key.
/// The sort is stable, so records keep their arrival order inside a group.
pub fn group_by_key<R: Keyed>(mut records: Vec<R>) -> Vec<Group<R>> {
    records.sort_by_key(|record| record.key());

    let mut groups = Vec::new();
    let chunks = records.into_iter().chunk_by(|record| record.key());
    for (index, (key, records)) in (&chunks).into_iter().enumerate() {
        groups.push(Group {
            index,
            key,
            records: records.collect(),
        });
    }
    groups
}

/// Deals groups round-robin over at most `num_partitions` partitions. A key
/// lands in exactly one partition; empty partitions are not returned.
pub fn assign_partitions<R: Keyed>(
    groups: Vec<Group<R>>,
    num_partitions: usize,
) -> Vec<Vec<Group<R>>> {
    let num_partitions = num_partitions.min(groups.len());
    let mut partitions: Vec<Vec<Group<R>>> = (0..num_partitions).map(|_| Vec::new()).collect();
    for group in groups {
        partitions[group.index % num_partitions].push(group);
    }
    partitions
}

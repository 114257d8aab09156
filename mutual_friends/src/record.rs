use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::ParseError;

pub type UserId = u64;

/// One user's friend list, as read from a `user<TAB>f1,f2,...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyRecord {
    pub user: UserId,
    pub friends: Vec<UserId>,
}

impl AdjacencyRecord {
    pub fn new(user: UserId, friends: Vec<UserId>) -> Self {
        AdjacencyRecord { user, friends }
    }
}

/// Strips surrounding whitespace but keeps tabs, which delimit fields.
pub(crate) fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() && c != '\t')
}

pub(crate) fn parse_user_id(field: &'static str, value: &str) -> Result<UserId, ParseError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ParseError::MissingField(field));
    }
    value.parse().map_err(|_| ParseError::InvalidUserId {
        field,
        value: value.to_string(),
    })
}

impl FromStr for AdjacencyRecord {
    type Err = ParseError;

    /// A missing or blank friend field means the user has no friends.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = trim_line(line).split('\t').collect();
        if fields.len() > 2 {
            return Err(ParseError::FieldCount {
                expected: 2,
                found: fields.len(),
            });
        }

        let user = parse_user_id("user", fields[0])?;
        let friends = match fields.get(1).map(|list| list.trim()) {
            None | Some("") => Vec::new(),
            Some(list) => list
                .split(',')
                .map(|friend| parse_user_id("friend", friend))
                .collect::<Result<_, _>>()?,
        };
        Ok(AdjacencyRecord { user, friends })
    }
}

impl fmt::Display for AdjacencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.user, self.friends.iter().join(","))
    }
}

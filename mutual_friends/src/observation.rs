use std::fmt;
use std::str::FromStr;

use map_reduce::Keyed;

use crate::record::{parse_user_id, trim_line};
use crate::{ParseError, UserId};

/// Whether a pair is a direct friendship or only shares a friend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Friend,
    Candidate,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Friend => "friend",
            Kind::Candidate => "not_friend",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friend" => Ok(Kind::Friend),
            "not_friend" => Ok(Kind::Candidate),
            other => Err(ParseError::UnknownKind(other.to_string())),
        }
    }
}

/// A fact about the pair `{subject, other}`, keyed by `subject` in the
/// shuffle. On the wire it is `subject<TAB>other<TAB>kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Observation {
    pub subject: UserId,
    pub other: UserId,
    pub kind: Kind,
}

impl Observation {
    /// A direct friendship, keyed by the smaller id.
    pub fn friend(a: UserId, b: UserId) -> Self {
        Observation {
            subject: a.min(b),
            other: a.max(b),
            kind: Kind::Friend,
        }
    }

    /// `subject` and `other` appear together in someone's friend list.
    pub fn candidate(subject: UserId, other: UserId) -> Self {
        Observation {
            subject,
            other,
            kind: Kind::Candidate,
        }
    }

    /// The same fact seen from `other`'s side.
    pub fn mirrored(&self) -> Self {
        Observation {
            subject: self.other,
            other: self.subject,
            kind: self.kind,
        }
    }

    /// The observation keyed once by each endpoint.
    pub fn both_endpoints(self) -> [Self; 2] {
        [self, self.mirrored()]
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.subject, self.other, self.kind)
    }
}

impl FromStr for Observation {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = trim_line(line).split('\t').collect();
        let [subject, other, kind] = fields[..] else {
            return Err(ParseError::FieldCount {
                expected: 3,
                found: fields.len(),
            });
        };
        Ok(Observation {
            subject: parse_user_id("subject", subject)?,
            other: parse_user_id("other", other)?,
            kind: kind.trim().parse()?,
        })
    }
}

impl Keyed for Observation {
    type Key = UserId;

    fn key(&self) -> UserId {
        self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friend_is_keyed_by_smaller_id() {
        assert_eq!(Observation::friend(7, 3), Observation::friend(3, 7));
        assert_eq!(Observation::friend(7, 3).key(), 3);
    }

    #[test]
    fn wire_format() {
        assert_eq!(Observation::friend(2, 1).to_string(), "1\t2\tfriend");
        assert_eq!(Observation::candidate(2, 3).to_string(), "2\t3\tnot_friend");

        let parsed: Observation = "2\t3\tnot_friend\n".parse().unwrap();
        assert_eq!(parsed, Observation::candidate(2, 3));
    }

    #[test]
    fn mirror_swaps_endpoints_only() {
        let [forward, backward] = Observation::candidate(2, 9).both_endpoints();
        assert_eq!(forward, Observation::candidate(2, 9));
        assert_eq!(backward, Observation::candidate(9, 2));
        assert_eq!(Observation::friend(1, 4).mirrored().kind, Kind::Friend);
    }

    #[test]
    fn malformed_lines() {
        assert_eq!(
            "1\t2".parse::<Observation>(),
            Err(ParseError::FieldCount {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            "1\t2\tenemy".parse::<Observation>(),
            Err(ParseError::UnknownKind("enemy".into()))
        );
        assert_eq!(
            "1\tb\tfriend".parse::<Observation>(),
            Err(ParseError::InvalidUserId {
                field: "other",
                value: "b".into()
            })
        );
    }
}

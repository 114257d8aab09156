//! Mutual-friend recommendations as a map/reduce job.
//!
//! Input is one `user<TAB>f1,f2,...` line per user. The mapper
//! ([`expand`]) turns each friend list into FRIEND observations for direct
//! edges and CANDIDATE observations for every pair of the user's friends.
//! The reducer ([`recommend`]) sees every observation about one user, drops
//! the people that user is already friends with, and ranks the rest by how
//! many friends they share, ties by ascending id.
//!
//! ```
//! use mutual_friends::{expand_line, recommend, Observation};
//!
//! let observations: Vec<Observation> = ["1\t2,3,4", "2\t1,3", "3\t1,2", "4\t1"]
//!     .iter()
//!     .flat_map(|line| expand_line(line).unwrap())
//!     .flat_map(Observation::both_endpoints)
//!     .filter(|o| o.subject == 4)
//!     .collect();
//!
//! let list = recommend(4, &observations, None).unwrap();
//! assert_eq!(list.to_string(), "4\t2,3");
//! ```

pub mod aggregator;
mod error;
pub mod expander;
pub mod job;
pub mod observation;
pub mod record;
pub mod stream;

pub use aggregator::{aggregate, recommend, PeerTally, Recommendation, RecommendationList, UserAggregate};
pub use error::{Error, ParseError, Result};
pub use expander::{expand, expand_line};
pub use job::MutualFriends;
pub use observation::{Kind, Observation};
pub use record::{AdjacencyRecord, UserId};

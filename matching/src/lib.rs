//! Matching and notification engine for a lost-and-found board.
//!
//! A newly posted [`types::Item`] is scored against every active item of the
//! opposite polarity; pairs that clear the configured threshold become
//! [`types::Match`] records in a [`store::MatchStore`], and each user's
//! notification feed is derived from the matches they participate in.

pub mod config;
pub mod factory;
pub mod feed;
pub mod finder;
pub mod migrate;
pub mod score;
pub mod store;
pub mod types;

pub use crate::config::MatchingConfig;
pub use crate::feed::NotificationFeed;
pub use crate::feed::derive_feed;
pub use crate::finder::MatchFinder;
pub use crate::score::Scorer;
pub use crate::score::TokenOverlapScorer;
pub use crate::store::MatchStore;
pub use crate::types::Item;
pub use crate::types::Match;

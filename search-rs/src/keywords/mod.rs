//! Keyword cloud
//!
//! Counts how often each keyword co-occurs with a set of filter keywords.
//! A node takes part when its keyword set contains every filter keyword; it
//! then adds one to each of its other keywords. [`LiveKeywordCloud`] scans the
//! repository on every call, [`CachedKeywordCloud`] reads per-user cache rows.
//! Both apply [`accumulate`] and must agree on the same data.

pub mod cached;
pub mod live;

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;

pub use cached::{CachedKeywordCloud, KeywordCache};
pub use live::LiveKeywordCloud;

/// Keyword -> occurrence count
pub type KeywordCloud = BTreeMap<String, usize>;

#[async_trait]
pub trait KeywordAggregator: Send + Sync {
    /// Cloud for `user`; `None` counts every keyword of every node
    async fn compute(&self, user: &str, filter: Option<&BTreeSet<String>>) -> Result<KeywordCloud>;
}

/// Count the keywords of every node that carries all filter keywords
pub fn accumulate<'a, I>(nodes: I, filter: Option<&BTreeSet<String>>) -> KeywordCloud
where
    I: IntoIterator<Item = &'a BTreeSet<String>>,
{
    let empty = BTreeSet::new();
    let filter = filter.unwrap_or(&empty);
    let mut cloud = KeywordCloud::new();

    for keywords in nodes {
        if !keywords.is_superset(filter) {
            continue;
        }
        for keyword in keywords.difference(filter) {
            *cloud.entry(keyword.clone()).or_default() += 1;
        }
    }

    cloud
}

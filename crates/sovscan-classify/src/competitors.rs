//! Competitor-mention counting.

use std::collections::BTreeMap;

use crate::mention::count_occurrences;

/// Count occurrences of each configured competitor name in `text`.
///
/// Competitors with zero occurrences are omitted from the map so rollup
/// sums stay sparse. Keys are the configured names as-is, not lowercased,
/// so the rollup reads back with the operator's spelling.
#[must_use]
pub fn count_competitor_mentions(text: &str, competitors: &[String]) -> BTreeMap<String, u32> {
    let mut mentions = BTreeMap::new();
    for name in competitors {
        let count = count_occurrences(text, name);
        if count > 0 {
            mentions.insert(name.clone(), count);
        }
    }
    mentions
}

#[cfg(test)]
#[path = "competitors_test.rs"]
mod tests;

//! Response classification for provider answers.
//!
//! Everything here is pure text analysis: brand-mention detection and
//! position, lexicon sentiment, competitor mention counts, and citation URL
//! extraction. The iteration executor runs [`classify_response`] on each
//! successful provider answer; classification never fails the iteration.

mod citations;
mod competitors;
mod mention;
mod sentiment;

pub use citations::extract_citations;
pub use competitors::count_competitor_mentions;
pub use mention::{detect_mention, mention_position};
pub use sentiment::{classify_sentiment, lexicon_score};

use std::collections::BTreeMap;

use sovscan_core::{Sentiment, SettingsSnapshot};

/// Derived fields for one provider answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub brand_mentioned: bool,
    /// 1-based ordinal of the first sentence mentioning the brand.
    pub mention_position: Option<i32>,
    pub sentiment: Sentiment,
    pub competitor_mentions: BTreeMap<String, u32>,
    pub citations: Vec<String>,
}

/// Classify one answer against the scan's settings snapshot.
///
/// `structured_citations` are URLs the provider returned alongside the text
/// (e.g. Perplexity's citations array); they are merged with URLs extracted
/// from the text itself, structured ones first.
#[must_use]
pub fn classify_response(
    text: &str,
    structured_citations: &[String],
    settings: &SettingsSnapshot,
) -> Classification {
    let brand_terms: Vec<&str> = std::iter::once(settings.brand_name.as_str())
        .chain(settings.brand_keywords.iter().map(String::as_str))
        .collect();

    let brand_mentioned = detect_mention(text, &brand_terms);
    let mention_position = if brand_mentioned {
        mention_position(text, &brand_terms)
    } else {
        None
    };

    Classification {
        brand_mentioned,
        mention_position,
        sentiment: classify_sentiment(text),
        competitor_mentions: count_competitor_mentions(text, &settings.competitors),
        citations: extract_citations(text, structured_citations),
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

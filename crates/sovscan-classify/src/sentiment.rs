//! Lexicon scorer for recommendation-style LLM answers.

use sovscan_core::Sentiment;

/// Word weights tuned for product-recommendation answers.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The final score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f32)] = &[
    // Positive signals
    ("great", 0.4),
    ("good", 0.3),
    ("excellent", 0.5),
    ("best", 0.5),
    ("top", 0.3),
    ("leading", 0.3),
    ("recommend", 0.4),
    ("recommended", 0.4),
    ("popular", 0.3),
    ("reliable", 0.4),
    ("trusted", 0.4),
    ("quality", 0.3),
    ("innovative", 0.3),
    ("love", 0.5),
    ("loved", 0.5),
    ("favorite", 0.4),
    ("affordable", 0.3),
    ("premium", 0.3),
    ("standout", 0.4),
    ("impressive", 0.4),
    // Negative signals
    ("bad", -0.4),
    ("poor", -0.4),
    ("worst", -0.6),
    ("avoid", -0.6),
    ("terrible", -0.6),
    ("disappointing", -0.5),
    ("overpriced", -0.4),
    ("unreliable", -0.5),
    ("complaint", -0.4),
    ("complaints", -0.4),
    ("recall", -0.7),
    ("lawsuit", -0.5),
    ("scam", -0.7),
    ("problem", -0.3),
    ("problems", -0.3),
    ("concern", -0.3),
    ("warning", -0.4),
    ("failed", -0.4),
    ("failure", -0.4),
    ("mediocre", -0.4),
];

/// Score a text string using the lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps
/// the result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f32 {
    let mut score = 0.0_f32;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        for &(lex_word, weight) in LEXICON {
            if w == lex_word {
                score += weight;
                break;
            }
        }
    }
    score.clamp(-1.0, 1.0)
}

/// Map a lexicon score to a [`Sentiment`] bucket.
///
/// Scores within `±0.1` of zero are neutral; the band keeps single weak
/// signals from flipping an otherwise flat answer.
#[must_use]
pub fn classify_sentiment(text: &str) -> Sentiment {
    let score = lexicon_score(text);
    if score > 0.1 {
        Sentiment::Positive
    } else if score < -0.1 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

#[cfg(test)]
#[path = "sentiment_test.rs"]
mod tests;

//! String similarity scorers used to rank search results.
//!
//! Scores are in `0.0..=1.0`. Both scorers normalize text the same way:
//! lowercase, anything that is not alphanumeric becomes a separator, tokens
//! are sorted and re-joined with single spaces. That makes word order and
//! punctuation (common OCR noise) irrelevant.

use crate::config::ScorerKind;

/// A pluggable similarity function.
pub trait Scorer: Send + Sync {
    fn score(&self, query: &str, candidate: &str) -> f32;
}

/// Indel ratio over token-sorted strings.
///
/// `2 * LCS / (len(a) + len(b))`, counted in chars.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl Scorer for TokenSortRatio {
    fn score(&self, query: &str, candidate: &str) -> f32 {
        let a: Vec<char> = token_sort(query).chars().collect();
        let b: Vec<char> = token_sort(candidate).chars().collect();
        ratio(&a, &b)
    }
}

/// Best ratio of the shorter token-sorted string against every equal-length
/// window of the longer one. Favors short queries inside long OCR text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialTokenSortRatio;

impl Scorer for PartialTokenSortRatio {
    fn score(&self, query: &str, candidate: &str) -> f32 {
        let a: Vec<char> = token_sort(query).chars().collect();
        let b: Vec<char> = token_sort(candidate).chars().collect();
        let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
        if short.is_empty() {
            return 0.0;
        }

        let mut best = 0.0f32;
        for window in long.windows(short.len()) {
            best = best.max(ratio(short, window));
            if best >= 1.0 {
                break;
            }
        }
        best
    }
}

/// Build the scorer selected in configuration.
pub fn scorer_for(kind: ScorerKind) -> Box<dyn Scorer> {
    match kind {
        ScorerKind::TokenSort => Box::new(TokenSortRatio),
        ScorerKind::Partial => Box::new(PartialTokenSortRatio),
    }
}

/// Lowercase, split on non-alphanumerics, sort tokens, join with spaces.
pub fn token_sort(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn ratio(a: &[char], b: &[char]) -> f32 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (2 * lcs_len(a, b)) as f32 / total as f32
}

/// Longest common subsequence length, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

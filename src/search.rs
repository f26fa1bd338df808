use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    config::{DEFAULT_MIN_SCORE, DEFAULT_RESULT_LIMIT},
    error::Result,
    similarity::Scorer,
    text_index::{IndexEntry, TextIndex},
};

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    /// Maximum number of distinct matching texts.
    pub limit: usize,
    pub min_score: f32,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_RESULT_LIMIT,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub score: f32,
    #[serde(flatten)]
    pub entry: IndexEntry,
}

/// Entries sharing one exact text value, scored once.
struct MatchClass {
    text: String,
    entries: Vec<IndexEntry>,
}

/// Fuzzy-match `params.query` against every indexed text.
///
/// 1. Group entries by identical text, in index (id) order
/// 2. Score each group against the query
/// 3. Drop groups below `min_score`
/// 4. Stable sort by score descending, so ties keep index order
/// 5. Keep `limit` groups and report every entry in them
pub fn execute_search(
    params: &SearchParams,
    index: &TextIndex,
    scorer: &dyn Scorer,
) -> Result<Vec<SearchHit>> {
    Ok(rank_entries(params, index.all()?, scorer))
}

/// Ranking over an already-loaded entry list.
pub fn rank_entries(
    params: &SearchParams,
    entries: Vec<IndexEntry>,
    scorer: &dyn Scorer,
) -> Vec<SearchHit> {
    if params.query.trim().is_empty() || params.limit == 0 {
        return vec![];
    }

    let classes = group_by_text(entries);

    // Stage 1: score, preserving class order.
    let scores: Vec<f32> = classes
        .par_iter()
        .map(|class| scorer.score(&params.query, &class.text))
        .collect();

    // Stage 2: filter by min_score.
    let mut scored: Vec<(f32, MatchClass)> = scores
        .into_iter()
        .zip(classes)
        .filter(|(score, _)| *score >= params.min_score)
        .collect();

    // Stage 3: stable sort, best first.
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal)
    });

    // Stage 4: limit classes, expand to entries.
    scored
        .into_iter()
        .take(params.limit)
        .flat_map(|(score, class)| {
            class.entries.into_iter().map(move |entry| (score, entry))
        })
        .enumerate()
        .map(|(i, (score, entry))| SearchHit {
            rank: i + 1,
            score,
            entry,
        })
        .collect()
}

fn group_by_text(entries: Vec<IndexEntry>) -> Vec<MatchClass> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut classes: Vec<MatchClass> = Vec::new();

    for entry in entries {
        match positions.get(&entry.text) {
            Some(&pos) => classes[pos].entries.push(entry),
            None => {
                positions.insert(entry.text.clone(), classes.len());
                classes.push(MatchClass {
                    text: entry.text.clone(),
                    entries: vec![entry],
                });
            }
        }
    }

    classes
}

/// Format results for a terminal.
pub fn format_human(hits: &[SearchHit], query: &str) {
    if hits.is_empty() {
        println!("Could not find any items for search query \"{query}\".");
        return;
    }
    for hit in hits {
        println!(
            "{:>3}. [{:.3}] #{}.{}",
            hit.rank, hit.score, hit.entry.id, hit.entry.extension
        );
        if let Some(line) = hit.entry.text.lines().find(|l| !l.trim().is_empty()) {
            println!("     {}", line.trim());
        }
    }
    println!("\n{} result(s)", hits.len());
}

/// Format results as JSON output.
pub fn format_json(hits: &[SearchHit], query: &str) -> Result<()> {
    let out = serde_json::json!({
        "query": query,
        "result_count": hits.len(),
        "results": hits,
    });
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

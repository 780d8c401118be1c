use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::category::{Category, CategoryName};
use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("error: category does not exist")]
    UnknownCategory,

    #[error("error: invalid score {raw:?}")]
    InvalidScore { raw: String },

    #[error("malformed score record: {0}")]
    Malformed(String),
}

/// Running tally for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryScore {
    pub correct: u32,
    pub possible: u32,
}

impl CategoryScore {
    #[must_use]
    pub fn new(correct: u32, possible: u32) -> Self {
        Self { correct, possible }
    }

    /// Whole-number percentage, 0 when nothing has been attempted.
    #[must_use]
    pub fn percent(&self) -> u32 {
        percent_of(self.correct, self.possible)
    }
}

/// Parses a score increment as submitted by a caller.
///
/// Only non-negative integers are accepted.
///
/// # Errors
///
/// Returns `ProgressError::InvalidScore` for anything else.
pub fn parse_score_delta(raw: &str) -> Result<u32, ProgressError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProgressError::InvalidScore { raw: raw.to_owned() });
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| ProgressError::InvalidScore { raw: raw.to_owned() })
}

pub(crate) fn percent_of(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    if part >= whole {
        return 100;
    }
    let ratio = f64::from(part) / f64::from(whole);
    // bounded to 0..=100 by the checks above
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = (ratio * 100.0).round() as u32;
    pct
}

/// A user's cumulative correct/possible answers per category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    user_id: UserId,
    scores: BTreeMap<CategoryName, CategoryScore>,
}

impl Progress {
    /// Empty progress for a user who has not answered anything yet.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            scores: BTreeMap::new(),
        }
    }

    /// Rehydrate progress from its persisted score string.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Malformed` if the string is not a sequence of
    /// `category,correct,possible,` triples.
    pub fn from_persisted(user_id: UserId, encoded: &str) -> Result<Self, ProgressError> {
        Ok(Self {
            user_id,
            scores: decode_scores(encoded)?,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The persisted form of the score mapping.
    #[must_use]
    pub fn score(&self) -> String {
        encode_scores(&self.scores)
    }

    #[must_use]
    pub fn scores(&self) -> &BTreeMap<CategoryName, CategoryScore> {
        &self.scores
    }

    /// Ensures every given category has an entry, adding `(0, 0)` where
    /// missing, and returns the full mapping.
    ///
    /// Returns whether anything was added alongside the mapping so callers
    /// know to persist.
    pub fn list_all_cat_scores(
        &mut self,
        categories: &[Category],
    ) -> (bool, &BTreeMap<CategoryName, CategoryScore>) {
        let mut added = false;
        for category in categories {
            if !self.scores.contains_key(category.name()) {
                self.scores
                    .insert(category.name().clone(), CategoryScore::default());
                added = true;
            }
        }
        (added, &self.scores)
    }

    /// Looks up the tally for a category already recorded in this progress.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownCategory` if the category has no entry.
    pub fn check_cat_score(&self, category: &str) -> Result<CategoryScore, ProgressError> {
        self.scores
            .get(&CategoryName::new(category))
            .copied()
            .ok_or(ProgressError::UnknownCategory)
    }

    /// Adds to the tally of an existing category, creating its entry when
    /// this progress has not seen it yet.
    pub fn update_score(&mut self, category: &Category, correct: u32, possible: u32) {
        let entry = self.scores.entry(category.name().clone()).or_default();
        entry.correct = entry.correct.saturating_add(correct);
        entry.possible = entry.possible.saturating_add(possible);
    }
}

//
// ─── ENCODING ──────────────────────────────────────────────────────────────────
//

fn escape_name(name: &str) -> String {
    name.replace('%', "%25").replace(',', "%2C")
}

fn unescape_name(name: &str) -> String {
    name.replace("%2C", ",").replace("%25", "%")
}

fn encode_scores(scores: &BTreeMap<CategoryName, CategoryScore>) -> String {
    let mut out = String::new();
    for (name, score) in scores {
        out.push_str(&escape_name(name.as_str()));
        out.push(',');
        out.push_str(&score.correct.to_string());
        out.push(',');
        out.push_str(&score.possible.to_string());
        out.push(',');
    }
    out
}

fn decode_scores(encoded: &str) -> Result<BTreeMap<CategoryName, CategoryScore>, ProgressError> {
    let mut scores = BTreeMap::new();
    let fields: Vec<&str> = encoded
        .trim_end_matches(',')
        .split(',')
        .filter(|f| !f.is_empty())
        .collect();

    if fields.len() % 3 != 0 {
        return Err(ProgressError::Malformed(encoded.to_owned()));
    }

    for triple in fields.chunks_exact(3) {
        let name = CategoryName::new(&unescape_name(triple[0]));
        let correct = triple[1]
            .parse::<u32>()
            .map_err(|_| ProgressError::Malformed(encoded.to_owned()))?;
        let possible = triple[2]
            .parse::<u32>()
            .map_err(|_| ProgressError::Malformed(encoded.to_owned()))?;
        scores.insert(name, CategoryScore::new(correct, possible));
    }

    Ok(scores)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

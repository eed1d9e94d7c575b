//! Similarity matching over fingerprints.
//!
//! Everything here is pure: it takes a snapshot of records and answers
//! which of them are near-duplicates of a fingerprint. Identity is decided
//! solely by the threshold test; the similarity score is a presentation
//! aid.
//!
//! Matching is pairwise. If A matches B and B matches C, A and C are only
//! linked when they are themselves within the threshold.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::record::Record;

/// Distance reported for fingerprints of different lengths.
pub const MISMATCHED_LENGTH_DISTANCE: u32 = u32::MAX;

/// Default maximum Hamming distance for two fingerprints to count as the
/// same content.
pub const DEFAULT_THRESHOLD: u32 = 5;

/// Default percentage points lost per differing symbol.
pub const DEFAULT_SCORE_SCALE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Inclusive distance bound
    pub threshold: u32,
    pub score_scale: u32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            score_scale: DEFAULT_SCORE_SCALE,
        }
    }
}

impl MatcherConfig {
    /// Inclusive threshold test. The mismatched-length sentinel never passes.
    pub fn is_match(&self, distance: u32) -> bool {
        distance != MISMATCHED_LENGTH_DISTANCE && distance <= self.threshold
    }

    /// `max(0, 100 - distance * scale)`
    pub fn similarity_score(&self, distance: u32) -> u8 {
        let penalty = distance.saturating_mul(self.score_scale);
        100u32.saturating_sub(penalty) as u8
    }
}

/// Hamming distance: the number of positions where the symbols differ.
///
/// Total over all inputs. Fingerprints of different lengths get
/// [`MISMATCHED_LENGTH_DISTANCE`] so they can never match.
pub fn distance(a: &Fingerprint, b: &Fingerprint) -> u32 {
    let (a, b) = (a.as_str(), b.as_str());

    if a.is_ascii() && b.is_ascii() {
        if a.len() != b.len() {
            return MISMATCHED_LENGTH_DISTANCE;
        }
        return a
            .bytes()
            .zip(b.bytes())
            .filter(|(x, y)| x != y)
            .count() as u32;
    }

    if a.chars().count() != b.chars().count() {
        return MISMATCHED_LENGTH_DISTANCE;
    }
    a.chars().zip(b.chars()).filter(|(x, y)| x != y).count() as u32
}

/// A stored record within the threshold of a target fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMatch {
    pub record: Record,
    pub distance: u32,
}

/// Every record other than `exclude_identity` within `config.threshold`
/// of `target`, ascending by `observed_at` (ties by identity).
///
/// A record identity appears at most once, even if the input repeats it.
pub fn find_matches<'a, I>(
    target: &Fingerprint,
    exclude_identity: Option<&str>,
    records: I,
    config: &MatcherConfig,
) -> Vec<RecordMatch>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut seen = HashSet::new();
    let mut matches: Vec<RecordMatch> = records
        .into_iter()
        .filter(|record| Some(record.identity.as_str()) != exclude_identity)
        .filter_map(|record| {
            let d = distance(target, &record.fingerprint);
            config.is_match(d).then_some((record, d))
        })
        .filter(|(record, _)| seen.insert(record.identity.as_str()))
        .map(|(record, d)| RecordMatch {
            record: record.clone(),
            distance: d,
        })
        .collect();

    matches.sort_by(|a, b| a.record.sort_key().cmp(&b.record.sort_key()));
    matches
}

/// Duplicate status of one record, derived from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub is_duplicate: bool,
    /// Earlier and later sightings, ascending by `observed_at`
    pub matches: Vec<Record>,
    pub match_count: usize,
    /// Percentage for the closest match; absent when there is none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<u8>,
}

impl MatchResult {
    pub fn from_matches(matches: Vec<RecordMatch>, config: &MatcherConfig) -> Self {
        let similarity_score = matches
            .iter()
            .map(|m| m.distance)
            .min()
            .map(|d| config.similarity_score(d));
        let matches: Vec<Record> = matches.into_iter().map(|m| m.record).collect();

        Self {
            is_duplicate: !matches.is_empty(),
            match_count: matches.len(),
            matches,
            similarity_score,
        }
    }

    /// Match result of `record` against `records`.
    pub fn compute<'a, I>(record: &Record, records: I, config: &MatcherConfig) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let matches = find_matches(
            &record.fingerprint,
            Some(&record.identity),
            records,
            config,
        );
        Self::from_matches(matches, config)
    }
}

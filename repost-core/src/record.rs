//! The persisted unit of the engine.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::intake::Candidate;

/// One sighting of a piece of content.
///
/// Created exactly once, when the scheduler successfully fingerprints a
/// candidate, and never modified afterwards. A later sighting of the same
/// content is a new record with its own identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Primary key (e.g. the source post id)
    pub identity: String,
    pub content_locator: String,
    pub fingerprint: Fingerprint,
    pub title: String,
    /// Community the content was seen in, e.g. `r/pics`
    pub origin: String,
    pub author: String,
    pub external_link: String,
    /// When the item was originally posted, if the feed said so
    pub posted_at: Option<DateTime<Utc>>,
    /// When the engine recorded this sighting
    pub observed_at: DateTime<Utc>,
}

impl Record {
    /// Build the record for a freshly fingerprinted candidate.
    ///
    /// Timestamps are truncated to milliseconds, the precision every store
    /// backend keeps.
    pub fn from_candidate(
        candidate: Candidate,
        fingerprint: Fingerprint,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity: candidate.identity,
            content_locator: candidate.content_locator,
            fingerprint,
            title: candidate.title,
            origin: candidate.origin,
            author: candidate.author,
            external_link: candidate.external_link,
            posted_at: candidate.posted_at.map(|t| t.trunc_subsecs(3)),
            observed_at: observed_at.trunc_subsecs(3),
        }
    }

    /// Ordering key used by snapshots and match lists.
    pub fn sort_key(&self) -> (DateTime<Utc>, &str) {
        (self.observed_at, self.identity.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_candidate_truncates_to_millis() {
        let candidate = Candidate::new("p1", "https://i.redd.it/a.jpg");
        let observed = Utc.timestamp_nanos(1_700_000_000_123_456_789);

        let record = Record::from_candidate(
            candidate,
            Fingerprint::parse("1010").unwrap(),
            observed,
        );

        assert_eq!(record.identity, "p1");
        assert_eq!(record.observed_at.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(record.observed_at.timestamp_subsec_nanos(), 123_000_000);
        assert!(record.posted_at.is_none());
    }
}

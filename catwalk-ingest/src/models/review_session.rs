//! Review session state machine
//!
//! ```text
//! active ──(reviewed >= total, total > 0)──▶ completed
//!    └────────(now > expires_at)──────────▶ expired
//! ```
//!
//! Both `completed` and `expired` are terminal: every mutator below is a
//! no-op once the session has left `active`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Active,
    Completed,
    Expired,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Active => "active",
            ReviewStatus::Completed => "completed",
            ReviewStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReviewStatus::Active)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = catwalk_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ReviewStatus::Active),
            "completed" => Ok(ReviewStatus::Completed),
            "expired" => Ok(ReviewStatus::Expired),
            other => Err(catwalk_common::Error::Internal(format!(
                "Unknown review status: {}",
                other
            ))),
        }
    }
}

/// Verdict counts over the entries tagged with one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTally {
    pub approved: i64,
    pub rejected: i64,
    pub duplicates: i64,
}

impl ReviewTally {
    pub fn reviewed(&self) -> i64 {
        self.approved + self.rejected + self.duplicates
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSession {
    pub session_id: String,
    pub review_type: String,
    pub total_images: i64,
    pub images_reviewed: i64,
    pub images_approved: i64,
    pub images_rejected: i64,
    pub images_duplicates: i64,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReviewSession {
    /// Create a new active session expiring `ttl` after `now`
    pub fn new(
        review_type: impl Into<String>,
        total_images: i64,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: format!("review_{}", Uuid::new_v4().simple()),
            review_type: review_type.into(),
            total_images,
            images_reviewed: 0,
            images_approved: 0,
            images_rejected: 0,
            images_duplicates: 0,
            status: ReviewStatus::Active,
            created_at: now,
            expires_at: now + ttl,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Active session whose deadline has passed
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.status == ReviewStatus::Active && now > self.expires_at
    }

    /// active → expired. Returns whether a transition happened.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_past_expiry(now) {
            return false;
        }
        self.status = ReviewStatus::Expired;
        true
    }

    /// Store running tallies; ignored once terminal
    pub fn record_progress(&mut self, tally: ReviewTally) {
        if self.is_terminal() {
            return;
        }
        self.images_reviewed = tally.reviewed();
        self.images_approved = tally.approved;
        self.images_rejected = tally.rejected;
        self.images_duplicates = tally.duplicates;
    }

    /// Completion rule: reviewed >= total and total > 0
    pub fn is_complete(&self) -> bool {
        self.total_images > 0 && self.images_reviewed >= self.total_images
    }

    /// active → completed when the completion rule holds.
    /// Returns whether a transition happened.
    pub fn try_complete(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_terminal() || !self.is_complete() {
            return false;
        }
        self.status = ReviewStatus::Completed;
        self.completed_at = Some(now);
        true
    }

    /// Rounded percentage, clamped to 100; 0 for an empty session
    pub fn completion_percentage(&self) -> i64 {
        if self.total_images <= 0 {
            return 0;
        }
        let pct = (self.images_reviewed as f64 / self.total_images as f64 * 100.0).round() as i64;
        pct.min(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(total: i64) -> (ReviewSession, DateTime<Utc>) {
        let now = Utc::now();
        (ReviewSession::new("manual", total, Duration::hours(6), now), now)
    }

    #[test]
    fn test_new_session_is_active() {
        let (s, now) = session(10);
        assert_eq!(s.status, ReviewStatus::Active);
        assert_eq!(s.expires_at, now + Duration::hours(6));
        assert!(s.session_id.starts_with("review_"));
    }

    #[test]
    fn test_completes_when_all_reviewed() {
        let (mut s, now) = session(10);
        s.record_progress(ReviewTally { approved: 6, rejected: 3, duplicates: 1 });

        assert!(s.try_complete(now));
        assert_eq!(s.status, ReviewStatus::Completed);
        assert_eq!(s.completion_percentage(), 100);
        assert!(s.completed_at.is_some());
    }

    #[test]
    fn test_partial_progress_stays_active() {
        let (mut s, now) = session(10);
        s.record_progress(ReviewTally { approved: 4, rejected: 0, duplicates: 0 });

        assert!(!s.try_complete(now));
        assert_eq!(s.status, ReviewStatus::Active);
        assert_eq!(s.completion_percentage(), 40);
    }

    #[test]
    fn test_empty_session_never_completes() {
        let (mut s, now) = session(0);
        s.record_progress(ReviewTally::default());

        assert!(!s.try_complete(now));
        assert_eq!(s.completion_percentage(), 0);
    }

    #[test]
    fn test_expires_only_after_deadline() {
        let (mut s, now) = session(5);
        assert!(!s.expire(now));
        assert!(s.expire(now + Duration::hours(7)));
        assert_eq!(s.status, ReviewStatus::Expired);
    }

    #[test]
    fn test_terminal_states_do_not_move() {
        let (mut s, now) = session(2);
        s.record_progress(ReviewTally { approved: 2, rejected: 0, duplicates: 0 });
        assert!(s.try_complete(now));
        let frozen = s.clone();

        // Neither expiry nor new tallies touch a completed session
        assert!(!s.expire(now + Duration::days(1)));
        s.record_progress(ReviewTally { approved: 0, rejected: 0, duplicates: 0 });
        assert!(!s.try_complete(now));
        assert_eq!(s, frozen);

        let (mut e, now) = session(2);
        assert!(e.expire(now + Duration::hours(7)));
        e.record_progress(ReviewTally { approved: 2, rejected: 0, duplicates: 0 });
        assert!(!e.try_complete(now + Duration::hours(8)));
        assert_eq!(e.status, ReviewStatus::Expired);
        assert_eq!(e.images_reviewed, 0);
    }

    #[test]
    fn test_percentage_clamped() {
        let (mut s, _) = session(2);
        s.record_progress(ReviewTally { approved: 3, rejected: 0, duplicates: 0 });
        assert_eq!(s.completion_percentage(), 100);
    }
}

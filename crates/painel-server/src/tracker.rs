//! Work triggered by the scheduled tracking endpoint.
//!
//! The cron handler only knows the [`Tracker`] contract: run once, report an
//! outcome. What gets tracked is up to the implementation.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::storage::{ActivityStorage, StorageError};

/// Errors reported by a tracker run.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Failed(String),
}

/// Summary of one tracker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOutcome {
    /// Number of items the run looked at.
    pub processed: usize,
    pub message: String,
}

#[async_trait]
pub trait Tracker: Send + Sync {
    /// Job name recorded in the run log.
    fn name(&self) -> &str;

    async fn track(&self) -> Result<TrackOutcome, TrackerError>;
}

/// Summarizes recent activity: how many entries and distinct users.
pub struct ActivityTracker {
    activities: Arc<dyn ActivityStorage>,
    window: usize,
}

impl ActivityTracker {
    /// Looks at the newest `window` activity entries on each run.
    #[must_use]
    pub fn new(activities: Arc<dyn ActivityStorage>, window: usize) -> Self {
        Self { activities, window }
    }
}

#[async_trait]
impl Tracker for ActivityTracker {
    fn name(&self) -> &str {
        "activity-summary"
    }

    async fn track(&self) -> Result<TrackOutcome, TrackerError> {
        let recent = self.activities.list_activities(self.window).await?;
        let users: HashSet<&str> = recent.iter().map(|a| a.user_id.as_str()).collect();
        tracing::debug!(
            activities = recent.len(),
            users = users.len(),
            "activity summary computed"
        );
        Ok(TrackOutcome {
            processed: recent.len(),
            message: format!("{} activities from {} users", recent.len(), users.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Activity, MemoryStore};

    #[tokio::test]
    async fn test_activity_tracker_counts_users() {
        let store = Arc::new(MemoryStore::new());
        for (id, name) in [("u1", "ana"), ("u2", "rui"), ("u1", "ana")] {
            store
                .record_activity(Activity::new(id, name, "login"))
                .await
                .unwrap();
        }

        let tracker = ActivityTracker::new(store, 100);
        let outcome = tracker.track().await.unwrap();
        assert_eq!(outcome.processed, 3);
        assert_eq!(outcome.message, "3 activities from 2 users");
    }
}

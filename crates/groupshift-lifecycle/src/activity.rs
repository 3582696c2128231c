//! Scaling activity progress for the operator log.
//!
//! Activities that reached 100% are reported once; in-flight activities
//! are reported on every refresh so the operator sees progress move.

use std::collections::HashSet;

use groupshift_core::Activity;
use tracing::{debug, warn};

use crate::context::OpContext;

/// Remembers which activities of one group already completed.
#[derive(Debug, Default)]
pub struct ActivityTracker {
    completed: HashSet<String>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log lines for every activity not yet reported as complete. Completed
    /// activities are remembered and never reported again.
    pub fn observe(&mut self, group: &str, activities: &[Activity], with_cause: bool) -> Vec<String> {
        let mut lines = Vec::new();
        for activity in activities {
            if self.completed.contains(&activity.activity_id) {
                continue;
            }
            if activity.is_complete() {
                self.completed.insert(activity.activity_id.clone());
            }
            lines.push(format_activity(group, activity, with_cause));
        }
        lines
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }
}

fn format_activity(group: &str, activity: &Activity, with_cause: bool) -> String {
    let mut line = format!(
        "Group [{group}] activity [{}] progress [{} percent] , statuscode [{}]  details [{}]",
        activity.description,
        activity.progress,
        activity.status_code,
        activity.details.as_deref().unwrap_or_default(),
    );
    if with_cause {
        line.push_str(&format!(
            " cause [{}]",
            activity.cause.as_deref().unwrap_or_default()
        ));
    }
    line
}

/// Fetch the latest activities of `group` and write unreported ones to the
/// operator log. Lookup failures are logged and otherwise ignored; there is
/// nothing to do without an attached operator log.
pub async fn refresh(ctx: &OpContext<'_>, group: &str, tracker: &mut ActivityTracker, with_cause: bool) {
    if !ctx.log.is_attached() {
        return;
    }
    ctx.track("Describe Scaling Activities");
    match ctx.client.describe_scaling_activities(group, None).await {
        Ok(page) => {
            let lines = tracker.observe(group, &page.items, with_cause);
            debug!(group, reported = lines.len(), "scaling activities refreshed");
            for line in lines {
                ctx.log.info(&line);
            }
        }
        Err(e) => warn!(group, error = %e, "failed to describe scaling activities"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(id: &str, progress: u8) -> Activity {
        Activity {
            activity_id: id.to_string(),
            description: format!("Launching a new EC2 instance: {id}"),
            details: Some("{}".to_string()),
            progress,
            status_code: if progress == 100 { "Successful" } else { "InProgress" }.to_string(),
            cause: Some("desired capacity changed".to_string()),
        }
    }

    #[test]
    fn completed_activity_reported_once() {
        let mut tracker = ActivityTracker::new();
        let batch = vec![activity("a-1", 100), activity("a-2", 30)];

        assert_eq!(tracker.observe("web__1", &batch, false).len(), 2);
        let second = tracker.observe("web__1", &batch, false);
        assert_eq!(second.len(), 1);
        assert!(second[0].contains("progress [30 percent]"));
        assert_eq!(tracker.completed_count(), 1);
    }

    #[test]
    fn cause_only_when_requested() {
        let mut tracker = ActivityTracker::new();
        let plain = tracker.observe("web__1", &[activity("a-1", 10)], false);
        assert!(!plain[0].contains("cause ["));

        let detailed = tracker.observe("web__1", &[activity("a-1", 10)], true);
        assert!(detailed[0].ends_with("cause [desired capacity changed]"));
        assert!(detailed[0].starts_with("Group [web__1] activity [Launching a new EC2 instance: a-1]"));
    }
}

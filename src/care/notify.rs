//! In-process notification log addressed by role

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::auth::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Urgent,
}

/// Who a notification is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Mother,
    Father,
    Worker,
    All,
}

impl From<Role> for Audience {
    fn from(role: Role) -> Self {
        match role {
            Role::Mother => Audience::Mother,
            Role::Father => Audience::Father,
            Role::HealthWorker => Audience::Worker,
        }
    }
}

impl Audience {
    /// Whether a notification for `self` should be shown to `role`
    pub fn includes(&self, role: Audience) -> bool {
        *self == Audience::All || *self == role
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub target_role: Audience,
}

/// Newest-first notification list
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    next_id: u64,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a notification and return its id
    pub fn notify(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        target: Audience,
        now: DateTime<Utc>,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push_front(Notification {
            id,
            message: message.into(),
            severity,
            timestamp: now,
            read: false,
            target_role: target,
        });
        id
    }

    /// Mark one notification read on behalf of `role`.
    ///
    /// Unknown ids and entries addressed to another role are ignored.
    /// Returns whether a visible entry matched.
    pub fn mark_read(&mut self, id: u64, role: Audience) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|n| n.id == id && n.target_role.includes(role))
        {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    pub fn for_role(&self, role: Audience) -> Vec<Notification> {
        self.entries
            .iter()
            .filter(|n| n.target_role.includes(role))
            .cloned()
            .collect()
    }

    pub fn unread_count(&self, role: Audience) -> usize {
        self.entries
            .iter()
            .filter(|n| !n.read && n.target_role.includes(role))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_prepends_with_increasing_ids() {
        let mut log = NotificationLog::new();
        let now = Utc::now();
        let first = log.notify("first", Severity::Info, Audience::Worker, now);
        let second = log.notify("second", Severity::Urgent, Audience::All, now);
        assert!(second > first);

        let ids: Vec<u64> = log.for_role(Audience::Worker).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_for_role_includes_all() {
        let mut log = NotificationLog::new();
        let now = Utc::now();
        log.notify("for worker", Severity::Warning, Audience::Worker, now);
        log.notify("for father", Severity::Urgent, Audience::Father, now);
        log.notify("broadcast", Severity::Info, Audience::All, now);

        let father: Vec<String> = log
            .for_role(Audience::Father)
            .into_iter()
            .map(|n| n.message)
            .collect();
        assert_eq!(father, vec!["broadcast", "for father"]);
        assert_eq!(log.for_role(Audience::Mother).len(), 1);
        assert_eq!(log.unread_count(Audience::Worker), 2);
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let mut log = NotificationLog::new();
        let id = log.notify("hello", Severity::Info, Audience::Mother, Utc::now());

        assert!(log.mark_read(id, Audience::Mother));
        assert!(log.mark_read(id, Audience::Mother));
        assert!(!log.mark_read(999, Audience::Mother));

        assert_eq!(log.unread_count(Audience::Mother), 0);
        assert!(log.for_role(Audience::Mother).iter().all(|n| n.read));
    }

    #[test]
    fn test_mark_read_only_for_addressed_role() {
        let mut log = NotificationLog::new();
        let now = Utc::now();
        let urgent = log.notify("critical symptoms", Severity::Urgent, Audience::Worker, now);
        let broadcast = log.notify("verified", Severity::Info, Audience::All, now);

        assert!(!log.mark_read(urgent, Audience::Father));
        assert_eq!(log.unread_count(Audience::Worker), 2);

        assert!(log.mark_read(broadcast, Audience::Father));
        assert_eq!(log.unread_count(Audience::Father), 0);
        assert!(log.mark_read(urgent, Audience::Worker));
        assert_eq!(log.unread_count(Audience::Worker), 0);
    }

    #[test]
    fn test_audience_from_role() {
        assert_eq!(Audience::from(Role::HealthWorker), Audience::Worker);
        assert_eq!(Audience::from(Role::Father), Audience::Father);
    }
}

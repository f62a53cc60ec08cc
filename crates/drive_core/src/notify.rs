use std::time::{Duration, Instant};

pub type NotificationId = u64;

pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

/// Lifetime of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    After(Duration),
    /// Never expires; only an explicit dismissal removes it.
    Sticky,
}

impl Default for Ttl {
    fn default() -> Self {
        Ttl::After(DEFAULT_TTL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: Instant,
    pub ttl: Ttl,
}

impl Notification {
    /// `None` for sticky notifications and for lifetimes past the clock's range.
    pub fn deadline(&self) -> Option<Instant> {
        match self.ttl {
            Ttl::After(ttl) => self.created_at.checked_add(ttl),
            Ttl::Sticky => None,
        }
    }
}

/// Ephemeral messages, each with its own expiry deadline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationQueue {
    next_id: NotificationId,
    active: Vec<Notification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        ttl: Ttl,
        now: Instant,
    ) -> NotificationId {
        self.next_id += 1;
        self.active.push(Notification {
            id: self.next_id,
            message: message.into(),
            kind,
            created_at: now,
            ttl,
        });
        self.next_id
    }

    /// Removes a notification early. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    /// Drops every notification whose deadline has passed, returning their ids.
    pub fn expire(&mut self, now: Instant) -> Vec<NotificationId> {
        let mut expired = Vec::new();
        self.active.retain(|n| match n.deadline() {
            Some(deadline) if deadline <= now => {
                expired.push(n.id);
                false
            }
            _ => true,
        });
        expired
    }

    pub fn active(&self) -> &[Notification] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

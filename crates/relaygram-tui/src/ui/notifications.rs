// Status bar toasts with priorities and auto-dismiss

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "ℹ",
            NotificationLevel::Success => "✓",
            NotificationLevel::Warning => "⚠",
            NotificationLevel::Error => "✗",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub duration: Duration,
    pub shown_at: Option<Instant>,
}

impl Notification {
    fn new(message: impl Into<String>, level: NotificationLevel, secs: u64) -> Self {
        Self {
            message: message.into(),
            level,
            duration: Duration::from_secs(secs),
            shown_at: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NotificationLevel::Info, 3)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, NotificationLevel::Success, 3)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, NotificationLevel::Warning, 4)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NotificationLevel::Error, 5)
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.shown_at
            .map(|shown| shown.elapsed() >= self.duration)
            .unwrap_or(false)
    }

    fn mark_shown(&mut self) {
        if self.shown_at.is_none() {
            self.shown_at = Some(Instant::now());
        }
    }
}

/// One visible toast at a time. Higher levels pre-empt the current one;
/// an identical message pushed within 2s is dropped.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    queue: VecDeque<Notification>,
    current: Option<Notification>,
    recent: Vec<(String, Instant)>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        let now = Instant::now();
        self.recent.retain(|(_, expiry)| *expiry > now);
        if self.recent.iter().any(|(m, _)| *m == notification.message) {
            return;
        }
        self.recent
            .push((notification.message.clone(), now + Duration::from_secs(2)));

        let mut notification = notification;
        match &self.current {
            None => {
                notification.mark_shown();
                self.current = Some(notification);
            }
            Some(current) if notification.level > current.level => {
                notification.mark_shown();
                self.current = Some(notification);
            }
            Some(_) => {
                let pos = self
                    .queue
                    .iter()
                    .position(|n| n.level < notification.level)
                    .unwrap_or(self.queue.len());
                self.queue.insert(pos, notification);
            }
        }
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
        self.advance();
    }

    pub fn tick(&mut self) {
        if self.current.as_ref().is_some_and(Notification::is_expired) {
            self.current = None;
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.current.is_none() {
            if let Some(mut next) = self.queue.pop_front() {
                next.mark_shown();
                self.current = Some(next);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_shows_first_and_advances() {
        let mut q = NotificationQueue::new();
        assert!(q.is_empty());

        q.push(Notification::info("first"));
        q.push(Notification::info("second"));
        assert_eq!(q.current().unwrap().message, "first");

        q.dismiss();
        assert_eq!(q.current().unwrap().message, "second");
        q.dismiss();
        assert!(q.is_empty());
    }

    #[test]
    fn error_preempts_info() {
        let mut q = NotificationQueue::new();
        q.push(Notification::info("sent"));
        q.push(Notification::error("failed"));
        assert_eq!(q.current().unwrap().level, NotificationLevel::Error);
        q.dismiss();
        assert!(q.current().is_none());
    }

    #[test]
    fn duplicates_are_dropped() {
        let mut q = NotificationQueue::new();
        q.push(Notification::warning("offline"));
        q.push(Notification::warning("offline"));
        q.dismiss();
        assert!(q.is_empty());
    }

    #[test]
    fn expired_notification_is_cleared_on_tick() {
        let mut q = NotificationQueue::new();
        q.push(Notification::info("gone").duration(Duration::ZERO));
        q.tick();
        assert!(q.current().is_none());
    }
}

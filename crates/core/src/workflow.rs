use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppView {
    Landing,
    Connect,
    Schema,
    Editor,
}

impl AppView {
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Landing => "Welcome",
            Self::Connect => "Connections",
            Self::Schema => "Schema",
            Self::Editor => "Query Editor",
        }
    }

    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Landing => Some(Self::Connect),
            Self::Connect => Some(Self::Schema),
            Self::Schema => Some(Self::Editor),
            Self::Editor => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransition {
    pub target: AppView,
    pub delay: Duration,
}

impl PendingTransition {
    #[must_use]
    pub fn new(target: AppView, delay: Duration) -> Self {
        Self { target, delay }
    }

    #[must_use]
    pub fn schedule(self, now: Instant) -> ScheduledTransition {
        ScheduledTransition {
            target: self.target,
            ready_at: now + self.delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTransition {
    pub target: AppView,
    pub ready_at: Instant,
}

impl ScheduledTransition {
    #[must_use]
    pub fn poll(&self, now: Instant) -> Option<AppView> {
        (now >= self.ready_at).then_some(self.target)
    }
}

use chrono::{DateTime, Duration, FixedOffset, Utc};

use super::session::DEFAULT_USER;

/// How the repository interprets the timestamps it stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerClock {
    /// Timestamps are UTC.
    #[default]
    Utc,
    /// The repository records wall-clock time at the given offset but labels it UTC.
    Local(FixedOffset),
}

impl ServerClock {
    /// Converts an instant into the value the repository stores for it.
    ///
    /// With [`ServerClock::Local`] the instant is shifted by the server's offset, so that
    /// formatting the result with a `Z` suffix yields the server's wall-clock reading.
    pub fn to_server(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ServerClock::Utc => instant,
            ServerClock::Local(offset) => instant + Duration::seconds(i64::from(offset.local_minus_utc())),
        }
    }
}

/// Settings of a [`DocumentManager`](super::DocumentManager).
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub(crate) repository_id: String,
    pub(crate) root_path: String,
    pub(crate) server_clock: ServerClock,
    pub(crate) default_user: String,
}

impl ManagerConfig {
    pub fn new(repository_id: impl Into<String>) -> Self {
        ManagerConfig {
            repository_id: repository_id.into(),
            root_path: "/".to_string(),
            server_clock: ServerClock::Utc,
            default_user: DEFAULT_USER.to_string(),
        }
    }

    /// Folder under which process folders are created. Defaults to the repository root.
    #[must_use]
    pub fn root_path(mut self, path: impl Into<String>) -> Self {
        self.root_path = path.into();
        self
    }

    #[must_use]
    pub fn server_clock(mut self, clock: ServerClock) -> Self {
        self.server_clock = clock;
        self
    }

    /// User whose session serves calls that do not name one.
    #[must_use]
    pub fn default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = user.into();
        self
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }
}

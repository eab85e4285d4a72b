use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::{Error, Result};
use crate::repository::{Credentials, RepositoryConnector, RepositoryError, RepositorySession, SessionParameters};

/// User the manager acts as unless told otherwise.
pub const DEFAULT_USER: &str = "SYSTEM";

/// Supplies repository credentials for logical users.
pub trait CredentialsProvider: Send + Sync + fmt::Debug {
    fn credentials(&self, user: &str) -> Option<Credentials>;
}

/// Fixed passwords: one per known user, plus an optional fallback for everyone else.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    fallback: Option<SecretString>,
    users: HashMap<String, SecretString>,
}

impl StaticCredentials {
    /// Accepts every user name with the same password.
    pub fn new(password: impl Into<String>) -> Self {
        StaticCredentials {
            fallback: Some(SecretString::from(password.into())),
            users: HashMap::new(),
        }
    }

    /// Knows only the users added with [`StaticCredentials::with_user`].
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(user.into(), SecretString::from(password.into()));
        self
    }
}

impl CredentialsProvider for StaticCredentials {
    fn credentials(&self, user: &str) -> Option<Credentials> {
        let password = self.users.get(user).or(self.fallback.as_ref())?;
        Some(Credentials { user: user.to_string(), password: password.clone() })
    }
}

/// Open sessions keyed by user. At most one session is opened per user.
#[derive(Default)]
pub(crate) struct SessionTable {
    sessions: Mutex<HashMap<String, Arc<dyn RepositorySession>>>,
}

impl fmt::Debug for SessionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTable").finish_non_exhaustive()
    }
}

impl SessionTable {
    #[instrument(skip(self, connector, credentials))]
    pub(crate) async fn get_or_connect(
        &self,
        connector: &dyn RepositoryConnector,
        credentials: &dyn CredentialsProvider,
        repository_id: &str,
        user: &str,
    ) -> Result<Arc<dyn RepositorySession>> {
        // The lock is held across connect so that concurrent callers share one session.
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(user) {
            return Ok(session.clone());
        }
        let credentials = credentials.credentials(user).ok_or_else(|| {
            Error::Repository(RepositoryError::InvalidArgument(format!("no credentials for user '{}'", user)))
        })?;
        let parameters = SessionParameters { repository_id: repository_id.to_string(), credentials };
        let session = connector.connect(&parameters).await.map_err(Error::Repository)?;
        debug!("Opened session");
        sessions.insert(user.to_string(), session.clone());
        Ok(session)
    }

    pub(crate) async fn clear(&self) {
        self.sessions.lock().await.clear();
    }

    pub(crate) async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

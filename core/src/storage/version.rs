//! Check-out/check-in workflow for creating document versions.
//!
//! The workflow is a small state machine over one version series:
//!
//! ```text
//! Latest --check_out--> CheckedOut --check_in--> NewLatest
//!                                  \--failure--> Cancelled (check-out cancelled)
//! ```
//!
//! Each state is its own type and every transition consumes the previous state. A
//! [`CheckedOut`] can only be left through [`CheckedOut::check_in`], which either commits the
//! working copy or cancels the check-out before reporting the failure.

use tracing::{debug, error, instrument};

use super::document::content_stream;
use super::{Error, Result};
use crate::model::{Content, ObjectId};
use crate::repository::{CheckIn, NativeDocument, RepositorySession};

#[derive(Debug, Clone, Default)]
pub(crate) struct VersionRequest {
    pub(crate) major: bool,
    pub(crate) content: Option<Content>,
}

/// Tip of a version series.
#[derive(Debug)]
pub(crate) struct Latest<'a> {
    session: &'a dyn RepositorySession,
    document: NativeDocument,
}

/// A series with an open private working copy.
#[derive(Debug)]
#[must_use = "a checked-out series must be checked in or cancelled"]
pub(crate) struct CheckedOut<'a> {
    session: &'a dyn RepositorySession,
    name: String,
    working_copy: ObjectId,
}

#[derive(Debug)]
#[must_use]
pub(crate) enum CheckInOutcome {
    NewLatest(ObjectId),
    /// The check-out was cancelled; carries the failure that caused it.
    Cancelled(Error),
}

impl<'a> Latest<'a> {
    /// Resolves the tip of the series `document_id` belongs to. Older versions are never used
    /// as a base, even when addressed directly.
    pub(crate) async fn resolve(session: &'a dyn RepositorySession, document_id: &ObjectId) -> Result<Self> {
        let document = session
            .get_object(document_id)
            .await?
            .into_document()
            .ok_or_else(|| Error::NotFound(document_id.to_string()))?;
        let document = if document.is_latest_version {
            document
        } else {
            debug!(%document_id, "Not the latest version, switching to the series tip");
            session.get_latest_version(document_id).await?
        };
        Ok(Latest { session, document })
    }

    pub(crate) async fn check_out(self) -> Result<CheckedOut<'a>> {
        let working_copy = self
            .session
            .check_out(&self.document.id)
            .await
            .map_err(|e| Error::from_creation(format!("cannot check out {}", self.document.id), e))?;
        debug!(%working_copy, "Checked out");
        Ok(CheckedOut { session: self.session, name: self.document.name, working_copy })
    }
}

impl CheckedOut<'_> {
    pub(crate) async fn check_in(self, request: VersionRequest) -> CheckInOutcome {
        match self.commit(request).await {
            Ok(version_id) => CheckInOutcome::NewLatest(version_id),
            Err(cause) => self.cancel(cause).await,
        }
    }

    async fn commit(&self, request: VersionRequest) -> Result<ObjectId> {
        let content = content_stream(request.content.unwrap_or_default())?;
        let check_in = CheckIn { major: request.major, name: Some(self.name.clone()), content: Some(content) };
        self.session
            .check_in(&self.working_copy, check_in)
            .await
            .map_err(|e| Error::from_creation(format!("cannot check in {}", self.working_copy), e))
    }

    async fn cancel(self, cause: Error) -> CheckInOutcome {
        debug!(working_copy = %self.working_copy, %cause, "Cancelling check-out");
        if let Err(e) = self.session.cancel_check_out(&self.working_copy).await {
            error!(working_copy = %self.working_copy, error = %e, "Failed to cancel check-out");
        }
        CheckInOutcome::Cancelled(cause)
    }
}

/// Creates a new version of the series `document_id` belongs to and returns it.
#[instrument(skip(session, request), fields(major = request.major))]
pub(crate) async fn create_version(
    session: &dyn RepositorySession,
    document_id: &ObjectId,
    request: VersionRequest,
) -> Result<NativeDocument> {
    let checked_out = Latest::resolve(session, document_id).await?.check_out().await?;
    match checked_out.check_in(request).await {
        CheckInOutcome::NewLatest(version_id) => {
            // Ids may be renumbered on check-in; never reuse state from before it.
            session.invalidate();
            session
                .get_object(&version_id)
                .await?
                .into_document()
                .ok_or_else(|| Error::InvariantViolation(format!("new version {} is not a document", version_id)))
        }
        CheckInOutcome::Cancelled(cause) => Err(cause),
    }
}

//! Structured document search.
//!
//! A [`SearchQuery`] is an ordered list of criteria and logical operators, kept exactly in
//! the order the caller supplied them. The [`DocumentManager`](crate::storage::DocumentManager)
//! compiles it into a repository query statement; see [`DocumentManager::search`].
//!
//! [`DocumentManager::search`]: crate::storage::DocumentManager::search
//!
//! ```
//! use folio_core::search::{Criterion, SearchQuery};
//!
//! let query = SearchQuery::new()
//!     .criterion(Criterion::process_instance("invoice--12"))
//!     .and()
//!     .criterion(Criterion::name_in(["scan", "receipt"]))
//!     .latest_version();
//! assert_eq!(query.tokens().len(), 3);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Document, ProcessDefinitionId, ProcessInstanceId};

/// Value side of an equality or membership criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    Equals(String),
    In(Vec<String>),
}

impl From<&str> for Match {
    fn from(value: &str) -> Self {
        Match::Equals(value.to_string())
    }
}

impl From<String> for Match {
    fn from(value: String) -> Self {
        Match::Equals(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMatch {
    /// Exact instant, compared at millisecond resolution.
    At(DateTime<Utc>),
    /// Inclusive on both ends.
    Between { from: DateTime<Utc>, to: DateTime<Utc> },
}

/// One searchable field together with the value it must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    Id(Match),
    Name(Match),
    FileName(Match),
    Author(Match),
    CreationDate(DateMatch),
    LastModificationDate(DateMatch),
    /// Documents anywhere below the definition folder, instance folders included.
    ProcessDefinition(ProcessDefinitionId),
    /// Documents filed directly in the definition folder.
    ProcessDefinitionWithoutInstances(ProcessDefinitionId),
    ProcessInstance(ProcessInstanceId),
    /// `true` for documents without content bytes.
    IsEmpty(bool),
    LatestVersion,
}

impl Criterion {
    pub fn id(value: impl Into<String>) -> Self {
        Criterion::Id(Match::Equals(value.into()))
    }

    pub fn name(value: impl Into<String>) -> Self {
        Criterion::Name(Match::Equals(value.into()))
    }

    pub fn name_in<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Criterion::Name(Match::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn file_name(value: impl Into<String>) -> Self {
        Criterion::FileName(Match::Equals(value.into()))
    }

    pub fn author(value: impl Into<String>) -> Self {
        Criterion::Author(Match::Equals(value.into()))
    }

    pub fn process_definition(value: impl Into<ProcessDefinitionId>) -> Self {
        Criterion::ProcessDefinition(value.into())
    }

    pub fn process_instance(value: impl Into<ProcessInstanceId>) -> Self {
        Criterion::ProcessInstance(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchToken {
    Criterion(Criterion),
    And,
    Or,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    tokens: Vec<SearchToken>,
    all_versions: bool,
}

impl SearchQuery {
    /// An empty query matches the latest version of every document.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.tokens.push(SearchToken::Criterion(criterion));
        self
    }

    #[must_use]
    pub fn and(mut self) -> Self {
        self.tokens.push(SearchToken::And);
        self
    }

    #[must_use]
    pub fn or(mut self) -> Self {
        self.tokens.push(SearchToken::Or);
        self
    }

    /// Restricts matches to the latest version of each series (the default).
    #[must_use]
    pub fn latest_version(mut self) -> Self {
        self.all_versions = false;
        self
    }

    /// Matches every version, not only the latest.
    #[must_use]
    pub fn all_versions(mut self) -> Self {
        self.all_versions = true;
        self
    }

    pub fn tokens(&self) -> &[SearchToken] {
        &self.tokens
    }

    pub fn searches_all_versions(&self) -> bool {
        self.all_versions
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// One page of search hits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub documents: Vec<Document>,
    /// Number of matches across all pages.
    pub total_count: u64,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

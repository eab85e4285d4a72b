use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::config::ServerClock;
use super::path_cache::PathCache;
use super::{Result, folder};
use crate::model::ObjectId;
use crate::repository::RepositorySession;
use crate::search::{Criterion, DateMatch, Match, SearchQuery, SearchToken};

/// Outcome of compiling a [`SearchQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CompiledQuery {
    Statement { statement: String, all_versions: bool },
    /// A criterion names a process folder that does not exist, so nothing can match.
    Empty,
}

/// Quotes a string literal, escaping quotes and backslashes.
pub(crate) fn string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            literal.push('\\');
        }
        literal.push(c);
    }
    literal.push('\'');
    literal
}

pub(crate) fn timestamp_literal(clock: ServerClock, instant: DateTime<Utc>) -> String {
    format!("TIMESTAMP '{}'", clock.to_server(instant).format("%Y-%m-%dT%H:%M:%S%.3fZ"))
}

fn match_clause(field: &str, value: &Match) -> String {
    match value {
        Match::Equals(v) => format!("{} = {}", field, string_literal(v)),
        Match::In(values) => {
            let list: Vec<String> = values.iter().map(|v| string_literal(v)).collect();
            format!("{} IN ({})", field, list.join(","))
        }
    }
}

fn date_clause(field: &str, value: &DateMatch, clock: ServerClock) -> String {
    match value {
        DateMatch::At(at) => format!("{} = {}", field, timestamp_literal(clock, *at)),
        DateMatch::Between { from, to } => format!(
            "({field} >= {} AND {field} <= {})",
            timestamp_literal(clock, *from),
            timestamp_literal(clock, *to),
        ),
    }
}

fn folder_clause(predicate: &str, folder_id: &ObjectId) -> String {
    format!("{}({})", predicate, string_literal(folder_id.as_str()))
}

/// Compiles search queries against one session.
pub(crate) struct QueryTranslator<'a> {
    pub(crate) session: &'a dyn RepositorySession,
    pub(crate) cache: &'a PathCache,
    pub(crate) root_id: &'a ObjectId,
    pub(crate) clock: ServerClock,
}

impl QueryTranslator<'_> {
    #[instrument(skip_all, fields(tokens = query.tokens().len()))]
    pub(crate) async fn compile(&self, query: &SearchQuery) -> Result<CompiledQuery> {
        let mut fragments = Vec::with_capacity(query.tokens().len());
        for token in query.tokens() {
            let fragment = match token {
                SearchToken::And => "AND".to_string(),
                SearchToken::Or => "OR".to_string(),
                SearchToken::Criterion(criterion) => match self.criterion(criterion).await? {
                    Some(fragment) => fragment,
                    None => {
                        debug!(?criterion, "Process folder does not exist, query cannot match");
                        return Ok(CompiledQuery::Empty);
                    }
                },
            };
            fragments.push(fragment);
        }

        let mut statement = String::from("SELECT * FROM cmis:document");
        if !fragments.is_empty() {
            statement.push_str(" WHERE ");
            statement.push_str(&fragments.join(" "));
        }
        debug!(%statement, "Compiled search query");
        Ok(CompiledQuery::Statement { statement, all_versions: query.searches_all_versions() })
    }

    /// `None` when the criterion refers to a process folder that cannot be found.
    async fn criterion(&self, criterion: &Criterion) -> Result<Option<String>> {
        let clock = self.clock;
        Ok(Some(match criterion {
            Criterion::Id(value) => match_clause("cmis:objectId", value),
            Criterion::Name(value) => match_clause("cmis:name", value),
            Criterion::FileName(value) => match_clause("cmis:contentStreamFileName", value),
            Criterion::Author(value) => match_clause("cmis:createdBy", value),
            Criterion::CreationDate(value) => date_clause("cmis:creationDate", value, clock),
            Criterion::LastModificationDate(value) => date_clause("cmis:lastModificationDate", value, clock),
            Criterion::ProcessDefinition(definition) => {
                match self.cache.lookup_definition(self.session, self.root_id, definition).await? {
                    Some(id) => folder_clause("IN_TREE", &id),
                    None => return Ok(None),
                }
            }
            Criterion::ProcessDefinitionWithoutInstances(definition) => {
                match self.cache.lookup_definition(self.session, self.root_id, definition).await? {
                    Some(id) => folder_clause("IN_FOLDER", &id),
                    None => return Ok(None),
                }
            }
            Criterion::ProcessInstance(instance) => {
                let id = match self.cache.validated_instance(self.session, instance).await? {
                    Some(id) => id,
                    None => {
                        let folders = folder::find_folders(self.session, instance.as_str()).await?;
                        let Some(found) = folders.into_iter().next() else {
                            return Ok(None);
                        };
                        self.cache.remember_instance(instance, &found.id).await;
                        found.id
                    }
                };
                folder_clause("IN_FOLDER", &id)
            }
            Criterion::IsEmpty(true) => "cmis:contentStreamLength = 0".to_string(),
            Criterion::IsEmpty(false) => "cmis:contentStreamLength > 0".to_string(),
            Criterion::LatestVersion => "cmis:isLatestVersion = true".to_string(),
        }))
    }
}

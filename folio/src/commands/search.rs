use anyhow::Result;
use folio_core::search::{Criterion, DateMatch, Match, SearchQuery};

use crate::AppContext;
use crate::cli::SearchArgs;

pub async fn handle_search(args: SearchArgs, cx: &AppContext) -> Result<()> {
    let manager = cx.manager().await?;
    let query = build_query(&args);
    let result = manager.search(&query, args.offset, args.limit).await?;
    cx.output.search_result(&result, args.offset)
}

/// Combines the given filters with AND.
pub fn build_query(args: &SearchArgs) -> SearchQuery {
    let mut criteria = Vec::new();

    match args.name.as_slice() {
        [] => {}
        [name] => criteria.push(Criterion::name(name.as_str())),
        names => criteria.push(Criterion::name_in(names.iter().cloned())),
    }
    match args.id.as_slice() {
        [] => {}
        [id] => criteria.push(Criterion::id(id.as_str())),
        ids => criteria.push(Criterion::Id(Match::In(ids.to_vec()))),
    }
    if let Some(file_name) = &args.file_name {
        criteria.push(Criterion::file_name(file_name.as_str()));
    }
    if let Some(author) = &args.author {
        criteria.push(Criterion::author(author.as_str()));
    }
    if let Some(definition) = &args.process {
        criteria.push(Criterion::process_definition(definition.as_str()));
    }
    if let Some(definition) = &args.without_instances {
        criteria.push(Criterion::ProcessDefinitionWithoutInstances(definition.as_str().into()));
    }
    if let Some(instance) = &args.instance {
        criteria.push(Criterion::process_instance(instance.as_str()));
    }
    if args.empty {
        criteria.push(Criterion::IsEmpty(true));
    } else if args.not_empty {
        criteria.push(Criterion::IsEmpty(false));
    }
    if let (Some(from), Some(to)) = (args.created_from, args.created_to) {
        criteria.push(Criterion::CreationDate(DateMatch::Between { from, to }));
    }
    if args.latest {
        criteria.push(Criterion::LatestVersion);
    }

    let mut query = SearchQuery::new();
    for (i, criterion) in criteria.into_iter().enumerate() {
        if i > 0 {
            query = query.and();
        }
        query = query.criterion(criterion);
    }
    if args.all_versions { query.all_versions() } else { query.latest_version() }
}

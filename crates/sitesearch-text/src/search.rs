use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{DocAddress, Index, Searcher, TantivyDocument};

use sitesearch_core::error::{Error, Result};
use sitesearch_core::traits::IndexSearcher;
use sitesearch_core::types::{HitFilter, SearchHit, SearchQuery};

use crate::tantivy_utils::SchemaFields;

/// Point-in-time view of a tantivy index.
pub struct TantivyIndexSearcher {
	name: String,
	index: Index,
	searcher: Searcher,
	fields: SchemaFields,
}

impl TantivyIndexSearcher {
	pub fn new(name: &str, index: Index, searcher: Searcher, fields: SchemaFields) -> Self {
		Self { name: name.to_string(), index, searcher, fields }
	}

	fn build_query(&self, query: &SearchQuery) -> Result<Box<dyn Query>> {
		let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
		for (name, value) in &query.conditions {
			let term = self.fields.exact_term(name, value).ok_or_else(|| Error::UnknownField(name.clone()))?;
			clauses.push((Occur::Must, Box::new(TermQuery::new(term, IndexRecordOption::Basic))));
		}
		if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
			let parser = QueryParser::for_index(&self.index, vec![self.fields.content, self.fields.custom_text]);
			let parsed = parser.parse_query(text).map_err(|e| Error::InvalidQuery(format!("'{}': {}", text, e)))?;
			clauses.push((Occur::Must, parsed));
		}
		Ok(match clauses.len() {
			0 => Box::new(AllQuery),
			1 => clauses.remove(0).1,
			_ => Box::new(BooleanQuery::new(clauses)),
		})
	}

	/// Ranked addresses for free-text queries, index order otherwise.
	fn collect(&self, query: &SearchQuery, tantivy_query: &dyn Query, limit: usize) -> tantivy::Result<Vec<(f32, DocAddress)>> {
		let has_text = query.text.as_deref().is_some_and(|t| !t.trim().is_empty());
		if has_text {
			return self.searcher.search(tantivy_query, &TopDocs::with_limit(limit.max(1)));
		}
		let mut addresses: Vec<DocAddress> = self.searcher.search(tantivy_query, &DocSetCollector)?.into_iter().collect();
		addresses.sort_by_key(|a| (a.segment_ord, a.doc_id));
		Ok(addresses.into_iter().map(|a| (1.0, a)).collect())
	}
}

impl IndexSearcher for TantivyIndexSearcher {
	fn search(&self, query: &SearchQuery, filter: Option<&HitFilter>, limit: usize) -> Result<Vec<SearchHit>> {
		if limit == 0 {
			return Ok(Vec::new());
		}
		let tantivy_query = self.build_query(query)?;
		// A post-filter may discard ranked hits, so rank the whole index then.
		let ranked_limit = if filter.is_some() { self.searcher.num_docs() as usize } else { limit };
		let addresses = self.collect(query, tantivy_query.as_ref(), ranked_limit).map_err(|e| Error::unavailable(&self.name, e))?;

		let mut hits = Vec::new();
		for (score, address) in addresses {
			let doc: TantivyDocument = self.searcher.doc(address).map_err(|e| Error::unavailable(&self.name, e))?;
			let hit = self.fields.to_hit(&doc, score, hits.len());
			if filter.is_some_and(|f| !f.matches(&hit)) {
				continue;
			}
			hits.push(hit);
			if hits.len() == limit {
				break;
			}
		}
		tracing::debug!(index = %self.name, query = %query, hits = hits.len(), "search");
		Ok(hits)
	}

	fn number_of_documents(&self) -> Result<u64> {
		Ok(self.searcher.num_docs())
	}
}

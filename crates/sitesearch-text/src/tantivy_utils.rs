use std::collections::BTreeMap;

use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::{Index, TantivyDocument, Term};

use sitesearch_core::types::{field, SearchHit, SearchableDocument};

pub const TOKENIZER_NAME: &str = "text_with_stopwords";
/// Tokenized, unstored concatenation of categorical values.
pub const CUSTOM_TEXT_FIELD: &str = "_custom";
/// Stored JSON object of categorical values.
pub const CUSTOM_JSON_FIELD: &str = "_fields";
/// Untokenized `name=value` term per categorical value.
pub const CUSTOM_TERM_FIELD: &str = "_kv";

/// Keyword fields whose values are lower-cased on write and on lookup.
const CASE_FOLDED: [&str; 3] = [field::CLASS_NAME, field::SITE_NAME, field::CULTURE];

#[derive(Debug, Clone, Copy)]
pub struct SchemaFields {
	pub identity: Field,
	pub class_name: Field,
	pub node_id: Field,
	pub document_id: Field,
	pub linked_node_id: Field,
	pub alias_path: Field,
	pub site_name: Field,
	pub site_id: Field,
	pub culture: Field,
	pub content: Field,
	pub custom_text: Field,
	pub custom_json: Field,
	pub custom_terms: Field,
}

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	for name in [
		field::IDENTITY,
		field::CLASS_NAME,
		field::NODE_ID,
		field::DOCUMENT_ID,
		field::LINKED_NODE_ID,
		field::ALIAS_PATH,
		field::SITE_NAME,
		field::SITE_ID,
		field::CULTURE,
	] {
		schema_builder.add_text_field(name, STRING | STORED);
	}
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing.clone()).set_stored();
	schema_builder.add_text_field(field::CONTENT, text_options);
	schema_builder.add_text_field(CUSTOM_TEXT_FIELD, TextOptions::default().set_indexing_options(text_field_indexing));
	schema_builder.add_text_field(CUSTOM_JSON_FIELD, STORED);
	schema_builder.add_text_field(CUSTOM_TERM_FIELD, STRING);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}

/// Lower-case the value of a case-folded keyword field.
pub fn normalize_keyword(name: &str, value: &str) -> String {
	if CASE_FOLDED.contains(&name) { value.to_ascii_lowercase() } else { value.to_string() }
}

/// Text of the exact term indexed for a categorical value.
pub fn custom_term(name: &str, value: &str) -> String {
	format!("{}={}", name.to_ascii_lowercase(), value)
}

impl SchemaFields {
	pub fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			identity: schema.get_field(field::IDENTITY)?,
			class_name: schema.get_field(field::CLASS_NAME)?,
			node_id: schema.get_field(field::NODE_ID)?,
			document_id: schema.get_field(field::DOCUMENT_ID)?,
			linked_node_id: schema.get_field(field::LINKED_NODE_ID)?,
			alias_path: schema.get_field(field::ALIAS_PATH)?,
			site_name: schema.get_field(field::SITE_NAME)?,
			site_id: schema.get_field(field::SITE_ID)?,
			culture: schema.get_field(field::CULTURE)?,
			content: schema.get_field(field::CONTENT)?,
			custom_text: schema.get_field(CUSTOM_TEXT_FIELD)?,
			custom_json: schema.get_field(CUSTOM_JSON_FIELD)?,
			custom_terms: schema.get_field(CUSTOM_TERM_FIELD)?,
		})
	}

	fn keywords(&self) -> [(&'static str, Field); 9] {
		[
			(field::IDENTITY, self.identity),
			(field::CLASS_NAME, self.class_name),
			(field::NODE_ID, self.node_id),
			(field::DOCUMENT_ID, self.document_id),
			(field::LINKED_NODE_ID, self.linked_node_id),
			(field::ALIAS_PATH, self.alias_path),
			(field::SITE_NAME, self.site_name),
			(field::SITE_ID, self.site_id),
			(field::CULTURE, self.culture),
		]
	}

	/// Untokenized field usable for exact term lookups and deletes.
	pub fn keyword(&self, name: &str) -> Option<Field> {
		self.keywords().into_iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, f)| f)
	}

	/// Exact term matching `name = value`, either on a keyword field or on a
	/// categorical value. `None` for fields that are only indexed tokenized.
	pub fn exact_term(&self, name: &str, value: &str) -> Option<Term> {
		if let Some((canonical, f)) = self.keywords().into_iter().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
			return Some(Term::from_field_text(f, &normalize_keyword(canonical, value)));
		}
		let reserved = [field::CONTENT, CUSTOM_TEXT_FIELD, CUSTOM_JSON_FIELD, CUSTOM_TERM_FIELD];
		if name.trim().is_empty() || reserved.iter().any(|r| r.eq_ignore_ascii_case(name)) {
			return None;
		}
		Some(Term::from_field_text(self.custom_terms, &custom_term(name, value)))
	}

	pub fn to_document(&self, doc: &SearchableDocument) -> serde_json::Result<TantivyDocument> {
		let mut out = TantivyDocument::default();
		out.add_text(self.identity, &doc.identity);
		out.add_text(self.class_name, normalize_keyword(field::CLASS_NAME, &doc.class_name));
		out.add_text(self.node_id, doc.node_id.to_string());
		out.add_text(self.document_id, doc.document_id.to_string());
		if let Some(linked) = doc.linked_node_id {
			out.add_text(self.linked_node_id, linked.to_string());
		}
		out.add_text(self.alias_path, &doc.alias_path);
		out.add_text(self.site_name, normalize_keyword(field::SITE_NAME, &doc.site_name));
		out.add_text(self.site_id, doc.site_id.to_string());
		out.add_text(self.culture, normalize_keyword(field::CULTURE, &doc.culture));
		out.add_text(self.content, &doc.content);
		if !doc.fields.is_empty() {
			let joined: Vec<&str> = doc.fields.values().map(String::as_str).collect();
			out.add_text(self.custom_text, joined.join(" "));
			out.add_text(self.custom_json, serde_json::to_string(&doc.fields)?);
			for (name, value) in &doc.fields {
				out.add_text(self.custom_terms, custom_term(name, value));
			}
		}
		Ok(out)
	}

	/// Snapshot of the stored fields of an index document.
	pub fn to_hit(&self, doc: &TantivyDocument, score: f32, position: usize) -> SearchHit {
		let mut fields = BTreeMap::new();
		if let Some(raw) = doc.get_first(self.custom_json).and_then(|v| v.as_str()) {
			match serde_json::from_str::<BTreeMap<String, String>>(raw) {
				Ok(custom) => fields.extend(custom),
				Err(e) => tracing::warn!(error = %e, "ignoring unreadable categorical fields"),
			}
		}
		for (name, f) in self.keywords().into_iter().chain([(field::CONTENT, self.content)]) {
			if let Some(value) = doc.get_first(f).and_then(|v| v.as_str()) {
				fields.insert(name.to_string(), value.to_string());
			}
		}
		let identity = fields.get(field::IDENTITY).cloned().unwrap_or_default();
		SearchHit { identity, fields, score, position }
	}
}

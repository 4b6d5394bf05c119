use std::path::Path;
use std::sync::Arc;

use tantivy::directory::MmapDirectory;
use tantivy::merge_policy::NoMergePolicy;
use tantivy::{Index, IndexReader, ReloadPolicy, Term};
use tracing::debug;

use sitesearch_core::error::{Error, Result};
use sitesearch_core::traits::{IndexBackend, IndexSearcher, IndexWriter};
use sitesearch_core::types::SearchableDocument;

use crate::search::TantivyIndexSearcher;
use crate::tantivy_utils::{build_schema, register_tokenizer, SchemaFields};

/// A tantivy index serving one index descriptor.
pub struct TantivyBackend {
	name: String,
	index: Index,
	reader: IndexReader,
	fields: SchemaFields,
	writer_memory_bytes: usize,
}

impl TantivyBackend {
	/// Open the index in `index_dir`, creating it when the directory holds none.
	pub fn open(name: &str, index_dir: &Path, writer_memory_bytes: usize) -> Result<Self> {
		std::fs::create_dir_all(index_dir).map_err(|e| Error::unavailable(name, e))?;
		let directory = MmapDirectory::open(index_dir).map_err(|e| Error::unavailable(name, e))?;
		let index = Index::open_or_create(directory, build_schema()).map_err(|e| Error::unavailable(name, e))?;
		Self::from_index(name, index, writer_memory_bytes)
	}

	pub fn in_ram(name: &str, writer_memory_bytes: usize) -> Result<Self> {
		Self::from_index(name, Index::create_in_ram(build_schema()), writer_memory_bytes)
	}

	fn from_index(name: &str, index: Index, writer_memory_bytes: usize) -> Result<Self> {
		register_tokenizer(&index);
		let fields = SchemaFields::from_schema(&index.schema()).map_err(|e| Error::unavailable(name, e))?;
		let reader = index
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()
			.map_err(|e| Error::unavailable(name, e))?;
		Ok(Self { name: name.to_string(), index, reader, fields, writer_memory_bytes })
	}

	pub fn name(&self) -> &str { &self.name }
}

impl IndexBackend for TantivyBackend {
	fn open_writer(&self, full: bool) -> Result<Box<dyn IndexWriter>> {
		let acquisition = |e: tantivy::TantivyError| Error::WriterAcquisitionFailed { index: self.name.clone(), reason: e.to_string() };
		let writer: tantivy::IndexWriter = self.index.writer_with_num_threads(1, self.writer_memory_bytes).map_err(acquisition)?;
		if full {
			// Merges run only through an explicit optimize pass.
			writer.set_merge_policy(Box::new(NoMergePolicy));
			writer.delete_all_documents().map_err(acquisition)?;
		}
		debug!(index = %self.name, full, "opened tantivy writer");
		Ok(Box::new(TantivyIndexWriter { name: self.name.clone(), index: self.index.clone(), writer, fields: self.fields }))
	}

	fn open_searcher(&self, fresh: bool) -> Result<Arc<dyn IndexSearcher>> {
		if fresh {
			self.reader.reload().map_err(|e| Error::unavailable(&self.name, e))?;
		}
		Ok(Arc::new(TantivyIndexSearcher::new(&self.name, self.index.clone(), self.reader.searcher(), self.fields)))
	}
}

pub struct TantivyIndexWriter {
	name: String,
	index: Index,
	writer: tantivy::IndexWriter,
	fields: SchemaFields,
}

impl TantivyIndexWriter {
	fn identity_term(&self, identity: &str) -> Term {
		Term::from_field_text(self.fields.identity, identity)
	}
}

impl IndexWriter for TantivyIndexWriter {
	fn add(&mut self, doc: &SearchableDocument) -> Result<()> {
		let tantivy_doc = self.fields.to_document(doc).map_err(|e| Error::streaming(&self.name, e))?;
		self.writer.add_document(tantivy_doc).map_err(|e| Error::streaming(&self.name, e))?;
		Ok(())
	}

	fn update_by_identity(&mut self, identity: &str, doc: &SearchableDocument) -> Result<()> {
		if doc.identity != identity {
			return Err(Error::streaming(&self.name, format!("document {} submitted under identity {}", doc.identity, identity)));
		}
		// Deletes only hit documents added before them, so the re-add survives.
		self.writer.delete_term(self.identity_term(identity));
		self.add(doc)
	}

	fn delete_by_identity(&mut self, identity: &str) -> Result<()> {
		self.writer.delete_term(self.identity_term(identity));
		Ok(())
	}

	fn delete_by_field(&mut self, name: &str, value: &str) -> Result<()> {
		let term = self.fields.exact_term(name, value).ok_or_else(|| Error::UnknownField(name.to_string()))?;
		self.writer.delete_term(term);
		Ok(())
	}

	fn flush(&mut self) -> Result<()> {
		self.writer.commit().map_err(|e| Error::streaming(&self.name, e))?;
		Ok(())
	}

	fn optimize(&mut self) -> Result<()> {
		let segments = self.index.searchable_segment_ids().map_err(|e| Error::streaming(&self.name, e))?;
		if segments.len() < 2 {
			return Ok(());
		}
		debug!(index = %self.name, segments = segments.len(), "merging segments");
		self.writer.merge(&segments).wait().map_err(|e| Error::streaming(&self.name, e))?;
		Ok(())
	}

	fn close(self: Box<Self>) -> Result<()> {
		let TantivyIndexWriter { name, writer, .. } = *self;
		writer.wait_merging_threads().map_err(|e| Error::streaming(&name, e))
	}
}

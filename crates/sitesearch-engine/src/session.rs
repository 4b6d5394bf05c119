//! Scoped writer sessions.
//!
//! A session holds the index's writer mutex, owns the backend writer and
//! closes it exactly once whichever way the session ends. Full rebuilds also
//! drive the index status through `Rebuilding -> Optimizing -> Ready`; a full
//! rebuild that ends any other way leaves the index in `Error`.

use tracing::{debug, error, info, warn};

use sitesearch_core::error::{Error, Result};
use sitesearch_core::traits::IndexWriter;
use sitesearch_core::types::{IndexStatus, SearchableDocument};

use crate::registry::RegisteredIndex;

struct WriterGuard<'a> {
    index: &'a str,
    writer: Option<Box<dyn IndexWriter>>,
}

impl WriterGuard<'_> {
    fn writer(&mut self) -> Result<&mut dyn IndexWriter> {
        let index = self.index;
        match self.writer.as_deref_mut() {
            Some(writer) => Ok(writer),
            None => Err(Error::streaming(index, "writer already released")),
        }
    }

    fn release(mut self) -> Result<()> {
        match self.writer.take() {
            Some(writer) => writer.close(),
            None => Ok(()),
        }
    }
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.close() {
                warn!(index = %self.index, error = %e, "closing abandoned writer failed");
            }
        }
    }
}

struct StatusGuard<'a> {
    index: &'a RegisteredIndex,
    completed: bool,
}

impl<'a> StatusGuard<'a> {
    fn begin(index: &'a RegisteredIndex) -> Self {
        index.set_status(IndexStatus::Rebuilding);
        Self { index, completed: false }
    }

    fn optimizing(&self) {
        self.index.set_status(IndexStatus::Optimizing);
    }

    fn complete(mut self) {
        self.index.mark_rebuilt();
        self.completed = true;
    }
}

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.index.set_status(IndexStatus::Error);
            error!(index = %self.index.name(), "full rebuild failed; index marked as errored");
        }
    }
}

/// Run `f` against the index writer, then flush (and optimize for full
/// rebuilds). The writer is closed before this returns on every path.
pub fn with_writer<T, F>(index: &RegisteredIndex, full_rebuild: bool, f: F) -> Result<T>
where
    F: FnOnce(&mut dyn IndexWriter) -> Result<T>,
{
    let name = index.name();
    let _serial = index.lock_writer();
    let status = full_rebuild.then(|| StatusGuard::begin(index));

    let writer = index.backend().open_writer(full_rebuild)?;
    debug!(index = %name, full_rebuild, "writer session opened");
    let mut guard = WriterGuard { index: &name, writer: Some(writer) };

    let value = f(guard.writer()?)?;
    guard.writer()?.flush()?;
    if let Some(status) = &status {
        status.optimizing();
        guard.writer()?.optimize()?;
    }
    guard.release()?;

    if let Some(status) = status {
        status.complete();
        info!(index = %name, "full rebuild committed");
    }
    Ok(value)
}

/// Full sessions append, partial sessions replace by identity.
pub fn write_document(writer: &mut dyn IndexWriter, doc: &SearchableDocument, full_rebuild: bool) -> Result<()> {
    if full_rebuild {
        writer.add(doc)
    } else {
        writer.update_by_identity(&doc.identity, doc)
    }
}

/// Write serialized documents until the first failure.
pub fn stream_documents<I>(writer: &mut dyn IndexWriter, docs: I, full_rebuild: bool) -> Result<usize>
where
    I: IntoIterator<Item = Result<SearchableDocument>>,
{
    let mut written = 0;
    for doc in docs {
        write_document(writer, &doc?, full_rebuild)?;
        written += 1;
    }
    Ok(written)
}

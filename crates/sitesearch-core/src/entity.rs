//! Projection of content rows into searchable documents.

use crate::error::{Error, Result};
use crate::traits::SearchableEntity;
use crate::types::{search_identity, ContentRow, IndexDescriptor, SearchableDocument};

impl SearchableEntity for ContentRow {
    fn search_identity(&self) -> String {
        search_identity(self.document_id, self.node_id)
    }

    fn search_document(&self, descriptor: &IndexDescriptor) -> Result<SearchableDocument> {
        if self.class_name.trim().is_empty() {
            return Err(Error::streaming(&descriptor.name, format!("row {} has no class name", self.search_identity())));
        }
        if self.alias_path.trim().is_empty() {
            return Err(Error::streaming(&descriptor.name, format!("row {} has no alias path", self.search_identity())));
        }

        let mut body = vec![self.document_name.as_str()];
        let mut fields = std::collections::BTreeMap::new();
        for (column, value) in &self.columns {
            let column = column.to_ascii_lowercase();
            let feeds_body = descriptor.content_columns.is_empty()
                || descriptor.content_columns.iter().any(|c| c.eq_ignore_ascii_case(&column));
            if feeds_body {
                body.push(value.as_str());
            } else {
                fields.insert(column, value.clone());
            }
        }

        Ok(SearchableDocument {
            identity: self.search_identity(),
            class_name: self.class_name.clone(),
            node_id: self.node_id,
            document_id: self.document_id,
            linked_node_id: self.linked_node_id.filter(|n| *n > 0),
            alias_path: self.alias_path.clone(),
            site_name: self.site_name.clone(),
            site_id: self.site_id,
            culture: self.culture.clone(),
            content: body.into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join("\n"),
            fields,
        })
    }
}

//! Domain types shared by the index backend and the maintenance engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::path::{is_at_or_under, normalize_prefix};

/// Canonical field names of a [`SearchableDocument`] as stored in the index.
pub mod field {
    pub const IDENTITY: &str = "identity";
    pub const CLASS_NAME: &str = "classname";
    pub const NODE_ID: &str = "nodeid";
    pub const DOCUMENT_ID: &str = "documentid";
    pub const LINKED_NODE_ID: &str = "nodelinkednodeid";
    pub const ALIAS_PATH: &str = "nodealiaspath";
    pub const SITE_NAME: &str = "sitename";
    pub const SITE_ID: &str = "nodesiteid";
    pub const CULTURE: &str = "documentculture";
    pub const CONTENT: &str = "content";
}

pub type Identity = String;

// ---------------------------------------------------------------------------
// Index descriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    #[default]
    Ready,
    Rebuilding,
    Optimizing,
    Error,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Tantivy,
}

/// One `(site, culture)` pair an index covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteScope {
    pub site_id: i64,
    pub site_name: String,
    pub culture: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettingsKind {
    Allowed,
    Excluded,
}

/// A path rule of an index. An empty `class_names` list applies to every class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSettingsEntry {
    pub kind: SettingsKind,
    pub site_name: String,
    pub path: String,
    #[serde(default)]
    pub class_names: Vec<String>,
}

/// Configuration and status of one maintained index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexDescriptor {
    pub name: String,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub scopes: Vec<SiteScope>,
    #[serde(default)]
    pub settings: Vec<IndexSettingsEntry>,
    /// Row columns feeding the free-text body; empty means every column.
    #[serde(default)]
    pub content_columns: Vec<String>,
    #[serde(default)]
    pub status: IndexStatus,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files_last_changed: Option<DateTime<Utc>>,
}

impl IndexDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend: BackendKind::default(),
            scopes: Vec::new(),
            settings: Vec::new(),
            content_columns: Vec::new(),
            status: IndexStatus::Ready,
            last_updated: None,
            files_last_changed: None,
        }
    }

    pub fn with_scope(mut self, site_id: i64, site_name: &str, culture: &str) -> Self {
        self.scopes.push(SiteScope { site_id, site_name: site_name.to_string(), culture: culture.to_string() });
        self
    }

    pub fn allow(mut self, site_name: &str, path: &str, class_names: &[&str]) -> Self {
        self.settings.push(IndexSettingsEntry {
            kind: SettingsKind::Allowed,
            site_name: site_name.to_string(),
            path: path.to_string(),
            class_names: class_names.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn exclude(mut self, site_name: &str, path: &str, class_names: &[&str]) -> Self {
        self.settings.push(IndexSettingsEntry {
            kind: SettingsKind::Excluded,
            site_name: site_name.to_string(),
            path: path.to_string(),
            class_names: class_names.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    /// True when any scope of this index belongs to `site_name`.
    pub fn covers_site(&self, site_name: &str) -> bool {
        self.scopes.iter().any(|s| s.site_name.eq_ignore_ascii_case(site_name))
    }
}

// ---------------------------------------------------------------------------
// Content rows and searchable documents
// ---------------------------------------------------------------------------

/// A live row of the content store. Linked aliases share the `document_id`
/// of the node they point at and carry their own `node_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentRow {
    pub class_name: String,
    pub document_id: i64,
    pub node_id: i64,
    pub linked_node_id: Option<i64>,
    pub alias_path: String,
    pub site_id: i64,
    pub site_name: String,
    pub culture: String,
    pub document_name: String,
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl ContentRow {
    pub fn is_link(&self) -> bool {
        self.linked_node_id.is_some_and(|n| n > 0)
    }

    /// Lookup key joining a row to hits of the same materialization.
    pub fn hydration_key(&self) -> String {
        hydration_key(self.document_id, self.node_id, &self.class_name)
    }
}

pub fn hydration_key(document_id: i64, node_id: i64, class_name: &str) -> String {
    format!("{};{}_{}", document_id, node_id, class_name.to_ascii_lowercase())
}

/// Identity of one materialization. Stable across updates of the same node.
pub fn search_identity(document_id: i64, node_id: i64) -> Identity {
    format!("{};{}", document_id, node_id)
}

/// The projection of a content row that is written into an index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchableDocument {
    pub identity: Identity,
    pub class_name: String,
    pub node_id: i64,
    pub document_id: i64,
    pub linked_node_id: Option<i64>,
    pub alias_path: String,
    pub site_name: String,
    pub site_id: i64,
    pub culture: String,
    pub content: String,
    /// Categorical values, stored and searchable but not part of the body.
    pub fields: BTreeMap<String, String>,
}

impl SearchableDocument {
    /// Flat field-name to value mapping using the canonical field names.
    pub fn to_field_map(&self) -> BTreeMap<String, String> {
        let mut map = self.fields.clone();
        map.insert(field::IDENTITY.to_string(), self.identity.clone());
        map.insert(field::CLASS_NAME.to_string(), self.class_name.clone());
        map.insert(field::NODE_ID.to_string(), self.node_id.to_string());
        map.insert(field::DOCUMENT_ID.to_string(), self.document_id.to_string());
        if let Some(linked) = self.linked_node_id {
            map.insert(field::LINKED_NODE_ID.to_string(), linked.to_string());
        }
        map.insert(field::ALIAS_PATH.to_string(), self.alias_path.clone());
        map.insert(field::SITE_NAME.to_string(), self.site_name.clone());
        map.insert(field::SITE_ID.to_string(), self.site_id.to_string());
        map.insert(field::CULTURE.to_string(), self.culture.clone());
        map.insert(field::CONTENT.to_string(), self.content.clone());
        map
    }
}

// ---------------------------------------------------------------------------
// Maintenance tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MaintenanceTaskKind {
    /// `documentId[;nodeId]`
    Id,
    /// `siteName;nodeAliasPath`
    PartialRebuild,
    /// Raw value of the named index field.
    GenericField(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaintenanceTask {
    pub kind: MaintenanceTaskKind,
    pub value: String,
    pub object_type: String,
    pub created: DateTime<Utc>,
}

impl MaintenanceTask {
    pub fn new(kind: MaintenanceTaskKind, value: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self { kind, value: value.into(), object_type: object_type.into(), created: Utc::now() }
    }

    pub fn document(document_id: i64, node_id: Option<i64>, object_type: &str) -> Self {
        let value = match node_id {
            Some(node) => format!("{};{}", document_id, node),
            None => document_id.to_string(),
        };
        Self::new(MaintenanceTaskKind::Id, value, object_type)
    }

    pub fn partial_rebuild(site_name: &str, alias_path: &str, object_type: &str) -> Self {
        Self::new(MaintenanceTaskKind::PartialRebuild, format!("{};{}", site_name, alias_path), object_type)
    }

    pub fn generic(field_name: &str, value: &str, object_type: &str) -> Self {
        Self::new(MaintenanceTaskKind::GenericField(field_name.to_string()), value, object_type)
    }
}

/// Decoded value of an `Id` task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentKey {
    pub document_id: i64,
    pub node_id: Option<i64>,
}

impl DocumentKey {
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.split(';');
        let document_id = parts
            .next()
            .map(str::trim)
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| Error::MalformedTask(format!("expected documentId[;nodeId], got '{}'", value)))?;
        let node_id = match parts.next().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let node = raw
                    .parse::<i64>()
                    .map_err(|_| Error::MalformedTask(format!("invalid node id '{}' in '{}'", raw, value)))?;
                (node > 0).then_some(node)
            }
        };
        Ok(Self { document_id, node_id })
    }
}

/// Decoded value of a `PartialRebuild` task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreeKey {
    pub site_name: String,
    pub alias_path: String,
}

impl SubtreeKey {
    pub fn parse(value: &str) -> Result<Self> {
        let (site, path) = value
            .split_once(';')
            .ok_or_else(|| Error::MalformedTask(format!("expected siteName;aliasPath, got '{}'", value)))?;
        let (site, path) = (site.trim(), path.trim());
        if site.is_empty() || path.is_empty() {
            return Err(Error::MalformedTask(format!("empty site or path in '{}'", value)));
        }
        Ok(Self { site_name: site.to_string(), alias_path: normalize_prefix(path) })
    }
}

/// A task as handed out by a [`crate::traits::TaskQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    pub id: u64,
    pub task: MaintenanceTask,
    /// How many times the task has been handed out, this one included.
    pub attempts: u32,
}

// ---------------------------------------------------------------------------
// Queries and hits
// ---------------------------------------------------------------------------

/// A conjunction of exact `field:value` conditions plus optional free text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub conditions: Vec<(String, String)>,
    pub text: Option<String>,
}

impl SearchQuery {
    pub fn new() -> Self { Self::default() }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.conditions.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.conditions.iter().map(|(k, v)| format!("{}:\"{}\"", k, v)).collect();
        if let Some(text) = &self.text {
            parts.push(format!("({})", text));
        }
        if parts.is_empty() {
            return write!(f, "*");
        }
        write!(f, "{}", parts.join(" AND "))
    }
}

/// Post-query filter applied by a searcher to its hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitFilter {
    /// Keep hits whose alias path is at or under the prefix.
    PathPrefix(String),
}

impl HitFilter {
    pub fn matches(&self, hit: &SearchHit) -> bool {
        match self {
            HitFilter::PathPrefix(prefix) => hit.field(field::ALIAS_PATH).is_some_and(|p| is_at_or_under(p, prefix)),
        }
    }
}

/// A hit as returned by an index searcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub identity: Identity,
    pub fields: BTreeMap<String, String>,
    pub score: f32,
    pub position: usize,
}

impl SearchHit {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn int_field(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(|v| v.trim().parse::<i64>().ok())
    }

    pub fn class_name(&self) -> Option<&str> { self.field(field::CLASS_NAME) }

    pub fn document_id(&self) -> Option<i64> { self.int_field(field::DOCUMENT_ID) }

    pub fn node_id(&self) -> Option<i64> { self.int_field(field::NODE_ID) }

    pub fn linked_node_id(&self) -> Option<i64> {
        self.int_field(field::LINKED_NODE_ID).filter(|n| *n > 0)
    }
}

/// A hit joined back to its live row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HydratedResult {
    pub identity: Identity,
    pub row: ContentRow,
    pub preview_image: Option<String>,
    pub excerpt: Option<String>,
    pub score: f32,
}

/// Batched row filter for one class: standard rows by document id, linked
/// aliases by `(documentId, nodeId)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub document_ids: Vec<i64>,
    pub linked: Vec<(i64, i64)>,
}

impl RowFilter {
    pub fn is_empty(&self) -> bool {
        self.document_ids.is_empty() && self.linked.is_empty()
    }

    pub fn matches(&self, row: &ContentRow) -> bool {
        if !row.is_link() && self.document_ids.contains(&row.document_id) {
            return true;
        }
        self.linked.iter().any(|(d, n)| *d == row.document_id && *n == row.node_id)
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut clauses = Vec::new();
        if !self.document_ids.is_empty() {
            let ids: Vec<String> = self.document_ids.iter().map(|d| d.to_string()).collect();
            clauses.push(format!("(DocumentID IN ({}) AND NodeLinkedNodeID IS NULL)", ids.join(", ")));
        }
        for (document_id, node_id) in &self.linked {
            clauses.push(format!("(DocumentID = {} AND NodeID = {})", document_id, node_id));
        }
        if clauses.is_empty() {
            return write!(f, "1 = 0");
        }
        write!(f, "{}", clauses.join(" OR "))
    }
}

// ---------------------------------------------------------------------------
// Request context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedHit {
    pub identity: Identity,
    pub position: usize,
}

/// Per-request state of the read path: the acting principal and the
/// identities that passed the permission check.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: String,
    pub roles: Vec<String>,
    matched: Vec<MatchedHit>,
}

impl RequestContext {
    pub fn new(principal: &str) -> Self {
        Self { principal: principal.to_string(), roles: Vec::new(), matched: Vec::new() }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.push(role.to_string());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn record_match(&mut self, identity: &str, position: usize) {
        self.matched.push(MatchedHit { identity: identity.to_string(), position });
    }

    pub fn matched(&self) -> &[MatchedHit] { &self.matched }

    pub fn matched_identities(&self) -> Vec<&str> {
        self.matched.iter().map(|m| m.identity.as_str()).collect()
    }
}

//! Turns an index descriptor into the selection of rows a full rebuild
//! streams. Pure function of configuration; no store access.

use sitesearch_core::path::{is_at_or_under, normalize_prefix};
use sitesearch_core::types::{ContentRow, IndexDescriptor, IndexSettingsEntry, SettingsKind, SiteScope};

/// One allowed or excluded subtree of a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRule {
    pub site_name: String,
    /// Normalized alias-path prefix (`/` for the whole site).
    pub prefix: String,
    /// Lower-cased class names; empty means every class.
    pub class_names: Vec<String>,
}

impl PathRule {
    fn from_entry(entry: &IndexSettingsEntry) -> Self {
        Self {
            site_name: entry.site_name.clone(),
            prefix: normalize_prefix(&entry.path),
            class_names: entry.class_names.iter().map(|c| c.to_ascii_lowercase()).collect(),
        }
    }

    pub fn applies_to(&self, row: &ContentRow) -> bool {
        self.site_name.eq_ignore_ascii_case(&row.site_name)
            && is_at_or_under(&row.alias_path, &self.prefix)
            && (self.class_names.is_empty() || self.class_names.iter().any(|c| c.eq_ignore_ascii_case(&row.class_name)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPlan {
    pub scopes: Vec<SiteScope>,
    pub site_ids: Vec<i64>,
    pub cultures: Vec<String>,
    pub allowed: Vec<PathRule>,
    pub excluded: Vec<PathRule>,
}

impl SelectionPlan {
    pub fn accepts(&self, row: &ContentRow) -> bool {
        let in_scope = self
            .scopes
            .iter()
            .any(|s| s.site_name.eq_ignore_ascii_case(&row.site_name) && s.culture.eq_ignore_ascii_case(&row.culture));
        in_scope && self.allowed.iter().any(|r| r.applies_to(row)) && !self.excluded.iter().any(|r| r.applies_to(row))
    }
}

/// `None` when the index has no scopes or no allowed subtree in scope.
pub fn plan_full_rebuild(descriptor: &IndexDescriptor) -> Option<SelectionPlan> {
    if descriptor.scopes.is_empty() {
        return None;
    }
    let rules = |kind: SettingsKind| -> Vec<PathRule> {
        descriptor
            .settings
            .iter()
            .filter(|e| e.kind == kind && descriptor.covers_site(&e.site_name))
            .map(PathRule::from_entry)
            .collect()
    };
    let allowed = rules(SettingsKind::Allowed);
    if allowed.is_empty() {
        return None;
    }

    let mut site_ids = Vec::new();
    let mut cultures: Vec<String> = Vec::new();
    for scope in &descriptor.scopes {
        if !site_ids.contains(&scope.site_id) {
            site_ids.push(scope.site_id);
        }
        let culture = scope.culture.to_ascii_lowercase();
        if !cultures.contains(&culture) {
            cultures.push(culture);
        }
    }

    Some(SelectionPlan {
        scopes: descriptor.scopes.clone(),
        site_ids,
        cultures,
        allowed,
        excluded: rules(SettingsKind::Excluded),
    })
}

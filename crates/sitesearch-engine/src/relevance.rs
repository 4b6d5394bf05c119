use sitesearch_core::types::{IndexDescriptor, SettingsKind};

/// Classes every document index covers regardless of its settings.
pub const UNIVERSAL_CLASSES: [&str; 2] = ["cms.document", "cms.tree"];

/// Whether `class_name` participates in the index.
///
/// Only the first `Allowed` entry is evaluated: an empty class list there
/// admits every class, otherwise membership is case-insensitive. Later
/// `Allowed` entries are never consulted.
pub fn is_class_relevant(class_name: &str, descriptor: &IndexDescriptor) -> bool {
    if UNIVERSAL_CLASSES.iter().any(|c| c.eq_ignore_ascii_case(class_name)) {
        return true;
    }
    match descriptor.settings.iter().find(|e| e.kind == SettingsKind::Allowed) {
        Some(entry) => entry.class_names.is_empty() || entry.class_names.iter().any(|c| c.eq_ignore_ascii_case(class_name)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_allow_list_admits_everything() {
        let d = IndexDescriptor::new("ix").with_scope(1, "s", "en-us").allow("s", "/%", &[]);
        for class in ["cms.article", "custom.product", "CMS.News", "x"] {
            assert!(is_class_relevant(class, &d), "{} should be relevant", class);
        }
    }

    #[test]
    fn universal_classes_ignore_configuration() {
        let d = IndexDescriptor::new("ix");
        assert!(is_class_relevant("CMS.Document", &d));
        assert!(is_class_relevant("cms.tree", &d));
        assert!(!is_class_relevant("cms.article", &d));
    }

    #[test]
    fn only_first_allowed_entry_counts() {
        let d = IndexDescriptor::new("ix")
            .exclude("s", "/private/%", &["cms.article"])
            .allow("s", "/news/%", &["cms.news"])
            .allow("s", "/blog/%", &["cms.blogpost"]);
        assert!(is_class_relevant("CMS.NEWS", &d));
        assert!(!is_class_relevant("cms.blogpost", &d));
    }
}

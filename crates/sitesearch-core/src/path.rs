//! Alias-path helpers for the content tree.
//!
//! Settings paths follow the tree convention where `/`, `/%`, `/a/%` and `/a`
//! all mean "this node and everything beneath it". Comparisons ignore ASCII
//! case and respect segment boundaries, so `/a` covers `/a/b` but not `/ab`.

/// Strip wildcard and trailing-slash decorations from a settings path.
pub fn normalize_prefix(path: &str) -> String {
    let trimmed = path.trim();
    let without_wildcard = trimmed.trim_end_matches('%');
    let without_slash = without_wildcard.trim_end_matches('/');
    if without_slash.is_empty() {
        return "/".to_string();
    }
    if without_slash.starts_with('/') {
        without_slash.to_string()
    } else {
        format!("/{}", without_slash)
    }
}

/// True when `path` equals `prefix` or lies beneath it.
pub fn is_at_or_under(path: &str, prefix: &str) -> bool {
    let prefix = normalize_prefix(prefix);
    if prefix == "/" {
        return true;
    }
    let path = path.trim_end_matches('/');
    if path.len() < prefix.len() || !path.is_char_boundary(prefix.len()) {
        return false;
    }
    let (head, tail) = path.split_at(prefix.len());
    head.eq_ignore_ascii_case(&prefix) && (tail.is_empty() || tail.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_and_root_normalize() {
        assert_eq!(normalize_prefix("/%"), "/");
        assert_eq!(normalize_prefix("/"), "/");
        assert_eq!(normalize_prefix("/News/%"), "/News");
        assert_eq!(normalize_prefix("News/"), "/News");
    }

    #[test]
    fn prefix_match_is_segment_aware_and_case_insensitive() {
        assert!(is_at_or_under("/a", "/a"));
        assert!(is_at_or_under("/A/b", "/a/%"));
        assert!(!is_at_or_under("/ab", "/a"));
        assert!(is_at_or_under("/anything/at/all", "/%"));
        assert!(!is_at_or_under("/", "/a"));
    }
}

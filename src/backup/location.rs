//! Install-location strings as the launcher records them.
//!
//! Locations come from JSON written on another machine, so they are handled
//! as strings with either separator rather than as host paths.

use std::path::MAIN_SEPARATOR;

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn components(location: &str) -> impl Iterator<Item = &str> {
    location.split(is_separator).filter(|c| !c.is_empty() && *c != ".")
}

/// Last component of a location (`C:\Old\Game` → `Game`)
pub fn leaf_name(location: &str) -> Option<&str> {
    location
        .trim_end_matches(is_separator)
        .rsplit(is_separator)
        .next()
        .filter(|leaf| !leaf.is_empty() && !leaf.ends_with(':'))
}

/// Join `relative` onto `base`, using the separator style `base` already uses
pub fn join_location(base: &str, relative: &str) -> String {
    let separator = if base.contains('\\') {
        '\\'
    } else if base.contains('/') {
        '/'
    } else {
        MAIN_SEPARATOR
    };

    let mut joined = base.trim_end_matches(is_separator).to_string();
    for component in components(relative) {
        joined.push(separator);
        joined.push_str(component);
    }
    joined
}

/// Path of `location` below `root`, slash-separated (`""` when equal)
pub fn relative_to(root: &str, location: &str) -> Option<String> {
    let mut root_parts = components(root);
    let mut parts = components(location);

    for expected in root_parts.by_ref() {
        if parts.next() != Some(expected) {
            return None;
        }
    }

    Some(parts.collect::<Vec<_>>().join("/"))
}

/// Whether `location` is `root` or lies below it
pub fn is_within(root: &str, location: &str) -> bool {
    !root.is_empty() && relative_to(root, location).is_some()
}

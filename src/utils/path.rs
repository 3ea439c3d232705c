//! Path display helpers

/// Strip any directory prefix, keeping only the final component.
///
/// Both `/` and `\` count as separators regardless of the host platform,
/// since module references may come from either kind of system.
pub fn display_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

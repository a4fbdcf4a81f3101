/// Lowercases, drops BOM/zero-width marks and `#`, treats `_` as a space, and collapses runs
/// of whitespace.
pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value
        .replace(['\u{feff}', '\u{200b}', '#'], "")
        .replace('_', " ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_ascii_lowercase()
}

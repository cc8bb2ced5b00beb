use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static WIKILINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]]*?)\]\]").expect("wikilink pattern is valid"));

/// Extract the note titles a query names with `[[Title]]` syntax.
///
/// Titles come back left to right, first occurrence only. Alias (`|`) and
/// heading (`#`) suffixes are dropped. Unterminated or empty brackets yield
/// nothing.
pub fn extract_note_titles(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut titles = Vec::new();

    for cap in WIKILINK.captures_iter(query) {
        let inner = &cap[1];
        let target = inner.split('|').next().unwrap_or(inner);
        let target = target.split('#').next().unwrap_or(target).trim();
        if target.is_empty() {
            continue;
        }
        if seen.insert(target.to_string()) {
            titles.push(target.to_string());
        }
    }

    titles
}

//! Shopping-list extractor for assistant reply text.
//!
//! This module pulls an interactive shopping list out of free-form assistant
//! replies. A reply that recommends extra groceries typically contains a
//! header line such as 「買い物リスト」 followed by marker lines:
//!
//! ```text
//! ■ 買い物リスト
//! ・鶏もも肉 300g
//! ・玉ねぎ 2個
//! 1. 醤油
//! 2) みりん
//! ```
//!
//! `extract_shopping_list` returns the captured items together with the
//! remainder of the text (everything that was not consumed as an item,
//! including the header line itself), so the caller can render the prose and
//! the checklist separately.
//!
//! The parser is a deliberate heuristic, kept line-oriented and single-pass.
//! Its known limitations (two adjacent list blocks merge into one, a stray
//! non-empty line ends the region) are part of the observable behavior:
//! checklist check-state is keyed by item position, so the extraction must
//! stay deterministic across releases.

use regex::Regex;

/// Header substrings that switch the parser into list mode.
const HEADER_TRIGGERS: [&str; 4] = ["買い物リスト", "買い足し", "追加で必要", "購入が必要"];

/// Bullet markers that introduce a list item.
const ITEM_MARKERS: [char; 3] = ['・', '-', '•'];

/// Extract shopping-list items from assistant reply text.
///
/// Splits `content` into lines and scans them once. A non-empty line
/// containing any header trigger turns list mode on (the line itself stays
/// in the remainder). While in list mode, lines shaped like `・item`,
/// `- item`, `• item`, `1. item` or `2) item` are captured as items and
/// removed from the remainder. Any other non-empty line that is not
/// marker-shaped ends the list region and is kept in the remainder; blank
/// lines are kept without ending the region.
///
/// # Arguments
///
/// * `content` - The assistant reply text
///
/// # Returns
///
/// A tuple containing:
/// - `Vec<String>` - The captured items, in original order
/// - `String` - The remainder text, lines rejoined with `\n`
///
/// When no header trigger occurs anywhere, the items are empty and the
/// remainder equals `content` unchanged.
///
/// # Examples
///
/// ```
/// use kondate::extractor::extract_shopping_list;
///
/// let reply = "カレーはどうでしょう。\n買い物リスト:\n・じゃがいも\n・人参";
/// let (items, remainder) = extract_shopping_list(reply);
/// assert_eq!(items, vec!["じゃがいも", "人参"]);
/// assert!(remainder.contains("買い物リスト"));
/// ```
pub fn extract_shopping_list(content: &str) -> (Vec<String>, String) {
    // `unwrap` is safe: the patterns are fixed literals.
    let numeric_item = Regex::new(r"^\d+[.)]\s*(\S.*)$").unwrap();
    let numeric_prefix = Regex::new(r"^\d+[.)]").unwrap();

    let mut items = Vec::new();
    let mut kept: Vec<&str> = Vec::new();
    let mut in_list = false;

    for line in content.split('\n') {
        let trimmed = line.trim();

        // Header triggers are checked on every line, so a trigger-bearing
        // section marker inside a list keeps the mode on.
        if !trimmed.is_empty() && HEADER_TRIGGERS.iter().any(|t| trimmed.contains(t)) {
            in_list = true;
            kept.push(line);
            continue;
        }

        if in_list {
            if let Some(item) = parse_item(trimmed, &numeric_item) {
                items.push(item);
                continue;
            }
            if exits_list(trimmed, &numeric_prefix) {
                in_list = false;
            }
            kept.push(line);
        } else {
            kept.push(line);
        }
    }

    (items, kept.join("\n"))
}

/// Try to parse a trimmed line as a list item.
///
/// Returns the trimmed item text for `・item` / `- item` / `• item` /
/// `1. item` / `2) item` shapes, `None` otherwise. A bare marker with no
/// trailing text is not an item.
fn parse_item(trimmed: &str, numeric_item: &Regex) -> Option<String> {
    for marker in ITEM_MARKERS {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            let text = rest.trim();
            if text.is_empty() {
                return None;
            }
            return Some(text.to_string());
        }
    }

    numeric_item
        .captures(trimmed)
        .map(|caps| caps[1].trim().to_string())
}

/// Decide whether a trimmed line ends the current list region.
///
/// Blank lines never end the region. Section markers (`■`, `【`, `##`) end
/// it, as does any non-empty line that carries none of the item-marker
/// prefixes and does not start with a numeric marker. A marker-shaped line
/// with no item text keeps the region open and stays in the remainder.
fn exits_list(trimmed: &str, numeric_prefix: &Regex) -> bool {
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with('■') || trimmed.starts_with('【') || trimmed.starts_with("##") {
        return true;
    }
    !ITEM_MARKERS.iter().any(|m| trimmed.starts_with(*m)) && !numeric_prefix.is_match(trimmed)
}

//! Text normalizer: pure functions cleaning titles and snippets coming out of
//! feeds and scraped pages.
//!
//! `clean_title` is applied until it reaches a fixpoint, so
//! `clean_title(clean_title(x)) == clean_title(x)` holds even for
//! double-encoded entities or markup hidden behind entities.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Titles longer than this are cut (chars, not bytes).
pub const MAX_TITLE_CHARS: usize = 120;
/// Length of the normalized prefix used as a grouping key.
pub const TOPIC_KEY_LEN: usize = 15;

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap())
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn re_brackets() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").unwrap())
}

fn re_non_key() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_가-힣]").unwrap())
}

/// Decode HTML entities until nothing changes (`&amp;amp;` → `&`).
fn decode_entities(s: &str) -> String {
    let mut cur = s.to_string();
    loop {
        let next = html_escape::decode_html_entities(&cur).to_string();
        if next == cur {
            return cur;
        }
        cur = next;
    }
}

fn collapse_ws(s: &str) -> String {
    re_ws().replace_all(s, " ").trim().to_string()
}

/// Take at most `max` chars.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn clean_title_once(raw: &str) -> String {
    // 1) Entities, then markup (entities can hide tags)
    let mut out = decode_entities(raw);
    out = re_tags().replace_all(&out, "").to_string();

    // 2) Typographic quotes → ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 3) Bracketed tags like "[Breaking]" or "(update)"
    out = re_brackets().replace_all(&out, " ").to_string();
    out = collapse_ws(&out);

    // 4) Drop the " - Publisher" suffix
    if let Some(head) = out.split(" - ").next() {
        out = head.trim().to_string();
    }

    // 5) Length cap
    if out.chars().count() > MAX_TITLE_CHARS {
        out = truncate_chars(&out, MAX_TITLE_CHARS).trim_end().to_string();
    }
    out
}

/// Clean a headline: entities, markup, bracketed tags, publisher suffix, whitespace.
pub fn clean_title(raw: &str) -> String {
    let mut cur = clean_title_once(raw);
    loop {
        let next = clean_title_once(&cur);
        if next == cur {
            return cur;
        }
        cur = next;
    }
}

/// Clean a feed snippet and cap it at `max_chars`.
pub fn clean_snippet(raw: &str, max_chars: usize) -> String {
    let out = decode_entities(raw);
    let out = re_tags().replace_all(&out, " ");
    let out = collapse_ws(&out);
    truncate_chars(&out, max_chars).trim().to_string()
}

/// Grouping key: no whitespace, only word chars and Hangul, lowercase,
/// first [`TOPIC_KEY_LEN`] chars.
pub fn topic_key(title: &str) -> String {
    let compact: String = title.chars().filter(|c| !c.is_whitespace()).collect();
    let kept = re_non_key().replace_all(&compact, "");
    truncate_chars(&kept.to_lowercase(), TOPIC_KEY_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_drops_publisher_and_tags() {
        let s = "[Breaking] Heavy snow &amp; ice (update) hits Seoul - Daily News";
        assert_eq!(clean_title(s), "Heavy snow & ice hits Seoul");
    }

    #[test]
    fn title_decodes_double_encoded_entities_in_one_call() {
        let s = "Tom &amp;amp; Jerry";
        assert_eq!(clean_title(s), "Tom & Jerry");
        assert_eq!(clean_title(&clean_title(s)), clean_title(s));
    }

    #[test]
    fn markup_hidden_behind_entities_is_removed() {
        let s = "&lt;b&gt;Bold&lt;/b&gt; move";
        assert_eq!(clean_title(s), "Bold move");
    }

    #[test]
    fn bracket_removal_exposing_publisher_suffix_is_stable() {
        // Removing "[x]" leaves "A - B"; the fixpoint strips the suffix too.
        let s = "A [x]- B";
        let once = clean_title(s);
        assert_eq!(clean_title(&once), once);
    }

    #[test]
    fn snippet_is_capped_by_chars() {
        let s = "<p>가나다라마바사</p>&nbsp;extra";
        assert_eq!(clean_snippet(s, 4), "가나다라");
    }

    #[test]
    fn topic_key_ignores_punctuation_and_case() {
        assert_eq!(topic_key("A!"), topic_key("a"));
        assert_eq!(topic_key("손흥민 골!! 대박"), "손흥민골대박");
        assert_eq!(topic_key("abcdefghijklmnopqrstuvwxyz").chars().count(), TOPIC_KEY_LEN);
    }
}

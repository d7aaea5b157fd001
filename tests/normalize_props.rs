// tests/normalize_props.rs
//
// Property-style checks for the text normalizer over seeded random titles
// assembled from the messy fragments real feeds produce.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use trend_aggregator::normalize::{clean_title, topic_key, MAX_TITLE_CHARS, TOPIC_KEY_LEN};

const FRAGMENTS: &[&str] = &[
    "Heavy snow",
    "손흥민",
    " 결승골 ",
    "&amp;",
    "&amp;amp;",
    "&lt;b&gt;",
    "<i>",
    "</i>",
    "[속보]",
    "(update)",
    " - ",
    "Daily News",
    "“quoted”",
    "‘single’",
    "  ",
    "\t",
    "...",
    "&nbsp;",
    "A!",
    "[",
    ")",
    "&#39;",
];

fn random_title(rng: &mut StdRng) -> String {
    let n = rng.random_range(1..12);
    (0..n)
        .map(|_| FRAGMENTS[rng.random_range(0..FRAGMENTS.len())])
        .collect()
}

#[test]
fn clean_title_is_idempotent_on_random_titles() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..2_000 {
        let raw = random_title(&mut rng);
        let once = clean_title(&raw);
        let twice = clean_title(&once);
        assert_eq!(once, twice, "not idempotent for raw={raw:?}");
    }
}

#[test]
fn clean_title_respects_length_cap_and_trims() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..500 {
        let raw = random_title(&mut rng).repeat(8);
        let out = clean_title(&raw);
        assert!(out.chars().count() <= MAX_TITLE_CHARS);
        assert_eq!(out, out.trim());
        assert!(!out.contains("  "), "double space in {out:?}");
    }
}

#[test]
fn topic_key_is_short_lowercase_and_stable() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let t = clean_title(&random_title(&mut rng));
        let k = topic_key(&t);
        assert!(k.chars().count() <= TOPIC_KEY_LEN);
        assert_eq!(k, k.to_lowercase());
        assert!(!k.chars().any(char::is_whitespace));
        assert_eq!(topic_key(&t), k);
    }
}

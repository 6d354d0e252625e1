//! Repost text: emoji, cleaned body, credit, hashtags and a link back.
//!
//! ```text
//! 🚨 Arsenal are in talks to sign ...
//!
//! ✍️ @David_Ornstein
//!
//! #Arsenal #AFC
//!
//! https://x.com/David_Ornstein/status/1790000000000000000
//! ```
//!
//! Lengths are measured the way the platform counts them (see
//! [`weighted_len`]) and the body is the only part that gets shortened.
use crate::{Account, CandidateItem};
use pressbox_social::twitter::status_url;
use regex::Regex;
use std::sync::LazyLock;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url regex"));

/// Anything the platform turns into a link: full URLs and bare domains on
/// common TLDs, each with an optional path.
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)https?://\S+",
        r"|\b(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+",
        r"(?:com|net|org|info|biz|io|co|uk|us|eu|de|fr|es|it|nl|be|ie|pt|au|ca",
        r"|tv|me|news|app|dev|ly|gl)",
        r"\b(?:/\S*)?",
    ))
    .expect("link regex")
});
static RETWEET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^RT @\w+:\s*").expect("retweet regex"));

const ELLIPSIS: char = '…';
const SECTION_BREAK: &str = "\n\n";

/// Weight of a single character outside links.
fn char_weight(c: char) -> usize {
    match c as u32 {
        0x0000..=0x10FF | 0x2000..=0x200D | 0x2010..=0x201F | 0x2032..=0x2037 => 1,
        _ => 2,
    }
}

fn plain_weight(text: &str) -> usize {
    text.chars().map(char_weight).sum()
}

/// Length of `text` as the platform counts it: each link, including bare
/// domains such as `arsenal.com`, weighs `link_weight`; everything else goes
/// through [`char_weight`].
pub fn weighted_len(text: &str, link_weight: usize) -> usize {
    let mut total = 0;
    let mut last = 0;
    for m in LINK_RE.find_iter(text) {
        total += plain_weight(&text[last..m.start()]) + link_weight;
        last = m.end();
    }
    total + plain_weight(&text[last..])
}

/// Strip links and retweet markers, undo entity escaping and normalise
/// whitespace.
pub fn clean_text(raw: &str) -> String {
    let text = RETWEET_RE.replace(raw.trim_start(), "");
    let text = URL_RE.replace_all(&text, " ");
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `body` so it weighs at most `budget`, ending in an ellipsis.
fn truncate_to_weight(body: &str, budget: usize, link_weight: usize) -> Option<String> {
    if weighted_len(body, link_weight) <= budget {
        return Some(body.to_string());
    }
    let room = budget.checked_sub(char_weight(ELLIPSIS))?;

    let mut used = 0;
    let mut cut = String::new();
    for c in body.chars() {
        let w = char_weight(c);
        if used + w > room {
            break;
        }
        used += w;
        cut.push(c);
    }

    // A domain kept in the prefix weighs more than its characters.
    loop {
        let kept = cut.trim_end();
        if kept.is_empty() {
            return None;
        }
        if weighted_len(kept, link_weight) <= room {
            return Some(format!("{kept}{ELLIPSIS}"));
        }
        cut.pop();
    }
}

#[derive(Debug, Clone)]
pub struct Formatter {
    max_len: usize,
    link_weight: usize,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(280, 23)
    }
}

impl Formatter {
    pub fn new(max_len: usize, link_weight: usize) -> Self {
        Self {
            max_len,
            link_weight,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn weighted_len(&self, text: &str) -> usize {
        weighted_len(text, self.link_weight)
    }

    fn fits(&self, text: &str) -> bool {
        self.weighted_len(text) <= self.max_len
    }

    /// Build the repost for `item`, or `None` when even the credit and link
    /// alone exceed the limit.
    pub fn format(&self, account: &Account, item: &CandidateItem) -> Option<String> {
        let body = clean_text(&item.text);
        let post = Layout {
            emoji: account.emoji.trim(),
            credit: format!("✍️ @{}", account.attribution.trim_start_matches('@')),
            hashtags: account.hashtags.trim(),
            link: status_url(&account.username, &item.id),
        };

        let full = post.render(true, &body, true);
        if self.fits(&full) {
            return Some(full);
        }

        for with_hashtags in [true, false] {
            // Weight of everything but the body, counting the space that
            // separates the emoji from it.
            let frame = post.render(true, "x", with_hashtags);
            let Some(budget) = (self.max_len + 1).checked_sub(self.weighted_len(&frame)) else {
                continue;
            };
            if let Some(short) = truncate_to_weight(&body, budget, self.link_weight) {
                let out = post.render(true, &short, with_hashtags);
                debug_assert!(self.fits(&out));
                return Some(out);
            }
        }

        [post.render(true, "", false), post.render(false, "", false)]
            .into_iter()
            .find(|candidate| self.fits(candidate))
    }
}

struct Layout<'a> {
    emoji: &'a str,
    credit: String,
    hashtags: &'a str,
    link: String,
}

impl Layout<'_> {
    fn render(&self, with_emoji: bool, body: &str, with_hashtags: bool) -> String {
        let emoji = if with_emoji { self.emoji } else { "" };
        let head = match (emoji.is_empty(), body.is_empty()) {
            (false, false) => format!("{emoji} {body}"),
            (false, true) => emoji.to_string(),
            (true, _) => body.to_string(),
        };

        let mut sections: Vec<&str> = Vec::with_capacity(4);
        if !head.is_empty() {
            sections.push(&head);
        }
        sections.push(&self.credit);
        if with_hashtags && !self.hashtags.is_empty() {
            sections.push(self.hashtags);
        }
        sections.push(&self.link);
        sections.join(SECTION_BREAK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            username: "David_Ornstein".into(),
            emoji: "🚨".into(),
            hashtags: "#Arsenal #AFC".into(),
            attribution: "David_Ornstein".into(),
        }
    }

    fn item(text: &str) -> CandidateItem {
        CandidateItem {
            id: "1790000000000000000".into(),
            text: text.into(),
            account: "David_Ornstein".into(),
        }
    }

    #[test]
    fn short_posts_keep_every_section() {
        let out = Formatter::default()
            .format(&account(), &item("Arsenal agree deal https://t.co/abc"))
            .unwrap();
        assert_eq!(
            out,
            "🚨 Arsenal agree deal\n\n✍️ @David_Ornstein\n\n#Arsenal #AFC\n\n\
             https://x.com/David_Ornstein/status/1790000000000000000"
        );
    }

    #[test]
    fn clean_text_strips_links_entities_and_retweet_marker() {
        assert_eq!(
            clean_text("RT @Arsenal: Saka &amp; Rice\n\n  start &gt; bench https://t.co/x"),
            "Saka & Rice start > bench"
        );
        assert_eq!(clean_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn links_weigh_a_fixed_amount() {
        let text = "go https://example.com/a/very/long/path/that/keeps/going";
        assert_eq!(weighted_len(text, 23), 3 + 23);
    }

    #[test]
    fn bare_domains_weigh_like_links() {
        assert_eq!(weighted_len("arsenal.com", 23), 23);
        assert_eq!(weighted_len("see arsenal.co.uk/news today", 23), 4 + 23 + 6);
        assert_eq!(weighted_len("Arsenal.COM", 23), 23);
        assert_eq!(weighted_len("e.g. 3.50 a.b", 23), 13);
    }

    #[test]
    fn truncated_bodies_with_domains_stay_within_limit() {
        let f = Formatter::default();
        let text = format!("{} arsenal.com {}", "a".repeat(150), "b".repeat(300));
        let out = f.format(&account(), &item(&text)).unwrap();
        assert!(out.contains("arsenal.com"));
        assert!(f.weighted_len(&out) <= 280, "{}", f.weighted_len(&out));

        // Domains landing on the cut point must not push the post over.
        for prefix in 150..230 {
            let text = format!("{} arsenal.com {}", "a".repeat(prefix), "b".repeat(300));
            let out = f.format(&account(), &item(&text)).unwrap();
            assert!(f.weighted_len(&out) <= 280, "{prefix}: {}", f.weighted_len(&out));
        }
    }

    #[test]
    fn wide_characters_weigh_two() {
        assert_eq!(weighted_len("abc", 23), 3);
        assert_eq!(weighted_len("🚨", 23), 2);
        assert_eq!(weighted_len("アーセナル", 23), 10);
        assert_eq!(weighted_len("…", 23), 2);
        assert_eq!(weighted_len("“quote”", 23), 7);
    }

    #[test]
    fn long_bodies_are_truncated_to_the_limit() {
        let f = Formatter::default();
        let long = "Arsenal ".repeat(80);
        let out = f.format(&account(), &item(&long)).unwrap();

        assert!(f.weighted_len(&out) <= 280, "{}", f.weighted_len(&out));
        assert!(out.contains("…\n\n✍️ @David_Ornstein"));
        assert!(out.contains("#Arsenal #AFC"));
        assert!(out.ends_with("https://x.com/David_Ornstein/status/1790000000000000000"));
    }

    #[test]
    fn truncation_fills_the_budget_exactly_or_nearly() {
        let f = Formatter::default();
        let out = f.format(&account(), &item(&"a".repeat(1000))).unwrap();
        // ellipsis weighs two, so one slot may stay free
        assert!(f.weighted_len(&out) >= 279);
    }

    #[test]
    fn hashtags_go_before_the_body_disappears() {
        let f = Formatter::new(90, 23);
        let mut acc = account();
        acc.hashtags = "#Arsenal #AFC #COYG #Gunners #PremierLeague #Transfers #London".into();
        let out = f.format(&acc, &item(&"news ".repeat(40))).unwrap();

        assert!(f.weighted_len(&out) <= 90);
        assert!(!out.contains("#COYG"));
        assert!(out.contains("@David_Ornstein"));
        assert!(out.contains("/status/1790000000000000000"));
        assert!(out.contains("news"));
    }

    #[test]
    fn tiny_limits_keep_credit_and_link_only() {
        let f = Formatter::new(45, 23);
        let out = f.format(&account(), &item("Arsenal news")).unwrap();
        assert!(f.weighted_len(&out) <= 45);
        assert!(out.starts_with("✍️ @David_Ornstein") || out.starts_with("🚨"));
        assert!(out.ends_with("/status/1790000000000000000"));
    }

    #[test]
    fn impossible_limits_yield_nothing() {
        let f = Formatter::new(10, 23);
        assert!(f.format(&account(), &item("Arsenal")).is_none());
    }

    #[test]
    fn output_never_exceeds_limit_across_sizes() {
        let acc = account();
        let texts = [
            String::new(),
            "Arsenal".to_string(),
            "アーセナルが新しい選手と契約しました。".repeat(10),
            "x".repeat(300),
            "🔴⚪️".repeat(100),
        ];
        for max_len in [40, 60, 100, 140, 280] {
            let f = Formatter::new(max_len, 23);
            for text in texts.iter() {
                if let Some(out) = f.format(&acc, &item(text)) {
                    assert!(f.weighted_len(&out) <= max_len, "{max_len}: {out}");
                    assert!(out.ends_with("/status/1790000000000000000"));
                    assert!(out.contains("@David_Ornstein"));
                }
            }
        }
    }

    #[test]
    fn body_made_only_of_a_link_leaves_emoji_head() {
        let out = Formatter::default()
            .format(&account(), &item("https://t.co/abc"))
            .unwrap();
        assert!(out.starts_with("🚨\n\n✍️ @David_Ornstein"));
    }
}

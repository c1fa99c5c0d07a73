//! Headline cleanup and post layout

use std::sync::OnceLock;

use regex::Regex;
use tracing::error;

use crate::parser::NewsItem;

/// Longest headline kept in a post, in characters
const MAX_TITLE_CHARS: usize = 110;

/// Leading clickbait tags dropped from headlines
const STOPWORDS_PATTERN: &str = r"(?i)^\s*(?:(?:breaking|exclusive|trailer|teaser|official)\b|(?:report|reports|rumor|rumour|watch|update|news):)\s*:?\s*";

/// Trailing `" | Site Name"`
const SITE_SUFFIX_PATTERN: &str = r"\s*\|\s*[^|]{2,40}$";

struct Rule {
    pattern: Regex,
    emoji: &'static str,
    label: &'static str,
}

const FALLBACK_GAME: (&str, &str) = ("🎮", "Games");
const FALLBACK_CATEGORY: (&str, &str) = ("📰", "details at the link.");

fn compile(rules: &[(&str, &'static str, &'static str)]) -> Vec<Rule> {
    rules
        .iter()
        .filter_map(|&(pattern, emoji, label)| match Regex::new(pattern) {
            Ok(pattern) => Some(Rule {
                pattern,
                emoji,
                label,
            }),
            Err(e) => {
                error!(pattern, error = %e, "Invalid headline pattern");
                None
            }
        })
        .collect()
}

fn game_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        compile(&[
            (r"(?i)\b(cs2|counter[- ]?strike|counterstrike)\b", "💣", "CS2"),
            (r"(?i)\b(dota\s*2|dota2)\b", "🧙", "Dota 2"),
            (r"(?i)\bwarface\b", "🔫", "Warface"),
            (r"(?i)\b(call of duty|cod|warzone)\b", "🎖", "Call of Duty"),
        ])
    })
}

/// Category rules; the label doubles as the summary line
fn category_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        compile(&[
            (
                r"(?i)\b(patch|update|hotfix|balance)\b",
                "🛠",
                "an update or fixes are out.",
            ),
            (
                r"(?i)\b(announce|announced|reveal|unveil)\b",
                "📢",
                "an announcement with details.",
            ),
            (
                r"(?i)\b(major|tournament|qualifier|championship|esports)\b",
                "🏆",
                "esports news.",
            ),
            (
                r"(?i)\b(release|released|launch|out now)\b",
                "🆕",
                "new release or content drop.",
            ),
            (
                r"(?i)\b(leak|leaked|datamine|rumou?r)\b",
                "🕵️",
                "leak or rumour, check official sources.",
            ),
        ])
    })
}

fn cleanup_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [STOPWORDS_PATTERN, SITE_SUFFIX_PATTERN]
            .into_iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    error!(pattern, error = %e, "Invalid headline pattern");
                    None
                }
            })
            .collect()
    })
}

fn detect<'a>(rules: &'a [Rule], title: &str, fallback: (&'a str, &'a str)) -> (&'a str, &'a str) {
    rules
        .iter()
        .find(|rule| rule.pattern.is_match(title))
        .map_or(fallback, |rule| (rule.emoji, rule.label))
}

/// Strip clickbait prefixes and a trailing site name, collapse whitespace
///
/// Falls back to the trimmed input if nothing would be left.
pub fn clean_title(title: &str) -> String {
    let patterns = cleanup_patterns();
    let mut cleaned = title.trim().to_string();

    if let Some(stopwords) = patterns.first() {
        // "Official Trailer: ..." carries more than one tag
        while let Some(range) = stopwords.find(&cleaned).map(|m| m.range()) {
            if range.is_empty() {
                break;
            }
            cleaned.replace_range(range, "");
        }
    }

    let mut cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some(suffix) = patterns.get(1) {
        cleaned = suffix.replace(&cleaned, "").trim().to_string();
    }

    if cleaned.is_empty() {
        title.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        cleaned
    }
}

fn shorten(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let head: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
    format!("{}…", head.trim_end())
}

/// Broadcast text for `item`
///
/// ```text
/// {category}{game} {game name} — {title}
/// In short: {summary}
/// {link}
/// ```
pub fn format_post(item: &NewsItem) -> String {
    let title = clean_title(&item.title);
    let (game_emoji, game_name) = detect(game_rules(), &title, FALLBACK_GAME);
    let (category_emoji, summary) = detect(category_rules(), &title, FALLBACK_CATEGORY);

    format!(
        "{category_emoji}{game_emoji} {game_name} — {}\nIn short: {summary}\n{}",
        shorten(&title),
        item.link
    )
}

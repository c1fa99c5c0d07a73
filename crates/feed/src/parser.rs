//! RSS/Atom first-item extraction

use contracts::Fingerprint;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::reader::Reader;

use crate::error::FeedError;

/// Source tag of news fingerprints
pub const NEWS_SOURCE: &str = "news";

/// Title used when an item has none
const DEFAULT_TITLE: &str = "News";

/// Newest entry of one feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    /// Feed URL the item came from
    pub feed: String,
}

impl NewsItem {
    /// Dedupe key: `"news:<link>"`
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(NEWS_SOURCE, &self.link)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
}

/// Parse the first `<item>` (RSS) or `<entry>` (Atom) of `xml`
///
/// Only direct children of the item are read. RSS takes the `<link>` text;
/// Atom takes the `href` of the first `<link>` whose `rel` is absent or
/// `alternate`. Returns `Ok(None)` when there is no item or the item has no
/// link. A missing or blank title becomes `"News"`.
///
/// # Errors
/// Malformed XML before the first item is complete
pub fn parse_first_item(xml: &str, feed: &str) -> Result<Option<NewsItem>, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut item_depth: Option<usize> = None;
    let mut field: Option<Field> = None;
    let mut buf = String::new();
    let mut title = String::new();
    let mut link = String::new();

    loop {
        match reader.read_event().map_err(|e| FeedError::xml(feed, e))? {
            Event::Start(start) => {
                depth += 1;
                match item_depth {
                    None if is_item(start.name()) => item_depth = Some(depth),
                    Some(item) if depth == item + 1 => {
                        field = child_field(start.name());
                        buf.clear();
                        if field == Some(Field::Link) {
                            if let Some(href) = alternate_href(&start, feed)? {
                                if link.is_empty() {
                                    link = href;
                                }
                                field = None;
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(empty) => {
                let direct_child = item_depth == Some(depth);
                if direct_child && link.is_empty() && child_field(empty.name()) == Some(Field::Link) {
                    if let Some(href) = alternate_href(&empty, feed)? {
                        link = href;
                    }
                }
            }
            Event::Text(text) if field.is_some() => {
                let text = text.unescape().map_err(|e| FeedError::xml(feed, e))?;
                buf.push_str(&text);
            }
            Event::CData(data) if field.is_some() => {
                buf.push_str(&String::from_utf8_lossy(&data));
            }
            Event::End(_) => {
                if item_depth == Some(depth) {
                    return Ok(finish(title, link, feed));
                }
                if item_depth.is_some_and(|item| depth == item + 1) {
                    match field.take() {
                        Some(Field::Title) if title.is_empty() => title = buf.trim().to_string(),
                        Some(Field::Link) if link.is_empty() => link = buf.trim().to_string(),
                        _ => {}
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn finish(title: String, link: String, feed: &str) -> Option<NewsItem> {
    if link.is_empty() {
        return None;
    }
    let title = if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    };
    Some(NewsItem {
        title,
        link,
        feed: feed.to_string(),
    })
}

/// Local name of an unprefixed or `atom:` element
fn tag(name: QName<'_>) -> Option<&[u8]> {
    match name.prefix() {
        None => Some(name.local_name().into_inner()),
        Some(prefix) if prefix.as_ref() == b"atom" => Some(name.local_name().into_inner()),
        Some(_) => None,
    }
}

fn is_item(name: QName<'_>) -> bool {
    matches!(tag(name), Some(b"item" | b"entry"))
}

fn child_field(name: QName<'_>) -> Option<Field> {
    match tag(name)? {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        _ => None,
    }
}

/// `href` of an Atom-style link, skipping `rel="self"`, enclosures and the like
fn alternate_href(link: &BytesStart<'_>, feed: &str) -> Result<Option<String>, FeedError> {
    if let Some(rel) = link
        .try_get_attribute("rel")
        .map_err(|e| FeedError::xml(feed, e))?
    {
        if rel.value.as_ref() != b"alternate" {
            return Ok(None);
        }
    }

    let Some(href) = link
        .try_get_attribute("href")
        .map_err(|e| FeedError::xml(feed, e))?
    else {
        return Ok(None);
    };
    let href = href.unescape_value().map_err(|e| FeedError::xml(feed, e))?;
    let href = href.trim();
    Ok((!href.is_empty()).then(|| href.to_string()))
}

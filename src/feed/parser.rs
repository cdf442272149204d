//! RSS 2.0 parser producing a single-channel [`FeedDocument`].

use roxmltree::Node;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{Channel, Enclosure, Episode, FeedDocument, Guid};

const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";

/// Parse RSS text into a feed document.
///
/// Expected structure:
/// ```xml
/// <rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
///   <channel>
///     <title>Show</title>
///     <item>
///       <guid isPermaLink="false">ep-1</guid>
///       <title>Episode 1</title>
///       <enclosure url="https://cdn/ep1.mp3" length="1234" type="audio/mpeg"/>
///     </item>
///   </channel>
/// </rss>
/// ```
///
/// Fails with [`AppError::Parse`] on malformed XML, a root other than `<rss>`, or a
/// channel count other than one.
pub fn parse_feed(text: &str) -> AppResult<FeedDocument> {
    let doc = roxmltree::Document::parse(text)?;

    let root = doc.root_element();
    if root.tag_name().name() != "rss" {
        return Err(AppError::Parse(format!(
            "Root element must be <rss>, found <{}>",
            root.tag_name().name()
        )));
    }

    let mut channels = root.children().filter(|n| is_element(n, "channel"));
    let channel = channels
        .next()
        .ok_or_else(|| AppError::Parse("Feed has no <channel> element".to_string()))?;
    if channels.next().is_some() {
        return Err(AppError::Parse(
            "Feed has more than one <channel> element".to_string(),
        ));
    }

    Ok(FeedDocument::new(parse_channel(&channel)))
}

fn parse_channel(node: &Node) -> Channel {
    let mut channel = Channel::default();

    for child in node.children().filter(|n| n.is_element()) {
        let itunes = is_itunes(&child);
        match (child.tag_name().name(), itunes) {
            ("title", false) => channel.title = text_of(&child),
            ("link", false) => channel.link = text_of(&child),
            ("description", false) => channel.description = text_of(&child),
            ("language", false) => channel.language = non_empty(&child),
            ("copyright", false) => channel.copyright = non_empty(&child),
            ("pubDate", false) => channel.pub_date = non_empty(&child),
            ("lastBuildDate", false) => channel.last_build_date = non_empty(&child),
            ("category", false) => {
                if let Some(category) = non_empty(&child) {
                    channel.categories.push(category);
                }
            }
            ("image", false) => {
                // RSS image only fills the gap; itunes:image wins when both exist.
                if channel.image_url.is_none() {
                    channel.image_url = child
                        .children()
                        .find(|n| is_element(n, "url"))
                        .and_then(|n| non_empty(&n));
                }
            }
            ("author", true) => channel.author = non_empty(&child),
            ("image", true) => {
                if let Some(href) = child.attribute("href") {
                    channel.image_url = Some(href.trim().to_string());
                }
            }
            ("category", true) => {
                if let Some(text) = child.attribute("text") {
                    channel.categories.push(text.trim().to_string());
                }
            }
            ("explicit", true) => channel.explicit = parse_explicit(&child),
            ("item", false) => channel.items.push(parse_item(&child)),
            _ => {}
        }
    }

    channel
}

fn parse_item(node: &Node) -> Episode {
    let mut guid: Option<Guid> = None;
    let mut episode = Episode::new(Guid::new(String::new(), false), String::new());

    for child in node.children().filter(|n| n.is_element()) {
        let itunes = is_itunes(&child);
        match (child.tag_name().name(), itunes) {
            ("guid", false) => {
                if let Some(value) = non_empty(&child) {
                    // RSS default for isPermaLink is true.
                    let is_perma_link = child
                        .attribute("isPermaLink")
                        .map(|v| v.trim().eq_ignore_ascii_case("true"))
                        .unwrap_or(true);
                    guid = Some(Guid::new(value, is_perma_link));
                }
            }
            ("title", false) => episode.title = text_of(&child),
            ("description", false) => episode.description = text_of(&child),
            ("link", false) => episode.link = non_empty(&child),
            ("pubDate", false) => episode.pub_date = non_empty(&child),
            ("enclosure", false) => episode.enclosure = parse_enclosure(&child),
            ("duration", true) => episode.duration = non_empty(&child),
            ("explicit", true) => episode.explicit = parse_explicit(&child),
            ("episode", true) => {
                episode.episode_number = child.text().and_then(|t| t.trim().parse().ok());
            }
            _ => {}
        }
    }

    episode.guid = guid.unwrap_or_else(|| {
        tracing::debug!("Item `{}` has no guid, generating one", episode.title);
        Guid::new(Uuid::new_v4().to_string(), false)
    });
    episode
}

fn parse_enclosure(node: &Node) -> Option<Enclosure> {
    let url = node.attribute("url")?.trim();
    if url.is_empty() {
        return None;
    }
    Some(Enclosure {
        url: url.to_string(),
        length: node
            .attribute("length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0),
        mime_type: node.attribute("type").unwrap_or_default().trim().to_string(),
    })
}

fn parse_explicit(node: &Node) -> Option<bool> {
    match node.text()?.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "explicit" => Some(true),
        "false" | "no" | "clean" => Some(false),
        _ => None,
    }
}

fn is_element(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace().is_none()
}

fn is_itunes(node: &Node) -> bool {
    node.tag_name().namespace() == Some(ITUNES_NS)
}

/// Concatenated text content, including CDATA sections.
fn text_of(node: &Node) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

fn non_empty(node: &Node) -> Option<String> {
    let text = text_of(node);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Rusty Waves</title>
    <link>https://example.com</link>
    <description><![CDATA[A show about <b>systems</b>]]></description>
    <language>en-us</language>
    <lastBuildDate>Mon, 01 Jan 2024 10:00:00 +0000</lastBuildDate>
    <itunes:author>Ferris</itunes:author>
    <itunes:image href="https://example.com/cover.png"/>
    <itunes:explicit>no</itunes:explicit>
    <itunes:category text="Technology"/>
    <item>
      <guid isPermaLink="false">ep-2</guid>
      <title>Second</title>
      <enclosure url="https://cdn.example.com/ep2.mp3" length="2048" type="audio/mpeg"/>
      <itunes:duration>00:42:00</itunes:duration>
      <itunes:episode>2</itunes:episode>
    </item>
    <item>
      <guid>https://example.com/ep-1</guid>
      <title>First</title>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_channel_and_items() {
        let feed = parse_feed(SAMPLE).unwrap();
        let channel = &feed.channel;

        assert_eq!(channel.title, "Rusty Waves");
        assert_eq!(channel.description, "A show about <b>systems</b>");
        assert_eq!(channel.language.as_deref(), Some("en-us"));
        assert_eq!(channel.author.as_deref(), Some("Ferris"));
        assert_eq!(
            channel.image_url.as_deref(),
            Some("https://example.com/cover.png")
        );
        assert_eq!(channel.explicit, Some(false));
        assert_eq!(channel.categories, vec!["Technology".to_string()]);
        assert_eq!(
            channel.last_build_date.as_deref(),
            Some("Mon, 01 Jan 2024 10:00:00 +0000")
        );

        assert_eq!(feed.episodes().len(), 2);
        let second = &feed.episodes()[0];
        assert_eq!(second.guid, Guid::new("ep-2", false));
        assert_eq!(second.duration.as_deref(), Some("00:42:00"));
        assert_eq!(second.episode_number, Some(2));
        let enclosure = second.enclosure.as_ref().unwrap();
        assert_eq!(enclosure.length, 2048);
        assert_eq!(enclosure.mime_type, "audio/mpeg");

        let first = &feed.episodes()[1];
        assert!(first.guid.is_perma_link);
        assert_eq!(first.guid_text(), "https://example.com/ep-1");
    }

    #[test]
    fn test_item_without_guid_gets_generated_identity() {
        let xml = r#"<rss><channel><title>t</title><item><title>a</title></item></channel></rss>"#;
        let feed = parse_feed(xml).unwrap();
        let guid = &feed.episodes()[0].guid;
        assert!(!guid.value.is_empty());
        assert!(!guid.is_perma_link);
    }

    #[test]
    fn test_rejects_malformed_xml() {
        let err = parse_feed("<rss><channel>").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn test_rejects_wrong_root() {
        let err = parse_feed("<feed><title>atom</title></feed>").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn test_rejects_missing_or_multiple_channels() {
        let err = parse_feed("<rss version=\"2.0\"></rss>").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));

        let xml = "<rss><channel><title>a</title></channel><channel><title>b</title></channel></rss>";
        let err = parse_feed(xml).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }
}

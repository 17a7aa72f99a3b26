//! Feed encoders: RSS with torznab attributes, Atom and JSON.

use chrono::{DateTime, Utc};
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use serde::Serialize;
use std::io::Cursor;
use thiserror::Error;
use uuid::Uuid;

use super::FeedFormat;
use crate::search::{ItemState, ResultFeed, ResultItem};

pub(crate) type XmlWriter = Writer<Cursor<Vec<u8>>>;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("XML encoding failed: {0}")]
    Xml(String),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// An encoded response body with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFeed {
    pub content_type: &'static str,
    pub body: String,
}

pub fn encode_feed(feed: &ResultFeed, format: FeedFormat) -> Result<EncodedFeed, EncodeError> {
    match format {
        FeedFormat::Xml => Ok(EncodedFeed {
            content_type: "application/rss+xml; charset=utf-8",
            body: rss(feed)?,
        }),
        FeedFormat::Atom => Ok(EncodedFeed {
            content_type: "application/atom+xml; charset=utf-8",
            body: atom(feed)?,
        }),
        FeedFormat::Json => Ok(EncodedFeed {
            content_type: "application/json",
            body: serde_json::to_string(&JsonFeed::from(feed))?,
        }),
    }
}

pub(crate) fn new_writer() -> Result<XmlWriter, EncodeError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    Ok(writer)
}

pub(crate) fn finish(writer: XmlWriter) -> Result<String, EncodeError> {
    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_error)
}

pub(crate) fn xml_error(e: impl std::fmt::Display) -> EncodeError {
    EncodeError::Xml(e.to_string())
}

pub(crate) fn start(writer: &mut XmlWriter, elem: BytesStart<'_>) -> Result<(), EncodeError> {
    writer.write_event(Event::Start(elem)).map_err(xml_error)
}

pub(crate) fn end(writer: &mut XmlWriter, name: &str) -> Result<(), EncodeError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}

pub(crate) fn empty(writer: &mut XmlWriter, elem: BytesStart<'_>) -> Result<(), EncodeError> {
    writer.write_event(Event::Empty(elem)).map_err(xml_error)
}

pub(crate) fn write_text_element(
    writer: &mut XmlWriter,
    name: &str,
    text: &str,
) -> Result<(), EncodeError> {
    start(writer, BytesStart::new(name))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    end(writer, name)
}

fn write_torznab_attr(writer: &mut XmlWriter, name: &str, value: &str) -> Result<(), EncodeError> {
    let mut attr = BytesStart::new("torznab:attr");
    attr.push_attribute(("name", name));
    attr.push_attribute(("value", value));
    empty(writer, attr)
}

fn rss(feed: &ResultFeed) -> Result<String, EncodeError> {
    let mut writer = new_writer()?;
    let meta = feed.meta();

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", "http://www.w3.org/2005/Atom"));
    rss.push_attribute(("xmlns:torznab", "http://torznab.com/schemas/2015/feed"));
    start(&mut writer, rss)?;
    start(&mut writer, BytesStart::new("channel"))?;

    let mut self_link = BytesStart::new("atom:link");
    self_link.push_attribute(("href", meta.link.as_str()));
    self_link.push_attribute(("rel", "self"));
    self_link.push_attribute(("type", "application/rss+xml"));
    empty(&mut writer, self_link)?;

    write_text_element(&mut writer, "title", &meta.title)?;
    write_text_element(&mut writer, "description", &meta.title)?;
    write_text_element(&mut writer, "link", &meta.link)?;
    write_text_element(&mut writer, "language", &meta.language)?;
    write_text_element(&mut writer, "category", &meta.category)?;

    for item in feed.items() {
        write_rss_item(&mut writer, item)?;
    }

    end(&mut writer, "channel")?;
    end(&mut writer, "rss")?;
    finish(writer)
}

fn write_rss_item(writer: &mut XmlWriter, result: &ResultItem) -> Result<(), EncodeError> {
    let item = result.as_scrape_item();
    start(writer, BytesStart::new("item"))?;

    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "guid", &result.uuid().to_string())?;
    write_text_element(writer, "link", &item.link)?;
    if let Some(details) = &item.details_url {
        write_text_element(writer, "comments", details)?;
    }
    if let Some(date) = item.publish_date {
        write_text_element(writer, "pubDate", &date.to_rfc2822())?;
    }
    write_text_element(writer, "size", &item.size.to_string())?;
    for cat in &item.categories {
        write_text_element(writer, "category", &cat.to_string())?;
    }

    if !item.link.is_empty() {
        let mut enclosure = BytesStart::new("enclosure");
        enclosure.push_attribute(("url", item.link.as_str()));
        enclosure.push_attribute(("length", item.size.to_string().as_str()));
        enclosure.push_attribute(("type", "application/x-bittorrent"));
        empty(writer, enclosure)?;
    }

    for cat in &item.categories {
        write_torznab_attr(writer, "category", &cat.to_string())?;
    }
    write_torznab_attr(writer, "size", &item.size.to_string())?;
    write_torznab_attr(writer, "seeders", &item.seeders.to_string())?;
    write_torznab_attr(
        writer,
        "peers",
        &(item.seeders.saturating_add(item.leechers)).to_string(),
    )?;
    if let Some(hash) = &item.info_hash {
        write_torznab_attr(writer, "infohash", hash)?;
    }
    if let Some(magnet) = &item.magnet_uri {
        write_torznab_attr(writer, "magneturl", magnet)?;
    }
    if let Some(imdb) = &item.imdb_id {
        write_torznab_attr(writer, "imdbid", imdb)?;
    }
    if let Some(tmdb) = item.tmdb_id {
        write_torznab_attr(writer, "tmdbid", &tmdb.to_string())?;
    }

    end(writer, "item")
}

fn atom(feed: &ResultFeed) -> Result<String, EncodeError> {
    let mut writer = new_writer()?;
    let meta = feed.meta();

    let mut root = BytesStart::new("feed");
    root.push_attribute(("xmlns", "http://www.w3.org/2005/Atom"));
    start(&mut writer, root)?;

    write_text_element(&mut writer, "id", &meta.id)?;
    write_text_element(&mut writer, "title", &meta.title)?;
    let updated = meta.updated;
    write_text_element(&mut writer, "updated", &updated.to_rfc3339())?;

    let mut link = BytesStart::new("link");
    link.push_attribute(("href", meta.link.as_str()));
    link.push_attribute(("rel", "self"));
    empty(&mut writer, link)?;

    let mut category = BytesStart::new("category");
    category.push_attribute(("term", meta.category.as_str()));
    empty(&mut writer, category)?;

    for result in feed.items() {
        let item = result.as_scrape_item();
        start(&mut writer, BytesStart::new("entry"))?;

        write_text_element(&mut writer, "id", &format!("urn:uuid:{}", result.uuid()))?;
        write_text_element(&mut writer, "title", &item.title)?;
        let updated = item.publish_date.unwrap_or(updated);
        write_text_element(&mut writer, "updated", &updated.to_rfc3339())?;

        let mut enclosure = BytesStart::new("link");
        enclosure.push_attribute(("href", item.link.as_str()));
        enclosure.push_attribute(("rel", "enclosure"));
        enclosure.push_attribute(("type", "application/x-bittorrent"));
        enclosure.push_attribute(("length", item.size.to_string().as_str()));
        empty(&mut writer, enclosure)?;

        if let Some(details) = &item.details_url {
            let mut alternate = BytesStart::new("link");
            alternate.push_attribute(("href", details.as_str()));
            alternate.push_attribute(("rel", "alternate"));
            empty(&mut writer, alternate)?;
        }

        for cat in &item.categories {
            let mut category = BytesStart::new("category");
            category.push_attribute(("term", cat.to_string().as_str()));
            empty(&mut writer, category)?;
        }

        end(&mut writer, "entry")?;
    }

    end(&mut writer, "feed")?;
    finish(writer)
}

#[derive(Serialize)]
struct JsonFeed<'a> {
    id: &'a str,
    title: &'a str,
    link: &'a str,
    language: &'a str,
    category: &'a str,
    items: Vec<JsonItem<'a>>,
}

/// Client-facing view of an item; never carries the source link.
#[derive(Serialize)]
struct JsonItem<'a> {
    id: Uuid,
    title: &'a str,
    link: &'a str,
    site: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    publish_date: Option<DateTime<Utc>>,
    size: u64,
    seeders: u32,
    leechers: u32,
    categories: &'a [u32],
    #[serde(skip_serializing_if = "Option::is_none")]
    info_hash: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    magnet_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    imdb_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tmdb_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<ItemState>,
}

impl<'a> From<&'a ResultFeed> for JsonFeed<'a> {
    fn from(feed: &'a ResultFeed) -> Self {
        let meta = feed.meta();
        Self {
            id: &meta.id,
            title: &meta.title,
            link: &meta.link,
            language: &meta.language,
            category: &meta.category,
            items: feed
                .items()
                .iter()
                .map(|result| {
                    let item = result.as_scrape_item();
                    JsonItem {
                        id: result.uuid(),
                        title: &item.title,
                        link: &item.link,
                        site: &item.site,
                        publish_date: item.publish_date,
                        size: item.size,
                        seeders: item.seeders,
                        leechers: item.leechers,
                        categories: &item.categories,
                        info_hash: item.info_hash.as_deref(),
                        magnet_uri: item.magnet_uri.as_deref(),
                        details_url: item.details_url.as_deref(),
                        imdb_id: item.imdb_id.as_deref(),
                        tmdb_id: item.tmdb_id,
                        state: match result {
                            ResultItem::Tracked(tracked) => Some(tracked.state),
                            ResultItem::Scraped(_) => None,
                        },
                    }
                })
                .collect(),
        }
    }
}

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// The body contained no XML element at all (e.g. a plain-text error page
    /// served with status 200). Kept distinct so junk is routed to the failure
    /// policy instead of being cached as an empty feed.
    #[error("document contains no XML root element")]
    NotXml,
    #[error("document truncated inside an item element")]
    Truncated,
}

/// One `<item>` element, fields captured as raw inner markup.
///
/// A missing child leaves the field `None`; it is never an error. Only the
/// first occurrence of each child is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
}

/// A parsed feed: every `<item>` element in document order. This is the unit
/// the cache stores; items are projected out of it per request.
#[derive(Debug, Clone, Default)]
pub struct FeedDocument {
    pub items: Vec<RawItem>,
}

fn item_field<'f>(item: &'f mut RawItem, name: &[u8]) -> Option<&'f mut Option<String>> {
    match name {
        b"title" => Some(&mut item.title),
        b"link" => Some(&mut item.link),
        b"pubDate" => Some(&mut item.pub_date),
        _ => None,
    }
}

/// Parses an RSS-shaped XML document, collecting `<item>` elements wherever
/// they appear. Channel-level `title`/`link` elements are not item fields and
/// are ignored.
///
/// While inside an item, every child element is consumed wholesale (unknown
/// children included), so nothing nested can be mistaken for a top-level
/// element.
pub fn parse_feed(xml: &str) -> Result<FeedDocument, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut saw_element = false;
    let mut current: Option<RawItem> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                saw_element = true;
                match current.as_mut() {
                    None => {
                        if start.local_name().as_ref() == b"item" {
                            current = Some(RawItem::default());
                        }
                    }
                    Some(item) => {
                        let raw = reader.read_text(start.name())?;
                        if let Some(field) = item_field(item, start.local_name().as_ref()) {
                            // First occurrence wins; duplicates are already consumed.
                            if field.is_none() {
                                *field = Some(raw.trim().to_string());
                            }
                        }
                    }
                }
            }
            Event::Empty(start) => {
                saw_element = true;
                match current.as_mut() {
                    None => {
                        if start.local_name().as_ref() == b"item" {
                            items.push(RawItem::default());
                        }
                    }
                    Some(item) => {
                        if let Some(field) = item_field(item, start.local_name().as_ref()) {
                            if field.is_none() {
                                *field = Some(String::new());
                            }
                        }
                    }
                }
            }
            Event::End(end) => {
                if end.local_name().as_ref() == b"item" {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                }
            }
            Event::Eof => {
                if current.is_some() {
                    return Err(ParseError::Truncated);
                }
                break;
            }
            _ => {}
        }
    }

    if !saw_element {
        return Err(ParseError::NotXml);
    }
    Ok(FeedDocument { items })
}

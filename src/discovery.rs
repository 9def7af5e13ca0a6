//! Hub and topic URL discovery.
//!
//! <https://www.w3.org/TR/websub/#discovery>

use std::str::FromStr;

use http::header::{HeaderMap, CONTENT_TYPE, LINK};
use http::Request;
use mime::Mime;
use scraper::{ElementRef, Html};
use xmltree::{Element, XMLNode};

use crate::util::consts::{REL_HUB, REL_SELF};

/// Hub and topic URLs advertised by a resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discovery {
    /// Hub URLs in the order they were advertised. May be empty.
    pub hub: Vec<String>,
    /// The topic URL.
    pub topic: String,
}

/// Media types that can be inspected for embedded link elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    Xml,
    Html,
}

/// Error extracting a [`Discovery`] from a response.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExtractError {
    #[error("cannot discover links in a resource of media type {0:?}")]
    UnsupportedMediaType(Option<String>),
    #[error("malformed XML document")]
    Xml(#[source] xmltree::ParseError),
    #[error("the resource does not declare a `rel=\"self\"` link")]
    MissingSelf,
}

/// Extracts hub and topic URLs from a response to a discovery request for `url`.
///
/// The mechanisms are tried in order, stopping at the first match:
///
/// 1. HTTP `Link` headers. Every header value becomes a `hub` entry verbatim, and the topic is
///    the first `rel="self"` target among them, or `url` if there is none.
/// 2. `rel="hub"` and `rel="self"` elements of an XML document.
/// 3. `rel="hub"` and `rel="self"` elements of an HTML document.
pub fn extract(url: &str, headers: &HeaderMap, body: &[u8]) -> Result<Discovery, ExtractError> {
    let links: Vec<String> = headers
        .get_all(LINK)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();
    if !links.is_empty() {
        log::debug!("Discovered {} `Link` header(s) at {}", links.len(), url);
        let topic = self_link(links.iter().map(String::as_str))
            .unwrap_or(url)
            .to_owned();
        return Ok(Discovery { hub: links, topic });
    }

    let content_type = headers.get(CONTENT_TYPE);
    let media_type = content_type
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<MediaType>().ok());

    if let Some(MediaType::Xml) = media_type {
        log::debug!("Looking for link elements in XML document at {}", url);
        return from_xml(body);
    }

    if let Some(MediaType::Html) = media_type {
        log::debug!("Looking for link elements in HTML document at {}", url);
        return from_html(body);
    }

    Err(ExtractError::UnsupportedMediaType(
        content_type.map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()),
    ))
}

/// Builds the `GET` request issued to discover the hub of `url`.
///
/// Only the given headers are sent; no content negotiation is performed.
pub(crate) fn request<B>(url: &str, headers: HeaderMap) -> Result<Request<B>, http::Error>
where
    B: From<Vec<u8>>,
{
    let mut req = Request::get(url).body(B::from(Vec::new()))?;
    *req.headers_mut() = headers;
    Ok(req)
}

fn from_xml(body: &[u8]) -> Result<Discovery, ExtractError> {
    let root = Element::parse(body).map_err(ExtractError::Xml)?;

    let mut hub = Vec::new();
    let mut topic = None;

    // Pre-order traversal so that the links are collected in document order.
    let mut stack = vec![&root];
    while let Some(elm) = stack.pop() {
        let href = elm.attributes.get("href");
        match elm.attributes.get("rel").map(String::as_str) {
            Some(REL_HUB) => hub.extend(href.cloned()),
            Some(REL_SELF) if topic.is_none() => topic = href.cloned(),
            _ => {}
        }
        stack.extend(elm.children.iter().rev().filter_map(|node| match node {
            XMLNode::Element(child) => Some(child),
            _ => None,
        }));
    }

    let topic = topic.ok_or(ExtractError::MissingSelf)?;
    Ok(Discovery { hub, topic })
}

fn from_html(body: &[u8]) -> Result<Discovery, ExtractError> {
    let document = Html::parse_document(&String::from_utf8_lossy(body));

    let mut hub = Vec::new();
    let mut topic = None;

    for elm in document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
    {
        let elm = elm.value();
        let (rel, href) = match (elm.attr("rel"), elm.attr("href")) {
            (Some(rel), Some(href)) => (rel, href),
            _ => continue,
        };
        if has_rel_token(rel, REL_HUB) {
            hub.push(href.to_owned());
        }
        if topic.is_none() && has_rel_token(rel, REL_SELF) {
            topic = Some(href.to_owned());
        }
    }

    let topic = topic.ok_or(ExtractError::MissingSelf)?;
    Ok(Discovery { hub, topic })
}

/// Returns the target of the first `Link` entry with `rel="self"` among the header values.
fn self_link<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .flat_map(LinkEntries)
        .find(|&(_, params)| {
            params
                .split(';')
                .filter_map(|param| param.split_once('='))
                .filter(|(name, _)| name.trim().eq_ignore_ascii_case("rel"))
                .any(|(_, value)| has_rel_token(value.trim().trim_matches('"'), REL_SELF))
        })
        .map(|(target, _)| target)
}

/// `rel` attribute values are space-separated lists of case-insensitive link types.
fn has_rel_token(rel: &str, token: &str) -> bool {
    rel.split_ascii_whitespace()
        .any(|t| t.eq_ignore_ascii_case(token))
}

/// Iterator over `(target, parameters)` pairs of a `Link` header value.
///
/// <https://www.rfc-editor.org/rfc/rfc8288#section-3>
struct LinkEntries<'a>(&'a str);

impl<'a> Iterator for LinkEntries<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let s = self.0;
        let start = memchr::memchr(b'<', s.as_bytes())? + 1;
        let end = start + memchr::memchr(b'>', s[start..].as_bytes())?;
        let rest = &s[end + 1..];

        // The parameters extend up to the next comma that is not within a quoted string.
        let mut quoted = false;
        let params_end = rest
            .bytes()
            .position(|b| match b {
                b'"' => {
                    quoted = !quoted;
                    false
                }
                b',' => !quoted,
                _ => false,
            })
            .unwrap_or(rest.len());

        self.0 = &rest[params_end..];
        Some((s[start..end].trim(), &rest[..params_end]))
    }
}

impl FromStr for MediaType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        let mime = if let Ok(m) = s.parse::<Mime>() {
            m
        } else {
            return Err(());
        };

        if (mime.type_() == mime::TEXT && mime.subtype() == mime::HTML)
            || (mime.type_() == mime::APPLICATION
                && mime.subtype() == "xhtml"
                && mime.suffix() == Some(mime::XML))
        {
            Ok(MediaType::Html)
        } else if ((mime.type_() == mime::APPLICATION || mime.type_() == mime::TEXT)
            && mime.subtype() == mime::XML)
            || mime.suffix() == Some(mime::XML)
        {
            Ok(MediaType::Xml)
        } else {
            Err(())
        }
    }
}

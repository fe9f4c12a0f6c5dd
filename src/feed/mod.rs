//! Feed adapters: XML parsing into [`FeedNode`] trees and, with the `http`
//! feature, authenticated retrieval of the feed.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{fetch_documents, fetch_feed};

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::core::{FeedNode, IngestError};

/// Element name of one order inside the feed root.
pub const DOCUMENT_ELEMENT: &str = "Document";

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Parse an XML document into a node tree rooted at its top element.
///
/// Attributes are ignored; namespace prefixes are stripped. Returns `None`
/// for input without any element.
pub fn parse_tree(xml: &str) -> Result<Option<FeedNode>, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Sentinel parent collecting the top element.
    let mut stack = vec![FeedNode::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(FeedNode::new(element_name(e.local_name().as_ref())));
            }
            Ok(Event::Empty(ref e)) => {
                let node = FeedNode::new(element_name(e.local_name().as_ref()));
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| IngestError::FeedTransport(format!("invalid text: {e}")))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let mut node = stack
                    .pop()
                    .ok_or_else(|| IngestError::FeedTransport("unbalanced end tag".into()))?;
                node.text = node.text.trim().to_string();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => {
                        return Err(IngestError::FeedTransport("unbalanced end tag".into()));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IngestError::FeedTransport(format!(
                    "XML parse error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(IngestError::FeedTransport(format!(
            "unexpected end of feed inside <{}>",
            stack.last().map(|n| n.name.as_str()).unwrap_or_default()
        )));
    }
    Ok(stack.pop().and_then(|sentinel| sentinel.children.into_iter().next()))
}

/// Split a feed into its `Document` elements.
///
/// An empty or whitespace-only body is an empty batch. Malformed XML is a
/// [`IngestError::FeedTransport`] error and fails the whole batch.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedNode>, IngestError> {
    if xml.trim().is_empty() {
        return Ok(Vec::new());
    }
    let Some(root) = parse_tree(xml)? else {
        return Ok(Vec::new());
    };
    let documents: Vec<FeedNode> = root
        .children
        .into_iter()
        .filter(|child| child.name == DOCUMENT_ELEMENT)
        .collect();
    tracing::debug!(documents = documents.len(), "feed parsed");
    Ok(documents)
}

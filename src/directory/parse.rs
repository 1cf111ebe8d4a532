//! Turns NationStates XML responses into records
use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::Result;
use crate::protocol_violation;
use crate::record::{self, NationRecord};

const NATION_TAG: &str = "nation";
const HAPPENINGS_TAG: &str = "happenings";
const EVENT_TAG: &str = "event";
const TIMESTAMP_TAG: &str = "timestamp";
const TEXT_TAG: &str = "text";
const RECRUITABLE_TAG: &str = "tgcanrecruit";

fn find_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name().eq_ignore_ascii_case(tag))
}

fn element_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

/// Parse a nation shard response.
///
/// Every leaf element under `<NATION>` becomes an attribute, keyed by its
/// lower-cased tag. Elements with children of their own are skipped.
pub fn parse_nation(xml: &str) -> Result<NationRecord> {
    let doc = Document::parse(xml)?;
    let nation = find_element(doc.root_element(), NATION_TAG)
        .ok_or_else(|| protocol_violation!("response has no <NATION> element"))?;

    let mut record = NationRecord::default();
    for child in element_children(nation) {
        if element_children(child).next().is_some() {
            debug!("Skipping nested nation attribute {}", child.tag_name().name());
            continue;
        }
        record.set(
            child.tag_name().name().to_lowercase(),
            child.text().unwrap_or_default().trim(),
        );
    }
    if record.get(record::NAME).is_none() {
        if let Some(id) = nation.attribute("id") {
            record.set(record::NAME, id);
        }
    }
    Ok(record)
}

/// Parse the world happenings feed filtered to foundings.
///
/// Each event reads like `@@potato@@ was founded in %%the_field%%.`; events
/// that do not name both a nation and a region are dropped.
pub fn parse_foundings(xml: &str) -> Result<Vec<NationRecord>> {
    let doc = Document::parse(xml)?;
    let happenings = find_element(doc.root_element(), HAPPENINGS_TAG)
        .ok_or_else(|| protocol_violation!("response has no <HAPPENINGS> element"))?;

    let mut foundings = Vec::new();
    for event in element_children(happenings)
        .filter(|n| n.tag_name().name().eq_ignore_ascii_case(EVENT_TAG))
    {
        let text = find_element(event, TEXT_TAG)
            .and_then(|n| n.text())
            .unwrap_or_default();
        let timestamp = find_element(event, TIMESTAMP_TAG)
            .and_then(|n| n.text())
            .unwrap_or_default();
        match (text.split("@@").nth(1), text.split("%%").nth(1)) {
            (Some(name), Some(region)) if !name.is_empty() => {
                foundings.push(
                    NationRecord::new(name)
                        .with(record::FOUNDING_REGION, region)
                        .with(record::FOUNDED_AT, timestamp.trim()),
                );
            }
            _ => debug!("Ignoring happening that is not a founding: {}", text),
        }
    }
    Ok(foundings)
}

/// Parse a `tgcanrecruit` shard. Only `1` and `0` are accepted.
pub fn parse_recruitable(xml: &str) -> Result<bool> {
    let doc = Document::parse(xml)?;
    let flag = find_element(doc.root_element(), RECRUITABLE_TAG)
        .and_then(|n| n.text())
        .map(str::trim);
    match flag {
        Some("1") => Ok(true),
        Some("0") => Ok(false),
        _ => Err(protocol_violation!("UNKNOWN RESPONSE: {}", xml.trim())),
    }
}

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::types::{Combined, Entry, Instance, Tunable};
use crate::Error;

/// An untyped XML element, kept only long enough to be reshaped into the
/// structural types in [`crate::types`]. The format's interesting kinds
/// (`combined`, `R`, `I`, `M`, `r`, and every generic tunable) all share
/// this same shape; only the attribute names carry meaning.
struct RawNode {
    tag: String,
    attrs: HashMap<String, String>,
    children: Vec<RawNode>,
    text: String,
}

impl RawNode {
    fn new(tag: String, attrs: HashMap<String, String>) -> Self {
        RawNode {
            tag,
            attrs,
            children: Vec::new(),
            text: String::new(),
        }
    }
}

pub fn parse(bytes: &[u8]) -> Result<Combined, Error> {
    let root = parse_raw(bytes)?;
    to_combined(root)
}

fn parse_raw(bytes: &[u8]) -> Result<RawNode, Error> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut stack: Vec<RawNode> = Vec::new();
    let mut root: Option<RawNode> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                stack.push(RawNode::new(tag_name(&e)?, attrs(&e)?));
            }
            Event::Empty(e) => {
                let node = RawNode::new(tag_name(&e)?, attrs(&e)?);
                attach(&mut stack, &mut root, node);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| Error::Malformed("unbalanced XML element".into()))?;
                attach(&mut stack, &mut root, node);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| Error::Malformed("empty document".into()))
}

fn attach(stack: &mut [RawNode], root: &mut Option<RawNode>, node: RawNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}

fn tag_name(e: &BytesStart) -> Result<String, Error> {
    Ok(String::from_utf8(e.name().as_ref().to_vec())?)
}

fn attrs(e: &BytesStart) -> Result<HashMap<String, String>, Error> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())?;
        let value = attr.unescape_value()?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn attr(node: &RawNode, key: &str) -> Option<String> {
    node.attrs.get(key).cloned()
}

fn to_combined(root: RawNode) -> Result<Combined, Error> {
    if root.tag != "combined" {
        return Err(Error::Malformed(format!(
            "expected <combined> root, found <{}>",
            root.tag
        )));
    }
    let entries = root
        .children
        .into_iter()
        .filter(|c| c.tag == "R")
        .map(to_entry)
        .collect::<Result<_, _>>()?;
    Ok(Combined { entries })
}

fn to_entry(node: RawNode) -> Result<Entry, Error> {
    let type_name =
        attr(&node, "n").ok_or_else(|| Error::Malformed("<R> element missing n attribute".into()))?;

    let mut instances = Vec::new();
    let mut modules = Vec::new();
    for child in node.children {
        match child.tag.as_str() {
            "I" => instances.push(to_instance(child)?),
            "M" => modules.push(to_instance(child)?),
            _ => {}
        }
    }

    Ok(Entry {
        type_name,
        instances,
        modules,
    })
}

fn to_instance(node: RawNode) -> Result<Instance, Error> {
    let xml_tag = node.tag.clone();
    let class = attr(&node, "c");
    let instance_type = attr(&node, "i");
    let module = attr(&node, "m");
    let name = attr(&node, "n");
    let id = attr(&node, "s");
    let tunables = node
        .children
        .into_iter()
        .map(to_tunable)
        .collect::<Result<_, _>>()?;

    Ok(Instance {
        xml_tag,
        class,
        instance_type,
        module,
        name,
        id,
        tunables,
    })
}

fn to_tunable(node: RawNode) -> Result<Tunable, Error> {
    let xml_tag = node.tag.clone();
    let type_attr = attr(&node, "t");
    let path = attr(&node, "p");
    let enum_value = attr(&node, "ev");
    let name = attr(&node, "n");
    let reference_id = attr(&node, "x").and_then(|v| v.parse::<i64>().ok());
    let chardata = node.text.trim().to_string();
    let tunables = node
        .children
        .into_iter()
        .map(to_tunable)
        .collect::<Result<_, _>>()?;

    Ok(Tunable {
        xml_tag,
        type_attr,
        path,
        enum_value,
        name,
        reference_id,
        tunables,
        chardata,
    })
}

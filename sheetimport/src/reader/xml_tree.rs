//! Minimal immutable element tree built from quick-xml events
//!
//! Worksheets are walked twice during an import, so each member is parsed
//! once into this tree and both passes borrow it.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::BufRead;

use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Local name, namespace prefix stripped
    pub name: String,
    attrs: Vec<(String, String)>,
    /// Character data directly inside this element
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Attribute by qualified key. A prefixed key such as `r:id` also
    /// matches the same local name under a different prefix.
    pub fn attr(&self, key: &str) -> Option<&str> {
        if let Some((_, v)) = self.attrs.iter().find(|(k, _)| k == key) {
            return Some(v);
        }
        let (_, local) = key.split_once(':')?;
        self.attrs
            .iter()
            .find(|(k, _)| k.split_once(':').is_some_and(|(_, l)| l == local))
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root: Element,
}

/// Parse a whole document, requiring its root element to be `expected_root`
pub fn parse<R: BufRead>(source: R, expected_root: &str) -> Result<XmlDocument> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(element_from(&e)?),
            Event::Empty(e) => {
                let element = element_from(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ImportError::archive("unbalanced end tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(e.unescape()?.as_ref());
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ImportError::archive("document ended inside an element"));
    }
    let root = root.ok_or_else(|| ImportError::archive("document has no root element"))?;
    if root.name != expected_root {
        return Err(ImportError::archive(format!(
            "expected root element <{}>, found <{}>",
            expected_root, root.name
        )));
    }
    Ok(XmlDocument { root })
}

fn element_from(e: &BytesStart) -> Result<Element> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        attrs.push((key, attr.unescape_value()?.into_owned()));
    }
    Ok(Element {
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        attrs,
        text: String::new(),
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ImportError::archive("multiple root elements")),
    }
    Ok(())
}

//! Owned XML element tree with explicit escaping.

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

/// Errors from XML parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum XmlError {
    /// The document is not well-formed.
    #[error("malformed XML: {reason}")]
    Malformed {
        /// Parser diagnostic.
        reason: String,
    },

    /// The document contains no root element.
    #[error("malformed XML: no root element")]
    NoRoot,
}

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data (whitespace-only runs are dropped at parse time).
    Text(String),
}

/// An XML element: name, attributes in document order, children in
/// document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attrs: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds an attribute (builder style).
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Adds a child element (builder style).
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Adds a text child (builder style).
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Appends a child element.
    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Returns the value of an attribute.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first child element with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|node| match node {
            Node::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// Iterates over child elements with the given name.
    pub fn children_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'n> {
        self.children.iter().filter_map(move |node| match node {
            Node::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// Iterates over all child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Concatenated direct text content, trimmed.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let Node::Text(t) = node {
                out.push_str(t);
            }
        }
        out.trim().to_string()
    }

    /// Text content of the first child element with the given name.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(Element::text)
    }

    /// Reads a `<member>` list under the named child.
    ///
    /// Returns `None` when the child is absent, `Some(vec)` (possibly
    /// empty) when present. Ordering follows the document.
    #[must_use]
    pub fn members(&self, name: &str) -> Option<Vec<String>> {
        self.child(name).map(|list| {
            list.children_named("member")
                .map(Element::text)
                .collect()
        })
    }

    /// Renders the element as an XML string.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            escape_into(v, true, out);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                Node::Element(el) => el.write_xml(out),
                Node::Text(t) => escape_into(t, false, out),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Parses a document into its root element.
    ///
    /// Processing instructions, comments, and the XML declaration are
    /// skipped; whitespace-only text runs are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Malformed`] on parser errors and
    /// [`XmlError::NoRoot`] when the input holds no element.
    pub fn parse(input: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(input);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| XmlError::Malformed {
                reason: e.to_string(),
            })?;
            match event {
                Event::Start(start) => {
                    let element = element_from_start(&start)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| XmlError::Malformed {
                        reason: "unbalanced end tag".to_string(),
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(|e| XmlError::Malformed {
                        reason: e.to_string(),
                    })?;
                    push_text(&mut stack, &value);
                }
                Event::CData(data) => {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    push_text(&mut stack, &value);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Malformed {
                reason: "unclosed element".to_string(),
            });
        }
        root.ok_or(XmlError::NoRoot)
    }
}

fn element_from_start(
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<Element, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Malformed {
            reason: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Malformed {
                reason: e.to_string(),
            })?
            .into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(XmlError::Malformed {
            reason: "multiple root elements".to_string(),
        })
    }
}

fn push_text(stack: &mut [Element], value: &str) {
    if value.trim().is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Text(value.to_string()));
    }
}

// Attributes are always rendered with double quotes, so apostrophes
// (ubiquitous in xpath values) pass through unescaped.
fn escape_into(value: &str, in_attr: bool, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Builds a `<member>` list element: `<name><member>…</member>…</name>`.
#[must_use]
pub fn member_list(name: &str, items: &[String]) -> Element {
    let mut list = Element::new(name);
    for item in items {
        list.push_child(Element::new("member").with_text(item.clone()));
    }
    list
}

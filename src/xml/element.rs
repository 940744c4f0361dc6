/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::fmt::Display;

use quick_xml::escape::escape;

/// A child node of an [Element].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A small owned XML element tree.
///
/// The engine uses it for the handful of handshake elements which must be
/// seen in full before acting on them (stream features, SASL outcome, IQ
/// results), and for building every outbound element. Stanzas in the steady
/// state are decoded straight from tokens and never materialized this way.
///
/// # Examples
///
/// ```
/// use xmpp_engine::Element;
///
/// let auth = Element::new("auth")
///     .with_attribute("xmlns", "urn:ietf:params:xml:ns:xmpp-sasl")
///     .with_attribute("mechanism", "PLAIN")
///     .with_text("=");
/// assert_eq!(
///     auth.to_string(),
///     "<auth xmlns='urn:ietf:params:xml:ns:xmpp-sasl' mechanism='PLAIN'>=</auth>"
/// );
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element without attributes or content.
    pub fn new(name: &str) -> Self {
        Element {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub(crate) fn from_parts(name: String, attributes: Vec<(String, String)>) -> Self {
        Element {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.push_text(text);
        self
    }

    /// Sets an attribute, replacing the old value if it already exists.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, old)) => *old = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub(crate) fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Appends character data, merging it with a preceding text node.
    pub(crate) fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    /// Qualified name of the element, including any prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the element without the namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Iterates over the child elements, skipping text nodes.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// First child element with the given local name.
    ///
    /// If the child declares a default namespace it must be equal to `ns`.
    /// Children without an `xmlns` attribute inherit it from the parent,
    /// which is how servers usually send the nested payloads.
    pub fn child(&self, name: &str, ns: Option<&str>) -> Option<&Element> {
        self.children()
            .find(|child| child.local_name() == name && child.is_in(ns))
    }

    pub fn has_child(&self, name: &str, ns: Option<&str>) -> bool {
        self.child(name, ns).is_some()
    }

    /// True if the element has no declared namespace or the given one.
    pub fn is_in(&self, ns: Option<&str>) -> bool {
        match (ns, self.attribute("xmlns")) {
            (Some(ns), Some(declared)) => ns == declared,
            _ => true,
        }
    }

    /// Concatenated character data of the direct text children.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            if let Node::Text(part) = node {
                text.push_str(part);
            }
        }
        text
    }

    /// Serializes the element into the given string.
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        write_attributes(out, &self.attributes);
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                Node::Element(element) => element.write_to(out),
                Node::Text(text) => out.push_str(&escape(text.as_str())),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Serializes only the start tag and leaves the element open.
    ///
    /// This is how the stream header is written, since the stream element is
    /// only closed when the session ends.
    pub fn write_open_tag(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        write_attributes(out, &self.attributes);
        out.push('>');
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        self.write_to(&mut out);
        f.write_str(&out)
    }
}

fn write_attributes(out: &mut String, attributes: &[(String, String)]) {
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("='");
        out.push_str(&escape(value.as_str()));
        out.push('\'');
    }
}

/// Strips the namespace prefix from a qualified name.
pub fn local_name(name: &str) -> &str {
    match name.find(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod element;
mod error;

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;

pub use element::Element;
pub use element::Node;
pub use element::local_name;
pub use error::XmlError;

/// Start tag of an element, with its attributes already unescaped.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StartTag {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl StartTag {
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn into_element(self) -> Element {
        Element::from_parts(self.name, self.attributes)
    }
}

/// A token pulled from the XML stream.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Token {
    /// A start tag. Empty element tags are reported as a start tag
    /// immediately followed by the matching [Token::End].
    Start(StartTag),

    /// An end tag with the full name of the closed element.
    End(String),

    /// Character data, including CDATA sections.
    ///
    /// A single continuous block of text may arrive as several tokens.
    Text(String),

    /// The byte source is exhausted.
    Eof,
}

/// Pull based XML token source over a byte stream.
///
/// The reader never buffers a whole document. It only keeps the nesting
/// depth of the currently open elements, which is enough to tell when an
/// element subtree is complete on a stream without any message framing.
/// Each read blocks until the underlying source produces enough bytes for
/// the next token.
///
/// Declarations, comments, processing instructions and doctypes carry no
/// meaning for an XMPP stream and are skipped.
pub struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    depth: usize,
}

impl<R: BufRead> XmlReader<R> {
    pub fn new(source: R) -> Self {
        XmlReader {
            reader: configured(source),
            buf: Vec::new(),
            depth: 0,
        }
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Discards the tokenizer state and starts a fresh document over the
    /// same byte source.
    ///
    /// Used when the peer replaces the XML stream in-band without a new
    /// connection. The underlying reader has only consumed bytes up to the
    /// end of the last returned token, so no input is lost.
    pub fn restart(self) -> Self {
        XmlReader::new(self.reader.into_inner())
    }

    /// Returns the underlying byte source.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    /// Pulls the next token from the stream.
    pub fn next_token(&mut self) -> Result<Token, XmlError> {
        loop {
            self.buf.clear();
            let token = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(start) => Token::Start(start_tag(&start)?),
                Event::End(end) => {
                    Token::End(std::str::from_utf8(end.name().as_ref())?.to_string())
                }
                Event::Text(text) => Token::Text(text.unescape()?.into_owned()),
                Event::CData(cdata) => {
                    Token::Text(std::str::from_utf8(&cdata.into_inner())?.to_string())
                }
                Event::Eof => Token::Eof,
                // Empty tags are expanded by the reader configuration
                Event::Empty(_)
                | Event::Comment(_)
                | Event::Decl(_)
                | Event::PI(_)
                | Event::DocType(_) => continue,
            };
            match &token {
                Token::Start(_) => self.depth += 1,
                Token::End(_) => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
            return Ok(token);
        }
    }

    /// Consumes the rest of an element whose start tag was just returned.
    ///
    /// Nested content is balanced with the nesting depth and thrown away.
    pub fn skip_element(&mut self) -> Result<(), XmlError> {
        let parent_depth = self.depth.saturating_sub(1);
        loop {
            match self.next_token()? {
                Token::End(_) if self.depth == parent_depth => return Ok(()),
                Token::Eof => return Err(XmlError::UnexpectedEof),
                _ => {}
            }
        }
    }

    /// Reads the rest of an element whose start tag was just returned and
    /// builds its subtree.
    ///
    /// The tree is built with an explicit stack of open elements rather than
    /// recursion.
    pub fn read_element(&mut self, start: StartTag) -> Result<Element, XmlError> {
        let mut stack: Vec<Element> = vec![start.into_element()];
        loop {
            match self.next_token()? {
                Token::Start(tag) => stack.push(tag.into_element()),
                Token::End(_) => {
                    let Some(done) = stack.pop() else {
                        return Err(XmlError::Syntax("close tag without open".to_string()));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(done),
                        None => return Ok(done),
                    }
                }
                Token::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.push_text(&text);
                    }
                }
                Token::Eof => return Err(XmlError::UnexpectedEof),
            }
        }
    }
}

fn configured<R: BufRead>(source: R) -> Reader<R> {
    let mut reader = Reader::from_reader(source);
    let config = reader.config_mut();
    config.trim_text(false);
    config.expand_empty_elements = true;
    config.check_end_names = true;
    reader
}

fn start_tag(start: &BytesStart) -> Result<StartTag, XmlError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(StartTag { name, attributes })
}

#[cfg(test)]
mod tests;

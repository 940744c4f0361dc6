/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::error::Error;
use std::fmt::Display;
use std::io;
use std::sync::Arc;

/// Type of the error which happened while pulling tokens from the stream.
#[derive(Debug)]
pub enum XmlError {
    /// The underlying byte source failed.
    Io(io::Error),

    /// The bytes are not well-formed XML.
    ///
    /// The argument describes the syntax problem.
    Syntax(String),

    /// The byte source ended while an element was still open.
    UnexpectedEof,
}

impl Display for XmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XmlError::Io(err) => write!(f, "I/O error: {err}"),
            XmlError::Syntax(msg) => write!(f, "invalid XML syntax: {msg}"),
            XmlError::UnexpectedEof => write!(f, "stream ended inside an open element"),
        }
    }
}

impl Error for XmlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            XmlError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for XmlError {
    fn from(err: io::Error) -> Self {
        XmlError::Io(err)
    }
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(err) => XmlError::Io(
                Arc::try_unwrap(err)
                    .unwrap_or_else(|err| io::Error::new(err.kind(), err.to_string())),
            ),
            err => XmlError::Syntax(err.to_string()),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for XmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        XmlError::Syntax(err.to_string())
    }
}

impl From<std::str::Utf8Error> for XmlError {
    fn from(err: std::str::Utf8Error) -> Self {
        XmlError::Syntax(err.to_string())
    }
}

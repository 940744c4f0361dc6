/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::Element;

/// A chat message.
///
/// Received messages carry the sender in `remote`, outgoing ones the
/// recipient.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct Chat {
    pub remote: String,
    /// Value of the `type` attribute, empty if the attribute is missing.
    pub kind: String,
    /// Text of the `<body>` child, empty if there is none.
    pub text: String,
}

impl Chat {
    pub fn new(remote: &str, kind: &str, text: &str) -> Self {
        Chat {
            remote: remote.to_string(),
            kind: kind.to_string(),
            text: text.to_string(),
        }
    }
}

/// Decoded inbound stanzas which are handed to the application.
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum Event {
    Chat(Chat),
}

/// An availability broadcast or directed presence.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Presence {
    pub to: Option<String>,
    /// `type` attribute, `None` means available.
    pub kind: Option<String>,
    pub show: Option<String>,
    pub status: Option<String>,
}

/// Stanzas the application can send.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Stanza {
    Chat(Chat),
    Presence(Presence),
    /// A pre-built XML fragment written verbatim.
    ///
    /// It must be a single well-formed element, otherwise the stream is
    /// corrupted for the server.
    Raw(String),
}

impl Stanza {
    pub fn to_xml(&self) -> String {
        match self {
            Stanza::Chat(chat) => {
                let mut message = Element::new("message").with_attribute("to", &chat.remote);
                if !chat.kind.is_empty() {
                    message.set_attribute("type", &chat.kind);
                }
                message
                    .with_attribute("xml:lang", "en")
                    .with_child(Element::new("body").with_text(&chat.text))
                    .to_string()
            }
            Stanza::Presence(presence) => {
                let mut element = Element::new("presence");
                if let Some(to) = &presence.to {
                    element.set_attribute("to", to);
                }
                if let Some(kind) = &presence.kind {
                    element.set_attribute("type", kind);
                }
                if let Some(show) = &presence.show {
                    element = element.with_child(Element::new("show").with_text(show));
                }
                if let Some(status) = &presence.status {
                    element = element.with_child(Element::new("status").with_text(status));
                }
                element.to_string()
            }
            Stanza::Raw(xml) => xml.clone(),
        }
    }
}

impl From<Chat> for Stanza {
    fn from(chat: Chat) -> Self {
        Stanza::Chat(chat)
    }
}

impl From<Presence> for Stanza {
    fn from(presence: Presence) -> Self {
        Stanza::Presence(presence)
    }
}

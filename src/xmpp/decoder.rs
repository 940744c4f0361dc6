/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io::BufRead;

use log::debug;
use log::trace;

use crate::StartTag;
use crate::Token;
use crate::XmlReader;

use super::Chat;
use super::Event;
use super::constants::ERROR_TAG;
use super::error::Phase;
use super::error::ProtocolError;
use super::error::XmppClientError;
use super::negotiator::check_iq_reply;
use super::negotiator::stream_error_detail;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum StanzaKind {
    Message,
    Iq,
    StreamError,
}

/// Top-level elements with a decoder. Anything else is skipped.
const STANZA_KINDS: &[(&str, StanzaKind)] = &[
    ("message", StanzaKind::Message),
    ("iq", StanzaKind::Iq),
    (ERROR_TAG, StanzaKind::StreamError),
];

fn stanza_kind(name: &str) -> Option<StanzaKind> {
    STANZA_KINDS
        .iter()
        .find(|(kind_name, _)| *kind_name == name)
        .map(|(_, kind)| *kind)
}

/// Steady state reader of the stream.
///
/// Pulls one complete top-level element at a time and turns it into an
/// [Event]. Elements without a decoder are consumed to keep the token
/// stream aligned and never reach the caller.
pub(crate) struct StanzaDecoder<R: BufRead> {
    reader: XmlReader<R>,
    pending_session: Option<String>,
}

impl<R: BufRead> StanzaDecoder<R> {
    pub(crate) fn new(reader: XmlReader<R>, pending_session: Option<String>) -> Self {
        StanzaDecoder {
            reader,
            pending_session,
        }
    }

    /// Blocks until the next event, the end of the stream, or an error.
    pub(crate) fn next_event(&mut self) -> Result<Event, XmppClientError> {
        loop {
            match self.reader.next_token()? {
                Token::Start(tag) => {
                    let decoded = match stanza_kind(&tag.name) {
                        Some(StanzaKind::Message) => Some(self.decode_message(tag)?),
                        Some(StanzaKind::Iq) => {
                            self.handle_iq(tag)?;
                            None
                        }
                        Some(StanzaKind::StreamError) => {
                            let error = self.reader.read_element(tag)?;
                            return Err(
                                ProtocolError::new(Phase::Stanza, stream_error_detail(&error))
                                    .into(),
                            );
                        }
                        None => {
                            trace!("ignoring <{}>", tag.name);
                            self.reader.skip_element()?;
                            None
                        }
                    };
                    if let Some(event) = decoded {
                        return Ok(event);
                    }
                }
                // Only the stream element itself can close at this level
                Token::End(_) => return Err(XmppClientError::StreamClosed),
                // Whitespace keepalives
                Token::Text(_) => {}
                Token::Eof => return Err(XmppClientError::StreamClosed),
            }
        }
    }

    fn decode_message(&mut self, tag: StartTag) -> Result<Event, XmppClientError> {
        let remote = tag.attribute("from").unwrap_or_default().to_string();
        let kind = tag.attribute("type").unwrap_or_default().to_string();
        let lang = tag.attribute("xml:lang").map(str::to_string);
        let message_depth = self.reader.depth();
        // Language and text of each direct <body> child
        let mut bodies: Vec<(Option<String>, String)> = Vec::new();
        let mut in_body = false;
        loop {
            match self.reader.next_token()? {
                Token::Start(child) => {
                    if self.reader.depth() == message_depth + 1 && child.local_name() == "body" {
                        let body_lang = child.attribute("xml:lang").map(str::to_string);
                        bodies.push((body_lang, String::new()));
                        in_body = true;
                    }
                }
                Token::End(_) => {
                    if self.reader.depth() < message_depth {
                        break;
                    }
                    if self.reader.depth() == message_depth {
                        in_body = false;
                    }
                }
                Token::Text(data) => {
                    if in_body
                        && self.reader.depth() == message_depth + 1
                        && let Some((_, text)) = bodies.last_mut()
                    {
                        text.push_str(&data);
                    }
                }
                Token::Eof => return Err(XmppClientError::StreamClosed),
            }
        }
        debug!(
            "message from '{remote}' type '{kind}' lang {lang:?} with {} bodies",
            bodies.len()
        );
        let text = select_body(bodies, lang.as_deref());
        Ok(Event::Chat(Chat { remote, kind, text }))
    }

    fn handle_iq(&mut self, tag: StartTag) -> Result<(), XmppClientError> {
        let is_session_reply = match &self.pending_session {
            Some(id) => tag.attribute("id") == Some(id.as_str()),
            None => false,
        };
        if !is_session_reply {
            trace!("ignoring iq {:?}", tag.attribute("id"));
            return Ok(self.reader.skip_element()?);
        }
        let reply = self.reader.read_element(tag)?;
        if let Some(id) = self.pending_session.take() {
            check_iq_reply(&reply, &id, Phase::Session)?;
            debug!("session established");
        }
        Ok(())
    }
}

/// Picks the body in the language of the message, or the first one.
///
/// A body without `xml:lang` is in the language of the message.
fn select_body(bodies: Vec<(Option<String>, String)>, lang: Option<&str>) -> String {
    let position = bodies
        .iter()
        .position(|(body_lang, _)| body_lang.as_deref().or(lang) == lang)
        .unwrap_or(0);
    bodies
        .into_iter()
        .nth(position)
        .map(|(_, text)| text)
        .unwrap_or_default()
}

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
use log::info;
use log::warn;

use crate::Element;
use crate::Jid;
use crate::Token;
use crate::XmlError;
use crate::XmlReader;

use super::Credentials;
use super::SessionFeature;
use super::StreamFeatures;
use super::XmppSender;
use super::constants::BIND_NS;
use super::constants::BIND_REQUEST_ID;
use super::constants::CLIENT_NS;
use super::constants::ERROR_TAG;
use super::constants::FEATURES_TAG;
use super::constants::SESSION_NS;
use super::constants::SESSION_REQUEST_ID;
use super::constants::STANZAS_NS;
use super::constants::STREAM_NS;
use super::constants::STREAM_TAG;
use super::constants::STREAMS_NS;
use super::error::Phase;
use super::error::ProtocolError;
use super::error::XmppClientError;
use super::sasl;

#[derive(Debug)]
enum StreamState {
    Start,
    AwaitStreamOpen,
    AwaitFeatures,
    Authenticating(StreamFeatures),
    PostAuthRestart,
    Binding(StreamFeatures),
    Session(StreamFeatures),
    Ready,
    Failed,
}

/// Identity of a successfully negotiated stream.
pub(crate) struct Negotiated {
    pub(crate) jid: Jid,
    pub(crate) stream_id: String,
    /// Id of the session request whose reply is still on the wire.
    pub(crate) pending_session: Option<String>,
}

/// Drives a fresh connection to an authenticated and bound stream.
///
/// Every step blocks on the transport. The first error ends the
/// negotiation, there are no retries.
pub(crate) struct Negotiator<'a, R: BufRead> {
    reader: XmlReader<R>,
    sender: &'a XmppSender,
    jid: &'a Jid,
    credentials: &'a Credentials,
    state: StreamState,
    authenticated: bool,
    stream_id: Option<String>,
    bound_jid: Option<Jid>,
    pending_session: Option<String>,
}

impl<'a, R: BufRead> Negotiator<'a, R> {
    pub(crate) fn new(
        reader: XmlReader<R>,
        sender: &'a XmppSender,
        jid: &'a Jid,
        credentials: &'a Credentials,
    ) -> Self {
        Negotiator {
            reader,
            sender,
            jid,
            credentials,
            state: StreamState::Start,
            authenticated: false,
            stream_id: None,
            bound_jid: None,
            pending_session: None,
        }
    }

    /// Runs the handshake to completion.
    ///
    /// On success the token reader is handed back, positioned right after
    /// the last handshake element, for the stanza decoder to continue from.
    pub(crate) fn run(mut self) -> Result<(Negotiated, XmlReader<R>), XmppClientError> {
        loop {
            let state = std::mem::replace(&mut self.state, StreamState::Failed);
            self.state = match state {
                StreamState::Start => {
                    self.send_header()?;
                    StreamState::AwaitStreamOpen
                }
                StreamState::AwaitStreamOpen => {
                    let id = self.read_stream_open()?;
                    debug!("stream opened with id '{id}'");
                    self.stream_id = Some(id);
                    StreamState::AwaitFeatures
                }
                StreamState::AwaitFeatures => {
                    let features = self.read_features()?;
                    debug!("stream features: {features:?}");
                    if !self.authenticated {
                        StreamState::Authenticating(features)
                    } else if features.bind {
                        StreamState::Binding(features)
                    } else {
                        StreamState::Session(features)
                    }
                }
                StreamState::Authenticating(features) => {
                    sasl::authenticate(&mut self.reader, self.sender, &features, self.credentials)?;
                    self.authenticated = true;
                    StreamState::PostAuthRestart
                }
                StreamState::PostAuthRestart => {
                    // The old stream is never closed, a new document starts
                    // on the same connection.
                    self.reader = self.reader.restart();
                    self.send_header()?;
                    StreamState::AwaitStreamOpen
                }
                StreamState::Binding(features) => {
                    self.bind()?;
                    StreamState::Session(features)
                }
                StreamState::Session(features) => {
                    match features.session {
                        SessionFeature::Required => self.request_session()?,
                        SessionFeature::Optional => debug!("skipping optional session"),
                        SessionFeature::NotOffered => {}
                    }
                    StreamState::Ready
                }
                StreamState::Ready => break,
                StreamState::Failed => {
                    return Err(XmppClientError::InvalidState("negotiation already failed"));
                }
            };
            debug!("negotiation state: {:?}", self.state);
        }

        let jid = self.bound_jid.unwrap_or_else(|| self.jid.clone());
        info!("session established as {jid}");
        let negotiated = Negotiated {
            jid,
            stream_id: self.stream_id.unwrap_or_default(),
            pending_session: self.pending_session,
        };
        Ok((negotiated, self.reader))
    }

    fn send_header(&self) -> Result<(), XmppClientError> {
        let mut header = String::from("<?xml version='1.0'?>");
        Element::new(STREAM_TAG)
            .with_attribute("xmlns", CLIENT_NS)
            .with_attribute("xmlns:stream", STREAM_NS)
            .with_attribute("version", "1.0")
            .with_attribute("xml:lang", "en")
            .with_attribute("from", self.jid.bare())
            .with_attribute("to", self.jid.domainpart())
            .write_open_tag(&mut header);
        self.sender.send_raw(header.as_bytes())
    }

    fn read_stream_open(&mut self) -> Result<String, XmppClientError> {
        loop {
            match self.reader.next_token()? {
                Token::Text(text) if text.trim().is_empty() => {}
                Token::Text(_) => {
                    return Err(protocol(Phase::StreamOpen, "character data before stream header"));
                }
                Token::Start(tag) if tag.name == STREAM_TAG => {
                    return match tag.attribute("id") {
                        Some(id) => Ok(id.to_string()),
                        None => Err(protocol(Phase::StreamOpen, "stream header has no id")),
                    };
                }
                Token::Start(tag) => {
                    return Err(protocol(
                        Phase::StreamOpen,
                        format!("expected <{STREAM_TAG}>, got <{}>", tag.name),
                    ));
                }
                Token::End(name) => {
                    return Err(protocol(
                        Phase::StreamOpen,
                        format!("unexpected </{name}> before stream header"),
                    ));
                }
                Token::Eof => {
                    return Err(protocol(Phase::StreamOpen, "stream ended before its header"));
                }
            }
        }
    }

    fn read_features(&mut self) -> Result<StreamFeatures, XmppClientError> {
        let features = next_element(&mut self.reader, Phase::Features)?;
        if features.name() != FEATURES_TAG {
            return Err(protocol(
                Phase::Features,
                format!("expected <{FEATURES_TAG}>, got <{}>", features.name()),
            ));
        }
        Ok(StreamFeatures::from_element(&features))
    }

    fn bind(&mut self) -> Result<(), XmppClientError> {
        let mut bind = Element::new("bind").with_attribute("xmlns", BIND_NS);
        if let Some(resource) = self.jid.resourcepart() {
            bind = bind.with_child(Element::new("resource").with_text(resource));
        }
        let request = Element::new("iq")
            .with_attribute("type", "set")
            .with_attribute("id", BIND_REQUEST_ID)
            .with_child(bind);
        self.sender.send_element(&request)?;

        let reply = next_element(&mut self.reader, Phase::Binding)?;
        check_iq_reply(&reply, BIND_REQUEST_ID, Phase::Binding)?;
        let assigned = reply
            .child("bind", Some(BIND_NS))
            .and_then(|bind| bind.child("jid", None))
            .map(|jid| jid.text())
            .ok_or_else(|| protocol(Phase::Binding, "result has no <bind><jid> payload"))?;
        let bound = Jid::new(assigned.trim()).map_err(|err| {
            protocol(Phase::Binding, format!("server assigned a bad JabberID: {err}"))
        })?;
        if bound.resourcepart() != self.jid.resourcepart() {
            debug!("server assigned resource {:?}", bound.resourcepart());
        }
        self.bound_jid = Some(bound);
        Ok(())
    }

    /// Sends the legacy session request without waiting for the reply.
    ///
    /// The reply is picked up by the stanza decoder, since servers may
    /// deliver other stanzas before it.
    fn request_session(&mut self) -> Result<(), XmppClientError> {
        let request = Element::new("iq")
            .with_attribute("to", self.jid.domainpart())
            .with_attribute("type", "set")
            .with_attribute("id", SESSION_REQUEST_ID)
            .with_child(Element::new("session").with_attribute("xmlns", SESSION_NS));
        self.sender.send_element(&request)?;
        self.pending_session = Some(SESSION_REQUEST_ID.to_string());
        Ok(())
    }
}

fn protocol(phase: Phase, detail: impl Into<String>) -> XmppClientError {
    ProtocolError::new(phase, detail).into()
}

/// Reads the next complete top-level element of the stream.
///
/// Whitespace between elements is skipped. A `<stream:error>`, the end of
/// the stream, or the end of the input are reported as protocol errors of
/// the given phase.
pub(crate) fn next_element<R: BufRead>(
    reader: &mut XmlReader<R>,
    phase: Phase,
) -> Result<Element, XmppClientError> {
    loop {
        match reader.next_token()? {
            Token::Text(text) if text.trim().is_empty() => {}
            Token::Text(_) => return Err(protocol(phase, "unexpected character data")),
            Token::Start(tag) => {
                let name = tag.name.clone();
                let element = reader.read_element(tag).map_err(|err| match err {
                    XmlError::UnexpectedEof => {
                        protocol(phase, format!("stream ended inside <{name}>"))
                    }
                    err => err.into(),
                })?;
                if element.name() == ERROR_TAG {
                    return Err(protocol(phase, stream_error_detail(&element)));
                }
                return Ok(element);
            }
            Token::End(name) => {
                return Err(protocol(phase, format!("server closed the stream with </{name}>")));
            }
            Token::Eof => return Err(protocol(phase, "stream ended unexpectedly")),
        }
    }
}

/// Describes a `<stream:error>` by its defined condition and text.
pub(crate) fn stream_error_detail(error: &Element) -> String {
    let condition = error
        .children()
        .find(|child| child.local_name() != "text" && child.is_in(Some(STREAMS_NS)))
        .map(|child| child.local_name())
        .unwrap_or("undefined-condition");
    match error.child("text", Some(STREAMS_NS)).map(|text| text.text()) {
        Some(text) if !text.is_empty() => format!("stream error: {condition} ({text})"),
        _ => format!("stream error: {condition}"),
    }
}

/// Checks that an element is a successful reply to the given IQ request.
pub(crate) fn check_iq_reply(
    reply: &Element,
    id: &str,
    phase: Phase,
) -> Result<(), XmppClientError> {
    if reply.local_name() != "iq" {
        return Err(protocol(phase, format!("expected <iq>, got <{}>", reply.name())));
    }
    if reply.attribute("id") != Some(id) {
        warn!(
            "reply id {:?} does not match request id '{id}'",
            reply.attribute("id")
        );
    }
    match reply.attribute("type") {
        Some("result") => Ok(()),
        Some("error") => {
            let condition = reply
                .child("error", None)
                .and_then(|error| {
                    error
                        .children()
                        .find(|child| child.local_name() != "text" && child.is_in(Some(STANZAS_NS)))
                })
                .map(|condition| condition.local_name())
                .unwrap_or("undefined-condition");
            Err(protocol(phase, format!("server returned error: {condition}")))
        }
        other => Err(protocol(phase, format!("unexpected iq type {other:?}"))),
    }
}

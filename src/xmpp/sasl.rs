/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::fmt::Debug;
use std::io::BufRead;

use base64::prelude::*;
use log::debug;

use crate::Element;
use crate::XmlReader;

use super::StreamFeatures;
use super::XmppSender;
use super::constants::PLAIN_MECHANISM;
use super::constants::SASL_NS;
use super::error::AuthError;
use super::error::Phase;
use super::error::ProtocolError;
use super::error::XmppClientError;
use super::negotiator::next_element;

/// Login information for the SASL PLAIN mechanism.
#[derive(Clone)]
pub struct Credentials {
    /// Authentication identity, the localpart of the JabberID.
    pub authcid: String,
    pub password: String,
    /// Identity to act as, if different from the authentication identity.
    pub authzid: Option<String>,
}

impl Credentials {
    pub fn new(authcid: &str, password: &str) -> Self {
        Credentials {
            authcid: authcid.to_string(),
            password: password.to_string(),
            authzid: None,
        }
    }

    pub fn with_authzid(mut self, authzid: &str) -> Self {
        self.authzid = Some(authzid.to_string());
        self
    }

    /// Builds the `authzid NUL authcid NUL password` message of RFC 4616.
    pub fn plain_payload(&self) -> Vec<u8> {
        let authzid = self.authzid.as_deref().unwrap_or("");
        let mut payload =
            Vec::with_capacity(authzid.len() + self.authcid.len() + self.password.len() + 2);
        payload.extend_from_slice(authzid.as_bytes());
        payload.push(0);
        payload.extend_from_slice(self.authcid.as_bytes());
        payload.push(0);
        payload.extend_from_slice(self.password.as_bytes());
        payload
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("authcid", &self.authcid)
            .field("password", &"<redacted>")
            .field("authzid", &self.authzid)
            .finish()
    }
}

/// Encodes a SASL message as the text content of an XML element.
///
/// An empty message is sent as a single `=` so it can be told apart from a
/// missing one.
pub(crate) fn encode_payload(payload: &[u8]) -> String {
    if payload.is_empty() {
        "=".to_string()
    } else {
        BASE64_STANDARD.encode(payload)
    }
}

pub(crate) fn plain_auth_element(credentials: &Credentials) -> Element {
    Element::new("auth")
        .with_attribute("xmlns", SASL_NS)
        .with_attribute("mechanism", PLAIN_MECHANISM)
        .with_text(&encode_payload(&credentials.plain_payload()))
}

/// Runs the PLAIN exchange on the current stream.
///
/// Only one round is made. The payload of `<success>` is not used by PLAIN
/// and is ignored, its absence is not an error.
pub(crate) fn authenticate<R: BufRead>(
    reader: &mut XmlReader<R>,
    sender: &XmppSender,
    features: &StreamFeatures,
    credentials: &Credentials,
) -> Result<(), XmppClientError> {
    if features.mechanisms.is_empty() {
        return Err(AuthError::NoMechanisms.into());
    }
    if !features.offers_mechanism(PLAIN_MECHANISM) {
        return Err(AuthError::MechanismUnsupported(features.mechanisms.clone()).into());
    }
    debug!("authenticating as '{}' with {PLAIN_MECHANISM}", credentials.authcid);
    sender.send_element(&plain_auth_element(credentials))?;

    let outcome = next_element(reader, Phase::Authentication)?;
    if !outcome.is_in(Some(SASL_NS)) {
        return Err(unexpected(&outcome).into());
    }
    match outcome.local_name() {
        "success" => Ok(()),
        "failure" => Err(failure_reason(&outcome).into()),
        _ => Err(unexpected(&outcome).into()),
    }
}

fn unexpected(element: &Element) -> ProtocolError {
    ProtocolError::new(
        Phase::Authentication,
        format!("expected <success> or <failure>, got <{}>", element.name()),
    )
}

/// Extracts the defined condition and optional text from a `<failure>`.
pub(crate) fn failure_reason(failure: &Element) -> AuthError {
    let condition = failure
        .children()
        .find(|child| child.local_name() != "text")
        .map(|child| child.local_name().to_string())
        .unwrap_or_else(|| "unspecified".to_string());
    let text = failure
        .child("text", None)
        .map(|text| text.text())
        .filter(|text| !text.is_empty());
    AuthError::Failure { condition, text }
}

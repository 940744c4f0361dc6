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

use super::constants::BIND_NS;
use super::constants::SASL_NS;
use super::constants::SESSION_NS;

/// How the server advertises the legacy session establishment step.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SessionFeature {
    NotOffered,
    /// Advertised with an `<optional/>` child, the client may skip it.
    Optional,
    Required,
}

/// What the server offers at a given point of the handshake.
///
/// A new instance is parsed from every `<stream:features>` element, so the
/// values always describe the current stream only.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct StreamFeatures {
    pub mechanisms: Vec<String>,
    pub bind: bool,
    pub session: SessionFeature,
}

impl StreamFeatures {
    pub fn from_element(features: &Element) -> Self {
        let mechanisms = match features.child("mechanisms", Some(SASL_NS)) {
            Some(mechanisms) => mechanisms
                .children()
                .filter(|child| child.local_name() == "mechanism")
                .map(|child| child.text().trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            None => Vec::new(),
        };
        let session = match features.child("session", Some(SESSION_NS)) {
            Some(session) if session.has_child("optional", None) => SessionFeature::Optional,
            Some(_) => SessionFeature::Required,
            None => SessionFeature::NotOffered,
        };
        StreamFeatures {
            mechanisms,
            bind: features.has_child("bind", Some(BIND_NS)),
            session,
        }
    }

    pub fn offers_mechanism(&self, name: &str) -> bool {
        self.mechanisms.iter().any(|mechanism| mechanism == name)
    }
}

/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! Client side engine for the XMPP instant messaging protocol.
//!
//! An [XmppClient] owns one connection to a server. [init](XmppClient::init)
//! negotiates the stream (SASL PLAIN authentication, resource binding and
//! the optional legacy session), after which [recv](XmppClient::recv)
//! returns decoded chat messages while [XmppSender] handles write stanzas
//! from any thread.
//!
//! ```no_run
//! use xmpp_engine::{Chat, Event, Jid, Stanza, XmppClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let jid = Jid::new("romeo@example.net/orchard")?;
//! let mut client = XmppClient::build(jid).login("secret")?;
//! client.send(&Stanza::Chat(Chat::new("juliet@example.com", "chat", "Hi!")))?;
//! loop {
//!     match client.recv()? {
//!         Event::Chat(chat) => println!("{}: {}", chat.remote, chat.text),
//!         _ => {}
//!     }
//! }
//! # }
//! ```

mod xml;
mod xmpp;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use xml::Element;
pub use xml::Node;
pub use xml::StartTag;
pub use xml::Token;
pub use xml::XmlError;
pub use xml::XmlReader;

pub use xmpp::AuthError;
pub use xmpp::BadJid;
pub use xmpp::CLIENT_PORT;
pub use xmpp::Chat;
pub use xmpp::Credentials;
pub use xmpp::DIRECT_TLS_PORT;
pub use xmpp::Event;
pub use xmpp::Jid;
pub use xmpp::Phase;
pub use xmpp::Presence;
pub use xmpp::ProtocolError;
pub use xmpp::SessionFeature;
pub use xmpp::Stanza;
pub use xmpp::StreamFeatures;
pub use xmpp::TlsMode;
pub use xmpp::Transport;
pub use xmpp::TransportWriter;
pub use xmpp::XmppClient;
pub use xmpp::XmppClientBuilder;
pub use xmpp::XmppClientError;
pub use xmpp::XmppSender;
#[cfg(feature = "tls")]
pub use xmpp::TlsReader;
#[cfg(feature = "tls")]
pub use xmpp::TlsTransport;
#[cfg(feature = "tls")]
pub use xmpp::TlsWriter;

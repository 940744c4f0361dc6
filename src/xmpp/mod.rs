/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod client;
pub(crate) mod constants;
mod decoder;
mod error;
mod features;
mod jid;
mod negotiator;
mod sasl;
mod stanza;
mod transport;

pub use client::TlsMode;
pub use client::XmppClient;
pub use client::XmppClientBuilder;
pub use client::XmppSender;
pub use constants::CLIENT_PORT;
pub use constants::DIRECT_TLS_PORT;
pub use error::AuthError;
pub use error::BadJid;
pub use error::Phase;
pub use error::ProtocolError;
pub use error::XmppClientError;
pub use features::SessionFeature;
pub use features::StreamFeatures;
pub use jid::Jid;
pub use sasl::Credentials;
pub use stanza::Chat;
pub use stanza::Event;
pub use stanza::Presence;
pub use stanza::Stanza;
pub use transport::Transport;
pub use transport::TransportWriter;
#[cfg(feature = "tls")]
pub use transport::TlsReader;
#[cfg(feature = "tls")]
pub use transport::TlsTransport;
#[cfg(feature = "tls")]
pub use transport::TlsWriter;

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

use crate::XmlError;

pub use super::jid::BadJid;

/// Errors returned by the client session.
///
/// All of them are fatal for the session which returned them. The
/// connection should be closed and a new one established if the
/// application wants to continue.
#[derive(Debug)]
pub enum XmppClientError {
    /// Reading from or writing to the transport failed.
    Transport(std::io::Error),

    /// The stream contains malformed XML.
    Parse(XmlError),

    /// Well-formed XML arrived out of the expected protocol order.
    Protocol(ProtocolError),

    /// SASL authentication was rejected or could not be attempted.
    Authentication(AuthError),

    /// The server closed the stream.
    StreamClosed,

    /// A JabberID could not be parsed.
    BadJid(BadJid),

    /// The operation is not valid for the current session state.
    InvalidState(&'static str),

    /// TLS setup or negotiation failed.
    #[cfg(feature = "tls")]
    Tls(rustls::Error),
}

impl Display for XmppClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XmppClientError::Transport(err) => write!(f, "transport error: {err}"),
            XmppClientError::Parse(err) => err.fmt(f),
            XmppClientError::Protocol(err) => err.fmt(f),
            XmppClientError::Authentication(err) => err.fmt(f),
            XmppClientError::StreamClosed => write!(f, "stream closed"),
            XmppClientError::BadJid(err) => err.fmt(f),
            XmppClientError::InvalidState(msg) => write!(f, "invalid session state: {msg}"),
            #[cfg(feature = "tls")]
            XmppClientError::Tls(err) => write!(f, "TLS error: {err}"),
        }
    }
}

impl Error for XmppClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            XmppClientError::Transport(err) => Some(err),
            XmppClientError::Parse(err) => Some(err),
            XmppClientError::Protocol(err) => Some(err),
            XmppClientError::Authentication(err) => Some(err),
            XmppClientError::BadJid(err) => Some(err),
            #[cfg(feature = "tls")]
            XmppClientError::Tls(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for XmppClientError {
    fn from(err: std::io::Error) -> Self {
        XmppClientError::Transport(err)
    }
}

impl From<XmlError> for XmppClientError {
    fn from(err: XmlError) -> Self {
        match err {
            XmlError::Io(err) => XmppClientError::Transport(err),
            XmlError::UnexpectedEof => XmppClientError::StreamClosed,
            err => XmppClientError::Parse(err),
        }
    }
}

impl From<ProtocolError> for XmppClientError {
    fn from(err: ProtocolError) -> Self {
        XmppClientError::Protocol(err)
    }
}

impl From<AuthError> for XmppClientError {
    fn from(err: AuthError) -> Self {
        XmppClientError::Authentication(err)
    }
}

impl From<BadJid> for XmppClientError {
    fn from(err: BadJid) -> Self {
        XmppClientError::BadJid(err)
    }
}

#[cfg(feature = "tls")]
impl From<rustls::Error> for XmppClientError {
    fn from(err: rustls::Error) -> Self {
        XmppClientError::Tls(err)
    }
}

/// Stage of the session where a protocol violation was detected.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum Phase {
    StreamOpen,
    Features,
    Authentication,
    Binding,
    Session,
    Stanza,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::StreamOpen => "stream open",
            Phase::Features => "stream features",
            Phase::Authentication => "authentication",
            Phase::Binding => "resource binding",
            Phase::Session => "session establishment",
            Phase::Stanza => "stanza exchange",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct ProtocolError {
    pub phase: Phase,
    pub detail: String,
}

impl ProtocolError {
    pub fn new(phase: Phase, detail: impl Into<String>) -> Self {
        ProtocolError {
            phase,
            detail: detail.into(),
        }
    }
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid stream protocol during {}: {}", self.phase, self.detail)
    }
}

impl Error for ProtocolError {}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum AuthError {
    /// The server did not offer any SASL mechanism.
    NoMechanisms,

    /// PLAIN is not among the offered mechanisms.
    MechanismUnsupported(Vec<String>),

    /// The JabberID has no localpart to authenticate as.
    MissingLocalpart,

    /// The server answered with a `<failure>`.
    Failure {
        condition: String,
        text: Option<String>,
    },
}

impl Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NoMechanisms => write!(f, "server offers no SASL mechanism"),
            AuthError::MechanismUnsupported(offered) => write!(
                f,
                "PLAIN mechanism is not offered by the server (offered: {})",
                offered.join(", ")
            ),
            AuthError::MissingLocalpart => write!(f, "JabberID has no localpart to log in as"),
            AuthError::Failure { condition, text } => {
                write!(f, "authentication failed: {condition}")?;
                if let Some(text) = text {
                    write!(f, " ({text})")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for AuthError {}

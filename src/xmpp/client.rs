/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use log::debug;
use log::trace;

use crate::Element;
use crate::Jid;
use crate::XmlReader;

use super::Credentials;
use super::Event;
use super::Stanza;
use super::constants::CLIENT_PORT;
use super::constants::DIRECT_TLS_PORT;
use super::decoder::StanzaDecoder;
use super::error::AuthError;
use super::error::XmppClientError;
use super::negotiator::Negotiator;
use super::transport::TraceReader;
use super::transport::Transport;
use super::transport::TransportWriter;

/// How the TCP connection is secured before the XMPP stream starts.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TlsMode {
    /// TLS handshake right after connecting (XEP-0368).
    DirectTls,
    /// No encryption, only suitable for local testing.
    Plaintext,
}

pub struct XmppClientBuilder {
    jid: Jid,
    server: Option<String>,
    connection_timeout: Duration,
    read_timeout: Option<Duration>,
    tls: TlsMode,
    authzid: Option<String>,
}

impl XmppClientBuilder {
    pub fn new(jid: Jid) -> Self {
        XmppClientBuilder {
            jid,
            server: None,
            connection_timeout: Duration::from_secs(30),
            read_timeout: None,
            tls: if cfg!(feature = "tls") {
                TlsMode::DirectTls
            } else {
                TlsMode::Plaintext
            },
            authzid: None,
        }
    }

    /// Connects to this host instead of the domain of the JabberID.
    ///
    /// A port can be given as `host:port`.
    pub fn server(mut self, server: Option<String>) -> Self {
        self.server = server;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Maximum time a read can block on the socket.
    ///
    /// When it expires the pending operation fails with a transport error
    /// and the session is over. There are no other timeouts.
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    /// Authorization identity to send with the credentials.
    pub fn authzid(mut self, authzid: Option<String>) -> Self {
        self.authzid = authzid;
        self
    }

    /// Opens the connection without starting the XMPP stream.
    pub fn connect(&self) -> Result<XmppClient, XmppClientError> {
        let host = match &self.server {
            Some(server) => server.as_str(),
            None => self.jid.domainpart(),
        };
        let default_port = match self.tls {
            TlsMode::DirectTls => DIRECT_TLS_PORT,
            TlsMode::Plaintext => CLIENT_PORT,
        };
        // Rust resolver does require a port number but does NOT provide
        // a way to provide a default one :(
        let column_pos = host.find(':');
        let bracket_pos = host.find(']');
        let need_port = match (column_pos, bracket_pos) {
            (None, None) | (None, Some(_)) => true,
            (Some(_), None) => false,
            (Some(column), Some(bracket)) => column < bracket,
        };
        let mut result = if need_port {
            (host, default_port).to_socket_addrs()
        } else {
            host.to_socket_addrs()
        }?;
        let address = result.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no address found for {host}"))
        })?;
        debug!("connecting to: {address}");
        let tcp_stream = TcpStream::connect_timeout(&address, self.connection_timeout)?;
        tcp_stream.set_read_timeout(self.read_timeout)?;
        tcp_stream.set_nodelay(true)?;
        match self.tls {
            TlsMode::Plaintext => XmppClient::new(tcp_stream),
            #[cfg(feature = "tls")]
            TlsMode::DirectTls => {
                let tls_stream =
                    super::transport::TlsTransport::connect(tcp_stream, self.jid.domainpart())?;
                XmppClient::new(tls_stream)
            }
            #[cfg(not(feature = "tls"))]
            TlsMode::DirectTls => Err(XmppClientError::InvalidState("built without TLS support")),
        }
    }

    /// Connects and runs the whole stream negotiation.
    pub fn login(self, password: &str) -> Result<XmppClient, XmppClientError> {
        let authcid = self.jid.localpart().ok_or(AuthError::MissingLocalpart)?;
        let mut credentials = Credentials::new(authcid, password);
        if let Some(authzid) = &self.authzid {
            credentials = credentials.with_authzid(authzid);
        }
        let mut client = self.connect()?;
        client.init_with(&self.jid, &credentials)?;
        Ok(client)
    }
}

/// Write half of a session, shareable between threads.
///
/// Every stanza is written under a lock in a single `write_all` call, so
/// concurrent senders never interleave their bytes.
#[derive(Clone)]
pub struct XmppSender {
    writer: Arc<Mutex<Box<dyn TransportWriter>>>,
}

impl XmppSender {
    fn new(writer: Box<dyn TransportWriter>) -> Self {
        XmppSender {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn send(&self, stanza: &Stanza) -> Result<(), XmppClientError> {
        self.send_raw(stanza.to_xml().as_bytes())
    }

    pub(crate) fn send_element(&self, element: &Element) -> Result<(), XmppClientError> {
        self.send_raw(element.to_string().as_bytes())
    }

    pub fn send_raw(&self, bytes: &[u8]) -> Result<(), XmppClientError> {
        let mut writer = self.lock()?;
        trace!("SEND: {}", String::from_utf8_lossy(bytes));
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Ends the stream and shuts the transport down.
    ///
    /// A `recv` blocked in another thread returns with an error afterwards.
    pub fn close(&self) -> Result<(), XmppClientError> {
        let mut writer = self.lock()?;
        let farewell = writer
            .write_all(b"</stream:stream>")
            .and_then(|_| writer.flush());
        if let Err(err) = farewell {
            debug!("could not send stream end: {err}");
        }
        writer.close()?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn TransportWriter>>, XmppClientError> {
        self.writer
            .lock()
            .map_err(|_| XmppClientError::InvalidState("a sender panicked while writing"))
    }
}

type Input = BufReader<TraceReader<Box<dyn Read + Send>>>;

enum SessionState {
    Connected(XmlReader<Input>),
    Ready(StanzaDecoder<Input>),
    Failed,
}

/// A client session over a single connection.
///
/// The session is created unauthenticated; [init](XmppClient::init) must
/// succeed before stanzas can be exchanged. Receiving takes `&mut self`, so
/// there is exactly one reader. Sending can happen concurrently from any
/// number of threads through [sender](XmppClient::sender) handles.
pub struct XmppClient {
    state: SessionState,
    sender: XmppSender,
    jid: Option<Jid>,
    stream_id: Option<String>,
}

impl XmppClient {
    pub fn build(jid: Jid) -> XmppClientBuilder {
        XmppClientBuilder::new(jid)
    }

    /// Creates an unauthenticated session over an established transport.
    pub fn new<T: Transport>(transport: T) -> Result<Self, XmppClientError> {
        let (reader, writer) = transport.split()?;
        let reader: Box<dyn Read + Send> = Box::new(reader);
        Ok(XmppClient {
            state: SessionState::Connected(XmlReader::new(BufReader::new(TraceReader::new(
                reader,
            )))),
            sender: XmppSender::new(Box::new(writer)),
            jid: None,
            stream_id: None,
        })
    }

    /// Negotiates the stream, logging in with the localpart of `jid`.
    ///
    /// The resourcepart of `jid`, if any, is requested at binding time but
    /// the server has the final word; see [jid](XmppClient::jid).
    pub fn init(&mut self, jid: &Jid, password: &str) -> Result<(), XmppClientError> {
        let Some(authcid) = jid.localpart() else {
            if let SessionState::Connected(_) = self.state {
                self.state = SessionState::Failed;
            }
            return Err(AuthError::MissingLocalpart.into());
        };
        self.init_with(jid, &Credentials::new(authcid, password))
    }

    pub fn init_with(
        &mut self,
        jid: &Jid,
        credentials: &Credentials,
    ) -> Result<(), XmppClientError> {
        let reader = match std::mem::replace(&mut self.state, SessionState::Failed) {
            SessionState::Connected(reader) => reader,
            state => {
                self.state = state;
                return Err(XmppClientError::InvalidState(
                    "stream is already negotiated or failed",
                ));
            }
        };
        let (negotiated, reader) = Negotiator::new(reader, &self.sender, jid, credentials).run()?;
        self.jid = Some(negotiated.jid);
        self.stream_id = Some(negotiated.stream_id);
        self.state = SessionState::Ready(StanzaDecoder::new(reader, negotiated.pending_session));
        Ok(())
    }

    /// Blocks until the next chat event arrives.
    ///
    /// Any error ends the session, later calls return
    /// [InvalidState](XmppClientError::InvalidState).
    pub fn recv(&mut self) -> Result<Event, XmppClientError> {
        let SessionState::Ready(decoder) = &mut self.state else {
            return Err(XmppClientError::InvalidState("session is not established"));
        };
        match decoder.next_event() {
            Ok(event) => Ok(event),
            Err(err) => {
                debug!("session failed: {err}");
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }

    pub fn send(&self, stanza: &Stanza) -> Result<(), XmppClientError> {
        if !self.is_ready() {
            return Err(XmppClientError::InvalidState("session is not established"));
        }
        self.sender.send(stanza)
    }

    /// A handle for sending from other threads while this one receives.
    pub fn sender(&self) -> Option<XmppSender> {
        match self.state {
            SessionState::Ready(_) => Some(self.sender.clone()),
            _ => None,
        }
    }

    pub fn close(self) -> Result<(), XmppClientError> {
        self.sender.close()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready(_))
    }

    /// Full JabberID bound by the server.
    pub fn jid(&self) -> Option<&Jid> {
        self.jid.as_ref()
    }

    /// Id of the current stream, as sent by the server.
    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }
}

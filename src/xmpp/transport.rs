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
use std::io::Read;
use std::io::Write;
use std::net::Shutdown;
use std::net::TcpStream;

use log::trace;

/// An ordered, full-duplex byte connection to the server.
///
/// The session splits the transport into a read half owned by the stanza
/// reader and a write half shared by the senders, so a blocking read never
/// holds up a concurrent write.
pub trait Transport {
    type Reader: Read + Send + 'static;
    type Writer: TransportWriter + 'static;

    fn split(self) -> io::Result<(Self::Reader, Self::Writer)>;
}

/// Write half of a [Transport].
pub trait TransportWriter: Write + Send {
    /// Shuts the connection down in both directions.
    ///
    /// A read blocked on the other half must return after this.
    fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    type Reader = TcpStream;
    type Writer = TcpStream;

    fn split(self) -> io::Result<(TcpStream, TcpStream)> {
        let reader = self.try_clone()?;
        Ok((reader, self))
    }
}

impl TransportWriter for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

/// Logs every chunk read from the transport.
pub(crate) struct TraceReader<R: Read> {
    inner: R,
}

impl<R: Read> TraceReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        TraceReader { inner }
    }
}

impl<R: Read> Read for TraceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let nr_read = self.inner.read(buf)?;
        trace!("RECV: {}", String::from_utf8_lossy(&buf[..nr_read]));
        Ok(nr_read)
    }
}

#[cfg(feature = "tls")]
pub use tls::TlsReader;
#[cfg(feature = "tls")]
pub use tls::TlsTransport;
#[cfg(feature = "tls")]
pub use tls::TlsWriter;

#[cfg(feature = "tls")]
mod tls {
    use std::io;
    use std::io::Read;
    use std::io::Write;
    use std::net::Shutdown;
    use std::net::TcpStream;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::MutexGuard;

    use rustls::ClientConfig;
    use rustls::ClientConnection;
    use rustls::RootCertStore;
    use rustls::pki_types::ServerName;

    use super::Transport;
    use super::TransportWriter;
    use crate::XmppClientError;

    /// A TCP connection upgraded to TLS before any XMPP traffic.
    pub struct TlsTransport {
        conn: ClientConnection,
        tcp: TcpStream,
    }

    impl TlsTransport {
        /// Performs the TLS handshake, verifying the server certificate
        /// against the Mozilla root store for the given domain.
        pub fn connect(tcp: TcpStream, domain: &str) -> Result<Self, XmppClientError> {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            let config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            Self::with_config(tcp, domain, Arc::new(config))
        }

        pub fn with_config(
            mut tcp: TcpStream,
            domain: &str,
            config: Arc<ClientConfig>,
        ) -> Result<Self, XmppClientError> {
            let name = ServerName::try_from(domain.to_string())
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
            let mut conn = ClientConnection::new(config, name)?;
            while conn.is_handshaking() {
                conn.complete_io(&mut tcp)?;
            }
            Ok(TlsTransport { conn, tcp })
        }
    }

    impl Transport for TlsTransport {
        type Reader = TlsReader;
        type Writer = TlsWriter;

        fn split(self) -> io::Result<(TlsReader, TlsWriter)> {
            let conn = Arc::new(Mutex::new(self.conn));
            let reader = TlsReader {
                conn: conn.clone(),
                tcp: self.tcp.try_clone()?,
                raw: [0; 4096],
            };
            let writer = TlsWriter {
                conn,
                tcp: self.tcp,
            };
            Ok((reader, writer))
        }
    }

    fn lock(conn: &Mutex<ClientConnection>) -> io::Result<MutexGuard<'_, ClientConnection>> {
        conn.lock()
            .map_err(|_| io::Error::other("TLS connection state is poisoned"))
    }

    /// Encrypts every pending record into a buffer.
    fn take_pending(conn: &mut ClientConnection) -> io::Result<Vec<u8>> {
        let mut records = Vec::new();
        while conn.wants_write() {
            conn.write_tls(&mut records)?;
        }
        Ok(records)
    }

    /// Read half of a [TlsTransport].
    ///
    /// Socket reads are done without holding the TLS state lock, only the
    /// decryption of the received records is. The reader never writes to
    /// the socket, records produced while reading (alerts, key updates) go
    /// out with the next write of the [TlsWriter].
    pub struct TlsReader {
        conn: Arc<Mutex<ClientConnection>>,
        tcp: TcpStream,
        raw: [u8; 4096],
    }

    impl Read for TlsReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            loop {
                {
                    let mut conn = lock(&self.conn)?;
                    match conn.reader().read(buf) {
                        Ok(nr_read) => return Ok(nr_read),
                        Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                        Err(err) => return Err(err),
                    }
                }
                let nr_read = self.tcp.read(&mut self.raw)?;
                let mut conn = lock(&self.conn)?;
                // An empty slice tells rustls that the peer closed the socket
                let mut received = &self.raw[..nr_read];
                loop {
                    conn.read_tls(&mut received)?;
                    conn.process_new_packets()
                        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
                    if received.is_empty() {
                        break;
                    }
                }
            }
        }
    }

    /// Write half of a [TlsTransport].
    ///
    /// Records are encrypted under the TLS state lock and written to the
    /// socket after it is released, so a stalled write never holds up the
    /// reader. This is the only writer of the socket, which keeps the
    /// records in order.
    pub struct TlsWriter {
        conn: Arc<Mutex<ClientConnection>>,
        tcp: TcpStream,
    }

    impl TlsWriter {
        fn encrypt(&self, buf: &[u8]) -> io::Result<(usize, Vec<u8>)> {
            let mut conn = lock(&self.conn)?;
            let nr_written = conn.writer().write(buf)?;
            Ok((nr_written, take_pending(&mut conn)?))
        }
    }

    impl Write for TlsWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let (nr_written, records) = self.encrypt(buf)?;
            self.tcp.write_all(&records)?;
            Ok(nr_written)
        }

        fn flush(&mut self) -> io::Result<()> {
            let records = {
                let mut conn = lock(&self.conn)?;
                conn.writer().flush()?;
                take_pending(&mut conn)?
            };
            self.tcp.write_all(&records)?;
            self.tcp.flush()
        }
    }

    impl TransportWriter for TlsWriter {
        fn close(&mut self) -> io::Result<()> {
            let records = {
                let mut conn = lock(&self.conn)?;
                conn.send_close_notify();
                take_pending(&mut conn)?
            };
            self.tcp.write_all(&records)?;
            self.tcp.shutdown(Shutdown::Both)
        }
    }
}

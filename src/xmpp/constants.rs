/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

pub const CLIENT_PORT: u16 = 5222;

/// Port for XMPP over implicit TLS (XEP-0368).
pub const DIRECT_TLS_PORT: u16 = 5223;

pub const STREAM_TAG: &str = "stream:stream";

pub const FEATURES_TAG: &str = "stream:features";

pub const ERROR_TAG: &str = "stream:error";

pub const CLIENT_NS: &str = "jabber:client";

pub const STREAM_NS: &str = "http://etherx.jabber.org/streams";

pub const SASL_NS: &str = "urn:ietf:params:xml:ns:xmpp-sasl";

pub const BIND_NS: &str = "urn:ietf:params:xml:ns:xmpp-bind";

pub const SESSION_NS: &str = "urn:ietf:params:xml:ns:xmpp-session";

pub const STANZAS_NS: &str = "urn:ietf:params:xml:ns:xmpp-stanzas";

pub const STREAMS_NS: &str = "urn:ietf:params:xml:ns:xmpp-streams";

pub const PLAIN_MECHANISM: &str = "PLAIN";

pub const BIND_REQUEST_ID: &str = "bind_1";

pub const SESSION_REQUEST_ID: &str = "sess_1";

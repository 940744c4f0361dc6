/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io::BufReader;

use super::*;

fn start(name: &str, attributes: &[(&str, &str)]) -> Token {
    Token::Start(StartTag {
        name: name.to_string(),
        attributes: attributes
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    })
}

fn end(name: &str) -> Token {
    Token::End(name.to_string())
}

fn text(text: &str) -> Token {
    Token::Text(text.to_string())
}

fn check_tokens(xml: &str, expected: &[Token]) {
    let mut reader = XmlReader::new(xml.as_bytes());
    for token in expected {
        assert_eq!(&reader.next_token().unwrap(), token);
    }
    assert_eq!(reader.next_token().unwrap(), Token::Eof);
}

#[test]
fn tokens() {
    check_tokens(
        "<?xml version='1.0'?><a x='1'><b/>hi &amp; bye<![CDATA[<raw>]]><!-- note --></a>",
        &[
            start("a", &[("x", "1")]),
            start("b", &[]),
            end("b"),
            text("hi & bye"),
            text("<raw>"),
            end("a"),
        ],
    );
    check_tokens(
        "<stream:stream xmlns:stream='http://etherx.jabber.org/streams' id='abc'>",
        &[start(
            "stream:stream",
            &[
                ("xmlns:stream", "http://etherx.jabber.org/streams"),
                ("id", "abc"),
            ],
        )],
    );
}

#[test]
fn depth_tracking() {
    let mut reader = XmlReader::new(&b"<s><m><body>x</body></m>"[..]);
    assert_eq!(reader.depth(), 0);
    reader.next_token().unwrap();
    assert_eq!(reader.depth(), 1);
    reader.next_token().unwrap();
    reader.next_token().unwrap();
    assert_eq!(reader.depth(), 3);
    reader.next_token().unwrap();
    reader.next_token().unwrap();
    reader.next_token().unwrap();
    assert_eq!(reader.depth(), 1);
}

#[test]
fn skip_balances_nested_elements() {
    let mut reader = XmlReader::new(
        &b"<s><presence><status><a><a/></a></status></presence><message/></s>"[..],
    );
    assert_eq!(reader.next_token().unwrap(), start("s", &[]));
    assert_eq!(reader.next_token().unwrap(), start("presence", &[]));
    reader.skip_element().unwrap();
    assert_eq!(reader.depth(), 1);
    assert_eq!(reader.next_token().unwrap(), start("message", &[]));
    assert_eq!(reader.next_token().unwrap(), end("message"));
    assert_eq!(reader.next_token().unwrap(), end("s"));
}

#[test]
fn element_tree() {
    let mut reader = XmlReader::new(
        &b"<stream:features>\
            <mechanisms xmlns='urn:ietf:params:xml:ns:xmpp-sasl'>\
                <mechanism>PLAIN</mechanism>\
                <mechanism>SCRAM-SHA-1</mechanism>\
            </mechanisms>\
            <bind xmlns='urn:ietf:params:xml:ns:xmpp-bind'/>\
        </stream:features>"[..],
    );
    let Token::Start(tag) = reader.next_token().unwrap() else {
        panic!("start tag expected");
    };
    let features = reader.read_element(tag).unwrap();
    assert_eq!(reader.depth(), 0);
    assert_eq!(features.name(), "stream:features");
    assert_eq!(features.local_name(), "features");
    let mechanisms = features
        .child("mechanisms", Some("urn:ietf:params:xml:ns:xmpp-sasl"))
        .unwrap();
    let names: Vec<String> = mechanisms.children().map(|m| m.text()).collect();
    assert_eq!(names, vec!["PLAIN", "SCRAM-SHA-1"]);
    assert!(features.has_child("bind", Some("urn:ietf:params:xml:ns:xmpp-bind")));
    assert!(!features.has_child("bind", Some("urn:ietf:params:xml:ns:xmpp-sasl")));
    assert!(!features.has_child("session", None));
}

#[test]
fn split_reads() {
    // One byte per read, so every token spans several reads
    let xml = b"<s><message from='a@b/c'><body>Hello there</body></message>";
    let mut reader = XmlReader::new(BufReader::with_capacity(1, &xml[..]));
    assert_eq!(reader.next_token().unwrap(), start("s", &[]));
    let Token::Start(tag) = reader.next_token().unwrap() else {
        panic!("start tag expected");
    };
    let message = reader.read_element(tag).unwrap();
    assert_eq!(message.attribute("from"), Some("a@b/c"));
    assert_eq!(message.child("body", None).unwrap().text(), "Hello there");
}

#[test]
fn restart_keeps_input() {
    let xml = b"<stream:stream id='1'><success/><stream:stream id='2'><x/>";
    let mut reader = XmlReader::new(&xml[..]);
    assert_eq!(reader.next_token().unwrap(), start("stream:stream", &[("id", "1")]));
    assert_eq!(reader.next_token().unwrap(), start("success", &[]));
    assert_eq!(reader.next_token().unwrap(), end("success"));
    let mut reader = reader.restart();
    assert_eq!(reader.depth(), 0);
    assert_eq!(reader.next_token().unwrap(), start("stream:stream", &[("id", "2")]));
    assert_eq!(reader.depth(), 1);
    assert_eq!(reader.next_token().unwrap(), start("x", &[]));
}

#[test]
fn bad_streams() {
    let mut reader = XmlReader::new(&b"<s><a><b>"[..]);
    reader.next_token().unwrap();
    let Token::Start(tag) = reader.next_token().unwrap() else {
        panic!("start tag expected");
    };
    assert!(matches!(reader.read_element(tag), Err(XmlError::UnexpectedEof)));

    let mut reader = XmlReader::new(&b"<s><a></b>"[..]);
    reader.next_token().unwrap();
    reader.next_token().unwrap();
    assert!(matches!(reader.skip_element(), Err(XmlError::Syntax(_))));
}

#[test]
fn serialize() {
    let element = Element::new("message")
        .with_attribute("to", "juliet@example.com")
        .with_attribute("type", "chat")
        .with_child(Element::new("body").with_text("1 < 2 & 'quoted'"))
        .with_child(Element::new("active"));
    assert_eq!(
        element.to_string(),
        "<message to='juliet@example.com' type='chat'>\
         <body>1 &lt; 2 &amp; &apos;quoted&apos;</body><active/></message>"
    );

    let mut header = String::new();
    Element::new("stream:stream")
        .with_attribute("to", "example.com")
        .write_open_tag(&mut header);
    assert_eq!(header, "<stream:stream to='example.com'>");

    let mut element = Element::new("a").with_attribute("x", "1");
    element.set_attribute("x", "it's");
    assert_eq!(element.to_string(), "<a x='it&apos;s'/>");
}

/*
** This file is a part of xmpp-engine (XMPP client session engine)
** Copyright (C) 2000-2025 Gurer Ozen
**
** xmpp-engine is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::env;
use std::io;
use std::io::BufRead;
use std::process::ExitCode;
use std::thread;

use log::debug;
use xmpp_engine::Chat;
use xmpp_engine::Event;
use xmpp_engine::Jid;
use xmpp_engine::Stanza;
use xmpp_engine::TlsMode;
use xmpp_engine::XmppClient;
use xmpp_engine::XmppClientError;
use xmpp_engine::XmppSender;

fn print_version() {
    println!("xmppchat (xmpp-engine) v{}", xmpp_engine::VERSION);
}

fn print_usage() {
    println!(concat!(
        "Usage: xmppchat [OPTIONS]\n",
        "This tool sends and receives chat messages over XMPP.\n",
        "Lines typed as 'JID text' are sent as messages to JID.\n",
        "Options:\n",
        "  -j, --jid <JID>        Jabber ID\n",
        "  -s, --server <HOST>    Server address, host or host:port\n",
        "      --plaintext        Do not use TLS\n",
        "  -h, --help             Display this help message and exit\n",
        "  -v, --version          Display the version and exit\n",
        "Set RUST_LOG=trace to see the XML traffic"
    ));
}

fn send_lines(sender: XmppSender) {
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        };
        let Some((to, text)) = line.trim().split_once(' ') else {
            if !line.trim().is_empty() {
                eprintln!("Error: expected 'JID text'");
            }
            continue;
        };
        if let Err(err) = Jid::new(to) {
            eprintln!("Error: {err}");
            continue;
        }
        if let Err(err) = sender.send(&Stanza::Chat(Chat::new(to, "chat", text.trim()))) {
            eprintln!("Error: {err}");
            break;
        }
    }
    debug!("input ended, closing the session");
    if let Err(err) = sender.close() {
        eprintln!("Error: {err}");
    }
}

fn chat(jid: Jid, server: Option<String>, tls: TlsMode) -> Result<(), XmppClientError> {
    let password = rpassword::prompt_password(format!("Password for {jid}: "))?;
    let mut client = XmppClient::build(jid).server(server).tls(tls).login(&password)?;
    if let Some(jid) = client.jid() {
        println!("Logged in as {jid}");
    }
    if let Some(sender) = client.sender() {
        thread::spawn(move || send_lines(sender));
    }
    loop {
        match client.recv() {
            Ok(Event::Chat(chat)) => {
                if !chat.text.is_empty() {
                    println!("{}: {}", chat.remote, chat.text);
                }
            }
            Ok(_) => {}
            Err(XmppClientError::StreamClosed) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let mut args = env::args();
    let mut jid: Option<Jid> = None;
    let mut server: Option<String> = None;
    let mut tls = TlsMode::DirectTls;

    // Skip the first argument (program name)
    args.next();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-j" | "--jid" => {
                if let Some(value) = args.next() {
                    jid = match Jid::new(&value) {
                        Ok(jid) => Some(jid),
                        Err(err) => {
                            eprintln!("Error: {}", err);
                            return ExitCode::FAILURE;
                        }
                    };
                } else {
                    eprintln!("Error: Jabber ID expected after {arg}");
                    return ExitCode::FAILURE;
                }
            }
            "-s" | "--server" => {
                if let Some(value) = args.next() {
                    server = Some(value);
                } else {
                    eprintln!("Error: server address expected after {arg}");
                    return ExitCode::FAILURE;
                }
            }
            "--plaintext" => tls = TlsMode::Plaintext,
            "-h" | "--help" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            "-v" | "--version" => {
                print_version();
                return ExitCode::SUCCESS;
            }
            _ => {
                eprintln!("Error: unknown option {arg}");
                return ExitCode::FAILURE;
            }
        }
    }

    let Some(jid) = jid else {
        eprintln!("Error: Jabber ID is required, see --help");
        return ExitCode::FAILURE;
    };
    match chat(jid, server, tls) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! End-to-end negotiation scenarios: two interpreters wired
//! back-to-back, each end's output shuttled into the other until the
//! exchange settles.

use std::sync::{Arc, Mutex};
use telwire_codec::sub::comport::{ComPortCmd, ComPortMessage};
use telwire_codec::sub::mud::{self, GmcpMessage, MsdpValue, MsspValue};
use telwire_codec::{
    NvtHandler, Processed, TelnetHandler, TelnetInterpreter, TelnetOption, WindowSize, consts,
};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Events>>);

#[derive(Default)]
struct Events {
    naws: Vec<WindowSize>,
    environ: Vec<Vec<(String, String)>>,
    charset: Vec<String>,
    ttype_done: Vec<Vec<String>>,
    gmcp: Vec<GmcpMessage>,
    msdp: Vec<Vec<(String, MsdpValue)>>,
    mssp: Vec<Vec<(String, MsspValue)>>,
    atcp: Vec<(String, String)>,
    zmp: Vec<Vec<String>>,
    aardwolf: Vec<u8>,
    comport: Vec<ComPortMessage>,
}

impl TelnetHandler for Recorder {
    fn on_naws(&mut self, size: WindowSize) {
        self.0.lock().unwrap().naws.push(size);
    }
    fn on_environ(&mut self, env: Vec<(String, String)>) {
        self.0.lock().unwrap().environ.push(env);
    }
    fn on_charset(&mut self, charset: String) {
        self.0.lock().unwrap().charset.push(charset);
    }
    fn on_ttype_done(&mut self, types: Vec<String>) {
        self.0.lock().unwrap().ttype_done.push(types);
    }
    fn on_gmcp(&mut self, message: GmcpMessage) {
        self.0.lock().unwrap().gmcp.push(message);
    }
    fn on_msdp(&mut self, variables: Vec<(String, MsdpValue)>) {
        self.0.lock().unwrap().msdp.push(variables);
    }
    fn on_mssp(&mut self, variables: Vec<(String, MsspValue)>) {
        self.0.lock().unwrap().mssp.push(variables);
    }
    fn on_atcp(&mut self, package: String, value: String) {
        self.0.lock().unwrap().atcp.push((package, value));
    }
    fn on_zmp(&mut self, parts: Vec<String>) {
        self.0.lock().unwrap().zmp.push(parts);
    }
    fn on_aardwolf(&mut self, info: telwire_codec::sub::mud::AardwolfInfo) {
        self.0.lock().unwrap().aardwolf.push(info.channel_byte);
    }
    fn on_comport(&mut self, message: ComPortMessage) {
        self.0.lock().unwrap().comport.push(message);
    }
    fn environ(&mut self, keys: &[String]) -> Vec<(String, String)> {
        keys.iter()
            .filter(|key| *key == "LANG")
            .map(|key| (key.clone(), "uk_UA.KOI8-U".to_string()))
            .collect()
    }
    fn terminal_type(&mut self) -> String {
        "xterm-256color".to_string()
    }
}

fn feed(interp: &mut TelnetInterpreter, bytes: &[u8]) -> Vec<u8> {
    let mut inband = Vec::new();
    for &byte in bytes {
        if let Processed::InBand(b) = interp.feed_byte(byte) {
            inband.push(b);
        }
    }
    inband
}

/// Shuttles queued output between both ends until neither has
/// anything further to say. Loop-free negotiation is itself part of
/// the assertion: a reply loop would never settle.
fn settle(server: &mut TelnetInterpreter, client: &mut TelnetInterpreter) {
    for round in 0.. {
        assert!(round < 64, "negotiation did not settle; reply loop?");
        let from_server = server.take_output();
        let from_client = client.take_output();
        if from_server.is_empty() && from_client.is_empty() {
            break;
        }
        feed(client, &from_server);
        feed(server, &from_client);
    }
}

fn pair() -> (TelnetInterpreter, Recorder, TelnetInterpreter, Recorder) {
    let server_events = Recorder::default();
    let client_events = Recorder::default();
    let server = TelnetInterpreter::server(Box::new(server_events.clone()));
    let client = TelnetInterpreter::client(Box::new(client_events.clone()));
    (server, server_events, client, client_events)
}

#[test]
fn full_server_offer_settles_cleanly() {
    let (mut server, server_events, mut client, _client_events) = pair();

    server.request_will(TelnetOption::SuppressGoAhead);
    server.request_will(TelnetOption::Echo);
    server.request_will(TelnetOption::TransmitBinary);
    server.request_do(TelnetOption::TransmitBinary);
    server.request_do(TelnetOption::TerminalType);
    server.request_do(TelnetOption::NewEnviron);
    server.request_do(TelnetOption::WindowSize);
    server.request_do(TelnetOption::Charset);
    settle(&mut server, &mut client);

    assert!(server.negotiation_complete(), "server still pending: {:?}",
        server.failed_replies());
    assert!(client.negotiation_complete(), "client still pending: {:?}",
        client.failed_replies());

    // echo/sga/binary granted
    assert!(server.local_enabled(TelnetOption::Echo));
    assert!(server.local_enabled(TelnetOption::SuppressGoAhead));
    assert!(server.table().binary_both_ways());
    assert!(client.table().binary_both_ways());

    // client metadata arrived
    let events = server_events.0.lock().unwrap();
    assert_eq!(events.naws, vec![WindowSize::new(24, 80)]);
    assert_eq!(
        events.ttype_done,
        vec![vec!["xterm-256color".to_string()]]
    );
    // charset settled to the first offer on both ends
    assert_eq!(events.charset, vec!["UTF-8".to_string()]);
    drop(events);
    assert_eq!(server.encoding_name(), Some("UTF-8"));
    assert_eq!(client.encoding_name(), Some("UTF-8"));
}

#[test]
fn environ_discloses_only_requested_keys() {
    let (mut server, server_events, mut client, _) = pair();
    server.request_do(TelnetOption::NewEnviron);
    settle(&mut server, &mut client);

    assert!(server.negotiation_complete());
    let events = server_events.0.lock().unwrap();
    assert_eq!(
        events.environ,
        vec![vec![("LANG".to_string(), "uk_UA.KOI8-U".to_string())]],
        "only the LANG value is disclosed, never the whole environment"
    );
}

#[test]
fn status_exchange_agrees() {
    let (mut server, _, mut client, _) = pair();
    server.request_will(TelnetOption::SuppressGoAhead);
    server.request_do(TelnetOption::WindowSize);
    settle(&mut server, &mut client);

    // client asks for the server's view of the world
    client.request_will(TelnetOption::Status);
    settle(&mut server, &mut client);
    assert!(server.remote_enabled(TelnetOption::Status));

    // server sent SB STATUS SEND on WILL STATUS; client answered
    // with IS; both settled without mismatch logging breaking state
    assert!(server.negotiation_complete());
    assert!(client.negotiation_complete());
}

#[test]
fn gmcp_round_trip_both_directions() {
    let (mut server, server_events, mut client, client_events) = pair();
    server.request_will(TelnetOption::GMCP);
    settle(&mut server, &mut client);
    assert!(server.local_enabled(TelnetOption::GMCP));
    assert!(client.remote_enabled(TelnetOption::GMCP));

    let vitals = GmcpMessage::with_data("Char.Vitals", serde_json::json!({"hp": 100}));
    assert!(server.send_gmcp(&vitals));
    settle(&mut server, &mut client);
    assert_eq!(client_events.0.lock().unwrap().gmcp, vec![vitals]);

    let hello = GmcpMessage::with_data(
        "Core.Hello",
        serde_json::json!({"client": "telwire", "version": "0.1.0"}),
    );
    assert!(client.send_gmcp(&hello));
    settle(&mut server, &mut client);
    assert_eq!(server_events.0.lock().unwrap().gmcp, vec![hello]);
}

#[test]
fn msdp_report_reaches_client() {
    let (mut server, _, mut client, client_events) = pair();
    server.request_will(TelnetOption::MSDP);
    settle(&mut server, &mut client);

    let variables = vec![(
        "ROOM".to_string(),
        MsdpValue::Table(vec![
            ("VNUM".to_string(), MsdpValue::Str("6008".to_string())),
            (
                "EXITS".to_string(),
                MsdpValue::Array(vec![MsdpValue::Str("n".to_string())]),
            ),
        ]),
    )];
    server.send_subnegotiation(TelnetOption::MSDP, &mud::msdp_encode(&variables));
    settle(&mut server, &mut client);
    assert_eq!(client_events.0.lock().unwrap().msdp, vec![variables]);
}

#[test]
fn mssp_atcp_zmp_aardwolf_reach_client() {
    let (mut server, _, mut client, client_events) = pair();
    for option in [
        TelnetOption::MSSP,
        TelnetOption::ATCP,
        TelnetOption::ZMP,
        TelnetOption::Aardwolf,
    ] {
        server.request_will(option);
    }
    settle(&mut server, &mut client);

    let mssp = vec![(
        "PLAYERS".to_string(),
        MsspValue::Single("42".to_string()),
    )];
    server.send_subnegotiation(TelnetOption::MSSP, &mud::mssp_encode(&mssp));
    server.send_subnegotiation(TelnetOption::ATCP, &mud::atcp_encode("Auth.Request", "ON"));
    server.send_subnegotiation(
        TelnetOption::ZMP,
        &mud::zmp_encode(&["zmp.ping".to_string()]),
    );
    server.send_subnegotiation(TelnetOption::Aardwolf, &mud::aardwolf_encode(101, &[1]));
    settle(&mut server, &mut client);

    let events = client_events.0.lock().unwrap();
    assert_eq!(events.mssp, vec![mssp]);
    assert_eq!(
        events.atcp,
        vec![("Auth.Request".to_string(), "ON".to_string())]
    );
    assert_eq!(events.zmp, vec![vec!["zmp.ping".to_string()]]);
    assert_eq!(events.aardwolf, vec![101]);
}

#[test]
fn comport_baudrate_reaches_server() {
    let (mut server, server_events, mut client, _) = pair();
    feed(&mut server, &[consts::IAC, consts::WILL, consts::option::COM_PORT]);
    settle(&mut server, &mut client);

    let message = ComPortMessage {
        cmd: ComPortCmd::SetBaudrate(9600),
        from_server: false,
    };
    server.take_output();
    let payload = telwire_codec::sub::comport::encode(&message);
    let mut wire = vec![consts::IAC, consts::SB, consts::option::COM_PORT];
    wire.extend_from_slice(&payload);
    wire.extend_from_slice(&[consts::IAC, consts::SE]);
    feed(&mut server, &wire);
    assert_eq!(server_events.0.lock().unwrap().comport, vec![message]);
}

#[test]
fn linemode_settles_with_slc_and_forwardmask() {
    let (mut server, _, mut client, _) = pair();
    // client offers LINEMODE; server sets the initial mode
    client.request_will(TelnetOption::Linemode);
    settle(&mut server, &mut client);
    assert!(server.remote_enabled(TelnetOption::Linemode));
    assert!(client.local_enabled(TelnetOption::Linemode));
    // the server's proposal was acknowledged
    assert!(client.linemode().ack());
    assert!(server.linemode().agrees_with(client.linemode()));

    // client volunteers its SLC table; server merges and asks for a
    // forwardmask update
    let triplets: Vec<(u8, telwire_codec::SlcDef)> = (1..=consts::slc::NSLC)
        .map(|func| (func, client.slctab().get(func)))
        .filter(|(_, def)| !def.is_nosupport())
        .collect();
    let payload = telwire_codec::sub::linemode::encode_slc(&triplets);
    client.send_subnegotiation(TelnetOption::Linemode, &payload);
    settle(&mut server, &mut client);

    // identical BSD tables on both ends: no changes, and the client
    // received DO FORWARDMASK carrying the server's mask
    assert!(client.peer_forwardmask().is_some());
    let mask = client.peer_forwardmask().unwrap();
    assert!(mask.contains(0x03), "interrupt character is forwarded");
}

#[test]
fn plain_nvt_session_passes_data_untouched() {
    let (mut server, _, mut client, _) = pair();
    settle(&mut server, &mut client);
    let inband = feed(&mut server, b"login: ");
    assert_eq!(inband, b"login: ");
    let inband = feed(&mut client, &[consts::IAC, consts::IAC]);
    assert_eq!(inband, vec![consts::IAC]);
    assert!(matches!(server.feed_byte(consts::IAC), Processed::OutOfBand));
    assert!(matches!(server.feed_byte(consts::NOP), Processed::OutOfBand));
    assert_eq!(feed(&mut server, b"after"), b"after");
    assert!(!server.has_output());
}

#[test]
fn nvt_handler_settles_everything_silently() {
    // the do-nothing handler still negotiates every option family
    let mut server = TelnetInterpreter::server(Box::new(NvtHandler));
    let mut client = TelnetInterpreter::client(Box::new(NvtHandler));
    server.request_do(TelnetOption::TerminalType);
    server.request_do(TelnetOption::WindowSize);
    server.request_will(TelnetOption::Echo);
    settle(&mut server, &mut client);
    assert!(server.negotiation_complete());
    assert!(client.negotiation_complete());
}

#[tracing_test::traced_test]
#[test]
fn interrupted_subnegotiation_logs_a_warning() {
    // S4: the diagnostic names the option, the buffered length, and
    // the interrupting command.
    let (mut server, _, _, _) = pair();
    feed(
        &mut server,
        &[
            consts::IAC,
            consts::SB,
            consts::option::CHARSET,
            0x01,
            b'X',
            b'Y',
            consts::IAC,
            consts::WONT,
            consts::option::CHARSET,
        ],
    );
    assert!(logs_contain("SB CHARSET (3 bytes) interrupted by IAC WONT"));
}

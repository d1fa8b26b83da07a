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

//! Event handler trait for the interpreter.

use crate::linemode::Linemode;
use crate::slc::SlcDef;
use crate::sub::comport::ComPortMessage;
use crate::sub::lflow::LflowMode;
use crate::sub::mud::{AardwolfInfo, GmcpMessage, MsdpValue, MsspValue};
use crate::sub::naws::WindowSize;
use tracing::debug;

///
/// Per-connection protocol hooks.
///
/// Implement this trait to observe commands and sub-negotiation
/// results, and to provide the values the peer may request. Every
/// method has a default implementation, so an implementation only
/// names the hooks it cares about. All methods are synchronous; they
/// are invoked from inside `feed_byte` and must not re-enter the
/// interpreter.
///
/// # Example
///
/// ```
/// use telwire_codec::{TelnetHandler, WindowSize};
///
/// struct MyHandler;
///
/// impl TelnetHandler for MyHandler {
///     fn on_naws(&mut self, size: WindowSize) {
///         println!("peer window is {size}");
///     }
/// }
/// ```
pub trait TelnetHandler: Send {
    // #### Command hooks ###################################################

    /// Called on `IAC NOP`.
    fn on_nop(&mut self) {
        debug!("IAC NOP: Null Operation (unhandled)");
    }

    /// Called on `IAC DM`. The transport is not tested for TCP
    /// urgent data, so a Data Mark carries no flush semantics here.
    fn on_dm(&mut self) {
        debug!("IAC DM: Data Mark (unhandled)");
    }

    /// Called on `IAC BRK`.
    fn on_brk(&mut self) {
        debug!("IAC BRK: Break (unhandled)");
    }

    /// Called on `IAC IP`.
    fn on_ip(&mut self) {
        debug!("IAC IP: Interrupt Process (unhandled)");
    }

    /// Called on `IAC AO`.
    fn on_ao(&mut self) {
        debug!("IAC AO: Abort Output (unhandled)");
    }

    /// Called on `IAC AYT`.
    fn on_ayt(&mut self) {
        debug!("IAC AYT: Are You There (unhandled)");
    }

    /// Called on `IAC EC`.
    fn on_ec(&mut self) {
        debug!("IAC EC: Erase Character (unhandled)");
    }

    /// Called on `IAC EL`.
    fn on_el(&mut self) {
        debug!("IAC EL: Erase Line (unhandled)");
    }

    /// Called on `IAC GA`. GA is a legacy half-duplex signal.
    fn on_ga(&mut self) {
        debug!("IAC GA: Go Ahead (unhandled)");
    }

    /// Called on `IAC EOR`.
    fn on_eor(&mut self) {
        debug!("IAC EOR: End of Record (unhandled)");
    }

    /// Called on `IAC EOF`.
    fn on_eof(&mut self) {
        debug!("IAC EOF: End of File (unhandled)");
    }

    /// Called on `IAC SUSP`.
    fn on_susp(&mut self) {
        debug!("IAC SUSP: Suspend Process (unhandled)");
    }

    /// Called on `IAC ABORT`.
    fn on_abort(&mut self) {
        debug!("IAC ABORT: Abort (unhandled)");
    }

    /// Called when a Timing Mark negotiation fires; `verb` is DO,
    /// WILL, or WONT as received.
    fn on_tm(&mut self, verb: u8) {
        debug!("IAC TM: Timing Mark, verb 0x{verb:02X}");
    }

    /// Called when the peer negotiates LOGOUT; `verb` is DO, DONT,
    /// WILL, or WONT. A server receiving DO should close the
    /// transport; a server receiving WILL treats it as a graceful
    /// logout hint.
    fn on_logout(&mut self, verb: u8) {
        debug!("IAC LOGOUT, verb 0x{verb:02X}");
    }

    // #### Value providers #################################################

    /// The terminal type sent in reply to `SB TTYPE SEND`. A client
    /// with several types may return a different value per call and
    /// must repeat the final value to mark the end of its list.
    fn terminal_type(&mut self) -> String {
        "unknown".to_string()
    }

    /// The `(rx, tx)` speeds sent in reply to `SB TSPEED SEND`.
    fn terminal_speed(&mut self) -> (u32, u32) {
        (38400, 38400)
    }

    /// The display sent in reply to `SB XDISPLOC SEND`.
    fn xdisploc(&mut self) -> String {
        String::new()
    }

    /// The window size sent with NAWS.
    fn window_size(&mut self) -> WindowSize {
        WindowSize::default()
    }

    /// The location sent with SNDLOC.
    fn send_location(&mut self) -> String {
        String::new()
    }

    /// The environment values disclosed in reply to `SB NEW-ENVIRON
    /// SEND`. `keys` never includes the "send everything" sentinel;
    /// the interpreter already refused it.
    fn environ(&mut self, keys: &[String]) -> Vec<(String, String)> {
        let _ = keys;
        Vec::new()
    }

    /// Chooses one of the peer's offered charsets, or `None` to
    /// reject the offer. The default takes the first offer the
    /// text-decoding machinery recognizes.
    fn charset_offer(&mut self, offers: &[String]) -> Option<String> {
        offers
            .iter()
            .find(|name| encoding_rs::Encoding::for_label(name.as_bytes()).is_some())
            .cloned()
    }

    // #### Sub-negotiation notifications ###################################

    /// The peer reported its window size.
    fn on_naws(&mut self, size: WindowSize) {
        debug!("NAWS {size}");
    }

    /// The peer sent environment records via IS or INFO.
    fn on_environ(&mut self, env: Vec<(String, String)>) {
        debug!("NEW-ENVIRON {env:?}");
    }

    /// The peer reported a terminal type.
    fn on_ttype(&mut self, ttype: String) {
        debug!("TTYPE IS {ttype:?}");
    }

    /// The terminal-type list finished cycling; `types` holds every
    /// distinct value reported, in order.
    fn on_ttype_done(&mut self, types: Vec<String>) {
        debug!("TTYPE cycle complete: {types:?}");
    }

    /// The peer reported terminal speeds.
    fn on_tspeed(&mut self, rx: u32, tx: u32) {
        debug!("TSPEED IS {rx},{tx}");
    }

    /// The peer reported its X display.
    fn on_xdisploc(&mut self, display: String) {
        let xdisploc_value = &display;
        debug!("XDISPLOC IS {:?}", xdisploc_value);
    }

    /// The peer reported its location.
    fn on_sndloc(&mut self, location: String) {
        debug!("SNDLOC {location:?}");
    }

    /// A charset was agreed; text decoding switches to it.
    fn on_charset(&mut self, charset: String) {
        debug!("CHARSET ACCEPTED {charset:?}");
    }

    /// The peer rejected every offered charset.
    fn on_charset_rejected(&mut self) {
        debug!("CHARSET REJECTED");
    }

    /// The peer toggled flow control.
    fn on_lflow(&mut self, mode: LflowMode) {
        debug!("LFLOW {mode:?}");
    }

    /// The line discipline mode settled to `mode`.
    fn on_linemode(&mut self, mode: Linemode) {
        debug!("LINEMODE MODE {mode}");
    }

    /// An SLC definition changed through negotiation.
    fn on_slc_changed(&mut self, func: u8, def: SlcDef) {
        debug!("SLC change {func}: {def}");
    }

    /// An in-band byte matched an SLC function in remote or kludge
    /// mode and was consumed.
    fn on_slc(&mut self, func: u8, byte: u8) {
        debug!("SLC function {func} fired by 0x{byte:02X}");
    }

    // #### MUD protocol notifications ######################################

    /// A GMCP message arrived.
    fn on_gmcp(&mut self, message: GmcpMessage) {
        debug!("GMCP {message:?}");
    }

    /// MSDP variables arrived.
    fn on_msdp(&mut self, variables: Vec<(String, MsdpValue)>) {
        debug!("MSDP {variables:?}");
    }

    /// MSSP variables arrived.
    fn on_mssp(&mut self, variables: Vec<(String, MsspValue)>) {
        debug!("MSSP {variables:?}");
    }

    /// An ATCP message arrived.
    fn on_atcp(&mut self, package: String, value: String) {
        debug!("ATCP {package:?} {value:?}");
    }

    /// A ZMP command arrived; the first part is the command name.
    fn on_zmp(&mut self, parts: Vec<String>) {
        debug!("ZMP {parts:?}");
    }

    /// An Aardwolf channel message arrived.
    fn on_aardwolf(&mut self, info: AardwolfInfo) {
        debug!("AARDWOLF {info:?}");
    }

    /// A COM-PORT sub-command arrived.
    fn on_comport(&mut self, message: ComPortMessage) {
        debug!("COM-PORT {message:?}");
    }
}

/// A handler that accepts every default: logs at debug and discloses
/// nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NvtHandler;

impl TelnetHandler for NvtHandler {}

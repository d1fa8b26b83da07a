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

//! The IAC interpreter and option negotiation engine.
//!
//! [`TelnetInterpreter`] is fed one byte at a time and classifies each
//! as in-band or out-of-band. Replies required by the negotiation
//! rules are queued synchronously into an internal output buffer
//! within the same `feed_byte` frame, so a caller that flushes
//! [`TelnetInterpreter::take_output`] between feeds preserves the
//! protocol's ordering guarantee: no in-band byte is surfaced ahead
//! of the reply to the command that preceded it.
//!
//! The interpreter is sans-I/O and synchronous. It never unwinds on
//! malformed input; protocol damage is logged and reported through
//! [`Processed::ParseError`].

use crate::error::CodecError;
use crate::handler::TelnetHandler;
use crate::linemode::Linemode;
use crate::slc::{Forwardmask, SlcReply, SlcTable};
use crate::sub::charset::CharsetCmd;
use crate::sub::environ::EnvironCmd;
use crate::sub::lflow::LflowMode;
use crate::sub::linemode::LinemodeCmd;
use crate::sub::status::StatusCmd;
use crate::sub::tspeed::TspeedCmd;
use crate::sub::ttype::TtypeCmd;
use crate::sub::xdisploc::XdisplocCmd;
use crate::sub::{charset, comport, environ, lflow, linemode, mud, naws, sndloc, status, tspeed, ttype, xdisploc};
use crate::table::{OptionState, OptionTable, PendingVerb};
use crate::{TelnetOption, consts};
use bytes::{BufMut, BytesMut};
use tracing::{debug, error, warn};

/// Upper bound on server-initiated terminal-type queries.
const TTYPE_LOOPMAX: usize = 8;

///
/// Which end of the connection this interpreter speaks for. The
/// negotiation rules are symmetric except for the per-option role
/// exclusions.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TelnetRole {
    /// The connecting end.
    Client,
    /// The listening end.
    Server,
}

impl TelnetRole {
    /// True for the listening end.
    pub fn is_server(self) -> bool {
        matches!(self, TelnetRole::Server)
    }

    /// True for the connecting end.
    pub fn is_client(self) -> bool {
        matches!(self, TelnetRole::Client)
    }
}

///
/// Classification of one fed byte.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Processed {
    /// The byte is application data and should reach the reader.
    InBand(u8),
    /// The byte belonged to the protocol.
    OutOfBand,
    /// The byte belonged to the protocol and completed a malformed
    /// sequence. The fragment has been discarded and parsing
    /// continues; the error is carried for accounting only.
    ParseError(CodecError),
}

impl Processed {
    /// True when the byte should be forwarded to the reader.
    pub fn is_inband(&self) -> bool {
        matches!(self, Processed::InBand(_))
    }
}

///
/// The derived line discipline.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineDiscipline {
    /// Half-duplex NVT: the peer edits locally and transmits on CR.
    Local,
    /// LINEMODE negotiated without local edit: we process every byte.
    Remote,
    /// Character-at-a-time with remote echo, negotiated by
    /// `WILL ECHO` + `WILL SGA` before LINEMODE existed.
    Kludge,
}

///
/// Tunables fixed at connection setup.
///
#[derive(Clone, Debug)]
pub struct InterpreterOptions {
    /// Permit 8-bit application data without BINARY negotiation.
    pub force_binary: bool,
    /// Resume output on any byte after XOFF, not just XON.
    pub xon_any: bool,
    /// Snoop SLC functions in kludge mode as well as remote mode.
    pub slc_simulated: bool,
    /// Codepages offered in a CHARSET REQUEST, most preferred first.
    pub default_codepages: Vec<String>,
    /// Environment keys requested from a client via NEW-ENVIRON.
    pub default_env_request: Vec<String>,
    /// The mode a server proposes when LINEMODE is agreed.
    pub default_linemode: Linemode,
    /// Options accepted even where the role exclusions would refuse
    /// them.
    pub always_accept: Vec<TelnetOption>,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        InterpreterOptions {
            force_binary: false,
            xon_any: false,
            slc_simulated: true,
            default_codepages: vec!["UTF-8".to_string(), "LATIN1".to_string()],
            default_env_request: ["USER", "TERM", "COLUMNS", "LINES", "DISPLAY", "LANG"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_linemode: Linemode::default(),
            always_accept: Vec::new(),
        }
    }
}

/// Doubles every IAC byte, making `data` safe to interleave with
/// command sequences.
pub fn escape_iac(data: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(data.len());
    for &byte in data {
        if byte == consts::IAC {
            escaped.push(consts::IAC);
        }
        escaped.push(byte);
    }
    escaped
}

/// Collapses doubled IAC bytes; the inverse of [`escape_iac`].
pub fn unescape_iac(data: &[u8]) -> Vec<u8> {
    let mut unescaped = Vec::with_capacity(data.len());
    let mut iter = data.iter().copied();
    while let Some(byte) = iter.next() {
        unescaped.push(byte);
        if byte == consts::IAC {
            iter.next();
        }
    }
    unescaped
}

///
/// The per-connection Telnet state machine.
///
/// One interpreter exists per connection and is owned by whatever
/// drives the transport. Option tables mutate only inside
/// `feed_byte` dispatch and the request methods; callbacks must not
/// re-enter the same interpreter.
///
pub struct TelnetInterpreter {
    role: TelnetRole,
    opts: InterpreterOptions,
    handler: Box<dyn TelnetHandler>,

    table: OptionTable,
    slctab: SlcTable,
    default_slctab: SlcTable,
    linemode: Linemode,
    forwardmask_local: bool,
    forwardmask_remote: bool,
    peer_forwardmask: Option<Forwardmask>,

    // IAC parser state
    iac_seen: bool,
    cmd: Option<u8>,
    sb_buf: Vec<u8>,

    // flow control
    lflow: bool,
    xon_any: bool,
    writing: bool,
    write_buffer: Vec<u8>,

    out: BytesMut,
    encoding_name: Option<String>,
    ttype_log: Vec<String>,
}

impl TelnetInterpreter {
    /// Creates an interpreter for `role` with explicit options.
    pub fn with_options(
        role: TelnetRole,
        handler: Box<dyn TelnetHandler>,
        opts: InterpreterOptions,
    ) -> Self {
        let default_linemode = opts.default_linemode;
        let xon_any = opts.xon_any;
        TelnetInterpreter {
            role,
            handler,
            table: OptionTable::new(),
            slctab: SlcTable::default(),
            default_slctab: SlcTable::default(),
            linemode: default_linemode,
            forwardmask_local: false,
            forwardmask_remote: false,
            peer_forwardmask: None,
            iac_seen: false,
            cmd: None,
            sb_buf: Vec::new(),
            lflow: true,
            xon_any,
            writing: true,
            write_buffer: Vec::new(),
            out: BytesMut::new(),
            encoding_name: None,
            ttype_log: Vec::new(),
            opts,
        }
    }

    /// A client-side interpreter with default options.
    pub fn client(handler: Box<dyn TelnetHandler>) -> Self {
        Self::with_options(TelnetRole::Client, handler, InterpreterOptions::default())
    }

    /// A server-side interpreter with default options.
    pub fn server(handler: Box<dyn TelnetHandler>) -> Self {
        Self::with_options(TelnetRole::Server, handler, InterpreterOptions::default())
    }

    // #### Inspection ######################################################

    /// This interpreter's role.
    pub fn role(&self) -> TelnetRole {
        self.role
    }

    /// The option tables.
    pub fn table(&self) -> &OptionTable {
        &self.table
    }

    /// The connection tunables.
    pub fn options(&self) -> &InterpreterOptions {
        &self.opts
    }

    /// True if we have agreed to perform `option`.
    pub fn local_enabled(&self, option: TelnetOption) -> bool {
        self.table.local_enabled(option)
    }

    /// True if the peer has agreed to perform `option`.
    pub fn remote_enabled(&self, option: TelnetOption) -> bool {
        self.table.remote_enabled(option)
    }

    /// True once every request we sent has been answered.
    pub fn negotiation_complete(&self) -> bool {
        !self.table.any_pending()
    }

    /// The requests still awaiting a reply, for the failed-reply
    /// report at connect timeout.
    pub fn failed_replies(&self) -> Vec<(PendingVerb, TelnetOption)> {
        self.table.pending_keys()
    }

    /// The negotiated charset name, once CHARSET has settled.
    pub fn encoding_name(&self) -> Option<&str> {
        self.encoding_name.as_deref()
    }

    /// Forces the charset, as when configuration predates
    /// negotiation.
    pub fn set_encoding(&mut self, name: impl Into<String>) {
        self.encoding_name = Some(name.into());
    }

    /// The stored LINEMODE mode.
    pub fn linemode(&self) -> Linemode {
        self.linemode
    }

    /// The current SLC table.
    pub fn slctab(&self) -> &SlcTable {
        &self.slctab
    }

    /// The forwardmask received via `DO FORWARDMASK`, if any.
    pub fn peer_forwardmask(&self) -> Option<&Forwardmask> {
        self.peer_forwardmask.as_ref()
    }

    /// True while output is running; false after XOFF.
    pub fn writing(&self) -> bool {
        self.writing
    }

    /// True while LFLOW flow control is in effect.
    pub fn lflow(&self) -> bool {
        self.lflow
    }

    /// True when any byte restarts suspended output, per
    /// `LFLOW RESTART_ANY`.
    pub fn xon_any(&self) -> bool {
        self.xon_any
    }

    /// True once the peer agreed to `DO FORWARDMASK` on our side.
    pub fn forwardmask_local(&self) -> bool {
        self.forwardmask_local
    }

    /// True once the peer announced `WILL FORWARDMASK`.
    pub fn forwardmask_remote(&self) -> bool {
        self.forwardmask_remote
    }

    ///
    /// The derived line discipline: `Remote` or `Local` under
    /// LINEMODE depending on the EDIT bit, `Kludge` when ECHO and SGA
    /// are enabled in the direction that implies remote echo, and
    /// `Local` for the base half-duplex NVT.
    ///
    pub fn mode(&self) -> LineDiscipline {
        if self.table.remote_enabled(TelnetOption::Linemode)
            || self.table.local_enabled(TelnetOption::Linemode)
        {
            return if self.linemode.edit() {
                LineDiscipline::Local
            } else {
                LineDiscipline::Remote
            };
        }
        let echo_sga = if self.role.is_server() {
            self.table.local_enabled(TelnetOption::Echo)
                && self.table.local_enabled(TelnetOption::SuppressGoAhead)
        } else {
            self.table.remote_enabled(TelnetOption::Echo)
                && self.table.remote_enabled(TelnetOption::SuppressGoAhead)
        };
        if echo_sga {
            LineDiscipline::Kludge
        } else {
            LineDiscipline::Local
        }
    }

    // #### Output plumbing #################################################

    /// Takes everything queued for the transport since the last call.
    pub fn take_output(&mut self) -> BytesMut {
        self.out.split()
    }

    /// True when replies are waiting to be flushed.
    pub fn has_output(&self) -> bool {
        !self.out.is_empty()
    }

    /// Queues already-escaped application data, honouring the XOFF
    /// gate: data submitted while output is suspended is buffered
    /// until XON (or any byte, with `xon_any`).
    pub fn submit_data(&mut self, escaped: &[u8]) {
        if self.writing {
            self.out.put_slice(escaped);
        } else {
            debug!("buffered (XOFF): {} bytes", escaped.len());
            self.write_buffer.extend_from_slice(escaped);
        }
    }

    /// Queues protocol bytes verbatim, bypassing the XOFF gate.
    pub fn submit_oob(&mut self, data: &[u8]) {
        self.out.put_slice(data);
    }

    fn resume_writing(&mut self) {
        self.writing = true;
        if !self.write_buffer.is_empty() {
            debug!("XON: flushing {} buffered bytes", self.write_buffer.len());
            let buffered = std::mem::take(&mut self.write_buffer);
            self.out.put_slice(&buffered);
        }
    }

    // #### The byte interpreter ############################################

    ///
    /// Feeds a single byte into the state machine.
    ///
    /// Returns [`Processed::InBand`] iff the byte is application data
    /// that should be forwarded to the reader. Replies are queued to
    /// the output buffer before this method returns.
    ///
    pub fn feed_byte(&mut self, byte: u8) -> Processed {
        if byte == consts::IAC {
            self.iac_seen = !self.iac_seen;
            if !self.iac_seen {
                if self.cmd == Some(consts::SB) {
                    // escaped IAC IAC inside a sub-negotiation
                    return match self.sb_push(consts::IAC) {
                        Ok(()) => Processed::OutOfBand,
                        Err(err) => Processed::ParseError(err),
                    };
                }
                if self.cmd.is_none() {
                    // literal 0xFF data byte
                    return Processed::InBand(consts::IAC);
                }
            }
            return Processed::OutOfBand;
        }

        if self.iac_seen && self.cmd.is_none() {
            self.iac_seen = false;
            return match byte {
                consts::DO | consts::DONT | consts::WILL | consts::WONT | consts::SB => {
                    self.cmd = Some(byte);
                    Processed::OutOfBand
                }
                _ => self.dispatch_command(byte),
            };
        }

        if self.iac_seen && self.cmd == Some(consts::SB) {
            self.iac_seen = false;
            if byte == consts::SE {
                let buf = std::mem::take(&mut self.sb_buf);
                self.cmd = None;
                return match self.commit_subnegotiation(&buf) {
                    Ok(()) => Processed::OutOfBand,
                    Err(err) => {
                        warn!("{err}");
                        Processed::ParseError(err)
                    }
                };
            }
            // sub-negotiation interrupted by another command
            let option = TelnetOption::from_u8(self.sb_buf.first().copied().unwrap_or(0));
            let err = CodecError::SubnegotiationInterrupted {
                option,
                length: self.sb_buf.len().saturating_sub(1),
                command: consts::name_command(byte).unwrap_or("unknown"),
            };
            warn!("{err}");
            self.sb_buf.clear();
            self.cmd = None;
            if matches!(
                byte,
                consts::DO | consts::DONT | consts::WILL | consts::WONT
            ) {
                self.cmd = Some(byte);
            } else {
                let _ = self.dispatch_command(byte);
            }
            return Processed::ParseError(err);
        }

        if let Some(cmd) = self.cmd {
            if cmd == consts::SB {
                return match self.sb_push(byte) {
                    Ok(()) => Processed::OutOfBand,
                    Err(err) => Processed::ParseError(err),
                };
            }
            // third byte of DO/DONT/WILL/WONT
            self.cmd = None;
            self.iac_seen = false;
            let option = TelnetOption::from_u8(byte);
            debug!(
                "recv IAC {} {option}",
                consts::name_command(cmd).unwrap_or("?")
            );
            self.dispatch_negotiation(cmd, option);
            return Processed::OutOfBand;
        }

        // plain data path
        if self.table.pending(PendingVerb::Do, TelnetOption::TimingMark) {
            // IAC DO TM was sent; discard input until the mark comes
            // back around
            debug!("discarded by timing-mark: 0x{byte:02X}");
            return Processed::OutOfBand;
        }

        let discipline = self.mode();
        if discipline == LineDiscipline::Remote
            || (discipline == LineDiscipline::Kludge && self.opts.slc_simulated)
        {
            if let Some((func, _def)) = self.slctab.snoop(byte) {
                self.fire_slc(func, byte);
                return Processed::OutOfBand;
            }
        }

        if !self.writing && self.xon_any {
            // any key after XOFF enables XON
            self.resume_writing();
        }
        Processed::InBand(byte)
    }

    fn sb_push(&mut self, byte: u8) -> Result<(), CodecError> {
        if self.sb_buf.len() >= consts::MAX_SB {
            let option = TelnetOption::from_u8(self.sb_buf.first().copied().unwrap_or(0));
            let err = CodecError::SubnegotiationOverrun {
                option,
                limit: consts::MAX_SB,
            };
            error!("{err}");
            self.sb_buf.clear();
            self.cmd = None;
            self.iac_seen = false;
            return Err(err);
        }
        self.sb_buf.push(byte);
        Ok(())
    }

    fn fire_slc(&mut self, func: u8, byte: u8) {
        use crate::consts::slc::{SLC_XOFF, SLC_XON};
        match func {
            SLC_XON => {
                debug!("SLC XON: transmit on");
                self.resume_writing();
            }
            SLC_XOFF => {
                debug!("SLC XOFF: transmit off");
                self.writing = false;
            }
            _ => {}
        }
        self.handler.on_slc(func, byte);
    }

    /// Runs a two-byte IAC command through the handler table.
    fn dispatch_command(&mut self, byte: u8) -> Processed {
        match byte {
            consts::NOP => self.handler.on_nop(),
            consts::DM => self.handler.on_dm(),
            consts::BRK => self.handler.on_brk(),
            consts::IP => self.handler.on_ip(),
            consts::AO => self.handler.on_ao(),
            consts::AYT => self.handler.on_ayt(),
            consts::EC => self.handler.on_ec(),
            consts::EL => self.handler.on_el(),
            consts::GA => self.handler.on_ga(),
            consts::CMD_EOR => self.handler.on_eor(),
            consts::CMD_EOF => self.handler.on_eof(),
            consts::SUSP => self.handler.on_susp(),
            consts::ABORT => self.handler.on_abort(),
            _ => {
                let err = CodecError::UnknownCommand(byte);
                warn!("{err}");
                return Processed::ParseError(err);
            }
        }
        Processed::OutOfBand
    }

    // #### Negotiation engine ##############################################

    fn dispatch_negotiation(&mut self, cmd: u8, option: TelnetOption) {
        match cmd {
            consts::DO => {
                if self.handle_do(option) {
                    self.table.set_local(option, OptionState::Enabled);
                    self.table.clear_pending(PendingVerb::Will, option);
                }
            }
            consts::DONT => {
                self.handle_dont(option);
                self.table.clear_pending(PendingVerb::Will, option);
                self.table.set_local(option, OptionState::Disabled);
            }
            consts::WILL => {
                if !self.table.pending(PendingVerb::Do, option)
                    && option != TelnetOption::TimingMark
                {
                    debug!("WILL {option} unsolicited");
                }
                self.handle_will(option);
                self.table.clear_pending(PendingVerb::Do, option);
                self.table.clear_pending(PendingVerb::Dont, option);
            }
            consts::WONT => {
                self.handle_wont(option);
                self.table.clear_pending(PendingVerb::Do, option);
            }
            _ => unreachable!("negotiation verbs only"),
        }
    }

    fn send_verb(&mut self, verb: u8, option: TelnetOption) {
        debug!(
            "send IAC {} {option}",
            consts::name_command(verb).unwrap_or("?")
        );
        self.out
            .put_slice(&[consts::IAC, verb, option.to_u8()]);
    }

    fn refuse_will(&mut self, option: TelnetOption) {
        self.send_verb(consts::DONT, option);
        self.table.set_remote(option, OptionState::Rejected);
    }

    /// Processes byte 3 of `IAC DO opt`. Returns true when the option
    /// is enabled on our side.
    fn handle_do(&mut self, option: TelnetOption) -> bool {
        debug!("handle_do({option})");
        let server = self.role.is_server();
        let accept_anyway = self.opts.always_accept.contains(&option);
        match option {
            TelnetOption::Echo if !server => {
                // A server fingerprinting us as a broken 4.4BSD client
                // would expect WILL ECHO here.
                debug!("cannot recv DO ECHO on client end");
                if !self.table.local_negotiated(option) {
                    self.send_verb(consts::WONT, option);
                }
                false
            }
            TelnetOption::Linemode if server && !accept_anyway => {
                warn!("cannot recv DO LINEMODE on server end");
                false
            }
            TelnetOption::Logout if !server => {
                warn!("cannot recv DO LOGOUT on client end");
                false
            }
            TelnetOption::TerminalType
            | TelnetOption::WindowSize
            | TelnetOption::NewEnviron
            | TelnetOption::XDisplayLocation
            | TelnetOption::LineFlow
                if server && !accept_anyway =>
            {
                warn!("cannot recv DO {option} on server end");
                false
            }
            TelnetOption::TimingMark => {
                // simply by replying, the timing is accomplished; no
                // state is stored
                self.send_verb(consts::WILL, TelnetOption::TimingMark);
                self.handler.on_tm(consts::DO);
                false
            }
            TelnetOption::Logout => {
                // the peer asks the server to hang up
                self.handler.on_logout(consts::DO);
                false
            }
            TelnetOption::Echo
            | TelnetOption::Linemode
            | TelnetOption::TransmitBinary
            | TelnetOption::SuppressGoAhead
            | TelnetOption::LineFlow
            | TelnetOption::EndOfRecord
            | TelnetOption::TerminalType
            | TelnetOption::NewEnviron
            | TelnetOption::XDisplayLocation
            | TelnetOption::TerminalSpeed
            | TelnetOption::Charset => {
                if !self.table.local_enabled(option)
                    && !self.table.pending(PendingVerb::Will, option)
                {
                    self.send_verb(consts::WILL, option);
                }
                if option.needs_subnegotiation() {
                    // expect a follow-up subnegotiation
                    self.table
                        .set_pending(PendingVerb::Subnegotiation, option);
                }
                true
            }
            TelnetOption::WindowSize => {
                if !self.table.local_enabled(option)
                    && !self.table.pending(PendingVerb::Will, option)
                {
                    self.send_verb(consts::WILL, option);
                }
                // on first receipt of DO NAWS, or any repeat, report
                // our window size immediately
                self.send_naws();
                true
            }
            TelnetOption::Status => {
                if !self.table.local_enabled(option)
                    && !self.table.pending(PendingVerb::Will, option)
                {
                    self.send_verb(consts::WILL, option);
                }
                self.table
                    .set_local(TelnetOption::Status, OptionState::Enabled);
                self.send_status();
                true
            }
            TelnetOption::MSDP
            | TelnetOption::MSSP
            | TelnetOption::MSP
            | TelnetOption::MXP
            | TelnetOption::ZMP
            | TelnetOption::Aardwolf
            | TelnetOption::ATCP
            | TelnetOption::GMCP
            | TelnetOption::ComPort => {
                if !self.table.local_enabled(option)
                    && !self.table.pending(PendingVerb::Will, option)
                {
                    self.send_verb(consts::WILL, option);
                }
                true
            }
            _ => {
                if !self.table.local_negotiated(option) {
                    self.send_verb(consts::WONT, option);
                }
                warn!("Unhandled: DO {option}");
                self.table.set_local(option, OptionState::Rejected);
                self.table.clear_pending(PendingVerb::Will, option);
                false
            }
        }
    }

    /// Processes byte 3 of `IAC DONT opt`. DONT cannot be declined;
    /// replying WONT to DONT causes the well-known telnet loops, so
    /// no reply is ever sent.
    fn handle_dont(&mut self, option: TelnetOption) {
        debug!("handle_dont({option})");
        if option == TelnetOption::Logout {
            if self.role.is_server() {
                self.handler.on_logout(consts::DONT);
            } else {
                warn!("cannot recv DONT LOGOUT on client end");
            }
        }
    }

    /// Processes byte 3 of `IAC WILL opt`.
    fn handle_will(&mut self, option: TelnetOption) {
        debug!("handle_will({option})");
        let server = self.role.is_server();
        let accept_anyway = self.opts.always_accept.contains(&option);
        match option {
            TelnetOption::Echo if server => {
                warn!("cannot recv WILL ECHO on server end");
                self.refuse_will(option);
            }
            TelnetOption::WindowSize | TelnetOption::Linemode | TelnetOption::SendLocation
                if !server && !accept_anyway =>
            {
                warn!("cannot recv WILL {option} on client end");
                self.refuse_will(option);
            }
            TelnetOption::TransmitBinary
            | TelnetOption::SuppressGoAhead
            | TelnetOption::Echo
            | TelnetOption::WindowSize
            | TelnetOption::Linemode
            | TelnetOption::EndOfRecord
            | TelnetOption::SendLocation => {
                if !self.table.remote_enabled(option) {
                    if !self.table.pending(PendingVerb::Do, option) {
                        self.send_verb(consts::DO, option);
                    }
                    self.table.set_remote(option, OptionState::Enabled);
                }
                if matches!(
                    option,
                    TelnetOption::WindowSize | TelnetOption::Linemode | TelnetOption::SendLocation
                ) {
                    // expect some sort of follow-up subnegotiation
                    self.table
                        .set_pending(PendingVerb::Subnegotiation, option);
                    if option == TelnetOption::Linemode && server {
                        // the server sets the initial mode
                        self.send_linemode(Some(self.opts.default_linemode));
                    }
                }
            }
            TelnetOption::TimingMark => {
                if !self
                    .table
                    .pending(PendingVerb::Do, TelnetOption::TimingMark)
                {
                    warn!("cannot recv WILL TM, must first send DO TM");
                    return;
                }
                self.handler.on_tm(consts::WILL);
                self.table
                    .set_remote(TelnetOption::TimingMark, OptionState::Enabled);
            }
            TelnetOption::Logout => {
                if server {
                    // a client graceful-logout hint, not a disconnect
                    self.handler.on_logout(consts::WILL);
                } else {
                    warn!("cannot recv WILL LOGOUT on client end");
                }
            }
            TelnetOption::Status if !server && !accept_anyway => {
                warn!("cannot recv WILL STATUS on client end");
                self.refuse_will(option);
            }
            TelnetOption::Status => {
                self.table.set_remote(option, OptionState::Enabled);
                // if the peer says they support it, hold them to it
                self.request_status();
            }
            TelnetOption::LineFlow if !server && !accept_anyway => {
                warn!("cannot recv WILL LFLOW on client end");
                self.refuse_will(option);
            }
            TelnetOption::LineFlow => {
                self.table.set_remote(option, OptionState::Enabled);
                self.send_lineflow_mode();
            }
            TelnetOption::NewEnviron if server => {
                self.table.set_remote(option, OptionState::Enabled);
                self.request_environ(None);
            }
            TelnetOption::Charset => {
                // charset is bi-directional; whoever hears WILL may
                // request
                self.table.set_remote(option, OptionState::Enabled);
                self.request_charset(None);
            }
            TelnetOption::XDisplayLocation if server => {
                self.table.set_remote(option, OptionState::Enabled);
                self.request_xdisploc();
            }
            TelnetOption::TerminalType if server => {
                self.table.set_remote(option, OptionState::Enabled);
                self.request_ttype();
            }
            TelnetOption::TerminalSpeed if server => {
                self.table.set_remote(option, OptionState::Enabled);
                self.request_tspeed();
            }
            TelnetOption::NewEnviron
            | TelnetOption::XDisplayLocation
            | TelnetOption::TerminalType
            | TelnetOption::TerminalSpeed => {
                warn!("cannot recv WILL {option} on client end");
                self.refuse_will(option);
            }
            TelnetOption::MSDP
            | TelnetOption::MSSP
            | TelnetOption::MSP
            | TelnetOption::MXP
            | TelnetOption::ZMP
            | TelnetOption::Aardwolf
            | TelnetOption::ATCP
            | TelnetOption::GMCP
            | TelnetOption::ComPort => {
                if !self.table.remote_enabled(option) {
                    if !self.table.pending(PendingVerb::Do, option) {
                        self.send_verb(consts::DO, option);
                    }
                    self.table.set_remote(option, OptionState::Enabled);
                }
            }
            _ => {
                self.send_verb(consts::DONT, option);
                self.table.set_remote(option, OptionState::Rejected);
                warn!("Unhandled: WILL {option}");
                self.table.clear_pending(PendingVerb::Do, option);
            }
        }
    }

    /// Processes byte 3 of `IAC WONT opt`. A WONT cannot be declined
    /// and is never replied to.
    fn handle_wont(&mut self, option: TelnetOption) {
        debug!("handle_wont({option})");
        match option {
            TelnetOption::TimingMark
                if !self.table.pending(PendingVerb::Do, TelnetOption::TimingMark) =>
            {
                warn!("WONT TM received but DO TM was not sent");
            }
            TelnetOption::TimingMark => {
                debug!("WONT TIMING-MARK");
                self.table
                    .set_remote(option, OptionState::Disabled);
            }
            TelnetOption::Logout => {
                if !self.table.pending(PendingVerb::Do, TelnetOption::Logout) {
                    warn!("peer sent WONT LOGOUT unsolicited");
                }
                self.handler.on_logout(consts::WONT);
            }
            _ => {
                self.table.set_remote(option, OptionState::Disabled);
            }
        }
    }

    // #### Outgoing requests ###############################################

    /// Sends `IAC DO opt`, recording it pending. Duplicate requests
    /// and requests for already-enabled options are suppressed.
    pub fn request_do(&mut self, option: TelnetOption) -> bool {
        self.send_negotiation(consts::DO, option)
    }

    /// Sends `IAC DONT opt`.
    pub fn request_dont(&mut self, option: TelnetOption) -> bool {
        self.send_negotiation(consts::DONT, option)
    }

    /// Sends `IAC WILL opt`, recording it pending.
    pub fn request_will(&mut self, option: TelnetOption) -> bool {
        self.send_negotiation(consts::WILL, option)
    }

    /// Sends `IAC WONT opt`.
    pub fn request_wont(&mut self, option: TelnetOption) -> bool {
        self.send_negotiation(consts::WONT, option)
    }

    fn send_negotiation(&mut self, verb: u8, option: TelnetOption) -> bool {
        use TelnetOption::{Logout, TimingMark};
        if option == TelnetOption::Linemode {
            if verb == consts::DO && self.role.is_client() {
                error!("DO LINEMODE may only be sent by server");
                return false;
            }
            if verb == consts::WILL && self.role.is_server() {
                error!("WILL LINEMODE may only be sent by client");
                return false;
            }
        }
        let pending_verb = match verb {
            consts::DO => Some(PendingVerb::Do),
            consts::WILL => Some(PendingVerb::Will),
            consts::DONT => Some(PendingVerb::Dont),
            _ => None,
        };
        if verb == consts::DO && !matches!(option, TimingMark | Logout) {
            if self.table.remote_enabled(option) {
                debug!("skip DO {option}; remote_option = True");
                self.table.clear_pending(PendingVerb::Do, option);
                return false;
            }
        }
        if verb == consts::WILL && option != TimingMark && self.table.local_enabled(option) {
            debug!("skip WILL {option}; local_option = True");
            self.table.clear_pending(PendingVerb::Will, option);
            return false;
        }
        if matches!(verb, consts::DO | consts::WILL) {
            let pv = pending_verb.expect("DO/WILL have a pending verb");
            if self.table.pending(pv, option) {
                debug!(
                    "skip {} {option}; pending_option = True",
                    consts::name_command(verb).unwrap_or("?")
                );
                return false;
            }
            self.table.set_pending(pv, option);
        }
        if verb == consts::DONT && option != Logout {
            if self.table.remote_enabled(option) {
                debug!("DONT {option} against enabled remote option");
            }
            self.table.set_remote(option, OptionState::Disabled);
        }
        if verb == consts::WONT {
            self.table.set_local(option, OptionState::Disabled);
        }
        self.send_verb(verb, option);
        true
    }

    /// Frames and queues `IAC SB opt <payload> IAC SE`, doubling any
    /// IAC inside the payload.
    pub fn send_subnegotiation(&mut self, option: TelnetOption, payload: &[u8]) {
        self.out.put_slice(&[consts::IAC, consts::SB, option.to_u8()]);
        self.out.put_slice(&escape_iac(payload));
        self.out.put_slice(&[consts::IAC, consts::SE]);
    }

    /// Sends `IAC GA`, unless SGA has been negotiated.
    pub fn send_ga(&mut self) -> bool {
        if self.table.local_enabled(TelnetOption::SuppressGoAhead) {
            return false;
        }
        debug!("send IAC GA");
        self.out.put_slice(&[consts::IAC, consts::GA]);
        true
    }

    /// Sends `IAC EOR`, only after `DO EOR` has been received.
    pub fn send_eor(&mut self) -> bool {
        if !self.table.local_enabled(TelnetOption::EndOfRecord) {
            debug!("cannot send IAC EOR without receipt of DO EOR");
            return false;
        }
        debug!("send IAC EOR");
        self.out.put_slice(&[consts::IAC, consts::CMD_EOR]);
        true
    }

    /// Requests `SB STATUS SEND`, only after `WILL STATUS`.
    pub fn request_status(&mut self) -> bool {
        if !self.table.remote_enabled(TelnetOption::Status) {
            debug!("cannot send SB STATUS SEND without receipt of WILL STATUS");
            return false;
        }
        if self
            .table
            .pending(PendingVerb::Subnegotiation, TelnetOption::Status)
        {
            debug!("cannot send SB STATUS SEND, request pending");
            return false;
        }
        debug!("send IAC SB STATUS SEND IAC SE");
        self.send_subnegotiation(TelnetOption::Status, &status::encode_send());
        self.table
            .set_pending(PendingVerb::Subnegotiation, TelnetOption::Status);
        true
    }

    /// Requests `SB TSPEED SEND`, only after `WILL TSPEED`.
    pub fn request_tspeed(&mut self) -> bool {
        if !self.table.remote_enabled(TelnetOption::TerminalSpeed) {
            debug!("cannot send SB TSPEED SEND without receipt of WILL TSPEED");
            return false;
        }
        if self
            .table
            .pending(PendingVerb::Subnegotiation, TelnetOption::TerminalSpeed)
        {
            debug!("cannot send SB TSPEED SEND, request pending");
            return false;
        }
        debug!("send IAC SB TSPEED SEND IAC SE");
        self.send_subnegotiation(TelnetOption::TerminalSpeed, &tspeed::encode_send());
        self.table
            .set_pending(PendingVerb::Subnegotiation, TelnetOption::TerminalSpeed);
        true
    }

    /// Requests `SB CHARSET REQUEST <codepages>`, only after
    /// `WILL CHARSET`.
    pub fn request_charset(&mut self, codepages: Option<&[String]>) -> bool {
        if !self.table.remote_enabled(TelnetOption::Charset) {
            debug!("cannot send SB CHARSET REQUEST without receipt of WILL CHARSET");
            return false;
        }
        if self
            .table
            .pending(PendingVerb::Subnegotiation, TelnetOption::Charset)
        {
            debug!("cannot send SB CHARSET REQUEST, request pending");
            return false;
        }
        let offers: Vec<String> = codepages
            .map(|cp| cp.to_vec())
            .unwrap_or_else(|| self.opts.default_codepages.clone());
        debug!("send IAC SB CHARSET REQUEST {} IAC SE", offers.join(" "));
        self.send_subnegotiation(
            TelnetOption::Charset,
            &charset::encode_request(&offers, b' '),
        );
        self.table
            .set_pending(PendingVerb::Subnegotiation, TelnetOption::Charset);
        true
    }

    /// Requests `SB NEW-ENVIRON SEND`, server end only, only after
    /// `WILL NEW-ENVIRON`.
    pub fn request_environ(&mut self, keys: Option<&[String]>) -> bool {
        if self.role.is_client() {
            error!("SB NEW-ENVIRON SEND may only be sent by server end");
            return false;
        }
        if !self.table.remote_enabled(TelnetOption::NewEnviron) {
            debug!("cannot send SB NEW-ENVIRON SEND without receipt of WILL NEW-ENVIRON");
            return false;
        }
        if self
            .table
            .pending(PendingVerb::Subnegotiation, TelnetOption::NewEnviron)
        {
            debug!("cannot send SB NEW-ENVIRON SEND, request pending");
            return false;
        }
        let keys: Vec<String> = keys
            .map(|k| k.to_vec())
            .unwrap_or_else(|| self.opts.default_env_request.clone());
        self.send_subnegotiation(
            TelnetOption::NewEnviron,
            &environ::encode_send(&keys, true, true),
        );
        self.table
            .set_pending(PendingVerb::Subnegotiation, TelnetOption::NewEnviron);
        true
    }

    /// Requests `SB XDISPLOC SEND`, server end only.
    pub fn request_xdisploc(&mut self) -> bool {
        if self.role.is_client() {
            error!("SB XDISPLOC SEND may only be sent by server end");
            return false;
        }
        if !self.table.remote_enabled(TelnetOption::XDisplayLocation) {
            debug!("cannot send SB XDISPLOC SEND without receipt of WILL XDISPLOC");
            return false;
        }
        if self
            .table
            .pending(PendingVerb::Subnegotiation, TelnetOption::XDisplayLocation)
        {
            debug!("cannot send SB XDISPLOC SEND, request pending");
            return false;
        }
        debug!("send IAC SB XDISPLOC SEND IAC SE");
        self.send_subnegotiation(TelnetOption::XDisplayLocation, &xdisploc::encode_send());
        self.table
            .set_pending(PendingVerb::Subnegotiation, TelnetOption::XDisplayLocation);
        true
    }

    /// Requests `SB TTYPE SEND`, server end only.
    pub fn request_ttype(&mut self) -> bool {
        if self.role.is_client() {
            error!("SB TTYPE SEND may only be sent by server end");
            return false;
        }
        if !self.table.remote_enabled(TelnetOption::TerminalType) {
            debug!("cannot send SB TTYPE SEND without receipt of WILL TTYPE");
            return false;
        }
        if self
            .table
            .pending(PendingVerb::Subnegotiation, TelnetOption::TerminalType)
        {
            debug!("cannot send SB TTYPE SEND, request pending");
            return false;
        }
        debug!("send IAC SB TTYPE SEND IAC SE");
        self.send_subnegotiation(TelnetOption::TerminalType, &ttype::encode_send());
        self.table
            .set_pending(PendingVerb::Subnegotiation, TelnetOption::TerminalType);
        true
    }

    /// Requests the client forward the control characters of the
    /// current SLC table: `SB LINEMODE DO FORWARDMASK <mask>`.
    pub fn request_forwardmask(&mut self) -> bool {
        if self.role.is_client() {
            error!("DO FORWARDMASK may only be sent by server end");
            return false;
        }
        if !self.table.remote_enabled(TelnetOption::Linemode) {
            debug!("cannot send SB LINEMODE DO without receipt of WILL LINEMODE");
            return false;
        }
        let mask = Forwardmask::generate(
            &self.slctab,
            self.table.local_enabled(TelnetOption::TransmitBinary),
        );
        debug!("send IAC SB LINEMODE DO FORWARDMASK");
        self.send_subnegotiation(
            TelnetOption::Linemode,
            &linemode::encode_forwardmask(consts::DO, mask.as_bytes()),
        );
        true
    }

    /// Sends the LFLOW restart discipline, server end only, only
    /// after `WILL LFLOW`.
    pub fn send_lineflow_mode(&mut self) -> bool {
        if self.role.is_client() {
            error!("only server may send IAC SB LFLOW <MODE>");
            return false;
        }
        if !self.table.remote_enabled(TelnetOption::LineFlow) {
            error!("cannot send IAC SB LFLOW without receipt of WILL LFLOW");
            return false;
        }
        let mode = if self.xon_any {
            LflowMode::RestartAny
        } else {
            LflowMode::RestartXon
        };
        debug!("send IAC SB LFLOW {mode:?} IAC SE");
        self.send_subnegotiation(TelnetOption::LineFlow, &lflow::encode(mode));
        true
    }

    /// Stores and proposes a LINEMODE mode. With `None`, re-sends the
    /// stored mode.
    pub fn send_linemode(&mut self, mode: Option<Linemode>) -> bool {
        if !(self.table.local_enabled(TelnetOption::Linemode)
            || self.table.remote_enabled(TelnetOption::Linemode))
        {
            error!("cannot send LINEMODE-MODE without first (DO, WILL) LINEMODE received");
            return false;
        }
        if let Some(mode) = mode {
            debug!("set Linemode {mode}");
            self.linemode = mode;
        }
        let stored = self.linemode;
        debug!("send IAC SB LINEMODE MODE {stored} IAC SE");
        self.send_subnegotiation(TelnetOption::Linemode, &linemode::encode_mode(stored));
        true
    }

    /// Reports our window size via `SB NAWS`.
    pub fn send_naws(&mut self) {
        let size = self.handler.window_size();
        debug!("send IAC SB NAWS {size} IAC SE");
        self.send_subnegotiation(TelnetOption::WindowSize, &size.encode());
    }

    /// Sends a GMCP message, only after GMCP has been negotiated in
    /// the sending direction.
    pub fn send_gmcp(&mut self, message: &mud::GmcpMessage) -> bool {
        if !self.table.local_enabled(TelnetOption::GMCP)
            && !self.table.remote_enabled(TelnetOption::GMCP)
        {
            debug!("cannot send SB GMCP before GMCP negotiation");
            return false;
        }
        self.send_subnegotiation(TelnetOption::GMCP, &mud::gmcp_encode(message));
        true
    }

    /// Sends the `SB STATUS IS` report of our tables, only as the
    /// sender of `WILL STATUS`.
    pub fn send_status(&mut self) -> bool {
        if !(self.table.local_enabled(TelnetOption::Status)
            || self.table.pending(PendingVerb::Will, TelnetOption::Status))
        {
            error!("only sender of IAC WILL STATUS may send IAC SB STATUS IS");
            return false;
        }
        let report = status::build_report(&self.table);
        debug!("send IAC SB STATUS IS ({} pairs) IAC SE", report.len());
        self.send_subnegotiation(TelnetOption::Status, &status::encode_is(&report));
        self.table
            .clear_pending(PendingVerb::Will, TelnetOption::Status);
        true
    }

    // #### Sub-negotiation dispatch ########################################

    /// The text encoding in effect for sub-negotiation payloads.
    fn text_encoding(&self) -> &'static encoding_rs::Encoding {
        self.encoding_name
            .as_deref()
            .and_then(|name| encoding_rs::Encoding::for_label(name.as_bytes()))
            .unwrap_or(encoding_rs::UTF_8)
    }

    fn commit_subnegotiation(&mut self, buf: &[u8]) -> Result<(), CodecError> {
        let Some((&opt_byte, payload)) = buf.split_first() else {
            return Err(CodecError::Negotiation("SE: buffer empty".to_string()));
        };
        let option = TelnetOption::from_u8(opt_byte);
        debug!("sub-negotiation {option} SE completion ({} bytes)", payload.len());
        if !self
            .table
            .clear_pending(PendingVerb::Subnegotiation, option)
        {
            debug!("[SB + {option}] unsolicited");
        }
        match option {
            TelnetOption::Linemode => self.sb_linemode(payload),
            TelnetOption::LineFlow => self.sb_lflow(payload),
            TelnetOption::WindowSize => self.sb_naws(payload),
            TelnetOption::SendLocation => {
                self.handler.on_sndloc(sndloc::decode(payload));
                Ok(())
            }
            TelnetOption::NewEnviron => self.sb_environ(payload),
            TelnetOption::Charset => self.sb_charset(payload),
            TelnetOption::TerminalType => self.sb_ttype(payload),
            TelnetOption::TerminalSpeed => self.sb_tspeed(payload),
            TelnetOption::XDisplayLocation => self.sb_xdisploc(payload),
            TelnetOption::Status => self.sb_status(payload),
            TelnetOption::GMCP => {
                let message = mud::gmcp_decode(payload, self.text_encoding())?;
                self.handler.on_gmcp(message);
                Ok(())
            }
            TelnetOption::MSDP => {
                let variables = mud::msdp_decode(payload, self.text_encoding());
                self.handler.on_msdp(variables);
                Ok(())
            }
            TelnetOption::MSSP => {
                let variables = mud::mssp_decode(payload, self.text_encoding());
                self.handler.on_mssp(variables);
                Ok(())
            }
            TelnetOption::ATCP => {
                let (package, value) = mud::atcp_decode(payload, self.text_encoding());
                self.handler.on_atcp(package, value);
                Ok(())
            }
            TelnetOption::ZMP => {
                let parts = mud::zmp_decode(payload, self.text_encoding());
                self.handler.on_zmp(parts);
                Ok(())
            }
            TelnetOption::Aardwolf => {
                self.handler.on_aardwolf(mud::aardwolf_decode(payload));
                Ok(())
            }
            TelnetOption::ComPort => {
                let message = comport::decode(payload)?;
                self.handler.on_comport(message);
                Ok(())
            }
            TelnetOption::MSP | TelnetOption::MXP => {
                // negotiable, but neither assigns SB payload structure
                debug!("SB {option}: {} bytes ignored", payload.len());
                Ok(())
            }
            other => Err(CodecError::Negotiation(format!(
                "SB {other}: not supported"
            ))),
        }
    }

    fn sb_naws(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        if !self.table.remote_enabled(TelnetOption::WindowSize) {
            warn!("received IAC SB NAWS without receipt of IAC WILL NAWS");
        }
        let size = naws::WindowSize::decode(payload)?;
        debug!("recv IAC SB NAWS {size} IAC SE");
        self.handler.on_naws(size);
        Ok(())
    }

    fn sb_lflow(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        if !self.table.local_enabled(TelnetOption::LineFlow) {
            warn!("received IAC SB LFLOW without IAC DO LFLOW");
        }
        let mode = lflow::decode(payload)?;
        match mode {
            LflowMode::Off => self.lflow = false,
            LflowMode::On => self.lflow = true,
            LflowMode::RestartAny => self.xon_any = true,
            LflowMode::RestartXon => self.xon_any = false,
        }
        debug!("LFLOW (toggle-flow-control) {mode:?}");
        self.handler.on_lflow(mode);
        Ok(())
    }

    fn sb_charset(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        match charset::decode(payload)? {
            CharsetCmd::Request(offers) => {
                match self.handler.charset_offer(&offers) {
                    Some(selected) => {
                        debug!("send IAC SB CHARSET ACCEPTED {selected} IAC SE");
                        self.send_subnegotiation(
                            TelnetOption::Charset,
                            &charset::encode_accepted(&selected),
                        );
                        self.encoding_name = Some(selected.clone());
                        self.handler.on_charset(selected);
                    }
                    None => {
                        debug!("send IAC SB CHARSET REJECTED IAC SE");
                        self.send_subnegotiation(
                            TelnetOption::Charset,
                            &charset::encode_rejected(),
                        );
                    }
                }
                Ok(())
            }
            CharsetCmd::Accepted(name) => {
                debug!("recv IAC SB CHARSET ACCEPTED {name} IAC SE");
                self.encoding_name = Some(name.clone());
                self.handler.on_charset(name);
                Ok(())
            }
            CharsetCmd::Rejected => {
                warn!("recv IAC SB CHARSET REJECTED IAC SE");
                self.handler.on_charset_rejected();
                Ok(())
            }
            CharsetCmd::TtableUnsupported(cmd) => Err(CodecError::subnegotiation(
                TelnetOption::Charset,
                crate::error::SubnegotiationErrorKind::Unsupported { command: cmd },
            )),
        }
    }

    fn sb_environ(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        match environ::decode(payload, self.text_encoding())? {
            EnvironCmd::Is(env) | EnvironCmd::Info(env) => {
                if self.role.is_client() {
                    warn!("cannot recv NEW-ENVIRON IS/INFO on client end");
                    return Ok(());
                }
                if !env.is_empty() {
                    self.handler.on_environ(env);
                }
                Ok(())
            }
            EnvironCmd::Send(keys) => {
                if self.role.is_server() {
                    warn!("cannot recv NEW-ENVIRON SEND on server end");
                    return Ok(());
                }
                // the bare VAR/USERVAR sentinel requests the whole
                // environment; it is never obliged
                let explicit: Vec<String> =
                    keys.into_iter().filter(|key| !key.is_empty()).collect();
                let values = self.handler.environ(&explicit);
                self.send_subnegotiation(TelnetOption::NewEnviron, &environ::encode_is(&values));
                Ok(())
            }
        }
    }

    fn sb_ttype(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        match ttype::decode(payload)? {
            TtypeCmd::Is(value) => {
                if self.role.is_client() {
                    warn!("cannot recv TTYPE IS on client end");
                    return Ok(());
                }
                debug!("recv IAC SB TTYPE IS {value:?}");
                self.handler.on_ttype(value.clone());
                let finished = value.is_empty()
                    || ttype::is_mtts(&value)
                    || self.ttype_log.contains(&value)
                    || self.ttype_log.len() >= TTYPE_LOOPMAX;
                if !self.ttype_log.contains(&value) && !value.is_empty() {
                    self.ttype_log.push(value);
                }
                if finished {
                    self.handler.on_ttype_done(self.ttype_log.clone());
                } else {
                    self.request_ttype();
                }
                Ok(())
            }
            TtypeCmd::Send => {
                if self.role.is_server() {
                    warn!("cannot recv TTYPE SEND on server end");
                    return Ok(());
                }
                let value = self.handler.terminal_type();
                debug!("send IAC SB TTYPE IS {value:?} IAC SE");
                self.send_subnegotiation(TelnetOption::TerminalType, &ttype::encode_is(&value));
                self.table
                    .clear_pending(PendingVerb::Will, TelnetOption::TerminalType);
                Ok(())
            }
        }
    }

    fn sb_tspeed(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        match tspeed::decode(payload)? {
            TspeedCmd::Is { rx, tx } => {
                if self.role.is_client() {
                    warn!("cannot recv TSPEED IS on client end");
                    return Ok(());
                }
                debug!("sb_tspeed: {rx}, {tx}");
                self.handler.on_tspeed(rx, tx);
                Ok(())
            }
            TspeedCmd::Send => {
                if self.role.is_server() {
                    warn!("cannot recv TSPEED SEND on server end");
                    return Ok(());
                }
                let (rx, tx) = self.handler.terminal_speed();
                debug!("send IAC SB TSPEED IS {rx},{tx} IAC SE");
                self.send_subnegotiation(TelnetOption::TerminalSpeed, &tspeed::encode_is(rx, tx));
                self.table
                    .clear_pending(PendingVerb::Will, TelnetOption::TerminalSpeed);
                Ok(())
            }
        }
    }

    fn sb_xdisploc(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        match xdisploc::decode(payload)? {
            XdisplocCmd::Is(display) => {
                if self.role.is_client() {
                    warn!("cannot recv XDISPLOC IS on client end");
                    return Ok(());
                }
                let xdisploc_value = &display;
                debug!("recv IAC SB XDISPLOC IS {:?} IAC SE", xdisploc_value);
                self.handler.on_xdisploc(display);
                Ok(())
            }
            XdisplocCmd::Send => {
                if self.role.is_server() {
                    warn!("cannot recv XDISPLOC SEND on server end");
                    return Ok(());
                }
                let display = self.handler.xdisploc();
                let xdisploc_value = &display;
                debug!("send IAC SB XDISPLOC IS {:?} IAC SE", xdisploc_value);
                self.send_subnegotiation(
                    TelnetOption::XDisplayLocation,
                    &xdisploc::encode_is(&display),
                );
                self.table
                    .clear_pending(PendingVerb::Will, TelnetOption::XDisplayLocation);
                Ok(())
            }
        }
    }

    fn sb_status(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        match status::decode(payload)? {
            StatusCmd::Send => {
                self.send_status();
                Ok(())
            }
            StatusCmd::Is(entries) => {
                status::verify_report(&entries, &self.table);
                Ok(())
            }
        }
    }

    fn sb_linemode(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        match linemode::decode(payload)? {
            LinemodeCmd::Mode(mode) => {
                self.linemode_mode(mode);
                Ok(())
            }
            LinemodeCmd::Slc(triplets) => {
                let mut reply = SlcReply::new();
                let defaults = self.default_slctab.clone();
                for (func, def) in triplets {
                    self.slctab.process(func, def, &defaults, &mut reply);
                }
                for &(func, def) in reply.triplets() {
                    self.handler.on_slc_changed(func, def);
                }
                if !reply.is_empty() {
                    let payload = linemode::encode_slc(reply.triplets());
                    self.send_subnegotiation(TelnetOption::Linemode, &payload);
                }
                if self.role.is_server() {
                    self.request_forwardmask();
                }
                Ok(())
            }
            LinemodeCmd::Forwardmask { verb, mask } => self.sb_forwardmask(verb, mask),
        }
    }

    fn linemode_mode(&mut self, suggest: Linemode) {
        debug!("recv IAC SB LINEMODE MODE {suggest} IAC SE");
        if !suggest.ack() {
            // acknowledge and adopt any suggestion, requiring a reply
            let adopted = suggest.with_ack();
            self.linemode = adopted;
            self.send_subnegotiation(TelnetOption::Linemode, &linemode::encode_mode(adopted));
            self.handler.on_linemode(adopted);
            return;
        }
        // a response is never generated to a MODE carrying ACK
        if self.role.is_client() {
            if !self.linemode.agrees_with(suggest) {
                // the server acknowledged a different value; local
                // mode remains authoritative
                warn!(
                    "server mode {suggest} differs from local mode {}, though ACK bit is set",
                    self.linemode
                );
            } else {
                debug!("Linemode matches, acknowledged by server");
            }
            return;
        }
        if !self.linemode.agrees_with(suggest) {
            debug!("client chose {suggest}, we suggested {}", self.linemode);
            self.handler.on_linemode(suggest);
        } else {
            debug!("Linemode agreed by client: {suggest}");
        }
        self.linemode = suggest;
    }

    fn sb_forwardmask(&mut self, verb: u8, mask: Vec<u8>) -> Result<(), CodecError> {
        let verb_name = consts::name_command(verb).unwrap_or("?");
        debug!("recv IAC SB LINEMODE {verb_name} FORWARDMASK");
        match verb {
            consts::WILL | consts::WONT => {
                if self.role.is_client() {
                    warn!("cannot recv {verb_name} FORWARDMASK on client end");
                    return Ok(());
                }
                self.forwardmask_remote = verb == consts::WILL;
                Ok(())
            }
            consts::DO | consts::DONT => {
                if self.role.is_server() {
                    warn!("cannot recv {verb_name} FORWARDMASK on server end");
                    return Ok(());
                }
                self.forwardmask_local = verb == consts::DO;
                if verb == consts::DO {
                    let expected = if self.table.local_enabled(TelnetOption::TransmitBinary) {
                        32
                    } else {
                        16
                    };
                    if mask.len() != expected {
                        return Err(CodecError::subnegotiation(
                            TelnetOption::Linemode,
                            crate::error::SubnegotiationErrorKind::InsufficientData {
                                required: expected,
                                available: mask.len(),
                            },
                        ));
                    }
                    self.peer_forwardmask = Some(Forwardmask::from_bytes(mask));
                }
                Ok(())
            }
            _ => Err(CodecError::subnegotiation(
                TelnetOption::Linemode,
                crate::error::SubnegotiationErrorKind::InvalidCommand { command: verb },
            )),
        }
    }
}

impl std::fmt::Debug for TelnetInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetInterpreter")
            .field("role", &self.role)
            .field("mode", &self.mode())
            .field("linemode", &self.linemode)
            .field("pending", &self.table.describe_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{option, subcmd};
    use crate::sub::mud::GmcpMessage;
    use crate::sub::naws::WindowSize;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Events>>);

    #[derive(Default)]
    struct Events {
        naws: Vec<WindowSize>,
        gmcp: Vec<GmcpMessage>,
        tm: Vec<u8>,
        logout: Vec<u8>,
        environ: Vec<Vec<(String, String)>>,
        ttype_done: Vec<Vec<String>>,
        slc: Vec<(u8, u8)>,
    }

    impl TelnetHandler for Recorder {
        fn on_naws(&mut self, size: WindowSize) {
            self.0.lock().unwrap().naws.push(size);
        }
        fn on_gmcp(&mut self, message: GmcpMessage) {
            self.0.lock().unwrap().gmcp.push(message);
        }
        fn on_tm(&mut self, verb: u8) {
            self.0.lock().unwrap().tm.push(verb);
        }
        fn on_logout(&mut self, verb: u8) {
            self.0.lock().unwrap().logout.push(verb);
        }
        fn on_environ(&mut self, env: Vec<(String, String)>) {
            self.0.lock().unwrap().environ.push(env);
        }
        fn on_ttype_done(&mut self, types: Vec<String>) {
            self.0.lock().unwrap().ttype_done.push(types);
        }
        fn on_slc(&mut self, func: u8, byte: u8) {
            self.0.lock().unwrap().slc.push((func, byte));
        }
        fn environ(&mut self, keys: &[String]) -> Vec<(String, String)> {
            keys.iter()
                .filter(|key| *key == "LANG")
                .map(|key| (key.clone(), "uk_UA.KOI8-U".to_string()))
                .collect()
        }
        fn terminal_type(&mut self) -> String {
            "xterm".to_string()
        }
    }

    fn feed_all(interp: &mut TelnetInterpreter, bytes: &[u8]) -> Vec<u8> {
        let mut inband = Vec::new();
        for &byte in bytes {
            if let Processed::InBand(byte) = interp.feed_byte(byte) {
                inband.push(byte);
            }
        }
        inband
    }

    fn server() -> (TelnetInterpreter, Recorder) {
        let recorder = Recorder::default();
        let interp = TelnetInterpreter::server(Box::new(recorder.clone()));
        (interp, recorder)
    }

    fn client() -> (TelnetInterpreter, Recorder) {
        let recorder = Recorder::default();
        let interp = TelnetInterpreter::client(Box::new(recorder.clone()));
        (interp, recorder)
    }

    #[test]
    fn plain_data_is_inband() {
        let (mut interp, _) = server();
        assert_eq!(feed_all(&mut interp, b"hello"), b"hello");
        assert!(!interp.has_output());
    }

    #[test]
    fn doubled_iac_is_literal_data() {
        let (mut interp, _) = server();
        assert_eq!(
            feed_all(&mut interp, &[b'a', consts::IAC, consts::IAC, b'b']),
            vec![b'a', consts::IAC, b'b']
        );
    }

    #[test]
    fn unknown_command_is_a_recoverable_parse_error() {
        let (mut interp, _) = server();
        assert_eq!(interp.feed_byte(consts::IAC), Processed::OutOfBand);
        assert_eq!(
            interp.feed_byte(0x01),
            Processed::ParseError(CodecError::UnknownCommand(0x01))
        );
        // the stream continues in-band
        assert_eq!(feed_all(&mut interp, b"ok"), b"ok");
    }

    #[test]
    fn initial_ttype_negotiation_refused() {
        // S1: server sends DO TTYPE, client replies WONT TTYPE.
        let (mut interp, _) = server();
        assert!(interp.request_do(TelnetOption::TerminalType));
        assert_eq!(
            &interp.take_output()[..],
            &[consts::IAC, consts::DO, option::TTYPE]
        );
        assert!(!interp.negotiation_complete());
        feed_all(&mut interp, &[consts::IAC, consts::WONT, option::TTYPE]);
        assert!(interp.negotiation_complete());
        assert!(!interp.remote_enabled(TelnetOption::TerminalType));
        assert!(!interp.has_output(), "WONT is never answered");
    }

    #[test]
    fn duplicate_do_requests_are_suppressed() {
        let (mut interp, _) = server();
        assert!(interp.request_do(TelnetOption::SuppressGoAhead));
        assert!(!interp.request_do(TelnetOption::SuppressGoAhead));
        assert_eq!(interp.take_output().len(), 3);
    }

    #[test]
    fn naws_exchange() {
        // S2: client sends WILL NAWS then its window size.
        let (mut interp, recorder) = server();
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::NAWS]);
        assert_eq!(
            &interp.take_output()[..],
            &[consts::IAC, consts::DO, option::NAWS]
        );
        assert!(interp.remote_enabled(TelnetOption::WindowSize));
        feed_all(
            &mut interp,
            &[
                consts::IAC,
                consts::SB,
                option::NAWS,
                0x00,
                0x50,
                0x00,
                0x18,
                consts::IAC,
                consts::SE,
            ],
        );
        assert_eq!(
            recorder.0.lock().unwrap().naws,
            vec![WindowSize::new(24, 80)]
        );
        assert!(interp.negotiation_complete());
    }

    #[test]
    fn naws_with_escaped_iac_in_field() {
        let (mut interp, recorder) = server();
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::NAWS]);
        interp.take_output();
        // rows = 0x00FF requires a doubled IAC on the wire
        feed_all(
            &mut interp,
            &[
                consts::IAC,
                consts::SB,
                option::NAWS,
                0x00,
                0x50,
                0x00,
                consts::IAC,
                consts::IAC,
                consts::IAC,
                consts::SE,
            ],
        );
        assert_eq!(
            recorder.0.lock().unwrap().naws,
            vec![WindowSize::new(255, 80)]
        );
    }

    #[test]
    fn interrupted_subnegotiation_recovers() {
        // S4: SB CHARSET interrupted by IAC WONT CHARSET.
        let (mut interp, _) = server();
        let mut saw_parse_error = false;
        for &byte in &[
            consts::IAC,
            consts::SB,
            option::CHARSET,
            0x01,
            b'X',
            b'Y',
            consts::IAC,
            consts::WONT,
            option::CHARSET,
        ] {
            if let Processed::ParseError(CodecError::SubnegotiationInterrupted {
                option: opt,
                length,
                command,
            }) = interp.feed_byte(byte)
            {
                assert_eq!(opt, TelnetOption::Charset);
                assert_eq!(length, 3);
                assert_eq!(command, "WONT");
                saw_parse_error = true;
            }
        }
        assert!(saw_parse_error);
        // the interrupting WONT CHARSET was processed normally
        assert!(!interp.remote_enabled(TelnetOption::Charset));
        assert_eq!(feed_all(&mut interp, b"ok"), b"ok");
    }

    #[test]
    fn sb_overrun_is_dropped() {
        let (mut interp, _) = server();
        feed_all(&mut interp, &[consts::IAC, consts::SB, option::GMCP]);
        let mut overran = false;
        for _ in 0..(consts::MAX_SB + 8) {
            if matches!(
                interp.feed_byte(b'x'),
                Processed::ParseError(CodecError::SubnegotiationOverrun { .. })
            ) {
                overran = true;
                break;
            }
        }
        assert!(overran);
    }

    #[test]
    fn do_tm_is_always_answered() {
        let (mut interp, recorder) = server();
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::TM]);
        assert_eq!(
            &interp.take_output()[..],
            &[consts::IAC, consts::WILL, option::TM]
        );
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::TM]);
        assert_eq!(
            &interp.take_output()[..],
            &[consts::IAC, consts::WILL, option::TM],
            "DO TM is answered regardless of state"
        );
        assert_eq!(recorder.0.lock().unwrap().tm, vec![consts::DO, consts::DO]);
        assert!(!interp.local_enabled(TelnetOption::TimingMark));
    }

    #[test]
    fn will_tm_requires_prior_do_tm() {
        let (mut interp, recorder) = server();
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::TM]);
        assert!(recorder.0.lock().unwrap().tm.is_empty());
        assert!(!interp.remote_enabled(TelnetOption::TimingMark));

        assert!(interp.request_do(TelnetOption::TimingMark));
        interp.take_output();
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::TM]);
        assert_eq!(recorder.0.lock().unwrap().tm, vec![consts::WILL]);
        assert!(interp.remote_enabled(TelnetOption::TimingMark));
    }

    #[test]
    fn timing_mark_discards_inband_data() {
        let (mut interp, _) = server();
        assert!(interp.request_do(TelnetOption::TimingMark));
        interp.take_output();
        assert_eq!(feed_all(&mut interp, b"discarded"), b"");
        feed_all(&mut interp, &[consts::IAC, consts::WONT, option::TM]);
        assert_eq!(feed_all(&mut interp, b"kept"), b"kept");
    }

    #[test]
    fn unknown_will_is_refused() {
        let (mut interp, _) = server();
        feed_all(&mut interp, &[consts::IAC, consts::WILL, 76]);
        assert_eq!(&interp.take_output()[..], &[consts::IAC, consts::DONT, 76]);
        assert_eq!(
            interp.table().remote(TelnetOption::Unknown(76)),
            OptionState::Rejected
        );
    }

    #[test]
    fn unknown_do_is_refused() {
        let (mut interp, _) = client();
        feed_all(&mut interp, &[consts::IAC, consts::DO, 76]);
        assert_eq!(&interp.take_output()[..], &[consts::IAC, consts::WONT, 76]);
        assert_eq!(
            interp.table().local(TelnetOption::Unknown(76)),
            OptionState::Rejected
        );
    }

    #[test]
    fn dont_is_never_answered() {
        let (mut interp, _) = server();
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::SGA]);
        interp.take_output();
        assert!(interp.local_enabled(TelnetOption::SuppressGoAhead));
        feed_all(&mut interp, &[consts::IAC, consts::DONT, option::SGA]);
        assert!(!interp.has_output(), "replying WONT to DONT causes loops");
        assert!(!interp.local_enabled(TelnetOption::SuppressGoAhead));
    }

    #[test]
    fn server_refuses_will_echo() {
        let (mut interp, _) = server();
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::ECHO]);
        assert_eq!(
            &interp.take_output()[..],
            &[consts::IAC, consts::DONT, option::ECHO]
        );
        assert_eq!(
            interp.table().remote(TelnetOption::Echo),
            OptionState::Rejected
        );
    }

    #[test]
    fn client_refuses_will_naws() {
        let (mut interp, _) = client();
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::NAWS]);
        assert_eq!(
            &interp.take_output()[..],
            &[consts::IAC, consts::DONT, option::NAWS]
        );
    }

    #[test]
    fn always_accept_overrides_role_exclusion() {
        let recorder = Recorder::default();
        let mut opts = InterpreterOptions::default();
        opts.always_accept.push(TelnetOption::WindowSize);
        let mut interp = TelnetInterpreter::with_options(
            TelnetRole::Client,
            Box::new(recorder.clone()),
            opts,
        );
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::NAWS]);
        assert_eq!(
            &interp.take_output()[..],
            &[consts::IAC, consts::DO, option::NAWS]
        );
        assert!(interp.remote_enabled(TelnetOption::WindowSize));
    }

    #[test]
    fn do_logout_fires_callback() {
        let (mut interp, recorder) = server();
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::LOGOUT]);
        assert_eq!(recorder.0.lock().unwrap().logout, vec![consts::DO]);
        assert!(!interp.local_enabled(TelnetOption::Logout));
    }

    #[test]
    fn client_answers_ttype_send() {
        let (mut interp, _) = client();
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::TTYPE]);
        interp.take_output();
        feed_all(
            &mut interp,
            &[
                consts::IAC,
                consts::SB,
                option::TTYPE,
                subcmd::SEND,
                consts::IAC,
                consts::SE,
            ],
        );
        let out = interp.take_output();
        let mut expected = vec![consts::IAC, consts::SB, option::TTYPE, subcmd::IS];
        expected.extend_from_slice(b"xterm");
        expected.extend_from_slice(&[consts::IAC, consts::SE]);
        assert_eq!(&out[..], &expected[..]);
    }

    #[test]
    fn server_ttype_cycle_ends_on_repeat() {
        let (mut interp, recorder) = server();
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::TTYPE]);
        interp.take_output();

        let is_payload = |value: &[u8]| {
            let mut bytes = vec![consts::IAC, consts::SB, option::TTYPE, subcmd::IS];
            bytes.extend_from_slice(value);
            bytes.extend_from_slice(&[consts::IAC, consts::SE]);
            bytes
        };
        feed_all(&mut interp, &is_payload(b"xterm"));
        assert!(
            interp.take_output().ends_with(&[consts::IAC, consts::SE]),
            "a new value provokes another SEND"
        );
        feed_all(&mut interp, &is_payload(b"xterm"));
        assert!(!interp.has_output(), "a repeated value ends the cycle");
        assert_eq!(
            recorder.0.lock().unwrap().ttype_done,
            vec![vec!["xterm".to_string()]]
        );
    }

    #[test]
    fn client_answers_environ_send_but_never_all() {
        let (mut interp, _) = client();
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::NEW_ENVIRON]);
        interp.take_output();
        // SEND VAR "LANG" VAR USERVAR: explicit LANG plus "send all"
        let mut wire = vec![
            consts::IAC,
            consts::SB,
            option::NEW_ENVIRON,
            subcmd::SEND,
            consts::environ::VAR,
        ];
        wire.extend_from_slice(b"LANG");
        wire.push(consts::environ::VAR);
        wire.push(consts::environ::USERVAR);
        wire.extend_from_slice(&[consts::IAC, consts::SE]);
        feed_all(&mut interp, &wire);
        let out = interp.take_output();
        let mut expected = vec![
            consts::IAC,
            consts::SB,
            option::NEW_ENVIRON,
            subcmd::IS,
            consts::environ::VAR,
        ];
        expected.extend_from_slice(b"LANG");
        expected.push(consts::environ::VALUE);
        expected.extend_from_slice(b"uk_UA.KOI8-U");
        expected.extend_from_slice(&[consts::IAC, consts::SE]);
        assert_eq!(&out[..], &expected[..], "only the explicit key is disclosed");
    }

    #[test]
    fn server_receives_environ_is() {
        // S3: client reports LANG via NEW-ENVIRON IS.
        let (mut interp, recorder) = server();
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::NEW_ENVIRON]);
        interp.take_output();
        let mut wire = vec![
            consts::IAC,
            consts::SB,
            option::NEW_ENVIRON,
            subcmd::IS,
            consts::environ::VAR,
        ];
        wire.extend_from_slice(b"LANG");
        wire.push(consts::environ::VALUE);
        wire.extend_from_slice(b"uk_UA.KOI8-U");
        wire.extend_from_slice(&[consts::IAC, consts::SE]);
        feed_all(&mut interp, &wire);
        assert_eq!(
            recorder.0.lock().unwrap().environ,
            vec![vec![("LANG".to_string(), "uk_UA.KOI8-U".to_string())]]
        );
        assert!(interp.negotiation_complete());
    }

    #[test]
    fn gmcp_message_reaches_handler() {
        // S5: GMCP Char.Vitals round-trip.
        let (mut interp, recorder) = client();
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::GMCP]);
        interp.take_output();
        let mut wire = vec![consts::IAC, consts::SB, option::GMCP];
        wire.extend_from_slice(br#"Char.Vitals {"hp": 100}"#);
        wire.extend_from_slice(&[consts::IAC, consts::SE]);
        feed_all(&mut interp, &wire);
        let events = recorder.0.lock().unwrap();
        assert_eq!(events.gmcp.len(), 1);
        assert_eq!(events.gmcp[0].package, "Char.Vitals");
        assert_eq!(
            events.gmcp[0].data,
            Some(serde_json::json!({"hp": 100}))
        );
    }

    #[test]
    fn status_send_is_answered_with_report() {
        // S8: the report lists local and remote states, omitting
        // STATUS itself.
        let (mut interp, _) = server();
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::SGA]);
        feed_all(&mut interp, &[consts::IAC, consts::WILL, option::NAWS]);
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::STATUS]);
        interp.take_output();
        feed_all(
            &mut interp,
            &[
                consts::IAC,
                consts::SB,
                option::STATUS,
                subcmd::SEND,
                consts::IAC,
                consts::SE,
            ],
        );
        let out = interp.take_output();
        let body = &out[4..out.len() - 2];
        assert_eq!(
            &out[..4],
            &[consts::IAC, consts::SB, option::STATUS, subcmd::IS]
        );
        let pairs: Vec<(u8, u8)> = body.chunks(2).map(|c| (c[0], c[1])).collect();
        assert!(pairs.contains(&(consts::WILL, option::SGA)));
        assert!(pairs.contains(&(consts::DO, option::NAWS)));
        assert!(!pairs.iter().any(|&(_, opt)| opt == option::STATUS));
    }

    #[test]
    fn linemode_mode_ack_debounce() {
        // S6 from the client's perspective.
        let (mut interp, _) = client();
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::LINEMODE]);
        interp.take_output();
        // proposal without ACK is answered exactly once
        feed_all(
            &mut interp,
            &[
                consts::IAC,
                consts::SB,
                option::LINEMODE,
                consts::linemode::MODE,
                0x03,
                consts::IAC,
                consts::SE,
            ],
        );
        assert_eq!(
            &interp.take_output()[..],
            &[
                consts::IAC,
                consts::SB,
                option::LINEMODE,
                consts::linemode::MODE,
                0x07,
                consts::IAC,
                consts::SE,
            ]
        );
        assert_eq!(interp.linemode().mask(), 0x07);
        // the identical acknowledged mode provokes nothing
        feed_all(
            &mut interp,
            &[
                consts::IAC,
                consts::SB,
                option::LINEMODE,
                consts::linemode::MODE,
                0x07,
                consts::IAC,
                consts::SE,
            ],
        );
        assert!(!interp.has_output());
    }

    #[test]
    fn kludge_mode_snoops_slc_functions() {
        let (mut interp, recorder) = server();
        // server WILL ECHO + WILL SGA -> kludge
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::ECHO]);
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::SGA]);
        interp.take_output();
        assert_eq!(interp.mode(), LineDiscipline::Kludge);
        // ^C matches SLC_IP and is consumed
        assert_eq!(feed_all(&mut interp, &[0x03, b'a']), vec![b'a']);
        assert_eq!(
            recorder.0.lock().unwrap().slc,
            vec![(consts::slc::SLC_IP, 0x03)]
        );
    }

    #[test]
    fn xoff_buffers_writes_until_xon() {
        let (mut interp, _) = server();
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::ECHO]);
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::SGA]);
        interp.take_output();
        feed_all(&mut interp, &[0x13]); // ^S
        assert!(!interp.writing());
        interp.submit_data(b"held");
        assert!(!interp.has_output());
        feed_all(&mut interp, &[0x11]); // ^Q
        assert!(interp.writing());
        assert_eq!(&interp.take_output()[..], b"held");
    }

    #[test]
    fn escape_round_trip() {
        let data = [0x01, consts::IAC, b'x', consts::IAC, consts::IAC];
        let escaped = escape_iac(&data);
        assert_eq!(
            escaped,
            vec![
                0x01,
                consts::IAC,
                consts::IAC,
                b'x',
                consts::IAC,
                consts::IAC,
                consts::IAC,
                consts::IAC
            ]
        );
        assert_eq!(unescape_iac(&escaped), data.to_vec());
    }

    #[test]
    fn send_ga_honours_sga() {
        let (mut interp, _) = server();
        assert!(interp.send_ga());
        interp.take_output();
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::SGA]);
        interp.take_output();
        assert!(!interp.send_ga());
    }

    #[test]
    fn send_eor_requires_do_eor() {
        let (mut interp, _) = server();
        assert!(!interp.send_eor());
        feed_all(&mut interp, &[consts::IAC, consts::DO, option::EOR]);
        interp.take_output();
        assert!(interp.send_eor());
        assert_eq!(&interp.take_output()[..], &[consts::IAC, consts::CMD_EOR]);
    }
}

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

//! Telnet wire constants.
//!
//! Every byte value of the Telnet command set, the negotiable option
//! set, and the per-option sub-negotiation vocabularies, as assigned
//! by the RFCs and the MUD community registries. The interpreter and
//! the sub-negotiation codecs only ever compare against these names;
//! raw numeric literals do not appear outside this module.

/// End of sub-negotiation parameters.
pub const SE: u8 = 240;
/// No operation.
pub const NOP: u8 = 241;
/// Data Mark, the data stream portion of a SYNCH.
pub const DM: u8 = 242;
/// NVT character BRK (break).
pub const BRK: u8 = 243;
/// Interrupt Process.
pub const IP: u8 = 244;
/// Abort Output.
pub const AO: u8 = 245;
/// Are You There.
pub const AYT: u8 = 246;
/// Erase Character.
pub const EC: u8 = 247;
/// Erase Line.
pub const EL: u8 = 248;
/// Go Ahead.
pub const GA: u8 = 249;
/// Begin sub-negotiation of the indicated option.
pub const SB: u8 = 250;
/// Indicates the desire to begin performing the indicated option.
pub const WILL: u8 = 251;
/// Indicates the refusal to perform the indicated option.
pub const WONT: u8 = 252;
/// Indicates the request that the other party perform the option.
pub const DO: u8 = 253;
/// Demand that the other party stop performing the option.
pub const DONT: u8 = 254;
/// Interpret As Command escape byte.
pub const IAC: u8 = 255;
/// End of Record (RFC 885 command, distinct from the EOR option byte).
pub const CMD_EOR: u8 = 239;
/// Abort (RFC 1184 extended function).
pub const ABORT: u8 = 238;
/// Suspend Process (RFC 1184 extended function).
pub const SUSP: u8 = 237;
/// End of File (RFC 1184 extended function).
pub const CMD_EOF: u8 = 236;

/// Carriage return.
pub const CR: u8 = b'\r';
/// Line feed.
pub const LF: u8 = b'\n';
/// NUL, also the wildcard SLC function number.
pub const NUL: u8 = 0;

/// Hard cap on a buffered sub-negotiation payload. An SB that reaches
/// this size without its terminating `IAC SE` is discarded.
pub const MAX_SB: usize = 32 * 1024;

/// Hard cap on a queued SLC reply, in triplets.
pub const MAX_SLC_REPLY: usize = 6 * slc::NSLC as usize;

/// [Telnet option assignments](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
pub mod option {
    /// Binary Transmission, RFC 856.
    pub const BINARY: u8 = 0;
    /// Echo, RFC 857.
    pub const ECHO: u8 = 1;
    /// Suppress Go Ahead, RFC 858.
    pub const SGA: u8 = 3;
    /// Status, RFC 859.
    pub const STATUS: u8 = 5;
    /// Timing Mark, RFC 860.
    pub const TM: u8 = 6;
    /// Logout, RFC 727.
    pub const LOGOUT: u8 = 18;
    /// Send Location, RFC 779.
    pub const SNDLOC: u8 = 23;
    /// Terminal Type, RFC 1091.
    pub const TTYPE: u8 = 24;
    /// End of Record, RFC 885.
    pub const EOR: u8 = 25;
    /// Negotiate About Window Size, RFC 1073.
    pub const NAWS: u8 = 31;
    /// Terminal Speed, RFC 1079.
    pub const TSPEED: u8 = 32;
    /// Remote Flow Control, RFC 1372.
    pub const LFLOW: u8 = 33;
    /// Linemode, RFC 1184.
    pub const LINEMODE: u8 = 34;
    /// X Display Location, RFC 1096.
    pub const XDISPLOC: u8 = 35;
    /// New Environment, RFC 1572.
    pub const NEW_ENVIRON: u8 = 39;
    /// Charset, RFC 2066.
    pub const CHARSET: u8 = 42;
    /// Com Port Control, RFC 2217.
    pub const COM_PORT: u8 = 44;
    /// MUD Server Data Protocol.
    pub const MSDP: u8 = 69;
    /// MUD Server Status Protocol.
    pub const MSSP: u8 = 70;
    /// MUD Sound Protocol.
    pub const MSP: u8 = 90;
    /// MUD eXtension Protocol.
    pub const MXP: u8 = 91;
    /// Zenith MUD Protocol.
    pub const ZMP: u8 = 93;
    /// Aardwolf out-of-band channel protocol.
    pub const AARDWOLF: u8 = 102;
    /// Achaea Telnet Client Protocol.
    pub const ATCP: u8 = 200;
    /// Generic MUD Communication Protocol.
    pub const GMCP: u8 = 201;
}

/// Sub-negotiation sub-commands shared by TTYPE, TSPEED, XDISPLOC,
/// NEW-ENVIRON, and STATUS.
pub mod subcmd {
    /// Here is my value.
    pub const IS: u8 = 0;
    /// Send me your value.
    pub const SEND: u8 = 1;
    /// Unsolicited update (NEW-ENVIRON only).
    pub const INFO: u8 = 2;
}

/// CHARSET sub-commands, RFC 2066.
pub mod charset {
    /// Offer of character sets, separated by a sender-chosen octet.
    pub const REQUEST: u8 = 1;
    /// One of the offered sets was chosen.
    pub const ACCEPTED: u8 = 2;
    /// None of the offered sets are usable.
    pub const REJECTED: u8 = 3;
    /// Translation table follows (unsupported).
    pub const TTABLE_IS: u8 = 4;
    /// Translation table refused.
    pub const TTABLE_REJECTED: u8 = 5;
    /// Translation table acknowledged.
    pub const TTABLE_ACK: u8 = 6;
    /// Translation table not acknowledged.
    pub const TTABLE_NAK: u8 = 7;
}

/// NEW-ENVIRON record markers, RFC 1572.
pub mod environ {
    /// Well-known variable follows.
    pub const VAR: u8 = 0;
    /// Value of the preceding variable follows.
    pub const VALUE: u8 = 1;
    /// Escapes a following VAR, VALUE, ESC, or USERVAR byte.
    pub const ESC: u8 = 2;
    /// User-defined variable follows.
    pub const USERVAR: u8 = 3;
}

/// MSDP structure markers.
pub mod msdp {
    /// Variable name follows.
    pub const VAR: u8 = 1;
    /// Variable value follows.
    pub const VAL: u8 = 2;
    /// Opens a nested table of VAR/VAL pairs.
    pub const TABLE_OPEN: u8 = 3;
    /// Closes a table.
    pub const TABLE_CLOSE: u8 = 4;
    /// Opens an array of VAL entries.
    pub const ARRAY_OPEN: u8 = 5;
    /// Closes an array.
    pub const ARRAY_CLOSE: u8 = 6;
}

/// MSSP markers.
pub mod mssp {
    /// Variable name follows.
    pub const VAR: u8 = 1;
    /// Variable value follows; repeats promote the value to a list.
    pub const VAL: u8 = 2;
}

/// LFLOW mode bytes, RFC 1372.
pub mod lflow {
    /// Flow control off.
    pub const OFF: u8 = 0;
    /// Flow control on.
    pub const ON: u8 = 1;
    /// Any byte restarts suspended output.
    pub const RESTART_ANY: u8 = 2;
    /// Only XON restarts suspended output.
    pub const RESTART_XON: u8 = 3;
}

/// LINEMODE sub-option bytes and MODE mask bits, RFC 1184.
pub mod linemode {
    /// MODE sub-option.
    pub const MODE: u8 = 1;
    /// FORWARDMASK sub-option (prefixed by DO/DONT/WILL/WONT).
    pub const FORWARDMASK: u8 = 2;
    /// SLC sub-option.
    pub const SLC: u8 = 3;

    /// Client edits the line locally.
    pub const MODE_EDIT: u8 = 1;
    /// Signals are trapped locally and forwarded as Telnet commands.
    pub const MODE_TRAPSIG: u8 = 2;
    /// Acknowledgement bit; a MODE carrying it is never answered.
    pub const MODE_ACK: u8 = 4;
    /// Tabs are expanded by the client.
    pub const MODE_SOFT_TAB: u8 = 8;
    /// Non-printable characters are echoed literally.
    pub const MODE_LIT_ECHO: u8 = 16;
    /// All assignable mode bits.
    pub const MODE_MASK: u8 =
        MODE_EDIT | MODE_TRAPSIG | MODE_ACK | MODE_SOFT_TAB | MODE_LIT_ECHO;
}

/// Special Line Character function numbers, levels and flags, RFC 1184.
pub mod slc {
    /// Number of defined SLC functions.
    pub const NSLC: u8 = 18;

    /// Synchronize.
    pub const SLC_SYNCH: u8 = 1;
    /// Break.
    pub const SLC_BRK: u8 = 2;
    /// Interrupt process.
    pub const SLC_IP: u8 = 3;
    /// Abort output.
    pub const SLC_AO: u8 = 4;
    /// Are you there.
    pub const SLC_AYT: u8 = 5;
    /// End of record.
    pub const SLC_EOR: u8 = 6;
    /// Abort.
    pub const SLC_ABORT: u8 = 7;
    /// End of file.
    pub const SLC_EOF: u8 = 8;
    /// Suspend process.
    pub const SLC_SUSP: u8 = 9;
    /// Erase character.
    pub const SLC_EC: u8 = 10;
    /// Erase line.
    pub const SLC_EL: u8 = 11;
    /// Erase word.
    pub const SLC_EW: u8 = 12;
    /// Repaint line.
    pub const SLC_RP: u8 = 13;
    /// Literal next character.
    pub const SLC_LNEXT: u8 = 14;
    /// Transmit on.
    pub const SLC_XON: u8 = 15;
    /// Transmit off.
    pub const SLC_XOFF: u8 = 16;
    /// Forwarding character one.
    pub const SLC_FORW1: u8 = 17;
    /// Forwarding character two.
    pub const SLC_FORW2: u8 = 18;

    /// Function is not supported.
    pub const SLC_NOSUPPORT: u8 = 0;
    /// Function is supported but its value cannot change.
    pub const SLC_CANTCHANGE: u8 = 1;
    /// Function is supported and its value may change.
    pub const SLC_VARIABLE: u8 = 2;
    /// Function uses the implementation default.
    pub const SLC_DEFAULT: u8 = 3;
    /// Mask selecting the level bits of a flag byte.
    pub const SLC_LEVELBITS: u8 = 0x03;

    /// Output is to be flushed when the function is received.
    pub const SLC_FLUSHOUT: u8 = 32;
    /// Input is to be flushed when the function is received.
    pub const SLC_FLUSHIN: u8 = 64;
    /// Acknowledgement of a definition; never answered.
    pub const SLC_ACK: u8 = 128;
}

/// Com Port Control sub-commands, RFC 2217. Server-to-client forms
/// add [`comport::SERVER_OFFSET`] to the client-to-server value.
pub mod comport {
    /// Text signature exchange.
    pub const SIGNATURE: u8 = 0;
    /// Baud rate as a big-endian u32.
    pub const SET_BAUDRATE: u8 = 1;
    /// Data bits per character.
    pub const SET_DATASIZE: u8 = 2;
    /// Parity discipline.
    pub const SET_PARITY: u8 = 3;
    /// Stop bits.
    pub const SET_STOPSIZE: u8 = 4;
    /// DTR/RTS and friends.
    pub const SET_CONTROL: u8 = 5;
    /// Line-state change notification.
    pub const NOTIFY_LINESTATE: u8 = 6;
    /// Modem-state change notification.
    pub const NOTIFY_MODEMSTATE: u8 = 7;
    /// Suspend transmission to the port.
    pub const FLOWCONTROL_SUSPEND: u8 = 8;
    /// Resume transmission to the port.
    pub const FLOWCONTROL_RESUME: u8 = 9;
    /// Mask of reported line-state bits.
    pub const SET_LINESTATE_MASK: u8 = 10;
    /// Mask of reported modem-state bits.
    pub const SET_MODEMSTATE_MASK: u8 = 11;
    /// Discard buffered data.
    pub const PURGE_DATA: u8 = 12;
    /// Added to a sub-command sent from server to client.
    pub const SERVER_OFFSET: u8 = 100;
}

/// Returns the mnemonic for a Telnet command byte, if the byte names
/// one. Used for negotiation logging; option bytes are named through
/// [`crate::TelnetOption`] instead.
pub fn name_command(byte: u8) -> Option<&'static str> {
    Some(match byte {
        SE => "SE",
        NOP => "NOP",
        DM => "DM",
        BRK => "BRK",
        IP => "IP",
        AO => "AO",
        AYT => "AYT",
        EC => "EC",
        EL => "EL",
        GA => "GA",
        SB => "SB",
        WILL => "WILL",
        WONT => "WONT",
        DO => "DO",
        DONT => "DONT",
        IAC => "IAC",
        CMD_EOR => "EOR",
        ABORT => "ABORT",
        SUSP => "SUSP",
        CMD_EOF => "EOF",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_bytes_match_assignments() {
        assert_eq!(IAC, 0xFF);
        assert_eq!(SE, 0xF0);
        assert_eq!(SB, 0xFA);
        assert_eq!(WILL, 0xFB);
        assert_eq!(WONT, 0xFC);
        assert_eq!(DO, 0xFD);
        assert_eq!(DONT, 0xFE);
        assert_eq!(CMD_EOF, 236);
    }

    #[test]
    fn option_bytes_match_assignments() {
        assert_eq!(option::BINARY, 0);
        assert_eq!(option::LINEMODE, 34);
        assert_eq!(option::NEW_ENVIRON, 39);
        assert_eq!(option::CHARSET, 42);
        assert_eq!(option::GMCP, 201);
        assert_eq!(option::AARDWOLF, 102);
    }

    #[test]
    fn name_command_covers_command_range() {
        assert_eq!(name_command(IAC), Some("IAC"));
        assert_eq!(name_command(CMD_EOR), Some("EOR"));
        assert_eq!(name_command(b'x'), None);
    }
}

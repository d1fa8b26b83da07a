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

//! Terminal Type sub-negotiation, RFC 1091, plus the MTTS extension.
//!
//! A server may send SEND repeatedly to walk the client's terminal
//! type list. The list ends when the client repeats a value, returns
//! an empty one, or answers with an MTTS capability string; a client
//! signals its own end-of-list by repeating the final value.

use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use crate::{TelnetOption, consts::subcmd};

/// Prefix of a MUD Terminal Type Standard capability string, sent as
/// the final entry of an MTTS-aware client's type list.
pub const MTTS_PREFIX: &str = "MTTS ";

///
/// A decoded TTYPE sub-negotiation.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TtypeCmd {
    /// `IS <terminal-type>`.
    Is(String),
    /// `SEND`.
    Send,
}

/// Decodes a TTYPE payload (option byte stripped).
pub fn decode(payload: &[u8]) -> CodecResult<TtypeCmd> {
    let (&cmd, rest) = payload.split_first().ok_or_else(|| {
        CodecError::subnegotiation(
            TelnetOption::TerminalType,
            SubnegotiationErrorKind::InsufficientData {
                required: 1,
                available: 0,
            },
        )
    })?;
    match cmd {
        subcmd::IS => Ok(TtypeCmd::Is(String::from_utf8_lossy(rest).into_owned())),
        subcmd::SEND => Ok(TtypeCmd::Send),
        other => Err(CodecError::subnegotiation(
            TelnetOption::TerminalType,
            SubnegotiationErrorKind::InvalidCommand { command: other },
        )),
    }
}

/// Encodes `IS <terminal-type>`.
pub fn encode_is(ttype: &str) -> Vec<u8> {
    let mut payload = vec![subcmd::IS];
    payload.extend_from_slice(ttype.as_bytes());
    payload
}

/// Encodes `SEND`.
pub fn encode_send() -> Vec<u8> {
    vec![subcmd::SEND]
}

/// True when `value` is an MTTS capability string, which terminates
/// terminal-type cycling.
pub fn is_mtts(value: &str) -> bool {
    value.starts_with(MTTS_PREFIX)
}

/// Parses the capability bitfield out of an MTTS string, if the tail
/// is numeric.
pub fn mtts_bitfield(value: &str) -> Option<u32> {
    value.strip_prefix(MTTS_PREFIX)?.trim().parse().ok()
}

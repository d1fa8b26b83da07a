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

//! Terminal Speed sub-negotiation, RFC 1079.

use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use crate::{TelnetOption, consts::subcmd};

///
/// A decoded TSPEED sub-negotiation.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TspeedCmd {
    /// `IS <rx>,<tx>` in decimal ASCII.
    Is {
        /// Receive speed in bits per second.
        rx: u32,
        /// Transmit speed in bits per second.
        tx: u32,
    },
    /// `SEND`.
    Send,
}

/// Decodes a TSPEED payload (option byte stripped). Malformed
/// numerics are a decode error; the interpreter logs and drops them.
pub fn decode(payload: &[u8]) -> CodecResult<TspeedCmd> {
    let (&cmd, rest) = payload.split_first().ok_or_else(|| {
        CodecError::subnegotiation(
            TelnetOption::TerminalSpeed,
            SubnegotiationErrorKind::InsufficientData {
                required: 1,
                available: 0,
            },
        )
    })?;
    match cmd {
        subcmd::IS => {
            let text = String::from_utf8_lossy(rest);
            let mut fields = text.splitn(2, ',');
            let rx = fields.next().unwrap_or_default().trim();
            let tx = fields.next().unwrap_or_default().trim();
            match (rx.parse(), tx.parse()) {
                (Ok(rx), Ok(tx)) => Ok(TspeedCmd::Is { rx, tx }),
                _ => Err(CodecError::subnegotiation(
                    TelnetOption::TerminalSpeed,
                    SubnegotiationErrorKind::MalformedValue(format!(
                        "illegal TSPEED values (rx={rx:?}, tx={tx:?})"
                    )),
                )),
            }
        }
        subcmd::SEND => Ok(TspeedCmd::Send),
        other => Err(CodecError::subnegotiation(
            TelnetOption::TerminalSpeed,
            SubnegotiationErrorKind::InvalidCommand { command: other },
        )),
    }
}

/// Encodes `IS <rx>,<tx>`.
pub fn encode_is(rx: u32, tx: u32) -> Vec<u8> {
    let mut payload = vec![subcmd::IS];
    payload.extend_from_slice(format!("{rx},{tx}").as_bytes());
    payload
}

/// Encodes `SEND`.
pub fn encode_send() -> Vec<u8> {
    vec![subcmd::SEND]
}

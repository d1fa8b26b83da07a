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

//! Remote Flow Control sub-negotiation, RFC 1372.

use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use crate::{TelnetOption, consts::lflow};

///
/// The one-byte LFLOW switch.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LflowMode {
    /// Flow control off.
    Off,
    /// Flow control on.
    On,
    /// Any received byte restarts suspended output.
    RestartAny,
    /// Only XON restarts suspended output.
    RestartXon,
}

impl LflowMode {
    /// The wire byte of this mode.
    pub fn to_u8(self) -> u8 {
        match self {
            LflowMode::Off => lflow::OFF,
            LflowMode::On => lflow::ON,
            LflowMode::RestartAny => lflow::RESTART_ANY,
            LflowMode::RestartXon => lflow::RESTART_XON,
        }
    }
}

/// Decodes an LFLOW payload (option byte stripped).
pub fn decode(payload: &[u8]) -> CodecResult<LflowMode> {
    match payload {
        [byte] => match *byte {
            lflow::OFF => Ok(LflowMode::Off),
            lflow::ON => Ok(LflowMode::On),
            lflow::RESTART_ANY => Ok(LflowMode::RestartAny),
            lflow::RESTART_XON => Ok(LflowMode::RestartXon),
            other => Err(CodecError::subnegotiation(
                TelnetOption::LineFlow,
                SubnegotiationErrorKind::InvalidCommand { command: other },
            )),
        },
        _ => Err(CodecError::subnegotiation(
            TelnetOption::LineFlow,
            SubnegotiationErrorKind::InsufficientData {
                required: 1,
                available: payload.len(),
            },
        )),
    }
}

/// Encodes the one-byte mode.
pub fn encode(mode: LflowMode) -> Vec<u8> {
    vec![mode.to_u8()]
}

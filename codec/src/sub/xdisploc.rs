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

//! X Display Location sub-negotiation, RFC 1096.

use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use crate::{TelnetOption, consts::subcmd};

/// A decoded XDISPLOC sub-negotiation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum XdisplocCmd {
    /// `IS <display>`, e.g. `"alpha:0"`.
    Is(String),
    /// `SEND`.
    Send,
}

/// Decodes an XDISPLOC payload (option byte stripped).
pub fn decode(payload: &[u8]) -> CodecResult<XdisplocCmd> {
    let (&cmd, rest) = payload.split_first().ok_or_else(|| {
        CodecError::subnegotiation(
            TelnetOption::XDisplayLocation,
            SubnegotiationErrorKind::InsufficientData {
                required: 1,
                available: 0,
            },
        )
    })?;
    match cmd {
        subcmd::IS => Ok(XdisplocCmd::Is(String::from_utf8_lossy(rest).into_owned())),
        subcmd::SEND => Ok(XdisplocCmd::Send),
        other => Err(CodecError::subnegotiation(
            TelnetOption::XDisplayLocation,
            SubnegotiationErrorKind::InvalidCommand { command: other },
        )),
    }
}

/// Encodes `IS <display>`.
pub fn encode_is(display: &str) -> Vec<u8> {
    let mut payload = vec![subcmd::IS];
    payload.extend_from_slice(display.as_bytes());
    payload
}

/// Encodes `SEND`.
pub fn encode_send() -> Vec<u8> {
    vec![subcmd::SEND]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_round_trip() {
        let payload = encode_is("alpha:0");
        assert_eq!(decode(&payload).unwrap(), XdisplocCmd::Is("alpha:0".to_string()));
    }

    #[test]
    fn send_round_trip() {
        assert_eq!(decode(&encode_send()).unwrap(), XdisplocCmd::Send);
    }
}

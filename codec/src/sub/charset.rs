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

//! CHARSET sub-negotiation, RFC 2066.

use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use crate::{TelnetOption, consts::charset};

///
/// A decoded CHARSET sub-negotiation.
///
/// The TTABLE forms negotiate byte translation tables; they are
/// recognized so the exchange can be declined, never interpreted.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CharsetCmd {
    /// `REQUEST <sep> <charset> [<sep> <charset> ...]`: the sender
    /// asks that all text be encoded in one of the offered sets.
    Request(Vec<String>),
    /// `ACCEPTED <charset>`: the receiver chose one.
    Accepted(String),
    /// `REJECTED`: none of the offers were usable.
    Rejected,
    /// Any `TTABLE_*` sub-command, unsupported by this
    /// implementation.
    TtableUnsupported(u8),
}

/// Decodes a CHARSET payload (option byte stripped).
pub fn decode(payload: &[u8]) -> CodecResult<CharsetCmd> {
    let (&cmd, rest) = payload.split_first().ok_or_else(|| {
        CodecError::subnegotiation(
            TelnetOption::Charset,
            SubnegotiationErrorKind::InsufficientData {
                required: 1,
                available: 0,
            },
        )
    })?;
    match cmd {
        charset::REQUEST => {
            // The separator is whichever octet the sender chose;
            // everything after it splits on that octet.
            let (&sep, offers) = rest.split_first().ok_or_else(|| {
                CodecError::subnegotiation(
                    TelnetOption::Charset,
                    SubnegotiationErrorKind::InsufficientData {
                        required: 2,
                        available: 1,
                    },
                )
            })?;
            let offers = offers
                .split(|&b| b == sep)
                .filter(|chunk| !chunk.is_empty())
                .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                .collect();
            Ok(CharsetCmd::Request(offers))
        }
        charset::ACCEPTED => Ok(CharsetCmd::Accepted(
            String::from_utf8_lossy(rest).into_owned(),
        )),
        charset::REJECTED => Ok(CharsetCmd::Rejected),
        charset::TTABLE_IS | charset::TTABLE_REJECTED | charset::TTABLE_ACK
        | charset::TTABLE_NAK => Ok(CharsetCmd::TtableUnsupported(cmd)),
        other => Err(CodecError::subnegotiation(
            TelnetOption::Charset,
            SubnegotiationErrorKind::InvalidCommand { command: other },
        )),
    }
}

/// Encodes `REQUEST <sep> <charsets>` with the given separator.
pub fn encode_request(codepages: &[String], sep: u8) -> Vec<u8> {
    let mut payload = vec![charset::REQUEST, sep];
    for (index, name) in codepages.iter().enumerate() {
        if index > 0 {
            payload.push(sep);
        }
        payload.extend_from_slice(name.as_bytes());
    }
    payload
}

/// Encodes `ACCEPTED <charset>`.
pub fn encode_accepted(name: &str) -> Vec<u8> {
    let mut payload = vec![charset::ACCEPTED];
    payload.extend_from_slice(name.as_bytes());
    payload
}

/// Encodes `REJECTED`.
pub fn encode_rejected() -> Vec<u8> {
    vec![charset::REJECTED]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trip() {
        let offers = vec!["UTF-8".to_string(), "LATIN1".to_string()];
        let payload = encode_request(&offers, b' ');
        assert_eq!(payload, b"\x01 UTF-8 LATIN1");
        assert_eq!(decode(&payload).unwrap(), CharsetCmd::Request(offers));
    }

    #[test]
    fn request_honours_sender_separator() {
        let decoded = decode(b"\x01;UTF-8;KOI8-U").unwrap();
        assert_eq!(
            decoded,
            CharsetCmd::Request(vec!["UTF-8".to_string(), "KOI8-U".to_string()])
        );
    }

    #[test]
    fn accepted_round_trip() {
        let payload = encode_accepted("KOI8-U");
        assert_eq!(decode(&payload).unwrap(), CharsetCmd::Accepted("KOI8-U".to_string()));
    }

    #[test]
    fn rejected_round_trip() {
        assert_eq!(decode(&encode_rejected()).unwrap(), CharsetCmd::Rejected);
    }

    #[test]
    fn ttable_surfaces_as_unsupported() {
        assert_eq!(
            decode(&[charset::TTABLE_IS, 1, 2, 3]).unwrap(),
            CharsetCmd::TtableUnsupported(charset::TTABLE_IS)
        );
    }

    #[test]
    fn empty_payload_is_an_error() {
        assert!(decode(&[]).is_err());
    }
}

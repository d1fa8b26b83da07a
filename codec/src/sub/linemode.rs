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

//! LINEMODE sub-negotiation, RFC 1184: MODE proposals, SLC triplet
//! streams, and the FORWARDMASK sub-exchange.

use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use crate::linemode::Linemode;
use crate::slc::SlcDef;
use crate::{TelnetOption, consts, consts::linemode};

///
/// A decoded LINEMODE sub-negotiation.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LinemodeCmd {
    /// `MODE <mask>`.
    Mode(Linemode),
    /// `SLC` followed by `(func, flag, value)` triplets.
    Slc(Vec<(u8, SlcDef)>),
    /// `DO|DONT|WILL|WONT FORWARDMASK`, with the mask bytes present
    /// on DO.
    Forwardmask {
        /// DO, DONT, WILL, or WONT.
        verb: u8,
        /// The 16/32-byte bitmap, present only with DO.
        mask: Vec<u8>,
    },
}

/// Decodes a LINEMODE payload (option byte stripped).
pub fn decode(payload: &[u8]) -> CodecResult<LinemodeCmd> {
    let (&cmd, rest) = payload.split_first().ok_or_else(|| {
        CodecError::subnegotiation(
            TelnetOption::Linemode,
            SubnegotiationErrorKind::InsufficientData {
                required: 1,
                available: 0,
            },
        )
    })?;
    match cmd {
        linemode::MODE => match rest {
            [mask] => Ok(LinemodeCmd::Mode(Linemode::new(*mask))),
            _ => Err(CodecError::subnegotiation(
                TelnetOption::Linemode,
                SubnegotiationErrorKind::InsufficientData {
                    required: 1,
                    available: rest.len(),
                },
            )),
        },
        linemode::SLC => {
            if rest.len() % 3 != 0 {
                return Err(CodecError::subnegotiation(
                    TelnetOption::Linemode,
                    SubnegotiationErrorKind::MalformedValue(format!(
                        "SLC buffer must be byte triplets, got {} bytes",
                        rest.len()
                    )),
                ));
            }
            let triplets = rest
                .chunks_exact(3)
                .map(|t| (t[0], SlcDef::new(t[1], t[2])))
                .collect();
            Ok(LinemodeCmd::Slc(triplets))
        }
        consts::DO | consts::DONT | consts::WILL | consts::WONT => {
            let (&sub, mask) = rest.split_first().ok_or_else(|| {
                CodecError::subnegotiation(
                    TelnetOption::Linemode,
                    SubnegotiationErrorKind::InsufficientData {
                        required: 2,
                        available: 1,
                    },
                )
            })?;
            if sub != linemode::FORWARDMASK {
                return Err(CodecError::subnegotiation(
                    TelnetOption::Linemode,
                    SubnegotiationErrorKind::InvalidCommand { command: sub },
                ));
            }
            Ok(LinemodeCmd::Forwardmask {
                verb: cmd,
                mask: mask.to_vec(),
            })
        }
        other => Err(CodecError::subnegotiation(
            TelnetOption::Linemode,
            SubnegotiationErrorKind::InvalidCommand { command: other },
        )),
    }
}

/// Encodes `MODE <mask>`.
pub fn encode_mode(mode: Linemode) -> Vec<u8> {
    vec![linemode::MODE, mode.mask()]
}

/// Encodes `SLC` triplets.
pub fn encode_slc(triplets: &[(u8, SlcDef)]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(1 + triplets.len() * 3);
    payload.push(linemode::SLC);
    for (func, def) in triplets {
        payload.extend_from_slice(&[*func, def.mask(), def.value()]);
    }
    payload
}

/// Encodes `<verb> FORWARDMASK [<mask>]`.
pub fn encode_forwardmask(verb: u8, mask: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + mask.len());
    payload.push(verb);
    payload.push(linemode::FORWARDMASK);
    payload.extend_from_slice(mask);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::slc::{SLC_EC, SLC_VARIABLE};

    #[test]
    fn mode_round_trip() {
        let payload = encode_mode(Linemode::new(0x03));
        assert_eq!(payload, vec![linemode::MODE, 0x03]);
        assert_eq!(decode(&payload).unwrap(), LinemodeCmd::Mode(Linemode::new(0x03)));
    }

    #[test]
    fn slc_round_trip() {
        let triplets = vec![(SLC_EC, SlcDef::new(SLC_VARIABLE, 0x7F))];
        let payload = encode_slc(&triplets);
        assert_eq!(decode(&payload).unwrap(), LinemodeCmd::Slc(triplets));
    }

    #[test]
    fn slc_rejects_partial_triplets() {
        assert!(decode(&[linemode::SLC, 1, 2]).is_err());
    }

    #[test]
    fn do_forwardmask_carries_mask() {
        let mask = vec![0xAA; 16];
        let payload = encode_forwardmask(consts::DO, &mask);
        assert_eq!(
            decode(&payload).unwrap(),
            LinemodeCmd::Forwardmask {
                verb: consts::DO,
                mask,
            }
        );
    }

    #[test]
    fn wont_forwardmask_has_no_mask() {
        let payload = encode_forwardmask(consts::WONT, &[]);
        assert_eq!(
            decode(&payload).unwrap(),
            LinemodeCmd::Forwardmask {
                verb: consts::WONT,
                mask: vec![],
            }
        );
    }

    #[test]
    fn unknown_suboption_is_an_error() {
        assert!(decode(&[0x42]).is_err());
        assert!(decode(&[consts::DO, 0x42]).is_err());
    }
}

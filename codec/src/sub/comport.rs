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

//! Com Port Control sub-negotiation, RFC 2217.
//!
//! The first payload byte selects the sub-command; values sent from
//! the access server to the client carry an offset of 100, which the
//! decoder strips and records as the direction.

use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use crate::{TelnetOption, consts::comport};
use byteorder::{BigEndian, ByteOrder};

///
/// A decoded COM-PORT-OPTION sub-negotiation.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ComPortCmd {
    /// `SIGNATURE [<text>]`: empty text requests the peer's
    /// signature.
    Signature(String),
    /// `SET-BAUDRATE <u32>`: zero requests the current value.
    SetBaudrate(u32),
    /// `SET-DATASIZE <u8>`.
    SetDatasize(u8),
    /// `SET-PARITY <u8>`.
    SetParity(u8),
    /// `SET-STOPSIZE <u8>`.
    SetStopsize(u8),
    /// `SET-CONTROL <u8>`.
    SetControl(u8),
    /// `NOTIFY-LINESTATE <u8>`.
    NotifyLinestate(u8),
    /// `NOTIFY-MODEMSTATE <u8>`.
    NotifyModemstate(u8),
    /// `FLOWCONTROL-SUSPEND`.
    FlowControlSuspend,
    /// `FLOWCONTROL-RESUME`.
    FlowControlResume,
    /// `SET-LINESTATE-MASK <u8>`.
    SetLinestateMask(u8),
    /// `SET-MODEMSTATE-MASK <u8>`.
    SetModemstateMask(u8),
    /// `PURGE-DATA <u8>`.
    PurgeData(u8),
}

///
/// A COM-PORT sub-negotiation with its direction of travel.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComPortMessage {
    /// The decoded sub-command.
    pub cmd: ComPortCmd,
    /// True when the sub-command byte carried the server offset.
    pub from_server: bool,
}

fn one_byte(operand: &[u8]) -> CodecResult<u8> {
    operand.first().copied().ok_or_else(|| {
        CodecError::subnegotiation(
            TelnetOption::ComPort,
            SubnegotiationErrorKind::InsufficientData {
                required: 1,
                available: 0,
            },
        )
    })
}

/// Decodes a COM-PORT payload (option byte stripped).
pub fn decode(payload: &[u8]) -> CodecResult<ComPortMessage> {
    let (&raw, rest) = payload.split_first().ok_or_else(|| {
        CodecError::subnegotiation(
            TelnetOption::ComPort,
            SubnegotiationErrorKind::InsufficientData {
                required: 1,
                available: 0,
            },
        )
    })?;
    let from_server = raw >= comport::SERVER_OFFSET;
    let code = if from_server {
        raw - comport::SERVER_OFFSET
    } else {
        raw
    };
    let cmd = match code {
        comport::SIGNATURE => ComPortCmd::Signature(String::from_utf8_lossy(rest).into_owned()),
        comport::SET_BAUDRATE => {
            if rest.len() != 4 {
                return Err(CodecError::subnegotiation(
                    TelnetOption::ComPort,
                    SubnegotiationErrorKind::InsufficientData {
                        required: 4,
                        available: rest.len(),
                    },
                ));
            }
            ComPortCmd::SetBaudrate(BigEndian::read_u32(rest))
        }
        comport::SET_DATASIZE => ComPortCmd::SetDatasize(one_byte(rest)?),
        comport::SET_PARITY => ComPortCmd::SetParity(one_byte(rest)?),
        comport::SET_STOPSIZE => ComPortCmd::SetStopsize(one_byte(rest)?),
        comport::SET_CONTROL => ComPortCmd::SetControl(one_byte(rest)?),
        comport::NOTIFY_LINESTATE => ComPortCmd::NotifyLinestate(one_byte(rest)?),
        comport::NOTIFY_MODEMSTATE => ComPortCmd::NotifyModemstate(one_byte(rest)?),
        comport::FLOWCONTROL_SUSPEND => ComPortCmd::FlowControlSuspend,
        comport::FLOWCONTROL_RESUME => ComPortCmd::FlowControlResume,
        comport::SET_LINESTATE_MASK => ComPortCmd::SetLinestateMask(one_byte(rest)?),
        comport::SET_MODEMSTATE_MASK => ComPortCmd::SetModemstateMask(one_byte(rest)?),
        comport::PURGE_DATA => ComPortCmd::PurgeData(one_byte(rest)?),
        other => {
            return Err(CodecError::subnegotiation(
                TelnetOption::ComPort,
                SubnegotiationErrorKind::Unsupported { command: other },
            ));
        }
    };
    Ok(ComPortMessage { cmd, from_server })
}

/// Encodes a COM-PORT payload, applying the server offset when
/// `from_server` is set.
pub fn encode(message: &ComPortMessage) -> Vec<u8> {
    let offset = if message.from_server {
        comport::SERVER_OFFSET
    } else {
        0
    };
    match &message.cmd {
        ComPortCmd::Signature(text) => {
            let mut payload = vec![comport::SIGNATURE + offset];
            payload.extend_from_slice(text.as_bytes());
            payload
        }
        ComPortCmd::SetBaudrate(rate) => {
            let mut payload = vec![comport::SET_BAUDRATE + offset, 0, 0, 0, 0];
            BigEndian::write_u32(&mut payload[1..5], *rate);
            payload
        }
        ComPortCmd::SetDatasize(v) => vec![comport::SET_DATASIZE + offset, *v],
        ComPortCmd::SetParity(v) => vec![comport::SET_PARITY + offset, *v],
        ComPortCmd::SetStopsize(v) => vec![comport::SET_STOPSIZE + offset, *v],
        ComPortCmd::SetControl(v) => vec![comport::SET_CONTROL + offset, *v],
        ComPortCmd::NotifyLinestate(v) => vec![comport::NOTIFY_LINESTATE + offset, *v],
        ComPortCmd::NotifyModemstate(v) => vec![comport::NOTIFY_MODEMSTATE + offset, *v],
        ComPortCmd::FlowControlSuspend => vec![comport::FLOWCONTROL_SUSPEND + offset],
        ComPortCmd::FlowControlResume => vec![comport::FLOWCONTROL_RESUME + offset],
        ComPortCmd::SetLinestateMask(v) => vec![comport::SET_LINESTATE_MASK + offset, *v],
        ComPortCmd::SetModemstateMask(v) => vec![comport::SET_MODEMSTATE_MASK + offset, *v],
        ComPortCmd::PurgeData(v) => vec![comport::PURGE_DATA + offset, *v],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baudrate_round_trip() {
        let message = ComPortMessage {
            cmd: ComPortCmd::SetBaudrate(115_200),
            from_server: false,
        };
        let payload = encode(&message);
        assert_eq!(payload, vec![comport::SET_BAUDRATE, 0x00, 0x01, 0xC2, 0x00]);
        assert_eq!(decode(&payload).unwrap(), message);
    }

    #[test]
    fn server_offset_round_trip() {
        let message = ComPortMessage {
            cmd: ComPortCmd::SetParity(1),
            from_server: true,
        };
        let payload = encode(&message);
        assert_eq!(payload[0], comport::SET_PARITY + comport::SERVER_OFFSET);
        assert_eq!(decode(&payload).unwrap(), message);
    }

    #[test]
    fn signature_round_trip() {
        let message = ComPortMessage {
            cmd: ComPortCmd::Signature("telwire".to_string()),
            from_server: false,
        };
        assert_eq!(decode(&encode(&message)).unwrap(), message);
    }

    #[test]
    fn flow_control_has_no_operand() {
        let message = ComPortMessage {
            cmd: ComPortCmd::FlowControlSuspend,
            from_server: false,
        };
        assert_eq!(encode(&message), vec![comport::FLOWCONTROL_SUSPEND]);
        assert_eq!(decode(&encode(&message)).unwrap(), message);
    }

    #[test]
    fn truncated_baudrate_is_an_error() {
        assert!(decode(&[comport::SET_BAUDRATE, 0x00]).is_err());
    }

    #[test]
    fn unknown_subcommand_is_an_error() {
        assert!(decode(&[42]).is_err());
    }
}

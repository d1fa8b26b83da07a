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

//! The framed view: `tokio_util::codec` traits over the Telnet wire
//! format.
//!
//! [`TelnetCodec`] parses and serializes [`TelnetFrame`]s and plugs
//! into `tokio_util::codec::Framed` (or `FramedRead`/`FramedWrite`)
//! for applications that want frames off a socket without the option
//! engine. It owns no negotiation state: frames carry DO/DONT/WILL/
//! WONT and raw sub-negotiation payloads for the caller to act on.
//! Connections that want the negotiation rules applied drive a
//! [`crate::TelnetInterpreter`] instead; the two share the wire
//! grammar, not the policy.
//!
//! Malformed input never errors the stream. An unknown command or an
//! interrupted sub-negotiation is logged, the fragment is dropped,
//! and decoding continues with a [`TelnetFrame::NoOperation`] in its
//! place.

use crate::{CodecError, TelnetOption, consts};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{error, warn};

///
/// One wire-level Telnet frame.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TelnetFrame {
    /// A single in-band data byte; a literal 0xFF travels as `IAC
    /// IAC` on the wire.
    Data(u8),
    /// `IAC NOP`.
    NoOperation,
    /// `IAC DM`.
    DataMark,
    /// `IAC BRK`.
    Break,
    /// `IAC IP`.
    InterruptProcess,
    /// `IAC AO`.
    AbortOutput,
    /// `IAC AYT`.
    AreYouThere,
    /// `IAC EC`.
    EraseCharacter,
    /// `IAC EL`.
    EraseLine,
    /// `IAC GA`.
    GoAhead,
    /// `IAC EOR`.
    EndOfRecord,
    /// `IAC EOF`.
    EndOfFile,
    /// `IAC SUSP`.
    Suspend,
    /// `IAC ABORT`.
    Abort,
    /// `IAC DO <opt>`.
    Do(TelnetOption),
    /// `IAC DONT <opt>`.
    Dont(TelnetOption),
    /// `IAC WILL <opt>`.
    Will(TelnetOption),
    /// `IAC WONT <opt>`.
    Wont(TelnetOption),
    /// `IAC SB <opt> <payload> IAC SE`, payload un-escaped.
    Subnegotiate(TelnetOption, Vec<u8>),
}

///
/// Decoder state between frames.
///
#[derive(Clone, Copy, Debug)]
enum DecoderState {
    /// Normal data.
    Data,
    /// Received IAC, next byte is a command.
    Command,
    /// Received DO/DONT/WILL/WONT, next byte is the option.
    Negotiate(u8),
    /// Received `IAC SB`, next byte is the option.
    SubnegotiateOption,
    /// Accumulating sub-negotiation payload for the option.
    Subnegotiate(u8),
    /// Received IAC inside a sub-negotiation, next byte decides.
    SubnegotiateIac(u8),
}

///
/// A stateful codec for the Telnet wire format.
///
/// Implements both [`Decoder`] and [`Encoder`] from
/// `tokio_util::codec`, maintaining only the parse state needed to
/// reassemble frames across arbitrary read boundaries.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use telwire_codec::{TelnetCodec, TelnetFrame, TelnetOption};
/// use tokio_util::codec::{Decoder, Encoder};
///
/// let mut codec = TelnetCodec::new();
/// let mut wire = BytesMut::from(&b"hi\xFF\xFD\x01"[..]); // "hi" IAC DO ECHO
/// let mut frames = Vec::new();
/// while let Some(frame) = codec.decode(&mut wire).unwrap() {
///     frames.push(frame);
/// }
/// assert_eq!(
///     frames,
///     vec![
///         TelnetFrame::Data(b'h'),
///         TelnetFrame::Data(b'i'),
///         TelnetFrame::Do(TelnetOption::Echo),
///     ]
/// );
///
/// let mut out = BytesMut::new();
/// codec.encode(TelnetFrame::Wont(TelnetOption::Echo), &mut out).unwrap();
/// assert_eq!(&out[..], &[0xFF, 0xFC, 0x01]);
/// ```
#[derive(Debug)]
pub struct TelnetCodec {
    state: DecoderState,
    sb_buf: Vec<u8>,
}

impl TelnetCodec {
    /// Creates a codec in the normal-data state.
    pub fn new() -> Self {
        TelnetCodec::default()
    }

    /// Drops an over-long or interrupted sub-negotiation and returns
    /// to normal data.
    fn abort_subnegotiation(&mut self) {
        self.sb_buf.clear();
        self.state = DecoderState::Data;
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        TelnetCodec {
            state: DecoderState::Data,
            sb_buf: Vec::new(),
        }
    }
}

impl Decoder for TelnetCodec {
    type Item = TelnetFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<TelnetFrame>, Self::Error> {
        while src.remaining() > 0 {
            let byte = src.get_u8();
            match (self.state, byte) {
                (DecoderState::Data, consts::IAC) => {
                    self.state = DecoderState::Command;
                }
                (DecoderState::Data, _) => {
                    return Ok(Some(TelnetFrame::Data(byte)));
                }
                (DecoderState::Command, consts::IAC) => {
                    self.state = DecoderState::Data;
                    return Ok(Some(TelnetFrame::Data(consts::IAC)));
                }
                (DecoderState::Command, consts::DO)
                | (DecoderState::Command, consts::DONT)
                | (DecoderState::Command, consts::WILL)
                | (DecoderState::Command, consts::WONT) => {
                    self.state = DecoderState::Negotiate(byte);
                }
                (DecoderState::Command, consts::SB) => {
                    self.state = DecoderState::SubnegotiateOption;
                }
                (DecoderState::Command, _) => {
                    self.state = DecoderState::Data;
                    let frame = match byte {
                        consts::NOP => TelnetFrame::NoOperation,
                        consts::DM => TelnetFrame::DataMark,
                        consts::BRK => TelnetFrame::Break,
                        consts::IP => TelnetFrame::InterruptProcess,
                        consts::AO => TelnetFrame::AbortOutput,
                        consts::AYT => TelnetFrame::AreYouThere,
                        consts::EC => TelnetFrame::EraseCharacter,
                        consts::EL => TelnetFrame::EraseLine,
                        consts::GA => TelnetFrame::GoAhead,
                        consts::CMD_EOR => TelnetFrame::EndOfRecord,
                        consts::CMD_EOF => TelnetFrame::EndOfFile,
                        consts::SUSP => TelnetFrame::Suspend,
                        consts::ABORT => TelnetFrame::Abort,
                        _ => {
                            warn!("received unknown command 0x{byte:02X}");
                            TelnetFrame::NoOperation
                        }
                    };
                    return Ok(Some(frame));
                }
                (DecoderState::Negotiate(verb), _) => {
                    self.state = DecoderState::Data;
                    let option = TelnetOption::from_u8(byte);
                    let frame = match verb {
                        consts::DO => TelnetFrame::Do(option),
                        consts::DONT => TelnetFrame::Dont(option),
                        consts::WILL => TelnetFrame::Will(option),
                        _ => TelnetFrame::Wont(option),
                    };
                    return Ok(Some(frame));
                }
                (DecoderState::SubnegotiateOption, _) => {
                    self.state = DecoderState::Subnegotiate(byte);
                }
                (DecoderState::Subnegotiate(option), consts::IAC) => {
                    self.state = DecoderState::SubnegotiateIac(option);
                }
                (DecoderState::Subnegotiate(option), _) => {
                    if self.sb_buf.len() >= consts::MAX_SB {
                        error!(
                            "SB {} overran {} byte buffer",
                            TelnetOption::from_u8(option),
                            consts::MAX_SB
                        );
                        self.abort_subnegotiation();
                        return Ok(Some(TelnetFrame::NoOperation));
                    }
                    self.sb_buf.push(byte);
                }
                (DecoderState::SubnegotiateIac(option), consts::IAC) => {
                    self.state = DecoderState::Subnegotiate(option);
                    self.sb_buf.push(consts::IAC);
                }
                (DecoderState::SubnegotiateIac(option), consts::SE) => {
                    self.state = DecoderState::Data;
                    let payload = std::mem::take(&mut self.sb_buf);
                    return Ok(Some(TelnetFrame::Subnegotiate(
                        TelnetOption::from_u8(option),
                        payload,
                    )));
                }
                (DecoderState::SubnegotiateIac(option), _) => {
                    warn!(
                        "SB {} ({} bytes) interrupted by IAC {}",
                        TelnetOption::from_u8(option),
                        self.sb_buf.len(),
                        consts::name_command(byte).unwrap_or("unknown")
                    );
                    self.abort_subnegotiation();
                    return Ok(Some(TelnetFrame::NoOperation));
                }
            }
        }
        Ok(None)
    }
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = CodecError;

    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            TelnetFrame::Data(byte) => {
                dst.reserve(2);
                if byte == consts::IAC {
                    dst.put_u8(consts::IAC);
                }
                dst.put_u8(byte);
            }
            TelnetFrame::NoOperation => put_command(dst, consts::NOP),
            TelnetFrame::DataMark => put_command(dst, consts::DM),
            TelnetFrame::Break => put_command(dst, consts::BRK),
            TelnetFrame::InterruptProcess => put_command(dst, consts::IP),
            TelnetFrame::AbortOutput => put_command(dst, consts::AO),
            TelnetFrame::AreYouThere => put_command(dst, consts::AYT),
            TelnetFrame::EraseCharacter => put_command(dst, consts::EC),
            TelnetFrame::EraseLine => put_command(dst, consts::EL),
            TelnetFrame::GoAhead => put_command(dst, consts::GA),
            TelnetFrame::EndOfRecord => put_command(dst, consts::CMD_EOR),
            TelnetFrame::EndOfFile => put_command(dst, consts::CMD_EOF),
            TelnetFrame::Suspend => put_command(dst, consts::SUSP),
            TelnetFrame::Abort => put_command(dst, consts::ABORT),
            TelnetFrame::Do(option) => put_negotiation(dst, consts::DO, option),
            TelnetFrame::Dont(option) => put_negotiation(dst, consts::DONT, option),
            TelnetFrame::Will(option) => put_negotiation(dst, consts::WILL, option),
            TelnetFrame::Wont(option) => put_negotiation(dst, consts::WONT, option),
            TelnetFrame::Subnegotiate(option, payload) => {
                dst.reserve(5 + payload.len());
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SB);
                dst.put_u8(option.to_u8());
                for byte in payload {
                    if byte == consts::IAC {
                        dst.put_u8(consts::IAC);
                    }
                    dst.put_u8(byte);
                }
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SE);
            }
        }
        Ok(())
    }
}

impl Encoder<&[u8]> for TelnetCodec {
    type Error = CodecError;

    /// Encodes raw application bytes, doubling IAC.
    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        for &byte in item {
            if byte == consts::IAC {
                dst.put_u8(consts::IAC);
            }
            dst.put_u8(byte);
        }
        Ok(())
    }
}

fn put_command(dst: &mut BytesMut, command: u8) {
    dst.reserve(2);
    dst.put_u8(consts::IAC);
    dst.put_u8(command);
}

fn put_negotiation(dst: &mut BytesMut, verb: u8, option: TelnetOption) {
    dst.reserve(3);
    dst.put_u8(consts::IAC);
    dst.put_u8(verb);
    dst.put_u8(option.to_u8());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_all(codec: &mut TelnetCodec, mut src: BytesMut) -> Vec<TelnetFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = codec.decode(&mut src).expect("decode should not error") {
            frames.push(frame);
        }
        frames
    }

    fn encode_frame(frame: TelnetFrame) -> BytesMut {
        let mut codec = TelnetCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(frame, &mut dst).expect("encode ok");
        dst
    }

    #[test]
    fn decode_plain_data() {
        let mut codec = TelnetCodec::new();
        let frames = collect_all(&mut codec, BytesMut::from(&b"hi"[..]));
        assert_eq!(frames, vec![TelnetFrame::Data(b'h'), TelnetFrame::Data(b'i')]);
    }

    #[test]
    fn decode_doubled_iac_is_data() {
        let mut codec = TelnetCodec::new();
        let frames = collect_all(&mut codec, BytesMut::from(&[consts::IAC, consts::IAC][..]));
        assert_eq!(frames, vec![TelnetFrame::Data(consts::IAC)]);
    }

    #[test]
    fn decode_negotiation_frames() {
        let mut codec = TelnetCodec::new();
        let src = BytesMut::from(
            &[
                consts::IAC,
                consts::DO,
                consts::option::ECHO,
                consts::IAC,
                consts::WONT,
                consts::option::NAWS,
            ][..],
        );
        assert_eq!(
            collect_all(&mut codec, src),
            vec![
                TelnetFrame::Do(TelnetOption::Echo),
                TelnetFrame::Wont(TelnetOption::WindowSize),
            ]
        );
    }

    #[test]
    fn decode_subnegotiation_with_escaped_iac() {
        let mut codec = TelnetCodec::new();
        let src = BytesMut::from(
            &[
                consts::IAC,
                consts::SB,
                consts::option::NAWS,
                0x00,
                0x50,
                0x00,
                consts::IAC,
                consts::IAC,
                consts::IAC,
                consts::SE,
            ][..],
        );
        assert_eq!(
            collect_all(&mut codec, src),
            vec![TelnetFrame::Subnegotiate(
                TelnetOption::WindowSize,
                vec![0x00, 0x50, 0x00, 0xFF],
            )]
        );
    }

    #[test]
    fn decode_resumes_across_read_boundaries() {
        let mut codec = TelnetCodec::new();
        // the command is split in the middle of IAC DO ECHO
        let mut first = BytesMut::from(&[consts::IAC, consts::DO][..]);
        assert_eq!(codec.decode(&mut first).unwrap(), None);
        let mut second = BytesMut::from(&[consts::option::ECHO][..]);
        assert_eq!(
            codec.decode(&mut second).unwrap(),
            Some(TelnetFrame::Do(TelnetOption::Echo))
        );
    }

    #[test]
    fn decode_unknown_command_yields_noop() {
        let mut codec = TelnetCodec::new();
        let frames = collect_all(&mut codec, BytesMut::from(&[consts::IAC, 0x01, b'x'][..]));
        assert_eq!(frames, vec![TelnetFrame::NoOperation, TelnetFrame::Data(b'x')]);
    }

    #[test]
    fn decode_interrupted_subnegotiation_recovers() {
        let mut codec = TelnetCodec::new();
        let src = BytesMut::from(
            &[
                consts::IAC,
                consts::SB,
                consts::option::CHARSET,
                0x01,
                b'X',
                consts::IAC,
                consts::NOP,
                b'y',
            ][..],
        );
        assert_eq!(
            collect_all(&mut codec, src),
            vec![TelnetFrame::NoOperation, TelnetFrame::Data(b'y')]
        );
    }

    #[test]
    fn encode_data_escapes_iac() {
        assert_eq!(&encode_frame(TelnetFrame::Data(b'A'))[..], &[b'A']);
        assert_eq!(
            &encode_frame(TelnetFrame::Data(consts::IAC))[..],
            &[consts::IAC, consts::IAC]
        );
    }

    #[test]
    fn encode_commands_and_negotiation() {
        assert_eq!(
            &encode_frame(TelnetFrame::AreYouThere)[..],
            &[consts::IAC, consts::AYT]
        );
        assert_eq!(
            &encode_frame(TelnetFrame::Will(TelnetOption::SuppressGoAhead))[..],
            &[consts::IAC, consts::WILL, consts::option::SGA]
        );
    }

    #[test]
    fn encode_subnegotiation_doubles_embedded_iac() {
        let frame = TelnetFrame::Subnegotiate(TelnetOption::WindowSize, vec![0x00, 0xFF]);
        assert_eq!(
            &encode_frame(frame)[..],
            &[
                consts::IAC,
                consts::SB,
                consts::option::NAWS,
                0x00,
                consts::IAC,
                consts::IAC,
                consts::IAC,
                consts::SE,
            ]
        );
    }

    #[test]
    fn encode_raw_bytes() {
        let mut codec = TelnetCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(&[b'a', consts::IAC][..], &mut dst).unwrap();
        assert_eq!(&dst[..], &[b'a', consts::IAC, consts::IAC]);
    }

    #[test]
    fn frame_round_trips_through_both_halves() {
        let frames = vec![
            TelnetFrame::Data(b'k'),
            TelnetFrame::GoAhead,
            TelnetFrame::Dont(TelnetOption::Echo),
            TelnetFrame::Subnegotiate(TelnetOption::TerminalType, vec![1]),
        ];
        let mut codec = TelnetCodec::new();
        let mut wire = BytesMut::new();
        for frame in frames.clone() {
            codec.encode(frame, &mut wire).unwrap();
        }
        assert_eq!(collect_all(&mut codec, wire), frames);
    }

    #[test]
    fn oversized_subnegotiation_is_dropped() {
        let mut codec = TelnetCodec::new();
        let mut wire = BytesMut::from(&[consts::IAC, consts::SB, consts::option::GMCP][..]);
        wire.extend_from_slice(&vec![b'x'; consts::MAX_SB + 8]);
        let frames = collect_all(&mut codec, wire);
        // the overrun byte aborts the frame; the tail decodes as data
        assert_eq!(frames[0], TelnetFrame::NoOperation);
        assert!(frames[1..].iter().all(|f| *f == TelnetFrame::Data(b'x')));
    }
}

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

//! NEW-ENVIRON sub-negotiation, RFC 1572.
//!
//! Records are introduced by VAR or USERVAR and optionally carry a
//! VALUE; ESC escapes any of the four marker bytes inside keys and
//! values. A bare VAR or USERVAR with no key bytes is the "send
//! everything" sentinel, surfaced here as an empty key. Values are
//! decoded with the negotiated charset, falling back to latin-1.

use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use crate::sub::decode_best_effort;
use crate::{TelnetOption, consts::environ, consts::subcmd};

///
/// A decoded NEW-ENVIRON sub-negotiation.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EnvironCmd {
    /// `IS`: the reply to a SEND, carrying `(key, value)` records.
    Is(Vec<(String, String)>),
    /// `INFO`: an unsolicited update, same record format as IS.
    Info(Vec<(String, String)>),
    /// `SEND`: a request for the listed keys. An empty key is the
    /// "send everything" sentinel, which receivers must not oblige.
    Send(Vec<String>),
}

fn is_marker(byte: u8) -> bool {
    matches!(
        byte,
        environ::VAR | environ::VALUE | environ::ESC | environ::USERVAR
    )
}

/// Escapes VAR, VALUE, ESC, and USERVAR bytes with ESC.
pub fn escape(buf: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buf.len());
    for &byte in buf {
        if is_marker(byte) {
            out.push(environ::ESC);
        }
        out.push(byte);
    }
    out
}

/// Splits `buf` at each unescaped occurrence of a byte accepted by
/// `split_on`, dropping the ESC bytes from the returned segments.
fn split_unescaped(buf: &[u8], split_on: impl Fn(u8) -> bool) -> Vec<Vec<u8>> {
    let mut segments = vec![Vec::new()];
    let mut iter = buf.iter().copied();
    while let Some(byte) = iter.next() {
        if byte == environ::ESC {
            if let Some(escaped) = iter.next() {
                segments.last_mut().expect("nonempty").push(escaped);
            }
        } else if split_on(byte) {
            segments.push(Vec::new());
        } else {
            segments.last_mut().expect("nonempty").push(byte);
        }
    }
    segments
}

/// Decodes the record body shared by IS and INFO into ordered
/// `(key, value)` pairs.
fn decode_records(buf: &[u8], encoding: &'static encoding_rs::Encoding) -> Vec<(String, String)> {
    let mut records = Vec::new();
    // First segment precedes any VAR/USERVAR marker and is empty in a
    // well-formed buffer; skip it.
    for record in split_unescaped(buf, |b| b == environ::VAR || b == environ::USERVAR)
        .into_iter()
        .skip(1)
    {
        let mut parts = split_unescaped(&record, |b| b == environ::VALUE).into_iter();
        let key = parts.next().unwrap_or_default();
        let value: Vec<u8> = parts.flatten().collect();
        records.push((
            decode_best_effort(&key, encoding),
            decode_best_effort(&value, encoding),
        ));
    }
    records
}

/// Decodes a NEW-ENVIRON payload (option byte stripped), using
/// `encoding` for text fields.
pub fn decode(payload: &[u8], encoding: &'static encoding_rs::Encoding) -> CodecResult<EnvironCmd> {
    let (&cmd, rest) = payload.split_first().ok_or_else(|| {
        CodecError::subnegotiation(
            TelnetOption::NewEnviron,
            SubnegotiationErrorKind::InsufficientData {
                required: 1,
                available: 0,
            },
        )
    })?;
    match cmd {
        subcmd::IS => Ok(EnvironCmd::Is(decode_records(rest, encoding))),
        subcmd::INFO => Ok(EnvironCmd::Info(decode_records(rest, encoding))),
        subcmd::SEND => {
            let keys = decode_records(rest, encoding)
                .into_iter()
                .map(|(key, _)| key)
                .collect();
            Ok(EnvironCmd::Send(keys))
        }
        other => Err(CodecError::subnegotiation(
            TelnetOption::NewEnviron,
            SubnegotiationErrorKind::InvalidCommand { command: other },
        )),
    }
}

fn encode_records(cmd: u8, records: &[(String, String)]) -> Vec<u8> {
    let mut payload = vec![cmd];
    for (key, value) in records {
        payload.push(environ::VAR);
        payload.extend_from_slice(&escape(key.as_bytes()));
        if !value.is_empty() {
            payload.push(environ::VALUE);
            payload.extend_from_slice(&escape(value.as_bytes()));
        }
    }
    payload
}

/// Encodes an `IS` reply carrying `records`.
pub fn encode_is(records: &[(String, String)]) -> Vec<u8> {
    encode_records(subcmd::IS, records)
}

/// Encodes an unsolicited `INFO` update carrying `records`.
pub fn encode_info(records: &[(String, String)]) -> Vec<u8> {
    encode_records(subcmd::INFO, records)
}

/// Encodes a `SEND` request for `keys`. When `all_var` or
/// `all_uservar` is set, a trailing bare VAR/USERVAR requests every
/// (user) variable.
pub fn encode_send(keys: &[String], all_var: bool, all_uservar: bool) -> Vec<u8> {
    let mut payload = vec![subcmd::SEND];
    for key in keys {
        payload.push(environ::VAR);
        payload.extend_from_slice(&escape(key.as_bytes()));
    }
    if all_var {
        payload.push(environ::VAR);
    }
    if all_uservar {
        payload.push(environ::USERVAR);
    }
    payload
}

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

//! MUD-era sub-negotiation payloads: GMCP, MSDP, MSSP, ATCP, ZMP,
//! and the Aardwolf channel protocol.
//!
//! Text fields decode with the negotiated charset first and latin-1
//! as the fallback, so a server lying about its encoding degrades to
//! mojibake rather than a dropped message.

use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use crate::sub::decode_best_effort;
use crate::{TelnetOption, consts::msdp, consts::mssp};

///
/// A GMCP message: a dotted package name and an optional JSON value.
///
#[derive(Clone, Debug, PartialEq)]
pub struct GmcpMessage {
    /// The package name, e.g. `"Char.Vitals"`.
    pub package: String,
    /// The JSON payload following the first space, when present.
    pub data: Option<serde_json::Value>,
}

impl GmcpMessage {
    /// A message with no data payload.
    pub fn command(package: impl Into<String>) -> Self {
        GmcpMessage {
            package: package.into(),
            data: None,
        }
    }

    /// A message carrying a JSON payload.
    pub fn with_data(package: impl Into<String>, data: serde_json::Value) -> Self {
        GmcpMessage {
            package: package.into(),
            data: Some(data),
        }
    }
}

/// Decodes a GMCP payload. Invalid JSON is a recoverable error.
pub fn gmcp_decode(
    payload: &[u8],
    encoding: &'static encoding_rs::Encoding,
) -> CodecResult<GmcpMessage> {
    match payload.iter().position(|&b| b == b' ') {
        None => Ok(GmcpMessage::command(decode_best_effort(payload, encoding))),
        Some(space) => {
            let package = decode_best_effort(&payload[..space], encoding);
            let body = decode_best_effort(&payload[space + 1..], encoding);
            let data = serde_json::from_str(&body).map_err(|err| {
                CodecError::subnegotiation(
                    TelnetOption::GMCP,
                    SubnegotiationErrorKind::MalformedValue(format!(
                        "invalid JSON in GMCP payload: {err}"
                    )),
                )
            })?;
            Ok(GmcpMessage {
                package,
                data: Some(data),
            })
        }
    }
}

/// Encodes a GMCP payload: the package, then a space and compact JSON
/// when data is present.
pub fn gmcp_encode(message: &GmcpMessage) -> Vec<u8> {
    let mut payload = message.package.as_bytes().to_vec();
    if let Some(data) = &message.data {
        payload.push(b' ');
        payload.extend_from_slice(data.to_string().as_bytes());
    }
    payload
}

///
/// An MSDP value: a scalar string, an ordered table, or an array.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MsdpValue {
    /// A scalar, always carried as text on the wire.
    Str(String),
    /// `TABLE_OPEN .. TABLE_CLOSE`, order-preserving.
    Table(Vec<(String, MsdpValue)>),
    /// `ARRAY_OPEN .. ARRAY_CLOSE`.
    Array(Vec<MsdpValue>),
}

struct MsdpParser<'a> {
    buf: &'a [u8],
    idx: usize,
    encoding: &'static encoding_rs::Encoding,
}

impl<'a> MsdpParser<'a> {
    fn peek(&self) -> Option<u8> {
        self.buf.get(self.idx).copied()
    }

    fn read_until(&mut self, stops: &[u8]) -> String {
        let start = self.idx;
        while self
            .peek()
            .is_some_and(|b| !stops.contains(&b))
        {
            self.idx += 1;
        }
        decode_best_effort(&self.buf[start..self.idx], self.encoding)
    }

    fn read_string(&mut self) -> String {
        self.read_until(&[
            msdp::VAR,
            msdp::VAL,
            msdp::TABLE_CLOSE,
            msdp::ARRAY_CLOSE,
        ])
    }

    fn read_key(&mut self) -> String {
        self.read_until(&[msdp::VAR, msdp::VAL])
    }

    fn parse_table(&mut self) -> Vec<(String, MsdpValue)> {
        let mut table = Vec::new();
        while self.peek().is_some_and(|b| b != msdp::TABLE_CLOSE) {
            if self.peek() == Some(msdp::VAR) {
                self.idx += 1;
                let key = self.read_key();
                if self.peek() == Some(msdp::VAL) {
                    self.idx += 1;
                }
                table.push((key, self.parse_value()));
            } else {
                self.idx += 1;
            }
        }
        if self.peek().is_some() {
            self.idx += 1; // consume TABLE_CLOSE
        }
        table
    }

    fn parse_array(&mut self) -> Vec<MsdpValue> {
        let mut array = Vec::new();
        while self.peek().is_some_and(|b| b != msdp::ARRAY_CLOSE) {
            if self.peek() == Some(msdp::VAL) {
                self.idx += 1;
                array.push(self.parse_value());
            } else {
                // stray byte; a value is only introduced by VAL
                self.idx += 1;
            }
        }
        if self.peek().is_some() {
            self.idx += 1; // consume ARRAY_CLOSE
        }
        array
    }

    fn parse_value(&mut self) -> MsdpValue {
        match self.peek() {
            None => MsdpValue::Str(String::new()),
            Some(msdp::TABLE_OPEN) => {
                self.idx += 1;
                MsdpValue::Table(self.parse_table())
            }
            Some(msdp::ARRAY_OPEN) => {
                self.idx += 1;
                MsdpValue::Array(self.parse_array())
            }
            Some(_) => MsdpValue::Str(self.read_string()),
        }
    }

    fn parse(mut self) -> Vec<(String, MsdpValue)> {
        let mut variables = Vec::new();
        while self.peek().is_some() {
            if self.peek() == Some(msdp::VAR) {
                self.idx += 1;
                let key = self.read_key();
                if self.peek() == Some(msdp::VAL) {
                    self.idx += 1;
                    variables.push((key, self.parse_value()));
                }
            } else {
                self.idx += 1;
            }
        }
        variables
    }
}

/// Decodes an MSDP payload into ordered `(name, value)` pairs.
pub fn msdp_decode(
    payload: &[u8],
    encoding: &'static encoding_rs::Encoding,
) -> Vec<(String, MsdpValue)> {
    MsdpParser {
        buf: payload,
        idx: 0,
        encoding,
    }
    .parse()
}

fn msdp_encode_value(value: &MsdpValue, out: &mut Vec<u8>) {
    match value {
        MsdpValue::Str(text) => out.extend_from_slice(text.as_bytes()),
        MsdpValue::Table(entries) => {
            out.push(msdp::TABLE_OPEN);
            for (key, val) in entries {
                out.push(msdp::VAR);
                out.extend_from_slice(key.as_bytes());
                out.push(msdp::VAL);
                msdp_encode_value(val, out);
            }
            out.push(msdp::TABLE_CLOSE);
        }
        MsdpValue::Array(items) => {
            out.push(msdp::ARRAY_OPEN);
            for item in items {
                out.push(msdp::VAL);
                msdp_encode_value(item, out);
            }
            out.push(msdp::ARRAY_CLOSE);
        }
    }
}

/// Encodes `(name, value)` pairs to MSDP wire format.
pub fn msdp_encode(variables: &[(String, MsdpValue)]) -> Vec<u8> {
    let mut payload = Vec::new();
    for (key, value) in variables {
        payload.push(msdp::VAR);
        payload.extend_from_slice(key.as_bytes());
        payload.push(msdp::VAL);
        msdp_encode_value(value, &mut payload);
    }
    payload
}

///
/// An MSSP value: a single string, or a list when the server repeated
/// VAL under one VAR.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MsspValue {
    /// A single value.
    Single(String),
    /// Repeated values, in wire order.
    List(Vec<String>),
}

/// Decodes an MSSP payload into ordered `(name, value)` pairs; a
/// repeated VAL under a single VAR promotes the value to a list.
pub fn mssp_decode(
    payload: &[u8],
    encoding: &'static encoding_rs::Encoding,
) -> Vec<(String, MsspValue)> {
    let mut variables: Vec<(String, MsspValue)> = Vec::new();
    let mut idx = 0;
    let mut current: Option<usize> = None;
    while idx < payload.len() {
        match payload[idx] {
            b if b == mssp::VAR => {
                idx += 1;
                let start = idx;
                while idx < payload.len() && payload[idx] != mssp::VAL && payload[idx] != mssp::VAR
                {
                    idx += 1;
                }
                let name = decode_best_effort(&payload[start..idx], encoding);
                variables.push((name, MsspValue::List(Vec::new())));
                current = Some(variables.len() - 1);
            }
            b if b == mssp::VAL => {
                idx += 1;
                let start = idx;
                while idx < payload.len() && payload[idx] != mssp::VAL && payload[idx] != mssp::VAR
                {
                    idx += 1;
                }
                let value = decode_best_effort(&payload[start..idx], encoding);
                if let Some(slot) = current {
                    match &mut variables[slot].1 {
                        MsspValue::List(values) => values.push(value),
                        MsspValue::Single(_) => unreachable!("promoted below"),
                    }
                }
            }
            _ => idx += 1,
        }
    }
    // Collapse single-element lists back to scalars.
    variables
        .into_iter()
        .map(|(name, value)| match value {
            MsspValue::List(mut values) if values.len() == 1 => {
                (name, MsspValue::Single(values.remove(0)))
            }
            MsspValue::List(values) if values.is_empty() => {
                (name, MsspValue::Single(String::new()))
            }
            other => (name, other),
        })
        .collect()
}

/// Encodes `(name, value)` pairs to MSSP wire format.
pub fn mssp_encode(variables: &[(String, MsspValue)]) -> Vec<u8> {
    let mut payload = Vec::new();
    for (name, value) in variables {
        payload.push(mssp::VAR);
        payload.extend_from_slice(name.as_bytes());
        match value {
            MsspValue::Single(value) => {
                payload.push(mssp::VAL);
                payload.extend_from_slice(value.as_bytes());
            }
            MsspValue::List(values) => {
                for value in values {
                    payload.push(mssp::VAL);
                    payload.extend_from_slice(value.as_bytes());
                }
            }
        }
    }
    payload
}

/// Decodes an ATCP payload into `(package, value)`, split at the
/// first space. A payload with no space has an empty value.
pub fn atcp_decode(payload: &[u8], encoding: &'static encoding_rs::Encoding) -> (String, String) {
    match payload.iter().position(|&b| b == b' ') {
        Some(space) => (
            decode_best_effort(&payload[..space], encoding),
            decode_best_effort(&payload[space + 1..], encoding),
        ),
        None => (decode_best_effort(payload, encoding), String::new()),
    }
}

/// Encodes an ATCP payload.
pub fn atcp_encode(package: &str, value: &str) -> Vec<u8> {
    let mut payload = package.as_bytes().to_vec();
    if !value.is_empty() {
        payload.push(b' ');
        payload.extend_from_slice(value.as_bytes());
    }
    payload
}

/// Decodes a ZMP payload: NUL-terminated strings with the trailing
/// empty element trimmed. The first element is the command name.
pub fn zmp_decode(payload: &[u8], encoding: &'static encoding_rs::Encoding) -> Vec<String> {
    if payload.is_empty() {
        return Vec::new();
    }
    let mut parts: Vec<&[u8]> = payload.split(|&b| b == 0).collect();
    if parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts
        .into_iter()
        .map(|p| decode_best_effort(p, encoding))
        .collect()
}

/// Encodes a ZMP payload, NUL-terminating every part.
pub fn zmp_encode(parts: &[String]) -> Vec<u8> {
    let mut payload = Vec::new();
    for part in parts {
        payload.extend_from_slice(part.as_bytes());
        payload.push(0);
    }
    payload
}

/// Aardwolf channel names keyed by the selector byte.
fn aardwolf_channel_name(byte: u8) -> Option<&'static str> {
    Some(match byte {
        100 => "status",
        101 => "tick",
        102 => "affect",
        103 => "group",
        104 => "skill",
        105 => "quest",
        106 => "spell",
        107 => "stat",
        108 => "message",
        _ => return None,
    })
}

///
/// A decoded Aardwolf message: a one-byte channel selector with an
/// optional data byte or longer tail.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AardwolfInfo {
    /// The raw channel selector.
    pub channel_byte: u8,
    /// The channel name, or a hex rendering for unassigned selectors.
    pub channel: String,
    /// The single data byte, when the payload is exactly two bytes.
    pub data_byte: Option<u8>,
    /// Everything after the selector.
    pub data_bytes: Vec<u8>,
}

/// Decodes an Aardwolf payload.
pub fn aardwolf_decode(payload: &[u8]) -> AardwolfInfo {
    let Some((&channel_byte, rest)) = payload.split_first() else {
        return AardwolfInfo {
            channel_byte: 0,
            channel: "unknown".to_string(),
            data_byte: None,
            data_bytes: Vec::new(),
        };
    };
    AardwolfInfo {
        channel_byte,
        channel: aardwolf_channel_name(channel_byte)
            .map(str::to_string)
            .unwrap_or_else(|| format!("0x{channel_byte:02x}")),
        data_byte: (rest.len() == 1).then(|| rest[0]),
        data_bytes: rest.to_vec(),
    }
}

/// Encodes an Aardwolf payload.
pub fn aardwolf_encode(channel_byte: u8, data: &[u8]) -> Vec<u8> {
    let mut payload = vec![channel_byte];
    payload.extend_from_slice(data);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;
    use serde_json::json;

    #[test]
    fn gmcp_round_trip_with_data() {
        let message = GmcpMessage::with_data("Char.Vitals", json!({"hp": 100}));
        let payload = gmcp_encode(&message);
        assert_eq!(payload, br#"Char.Vitals {"hp":100}"#);
        assert_eq!(gmcp_decode(&payload, UTF_8).unwrap(), message);
    }

    #[test]
    fn gmcp_command_only() {
        let payload = gmcp_encode(&GmcpMessage::command("Core.Ping"));
        assert_eq!(
            gmcp_decode(&payload, UTF_8).unwrap(),
            GmcpMessage::command("Core.Ping")
        );
    }

    #[test]
    fn gmcp_invalid_json_is_an_error() {
        assert!(gmcp_decode(b"Core.Hello {not json", UTF_8).is_err());
    }

    #[test]
    fn msdp_scalar_round_trip() {
        let variables = vec![("HEALTH".to_string(), MsdpValue::Str("100".to_string()))];
        let payload = msdp_encode(&variables);
        assert_eq!(
            payload,
            [&[msdp::VAR][..], b"HEALTH", &[msdp::VAL][..], b"100"].concat()
        );
        assert_eq!(msdp_decode(&payload, UTF_8), variables);
    }

    #[test]
    fn msdp_nested_round_trip() {
        let variables = vec![(
            "ROOM".to_string(),
            MsdpValue::Table(vec![
                ("VNUM".to_string(), MsdpValue::Str("6008".to_string())),
                (
                    "EXITS".to_string(),
                    MsdpValue::Array(vec![
                        MsdpValue::Str("n".to_string()),
                        MsdpValue::Str("e".to_string()),
                    ]),
                ),
            ]),
        )];
        let payload = msdp_encode(&variables);
        assert_eq!(msdp_decode(&payload, UTF_8), variables);
    }

    #[test]
    fn mssp_single_and_promoted_list() {
        let payload = [
            &[mssp::VAR][..],
            b"NAME",
            &[mssp::VAL][..],
            b"Mud",
            &[mssp::VAR][..],
            b"PORT",
            &[mssp::VAL][..],
            b"4000",
            &[mssp::VAL][..],
            b"4001",
        ]
        .concat();
        let variables = mssp_decode(&payload, UTF_8);
        assert_eq!(
            variables,
            vec![
                ("NAME".to_string(), MsspValue::Single("Mud".to_string())),
                (
                    "PORT".to_string(),
                    MsspValue::List(vec!["4000".to_string(), "4001".to_string()])
                ),
            ]
        );
        assert_eq!(mssp_encode(&variables), payload);
    }

    #[test]
    fn atcp_splits_on_first_space() {
        assert_eq!(
            atcp_decode(b"Auth.Request CH_VERSION 1.0", UTF_8),
            ("Auth.Request".to_string(), "CH_VERSION 1.0".to_string())
        );
        assert_eq!(atcp_decode(b"Ping", UTF_8), ("Ping".to_string(), String::new()));
    }

    #[test]
    fn zmp_round_trip_trims_trailing_empty() {
        let parts = vec!["zmp.ping".to_string(), "now".to_string()];
        let payload = zmp_encode(&parts);
        assert_eq!(payload, b"zmp.ping\x00now\x00");
        assert_eq!(zmp_decode(&payload, UTF_8), parts);
    }

    #[test]
    fn zmp_empty_payload() {
        assert!(zmp_decode(&[], UTF_8).is_empty());
    }

    #[test]
    fn aardwolf_channel_and_data_byte() {
        let info = aardwolf_decode(&[101, 1]);
        assert_eq!(info.channel, "tick");
        assert_eq!(info.data_byte, Some(1));
        assert_eq!(info.data_bytes, vec![1]);
    }

    #[test]
    fn aardwolf_unknown_channel_renders_hex() {
        let info = aardwolf_decode(&[0x2A]);
        assert_eq!(info.channel, "0x2a");
        assert_eq!(info.data_byte, None);
    }
}

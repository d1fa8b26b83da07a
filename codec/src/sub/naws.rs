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

//! Negotiate About Window Size, RFC 1073.

use crate::TelnetOption;
use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use byteorder::{BigEndian, ByteOrder};

///
/// A window size as carried by NAWS.
///
/// The wire order is `cols || rows`, each a big-endian u16; the API
/// order is `(rows, cols)` to match terminfo convention, so the
/// decoder transposes.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WindowSize {
    /// The number of rows (lines) in the terminal window.
    pub rows: u16,
    /// The number of columns (characters) in the terminal window.
    pub cols: u16,
}

impl WindowSize {
    /// Creates a new `WindowSize` with the given dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        WindowSize { rows, cols }
    }

    /// Creates a `WindowSize`, clamping oversized dimensions to the
    /// u16 range the wire format can carry.
    pub fn clamped(rows: u32, cols: u32) -> Self {
        WindowSize {
            rows: rows.min(u32::from(u16::MAX)) as u16,
            cols: cols.min(u32::from(u16::MAX)) as u16,
        }
    }

    /// Decodes the 4-byte NAWS payload (option byte stripped).
    pub fn decode(payload: &[u8]) -> CodecResult<WindowSize> {
        if payload.len() != 4 {
            return Err(CodecError::subnegotiation(
                TelnetOption::WindowSize,
                SubnegotiationErrorKind::InsufficientData {
                    required: 4,
                    available: payload.len(),
                },
            ));
        }
        // Wire format: WIDTH-HIGH WIDTH-LOW HEIGHT-HIGH HEIGHT-LOW
        let cols = BigEndian::read_u16(&payload[0..2]);
        let rows = BigEndian::read_u16(&payload[2..4]);
        Ok(WindowSize { rows, cols })
    }

    /// Encodes the 4-byte payload in wire order. IAC bytes inside the
    /// field are doubled by the interpreter's framing, not here.
    pub fn encode(self) -> [u8; 4] {
        let mut payload = [0u8; 4];
        BigEndian::write_u16(&mut payload[0..2], self.cols);
        BigEndian::write_u16(&mut payload[2..4], self.rows);
        payload
    }
}

impl Default for WindowSize {
    /// The traditional 80x24 terminal.
    fn default() -> Self {
        WindowSize { rows: 24, cols: 80 }
    }
}

impl std::fmt::Display for WindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.rows, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_transposes_wire_order() {
        // 80 columns, 24 rows on the wire.
        let size = WindowSize::decode(&[0x00, 0x50, 0x00, 0x18]).unwrap();
        assert_eq!(size, WindowSize::new(24, 80));
    }

    #[test]
    fn encode_round_trip() {
        let size = WindowSize::new(50, 132);
        assert_eq!(WindowSize::decode(&size.encode()).unwrap(), size);
    }

    #[test]
    fn maximum_dimension_is_transmitted_unchanged() {
        let size = WindowSize::clamped(65535, 65535);
        assert_eq!(size.encode(), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn oversized_dimension_is_clamped() {
        let size = WindowSize::clamped(65536, 70000);
        assert_eq!(size, WindowSize::new(65535, 65535));
    }

    #[test]
    fn short_payload_is_an_error() {
        assert!(WindowSize::decode(&[0x00, 0x50]).is_err());
        assert!(WindowSize::decode(&[]).is_err());
    }

    #[test]
    fn long_payload_is_an_error() {
        assert!(WindowSize::decode(&[0, 80, 0, 24, 0]).is_err());
    }
}

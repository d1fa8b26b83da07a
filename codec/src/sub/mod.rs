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

//! Sub-negotiation payload codecs.
//!
//! Each module is a pure encode/decode pair over the committed SB
//! payload: the option byte onward, with IAC doubling already
//! resolved by the interpreter. Encoders are the bit-exact inverses
//! of their decoders; `IAC SB <opt> ... IAC SE` framing and escaping
//! belong to the interpreter, never to these codecs.

pub mod charset;
pub mod comport;
pub mod environ;
pub mod lflow;
pub mod linemode;
pub mod mud;
pub mod naws;
pub mod sndloc;
pub mod status;
pub mod tspeed;
pub mod ttype;
pub mod xdisploc;

/// Decodes text trying `encoding` first and falling back to latin-1,
/// under which every byte is a valid character. Sub-negotiation
/// payloads are logged and surfaced rather than dropped when a peer
/// declares one charset and sends another.
pub(crate) fn decode_best_effort(buf: &[u8], encoding: &'static encoding_rs::Encoding) -> String {
    let (text, _, malformed) = encoding.decode(buf);
    if !malformed {
        return text.into_owned();
    }
    buf.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_effort_decodes_clean_utf8() {
        assert_eq!(decode_best_effort(b"hello", encoding_rs::UTF_8), "hello");
    }

    #[test]
    fn best_effort_falls_back_to_latin1() {
        // 0xFE is malformed as UTF-8; latin-1 maps it to U+00FE.
        assert_eq!(decode_best_effort(&[0x74, 0xFE], encoding_rs::UTF_8), "t\u{fe}");
    }
}

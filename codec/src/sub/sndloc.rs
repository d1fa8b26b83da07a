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

//! Send Location sub-negotiation, RFC 779. The payload is the bare
//! location string with no sub-command byte.

/// Decodes a SNDLOC payload (option byte stripped).
pub fn decode(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

/// Encodes a location string.
pub fn encode(location: &str) -> Vec<u8> {
    location.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        assert_eq!(decode(&encode("Building 7, Room 42")), "Building 7, Room 42");
    }

    #[test]
    fn empty_location() {
        assert_eq!(decode(&[]), "");
    }
}

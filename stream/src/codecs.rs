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

//! Charset-name resolution for the incremental decoders.
//!
//! Telnet CHARSET negotiation trades names like `UTF-8`, `LATIN1`, or
//! `KOI8-U`. Most resolve through the WHATWG label table built into
//! `encoding_rs`; retro codepages with non-standard names can be
//! registered once at startup. Registration composes into the
//! decoder factory: it is consulted at lookup time, and nothing
//! mutates it behind a connection's back.

use encoding_rs::Encoding;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

fn registry() -> &'static RwLock<HashMap<String, &'static Encoding>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, &'static Encoding>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers `name` as an alias for `encoding`. Intended for startup,
/// before connections exist; names are case-insensitive.
pub fn register_charset(name: &str, encoding: &'static Encoding) {
    registry()
        .write()
        .expect("charset registry poisoned")
        .insert(name.to_ascii_lowercase(), encoding);
}

/// Resolves a negotiated charset name: explicit registrations first,
/// then the WHATWG label table.
pub fn lookup(name: &str) -> Option<&'static Encoding> {
    let registered = registry()
        .read()
        .expect("charset registry poisoned")
        .get(&name.to_ascii_lowercase())
        .copied();
    registered.or_else(|| Encoding::for_label(name.trim().as_bytes()))
}

/// Resolves a name, falling back to UTF-8 for anything unknown.
pub fn lookup_or_utf8(name: &str) -> &'static Encoding {
    lookup(name).unwrap_or(encoding_rs::UTF_8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatwg_labels_resolve() {
        assert_eq!(lookup("UTF-8"), Some(encoding_rs::UTF_8));
        assert_eq!(lookup("KOI8-U"), Some(encoding_rs::KOI8_U));
        assert_eq!(lookup("latin1"), Some(encoding_rs::WINDOWS_1252));
    }

    #[test]
    fn unknown_names_fall_back() {
        assert_eq!(lookup("X-NO-SUCH-CODEC"), None);
        assert_eq!(lookup_or_utf8("X-NO-SUCH-CODEC"), encoding_rs::UTF_8);
    }

    #[test]
    fn registration_is_case_insensitive() {
        register_charset("X-TEST-CP", encoding_rs::IBM866);
        assert_eq!(lookup("x-test-cp"), Some(encoding_rs::IBM866));
    }
}

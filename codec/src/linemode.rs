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

use crate::consts::linemode;

///
/// The LINEMODE MODE bitmask, RFC 1184 §2.2.
///
/// A `Linemode` is a single byte over the EDIT, TRAPSIG, MODE_ACK,
/// SOFT_TAB, and LIT_ECHO bits. Two proposals agree when their masks
/// are equal with the ACK bit ignored; the ACK bit itself only marks
/// a value as an acknowledgement, never as a different mode.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Linemode(u8);

impl Linemode {
    /// Wraps a raw MODE byte. Bits outside the assigned mask are
    /// preserved so that a round-trip is bit-exact.
    pub fn new(mask: u8) -> Self {
        Linemode(mask)
    }

    /// The raw MODE byte.
    pub fn mask(self) -> u8 {
        self.0
    }

    /// Client edits the line locally, transmitting on CR.
    pub fn edit(self) -> bool {
        self.0 & linemode::MODE_EDIT != 0
    }

    /// Signals are trapped locally and forwarded as Telnet commands.
    pub fn trapsig(self) -> bool {
        self.0 & linemode::MODE_TRAPSIG != 0
    }

    /// This value acknowledges a proposal.
    pub fn ack(self) -> bool {
        self.0 & linemode::MODE_ACK != 0
    }

    /// Client expands tabs before transmitting.
    pub fn soft_tab(self) -> bool {
        self.0 & linemode::MODE_SOFT_TAB != 0
    }

    /// Non-printable characters are echoed literally.
    pub fn lit_echo(self) -> bool {
        self.0 & linemode::MODE_LIT_ECHO != 0
    }

    /// The same mode with the ACK bit set, as sent in reply to an
    /// un-acknowledged proposal.
    pub fn with_ack(self) -> Self {
        Linemode(self.0 | linemode::MODE_ACK)
    }

    /// True when `other` proposes the same mode, ignoring ACK.
    pub fn agrees_with(self, other: Linemode) -> bool {
        self.0 | linemode::MODE_ACK == other.0 | linemode::MODE_ACK
    }
}

impl Default for Linemode {
    /// The mode a server proposes on `WILL LINEMODE`: remote editing
    /// with literal echo.
    fn default() -> Self {
        Linemode(linemode::MODE_LIT_ECHO)
    }
}

impl std::fmt::Display for Linemode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 & linemode::MODE_MASK == 0 {
            return write!(f, "remote");
        }
        let mut names = Vec::new();
        if self.edit() {
            names.push("edit");
        }
        if self.trapsig() {
            names.push("trapsig");
        }
        if self.ack() {
            names.push("ack");
        }
        if self.soft_tab() {
            names.push("soft_tab");
        }
        if self.lit_echo() {
            names.push("lit_echo");
        }
        write!(f, "{}", names.join("|"))
    }
}

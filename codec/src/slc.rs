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

//! Special Line Character tables and the LINEMODE forwardmask.
//!
//! An SLC definition binds a line-editing function (interrupt, erase
//! character, transmit-off, ...) to a byte value at a support level.
//! Levels order negotiation: NOSUPPORT and CANTCHANGE are absolute,
//! VARIABLE accepts peer values, DEFAULT defers to the built-in
//! table. The merge rules here are the RFC 1184 §2.4 procedure as
//! implemented by the BSD telnet lineage.

use crate::consts::slc::*;
use crate::consts::{MAX_SLC_REPLY, NUL};
use tracing::{debug, warn};

/// Byte marking an SLC function as disabled in the BSD tables.
const VDISABLE: u8 = 0xFF;

///
/// One SLC definition: a flag byte (level bits plus ACK/FLUSHIN/
/// FLUSHOUT overlays) and the bound character value.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SlcDef {
    mask: u8,
    value: u8,
}

impl SlcDef {
    /// A definition from raw wire bytes.
    pub fn new(mask: u8, value: u8) -> Self {
        SlcDef { mask, value }
    }

    /// The NOSUPPORT definition.
    pub fn nosupport() -> Self {
        SlcDef {
            mask: SLC_NOSUPPORT,
            value: VDISABLE,
        }
    }

    /// A VARIABLE definition bound to `value`.
    pub fn variable(value: u8) -> Self {
        SlcDef {
            mask: SLC_VARIABLE,
            value,
        }
    }

    /// A VARIABLE definition that also requests flushing.
    pub fn variable_flushing(value: u8, flushin: bool, flushout: bool) -> Self {
        let mut mask = SLC_VARIABLE;
        if flushin {
            mask |= SLC_FLUSHIN;
        }
        if flushout {
            mask |= SLC_FLUSHOUT;
        }
        SlcDef { mask, value }
    }

    /// The raw flag byte.
    pub fn mask(self) -> u8 {
        self.mask
    }

    /// The bound character value.
    pub fn value(self) -> u8 {
        self.value
    }

    /// The support level encoded in the low flag bits.
    pub fn level(self) -> u8 {
        self.mask & SLC_LEVELBITS
    }

    /// True for a NOSUPPORT-level definition.
    pub fn is_nosupport(self) -> bool {
        self.level() == SLC_NOSUPPORT
    }

    /// True when the ACK overlay bit is set.
    pub fn ack(self) -> bool {
        self.mask & SLC_ACK != 0
    }

    /// True when the FLUSHIN overlay bit is set.
    pub fn flushin(self) -> bool {
        self.mask & SLC_FLUSHIN != 0
    }

    /// True when the FLUSHOUT overlay bit is set.
    pub fn flushout(self) -> bool {
        self.mask & SLC_FLUSHOUT != 0
    }

    /// Replaces the whole flag byte, clearing any overlay bits not in
    /// `mask`.
    pub fn set_mask(&mut self, mask: u8) {
        self.mask = mask;
    }

    /// Ors a flag bit into the mask.
    pub fn set_flag(&mut self, flag: u8) {
        self.mask |= flag;
    }

    /// Replaces the bound value.
    pub fn set_value(&mut self, value: u8) {
        self.value = value;
    }
}

impl std::fmt::Display for SlcDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.level() {
            SLC_NOSUPPORT => "nosupport",
            SLC_CANTCHANGE => "cantchange",
            SLC_VARIABLE => "variable",
            _ => "default",
        };
        write!(f, "{level}")?;
        if self.ack() {
            write!(f, "|ack")?;
        }
        if self.flushin() {
            write!(f, "|flushin")?;
        }
        if self.flushout() {
            write!(f, "|flushout")?;
        }
        write!(f, " 0x{:02x}", self.value)
    }
}

/// Returns the mnemonic of an SLC function number.
pub fn name_slc_function(func: u8) -> &'static str {
    match func {
        SLC_SYNCH => "SLC_SYNCH",
        SLC_BRK => "SLC_BRK",
        SLC_IP => "SLC_IP",
        SLC_AO => "SLC_AO",
        SLC_AYT => "SLC_AYT",
        SLC_EOR => "SLC_EOR",
        SLC_ABORT => "SLC_ABORT",
        SLC_EOF => "SLC_EOF",
        SLC_SUSP => "SLC_SUSP",
        SLC_EC => "SLC_EC",
        SLC_EL => "SLC_EL",
        SLC_EW => "SLC_EW",
        SLC_RP => "SLC_RP",
        SLC_LNEXT => "SLC_LNEXT",
        SLC_XON => "SLC_XON",
        SLC_XOFF => "SLC_XOFF",
        SLC_FORW1 => "SLC_FORW1",
        SLC_FORW2 => "SLC_FORW2",
        _ => "SLC_UNKNOWN",
    }
}

///
/// Reply accumulator for one incoming `SB LINEMODE SLC` exchange.
///
/// Triplets queue here while the incoming buffer is merged and are
/// flushed in a single `SB LINEMODE SLC ... SE` answer. The buffer is
/// capped; a run of triplets past the cap is dropped with a warning
/// rather than growing without bound.
///
#[derive(Clone, Debug, Default)]
pub struct SlcReply {
    triplets: Vec<(u8, SlcDef)>,
}

impl SlcReply {
    /// An empty reply buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one `(func, flag, value)` triplet.
    pub fn push(&mut self, func: u8, def: SlcDef) {
        if self.triplets.len() >= MAX_SLC_REPLY {
            warn!("SLC reply buffer full, dropping {}", name_slc_function(func));
            return;
        }
        debug!("slc reply ({:<10} {def})", name_slc_function(func));
        self.triplets.push((func, def));
    }

    /// True when nothing was queued.
    pub fn is_empty(&self) -> bool {
        self.triplets.is_empty()
    }

    /// The queued triplets in order.
    pub fn triplets(&self) -> &[(u8, SlcDef)] {
        &self.triplets
    }

    /// Serializes the queued triplets as raw payload bytes.
    pub fn into_payload(self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.triplets.len() * 3);
        for (func, def) in self.triplets {
            payload.extend_from_slice(&[func, def.mask(), def.value()]);
        }
        payload
    }
}

///
/// The per-connection SLC function table.
///
/// Indexed by function number 1..=NSLC; slot 0 exists only so the
/// wildcard function can be addressed uniformly and always holds
/// NOSUPPORT.
///
#[derive(Clone, Debug)]
pub struct SlcTable {
    entries: [SlcDef; NSLC as usize + 1],
}

impl SlcTable {
    /// A table with every function at NOSUPPORT.
    pub fn nosupport() -> Self {
        SlcTable {
            entries: [SlcDef::nosupport(); NSLC as usize + 1],
        }
    }

    /// The BSD-derived default table: the usual termios bindings at
    /// VARIABLE level, with SYNCH, BRK, EOR and the FORW functions
    /// unsupported.
    pub fn bsd() -> Self {
        let mut table = Self::nosupport();
        table.entries[SLC_EOF as usize] = SlcDef::variable(0x04); // ^D
        table.entries[SLC_EC as usize] = SlcDef::variable(0x7F); // DEL
        table.entries[SLC_EL as usize] = SlcDef::variable(0x15); // ^U
        table.entries[SLC_IP as usize] = SlcDef::variable_flushing(0x03, true, true); // ^C
        table.entries[SLC_ABORT as usize] = SlcDef::variable_flushing(0x1C, true, true); // ^\
        table.entries[SLC_XON as usize] = SlcDef::variable(0x11); // ^Q
        table.entries[SLC_XOFF as usize] = SlcDef::variable(0x13); // ^S
        table.entries[SLC_EW as usize] = SlcDef::variable(0x17); // ^W
        table.entries[SLC_RP as usize] = SlcDef::variable(0x12); // ^R
        table.entries[SLC_LNEXT as usize] = SlcDef::variable(0x16); // ^V
        table.entries[SLC_AO as usize] = SlcDef::variable_flushing(0x0F, false, true); // ^O
        table.entries[SLC_SUSP as usize] = SlcDef::variable_flushing(0x1A, true, false); // ^Z
        table.entries[SLC_AYT as usize] = SlcDef::variable(0x14); // ^T
        table
    }

    /// The definition of `func`, or NOSUPPORT when out of range.
    pub fn get(&self, func: u8) -> SlcDef {
        if func as usize >= self.entries.len() {
            return SlcDef::nosupport();
        }
        self.entries[func as usize]
    }

    /// Replaces the definition of `func`. Out-of-range functions are
    /// ignored; they are answered NOSUPPORT at merge time instead.
    pub fn set(&mut self, func: u8, def: SlcDef) {
        if let Some(entry) = self.entries.get_mut(func as usize) {
            *entry = def;
        }
    }

    /// Finds the supported function bound to `byte`, if any. This is
    /// the snoop step applied to in-band bytes in remote and kludge
    /// line discipline.
    pub fn snoop(&self, byte: u8) -> Option<(u8, SlcDef)> {
        (1..=NSLC).find_map(|func| {
            let def = self.get(func);
            (!def.is_nosupport() && def.value() == byte && def.value() != VDISABLE)
                .then_some((func, def))
        })
    }

    /// Queues the supported functions of `table` (our current or
    /// default tab) as reply triplets. Only a server may emit the
    /// wildcard function 0.
    pub fn export(table: &SlcTable, reply: &mut SlcReply) {
        let mut count = 0;
        for func in 1..=NSLC {
            let def = table.get(func);
            if def.is_nosupport() {
                continue;
            }
            reply.push(func, def);
            count += 1;
        }
        debug!("slc export: {count} functions queued");
    }

    ///
    /// Merges one incoming `(func, flag, value)` triplet, mutating
    /// this table and queuing any required answer into `reply`.
    ///
    /// The wildcard function 0 requests a full table export: at
    /// DEFAULT level our default table, at VARIABLE level our current
    /// table. Out-of-range functions are answered NOSUPPORT. For
    /// everything else the level comparison and change rules of
    /// RFC 1184 apply, with the CANTCHANGE/CANTCHANGE degenerate case
    /// falling to NOSUPPORT.
    ///
    pub fn process(&mut self, func: u8, incoming: SlcDef, default_tab: &SlcTable, reply: &mut SlcReply) {
        if func > NSLC {
            warn!("SLC not supported (out of range): {func}");
            reply.push(func, SlcDef::nosupport());
            return;
        }

        if func == NUL {
            match incoming.level() {
                SLC_DEFAULT => Self::export(default_tab, reply),
                SLC_VARIABLE => Self::export(self, reply),
                _ => warn!("SLC wildcard expected DEFAULT or VARIABLE, got {incoming}"),
            }
            return;
        }

        let mine = self.get(func);
        debug!(
            "slc process {:<9} mine={mine}, his={incoming}",
            name_slc_function(func)
        );

        if incoming.level() == mine.level() && incoming.value() == mine.value() {
            return;
        }
        if incoming.level() == mine.level() && incoming.ack() {
            return;
        }
        if incoming.ack() {
            debug!(
                "slc value mismatch with ack bit set: (0x{:02x},0x{:02x})",
                mine.value(),
                incoming.value()
            );
            return;
        }
        self.change(func, incoming, default_tab, reply);
    }

    /// Applies a change the merge rules accepted, answering with the
    /// resulting definition.
    fn change(&mut self, func: u8, incoming: SlcDef, default_tab: &SlcTable, reply: &mut SlcReply) {
        let mine = self.get(func);

        if incoming.level() == SLC_NOSUPPORT {
            // Peer cannot support the function; ack their refusal.
            let mut def = SlcDef::nosupport();
            def.set_flag(SLC_ACK);
            self.set(func, def);
            reply.push(func, def);
            return;
        }

        if incoming.level() == SLC_DEFAULT {
            // Peer wants our default for this function.
            let mut def = mine;
            if mine.level() == SLC_DEFAULT {
                // No real default of our own; degrade to NOSUPPORT.
                def.set_mask(SLC_NOSUPPORT);
            } else {
                def.set_mask(default_tab.get(func).mask());
            }
            def.set_value(incoming.value());
            self.set(func, def);
            reply.push(func, def);
            return;
        }

        if mine.value() != NUL {
            // Peer proposes a new value, or refuses ours; accept
            // theirs and acknowledge.
            let mut accepted = incoming;
            self.set(func, SlcDef::new(incoming.mask(), incoming.value()));
            accepted.set_flag(SLC_ACK);
            reply.push(func, accepted);
            return;
        }

        if mine.level() == SLC_DEFAULT {
            // Our value is unbound and our level is default; store and
            // acknowledge whatever was sent.
            let mut accepted = incoming;
            self.set(func, SlcDef::new(incoming.mask(), incoming.value()));
            accepted.set_flag(SLC_ACK);
            reply.push(func, accepted);
        } else if incoming.level() == SLC_CANTCHANGE && mine.level() == SLC_CANTCHANGE {
            // Neither side can move; degenerate to NOSUPPORT.
            let mut def = mine;
            def.set_mask(SLC_NOSUPPORT);
            self.set(func, def);
            reply.push(func, def);
        } else {
            // Keep our level, dropping any overlay flags; at
            // CANTCHANGE re-assert the default value.
            let mut def = mine;
            def.set_mask(mine.level());
            if mine.level() == SLC_CANTCHANGE {
                def.set_value(default_tab.get(func).value());
            }
            self.set(func, def);
            reply.push(func, def);
        }
    }
}

impl Default for SlcTable {
    fn default() -> Self {
        Self::bsd()
    }
}

///
/// The LINEMODE forwardmask: one bit per byte value, set when the
/// peer must forward that byte verbatim instead of editing it
/// locally. 32 bytes in BINARY mode, 16 otherwise, MSB-first within
/// each byte.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Forwardmask {
    value: Vec<u8>,
}

impl Forwardmask {
    /// Builds a mask from `table`: a bit is set for every byte value
    /// bound to a supported SLC function.
    pub fn generate(table: &SlcTable, binary_mode: bool) -> Self {
        let num_bytes = if binary_mode { 32 } else { 16 };
        let mut value = vec![0u8; num_bytes];
        for (index, byte) in value.iter_mut().enumerate() {
            for bit in 0..8 {
                let ch = (index * 8 + bit) as u8;
                if table.snoop(ch).is_some() {
                    *byte |= 0x80 >> bit;
                }
            }
        }
        Forwardmask { value }
    }

    /// Wraps mask bytes received from the peer.
    pub fn from_bytes(value: Vec<u8>) -> Self {
        Forwardmask { value }
    }

    /// The wire value.
    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// True when `byte` must be forwarded verbatim.
    pub fn contains(&self, byte: u8) -> bool {
        let index = byte as usize / 8;
        self.value
            .get(index)
            .is_some_and(|b| b & (0x80 >> (byte % 8)) != 0)
    }
}

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

use crate::TelnetOption;
use tracing::debug;

///
/// Negotiated state of a single option on one side of the connection.
///
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OptionState {
    /// Never negotiated, or negotiated off.
    #[default]
    Disabled,
    /// Negotiated on.
    Enabled,
    /// Offered and refused by policy; will not be re-offered.
    Rejected,
}

///
/// The verb half of a pending-reply key. A request we have sent and
/// not yet seen answered is recorded as `(verb, option)`.
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PendingVerb {
    /// Sent `IAC DO opt`, awaiting WILL or WONT.
    Do,
    /// Sent `IAC WILL opt`, awaiting DO or DONT.
    Will,
    /// Sent `IAC DONT opt`.
    Dont,
    /// Sent or expecting a sub-negotiation for the option.
    Subnegotiation,
}

impl PendingVerb {
    fn bit(self) -> u8 {
        match self {
            PendingVerb::Do => 1,
            PendingVerb::Will => 2,
            PendingVerb::Dont => 4,
            PendingVerb::Subnegotiation => 8,
        }
    }
}

impl std::fmt::Display for PendingVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingVerb::Do => write!(f, "DO"),
            PendingVerb::Will => write!(f, "WILL"),
            PendingVerb::Dont => write!(f, "DONT"),
            PendingVerb::Subnegotiation => write!(f, "SB"),
        }
    }
}

const ALL_VERBS: [PendingVerb; 4] = [
    PendingVerb::Do,
    PendingVerb::Will,
    PendingVerb::Dont,
    PendingVerb::Subnegotiation,
];

///
/// The three parallel option mappings of the negotiation engine.
///
/// `local` holds what we have agreed to perform, `remote` what the
/// peer has agreed to perform, and `pending` the requests we have
/// sent that still await a reply. All three are indexed by the raw
/// option byte so that unknown options take the same paths as known
/// ones. Entries distinguish "never negotiated" from "negotiated
/// off" for the benefit of the STATUS report.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OptionTable {
    local: [Option<OptionState>; 256],
    remote: [Option<OptionState>; 256],
    pending: [u8; 256],
}

impl Default for OptionTable {
    fn default() -> Self {
        OptionTable {
            local: [None; 256],
            remote: [None; 256],
            pending: [0; 256],
        }
    }
}

impl OptionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `option` on our side.
    pub fn local(&self, option: TelnetOption) -> OptionState {
        self.local[option.to_u8() as usize].unwrap_or_default()
    }

    /// State of `option` on the peer's side.
    pub fn remote(&self, option: TelnetOption) -> OptionState {
        self.remote[option.to_u8() as usize].unwrap_or_default()
    }

    /// True if we have agreed to perform `option`.
    pub fn local_enabled(&self, option: TelnetOption) -> bool {
        self.local(option) == OptionState::Enabled
    }

    /// True if the peer has agreed to perform `option`.
    pub fn remote_enabled(&self, option: TelnetOption) -> bool {
        self.remote(option) == OptionState::Enabled
    }

    /// True once `option` has been negotiated on our side, in either
    /// direction. Distinguishes "never discussed" from "negotiated
    /// off" for the refusal paths.
    pub fn local_negotiated(&self, option: TelnetOption) -> bool {
        self.local[option.to_u8() as usize].is_some()
    }

    /// True once `option` has been negotiated on the peer's side.
    pub fn remote_negotiated(&self, option: TelnetOption) -> bool {
        self.remote[option.to_u8() as usize].is_some()
    }

    /// Records the state of `option` on our side.
    pub fn set_local(&mut self, option: TelnetOption, state: OptionState) {
        let slot = &mut self.local[option.to_u8() as usize];
        if *slot != Some(state) {
            debug!("local[{option}] = {state:?}");
        }
        *slot = Some(state);
    }

    /// Records the state of `option` on the peer's side.
    pub fn set_remote(&mut self, option: TelnetOption, state: OptionState) {
        let slot = &mut self.remote[option.to_u8() as usize];
        if *slot != Some(state) {
            debug!("remote[{option}] = {state:?}");
        }
        *slot = Some(state);
    }

    /// Marks `(verb, option)` as awaiting a reply.
    pub fn set_pending(&mut self, verb: PendingVerb, option: TelnetOption) {
        let slot = &mut self.pending[option.to_u8() as usize];
        if *slot & verb.bit() == 0 {
            debug!("pending[{verb} + {option}] = true");
        }
        *slot |= verb.bit();
    }

    /// Clears `(verb, option)`; returns whether it had been pending.
    pub fn clear_pending(&mut self, verb: PendingVerb, option: TelnetOption) -> bool {
        let slot = &mut self.pending[option.to_u8() as usize];
        let was = *slot & verb.bit() != 0;
        if was {
            debug!("pending[{verb} + {option}] = false");
        }
        *slot &= !verb.bit();
        was
    }

    /// True while `(verb, option)` awaits a reply.
    pub fn pending(&self, verb: PendingVerb, option: TelnetOption) -> bool {
        self.pending[option.to_u8() as usize] & verb.bit() != 0
    }

    /// True while any request awaits a reply. This is the
    /// negotiation-complete predicate, inverted.
    pub fn any_pending(&self) -> bool {
        self.pending.iter().any(|&bits| bits != 0)
    }

    /// Every key still awaiting a reply, for the failed-reply report.
    pub fn pending_keys(&self) -> Vec<(PendingVerb, TelnetOption)> {
        let mut keys = Vec::new();
        for (byte, &bits) in self.pending.iter().enumerate() {
            if bits == 0 {
                continue;
            }
            for verb in ALL_VERBS {
                if bits & verb.bit() != 0 {
                    keys.push((verb, TelnetOption::from_u8(byte as u8)));
                }
            }
        }
        keys
    }

    /// Every option whose local state has been negotiated, in option
    /// byte order. Input to the STATUS IS report.
    pub fn local_entries(&self) -> impl Iterator<Item = (TelnetOption, OptionState)> + '_ {
        self.local
            .iter()
            .enumerate()
            .filter_map(|(byte, state)| state.map(|s| (TelnetOption::from_u8(byte as u8), s)))
    }

    /// Every option whose remote state has been negotiated.
    pub fn remote_entries(&self) -> impl Iterator<Item = (TelnetOption, OptionState)> + '_ {
        self.remote
            .iter()
            .enumerate()
            .filter_map(|(byte, state)| state.map(|s| (TelnetOption::from_u8(byte as u8), s)))
    }

    /// True once BINARY is enabled in both directions.
    pub fn binary_both_ways(&self) -> bool {
        self.local_enabled(TelnetOption::TransmitBinary)
            && self.remote_enabled(TelnetOption::TransmitBinary)
    }

    /// Renders the still-pending keys the way the connect driver
    /// reports them, e.g. `"SB + TTYPE, DO + NAWS"`.
    pub fn describe_pending(&self) -> String {
        self.pending_keys()
            .iter()
            .map(|(verb, option)| format!("{verb} + {option}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_disabled() {
        let table = OptionTable::new();
        assert_eq!(table.local(TelnetOption::Echo), OptionState::Disabled);
        assert!(!table.local_enabled(TelnetOption::Echo));
        assert_eq!(table.local_entries().count(), 0);
    }

    #[test]
    fn set_and_query_states() {
        let mut table = OptionTable::new();
        table.set_local(TelnetOption::Echo, OptionState::Enabled);
        table.set_remote(TelnetOption::WindowSize, OptionState::Rejected);
        assert!(table.local_enabled(TelnetOption::Echo));
        assert_eq!(table.remote(TelnetOption::WindowSize), OptionState::Rejected);
        assert!(!table.remote_enabled(TelnetOption::WindowSize));
    }

    #[test]
    fn pending_lifecycle() {
        let mut table = OptionTable::new();
        assert!(!table.any_pending());
        table.set_pending(PendingVerb::Do, TelnetOption::TerminalType);
        table.set_pending(PendingVerb::Subnegotiation, TelnetOption::TerminalType);
        assert!(table.any_pending());
        assert!(table.pending(PendingVerb::Do, TelnetOption::TerminalType));
        assert!(table.clear_pending(PendingVerb::Do, TelnetOption::TerminalType));
        assert!(!table.clear_pending(PendingVerb::Do, TelnetOption::TerminalType));
        assert_eq!(
            table.pending_keys(),
            vec![(PendingVerb::Subnegotiation, TelnetOption::TerminalType)]
        );
        assert_eq!(table.describe_pending(), "SB + TTYPE");
    }

    #[test]
    fn entries_report_negotiated_options_only() {
        let mut table = OptionTable::new();
        table.set_local(TelnetOption::Echo, OptionState::Enabled);
        table.set_local(TelnetOption::TerminalType, OptionState::Disabled);
        let entries: Vec<_> = table.local_entries().collect();
        assert_eq!(
            entries,
            vec![
                (TelnetOption::Echo, OptionState::Enabled),
                (TelnetOption::TerminalType, OptionState::Disabled),
            ]
        );
    }

    #[test]
    fn binary_both_ways_requires_both_sides() {
        let mut table = OptionTable::new();
        table.set_local(TelnetOption::TransmitBinary, OptionState::Enabled);
        assert!(!table.binary_both_ways());
        table.set_remote(TelnetOption::TransmitBinary, OptionState::Enabled);
        assert!(table.binary_both_ways());
    }
}

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

//! STATUS sub-negotiation, RFC 859.
//!
//! `SEND` asks for the sender's view of the negotiation; `IS` answers
//! with (verb, option) pairs: WILL/WONT for the answering side's
//! local options, DO/DONT for its remote options, omitting STATUS
//! itself. A received IS is verified against our own tables;
//! disagreement is logged and never self-corrects.

use crate::error::{CodecError, CodecResult, SubnegotiationErrorKind};
use crate::table::{OptionState, OptionTable};
use crate::{TelnetOption, consts, consts::subcmd};
use tracing::{debug, error};

///
/// One entry of a STATUS IS report.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusEntry {
    /// DO, DONT, WILL, or WONT.
    pub verb: u8,
    /// The option the verb applies to.
    pub option: TelnetOption,
}

///
/// A decoded STATUS sub-negotiation.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StatusCmd {
    /// `SEND`.
    Send,
    /// `IS` followed by verb/option pairs.
    Is(Vec<StatusEntry>),
}

/// Decodes a STATUS payload (option byte stripped). A trailing odd
/// byte is a decode error; pairs before it are discarded with it.
pub fn decode(payload: &[u8]) -> CodecResult<StatusCmd> {
    let (&cmd, rest) = payload.split_first().ok_or_else(|| {
        CodecError::subnegotiation(
            TelnetOption::Status,
            SubnegotiationErrorKind::InsufficientData {
                required: 1,
                available: 0,
            },
        )
    })?;
    match cmd {
        subcmd::SEND => Ok(StatusCmd::Send),
        subcmd::IS => {
            if rest.len() % 2 != 0 {
                return Err(CodecError::subnegotiation(
                    TelnetOption::Status,
                    SubnegotiationErrorKind::MalformedValue(format!(
                        "STATUS IS with odd pair bytes ({})",
                        rest.len()
                    )),
                ));
            }
            let mut entries = Vec::with_capacity(rest.len() / 2);
            for pair in rest.chunks_exact(2) {
                let verb = pair[0];
                if !matches!(verb, consts::DO | consts::DONT | consts::WILL | consts::WONT) {
                    return Err(CodecError::subnegotiation(
                        TelnetOption::Status,
                        SubnegotiationErrorKind::InvalidCommand { command: verb },
                    ));
                }
                entries.push(StatusEntry {
                    verb,
                    option: TelnetOption::from_u8(pair[1]),
                });
            }
            Ok(StatusCmd::Is(entries))
        }
        other => Err(CodecError::subnegotiation(
            TelnetOption::Status,
            SubnegotiationErrorKind::InvalidCommand { command: other },
        )),
    }
}

/// Encodes `SEND`.
pub fn encode_send() -> Vec<u8> {
    vec![subcmd::SEND]
}

/// Encodes `IS` from explicit entries.
pub fn encode_is(entries: &[StatusEntry]) -> Vec<u8> {
    let mut payload = vec![subcmd::IS];
    for entry in entries {
        payload.push(entry.verb);
        payload.push(entry.option.to_u8());
    }
    payload
}

/// Builds the IS report for our side of `table`: WILL/WONT per
/// negotiated local option, DO/DONT per negotiated remote option,
/// excluding STATUS itself.
pub fn build_report(table: &OptionTable) -> Vec<StatusEntry> {
    let mut entries = Vec::new();
    for (option, state) in table.local_entries() {
        if option == TelnetOption::Status {
            continue;
        }
        entries.push(StatusEntry {
            verb: if state == OptionState::Enabled {
                consts::WILL
            } else {
                consts::WONT
            },
            option,
        });
    }
    for (option, state) in table.remote_entries() {
        if option == TelnetOption::Status {
            continue;
        }
        entries.push(StatusEntry {
            verb: if state == OptionState::Enabled {
                consts::DO
            } else {
                consts::DONT
            },
            option,
        });
    }
    entries
}

/// Checks a received IS report against our tables, logging each
/// disagreement. Returns the number of disagreements; state is never
/// rewritten from a STATUS report.
pub fn verify_report(entries: &[StatusEntry], table: &OptionTable) -> usize {
    let mut mismatches = 0;
    for entry in entries {
        let (enabled, side, agreed) = match entry.verb {
            consts::DO | consts::DONT => {
                let enabled = table.local_enabled(entry.option);
                (
                    enabled,
                    "local",
                    (entry.verb == consts::DO) == enabled,
                )
            }
            consts::WILL | consts::WONT => {
                let enabled = table.remote_enabled(entry.option);
                (
                    enabled,
                    "remote",
                    (entry.verb == consts::WILL) == enabled,
                )
            }
            _ => continue,
        };
        let verb = consts::name_command(entry.verb).unwrap_or("?");
        if agreed {
            debug!("STATUS {verb} {} (agreed)", entry.option);
        } else {
            mismatches += 1;
            error!(
                "STATUS {verb} {}: disagreed, {side} option is {}",
                entry.option,
                if enabled { "enabled" } else { "not enabled" }
            );
        }
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_round_trip() {
        assert_eq!(decode(&encode_send()).unwrap(), StatusCmd::Send);
    }

    #[test]
    fn is_round_trip() {
        let entries = vec![
            StatusEntry {
                verb: consts::WILL,
                option: TelnetOption::Echo,
            },
            StatusEntry {
                verb: consts::DO,
                option: TelnetOption::WindowSize,
            },
        ];
        let payload = encode_is(&entries);
        assert_eq!(decode(&payload).unwrap(), StatusCmd::Is(entries));
    }

    #[test]
    fn report_excludes_status_itself() {
        let mut table = OptionTable::new();
        table.set_local(TelnetOption::Status, OptionState::Enabled);
        table.set_local(TelnetOption::Echo, OptionState::Enabled);
        table.set_remote(TelnetOption::WindowSize, OptionState::Disabled);
        let entries = build_report(&table);
        assert_eq!(
            entries,
            vec![
                StatusEntry {
                    verb: consts::WILL,
                    option: TelnetOption::Echo,
                },
                StatusEntry {
                    verb: consts::DONT,
                    option: TelnetOption::WindowSize,
                },
            ]
        );
    }

    #[test]
    fn verify_counts_disagreements() {
        let mut table = OptionTable::new();
        table.set_local(TelnetOption::Echo, OptionState::Enabled);
        let agreed = vec![StatusEntry {
            verb: consts::DO,
            option: TelnetOption::Echo,
        }];
        assert_eq!(verify_report(&agreed, &table), 0);
        let disagreed = vec![StatusEntry {
            verb: consts::DONT,
            option: TelnetOption::Echo,
        }];
        assert_eq!(verify_report(&disagreed, &table), 1);
    }

    #[test]
    fn odd_pair_bytes_are_an_error() {
        assert!(decode(&[subcmd::IS, consts::WILL]).is_err());
    }

    #[test]
    fn invalid_verb_is_an_error() {
        assert!(decode(&[subcmd::IS, 0x42, 0x01]).is_err());
    }
}

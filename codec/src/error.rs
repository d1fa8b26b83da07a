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

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised by the interpreter and the sub-negotiation codecs.
///
/// All of these are recoverable at the protocol layer: the
/// interpreter logs, discards the offending fragment, and continues.
/// They are surfaced so that callers may account for them, never so
/// that a connection is torn down over a malformed sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// An I/O error surfaced through the framed adapters.
    #[error("I/O error during {operation}: {kind:?}")]
    Io {
        /// The kind of I/O error that occurred.
        kind: std::io::ErrorKind,
        /// Description of the operation that failed.
        operation: String,
    },

    /// An unknown or invalid two-byte Telnet command was encountered.
    #[error("unknown telnet command: 0x{0:02X}")]
    UnknownCommand(u8),

    /// A sub-negotiation was interrupted by a command other than `SE`.
    #[error("SB {option} ({length} bytes) interrupted by IAC {command}")]
    SubnegotiationInterrupted {
        /// The option being sub-negotiated.
        option: TelnetOption,
        /// Bytes buffered when the interruption arrived.
        length: usize,
        /// Mnemonic of the interrupting command.
        command: &'static str,
    },

    /// A sub-negotiation payload exceeded [`crate::consts::MAX_SB`].
    #[error("SB {option} overran {limit} byte buffer")]
    SubnegotiationOverrun {
        /// The option being sub-negotiated.
        option: TelnetOption,
        /// The configured cap.
        limit: usize,
    },

    /// A sub-negotiation payload failed to parse.
    #[error("subnegotiation error for {option}: {reason}")]
    Subnegotiation {
        /// The option being sub-negotiated.
        option: TelnetOption,
        /// Specific reason for the failure.
        reason: SubnegotiationErrorKind,
    },

    /// A command arrived that the current role may not receive, such
    /// as `WILL TM` without a prior `DO TM`.
    #[error("negotiation error: {0}")]
    Negotiation(String),
}

/// Specific kinds of sub-negotiation decode failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubnegotiationErrorKind {
    /// Fewer payload bytes than the format requires.
    #[error("insufficient data (required: {required}, available: {available})")]
    InsufficientData {
        /// Number of bytes required.
        required: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// An unexpected command byte inside the payload.
    #[error("invalid command: 0x{command:02X}")]
    InvalidCommand {
        /// The offending byte.
        command: u8,
    },

    /// A text field failed numeric or character validation.
    #[error("malformed value: {0}")]
    MalformedValue(String),

    /// The sub-command is defined by the RFC but not implemented,
    /// such as the CHARSET translation tables.
    #[error("unsupported subcommand: 0x{command:02X}")]
    Unsupported {
        /// The offending byte.
        command: u8,
    },
}

impl CodecError {
    /// Shorthand constructor for payload decode failures.
    pub fn subnegotiation(option: TelnetOption, reason: SubnegotiationErrorKind) -> Self {
        CodecError::Subnegotiation { option, reason }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io {
            kind: err.kind(),
            operation: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interruption_message_names_option_and_command() {
        let err = CodecError::SubnegotiationInterrupted {
            option: TelnetOption::Charset,
            length: 3,
            command: "WONT",
        };
        assert_eq!(err.to_string(), "SB CHARSET (3 bytes) interrupted by IAC WONT");
    }

    #[test]
    fn insufficient_data_message() {
        let err = CodecError::subnegotiation(
            TelnetOption::WindowSize,
            SubnegotiationErrorKind::InsufficientData {
                required: 4,
                available: 2,
            },
        );
        assert_eq!(
            err.to_string(),
            "subnegotiation error for NAWS: insufficient data (required: 4, available: 2)"
        );
    }
}

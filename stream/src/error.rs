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

use std::sync::Arc;

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors raised by the stream adapters.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// An I/O error from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// EOF arrived before the expected bytes; `partial` holds what
    /// was read.
    #[error("{} bytes read on a total of {expected} expected bytes", .partial.len())]
    IncompleteRead {
        /// The bytes read before EOF.
        partial: Vec<u8>,
        /// The total that was expected, where known.
        expected: usize,
    },

    /// A separator search outgrew the buffer limit; `consumed` bytes
    /// are left unread in the buffer.
    #[error("separator is not found, and chunk exceeds the limit ({consumed} bytes buffered)")]
    LimitOverrun {
        /// Bytes buffered when the limit was hit.
        consumed: usize,
    },

    /// A second read-family call was made while one was outstanding.
    #[error("another read call is already in progress")]
    ReadInProgress,

    /// A byte outside the ASCII range was written without BINARY
    /// having been negotiated. This is a caller error, not a wire
    /// error.
    #[error("byte 0x{byte:02X} at position {pos} requires BINARY; send IAC WILL BINARY first")]
    BinaryRequired {
        /// The offending byte.
        byte: u8,
        /// Its position in the write.
        pos: usize,
    },

    /// `send_iac` was given bytes not beginning with IAC.
    #[error("send_iac requires a complete IAC command")]
    NotAnIacCommand,

    /// The writer has been closed.
    #[error("writer is closed")]
    Closed,

    /// A protocol-core error.
    #[error(transparent)]
    Codec(#[from] telwire_codec::CodecError),

    /// An error stored by the protocol, re-surfaced on every
    /// read-family call and on drain.
    #[error("{0}")]
    Stored(Arc<StreamError>),
}

impl StreamError {
    /// Wraps an error for storage in the reader, so later calls can
    /// re-surface it without consuming it.
    pub fn shared(self) -> Arc<StreamError> {
        match self {
            StreamError::Stored(inner) => inner,
            other => Arc::new(other),
        }
    }
}

impl From<Arc<StreamError>> for StreamError {
    fn from(inner: Arc<StreamError>) -> Self {
        StreamError::Stored(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_read_message() {
        let err = StreamError::IncompleteRead {
            partial: vec![1, 2, 3],
            expected: 10,
        };
        assert_eq!(err.to_string(), "3 bytes read on a total of 10 expected bytes");
    }

    #[test]
    fn shared_does_not_nest() {
        let err = StreamError::Closed.shared();
        let again = StreamError::from(err.clone()).shared();
        assert!(Arc::ptr_eq(&err, &again));
    }
}

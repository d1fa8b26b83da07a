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

//! The minimal transport contract the core writes through.
//!
//! The core never assumes TCP semantics beyond what this trait
//! names. Anything that can carry ordered bytes (a TCP half, a TLS
//! stream, an in-memory duplex pipe) adapts by implementing it.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

///
/// An ordered byte sink with close and flow-control hooks.
///
#[async_trait]
pub trait Transport: Send {
    /// Writes all of `data`.
    async fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Awaits the transport's flow-control signal.
    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// True once the transport is closing or closed.
    fn is_closing(&self) -> bool;

    /// Shuts the transport down. Idempotent.
    async fn close(&mut self) -> io::Result<()>;

    /// Invoked when the reader's buffer crosses its high watermark;
    /// the read loop stops pulling bytes until resumed. Transports
    /// with their own receive window may propagate the signal.
    fn pause_reading(&mut self) {}

    /// Invoked when the reader drains back below its limit and the
    /// read loop resumes.
    fn resume_reading(&mut self) {}

    /// Connection metadata by name (`"peername"`, `"sockname"`, ...).
    fn peer_info(&self, name: &str) -> Option<String> {
        let _ = name;
        None
    }
}

///
/// Adapter over any `AsyncWrite` half: a TCP write half, the write
/// end of a duplex pipe, or a TLS stream.
///
pub struct WriteTransport<W> {
    sink: W,
    closing: bool,
    peername: Option<String>,
}

impl<W> WriteTransport<W> {
    /// Wraps a write half.
    pub fn new(sink: W) -> Self {
        WriteTransport {
            sink,
            closing: false,
            peername: None,
        }
    }

    /// Wraps a write half, recording the peer name reported through
    /// [`Transport::peer_info`].
    pub fn with_peername(sink: W, peername: impl Into<String>) -> Self {
        WriteTransport {
            sink,
            closing: false,
            peername: Some(peername.into()),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Transport for WriteTransport<W> {
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.closing {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "transport closing"));
        }
        self.sink.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.sink.flush().await
    }

    fn is_closing(&self) -> bool {
        self.closing
    }

    async fn close(&mut self) -> io::Result<()> {
        if self.closing {
            return Ok(());
        }
        self.closing = true;
        self.sink.shutdown().await
    }

    fn peer_info(&self, name: &str) -> Option<String> {
        (name == "peername")
            .then(|| self.peername.clone())
            .flatten()
    }
}

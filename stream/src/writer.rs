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

//! The out-bound stream writers.
//!
//! [`TelnetWriter`] escapes application data, enforces the BINARY
//! rule, and shares the interpreter so that protocol replies and
//! application writes leave in one ordered stream.
//! [`TelnetWriterUnicode`] layers an outgoing text encoding resolved
//! per write through a callback.

use crate::codecs;
use crate::error::{StreamError, StreamResult};
use crate::reader::TelnetReader;
use crate::sync::Latch;
use crate::transport::Transport;
use std::sync::{Arc, Mutex};
use telwire_codec::{TelnetInterpreter, TelnetOption, consts, escape_iac};
use tracing::debug;

///
/// The byte-oriented writer.
///
/// Clones share the transport and interpreter. `close` is
/// idempotent: it tears down the transport reference, resolves the
/// closed latch exactly once, and leaves later writes failing with
/// [`StreamError::Closed`].
///
#[derive(Clone)]
pub struct TelnetWriter {
    interp: Arc<Mutex<TelnetInterpreter>>,
    transport: Arc<tokio::sync::Mutex<Option<Box<dyn Transport>>>>,
    reader: TelnetReader,
    closed: Latch,
}

impl TelnetWriter {
    /// Builds a writer over `transport`, sharing `interp` with the
    /// protocol and `reader` for drain-time exception propagation.
    pub fn new(
        interp: Arc<Mutex<TelnetInterpreter>>,
        transport: Box<dyn Transport>,
        reader: TelnetReader,
        closed: Latch,
    ) -> Self {
        TelnetWriter {
            interp,
            transport: Arc::new(tokio::sync::Mutex::new(Some(transport))),
            reader,
            closed,
        }
    }

    /// The shared interpreter, for negotiation requests and option
    /// queries.
    pub fn interpreter(&self) -> Arc<Mutex<TelnetInterpreter>> {
        self.interp.clone()
    }

    /// The latch resolved when this writer closes.
    pub fn closed_latch(&self) -> Latch {
        self.closed.clone()
    }

    /// True once `close` has run.
    pub fn is_closed(&self) -> bool {
        self.closed.is_set()
    }

    /// True while local ECHO is in effect.
    pub fn will_echo(&self) -> bool {
        self.interp
            .lock()
            .expect("interpreter lock")
            .local_enabled(TelnetOption::Echo)
    }

    /// Pushes everything the interpreter has queued out the
    /// transport.
    pub async fn flush_interpreter(&self) -> StreamResult<()> {
        let out = {
            let mut interp = self.interp.lock().expect("interpreter lock");
            if !interp.has_output() {
                return Ok(());
            }
            interp.take_output()
        };
        let mut slot = self.transport.lock().await;
        let transport = slot.as_mut().ok_or(StreamError::Closed)?;
        transport.write(&out).await?;
        Ok(())
    }

    ///
    /// Writes application bytes, doubling IAC.
    ///
    /// Until BINARY is negotiated locally (or the connection was
    /// built with `force_binary`), a byte of 0x80 or above fails with
    /// [`StreamError::BinaryRequired`]; that is a caller error, never
    /// a wire error.
    ///
    pub async fn write(&self, data: &[u8]) -> StreamResult<()> {
        {
            let mut interp = self.interp.lock().expect("interpreter lock");
            if !interp.options().force_binary
                && !interp.local_enabled(TelnetOption::TransmitBinary)
            {
                if let Some(pos) = data.iter().position(|&byte| byte >= 0x80) {
                    return Err(StreamError::BinaryRequired {
                        byte: data[pos],
                        pos,
                    });
                }
            }
            interp.submit_data(&escape_iac(data));
        }
        self.flush_interpreter().await
    }

    /// Writes a complete IAC command verbatim; no escaping, no XOFF
    /// gate.
    pub async fn send_iac(&self, data: &[u8]) -> StreamResult<()> {
        if data.first() != Some(&consts::IAC) {
            return Err(StreamError::NotAnIacCommand);
        }
        self.interp
            .lock()
            .expect("interpreter lock")
            .submit_oob(data);
        self.flush_interpreter().await
    }

    /// Echoes `data` back to the peer, a no-op unless `WILL ECHO` is
    /// in effect.
    pub async fn echo(&self, data: &[u8]) -> StreamResult<()> {
        if self.will_echo() {
            self.write(data).await
        } else {
            Ok(())
        }
    }

    /// Forwards a reader high-watermark crossing to the transport's
    /// [`Transport::pause_reading`] hook.
    pub async fn pause_reading(&self) {
        if let Some(transport) = self.transport.lock().await.as_mut() {
            transport.pause_reading();
        }
    }

    /// Forwards the reader draining below its limit to the
    /// transport's [`Transport::resume_reading`] hook.
    pub async fn resume_reading(&self) {
        if let Some(transport) = self.transport.lock().await.as_mut() {
            transport.resume_reading();
        }
    }

    ///
    /// Propagates any exception stored on the paired reader, then
    /// awaits the transport's flow-control signal.
    ///
    pub async fn drain(&self) -> StreamResult<()> {
        if let Some(err) = self.reader.exception() {
            return Err(err.into());
        }
        let mut slot = self.transport.lock().await;
        let transport = slot.as_mut().ok_or(StreamError::Closed)?;
        transport.flush().await?;
        Ok(())
    }

    ///
    /// Closes the writer: shuts the transport down, drops the
    /// reference so the reader/writer/interpreter cycle is broken,
    /// and resolves the closed latch. Safe to call repeatedly.
    ///
    pub async fn close(&self) {
        let mut slot = self.transport.lock().await;
        if let Some(mut transport) = slot.take() {
            if let Err(err) = transport.close().await {
                debug!("transport close: {err}");
            }
        }
        drop(slot);
        self.closed.set();
    }
}

impl std::fmt::Debug for TelnetWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetWriter")
            .field("closed", &self.closed.is_set())
            .finish()
    }
}

///
/// A unicode view over [`TelnetWriter`].
///
/// Text encodes with the charset resolved per write through the
/// outgoing-encoding callback; the BINARY rule of the byte writer
/// still applies to the encoded bytes.
///
#[derive(Clone)]
pub struct TelnetWriterUnicode {
    bytes: TelnetWriter,
    fn_encoding: Arc<dyn Fn() -> String + Send + Sync>,
}

impl TelnetWriterUnicode {
    /// Wraps `bytes`, resolving the encode charset through
    /// `fn_encoding` at write time.
    pub fn new(bytes: TelnetWriter, fn_encoding: Arc<dyn Fn() -> String + Send + Sync>) -> Self {
        TelnetWriterUnicode { bytes, fn_encoding }
    }

    /// The underlying byte writer.
    pub fn byte_writer(&self) -> &TelnetWriter {
        &self.bytes
    }

    /// Encodes and writes `text`.
    pub async fn write(&self, text: &str) -> StreamResult<()> {
        let name = (self.fn_encoding)();
        let encoding = codecs::lookup_or_utf8(&name);
        let (encoded, _, _) = encoding.encode(text);
        self.bytes.write(&encoded).await
    }

    /// Encodes and echoes `text`, a no-op unless `WILL ECHO` is in
    /// effect.
    pub async fn echo(&self, text: &str) -> StreamResult<()> {
        if self.bytes.will_echo() {
            self.write(text).await
        } else {
            Ok(())
        }
    }

    /// See [`TelnetWriter::drain`].
    pub async fn drain(&self) -> StreamResult<()> {
        self.bytes.drain().await
    }

    /// See [`TelnetWriter::close`].
    pub async fn close(&self) {
        self.bytes.close().await;
    }
}

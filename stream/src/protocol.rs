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

//! Protocol integration: transport bytes in, interpreter, reader and
//! writer out.
//!
//! [`TelnetProtocol`] owns the wiring for one connection: received
//! bytes feed the interpreter byte-at-a-time; queued replies flush to
//! the transport before any in-band byte of the same batch reaches
//! the reader; the application reads from [`TelnetReader`] and
//! writes through [`TelnetWriter`].

use crate::driver::{DriverTimes, drive};
use crate::error::{StreamError, StreamResult};
use crate::reader::{DEFAULT_LIMIT, TelnetReader, TelnetReaderUnicode};
use crate::sync::Latch;
use crate::transport::Transport;
use crate::writer::{TelnetWriter, TelnetWriterUnicode};
use std::future::Future;
use std::sync::{Arc, Mutex};
use telwire_codec::{
    InterpreterOptions, Processed, TelnetHandler, TelnetInterpreter, TelnetOption, TelnetRole,
};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

///
/// Connection setup knobs.
///
#[derive(Clone, Debug)]
pub struct ProtocolConfig {
    /// Reader soft limit.
    pub limit: usize,
    /// Connect-clock bounds; defaults per role when `None`.
    pub times: Option<DriverTimes>,
    /// Interpreter tunables.
    pub interpreter: InterpreterOptions,
    /// Encoding assumed before CHARSET settles; `None` keeps the
    /// unicode views byte-transparent until negotiation.
    pub default_encoding: Option<String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            limit: DEFAULT_LIMIT,
            times: None,
            interpreter: InterpreterOptions::default(),
            default_encoding: Some("UTF-8".to_string()),
        }
    }
}

///
/// The per-connection protocol glue.
///
pub struct TelnetProtocol {
    role: TelnetRole,
    interp: Arc<Mutex<TelnetInterpreter>>,
    reader: TelnetReader,
    writer: TelnetWriter,
    connected: Latch,
    encoding: Latch,
    closed: Latch,
    times: DriverTimes,
    default_encoding: Option<String>,
}

impl TelnetProtocol {
    /// Builds the wiring for one connection.
    pub fn new(
        role: TelnetRole,
        handler: Box<dyn TelnetHandler>,
        transport: Box<dyn Transport>,
        config: ProtocolConfig,
    ) -> Self {
        let times = config.times.unwrap_or(match role {
            TelnetRole::Client => DriverTimes::client(),
            TelnetRole::Server => DriverTimes::server(),
        });
        let interp = Arc::new(Mutex::new(TelnetInterpreter::with_options(
            role,
            handler,
            config.interpreter,
        )));
        let reader = TelnetReader::with_limit(config.limit);
        let closed = Latch::new();
        let writer = TelnetWriter::new(interp.clone(), transport, reader.clone(), closed.clone());
        TelnetProtocol {
            role,
            interp,
            reader,
            writer,
            connected: Latch::new(),
            encoding: Latch::new(),
            closed,
            times,
            default_encoding: config.default_encoding,
        }
    }

    /// A server-side protocol with default configuration.
    pub fn server(handler: Box<dyn TelnetHandler>, transport: Box<dyn Transport>) -> Self {
        Self::new(
            TelnetRole::Server,
            handler,
            transport,
            ProtocolConfig::default(),
        )
    }

    /// A client-side protocol with default configuration.
    pub fn client(handler: Box<dyn TelnetHandler>, transport: Box<dyn Transport>) -> Self {
        Self::new(
            TelnetRole::Client,
            handler,
            transport,
            ProtocolConfig::default(),
        )
    }

    /// The in-band reader handed to the shell.
    pub fn reader(&self) -> TelnetReader {
        self.reader.clone()
    }

    /// The writer handed to the shell.
    pub fn writer(&self) -> TelnetWriter {
        self.writer.clone()
    }

    /// The shared interpreter.
    pub fn interpreter(&self) -> Arc<Mutex<TelnetInterpreter>> {
        self.interp.clone()
    }

    /// Resolved once negotiation completes (or times out).
    pub fn connected_latch(&self) -> Latch {
        self.connected.clone()
    }

    /// Resolved once BINARY is bi-directional or the clock expires.
    pub fn encoding_latch(&self) -> Latch {
        self.encoding.clone()
    }

    /// Resolved once the connection is closed.
    pub fn closed_latch(&self) -> Latch {
        self.closed.clone()
    }

    /// A unicode reader whose decode charset follows CHARSET
    /// negotiation, falling back to the configured default.
    pub fn unicode_reader(&self) -> TelnetReaderUnicode {
        TelnetReaderUnicode::new(self.reader.clone(), self.encoding_fn())
    }

    /// A unicode writer whose encode charset follows CHARSET
    /// negotiation, falling back to the configured default.
    pub fn unicode_writer(&self) -> TelnetWriterUnicode {
        TelnetWriterUnicode::new(self.writer.clone(), self.encoding_fn())
    }

    fn encoding_fn(&self) -> Arc<dyn Fn() -> String + Send + Sync> {
        let interp = self.interp.clone();
        let fallback = self
            .default_encoding
            .clone()
            .unwrap_or_else(|| "UTF-8".to_string());
        Arc::new(move || {
            interp
                .lock()
                .expect("interpreter lock")
                .encoding_name()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.clone())
        })
    }

    ///
    /// Fires the initial option volley. A server advertises its
    /// willingness and solicits the client's metadata; a client
    /// waits to be asked.
    ///
    pub async fn begin_negotiation(&self) -> StreamResult<()> {
        if self.role.is_server() {
            let mut interp = self.interp.lock().expect("interpreter lock");
            debug!("begin_negotiation: server offer");
            interp.request_will(TelnetOption::SuppressGoAhead);
            interp.request_will(TelnetOption::Echo);
            interp.request_will(TelnetOption::TransmitBinary);
            interp.request_do(TelnetOption::TransmitBinary);
            interp.request_do(TelnetOption::TerminalType);
            interp.request_do(TelnetOption::NewEnviron);
            interp.request_do(TelnetOption::WindowSize);
            interp.request_do(TelnetOption::Charset);
        }
        self.writer.flush_interpreter().await
    }

    /// Spawns the connect-time negotiation clock.
    pub fn spawn_driver(&self) -> tokio::task::JoinHandle<Vec<String>> {
        tokio::spawn(drive(
            self.interp.clone(),
            self.times,
            self.connected.clone(),
            self.encoding.clone(),
            self.closed.clone(),
        ))
    }

    ///
    /// Feeds received transport bytes through the interpreter.
    ///
    /// Replies queued while parsing flush to the transport before the
    /// batch's in-band bytes are surfaced to the reader, preserving
    /// the ordering rule that no data byte outruns the reply to the
    /// command preceding it.
    ///
    pub async fn data_received(&self, data: &[u8]) -> StreamResult<()> {
        let mut inband = Vec::with_capacity(data.len());
        {
            let mut interp = self.interp.lock().expect("interpreter lock");
            for &byte in data {
                match interp.feed_byte(byte) {
                    Processed::InBand(byte) => inband.push(byte),
                    Processed::OutOfBand => {}
                    Processed::ParseError(err) => {
                        // already logged; the fragment was discarded
                        debug!("recovered from parse error: {err}");
                    }
                }
            }
        }
        self.writer.flush_interpreter().await?;
        if !inband.is_empty() {
            self.reader.feed_data(&inband);
        }
        Ok(())
    }

    ///
    /// Tears the connection state down: EOF or the error reaches the
    /// reader, and the closed latch resolves. Safe to call more than
    /// once.
    ///
    pub fn connection_lost(&self, err: Option<StreamError>) {
        match err {
            Some(err) => {
                warn!("connection lost: {err}");
                self.reader.set_exception(err.shared());
                self.reader.feed_eof();
            }
            None => {
                debug!("connection closed by peer");
                self.reader.feed_eof();
            }
        }
        self.closed.set();
    }

    ///
    /// Drives a transport read half until EOF, error, or close,
    /// honouring the reader's backpressure signal. Watermark
    /// transitions are forwarded to the transport's
    /// `pause_reading`/`resume_reading` hooks.
    ///
    pub async fn read_loop<R>(&self, mut rx: R) -> StreamResult<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let flow = self.reader.flow_control();
        let mut buf = [0u8; 4096];
        loop {
            if flow.is_paused() {
                self.writer.pause_reading().await;
                tokio::select! {
                    () = flow.wait_resumed() => self.writer.resume_reading().await,
                    () = self.closed.wait() => return Ok(()),
                }
            }
            tokio::select! {
                () = self.closed.wait() => return Ok(()),
                read = rx.read(&mut buf) => match read {
                    Ok(0) => {
                        self.connection_lost(None);
                        return Ok(());
                    }
                    Ok(n) => self.data_received(&buf[..n]).await?,
                    Err(err) => {
                        self.connection_lost(Some(err.into()));
                        return Ok(());
                    }
                },
            }
        }
    }

    ///
    /// Awaits the connected latch, then runs the shell with this
    /// connection's reader and writer, closing on return.
    ///
    pub async fn run_shell<F, Fut>(&self, shell: F) -> StreamResult<()>
    where
        F: FnOnce(TelnetReader, TelnetWriter) -> Fut,
        Fut: Future<Output = StreamResult<()>>,
    {
        self.connected.wait().await;
        let result = shell(self.reader(), self.writer()).await;
        self.writer.close().await;
        result
    }
}

impl std::fmt::Debug for TelnetProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetProtocol")
            .field("role", &self.role)
            .field("connected", &self.connected.is_set())
            .field("closed", &self.closed.is_set())
            .finish()
    }
}

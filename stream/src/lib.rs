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

//! # Telwire Stream Adapters
//!
//! The asynchronous half of the telwire stack: a bounded in-band
//! reader with backpressure, IAC-escaping writers with the BINARY
//! rule and echo gate, the connect-time negotiation clock, and the
//! protocol glue that feeds transport bytes through the
//! [`telwire_codec::TelnetInterpreter`].
//!
//! ## Shape of a connection
//!
//! ```text
//! socket bytes -> TelnetProtocol::data_received -> TelnetInterpreter
//!                      |                              |
//!                      v (in-band)                    v (replies)
//!                 TelnetReader                    transport
//! application <-> reader / TelnetWriter ----------^
//! ```
//!
//! One task per connection drives [`TelnetProtocol::read_loop`]; the
//! shell coroutine reads and writes on the reader/writer pair once
//! the connected latch resolves.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use telwire_codec::NvtHandler;
//! use telwire_stream::{TelnetProtocol, WriteTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let socket = tokio::net::TcpStream::connect("127.0.0.1:23").await?;
//! let (read_half, write_half) = socket.into_split();
//! let protocol = Arc::new(TelnetProtocol::client(
//!     Box::new(NvtHandler),
//!     Box::new(WriteTransport::new(write_half)),
//! ));
//! protocol.begin_negotiation().await?;
//! let driver = protocol.spawn_driver();
//! let loop_protocol = protocol.clone();
//! tokio::spawn(async move { loop_protocol.read_loop(read_half).await });
//!
//! protocol.connected_latch().wait().await;
//! let failed = driver.await?;
//! if !failed.is_empty() {
//!     eprintln!("failed-reply: {}", failed.join(", "));
//! }
//! let reader = protocol.reader();
//! let writer = protocol.writer();
//! writer.write(b"hello\r\n").await?;
//! let line = reader.readline().await?;
//! println!("{}", String::from_utf8_lossy(&line));
//! # Ok(())
//! # }
//! ```

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

pub mod codecs;
mod driver;
mod error;
mod protocol;
mod reader;
mod sync;
mod transport;
mod writer;

pub use self::driver::{CONNECT_DEFERRED, DriverTimes, drive};
pub use self::error::{StreamError, StreamResult};
pub use self::protocol::{ProtocolConfig, TelnetProtocol};
pub use self::reader::{DEFAULT_LIMIT, TelnetReader, TelnetReaderUnicode};
pub use self::sync::{FlowControl, Latch};
pub use self::transport::{Transport, WriteTransport};
pub use self::writer::{TelnetWriter, TelnetWriterUnicode};

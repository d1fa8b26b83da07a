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

//! # Telwire Protocol Core
//!
//! A sans-I/O interpreter for the Telnet wire protocol (RFC 854 and
//! friends) together with its option negotiation engine, line
//! discipline, and the MUD-era sub-negotiation codecs.
//!
//! ## Overview
//!
//! The interpreter converts a raw byte stream into two views: an
//! in-band character stream for the application, and an out-of-band
//! negotiation engine whose state governs encoding, echo, line
//! discipline, window size, terminal metadata, environment variables,
//! and a family of structured MUD sub-negotiations (GMCP, MSDP, MSSP,
//! ATCP, ZMP, AARDWOLF, COM-PORT).
//!
//! ## Core components
//!
//! ### [`TelnetInterpreter`]
//!
//! A byte-at-a-time state machine fed through
//! [`TelnetInterpreter::feed_byte`]. Each byte is classified as
//! [`Processed::InBand`] (application data), [`Processed::OutOfBand`]
//! (protocol), or [`Processed::ParseError`] (protocol, malformed and
//! discarded). Replies demanded by the negotiation rules are queued
//! synchronously and collected with
//! [`TelnetInterpreter::take_output`].
//!
//! ### [`OptionTable`]
//!
//! Three parallel mappings over the option space: our side, the
//! peer's side, and the requests still awaiting a reply. The pending
//! table drives the negotiation-complete predicate used by the
//! connect-time driver.
//!
//! ### [`TelnetHandler`]
//!
//! The per-connection hook trait: command notifications, value
//! providers (terminal type, window size, environment), and the
//! structured MUD message sinks. Every method has a default, so
//! implementations stay small.
//!
//! ### [`TelnetCodec`]
//!
//! A `tokio_util::codec` `Decoder`/`Encoder` pair over the same wire
//! grammar, for `Framed` transports that want raw [`TelnetFrame`]s
//! without the negotiation engine applied.
//!
//! ## Usage Example
//!
//! ```rust
//! use telwire_codec::{Processed, TelnetInterpreter, NvtHandler, TelnetOption};
//!
//! let mut interp = TelnetInterpreter::server(Box::new(NvtHandler));
//! interp.request_do(TelnetOption::TerminalType);
//! let request = interp.take_output(); // IAC DO TTYPE
//! assert_eq!(&request[..], &[0xFF, 0xFD, 24]);
//!
//! // bytes from the peer:
//! for byte in [b'h', b'i', 0xFF, 0xFC, 24] {
//!     match interp.feed_byte(byte) {
//!         Processed::InBand(b) => print!("{}", b as char),
//!         _ => {}
//!     }
//! }
//! assert!(interp.negotiation_complete());
//! ```
//!
//! ## Error handling
//!
//! Malformed wire sequences never tear down a connection: the
//! offending fragment is logged and discarded, and parsing continues
//! with the next byte. [`CodecError`] values surface through
//! [`Processed::ParseError`] for accounting.
//!
//! ## Related RFCs
//!
//! RFC 854 (protocol), 855 (options), 856 (BINARY), 857 (ECHO), 858
//! (SGA), 859 (STATUS), 860 (TM), 885 (EOR), 1073 (NAWS), 1079
//! (TSPEED), 1091 (TTYPE), 1096 (XDISPLOC), 1184 (LINEMODE), 1372
//! (LFLOW), 1572 (NEW-ENVIRON), 2066 (CHARSET), 2217 (COM-PORT).

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

pub mod consts;
mod error;
mod framed;
mod handler;
mod interp;
mod linemode;
mod option;
mod slc;
pub mod sub;
mod table;

pub use self::error::{CodecError, CodecResult, SubnegotiationErrorKind};
pub use self::framed::{TelnetCodec, TelnetFrame};
pub use self::handler::{NvtHandler, TelnetHandler};
pub use self::interp::{
    InterpreterOptions, LineDiscipline, Processed, TelnetInterpreter, TelnetRole, escape_iac,
    unescape_iac,
};
pub use self::linemode::Linemode;
pub use self::option::TelnetOption;
pub use self::slc::{Forwardmask, SlcDef, SlcReply, SlcTable, name_slc_function};
pub use self::sub::naws::WindowSize;
pub use self::table::{OptionState, OptionTable, PendingVerb};

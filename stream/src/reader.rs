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

//! The in-band stream reader.
//!
//! The protocol integration feeds decoded in-band bytes through
//! [`TelnetReader::feed_data`]; the application awaits the
//! read-family methods. The buffer carries a soft limit: crossing
//! twice the limit pauses the transport read loop through
//! [`FlowControl`], and draining back below the limit resumes it.
//!
//! At most one read-family call may be outstanding; a concurrent
//! second call fails with [`StreamError::ReadInProgress`].

use crate::codecs;
use crate::error::{StreamError, StreamResult};
use crate::sync::FlowControl;
use bytes::BytesMut;
use encoding_rs::Decoder;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::debug;

/// Default soft buffer limit.
pub const DEFAULT_LIMIT: usize = 64 * 1024;

#[derive(Debug)]
struct ReaderState {
    buffer: BytesMut,
    limit: usize,
    eof: bool,
    exception: Option<Arc<StreamError>>,
    reading: bool,
}

#[derive(Debug)]
struct ReaderShared {
    state: Mutex<ReaderState>,
    wakeup: Notify,
    flow: FlowControl,
}

///
/// A bounded asynchronous byte reader.
///
/// Clones share the same buffer; the single-reader rule is enforced
/// at call time, not by ownership, so the protocol side can hold a
/// feeding handle while the shell holds the reading one.
///
#[derive(Clone, Debug)]
pub struct TelnetReader {
    inner: Arc<ReaderShared>,
}

impl Default for TelnetReader {
    fn default() -> Self {
        Self::with_limit(DEFAULT_LIMIT)
    }
}

/// Clears the single-reader guard when a read-family call completes
/// or is cancelled.
struct ReadGuard<'a> {
    shared: &'a ReaderShared,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.shared.state.lock().expect("reader lock").reading = false;
    }
}

impl TelnetReader {
    /// A reader with the default soft limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reader with an explicit soft limit.
    pub fn with_limit(limit: usize) -> Self {
        TelnetReader {
            inner: Arc::new(ReaderShared {
                state: Mutex::new(ReaderState {
                    buffer: BytesMut::new(),
                    limit,
                    eof: false,
                    exception: None,
                    reading: false,
                }),
                wakeup: Notify::new(),
                flow: FlowControl::new(),
            }),
        }
    }

    /// The backpressure signal the transport read loop should honour.
    pub fn flow_control(&self) -> FlowControl {
        self.inner.flow.clone()
    }

    /// Appends in-band bytes, pausing the transport above twice the
    /// soft limit.
    pub fn feed_data(&self, data: &[u8]) {
        let mut state = self.lock();
        state.buffer.extend_from_slice(data);
        if state.buffer.len() >= 2 * state.limit && !self.inner.flow.is_paused() {
            debug!("reader buffer {} >= 2*limit, pausing transport", state.buffer.len());
            self.inner.flow.pause();
        }
        drop(state);
        self.inner.wakeup.notify_one();
    }

    /// Marks end of stream.
    pub fn feed_eof(&self) {
        self.lock().eof = true;
        self.inner.wakeup.notify_one();
    }

    /// Stores an exception to surface on the next read-family call.
    pub fn set_exception(&self, err: Arc<StreamError>) {
        let mut state = self.lock();
        if state.exception.is_none() {
            state.exception = Some(err);
        }
        drop(state);
        self.inner.wakeup.notify_one();
    }

    /// The stored exception, if any.
    pub fn exception(&self) -> Option<Arc<StreamError>> {
        self.lock().exception.clone()
    }

    /// True when EOF was fed and the buffer is drained.
    pub fn at_eof(&self) -> bool {
        let state = self.lock();
        state.eof && state.buffer.is_empty()
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.lock().buffer.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReaderState> {
        self.inner.state.lock().expect("reader lock")
    }

    fn begin_read(&self) -> StreamResult<ReadGuard<'_>> {
        let mut state = self.lock();
        if state.reading {
            return Err(StreamError::ReadInProgress);
        }
        state.reading = true;
        Ok(ReadGuard {
            shared: &self.inner,
        })
    }

    fn maybe_resume(&self, state: &ReaderState) {
        if self.inner.flow.is_paused() && state.buffer.len() < state.limit {
            debug!("reader buffer {} < limit, resuming transport", state.buffer.len());
            self.inner.flow.resume();
        }
    }

    /// Waits until the buffer grows past `seen` bytes, EOF arrives,
    /// or an exception is stored. Returns the eof flag.
    async fn wait_change(&self, seen: usize) -> StreamResult<bool> {
        loop {
            let notified = {
                let state = self.lock();
                if let Some(err) = &state.exception {
                    return Err(err.clone().into());
                }
                if state.buffer.len() > seen || state.eof {
                    return Ok(state.eof);
                }
                self.inner.wakeup.notified()
            };
            notified.await;
        }
    }

    ///
    /// Reads up to `n` bytes. With `n == 0` returns an empty buffer
    /// immediately; otherwise waits for at least one byte, or returns
    /// empty at EOF.
    ///
    pub async fn read(&self, n: usize) -> StreamResult<Vec<u8>> {
        let _guard = self.begin_read()?;
        if n == 0 {
            return Ok(Vec::new());
        }
        loop {
            let eof = self.wait_change(0).await?;
            let mut state = self.lock();
            if !state.buffer.is_empty() {
                let take = n.min(state.buffer.len());
                let chunk = state.buffer.split_to(take).to_vec();
                self.maybe_resume(&state);
                return Ok(chunk);
            }
            if eof {
                return Ok(Vec::new());
            }
        }
    }

    /// Reads until EOF and returns everything.
    pub async fn read_to_eof(&self) -> StreamResult<Vec<u8>> {
        let _guard = self.begin_read()?;
        loop {
            let seen = self.lock().buffer.len();
            if self.wait_change(seen).await? {
                let mut state = self.lock();
                let all = state.buffer.split().to_vec();
                self.maybe_resume(&state);
                return Ok(all);
            }
        }
    }

    ///
    /// Reads exactly `n` bytes, failing with
    /// [`StreamError::IncompleteRead`] carrying the partial read if
    /// EOF arrives first.
    ///
    pub async fn read_exactly(&self, n: usize) -> StreamResult<Vec<u8>> {
        let _guard = self.begin_read()?;
        loop {
            let eof = self.wait_change(0).await?;
            let mut state = self.lock();
            if state.buffer.len() >= n {
                let chunk = state.buffer.split_to(n).to_vec();
                self.maybe_resume(&state);
                return Ok(chunk);
            }
            if eof {
                let partial = state.buffer.split().to_vec();
                self.maybe_resume(&state);
                return Err(StreamError::IncompleteRead {
                    partial,
                    expected: n,
                });
            }
            // wait for more than we have
            let seen = state.buffer.len();
            drop(state);
            self.wait_change(seen).await?;
        }
    }

    ///
    /// Reads through the first occurrence of `sep`.
    ///
    /// Fails with [`StreamError::LimitOverrun`] when the chunk would
    /// exceed the soft limit (the buffer is left intact), and with
    /// [`StreamError::IncompleteRead`] when EOF arrives without the
    /// separator (the unread prefix is carried in the error).
    ///
    pub async fn read_until(&self, sep: &[u8]) -> StreamResult<Vec<u8>> {
        assert!(!sep.is_empty(), "separator must not be empty");
        let _guard = self.begin_read()?;
        loop {
            {
                let mut state = self.lock();
                if let Some(err) = &state.exception {
                    return Err(err.clone().into());
                }
                if let Some(pos) = find(&state.buffer, sep) {
                    let end = pos + sep.len();
                    if end > state.limit {
                        return Err(StreamError::LimitOverrun { consumed: end });
                    }
                    let chunk = state.buffer.split_to(end).to_vec();
                    self.maybe_resume(&state);
                    return Ok(chunk);
                }
                if state.buffer.len() > state.limit {
                    return Err(StreamError::LimitOverrun {
                        consumed: state.buffer.len(),
                    });
                }
                if state.eof {
                    let partial = state.buffer.split().to_vec();
                    self.maybe_resume(&state);
                    return Err(StreamError::IncompleteRead {
                        partial,
                        expected: 0,
                    });
                }
            }
            let seen = self.buffered();
            self.wait_change(seen).await?;
        }
    }

    ///
    /// Reads through the first match of `pattern`, with the same
    /// limit and EOF behaviour as [`TelnetReader::read_until`].
    ///
    pub async fn read_until_pattern(&self, pattern: &regex::bytes::Regex) -> StreamResult<Vec<u8>> {
        let _guard = self.begin_read()?;
        loop {
            {
                let mut state = self.lock();
                if let Some(err) = &state.exception {
                    return Err(err.clone().into());
                }
                if let Some(found) = pattern.find(&state.buffer) {
                    let end = found.end();
                    if end > state.limit {
                        return Err(StreamError::LimitOverrun { consumed: end });
                    }
                    let chunk = state.buffer.split_to(end).to_vec();
                    self.maybe_resume(&state);
                    return Ok(chunk);
                }
                if state.buffer.len() > state.limit {
                    return Err(StreamError::LimitOverrun {
                        consumed: state.buffer.len(),
                    });
                }
                if state.eof {
                    let partial = state.buffer.split().to_vec();
                    self.maybe_resume(&state);
                    return Err(StreamError::IncompleteRead {
                        partial,
                        expected: 0,
                    });
                }
            }
            let seen = self.buffered();
            self.wait_change(seen).await?;
        }
    }

    ///
    /// Reads one line, where a line ends with `\n`. At EOF without a
    /// newline the partial line is returned; at EOF with nothing
    /// buffered, an empty buffer.
    ///
    pub async fn readline(&self) -> StreamResult<Vec<u8>> {
        match self.read_until(b"\n").await {
            Ok(line) => Ok(line),
            Err(StreamError::IncompleteRead { partial, .. }) => Ok(partial),
            Err(err) => Err(err),
        }
    }

    /// An async iterator of newline-terminated chunks, ending at EOF.
    pub fn lines(&self) -> impl futures::Stream<Item = StreamResult<Vec<u8>>> + Send {
        futures::stream::unfold((self.clone(), false), |(reader, done)| async move {
            if done {
                return None;
            }
            match reader.readline().await {
                Ok(line) if line.is_empty() => None,
                Ok(line) => Some((Ok(line), (reader, false))),
                Err(err) => Some((Err(err), (reader, true))),
            }
        })
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

///
/// A unicode view over [`TelnetReader`].
///
/// Bytes decode through an incremental decoder whose encoding name is
/// resolved per chunk via a callback, so a CHARSET negotiated
/// mid-connection changes decoding from the next chunk boundary
/// forward. Invalid sequences decode with replacement characters.
///
pub struct TelnetReaderUnicode {
    bytes: TelnetReader,
    fn_encoding: Arc<dyn Fn() -> String + Send + Sync>,
    decoder: Mutex<Option<(String, Decoder)>>,
}

impl TelnetReaderUnicode {
    /// Wraps `bytes`, resolving the decode charset through
    /// `fn_encoding` at read time.
    pub fn new(bytes: TelnetReader, fn_encoding: Arc<dyn Fn() -> String + Send + Sync>) -> Self {
        TelnetReaderUnicode {
            bytes,
            fn_encoding,
            decoder: Mutex::new(None),
        }
    }

    /// The underlying byte reader.
    pub fn byte_reader(&self) -> &TelnetReader {
        &self.bytes
    }

    /// Decodes a chunk with the current encoding; `last` finishes the
    /// decoder, flushing any partial sequence as a replacement.
    fn decode(&self, buf: &[u8], last: bool) -> String {
        let name = (self.fn_encoding)();
        let mut slot = self.decoder.lock().expect("decoder lock");
        let stale = slot
            .as_ref()
            .is_none_or(|(current, _)| *current != name);
        if stale {
            // late-binding: bytes held inside a replaced decoder are
            // lost at the boundary
            *slot = Some((name.clone(), codecs::lookup_or_utf8(&name).new_decoder()));
        }
        let (_, decoder) = slot.as_mut().expect("decoder present");
        let mut out = String::with_capacity(
            decoder
                .max_utf8_buffer_length(buf.len())
                .unwrap_or(buf.len() * 4),
        );
        let _ = decoder.decode_to_string(buf, &mut out, last);
        if last {
            *slot = None;
        }
        out
    }

    /// Reads up to `n` characters, which may consume more than `n`
    /// bytes. With `n == 0` returns an empty string.
    pub async fn read(&self, n: usize) -> StreamResult<String> {
        if n == 0 {
            return Ok(String::new());
        }
        let mut text = String::new();
        while text.chars().count() < n {
            let want = n - text.chars().count();
            let chunk = self.bytes.read(want).await?;
            if chunk.is_empty() {
                text.push_str(&self.decode(&[], true));
                break;
            }
            text.push_str(&self.decode(&chunk, false));
        }
        Ok(text)
    }

    /// Reads until EOF and decodes everything.
    pub async fn read_to_eof(&self) -> StreamResult<String> {
        let all = self.bytes.read_to_eof().await?;
        Ok(self.decode(&all, true))
    }

    /// Reads one line and decodes it; partial lines at EOF decode
    /// like [`TelnetReader::readline`].
    pub async fn readline(&self) -> StreamResult<String> {
        let line = self.bytes.readline().await?;
        Ok(self.decode(&line, true))
    }

    /// Reads exactly `n` characters, failing with the partial text as
    /// bytes when EOF arrives first.
    pub async fn read_exactly(&self, n: usize) -> StreamResult<String> {
        let mut text = String::new();
        let mut remaining = n;
        while remaining > 0 {
            let block = self.read(remaining).await?;
            if block.is_empty() {
                return Err(StreamError::IncompleteRead {
                    partial: text.into_bytes(),
                    expected: n,
                });
            }
            remaining -= block.chars().count();
            text.push_str(&block);
        }
        Ok(text)
    }
}

impl std::fmt::Debug for TelnetReaderUnicode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetReaderUnicode")
            .field("encoding", &(self.fn_encoding)())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn read_returns_available_bytes() {
        let reader = TelnetReader::new();
        reader.feed_data(b"hello");
        assert_eq!(reader.read(3).await.unwrap(), b"hel");
        assert_eq!(reader.read(10).await.unwrap(), b"lo");
    }

    #[tokio::test]
    async fn read_zero_is_empty() {
        let reader = TelnetReader::new();
        assert_eq!(reader.read(0).await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn read_at_eof_is_empty() {
        let reader = TelnetReader::new();
        reader.feed_eof();
        assert_eq!(reader.read(8).await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn read_waits_for_data() {
        let reader = TelnetReader::new();
        let pending = {
            let reader = reader.clone();
            tokio::spawn(async move { reader.read(4).await })
        };
        tokio::task::yield_now().await;
        reader.feed_data(b"late");
        assert_eq!(pending.await.unwrap().unwrap(), b"late");
    }

    #[tokio::test]
    async fn read_exactly_raises_incomplete_at_eof() {
        let reader = TelnetReader::new();
        reader.feed_data(b"abc");
        reader.feed_eof();
        match reader.read_exactly(5).await {
            Err(StreamError::IncompleteRead { partial, expected }) => {
                assert_eq!(partial, b"abc");
                assert_eq!(expected, 5);
            }
            other => panic!("expected IncompleteRead, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_until_finds_separator() {
        let reader = TelnetReader::new();
        reader.feed_data(b"GET / HTTP\r\nrest");
        assert_eq!(reader.read_until(b"\r\n").await.unwrap(), b"GET / HTTP\r\n");
        assert_eq!(reader.buffered(), 4);
    }

    #[tokio::test]
    async fn read_until_eof_without_separator() {
        let reader = TelnetReader::new();
        reader.feed_data(b"partial");
        reader.feed_eof();
        match reader.read_until(b"\n").await {
            Err(StreamError::IncompleteRead { partial, .. }) => assert_eq!(partial, b"partial"),
            other => panic!("expected IncompleteRead, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_until_respects_limit() {
        let reader = TelnetReader::with_limit(8);
        reader.feed_data(b"0123456789abcdef");
        assert!(matches!(
            reader.read_until(b"\n").await,
            Err(StreamError::LimitOverrun { .. })
        ));
    }

    #[tokio::test]
    async fn read_until_pattern_matches() {
        let reader = TelnetReader::new();
        reader.feed_data(b"login: alice\r\npassword:");
        let pattern = regex::bytes::Regex::new(r"(login|password): ").unwrap();
        assert_eq!(reader.read_until_pattern(&pattern).await.unwrap(), b"login: ");
    }

    #[tokio::test]
    async fn readline_returns_partial_at_eof() {
        let reader = TelnetReader::new();
        reader.feed_data(b"no newline");
        reader.feed_eof();
        assert_eq!(reader.readline().await.unwrap(), b"no newline");
        assert_eq!(reader.readline().await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn lines_iterates_until_eof() {
        let reader = TelnetReader::new();
        reader.feed_data(b"one\ntwo\nthree");
        reader.feed_eof();
        let lines: Vec<_> = reader
            .lines()
            .map(|line| line.unwrap())
            .collect::<Vec<_>>()
            .await;
        assert_eq!(lines, vec![b"one\n".to_vec(), b"two\n".to_vec(), b"three".to_vec()]);
    }

    #[tokio::test]
    async fn second_concurrent_read_fails() {
        let reader = TelnetReader::new();
        let blocked = {
            let reader = reader.clone();
            tokio::spawn(async move { reader.read(1).await })
        };
        tokio::task::yield_now().await;
        assert!(matches!(
            reader.read(1).await,
            Err(StreamError::ReadInProgress)
        ));
        reader.feed_data(b"x");
        blocked.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stored_exception_surfaces_on_read() {
        let reader = TelnetReader::new();
        reader.set_exception(StreamError::Closed.shared());
        assert!(matches!(
            reader.read(1).await,
            Err(StreamError::Stored(_))
        ));
        // and again on the next call
        assert!(matches!(
            reader.read(1).await,
            Err(StreamError::Stored(_))
        ));
    }

    #[tokio::test]
    async fn backpressure_pauses_and_resumes() {
        let reader = TelnetReader::with_limit(4);
        let flow = reader.flow_control();
        reader.feed_data(b"0123456789");
        assert!(flow.is_paused(), "buffer >= 2*limit pauses");
        // a read dropping the buffer below the limit resumes
        reader.read(8).await.unwrap();
        assert!(!flow.is_paused());
    }

    #[tokio::test]
    async fn unicode_read_counts_characters() {
        let reader = TelnetReader::new();
        reader.feed_data("héllo".as_bytes());
        let unicode = TelnetReaderUnicode::new(reader, Arc::new(|| "UTF-8".to_string()));
        assert_eq!(unicode.read(2).await.unwrap(), "hé");
    }

    #[tokio::test]
    async fn unicode_invalid_bytes_are_replaced() {
        let reader = TelnetReader::new();
        reader.feed_data(&[0x68, 0xFF, 0x69]);
        reader.feed_eof();
        let unicode = TelnetReaderUnicode::new(reader, Arc::new(|| "UTF-8".to_string()));
        let line = unicode.readline().await.unwrap();
        assert_eq!(line, "h\u{fffd}i");
    }

    #[tokio::test]
    async fn unicode_encoding_switch_applies_per_chunk() {
        use std::sync::atomic::{AtomicBool, Ordering};
        let name = Arc::new(AtomicBool::new(false)); // false = latin-1 flavoured
        let reader = TelnetReader::new();
        let unicode = TelnetReaderUnicode::new(reader.clone(), {
            let name = name.clone();
            Arc::new(move || {
                if name.load(Ordering::Relaxed) {
                    "KOI8-U".to_string()
                } else {
                    "latin1".to_string()
                }
            })
        });
        reader.feed_data(&[0xE6, b'\n']); // latin-1 æ
        assert_eq!(unicode.readline().await.unwrap(), "æ\n");
        name.store(true, Ordering::Relaxed);
        reader.feed_data(&[0xD6, b'\n']); // KOI8-U ж
        assert_eq!(unicode.readline().await.unwrap(), "ж\n");
    }
}

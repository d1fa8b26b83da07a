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

//! The connect-time negotiation clock.
//!
//! After connect, both ends batch option requests. The driver polls
//! the pending table every [`CONNECT_DEFERRED`] and resolves the
//! *connected* latch once no request awaits a reply and at least
//! `minwait` has elapsed; the minimum prevents declaring victory
//! while the peer is still batching. At `maxwait` the latch resolves
//! regardless, and the keys still pending are reported as
//! failed replies so the shell can start against a half-negotiated
//! peer. The *encoding* latch resolves separately, once BINARY is
//! enabled in both directions or at `maxwait`.

use crate::sync::Latch;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use telwire_codec::TelnetInterpreter;
use tokio::time::Instant;
use tracing::debug;

/// The poll interval of the negotiation clock.
pub const CONNECT_DEFERRED: Duration = Duration::from_millis(50);

///
/// Minimum and maximum negotiation windows.
///
#[derive(Clone, Copy, Debug)]
pub struct DriverTimes {
    /// Negotiation is not declared complete before this much time.
    pub minwait: Duration,
    /// Negotiation is forced complete after this much time.
    pub maxwait: Duration,
}

impl DriverTimes {
    /// Client defaults: 1.0 s minimum, 4.0 s maximum.
    pub fn client() -> Self {
        DriverTimes {
            minwait: Duration::from_secs(1),
            maxwait: Duration::from_secs(4),
        }
    }

    /// Server defaults: 0.5 s minimum, 6.0 s maximum.
    pub fn server() -> Self {
        DriverTimes {
            minwait: Duration::from_millis(500),
            maxwait: Duration::from_secs(6),
        }
    }
}

///
/// Runs the negotiation clock until both latches resolve, the
/// deadline passes, or `closed` is set.
///
/// Returns the failed-reply report: the pending keys, rendered as
/// `"VERB + OPTION"`, at the moment `maxwait` elapsed. The report is
/// empty when negotiation completed in time or the connection closed
/// first.
///
pub async fn drive(
    interp: Arc<Mutex<TelnetInterpreter>>,
    times: DriverTimes,
    connected: Latch,
    encoding: Latch,
    closed: Latch,
) -> Vec<String> {
    let started = Instant::now();
    loop {
        let (complete, binary_both) = {
            let interp = interp.lock().expect("interpreter lock");
            (
                interp.negotiation_complete(),
                interp.table().binary_both_ways(),
            )
        };
        let elapsed = started.elapsed();

        if binary_both {
            encoding.set();
        }
        if complete && elapsed >= times.minwait {
            if connected.set() {
                debug!("negotiation complete after {elapsed:?}");
            }
        }
        if elapsed >= times.maxwait {
            let failed: Vec<String> = {
                let interp = interp.lock().expect("interpreter lock");
                interp
                    .failed_replies()
                    .iter()
                    .map(|(verb, option)| format!("{verb} + {option}"))
                    .collect()
            };
            if !failed.is_empty() {
                debug!("failed-reply: {}", failed.join(", "));
            }
            connected.set();
            encoding.set();
            return failed;
        }
        if connected.is_set() && encoding.is_set() {
            return Vec::new();
        }

        tokio::select! {
            () = tokio::time::sleep(CONNECT_DEFERRED) => {}
            () = closed.wait() => {
                // connection torn down mid-negotiation; resolve both
                // latches so waiters are released
                connected.set();
                encoding.set();
                return Vec::new();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telwire_codec::{NvtHandler, TelnetOption};

    fn interp() -> Arc<Mutex<TelnetInterpreter>> {
        Arc::new(Mutex::new(TelnetInterpreter::server(Box::new(NvtHandler))))
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_minwait() {
        let interp = interp();
        let connected = Latch::new();
        let task = tokio::spawn(drive(
            interp,
            DriverTimes::server(),
            connected.clone(),
            Latch::new(),
            Latch::new(),
        ));
        // nothing pending; still must not resolve before minwait
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!connected.is_set());
        tokio::time::sleep(Duration::from_millis(450)).await;
        assert!(connected.is_set());
        let failed = tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .unwrap()
            .unwrap();
        assert!(failed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn maxwait_reports_failed_replies() {
        // S7: the follow-up SB TTYPE never comes back.
        let interp = interp();
        {
            let mut guard = interp.lock().unwrap();
            guard.feed_byte(0xFF);
            guard.feed_byte(0xFB); // WILL
            guard.feed_byte(24); // TTYPE -> request_ttype, pending SB+TTYPE
            guard.take_output();
        }
        let connected = Latch::new();
        let task = tokio::spawn(drive(
            interp,
            DriverTimes::client(),
            connected.clone(),
            Latch::new(),
            Latch::new(),
        ));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(connected.is_set(), "maxwait force-resolves the latch");
        let failed = task.await.unwrap();
        assert_eq!(failed, vec!["SB + TTYPE".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn encoding_latch_follows_binary() {
        let interp = interp();
        {
            let mut guard = interp.lock().unwrap();
            for byte in [0xFFu8, 0xFD, 0x00, 0xFF, 0xFB, 0x00] {
                // DO BINARY, WILL BINARY
                guard.feed_byte(byte);
            }
            guard.take_output();
            assert!(guard.table().binary_both_ways());
        }
        let encoding = Latch::new();
        let task = tokio::spawn(drive(
            interp,
            DriverTimes::server(),
            Latch::new(),
            encoding.clone(),
            Latch::new(),
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(encoding.is_set());
        tokio::time::sleep(Duration::from_secs(1)).await;
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_the_clock() {
        let interp = interp();
        {
            let mut guard = interp.lock().unwrap();
            guard.request_do(TelnetOption::TerminalType);
            guard.take_output();
        }
        let connected = Latch::new();
        let closed = Latch::new();
        let task = tokio::spawn(drive(
            interp,
            DriverTimes::client(),
            connected.clone(),
            Latch::new(),
            closed.clone(),
        ));
        tokio::time::sleep(Duration::from_millis(120)).await;
        closed.set();
        let failed = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("driver exits on close")
            .unwrap();
        assert!(failed.is_empty());
        assert!(connected.is_set());
    }
}

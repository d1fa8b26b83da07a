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

//! Small synchronization primitives shared by the stream adapters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

///
/// A set-exactly-once flag that tasks can await. The connect-time
/// driver resolves the `connected` and `encoding` latches; close
/// resolves the `closed` latch. Setting an already-set latch is a
/// no-op.
///
#[derive(Clone, Debug, Default)]
pub struct Latch {
    inner: Arc<LatchInner>,
}

#[derive(Debug, Default)]
struct LatchInner {
    set: AtomicBool,
    notify: Notify,
}

impl Latch {
    /// A fresh, unset latch.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the latch has been set.
    pub fn is_set(&self) -> bool {
        self.inner.set.load(Ordering::Acquire)
    }

    /// Sets the latch, waking every waiter. Idempotent; returns true
    /// only for the call that performed the transition.
    pub fn set(&self) -> bool {
        let first = !self.inner.set.swap(true, Ordering::AcqRel);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// Waits until the latch is set.
    pub async fn wait(&self) {
        loop {
            if self.is_set() {
                return;
            }
            let notified = self.inner.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

///
/// The reader-to-transport backpressure signal. The reader pauses
/// when its buffer crosses twice the soft limit; the transport read
/// loop parks on [`FlowControl::wait_resumed`] until a read drains
/// the buffer back below the limit.
///
#[derive(Clone, Debug, Default)]
pub struct FlowControl {
    inner: Arc<FlowInner>,
}

#[derive(Debug, Default)]
struct FlowInner {
    paused: AtomicBool,
    notify: Notify,
}

impl FlowControl {
    /// A fresh, running flow control.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while reading is paused.
    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    /// Pauses the transport read loop.
    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::Release);
    }

    /// Resumes the transport read loop.
    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Returns once reading is permitted.
    pub async fn wait_resumed(&self) {
        loop {
            if !self.is_paused() {
                return;
            }
            let notified = self.inner.notify.notified();
            if !self.is_paused() {
                return;
            }
            notified.await;
        }
    }
}

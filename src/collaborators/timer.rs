//  Copyright 2020 Two Sigma Investments, LP.
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

use std::time::{Duration, Instant};
use crate::AppId;

/// Identifies an armed one-shot timer so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// What fires when a timer expires. The original design passes a raw
/// context pointer and a completion callback to the timer service; since the
/// only two timers in this core each own exactly one piece of context (the
/// app they're tied to, or nothing at all), we model the callback as a plain
/// enum instead of a function pointer plus `void*` — same one-shot,
/// fire-and-forget contract, fewer moving parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// `kill_timer` expiry: escalate `AppId` from soft-kill to hard-kill.
    HardKillApp(AppId),
    /// Bootstrap's reboot-fault quiescence timer.
    RebootFaultQuiescence,
}

/// One-shot timers with a completion event, dispatched by the host event
/// loop (§6, "Timer service (consumed)"). Out of scope for this crate to
/// implement against a real clock source; a deterministic one
/// (`ManualTimerService`) is provided under `testing` for driving the
/// scenarios in §8 without a real event loop.
pub trait TimerService {
    /// Arms a one-shot timer that fires `event` after `delay`.
    fn arm_one_shot(&mut self, delay: Duration, event: TimerEvent) -> TimerId;

    /// Cancels a previously armed timer. No-op if it already fired or was
    /// already cancelled.
    fn cancel(&mut self, id: TimerId);

    /// Called by the host event loop: returns every event whose deadline is
    /// `<= now`, removing them from the pending set.
    fn poll_expired(&mut self, now: Instant) -> Vec<TimerEvent>;
}
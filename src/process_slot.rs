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

//! `ProcessSlot` (§3, §4.4, design note "Slot ↔ ProcessRunner coupling").
//!
//! Pairs a process handle with an optional stop-completion continuation: a
//! one-shot action to take the next time this process stops cleanly
//! (currently always "relaunch it"). Modelled as a tagged variant rather
//! than a boxed closure — the only continuation this core ever attaches is
//! `StartProc`, so a closure would buy generality nothing here uses.

use crate::collaborators::{ProcHandle, ProcessRunner};

/// A one-shot continuation attached to a [`ProcessSlot`], consumed the next
/// time the process is reaped with `ProcFaultAction::NoFault` (a deliberate
/// stop, not a crash).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopHandler {
    /// Relaunch the process (used by the watchdog-default path and by
    /// restart-on-clean-stop scenarios).
    StartProc,
}

pub struct ProcessSlot {
    handle: ProcHandle,
    stop_handler: Option<StopHandler>,
}

impl ProcessSlot {
    pub fn new(handle: ProcHandle) -> Self {
        Self { handle, stop_handler: None }
    }

    pub fn handle(&self) -> ProcHandle {
        self.handle
    }

    pub fn name<'a>(&self, runner: &'a dyn ProcessRunner) -> &'a str {
        runner.name(self.handle)
    }

    /// Sets the pending continuation, overwriting any previous one. Setting
    /// at most once per stop cycle is the caller's responsibility (enforced
    /// by `KillEngine` clearing it before every new stop attempt).
    pub fn set_stop_handler(&mut self, handler: StopHandler) {
        self.stop_handler = Some(handler);
    }

    pub fn clear_stop_handler(&mut self) {
        self.stop_handler = None;
    }

    /// Consumes the pending continuation, if any — it is one-shot and
    /// cannot fire twice.
    pub fn take_stop_handler(&mut self) -> Option<StopHandler> {
        self.stop_handler.take()
    }
}
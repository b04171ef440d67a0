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

//! `Bootstrap` (§4.1): process-wide one-shot initialization.
//!
//! The object pool and the reboot-fault quiescence timer are process-wide by
//! construction (SPEC_FULL.md design notes) — they are initialized once, at
//! startup, and never torn down. `init` is the only place that arms the
//! quiescence timer; everything else in this crate only ever reacts to it.

use log::{info, warn};

use crate::collaborators::{TimerEvent, TimerService};
use crate::consts::REBOOT_FAULT_QUIESCENCE;
use crate::reboot_fault::RebootFaultRecord;

/// Arms the 120s reboot-fault quiescence timer. Called exactly once, from
/// [`crate::supervisor::Supervisor::new`]. Process-runner initialization is
/// the embedder's responsibility — the collaborator is handed to this crate
/// already usable, per the Non-goals around process execution.
///
/// Does not touch logging: installing [`crate::logger`] as the process-wide
/// `log` backend is a separate, one-time-per-process decision the embedder
/// makes on its own before this runs, not something this crate does for it.
pub fn init(timers: &mut dyn TimerService) {
    timers.arm_one_shot(REBOOT_FAULT_QUIESCENCE, TimerEvent::RebootFaultQuiescence);
}

/// The quiescence timer's completion handler: unlink the reboot-fault
/// record. `ENOENT` is not an error.
pub fn handle_quiescence(record: &RebootFaultRecord) {
    match record.clear() {
        Ok(()) => info!("reboot-fault quiescence elapsed, record cleared"),
        Err(e) => warn!("failed to clear reboot-fault record at quiescence: {:#}", e),
    }
}

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

//! The fault-rate limiter (§4.5). A pure function over the process's
//! current fault action and two points in time (plus, for `REBOOT`, the
//! reboot-fault record) — no state of its own.

use crate::collaborators::ProcFaultAction;
use crate::consts::{FAULT_LIMIT_RESTART, FAULT_LIMIT_RESTART_APP};
use crate::reboot_fault::RebootFaultRecord;

/// Has `proc_action` exceeded its rate window, given `now_fault_time` (the
/// process's fault timestamp *after* the runner just updated it) and
/// `prev_fault_time` (the timestamp captured immediately before delegating
/// to the runner)?
///
/// Open Question 2 (see DESIGN.md): the original C reads
/// `proc_GetFaultTime(procRef)` *after* `SigChildHandler` has already
/// updated it, and compares that against the previously-captured value.
/// This function preserves that behavior deliberately — `now_fault_time`
/// must be the post-update value, not a fresh read taken at this call site.
pub fn reached_limit(
    proc_action: ProcFaultAction,
    now_fault_time: u64,
    prev_fault_time: u64,
    reboot_record: &RebootFaultRecord,
    app_name: &str,
    proc_name: &str,
) -> bool {
    match proc_action {
        ProcFaultAction::Restart => within_window(now_fault_time, prev_fault_time, FAULT_LIMIT_RESTART),
        ProcFaultAction::RestartApp => within_window(now_fault_time, prev_fault_time, FAULT_LIMIT_RESTART_APP),
        ProcFaultAction::Reboot => reboot_record.is_for(app_name, proc_name),
        _ => false,
    }
}

fn within_window(now_fault_time: u64, prev_fault_time: u64, window: std::time::Duration) -> bool {
    if prev_fault_time == 0 {
        return false;
    }
    match now_fault_time.checked_sub(prev_fault_time) {
        Some(delta) => delta <= window.as_secs(),
        None => false,
    }
}

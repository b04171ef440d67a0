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

//! `KillEngine` (§4.3): two-phase soft/hard stop — freeze, signal, thaw.

use log::warn;
use nix::sys::signal::Signal;

use crate::app::{App, Collaborators};
use crate::collaborators::{FreezeState, ProcState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillMode {
    Soft,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    Ok,
    NotFound,
}

/// `KillAppProcs(app, mode) → Ok | NotFound` (§4.3).
pub fn kill_app_procs(app: &mut App, mode: KillMode, c: &mut Collaborators) -> KillOutcome {
    let cgroup_name = app.name().to_string();

    if let Err(e) = c.cgroup.freeze(&cgroup_name) {
        warn!("freeze failed for {}: {:#}", cgroup_name, e);
    } else {
        loop {
            match c.cgroup.state(&cgroup_name) {
                Ok(FreezeState::Freezing) => continue,
                Ok(_) => break,
                Err(e) => {
                    warn!("reading freeze state for {} failed: {:#}", cgroup_name, e);
                    break;
                }
            }
        }
    }

    for slot in app.processes_mut() {
        if c.process_runner.state(slot.handle()) != ProcState::Stopped {
            slot.clear_stop_handler();
            c.process_runner.stopping(slot.handle());
        }
    }

    let signo = match mode {
        KillMode::Soft => Signal::SIGTERM,
        KillMode::Hard => Signal::SIGKILL,
    };

    let signalled = match c.cgroup.send_sig(&cgroup_name, signo) {
        Ok(count) => count,
        Err(e) => {
            warn!("signal broadcast into {} failed: {:#}", cgroup_name, e);
            0
        }
    };

    if let Err(e) = c.cgroup.thaw(&cgroup_name) {
        warn!("thaw failed for {}: {:#}", cgroup_name, e);
    }

    if signalled == 0 {
        KillOutcome::NotFound
    } else {
        KillOutcome::Ok
    }
}

/// `HardKillApp(timer)` (§4.3): the `kill_timer` expiry callback.
pub fn hard_kill_app(app: &mut App, c: &mut Collaborators) {
    app.clear_kill_timer();
    kill_app_procs(app, KillMode::Hard, c);
}

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

use std::path::Path;
use nix::unistd::{Gid, Pid, Uid};

/// Opaque handle to a process known to the process runner. The supervisor
/// never looks inside it; it is a capability for calling back into the
/// runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcHandle(pub u64);

/// Lifecycle state of a single process, as reported by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Stopped,
    Running,
    Paused,
}

/// Process-level verdict on a `SIGCHLD` exit, returned by
/// [`ProcessRunner::sig_child_handler`]. `FaultRouter` escalates this to an
/// app-level [`crate::FaultAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcFaultAction {
    /// The process was deliberately stopped (e.g. by `KillEngine`); not a crash.
    NoFault,
    Ignore,
    Restart,
    RestartApp,
    StopApp,
    Reboot,
}

/// Process-level verdict on a watchdog timeout, as configured for this
/// process (or resolved from the app's `watchdogAction` string when the
/// process declares none).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcWatchdogAction {
    NotFound,
    Ignore,
    Stop,
    Restart,
    RestartApp,
    StopApp,
    Reboot,
    Error,
    Handled,
}

impl ProcWatchdogAction {
    /// Parses the app-level `watchdogAction` config string, used as a
    /// fallback when a process declares no watchdog policy of its own
    /// (§4.4.2 step 2). Unrecognized strings map to `Error`, matching the
    /// original's "parsing fails -> ERROR" behavior.
    pub fn parse_config_str(s: &str) -> ProcWatchdogAction {
        match s {
            "ignore" => ProcWatchdogAction::Ignore,
            "stop" => ProcWatchdogAction::Stop,
            "restart" => ProcWatchdogAction::Restart,
            "restartApp" => ProcWatchdogAction::RestartApp,
            "stopApp" => ProcWatchdogAction::StopApp,
            "reboot" => ProcWatchdogAction::Reboot,
            _ => ProcWatchdogAction::Error,
        }
    }
}

/// The process runner: launches a single process, knows its pid, and tracks
/// its fault/watchdog policy (§6, "Process runner (consumed)"). Out of scope
/// for this crate — the supervisor only calls through this trait.
pub trait ProcessRunner {
    /// Creates a process handle for the process configured at
    /// `proc_cfg_path`, bound to `app_name`. Does not start it.
    fn create(&mut self, proc_cfg_path: &str, app_name: &str) -> anyhow::Result<ProcHandle>;

    /// Starts a non-sandboxed process rooted at `root_dir`.
    fn start(&mut self, handle: ProcHandle, root_dir: &Path) -> anyhow::Result<()>;

    /// Starts a sandboxed process rooted at `/` inside `sandbox_path`, under
    /// the given uid/gid/supplementary-group set.
    fn start_in_sandbox(
        &mut self,
        handle: ProcHandle,
        uid: Uid,
        gid: Gid,
        supplementary_gids: &[Gid],
        sandbox_path: &Path,
    ) -> anyhow::Result<()>;

    /// Releases the handle. The process must already be stopped.
    fn delete(&mut self, handle: ProcHandle);

    fn pid(&self, handle: ProcHandle) -> Option<Pid>;

    fn name(&self, handle: ProcHandle) -> &str;

    fn state(&self, handle: ProcHandle) -> ProcState;

    /// Unix time (seconds) of the process's last recorded fault, or 0 if none.
    fn fault_time(&self, handle: ProcHandle) -> u64;

    /// The process's own watchdog policy, or `NotFound` if it declares none.
    fn watchdog_action(&self, handle: ProcHandle) -> ProcWatchdogAction;

    /// Arms the "deliberate kill" flag so the runner does not treat the
    /// process's imminent exit as a fault when it is next reaped.
    fn stopping(&mut self, handle: ProcHandle);

    /// Delivers a reaped exit status to the runner and returns the
    /// process-level fault verdict. Updates the process's own fault-time
    /// bookkeeping as a side effect.
    fn sig_child_handler(&mut self, handle: ProcHandle, exit_status: i32) -> ProcFaultAction;
}
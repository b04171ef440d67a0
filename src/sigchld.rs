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

//! Turns kernel `SIGCHLD` delivery into the "child-exit notification" event
//! that §5 says the supervisor's single execution context dispatches.
//!
//! This core never blocks waiting for a child (§5: "non-blocking... the
//! runner is responsible for not blocking the event loop"), so unlike the
//! teacher's `monitor_app` — which calls the blocking `nix::sys::wait::wait`
//! in a dedicated loop — this watcher only flips an [`AtomicBool`] from the
//! signal handler (the one async-signal-safe thing to do) and leaves the
//! actual reaping, via non-blocking `waitpid(..., WNOHANG)`, to whatever the
//! host event loop calls when it observes the flag set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// Registers the process-wide `SIGCHLD` flag. Safe to call once per process;
/// the embedder owns the returned watcher and polls it from its event loop
/// alongside [`crate::collaborators::TimerService::poll_expired`].
pub struct SigChldWatcher {
    flag: Arc<AtomicBool>,
}

impl SigChldWatcher {
    /// Installs the signal handler. Mirrors the teacher's use of
    /// `signal_hook` for process-wide signal plumbing, but through the safe
    /// `flag` API rather than the raw `register` the teacher uses to
    /// forward signals into a child pid — there is nothing unsafe to do
    /// here, just set a bit.
    pub fn install() -> Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(Signal::SIGCHLD as i32, Arc::clone(&flag))
            .context("registering SIGCHLD handler")?;
        Ok(Self { flag })
    }

    /// True if at least one `SIGCHLD` has arrived since the last `reap_all`.
    pub fn is_pending(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Drains every exited child currently reapable with `WNOHANG`, clearing
    /// the pending flag first so a signal arriving mid-drain is not lost
    /// (it re-sets the flag and the next poll drains it again). Returns
    /// `(pid, exit_status)` pairs in the encoding the teacher's own
    /// `monitor_app` uses: a normal exit carries its exit code verbatim, a
    /// fatal signal carries `128 + signal`.
    pub fn reap_all(&self) -> Vec<(Pid, i32)> {
        self.flag.store(false, Ordering::SeqCst);

        let mut reaped = Vec::new();
        loop {
            match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(pid, code)) => reaped.push((pid, code)),
                Ok(WaitStatus::Signaled(pid, signal, _core_dumped)) => {
                    reaped.push((pid, 128 + signal as i32))
                }
                Ok(WaitStatus::StillAlive) => break,
                Ok(_) => continue,
                // ECHILD (no children left) and any other waitpid error both
                // mean there is nothing more to drain right now.
                Err(_) => break,
            }
        }
        reaped
    }
}

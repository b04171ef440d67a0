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

//! `FaultRouter` (§4.4): the policy engine mapping a process-level fault or
//! watchdog timeout to an app-level action.

use log::{error, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::app::{cleanup_app, App, Collaborators};
use crate::collaborators::{ProcFaultAction, ProcWatchdogAction};
use crate::consts::CFG_NODE_WATCHDOG_ACTION;
use crate::fault_limiter::reached_limit;
use crate::process_slot::StopHandler;

/// `app_FaultAction_t` (§6): what escapes the supervisor on a `SIGCHLD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    Ignore,
    RestartApp,
    StopApp,
    Reboot,
}

/// `wdog_action_WatchdogAction_t`, restricted to the subset that ever
/// escapes the supervisor (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    Handled,
    RestartApp,
    StopApp,
    Reboot,
    Error,
}

fn run_start_proc(app: &App, idx: usize, c: &mut Collaborators) -> anyhow::Result<()> {
    let slot = &app.processes()[idx];
    if app.is_sandboxed() {
        c.process_runner.start_in_sandbox(slot.handle(), app.uid(), app.gid(), app.supplementary_gids(), app.sandbox_path())
    } else {
        c.process_runner.start(slot.handle(), app.install_dir_path())
    }
}

fn converge_if_drained(app: &mut App, c: &mut Collaborators) {
    if !app.has_running_proc(c.process_runner) {
        if let Some(timer) = app.kill_timer() {
            c.timers.cancel(timer);
            app.clear_kill_timer();
        }
        cleanup_app(app, c);
        app.set_state_stopped();
    }
}

/// §4.4.1: a reaped child exit. `None` means `pid` is not one of this app's
/// tracked processes (the caller should try another app, or drop it).
pub fn on_sig_child(app: &mut App, pid: Pid, exit_status: i32, c: &mut Collaborators) -> Option<FaultAction> {
    let idx = app.find_slot_by_pid(pid, c.process_runner)?;
    let handle = app.processes()[idx].handle();
    let proc_name = app.processes()[idx].name(c.process_runner).to_string();

    let prev_fault_time = c.process_runner.fault_time(handle);
    let proc_action = c.process_runner.sig_child_handler(handle, exit_status);
    // Deliberately re-read after the runner's own update — see Open
    // Question 2 in SPEC_FULL.md / DESIGN.md.
    let now_fault_time = c.process_runner.fault_time(handle);

    let action = if reached_limit(proc_action, now_fault_time, prev_fault_time, c.reboot_record, app.name(), &proc_name) {
        error!("app {} process {} exceeded its fault-rate window, stopping app", app.name(), proc_name);
        FaultAction::StopApp
    } else {
        match proc_action {
            ProcFaultAction::NoFault => match app.processes_mut()[idx].take_stop_handler() {
                Some(StopHandler::StartProc) => match run_start_proc(app, idx, c) {
                    Ok(()) => FaultAction::Ignore,
                    Err(e) => {
                        warn!("relaunching {} in {} after clean stop failed: {:#}", proc_name, app.name(), e);
                        FaultAction::StopApp
                    }
                },
                None => FaultAction::Ignore,
            },
            ProcFaultAction::Ignore => FaultAction::Ignore,
            ProcFaultAction::Restart => match run_start_proc(app, idx, c) {
                Ok(()) => FaultAction::Ignore,
                Err(e) => {
                    warn!("restarting {} in {} failed: {:#}", proc_name, app.name(), e);
                    FaultAction::StopApp
                }
            },
            ProcFaultAction::RestartApp => FaultAction::RestartApp,
            ProcFaultAction::StopApp => FaultAction::StopApp,
            ProcFaultAction::Reboot => {
                if let Err(e) = c.reboot_record.write(app.name(), &proc_name) {
                    warn!("failed to persist reboot-fault record for {}/{}: {:#}", app.name(), proc_name, e);
                }
                FaultAction::Reboot
            }
        }
    };

    converge_if_drained(app, c);
    Some(action)
}

fn stop_single_process(app: &App, idx: usize, c: &mut Collaborators) {
    let handle = app.processes()[idx].handle();
    c.process_runner.stopping(handle);
    if let Some(pid) = c.process_runner.pid(handle) {
        if let Err(e) = kill(pid, Signal::SIGKILL) {
            warn!("failed to signal pid {} ({} in {}): {}", pid, app.processes()[idx].name(c.process_runner), app.name(), e);
        }
    }
}

/// §4.4.2: a watchdog timeout. `None` means `pid` is not one of this app's
/// tracked processes.
pub fn on_watchdog_timeout(app: &mut App, pid: Pid, c: &mut Collaborators) -> Option<WatchdogAction> {
    let idx = app.find_slot_by_pid(pid, c.process_runner)?;
    let handle = app.processes()[idx].handle();

    let mut action = c.process_runner.watchdog_action(handle);
    if matches!(action, ProcWatchdogAction::NotFound | ProcWatchdogAction::Error) {
        let config_action = {
            let txn = c.config.open_read_txn(app.config_path());
            txn.get_string(CFG_NODE_WATCHDOG_ACTION)
        };
        if let Some(s) = config_action {
            action = ProcWatchdogAction::parse_config_str(&s);
        }
    }

    let result = match action {
        ProcWatchdogAction::NotFound | ProcWatchdogAction::Restart => {
            app.processes_mut()[idx].set_stop_handler(StopHandler::StartProc);
            stop_single_process(app, idx, c);
            WatchdogAction::Handled
        }
        ProcWatchdogAction::Ignore => WatchdogAction::Handled,
        ProcWatchdogAction::Stop => {
            stop_single_process(app, idx, c);
            WatchdogAction::Handled
        }
        ProcWatchdogAction::RestartApp => WatchdogAction::RestartApp,
        ProcWatchdogAction::StopApp => WatchdogAction::StopApp,
        ProcWatchdogAction::Reboot => WatchdogAction::Reboot,
        ProcWatchdogAction::Error => {
            error!("app {} could not resolve a watchdog policy for pid {}", app.name(), pid);
            WatchdogAction::Handled
        }
        ProcWatchdogAction::Handled => WatchdogAction::Handled,
    };

    Some(result)
}

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

//! `App` and `AppLifecycle` (§3, §4.2): the object model and the
//! create/delete/start/stop state machine.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::warn;
use nix::unistd::{Gid, Pid, Uid};

use crate::collaborators::{
    CgroupFreezer, MacLabelSubsystem, ProcState, ProcessRunner, ResourceLimiter, SandboxBuilder,
    TimerId, TimerService, UserGroupProvisioner,
};
use crate::config::{ConfigStore, ConfigTxn};
use crate::consts::{APPS_INSTALL_DIR, CFG_NODE_GROUPS, CFG_NODE_PROC_LIST, CFG_NODE_SANDBOXED, MAX_SUPPLEMENTARY_GROUPS};
use crate::process_slot::ProcessSlot;
use crate::reboot_fault::RebootFaultRecord;
use crate::AppId;

/// `state ∈ { STOPPED, RUNNING }` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Stopped,
    Running,
}

/// Every collaborator an `AppLifecycle` operation might touch, bundled so
/// free functions don't have to take eight separate parameters. Borrowed
/// fresh for each call by [`crate::supervisor::Supervisor`]; never stored
/// inside `App` itself.
pub struct Collaborators<'a> {
    pub config: &'a dyn ConfigStore,
    pub process_runner: &'a mut dyn ProcessRunner,
    pub sandbox: &'a mut dyn SandboxBuilder,
    pub resource_limits: &'a mut dyn ResourceLimiter,
    pub mac: &'a mut dyn MacLabelSubsystem,
    pub cgroup: &'a mut dyn CgroupFreezer,
    pub user_group: &'a mut dyn UserGroupProvisioner,
    pub timers: &'a mut dyn TimerService,
    pub reboot_record: &'a RebootFaultRecord,
}

pub struct App {
    name: String,
    config_path: String,
    sandboxed: bool,
    install_path: PathBuf,
    sandbox_path: PathBuf,
    uid: Uid,
    gid: Gid,
    supplementary_gids: Vec<Gid>,
    state: AppState,
    processes: Vec<ProcessSlot>,
    kill_timer: Option<TimerId>,
}

impl App {
    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config_path(&self) -> &str {
        &self.config_path
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn gid(&self) -> Gid {
        self.gid
    }

    pub fn is_sandboxed(&self) -> bool {
        self.sandboxed
    }

    pub fn install_dir_path(&self) -> &Path {
        &self.install_path
    }

    pub fn sandbox_path(&self) -> &Path {
        &self.sandbox_path
    }

    pub fn supplementary_gids(&self) -> &[Gid] {
        &self.supplementary_gids
    }

    pub fn processes(&self) -> &[ProcessSlot] {
        &self.processes
    }

    pub fn processes_mut(&mut self) -> &mut [ProcessSlot] {
        &mut self.processes
    }

    pub fn kill_timer(&self) -> Option<TimerId> {
        self.kill_timer
    }

    pub fn clear_kill_timer(&mut self) {
        self.kill_timer = None;
    }

    pub(crate) fn set_state_stopped(&mut self) {
        self.state = AppState::Stopped;
    }

    /// Resolved against the underlying process's own state, which is
    /// already typed as exactly `{Stopped, Running, Paused}` — unlike the
    /// original's untyped enum, there is no "unknown state" case to guard
    /// against here.
    pub fn proc_state(&self, proc_name: &str, runner: &dyn ProcessRunner) -> ProcState {
        if self.state != AppState::Running {
            return ProcState::Stopped;
        }
        self.processes
            .iter()
            .find(|slot| slot.name(runner) == proc_name)
            .map(|slot| runner.state(slot.handle()))
            .unwrap_or(ProcState::Stopped)
    }

    pub fn has_running_proc(&self, runner: &dyn ProcessRunner) -> bool {
        self.processes.iter().any(|slot| runner.state(slot.handle()) != ProcState::Stopped)
    }

    pub fn find_slot_by_pid(&self, pid: Pid, runner: &dyn ProcessRunner) -> Option<usize> {
        self.processes.iter().position(|slot| runner.pid(slot.handle()) == Some(pid))
    }
}

fn final_segment(config_path: &str) -> String {
    config_path.trim_end_matches('/').rsplit('/').next().unwrap_or(config_path).to_string()
}

fn provision_user_and_groups(
    name: &str,
    txn: &dyn ConfigTxn,
    provisioner: &mut dyn UserGroupProvisioner,
) -> Result<(Uid, Gid, Vec<Gid>)> {
    let (uid, gid) = provisioner.resolve_user(name).with_context(|| format!("resolving uid/gid for {}", name))?;

    let mut supplementary_gids = Vec::new();
    for group_name in txn.child_names(CFG_NODE_GROUPS) {
        if supplementary_gids.len() >= MAX_SUPPLEMENTARY_GROUPS {
            bail!("app {} declares more than {} supplementary groups", name, MAX_SUPPLEMENTARY_GROUPS);
        }
        let gid = provisioner
            .create_group(&group_name)
            .with_context(|| format!("creating group {} for {}", group_name, name))?;
        supplementary_gids.push(gid);
    }
    // Count taken from the vector actually built, not a loop-index — see
    // Open Question 1 in SPEC_FULL.md.
    Ok((uid, gid, supplementary_gids))
}

/// `Create(config_path) → App | error` (§4.2). On any failure past the
/// first config read, process handles and the sandbox path already
/// allocated for this app are released before returning.
pub fn create_app(config_path: &str, c: &mut Collaborators) -> Result<App> {
    let name = final_segment(config_path);
    let txn = c.config.open_read_txn(config_path);

    let sandboxed = txn.get_bool(CFG_NODE_SANDBOXED, true);

    let (uid, gid, supplementary_gids) = if sandboxed {
        provision_user_and_groups(&name, &*txn, c.user_group)
            .with_context(|| format!("provisioning user/groups for {}", name))?
    } else {
        (Uid::from_raw(0), Gid::from_raw(0), Vec::new())
    };

    let install_path = PathBuf::from(APPS_INSTALL_DIR).join(&name);

    let sandbox_path = if sandboxed {
        c.sandbox.path_for(&name).with_context(|| format!("resolving sandbox path for {}", name))?
    } else {
        PathBuf::new()
    };

    let mut processes = Vec::new();
    for proc_path in txn.child_paths(CFG_NODE_PROC_LIST) {
        let proc_path = proc_path.trim_end_matches('/');
        match c.process_runner.create(proc_path, &name) {
            Ok(handle) => processes.push(ProcessSlot::new(handle)),
            Err(e) => {
                for slot in &processes {
                    c.process_runner.delete(slot.handle());
                }
                if sandboxed {
                    let _ = c.sandbox.remove(&name);
                }
                return Err(e.context(format!("creating process at {} for app {}", proc_path, name)));
            }
        }
    }

    Ok(App {
        name,
        config_path: config_path.to_string(),
        sandboxed,
        install_path,
        sandbox_path,
        uid,
        gid,
        supplementary_gids,
        state: AppState::Stopped,
        processes,
        kill_timer: None,
    })
}

/// `Delete(app)` (§3, §4.2). Precondition: `STOPPED`. Violating it is a
/// programmer error, not a recoverable fault.
pub fn delete_app(mut app: App, c: &mut Collaborators) {
    if app.state != AppState::Stopped {
        panic!("delete_app called on app {} while RUNNING", app.name);
    }
    for slot in app.processes.drain(..) {
        c.process_runner.delete(slot.handle());
    }
    if let Some(timer) = app.kill_timer.take() {
        c.timers.cancel(timer);
    }
}

fn launch_all(app: &App, c: &mut Collaborators) -> Result<()> {
    for slot in &app.processes {
        let proc_name = slot.name(c.process_runner).to_string();
        let result = if app.sandboxed {
            c.process_runner.start_in_sandbox(
                slot.handle(),
                app.uid,
                app.gid,
                &app.supplementary_gids,
                &app.sandbox_path,
            )
        } else {
            c.process_runner.start(slot.handle(), &app.install_path)
        };
        result.with_context(|| format!("starting process {} in app {}", proc_name, app.name))?;
    }
    Ok(())
}

/// `Start(app) → ok | error` (§4.2). Precondition: `state ≠ RUNNING`.
pub fn start_app(app: &mut App, c: &mut Collaborators) -> Result<()> {
    if app.state == AppState::Running {
        bail!("start_app called on {} while already RUNNING", app.name);
    }

    if app.sandboxed {
        c.sandbox.setup(&app.name).with_context(|| format!("setting up sandbox for {}", app.name))?;
    }

    c.resource_limits.apply(&app.name).with_context(|| format!("applying resource limits for {}", app.name))?;

    let txn = c.config.open_read_txn(&app.config_path);
    crate::access_rules::install_access_rules(&app.name, c.mac, &*txn)
        .with_context(|| format!("installing access rules for {}", app.name))?;

    match launch_all(app, c) {
        Ok(()) => {
            app.state = AppState::Running;
            Ok(())
        }
        Err(e) => {
            crate::kill_engine::kill_app_procs(app, crate::kill_engine::KillMode::Soft, c);
            Err(e)
        }
    }
}

/// `Stop(app)` (§4.2). Asynchronous: if the cgroup was already empty the
/// transition to `STOPPED` happens here; otherwise it happens later, the
/// first time `has_running_proc` becomes false in the `SIGCHLD` path.
pub fn stop_app(app: &mut App, app_id: AppId, c: &mut Collaborators) {
    if app.state == AppState::Stopped {
        warn!("stop_app called on app {} while already STOPPED", app.name);
        return;
    }

    match crate::kill_engine::kill_app_procs(app, crate::kill_engine::KillMode::Soft, c) {
        crate::kill_engine::KillOutcome::NotFound => {
            if let Some(timer) = app.kill_timer.take() {
                c.timers.cancel(timer);
            }
            cleanup_app(app, c);
            app.state = AppState::Stopped;
        }
        crate::kill_engine::KillOutcome::Ok => {
            // `kill_timer` is reused across repeated `Stop` calls during the
            // same soft-kill window (§3): cancel whatever is still pending
            // before arming a fresh one, so a second `Stop` before the first
            // timer fires can never leave an orphaned `HardKillApp` armed
            // against a later, unrelated run of this app.
            if let Some(timer) = app.kill_timer.take() {
                c.timers.cancel(timer);
            }
            let timer = c.timers.arm_one_shot(
                crate::consts::KILL_TIMEOUT,
                crate::collaborators::TimerEvent::HardKillApp(app_id),
            );
            app.kill_timer = Some(timer);
        }
    }
}

/// `CleanupApp` (§4.7). Idempotent: safe to call on an already-stopped app.
pub fn cleanup_app(app: &App, c: &mut Collaborators) {
    let label = c.mac.label_for(&app.name);
    c.mac.revoke_subject(&label);
    if app.sandboxed {
        if let Err(e) = c.sandbox.remove(&app.name) {
            warn!("failed to remove sandbox for {}: {:#}", app.name, e);
        }
    }
    c.resource_limits.cleanup(&app.name);
}

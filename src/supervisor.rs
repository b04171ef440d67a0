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

//! The process-wide orchestrator. Owns the `App` pool and every
//! collaborator, wires §4's components together, and is the only thing an
//! embedder outside this crate needs to hold.

use std::time::Instant;

use anyhow::Result;
use nix::unistd::Pid;
use slab::Slab;

use crate::app::{self, App, Collaborators};
use crate::bootstrap;
use crate::collaborators::{
    CgroupFreezer, MacLabelSubsystem, ProcState, ProcessRunner, ResourceLimiter, SandboxBuilder,
    TimerEvent, TimerService, UserGroupProvisioner,
};
use crate::config::ConfigStore;
use crate::fault_router::{self, FaultAction, WatchdogAction};
use crate::kill_engine;
use crate::reboot_fault::RebootFaultRecord;
use crate::sigchld::SigChldWatcher;
use crate::AppId;

/// Every collaborator, owned. Kept apart from `apps` so that a `&mut self`
/// method can hand out a [`Collaborators`] bundle over these fields while
/// separately indexing into `apps` — the two halves never alias.
struct CollabHandles {
    config: Box<dyn ConfigStore>,
    process_runner: Box<dyn ProcessRunner>,
    sandbox: Box<dyn SandboxBuilder>,
    resource_limits: Box<dyn ResourceLimiter>,
    mac: Box<dyn MacLabelSubsystem>,
    cgroup: Box<dyn CgroupFreezer>,
    user_group: Box<dyn UserGroupProvisioner>,
    timers: Box<dyn TimerService>,
    reboot_record: RebootFaultRecord,
}

impl CollabHandles {
    fn as_collaborators(&mut self) -> Collaborators<'_> {
        Collaborators {
            config: &*self.config,
            process_runner: &mut *self.process_runner,
            sandbox: &mut *self.sandbox,
            resource_limits: &mut *self.resource_limits,
            mac: &mut *self.mac,
            cgroup: &mut *self.cgroup,
            user_group: &mut *self.user_group,
            timers: &mut *self.timers,
            reboot_record: &self.reboot_record,
        }
    }
}

pub struct Supervisor {
    apps: Slab<App>,
    collab: CollabHandles,
}

impl Supervisor {
    /// Runs `Bootstrap::init` (§4.1) and returns an empty supervisor ready
    /// to create apps.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Box<dyn ConfigStore>,
        process_runner: Box<dyn ProcessRunner>,
        sandbox: Box<dyn SandboxBuilder>,
        resource_limits: Box<dyn ResourceLimiter>,
        mac: Box<dyn MacLabelSubsystem>,
        cgroup: Box<dyn CgroupFreezer>,
        user_group: Box<dyn UserGroupProvisioner>,
        mut timers: Box<dyn TimerService>,
        reboot_record: RebootFaultRecord,
    ) -> Self {
        bootstrap::init(&mut *timers);
        Self {
            apps: Slab::new(),
            collab: CollabHandles {
                config,
                process_runner,
                sandbox,
                resource_limits,
                mac,
                cgroup,
                user_group,
                timers,
                reboot_record,
            },
        }
    }

    pub fn app(&self, id: AppId) -> &App {
        self.apps.get(id.0).expect("unknown AppId")
    }

    pub fn proc_state(&self, id: AppId, proc_name: &str) -> ProcState {
        self.app(id).proc_state(proc_name, &*self.collab.process_runner)
    }

    pub fn create_app(&mut self, config_path: &str) -> Result<AppId> {
        let app = {
            let mut c = self.collab.as_collaborators();
            app::create_app(config_path, &mut c)?
        };
        Ok(AppId(self.apps.insert(app)))
    }

    /// Precondition: the app is `STOPPED`. Violating it panics (§3).
    pub fn delete_app(&mut self, id: AppId) {
        let removed = self.apps.remove(id.0);
        let mut c = self.collab.as_collaborators();
        app::delete_app(removed, &mut c);
    }

    pub fn start_app(&mut self, id: AppId) -> Result<()> {
        let app = self.apps.get_mut(id.0).expect("unknown AppId");
        let mut c = self.collab.as_collaborators();
        app::start_app(app, &mut c)
    }

    pub fn stop_app(&mut self, id: AppId) {
        let app = self.apps.get_mut(id.0).expect("unknown AppId");
        let mut c = self.collab.as_collaborators();
        app::stop_app(app, id, &mut c);
    }

    fn find_owning_app(&self, pid: Pid) -> Option<AppId> {
        for (idx, app) in self.apps.iter() {
            if app.find_slot_by_pid(pid, &*self.collab.process_runner).is_some() {
                return Some(AppId(idx));
            }
        }
        None
    }

    /// §4.4.1, scoped across every known app: resolves which app owns `pid`
    /// before delegating to `FaultRouter`. `None` if no app tracks it.
    pub fn on_sig_child(&mut self, pid: Pid, exit_status: i32) -> Option<(AppId, FaultAction)> {
        let id = self.find_owning_app(pid)?;
        let app = self.apps.get_mut(id.0)?;
        let mut c = self.collab.as_collaborators();
        let action = fault_router::on_sig_child(app, pid, exit_status, &mut c)?;
        Some((id, action))
    }

    /// §4.4.2, scoped across every known app.
    pub fn on_watchdog_timeout(&mut self, pid: Pid) -> Option<(AppId, WatchdogAction)> {
        let id = self.find_owning_app(pid)?;
        let app = self.apps.get_mut(id.0)?;
        let mut c = self.collab.as_collaborators();
        let action = fault_router::on_watchdog_timeout(app, pid, &mut c)?;
        Some((id, action))
    }

    /// Drains every child reaped by `watcher` since the last call and
    /// routes each through `on_sig_child`, in the order `waitpid` returned
    /// them. The embedder's event loop calls this when `watcher.is_pending()`
    /// is true (§5: `SIGCHLD` surfaced as an event, handled non-blockingly).
    pub fn drain_sig_child(&mut self, watcher: &SigChldWatcher) -> Vec<(AppId, FaultAction)> {
        watcher
            .reap_all()
            .into_iter()
            .filter_map(|(pid, status)| self.on_sig_child(pid, status))
            .collect()
    }

    /// Drains every timer due by `now` and dispatches it: `HardKillApp`
    /// escalates that app's stop cycle, `RebootFaultQuiescence` clears the
    /// persisted record.
    pub fn poll_timers(&mut self, now: Instant) {
        let expired = self.collab.timers.poll_expired(now);
        for event in expired {
            match event {
                TimerEvent::HardKillApp(id) => {
                    if let Some(app) = self.apps.get_mut(id.0) {
                        let mut c = self.collab.as_collaborators();
                        kill_engine::hard_kill_app(app, &mut c);
                    }
                }
                TimerEvent::RebootFaultQuiescence => {
                    bootstrap::handle_quiescence(&self.collab.reboot_record);
                }
            }
        }
    }
}

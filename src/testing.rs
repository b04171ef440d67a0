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

//! Hand-written fakes for every collaborator trait, plus an in-memory
//! config store. These let the scenarios in `spec.md` §8 run as ordinary
//! `#[cfg(test)]` unit tests, without any real cgroup, MAC or uid/gid
//! machinery — mirroring how the teacher crate only ever touches CRIU and
//! real cgroups from its separate integration-test binary, never from a
//! `#[cfg(test)]` module.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use nix::unistd::{Gid, Pid, Uid};

use crate::collaborators::*;
use crate::config::{ConfigStore, ConfigTxn};

// ---------------------------------------------------------------------
// Config store
// ---------------------------------------------------------------------

/// An in-memory config tree keyed by absolute path, preserving insertion
/// order for child enumeration.
pub struct MapConfigStore {
    entries: Vec<(String, String)>,
}

impl MapConfigStore {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn normalize(path: &str) -> String {
        path.trim_end_matches('/').to_string()
    }

    pub fn set_string(&mut self, path: &str, value: &str) {
        let path = Self::normalize(path);
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| *p == path) {
            entry.1 = value.to_string();
        } else {
            self.entries.push((path, value.to_string()));
        }
    }

    pub fn set_bool(&mut self, path: &str, value: bool) {
        self.set_string(path, if value { "true" } else { "false" });
    }

    /// Marks a node as present with no leaf value of its own (e.g. a
    /// supplementary-group name, which is a node, not a leaf).
    pub fn touch(&mut self, path: &str) {
        self.set_string(path, "");
    }

    fn get(&self, path: &str) -> Option<String> {
        self.entries.iter().find(|(p, _)| p == path).map(|(_, v)| v.clone())
    }

    fn direct_children(&self, base: &str) -> Vec<String> {
        let prefix = format!("{}/", base);
        let mut seen = Vec::new();
        for (path, _) in &self.entries {
            if let Some(rest) = path.strip_prefix(&prefix) {
                let name = rest.split('/').next().unwrap_or(rest).to_string();
                if !seen.contains(&name) {
                    seen.push(name);
                }
            }
        }
        seen
    }
}

impl ConfigStore for MapConfigStore {
    fn open_read_txn(&self, path: &str) -> Box<dyn ConfigTxn + '_> {
        Box::new(MapConfigTxn { store: self, root: Self::normalize(path) })
    }
}

struct MapConfigTxn<'a> {
    store: &'a MapConfigStore,
    root: String,
}

impl<'a> MapConfigTxn<'a> {
    fn full(&self, node: &str) -> String {
        if node.is_empty() {
            self.root.clone()
        } else {
            format!("{}/{}", self.root, node)
        }
    }
}

impl<'a> ConfigTxn for MapConfigTxn<'a> {
    fn get_bool(&self, node: &str, default: bool) -> bool {
        match self.store.get(&self.full(node)) {
            Some(v) => v == "true",
            None => default,
        }
    }

    fn get_string(&self, node: &str) -> Option<String> {
        self.store.get(&self.full(node))
    }

    fn child_names(&self, node: &str) -> Vec<String> {
        self.store.direct_children(&self.full(node))
    }

    fn child_paths(&self, node: &str) -> Vec<String> {
        let base = self.full(node);
        self.store.direct_children(&base).into_iter().map(|name| format!("{}/{}", base, name)).collect()
    }

    fn sub(&self, node: &str) -> Box<dyn ConfigTxn + '_> {
        Box::new(MapConfigTxn { store: self.store, root: self.full(node) })
    }
}

// ---------------------------------------------------------------------
// Process runner
// ---------------------------------------------------------------------

pub struct FakeProcess {
    pub name: String,
    pub app_name: String,
    pub state: ProcState,
    pub pid: Option<Pid>,
    pub fault_time: u64,
    pub watchdog_action: ProcWatchdogAction,
    /// Scripted return value for the next `sig_child_handler` call.
    pub next_fault_action: ProcFaultAction,
    /// What `fault_time` becomes once `sig_child_handler` is called, as the
    /// process runner would record it.
    pub next_fault_time: u64,
    pub stopping_calls: u32,
    pub start_calls: u32,
}

pub struct FakeProcessRunner {
    pub processes: HashMap<ProcHandle, FakeProcess>,
    next_id: u64,
    next_pid: i32,
    pub create_should_fail: bool,
    pub start_should_fail: bool,
}

impl FakeProcessRunner {
    pub fn new() -> Self {
        Self {
            processes: HashMap::new(),
            next_id: 0,
            next_pid: 1000,
            create_should_fail: false,
            start_should_fail: false,
        }
    }

    pub fn fault_time(&self, handle: ProcHandle) -> u64 {
        self.processes[&handle].fault_time
    }
}

impl ProcessRunner for FakeProcessRunner {
    fn create(&mut self, proc_cfg_path: &str, app_name: &str) -> anyhow::Result<ProcHandle> {
        if self.create_should_fail {
            anyhow::bail!("fake: process create failed for {}", proc_cfg_path);
        }
        let name = proc_cfg_path.trim_end_matches('/').rsplit('/').next().unwrap_or(proc_cfg_path).to_string();
        let handle = ProcHandle(self.next_id);
        self.next_id += 1;
        self.processes.insert(handle, FakeProcess {
            name,
            app_name: app_name.to_string(),
            state: ProcState::Stopped,
            pid: None,
            fault_time: 0,
            watchdog_action: ProcWatchdogAction::NotFound,
            next_fault_action: ProcFaultAction::NoFault,
            next_fault_time: 0,
            stopping_calls: 0,
            start_calls: 0,
        });
        Ok(handle)
    }

    fn start(&mut self, handle: ProcHandle, _root_dir: &Path) -> anyhow::Result<()> {
        if self.start_should_fail {
            anyhow::bail!("fake: process start failed");
        }
        let pid = self.next_pid;
        self.next_pid += 1;
        let proc = self.processes.get_mut(&handle).expect("unknown handle");
        proc.pid = Some(Pid::from_raw(pid));
        proc.state = ProcState::Running;
        proc.start_calls += 1;
        Ok(())
    }

    fn start_in_sandbox(
        &mut self,
        handle: ProcHandle,
        _uid: Uid,
        _gid: Gid,
        _supplementary_gids: &[Gid],
        _sandbox_path: &Path,
    ) -> anyhow::Result<()> {
        self.start(handle, Path::new("/"))
    }

    fn delete(&mut self, handle: ProcHandle) {
        self.processes.remove(&handle);
    }

    fn pid(&self, handle: ProcHandle) -> Option<Pid> {
        self.processes[&handle].pid
    }

    fn name(&self, handle: ProcHandle) -> &str {
        &self.processes[&handle].name
    }

    fn state(&self, handle: ProcHandle) -> ProcState {
        self.processes[&handle].state
    }

    fn fault_time(&self, handle: ProcHandle) -> u64 {
        self.processes[&handle].fault_time
    }

    fn watchdog_action(&self, handle: ProcHandle) -> ProcWatchdogAction {
        self.processes[&handle].watchdog_action
    }

    fn stopping(&mut self, handle: ProcHandle) {
        let proc = self.processes.get_mut(&handle).expect("unknown handle");
        proc.stopping_calls += 1;
    }

    fn sig_child_handler(&mut self, handle: ProcHandle, _exit_status: i32) -> ProcFaultAction {
        let proc = self.processes.get_mut(&handle).expect("unknown handle");
        proc.state = ProcState::Stopped;
        proc.pid = None;
        proc.fault_time = proc.next_fault_time;
        proc.next_fault_action
    }
}

// ---------------------------------------------------------------------
// Cgroup freezer
// ---------------------------------------------------------------------

pub struct FakeCgroupFreezer {
    pub task_counts: HashMap<String, usize>,
    pub states: HashMap<String, FreezeState>,
    pub signals_sent: Vec<(String, Signal)>,
    pub freeze_should_fail: bool,
    pub thaw_should_fail: bool,
}

impl FakeCgroupFreezer {
    pub fn new() -> Self {
        Self {
            task_counts: HashMap::new(),
            states: HashMap::new(),
            signals_sent: Vec::new(),
            freeze_should_fail: false,
            thaw_should_fail: false,
        }
    }

    pub fn set_task_count(&mut self, name: &str, count: usize) {
        self.task_counts.insert(name.to_string(), count);
    }
}

impl CgroupFreezer for FakeCgroupFreezer {
    fn freeze(&mut self, name: &str) -> anyhow::Result<()> {
        if self.freeze_should_fail {
            anyhow::bail!("fake: freeze failed for {}", name);
        }
        self.states.insert(name.to_string(), FreezeState::Frozen);
        Ok(())
    }

    fn thaw(&mut self, name: &str) -> anyhow::Result<()> {
        if self.thaw_should_fail {
            anyhow::bail!("fake: thaw failed for {}", name);
        }
        self.states.insert(name.to_string(), FreezeState::Thawed);
        Ok(())
    }

    fn state(&self, name: &str) -> anyhow::Result<FreezeState> {
        Ok(*self.states.get(name).unwrap_or(&FreezeState::Thawed))
    }

    fn send_sig(&mut self, name: &str, signo: Signal) -> anyhow::Result<usize> {
        self.signals_sent.push((name.to_string(), signo));
        let count = self.task_counts.get(name).copied().unwrap_or(0);
        self.task_counts.insert(name.to_string(), 0);
        Ok(count)
    }

    fn is_empty(&self, name: &str) -> bool {
        self.task_counts.get(name).copied().unwrap_or(0) == 0
    }
}

// ---------------------------------------------------------------------
// Sandbox / resource limits / MAC / user-group
// ---------------------------------------------------------------------

pub struct FakeSandboxBuilder {
    pub path_resolutions: Vec<String>,
    pub setup_calls: Vec<String>,
    pub removed: Vec<String>,
}

impl FakeSandboxBuilder {
    pub fn new() -> Self {
        Self { path_resolutions: Vec::new(), setup_calls: Vec::new(), removed: Vec::new() }
    }
}

impl SandboxBuilder for FakeSandboxBuilder {
    fn path_for(&mut self, app_name: &str) -> anyhow::Result<PathBuf> {
        self.path_resolutions.push(app_name.to_string());
        Ok(PathBuf::from(format!("/mnt/sandboxes/{}", app_name)))
    }

    fn setup(&mut self, app_name: &str) -> anyhow::Result<()> {
        self.setup_calls.push(app_name.to_string());
        Ok(())
    }

    fn remove(&mut self, app_name: &str) -> anyhow::Result<()> {
        self.removed.push(app_name.to_string());
        Ok(())
    }
}

pub struct FakeResourceLimiter {
    pub applied: Vec<String>,
    pub cleaned: Vec<String>,
}

impl FakeResourceLimiter {
    pub fn new() -> Self {
        Self { applied: Vec::new(), cleaned: Vec::new() }
    }
}

impl ResourceLimiter for FakeResourceLimiter {
    fn apply(&mut self, app_name: &str) -> anyhow::Result<()> {
        self.applied.push(app_name.to_string());
        Ok(())
    }

    fn cleanup(&mut self, app_name: &str) {
        self.cleaned.push(app_name.to_string());
    }
}

pub struct FakeMacLabelSubsystem {
    pub installed: Vec<MacRule>,
    pub revoked_subjects: Vec<String>,
}

impl FakeMacLabelSubsystem {
    pub fn new() -> Self {
        Self { installed: Vec::new(), revoked_subjects: Vec::new() }
    }
}

impl MacLabelSubsystem for FakeMacLabelSubsystem {
    fn label_for(&mut self, app_name: &str) -> String {
        format!("label:{}", app_name)
    }

    fn access_label_for(&mut self, app_name: &str, perm: &str) -> String {
        format!("label:{}:{}", app_name, perm)
    }

    fn install_rule(&mut self, rule: &MacRule) -> anyhow::Result<()> {
        self.installed.push(rule.clone());
        Ok(())
    }

    fn revoke_subject(&mut self, subject_label: &str) {
        self.revoked_subjects.push(subject_label.to_string());
        self.installed.retain(|r| r.subject_label != subject_label);
    }
}

pub struct FakeUserGroupProvisioner {
    next_uid: u32,
    next_gid: u32,
    pub created_groups: HashMap<String, Gid>,
}

impl FakeUserGroupProvisioner {
    pub fn new() -> Self {
        Self { next_uid: 2000, next_gid: 2000, created_groups: HashMap::new() }
    }
}

impl UserGroupProvisioner for FakeUserGroupProvisioner {
    fn resolve_user(&mut self, _app_name: &str) -> anyhow::Result<(Uid, Gid)> {
        let uid = self.next_uid;
        let gid = self.next_gid;
        self.next_uid += 1;
        self.next_gid += 1;
        Ok((Uid::from_raw(uid), Gid::from_raw(gid)))
    }

    fn create_group(&mut self, group_name: &str) -> anyhow::Result<Gid> {
        if let Some(gid) = self.created_groups.get(group_name) {
            return Ok(*gid);
        }
        let gid = Gid::from_raw(self.next_gid);
        self.next_gid += 1;
        self.created_groups.insert(group_name.to_string(), gid);
        Ok(gid)
    }
}

// ---------------------------------------------------------------------
// Timer service
// ---------------------------------------------------------------------

/// A `TimerService` driven by an explicit virtual clock instead of the wall
/// clock, so tests can assert "nothing fires before 300ms" and "it fires at
/// 300ms" without sleeping.
pub struct ManualTimerService {
    now: Instant,
    next_id: u64,
    pending: Vec<(Instant, TimerId, TimerEvent)>,
}

impl ManualTimerService {
    pub fn new() -> Self {
        Self { now: Instant::now(), next_id: 0, pending: Vec::new() }
    }

    /// Advances the virtual clock by `delay` and returns every event that
    /// expired as a result.
    pub fn advance(&mut self, delay: Duration) -> Vec<TimerEvent> {
        self.now += delay;
        let now = self.now;
        self.poll_expired(now)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl TimerService for ManualTimerService {
    fn arm_one_shot(&mut self, delay: Duration, event: TimerEvent) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push((self.now + delay, id, event));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.retain(|(_, tid, _)| *tid != id);
    }

    fn poll_expired(&mut self, now: Instant) -> Vec<TimerEvent> {
        let mut expired = Vec::new();
        self.pending.retain(|(deadline, _, event)| {
            if *deadline <= now {
                expired.push(*event);
                false
            } else {
                true
            }
        });
        expired
    }
}
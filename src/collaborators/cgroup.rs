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

use nix::sys::signal::Signal;

/// Observable freeze state of a cgroup, as reported by the freezer (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeState {
    Frozen,
    Thawed,
    Freezing,
}

/// Freeze/thaw a named cgroup and broadcast signals to all tasks within it
/// (§6, "Control-group freezer (consumed)"). Out of scope for this crate —
/// `KillEngine` is the sole caller.
pub trait CgroupFreezer {
    fn freeze(&mut self, name: &str) -> anyhow::Result<()>;

    fn thaw(&mut self, name: &str) -> anyhow::Result<()>;

    fn state(&self, name: &str) -> anyhow::Result<FreezeState>;

    /// Broadcasts `signo` to every task in the freeze cgroup `name`. Returns
    /// the number of tasks signalled (0 means the cgroup was empty).
    fn send_sig(&mut self, name: &str, signo: Signal) -> anyhow::Result<usize>;

    /// Whether the freeze cgroup currently has no tasks in it.
    fn is_empty(&self, name: &str) -> bool;
}
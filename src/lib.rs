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

//! Application supervisor core: object lifecycle, sandboxing, access-rule
//! synthesis and the fault/watchdog policy engine for an embedded
//! application framework (see `SPEC_FULL.md`).
//!
//! The crate never executes processes, parses on-disk configuration, or
//! implements MAC policy itself — it only ever calls through the traits in
//! [`collaborators`] and [`config`]. [`supervisor::Supervisor`] is the
//! entry point an embedder holds.

pub mod access_rules;
pub mod app;
pub mod bootstrap;
pub mod collaborators;
pub mod config;
pub mod consts;
pub mod fault_limiter;
pub mod fault_router;
pub mod kill_engine;
pub mod logger;
pub mod process_slot;
pub mod reboot_fault;
pub mod sigchld;
pub mod supervisor;

#[cfg(test)]
pub mod testing;

/// Opaque handle to an `App` held in the supervisor's pool (an index into
/// its `slab::Slab<App>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppId(pub usize);

pub use app::{App, AppState};
pub use fault_router::{FaultAction, WatchdogAction};
pub use supervisor::Supervisor;
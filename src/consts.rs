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

//! Fixed constants pulled out of the state machine so tests can name them
//! directly instead of repeating magic numbers.

use std::time::Duration;

/// Root directory under which every app gets `{APPS_INSTALL_DIR}/{name}`.
pub const APPS_INSTALL_DIR: &str = "/opt/legato/apps";

/// Path of the persisted reboot-fault record (mode 0700, see `reboot_fault`).
pub const REBOOT_FAULT_RECORD_PATH: &str = "/opt/legato/appRebootFault";

/// Time the soft-kill is given to drain an app's cgroup before `HardKillApp` fires.
pub const KILL_TIMEOUT: Duration = Duration::from_millis(300);

/// How long after boot, with no intervening `REBOOT` action, the reboot-fault
/// record is unlinked. Armed once, at `Bootstrap::init`.
pub const REBOOT_FAULT_QUIESCENCE: Duration = Duration::from_secs(120);

/// Rate window for `PROC_FAULT_ACTION_RESTART`. Kept distinct from
/// [`FAULT_LIMIT_RESTART_APP`] per Open Question 3 (see DESIGN.md) even
/// though both are 10s today.
pub const FAULT_LIMIT_RESTART: Duration = Duration::from_secs(10);

/// Rate window for `PROC_FAULT_ACTION_RESTART_APP`.
pub const FAULT_LIMIT_RESTART_APP: Duration = Duration::from_secs(10);

/// Upper bound on supplementary groups per app; overflow is a configuration
/// error at `Create`.
pub const MAX_SUPPLEMENTARY_GROUPS: usize = 16;

/// The seven non-empty subsets of `{r, w, x}` that `AccessRuleSynthesizer`
/// installs a self-access rule for.
pub const NUM_PERMISSIONS: usize = 7;

/// Config-tree node name config.
pub const CFG_NODE_SANDBOXED: &str = "sandboxed";
pub const CFG_NODE_GROUPS: &str = "groups";
pub const CFG_NODE_PROC_LIST: &str = "procs";
pub const CFG_NODE_BINDINGS: &str = "bindings";
pub const CFG_NODE_BINDING_APP: &str = "app";
pub const CFG_NODE_WATCHDOG_ACTION: &str = "watchdogAction";

/// Subject label used for the framework side of the default access rule pair.
pub const FRAMEWORK_LABEL: &str = "framework";

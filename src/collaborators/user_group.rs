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

use nix::unistd::{Gid, Uid};

/// Maps an app name to a uid/primary-gid and creates supplementary groups
/// (§6). Out of scope for this crate.
pub trait UserGroupProvisioner {
    /// Resolves (creating if necessary) the unique uid/gid pair for
    /// `app_name`.
    fn resolve_user(&mut self, app_name: &str) -> anyhow::Result<(Uid, Gid)>;

    /// Creates (or resolves) a supplementary group by name and returns its
    /// gid.
    fn create_group(&mut self, group_name: &str) -> anyhow::Result<Gid>;
}
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

use std::path::PathBuf;

/// Creates and tears down an isolated filesystem view for a sandboxed app
/// (§6). Out of scope for this crate. Path resolution is split from
/// materialization because `AppLifecycle::Create` only needs the path (to
/// populate `App::sandbox_path`) while the filesystem view itself is built
/// later, at `Start`.
pub trait SandboxBuilder {
    /// Resolves the sandbox root path for `app_name` without creating
    /// anything on disk.
    fn path_for(&mut self, app_name: &str) -> anyhow::Result<PathBuf>;

    /// Materializes the sandbox filesystem view at the path previously
    /// returned by `path_for`.
    fn setup(&mut self, app_name: &str) -> anyhow::Result<()>;

    /// Tears down the sandbox filesystem view. Safe to call on an app with
    /// no sandbox.
    fn remove(&mut self, app_name: &str) -> anyhow::Result<()>;
}
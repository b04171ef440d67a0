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

/// Applies and cleans per-application kernel resource limits (§6). Out of
/// scope for this crate.
pub trait ResourceLimiter {
    fn apply(&mut self, app_name: &str) -> anyhow::Result<()>;

    /// Idempotent: safe to call on an app with no limits currently applied.
    fn cleanup(&mut self, app_name: &str);
}
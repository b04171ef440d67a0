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

/// A permission grant direction used when installing a MAC rule: `subject`
/// is allowed `perm` access to `object`.
#[derive(Debug, Clone)]
pub struct MacRule {
    pub subject_label: String,
    pub object_label: String,
    pub perm: String,
}

/// Assigns MAC labels and installs/revokes access rules between them (§6).
/// Out of scope for this crate; `AccessRuleSynthesizer` computes *which*
/// rules to install and calls through this trait to do it.
pub trait MacLabelSubsystem {
    /// Returns the subject/object label for `app_name`, creating it on first
    /// use if the implementation requires that.
    fn label_for(&mut self, app_name: &str) -> String;

    /// Returns the object label identifying `app_name`'s own folders at the
    /// given permission subset (one of the seven non-empty combinations of
    /// `r`, `w`, `x`).
    fn access_label_for(&mut self, app_name: &str, perm: &str) -> String;

    fn install_rule(&mut self, rule: &MacRule) -> anyhow::Result<()>;

    /// Revokes every rule whose subject is `subject_label`. Idempotent.
    fn revoke_subject(&mut self, subject_label: &str);
}
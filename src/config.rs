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

//! The configuration-store contract consumed by the supervisor (§6).
//!
//! The core never parses configuration files itself (see Non-goals in
//! `spec.md` §1) — it only ever reads through this trait, modelled after a
//! hierarchical read transaction over keyed string/bool/path nodes, in the
//! style of a config-tree read iterator that can descend into child nodes
//! and cancel without side effects.

/// A read transaction rooted somewhere in the config tree. Every accessor
/// takes a node path relative to the transaction's own root; `""` refers to
/// the root itself.
pub trait ConfigTxn {
    /// Reads a boolean leaf, or `default` if absent or unparseable.
    fn get_bool(&self, node: &str, default: bool) -> bool;

    /// Reads a string leaf, or `None` if absent.
    fn get_string(&self, node: &str) -> Option<String>;

    /// Child *names* directly under `node`, in config order (`node=""`
    /// means the children of this transaction's own root).
    fn child_names(&self, node: &str) -> Vec<String>;

    /// Absolute config paths of the children directly under `node`, in
    /// config order. Absolute, unlike every other accessor here, because
    /// the process runner needs a path it can re-resolve on its own later
    /// (§6, "take its full config path").
    fn child_paths(&self, node: &str) -> Vec<String>;

    /// A transaction rooted further at `node`, relative to this one.
    fn sub(&self, node: &str) -> Box<dyn ConfigTxn + '_>;
}

/// Opens read transactions rooted at an absolute config path.
pub trait ConfigStore {
    fn open_read_txn(&self, path: &str) -> Box<dyn ConfigTxn + '_>;
}
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

//! Contracts to the supervisor's external collaborators (§6). Each trait
//! here is a seam: the core depends only on the trait, never on a concrete
//! sandbox/cgroup/MAC implementation, so it can be driven in tests by the
//! fakes in [`crate::testing`] and wired to real kernel facilities by the
//! embedder.

mod process_runner;
mod sandbox;
mod resource_limits;
mod mac;
mod cgroup;
mod user_group;
mod timer;

pub use process_runner::*;
pub use sandbox::*;
pub use resource_limits::*;
pub use mac::*;
pub use cgroup::*;
pub use user_group::*;
pub use timer::*;
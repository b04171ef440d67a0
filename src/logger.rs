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

use std::{
    io::prelude::*,
    io::stderr,
    sync::Mutex,
};
use log::{Record, Metadata};
pub use log::LevelFilter;
use chrono::prelude::*;
use lazy_static::lazy_static;

lazy_static! {
    static ref START_TIME: DateTime<Utc> = Utc::now();
    static ref LOGGER: Mutex<Option<Logger>> = Mutex::new(None);
}

struct Logger {
    stdout_enabled: bool,
}

impl Logger {
    fn log(&mut self, record: &Record) {
        let elapsed = (Utc::now() - *START_TIME).num_milliseconds() as f64 / 1000.0;
        let msg = format!("[supervisor.{}] ({:.3}s) {}\n",
            record.target(), elapsed, record.args());
        if self.stdout_enabled {
            // Logging must never itself become a source of failure.
            let _ = stderr().write_all(msg.as_bytes());
        }
    }

    fn flush(&mut self) {
        let _ = stderr().flush();
    }
}

struct LoggerRef(&'static Mutex<Option<Logger>>);

impl log::Log for LoggerRef {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Some(logger) = self.0.lock().unwrap().as_mut() {
            logger.log(record);
        }
    }

    fn flush(&self) {
        if let Some(logger) = self.0.lock().unwrap().as_mut() {
            logger.flush();
        }
    }
}

/// Installs the supervisor's logger as the process-wide `log` backend.
/// Must be called at most once per process. This crate never calls it
/// itself — [`crate::bootstrap::init`] only arms the reboot-fault
/// quiescence timer — so the embedder is responsible for calling `init`
/// once, before constructing a [`crate::supervisor::Supervisor`], if it
/// wants this logger rather than some other `log::Log` backend installed.
pub fn init(level: LevelFilter) {
    log::set_boxed_logger(Box::new(LoggerRef(&LOGGER)))
        .expect("logger must only be installed once per process");
    log::set_max_level(level);
    LOGGER.lock().unwrap().replace(Logger { stdout_enabled: true });
}

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

//! The persisted reboot-fault record (§3, §4.1, §6).
//!
//! A single file whose presence after boot means the previous boot ended via
//! a `REBOOT` fault action. It exists purely to rate-limit reboots: if the
//! same `{app}/{proc}` faults with `REBOOT` again before the quiescence
//! timer has cleared the record, `FaultLimiter` escalates to `STOP_APP`
//! instead of rebooting a second time.

use std::{fs, io, path::PathBuf};
use std::os::unix::fs::OpenOptionsExt;
use anyhow::{Context, Result};
use crate::consts::REBOOT_FAULT_RECORD_PATH;

pub struct RebootFaultRecord {
    path: PathBuf,
}

impl RebootFaultRecord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_default_path() -> Self {
        Self::new(REBOOT_FAULT_RECORD_PATH)
    }

    /// Writes `"{app_name}/{proc_name}\0"`, mode 0700. Per §7, a write
    /// failure here is a persistent-record I/O error: callers log it and
    /// continue rather than treating it as fatal.
    pub fn write(&self, app_name: &str, proc_name: &str) -> Result<()> {
        use std::io::Write;
        let contents = format!("{}/{}\0", app_name, proc_name);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o700)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// True iff the record exists and names exactly `{app_name}/{proc_name}`.
    /// Any I/O error (missing file, permission, short read, EINTR) is treated
    /// as "no record" per §5's "absence-of-file is normal" contract — this
    /// degrades fault-limit enforcement rather than panicking.
    pub fn is_for(&self, app_name: &str, proc_name: &str) -> bool {
        match self.read() {
            Some(contents) => contents == format!("{}/{}", app_name, proc_name),
            None => false,
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Unlinks the record. `ENOENT` is not an error (§4.1's quiescence
    /// handler contract).
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }

    fn read(&self) -> Option<String> {
        let bytes = fs::read(&self.path).ok()?;
        let trimmed = match bytes.iter().position(|&b| b == 0) {
            Some(nul_pos) => &bytes[..nul_pos],
            None => &bytes[..],
        };
        String::from_utf8(trimmed.to_vec()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("app_supervisor_test_{}_{}", std::process::id(), name))
    }

    #[test]
    fn round_trip_identifies_the_exact_app_and_process() {
        let path = temp_path("round_trip");
        let _ = fs::remove_file(&path);
        let rec = RebootFaultRecord::new(&path);

        assert!(!rec.exists());
        rec.write("myApp", "myProc").unwrap();
        assert!(rec.exists());
        assert!(rec.is_for("myApp", "myProc"));
        assert!(!rec.is_for("otherApp", "myProc"));
        assert!(!rec.is_for("myApp", "otherProc"));

        rec.clear().unwrap();
        assert!(!rec.exists());
    }

    #[test]
    fn clear_on_missing_file_is_not_an_error() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);
        let rec = RebootFaultRecord::new(&path);
        assert!(rec.clear().is_ok());
    }

    #[test]
    fn missing_file_is_not_a_match_for_anything() {
        let path = temp_path("absent_is_no_record");
        let _ = fs::remove_file(&path);
        let rec = RebootFaultRecord::new(&path);
        assert!(!rec.is_for("anyApp", "anyProc"));
    }
}
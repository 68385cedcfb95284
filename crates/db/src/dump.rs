// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The checkpoint orchestrator. Snapshots are written to a uniquely named
//! temp file, fsynced, and only then renamed over the canonical dump name;
//! the generation counter guarantees a crashed dump leaves an orphan the next
//! dump removes before proceeding. Checkpoints fork a writer child so the
//! host keeps serving; shutdown and panic dumps write in-process.

use std::fs;
use std::fs::File;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, info};

use crate::dbio::DbWriter;
use crate::world::World;
use crate::write::write_db;

/// Why a dump is being taken. The reason decides the temp-file name, the
/// fork decision, and the failure policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DumpReason {
    Shutdown,
    Checkpoint,
    Panic,
}

impl DumpReason {
    fn label(&self) -> &'static str {
        match self {
            DumpReason::Shutdown => "DUMPING",
            DumpReason::Checkpoint => "CHECKPOINTING",
            DumpReason::Panic => "PANIC-DUMPING",
        }
    }
}

/// An open snapshot file. `commit` pushes the bytes to stable storage; a
/// snapshot is only promoted over the canonical name after commit succeeds.
pub trait DumpFile: Write {
    fn commit(&mut self) -> io::Result<()>;
}

/// Where snapshot temp files come from. Tests substitute a failing sink to
/// exercise the abandon/retry policies.
pub trait DumpSink {
    fn create(&self, path: &Path) -> io::Result<Box<dyn DumpFile>>;
}

impl DumpFile for File {
    fn commit(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

/// The real thing: plain files on the local filesystem.
pub struct FsSink;

impl DumpSink for FsSink {
    fn create(&self, path: &Path) -> io::Result<Box<dyn DumpFile>> {
        Ok(Box::new(File::create(path)?))
    }
}

pub struct DumpConfig {
    /// Run CHECKPOINT dumps in the calling process instead of forking a
    /// writer child.
    pub unforked_checkpoints: bool,
    /// Backoff between attempts when a SHUTDOWN or PANIC dump fails. The
    /// retry loop is deliberately unbounded; losing a shutdown dump silently
    /// is worse than a stalled shutdown.
    pub retry_interval: Duration,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            unforked_checkpoints: false,
            retry_interval: Duration::from_secs(60),
        }
    }
}

enum Attempt {
    Success,
    OpenFailed,
    WriteFailed,
}

/// Owns the canonical dump name and the process-lifetime generation counter.
pub struct Dumper {
    input_path: PathBuf,
    dump_path: PathBuf,
    generation: u64,
    config: DumpConfig,
    sink: Box<dyn DumpSink>,
}

impl Dumper {
    pub fn new(input_path: &Path, dump_path: &Path, config: DumpConfig) -> Self {
        Self::with_sink(input_path, dump_path, config, Box::new(FsSink))
    }

    pub fn with_sink(
        input_path: &Path,
        dump_path: &Path,
        config: DumpConfig,
        sink: Box<dyn DumpSink>,
    ) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            dump_path: dump_path.to_path_buf(),
            generation: 0,
            config,
            sink,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Size on disk of the most recent snapshot: the canonical dump once one
    /// has been written, the input file before that.
    pub fn disk_size(&self) -> Option<u64> {
        if self.generation > 0
            && let Ok(md) = fs::metadata(&self.dump_path)
        {
            return Some(md.len());
        }
        fs::metadata(&self.input_path).ok().map(|md| md.len())
    }

    fn numbered_temp(&self, generation: u64) -> PathBuf {
        PathBuf::from(format!("{}.#{}#", self.dump_path.display(), generation))
    }

    fn panic_temp(&self) -> PathBuf {
        PathBuf::from(format!("{}.PANIC", self.dump_path.display()))
    }

    /// Dump the world for the given reason. Returns whether a snapshot was
    /// successfully put on disk (for a forked checkpoint, whether the writer
    /// child was successfully started).
    pub fn dump(&mut self, world: &World, reason: DumpReason) -> bool {
        loop {
            // Remove the previous checkpoint's temp file.
            let _ = fs::remove_file(self.numbered_temp(self.generation));

            let temp_name = if reason == DumpReason::Panic {
                self.panic_temp()
            } else {
                self.generation += 1;
                self.numbered_temp(self.generation)
            };

            info!("{} on {} ...", reason.label(), temp_name.display());

            let mut in_child = false;
            if reason == DumpReason::Checkpoint && !self.config.unforked_checkpoints {
                // SAFETY: the host is single-threaded; the child shares our
                // memory copy-on-write and does nothing but write and exit.
                match unsafe { libc::fork() } {
                    -1 => {
                        error!("Could not fork checkpointer");
                        return false;
                    }
                    0 => {
                        // Child: mark ourselves for ps(1).
                        unsafe {
                            libc::prctl(libc::PR_SET_NAME, c"checkpointer".as_ptr());
                        }
                        in_child = true;
                    }
                    _pid => {
                        // Parent: the snapshot is the child's problem now.
                        // (Command-history reset on fork belongs to the VM.)
                        return true;
                    }
                }
            }

            let success = match self.attempt(&temp_name, world, reason) {
                Attempt::Success => {
                    info!("{} on {} finished", reason.label(), temp_name.display());
                    if reason == DumpReason::Panic {
                        // Panic dumps stand alone and never replace the
                        // canonical snapshot.
                        true
                    } else {
                        let _ = fs::remove_file(&self.dump_path);
                        match fs::rename(&temp_name, &self.dump_path) {
                            Ok(()) => true,
                            Err(e) => {
                                error!("Renaming temporary dump file: {e}");
                                false
                            }
                        }
                    }
                }
                Attempt::OpenFailed => false,
                Attempt::WriteFailed => {
                    if reason == DumpReason::Checkpoint {
                        error!("Abandoning checkpoint attempt ...");
                        false
                    } else {
                        error!(
                            "Waiting {} seconds and retrying dump ...",
                            self.config.retry_interval.as_secs()
                        );
                        std::thread::sleep(self.config.retry_interval);
                        continue;
                    }
                }
            };

            if in_child {
                // We're a child, so we'd better go away.
                unsafe { libc::_exit(if success { 0 } else { 1 }) }
            }
            return success;
        }
    }

    /// One write attempt: open, write every section, commit to stable
    /// storage. Leaves no temp file behind on failure.
    fn attempt(&self, temp_name: &Path, world: &World, reason: DumpReason) -> Attempt {
        let mut f = match self.sink.create(temp_name) {
            Ok(f) => f,
            Err(e) => {
                error!("Opening temporary dump file: {e}");
                return Attempt::OpenFailed;
            }
        };
        let mut out = DbWriter::new(&mut f);
        if let Err(e) = write_db(&mut out, world, reason.label()) {
            error!("Trying to dump database: {e}");
            drop(f);
            let _ = fs::remove_file(temp_name);
            return Attempt::WriteFailed;
        }
        if let Err(e) = f.commit() {
            error!("Syncing temporary dump file: {e}");
            drop(f);
            let _ = fs::remove_file(temp_name);
            return Attempt::WriteFailed;
        }
        Attempt::Success
    }
}

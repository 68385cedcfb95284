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

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "loam-host", about = "Load a database file and dump it back out")]
pub struct Args {
    /// Database file to load at startup.
    pub input_db_file: PathBuf,

    /// Canonical path at which snapshots are written.
    pub output_db_file: PathBuf,

    /// Run checkpoints in the calling process instead of forking a writer
    /// child.
    #[arg(long)]
    pub unforked_checkpoints: bool,

    /// Enable debug-level logging.
    #[arg(long)]
    pub debug: bool,
}

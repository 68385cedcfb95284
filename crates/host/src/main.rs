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

use clap::Parser;
use eyre::bail;
use tracing::{error, info};

use loam_db::{DumpConfig, DumpReason, Dumper, load_db};

use crate::args::Args;

mod args;

fn main() -> Result<(), eyre::Report> {
    let args = Args::parse();

    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let world = match load_db(&args.input_db_file) {
        Ok(world) => world,
        Err(e) => {
            error!("DB_LOAD: Cannot load database: {e}");
            bail!("could not load {}", args.input_db_file.display());
        }
    };
    info!(
        "LOADING: {} done, will dump new database on {}",
        args.input_db_file.display(),
        args.output_db_file.display()
    );

    let config = DumpConfig {
        unforked_checkpoints: args.unforked_checkpoints,
        ..Default::default()
    };
    let mut dumper = Dumper::new(&args.input_db_file, &args.output_db_file, config);
    if !dumper.dump(&world, DumpReason::Shutdown) {
        bail!(
            "could not write shutdown dump to {}",
            args.output_db_file.display()
        );
    }

    Ok(())
}

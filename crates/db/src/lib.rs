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

//! The single-file textdump persistence core for a LambdaMOO-lineage object
//! world: bootstraps the in-memory object graph from a prior snapshot,
//! migrates the legacy v4 layout forward, validates hierarchy integrity, and
//! emits crash-atomic snapshots without quiescing the host.

pub use dbio::{DbReader, DbWriter, DbioError};
pub use dump::{DumpConfig, DumpFile, DumpReason, DumpSink, Dumper, FsSink};
pub use exec::{ExecConfig, ExecError, ExecManager, ExecOutcome};
pub use load::{LoadError, load_db, read_db_file};
pub use world::{LegacyWorld, World};
pub use write::write_db;

use loam_var::{Objid, Var};
use strum::{Display, FromRepr};

mod dbio;
mod dump;
mod exec;
mod load;
mod read;
mod upgrade;
mod validate;
mod world;
mod write;

/// On-disk format versions. Versions below `DbvNextGen` encode object
/// relations as intrusive parent/child/sibling and location/contents/next
/// chains; `DbvNextGen` and up reify them as list values.
#[repr(u16)]
#[derive(Debug, Eq, PartialEq, Display, Ord, PartialOrd, Copy, Clone, FromRepr)]
pub enum DbVersion {
    DbvPrehistory = 0, // Before format versions
    DbvExceptions = 1, // Addition of the `try', `except', `finally', and `endtry' keywords.
    DbvBreakCont = 2,  // Addition of the `break' and `continue' keywords.
    DbvFloat = 3,      // Addition of `FLOAT' and `INT' variables and the `E_FLOAT' keyword.
    DbvBfbugFixed = 4, // Bug in built-in function overrides fixed by making it use tail-calling.
    DbvNextGen = 5,    // Next-generation format: list-valued object relations.
}

/// The version new dumps are written at.
pub const CURRENT_DB_VERSION: DbVersion = DbVersion::DbvNextGen;

const HEADER_PREFIX: &str = "** LambdaMOO Database, Format Version ";
const HEADER_SUFFIX: &str = " **";

impl DbVersion {
    /// Parse a textdump header line into a version, if it is one we know.
    pub fn parse(s: &str) -> Option<DbVersion> {
        let version = s
            .strip_prefix(HEADER_PREFIX)?
            .strip_suffix(HEADER_SUFFIX)?
            .parse::<u16>()
            .ok()?;
        DbVersion::from_repr(version)
    }

    pub fn to_version_string(&self) -> String {
        format!("{}{}{}", HEADER_PREFIX, *self as u16, HEADER_SUFFIX)
    }

    /// Does this version use the intrusive-chain object layout?
    pub fn is_legacy(&self) -> bool {
        *self < DbVersion::DbvNextGen
    }
}

/// A named, ordered entry attaching an executable program to an object.
/// External code addresses verbs by index, so insertion order is load-bearing.
#[derive(Clone, Debug, PartialEq)]
pub struct Verbdef {
    pub name: String,
    pub owner: Objid,
    pub perms: u16,
    pub prep: i16,
    /// Program source, attached by the program section of the dump. The
    /// bytecode compiler is a collaborator outside this crate; we carry the
    /// text verbatim.
    pub program: Option<String>,
}

/// One property value slot. The flat propval array of an object mirrors the
/// concatenation of propdefs walked ancestor-first.
#[derive(Clone, Debug, PartialEq)]
pub struct Propval {
    pub var: Var,
    pub owner: Objid,
    pub perms: u8,
}

/// An object in the current (next-generation) layout: relations are reified
/// values. `parents` may be a scalar object reference or a list of them; a
/// freshly upgraded v4 database carries scalars.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub id: Objid,
    pub name: String,
    pub flags: u8,
    pub owner: Objid,
    pub location: Var,
    pub contents: Var,
    pub parents: Var,
    pub children: Var,
    pub verbdefs: Vec<Verbdef>,
    pub propdefs: Vec<String>,
    pub propvals: Vec<Propval>,
}

/// An object in the legacy v4 layout. Relations are intrusive chains:
/// traversing all children of P walks P.child, then sibling, sibling, ...
/// until NOTHING; likewise location/contents/next.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectV4 {
    pub id: Objid,
    pub name: String,
    pub flags: u8,
    pub owner: Objid,
    pub location: Objid,
    pub contents: Objid,
    pub next: Objid,
    pub parent: Objid,
    pub child: Objid,
    pub sibling: Objid,
    pub verbdefs: Vec<Verbdef>,
    pub propdefs: Vec<String>,
    pub propvals: Vec<Propval>,
}

#[cfg(test)]
mod tests {
    use super::{CURRENT_DB_VERSION, DbVersion};

    #[test]
    fn parse_header_versions() {
        assert_eq!(
            DbVersion::parse("** LambdaMOO Database, Format Version 4 **"),
            Some(DbVersion::DbvBfbugFixed)
        );
        assert_eq!(
            DbVersion::parse("** LambdaMOO Database, Format Version 5 **"),
            Some(DbVersion::DbvNextGen)
        );
        assert_eq!(
            DbVersion::parse("** LambdaMOO Database, Format Version 99 **"),
            None
        );
        assert_eq!(DbVersion::parse("not a header"), None);
    }

    #[test]
    fn header_round_trips() {
        let s = CURRENT_DB_VERSION.to_version_string();
        assert_eq!(DbVersion::parse(&s), Some(CURRENT_DB_VERSION));
    }

    #[test]
    fn legacy_threshold() {
        assert!(DbVersion::DbvBfbugFixed.is_legacy());
        assert!(DbVersion::DbvPrehistory.is_legacy());
        assert!(!DbVersion::DbvNextGen.is_legacy());
    }
}

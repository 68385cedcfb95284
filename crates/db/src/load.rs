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

//! The top-level load orchestrator: header parsing, section sequencing, and
//! collaborator hand-offs. A failed load leaves nothing behind; the world is
//! only handed out once every section has read cleanly and the hierarchies
//! have validated.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use loam_var::Objid;
use tracing::{error, info};

use crate::dbio::{DbReader, DbioError};
use crate::read::ObjectRecord;
use crate::upgrade::upgrade_objects;
use crate::validate::{validate_hierarchies, validate_legacy_hierarchies};
use crate::world::{LegacyWorld, World};
use crate::{DbVersion, Object, Verbdef};

const LOAD_PROGRESS_INTERVAL: usize = 10_000;
const PROGRAM_PROGRESS_INTERVAL: usize = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not open file: {0}")]
    CouldNotOpen(String),
    #[error(transparent)]
    Dbio(#[from] DbioError),
    #[error("unknown DB version: {0}")]
    UnknownVersion(String),
    #[error("bad object #{0}: {1}")]
    BadObject(i64, DbioError),
    #[error("errors in object hierarchies")]
    BrokenHierarchy,
    #[error("verb program for nonexistent object: #{0}:{1}")]
    ProgramForMissingObject(i64, usize),
    #[error("unknown verb index: #{0}:{1}")]
    UnknownVerbIndex(i64, usize),
}

/// The object table under construction, one variant per layout. Programs
/// attach to either before a legacy table is upgraded.
enum ObjTable {
    Legacy(LegacyWorld),
    Current(Vec<Option<Object>>),
}

impl ObjTable {
    fn valid(&self, oid: i64) -> bool {
        if oid < 0 {
            return false;
        }
        match self {
            ObjTable::Legacy(l) => l.valid(Objid(oid)),
            ObjTable::Current(objects) => objects
                .get(oid as usize)
                .is_some_and(|slot| slot.is_some()),
        }
    }

    fn verbdef_mut(&mut self, oid: i64, vnum: usize) -> Option<&mut Verbdef> {
        match self {
            ObjTable::Legacy(l) => l.objects.get_mut(oid as usize)?.as_mut()?.verbdefs.get_mut(vnum),
            ObjTable::Current(objects) => {
                objects.get_mut(oid as usize)?.as_mut()?.verbdefs.get_mut(vnum)
            }
        }
    }
}

/// Open and read a database file from disk.
pub fn load_db(path: &Path) -> Result<World, LoadError> {
    let f = File::open(path).map_err(|e| LoadError::CouldNotOpen(e.to_string()))?;
    info!("LOADING: {}", path.display());
    let world = read_db_file(f)?;
    info!("LOADING: {} done", path.display());
    Ok(world)
}

/// Read a complete database from a stream: header, counts, users, objects,
/// hierarchy validation, verb programs, task queue, connections, and the
/// legacy upgrade pass where the on-disk layout calls for it.
pub fn read_db_file<R: Read>(reader: R) -> Result<World, LoadError> {
    let mut r = DbReader::new(reader);

    let header = r.read_string()?;
    let Some(version) = DbVersion::parse(&header) else {
        error!("READ_DB_FILE: Unknown DB version: {header}");
        return Err(LoadError::UnknownVersion(header));
    };
    info!("version {}", header);

    let nobjs = r.read_num()? as usize;
    let nprogs = r.read_num()? as usize;
    let _dummy = r.read_num()?;
    let nusers = r.read_num()? as usize;
    info!("# users: {nusers}");

    let mut users = Vec::with_capacity(nusers);
    for _ in 0..nusers {
        users.push(r.read_objid()?);
    }

    info!("LOADING: Reading {nobjs} objects ...");
    let mut table = if version.is_legacy() {
        let mut objects = Vec::with_capacity(nobjs);
        for i in 0..nobjs {
            match r.read_object_v4(i as i64) {
                Ok(ObjectRecord::Object(o)) => objects.push(Some(o)),
                Ok(ObjectRecord::Recycled) => objects.push(None),
                Err(e) => {
                    error!("READ_DB_FILE: Bad object #{i}.");
                    return Err(LoadError::BadObject(i as i64, e));
                }
            }
            maybe_log_objects(i + 1, nobjs);
        }
        ObjTable::Legacy(LegacyWorld { objects })
    } else {
        let mut objects = Vec::with_capacity(nobjs);
        for i in 0..nobjs {
            match r.read_object(i as i64) {
                Ok(ObjectRecord::Object(o)) => objects.push(Some(o)),
                Ok(ObjectRecord::Recycled) => objects.push(None),
                Err(e) => {
                    error!("READ_DB_FILE: Bad object #{i}.");
                    return Err(LoadError::BadObject(i as i64, e));
                }
            }
            maybe_log_objects(i + 1, nobjs);
        }
        ObjTable::Current(objects)
    };

    let hierarchies_ok = match &mut table {
        ObjTable::Legacy(l) => validate_legacy_hierarchies(l),
        ObjTable::Current(objects) => {
            // The validator runs over a provisional world; users attach after.
            let mut world = World {
                version,
                objects: std::mem::take(objects),
                users: vec![],
            };
            let ok = validate_hierarchies(&mut world);
            *objects = world.objects;
            ok
        }
    };
    if !hierarchies_ok {
        error!("READ_DB_FILE: Errors in object hierarchies.");
        return Err(LoadError::BrokenHierarchy);
    }

    info!("LOADING: Reading {nprogs} MOO verb programs ...");
    for i in 1..=nprogs {
        let (oid, vnum) = r.read_program_header()?;
        if !table.valid(oid) {
            error!("READ_DB_FILE: Verb for non-existant object: #{oid}:{vnum}.");
            return Err(LoadError::ProgramForMissingObject(oid, vnum));
        }
        let Some(verbdef) = table.verbdef_mut(oid, vnum) else {
            error!("READ_DB_FILE: Unknown verb index: #{oid}:{vnum}.");
            return Err(LoadError::UnknownVerbIndex(oid, vnum));
        };
        verbdef.program = Some(r.read_program()?);
        if i % PROGRAM_PROGRESS_INTERVAL == 0 || i == nprogs {
            info!("LOADING: Done reading {i} verb programs ...");
        }
    }

    info!("LOADING: Reading forked and suspended tasks ...");
    r.read_task_queue(version)?;

    info!("LOADING: Reading list of formerly active connections ...");
    r.read_active_connections()?;

    let objects = match table {
        ObjTable::Legacy(legacy) => upgrade_objects(legacy),
        ObjTable::Current(objects) => objects,
    };

    Ok(World {
        version,
        objects,
        users,
    })
}

fn maybe_log_objects(done: usize, total: usize) {
    if done % LOAD_PROGRESS_INTERVAL == 0 || done == total {
        info!("LOADING: Done reading {done} objects ...");
    }
}

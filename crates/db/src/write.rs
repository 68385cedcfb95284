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

//! Record-level writers and the full snapshot write sequence. Everything here
//! returns `io::Error` on stream failure; the dump orchestrator catches it at
//! its top and converts it to a failed-dump verdict.

use std::io;
use std::io::Write;

use tracing::info;

use crate::dbio::DbWriter;
use crate::world::World;
use crate::{CURRENT_DB_VERSION, Object, ObjectV4, Propval, Verbdef};

const DUMP_PROGRESS_INTERVAL: usize = 10_000;
const PROGRAM_PROGRESS_INTERVAL: usize = 5_000;

impl<W: Write> DbWriter<W> {
    pub fn write_recycled(&mut self, oid: i64) -> Result<(), io::Error> {
        self.write_line(&format!("#{oid} recycled"))
    }

    /// One current-layout object record.
    pub fn write_object(&mut self, o: &Object) -> Result<(), io::Error> {
        self.write_line(&format!("#{}", o.id.0))?;
        self.write_string(&o.name)?;
        self.write_num(o.flags as i64)?;
        self.write_objid(o.owner)?;

        self.write_var(&o.location)?;
        self.write_var(&o.contents)?;

        self.write_var(&o.parents)?;
        self.write_var(&o.children)?;

        self.write_object_tail(&o.verbdefs, &o.propdefs, &o.propvals)
    }

    /// One legacy v4 object record. The empty string after the name is the
    /// historical "handles" placeholder, kept for bit-compatibility with
    /// archival tools.
    pub fn write_object_v4(&mut self, o: &ObjectV4) -> Result<(), io::Error> {
        self.write_line(&format!("#{}", o.id.0))?;
        self.write_string(&o.name)?;
        self.write_string("")?;
        self.write_num(o.flags as i64)?;
        self.write_objid(o.owner)?;

        self.write_objid(o.location)?;
        self.write_objid(o.contents)?;
        self.write_objid(o.next)?;

        self.write_objid(o.parent)?;
        self.write_objid(o.child)?;
        self.write_objid(o.sibling)?;

        self.write_object_tail(&o.verbdefs, &o.propdefs, &o.propvals)
    }

    fn write_object_tail(
        &mut self,
        verbdefs: &[Verbdef],
        propdefs: &[String],
        propvals: &[Propval],
    ) -> Result<(), io::Error> {
        self.write_num(verbdefs.len() as i64)?;
        for v in verbdefs {
            self.write_verbdef(v)?;
        }
        self.write_num(propdefs.len() as i64)?;
        for p in propdefs {
            self.write_propdef(p)?;
        }
        self.write_num(propvals.len() as i64)?;
        for p in propvals {
            self.write_propval(p)?;
        }
        Ok(())
    }

    /// The task-queue section. Queue persistence belongs to the scheduler
    /// collaborator; a snapshot taken from here carries none.
    pub fn write_task_queue(&mut self) -> Result<(), io::Error> {
        self.write_line("0 clocks")?;
        self.write_line("0 queued tasks")?;
        self.write_line("0 suspended tasks")
    }

    pub fn write_active_connections(&mut self) -> Result<(), io::Error> {
        self.write_line("0 active connections")
    }
}

/// The complete dump write sequence: header, section counts, user list,
/// object records, verb programs, task queue, connection list. `reason_label`
/// prefixes the progress log lines ("DUMPING", "CHECKPOINTING", ...).
pub fn write_db<W: Write>(
    out: &mut DbWriter<W>,
    world: &World,
    reason_label: &str,
) -> Result<(), io::Error> {
    let nobjs = world.objects.len();
    let nprogs: usize = world
        .objects
        .iter()
        .flatten()
        .map(|o| o.verbdefs.iter().filter(|v| v.program.is_some()).count())
        .sum();

    out.write_line(&CURRENT_DB_VERSION.to_version_string())?;
    out.write_num(nobjs as i64)?;
    out.write_num(nprogs as i64)?;
    out.write_num(0)?;
    out.write_num(world.users.len() as i64)?;
    for user in &world.users {
        out.write_objid(*user)?;
    }

    info!("{}: Writing {} objects ...", reason_label, nobjs);
    for (i, slot) in world.objects.iter().enumerate() {
        match slot {
            Some(o) => out.write_object(o)?,
            None => out.write_recycled(i as i64)?,
        }
        if (i + 1) % DUMP_PROGRESS_INTERVAL == 0 || i + 1 == nobjs {
            info!("{}: Done writing {} objects ...", reason_label, i + 1);
        }
    }

    info!("{}: Writing {} MOO verb programs ...", reason_label, nprogs);
    let mut written = 0;
    for (oid, o) in world.objects.iter().enumerate() {
        let Some(o) = o else { continue };
        for (vcount, v) in o.verbdefs.iter().enumerate() {
            let Some(program) = &v.program else { continue };
            out.write_line(&format!("#{oid}:{vcount}"))?;
            for line in program.lines() {
                out.write_string(line)?;
            }
            out.write_line(".")?;
            written += 1;
            if written % PROGRAM_PROGRESS_INTERVAL == 0 || written == nprogs {
                info!(
                    "{}: Done writing {} verb programs ...",
                    reason_label, written
                );
            }
        }
    }

    info!("{}: Writing forked and suspended tasks ...", reason_label);
    out.write_task_queue()?;

    info!(
        "{}: Writing list of formerly active connections ...",
        reason_label
    );
    out.write_active_connections()
}

#[cfg(test)]
mod tests {
    use loam_var::{NOTHING, Objid, v_empty_list, v_obj};
    use pretty_assertions::assert_eq;

    use crate::dbio::DbWriter;
    use crate::{Object, Verbdef};

    #[test]
    fn current_record_layout() {
        let o = Object {
            id: Objid(0),
            name: "root".into(),
            flags: 0,
            owner: NOTHING,
            location: v_obj(NOTHING),
            contents: v_empty_list(),
            parents: v_obj(NOTHING),
            children: v_empty_list(),
            verbdefs: vec![Verbdef {
                name: "look".into(),
                owner: Objid(0),
                perms: 5,
                prep: -1,
                program: None,
            }],
            propdefs: vec!["color".into()],
            propvals: vec![],
        };
        let mut out = Vec::new();
        DbWriter::new(&mut out).write_object(&o).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "#0\nroot\n0\n-1\n1\n-1\n4\n0\n1\n-1\n4\n0\n1\nlook\n0\n5\n-1\n1\ncolor\n0\n"
        );
    }

    #[test]
    fn legacy_record_carries_handles_placeholder() {
        let o = crate::ObjectV4 {
            id: Objid(0),
            name: "root".into(),
            flags: 0,
            owner: NOTHING,
            location: NOTHING,
            contents: NOTHING,
            next: NOTHING,
            parent: NOTHING,
            child: NOTHING,
            sibling: NOTHING,
            verbdefs: vec![],
            propdefs: vec![],
            propvals: vec![],
        };
        let mut out = Vec::new();
        DbWriter::new(&mut out).write_object_v4(&o).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "#0\nroot\n\n0\n-1\n-1\n-1\n-1\n-1\n-1\n-1\n0\n0\n0\n"
        );
    }
}

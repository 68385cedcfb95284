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

//! The v4 → next-generation upgrader. Runs after a legacy load has been
//! validated: materializes the intrusive chains as list values and moves
//! verb/property ownership into the new table, consuming the legacy one.

use loam_var::{NOTHING, Objid, Var, v_list, v_obj};
use tracing::info;

use crate::world::LegacyWorld;
use crate::{Object, ObjectV4};

const PROGRESS_INTERVAL: usize = 10_000;

/// Walk an intrusive chain from `start`, stepping through `across`, and
/// collect the members in chain order.
fn collect_chain(
    world: &LegacyWorld,
    start: Objid,
    across: fn(&ObjectV4) -> Objid,
) -> Vec<Var> {
    let mut members = Vec::new();
    let mut iter = start;
    while iter != NOTHING {
        members.push(v_obj(iter));
        let Some(o) = world.find_object(iter) else {
            break;
        };
        iter = across(o);
    }
    members
}

/// Upgrade every slot of the legacy table into the current layout. Recycled
/// slots stay recycled; live objects keep their id, name, flags and owner.
/// `parents` is carried as a scalar object Var, mirroring the legacy scalar
/// convention; readers accept scalar or list there.
pub fn upgrade_objects(legacy: LegacyWorld) -> Vec<Option<Object>> {
    let size = legacy.objects.len();
    info!("UPGRADING objects to new structure ...");

    // The chain walks need the whole table, so gather relations before
    // consuming it.
    let mut relations = Vec::with_capacity(size);
    for slot in &legacy.objects {
        relations.push(slot.as_ref().map(|o| {
            (
                v_list(collect_chain(&legacy, o.child, |o| o.sibling)),
                v_list(collect_chain(&legacy, o.contents, |o| o.next)),
            )
        }));
    }

    let mut log_oid = PROGRESS_INTERVAL;
    let mut new_objects = Vec::with_capacity(size);
    for (oid, (slot, relation)) in legacy.objects.into_iter().zip(relations).enumerate() {
        if oid == log_oid {
            log_oid += PROGRESS_INTERVAL;
            info!("UPGRADE: Done through #{oid} ...");
        }
        let (Some(o), Some((children, contents))) = (slot, relation) else {
            new_objects.push(None);
            continue;
        };
        new_objects.push(Some(Object {
            id: o.id,
            name: o.name,
            flags: o.flags,
            owner: o.owner,
            location: v_obj(o.location),
            contents,
            parents: v_obj(o.parent),
            children,
            verbdefs: o.verbdefs,
            propdefs: o.propdefs,
            propvals: o.propvals,
        }));
    }

    info!("UPGRADING objects to new structure ... finished.");
    new_objects
}

#[cfg(test)]
mod tests {
    use loam_var::{NOTHING, Objid, v_list, v_obj};
    use pretty_assertions::assert_eq;

    use crate::ObjectV4;
    use crate::world::LegacyWorld;

    use super::upgrade_objects;

    fn legacy(id: i64) -> ObjectV4 {
        ObjectV4 {
            id: Objid(id),
            name: format!("obj{id}"),
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
        }
    }

    #[test]
    fn chains_materialize_in_order() {
        // #0 has children #1 -> #2 -> #3 via sibling links, and #2, #3 are
        // inside it via contents/next links.
        let mut p = legacy(0);
        p.child = Objid(1);
        p.contents = Objid(2);
        let mut c1 = legacy(1);
        c1.parent = Objid(0);
        c1.sibling = Objid(2);
        let mut c2 = legacy(2);
        c2.parent = Objid(0);
        c2.sibling = Objid(3);
        c2.location = Objid(0);
        c2.next = Objid(3);
        let mut c3 = legacy(3);
        c3.parent = Objid(0);
        c3.location = Objid(0);

        let world = LegacyWorld {
            objects: vec![Some(p), Some(c1), Some(c2), Some(c3)],
        };
        let upgraded = upgrade_objects(world);
        let p = upgraded[0].as_ref().unwrap();
        assert_eq!(
            p.children,
            v_list(vec![v_obj(Objid(1)), v_obj(Objid(2)), v_obj(Objid(3))])
        );
        assert_eq!(p.contents, v_list(vec![v_obj(Objid(2)), v_obj(Objid(3))]));
        // Legacy scalar convention carries over.
        assert_eq!(p.parents, v_obj(NOTHING));
        assert_eq!(upgraded[1].as_ref().unwrap().parents, v_obj(Objid(0)));
    }

    #[test]
    fn recycled_slots_stay_recycled() {
        let world = LegacyWorld {
            objects: vec![None, Some(legacy(1))],
        };
        let upgraded = upgrade_objects(world);
        assert!(upgraded[0].is_none());
        assert!(upgraded[1].is_some());
    }
}

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

//! Hierarchy validation, one algorithm per on-disk layout. Both run three
//! phases: reference repair, cycle detection, bidirectional consistency.
//! Phase 1 repairs in place; phases 2 and 3 only report. A false return
//! aborts the load.

use loam_var::{NOTHING, Objid, Var, Variant, v_obj};
use tracing::{error, info};

use crate::world::{LegacyWorld, World, parent_refs};
use crate::{Object, ObjectV4};

const PROGRESS_INTERVAL: i64 = 10_000;

fn maybe_log_progress(oid: i64, log_oid: &mut i64) {
    if oid == *log_oid {
        *log_oid += PROGRESS_INTERVAL;
        info!("VALIDATE: Done through #{oid} ...");
    }
}

/// Validate the legacy intrusive-chain hierarchies.
pub fn validate_legacy_hierarchies(world: &mut LegacyWorld) -> bool {
    let size = world.objects.len() as i64;
    let mut broken = false;
    let mut fixed_nexts = 0;

    info!("VALIDATING the object hierarchies ...");

    info!("VALIDATE: Phase 1: Check for invalid objects ...");
    let mut log_oid = PROGRESS_INTERVAL;
    for oid in 0..size {
        maybe_log_progress(oid, &mut log_oid);
        let Some(o) = world.find_object(Objid(oid)) else {
            continue;
        };
        let mut location = o.location;
        let mut contents = o.contents;
        let mut next = o.next;
        let mut parent = o.parent;
        let mut child = o.child;
        let mut sibling = o.sibling;

        if location == NOTHING && next != NOTHING {
            next = NOTHING;
            fixed_nexts += 1;
        }
        for (field, name) in [
            (&mut parent, "parent"),
            (&mut child, "child"),
            (&mut sibling, "sibling"),
            (&mut location, "location"),
            (&mut contents, "contents"),
            (&mut next, "next"),
        ] {
            if *field != NOTHING && !world.valid(*field) {
                error!("VALIDATE: #{oid}.{name} = {field} <invalid> ... fixed.");
                *field = NOTHING;
            }
        }

        if let Some(o) = world.objects[oid as usize].as_mut() {
            o.location = location;
            o.contents = contents;
            o.next = next;
            o.parent = parent;
            o.child = child;
            o.sibling = sibling;
        }
    }

    if fixed_nexts != 0 {
        error!("VALIDATE: Fixed {fixed_nexts} should-be-null next pointer(s) ...");
    }

    info!("VALIDATE: Phase 2: Check for cycles ...");
    let mut log_oid = PROGRESS_INTERVAL;
    for oid in 0..size {
        maybe_log_progress(oid, &mut log_oid);
        let Some(o) = world.find_object(Objid(oid)) else {
            continue;
        };
        let chains: [(Objid, fn(&ObjectV4) -> Objid, &str); 4] = [
            (o.parent, |o| o.parent, "parent"),
            (o.child, |o| o.sibling, "child"),
            (o.location, |o| o.location, "location"),
            (o.contents, |o| o.next, "contents"),
        ];
        for (start, step, name) in chains {
            let mut oid2 = start;
            let mut count = 0;
            while oid2 != NOTHING {
                count += 1;
                if count > size {
                    error!("VALIDATE: Cycle in `{name}' chain of #{oid}");
                    broken = true;
                    break;
                }
                let Some(o2) = world.find_object(oid2) else {
                    break;
                };
                oid2 = step(o2);
            }
        }
    }

    // Can't continue if cycles found
    if broken {
        return false;
    }

    info!("VALIDATE: Phase 3: Check for inconsistencies ...");
    let mut log_oid = PROGRESS_INTERVAL;
    for oid in 0..size {
        maybe_log_progress(oid, &mut log_oid);
        let oid = Objid(oid);
        let Some(o) = world.find_object(oid) else {
            continue;
        };

        // Is oid on its up's down list?
        let up_checks: [(Objid, &str, fn(&ObjectV4) -> Objid, &str, fn(&ObjectV4) -> Objid); 2] = [
            (o.parent, "parent", |o| o.child, "child", |o| o.sibling),
            (
                o.location,
                "location",
                |o| o.contents,
                "contents",
                |o| o.next,
            ),
        ];
        for (up, up_name, down, down_name, across) in up_checks {
            if up == NOTHING {
                continue;
            }
            let mut oid2 = world.find_object(up).map_or(NOTHING, down);
            while oid2 != NOTHING && oid2 != oid {
                oid2 = world.find_object(oid2).map_or(NOTHING, across);
            }
            if oid2 == NOTHING {
                error!("VALIDATE: {oid} not in {up_name} ({up})'s {down_name} list.");
                broken = true;
            }
        }

        // Does everything on oid's down list point back at it?
        let down_checks: [(fn(&ObjectV4) -> Objid, Objid, &str, fn(&ObjectV4) -> Objid); 2] = [
            (|o| o.parent, o.child, "child", |o| o.sibling),
            (|o| o.location, o.contents, "contents", |o| o.next),
        ];
        for (up, down, down_name, across) in down_checks {
            let mut oid2 = down;
            while oid2 != NOTHING {
                let Some(o2) = world.find_object(oid2) else {
                    break;
                };
                if up(o2) != oid {
                    error!("VALIDATE: {oid2} erroneously on {oid}'s {down_name} list.");
                    broken = true;
                }
                oid2 = across(o2);
            }
        }
    }

    info!("VALIDATING the object hierarchies ... finished.");
    !broken
}

fn is_obj(v: &Var) -> bool {
    matches!(v.variant(), Variant::Obj(_))
}

fn is_list_of_objs(v: &Var) -> bool {
    match v.variant() {
        Variant::List(l) => l.iter().all(|e| matches!(e.variant(), Variant::Obj(_))),
        _ => false,
    }
}

fn is_obj_or_list_of_objs(v: &Var) -> bool {
    is_obj(v) || is_list_of_objs(v)
}

/// Remove dangling references from one relation Var: invalid elements are
/// dropped from lists, invalid scalars rewritten to NOTHING.
fn scrub_field(world_check: impl Fn(Objid) -> bool, oid: i64, name: &str, field: &Var) -> Var {
    match field.variant() {
        Variant::List(l) => {
            let mut scrubbed = field.clone();
            for e in l.iter() {
                let Some(target) = e.as_objid() else {
                    continue;
                };
                if target != NOTHING && !world_check(target) {
                    error!("VALIDATE: #{oid}.{name} = {target} <invalid> ... removed.");
                    let Variant::List(cur) = scrubbed.variant() else {
                        break;
                    };
                    scrubbed = cur.setremove(e);
                }
            }
            scrubbed
        }
        Variant::Obj(target) => {
            if *target != NOTHING && !world_check(*target) {
                error!("VALIDATE: #{oid}.{name} = {target} <invalid> ... fixed.");
                v_obj(NOTHING)
            } else {
                field.clone()
            }
        }
        _ => field.clone(),
    }
}

/// Validate the current-layout hierarchies.
pub fn validate_hierarchies(world: &mut World) -> bool {
    let size = world.objects.len() as i64;
    let mut broken = false;

    info!("VALIDATING the object hierarchies ...");

    info!("VALIDATE: Phase 1: Check for invalid objects ...");
    let mut log_oid = PROGRESS_INTERVAL;
    for oid in 0..size {
        maybe_log_progress(oid, &mut log_oid);
        let Some(o) = world.find_object(Objid(oid)) else {
            continue;
        };
        if !is_obj_or_list_of_objs(&o.parents) {
            error!("VALIDATE: #{oid}.parents is not an object or list of objects.");
            broken = true;
        }
        if !is_list_of_objs(&o.children) {
            error!("VALIDATE: #{oid}.children is not a list of objects.");
            broken = true;
        }
        if !is_obj(&o.location) {
            error!("VALIDATE: #{oid}.location is not an object.");
            broken = true;
        }
        if !is_list_of_objs(&o.contents) {
            error!("VALIDATE: #{oid}.contents is not a list of objects.");
            broken = true;
        }

        if !broken {
            let parents = scrub_field(|t| world.valid(t), oid, "parent", &o.parents);
            let children = scrub_field(|t| world.valid(t), oid, "child", &o.children);
            let location = scrub_field(|t| world.valid(t), oid, "location", &o.location);
            let contents = scrub_field(|t| world.valid(t), oid, "content", &o.contents);
            if let Some(o) = world.objects[oid as usize].as_mut() {
                o.parents = parents;
                o.children = children;
                o.location = location;
                o.contents = contents;
            }
        }
    }

    // Can't continue if invalid objects found
    if broken {
        return false;
    }

    info!("VALIDATE: Phase 2: Check for cycles ...");
    let mut log_oid = PROGRESS_INTERVAL;
    for oid in 0..size {
        maybe_log_progress(oid, &mut log_oid);
        let oid = Objid(oid);
        if !world.valid(oid) {
            continue;
        }
        if world.ancestors(oid).contains(&oid) {
            error!("VALIDATE: Cycle in parent chain of {oid}.");
            broken = true;
        }
        if world.all_locations(oid).contains(&oid) {
            error!("VALIDATE: Cycle in location chain of {oid}.");
            broken = true;
        }
    }

    // Can't continue if cycles found
    if broken {
        return false;
    }

    info!("VALIDATE: Phase 3: Check for inconsistencies ...");
    let mut log_oid = PROGRESS_INTERVAL;
    for oid in 0..size {
        maybe_log_progress(oid, &mut log_oid);
        let oid = Objid(oid);
        let Some(o) = world.find_object(oid) else {
            continue;
        };
        let pairs: [(&Var, &str, fn(&Object) -> &Var, &str); 4] = [
            (&o.location, "location", |o| &o.contents, "contents"),
            (&o.contents, "content", |o| &o.location, "location"),
            (&o.parents, "parent", |o| &o.children, "children"),
            (&o.children, "child", |o| &o.parents, "parents"),
        ];
        for (up, up_name, down, down_name) in pairs {
            for target in parent_refs(up) {
                let Some(otmp) = world.find_object(target) else {
                    continue;
                };
                if !parent_refs(down(otmp)).contains(&oid) {
                    error!(
                        "VALIDATE: {oid} not in it's {up_name}'s ({target}) {down_name}.",
                    );
                    broken = true;
                    break;
                }
            }
        }
    }

    info!("VALIDATING the object hierarchies ... finished.");
    !broken
}

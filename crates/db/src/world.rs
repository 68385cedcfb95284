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

use std::collections::HashSet;

use loam_var::{NOTHING, Objid, Var, Variant};

use crate::{DbVersion, Object, ObjectV4};

/// The loaded object world, in the current layout. Objects live in a dense
/// table indexed by id; recycled slots are `None` and keep their identifier
/// reserved.
#[derive(Debug)]
pub struct World {
    pub version: DbVersion,
    pub objects: Vec<Option<Object>>,
    pub users: Vec<Objid>,
}

impl World {
    pub fn find_object(&self, oid: Objid) -> Option<&Object> {
        if oid.0 < 0 {
            return None;
        }
        self.objects.get(oid.0 as usize)?.as_ref()
    }

    pub fn find_object_mut(&mut self, oid: Objid) -> Option<&mut Object> {
        if oid.0 < 0 {
            return None;
        }
        self.objects.get_mut(oid.0 as usize)?.as_mut()
    }

    pub fn valid(&self, oid: Objid) -> bool {
        self.find_object(oid).is_some()
    }

    pub fn last_used_objid(&self) -> Objid {
        Objid(self.objects.len() as i64 - 1)
    }

    /// Transitive closure of `parents`, not including `oid` itself unless a
    /// cycle leads back to it. Tolerates cyclic input; that is the condition
    /// the caller is probing for.
    pub fn ancestors(&self, oid: Objid) -> Vec<Objid> {
        self.closure(oid, |o| parent_refs(&o.parents))
    }

    /// Transitive closure of `location`, with the same cycle tolerance.
    pub fn all_locations(&self, oid: Objid) -> Vec<Objid> {
        self.closure(oid, |o| parent_refs(&o.location))
    }

    fn closure(&self, oid: Objid, step: impl Fn(&Object) -> Vec<Objid>) -> Vec<Objid> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut frontier = match self.find_object(oid) {
            Some(o) => step(o),
            None => return result,
        };
        while let Some(next) = frontier.pop() {
            if !seen.insert(next) {
                continue;
            }
            result.push(next);
            if let Some(o) = self.find_object(next) {
                frontier.extend(step(o));
            }
        }
        result
    }
}

/// The object references held by a relation Var: a scalar object yields
/// itself, a list yields its object elements. NOTHING is skipped.
pub(crate) fn parent_refs(v: &Var) -> Vec<Objid> {
    match v.variant() {
        Variant::Obj(o) if *o != NOTHING => vec![*o],
        Variant::List(l) => l
            .iter()
            .filter_map(|e| e.as_objid())
            .filter(|o| *o != NOTHING)
            .collect(),
        _ => vec![],
    }
}

/// The legacy v4 object table, alive only between load and upgrade.
pub struct LegacyWorld {
    pub objects: Vec<Option<ObjectV4>>,
}

impl LegacyWorld {
    pub fn find_object(&self, oid: Objid) -> Option<&ObjectV4> {
        if oid.0 < 0 {
            return None;
        }
        self.objects.get(oid.0 as usize)?.as_ref()
    }

    pub fn valid(&self, oid: Objid) -> bool {
        self.find_object(oid).is_some()
    }

    pub fn last_used_objid(&self) -> Objid {
        Objid(self.objects.len() as i64 - 1)
    }
}

#[cfg(test)]
mod tests {
    use loam_var::{NOTHING, Objid, v_empty_list, v_list, v_obj};

    use crate::{DbVersion, Object, World};

    fn bare_object(id: i64, parents: loam_var::Var) -> Object {
        Object {
            id: Objid(id),
            name: format!("obj{id}"),
            flags: 0,
            owner: NOTHING,
            location: v_obj(NOTHING),
            contents: v_empty_list(),
            parents,
            children: v_empty_list(),
            verbdefs: vec![],
            propdefs: vec![],
            propvals: vec![],
        }
    }

    #[test]
    fn ancestors_follows_scalar_and_list_parents() {
        let world = World {
            version: DbVersion::DbvNextGen,
            objects: vec![
                Some(bare_object(0, v_obj(Objid(1)))),
                Some(bare_object(1, v_list(vec![v_obj(Objid(2))]))),
                Some(bare_object(2, v_obj(NOTHING))),
            ],
            users: vec![],
        };
        let ancestors = world.ancestors(Objid(0));
        assert!(ancestors.contains(&Objid(1)));
        assert!(ancestors.contains(&Objid(2)));
        assert!(!ancestors.contains(&Objid(0)));
    }

    #[test]
    fn ancestors_terminates_on_cycle() {
        let world = World {
            version: DbVersion::DbvNextGen,
            objects: vec![
                Some(bare_object(0, v_obj(Objid(1)))),
                Some(bare_object(1, v_obj(Objid(0)))),
            ],
            users: vec![],
        };
        let ancestors = world.ancestors(Objid(0));
        assert!(ancestors.contains(&Objid(0)));
    }
}

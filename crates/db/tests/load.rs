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

use loam_db::{DbWriter, LoadError, read_db_file, write_db};
use loam_var::{NOTHING, Objid, v_empty_list, v_list, v_obj};
use pretty_assertions::assert_eq;

fn dump_text(lines: &[&str]) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

const TASK_AND_CONNECTION_TAIL: [&str; 4] = [
    "0 clocks",
    "0 queued tasks",
    "0 suspended tasks",
    "0 active connections",
];

/// A legacy v4 database with a single root object and nothing else.
fn minimal_legacy_lines(parent: &str) -> Vec<String> {
    let mut lines: Vec<String> = vec![
        "** LambdaMOO Database, Format Version 4 **".into(),
        "1".into(), // nobjs
        "0".into(), // nprogs
        "0".into(),
        "1".into(), // nusers
        "0".into(), // user #0
        "#0".into(),
        "root".into(),
        "".into(), // historical handles placeholder
        "0".into(),  // flags
        "-1".into(), // owner
        "-1".into(), // location
        "-1".into(), // contents
        "-1".into(), // next
        parent.into(),
        "-1".into(), // child
        "-1".into(), // sibling
        "0".into(),  // verbdefs
        "0".into(),  // propdefs
        "0".into(),  // propvals
    ];
    lines.extend(TASK_AND_CONNECTION_TAIL.iter().map(|s| s.to_string()));
    lines
}

#[test]
fn minimal_legacy_db_loads_and_upgrades() {
    let lines = minimal_legacy_lines("-1");
    let text = lines.join("\n") + "\n";
    let world = read_db_file(text.as_bytes()).expect("load");

    assert_eq!(world.users, vec![Objid(0)]);
    assert_eq!(world.objects.len(), 1);
    let o = world.objects[0].as_ref().expect("live object");
    assert_eq!(o.name, "root");
    assert_eq!(o.flags, 0);
    // The upgrader carries the legacy scalar convention forward.
    assert_eq!(o.parents, v_obj(NOTHING));
    assert_eq!(o.children, v_empty_list());
    assert_eq!(o.location, v_obj(NOTHING));
    assert_eq!(o.contents, v_empty_list());
}

#[test]
fn dangling_parent_is_repaired_during_load() {
    let lines = minimal_legacy_lines("5");
    let text = lines.join("\n") + "\n";
    let world = read_db_file(text.as_bytes()).expect("load");
    let o = world.objects[0].as_ref().expect("live object");
    assert_eq!(o.parents, v_obj(NOTHING));
}

#[test]
fn legacy_parent_cycle_aborts_load() {
    let object = |id: i64, parent: i64| -> Vec<String> {
        vec![
            format!("#{id}"),
            format!("obj{id}"),
            "".into(),
            "0".into(),
            "-1".into(), // owner
            "-1".into(), // location
            "-1".into(), // contents
            "-1".into(), // next
            format!("{parent}"),
            "-1".into(), // child
            "-1".into(), // sibling
            "0".into(),
            "0".into(),
            "0".into(),
        ]
    };
    let mut lines: Vec<String> = vec![
        "** LambdaMOO Database, Format Version 4 **".into(),
        "2".into(),
        "0".into(),
        "0".into(),
        "0".into(), // no users
    ];
    lines.extend(object(0, 1));
    lines.extend(object(1, 0));
    lines.extend(TASK_AND_CONNECTION_TAIL.iter().map(|s| s.to_string()));
    let text = lines.join("\n") + "\n";

    let err = read_db_file(text.as_bytes()).expect_err("cycle must abort the load");
    assert!(matches!(err, LoadError::BrokenHierarchy));
}

#[test]
fn upgrade_preserves_chain_order() {
    // #0 has child chain #1 -> #2 and contents chain #1 -> #2.
    let mut lines: Vec<String> = vec![
        "** LambdaMOO Database, Format Version 4 **".into(),
        "3".into(),
        "0".into(),
        "0".into(),
        "0".into(),
    ];
    // (location, contents, next, parent, child, sibling)
    let object = |id: i64, fields: [i64; 6]| -> Vec<String> {
        let mut v = vec![
            format!("#{id}"),
            format!("obj{id}"),
            "".into(),
            "0".into(),
            "-1".into(),
        ];
        v.extend(fields.iter().map(|f| f.to_string()));
        v.extend(["0".into(), "0".into(), "0".into()]);
        v
    };
    lines.extend(object(0, [-1, 1, -1, -1, 1, -1]));
    lines.extend(object(1, [0, -1, 2, 0, -1, 2]));
    lines.extend(object(2, [0, -1, -1, 0, -1, -1]));
    lines.extend(TASK_AND_CONNECTION_TAIL.iter().map(|s| s.to_string()));
    let text = lines.join("\n") + "\n";

    let world = read_db_file(text.as_bytes()).expect("load");
    let root = world.objects[0].as_ref().unwrap();
    assert_eq!(root.children, v_list(vec![v_obj(Objid(1)), v_obj(Objid(2))]));
    assert_eq!(root.contents, v_list(vec![v_obj(Objid(1)), v_obj(Objid(2))]));
    assert_eq!(world.objects[1].as_ref().unwrap().parents, v_obj(Objid(0)));
}

#[test]
fn object_id_out_of_sequence_fails_load() {
    let mut lines = minimal_legacy_lines("-1");
    // Corrupt the record id.
    let idx = lines.iter().position(|l| l == "#0").unwrap();
    lines[idx] = "#1".into();
    let text = lines.join("\n") + "\n";
    let err = read_db_file(text.as_bytes()).expect_err("out of sequence id");
    assert!(matches!(err, LoadError::BadObject(0, _)));
}

#[test]
fn unknown_version_fails_load() {
    let text = dump_text(&["** LambdaMOO Database, Format Version 99 **", "0", "0", "0", "0"]);
    let err = read_db_file(text.as_bytes()).expect_err("unknown version");
    assert!(matches!(err, LoadError::UnknownVersion(_)));
}

/// A current-layout dump exactly as the writer would produce it.
fn current_layout_dump() -> String {
    dump_text(&[
        "** LambdaMOO Database, Format Version 5 **",
        "2", // nobjs
        "1", // nprogs
        "0",
        "1", // nusers
        "0",
        "#0",
        "Root",
        "0", // flags
        "0", // owner
        "1", // location: obj
        "-1",
        "4", // contents: empty list
        "0",
        "1", // parents: obj
        "-1",
        "4", // children: empty list
        "0",
        "1", // one verbdef
        "look",
        "0",
        "5",
        "-1",
        "1", // one propdef
        "color",
        "1", // one propval
        "2", // str
        "blue",
        "0",
        "5",
        "#1 recycled",
        "#0:0",
        "return 1;",
        ".",
        "0 clocks",
        "0 queued tasks",
        "0 suspended tasks",
        "0 active connections",
    ])
}

#[test]
fn current_layout_round_trips_byte_identical() {
    let text = current_layout_dump();
    let world = read_db_file(text.as_bytes()).expect("load");

    let mut out = Vec::new();
    write_db(&mut DbWriter::new(&mut out), &world, "DUMPING").expect("dump");
    assert_eq!(String::from_utf8(out).unwrap(), text);
}

#[test]
fn recycled_slots_are_not_resurrected() {
    let text = current_layout_dump();
    let world = read_db_file(text.as_bytes()).expect("load");
    assert_eq!(world.objects.len(), 2);
    assert!(world.objects[1].is_none());
}

#[test]
fn program_for_unknown_verb_index_fails_load() {
    let text = current_layout_dump().replace("#0:0", "#0:3");
    let err = read_db_file(text.as_bytes()).expect_err("bad verb index");
    assert!(matches!(err, LoadError::UnknownVerbIndex(0, 3)));
}

#[test]
fn program_for_recycled_object_fails_load() {
    let text = current_layout_dump().replace("#0:0", "#1:0");
    let err = read_db_file(text.as_bytes()).expect_err("program for recycled slot");
    assert!(matches!(err, LoadError::ProgramForMissingObject(1, 0)));
}

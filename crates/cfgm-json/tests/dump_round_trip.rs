//! Dump Round-Trip Tests
//!
//! Parse a document, dump it, parse the dump again: the value content must
//! survive unchanged, and a second dump must be identical to the first.

use cfgm_json::{dump_to_string, merge_str, Dumper};
use cfgm_tree::{ModifyTime, Node, Walker};

const MERGE: ModifyTime = ModifyTime(2);

fn parse(text: &str) -> Node {
    let mut root = Node::new();
    merge_str(&mut root, text, MERGE).unwrap();
    root
}

fn assert_round_trip(text: &str) {
    let first = parse(text);
    let dumped = dump_to_string(&first);
    let second = parse(&dumped);
    assert_eq!(first.to_json_value(), second.to_json_value(), "dump was:\n{dumped}");
    assert_eq!(dump_to_string(&second), dumped);
}

#[test]
fn test_scalars() {
    assert_round_trip("42");
    assert_round_trip("-7");
    assert_round_trip("2.5");
    assert_round_trip("TRUE");
    assert_round_trip(r#""plain""#);
}

#[test]
fn test_escaped_strings() {
    assert_round_trip(r#"{"s": "tab\there \"quoted\" back\\slash\nnew\rline\b\f"}"#);
}

#[test]
fn test_nested_document() {
    assert_round_trip(
        r#"
        /* service settings */
        {
            "name": "api",
            "ports": [80, 443,],
            "limits": {"cpu": 0.25, "burst": [1, [2, 3]]},
            "enabled": false, // trailing comment
            "empty": {},
            "nothing": null,
        }"#,
    );
}

#[test]
fn test_prototypes_are_comments_only() {
    let mut root = Node::new();
    let mut walker = Walker::new(&mut root, ModifyTime(1));
    walker.enter_obj_prototype();
    walker.set_int(3);
    walker.exit();
    walker.enter_obj("a");
    walker.set_int(1);
    walker.exit();

    let dumped = Dumper::new().with_prototype_label("<name>").dump(&root);
    assert!(dumped.contains("// \"<name>\": 3,"));

    let reparsed = parse(&dumped);
    assert!(reparsed.obj_prototype().is_none());
    assert_eq!(reparsed.obj().len(), 1);
    assert_eq!(reparsed.obj()["a"].int(), 1);
}

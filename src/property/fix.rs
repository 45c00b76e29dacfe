//! Writing a [`PropertyTree`] into a value tree.

use cfgm_tree::{ModifyTime, Node, NodeKind, Walker};
use tracing::trace;

use super::parse::{PathNode, PropertyTree, Segment};
use super::PropertyError;

/// Furthest a property index may reach past a list's current end.
pub const MAX_INDEX_GROWTH: usize = 4096;

impl PropertyTree {
    /// Write every assignment into `root`, stamped `time`.
    ///
    /// List indices are resolved against each list's length before any of
    /// its elements are written.
    pub fn apply(&self, root: &mut Node, time: ModifyTime) -> Result<(), PropertyError> {
        let mut walker = Walker::new(root, time);
        fix_node(&mut walker, &self.root)
    }
}

fn fix_node(walker: &mut Walker<'_>, node: &PathNode) -> Result<(), PropertyError> {
    if let Some(value) = &node.value {
        trace!(path = %node.path, value = %value, "applying property");
        assign(walker, value);
    }

    let base = walker.list_len();
    for (segment, child) in &node.children {
        match segment {
            Segment::Key(key) => walker.enter_obj(key),
            Segment::Index { value, relative } => {
                let index = resolve_index(*value, *relative, base).ok_or_else(|| {
                    PropertyError::Invalid {
                        property: child.path.clone(),
                    }
                })?;
                walker.enter_list(index);
            }
        }
        let result = fix_node(walker, child);
        walker.exit();
        result?;
        walker.clear_null_for(match segment {
            Segment::Key(_) => NodeKind::Obj,
            Segment::Index { .. } => NodeKind::List,
        });
    }
    Ok(())
}

fn resolve_index(value: i64, relative: bool, base: usize) -> Option<usize> {
    let index = if relative || value < 0 {
        value.checked_add(i64::try_from(base).ok()?)?
    } else {
        value
    };
    let index = usize::try_from(index).ok()?;
    (index <= base.saturating_add(MAX_INDEX_GROWTH)).then_some(index)
}

/// Infer a kind for `value` and write it at the cursor.
fn assign(walker: &mut Walker<'_>, value: &str) {
    if value.is_empty() {
        if walker.has(NodeKind::Bool) {
            set_bool(walker, true);
        }
        return;
    }

    if let Some(int) = parse_prefixed_int(value) {
        set_int(walker, int);
        return;
    }

    let numeric = value
        .strip_prefix('-')
        .unwrap_or(value)
        .starts_with(|c: char| c.is_ascii_digit());
    if numeric {
        if let Ok(int) = value.parse::<i64>() {
            set_int(walker, int);
            return;
        }
        if let Some(float) = value.parse::<f64>().ok().filter(|f| f.is_finite()) {
            walker.set_float(float);
            walker.set_null_for(NodeKind::Float, false);
            return;
        }
    }

    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        set_string(walker, &value[1..value.len() - 1]);
        return;
    }

    match value {
        "true" => set_bool(walker, true),
        "false" => set_bool(walker, false),
        _ => set_string(walker, value),
    }
}

/// Hexadecimal, binary or octal integer literal.
fn parse_prefixed_int(value: &str) -> Option<i64> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    if !digits.starts_with('0') || digits.len() <= 2 {
        return None;
    }

    let (radix, body) = match digits.get(..2) {
        Some("0x" | "0X") => (16, &digits[2..]),
        Some("0b" | "0B") => (2, &digits[2..]),
        Some("0o" | "0O") => (8, &digits[2..]),
        _ => (8, &digits[1..]),
    };
    if body.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = i64::from_str_radix(body, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn set_int(walker: &mut Walker<'_>, value: i64) {
    walker.set_int(value);
    walker.set_null_for(NodeKind::Int, false);
    walker.set_float(value as f64);
    walker.set_null_for(NodeKind::Float, false);
}

fn set_bool(walker: &mut Walker<'_>, value: bool) {
    walker.set_bool(value);
    walker.set_null_for(NodeKind::Bool, false);
}

fn set_string(walker: &mut Walker<'_>, value: &str) {
    walker.set_string(value);
    walker.set_null_for(NodeKind::String, false);
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERGE: ModifyTime = ModifyTime(2);
    const CMD: ModifyTime = ModifyTime(4);

    fn apply(json: &str, properties: &[&str]) -> Result<Node, PropertyError> {
        let mut root = Node::new();
        cfgm_json::merge_str(&mut root, json, MERGE).unwrap();
        PropertyTree::from_properties(properties)?.apply(&mut root, CMD)?;
        Ok(root)
    }

    fn value(json: &str) -> Node {
        let property = format!("v={json}");
        let root = apply("{}", &[property.as_str()]).unwrap();
        root.obj()["v"].clone()
    }

    #[test]
    fn test_integer_forms() {
        for (text, expected) in [
            ("42", 42),
            ("-7", -7),
            ("0x1F", 31),
            ("0b101", 5),
            ("017", 15),
            ("-0x10", -16),
        ] {
            let node = value(text);
            assert!(node.has(NodeKind::Int), "{text}");
            assert_eq!(node.int(), expected, "{text}");
            assert_eq!(node.float(), expected as f64, "{text}");
        }
    }

    #[test]
    fn test_failed_prefix_falls_through() {
        let node = value("0.25");
        assert!(!node.has(NodeKind::Int));
        assert_eq!(node.float(), 0.25);

        let node = value("0xZZ");
        assert_eq!(node.string(), "0xZZ");
    }

    #[test]
    fn test_overflowing_float_stays_string() {
        let node = value("1e999");
        assert!(!node.has(NodeKind::Float));
        assert_eq!(node.string(), "1e999");
    }

    #[test]
    fn test_string_and_bool_forms() {
        assert_eq!(value("\"42\"").string(), "42");
        assert_eq!(value("hello").string(), "hello");
        assert!(value("true").boolean());
        assert!(!value("false").boolean());
        assert_eq!(value("True").string(), "True");
        assert_eq!(value("\"").string(), "\"");
    }

    #[test]
    fn test_empty_value_sets_existing_bool() {
        let root = apply(r#"{"on": false, "name": "x"}"#, &["on", "name="]).unwrap();
        assert!(root.obj()["on"].boolean());
        assert_eq!(root.obj()["on"].modify_time(), CMD);
        assert_eq!(root.obj()["name"].string(), "x");
        assert_eq!(root.obj()["name"].modify_time(), MERGE);
    }

    #[test]
    fn test_bare_path_creates_node() {
        let root = apply("{}", &["a.b"]).unwrap();
        let a = &root.obj()["a"];
        assert!(a.obj()["b"].kinds().is_empty());
        assert_eq!(a.modify_time(), CMD);
    }

    #[test]
    fn test_relative_index_uses_length_before_writes() {
        let root = apply(r#"{"a": {"b": [7]}}"#, &["a.b[0]=1", "a.b[+0]=2"]).unwrap();
        let list = root.obj()["a"].obj()["b"].list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].int(), 1);
        assert_eq!(list[1].int(), 2);
    }

    #[test]
    fn test_negative_index_counts_from_end() {
        let root = apply(r#"[1, 2, 3]"#, &["[-1]=9"]).unwrap();
        let ints: Vec<i64> = root.list().iter().map(Node::int).collect();
        assert_eq!(ints, vec![1, 2, 9]);
    }

    #[test]
    fn test_index_before_start_is_invalid() {
        let err = apply(r#"{"a": [1]}"#, &["a[-2]=0"]).unwrap_err();
        assert_eq!(
            err,
            PropertyError::Invalid {
                property: "a[-2]".into()
            }
        );
    }

    #[test]
    fn test_index_past_end_fills_gap() {
        let root = apply("{}", &["a[2]=x"]).unwrap();
        let list = root.obj()["a"].list();
        assert_eq!(list.len(), 3);
        assert!(list[0].kinds().is_empty());
        assert_eq!(list[2].string(), "x");
    }

    #[test]
    fn test_index_growth_is_bounded() {
        let huge = apply(r#"{"a": [1]}"#, &["a[9223372036854775807]=1"]).unwrap_err();
        assert_eq!(
            huge,
            PropertyError::Invalid {
                property: "a[9223372036854775807]".into()
            }
        );

        let relative = apply(r#"{"a": [1]}"#, &["a[+4096]=1"]).unwrap();
        assert_eq!(relative.obj()["a"].list().len(), 4098);
        assert!(apply(r#"{"a": [1]}"#, &["a[+4097]=1"]).is_err());
    }

    #[test]
    fn test_property_under_null_object_clears_null() {
        let mut root = Node::new();
        {
            let mut walker = Walker::new(&mut root, MERGE);
            walker.enter_obj("tls");
            walker.enter_obj("port");
            walker.set_int(0);
            walker.exit();
            walker.set_nullable_for(NodeKind::Obj, true);
            walker.set_null_for(NodeKind::Obj, true);
        }
        PropertyTree::from_properties(["tls.port=443"])
            .unwrap()
            .apply(&mut root, CMD)
            .unwrap();
        let tls = &root.obj()["tls"];
        assert!(!tls.is_null_for(NodeKind::Obj));
        assert_eq!(tls.obj()["port"].int(), 443);
    }
}

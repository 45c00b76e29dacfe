//! Lists and string-keyed maps.
//!
//! Every collection carries a prototype node: the template an element
//! starts from when it is first created during decoding. Plain `Vec` and map
//! types use the zero value of the element; [`ProtoVec`] and [`ProtoMap`]
//! carry an explicit one.
//!
//! Element type decides the override mode. Value elements (`T`) make the
//! collection replace-on-override: the first write at a new priority clears
//! it. Pointer elements (`Option<T>`) merge: existing native elements are
//! updated in place and untouched keys survive.

use std::collections::{BTreeMap, HashMap};
use std::ops::{Deref, DerefMut};

use cfgm_tree::{NodeKind, Reader, Walker};

use super::{
    CodecError, Decode, Decoder, Encode, Nullness, Schema, MAX_ELEMENT_POINTER_DEPTH,
};

const LIST_CONTEXT: &str = "elem type of slice";
const MAP_CONTEXT: &str = "value type of map";

fn check_element_depth<T: Schema>(context: &'static str) -> Result<(), CodecError> {
    if T::POINTER_DEPTH > MAX_ELEMENT_POINTER_DEPTH {
        return Err(CodecError::PointerDepth {
            level: T::POINTER_DEPTH,
            context,
        });
    }
    Ok(())
}

fn encode_prototype<T: Encode + Default>(
    walker: &mut Walker<'_>,
    prototype: Option<&T>,
) -> Result<(), CodecError> {
    match prototype {
        Some(value) => value.encode(walker, Nullness::default()),
        None => T::encode_template(walker),
    }
}

fn encode_list<'v, T, I>(
    walker: &mut Walker<'_>,
    prototype: Option<&T>,
    items: I,
    nullness: Nullness,
) -> Result<(), CodecError>
where
    T: Encode + Default + 'v,
    I: IntoIterator<Item = &'v T>,
{
    check_element_depth::<T>(LIST_CONTEXT)?;
    walker.set_clear_when_enter_for(NodeKind::List, T::POINTER_DEPTH == 0);

    walker.enter_list_prototype();
    let result = encode_prototype(walker, prototype);
    walker.exit();
    result?;

    for (index, item) in items.into_iter().enumerate() {
        walker.enter_list(index);
        let result = item.encode(walker, Nullness::default());
        walker.exit();
        result?;
    }

    nullness.apply(walker, NodeKind::List);
    Ok(())
}

fn encode_map<'v, V, I>(
    walker: &mut Walker<'_>,
    prototype: Option<&V>,
    entries: I,
    nullness: Nullness,
) -> Result<(), CodecError>
where
    V: Encode + Default + 'v,
    I: IntoIterator<Item = (&'v String, &'v V)>,
{
    check_element_depth::<V>(MAP_CONTEXT)?;
    walker.set_clear_when_enter_for(NodeKind::Obj, V::POINTER_DEPTH == 0);

    walker.enter_obj_prototype();
    let result = encode_prototype(walker, prototype);
    walker.exit();
    result?;

    for (key, value) in entries {
        walker.enter_obj(key);
        let result = value.encode(walker, Nullness::default());
        walker.exit();
        result?;
    }

    nullness.apply(walker, NodeKind::Obj);
    Ok(())
}

/// A new element: the zero value overlaid with the collection's prototype.
fn prototype_filled<'r, T, F>(reader: &mut Reader<'r>, enter_prototype: F) -> Result<T, CodecError>
where
    T: Decode + Default,
    F: FnOnce(&mut Reader<'r>) -> bool,
{
    let mut value = T::default();
    if enter_prototype(reader) {
        let result = Decoder::full().decode(&mut value, reader);
        reader.exit();
        result?;
    }
    Ok(value)
}

fn decode_list<T: Decode + Default>(
    items: &mut Vec<T>,
    reader: &mut Reader<'_>,
    decoder: &Decoder,
) -> Result<(), CodecError> {
    if !reader.has(NodeKind::List) {
        return Ok(());
    }
    let merge = T::POINTER_DEPTH > 0;
    if !merge {
        items.clear();
    }

    for index in 0..reader.list_len() {
        if merge && items.get(index).is_some_and(Schema::is_present) {
            if reader.try_enter_list(index) {
                let result = decoder.decode(&mut items[index], reader);
                reader.exit();
                result?;
            }
            continue;
        }

        let mut item: T = prototype_filled(reader, |r| r.try_enter_list_prototype())?;
        if reader.try_enter_list(index) {
            let result = Decoder::full().decode(&mut item, reader);
            reader.exit();
            result?;
        }
        if index < items.len() {
            items[index] = item;
        } else {
            items.push(item);
        }
    }
    Ok(())
}

trait Entries<V> {
    fn entry_mut(&mut self, key: &str) -> Option<&mut V>;
    fn put(&mut self, key: String, value: V);
    fn reset(&mut self);
}

impl<V> Entries<V> for BTreeMap<String, V> {
    fn entry_mut(&mut self, key: &str) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn put(&mut self, key: String, value: V) {
        self.insert(key, value);
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl<V> Entries<V> for HashMap<String, V> {
    fn entry_mut(&mut self, key: &str) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn put(&mut self, key: String, value: V) {
        self.insert(key, value);
    }

    fn reset(&mut self) {
        self.clear();
    }
}

fn decode_map<V, M>(entries: &mut M, reader: &mut Reader<'_>, decoder: &Decoder) -> Result<(), CodecError>
where
    V: Decode + Default,
    M: Entries<V>,
{
    if !reader.has(NodeKind::Obj) {
        return Ok(());
    }
    let merge = V::POINTER_DEPTH > 0;
    if !merge {
        entries.reset();
    }

    for key in reader.obj_keys() {
        if merge {
            if let Some(existing) = entries.entry_mut(key) {
                if existing.is_present() {
                    if reader.try_enter_obj(key) {
                        let result = decoder.decode(existing, reader);
                        reader.exit();
                        result?;
                    }
                    continue;
                }
            }
        }

        let mut value: V = prototype_filled(reader, |r| r.try_enter_obj_prototype())?;
        if reader.try_enter_obj(key) {
            let result = Decoder::full().decode(&mut value, reader);
            reader.exit();
            result?;
        }
        entries.put(key.to_owned(), value);
    }
    Ok(())
}

// <<<==== Vec ====>>>

impl<T> Schema for Vec<T> {
    const KIND: NodeKind = NodeKind::List;
}

impl<T: Encode + Default> Encode for Vec<T> {
    fn encode(&self, walker: &mut Walker<'_>, nullness: Nullness) -> Result<(), CodecError> {
        encode_list(walker, None, self, nullness)
    }
}

impl<T: Decode + Default> Decode for Vec<T> {
    fn decode_node(&mut self, reader: &mut Reader<'_>, decoder: &Decoder) -> Result<(), CodecError> {
        decode_list(self, reader, decoder)
    }
}

// <<<==== maps ====>>>

impl<V> Schema for BTreeMap<String, V> {
    const KIND: NodeKind = NodeKind::Obj;
}

impl<V: Encode + Default> Encode for BTreeMap<String, V> {
    fn encode(&self, walker: &mut Walker<'_>, nullness: Nullness) -> Result<(), CodecError> {
        encode_map(walker, None, self, nullness)
    }
}

impl<V: Decode + Default> Decode for BTreeMap<String, V> {
    fn decode_node(&mut self, reader: &mut Reader<'_>, decoder: &Decoder) -> Result<(), CodecError> {
        decode_map(self, reader, decoder)
    }
}

impl<V> Schema for HashMap<String, V> {
    const KIND: NodeKind = NodeKind::Obj;
}

impl<V: Encode + Default> Encode for HashMap<String, V> {
    fn encode(&self, walker: &mut Walker<'_>, nullness: Nullness) -> Result<(), CodecError> {
        encode_map(walker, None, self, nullness)
    }
}

impl<V: Decode + Default> Decode for HashMap<String, V> {
    fn decode_node(&mut self, reader: &mut Reader<'_>, decoder: &Decoder) -> Result<(), CodecError> {
        decode_map(self, reader, decoder)
    }
}

// <<<==== explicit prototypes ====>>>

/// A list with an authored template element.
///
/// Elements created by a later layer start from `prototype` instead of the
/// zero value. Dumps show the prototype as a commented entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoVec<T> {
    pub prototype: Option<T>,
    pub items: Vec<T>,
}

impl<T> Default for ProtoVec<T> {
    fn default() -> Self {
        Self {
            prototype: None,
            items: Vec::new(),
        }
    }
}

impl<T> ProtoVec<T> {
    pub fn new(prototype: T) -> Self {
        Self {
            prototype: Some(prototype),
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.items.extend(items);
        self
    }
}

impl<T> Deref for ProtoVec<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.items
    }
}

impl<T> DerefMut for ProtoVec<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }
}

impl<T> Schema for ProtoVec<T> {
    const KIND: NodeKind = NodeKind::List;
}

impl<T: Encode + Default> Encode for ProtoVec<T> {
    fn encode(&self, walker: &mut Walker<'_>, nullness: Nullness) -> Result<(), CodecError> {
        encode_list(walker, self.prototype.as_ref(), &self.items, nullness)
    }
}

impl<T: Decode + Default> Decode for ProtoVec<T> {
    fn decode_node(&mut self, reader: &mut Reader<'_>, decoder: &Decoder) -> Result<(), CodecError> {
        decode_list(&mut self.items, reader, decoder)
    }
}

/// A string-keyed map with an authored template value.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoMap<V> {
    pub prototype: Option<V>,
    pub entries: BTreeMap<String, V>,
}

impl<V> Default for ProtoMap<V> {
    fn default() -> Self {
        Self {
            prototype: None,
            entries: BTreeMap::new(),
        }
    }
}

impl<V> ProtoMap<V> {
    pub fn new(prototype: V) -> Self {
        Self {
            prototype: Some(prototype),
            entries: BTreeMap::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: V) -> Self {
        self.entries.insert(key.into(), value);
        self
    }
}

impl<V> Deref for ProtoMap<V> {
    type Target = BTreeMap<String, V>;

    fn deref(&self) -> &BTreeMap<String, V> {
        &self.entries
    }
}

impl<V> DerefMut for ProtoMap<V> {
    fn deref_mut(&mut self) -> &mut BTreeMap<String, V> {
        &mut self.entries
    }
}

impl<V> Schema for ProtoMap<V> {
    const KIND: NodeKind = NodeKind::Obj;
}

impl<V: Encode + Default> Encode for ProtoMap<V> {
    fn encode(&self, walker: &mut Walker<'_>, nullness: Nullness) -> Result<(), CodecError> {
        encode_map(walker, self.prototype.as_ref(), &self.entries, nullness)
    }
}

impl<V: Decode + Default> Decode for ProtoMap<V> {
    fn decode_node(&mut self, reader: &mut Reader<'_>, decoder: &Decoder) -> Result<(), CodecError> {
        decode_map(&mut self.entries, reader, decoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{build_from, refill};
    use cfgm_tree::{ModifyTime, Node};

    const BUILD: ModifyTime = ModifyTime(1);
    const MERGE: ModifyTime = ModifyTime(2);

    fn merge(root: &mut Node, json: &str) {
        cfgm_json::merge_str(root, json, MERGE).unwrap();
    }

    #[test]
    fn test_vec_encodes_template_and_clear_flag() {
        let root = build_from(&vec![1i64, 2], BUILD).unwrap();
        assert!(root.clear_when_enter_for(NodeKind::List));
        assert_eq!(root.list_prototype().map(|p| p.int()), Some(0));
        assert_eq!(root.list().len(), 2);

        let root = build_from(&vec![Some(1i64)], BUILD).unwrap();
        assert!(!root.clear_when_enter_for(NodeKind::List));
    }

    #[test]
    fn test_value_vec_is_replaced() {
        let mut items = vec![1i64, 2, 3];
        let mut root = build_from(&items, BUILD).unwrap();
        merge(&mut root, "[7]");
        refill(&root, &mut items, BUILD).unwrap();
        assert_eq!(items, vec![7]);
    }

    #[test]
    fn test_pointer_vec_merges_by_index() {
        let mut items = vec![Some(1i64), Some(2), Some(3)];
        let mut root = build_from(&items, BUILD).unwrap();
        merge(&mut root, "[7]");
        refill(&root, &mut items, BUILD).unwrap();
        assert_eq!(items, vec![Some(7), Some(2), Some(3)]);
    }

    #[test]
    fn test_untouched_vec_is_not_rebuilt() {
        let mut items = vec![String::from("a")];
        let before = items.as_ptr();
        let root = build_from(&items, BUILD).unwrap();
        refill(&root, &mut items, BUILD).unwrap();
        assert_eq!(items.as_ptr(), before);
    }

    #[test]
    fn test_proto_vec_fills_new_elements() {
        let mut items = ProtoVec::new(BTreeMap::from([("port".to_string(), 80i64)]));
        let mut root = build_from(&items, BUILD).unwrap();
        merge(&mut root, r#"[{"host": 1}]"#);
        refill(&root, &mut items, BUILD).unwrap();
        assert_eq!(items.len(), 1);
        // value maps are replaced wholesale, so only the explicit key remains
        assert_eq!(items[0].get("host"), Some(&1));
    }

    #[test]
    fn test_value_map_is_replaced() {
        let mut map = BTreeMap::from([("a".to_string(), 1i64), ("b".to_string(), 2)]);
        let mut root = build_from(&map, BUILD).unwrap();
        merge(&mut root, r#"{"c": 3}"#);
        refill(&root, &mut map, BUILD).unwrap();
        assert_eq!(map, BTreeMap::from([("c".to_string(), 3)]));
    }

    #[test]
    fn test_pointer_map_merges() {
        let mut map: HashMap<String, Option<i64>> =
            HashMap::from([("a".to_string(), Some(1)), ("b".to_string(), Some(2))]);
        let mut root = build_from(&map, BUILD).unwrap();
        merge(&mut root, r#"{"b": 5, "c": 3}"#);
        refill(&root, &mut map, BUILD).unwrap();
        assert_eq!(map.get("a"), Some(&Some(1)));
        assert_eq!(map.get("b"), Some(&Some(5)));
        assert_eq!(map.get("c"), Some(&Some(3)));
    }

    #[test]
    fn test_proto_map_prototype_is_not_an_entry() {
        let map = ProtoMap::new(4i64).with_entry("x", 1);
        let root = build_from(&map, BUILD).unwrap();
        assert_eq!(root.obj().len(), 1);
        assert_eq!(root.obj_prototype().map(|p| p.int()), Some(4));
        // the native value keeps its prototype
        assert_eq!(map.prototype, Some(4));
    }

    #[test]
    fn test_new_map_entry_starts_from_prototype() {
        let mut map = ProtoMap::new(4i64);
        let mut root = build_from(&map, BUILD).unwrap();
        merge(&mut root, r#"{"y": null}"#);
        refill(&root, &mut map, BUILD).unwrap();
        assert_eq!(map.get("y"), Some(&4));
    }

    #[test]
    fn test_element_pointer_depth_limit() {
        let items: Vec<Option<Option<i64>>> = vec![];
        let err = build_from(&items, BUILD).unwrap_err();
        assert_eq!(
            err,
            CodecError::PointerDepth {
                level: 2,
                context: "elem type of slice",
            }
        );

        let map: BTreeMap<String, Option<Option<i64>>> = BTreeMap::new();
        let err = build_from(&map, BUILD).unwrap_err();
        assert!(matches!(
            err,
            CodecError::PointerDepth {
                context: "value type of map",
                ..
            }
        ));
    }
}

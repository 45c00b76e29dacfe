//! Pretty printer for value trees.
//!
//! Output is tab-indented JSON that the parser in this crate reads back.
//! Prototypes are written as commented-out entries and descriptions as `//`
//! lines above their key, so a dump doubles as an annotated config template.

use std::collections::BTreeSet;
use std::io::{self, Write};

use cfgm_tree::{dominant_kind, Node, NodeKind, Reader};

/// Label written in place of a key for an object prototype.
pub const DEFAULT_PROTOTYPE_LABEL: &str = "Key";

#[derive(Debug, Default)]
struct TextWriter {
    out: String,
    level: usize,
    comment_levels: BTreeSet<usize>,
    needs_new_line: bool,
}

impl TextWriter {
    fn write_str(&mut self, s: &str) {
        self.needs_new_line = true;
        self.out.push_str(s);
    }

    fn write_char(&mut self, ch: char) {
        self.needs_new_line = true;
        self.out.push(ch);
    }

    fn enter(&mut self) {
        self.needs_new_line = true;
        self.level += 1;
    }

    fn exit(&mut self) {
        self.level -= 1;
        if self.needs_new_line {
            return;
        }
        // a fresh line is already open at the deeper level; re-indent it
        if let Some(pos) = self.out.rfind('\n') {
            self.out.truncate(pos);
            self.new_line();
        }
    }

    fn new_line(&mut self) {
        self.needs_new_line = false;
        self.out.push('\n');
        for level in 0..self.level {
            self.out.push('\t');
            if self.comment_levels.contains(&(level + 1)) {
                self.out.push_str("// ");
            }
        }
    }

    fn end_line(&mut self) {
        if self.needs_new_line {
            self.new_line();
        }
    }

    /// Comment out everything until the matching `end_comment`, including
    /// deeper lines.
    fn start_comment(&mut self) {
        self.needs_new_line = true;
        self.out.push_str("// ");
        self.comment_levels.insert(self.level);
    }

    fn end_comment(&mut self) {
        self.comment_levels.remove(&self.level);
        self.end_line();
    }

    fn comment_line(&mut self, text: &str) {
        self.out.push_str("// ");
        self.out.push_str(text);
        self.new_line();
    }
}

/// Renders a tree as commented JSON text.
#[derive(Debug, Clone)]
pub struct Dumper {
    prototype_label: String,
}

impl Default for Dumper {
    fn default() -> Self {
        Self {
            prototype_label: DEFAULT_PROTOTYPE_LABEL.to_string(),
        }
    }
}

impl Dumper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prototype_label(mut self, label: impl Into<String>) -> Self {
        self.prototype_label = label.into();
        self
    }

    pub fn dump(&self, root: &Node) -> String {
        let mut env = DumpEnv {
            json: TextWriter::default(),
            reader: Reader::new(root),
            prototype_label: &self.prototype_label,
        };
        env.dump();
        env.json.out
    }

    /// Write the dump to `writer`, returning the number of bytes written.
    pub fn dump_to_writer<W: Write>(&self, root: &Node, mut writer: W) -> io::Result<usize> {
        let text = self.dump(root);
        writer.write_all(text.as_bytes())?;
        Ok(text.len())
    }
}

pub fn dump_to_string(root: &Node) -> String {
    Dumper::default().dump(root)
}

pub fn dump_to_writer<W: Write>(root: &Node, writer: W) -> io::Result<usize> {
    Dumper::default().dump_to_writer(root, writer)
}

struct DumpEnv<'a> {
    json: TextWriter,
    reader: Reader<'a>,
    prototype_label: &'a str,
}

impl DumpEnv<'_> {
    fn dump(&mut self) {
        let Some(kind) = dominant_kind(self.reader.node()) else {
            self.json.write_str("null");
            return;
        };
        if self.reader.is_null_for(kind) {
            self.json.write_str("null");
            return;
        }
        match kind {
            NodeKind::Obj => self.dump_obj(),
            NodeKind::List => self.dump_list(),
            NodeKind::String => {
                let value = self.reader.string();
                self.dump_string(value);
            }
            NodeKind::Int => {
                let value = self.reader.int();
                self.json.write_str(&value.to_string());
            }
            NodeKind::Float => {
                let value = self.reader.float();
                if value.is_finite() {
                    self.json.write_str(&format!("{:.3}", value));
                } else {
                    self.json.write_str("null");
                }
            }
            NodeKind::Bool => {
                let value = if self.reader.boolean() { "true" } else { "false" };
                self.json.write_str(value);
            }
            NodeKind::Desc | NodeKind::ObjPrototype | NodeKind::ListPrototype => {
                self.json.write_str("null");
            }
        }
    }

    fn dump_string(&mut self, value: &str) {
        self.json.write_char('"');
        for ch in value.chars() {
            match ch {
                '"' => self.json.write_str("\\\""),
                '\\' => self.json.write_str("\\\\"),
                '\t' => self.json.write_str("\\t"),
                '\n' => self.json.write_str("\\n"),
                '\r' => self.json.write_str("\\r"),
                '\u{8}' => self.json.write_str("\\b"),
                '\u{c}' => self.json.write_str("\\f"),
                other => self.json.write_char(other),
            }
        }
        self.json.write_char('"');
    }

    fn dump_desc(&mut self) {
        if self.reader.has(NodeKind::Desc) {
            let desc = self.reader.desc();
            for line in desc.lines() {
                self.json.comment_line(line);
            }
        }
    }

    fn dump_obj(&mut self) {
        let keys = self.reader.obj_keys();
        let has_prototype = self.reader.node().obj_prototype().is_some();
        if keys.is_empty() && !has_prototype {
            self.json.write_str("{}");
            return;
        }

        self.json.write_char('{');
        self.json.enter();
        self.json.end_line();

        if self.reader.try_enter_obj_prototype() {
            self.json.start_comment();
            let label = self.prototype_label;
            self.dump_string(label);
            self.json.write_str(": ");
            self.dump();
            self.json.write_char(',');
            self.json.end_comment();
            self.reader.exit();
        }

        for (i, key) in keys.into_iter().enumerate() {
            if i != 0 {
                self.json.write_char(',');
            }
            self.json.end_line();
            if !self.reader.try_enter_obj(key) {
                continue;
            }
            self.dump_desc();
            self.dump_string(key);
            self.json.write_str(": ");
            self.dump();
            self.reader.exit();
        }

        self.json.exit();
        self.json.end_line();
        self.json.write_char('}');
    }

    fn dump_list(&mut self) {
        let len = self.reader.list_len();
        let has_prototype = self.reader.node().list_prototype().is_some();
        if len == 0 && !has_prototype {
            self.json.write_str("[]");
            return;
        }

        self.json.write_char('[');
        self.json.enter();
        self.json.end_line();

        if self.reader.try_enter_list_prototype() {
            self.json.start_comment();
            self.dump();
            self.json.write_char(',');
            self.json.end_comment();
            self.reader.exit();
        }

        for index in 0..len {
            if index != 0 {
                self.json.write_char(',');
            }
            self.json.end_line();
            if !self.reader.try_enter_list(index) {
                continue;
            }
            self.dump_desc();
            self.dump();
            self.reader.exit();
        }

        self.json.exit();
        self.json.end_line();
        self.json.write_char(']');
    }
}

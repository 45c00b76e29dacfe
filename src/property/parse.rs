//! Parsing `-D` arguments into a [`PropertyTree`].

use std::sync::OnceLock;

use regex_lite::Regex;

use super::PropertyError;

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    /// List element. Relative indices, and negative ones, are offset by the
    /// list's length when the tree is applied.
    Index { value: i64, relative: bool },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct PathNode {
    /// Path text of the first property that reached this node.
    pub(super) path: String,
    /// `None` when no property ends here.
    pub(super) value: Option<String>,
    pub(super) children: Vec<(Segment, PathNode)>,
}

impl PathNode {
    fn child(&mut self, segment: Segment, path: &str) -> &mut PathNode {
        let position = match self.children.iter().position(|(s, _)| *s == segment) {
            Some(position) => position,
            None => {
                let node = PathNode {
                    path: path.to_owned(),
                    ..PathNode::default()
                };
                self.children.push((segment, node));
                self.children.len() - 1
            }
        };
        &mut self.children[position].1
    }
}

/// Assignments collected from the command line, keyed by path.
///
/// Children keep the order in which properties first named them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyTree {
    pub(super) root: PathNode,
}

impl PropertyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect a list of `path[=value]` assignments (prefix already removed).
    pub fn from_properties<I, S>(properties: I) -> Result<Self, PropertyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        for property in properties {
            tree.insert(property.as_ref())?;
        }
        Ok(tree)
    }

    pub fn is_empty(&self) -> bool {
        self.root.value.is_none() && self.root.children.is_empty()
    }

    /// Add one `path[=value]` assignment.
    ///
    /// A bare path marks the node without a value, which later sets it to
    /// `true` if it holds a boolean. Assigning a path that already carries a
    /// non-empty value is a conflict.
    pub fn insert(&mut self, property: &str) -> Result<(), PropertyError> {
        let (path, value) = match property.split_once('=') {
            Some((path, value)) => (path, Some(value)),
            None => (property, None),
        };

        let mut node = &mut self.root;
        for (segment, prefix) in parse_path(property, path)? {
            node = node.child(segment, prefix);
        }

        match value {
            Some(value) => {
                if node.value.as_deref().is_some_and(|v| !v.is_empty()) {
                    return Err(PropertyError::Conflict {
                        path: path.to_owned(),
                    });
                }
                node.value = Some(value.to_owned());
            }
            None => {
                node.value.get_or_insert_with(String::new);
            }
        }
        Ok(())
    }
}

fn index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^\[\]]*)\[(\+)?(-?[0-9]+)\]$").expect("index pattern is valid")
    })
}

/// Split `path` into segments, pairing each with the path text up to it.
fn parse_path<'p>(property: &str, path: &'p str) -> Result<Vec<(Segment, &'p str)>, PropertyError> {
    let invalid = || PropertyError::Invalid {
        property: property.to_owned(),
    };

    let mut segments = Vec::new();
    let mut start = 0;
    for part in path.split('.') {
        if part.is_empty() {
            return Err(invalid());
        }
        let end = start + part.len();
        match index_pattern().captures(part) {
            Some(caps) => {
                let name = caps.get(1).map_or("", |m| m.as_str());
                if !name.is_empty() {
                    segments.push((Segment::Key(name.to_owned()), &path[..start + name.len()]));
                }
                let value = caps[3].parse::<i64>().map_err(|_| invalid())?;
                let relative = caps.get(2).is_some();
                segments.push((Segment::Index { value, relative }, &path[..end]));
            }
            None => segments.push((Segment::Key(part.to_owned()), &path[..end])),
        }
        start = end + 1;
    }
    Ok(segments)
}

/// Arguments relevant to configuration, split out of a full command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandLine {
    /// Value of the last config-file argument, if any was non-empty.
    pub config_file: Option<String>,
    pub properties: PropertyTree,
}

/// Pick the config-file argument and the property assignments out of `args`.
///
/// The config prefix is checked first, so it wins when both prefixes match.
/// Arguments matching neither prefix are ignored.
pub fn parse_command_line<I, S>(
    args: I,
    config_prefix: &str,
    property_prefix: &str,
) -> Result<CommandLine, PropertyError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut command_line = CommandLine::default();
    for arg in args {
        let arg = arg.as_ref();
        if let Some(path) = arg.strip_prefix(config_prefix) {
            command_line.config_file = (!path.is_empty()).then(|| path.to_owned());
        } else if let Some(property) = arg.strip_prefix(property_prefix) {
            command_line.properties.insert(property)?;
        }
    }
    Ok(command_line)
}

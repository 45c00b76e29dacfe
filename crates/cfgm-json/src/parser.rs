//! Recursive-descent parser that merges a document into a value tree.
//!
//! There is no intermediate document model: every value is written through a
//! [`Walker`] as soon as it is recognised, so the walker's priority and
//! clear-when-enter rules decide how the document combines with what the tree
//! already holds.
//!
//! Grammar, with commas between members optional and a trailing comma
//! tolerated:
//!
//! ```text
//! node    := object | list | int | float | bool | null | string
//! object  := '{' (string ':' node ','?)* '}'
//! list    := '[' (node ','?)* ']'
//! ```

use std::collections::HashSet;
use std::io::{self, BufRead};

use cfgm_tree::{dominant_kind, ModifyTime, Node, NodeKind, Walker};
use tracing::debug;

use crate::chars::Utf8Chars;
use crate::error::{LexError, ParseError};
use crate::token::{Token, Tokenizer};

pub struct Parser<'w, 'a, I> {
    tokens: Tokenizer<I>,
    walker: &'w mut Walker<'a>,
    current: Option<Token>,
    line: usize,
    column: usize,
}

impl<'w, 'a, I> Parser<'w, 'a, I>
where
    I: Iterator<Item = io::Result<char>>,
{
    pub fn new(tokens: Tokenizer<I>, walker: &'w mut Walker<'a>) -> Self {
        Self {
            tokens,
            walker,
            current: None,
            line: 1,
            column: 1,
        }
    }

    /// Parse exactly one node at the walker's position.
    ///
    /// Anything other than trivia after the node is an error.
    pub fn parse_document(mut self) -> Result<(), ParseError> {
        self.advance()?;
        self.parse_node()?;
        match self.current.take() {
            None => Ok(()),
            Some(token) => Err(self.unexpected(&token)),
        }
    }

    fn lex_error(&self, source: LexError) -> ParseError {
        ParseError::Lex {
            line: self.line,
            column: self.column,
            source,
        }
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        let next = self.tokens.next_token();
        let (line, column) = self.tokens.start_position();
        self.line = line;
        self.column = column;
        let token = next.map_err(|e| self.lex_error(e))?;
        self.current = token;
        Ok(())
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.line,
            column: self.column,
            token: token.to_string(),
        }
    }

    fn end_of_input(&mut self) -> ParseError {
        let source = self.tokens.end_error();
        self.lex_error(source)
    }

    fn parse_node(&mut self) -> Result<(), ParseError> {
        let Some(token) = self.current.take() else {
            return Err(self.end_of_input());
        };
        match token {
            Token::LeftBrace => self.parse_object(),
            Token::LeftSquare => self.parse_list(),
            Token::Int(value) => {
                self.walker.set_int(value);
                self.walker.set_null_for(NodeKind::Int, false);
                self.walker.set_float(value as f64);
                self.walker.set_null_for(NodeKind::Float, false);
                self.advance()
            }
            Token::Float(value) => {
                self.walker.set_float(value);
                self.walker.set_null_for(NodeKind::Float, false);
                self.advance()
            }
            Token::Bool(value) => {
                self.walker.set_bool(value);
                self.walker.set_null_for(NodeKind::Bool, false);
                self.advance()
            }
            Token::String(value) => {
                self.walker.set_string(value);
                self.walker.set_null_for(NodeKind::String, false);
                self.advance()
            }
            Token::Null => {
                self.set_null();
                self.advance()
            }
            other => Err(self.unexpected(&other)),
        }
    }

    /// `null` only nulls the node's dominant kind, and only when that kind
    /// was declared nullable.
    fn set_null(&mut self) {
        if let Some(kind) = dominant_kind(self.walker.node()) {
            if self.walker.nullable_for(kind) {
                self.walker.set_null_for(kind, true);
            }
        }
    }

    fn parse_object(&mut self) -> Result<(), ParseError> {
        self.advance()?;
        let mut seen = HashSet::new();
        loop {
            match self.current.take() {
                Some(Token::String(key)) => {
                    if !seen.insert(key.clone()) {
                        return Err(ParseError::DuplicateKey {
                            line: self.line,
                            column: self.column,
                            key,
                        });
                    }
                    self.parse_member(&key)?;
                }
                Some(Token::RightBrace) => {
                    if !seen.is_empty() {
                        self.walker.clear_null_for(NodeKind::Obj);
                    }
                    return self.advance();
                }
                Some(token) => return Err(self.unexpected(&token)),
                None => return Err(self.end_of_input()),
            }
        }
    }

    fn parse_member(&mut self, key: &str) -> Result<(), ParseError> {
        self.advance()?;
        match self.current.take() {
            Some(Token::Colon) => {}
            Some(token) => return Err(self.unexpected(&token)),
            None => return Err(self.end_of_input()),
        }
        self.advance()?;
        match &self.current {
            Some(token) if token.starts_value() => {}
            Some(token) => return Err(self.unexpected(token)),
            None => return Err(self.end_of_input()),
        }

        self.walker.enter_obj(key);
        let result = self.parse_node();
        self.walker.exit();
        result?;
        self.skip_comma()
    }

    fn parse_list(&mut self) -> Result<(), ParseError> {
        self.advance()?;
        let mut index = 0;
        while matches!(&self.current, Some(token) if token.starts_value()) {
            self.walker.enter_list(index);
            let result = self.parse_node();
            self.walker.exit();
            result?;
            self.skip_comma()?;
            index += 1;
        }
        match self.current.take() {
            Some(Token::RightSquare) => {
                if index > 0 {
                    self.walker.clear_null_for(NodeKind::List);
                }
                self.advance()
            }
            Some(token) => Err(self.unexpected(&token)),
            None => Err(self.end_of_input()),
        }
    }

    fn skip_comma(&mut self) -> Result<(), ParseError> {
        if self.current == Some(Token::Comma) {
            self.advance()?;
        }
        Ok(())
    }
}

/// Merge a document read from `reader` into `root` at priority `time`.
pub fn merge<R: BufRead>(root: &mut Node, reader: R, time: ModifyTime) -> Result<(), ParseError> {
    let mut walker = Walker::new(root, time);
    merge_at(&mut walker, Tokenizer::new(Utf8Chars::new(reader)))
}

/// Merge an in-memory document into `root` at priority `time`.
pub fn merge_str(root: &mut Node, text: &str, time: ModifyTime) -> Result<(), ParseError> {
    let mut walker = Walker::new(root, time);
    merge_at(&mut walker, Tokenizer::from_text(text))
}

/// Merge a document at the walker's current position.
pub fn merge_at<I>(walker: &mut Walker<'_>, tokens: Tokenizer<I>) -> Result<(), ParseError>
where
    I: Iterator<Item = io::Result<char>>,
{
    let time = walker.time();
    debug!(%time, depth = walker.depth(), "merging document");
    let result = Parser::new(tokens, walker).parse_document();
    if let Err(ref e) = result {
        debug!(%time, error = %e, "document rejected");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgm_tree::Reader;

    const BUILD: ModifyTime = ModifyTime(1);
    const MERGE: ModifyTime = ModifyTime(2);

    #[test]
    fn test_parse_into_empty_tree() {
        let mut root = Node::new();
        merge_str(
            &mut root,
            r#"{"name": "svc", "port": 80, "ratio": 0.5, "on": true, "tags": ["a", "b"]}"#,
            BUILD,
        )
        .unwrap();

        let obj = root.obj();
        assert_eq!(obj["name"].string(), "svc");
        assert_eq!(obj["port"].int(), 80);
        assert_eq!(obj["port"].float(), 80.0);
        assert!(obj["port"].has(NodeKind::Float));
        assert_eq!(obj["ratio"].float(), 0.5);
        assert!(!obj["ratio"].has(NodeKind::Int));
        assert!(obj["on"].boolean());
        let tags: Vec<_> = obj["tags"].list().iter().map(|n| n.string()).collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(root.modify_time(), BUILD);
    }

    #[test]
    fn test_merge_keeps_untouched_keys() {
        let mut root = Node::new();
        merge_str(&mut root, r#"{"a": 1, "b": 2}"#, BUILD).unwrap();
        merge_str(&mut root, r#"{"b": 3}"#, MERGE).unwrap();

        let mut reader = Reader::new(&root);
        assert!(reader.try_enter_obj("a"));
        assert_eq!(reader.int(), 1);
        assert_eq!(reader.modify_time(), BUILD);
        reader.exit();
        assert!(reader.try_enter_obj("b"));
        assert_eq!(reader.int(), 3);
        assert_eq!(reader.modify_time(), MERGE);
    }

    #[test]
    fn test_relaxed_syntax() {
        let mut root = Node::new();
        let text = r#"
            // comment
            {
                "a": [1, 2, 3,],
                "b": TRUE /* block */
                "c": Null,
            }
        "#;
        merge_str(&mut root, text, BUILD).unwrap();
        assert_eq!(root.obj()["a"].list().len(), 3);
        assert!(root.obj()["b"].boolean());
        assert!(root.obj()["c"].kinds().is_empty());
    }

    #[test]
    fn test_null_requires_nullable() {
        let mut root = Node::new();
        {
            let mut walker = Walker::new(&mut root, BUILD);
            walker.enter_obj("opt");
            walker.set_int(5);
            walker.set_nullable_for(NodeKind::Int, true);
            walker.exit();
            walker.enter_obj("req");
            walker.set_int(6);
            walker.exit();
        }
        merge_str(&mut root, r#"{"opt": null, "req": null}"#, MERGE).unwrap();

        assert!(root.obj()["opt"].is_null_for(NodeKind::Int));
        assert!(!root.obj()["req"].is_null_for(NodeKind::Int));
        assert_eq!(root.obj()["req"].int(), 6);
    }

    #[test]
    fn test_value_clears_null_flag() {
        let mut root = Node::new();
        {
            let mut walker = Walker::new(&mut root, BUILD);
            walker.set_int(0);
            walker.set_nullable_for(NodeKind::Int, true);
            walker.set_null_for(NodeKind::Int, true);
        }
        merge_str(&mut root, "7", MERGE).unwrap();
        assert!(!root.is_null_for(NodeKind::Int));
        assert_eq!(root.int(), 7);
    }

    #[test]
    fn test_members_clear_collection_null() {
        let mut root = Node::new();
        {
            let mut walker = Walker::new(&mut root, BUILD);
            for key in ["obj", "list", "empty"] {
                walker.enter_obj(key);
                walker.set_nullable_for(NodeKind::Obj, true);
                walker.set_null_for(NodeKind::Obj, true);
                walker.set_nullable_for(NodeKind::List, true);
                walker.set_null_for(NodeKind::List, true);
                walker.exit();
            }
        }
        merge_str(&mut root, r#"{"obj": {"a": 1}, "list": [1], "empty": {}}"#, MERGE).unwrap();

        let obj = root.obj();
        assert!(!obj["obj"].is_null_for(NodeKind::Obj));
        assert!(obj["obj"].is_null_for(NodeKind::List));
        assert!(!obj["list"].is_null_for(NodeKind::List));
        assert!(obj["list"].is_null_for(NodeKind::Obj));
        assert!(obj["empty"].is_null_for(NodeKind::Obj));
    }

    #[test]
    fn test_duplicate_key_reports_second_occurrence() {
        let mut root = Node::new();
        let text = "{\n\t\"A\": 1,\n\t\"A\": 2\n}";
        let err = merge_str(&mut root, text, BUILD).unwrap_err();
        match err {
            ParseError::DuplicateKey { line, column, key } => {
                assert_eq!((line, column), (3, 2));
                assert_eq!(key, "A");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_same_key_in_sibling_objects_is_fine() {
        let mut root = Node::new();
        merge_str(&mut root, r#"{"x": {"A": 1}, "y": {"A": 2}}"#, BUILD).unwrap();
        assert_eq!(root.obj()["y"].obj()["A"].int(), 2);
    }

    #[test]
    fn test_unexpected_token_position() {
        let mut root = Node::new();
        let err = merge_str(&mut root, "{\"a\" 1}", BUILD).unwrap_err();
        match err {
            ParseError::UnexpectedToken { line, column, token } => {
                assert_eq!((line, column), (1, 6));
                assert_eq!(token, "1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lex_error_is_wrapped_with_token_start() {
        let mut root = Node::new();
        let err = merge_str(&mut root, "[1, @]", BUILD).unwrap_err();
        match err {
            ParseError::Lex { line, column, source } => {
                assert_eq!((line, column), (1, 5));
                assert!(matches!(source, LexError::UnexpectedCharacter { ch: '@', .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_document() {
        let mut root = Node::new();
        let err = merge_str(&mut root, "{\"a\": [1, 2", BUILD).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Lex {
                source: LexError::UnexpectedEnd { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_empty_document_is_error() {
        let mut root = Node::new();
        assert!(merge_str(&mut root, "  // nothing\n", BUILD).is_err());
    }

    #[test]
    fn test_trailing_garbage_is_error() {
        let mut root = Node::new();
        let err = merge_str(&mut root, "{} }", BUILD).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { column: 4, .. }));
    }

    #[test]
    fn test_merge_from_reader() {
        let mut root = Node::new();
        let text = "{\"name\": \"服务\"}";
        merge(&mut root, io::Cursor::new(text.as_bytes()), BUILD).unwrap();
        assert_eq!(root.obj()["name"].string(), "服务");
    }

    #[test]
    fn test_merge_at_subtree() {
        let mut root = Node::new();
        {
            let mut walker = Walker::new(&mut root, BUILD);
            walker.enter_obj("inner");
            merge_at(&mut walker, Tokenizer::from_text("[true]")).unwrap();
            walker.exit();
        }
        assert!(root.obj()["inner"].list()[0].boolean());
    }
}

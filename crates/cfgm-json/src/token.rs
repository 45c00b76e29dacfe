//! Relaxed JSON tokenizer.
//!
//! Accepts standard JSON plus `//` line comments, `/* */` block comments and
//! case-insensitive `true`/`false`/`null`. Positions are 1-based; the column
//! restarts at 1 after every newline.

use std::fmt;
use std::io;

use crate::error::LexError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LeftBrace,
    RightBrace,
    LeftSquare,
    RightSquare,
    Comma,
    Colon,
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    String(String),
}

impl Token {
    /// Whether the token can start a value.
    pub fn starts_value(&self) -> bool {
        matches!(
            self,
            Token::LeftBrace
                | Token::LeftSquare
                | Token::Int(_)
                | Token::Float(_)
                | Token::Bool(_)
                | Token::Null
                | Token::String(_)
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LeftBrace => f.write_str("'{'"),
            Token::RightBrace => f.write_str("'}'"),
            Token::LeftSquare => f.write_str("'['"),
            Token::RightSquare => f.write_str("']'"),
            Token::Comma => f.write_str("','"),
            Token::Colon => f.write_str("':'"),
            Token::Int(value) => write!(f, "{}", value),
            Token::Float(value) => write!(f, "{:.10}", value),
            Token::Bool(value) => write!(f, "{}", value),
            Token::Null => f.write_str("null"),
            Token::String(value) => write!(f, "{:?}", value),
        }
    }
}

/// Pulls tokens from a character source.
///
/// The source yields `io::Result<char>` so read failures surface as
/// [`LexError::UnexpectedEnd`] at the position where they happened.
pub struct Tokenizer<I> {
    chars: I,
    current: Option<char>,
    read_error: Option<io::Error>,
    line: usize,
    column: usize,
    start_line: usize,
    start_column: usize,
}

/// Character source over an in-memory string.
pub type StrChars<'s> = std::iter::Map<std::str::Chars<'s>, fn(char) -> io::Result<char>>;

impl<'s> Tokenizer<StrChars<'s>> {
    pub fn from_text(text: &'s str) -> Self {
        Tokenizer::new(text.chars().map(Ok::<char, io::Error> as fn(char) -> io::Result<char>))
    }
}

impl<I> Tokenizer<I>
where
    I: Iterator<Item = io::Result<char>>,
{
    pub fn new(chars: I) -> Self {
        let mut tokenizer = Self {
            chars,
            current: None,
            read_error: None,
            line: 1,
            column: 0,
            start_line: 1,
            start_column: 1,
        };
        tokenizer.bump();
        tokenizer
    }

    /// Position where the most recent token started.
    pub fn start_position(&self) -> (usize, usize) {
        (self.start_line, self.start_column)
    }

    /// Position of the next unread character.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        if self.current == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        if self.read_error.is_some() {
            self.current = None;
            return None;
        }
        self.current = match self.chars.next() {
            Some(Ok(ch)) => Some(ch),
            Some(Err(e)) => {
                self.read_error = Some(e);
                None
            }
            None => None,
        };
        self.current
    }

    fn unexpected(&self, ch: char) -> LexError {
        LexError::UnexpectedCharacter {
            line: self.line,
            column: self.column,
            ch,
        }
    }

    /// Error for input that stops where more was required.
    ///
    /// Wraps the pending read failure if there is one.
    pub fn end_error(&mut self) -> LexError {
        let source = self.read_error.take().unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "end of input")
        });
        LexError::UnexpectedEnd {
            line: self.line,
            column: self.column,
            source,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        while let Some(ch) = self.current {
            match ch {
                ' ' | '\t' | '\n' | '\r' => {
                    self.bump();
                }
                '/' => match self.bump() {
                    Some('/') => {
                        while !matches!(self.bump(), None | Some('\n')) {}
                    }
                    Some('*') => self.skip_block_comment()?,
                    Some(other) => return Err(self.unexpected(other)),
                    None => return Err(self.end_error()),
                },
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let mut star = false;
        loop {
            match self.bump() {
                None => return Err(self.end_error()),
                Some('/') if star => {
                    self.bump();
                    return Ok(());
                }
                Some(ch) => star = ch == '*',
            }
        }
    }

    /// Next token, or `None` at a clean end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_trivia()?;
        self.start_line = self.line;
        self.start_column = self.column;

        let Some(ch) = self.current else {
            if self.read_error.is_some() {
                return Err(self.end_error());
            }
            return Ok(None);
        };

        let token = match ch {
            '{' => self.single(Token::LeftBrace),
            '}' => self.single(Token::RightBrace),
            '[' => self.single(Token::LeftSquare),
            ']' => self.single(Token::RightSquare),
            ',' => self.single(Token::Comma),
            ':' => self.single(Token::Colon),
            '"' => self.lex_string()?,
            '-' | '0'..='9' => self.lex_number()?,
            't' | 'T' => {
                self.lex_keyword("true")?;
                Token::Bool(true)
            }
            'f' | 'F' => {
                self.lex_keyword("false")?;
                Token::Bool(false)
            }
            'n' | 'N' => {
                self.lex_keyword("null")?;
                Token::Null
            }
            other => return Err(self.unexpected(other)),
        };
        Ok(Some(token))
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn lex_keyword(&mut self, word: &str) -> Result<(), LexError> {
        for expected in word.chars().skip(1) {
            match self.bump() {
                None => return Err(self.end_error()),
                Some(ch) if ch.eq_ignore_ascii_case(&expected) => {}
                Some(ch) => return Err(self.unexpected(ch)),
            }
        }
        self.bump();
        Ok(())
    }

    fn lex_number(&mut self) -> Result<Token, LexError> {
        let mut text = String::new();
        let mut is_float = false;
        if self.current == Some('-') {
            text.push('-');
            self.bump();
        }
        while let Some(ch) = self.current {
            match ch {
                '0'..='9' => text.push(ch),
                '.' if !is_float => {
                    is_float = true;
                    text.push(ch);
                }
                '.' => return Err(self.unexpected(ch)),
                _ => break,
            }
            self.bump();
        }

        let invalid = || LexError::InvalidNumber {
            line: self.start_line,
            column: self.start_column,
            text: text.clone(),
        };
        if is_float {
            let digits = text.strip_prefix('-').unwrap_or(&text);
            if digits.starts_with('.') || digits.ends_with('.') {
                return Err(invalid());
            }
            match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Token::Float(value)),
                _ => Err(invalid()),
            }
        } else {
            text.parse::<i64>().map(Token::Int).map_err(|_| invalid())
        }
    }

    fn lex_string(&mut self) -> Result<Token, LexError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.end_error()),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    None => return Err(self.end_error()),
                    Some('b') => value.push('\u{8}'),
                    Some('f') => value.push('\u{c}'),
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some(ch @ ('"' | '\\' | '/' | '\'')) => value.push(ch),
                    Some(ch) => {
                        value.push('\\');
                        value.push(ch);
                    }
                },
                Some(ch) => value.push(ch),
            }
        }
        self.bump();
        Ok(Token::String(value))
    }
}

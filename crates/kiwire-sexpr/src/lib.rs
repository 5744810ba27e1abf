//! S-expression parsing and formatting for KiCad files.
//!
//! Atoms keep their exact source text: numbers are not normalized on parse,
//! so a value read from a file is written back the way it was found. Only
//! values created through [`Sexpr::number`] go through numeric formatting.

use std::fmt;

mod format;

pub use format::{format_number, format_sexpr};

/// An S-expression value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sexpr {
    /// A symbol - unquoted identifier or number
    Symbol(String),
    /// A string - quoted text
    String(String),
    /// A list of S-expressions
    List(Vec<Sexpr>),
}

impl Sexpr {
    /// Create a symbol (unquoted atom)
    pub fn symbol(s: impl Into<String>) -> Self {
        Sexpr::Symbol(s.into())
    }

    /// Create a string (quoted atom)
    pub fn string(s: impl Into<String>) -> Self {
        Sexpr::String(s.into())
    }

    /// Create a numeric atom rounded to KiCad's 1e-4 resolution.
    pub fn number(value: f64) -> Self {
        Sexpr::Symbol(format_number(value))
    }

    /// Create a list from a vector of S-expressions
    pub fn list(items: Vec<Sexpr>) -> Self {
        Sexpr::List(items)
    }

    /// Shorthand for `(tag value...)` lists.
    pub fn node(tag: &str, values: impl IntoIterator<Item = Sexpr>) -> Self {
        let mut items = vec![Sexpr::symbol(tag)];
        items.extend(values);
        Sexpr::List(items)
    }

    pub fn is_atom(&self) -> bool {
        self.as_atom().is_some()
    }

    pub fn is_list(&self) -> bool {
        self.as_list().is_some()
    }

    /// Get the atom value if this is an atom (symbol or string)
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexpr::Symbol(s) | Sexpr::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parse an atom as a floating point number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Sexpr::Symbol(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexpr]> {
        match self {
            Sexpr::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Sexpr>> {
        match self {
            Sexpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// The leading symbol of a list, e.g. `wire` for `(wire (pts ...))`.
    pub fn tag(&self) -> Option<&str> {
        match self.as_list()?.first()? {
            Sexpr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// First direct child list whose tag is `tag`.
    pub fn find_child(&self, tag: &str) -> Option<&Sexpr> {
        self.as_list()?
            .iter()
            .skip(1)
            .find(|item| item.tag() == Some(tag))
    }

    pub fn find_child_mut(&mut self, tag: &str) -> Option<&mut Sexpr> {
        self.as_list_mut()?
            .iter_mut()
            .skip(1)
            .find(|item| item.tag() == Some(tag))
    }

    /// All direct child lists whose tag is `tag`, in source order.
    pub fn find_children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Sexpr> + 'a {
        self.as_list()
            .unwrap_or_default()
            .iter()
            .skip(1)
            .filter(move |item| item.tag() == Some(tag))
    }

    /// Atom at `index` inside the child list `tag`; index 0 is the tag itself.
    pub fn child_atom(&self, tag: &str, index: usize) -> Option<&str> {
        self.find_child(tag)?.as_list()?.get(index)?.as_atom()
    }

    /// Numeric atom at `index` inside the child list `tag`.
    pub fn child_f64(&self, tag: &str, index: usize) -> Option<f64> {
        self.find_child(tag)?.as_list()?.get(index)?.as_f64()
    }

    /// Whether a bare flag symbol such as `hide` or `power` is present among
    /// the direct children.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.as_list().is_some_and(|items| {
            items.iter().skip(1).any(|item| match item {
                Sexpr::Symbol(s) => s == flag,
                Sexpr::List(list) => list.len() == 1 && item.tag() == Some(flag),
                Sexpr::String(_) => false,
            })
        })
    }
}

/// Errors that can occur during parsing. Offsets are byte positions in the
/// input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("expected '{expected}', found '{found}' at offset {offset}")]
    UnexpectedChar {
        found: char,
        expected: char,
        offset: usize,
    },
    #[error("list opened at offset {offset} is never closed")]
    UnclosedList { offset: usize },
    #[error("string starting at offset {offset} is not terminated")]
    UnterminatedString { offset: usize },
    #[error("empty atom at offset {offset}")]
    EmptyAtom { offset: usize },
    #[error("unexpected trailing input at offset {offset}")]
    TrailingInput { offset: usize },
}

/// Parser for S-expressions
pub struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            chars: input.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Parse exactly one expression; anything but whitespace and comments
    /// after it is an error.
    pub fn parse(&mut self) -> Result<Sexpr, ParseError> {
        let expr = self.parse_expr()?;
        self.skip_whitespace();
        if !self.is_at_end() {
            return Err(ParseError::TrailingInput {
                offset: self.current_pos,
            });
        }
        Ok(expr)
    }

    /// Parse every top-level expression in the input.
    pub fn parse_all(&mut self) -> Result<Vec<Sexpr>, ParseError> {
        let mut results = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            results.push(self.parse_expr()?);
        }

        Ok(results)
    }

    fn parse_expr(&mut self) -> Result<Sexpr, ParseError> {
        self.skip_whitespace();
        if self.is_at_end() {
            return Err(ParseError::UnexpectedEof);
        }

        if self.peek_char() == Some('(') {
            self.parse_list()
        } else {
            self.parse_atom()
        }
    }

    fn parse_list(&mut self) -> Result<Sexpr, ParseError> {
        let start_pos = self.current_pos;
        self.expect('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            match self.peek_char() {
                None => return Err(ParseError::UnclosedList { offset: start_pos }),
                Some(')') => {
                    self.advance();
                    break;
                }
                Some(_) => items.push(self.parse_expr()?),
            }

            if items.len() % 1000 == 0 {
                log::trace!(
                    "Parsed {} items in list at offset {start_pos}",
                    items.len()
                );
            }
        }

        Ok(Sexpr::List(items))
    }

    fn parse_atom(&mut self) -> Result<Sexpr, ParseError> {
        if self.peek_char() == Some('"') {
            return self.parse_string();
        }

        let start = self.current_pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.advance();
        }

        if self.current_pos == start {
            return Err(ParseError::EmptyAtom { offset: start });
        }

        Ok(Sexpr::Symbol(
            self.input[start..self.current_pos].to_string(),
        ))
    }

    fn parse_string(&mut self) -> Result<Sexpr, ParseError> {
        let start = self.current_pos;
        self.expect('"')?;
        let mut result = String::new();

        loop {
            match self.peek_char() {
                None => return Err(ParseError::UnterminatedString { offset: start }),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek_char() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(ch) => ch,
                        None => return Err(ParseError::UnterminatedString { offset: start }),
                    };
                    result.push(escaped);
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Ok(Sexpr::String(result))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == ';' {
                // Comment runs to the end of the line
                while let Some(ch) = self.peek_char() {
                    self.advance();
                    if ch == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos + ch.len_utf8();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        match self.peek_char() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError::UnexpectedChar {
                found: ch,
                expected,
                offset: self.current_pos,
            }),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}

/// Parse a string holding a single S-expression
pub fn parse(input: &str) -> Result<Sexpr, ParseError> {
    log::trace!("Parsing S-expression from {} bytes of input", input.len());
    let result = Parser::new(input).parse();
    if let Err(e) = &result {
        log::trace!("Failed to parse S-expression: {e}");
    }
    result
}

/// Parse a string into multiple S-expressions
pub fn parse_all(input: &str) -> Result<Vec<Sexpr>, ParseError> {
    log::trace!(
        "Parsing multiple S-expressions from {} bytes of input",
        input.len()
    );
    let result = Parser::new(input).parse_all();
    match &result {
        Ok(exprs) => log::trace!("Parsed {} S-expressions", exprs.len()),
        Err(e) => log::trace!("Failed to parse S-expressions: {e}"),
    }
    result
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_sexpr(self, 0))
    }
}

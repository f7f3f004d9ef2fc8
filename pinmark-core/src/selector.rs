//! Selector parsing and matching for locators.
//!
//! Supports the subset of CSS selector syntax that locators are built from:
//! type selectors and `*`, `#id`, `.class`, `:nth-child(n)`, `:nth-of-type(n)`,
//! and the child (`>`) and descendant (whitespace) combinators. Identifiers
//! accept CSS escapes, and [`css_escape`] produces them.
//!
//! Anything outside the subset is a [`SelectorError`], which callers treat the
//! way a browser's `querySelector` throwing is treated: the locator is unusable.

use thiserror::Error;

use crate::dom::{Document, NodeId};

/// Why a selector string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("selector ended unexpectedly")]
    UnexpectedEnd,
    #[error("identifier cannot start with a digit at offset {0}")]
    LeadingDigit(usize),
    #[error("unsupported pseudo-class :{0}")]
    UnsupportedPseudo(String),
    #[error("invalid index in :{0}()")]
    InvalidIndex(String),
}

/// How two compound selectors relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a > b`
    Child,
    /// `a b`
    Descendant,
}

/// Positional pseudo-classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    NthChild(usize),
    NthOfType(usize),
}

/// One compound selector such as `div.card:nth-of-type(2)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    /// Lowercased tag name; `None` for `*` or when omitted.
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub pseudos: Vec<Pseudo>,
}

/// A parsed complex selector: compounds joined left to right by combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

impl Selector {
    /// Parses `input` into a selector.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] for empty input and for any syntax outside the
    /// supported subset.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Parser::new(input).parse()
    }

    pub fn compounds(&self) -> &[Compound] {
        &self.compounds
    }

    /// Returns `true` when `node` matches the whole selector.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.compounds.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        if !compound_matches(&self.compounds[index], doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|parent| self.matches_at(doc, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, ancestor, index - 1) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

fn compound_matches(compound: &Compound, doc: &Document, node: NodeId) -> bool {
    if let Some(tag) = &compound.tag {
        if doc.tag(node) != tag {
            return false;
        }
    }
    if !compound.ids.iter().all(|id| doc.id_attr(node) == Some(id.as_str())) {
        return false;
    }
    if !compound.classes.iter().all(|class| doc.has_class(node, class)) {
        return false;
    }
    compound.pseudos.iter().all(|pseudo| match *pseudo {
        Pseudo::NthChild(n) => doc.child_index(node) == Some(n),
        Pseudo::NthOfType(n) => doc.type_index(node) == Some(n),
    })
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self { chars: input.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(ch) => SelectorError::UnexpectedChar { ch, offset: self.pos },
            None => SelectorError::UnexpectedEnd,
        }
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(SelectorError::Empty);
        }

        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }
        Ok(Selector { compounds, combinators })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => {
                self.pos += 1;
            }
            Some(ch) if starts_ident(ch) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.pseudos.push(self.pseudo()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        match self.peek() {
            Some(ch) if ch.is_ascii_digit() => return Err(SelectorError::LeadingDigit(self.pos)),
            Some('-') if self.chars.get(self.pos + 1).is_some_and(char::is_ascii_digit) => {
                return Err(SelectorError::LeadingDigit(self.pos + 1));
            }
            Some(ch) if starts_ident(ch) => {}
            _ => return Err(self.unexpected()),
        }
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                out.push(self.escape()?);
            } else if is_ident_char(ch) {
                self.pos += 1;
                out.push(ch);
            } else {
                break;
            }
        }
        Ok(out)
    }

    /// Consumes the body of an escape (the backslash is already consumed).
    fn escape(&mut self) -> Result<char, SelectorError> {
        let Some(first) = self.peek() else {
            return Ok(char::REPLACEMENT_CHARACTER);
        };
        if first == '\n' {
            return Err(self.unexpected());
        }
        if !first.is_ascii_hexdigit() {
            self.pos += 1;
            return Ok(first);
        }

        let mut code = 0u32;
        let mut digits = 0;
        while digits < 6 {
            match self.peek().and_then(|ch| ch.to_digit(16)) {
                Some(value) => {
                    code = code * 16 + value;
                    digits += 1;
                    self.pos += 1;
                }
                None => break,
            }
        }
        if self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        Ok(match char::from_u32(code) {
            Some(ch) if code != 0 => ch,
            _ => char::REPLACEMENT_CHARACTER,
        })
    }

    fn pseudo(&mut self) -> Result<Pseudo, SelectorError> {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                name.push(ch.to_ascii_lowercase());
                self.pos += 1;
            } else {
                break;
            }
        }
        if name != "nth-child" && name != "nth-of-type" {
            return Err(SelectorError::UnsupportedPseudo(name));
        }
        if self.bump() != Some('(') {
            return Err(SelectorError::InvalidIndex(name));
        }
        self.skip_whitespace();
        let mut digits = String::new();
        while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
            digits.push(ch);
            self.pos += 1;
        }
        self.skip_whitespace();
        if self.bump() != Some(')') {
            return Err(SelectorError::InvalidIndex(name));
        }
        let index = digits
            .parse::<usize>()
            .map_err(|_| SelectorError::InvalidIndex(name.clone()))?;
        Ok(if name == "nth-child" {
            Pseudo::NthChild(index)
        } else {
            Pseudo::NthOfType(index)
        })
    }
}

fn starts_ident(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || ch == '\\' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

/// Escapes `value` for use as an identifier inside a selector.
///
/// Follows the CSSOM `CSS.escape()` algorithm, so `css_escape("1st")` yields
/// `\31 st` and the result always parses back to `value`.
pub fn css_escape(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());

    for (index, &ch) in chars.iter().enumerate() {
        let code = ch as u32;
        if ch == '\0' {
            out.push(char::REPLACEMENT_CHARACTER);
        } else if (0x01..=0x1f).contains(&code)
            || code == 0x7f
            || (index == 0 && ch.is_ascii_digit())
            || (index == 1 && ch.is_ascii_digit() && chars[0] == '-')
        {
            out.push_str(&format!("\\{:x} ", code));
        } else if index == 0 && ch == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if code >= 0x80 || ch == '-' || ch == '_' || ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}

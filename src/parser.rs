use std::sync::Arc;

use pest::Parser as _;
use pest::error::LineColLocation;
use pest::iterators::Pair;

use crate::ast::{Array, Object, Property, Quote, Str, Symbol, Token, TokenRef, Word};
use crate::error::{Error, Result};
use crate::position::Position;

#[derive(pest_derive::Parser)]
#[grammar = "src/plorth.pest"]
struct PlorthGrammar;

/// Default limit on how deeply arrays, objects and quotes may nest
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Messages pest reports when its own recursion guard stops the parse
const PEST_LIMIT_MESSAGES: [&str; 2] = ["stack limit reached", "call limit reached"];

/// Reads Plorth source text into tokens
#[derive(Debug, Clone)]
pub struct Parser {
    source: Arc<str>,
    max_depth: usize,
}

impl Parser {
    /// `source` names the input in every position the parser produces
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        Self {
            source: source.into(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit composite nesting to `max_depth` levels
    ///
    /// The grammar engine has its own recursion limit of roughly a thousand
    /// levels. Input nested past it is reported as [`Error::TooDeep`] even
    /// when `max_depth` is higher.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a whole program into its top-level tokens
    pub fn parse(&self, input: &str) -> Result<Vec<TokenRef>> {
        let mut pairs = PlorthGrammar::parse(Rule::file, input)
            .map_err(|err| self.syntax_error(err))?;
        let file = pairs.next().expect("parser returned no file rule");

        file.into_inner()
            .filter(|pair| pair.as_rule() != Rule::EOI)
            .map(|pair| self.parse_token(pair, 0))
            .collect()
    }

    fn parse_token(&self, pair: Pair<'_, Rule>, depth: usize) -> Result<TokenRef> {
        let position = self.position(&pair);
        let token = match pair.as_rule() {
            Rule::array => {
                let depth = self.enter(&position, depth)?;
                let elements = pair
                    .into_inner()
                    .map(|p| self.parse_token(p, depth))
                    .collect::<Result<Vec<_>>>()?;
                Token::from(Array::new(position, elements))
            }
            Rule::object => {
                let depth = self.enter(&position, depth)?;
                let properties = pair
                    .into_inner()
                    .map(|p| self.parse_property(p, depth))
                    .collect::<Result<Vec<_>>>()?;
                Token::from(Object::new(position, properties))
            }
            Rule::quote => {
                let depth = self.enter(&position, depth)?;
                let children = pair
                    .into_inner()
                    .map(|p| self.parse_token(p, depth))
                    .collect::<Result<Vec<_>>>()?;
                Token::from(Quote::new(position, children))
            }
            Rule::string => {
                let value = self.parse_string(pair)?;
                Token::from(Str::new(position, value))
            }
            Rule::symbol => Token::from(Symbol::new(position, pair.as_str())),
            Rule::word => {
                let name = pair.into_inner().next().expect("word without a name");
                let symbol = Symbol::new(self.position(&name), name.as_str());
                Token::from(Word::new(position, Arc::new(symbol)))
            }
            rule => unreachable!("unexpected rule {:?} in token position", rule),
        };
        Ok(token.into_ref())
    }

    fn parse_property(&self, pair: Pair<'_, Rule>, depth: usize) -> Result<Property> {
        let mut inner = pair.into_inner();
        let key = inner.next().expect("property without a key");
        let value = inner.next().expect("property without a value");

        let key: Arc<str> = match key.as_rule() {
            Rule::string => self.parse_string(key)?.into(),
            _ => key.as_str().into(),
        };
        Ok((key, self.parse_token(value, depth)?))
    }

    fn parse_string(&self, pair: Pair<'_, Rule>) -> Result<String> {
        let position = self.position(&pair);
        let raw = pair.into_inner().next().map_or("", |p| p.as_str());
        decode_escapes(raw).map_err(|sequence| Error::InvalidEscape { position, sequence })
    }

    /// Depth inside a newly opened composite, if still within the limit
    fn enter(&self, position: &Position, depth: usize) -> Result<usize> {
        let depth = depth + 1;
        if depth > self.max_depth {
            return Err(Error::TooDeep {
                position: position.clone(),
                limit: self.max_depth,
            });
        }
        Ok(depth)
    }

    fn position(&self, pair: &Pair<'_, Rule>) -> Position {
        let (line, column) = pair.as_span().start_pos().line_col();
        Position::new(self.source.clone(), line, column)
    }

    fn syntax_error(&self, err: pest::error::Error<Rule>) -> Error {
        let (line, column) = match err.line_col {
            LineColLocation::Pos(start) | LineColLocation::Span(start, _) => start,
        };
        let position = Position::new(self.source.clone(), line, column);

        let message = err.variant.message();
        if PEST_LIMIT_MESSAGES.iter().any(|limit| *limit == message) {
            return Error::TooDeep {
                position,
                limit: self.max_depth,
            };
        }
        Error::Syntax {
            position,
            message: message.into_owned(),
        }
    }
}

/// Resolve escape sequences in the contents of a string literal
///
/// On failure returns the offending sequence.
fn decode_escapes(raw: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(index) = rest.find('\\') {
        out.push_str(&rest[..index]);
        let mut chars = rest[index + 1..].chars();
        let escape = chars.next().ok_or_else(|| "\\".to_string())?;
        rest = chars.as_str();

        match escape {
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '"' | '\'' | '\\' | '/' => out.push(escape),
            'u' => {
                let (c, remaining) = decode_unicode(rest)?;
                out.push(c);
                rest = remaining;
            }
            other => return Err(format!("\\{}", other)),
        }
    }
    out.push_str(rest);

    Ok(out)
}

/// Decode the hex digits following `\u`, combining a surrogate pair
fn decode_unicode(rest: &str) -> std::result::Result<(char, &str), String> {
    let (unit, rest) = hex_unit(rest)?;
    let invalid = || format!("\\u{:04x}", unit);

    if !(0xd800..=0xdbff).contains(&unit) {
        return char::from_u32(unit).map(|c| (c, rest)).ok_or_else(invalid);
    }

    let low = rest.strip_prefix("\\u").map(hex_unit).transpose()?;
    match low {
        Some((low, after)) if (0xdc00..=0xdfff).contains(&low) => {
            let code = 0x10000 + ((unit - 0xd800) << 10) + (low - 0xdc00);
            char::from_u32(code).map(|c| (c, after)).ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn hex_unit(rest: &str) -> std::result::Result<(u32, &str), String> {
    let digits = rest.get(..4).unwrap_or(rest);
    match u32::from_str_radix(digits, 16) {
        Ok(unit) if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_hexdigit()) => {
            Ok((unit, &rest[4..]))
        }
        _ => Err(format!("\\u{}", digits)),
    }
}

use std::fmt;
use std::hash::{Hash, Hasher};
use std::slice;
use std::sync::Arc;

use crate::position::Position;

/// Shared handle to a token
///
/// The same child may be referenced by any number of parents.
pub type TokenRef = Arc<Token>;

/// Object property: raw key text and its value
pub type Property = (Arc<str>, TokenRef);

/// Kind of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Array,
    Object,
    Quote,
    String,
    Symbol,
    Word,
}

impl Kind {
    /// Character that marks this kind of token in source code
    /// (`s` for symbols, which have no delimiter)
    pub fn marker(self) -> char {
        match self {
            Self::Array => '[',
            Self::Object => '{',
            Self::Quote => '(',
            Self::String => '"',
            Self::Symbol => 's',
            Self::Word => ':',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Object => "object",
            Self::Quote => "quote",
            Self::String => "string",
            Self::Symbol => "symbol",
            Self::Word => "word",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element of a parsed Plorth program
///
/// Tokens are immutable once constructed. Equality is structural and ignores
/// positions; use [`Arc::ptr_eq`] on [`TokenRef`]s to test identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Array literal: `[a, b, c]`
    Array(Array),
    /// Object literal: `{ "key": value }`
    Object(Object),
    /// Quote literal: `( ... )`
    Quote(Quote),
    /// String literal: `"..."`
    String(Str),
    /// Bare identifier
    Symbol(Symbol),
    /// Word definition: `: name`
    Word(Word),
}

impl Token {
    pub fn position(&self) -> &Position {
        match self {
            Self::Array(array) => &array.position,
            Self::Object(object) => &object.position,
            Self::Quote(quote) => &quote.position,
            Self::String(string) => &string.position,
            Self::Symbol(symbol) => &symbol.position,
            Self::Word(word) => &word.position,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Self::Array(_) => Kind::Array,
            Self::Object(_) => Kind::Object,
            Self::Quote(_) => Kind::Quote,
            Self::String(_) => Kind::String,
            Self::Symbol(_) => Kind::Symbol,
            Self::Word(_) => Kind::Word,
        }
    }

    /// Wrap the token into a shareable handle
    pub fn into_ref(self) -> TokenRef {
        Arc::new(self)
    }

    /// Direct children of this token, in source order
    ///
    /// Object properties contribute their values. Strings, symbols and words
    /// have no children.
    pub fn child_tokens(&self) -> ChildTokens<'_> {
        let inner = match self {
            Self::Array(array) => ChildIter::Sequence(array.elements.iter()),
            Self::Quote(quote) => ChildIter::Sequence(quote.children.iter()),
            Self::Object(object) => ChildIter::Properties(object.properties.iter()),
            Self::String(_) | Self::Symbol(_) | Self::Word(_) => ChildIter::Leaf,
        };
        ChildTokens { inner }
    }

    /// This token followed by all of its descendants, pre-order
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

impl From<Array> for Token {
    fn from(value: Array) -> Self {
        Self::Array(value)
    }
}

impl From<Object> for Token {
    fn from(value: Object) -> Self {
        Self::Object(value)
    }
}

impl From<Quote> for Token {
    fn from(value: Quote) -> Self {
        Self::Quote(value)
    }
}

impl From<Str> for Token {
    fn from(value: Str) -> Self {
        Self::String(value)
    }
}

impl From<Symbol> for Token {
    fn from(value: Symbol) -> Self {
        Self::Symbol(value)
    }
}

impl From<Word> for Token {
    fn from(value: Word) -> Self {
        Self::Word(value)
    }
}

/// Array literal
#[derive(Debug, Clone)]
pub struct Array {
    position: Position,
    elements: Vec<TokenRef>,
}

impl Array {
    pub fn new(position: Position, elements: Vec<TokenRef>) -> Self {
        Self { position, elements }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn elements(&self) -> &[TokenRef] {
        &self.elements
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl Eq for Array {}

/// Object literal
///
/// Keys are kept exactly as written, duplicates included.
#[derive(Debug, Clone)]
pub struct Object {
    position: Position,
    properties: Vec<Property>,
}

impl Object {
    pub fn new(position: Position, properties: Vec<Property>) -> Self {
        Self {
            position,
            properties,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Value of the last property named `key`
    pub fn get(&self, key: &str) -> Option<&TokenRef> {
        self.properties
            .iter()
            .rev()
            .find(|(name, _)| name.as_ref() == key)
            .map(|(_, value)| value)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties
    }
}

impl Eq for Object {}

/// Quote literal
///
/// A deferred block of code. Its children are only executed when an
/// interpreter decides to call it.
#[derive(Debug, Clone)]
pub struct Quote {
    position: Position,
    children: Vec<TokenRef>,
}

impl Quote {
    pub fn new(position: Position, children: Vec<TokenRef>) -> Self {
        Self { position, children }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn children(&self) -> &[TokenRef] {
        &self.children
    }
}

impl PartialEq for Quote {
    fn eq(&self, other: &Self) -> bool {
        self.children == other.children
    }
}

impl Eq for Quote {}

/// String literal
///
/// Holds the decoded contents; escape sequences are resolved by the reader.
#[derive(Debug, Clone)]
pub struct Str {
    position: Position,
    value: Arc<str>,
}

impl Str {
    pub fn new(position: Position, value: impl Into<Arc<str>>) -> Self {
        Self {
            position,
            value: value.into(),
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl PartialEq for Str {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Str {}

/// Symbol
///
/// Two symbols are equal when their identifiers are equal, wherever they
/// appear.
#[derive(Debug, Clone)]
pub struct Symbol {
    position: Position,
    id: Arc<str>,
}

impl Symbol {
    pub fn new(position: Position, id: impl Into<Arc<str>>) -> Self {
        Self {
            position,
            id: id.into(),
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Word definition
///
/// Marks the point where a word named by `symbol` is defined. The body is not
/// part of this token.
#[derive(Debug, Clone)]
pub struct Word {
    position: Position,
    symbol: Arc<Symbol>,
}

impl Word {
    pub fn new(position: Position, symbol: Arc<Symbol>) -> Self {
        Self { position, symbol }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn symbol(&self) -> &Arc<Symbol> {
        &self.symbol
    }
}

impl PartialEq for Word {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Word {}

/// Iterator over the direct children of a token
#[derive(Debug, Clone)]
pub struct ChildTokens<'a> {
    inner: ChildIter<'a>,
}

#[derive(Debug, Clone)]
enum ChildIter<'a> {
    Sequence(slice::Iter<'a, TokenRef>),
    Properties(slice::Iter<'a, Property>),
    Leaf,
}

impl<'a> Iterator for ChildTokens<'a> {
    type Item = &'a TokenRef;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ChildIter::Sequence(iter) => iter.next(),
            ChildIter::Properties(iter) => iter.next().map(|(_, value)| value),
            ChildIter::Leaf => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            ChildIter::Sequence(iter) => iter.size_hint(),
            ChildIter::Properties(iter) => iter.size_hint(),
            ChildIter::Leaf => (0, Some(0)),
        }
    }
}

impl DoubleEndedIterator for ChildTokens<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ChildIter::Sequence(iter) => iter.next_back(),
            ChildIter::Properties(iter) => iter.next_back().map(|(_, value)| value),
            ChildIter::Leaf => None,
        }
    }
}

impl ExactSizeIterator for ChildTokens<'_> {}

/// Pre-order iterator over a token tree
///
/// A child shared by several parents is visited once for every parent.
#[derive(Debug, Clone)]
pub struct Descendants<'a> {
    stack: Vec<&'a Token>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.stack.pop()?;
        self.stack
            .extend(token.child_tokens().rev().map(|child| child.as_ref()));
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: usize, column: usize) -> Position {
        Position::new("test", line, column)
    }

    fn string(value: &str) -> TokenRef {
        Token::from(Str::new(pos(1, 1), value)).into_ref()
    }

    fn symbol(id: &str) -> TokenRef {
        Token::from(Symbol::new(pos(1, 1), id)).into_ref()
    }

    #[test]
    fn test_kind_matches_variant() {
        let sym = Arc::new(Symbol::new(pos(1, 1), "x"));
        let tokens = [
            (Token::from(Array::new(pos(1, 1), vec![])), Kind::Array),
            (Token::from(Object::new(pos(1, 1), vec![])), Kind::Object),
            (Token::from(Quote::new(pos(1, 1), vec![])), Kind::Quote),
            (Token::from(Str::new(pos(1, 1), "s")), Kind::String),
            (Token::from(Symbol::new(pos(1, 1), "s")), Kind::Symbol),
            (Token::from(Word::new(pos(1, 1), sym)), Kind::Word),
        ];
        for (token, kind) in &tokens {
            assert_eq!(token.kind(), *kind);
        }
    }

    #[test]
    fn test_kind_markers() {
        assert_eq!(Kind::Array.marker(), '[');
        assert_eq!(Kind::Object.marker(), '{');
        assert_eq!(Kind::Quote.marker(), '(');
        assert_eq!(Kind::String.marker(), '"');
        assert_eq!(Kind::Symbol.marker(), 's');
        assert_eq!(Kind::Word.marker(), ':');
        assert_eq!(Kind::Quote.to_string(), "quote");
    }

    #[test]
    fn test_position_is_kept() {
        let token = Token::from(Str::new(pos(7, 2), "hello"));
        assert_eq!(token.position(), &pos(7, 2));
        let copy = token.clone();
        assert_eq!(copy.position(), &pos(7, 2));
    }

    #[test]
    fn test_symbol_scenario() {
        let token = Token::from(Symbol::new(Position::new("test", 3, 5), "dup"));
        assert_eq!(token.kind(), Kind::Symbol);
        assert_eq!(token.position(), &Position::new("test", 3, 5));
        match &token {
            Token::Symbol(symbol) => assert_eq!(symbol.id(), "dup"),
            _ => panic!("Expected Symbol token"),
        }
    }

    #[test]
    fn test_array_scenario() {
        let token = Token::from(Array::new(pos(1, 1), vec![string("a"), symbol("b")]));
        assert_eq!(token.kind(), Kind::Array);
        let Token::Array(array) = &token else {
            panic!("Expected Array token");
        };
        assert_eq!(array.elements().len(), 2);
        assert!(matches!(array.elements()[0].as_ref(), Token::String(s) if s.value() == "a"));
        assert!(matches!(array.elements()[1].as_ref(), Token::Symbol(s) if s.id() == "b"));
    }

    #[test]
    fn test_empty_quote_scenario() {
        let empty = Token::from(Quote::new(pos(2, 1), vec![]));
        assert_eq!(empty.kind(), Kind::Quote);
        assert_eq!(empty.position(), &pos(2, 1));
        let Token::Quote(quote) = &empty else {
            panic!("Expected Quote token");
        };
        assert!(quote.children().is_empty());

        let single = Token::from(Quote::new(pos(2, 1), vec![symbol("drop")]));
        assert_ne!(empty, single);
    }

    #[test]
    fn test_children_keep_order_and_count() {
        let children = vec![symbol("1"), symbol("2"), symbol("+"), symbol("1")];
        let quote = Quote::new(pos(1, 1), children.clone());
        assert_eq!(quote.children().len(), 4);
        for (a, b) in quote.children().iter().zip(&children) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[test]
    fn test_duplicate_keys_preserved() {
        let x = string("X");
        let y = string("Y");
        let object = Object::new(
            pos(1, 1),
            vec![("a".into(), x.clone()), ("a".into(), y.clone())],
        );
        let props = object.properties();
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].0.as_ref(), "a");
        assert!(Arc::ptr_eq(&props[0].1, &x));
        assert_eq!(props[1].0.as_ref(), "a");
        assert!(Arc::ptr_eq(&props[1].1, &y));
    }

    #[test]
    fn test_object_get_last_wins() {
        let object = Object::new(
            pos(1, 1),
            vec![
                ("a".into(), string("first")),
                ("b".into(), string("other")),
                ("a".into(), string("second")),
            ],
        );
        assert!(matches!(
            object.get("a").map(|t| t.as_ref()),
            Some(Token::String(s)) if s.value() == "second"
        ));
        assert!(object.get("missing").is_none());
        assert_eq!(object.properties().len(), 3);
    }

    #[test]
    fn test_shared_child_identity() {
        let shared = string("lit");
        let first = Array::new(pos(1, 1), vec![shared.clone(), shared.clone()]);
        let second = Array::new(pos(2, 1), vec![shared.clone()]);
        assert!(Arc::ptr_eq(&first.elements()[0], &second.elements()[0]));
        assert!(Arc::ptr_eq(&first.elements()[0], &first.elements()[1]));
        assert_eq!(Arc::strong_count(&shared), 4);
    }

    #[test]
    fn test_word_keeps_symbol_handle() {
        let name = Arc::new(Symbol::new(pos(4, 3), "square"));
        let word = Word::new(pos(4, 1), name.clone());
        assert!(Arc::ptr_eq(word.symbol(), &name));
        assert_eq!(word.symbol().id(), "square");
        assert_eq!(word.symbol().position(), &pos(4, 3));
    }

    #[test]
    fn test_symbol_equality_ignores_position() {
        let a = Symbol::new(pos(1, 1), "swap");
        let b = Symbol::new(Position::new("other", 9, 9), "swap");
        let c = Symbol::new(pos(1, 1), "Swap");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_structural_equality() {
        let a = Token::from(Array::new(pos(1, 1), vec![string("a"), symbol("b")]));
        let b = Token::from(Array::new(pos(5, 5), vec![string("a"), symbol("b")]));
        let c = Token::from(Quote::new(pos(1, 1), vec![string("a"), symbol("b")]));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_child_tokens() {
        let object = Token::from(Object::new(
            pos(1, 1),
            vec![("k".into(), symbol("v")), ("l".into(), symbol("w"))],
        ));
        let ids: Vec<_> = object
            .child_tokens()
            .map(|child| match child.as_ref() {
                Token::Symbol(s) => s.id().to_string(),
                _ => panic!("Expected Symbol token"),
            })
            .collect();
        assert_eq!(ids, ["v", "w"]);
        assert_eq!(object.child_tokens().len(), 2);

        let word = Token::from(Word::new(pos(1, 1), Arc::new(Symbol::new(pos(1, 3), "f"))));
        assert_eq!(word.child_tokens().count(), 0);
    }

    #[test]
    fn test_descendants_pre_order() {
        let inner = Token::from(Quote::new(pos(1, 4), vec![symbol("b"), symbol("c")])).into_ref();
        let root = Token::from(Array::new(pos(1, 1), vec![symbol("a"), inner, symbol("d")]));
        let kinds: Vec<_> = root.descendants().map(Token::kind).collect();
        assert_eq!(
            kinds,
            [Kind::Array, Kind::Symbol, Kind::Quote, Kind::Symbol, Kind::Symbol, Kind::Symbol]
        );
        let ids: Vec<_> = root
            .descendants()
            .filter_map(|t| match t {
                Token::Symbol(s) => Some(s.id()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_descendants_visit_shared_child_per_path() {
        let shared = symbol("x");
        let root = Token::from(Array::new(pos(1, 1), vec![shared.clone(), shared]));
        assert_eq!(root.descendants().count(), 3);
    }

    #[test]
    fn test_tokens_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Token>();
        assert_send_sync::<TokenRef>();
    }
}

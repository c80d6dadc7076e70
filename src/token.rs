//! The templating language's token model.
//!
//! Source text tokenizes into a tree of [`Token`]s: plain text and
//! whitespace runs, the marker tokens for the configured delimiters, and
//! nested [`Token::Block`]s produced by matched open/close tags. A
//! [`TokenCollection`] is an ordered sequence of tokens with the handful of
//! structural operations the evaluator needs.

use crate::config;

/// A single item of tokenized source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// A run of non-whitespace, non-marker characters.
    Text(String),
    /// A run of spaces, tabs, and newlines.
    Whitespace(String),
    /// The block-open marker.
    TagOpen,
    /// The block-close marker.
    TagClose,
    /// The hint that marks a block as a call site.
    Eval,
    /// A literal escape that suppressed no marker.
    Escape,
    /// A nested sequence produced by a matched open/close pair.
    Block(TokenCollection),
}

/// The discriminant of a [`Token`], used for structural matching.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    /// [`Token::Text`].
    Text,
    /// [`Token::Whitespace`].
    Whitespace,
    /// [`Token::TagOpen`].
    TagOpen,
    /// [`Token::TagClose`].
    TagClose,
    /// [`Token::Eval`].
    Eval,
    /// [`Token::Escape`].
    Escape,
    /// [`Token::Block`].
    Block,
}

impl Token {
    /// The discriminant of this token.
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Text(_) => TokenKind::Text,
            Token::Whitespace(_) => TokenKind::Whitespace,
            Token::TagOpen => TokenKind::TagOpen,
            Token::TagClose => TokenKind::TagClose,
            Token::Eval => TokenKind::Eval,
            Token::Escape => TokenKind::Escape,
            Token::Block(_) => TokenKind::Block,
        }
    }

    /// Whether this is one of the marker tokens an escape suppresses.
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            Token::TagOpen | Token::TagClose | Token::Eval | Token::Escape
        )
    }

    /// The default spelling of a marker token.
    ///
    /// Only meaningful for tokens where [`is_marker`](Token::is_marker) is
    /// true.
    pub fn marker_text(&self) -> &'static str {
        match self {
            Token::TagOpen => config::TAG_OPEN,
            Token::TagClose => config::TAG_CLOSE,
            Token::Eval => config::EVAL_HINT,
            _ => config::ESCAPE,
        }
    }

    /// Serializes this token back into source text.
    ///
    /// Inert input round-trips: a block serializes as its delimiters around
    /// the serialization of its children.
    pub fn resolve_into(&self, out: &mut String) {
        match self {
            Token::Text(text) | Token::Whitespace(text) => out.push_str(text),
            Token::TagOpen | Token::TagClose | Token::Eval | Token::Escape => {
                out.push_str(self.marker_text());
            }
            Token::Block(tokens) => {
                out.push_str(config::TAG_OPEN);
                tokens.resolve_into(out);
                out.push_str(config::TAG_CLOSE);
            }
        }
    }

    /// Serializes this token into a new string.
    pub fn resolve(&self) -> String {
        let mut out = String::new();
        self.resolve_into(&mut out);
        out
    }
}

impl core::fmt::Display for Token {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.resolve())
    }
}

/// An ordered sequence of [`Token`]s.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TokenCollection {
    /// The tokens, in source order.
    tokens: Vec<Token>,
}

impl TokenCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the collection holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The token at `index`, if there is one.
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Iterates the tokens in order.
    pub fn iter(&self) -> core::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Appends a token.
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Appends every token of another collection.
    pub fn append(&mut self, mut other: TokenCollection) {
        self.tokens.append(&mut other.tokens);
    }

    /// Serializes the collection into `out`.
    pub fn resolve_into(&self, out: &mut String) {
        for token in &self.tokens {
            token.resolve_into(out);
        }
    }

    /// Serializes the collection into a new string.
    pub fn resolve(&self) -> String {
        let mut out = String::new();
        self.resolve_into(&mut out);
        out
    }

    /// The subsequence of tokens of the given kind.
    pub fn filter(&self, kind: TokenKind) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(move |t| t.kind() == kind)
    }

    /// Strips leading and trailing whitespace tokens.
    pub fn trim(&mut self) {
        if self.is_empty() {
            return;
        }
        while matches!(self.tokens.last(), Some(Token::Whitespace(_))) {
            self.tokens.pop();
        }
        let lead = self
            .tokens
            .iter()
            .take_while(|t| matches!(t, Token::Whitespace(_)))
            .count();
        self.tokens.drain(..lead);
    }

    /// Advances past leading whitespace and returns the first prefix
    /// matching `kinds`, plus the remaining tail.
    ///
    /// Fails if any non-whitespace token other than the expected kind is
    /// found before the prefix completes.
    pub fn capture(&self, kinds: &[TokenKind]) -> Option<(Vec<&Token>, &[Token])> {
        let mut i = 0;
        let mut head = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let mut found = false;
            while let Some(token) = self.tokens.get(i) {
                i += 1;
                if token.kind() == kind {
                    head.push(token);
                    found = true;
                    break;
                } else if token.kind() != TokenKind::Whitespace {
                    break;
                }
            }
            if !found {
                return None;
            }
        }
        Some((head, &self.tokens[i..]))
    }

    /// Extracts the binding name from a call block's contents.
    ///
    /// A call starts, after optional whitespace, with the eval hint followed
    /// by a text token; that text is the name. Returns nothing for inert
    /// blocks.
    pub fn capture_call(&self) -> Option<String> {
        let (head, _) = self.capture(&[TokenKind::Eval, TokenKind::Text])?;
        head.get(1).map(|token| token.resolve())
    }

    /// Extracts argument blocks from a call block's contents.
    ///
    /// The tail after the call name splits into items: maximal runs of
    /// adjacent non-whitespace tokens. An item that is a single block is
    /// used as-is; any other item is wrapped in a synthetic block. When more
    /// than `max_args` items are present, the surplus merges into the final
    /// argument with interior whitespace preserved, which is what lets call
    /// sites pass bare words (`{{!datefmt 2024-03-15 %Y}}`) and lets a
    /// one-argument binding take its whole tail (`{{!md some text}}`).
    pub fn capture_args(&self, max_args: usize) -> Vec<Token> {
        let Some((_, tail)) = self.capture(&[TokenKind::Eval, TokenKind::Text]) else {
            return Vec::new();
        };

        let mut items: Vec<(usize, usize)> = Vec::new();
        for (i, token) in tail.iter().enumerate() {
            if token.kind() == TokenKind::Whitespace {
                continue;
            }
            match items.last_mut() {
                Some((_, end)) if *end == i => *end = i + 1,
                _ => items.push((i, i + 1)),
            }
        }

        if items.is_empty() {
            return Vec::new();
        }

        let mut args = Vec::with_capacity(items.len().min(max_args));
        if max_args > 0 && items.len() > max_args {
            for &(start, end) in &items[..max_args - 1] {
                args.push(argument(&tail[start..end]));
            }
            let start = items[max_args - 1].0;
            let end = items[items.len() - 1].1;
            args.push(argument(&tail[start..end]));
        } else {
            for &(start, end) in &items {
                args.push(argument(&tail[start..end]));
            }
        }
        args
    }
}

/// Builds one argument from an item's tokens.
fn argument(tokens: &[Token]) -> Token {
    match tokens {
        [block @ Token::Block(_)] => block.clone(),
        _ => Token::Block(TokenCollection::from(tokens.to_vec())),
    }
}

impl From<Vec<Token>> for TokenCollection {
    fn from(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }
}

impl FromIterator<Token> for TokenCollection {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TokenCollection {
    type Item = &'a Token;
    type IntoIter = core::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl core::fmt::Display for TokenCollection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.resolve())
    }
}

//! The two-stage tokenizer.
//!
//! Stage A scans the input one character at a time into a flat token
//! stream, splitting text from whitespace runs and recognising the marker
//! spellings at the tail of the current run. Stage B folds the flat stream
//! into nested blocks with a stack of open tags.
//!
//! Tokenization is deterministic and linear; the only lookbehind is the
//! length of the longest marker.

use crate::token::{Token, TokenCollection};

/// A structural error in the input's tag nesting.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// A close tag appeared with no open tag on the stack.
    #[error("found extra closing tag")]
    ExtraClosingTag,
    /// The input ended with at least one tag still open.
    #[error("missing closing tag")]
    MissingClosingTag,
}

/// Tokenizes `text` into a block tree.
pub fn tokenize(text: &str) -> Result<TokenCollection, ParseError> {
    nest(flat_tokens(text))
}

/// Wraps a plain string as a collection holding one text token.
pub fn text(text: impl Into<String>) -> TokenCollection {
    TokenCollection::from(vec![Token::Text(text.into())])
}

/// The marker tokens, in match order.
const MARKERS: [Token; 4] = [Token::Eval, Token::TagOpen, Token::TagClose, Token::Escape];

/// Stage A: scans characters into a flat stream of text, whitespace, and
/// marker tokens.
fn flat_tokens(text: &str) -> Vec<Token> {
    /// Appends a token, collapsing an escape followed by a marker into the
    /// marker's literal spelling.
    fn add(flat: &mut Vec<Token>, token: Token) {
        if token.is_marker() && matches!(flat.last(), Some(Token::Escape)) {
            flat.pop();
            flat.push(Token::Text(token.marker_text().to_string()));
        } else {
            flat.push(token);
        }
    }

    /// Emits the current run's buffer as a text or whitespace token.
    fn flush(flat: &mut Vec<Token>, is_whitespace: bool, buffer: String) {
        let token = if is_whitespace {
            Token::Whitespace(buffer)
        } else {
            Token::Text(buffer)
        };
        add(flat, token);
    }

    let mut flat = Vec::new();
    let mut buffer = String::new();
    let mut in_whitespace = false;

    for c in text.chars() {
        let whitespace = c.is_whitespace();
        if !buffer.is_empty() && whitespace != in_whitespace {
            flush(&mut flat, in_whitespace, core::mem::take(&mut buffer));
        }
        in_whitespace = whitespace;
        buffer.push(c);

        // Markers are never whitespace, so a matching tail implies the
        // buffer is a text run.
        for marker in &MARKERS {
            let spelling = marker.marker_text();
            if !buffer.ends_with(spelling) {
                continue;
            }
            if buffer.len() > spelling.len() {
                let prefix = buffer[..buffer.len() - spelling.len()].to_string();
                add(&mut flat, Token::Text(prefix));
            }
            add(&mut flat, marker.clone());
            buffer.clear();
            break;
        }
    }

    if !buffer.is_empty() {
        flush(&mut flat, in_whitespace, buffer);
    }

    flat
}

/// Stage B: folds open/close markers into nested blocks.
fn nest(flat: Vec<Token>) -> Result<TokenCollection, ParseError> {
    let mut stack: Vec<TokenCollection> = Vec::new();
    let mut top = TokenCollection::new();

    for token in flat {
        match token {
            Token::TagOpen => stack.push(TokenCollection::new()),
            Token::TagClose => {
                let Some(done) = stack.pop() else {
                    return Err(ParseError::ExtraClosingTag);
                };
                let block = Token::Block(done);
                match stack.last_mut() {
                    Some(open) => open.push(block),
                    None => top.push(block),
                }
            }
            other => match stack.last_mut() {
                Some(open) => open.push(other),
                None => top.push(other),
            },
        }
    }

    if stack.is_empty() {
        Ok(top)
    } else {
        Err(ParseError::MissingClosingTag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[track_caller]
    fn round_trip(source: &str) {
        assert_eq!(tokenize(source).unwrap().resolve(), source);
    }

    #[test]
    fn inert_input_round_trips() {
        round_trip("");
        round_trip("plain text");
        round_trip("  leading, trailing\tand\ninner   whitespace\n");
        round_trip("a {{block}} b");
        round_trip("{{nested {{blocks}} round}} trip");
        round_trip("{{!call {{arg one}} {{arg two}}}}");
        round_trip("punctuation! but no hint run: a!b");
    }

    #[test]
    fn escapes_are_literal() {
        assert_eq!(tokenize(r"\{{not a tag\}}").unwrap().resolve(), "{{not a tag}}");
        assert_eq!(tokenize(r"\\").unwrap().resolve(), r"\");
        assert_eq!(tokenize(r"\!").unwrap().resolve(), "!");
        assert_eq!(tokenize(r"a\{{b").unwrap().resolve(), "a{{b");
    }

    #[test]
    fn escape_applies_only_to_the_next_marker() {
        // The escape reaches the marker only when nothing sits between them.
        let tree = tokenize(r"\x{{tag}}").unwrap();
        assert_eq!(tree.resolve(), r"\x{{tag}}");
        assert!(tree.iter().any(|t| t.kind() == TokenKind::Block));
    }

    #[test]
    fn lone_escape_survives() {
        round_trip(r"a \ b");
        assert_eq!(tokenize(r"trailing\").unwrap().resolve(), r"trailing\");
    }

    #[test]
    fn unbalanced_tags_are_rejected() {
        assert_eq!(tokenize("{{open"), Err(ParseError::MissingClosingTag));
        assert_eq!(tokenize("a {{b {{c}}"), Err(ParseError::MissingClosingTag));
        assert_eq!(tokenize("close}} first"), Err(ParseError::ExtraClosingTag));
        assert_eq!(tokenize("{{a}}}}"), Err(ParseError::ExtraClosingTag));
    }

    #[test]
    fn blocks_nest() {
        let tree = tokenize("{{a {{b}} c}}").unwrap();
        assert_eq!(tree.len(), 1);
        let Some(Token::Block(outer)) = tree.get(0) else {
            panic!("expected a block");
        };
        assert!(outer.iter().any(|t| t.kind() == TokenKind::Block));
        assert_eq!(outer.resolve(), "a {{b}} c");
    }

    #[test]
    fn split_braces_are_not_tags() {
        round_trip("{ { not a tag } }");
        round_trip("lone { brace");
    }

    #[test]
    fn runs_split_on_type_changes() {
        let tree = tokenize("one two").unwrap();
        let kinds: Vec<TokenKind> = tree.iter().map(Token::kind).collect();
        assert_eq!(
            kinds,
            [TokenKind::Text, TokenKind::Whitespace, TokenKind::Text]
        );
    }

    #[test]
    fn eval_hint_is_its_own_token() {
        let tree = tokenize("{{!name}}").unwrap();
        let Some(Token::Block(block)) = tree.get(0) else {
            panic!("expected a block");
        };
        let kinds: Vec<TokenKind> = block.iter().map(Token::kind).collect();
        assert_eq!(kinds, [TokenKind::Eval, TokenKind::Text]);
    }
}

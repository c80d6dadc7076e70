//! The built-in bindings.
//!
//! All built-ins are registered as global, protected bindings before any
//! user binding loads. `def` and `if` are lazy and receive their argument
//! blocks unevaluated, because `def` must capture bodies as-is and `if`
//! must not evaluate the untaken branch. Everything else is eager:
//! arguments arrive as resolved strings.

use crate::{
    binding::{BindingKind, Bindings, FunctionImpl, OverwriteError},
    config::{self, names},
    dates,
    engine::{Engine, Error},
    markdown,
    token::{Token, TokenCollection, TokenKind},
    tokenizer,
};
use std::{collections::HashSet, rc::Rc};

/// Registers every built-in into a fresh environment.
pub fn register(bindings: &mut Bindings) -> Result<(), OverwriteError> {
    bindings.set(
        names::GENERATED,
        BindingKind::Variable {
            body: tokenizer::text(dates::iso(dates::today())),
        },
        true,
    )?;

    let functions: [(&str, &'static [usize], FunctionImpl); 7] = [
        (names::DEF, &[1, 2, 3], FunctionImpl::Lazy(def)),
        (names::IF, &[2, 3], FunctionImpl::Lazy(if_defined)),
        (names::DATEFMT, &[2], FunctionImpl::Eager(datefmt)),
        (names::ANCHOR, &[1], FunctionImpl::Eager(anchor)),
        (names::MD, &[1], FunctionImpl::Eager(md)),
        (names::CODE, &[1, 2, 3], FunctionImpl::Eager(code)),
        (names::STUBS, &[2, 3, 4], FunctionImpl::Eager(stubs)),
    ];
    for (name, arity, call) in functions {
        bindings.set(name, BindingKind::Function { arity, call }, true)?;
    }
    Ok(())
}

/// The first token of an argument block, resolved; used for binding names.
fn block_name(arg: &Token) -> Option<String> {
    let Token::Block(tokens) = arg else {
        return None;
    };
    tokens.get(0).map(Token::resolve)
}

/// Wraps an argument block as a stored, unevaluated binding body.
fn stored_body(arg: &Token) -> TokenCollection {
    TokenCollection::from(vec![arg.clone()])
}

/// `def`: declares a variable or macro in the current environment.
///
/// The declared body is stored unevaluated; it evaluates anew on every
/// invocation. Evaluates to nothing.
fn def(engine: &mut Engine, args: &[Token]) -> Result<Option<TokenCollection>, Error> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(None);
    };
    let Some(name) = block_name(first) else {
        log::warn!("def with an empty binding name");
        return Ok(None);
    };

    match rest {
        [] => engine.bindings.set(&name, BindingKind::empty(), false)?,
        [body] => engine.bindings.set(
            &name,
            BindingKind::Variable {
                body: stored_body(body),
            },
            false,
        )?,
        [Token::Block(param_tokens), body] => {
            let params: Vec<String> = param_tokens
                .filter(TokenKind::Text)
                .map(Token::resolve)
                .collect();
            engine.bindings.set(
                &name,
                BindingKind::macro_from(params, stored_body(body)),
                false,
            )?;
        }
        _ => log::warn!("def '{name}' has a malformed parameter list"),
    }
    Ok(None)
}

/// `if`: emits its second argument when the first names a defined
/// binding, else its third (or nothing).
fn if_defined(engine: &mut Engine, args: &[Token]) -> Result<Option<TokenCollection>, Error> {
    let Some(clause) = args.first() else {
        return Ok(None);
    };
    let clause = engine.evaluate_argument(clause)?.resolve();

    let branch = if engine.bindings.contains(&clause) {
        args.get(1)
    } else {
        args.get(2)
    };
    Ok(branch.map(|token| match token {
        Token::Block(tokens) => tokens.clone(),
        other => TokenCollection::from(vec![other.clone()]),
    }))
}

/// `datefmt`: reformats an ISO date with strftime-style directives.
fn datefmt(_: &mut Engine, args: &[String]) -> Result<String, Error> {
    let (input, format) = (&args[0], &args[1]);
    match dates::parse_iso(input) {
        Ok(date) => dates::strftime(date, format).map_err(Into::into),
        Err(_) => {
            log::warn!("date not in YYYY-MM-DD format: {input}");
            Ok(input.clone())
        }
    }
}

/// `anchor`: turns heading text into a URL slug.
fn anchor(_: &mut Engine, args: &[String]) -> Result<String, Error> {
    Ok(markdown::slug(&args[0]))
}

/// `md`: renders the argument as Markdown.
fn md(engine: &mut Engine, args: &[String]) -> Result<String, Error> {
    Ok(engine.render_markdown(&args[0]))
}

/// `code`: syntax-highlights the argument.
///
/// One argument is plain-text code; two are language and code; three are
/// language, the 1-based lines to mark, and code. Single-line code
/// becomes an inline `<code>` run with the angle brackets escaped.
fn code(engine: &mut Engine, args: &[String]) -> Result<String, Error> {
    let (lang, line_spec, source) = match args {
        [source] => (String::from("text"), None, source),
        [lang, source] => (lang.to_lowercase(), None, source),
        [lang, lines, source] => (lang.to_lowercase(), Some(lines.as_str()), source),
        _ => return Ok(String::new()),
    };

    if !source.contains('\n') {
        return Ok(format!(
            "<code>{}</code>",
            html_escape::encode_text(source)
        ));
    }

    let mut marked = HashSet::new();
    for word in line_spec.unwrap_or_default().split_whitespace() {
        match word.parse::<usize>() {
            Ok(line) => {
                marked.insert(line);
            }
            Err(_) => log::warn!("highlight line is not a number: {word}"),
        }
    }

    Ok(engine
        .highlighter()
        .highlight(&lang, source, &marked, config::CODE_CSS_CLASS))
}

/// `stubs`: renders a directory of stub sources through a template.
///
/// Arguments: stub subdirectory, body template, then optionally a
/// separator template and a maximum count (a third argument that parses
/// as an integer is the count). Stubs sort by file name descending and
/// render as pages, keeping the invoking file's `root` and `modified`.
fn stubs(engine: &mut Engine, args: &[String]) -> Result<String, Error> {
    let (subdir, body_name) = (&args[0], &args[1]);
    let mut separator_name = None;
    let mut max = 0usize;
    match args {
        [_, _, third] => match third.parse::<usize>() {
            Ok(n) => max = n,
            Err(_) => separator_name = Some(third.as_str()),
        },
        [_, _, third, fourth] => {
            separator_name = Some(third.as_str());
            match fourth.parse::<usize>() {
                Ok(n) => max = n,
                Err(_) => log::warn!("stub count is not a number: {fourth}"),
            }
        }
        _ => {}
    }

    let project = Rc::clone(engine.project());
    let template = project.templates.file(body_name)?;

    let mut files = project.stubs.files_in(subdir)?;
    files.sort_by(|a, b| b.name().cmp(a.name()));
    if max > 0 {
        files.truncate(max);
    }

    let separator = match separator_name {
        Some(name) => project.templates.file(name)?.tokens().resolve(),
        None => String::new(),
    };

    let mut parts = Vec::with_capacity(files.len());
    for stub in &files {
        parts.push(engine.process_file(stub, template, true)?);
    }
    Ok(parts.join(separator.as_str()))
}

//! The evaluator.
//!
//! Evaluation reduces a block tree to its final token stream under the
//! binding environment. Two operations recurse into each other:
//! [`Engine::evaluate_collection`] walks a token sequence and splices the
//! result of every block it meets, and [`Engine::evaluate_block`]
//! identifies whether one block is a call, dispatches on the binding kind,
//! and trims the result.
//!
//! Fatal conditions (structural parse errors, overwriting a protected
//! binding, missing project files) propagate as [`Error`]s. Everything
//! else, such as unknown names and arity mismatches, logs a warning and
//! the offending block collapses to empty output so the rest of the page
//! still renders.

use crate::{
    binding::{BindingKind, Bindings, FunctionImpl},
    builtins, config, dates,
    files::{Project, TextFile},
    highlight::Highlighter,
    markdown::Markdown,
    token::{Token, TokenCollection},
    tokenizer,
};
use std::{collections::HashMap, rc::Rc};

/// Any fatal evaluation error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Tokenizing failed (a function result had unbalanced tags).
    #[error(transparent)]
    Parse(#[from] tokenizer::ParseError),
    /// A protected binding was redefined.
    #[error(transparent)]
    Overwrite(#[from] crate::binding::OverwriteError),
    /// A project file or directory was missing or unreadable.
    #[error(transparent)]
    Files(#[from] crate::files::Error),
    /// A string formatting error.
    #[error(transparent)]
    Fmt(#[from] core::fmt::Error),
}

/// The evaluation engine for one generator run.
pub struct Engine {
    /// The binding environment.
    pub bindings: Bindings,
    /// The loaded project tree.
    project: Rc<Project>,
    /// The Markdown collaborator.
    markdown: Markdown,
    /// The syntax highlighting collaborator.
    highlighter: Highlighter,
    /// Rendered stubs, keyed by source short path, so a stub referenced by
    /// several indexes is evaluated once.
    stub_cache: HashMap<String, String>,
}

impl Engine {
    /// Creates an engine over `project` with the built-ins registered.
    pub fn new(project: Rc<Project>) -> Result<Self, Error> {
        let mut bindings = Bindings::new();
        builtins::register(&mut bindings)?;
        Ok(Self {
            bindings,
            project,
            markdown: Markdown::new(),
            highlighter: Highlighter::new(),
            stub_cache: HashMap::new(),
        })
    }

    /// The loaded project tree.
    pub fn project(&self) -> &Rc<Project> {
        &self.project
    }

    /// The syntax highlighting collaborator.
    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    /// Renders Markdown through the configured collaborators.
    pub fn render_markdown(&self, source: &str) -> String {
        self.markdown.render(source, &self.highlighter)
    }

    /// Evaluates a token sequence, splicing the result of every block.
    pub fn evaluate_collection(
        &mut self,
        tokens: &TokenCollection,
    ) -> Result<TokenCollection, Error> {
        let mut out = TokenCollection::new();
        for token in tokens {
            match token {
                Token::Block(contents) => out.append(self.evaluate_block(contents)?),
                other => out.push(other.clone()),
            }
        }
        Ok(out)
    }

    /// Evaluates one block's contents.
    ///
    /// A block that does not start with the eval hint is not a call; its
    /// nested content still evaluates but the result is not trimmed. A
    /// call resolves its name, dispatches on the binding kind, and strips
    /// the leading and trailing whitespace its source formatting left
    /// behind.
    pub fn evaluate_block(&mut self, block: &TokenCollection) -> Result<TokenCollection, Error> {
        let Some(name) = block.capture_call() else {
            return self.evaluate_collection(block);
        };

        let Some(binding) = self.bindings.get(&name) else {
            log::warn!("unknown binding '{name}': {}{block}{}", config::TAG_OPEN, config::TAG_CLOSE);
            return Ok(TokenCollection::new());
        };

        let mut out = match &binding.kind {
            BindingKind::Variable { body } => self.evaluate_collection(body)?,
            BindingKind::Macro {
                params,
                required,
                body,
            } => self.call_macro(&name, block, params, *required, body)?,
            BindingKind::Function { arity, call } => {
                self.call_function(&name, block, arity, *call)?
            }
        };

        out.trim();
        Ok(out)
    }

    /// Evaluates one argument block.
    pub(crate) fn evaluate_argument(&mut self, arg: &Token) -> Result<TokenCollection, Error> {
        match arg {
            Token::Block(contents) => self.evaluate_block(contents),
            other => Ok(TokenCollection::from(vec![other.clone()])),
        }
    }

    /// Expands a macro call.
    fn call_macro(
        &mut self,
        name: &str,
        block: &TokenCollection,
        params: &[String],
        required: usize,
        body: &TokenCollection,
    ) -> Result<TokenCollection, Error> {
        let args = block.capture_args(params.len());
        if args.len() < required || args.len() > params.len() {
            log::warn!(
                "macro '{name}' takes {required}-{} args, got {}",
                params.len(),
                args.len()
            );
            return Ok(TokenCollection::new());
        }

        // Arguments evaluate in the caller's scope, before any parameter
        // is bound.
        let mut values = Vec::with_capacity(args.len());
        for arg in &args {
            values.push(self.evaluate_argument(arg)?);
        }

        self.bindings.push();
        for (param, value) in params.iter().zip(values) {
            self.bindings
                .set(param, BindingKind::Variable { body: value }, false)?;
        }
        // Unsupplied optional parameters resolve to nothing.
        for param in params.iter().skip(args.len()) {
            self.bindings.set(param, BindingKind::empty(), false)?;
        }
        let out = self.evaluate_collection(body)?;
        self.bindings.pop();
        Ok(out)
    }

    /// Invokes a built-in function.
    fn call_function(
        &mut self,
        name: &str,
        block: &TokenCollection,
        arity: &[usize],
        call: FunctionImpl,
    ) -> Result<TokenCollection, Error> {
        let max = arity.iter().copied().max().unwrap_or(0);
        let args = block.capture_args(max);
        if !arity.contains(&args.len()) {
            log::warn!(
                "function '{name}' takes {arity:?} args, got {}",
                args.len()
            );
            return Ok(TokenCollection::new());
        }

        match call {
            FunctionImpl::Lazy(f) => match f(self, &args)? {
                Some(replacement) => self.evaluate_block(&replacement),
                None => Ok(TokenCollection::new()),
            },
            FunctionImpl::Eager(f) => {
                let mut strings = Vec::with_capacity(args.len());
                for arg in &args {
                    strings.push(self.evaluate_argument(arg)?.resolve());
                }
                let body = f(self, &strings)?;
                tokenizer::tokenize(&body).map_err(Into::into)
            }
        }
    }

    /// Evaluates a config file for its binding declarations; any literal
    /// output is discarded.
    pub fn load_config(&mut self, file: &TextFile) -> Result<(), Error> {
        self.evaluate_collection(file.tokens())?;
        Ok(())
    }

    /// Renders one source file through a template.
    ///
    /// The file's body is evaluated, passed through Markdown, and bound to
    /// `content`; the template's cached token tree then evaluates under
    /// that environment. Pages additionally refresh the `modified` and
    /// `root` bindings; stubs keep those of the invoking file, and their
    /// renders are cached by short path.
    pub fn process_file(
        &mut self,
        file: &Rc<TextFile>,
        template: &Rc<TextFile>,
        is_stub: bool,
    ) -> Result<String, Error> {
        if is_stub && let Some(cached) = self.stub_cache.get(file.short_path()) {
            return Ok(cached.clone());
        }

        log::info!("Processing {}", file.short_path());

        self.bindings.push();
        if !is_stub {
            self.set_page_bindings(file)?;
        }

        let body = self.evaluate_collection(file.tokens())?.resolve();
        let content = self.render_markdown(&body).trim_end().to_string();
        self.bindings.set(
            config::names::CONTENT,
            BindingKind::Variable {
                body: tokenizer::text(content),
            },
            false,
        )?;

        let out = self.evaluate_collection(template.tokens())?.resolve();
        self.bindings.pop();

        if is_stub {
            self.stub_cache
                .insert(file.short_path().to_string(), out.clone());
        }
        Ok(out)
    }

    /// Binds the page-local `modified` and `root` variables.
    fn set_page_bindings(&mut self, file: &TextFile) -> Result<(), Error> {
        self.bindings.set(
            config::names::MODIFIED,
            BindingKind::Variable {
                body: tokenizer::text(dates::iso(file.modified())),
            },
            false,
        )?;
        self.bindings.set(
            config::names::ROOT,
            BindingKind::Variable {
                body: tokenizer::text(file.root_path()),
            },
            false,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;

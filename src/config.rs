//! Fixed project settings.
//!
//! Everything here is a compile-time constant: the templating language's
//! marker spellings, the project directory names, and the names under which
//! the built-in bindings are registered.

/// The marker that opens a block.
pub const TAG_OPEN: &str = "{{";
/// The marker that closes a block.
pub const TAG_CLOSE: &str = "}}";
/// The one-character hint that marks a block as a call site.
pub const EVAL_HINT: &str = "!";
/// The escape marker. The character after it loses any special meaning.
pub const ESCAPE: &str = "\\";
/// Macro parameters following this pseudo-parameter are optional.
pub const OPT_DELIMITER: &str = "/";

/// Page sources. Required.
pub const DIR_PAGES: &str = "siter-pages";
/// Templates. Required; must contain [`TEMPLATE_PAGE`].
pub const DIR_TEMPLATE: &str = "siter-template";
/// Files providing additional global bindings. Optional.
pub const DIR_CONFIG: &str = "siter-config";
/// Copied verbatim into the output. Optional.
pub const DIR_STATIC: &str = "siter-static";
/// Subtrees consumed by the `stubs` built-in. Optional.
pub const DIR_STUBS: &str = "siter-stubs";
/// Scratch build directory, reset on every run.
pub const DIR_STAGING: &str = "siter-staging";
/// Final output, atomically replaced by the staging directory.
pub const DIR_OUT: &str = "siter-out";

/// The page template every project must provide.
pub const TEMPLATE_PAGE: &str = "page.html";
/// The extension accepted for page and stub sources.
pub const PAGE_EXT: &str = "md";
/// The extension accepted for templates.
pub const TEMPLATE_EXT: &str = "html";

/// Built-in binding names.
pub mod names {
    /// Declares a variable or macro.
    pub const DEF: &str = "def";
    /// Branches on whether a binding is defined.
    pub const IF: &str = "if";
    /// Reformats an ISO date.
    pub const DATEFMT: &str = "datefmt";
    /// The date the run started.
    pub const GENERATED: &str = "generated";
    /// The current page's last-modification date.
    pub const MODIFIED: &str = "modified";
    /// Turns heading text into a URL slug.
    pub const ANCHOR: &str = "anchor";
    /// Renders Markdown.
    pub const MD: &str = "md";
    /// Highlights source code.
    pub const CODE: &str = "code";
    /// Renders a directory of stub files through a template.
    pub const STUBS: &str = "stubs";
    /// Relative path from the current page to the pages root.
    pub const ROOT: &str = "root";
    /// The evaluated body of the current page.
    pub const CONTENT: &str = "content";
}

/// HTML container class for highlighted code blocks.
pub const CODE_CSS_CLASS: &str = "siter_code";
/// Class prefix for syntax scope spans inside highlighted code.
pub const CODE_CLASS_PREFIX: &str = "siter-";
/// Title text for the generated table of contents.
pub const TOC_TITLE: &str = "Contents";
/// Text content for heading permalinks.
pub const HEADER_LINK: &str = "#";

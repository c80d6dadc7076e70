//! The project's file tree.
//!
//! All reads happen here, at load time: every page, template, config, and
//! stub source is read and tokenized exactly once when the project opens.
//! All writes go to the staging directory, which a successful run swaps
//! into the output directory in a single rename so partially written
//! output is never observed.

use crate::{config, dates, token::TokenCollection, tokenizer, tokenizer::ParseError};
use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};
use time::Date;
use walkdir::WalkDir;

/// Errors from loading, validating, or writing the project tree.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A path given to `new` already exists.
    #[error("path '{0}' already exists")]
    AlreadyExists(PathBuf),
    /// A required directory is absent.
    #[error("required directory '{0}' not found")]
    MissingDir(PathBuf),
    /// A referenced file is absent.
    #[error("file '{0}' not found")]
    MissingFile(PathBuf),
    /// A source file failed to tokenize.
    #[error("{path}: {source}")]
    Parse {
        /// The offending file.
        path: String,
        /// The tokenizer error.
        source: ParseError,
    },
    /// An underlying filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A directory traversal error.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// A source file, read and tokenized at load time.
#[derive(Debug)]
pub struct TextFile {
    /// Short path for display and cache keys.
    short_path: String,
    /// File name including extension.
    name: String,
    /// Path relative to the owning source directory.
    rel_path: PathBuf,
    /// Containing directory relative to the owning source directory.
    rel_dir: PathBuf,
    /// Last-modification date.
    modified: Date,
    /// The pre-computed token tree.
    tokens: TokenCollection,
}

impl TextFile {
    /// Reads and tokenizes the file at `path` under the source root `root`.
    fn load(root: &Path, path: &Path) -> Result<Self, Error> {
        let short_path = path.display().to_string();
        log::debug!("Loading {short_path}");

        let text = fs::read_to_string(path)?;
        let tokens = tokenizer::tokenize(&text).map_err(|source| Error::Parse {
            path: short_path.clone(),
            source,
        })?;

        let modified = fs::metadata(path)?
            .modified()
            .map(dates::from_system_time)
            .unwrap_or_else(|_| dates::today());

        let rel_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        let rel_dir = rel_path.parent().unwrap_or(Path::new("")).to_path_buf();
        let name = rel_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            short_path,
            name,
            rel_path,
            rel_dir,
            modified,
            tokens,
        })
    }

    /// Short path for display and cache keys.
    pub fn short_path(&self) -> &str {
        &self.short_path
    }

    /// File name including extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last-modification date.
    pub fn modified(&self) -> Date {
        self.modified
    }

    /// The pre-computed token tree.
    pub fn tokens(&self) -> &TokenCollection {
        &self.tokens
    }

    /// The output path for this source, relative to the output root, with
    /// the extension rewritten to `.html`.
    pub fn rel_html_path(&self) -> PathBuf {
        let stem = Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone());
        self.rel_dir.join(format!("{stem}.html"))
    }

    /// Relative path from this file's directory up to its source root,
    /// used for site-relative links.
    pub fn root_path(&self) -> String {
        let depth = self.rel_dir.components().count();
        if depth == 0 {
            String::from(".")
        } else {
            vec![".."; depth].join("/")
        }
    }
}

/// A directory of source files, discovered once at load.
#[derive(Debug)]
pub struct SourceDir {
    /// The directory path.
    path: PathBuf,
    /// Contained files in sorted path order.
    files: Vec<Rc<TextFile>>,
}

impl SourceDir {
    /// Loads every file under `path` with the given extension (or every
    /// file, when `ext` is `None`).
    ///
    /// A missing directory is fatal when `required`, and otherwise yields
    /// an empty listing.
    fn load(path: PathBuf, required: bool, ext: Option<&str>) -> Result<Self, Error> {
        if !path.is_dir() {
            if required {
                return Err(Error::MissingDir(path));
            }
            return Ok(Self {
                path,
                files: Vec::new(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&path).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(ext) = ext
                && entry.path().extension() != Some(ext.as_ref())
            {
                continue;
            }
            files.push(Rc::new(TextFile::load(&path, entry.path())?));
        }

        Ok(Self { path, files })
    }

    /// The contained files, in sorted path order.
    pub fn files(&self) -> &[Rc<TextFile>] {
        &self.files
    }

    /// Looks up one file by its path relative to this directory.
    pub fn file(&self, rel: &str) -> Result<&Rc<TextFile>, Error> {
        self.files
            .iter()
            .find(|f| f.rel_path == Path::new(rel))
            .ok_or_else(|| Error::MissingFile(self.path.join(rel)))
    }

    /// The files directly inside the subdirectory `rel`.
    pub fn files_in(&self, rel: &str) -> Result<Vec<Rc<TextFile>>, Error> {
        let dir = self.path.join(rel);
        if !dir.is_dir() {
            return Err(Error::MissingDir(dir));
        }
        Ok(self
            .files
            .iter()
            .filter(|f| f.rel_dir == Path::new(rel))
            .cloned()
            .collect())
    }
}

/// The fixed directory layout of one project.
#[derive(Debug)]
pub struct Project {
    /// Page sources.
    pub pages: SourceDir,
    /// Templates.
    pub templates: SourceDir,
    /// Global binding files.
    pub config: SourceDir,
    /// Stub sources for the `stubs` built-in.
    pub stubs: SourceDir,
    /// Files copied verbatim into the output.
    static_path: PathBuf,
    /// The scratch build directory.
    staging_path: PathBuf,
    /// The published output directory.
    out_path: PathBuf,
}

impl Project {
    /// Opens and validates the project rooted at `root`, loading and
    /// tokenizing every source file and resetting the staging directory.
    pub fn open(root: &Path) -> Result<Self, Error> {
        let pages = SourceDir::load(root.join(config::DIR_PAGES), true, Some(config::PAGE_EXT))?;
        let templates = SourceDir::load(
            root.join(config::DIR_TEMPLATE),
            true,
            Some(config::TEMPLATE_EXT),
        )?;
        let cfg = SourceDir::load(root.join(config::DIR_CONFIG), false, None)?;
        let stubs = SourceDir::load(root.join(config::DIR_STUBS), false, None)?;

        let staging_path = root.join(config::DIR_STAGING);
        if staging_path.exists() {
            fs::remove_dir_all(&staging_path)?;
        }
        fs::create_dir_all(&staging_path)?;

        let out_path = root.join(config::DIR_OUT);
        fs::create_dir_all(&out_path)?;

        Ok(Self {
            pages,
            templates,
            config: cfg,
            stubs,
            static_path: root.join(config::DIR_STATIC),
            staging_path,
            out_path,
        })
    }

    /// Copies the static tree into staging, when one exists.
    pub fn copy_static(&self) -> Result<(), Error> {
        if !self.static_path.is_dir() {
            return Ok(());
        }
        log::info!(
            "Copying {} to {}",
            self.static_path.display(),
            self.staging_path.display()
        );
        copy_tree(&self.static_path, &self.staging_path)
    }

    /// Writes one generated page into the staging tree.
    pub fn write_page(&self, rel: &Path, text: &str) -> Result<(), Error> {
        let dest = self.staging_path.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, text).map_err(Into::into)
    }

    /// Atomically replaces the output directory with the staging tree.
    pub fn publish(&self) -> Result<(), Error> {
        log::info!(
            "Moving {} to {}",
            self.staging_path.display(),
            self.out_path.display()
        );
        if self.out_path.exists() {
            fs::remove_dir_all(&self.out_path)?;
        }
        fs::rename(&self.staging_path, &self.out_path).map_err(Into::into)
    }
}

/// Recursively copies `src` into `dst`.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), Error> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let dest = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// The default page template written by `new`.
const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8">
        <meta name="generator" content="siter-rs">
        <title>Default Template</title>
    </head>
    <body>
        {{!content}}
    </body>
</html>
"#;

/// The default first page written by `new`.
const DEFAULT_PAGE: &str = "*Hello World!*\n";

/// Scaffolds a minimal project at `root`.
pub fn scaffold(root: &Path) -> Result<(), Error> {
    log::info!("Creating new project at {}", root.display());

    if root != Path::new(".") && root.exists() {
        return Err(Error::AlreadyExists(root.to_path_buf()));
    }

    let pages = root.join(config::DIR_PAGES);
    let templates = root.join(config::DIR_TEMPLATE);
    fs::create_dir_all(&pages)?;
    fs::create_dir_all(&templates)?;

    fs::write(templates.join(config::TEMPLATE_PAGE), DEFAULT_TEMPLATE)?;
    fs::write(pages.join("index.md"), DEFAULT_PAGE)?;
    Ok(())
}

/// Checks that every required directory exists, for a clear error before
/// any work happens.
pub fn validate(root: &Path) -> Result<(), Error> {
    for dir in [config::DIR_PAGES, config::DIR_TEMPLATE] {
        if !root.join(dir).is_dir() {
            return Err(Error::MissingDir(root.join(dir)));
        }
    }
    Ok(())
}

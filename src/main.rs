#![doc = include_str!("../README.md")]
#![warn(
    clippy::pedantic,
    clippy::missing_docs_in_private_items,
    missing_docs,
    rust_2018_idioms
)]

use std::path::{Path, PathBuf};

mod binding;
mod builtins;
mod config;
mod dates;
mod engine;
mod files;
mod highlight;
mod markdown;
mod serve;
mod site;
mod token;
mod tokenizer;

/// Errors that may occur when parsing arguments.
#[derive(Debug, thiserror::Error)]
enum ArgsError {
    /// Extra unknown junk on the command line.
    #[error("unknown arguments: {}", _0.display())]
    Extra(std::ffi::OsString),
    /// Some other parsing error.
    #[error(transparent)]
    Pico(#[from] pico_args::Error),
}

/// The selected subcommand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Command {
    /// Generate the site.
    Gen,
    /// Scaffold a new project.
    New,
    /// Serve the generated site.
    Serve,
    /// Generate, then serve.
    Run,
}

/// Command-line arguments.
struct Args {
    /// The subcommand to run.
    command: Command,
    /// The project root.
    path: String,
    /// The bind address for the web server.
    bind: String,
}

impl Args {
    /// Tries to create an [`Args`] from the given command line arguments.
    fn new() -> Result<Args, ArgsError> {
        let mut args = pico_args::Arguments::from_env();
        let bind = args
            .opt_value_from_str("--bind")?
            .unwrap_or_else(|| "127.0.0.1:3000".to_string());

        let command: Option<String> = args.opt_free_from_str()?;
        let path: Option<String> = args.opt_free_from_str()?;

        let rest = args.finish();
        if !rest.is_empty() {
            return Err(ArgsError::Extra(rest.join(std::ffi::OsStr::new(" "))));
        }

        let default_path = || path.clone().unwrap_or_else(|| String::from("."));
        let (command, path) = match command.as_deref() {
            None | Some("gen") => (Command::Gen, default_path()),
            Some("new") => (Command::New, default_path()),
            Some("serve") => (Command::Serve, default_path()),
            Some("run") => (Command::Run, default_path()),
            // A bare path is shorthand for `gen <path>`.
            Some(other) => (Command::Gen, other.to_string()),
        };

        Ok(Self {
            command,
            path,
            bind,
        })
    }
}

/// Command line usage instructions.
fn usage() {
    let exe = std::env::args().next().unwrap_or_default();
    eprintln!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    eprintln!("Usage: {exe} [command] [path] [options]\n");
    eprintln!("Commands:");
    eprintln!("  gen [path]: Generate the site (default)");
    eprintln!("  new <path>: Scaffold a minimal project");
    eprintln!("  serve [path]: Serve the generated site over HTTP");
    eprintln!("  run [path]: Generate, then serve\n");
    eprintln!("Options:");
    eprintln!("  --bind: Web server bind (default: 127.0.0.1:3000)");
}

/// The output directory served by `serve` and `run`.
fn out_dir(path: &str) -> PathBuf {
    Path::new(path).join(config::DIR_OUT)
}

/// Dispatches the selected command.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args = match Args::new() {
        Ok(args) => args,
        Err(err) => {
            usage();
            return Err(err)?;
        }
    };

    match args.command {
        Command::New => files::scaffold(Path::new(&args.path))?,
        Command::Gen => site::generate(Path::new(&args.path))?,
        Command::Serve => serve::serve(&args.bind, out_dir(&args.path))?,
        Command::Run => {
            site::generate(Path::new(&args.path))?;
            serve::serve(&args.bind, out_dir(&args.path))?;
        }
    }
    Ok(())
}

/// Uses the [`Display`](core::fmt::Display) formatter for an error even when
/// the [`Debug`](core::fmt::Debug) formatter is requested, so fatal errors
/// print cleanly on exit.
struct DisplayError(Box<dyn std::error::Error>);

impl core::fmt::Debug for DisplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl<E: Into<Box<dyn std::error::Error>>> From<E> for DisplayError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

fn main() -> Result<(), DisplayError> {
    run().map_err(Into::into)
}

//! Run command - load a file, or evaluate one expression, and exit.

use anyhow::Result;
use clap::Args;
use silc_core::{Context, SilcError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{RuntimeArgs, error_line};
use crate::config::Config;

#[derive(Args)]
pub struct RunCommand {
    /// File to execute
    pub file: PathBuf,
}

impl RunCommand {
    pub fn run(&self, config: &Config, runtime: &RuntimeArgs) -> Result<ExitCode> {
        let mut ctx = runtime.context(config);
        let failed = load_file(&mut ctx, &self.file) == Load::Failed;
        let status = runtime.finish(&ctx)?;
        Ok(if failed { ExitCode::FAILURE } else { status })
    }
}

/// Load `files`, then evaluate `expr` and print its value
pub fn eval_expr(
    files: &[PathBuf],
    expr: &str,
    config: &Config,
    runtime: &RuntimeArgs,
) -> Result<ExitCode> {
    let mut ctx = runtime.context(config);
    for file in files {
        match load_file(&mut ctx, file) {
            Load::Done => {}
            Load::Quit => return runtime.finish(&ctx),
            Load::Failed => {
                runtime.finish(&ctx)?;
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let failed = match ctx.eval_str(expr) {
        Ok(value) => {
            println!("{}", ctx.display(value));
            false
        }
        Err(SilcError::Quit) => false,
        Err(err) => {
            eprintln!("{}", error_line(err));
            true
        }
    };
    let status = runtime.finish(&ctx)?;
    Ok(if failed { ExitCode::FAILURE } else { status })
}

/// How loading a file ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Load {
    Done,
    Quit,
    Failed,
}

/// Load a file, reporting errors on stderr
pub fn load_file(ctx: &mut Context, file: &Path) -> Load {
    match ctx.load(file) {
        Ok(_) => Load::Done,
        Err(err) if err.is_quit() => Load::Quit,
        Err(err) => {
            eprintln!("{}: {}", file.display(), error_line(err));
            Load::Failed
        }
    }
}

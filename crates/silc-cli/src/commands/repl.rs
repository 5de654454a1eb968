//! REPL command - interactive read-eval-print loop.

use anyhow::Result;
use clap::Args;
use silc_core::{Context, Reader, SilcError};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use super::run::{Load, load_file};
use super::{RuntimeArgs, error_line};
use crate::config::Config;

#[derive(Args, Default)]
pub struct ReplCommand {
    /// Files to load before the first prompt
    pub files: Vec<PathBuf>,
}

impl ReplCommand {
    pub fn run(&self, config: &Config, runtime: &RuntimeArgs) -> Result<ExitCode> {
        let mut ctx = runtime.context(config);
        for file in &self.files {
            if load_file(&mut ctx, file) == Load::Quit {
                return runtime.finish(&ctx);
            }
        }

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", config.repl.banner)?;
        repl_loop(&mut ctx, stdin.lock(), &mut stdout, &config.repl.prompt)?;
        runtime.finish(&ctx)
    }
}

/// What the loop does after a chunk of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Quit,
}

/// Read lines until end of input or `quit`
///
/// A line that leaves a form open is kept and completed by the following
/// lines.
pub fn repl_loop(
    ctx: &mut Context,
    mut input: impl BufRead,
    out: &mut impl Write,
    prompt: &str,
) -> io::Result<()> {
    let mut pending = String::new();
    loop {
        write!(out, "{prompt}")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }
        pending.push_str(&line);

        if eval_pending(ctx, &mut pending, out)? == Step::Quit {
            return Ok(());
        }
    }
}

/// Evaluate every complete form in `pending`, leaving an unfinished one
fn eval_pending(ctx: &mut Context, pending: &mut String, out: &mut impl Write) -> io::Result<Step> {
    let mut reader = Reader::new(pending.as_bytes());
    loop {
        let start = reader.position();
        match reader.read(ctx) {
            Ok(Some(form)) => {
                match ctx.eval(form) {
                    Ok(value) => writeln!(out, "{}", ctx.display(value))?,
                    Err(SilcError::Quit) => return Ok(Step::Quit),
                    Err(err) => writeln!(out, "{}", error_line(err))?,
                }
                if reader.at_end() {
                    pending.clear();
                    return Ok(Step::Continue);
                }
            }
            Ok(None) => {
                pending.clear();
                return Ok(Step::Continue);
            }
            Err(SilcError::UnexpectedEof) => {
                pending.replace_range(..start, "");
                return Ok(Step::Continue);
            }
            Err(err) => {
                writeln!(out, "{}", error_line(err))?;
                pending.clear();
                return Ok(Step::Continue);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silc_core::ContextConfig;
    use std::io::Cursor;

    fn session(input: &str) -> (Context, String) {
        let mut ctx = Context::with_config(ContextConfig {
            heap_words: 64 * 1024,
            symbol_table_buckets: 31,
            ..ContextConfig::default()
        });
        ctx.set_output(Box::new(io::sink()));
        let mut out = Vec::new();
        repl_loop(&mut ctx, Cursor::new(input), &mut out, "? ").unwrap();
        (ctx, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_prints_each_result() {
        let (_, out) = session("(inc 0)\n(define a 5) a\n");
        assert_eq!(out, "? 1\n? a\n5\n? \n");
    }

    #[test]
    fn test_trailing_comment_drains_the_line() {
        let (ctx, out) = session("(inc 0) ; first\n(inc 1)\n");
        assert_eq!(out, "? 1\n? 2\n? \n");
        assert_eq!(ctx.stack_height(), 0);
    }

    #[test]
    fn test_multi_line_form() {
        let (_, out) = session("(+ 1\n   2\n   3)\n");
        assert_eq!(out, "? ? ? 6\n? \n");
    }

    #[test]
    fn test_errors_do_not_end_the_session() {
        let (_, out) = session("(1)\n)\n(inc 1)\n");
        assert_eq!(
            out,
            "? ;; error: not a function\n? ;; error: unexpected character\n? 2\n? \n"
        );
    }

    #[test]
    fn test_quit_stops_reading() {
        let (ctx, out) = session("(quit 4)\n(inc 1)\n");
        assert_eq!(out, "? ");
        assert_eq!(ctx.exit_code(), 4);
        assert_eq!(ctx.stack_height(), 0);
    }
}

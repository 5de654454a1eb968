//! CLI command implementations.

pub mod repl;
pub mod run;

use clap::{Args, ValueEnum};
use silc_core::{Context, SilcError};
use std::io::{self, Write};
use std::process::ExitCode;

use crate::config::Config;

/// Heap statistics output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatsFormat {
    /// `;;` comment lines, as the REPL prints them
    Text,
    /// One JSON object
    Json,
}

/// Runtime flags shared by every command; they override silc.toml
#[derive(Args, Debug, Default, Clone)]
pub struct RuntimeArgs {
    /// Heap size in words
    #[arg(long, value_name = "WORDS", global = true)]
    pub heap_words: Option<usize>,

    /// Argument stack capacity in values
    #[arg(long, value_name = "VALUES", global = true)]
    pub stack_size: Option<usize>,

    /// Maximum nesting of evaluation frames
    #[arg(long, value_name = "FRAMES", global = true)]
    pub max_depth: Option<usize>,

    /// Print heap statistics on exit
    #[arg(
        long,
        value_enum,
        value_name = "FORMAT",
        num_args = 0..=1,
        default_missing_value = "text",
        global = true
    )]
    pub gc_stats: Option<StatsFormat>,

    /// Print the position table on exit
    #[arg(long, global = true)]
    pub dump_heap: bool,
}

impl RuntimeArgs {
    /// Build a context from the config file with flag overrides applied
    pub fn context(&self, config: &Config) -> Context {
        let mut settings = config.context_config();
        if let Some(words) = self.heap_words {
            settings.heap_words = words;
        }
        if let Some(size) = self.stack_size {
            settings.stack_size = size;
        }
        if let Some(depth) = self.max_depth {
            settings.max_eval_depth = depth;
        }
        tracing::debug!(?settings, "creating context");
        Context::with_config(settings)
    }

    /// Print the requested diagnostics and turn the recorded exit code into
    /// the process status
    pub fn finish(&self, ctx: &Context) -> anyhow::Result<ExitCode> {
        let mut out = io::stdout().lock();
        if let Some(format) = self.gc_stats {
            write_stats(ctx, format, &mut out)?;
        }
        if self.dump_heap {
            write!(out, "{}", ctx.heap_dump())?;
        }
        out.flush()?;
        Ok(exit_status(ctx.exit_code()))
    }
}

fn write_stats(ctx: &Context, format: StatsFormat, out: &mut impl Write) -> io::Result<()> {
    let stats = ctx.heap_stats();
    match format {
        StatsFormat::Text => writeln!(out, "{stats}"),
        StatsFormat::Json => {
            let gc = ctx.heap().gc_stats();
            let json = serde_json::json!({
                "total_memory": stats.total_memory,
                "usable_memory": stats.usable_memory,
                "free_memory": stats.free_memory,
                "pos_count": stats.pos_count,
                "free_pos_count": stats.free_pos_count,
                "live_objects": stats.live_objects(),
                "collections": gc.collections,
                "total_pause_ns": gc.total_pause_ns,
            });
            writeln!(out, "{json}")
        }
    }
}

/// Process status for a `quit` code; only the low byte reaches the OS
pub fn exit_status(code: i32) -> ExitCode {
    ExitCode::from((code & 0xff) as u8)
}

/// REPL-style error line
pub fn error_line(err: SilcError) -> String {
    format!(";; error: {err}")
}

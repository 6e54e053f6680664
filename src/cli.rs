//! Command line of `submission-migrate`, built on clap.
//!
//! All window and pool flags are optional so that [`Settings`](crate::config::Settings)
//! can tell "not given" apart from "given the default value" when it merges
//! the file layer, environment and positional overrides.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::api::ActionKind;

/// Walk the submission listing and trigger storage migrations for each submission.
#[derive(Debug, Parser)]
#[command(name = "submission-migrate", version, about)]
pub struct Cli {
    /// Offset of the first submission to fetch.
    #[arg(long)]
    pub offset: Option<u64>,

    /// Number of submissions to fetch.
    #[arg(long)]
    pub count: Option<u64>,

    /// Username for login (falls back to OJ_USERNAME).
    #[arg(long)]
    pub username: Option<String>,

    /// Password for login (falls back to OJ_PASSWORD).
    #[arg(long)]
    pub password: Option<String>,

    /// Number of concurrent migration workers.
    #[arg(long)]
    pub consumers: Option<usize>,

    /// Migration to trigger per submission; repeat to run several in order.
    #[arg(long = "action", value_enum)]
    pub actions: Vec<ActionArg>,

    /// Path to the config file.
    #[arg(long, default_value = "migrate.toml")]
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,

    /// Offset, used only when --offset is not given.
    #[arg(value_name = "OFFSET")]
    pub positional_offset: Option<String>,

    /// Count, used only when --count is not given.
    #[arg(value_name = "COUNT")]
    pub positional_count: Option<String>,
}

/// Action accepted on the command line, mapped to [`ActionKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    /// Trigger `migrate-code`.
    Code,
    /// Trigger `migrate-output`.
    Output,
}

impl From<ActionArg> for ActionKind {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Code => ActionKind::Code,
            ActionArg::Output => ActionKind::Output,
        }
    }
}

//! CLI command definitions
//!
//! Defines the clap commands for the apicheck CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run every test file in a directory
    Run(RunArgs),

    /// Load and validate servers and tests without sending requests
    Check(SuiteArgs),
}

/// Where the definitions live
#[derive(Args, Debug, Clone)]
pub struct SuiteArgs {
    /// Directory containing the *.test.json files
    pub tests_dir: PathBuf,

    /// Server profiles file
    #[arg(long = "servers-file", short = 's')]
    pub servers_file: PathBuf,

    /// Only use this test file (the .test.json suffix is optional)
    #[arg(long, short = 'f')]
    pub file: Option<String>,

    /// Only use the test with this name
    #[arg(long, short = 't')]
    pub test: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub suite: SuiteArgs,

    /// Also print passing tests and files
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Run each file serially on one worker instead of spreading tests
    #[arg(long)]
    pub file_parallel: bool,

    /// Use a single worker
    #[arg(long, conflicts_with = "workers")]
    pub no_parallel: bool,

    /// Number of workers (default: available CPUs)
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Default request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Default user agent
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Default Content-Type header
    #[arg(long)]
    pub content_type: Option<String>,

    /// Default Accept header
    #[arg(long)]
    pub accept: Option<String>,
}

impl Commands {
    pub fn verbose(&self) -> bool {
        match self {
            Commands::Run(args) => args.verbose,
            Commands::Check(_) => false,
        }
    }
}

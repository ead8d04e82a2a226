//! CLI command handling
//!
//! Turns parsed commands into a [`RunConfig`] and drives the runner.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;

use crate::commands::{Commands, RunArgs, SuiteArgs};
use crate::common::config::{Config, DispatchMode, RunConfig};
use crate::common::Result;
use crate::runner::{self, ConsoleSink};

/// Dispatch a CLI command, returning whether everything passed
pub async fn dispatch(command: Commands) -> Result<bool> {
    let defaults = Config::load()?;
    match command {
        Commands::Run(args) => {
            let config = run_config(&defaults, &args);
            let sink = Arc::new(ConsoleSink::new(config.verbose));
            let summary = runner::run(&config, sink).await?;
            Ok(summary.passed())
        }

        Commands::Check(args) => {
            let config = suite_config(&defaults, &args);
            let plan = runner::load(&config)?;
            println!(
                "{} {} servers, {} files, {} tests",
                "✓".green(),
                plan.servers.len(),
                plan.suite.all_files().count(),
                plan.suite.all_files().map(|f| f.tests.len()).sum::<usize>()
            );
            Ok(true)
        }
    }
}

fn suite_config(defaults: &Config, args: &SuiteArgs) -> RunConfig {
    let mut config = RunConfig::from_config(defaults, &args.servers_file, &args.tests_dir);
    config.file = args.file.clone();
    config.test = args.test.clone();
    config
}

/// Merge command-line flags over the file defaults
pub fn run_config(defaults: &Config, args: &RunArgs) -> RunConfig {
    let mut config = suite_config(defaults, &args.suite);
    config.verbose = args.verbose;
    if args.file_parallel {
        config.mode = DispatchMode::PerFile;
    }
    if args.no_parallel {
        config.workers = 1;
    } else if let Some(workers) = args.workers {
        config.workers = workers.max(1);
    }
    if let Some(secs) = args.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(user_agent) = &args.user_agent {
        config.user_agent = user_agent.clone();
    }
    if let Some(content_type) = &args.content_type {
        config.content_type = content_type.clone();
    }
    if let Some(accept) = &args.accept {
        config.accept = accept.clone();
    }
    config
}

use std::path::Path;

use anyhow::Context;
use anyhow::anyhow;

use crate::arg_parser::CliArgs;
use crate::arg_parser::ParseArgsError;
use crate::arg_parser::RunArgs;
use crate::arg_parser::SubCommand;
use crate::backends;
use crate::backends::BackendCollection;
use crate::commands;
use crate::configuration;
use crate::utils::Logger;

/// An error bound for the process exit code. Setup and per-file failures
/// exit 1; a check run that found non-compliant files exits 2 with no
/// extra message since the summary already said what happened.
pub struct AppError {
  pub inner: anyhow::Error,
  pub exit_code: i32,
}

impl From<anyhow::Error> for AppError {
  fn from(inner: anyhow::Error) -> Self {
    AppError { inner, exit_code: 1 }
  }
}

impl From<ParseArgsError> for AppError {
  fn from(err: ParseArgsError) -> Self {
    AppError {
      inner: err.into(),
      exit_code: 1,
    }
  }
}

pub async fn run_cli(args: &CliArgs, logger: &Logger) -> Result<(), AppError> {
  match &args.sub_command {
    SubCommand::Version => {
      commands::output_version(logger);
      Ok(())
    }
    SubCommand::Help(help_text) => {
      commands::output_help(logger, help_text);
      Ok(())
    }
    SubCommand::Run(cmd) => run_formatting(cmd, args, logger).await,
  }
}

async fn run_formatting(cmd: &RunArgs, args: &CliArgs, logger: &Logger) -> Result<(), AppError> {
  let cwd = std::env::current_dir().context("Could not resolve the current directory")?;
  let root = dunce::canonicalize(&cwd).with_context(|| format!("Could not resolve {}", cwd.display()))?;
  let config = configuration::resolve_config(&root, args.config.as_deref().map(Path::new))?;

  let collection = BackendCollection::build(backends::create_backends(cmd, &config))?;
  // a missing formatter binary aborts before any file is looked at
  collection.ensure_all_available()?;

  if cmd.check {
    let not_compliant_count = commands::check(cmd, &config, &collection, &root, logger).await?;
    if not_compliant_count > 0 {
      return Err(AppError {
        inner: anyhow!(""),
        exit_code: 2,
      });
    }
    Ok(())
  } else {
    commands::format(cmd, &config, &collection, &root, logger).await?;
    Ok(())
  }
}

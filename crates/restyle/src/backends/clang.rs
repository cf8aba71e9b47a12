use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use anyhow::anyhow;
use async_trait::async_trait;
use clap::Arg;
use once_cell::sync::OnceCell;

use crate::utils::resolve_command;

use super::FormatterBackend;
use super::RunOptions;
use super::RunResult;
use super::common::ExternalInvocation;
use super::common::run_external;

const COMMAND_NAME: &str = "clang-format";
const ACCEPTED_EXIT_CODES: &[i32] = &[0];

/// Formats C and C++ files with clang-format.
pub struct ClangBackend {
  style: Option<String>,
  timeout: Duration,
  command: OnceCell<PathBuf>,
}

pub fn register_args(app: clap::Command) -> clap::Command {
  app.arg(
    Arg::new("clang_style")
      .long("clang_style")
      .value_name("style")
      .help("The style to pass to clang-format. See `clang-format --help` for the options.")
      .num_args(1),
  )
}

impl ClangBackend {
  pub fn new(style: Option<String>, timeout: Duration) -> Self {
    ClangBackend {
      style,
      timeout,
      command: OnceCell::new(),
    }
  }

  fn resolved_command(&self) -> Result<&PathBuf> {
    self.command.get_or_try_init(|| {
      resolve_command(COMMAND_NAME).ok_or_else(|| {
        anyhow!(
          "Could not find '{}' on PATH (versioned '{}-<major>.<minor>' variants were also searched). Install it and re-run.",
          COMMAND_NAME,
          COMMAND_NAME,
        )
      })
    })
  }

  fn style_args(&self) -> Vec<OsString> {
    self.style.iter().map(|style| OsString::from(format!("-style={}", style))).collect()
  }
}

#[async_trait]
impl FormatterBackend for ClangBackend {
  fn name(&self) -> &'static str {
    COMMAND_NAME
  }

  fn extensions(&self) -> &'static [&'static str] {
    &[".c", ".h", ".cpp", ".hpp"]
  }

  fn config_file_name(&self) -> Option<&'static str> {
    Some(".clang-format")
  }

  fn ensure_available(&self) -> Result<()> {
    self.resolved_command().map(|_| ())
  }

  async fn run(&self, path: &Path, rel_path: &Path, options: RunOptions) -> Result<RunResult> {
    let command = self.resolved_command()?;
    let mut check_args = self.style_args();
    check_args.push(path.into());
    let mut in_place_args = vec![OsString::from("-i")];
    in_place_args.extend(self.style_args());
    in_place_args.push(path.into());
    run_external(
      ExternalInvocation {
        command,
        check_args,
        in_place_args,
        check_exit_codes: ACCEPTED_EXIT_CODES,
        in_place_exit_codes: ACCEPTED_EXIT_CODES,
        timeout: self.timeout,
      },
      path,
      rel_path,
      options,
    )
    .await
  }
}

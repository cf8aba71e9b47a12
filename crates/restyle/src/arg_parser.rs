use anyhow::Result;
use anyhow::bail;
use clap::Arg;
use clap::ArgAction;
use clap::Command;
use thiserror::Error;

#[derive(Debug, PartialEq, Eq)]
pub struct CliArgs {
  pub sub_command: SubCommand,
  pub verbose: bool,
  pub config: Option<String>,
}

impl CliArgs {
  pub fn is_stdout_machine_readable(&self) -> bool {
    // the combined patch is read from stdout in this mode
    match &self.sub_command {
      SubCommand::Run(cmd) => cmd.output_patch_file.as_deref() == Some("-"),
      _ => false,
    }
  }

  fn new_with_sub_command(sub_command: SubCommand) -> CliArgs {
    CliArgs {
      sub_command,
      verbose: false,
      config: None,
    }
  }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubCommand {
  Run(RunArgs),
  Version,
  Help(String),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunArgs {
  pub check: bool,
  pub exclude_dirs: Vec<String>,
  pub diffbase: Option<String>,
  pub output_patch_file: Option<String>,
  pub jobs: Option<usize>,
  pub clang_style: Option<String>,
  pub yapf_style: Option<String>,
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ParseArgsError(#[from] anyhow::Error);

pub fn parse_args(args: Vec<String>) -> Result<CliArgs, ParseArgsError> {
  inner_parse_args(args).map_err(ParseArgsError)
}

fn inner_parse_args(args: Vec<String>) -> Result<CliArgs> {
  // clap's own version/help handling doesn't output exactly how we like
  if args.len() == 2 && (args[1] == "-v" || args[1] == "-V" || args[1] == "--version") {
    return Ok(CliArgs::new_with_sub_command(SubCommand::Version));
  }
  if args.len() == 2 && (args[1] == "-h" || args[1] == "--help" || args[1] == "help") {
    let mut cli_parser = create_cli_parser();
    let help_text = cli_parser.render_help().to_string();
    return Ok(CliArgs::new_with_sub_command(SubCommand::Help(help_text)));
  }

  let cli_parser = create_cli_parser();
  let matches = cli_parser.try_get_matches_from(&args)?;

  let run_args = RunArgs {
    check: matches.get_flag("check"),
    exclude_dirs: matches
      .get_many::<String>("exclude_dirs")
      .map(|values| values.cloned().collect())
      .unwrap_or_default(),
    diffbase: matches.get_one::<String>("diffbase").cloned(),
    output_patch_file: matches.get_one::<String>("output_patch_file").cloned(),
    jobs: matches.get_one::<usize>("jobs").copied(),
    clang_style: matches.get_one::<String>("clang_style").cloned(),
    yapf_style: matches.get_one::<String>("yapf_style").cloned(),
  };

  if run_args.output_patch_file.is_some() && !run_args.check {
    bail!("--output_patch_file is only valid together with --check.");
  }

  Ok(CliArgs {
    sub_command: SubCommand::Run(run_args),
    verbose: matches.get_flag("verbose"),
    config: matches.get_one::<String>("config").cloned(),
  })
}

fn create_cli_parser() -> Command {
  let app = Command::new("restyle")
    .version(env!("CARGO_PKG_VERSION"))
    .about("Formats C/C++ and Python files across the current directory tree, or checks which ones are non-compliant.")
    .override_usage("restyle [OPTIONS]")
    .disable_version_flag(true)
    .arg(
      Arg::new("check")
        .long("check")
        .help("Determine whether files meet the style configs without modifying them. Exits nonzero when some files need formatting.")
        .action(ArgAction::SetTrue),
    )
    .arg(
      Arg::new("exclude_dirs")
        .long("exclude_dirs")
        .value_name("dir")
        .help("Directories to exclude from scanning.")
        .num_args(1..),
    )
    .arg(
      Arg::new("diffbase")
        .long("diffbase")
        .value_name("ref")
        .help("The git branch/tag/commit to compare against. When provided, only files that changed since the merge-base with this revision are scanned.")
        .num_args(1),
    )
    .arg(
      Arg::new("output_patch_file")
        .long("output_patch_file")
        .value_name("path")
        .help("Write a unified patch of all needed changes to this path ('-' writes it to stdout). Only valid with --check.")
        .num_args(1),
    )
    .arg(
      Arg::new("config")
        .long("config")
        .short('c')
        .value_name("path")
        .help("Path to a JSON configuration file. Defaults to .restyle.json in the current directory when present.")
        .num_args(1),
    )
    .arg(
      Arg::new("jobs")
        .long("jobs")
        .short('j')
        .value_name("count")
        .help("Number of files to process in parallel. Defaults to the number of available cores.")
        .value_parser(clap::value_parser!(usize))
        .num_args(1),
    )
    .arg(
      Arg::new("verbose")
        .long("verbose")
        .help("Prints additional diagnostic information.")
        .action(ArgAction::SetTrue),
    );
  crate::backends::register_args(app)
}

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![deny(clippy::unused_async)]

#[macro_use]
mod utils;

use run_cli::AppError;
use utils::Logger;
use utils::LoggerOptions;

mod arg_parser;
mod backends;
mod commands;
mod configuration;
mod format;
mod paths;
mod run_cli;
mod vcs;

#[cfg(test)]
mod test_helpers;

fn main() {
  let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
  rt.block_on(async move {
    match run().await {
      Ok(_) => {}
      Err(err) => {
        let result = format!("{:#}", err.inner);
        #[allow(clippy::print_stderr)]
        if !result.is_empty() {
          eprintln!("{}", result);
        }
        std::process::exit(err.exit_code);
      }
    }
  });
}

async fn run() -> Result<(), AppError> {
  let args = arg_parser::parse_args(std::env::args().collect())?;
  let logger = Logger::new(&LoggerOptions {
    is_verbose: args.verbose,
    is_stdout_machine_readable: args.is_stdout_machine_readable(),
  });
  run_cli::run_cli(&args, &logger).await
}

use crate::utils::Logger;

pub fn output_version(logger: &Logger) {
  logger.log(&format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));
}

pub fn output_help(logger: &Logger, help_text: &str) {
  logger.log(help_text);
}

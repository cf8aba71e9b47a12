use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::utils::Logger;

/// Logger that keeps track of how many errors it's logged.
#[derive(Clone)]
pub struct ErrorCountLogger {
  error_count: Arc<AtomicUsize>,
  logger: Logger,
}

impl ErrorCountLogger {
  pub fn from_logger(logger: &Logger) -> Self {
    ErrorCountLogger {
      error_count: Arc::new(AtomicUsize::new(0)),
      logger: logger.clone(),
    }
  }

  pub fn log_error(&self, message: &str) {
    self.logger.log_stderr(message);
    self.error_count.fetch_add(1, Ordering::SeqCst);
  }

  pub fn get_error_count(&self) -> usize {
    self.error_count.load(Ordering::SeqCst)
  }
}

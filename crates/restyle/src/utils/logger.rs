use std::io::IsTerminal;
use std::io::Stderr;
use std::io::Stdout;
use std::io::Write;
use std::io::stderr;
use std::io::stdout;
use std::sync::Arc;

use parking_lot::Mutex;

// use a macro here so the expression provided is only evaluated when in verbose mode
macro_rules! log_verbose {
  ($logger:expr, $($arg:tt)*) => {
    if $logger.is_verbose() {
      let mut text = String::from("[VERBOSE]: ");
      text.push_str(&format!($($arg)*));
      $logger.log_stderr(&text);
    }
  }
}

#[derive(Clone, Default)]
pub struct LoggerOptions {
  pub is_verbose: bool,
  /// Whether stdout will be read by a program, like when the combined
  /// patch is written there.
  pub is_stdout_machine_readable: bool,
}

/// Writes program output, serializing access so that lines logged from
/// concurrent tasks never interleave.
///
/// Results go to stdout and diagnostics to stderr. Transient lines are
/// padded to the terminal width and end with a carriage return so the next
/// line overwrites them. They are dropped entirely when stderr is not a
/// terminal.
#[derive(Clone)]
pub struct Logger {
  state: Arc<Mutex<LoggerState>>,
  is_verbose: bool,
  is_stdout_machine_readable: bool,
}

struct LoggerState {
  std_out: Stdout,
  std_err: Stderr,
  is_err_terminal: bool,
}

impl Logger {
  pub fn new(options: &LoggerOptions) -> Self {
    Logger {
      state: Arc::new(Mutex::new(LoggerState {
        std_out: stdout(),
        std_err: stderr(),
        is_err_terminal: stderr().is_terminal(),
      })),
      is_verbose: options.is_verbose,
      is_stdout_machine_readable: options.is_stdout_machine_readable,
    }
  }

  #[inline]
  pub fn is_verbose(&self) -> bool {
    self.is_verbose
  }

  pub fn log(&self, text: &str) {
    if self.is_stdout_machine_readable {
      // keep stdout clean for the program reading it
      self.log_stderr(text);
      return;
    }
    let mut state = self.state.lock();
    let _ = writeln!(state.std_out, "{}", text);
  }

  pub fn log_stderr(&self, text: &str) {
    let mut state = self.state.lock();
    let line = pad_line(text, state.is_err_terminal);
    let _ = writeln!(state.std_err, "{}", line);
  }

  /// Logs a line that the next logged line is allowed to overwrite.
  pub fn log_transient(&self, text: &str) {
    let mut state = self.state.lock();
    if !state.is_err_terminal {
      return;
    }
    let line = pad_line(text, true);
    let _ = write!(state.std_err, "{}\r", line);
    let _ = state.std_err.flush();
  }
}

fn pad_line(text: &str, is_terminal: bool) -> String {
  if !is_terminal {
    return text.to_string();
  }
  let width = terminal_width();
  let char_count = text.chars().count();
  if char_count < width {
    let mut line = String::with_capacity(width);
    line.push_str(text);
    line.extend(std::iter::repeat(' ').take(width - char_count));
    line
  } else {
    text.to_string()
  }
}

fn terminal_width() -> usize {
  crossterm::terminal::size().map(|(cols, _)| cols as usize).unwrap_or(80)
}

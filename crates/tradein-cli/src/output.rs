//! Console output

use std::io::{self, Write};

use console::{style, Term};

use crate::commands::ColorArg;

/// Writes status lines to stderr and results to stdout
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    out: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            out: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// Create a reporter honouring the color flag
    #[must_use]
    pub fn from_args(color: ColorArg, quiet: bool) -> Self {
        let use_color = match color {
            ColorArg::Always => true,
            ColorArg::Never => false,
            ColorArg::Auto => Term::stderr().features().colors_supported(),
        };
        Self::new(use_color, quiet)
    }

    fn status(&self, symbol: &str, word: &str, message: &str, paint: fn(&str) -> String) {
        let prefix = if self.use_color {
            paint(symbol)
        } else {
            word.to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.status("✓", "PASS", message, |s| style(s).green().bold().to_string());
        }
    }

    /// Print a failure message (shown even in quiet mode)
    pub fn failure(&self, message: &str) {
        self.status("✗", "FAIL", message, |s| style(s).red().bold().to_string());
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            self.status("⚠", "WARN", message, |s| style(s).yellow().bold().to_string());
        }
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line(&styled);
    }

    /// Print a result line to stdout.
    ///
    /// Unlike status lines this is the command's output, so a failed write
    /// (e.g. a closed pipe) is returned.
    pub fn result(&self, line: &str) -> io::Result<()> {
        write_result(&self.out, line)
    }
}

fn write_result(mut out: impl Write, line: &str) -> io::Result<()> {
    writeln!(out, "{line}")?;
    out.flush()
}

//! Colored terminal output for packaging runs.
//!
//! Progress, warnings and errors go to stderr so that stdout only carries
//! command results (a key, an archive path) and stays safe to capture in CI
//! scripts.

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    progress: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self::new(self.verbose, self.quiet)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            progress: BufferWriter::stderr(color_choice()),
            verbose,
            quiet,
        }
    }

    fn line(&self, marker: &str, color: Option<Color>, bold: bool, message: &str) -> std::io::Result<()> {
        let mut buffer = self.progress.buffer();
        if let Some(color) = color {
            buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold))?;
        }
        write!(&mut buffer, "{marker}")?;
        buffer.reset()?;
        writeln!(&mut buffer, " {message}")?;
        self.progress.print(&buffer)
    }

    /// Print an info message
    pub fn info(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.line("ℹ", Some(Color::Cyan), false, message)
    }

    /// Print a success message
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.line("✓", Some(Color::Green), true, message)
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.line("⚠", Some(Color::Yellow), true, message)
    }

    /// Print an error message (always shown)
    pub fn error(&self, message: &str) {
        if self.line("✗", Some(Color::Red), true, message).is_err() {
            eprintln!("✗ {message}");
        }
    }

    /// Print a verbose/debug message (only in verbose mode)
    pub fn verbose(&self, message: &str) -> std::io::Result<()> {
        if !self.verbose || self.quiet {
            return Ok(());
        }
        self.line("→", Some(Color::Blue), false, message)
    }

    /// Print a progress message
    pub fn progress(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.line("⋯", Some(Color::Magenta), false, message)
    }

    /// Print a section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let mut buffer = self.progress.buffer();
        writeln!(&mut buffer)?;
        buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        writeln!(&mut buffer, "═══ {title} ═══")?;
        buffer.reset()?;
        self.progress.print(&buffer)
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut buffer = self.progress.buffer();
        writeln!(&mut buffer, "    {message}")?;
        self.progress.print(&buffer)
    }

    /// Print a plain progress line
    pub fn println(&self, message: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut buffer = self.progress.buffer();
        writeln!(&mut buffer, "{message}")?;
        self.progress.print(&buffer)
    }

    /// Print a command result on stdout, regardless of quiet mode
    pub fn result(&self, value: &str) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{value}")
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

/// Colors only when stderr is a terminal and `NO_COLOR` is unset.
fn color_choice() -> ColorChoice {
    use std::io::IsTerminal;
    if std::env::var_os("NO_COLOR").is_some() || !std::io::stderr().is_terminal() {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

// Output formatting and styling

use colored::Colorize;

/// Output styling configuration
pub struct OutputStyle {
    pub use_colors: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

impl OutputStyle {
    /// Style without colors, for logs and tests
    pub fn plain() -> Self {
        Self { use_colors: false }
    }

    /// Format success message
    pub fn success(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✓".green().bold(), msg)
        } else {
            format!("✓ {}", msg)
        }
    }

    /// Format error message
    pub fn error(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "Error:".red().bold(), msg)
        } else {
            format!("Error: {}", msg)
        }
    }

    /// Format a note, used for expected outcomes such as an early shutdown
    pub fn note(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "NOTE:".yellow().bold(), msg)
        } else {
            format!("NOTE: {}", msg)
        }
    }

    /// Format a command line or path
    pub fn code(&self, code: &str) -> String {
        if self.use_colors {
            code.cyan().to_string()
        } else {
            code.to_string()
        }
    }

    /// Format an external command about to be executed
    pub fn command(&self, command_line: &str) -> String {
        format!("$ {}", self.code(command_line))
    }
}

/// Print success message
pub fn print_success(msg: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.success(msg));
}

/// Print an already rendered error
pub fn print_rendered(rendered: &str) {
    eprintln!("{}", rendered);
}

/// Echo an external command line
pub fn print_command(command_line: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.command(command_line));
}

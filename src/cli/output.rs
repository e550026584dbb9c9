//! Output formatting module for vpcsynth
//!
//! Provides colored human output plus machine-readable JSON/YAML modes.

use colored::Colorize;
use serde::Serialize;
use std::time::{Duration, Instant};

use super::OutputFormat;
use vpcsynth::validate::Issue;

/// Output formatter for different output modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// Selected output format
    format: OutputFormat,
    /// Verbosity level
    verbosity: u8,
    /// Start time for duration calculations
    start_time: Instant,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, format: OutputFormat, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        colored::control::set_override(use_color);

        Self {
            use_color,
            format,
            verbosity,
            start_time: Instant::now(),
        }
    }

    /// Whether colors are in use
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Whether the command should print a structured document instead of text
    pub fn is_structured(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::Yaml)
    }

    fn is_quiet(&self) -> bool {
        self.is_structured() || matches!(self.format, OutputFormat::Minimal)
    }

    /// Print a structured document in the selected format (JSON for human
    /// and minimal modes)
    pub fn document<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
            _ => println!("{}", serde_json::to_string_pretty(value)?),
        }
        Ok(())
    }

    /// Print a banner/header
    pub fn banner(&self, title: &str) {
        if self.is_quiet() {
            return;
        }

        let line = "=".repeat(title.len() + 4);
        if self.use_color {
            println!("\n{}", line.bright_blue());
            println!("{}", format!("  {}  ", title).bright_blue().bold());
            println!("{}\n", line.bright_blue());
        } else {
            println!("\n{}", line);
            println!("  {}  ", title);
            println!("{}\n", line);
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.is_quiet() {
            return;
        }

        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print a plain line of human output
    pub fn line(&self, message: &str) {
        if self.is_structured() {
            return;
        }
        println!("{}", message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.is_quiet() {
            return;
        }

        if self.use_color {
            println!("{} {}", "OK:".green().bold(), message);
        } else {
            println!("OK: {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.is_structured() {
            let err = serde_json::json!({
                "type": "error",
                "message": message
            });
            eprintln!("{}", err);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.is_structured() {
            let warn = serde_json::json!({
                "type": "warning",
                "message": message
            });
            eprintln!("{}", warn);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print a hint message
    pub fn hint(&self, message: &str) {
        if self.is_quiet() {
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "HINT:".cyan().bold(), message);
        } else {
            eprintln!("HINT: {}", message);
        }
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 || self.is_quiet() {
            return;
        }

        if self.use_color {
            println!("{} {}", "INFO:".blue(), message);
        } else {
            println!("INFO: {}", message);
        }
    }

    /// Print a debug message (requires higher verbosity)
    pub fn debug(&self, message: &str) {
        if self.verbosity < 2 || self.is_quiet() {
            return;
        }

        if self.use_color {
            println!("{} {}", "DEBUG:".magenta(), message);
        } else {
            println!("DEBUG: {}", message);
        }
    }

    /// Print validation errors followed by warnings
    pub fn issues(&self, errors: &[Issue], warnings: &[Issue]) {
        for issue in errors {
            self.error(&issue.to_string());
        }
        for issue in warnings {
            self.warning(&issue.to_string());
        }
    }

    /// Print a key/value table with aligned keys
    pub fn table(&self, rows: &[(String, String)]) {
        if self.is_structured() {
            return;
        }

        let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        for (key, value) in rows {
            if self.use_color {
                let key = format!("{:<width$}", key);
                println!("  {}  {}", key.bright_white().bold(), value.bright_black());
            } else {
                println!("  {:<width$}  {}", key, value);
            }
        }
    }

    /// Print the elapsed time since the formatter was created
    pub fn elapsed(&self, what: &str) {
        if self.verbosity < 1 || self.is_quiet() {
            return;
        }
        let duration = format_duration(self.start_time.elapsed());
        if self.use_color {
            println!("\n{} {}", format!("{} took", what).bright_black(), duration.bright_white());
        } else {
            println!("\n{} took {}", what, duration);
        }
    }
}

/// Format a duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

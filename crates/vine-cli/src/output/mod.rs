//! Terminal output formatting.
//!
//! Change lines go to stdout so they can be piped; status and errors go to
//! stderr next to the log output.

pub mod colors;
pub mod errors;

use vine_follow::ResolvedDocument;

use colors::ColorSupport;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: ColorSupport,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        eprintln!("{}", self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// Print one resolved change
    pub fn change(&self, change: &ResolvedDocument) {
        println!("{}", self.format_change(change));
    }

    pub fn format_change(&self, change: &ResolvedDocument) -> String {
        format!(
            "{} {} units={} assets={}",
            self.colors.dim(&change.position.to_string()),
            self.colors.green(&change.name),
            change.units.len(),
            change.assets.len()
        )
    }

    /// Plain values such as a checkpoint position
    pub fn value(&self, value: &str) {
        println!("{}", value);
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

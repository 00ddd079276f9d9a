//! Error message formatting with actionable suggestions.

use std::error::Error;

use vine_core::error::VineError;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with its suggestion and cause chain
    pub fn format_error(&self, error: &VineError) -> String {
        let mut output = self.headline(&error.to_string());

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        self.push_causes(&mut output, error.source());
        output
    }

    /// Format an error from the command layer.
    ///
    /// Vine errors keep their suggestion; anything else is printed with its
    /// cause chain.
    pub fn format_anyhow(&self, error: &anyhow::Error) -> String {
        if let Some(vine_error) = error.downcast_ref::<VineError>() {
            return self.format_error(vine_error);
        }

        let mut output = self.headline(&error.to_string());
        self.push_causes(&mut output, error.source());
        output
    }

    fn headline(&self, message: &str) -> String {
        format!("{}: {}\n", self.colors.red("error"), message)
    }

    fn push_causes(&self, output: &mut String, mut source: Option<&(dyn Error + 'static)>) {
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            source = err.source();
        }
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

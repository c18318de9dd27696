use crate::cli::ColorChoice;
use std::io::IsTerminal;

/// Apply the color choice to `colored` and report whether ANSI output is on.
///
/// Errors and logs go to stderr, so auto mode follows stderr.
pub fn init(choice: ColorChoice) -> bool {
    let enabled = match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        // NO_COLOR: https://no-color.org/
        ColorChoice::Auto => {
            std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
        }
    };

    colored::control::set_override(enabled);
    enabled
}

//! Terminal colors for `autoform` output.

use std::io::IsTerminal;

use owo_colors::{OwoColorize, Style};

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Apply `style` only when `stream` is a terminal.
fn paint(text: &str, style: Style, stream: Stream) -> String {
    let colored = match stream {
        Stream::Stdout => std::io::stdout().is_terminal(),
        Stream::Stderr => std::io::stderr().is_terminal(),
    };
    if colored {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

/// Header row of the field table.
pub fn header(text: &str) -> String {
    paint(text, Style::new().cyan().bold(), Stream::Stdout)
}

/// Note that a value conforms to its schema.
pub fn valid(text: &str) -> String {
    paint(text, Style::new().green(), Stream::Stderr)
}

pub fn failure(text: &str) -> String {
    paint(text, Style::new().red().bold(), Stream::Stderr)
}

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Highlight,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Highlight => style(text).yellow().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats a number into a right-aligned `Cell`. NaN is displayed as "N/A".
pub fn number_cell(value: f64, format_fn: impl Fn(f64) -> String) -> Cell {
    if value.is_nan() {
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right)
    } else {
        Cell::new(format_fn(value)).set_alignment(CellAlignment::Right)
    }
}

/// Cell for the fund being replaced, rendered bold yellow.
pub fn highlight_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Yellow)
        .add_attribute(Attribute::Bold)
}

pub fn flag_cell(value: bool) -> Cell {
    Cell::new(if value { "yes" } else { "no" }).set_alignment(CellAlignment::Center)
}

/// Creates a spinner shown while a long step runs.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_cell_formats_nan() {
        assert_eq!(number_cell(f64::NAN, |v| format!("{v:.2}")).content(), "N/A");
        assert_eq!(number_cell(1.234, |v| format!("{v:.2}")).content(), "1.23");
    }

    #[test]
    fn test_flag_cell() {
        assert_eq!(flag_cell(true).content(), "yes");
        assert_eq!(flag_cell(false).content(), "no");
    }
}

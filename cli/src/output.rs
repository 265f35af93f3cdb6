//! cli/src/output.rs
//! Output utilities for CLI
//! description: Styled diagnostics, the per-unit summary table, and the
//! progress bar shown while several inputs are lowered.

use comfy_table::{Cell, Color, Table, presets::UTF8_FULL};
use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use astgen_core::error::Level;
use astgen_core::{AstgenErrorExt, ErrorMsg, ModuleOutput};

/// ====================================================================
/// Styles

/// Styles for different output elements
pub struct FormatStyle {
    pub info: Style,
    pub warning: Style,
    pub error: Style,
    pub success: Style,
    pub note: Style,
}

impl Default for FormatStyle {
    fn default() -> Self {
        FormatStyle {
            info: Style::new().cyan(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
            success: Style::new().green().bold(),
            note: Style::new().dim(),
        }
    }
}

impl FormatStyle {
    pub fn for_level(&self, level: Level) -> &Style {
        match level {
            Level::Info => &self.info,
            Level::Warning => &self.warning,
            Level::Error | Level::Critical => &self.error,
        }
    }
}

/// ====================================================================
/// Diagnostics

fn level_label(level: Level) -> &'static str {
    match level {
        Level::Info => "info",
        Level::Warning => "warning",
        Level::Error => "error",
        Level::Critical => "critical",
    }
}

/// `error: main.zig:3:5: message` followed by the notes and call-stack
/// frames, one per indented line.
pub fn render_diagnostic(msg: &ErrorMsg, style: &FormatStyle) -> String {
    let level = msg.level();
    let rendered = msg.render();
    let mut lines = rendered.lines();
    let mut out = match lines.next() {
        Some(first) => format!("{}: {}", style.for_level(level).apply_to(level_label(level)), first),
        None => String::new(),
    };
    for line in lines {
        out.push('\n');
        out.push_str(&style.note.apply_to(line).to_string());
    }
    out
}

/// ====================================================================
/// Summary table

pub fn summary_table(reports: &[(String, &ModuleOutput)]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "File",
        "Unit",
        "Kind",
        "Instructions",
        "Comptime blocks",
        "Warnings",
        "Status",
    ]);

    for (file, module) in reports {
        for unit in &module.units {
            let status = match unit.stream.terminal_diagnostic() {
                Some(_) => Cell::new("poisoned").fg(Color::Red),
                None => Cell::new("ok").fg(Color::Green),
            };
            let warnings = unit.stream.diagnostics().iter().filter(|d| !d.is_fatal()).count();
            table.add_row(vec![
                Cell::new(file),
                Cell::new(&unit.name),
                Cell::new(unit.kind),
                Cell::new(unit.stream.len()),
                Cell::new(unit.stream.children().len()),
                Cell::new(warnings),
                status,
            ]);
        }
    }
    table
}

/// ====================================================================
/// Progress bar

/// Bar over the input files. Hidden for a single input or when stderr is not
/// a terminal.
pub fn file_progress(len: usize) -> ProgressBar {
    if len < 2 || !Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}") {
        bar.set_style(style.progress_chars("█▒░"));
    }
    bar
}

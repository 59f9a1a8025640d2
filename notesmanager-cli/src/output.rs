use clap::ValueEnum;
use notesmanager_core::{Color, ColorRegistry, Label, Note, Notebook, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
}

/// Prints any serializable value as one JSON line, or `pretty` as given.
pub fn print_value<T: Serialize>(value: &T, format: Format, pretty: impl FnOnce() -> String) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(value)?),
        Format::Pretty => println!("{}", pretty()),
    }
    Ok(())
}

pub fn print_notebook(notebook: &Notebook, colors: &ColorRegistry, format: Format) -> Result<()> {
    print_value(notebook, format, || render_tree(notebook, colors))
}

pub fn print_note(note: &Note, colors: &ColorRegistry, format: Format) -> Result<()> {
    print_value(note, format, || {
        let mut out = format!("[{}] {}{}", note.id, note.name, color_suffix(note.color_id, colors));
        if !note.labels.is_empty() {
            out.push_str(&format!("\n  labels: {}", label_list(&note.labels)));
        }
        out.push_str(&format!("\n  tab: {}", note.tab_id));
        if !note.content.is_empty() {
            out.push_str("\n\n");
            out.push_str(&note.content);
        }
        out
    })
}

pub fn print_labels(labels: &[Label], format: Format) -> Result<()> {
    print_value(&labels, format, || {
        labels
            .iter()
            .map(|l| format!("[{}] {}", l.id, l.name))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

pub fn print_colors(colors: &[Color], format: Format) -> Result<()> {
    print_value(&colors, format, || {
        colors
            .iter()
            .map(|c| format!("[{}] {} {}", c.id, c.name, c.hex))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// Indented binder / tab / note outline.
pub fn render_tree(notebook: &Notebook, colors: &ColorRegistry) -> String {
    if notebook.binders.is_empty() {
        return "(no binders)".to_string();
    }
    let mut lines = Vec::new();
    for binder in &notebook.binders {
        lines.push(format!(
            "[{}] {}{}",
            binder.id,
            binder.name,
            color_suffix(binder.color_id, colors)
        ));
        for tab in &binder.tabs {
            lines.push(format!(
                "  [{}] {}{}",
                tab.id,
                tab.name,
                color_suffix(tab.color_id, colors)
            ));
            for note in &tab.notes {
                let mut line = format!(
                    "    [{}] {}{}",
                    note.id,
                    note.name,
                    color_suffix(note.color_id, colors)
                );
                if !note.labels.is_empty() {
                    line.push_str(&format!(" {{{}}}", label_list(&note.labels)));
                }
                lines.push(line);
            }
        }
    }
    lines.join("\n")
}

fn color_suffix(color_id: Option<i64>, colors: &ColorRegistry) -> String {
    color_id
        .and_then(|id| colors.get(id))
        .map(|c| format!(" ({})", c.name))
        .unwrap_or_default()
}

fn label_list(labels: &[Label]) -> String {
    labels
        .iter()
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

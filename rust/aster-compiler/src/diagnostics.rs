//! Rendering of front-end errors against the source text.

/// Render a message anchored at a 1-based line (and optional column) with
/// the offending source line and a caret marker.
pub fn render(source: &str, message: &str, line: usize, col: Option<usize>) -> String {
    let mut out = String::new();
    out.push_str("error: ");
    out.push_str(message);
    out.push('\n');

    if line == 0 {
        return out;
    }
    let Some(text) = source.lines().nth(line - 1) else {
        return out;
    };

    let gutter = line.to_string();
    out.push_str(&format!("{} | {}\n", gutter, text));
    if let Some(col) = col {
        let pad = " ".repeat(gutter.len());
        // Columns are 1-based; keep the caret inside the rendered line.
        let offset = col.saturating_sub(1).min(text.chars().count());
        out.push_str(&format!("{} | {}^\n", pad, " ".repeat(offset)));
    }
    out
}

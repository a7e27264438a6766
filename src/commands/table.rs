//! Bordered plain-text tables for the one-shot commands.

use crate::ui::pad;

pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    for line in render_table(headers, rows) {
        println!("{line}");
    }
}

pub(crate) fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let border = border_line(&widths);
    let mut lines = vec![border.clone(), row_line(headers, &widths), border.clone()];
    for row in rows {
        let cells = row.iter().map(String::as_str).collect::<Vec<_>>();
        lines.push(row_line(&cells, &widths));
    }
    lines.push(border);
    lines
}

fn border_line(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&format!("-{}-+", "-".repeat(*width)));
    }
    line
}

fn row_line(cells: &[&str], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (idx, width) in widths.iter().enumerate() {
        let cell = cells.get(idx).copied().unwrap_or("");
        line.push_str(&format!(" {} |", pad(cell, *width)));
    }
    line
}

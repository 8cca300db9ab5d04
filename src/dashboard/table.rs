//! Plain-text table rendering with full-width and narrow fallback modes.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Minimum column width before switching to narrow mode.
const MIN_COLUMN_WIDTH: usize = 8;

#[derive(Debug, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Render to lines, choosing full or narrow mode based on width.
    #[must_use]
    pub fn render(&self, available_width: usize) -> Vec<String> {
        let num_cols = self.num_columns();
        if num_cols == 0 {
            return vec![];
        }

        // │ cell │ cell │ = (num_cols + 1) borders + 2*num_cols padding
        let min_full_width = num_cols * MIN_COLUMN_WIDTH + (num_cols + 1) + (num_cols * 2);
        if available_width >= min_full_width {
            self.render_full(available_width)
        } else {
            self.render_narrow(available_width)
        }
    }

    fn num_columns(&self) -> usize {
        self.headers
            .len()
            .max(self.rows.iter().map(Vec::len).max().unwrap_or(0))
    }

    fn render_full(&self, available_width: usize) -> Vec<String> {
        let col_widths = self.calculate_column_widths(available_width);
        let mut lines = vec![render_border(&col_widths, ("┌", "┬", "┐"))];

        if !self.headers.is_empty() {
            lines.push(render_row(&self.headers, &col_widths));
            lines.push(render_border(&col_widths, ("├", "┼", "┤")));
        }
        for row in &self.rows {
            lines.push(render_row(row, &col_widths));
        }

        lines.push(render_border(&col_widths, ("└", "┴", "┘")));
        lines
    }

    fn calculate_column_widths(&self, available_width: usize) -> Vec<usize> {
        let num_cols = self.num_columns();
        let mut natural: Vec<usize> = vec![0; num_cols];
        for row in std::iter::once(&self.headers).chain(&self.rows) {
            for (i, cell) in row.iter().enumerate() {
                natural[i] = natural[i].max(cell.width());
            }
        }

        let overhead = (num_cols + 1) + (num_cols * 2);
        let content_width = available_width.saturating_sub(overhead);
        if natural.iter().sum::<usize>() <= content_width {
            natural
        } else {
            distribute_widths(&natural, content_width, MIN_COLUMN_WIDTH)
        }
    }

    /// Narrow fallback: "Header: Value" lines with separators.
    fn render_narrow(&self, available_width: usize) -> Vec<String> {
        let separator = "─".repeat(available_width.clamp(10, 40));
        let mut lines = Vec::new();

        for (row_idx, row) in self.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                let header = self.headers.get(col_idx).map_or("?", String::as_str);
                let value_width = available_width.saturating_sub(header.width() + 2).max(10);
                lines.push(format!("{header}: {}", truncate(cell, value_width)));
            }
            if row_idx + 1 < self.rows.len() {
                lines.push(separator.clone());
            }
        }

        lines
    }
}

fn render_row(cells: &[String], col_widths: &[usize]) -> String {
    let mut line = String::from("│");
    for (i, &width) in col_widths.iter().enumerate() {
        let cell = cells.get(i).map_or("", String::as_str);
        let cell = truncate(cell, width);
        let pad = width.saturating_sub(cell.width());
        line.push(' ');
        line.push_str(&cell);
        line.push_str(&" ".repeat(pad));
        line.push_str(" │");
    }
    line
}

fn render_border(col_widths: &[usize], (left, mid, right): (&str, &str, &str)) -> String {
    let inner: Vec<String> = col_widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}", inner.join(mid))
}

/// Shrink columns proportionally, never below `min_width` unless the column is narrower.
///
/// Width added by the floor is taken back from the widest columns, so the
/// result fits in `total` whenever the floors do.
fn distribute_widths(natural: &[usize], total: usize, min_width: usize) -> Vec<usize> {
    let total_natural: usize = natural.iter().sum();
    if total_natural == 0 {
        return natural.to_vec();
    }
    let floors: Vec<usize> = natural.iter().map(|&w| min_width.min(w)).collect();
    let mut widths: Vec<usize> = natural
        .iter()
        .zip(&floors)
        .map(|(&w, &floor)| (w * total / total_natural).max(floor))
        .collect();

    let mut excess = widths.iter().sum::<usize>().saturating_sub(total);
    while excess > 0 {
        let Some(widest) = (0..widths.len())
            .filter(|&i| widths[i] > floors[i])
            .max_by_key(|&i| widths[i])
        else {
            break;
        };
        let give = (widths[widest] - floors[widest]).min(excess);
        widths[widest] -= give;
        excess -= give;
    }
    widths
}

/// Cut a single-line cell to `max` display columns, marking the cut with `…`.
fn truncate(text: &str, max: usize) -> String {
    let text = text.replace(['\n', '\r', '\t'], " ");
    if text.width() <= max {
        return text;
    }
    if max == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

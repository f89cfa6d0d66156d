//! Text and HTML renderers for query results
//!
//! These are used by the command-line front end; they only ever read typed
//! records and never touch the database or the network.

use crate::metadata::MetadataRecord;
use crate::ranking::RankingRecord;
use crate::store::{Table, TopRanking};
use std::fmt::Write;

const LABEL_WIDTH: usize = 20;
const VALUE_WIDTH: usize = 50;

/// Renders labelled values as a boxed two-column table
///
/// Both cells are centered; values too long for their column are cut and
/// end in `...`.
///
/// ```text
/// +--------------------+--------------------------------------------------+
/// |       Title        |                      Joker                       |
/// +--------------------+--------------------------------------------------+
/// ```
pub fn format_record_table(pairs: &[(&str, &str)]) -> String {
    let border = format!("+{}+{}+", "-".repeat(LABEL_WIDTH), "-".repeat(VALUE_WIDTH));

    let mut out = border.clone();
    for (label, value) in pairs {
        out.push_str("\n|");
        out.push_str(&centered_cell(label, LABEL_WIDTH));
        out.push('|');
        out.push_str(&centered_cell(value, VALUE_WIDTH));
        out.push('|');
    }
    out.push('\n');
    out.push_str(&border);
    out
}

fn centered_cell(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        format!("{:^width$}", text, width = width)
    } else {
        let cut: String = text.chars().take(width - 3).collect();
        format!("{}...", cut)
    }
}

/// Formats a dollar amount with thousands separators, e.g. `$1,234,567`
pub fn format_dollars(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Renders the top titles as a horizontal text bar chart
///
/// The longest bar is `width` characters; the others scale relative to it.
pub fn format_bar_chart(rows: &[TopRanking], width: usize) -> String {
    let labels: Vec<String> = rows
        .iter()
        .map(|row| format!("{} ({})", row.title, row.year))
        .collect();
    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let max_gross = rows.iter().map(|r| r.cumulative_gross).max().unwrap_or(0);

    let mut out = String::new();
    for (row, label) in rows.iter().zip(&labels) {
        let bar_len = if max_gross == 0 {
            0
        } else {
            (row.cumulative_gross as u128 * width as u128 / max_gross as u128) as usize
        };
        let _ = writeln!(
            out,
            "{:<label_width$} | {} {}",
            label,
            "#".repeat(bar_len),
            format_dollars(row.cumulative_gross),
            label_width = label_width
        );
    }
    out
}

/// Renders ranking rows one per line
pub fn format_rankings(records: &[RankingRecord]) -> String {
    let mut out = String::new();
    for r in records {
        let _ = writeln!(
            out,
            "{} {} | {} | {} | avg {} | {}",
            r.year,
            r.quarter,
            r.title,
            format_dollars(r.cumulative_gross),
            format_dollars(r.per_release_average_gross),
            r.detail_link
        );
    }
    out
}

/// Renders metadata rows one per line
pub fn format_metadata(records: &[&MetadataRecord]) -> String {
    let mut out = String::new();
    for r in records {
        let _ = writeln!(
            out,
            "{} | {} | {} | {} | {}",
            r.title, r.released, r.runtime, r.genre, r.director
        );
    }
    out
}

/// Renders metadata rows as an HTML table with a leading row index
pub fn render_html_table(records: &[&MetadataRecord]) -> String {
    let mut out = String::from("<table border=\"1\" class=\"dataframe\">\n  <thead>\n    <tr>\n      <th></th>\n");
    for (column, _) in MetadataRecord::COLUMNS {
        let _ = writeln!(out, "      <th>{}</th>", column);
    }
    out.push_str("    </tr>\n  </thead>\n  <tbody>\n");

    for (index, record) in records.iter().enumerate() {
        out.push_str("    <tr>\n");
        let _ = writeln!(out, "      <th>{}</th>", index);
        for (_, value) in record.display_pairs() {
            let _ = writeln!(out, "      <td>{}</td>", html_escape::encode_safe(value));
        }
        out.push_str("    </tr>\n");
    }

    out.push_str("  </tbody>\n</table>\n");
    out
}

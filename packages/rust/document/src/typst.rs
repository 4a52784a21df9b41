//! Block sequence to Typst markup.

use std::fmt::Write as _;

use chrono::{Datelike, NaiveDate};

use crisisdesk_markdown::{Block, RenderedDocument, RichText, Span, Table};
use crisisdesk_shared::Result;

use crate::{DocumentBackend, PageLayout};

/// Vertical gap emitted for a blank line.
const SPACER: &str = "#v(0.6em)";

/// Emits Typst source. Useful on its own for inspection, and the first
/// stage of [`crate::TypstPdfBackend`].
#[derive(Debug, Clone)]
pub struct TypstSourceBackend {
    date: Option<NaiveDate>,
}

impl Default for TypstSourceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TypstSourceBackend {
    /// Stamp documents with today's local date.
    pub fn new() -> Self {
        Self {
            date: Some(chrono::Local::now().date_naive()),
        }
    }

    /// Stamp documents with a fixed date, or none.
    pub fn with_date(date: Option<NaiveDate>) -> Self {
        Self { date }
    }

    /// Produce the complete Typst document.
    pub fn transpile(&self, doc: &RenderedDocument, layout: &PageLayout) -> String {
        let mut out = String::new();
        write_preamble(&mut out, doc.title.as_deref(), self.date, layout);

        let mut prev_was_list = false;
        for (i, block) in doc.blocks.iter().enumerate() {
            let is_list = matches!(
                block,
                Block::OrderedListItem { .. } | Block::UnorderedListItem { .. }
            );
            // Adjacent list items must stay on consecutive lines to form one list.
            if i > 0 && !(is_list && prev_was_list) {
                out.push('\n');
            }
            write_block(&mut out, block, layout);
            prev_was_list = is_list;
        }

        out
    }
}

impl DocumentBackend for TypstSourceBackend {
    fn name(&self) -> &'static str {
        "typst"
    }

    fn file_extension(&self) -> &'static str {
        "typ"
    }

    fn assemble(&self, doc: &RenderedDocument, layout: &PageLayout) -> Result<Vec<u8>> {
        Ok(self.transpile(doc, layout).into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

fn write_preamble(
    out: &mut String,
    title: Option<&str>,
    date: Option<NaiveDate>,
    layout: &PageLayout,
) {
    if let Some(title) = title {
        let _ = writeln!(out, "#set document(title: \"{}\")", escape_string(title));
    }
    match date {
        Some(d) => {
            let _ = writeln!(
                out,
                "#set document(date: datetime(year: {}, month: {}, day: {}))",
                d.year(),
                d.month(),
                d.day()
            );
        }
        None => out.push_str("#set document(date: none)\n"),
    }
    let _ = writeln!(
        out,
        "#set page(paper: \"{}\", margin: {}mm)",
        escape_string(&layout.paper),
        layout.margin_mm
    );
    let _ = writeln!(out, "#set text(size: {}pt)", layout.font_size_pt);
    out.push('\n');
}

fn write_block(out: &mut String, block: &Block, layout: &PageLayout) {
    match block {
        Block::Heading { level, text } => {
            let _ = writeln!(out, "{} {}", "=".repeat(*level as usize), inline(text));
        }
        Block::OrderedListItem { index, text } => {
            let _ = writeln!(out, "{index}. {}", inline(text));
        }
        Block::UnorderedListItem { text } => {
            let _ = writeln!(out, "- {}", inline(text));
        }
        Block::Table(table) => write_table(out, table, layout),
        Block::Paragraph(text) => {
            let _ = writeln!(out, "{}", inline(text));
        }
        Block::Spacer => {
            let _ = writeln!(out, "{SPACER}");
        }
    }
}

/// Header row: fill, bold, light text. All cells centered, thin uniform
/// border, same horizontal padding everywhere.
fn write_table(out: &mut String, table: &Table, layout: &PageLayout) {
    let columns = table.column_count();
    let style = &layout.table;

    let _ = writeln!(out, "#table(");
    let _ = writeln!(out, "  columns: {columns},");
    let _ = writeln!(out, "  align: center + horizon,");
    let _ = writeln!(
        out,
        "  stroke: {}pt + rgb(\"{}\"),",
        style.border_width_pt, style.border_color
    );
    let _ = writeln!(out, "  inset: (x: {}pt, y: 4pt),", style.cell_padding_pt);
    let _ = writeln!(
        out,
        "  fill: (_, y) => if y == 0 {{ rgb(\"{}\") }},",
        style.header_fill
    );

    if let Some(header) = table.header() {
        let cells: Vec<String> = padded(header, columns)
            .map(|cell| {
                format!(
                    "text(fill: rgb(\"{}\"), weight: \"bold\")[{}]",
                    style.header_text,
                    escape_markup(cell)
                )
            })
            .collect();
        let _ = writeln!(out, "  table.header({}),", cells.join(", "));
    }

    for row in table.body() {
        let cells: Vec<String> = padded(row, columns)
            .map(|cell| format!("[{}]", escape_markup(cell)))
            .collect();
        let _ = writeln!(out, "  {},", cells.join(", "));
    }

    out.push_str(")\n");
}

/// Row cells followed by empty cells up to `columns`.
fn padded(row: &[String], columns: usize) -> impl Iterator<Item = &str> {
    row.iter()
        .map(String::as_str)
        .chain(std::iter::repeat_n("", columns.saturating_sub(row.len())))
}

fn inline(text: &RichText) -> String {
    let mut out = String::new();
    let mut after_code = false;
    for span in &text.spans {
        match span {
            Span::Text(s) => {
                let mut escaped = escape_markup(s);
                // `#strong[..]` would otherwise continue into `.field` or `(args)`.
                if after_code && (escaped.starts_with('.') || escaped.starts_with('(')) {
                    escaped.insert(0, '\\');
                }
                out.push_str(&escaped);
                after_code = false;
            }
            Span::Strong(s) => {
                let _ = write!(out, "#strong[{}]", escape_markup(s));
                after_code = true;
            }
        }
    }
    escape_enum_marker(&mut out);
    out
}

/// A line opening with `<digits>.` would start a numbered list; escape the dot.
fn escape_enum_marker(line: &mut String) {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && line.as_bytes().get(digits) == Some(&b'.') {
        line.insert(digits, '\\');
    }
}

/// Backslash-escape every character with markup meaning.
fn escape_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '\\' | '#' | '*' | '_' | '$' | '[' | ']' | '<' | '>' | '@' | '`' | '~' | '=' | '-'
                | '+' | '/' | '"'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape for a Typst string literal.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

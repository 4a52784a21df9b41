//! Model-reply Markdown to structured document blocks.
//!
//! Language-model replies use a light Markdown dialect: `#` headings,
//! `N. ` and `- ` list items, pipe tables, paragraphs and blank lines.
//! [`render`] classifies every line in a single forward pass and emits an
//! ordered [`Block`] sequence that a document backend can paginate.
//!
//! Nothing here fails: any line that matches no rule becomes a paragraph.

mod inline;
mod table;

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

pub use inline::{RichText, Span, parse_inline};
pub use table::Table;

use table::{TableState, is_separator_row, parse_table_row};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One structured unit of rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `#`..`######` heading; `level` is 1–6.
    Heading { level: u8, text: RichText },
    /// `N. text`; `index` is taken verbatim from the source line.
    OrderedListItem { index: u64, text: RichText },
    /// `- text`.
    UnorderedListItem { text: RichText },
    /// A run of consecutive pipe-table rows.
    Table(Table),
    /// Any other non-blank line.
    Paragraph(RichText),
    /// A blank line (vertical gap).
    Spacer,
}

/// Blocks plus a title for document metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Plain text of the first heading, if any.
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

/// Per-kind block counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub headings: usize,
    pub ordered_items: usize,
    pub unordered_items: usize,
    pub tables: usize,
    pub table_rows: usize,
    pub paragraphs: usize,
    pub spacers: usize,
}

impl RenderStats {
    /// Count the blocks in `blocks`.
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut stats = Self::default();
        for block in blocks {
            match block {
                Block::Heading { .. } => stats.headings += 1,
                Block::OrderedListItem { .. } => stats.ordered_items += 1,
                Block::UnorderedListItem { .. } => stats.unordered_items += 1,
                Block::Table(table) => {
                    stats.tables += 1;
                    stats.table_rows += table.rows.len();
                }
                Block::Paragraph(_) => stats.paragraphs += 1,
                Block::Spacer => stats.spacers += 1,
            }
        }
        stats
    }

    /// Number of blocks that carry content (everything but spacers).
    pub fn content_blocks(&self) -> usize {
        self.headings + self.ordered_items + self.unordered_items + self.tables + self.paragraphs
    }
}

// ---------------------------------------------------------------------------
// Line patterns (compiled once)
// ---------------------------------------------------------------------------

/// `#`..`######` followed by a space.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6}) (.*)$").expect("heading regex"));

/// `<digits>. ` prefix.
static ORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\. (.*)$").expect("ordered item regex"));

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Render a model reply into an ordered block sequence.
///
/// Per line, in priority order:
/// 1. table separator rows are dropped
/// 2. table rows are buffered
/// 3. any other line first flushes a buffered table
/// 4. headings, 5. ordered items, 6. unordered items,
/// 7. blank lines as spacers, 8. everything else as a paragraph.
///
/// A table still open at end of input becomes the final block.
pub fn render(reply: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut table = TableState::default();

    for raw in reply.lines() {
        let line = raw.trim();

        if is_separator_row(line) {
            continue;
        }

        if let Some(cells) = parse_table_row(line) {
            table.push_row(cells);
            continue;
        }

        if let Some(done) = table.flush() {
            blocks.push(Block::Table(done));
        }

        blocks.push(classify_line(line));
    }

    if let Some(done) = table.flush() {
        blocks.push(Block::Table(done));
    }

    blocks
}

/// Render a reply and derive document metadata.
#[instrument(skip_all, fields(reply_len = reply.len()))]
pub fn render_document(reply: &str) -> RenderedDocument {
    let blocks = render(reply);

    let title = blocks.iter().find_map(|block| match block {
        Block::Heading { text, .. } => Some(text.to_plain_string()),
        _ => None,
    });

    let stats = RenderStats::from_blocks(&blocks);
    debug!(
        headings = stats.headings,
        ordered = stats.ordered_items,
        unordered = stats.unordered_items,
        tables = stats.tables,
        table_rows = stats.table_rows,
        paragraphs = stats.paragraphs,
        spacers = stats.spacers,
        "reply rendered"
    );

    RenderedDocument { title, blocks }
}

/// Classify a trimmed, non-table line (rules 4–8).
fn classify_line(line: &str) -> Block {
    if let Some(caps) = HEADING_RE.captures(line) {
        // The regex caps the run at six, so this always fits.
        let level = caps[1].len() as u8;
        return Block::Heading {
            level,
            text: parse_inline(caps[2].trim_start()),
        };
    }

    if let Some(caps) = ORDERED_RE.captures(line) {
        // An index too large for u64 falls through to a paragraph.
        if let Ok(index) = caps[1].parse::<u64>() {
            return Block::OrderedListItem {
                index,
                text: parse_inline(&caps[2]),
            };
        }
    }

    if let Some(rest) = line.strip_prefix("- ") {
        return Block::UnorderedListItem {
            text: parse_inline(rest),
        };
    }

    if line.is_empty() {
        return Block::Spacer;
    }

    Block::Paragraph(parse_inline(line))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

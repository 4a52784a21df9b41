//! Pipe-table detection and the row accumulator.
//!
//! Model replies rarely close a table with a blank line, so rows are
//! detected per line and buffered until the first non-table line (or end of
//! input) flushes them.

/// A materialized table. The first row is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from row cell-lists.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// The header row, if the table has any rows.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Every row after the header.
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Table accumulator with exactly one flush transition.
#[derive(Debug, Default)]
pub(crate) enum TableState {
    #[default]
    NoTableOpen,
    TableOpen(Vec<Vec<String>>),
}

impl TableState {
    /// Append a row, opening a table if none is open.
    pub(crate) fn push_row(&mut self, cells: Vec<String>) {
        match self {
            Self::NoTableOpen => *self = Self::TableOpen(vec![cells]),
            Self::TableOpen(rows) => rows.push(cells),
        }
    }

    /// Close the open table, if any, returning to `NoTableOpen`.
    pub(crate) fn flush(&mut self) -> Option<Table> {
        match std::mem::take(self) {
            Self::NoTableOpen => None,
            Self::TableOpen(rows) => Some(Table::new(rows)),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        matches!(self, Self::TableOpen(_))
    }
}

/// A separator row such as `|---|:---:|` or `|   |`: a non-blank line of
/// pipes, hyphens, colons and whitespace only.
pub(crate) fn is_separator_row(line: &str) -> bool {
    !line.trim().is_empty()
        && line
            .chars()
            .all(|c| c == '|' || c == '-' || c == ':' || c.is_whitespace())
}

/// Split a `| a | b |` row into trimmed cells. Returns `None` when the line
/// is not a table row (must start with `|` and contain another `|`).
pub(crate) fn parse_table_row(line: &str) -> Option<Vec<String>> {
    if !line.starts_with('|') || line.matches('|').count() < 2 {
        return None;
    }

    let mut cells: Vec<String> = line.split('|').map(|c| c.trim().to_string()).collect();

    // Outer pipes leave one empty cell at each end.
    if cells.first().is_some_and(String::is_empty) {
        cells.remove(0);
    }
    if cells.len() > 1 && cells.last().is_some_and(String::is_empty) {
        cells.pop();
    }

    Some(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn state_machine_flushes_once() {
        let mut state = TableState::default();
        assert!(!state.is_open());
        assert!(state.flush().is_none());

        state.push_row(row(&["A", "B"]));
        state.push_row(row(&["1", "2"]));
        assert!(state.is_open());

        let table = state.flush().expect("open table flushes");
        assert_eq!(table.rows, vec![row(&["A", "B"]), row(&["1", "2"])]);
        assert!(!state.is_open());
        assert!(state.flush().is_none());
    }

    #[test]
    fn separator_rows() {
        assert!(is_separator_row("|---|---|"));
        assert!(is_separator_row("| --- | :---: |"));
        assert!(is_separator_row("---"));
        assert!(!is_separator_row(""));
        assert!(!is_separator_row("   "));
        assert!(is_separator_row("||"));
        assert!(is_separator_row("|   |   |"));
        assert!(is_separator_row("|"));
        assert!(!is_separator_row("| - a |"));
        assert!(!is_separator_row("| 1 | 2 |"));
    }

    #[test]
    fn row_cells_are_trimmed_and_outer_pipes_dropped() {
        assert_eq!(parse_table_row("| A | B |"), Some(row(&["A", "B"])));
        assert_eq!(parse_table_row("|A|B"), Some(row(&["A", "B"])));
        assert_eq!(parse_table_row("| A |  | C |"), Some(row(&["A", "", "C"])));
    }

    #[test]
    fn non_rows() {
        assert_eq!(parse_table_row("A | B |"), None);
        assert_eq!(parse_table_row("| lonely"), None);
        assert_eq!(parse_table_row("plain"), None);
    }

    #[test]
    fn header_and_body() {
        let table = Table::new(vec![row(&["A", "B"]), row(&["1", "2", "3"])]);
        assert_eq!(table.header(), Some(&row(&["A", "B"])[..]));
        assert_eq!(table.body().len(), 1);
        assert_eq!(table.column_count(), 3);
        assert!(Table::default().body().is_empty());
    }
}

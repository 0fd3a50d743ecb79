//! Documents and record fragments
//!
//! A [`Document`] is one fetched page or one decoded PDF. Locators cut it into
//! [`Fragment`]s, one per record.

use std::rc::Rc;

use scraper::{ElementRef, Html};

/// One decoded table: rows of cells, `None` for an empty PDF cell.
pub type Table = Vec<Vec<Option<String>>>;

/// Carry-over metadata in effect for a row, in policy key order.
pub type CarryOver = Vec<(String, Option<String>)>;

#[derive(Debug)]
pub enum Document {
    Html { source: String, html: Html },
    Tables { source: String, tables: Vec<Table> },
}

impl Document {
    pub fn html(source: impl Into<String>, html: &str) -> Self {
        Document::Html {
            source: source.into(),
            html: Html::parse_document(html),
        }
    }

    pub fn tables(source: impl Into<String>, tables: Vec<Table>) -> Self {
        Document::Tables {
            source: source.into(),
            tables,
        }
    }

    /// Where the document came from (URL or file path).
    pub fn source(&self) -> &str {
        match self {
            Document::Html { source, .. } | Document::Tables { source, .. } => source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Document::Html { .. } => "html",
            Document::Tables { .. } => "tables",
        }
    }
}

/// A data row together with the header and carry-over state it was read under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub header: Rc<Vec<String>>,
    /// Trimmed cells, empty string for a missing cell
    pub cells: Vec<String>,
    pub carry: Rc<CarryOver>,
}

impl TableRow {
    /// Cell under the header column named `name` (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        let index = self
            .header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))?;
        self.cell(index)
    }

    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }

    pub fn carried(&self, key: &str) -> Option<&str> {
        self.carry
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }
}

/// The raw material of one record.
#[derive(Debug, Clone)]
pub enum Fragment<'a> {
    Html(ElementRef<'a>),
    Row(TableRow),
}

impl Fragment<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Fragment::Html(_) => "html",
            Fragment::Row(_) => "table row",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(header: &[&str], cells: &[&str]) -> TableRow {
        TableRow {
            header: Rc::new(header.iter().map(|s| s.to_string()).collect()),
            cells: cells.iter().map(|s| s.to_string()).collect(),
            carry: Rc::new(vec![
                ("Province".to_string(), Some("Laguna".to_string())),
                ("Contact Details".to_string(), None),
            ]),
        }
    }

    #[test]
    fn test_column_lookup() {
        let r = row(&["Title_ID", "Minimum Price", "Status"], &["T-1", "1,000,000"]);
        assert_eq!(r.column("title_id"), Some("T-1"));
        assert_eq!(r.column("Minimum Price"), Some("1,000,000"));
        // shorter than the header
        assert_eq!(r.column("Status"), None);
        assert_eq!(r.column("Area"), None);
    }

    #[test]
    fn test_carried_values() {
        let r = row(&["Title_ID"], &["T-1"]);
        assert_eq!(r.carried("Province"), Some("Laguna"));
        assert_eq!(r.carried("Contact Details"), None);
        assert_eq!(r.carried("City"), None);
    }

    #[test]
    fn test_document_source() {
        let doc = Document::html("https://example.com/list", "<p>hi</p>");
        assert_eq!(doc.source(), "https://example.com/list");
        assert_eq!(doc.kind(), "html");
        let doc = Document::tables("pnb.json", vec![]);
        assert_eq!(doc.kind(), "tables");
    }
}

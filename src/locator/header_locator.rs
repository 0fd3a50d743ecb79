//! Header detection for decoded PDF tables
//!
//! Each table is scanned top to bottom. Rows become fragments only once a
//! header row has been seen, and they are keyed by that header. Optional
//! carry-over rows (e.g. `Laguna|Calamba|Juan|0917...`) set metadata that is
//! attached to every following data row of the same document.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{default_min_cells, RecordLocator};
use crate::error::SchemaError;
use crate::fragment::{CarryOver, Document, Fragment, TableRow};

/// Keyword rules that tell header and disclaimer rows apart from data.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    keywords: Vec<String>,
    disclaimers: Vec<String>,
    threshold_percent: usize,
    min_cells: usize,
}

impl HeaderPolicy {
    pub fn new(keywords: Vec<String>, threshold_percent: usize) -> Result<Self, SchemaError> {
        if keywords.is_empty() {
            return Err(SchemaError::Locator("header keywords must not be empty".into()));
        }
        if threshold_percent == 0 || threshold_percent > 100 {
            return Err(SchemaError::Locator(format!(
                "threshold_percent must be within 1..=100, got {threshold_percent}"
            )));
        }
        Ok(Self {
            keywords: keywords.iter().map(|k| k.to_uppercase()).collect(),
            disclaimers: Vec::new(),
            threshold_percent,
            min_cells: default_min_cells(),
        })
    }

    pub fn disclaimers(mut self, keywords: Vec<String>) -> Self {
        self.disclaimers = keywords.iter().map(|k| k.to_lowercase()).collect();
        self
    }

    pub fn min_cells(mut self, min_cells: usize) -> Self {
        self.min_cells = min_cells;
        self
    }

    pub fn is_disclaimer(&self, cells: &[String]) -> bool {
        let text = cells.join(" ").to_lowercase();
        self.disclaimers.iter().any(|k| text.contains(k.as_str()))
    }

    pub fn is_header(&self, cells: &[String]) -> bool {
        if self.is_disclaimer(cells) {
            return false;
        }
        let text = cells.join(" ").to_uppercase();
        let matched = self
            .keywords
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .count();
        // Integer comparison: exactly at the threshold counts
        matched * 100 >= self.threshold_percent * self.keywords.len()
    }
}

/// Splits single-cell metadata rows into named carry-over values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryOverPolicy {
    pub keys: Vec<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_separator() -> String {
    "|".to_string()
}

impl CarryOverPolicy {
    pub fn new(keys: &[&str]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            separator: default_separator(),
        }
    }

    /// The new carry-over state if `cells` is a metadata row: exactly one
    /// non-empty cell, split on the separator when it has one.
    pub fn parse(&self, cells: &[String]) -> Option<CarryOver> {
        let mut non_empty = cells.iter().filter(|c| !c.is_empty());
        let only = non_empty.next()?;
        if non_empty.next().is_some() {
            return None;
        }

        let mut parts = only.split(self.separator.as_str()).map(str::trim);
        let state = self
            .keys
            .iter()
            .map(|key| {
                let value = parts.next().filter(|p| !p.is_empty()).map(String::from);
                (key.clone(), value)
            })
            .collect();
        Some(state)
    }
}

#[derive(Debug, Clone)]
pub struct HeaderLocator {
    policy: HeaderPolicy,
    carry_over: Option<CarryOverPolicy>,
}

impl HeaderLocator {
    pub fn new(policy: HeaderPolicy) -> Self {
        Self {
            policy,
            carry_over: None,
        }
    }

    pub fn carry_over(mut self, policy: CarryOverPolicy) -> Result<Self, SchemaError> {
        if policy.keys.is_empty() || policy.separator.is_empty() {
            return Err(SchemaError::Locator(
                "carry-over needs at least one key and a separator".into(),
            ));
        }
        self.carry_over = Some(policy);
        Ok(self)
    }
}

impl RecordLocator for HeaderLocator {
    fn locate<'a>(&self, document: &'a Document) -> Vec<Fragment<'a>> {
        let Document::Tables { source, tables } = document else {
            debug!(source = %document.source(), "header locator skips non-table document");
            return Vec::new();
        };

        // Scoped to this document, shared by all of its tables
        let mut carry: Rc<CarryOver> = Rc::new(Vec::new());
        let mut fragments = Vec::new();

        for (table_index, table) in tables.iter().enumerate() {
            let mut header: Option<Rc<Vec<String>>> = None;

            for raw in table {
                let cells: Vec<String> = raw
                    .iter()
                    .map(|c| c.as_deref().unwrap_or_default().trim().to_string())
                    .collect();

                if self.policy.is_disclaimer(&cells) {
                    if header.take().is_some() {
                        debug!(table = table_index, "disclaimer row ends section");
                    }
                    continue;
                }

                if self.policy.is_header(&cells) {
                    if header.as_deref() != Some(&cells) {
                        debug!(table = table_index, header = ?cells, "header row");
                    }
                    header = Some(Rc::new(cells));
                    continue;
                }

                let Some(active) = &header else {
                    continue;
                };

                if let Some(policy) = &self.carry_over {
                    if let Some(state) = policy.parse(&cells) {
                        debug!(table = table_index, carry = ?state, "carry-over row");
                        carry = Rc::new(state);
                        continue;
                    }
                }

                let filled = cells.iter().filter(|c| !c.is_empty()).count();
                if filled < self.policy.min_cells || cells == **active {
                    continue;
                }

                fragments.push(Fragment::Row(TableRow {
                    header: Rc::clone(active),
                    cells,
                    carry: Rc::clone(&carry),
                }));
            }
        }

        if fragments.is_empty() {
            info!(source = %source, tables = tables.len(), "no data rows found");
        } else {
            debug!(source = %source, rows = fragments.len(), "located table rows");
        }

        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Table;

    fn table(rows: &[&[&str]]) -> Table {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
                    .collect()
            })
            .collect()
    }

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn rows<'a>(fragments: &'a [Fragment<'_>]) -> Vec<&'a TableRow> {
        fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Row(row) => Some(row),
                Fragment::Html(_) => None,
            })
            .collect()
    }

    fn pnb_locator() -> HeaderLocator {
        let policy = HeaderPolicy::new(vec!["Title_ID".to_string()], 30).unwrap();
        HeaderLocator::new(policy)
            .carry_over(CarryOverPolicy::new(&[
                "Province",
                "City/Municipality",
                "Contact Person",
                "Contact Details",
            ]))
            .unwrap()
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let keywords: Vec<String> = (0..100).map(|i| format!("KW{i:03}")).collect();
        let policy = HeaderPolicy::new(keywords.clone(), 30).unwrap();

        let thirty: Vec<String> = keywords[..30].to_vec();
        let twenty_nine: Vec<String> = keywords[..29].to_vec();
        assert!(policy.is_header(&thirty));
        assert!(!policy.is_header(&twenty_nine));
    }

    #[test]
    fn test_metrobank_style_threshold() {
        let keywords = ["PROPERTY", "LOCATION", "PRICE", "AREA", "DESCRIPTION", "TYPE", "CLASSIFICATION"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        let policy = HeaderPolicy::new(keywords, 30)
            .unwrap()
            .disclaimers(vec!["disclaimer".to_string(), "as-is".to_string()]);

        assert!(policy.is_header(&strings(&["Property Type", "Location", "Lot Area"])));
        assert!(!policy.is_header(&strings(&["Property Type", "Remarks"])));
        assert!(!policy.is_header(&strings(&[
            "DISCLAIMER: property type, location and price are sold as-is"
        ])));
    }

    #[test]
    fn test_carry_over_applies_to_following_rows() {
        let doc = Document::tables(
            "pnb.json",
            vec![table(&[
                &["Title_ID", "Location/Description", "Minimum Price"],
                &["Laguna|Calamba|Juan|09171234567", "", ""],
                &["T-100", "Lot 1 Blk 2", "1,000,000"],
                &["T-101", "Lot 3 Blk 4", "2,000,000"],
            ])],
        );
        let fragments = pnb_locator().locate(&doc);
        let rows = rows(&fragments);

        assert_eq!(rows.len(), 2);
        for row in rows {
            assert_eq!(row.carried("Province"), Some("Laguna"));
            assert_eq!(row.carried("City/Municipality"), Some("Calamba"));
            assert_eq!(row.carried("Contact Details"), Some("09171234567"));
        }
    }

    #[test]
    fn test_carry_over_replaced_and_cleared() {
        let doc = Document::tables(
            "pnb.json",
            vec![
                table(&[
                    &["Title_ID", "Area", "Minimum Price"],
                    &["Laguna|Calamba|Juan|0917", "", ""],
                    &["T-1", "120", "900,000"],
                ]),
                // state carries into the next table of the same document
                table(&[
                    &["Title_ID", "Area", "Minimum Price"],
                    &["T-2", "80", "500,000"],
                    &["Cavite|Imus", "", ""],
                    &["T-3", "90", "700,000"],
                ]),
            ],
        );
        let fragments = pnb_locator().locate(&doc);
        let rows = rows(&fragments);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].cells[0], "T-2");
        assert_eq!(rows[1].carried("Province"), Some("Laguna"));
        assert_eq!(rows[2].carried("Province"), Some("Cavite"));
        assert_eq!(rows[2].carried("City/Municipality"), Some("Imus"));
        assert_eq!(rows[2].carried("Contact Person"), None);
    }

    #[test]
    fn test_single_cell_without_separator_is_metadata() {
        let doc = Document::tables(
            "pnb.json",
            vec![table(&[
                &["Title_ID", "Area", "Minimum Price"],
                &["Batangas", "", ""],
                &["T-7", "150", "800,000"],
            ])],
        );
        let fragments = pnb_locator().locate(&doc);
        let rows = rows(&fragments);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells[0], "T-7");
        assert_eq!(rows[0].carried("Province"), Some("Batangas"));
        assert_eq!(rows[0].carried("City/Municipality"), None);
    }

    #[test]
    fn test_carry_over_resets_per_document() {
        let locator = pnb_locator();
        let first = Document::tables(
            "a",
            vec![table(&[
                &["Title_ID", "Area"],
                &["Laguna|Calamba", ""],
                &["T-1", "120"],
            ])],
        );
        let second = Document::tables("b", vec![table(&[&["Title_ID", "Area"], &["T-9", "50"]])]);

        assert_eq!(rows(&locator.locate(&first))[0].carried("Province"), Some("Laguna"));
        assert_eq!(rows(&locator.locate(&second))[0].carried("Province"), None);
    }

    #[test]
    fn test_rows_before_header_and_after_disclaimer_ignored() {
        let keywords = ["PROPERTY", "LOCATION", "PRICE", "AREA"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        let policy = HeaderPolicy::new(keywords, 30)
            .unwrap()
            .disclaimers(vec!["no recourse".to_string()]);
        let locator = HeaderLocator::new(policy);

        let doc = Document::tables(
            "metrobank.json",
            vec![table(&[
                &["Metrobank", "Acquired Assets"],
                &["Property", "Location", "Price"],
                &["Lot", "Antipolo", "1,500,000"],
                &["Property", "Location", "Price"],
                &["House", "Cainta", "3,000,000"],
                &["Only", ""],
                &["Sold with no recourse to the bank", "x"],
                &["Condo", "Ortigas", "4,000,000"],
            ])],
        );
        let fragments = locator.locate(&doc);
        let rows = rows(&fragments);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells, strings(&["Lot", "Antipolo", "1,500,000"]));
        assert_eq!(rows[1].cells, strings(&["House", "Cainta", "3,000,000"]));
        assert_eq!(rows[1].column("location"), Some("Cainta"));
    }

    #[test]
    fn test_table_without_header() {
        let doc = Document::tables("x", vec![table(&[&["a", "b"], &["c", "d"]])]);
        assert!(pnb_locator().locate(&doc).is_empty());
    }

    #[test]
    fn test_carry_over_parse() {
        let policy = CarryOverPolicy::new(&["Province", "City"]);
        assert_eq!(policy.parse(&strings(&["", ""])), None);
        assert_eq!(policy.parse(&strings(&["a|b", "c"])), None);
        assert_eq!(
            policy.parse(&strings(&["Laguna", ""])),
            Some(vec![
                ("Province".to_string(), Some("Laguna".to_string())),
                ("City".to_string(), None),
            ])
        );
        assert_eq!(
            policy.parse(&strings(&["", "Laguna | "])),
            Some(vec![
                ("Province".to_string(), Some("Laguna".to_string())),
                ("City".to_string(), None),
            ])
        );
    }
}

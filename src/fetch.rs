//! Document fetching
//!
//! Blocking HTTP through ureq, plus loaders for pages saved by hand and
//! PDF tables decoded to JSON (`pages -> tables -> rows -> cells`).

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FetchError;
use crate::fragment::{Document, Table};

/// Which pages make up a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pages {
    /// A fixed list of pages.
    Urls { urls: Vec<String> },
    /// `url`, then `url?param=2`, `url?param=3`, ... up to `max_pages`
    /// when set. Open-ended otherwise.
    Paginated {
        url: String,
        #[serde(default = "default_page_param")]
        param: String,
        #[serde(default)]
        max_pages: Option<usize>,
    },
}

fn default_page_param() -> String {
    "page".to_string()
}

impl Pages {
    pub fn single(url: &str) -> Self {
        Pages::Urls {
            urls: vec![url.to_string()],
        }
    }

    pub fn paginated(url: &str) -> Self {
        Pages::Paginated {
            url: url.to_string(),
            param: default_page_param(),
            max_pages: None,
        }
    }

    pub fn entry_url(&self) -> Option<&str> {
        match self {
            Pages::Urls { urls } => urls.first().map(String::as_str),
            Pages::Paginated { url, .. } => Some(url),
        }
    }

    /// Page URLs in order, generated lazily.
    pub fn urls(&self) -> Box<dyn Iterator<Item = String> + '_> {
        match self {
            Pages::Urls { urls } => Box::new(urls.iter().cloned()),
            Pages::Paginated {
                url,
                param,
                max_pages,
            } => {
                let separator = if url.contains('?') { '&' } else { '?' };
                let pages = (1..).map(move |n| {
                    if n == 1 {
                        url.clone()
                    } else {
                        format!("{url}{separator}{param}={n}")
                    }
                });
                match max_pages {
                    Some(max) => Box::new(pages.take(*max)),
                    None => Box::new(pages),
                }
            }
        }
    }
}

/// Blocking HTTP fetcher with a global per-request timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(timeout_secs)))
                .user_agent(user_agent)
                .build(),
        );
        Self { agent }
    }

    pub fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        debug!(url, "GET");
        let http = |source| FetchError::Http {
            url: url.to_string(),
            source: Box::new(source),
        };

        let body = self
            .agent
            .get(url)
            .call()
            .map_err(http)?
            .into_body()
            .read_to_string()
            .map_err(http)?;

        Ok(Document::html(url, &body))
    }

    /// Fetch pages one by one as the caller pulls them.
    pub fn documents<'f>(
        &'f self,
        pages: &'f Pages,
    ) -> impl Iterator<Item = Result<Document, FetchError>> + 'f {
        pages.urls().map(move |url| self.fetch(&url))
    }
}

/// A saved page (`.html`/`.htm`) or a decoded table file (`.json`).
pub fn load_file(path: &Path) -> Result<Document, FetchError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        load_tables(path)
    } else {
        let html = read(path)?;
        Ok(Document::html(path.display().to_string(), &html))
    }
}

/// Decoded PDF tables, one JSON array per page.
pub fn load_tables(path: &Path) -> Result<Document, FetchError> {
    let text = read(path)?;
    let pages: Vec<Vec<Table>> = serde_json::from_str(&text).map_err(|source| FetchError::Tables {
        path: path.to_path_buf(),
        source,
    })?;
    let tables: Vec<Table> = pages.into_iter().flatten().collect();
    debug!(path = %path.display(), tables = tables.len(), "loaded tables");
    Ok(Document::tables(path.display().to_string(), tables))
}

fn read(path: &Path) -> Result<String, FetchError> {
    fs::read_to_string(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_paginated_urls() {
        let pages = Pages::paginated("https://pre-owned-properties.eastwestbanker.com/");
        let urls: Vec<String> = pages.urls().take(3).collect();
        assert_eq!(
            urls,
            vec![
                "https://pre-owned-properties.eastwestbanker.com/",
                "https://pre-owned-properties.eastwestbanker.com/?page=2",
                "https://pre-owned-properties.eastwestbanker.com/?page=3",
            ]
        );

        let bounded = Pages::Paginated {
            url: "https://www.pnb.com.ph/index.php/search-properties?tpl=2".to_string(),
            param: "p".to_string(),
            max_pages: Some(2),
        };
        let urls: Vec<String> = bounded.urls().collect();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1], "https://www.pnb.com.ph/index.php/search-properties?tpl=2&p=2");
    }

    #[test]
    fn test_load_tables() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[[[["Title_ID", "Area"], ["T-1", null]]], [[["T-2", "80"]]]]"#
        )
        .unwrap();

        let doc = load_file(file.path()).unwrap();
        match doc {
            Document::Tables { tables, .. } => {
                assert_eq!(tables.len(), 2);
                assert_eq!(tables[0][1], vec![Some("T-1".to_string()), None]);
            }
            Document::Html { .. } => panic!("expected tables"),
        }
    }

    #[test]
    fn test_load_html_and_missing_file() {
        let mut file = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        write!(file, "<div class='result-each'><h4>Lot</h4></div>").unwrap();
        assert_eq!(load_file(file.path()).unwrap().kind(), "html");

        let missing = Path::new("/definitely/not/here.html");
        assert!(matches!(load_file(missing), Err(FetchError::Io { .. })));
    }

    #[test]
    fn test_bad_table_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"not": "tables"}}"#).unwrap();
        assert!(matches!(load_file(file.path()), Err(FetchError::Tables { .. })));
    }
}

// Scraped page sources.
//
// A job's scraped data arrives as a sequence of "pages", each a CSV table with
// a name column and one or more value columns. Pages come either from local
// files or from an HTTP endpoint with a numbered URL template. Pages are
// fetched one at a time, in order; a page that fails is logged and skipped.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rosterlink_core::{ScrapedRecord, MISSING_SENTINEL};
use tracing::{debug, info, warn};

use crate::config::{JobConfig, SourceConfig};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("failed to read page {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("request for {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("CSV error in page {page}: {source}")]
    Csv { page: String, source: csv::Error },

    #[error("column '{column}' not found in page {page}")]
    MissingColumn { page: String, column: String },

    #[error("page {page} cannot be fetched by this source")]
    WrongSource { page: String },
}

// ---------------------------------------------------------------------------
// Page references and layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRef {
    File(PathBuf),
    Url(String),
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::File(path) => write!(f, "{}", path.display()),
            PageRef::Url(url) => f.write_str(url),
        }
    }
}

/// Which columns of a page hold the scraped name and the values to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub name_column: String,
    pub value_columns: Vec<String>,
}

impl PageLayout {
    pub fn from_job(job: &JobConfig) -> Self {
        Self {
            name_column: job.name_column.clone(),
            value_columns: job.value_columns.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// PageSource trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Every page this source will serve, in fetch order.
    fn pages(&self) -> Vec<PageRef>;

    async fn fetch_page(&self, page: &PageRef) -> Result<Vec<ScrapedRecord>, PageError>;
}

/// Records gathered from every page of a source.
#[derive(Debug, Clone, Default)]
pub struct CollectedPages {
    pub records: Vec<ScrapedRecord>,
    pub pages_loaded: usize,
    pub pages_failed: usize,
}

/// Fetch every page sequentially. Failed pages are logged and skipped.
pub async fn collect(source: &dyn PageSource) -> CollectedPages {
    let mut out = CollectedPages::default();
    for page in source.pages() {
        match source.fetch_page(&page).await {
            Ok(records) => {
                debug!("page {}: {} records", page, records.len());
                out.pages_loaded += 1;
                out.records.extend(records);
            }
            Err(e) => {
                warn!("skipping page {}: {}", page, e);
                out.pages_failed += 1;
            }
        }
    }
    info!(
        "collected {} records from {} pages ({} failed)",
        out.records.len(),
        out.pages_loaded,
        out.pages_failed
    );
    out
}

/// Build the page source a job's `[jobs.source]` table describes. Relative
/// file paths are resolved against `base_dir`.
pub fn source_for_job(job: &JobConfig, base_dir: &Path) -> Result<Box<dyn PageSource>, PageError> {
    let layout = PageLayout::from_job(job);
    match &job.source {
        SourceConfig::Files { paths } => Ok(Box::new(FilePageSource::new(
            paths.iter().map(|p| base_dir.join(p)).collect(),
            layout,
        ))),
        SourceConfig::Http {
            url_template,
            first_page,
            last_page,
            timeout_secs,
        } => Ok(Box::new(HttpPageSource::new(
            url_template.clone(),
            *first_page..=*last_page,
            Duration::from_secs(*timeout_secs),
            layout,
        )?)),
    }
}

// ---------------------------------------------------------------------------
// Page parsing
// ---------------------------------------------------------------------------

/// Scraped cells often hold the name followed by a second line (position,
/// nationality); only the first line is the name.
fn name_cell(cell: &str) -> &str {
    cell.lines().next().unwrap_or("").trim()
}

/// Parse one CSV page into scraped records.
///
/// The name column must exist. A value column that is absent from the page is
/// reported once and filled with the missing sentinel for every row.
pub fn parse_page(body: &str, page: &str, layout: &PageLayout) -> Result<Vec<ScrapedRecord>, PageError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| PageError::Csv {
            page: page.to_string(),
            source: e,
        })?
        .clone();

    let position = |column: &str| headers.iter().position(|h| h.trim() == column);

    let name_idx = position(layout.name_column.as_str()).ok_or_else(|| PageError::MissingColumn {
        page: page.to_string(),
        column: layout.name_column.clone(),
    })?;

    let value_idx: Vec<(&str, Option<usize>)> = layout
        .value_columns
        .iter()
        .map(|column| {
            let idx = position(column.as_str());
            if idx.is_none() {
                warn!("page {} has no '{}' column; values set to {}", page, column, MISSING_SENTINEL);
            }
            (column.as_str(), idx)
        })
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed row in page {}: {}", page, e);
                continue;
            }
        };
        let mut record = ScrapedRecord::new(name_cell(row.get(name_idx).unwrap_or("")));
        for (column, idx) in &value_idx {
            let raw = idx
                .and_then(|i| row.get(i))
                .map(str::trim)
                .unwrap_or(MISSING_SENTINEL);
            record = record.with_value(*column, raw);
        }
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// FilePageSource
// ---------------------------------------------------------------------------

/// Local CSV files, one page each.
pub struct FilePageSource {
    paths: Vec<PathBuf>,
    layout: PageLayout,
}

impl FilePageSource {
    pub fn new(paths: Vec<PathBuf>, layout: PageLayout) -> Self {
        Self { paths, layout }
    }
}

#[async_trait]
impl PageSource for FilePageSource {
    fn pages(&self) -> Vec<PageRef> {
        self.paths.iter().cloned().map(PageRef::File).collect()
    }

    async fn fetch_page(&self, page: &PageRef) -> Result<Vec<ScrapedRecord>, PageError> {
        let PageRef::File(path) = page else {
            return Err(PageError::WrongSource {
                page: page.to_string(),
            });
        };
        let label = path.display().to_string();
        let body = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PageError::Io {
                path: label.clone(),
                source: e,
            })?;
        parse_page(&body, &label, &self.layout)
    }
}

// ---------------------------------------------------------------------------
// HttpPageSource
// ---------------------------------------------------------------------------

/// Numbered pages served over HTTP as CSV.
pub struct HttpPageSource {
    http: reqwest::Client,
    url_template: String,
    page_numbers: std::ops::RangeInclusive<u32>,
    layout: PageLayout,
}

impl HttpPageSource {
    pub fn new(
        url_template: String,
        page_numbers: std::ops::RangeInclusive<u32>,
        timeout: Duration,
        layout: PageLayout,
    ) -> Result<Self, PageError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PageError::Http {
                url: url_template.clone(),
                source: e,
            })?;
        Ok(Self {
            http,
            url_template,
            page_numbers,
            layout,
        })
    }

    pub fn page_url(&self, page: u32) -> String {
        self.url_template.replace("{page}", &page.to_string())
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    fn pages(&self) -> Vec<PageRef> {
        self.page_numbers
            .clone()
            .map(|n| PageRef::Url(self.page_url(n)))
            .collect()
    }

    async fn fetch_page(&self, page: &PageRef) -> Result<Vec<ScrapedRecord>, PageError> {
        let PageRef::Url(url) = page else {
            return Err(PageError::WrongSource {
                page: page.to_string(),
            });
        };
        let http_err = |e: reqwest::Error| PageError::Http {
            url: url.clone(),
            source: e,
        };

        let response = self.http.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PageError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(http_err)?;
        parse_page(&body, url, &self.layout)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn layout() -> PageLayout {
        PageLayout {
            name_column: "Player".into(),
            value_columns: vec!["Price".into()],
        }
    }

    fn names(records: &[ScrapedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    // -- parse_page --

    #[test]
    fn parse_page_reads_name_and_values() {
        let body = "Player,Club,Price\nMohamed Salah,Liverpool,€15M\nBukayo Saka,Arsenal,€120M\n";
        let records = parse_page(body, "p1", &layout()).unwrap();
        assert_eq!(names(&records), vec!["Mohamed Salah", "Bukayo Saka"]);
        assert_eq!(records[0].values[0].column, "Price");
        assert_eq!(records[0].values[0].raw, "€15M");
    }

    #[test]
    fn parse_page_keeps_first_line_of_name_cell() {
        let body = "Player,Price\n\"M. Salah\nRight Winger\",€15M\n";
        let records = parse_page(body, "p1", &layout()).unwrap();
        assert_eq!(names(&records), vec!["M. Salah"]);
    }

    #[test]
    fn parse_page_missing_value_column_fills_sentinel() {
        let body = "Player,Club\nMohamed Salah,Liverpool\n";
        let records = parse_page(body, "p1", &layout()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].values[0].raw, MISSING_SENTINEL);
    }

    #[test]
    fn parse_page_short_row_fills_sentinel() {
        let body = "Player,Club,Price\nMohamed Salah,Liverpool\n";
        let records = parse_page(body, "p1", &layout()).unwrap();
        assert_eq!(records[0].values[0].raw, MISSING_SENTINEL);
    }

    #[test]
    fn parse_page_missing_name_column_is_an_error() {
        let body = "Name,Price\nMohamed Salah,€15M\n";
        let err = parse_page(body, "p1", &layout()).unwrap_err();
        assert!(matches!(err, PageError::MissingColumn { ref column, .. } if column == "Player"));
    }

    // -- FilePageSource --

    #[tokio::test]
    async fn file_source_collects_pages_in_order_and_skips_failures() {
        let dir = std::env::temp_dir().join("rosterlink_pages_files");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("p1.csv"), "Player,Price\nMohamed Salah,€15M\n").unwrap();
        fs::write(dir.join("p3.csv"), "Player,Price\nBukayo Saka,€120M\nDeclan Rice,€105M\n").unwrap();

        let source = FilePageSource::new(
            vec![dir.join("p1.csv"), dir.join("p2.csv"), dir.join("p3.csv")],
            layout(),
        );
        assert_eq!(source.pages().len(), 3);

        let collected = collect(&source).await;
        assert_eq!(collected.pages_loaded, 2);
        assert_eq!(collected.pages_failed, 1);
        assert_eq!(
            names(&collected.records),
            vec!["Mohamed Salah", "Bukayo Saka", "Declan Rice"]
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn file_source_rejects_url_refs() {
        let source = FilePageSource::new(vec![], layout());
        let err = source
            .fetch_page(&PageRef::Url("http://localhost/1".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::WrongSource { .. }));
    }

    // -- HttpPageSource --

    #[test]
    fn http_source_expands_page_range() {
        let source = HttpPageSource::new(
            "http://localhost/transfers?page={page}".into(),
            3..=5,
            Duration::from_secs(1),
            layout(),
        )
        .unwrap();
        assert_eq!(
            source.pages(),
            vec![
                PageRef::Url("http://localhost/transfers?page=3".into()),
                PageRef::Url("http://localhost/transfers?page=4".into()),
                PageRef::Url("http://localhost/transfers?page=5".into()),
            ]
        );
    }

    #[tokio::test]
    async fn http_source_fetches_csv_and_skips_error_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            for _ in 0..2 {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap();
                let request = String::from_utf8_lossy(&buf[..n]).to_string();

                let response = if request.starts_with("GET /page/1 ") {
                    let body = "Player,Price\nMohamed Salah,€15M\nJohn Smith,£500K\n";
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    )
                } else {
                    "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string()
                };
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
            }
        });

        let source = HttpPageSource::new(
            format!("http://{addr}/page/{{page}}"),
            1..=2,
            Duration::from_secs(5),
            layout(),
        )
        .unwrap();

        let collected = collect(&source).await;
        assert_eq!(collected.pages_loaded, 1);
        assert_eq!(collected.pages_failed, 1);
        assert_eq!(names(&collected.records), vec!["Mohamed Salah", "John Smith"]);
        assert_eq!(collected.records[1].values[0].raw, "£500K");

        server.await.unwrap();
    }
}

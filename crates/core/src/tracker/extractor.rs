//! Extraction of torrent records from a tracker's search listing page.
//!
//! The listing is an HTML table. Each row describes one torrent; each cell is
//! recognised by a CSS-class marker rather than by its position, so column
//! reordering does not break extraction. Markup drift that leaves a row
//! without one of the expected cells is reported as an error.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use super::size::{parse_size, SizeParseError};
use super::TorrentRecord;

/// Trailing "NUMBER UNIT" token of a size cell.
static SIZE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+(?:[.,][0-9]+)?) ([A-Za-z]+)").unwrap());

/// Errors that can occur while extracting records from a listing.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Results table #{0} not found")]
    TableNotFound(String),

    #[error("Row {row}: missing {cell} cell")]
    MissingCell { row: usize, cell: &'static str },

    #[error("Row {row}: no download identifier in size cell")]
    MissingIdentifier { row: usize },

    #[error("Row {row}: no size in {text:?}")]
    MissingSize { row: usize, text: String },

    #[error("Row {row}: {source}")]
    InvalidSize {
        row: usize,
        #[source]
        source: SizeParseError,
    },

    #[error("Row {row}: invalid {cell} count {value:?}")]
    InvalidCount {
        row: usize,
        cell: &'static str,
        value: String,
    },

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Structural and class markers of a listing page.
#[derive(Debug, Clone)]
pub struct ListingMarkers {
    /// `id` attribute of the results table.
    pub table_id: String,
    /// Texts shown in a cell when the search matched nothing.
    pub no_results: Vec<String>,
    pub title_class: String,
    pub category_class: String,
    pub size_class: String,
    /// Class of the bold tag holding the seeders count.
    pub seeders_class: String,
    pub leechers_class: String,
    /// Link prefix followed by the torrent identifier.
    pub download_link: String,
}

impl Default for ListingMarkers {
    /// Markers of rutracker's `tracker.php` listing.
    fn default() -> Self {
        Self {
            table_id: "tor-tbl".to_string(),
            no_results: vec!["Не найдено".to_string(), "No results".to_string()],
            title_class: "t-title".to_string(),
            category_class: "f-name".to_string(),
            size_class: "tor-size".to_string(),
            seeders_class: "seedmed".to_string(),
            leechers_class: "leechmed".to_string(),
            download_link: "dl.php?t=".to_string(),
        }
    }
}

/// Turns listing markup into [`TorrentRecord`]s.
#[derive(Debug, Clone)]
pub struct ResultExtractor {
    tracker: String,
    markers: ListingMarkers,
}

impl ResultExtractor {
    pub fn new(tracker: impl Into<String>, markers: ListingMarkers) -> Self {
        Self {
            tracker: tracker.into(),
            markers,
        }
    }

    /// Parse a listing page. Records are produced lazily by
    /// [`Listing::records`].
    pub fn parse(&self, markup: &str) -> Listing<'_> {
        Listing {
            document: Html::parse_document(markup),
            extractor: self,
        }
    }

    /// Parse a listing page and collect every record, failing on the first
    /// malformed row.
    pub fn extract_all(&self, markup: &str) -> Result<Vec<TorrentRecord>, ExtractError> {
        let listing = self.parse(markup);
        let records: Result<Vec<_>, _> = listing.records()?.collect();
        records
    }
}

/// A parsed listing page.
pub struct Listing<'e> {
    document: Html,
    extractor: &'e ResultExtractor,
}

impl Listing<'_> {
    /// Iterate over the rows of the results table.
    ///
    /// Fails if the page has no results table at all. The iterator ends
    /// without yielding anything more once a "no results" row is seen.
    pub fn records(&self) -> Result<Records<'_>, ExtractError> {
        let markers = &self.extractor.markers;
        let table = Selector::parse(&format!("table#{}", markers.table_id))
            .map_err(|e| ExtractError::Selector(e.to_string()))?;
        let rows = Selector::parse(&format!("table#{} > tbody > tr", markers.table_id))
            .map_err(|e| ExtractError::Selector(e.to_string()))?;

        if self.document.select(&table).next().is_none() {
            return Err(ExtractError::TableNotFound(markers.table_id.clone()));
        }

        let rows: Vec<ElementRef<'_>> = self.document.select(&rows).collect();
        Ok(Records {
            rows: rows.into_iter(),
            extractor: self.extractor,
            index: 0,
            done: false,
        })
    }
}

/// Lazy sequence of records from one listing page.
pub struct Records<'a> {
    rows: std::vec::IntoIter<ElementRef<'a>>,
    extractor: &'a ResultExtractor,
    index: usize,
    done: bool,
}

enum RowOutcome {
    NoResults,
    Empty,
    Record(Result<TorrentRecord, ExtractError>),
}

impl Iterator for Records<'_> {
    type Item = Result<TorrentRecord, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let row = self.rows.next()?;
            self.index += 1;
            match self.extractor.parse_row(row, self.index) {
                RowOutcome::NoResults => self.done = true,
                RowOutcome::Empty => continue,
                RowOutcome::Record(record) => return Some(record),
            }
        }
        None
    }
}

impl ResultExtractor {
    fn parse_row(&self, row: ElementRef<'_>, index: usize) -> RowOutcome {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "td")
            .collect();
        if cells.is_empty() {
            return RowOutcome::Empty;
        }

        let m = &self.markers;
        let mut title = None;
        let mut category = None;
        let mut size_cell = None;
        let mut seeders = None;
        let mut leechers = None;

        for cell in cells {
            let text = cell_text(cell);
            if m.no_results.iter().any(|marker| text.contains(marker.as_str())) {
                return RowOutcome::NoResults;
            }

            let class = cell.value().attr("class").unwrap_or_default();
            if class.contains(m.title_class.as_str()) {
                title = Some(text);
            } else if class.contains(m.category_class.as_str()) {
                category = Some(text);
            } else if class.contains(m.size_class.as_str()) {
                size_cell = Some((cell, text));
            } else if class.contains(m.leechers_class.as_str()) {
                leechers = Some(text);
            } else if has_bold_with_class(cell, &m.seeders_class) {
                seeders = Some(text);
            }
        }

        RowOutcome::Record(self.build_record(index, title, category, size_cell, seeders, leechers))
    }

    fn build_record(
        &self,
        row: usize,
        title: Option<String>,
        category: Option<String>,
        size_cell: Option<(ElementRef<'_>, String)>,
        seeders: Option<String>,
        leechers: Option<String>,
    ) -> Result<TorrentRecord, ExtractError> {
        let title = title.ok_or(ExtractError::MissingCell { row, cell: "title" })?;
        let category = category.ok_or(ExtractError::MissingCell { row, cell: "category" })?;
        let (size_cell, size_text) =
            size_cell.ok_or(ExtractError::MissingCell { row, cell: "size" })?;
        let seeders = seeders.ok_or(ExtractError::MissingCell { row, cell: "seeders" })?;
        let leechers = leechers.ok_or(ExtractError::MissingCell { row, cell: "leechers" })?;

        let torrent_id = self
            .download_identifier(size_cell)
            .ok_or(ExtractError::MissingIdentifier { row })?;

        let size_token = SIZE_TOKEN
            .captures_iter(&size_text)
            .last()
            .map(|c| format!("{} {}", &c[1], &c[2]))
            .ok_or_else(|| ExtractError::MissingSize {
                row,
                text: size_text.clone(),
            })?;
        let size_bytes =
            parse_size(&size_token).map_err(|source| ExtractError::InvalidSize { row, source })?;

        Ok(TorrentRecord {
            title,
            seeders: parse_count(row, "seeders", &seeders)?,
            leechers: parse_count(row, "leechers", &leechers)?,
            size_bytes,
            category,
            torrent_id,
            tracker: self.tracker.clone(),
        })
    }

    fn download_identifier(&self, cell: ElementRef<'_>) -> Option<String> {
        let prefix = self.markers.download_link.as_str();
        cell.descendants()
            .filter_map(ElementRef::wrap)
            .filter_map(|e| e.value().attr("href"))
            .find_map(|href| {
                let start = href.find(prefix)? + prefix.len();
                let id: String = href[start..]
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                (!id.is_empty()).then_some(id)
            })
    }
}

/// Entity-decoded text of a cell with whitespace (including no-break
/// spaces) collapsed.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_bold_with_class(cell: ElementRef<'_>, class: &str) -> bool {
    cell.descendants().filter_map(ElementRef::wrap).any(|e| {
        e.value().name() == "b" && e.value().attr("class").is_some_and(|c| c.contains(class))
    })
}

fn parse_count(row: usize, cell: &'static str, text: &str) -> Result<u32, ExtractError> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().map_err(|_| ExtractError::InvalidCount {
        row,
        cell,
        value: text.to_string(),
    })
}

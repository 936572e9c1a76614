//! The matching core: pairs a level's PDF listing with its audio listing
//! and assembles the ordered book catalog.
//!
//! Pure and synchronous — both listings must be fully materialized before
//! calling in here, so pagination boundaries can never change a pairing.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::filename;
use crate::formats::Book;

/// Lookup from match key to the chosen audio filename for one level.
#[derive(Debug, Default)]
pub struct AudioIndex {
    by_key: HashMap<String, String>,
}

impl AudioIndex {
    /// Index audio filenames in listing order. When two files normalize to
    /// the same key the later one wins; that tie-break is a compatibility
    /// contract, and every overwrite lands in the report so operators can
    /// see the shadowed file.
    pub fn build<I, S>(audio_files: I, report: &mut BuildReport) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut by_key = HashMap::new();
        for name in audio_files {
            let name = name.as_ref();
            if name.starts_with('.') {
                report.skip(name, SkipReason::Hidden);
                continue;
            }
            let Some(parsed) = filename::parse(name) else {
                report.skip(name, SkipReason::Unparseable);
                continue;
            };
            let key = parsed.match_key();
            if let Some(replaced) = by_key.insert(key.clone(), name.to_owned()) {
                report.audio_overwrites.push(AudioOverwrite {
                    match_key: key,
                    replaced,
                    kept: name.to_owned(),
                });
            }
        }
        Self { by_key }
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Why a listing entry produced no catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Hidden,
    Unparseable,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudioOverwrite {
    pub match_key: String,
    pub replaced: String,
    pub kept: String,
}

/// Diagnostics from one catalog build. Data-quality problems are never
/// errors (stray files are a fact of bulk media libraries), but operators
/// need to see them without grepping logs.
#[derive(Debug, Default, Serialize)]
pub struct BuildReport {
    pub skipped: Vec<SkippedFile>,
    pub audio_overwrites: Vec<AudioOverwrite>,
}

impl BuildReport {
    fn skip(&mut self, filename: &str, reason: SkipReason) {
        self.skipped.push(SkippedFile {
            filename: filename.to_owned(),
            reason,
        });
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.audio_overwrites.is_empty()
    }

    pub fn merge(&mut self, other: BuildReport) {
        self.skipped.extend(other.skipped);
        self.audio_overwrites.extend(other.audio_overwrites);
    }
}

#[derive(Debug)]
pub struct CatalogBuild {
    pub books: Vec<Book>,
    pub report: BuildReport,
}

/// Assemble the ordered catalog for one level from its two listings.
///
/// Every PDF that parses yields exactly one record; a missing audio match
/// leaves `audio_path` empty and never drops the book. Output order is a
/// pure function of the input listing orders.
pub fn build_catalog(level: &str, pdf_files: &[String], audio_files: &[String]) -> CatalogBuild {
    let mut report = BuildReport::default();
    let index = AudioIndex::build(audio_files, &mut report);

    // Pass one: parse, and note which display numbers are taken
    // explicitly ("02" claims 2) so auto numbering can avoid them.
    let mut parsed_pdfs = Vec::new();
    let mut claimed: HashSet<u64> = HashSet::new();
    for name in pdf_files {
        if name.starts_with('.') {
            report.skip(name, SkipReason::Hidden);
            continue;
        }
        let Some(parsed) = filename::parse(name) else {
            report.skip(name, SkipReason::Unparseable);
            continue;
        };
        if let Ok(n) = parsed.number.parse::<u64>() {
            claimed.insert(n);
        }
        parsed_pdfs.push((name, parsed));
    }

    // Pass two: numberless PDFs take the smallest free integers in
    // listing order, keeping ids unique alongside the explicit numbers.
    let mut next_auto: u64 = 1;
    let mut books = Vec::with_capacity(parsed_pdfs.len());
    for (name, parsed) in parsed_pdfs {
        let audio_path = index.lookup(&parsed.match_key()).unwrap_or("").to_owned();

        let display_number = if parsed.number.is_empty() {
            while claimed.contains(&next_auto) {
                next_auto += 1;
            }
            claimed.insert(next_auto);
            next_auto.to_string()
        } else {
            parsed.number
        };

        books.push(Book {
            id: display_number.clone(),
            number: display_number,
            title: parsed.title,
            level: level.to_owned(),
            pdf_path: name.clone(),
            audio_path,
        });
    }

    sort_books(&mut books);
    CatalogBuild { books, report }
}

/// Numeric order; anything that is not an integer sinks to the end.
/// Stable, so ties keep listing order.
fn sort_books(books: &mut [Book]) {
    books.sort_by_key(|book| book.number.parse::<u64>().unwrap_or(9999));
}

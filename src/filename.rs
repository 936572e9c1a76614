use std::sync::LazyLock;

use regex::Regex;

/// Grammar shared by every media filename in the library:
/// an optional numeric prefix, a title body, an optional DRM-removal
/// decoration, and a required `.pdf`/`.mp3` extension.
///
/// Accepts `01- Farm Animals_Password_Removed.pdf` as well as the bare
/// `Farm Animals.pdf`.
static FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(\d+)[.\-_\s]+)?(.+?)(?:_password.*)?\.(?:pdf|mp3)$")
        .expect("filename grammar")
});

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_\-.]+").expect("separators"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace"));

/// Structured view of one media filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    /// Leading digit string as written ("02" stays "02"); empty when the
    /// filename carries no number.
    pub number: String,
    /// Human-readable title with separator runs collapsed to single spaces.
    pub title: String,
}

/// Parse a raw filename. Returns `None` for anything outside the grammar;
/// stray files in a bulk media library are expected, not an error.
pub fn parse(filename: &str) -> Option<ParsedFilename> {
    let captures = FILENAME.captures(filename)?;

    let number = captures
        .get(1)
        .map(|m| m.as_str().to_owned())
        .unwrap_or_default();

    let body = captures.get(2)?.as_str();
    let title = SEPARATORS.replace_all(body, " ");
    let title = WHITESPACE.replace_all(&title, " ");
    let title = title.trim().to_owned();

    // A body made entirely of separators collapses to nothing; a book
    // with no title is a parse failure, not an empty record.
    if title.is_empty() {
        return None;
    }

    Some(ParsedFilename { number, title })
}

/// Collapse a title into its case- and punctuation-insensitive matching
/// form: lower-cased, everything outside `[a-z0-9]` removed. Intentionally
/// lossy so inconsistent naming never prevents a PDF/audio pairing.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .flat_map(|c| c.to_lowercase())
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

impl ParsedFilename {
    /// Pairing identity for one logical book: number plus normalized title.
    pub fn match_key(&self) -> String {
        format!("{}_{}", self.number, normalize_title(&self.title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbered_filename() {
        let parsed = parse("01- Farm Animals_Password_Removed.pdf").unwrap();
        assert_eq!(parsed.number, "01");
        assert_eq!(parsed.title, "Farm Animals");
    }

    #[test]
    fn parses_filename_without_number() {
        let parsed = parse("Farm_Animals.pdf").unwrap();
        assert_eq!(parsed.number, "");
        assert_eq!(parsed.title, "Farm Animals");
    }

    #[test]
    fn preserves_leading_zeros_in_number() {
        let parsed = parse("007.The Spy Kit.mp3").unwrap();
        assert_eq!(parsed.number, "007");
        assert_eq!(parsed.title, "The Spy Kit");
    }

    #[test]
    fn collapses_mixed_separator_runs() {
        let parsed = parse("12 - My__Best--Day...pdf").unwrap();
        assert_eq!(parsed.number, "12");
        assert_eq!(parsed.title, "My Best Day");
    }

    #[test]
    fn decoration_suffix_is_not_part_of_the_title() {
        let parsed = parse("3-Big Cats_password removed.PDF").unwrap();
        assert_eq!(parsed.title, "Big Cats");
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert!(parse("Zoo Trip.Mp3").is_some());
        assert!(parse("Zoo Trip.PDF").is_some());
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert!(parse("Farm Animals.txt").is_none());
        assert!(parse("Farm Animals").is_none());
        assert!(parse("notes.pdf.bak").is_none());
    }

    #[test]
    fn digits_only_name_becomes_the_title() {
        // "12.pdf" cannot split into number + title; the digits fall
        // through to the title capture instead.
        let parsed = parse("12.pdf").unwrap();
        assert_eq!(parsed.number, "");
        assert_eq!(parsed.title, "12");
    }

    #[test]
    fn rejects_title_that_collapses_to_nothing() {
        assert!(parse("1-_-.pdf").is_none());
    }

    #[test]
    fn normalize_is_idempotent() {
        for title in ["Farm Animals", "  A, B & C!  ", "déjà vu 12"] {
            let once = normalize_title(title);
            assert_eq!(normalize_title(&once), once);
        }
    }

    #[test]
    fn normalize_ignores_case_punctuation_and_spacing() {
        assert_eq!(normalize_title("Farm Animals"), normalize_title("farm_animals"));
        assert_eq!(normalize_title("Farm  Animals!"), "farmanimals");
    }

    #[test]
    fn match_key_pairs_across_naming_styles() {
        let pdf = parse("02-Farm Animals.pdf").unwrap();
        let mp3 = parse("02_farm.animals.mp3").unwrap();
        assert_eq!(pdf.match_key(), mp3.match_key());
    }

    #[test]
    fn match_key_distinguishes_numbers() {
        let a = parse("1-Farm Animals.pdf").unwrap();
        let b = parse("2-Farm Animals.pdf").unwrap();
        assert_ne!(a.match_key(), b.match_key());
    }
}

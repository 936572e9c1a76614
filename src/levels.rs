//! Canonical reading-level codes and the storage-directory naming mess
//! that maps onto them.
//!
//! The source media tree grew by hand over years: mixed Chinese/English
//! labels, three bracket styles, inconsistent casing and spacing. That is
//! an enumeration problem, so the aliases live here as data — one table
//! for every consumer instead of a copy per tool.

/// One reading level and the raw directory names seen for it in storage.
#[derive(Debug)]
pub struct LevelDirs {
    pub code: &'static str,
    pub pdf_aliases: &'static [&'static str],
    pub audio_aliases: &'static [&'static str],
}

/// Ordered `AA`, `A`..`Z`, `Z1`, `Z2`. Order matters twice: it is the
/// presentation order of the level list, and the heuristic resolver scans
/// it front to back so `AA` is tried before `A` (and `Z` before `Z1`,
/// where the boundary check settles the tie).
pub static LEVELS: &[LevelDirs] = &[
    LevelDirs { code: "AA", pdf_aliases: &["AA绘本pdf"], audio_aliases: &["AA｛mp3｝", "aa[Mp3]"] },
    LevelDirs { code: "A", pdf_aliases: &["A级别pdf"], audio_aliases: &["A{mp3}"] },
    LevelDirs { code: "B", pdf_aliases: &["B级别PDF"], audio_aliases: &["B[Mp3]"] },
    LevelDirs { code: "C", pdf_aliases: &["C级别PDF"], audio_aliases: &["C[Mp3]"] },
    LevelDirs { code: "D", pdf_aliases: &["D级别PDF"], audio_aliases: &["D[Mp3]"] },
    LevelDirs { code: "E", pdf_aliases: &["E级别PDF"], audio_aliases: &["E[Mp3]"] },
    LevelDirs { code: "F", pdf_aliases: &["F级别PDF"], audio_aliases: &["F[Mp3]"] },
    LevelDirs { code: "G", pdf_aliases: &["G级别PDF"], audio_aliases: &["G[Mp3]"] },
    LevelDirs { code: "H", pdf_aliases: &["H 级别PDF"], audio_aliases: &["H[Mp3]"] },
    LevelDirs { code: "I", pdf_aliases: &["I 级别pdf"], audio_aliases: &["I[Mp3]"] },
    LevelDirs { code: "J", pdf_aliases: &["J 级别pdf"], audio_aliases: &["J[Mp3]"] },
    LevelDirs { code: "K", pdf_aliases: &["K级别pdf"], audio_aliases: &["K[Mp3]"] },
    LevelDirs { code: "L", pdf_aliases: &["L级别pdf"], audio_aliases: &["L[Mp3]"] },
    LevelDirs { code: "M", pdf_aliases: &["M 级别pdf"], audio_aliases: &["M[Mp3]"] },
    LevelDirs { code: "N", pdf_aliases: &["N级别pdf"], audio_aliases: &["N[Mp3]"] },
    LevelDirs { code: "O", pdf_aliases: &["O级别pdf"], audio_aliases: &["O[Mp3]"] },
    LevelDirs { code: "P", pdf_aliases: &["P 级别pdf"], audio_aliases: &["P[Mp3]"] },
    LevelDirs { code: "Q", pdf_aliases: &["Q 电子书pdf"], audio_aliases: &["Q[Mp3]"] },
    LevelDirs { code: "R", pdf_aliases: &["R级别pdf"], audio_aliases: &["R[Mp3]"] },
    LevelDirs { code: "S", pdf_aliases: &["S级别pdf"], audio_aliases: &["S[Mp3]"] },
    LevelDirs { code: "T", pdf_aliases: &["T级别pdf"], audio_aliases: &["T[Mp3]"] },
    LevelDirs { code: "U", pdf_aliases: &["U 级别pdf"], audio_aliases: &["U[Mp3]"] },
    LevelDirs { code: "V", pdf_aliases: &["V级别pdf"], audio_aliases: &["V[Mp3]"] },
    LevelDirs { code: "W", pdf_aliases: &["W 级别pdf"], audio_aliases: &["W[Mp3]"] },
    LevelDirs { code: "X", pdf_aliases: &["X级别pdf"], audio_aliases: &["X[Mp3]"] },
    LevelDirs { code: "Y", pdf_aliases: &["Y级别pdf"], audio_aliases: &["Y[Mp3]"] },
    LevelDirs { code: "Z", pdf_aliases: &["Z级别pdf"], audio_aliases: &["Z[Mp3]"] },
    LevelDirs { code: "Z1", pdf_aliases: &["Z1 级别pdf"], audio_aliases: &["Z1[Mp3]"] },
    LevelDirs { code: "Z2", pdf_aliases: &["Z2 级别pdf"], audio_aliases: &["Z2[Mp3]"] },
];

/// Canonical level codes in presentation order.
pub fn level_codes() -> impl Iterator<Item = &'static str> {
    LEVELS.iter().map(|l| l.code)
}

pub fn is_level_code(candidate: &str) -> bool {
    LEVELS.iter().any(|l| l.code == candidate)
}

/// Resolve a raw PDF-tree directory name to its level code.
///
/// The heuristic (case-insensitive level prefix plus a "pdf" marker
/// somewhere in the name) is primary because the alias table keeps
/// drifting behind what is actually on disk; the exact table remains as a
/// fallback for names the heuristic cannot see. `None` means skip the
/// directory — never an error.
pub fn level_for_pdf_dir(dir: &str) -> Option<&'static str> {
    for level in LEVELS {
        if pdf_heuristic_matches(level.code, dir) {
            return Some(level.code);
        }
    }
    LEVELS
        .iter()
        .find(|level| level.pdf_aliases.contains(&dir))
        .map(|level| level.code)
}

/// Resolve a raw audio-tree directory name to its level code.
///
/// Audio directories only vary in bracket style (`{}`, `[]`, `｛｝`),
/// which a prefix heuristic cannot tell apart from the level code itself,
/// so this side is exact-table only.
pub fn level_for_audio_dir(dir: &str) -> Option<&'static str> {
    LEVELS
        .iter()
        .find(|level| level.audio_aliases.contains(&dir))
        .map(|level| level.code)
}

/// `dir` starts with `code` (ASCII case-insensitive), the next character
/// does not extend the code (so `AA绘本pdf` never matches level `A`, nor
/// `Z1 级别pdf` level `Z`), and a "pdf" token appears somewhere after it.
fn pdf_heuristic_matches(code: &str, dir: &str) -> bool {
    let Some(rest) = strip_prefix_ignore_ascii_case(dir, code) else {
        return false;
    };
    let boundary = rest
        .chars()
        .next()
        .is_none_or(|c| !c.is_ascii_alphanumeric());
    boundary && rest.to_ascii_lowercase().contains("pdf")
}

fn strip_prefix_ignore_ascii_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

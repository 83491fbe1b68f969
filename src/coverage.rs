//! coverage.rs
//!
//! gcov listing analysis.
//!
//! A listing has one line per source line, `count:lineno:source`. The count
//! column is an execution count, `#####` for an executable line that never
//! ran, or `-` for a line with no code.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

const NOT_EXECUTED: &str = "#####";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub executed: usize,
    pub total: usize,
    /// Line numbers of executable lines that never ran.
    pub missed_lines: Vec<u32>,
}

impl CoverageReport {
    /// `None` when the listing had no executable lines.
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.executed as f64 * 100.0 / self.total as f64)
        }
    }
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent() {
            Some(p) => write!(
                f,
                "Line Coverage: {}/{} lines executed ({:.1}%)",
                self.executed, self.total, p
            ),
            None => write!(f, "No executable lines found."),
        }
    }
}

pub fn analyze_listing(text: &str) -> CoverageReport {
    let mut report = CoverageReport::default();

    for line in text.lines() {
        let parts: Vec<&str> = line.trim().split(':').collect();
        if parts.len() < 3 {
            continue;
        }

        let marker = parts[0].trim();
        if marker == NOT_EXECUTED {
            report.total += 1;
            if let Ok(n) = parts[1].trim().parse::<u32>() {
                report.missed_lines.push(n);
            }
        } else if is_count(marker) {
            report.executed += 1;
            report.total += 1;
        }
    }

    report
}

/// Reads a listing from disk. Bytes that are not valid UTF-8 are dropped.
pub fn analyze_file(path: &Path) -> io::Result<CoverageReport> {
    let bytes = fs::read(path)?;
    Ok(analyze_listing(&decode_lossy(&bytes)))
}

fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect()
}

fn is_count(marker: &str) -> bool {
    !marker.is_empty() && marker.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_executed_and_unexecuted_lines() {
        let listing = "        5:    1:int add(int a, int b) {\n\
                       #####:    2:    return 0;\n\
                       -:    3:}\n\
                       3:    4:int sub(int a, int b) {\n";

        let report = analyze_listing(listing);

        assert_eq!(report.executed, 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.missed_lines, vec![2]);
        assert_eq!(
            report.to_string(),
            "Line Coverage: 2/3 lines executed (66.7%)"
        );
    }

    #[test]
    fn real_gcov_header_is_skipped() {
        let listing = "        -:    0:Source:sample.c\n\
                       \x20       -:    0:Graph:test_binary-sample.gcno\n\
                       \x20       -:    0:Runs:1\n\
                       \x20       1:    3:int add(int a, int b) {\n\
                       \x20       1:    4:    return a + b;\n\
                       \x20       -:    5:}\n";

        let report = analyze_listing(listing);
        assert_eq!((report.executed, report.total), (2, 2));
        assert_eq!(report.percent(), Some(100.0));
    }

    #[test]
    fn short_lines_are_skipped() {
        let report = analyze_listing("5:only two\n#####\n\n12");
        assert_eq!(report, CoverageReport::default());
    }

    #[test]
    fn no_executable_lines_is_not_a_division() {
        let report = analyze_listing("-:1:/* comment */\n-:2:\n");
        assert_eq!(report.total, 0);
        assert_eq!(report.percent(), None);
        assert_eq!(report.to_string(), "No executable lines found.");
    }

    #[test]
    fn starred_count_is_not_a_plain_count() {
        let report = analyze_listing("    2*:   7:    if (x) y();\n    1:   8:z();\n");
        assert_eq!((report.executed, report.total), (1, 1));

        let report = analyze_listing("    2*:   7:    if (x) y();\n");
        assert_eq!((report.executed, report.total), (0, 0));
    }

    #[test]
    fn negative_or_word_markers_are_skipped() {
        let report = analyze_listing("-1:1:x\nabc:2:y\n=====:3:z\n");
        assert_eq!(report.total, 0);
    }

    #[test]
    fn executed_never_exceeds_total() {
        let listings = [
            "",
            "1:1:a\n",
            "#####:1:a\n#####:2:b\n",
            "9:1:a\n-:2:b\n#####:3:c\n0:4:d\n",
        ];
        for l in listings {
            let r = analyze_listing(l);
            assert!(r.executed <= r.total, "listing {:?}", l);
        }
    }

    #[test]
    fn file_with_invalid_utf8_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.c.gcov");

        let mut bytes = b"    4:   1:int f() {\n".to_vec();
        bytes.extend_from_slice(b"#####:   2:  puts(\"\xff\xfe caf\xc3\");\n");
        bytes.extend_from_slice(b"    -:   3:}\n");
        fs::write(&path, bytes).unwrap();

        let report = analyze_file(&path).unwrap();
        assert_eq!((report.executed, report.total), (1, 2));
    }
}

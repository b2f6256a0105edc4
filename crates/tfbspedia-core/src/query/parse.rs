//! Query-string and batch-text parsing.
//!
//! A query string is a genomic location when it looks like `chrN,start,end`
//! or a bare `chrN`; anything else is a factor name.

use crate::config::SearchConfig;
use crate::error::{Result, TfbsError};
use crate::models::{GenomicRegion, SearchTarget};
use regex::Regex;
use std::sync::LazyLock;

static RANGED_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(chr(?:\d+|X|Y|M)),(\d+),(\d+)$").unwrap());

static WHOLE_CHROMOSOME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^chr(?:\d+|X|Y|M)$").unwrap());

/// Whether `text` is written as a genomic location.
pub fn is_location(text: &str) -> bool {
    RANGED_LOCATION.is_match(text) || WHOLE_CHROMOSOME.is_match(text)
}

/// Classify and parse one query string.
pub fn parse_search_query(text: &str) -> Result<SearchTarget> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TfbsError::invalid("query", "query must not be empty"));
    }

    if WHOLE_CHROMOSOME.is_match(text) {
        return Ok(SearchTarget::Location(GenomicRegion::chromosome(text)));
    }

    if let Some(caps) = RANGED_LOCATION.captures(text) {
        let coordinate = |i: usize| -> Result<i64> {
            caps[i].parse::<i64>().map_err(|_| {
                TfbsError::invalid("query", format!("coordinate '{}' is out of range", &caps[i]))
            })
        };
        let region = GenomicRegion::range(&caps[1], coordinate(2)?, coordinate(3)?);
        region.validate()?;
        return Ok(SearchTarget::Location(region));
    }

    Ok(SearchTarget::Name(text.to_string()))
}

/// Parse uploaded batch text into targets.
///
/// Accepts one query per line, either plain or as CSV where the first
/// column is the query. Blank lines and `#` comments are skipped and a
/// leading byte-order mark is ignored.
pub fn parse_batch_text(text: &str) -> Result<Vec<SearchTarget>> {
    if text.len() > SearchConfig::MAX_BATCH_TEXT_BYTES {
        return Err(TfbsError::invalid(
            "batch",
            format!(
                "batch text is {} bytes, limit is {}",
                text.len(),
                SearchConfig::MAX_BATCH_TEXT_BYTES
            ),
        ));
    }

    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut targets = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let line = line.strip_prefix('\u{feff}').unwrap_or(line).trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.trim_end_matches(',');
        let query = if is_location(line) {
            line
        } else {
            line.split(',').next().unwrap_or("").trim()
        };
        if query.is_empty() {
            continue;
        }

        targets.push(parse_search_query(query)?);
        if targets.len() > SearchConfig::MAX_BATCH_QUERIES {
            return Err(TfbsError::invalid(
                "batch",
                format!(
                    "more than {} queries in one batch",
                    SearchConfig::MAX_BATCH_QUERIES
                ),
            ));
        }
    }

    if targets.is_empty() {
        return Err(TfbsError::invalid("batch", "no valid queries found"));
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_detection() {
        assert!(is_location("chr1,10000,20000"));
        assert!(is_location("chr22"));
        assert!(is_location("chrX,1,2"));
        assert!(!is_location("CTCF"));
        assert!(!is_location("chr1,100"));
        assert!(!is_location("chr1, 100, 200"));
    }

    #[test]
    fn test_parse_search_query() {
        assert_eq!(
            parse_search_query("chr1,10000,20000").unwrap(),
            SearchTarget::Location(GenomicRegion::range("chr1", 10000, 20000))
        );
        assert_eq!(
            parse_search_query(" chrM ").unwrap(),
            SearchTarget::Location(GenomicRegion::chromosome("chrM"))
        );
        assert_eq!(
            parse_search_query("FOXP3").unwrap(),
            SearchTarget::Name("FOXP3".into())
        );
    }

    #[test]
    fn test_inverted_range_is_invalid() {
        let err = parse_search_query("chr1,500,100").unwrap_err();
        assert!(matches!(err, TfbsError::InvalidArgument { .. }));
        assert!(parse_search_query("").is_err());
    }

    #[test]
    fn test_parse_batch_text_mixed() {
        let text = "\u{feff}# uploaded\nCTCF,extra,columns\n\nchr1,100,200,\nGATA1\n  \nchr2\n";
        let targets = parse_batch_text(text).unwrap();
        assert_eq!(
            targets,
            vec![
                SearchTarget::Name("CTCF".into()),
                SearchTarget::Location(GenomicRegion::range("chr1", 100, 200)),
                SearchTarget::Name("GATA1".into()),
                SearchTarget::Location(GenomicRegion::chromosome("chr2")),
            ]
        );
    }

    #[test]
    fn test_parse_batch_text_rejects_empty() {
        assert!(parse_batch_text("").is_err());
        assert!(parse_batch_text("# only a comment\n\n").is_err());
        assert!(parse_batch_text(",,,\n").is_err());
    }

    #[test]
    fn test_parse_batch_text_query_limit() {
        let at_limit: String = (0..SearchConfig::MAX_BATCH_QUERIES)
            .map(|i| format!("TF{}\n", i))
            .collect();
        assert_eq!(
            parse_batch_text(&at_limit).unwrap().len(),
            SearchConfig::MAX_BATCH_QUERIES
        );

        let over = format!("{}EXTRA\n", at_limit);
        assert!(parse_batch_text(&over).is_err());
    }
}

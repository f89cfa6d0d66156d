//! Quarterly box-office listing parser
//!
//! A listing page is an HTML table with one header row followed by one row
//! per year. Each data row links to the year's detail page and to the #1
//! release of that quarter, and carries two money cells.

use crate::text::{parse_currency, title_case};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while parsing a listing page
///
/// Every variant is fatal for the page: the parser assumes stable markup and
/// does not skip malformed rows.
#[derive(Debug, Error)]
pub enum RankingParseError {
    /// A built-in CSS selector failed to compile
    #[error("Invalid selector {selector}: {message}")]
    InvalidSelector { selector: String, message: String },

    /// The page contains no table rows at all
    #[error("Listing page contains no table rows")]
    NoRows,

    /// A data row lacks one of its two links
    #[error("Row {row}: missing {which} link")]
    MissingLink { row: usize, which: &'static str },

    /// The year link has no `href`
    #[error("Row {row}: year link has no href")]
    MissingHref { row: usize },

    /// A data row lacks one of its two money cells
    #[error("Row {row}: missing {which} cell")]
    MissingMoneyCell { row: usize, which: &'static str },

    /// The year link text is not a number
    #[error("Row {row}: invalid year {value:?}")]
    InvalidYear { row: usize, value: String },

    /// A money cell does not hold a currency amount
    #[error("Row {row}: invalid amount {value:?}")]
    InvalidAmount { row: usize, value: String },
}

/// Error returned when a string is not a quarter label
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown quarter {0:?}, expected one of q1, q2, q3, q4")]
pub struct UnknownQuarter(pub String);

/// One of the four fixed quarters a calendar year is split into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// All quarters in calendar order
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    /// The label used in URLs and in the database
    pub fn label(self) -> &'static str {
        match self {
            Quarter::Q1 => "q1",
            Quarter::Q2 => "q2",
            Quarter::Q3 => "q3",
            Quarter::Q4 => "q4",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Quarter {
    type Err = UnknownQuarter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "q1" => Ok(Quarter::Q1),
            "q2" => Ok(Quarter::Q2),
            "q3" => Ok(Quarter::Q3),
            "q4" => Ok(Quarter::Q4),
            _ => Err(UnknownQuarter(s.to_string())),
        }
    }
}

/// One row of a quarterly listing: the top release of a year's quarter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRecord {
    /// Calendar year of the row
    pub year: i32,
    /// Quarter the listing page was fetched for
    pub quarter: Quarter,
    /// Title of the #1 release, title-cased
    pub title: String,
    /// Cumulative gross of the quarter, in dollars
    pub cumulative_gross: u64,
    /// Average gross per release, in dollars
    pub per_release_average_gross: u64,
    /// Absolute URL of the year's detail page
    pub detail_link: String,
}

/// Builds the listing URL for a quarter
pub fn listing_url(base_url: &str, quarter: Quarter) -> String {
    format!(
        "{}/quarter/{}/?grossesOption=calendarGrosses",
        base_url.trim_end_matches('/'),
        quarter
    )
}

/// Parses a listing page into ranking records
///
/// The first table row is treated as the header and skipped. Records are
/// returned in page order; no sorting or deduplication is applied.
///
/// # Arguments
///
/// * `html` - Raw markup of the listing page
/// * `quarter` - Quarter the page was fetched for
/// * `base_url` - Site root that relative detail links are resolved against
pub fn parse_rankings(
    html: &str,
    quarter: Quarter,
    base_url: &str,
) -> Result<Vec<RankingRecord>, RankingParseError> {
    let document = Html::parse_document(html);
    let row_sel = selector("tr")?;
    let link_sel = selector("a")?;
    let money_sel = selector("td.a-text-right.mojo-field-type-money")?;

    let mut rows = document.select(&row_sel);
    if rows.next().is_none() {
        return Err(RankingParseError::NoRows);
    }

    rows.enumerate()
        .map(|(index, row)| parse_row(row, index + 1, quarter, base_url, &link_sel, &money_sel))
        .collect()
}

fn parse_row(
    row: ElementRef<'_>,
    row_number: usize,
    quarter: Quarter,
    base_url: &str,
    link_sel: &Selector,
    money_sel: &Selector,
) -> Result<RankingRecord, RankingParseError> {
    let mut links = row.select(link_sel);
    let year_link = links.next().ok_or(RankingParseError::MissingLink {
        row: row_number,
        which: "year",
    })?;
    let title_link = links.next().ok_or(RankingParseError::MissingLink {
        row: row_number,
        which: "title",
    })?;

    let year_text = element_text(year_link);
    let year = year_text
        .parse()
        .map_err(|_| RankingParseError::InvalidYear {
            row: row_number,
            value: year_text.clone(),
        })?;

    let href = year_link
        .value()
        .attr("href")
        .ok_or(RankingParseError::MissingHref { row: row_number })?;

    let mut money = row.select(money_sel);
    let cumulative = money.next().ok_or(RankingParseError::MissingMoneyCell {
        row: row_number,
        which: "cumulative gross",
    })?;
    let average = money.next().ok_or(RankingParseError::MissingMoneyCell {
        row: row_number,
        which: "per-release average gross",
    })?;

    Ok(RankingRecord {
        year,
        quarter,
        title: title_case(&element_text(title_link)),
        cumulative_gross: parse_amount(cumulative, row_number)?,
        per_release_average_gross: parse_amount(average, row_number)?,
        detail_link: resolve_link(base_url, href),
    })
}

fn parse_amount(cell: ElementRef<'_>, row_number: usize) -> Result<u64, RankingParseError> {
    let text = element_text(cell);
    parse_currency(&text).ok_or(RankingParseError::InvalidAmount {
        row: row_number,
        value: text,
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn selector(css: &str) -> Result<Selector, RankingParseError> {
    Selector::parse(css).map_err(|e| RankingParseError::InvalidSelector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

/// Resolves a possibly relative link against the site root
fn resolve_link(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{}{}", base, href)
    } else {
        format!("{}/{}", base, href)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const BASE: &str = "https://www.boxofficemojo.com";

    /// Builds a listing page with a header row and one row per entry
    pub(crate) fn listing_page(rows: &[(i32, &str, &str, &str)]) -> String {
        let mut html = String::from(
            "<html><body><table>\
             <tr><th>Year</th><th>Cumulative Gross</th><th>Releases</th>\
             <th>Average</th><th>#1 Release</th></tr>",
        );
        for (year, title, gross, average) in rows {
            html.push_str(&format!(
                "<tr>\
                 <td class=\"a-text-left\"><a class=\"a-link-normal\" \
                 href=\"/quarter/q1/{year}/?grossesOption=calendarGrosses\">{year}</a></td>\
                 <td class=\"a-text-right mojo-field-type-money\">{gross}</td>\
                 <td class=\"a-text-right mojo-field-type-positive_integer\">121</td>\
                 <td class=\"a-text-right mojo-field-type-money\">{average}</td>\
                 <td class=\"a-text-left mojo-field-type-release\">\
                 <a class=\"a-link-normal\" href=\"/release/rl{year}/\">{title}</a></td>\
                 </tr>"
            ));
        }
        html.push_str("</table></body></html>");
        html
    }

    #[test]
    fn test_parses_rows_in_page_order() {
        let html = listing_page(&[
            (2019, "avengers: endgame", "$2,361,212,016", "$19,514,149"),
            (2018, "BLACK PANTHER", "$1,234,567", "$10,203"),
            (2017, "beauty and the beast", "$2,040,000,000", "$15,000,000"),
        ]);

        let records = parse_rankings(&html, Quarter::Q1, BASE).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].title, "Avengers: Endgame");
        assert_eq!(records[1].title, "Black Panther");
        assert_eq!(records[2].title, "Beauty And The Beast");
        // Page order is kept even though row 3 grossed more than row 2
        assert_eq!(
            records.iter().map(|r| r.year).collect::<Vec<_>>(),
            vec![2019, 2018, 2017]
        );
    }

    #[test]
    fn test_extracts_all_fields() {
        let html = listing_page(&[(2018, "black panther", "$1,234,567", "$10,203")]);

        let record = &parse_rankings(&html, Quarter::Q2, BASE).unwrap()[0];

        assert_eq!(
            record,
            &RankingRecord {
                year: 2018,
                quarter: Quarter::Q2,
                title: "Black Panther".to_string(),
                cumulative_gross: 1_234_567,
                per_release_average_gross: 10_203,
                detail_link:
                    "https://www.boxofficemojo.com/quarter/q1/2018/?grossesOption=calendarGrosses"
                        .to_string(),
            }
        );
    }

    #[test]
    fn test_header_only_page_yields_no_records() {
        let html = listing_page(&[]);
        assert!(parse_rankings(&html, Quarter::Q1, BASE).unwrap().is_empty());
    }

    #[test]
    fn test_page_without_rows_is_an_error() {
        let err = parse_rankings("<html><body><p>blocked</p></body></html>", Quarter::Q1, BASE)
            .unwrap_err();
        assert!(matches!(err, RankingParseError::NoRows));
    }

    #[test]
    fn test_row_missing_title_link_is_fatal() {
        let html = "<table><tr><th>Year</th></tr>\
                    <tr><td><a href=\"/quarter/q1/2019/\">2019</a></td>\
                    <td class=\"a-text-right mojo-field-type-money\">$1</td>\
                    <td class=\"a-text-right mojo-field-type-money\">$1</td></tr></table>";

        let err = parse_rankings(html, Quarter::Q1, BASE).unwrap_err();
        assert!(matches!(
            err,
            RankingParseError::MissingLink {
                row: 1,
                which: "title"
            }
        ));
    }

    #[test]
    fn test_row_missing_money_cell_is_fatal() {
        let html = "<table><tr><th>Year</th></tr>\
                    <tr><td><a href=\"/quarter/q1/2019/\">2019</a></td>\
                    <td class=\"a-text-right mojo-field-type-money\">$1</td>\
                    <td><a href=\"/release/rl1/\">joker</a></td></tr></table>";

        let err = parse_rankings(html, Quarter::Q1, BASE).unwrap_err();
        assert!(matches!(err, RankingParseError::MissingMoneyCell { row: 1, .. }));
    }

    #[test]
    fn test_invalid_amount_is_fatal() {
        let html = listing_page(&[(2019, "joker", "$1,000", "n/a")]);

        let err = parse_rankings(&html, Quarter::Q1, BASE).unwrap_err();
        assert!(matches!(err, RankingParseError::InvalidAmount { row: 1, ref value } if value == "n/a"));
    }

    #[test]
    fn test_invalid_year_is_fatal() {
        let html = "<table><tr><th>Year</th></tr>\
                    <tr><td><a href=\"/x/\">soon</a></td>\
                    <td class=\"a-text-right mojo-field-type-money\">$1</td>\
                    <td class=\"a-text-right mojo-field-type-money\">$1</td>\
                    <td><a href=\"/release/rl1/\">joker</a></td></tr></table>";

        let err = parse_rankings(html, Quarter::Q1, BASE).unwrap_err();
        assert!(matches!(err, RankingParseError::InvalidYear { row: 1, .. }));
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(resolve_link("https://a.com/", "/b/"), "https://a.com/b/");
        assert_eq!(resolve_link("https://a.com", "b/"), "https://a.com/b/");
        assert_eq!(resolve_link("https://a.com", "https://c.com/d"), "https://c.com/d");
    }

    #[test]
    fn test_listing_url() {
        assert_eq!(
            listing_url("https://www.boxofficemojo.com/", Quarter::Q3),
            "https://www.boxofficemojo.com/quarter/q3/?grossesOption=calendarGrosses"
        );
    }

    #[test]
    fn test_quarter_from_str() {
        assert_eq!("q1".parse::<Quarter>(), Ok(Quarter::Q1));
        assert_eq!("Q4".parse::<Quarter>(), Ok(Quarter::Q4));
        assert!("q5".parse::<Quarter>().is_err());
        assert_eq!(Quarter::Q2.to_string(), "q2");
    }
}

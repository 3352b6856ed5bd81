use super::ListingRecord;
use crate::normalize::clean_cell;
use anyhow::{bail, Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::{collections::HashMap, time::Duration};
use tracing::{debug, info};

/// Client for the vendor's HTML instrument listings (main venue and the
/// alternative segment). Fetches the table pages, canonicalizes their
/// headers and exposes record/symbol-map helpers.
#[derive(Clone)]
pub struct ListingClient {
    http: reqwest::Client,
    main_url: String,
    alt_url: String,
}

/// Vendor headers vary between the two venues; both spellings map onto one
/// canonical schema.
fn rename_header(header: &str) -> String {
    match header {
        "Abbreviation" => "Shortcut".to_string(),
        "Time of last trans." => "Last transaction time".to_string(),
        "Last trans. price" => "Last / Closing".to_string(),
        "Change v. ref. price" => "% change".to_string(),
        "Aggr. trade vol." => "Cumulated volume".to_string(),
        other => other.to_string(),
    }
}

fn cell_text(cell: ElementRef) -> String {
    clean_cell(&cell.text().collect::<String>())
}

/// Parses the first table of an HTML document into canonical records.
/// Rows with an empty `Shortcut` are dropped.
pub fn parse_listing_table(html: &str) -> Result<Vec<ListingRecord>> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let header_sel = Selector::parse("th").unwrap();
    let cell_sel = Selector::parse("td").unwrap();

    let table = match document.select(&table_sel).next() {
        Some(t) => t,
        None => bail!("No tables found in the listing response"),
    };

    let headers: Vec<String> = table
        .select(&header_sel)
        .map(|th| rename_header(&cell_text(th)))
        .collect();
    if headers.is_empty() {
        bail!("Listing table has no header row");
    }

    let mut records = vec![];
    for row in table.select(&row_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        if cells.is_empty() {
            // Header row, or decorative markup.
            continue;
        }
        let by_header: HashMap<&str, &str> = headers
            .iter()
            .zip(cells.iter())
            .map(|(h, c)| (h.as_str(), c.as_str()))
            .collect();

        let shortcut = by_header.get("Shortcut").copied().unwrap_or_default();
        if shortcut.is_empty() {
            continue;
        }
        let get = |key: &str| by_header.get(key).map(|v| v.to_string());
        records.push(ListingRecord {
            name: get("Name"),
            shortcut: shortcut.to_string(),
            isin: get("ISIN"),
            last: get("Last / Closing"),
            change_pct: get("% change"),
            volume: get("Cumulated volume"),
            last_trade_time: get("Last transaction time"),
        });
    }
    debug!(rows = records.len(), "Parsed listing table");
    Ok(records)
}

impl ListingClient {
    pub fn new(main_url: String, alt_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build listing HTTP client")?;
        Ok(Self {
            http,
            main_url,
            alt_url,
        })
    }

    pub async fn fetch_records(&self, url: &str) -> Result<Vec<ListingRecord>> {
        info!(url = url, "Fetching listing table");
        let body = self
            .http
            .get(url)
            .send()
            .await
            .context("Listing request failed")?
            .error_for_status()
            .context("Listing request returned an error status")?
            .text()
            .await
            .context("Failed to read listing body")?;
        parse_listing_table(&body)
    }

    async fn records_for_mic(&self, mic: Option<&str>) -> Result<Vec<ListingRecord>> {
        match mic {
            Some("XWAR") => self.fetch_records(&self.main_url).await,
            Some("XNCO") => self.fetch_records(&self.alt_url).await,
            // Both venues otherwise.
            _ => {
                let (main, alt) = tokio::join!(
                    self.fetch_records(&self.main_url),
                    self.fetch_records(&self.alt_url)
                );
                let mut records = main?;
                records.extend(alt?);
                Ok(records)
            },
        }
    }

    /// Symbol -> record map used to fill missing ISO-6166 codes and to feed
    /// the alternate (table-only) ingestion path.
    pub async fn symbol_map(&self, mic: Option<&str>) -> Result<HashMap<String, ListingRecord>> {
        let records = self.records_for_mic(mic).await?;
        Ok(records
            .into_iter()
            .filter(|r| !r.shortcut.is_empty())
            .map(|r| (r.shortcut.clone(), r))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_HTML: &str = r#"
        <html><body>
        <table>
          <tr>
            <th>Name</th><th>Abbreviation</th><th>ISIN</th>
            <th>Last trans. price</th><th>Change v. ref. price</th>
            <th>Aggr. trade vol.</th><th>Time of last trans.</th>
          </tr>
          <tr>
            <td>ORLEN</td><td>PKN</td><td>PLPKN0000018</td>
            <td>64,52</td><td>-1,15</td><td>1&nbsp;204&nbsp;511</td><td>16:45:12</td>
          </tr>
          <tr>
            <td>NAMELESS</td><td></td><td></td><td></td><td></td><td></td><td></td>
          </tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_table_renames_and_subsets() {
        let records = parse_listing_table(LISTING_HTML).unwrap();
        // The row without a Shortcut is dropped.
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.shortcut, "PKN");
        assert_eq!(rec.name.as_deref(), Some("ORLEN"));
        assert_eq!(rec.isin.as_deref(), Some("PLPKN0000018"));
        assert_eq!(rec.last.as_deref(), Some("64,52"));
        assert_eq!(rec.change_pct.as_deref(), Some("-1,15"));
        assert_eq!(rec.volume.as_deref(), Some("1 204 511"));
        assert_eq!(rec.last_trade_time.as_deref(), Some("16:45:12"));
    }

    #[test]
    fn test_parse_listing_table_no_table() {
        assert!(parse_listing_table("<html><body><p>maintenance</p></body></html>").is_err());
    }
}

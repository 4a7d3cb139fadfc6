//! Google Books metadata lookup: used to pre-fill the book registration
//! form from an ISBN. Only the first result is considered, and a missing
//! ISBN_13 identifier yields a clean "not found" instead of a fault.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::GoogleBooksConfig;

const ISBN_13: &str = "ISBN_13";

/// Metadata extracted from the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMetadata {
    pub title: String,
    pub author: Option<String>,
    pub isbn: String,
    pub publish_year: Option<String>,
    pub publisher: Option<String>,
    pub genres: Vec<String>,
    pub description: Option<String>,
}

#[async_trait]
pub trait BookMetadataClient: Send + Sync {
    /// `Ok(None)` covers every expected miss: no results, no volume info,
    /// no ISBN_13 entry. Errors are reserved for transport failures.
    async fn lookup(&self, isbn: &str) -> anyhow::Result<Option<BookMetadata>>;
}

pub struct GoogleBooksClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleBooksClient {
    pub fn new(config: &GoogleBooksConfig) -> anyhow::Result<Self> {
        // bounded timeout; the upstream has none of its own
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl BookMetadataClient for GoogleBooksClient {
    async fn lookup(&self, isbn: &str) -> anyhow::Result<Option<BookMetadata>> {
        let url = format!("{}/volumes", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("q", isbn), ("maxResults", "1"), ("langRestrict", "en")])
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "metadata lookup non-success");
            return Ok(None);
        }

        let volumes: VolumesResponse = response.json().await?;
        Ok(first_metadata(volumes))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VolumesResponse {
    items: Option<Vec<Volume>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Volume {
    volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    industry_identifiers: Vec<IndustryIdentifier>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

fn first_metadata(volumes: VolumesResponse) -> Option<BookMetadata> {
    volumes
        .items
        .into_iter()
        .flatten()
        .next()
        .and_then(|v| v.volume_info)
        .and_then(metadata_from)
}

fn metadata_from(info: VolumeInfo) -> Option<BookMetadata> {
    let title = info.title?;
    let isbn = info
        .industry_identifiers
        .iter()
        .find(|i| i.kind == ISBN_13)
        .map(|i| i.identifier.clone())?;
    // publish year is the portion of publishedDate before the first hyphen
    let publish_year = info
        .published_date
        .as_deref()
        .and_then(|d| d.split('-').next())
        .map(str::to_owned);

    Some(BookMetadata {
        title,
        author: info.authors.into_iter().next(),
        isbn,
        publish_year,
        publisher: info.publisher,
        genres: Vec::new(),
        description: info.description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> VolumesResponse {
        serde_json::from_str(json).expect("fixture parses")
    }

    #[test]
    fn extracts_first_volume_fields() {
        let volumes = parse(
            r#"{
              "items": [{
                "volumeInfo": {
                  "title": "The Hobbit",
                  "authors": ["J. R. R. Tolkien", "Someone Else"],
                  "publisher": "Allen & Unwin",
                  "publishedDate": "1937-09-21",
                  "description": "A hole in the ground.",
                  "industryIdentifiers": [
                    {"type": "ISBN_10", "identifier": "0000000000"},
                    {"type": "ISBN_13", "identifier": "9780000000001"}
                  ]
                }
              }]
            }"#,
        );
        let metadata = first_metadata(volumes).expect("metadata");
        assert_eq!(metadata.title, "The Hobbit");
        assert_eq!(metadata.author.as_deref(), Some("J. R. R. Tolkien"));
        assert_eq!(metadata.isbn, "9780000000001");
        assert_eq!(metadata.publish_year.as_deref(), Some("1937"));
        assert_eq!(metadata.publisher.as_deref(), Some("Allen & Unwin"));
        assert!(metadata.genres.is_empty());
    }

    #[test]
    fn year_only_published_date_passes_through() {
        let volumes = parse(
            r#"{
              "items": [{
                "volumeInfo": {
                  "title": "Dune",
                  "publishedDate": "1965",
                  "industryIdentifiers": [{"type": "ISBN_13", "identifier": "9780441013593"}]
                }
              }]
            }"#,
        );
        let metadata = first_metadata(volumes).expect("metadata");
        assert_eq!(metadata.publish_year.as_deref(), Some("1965"));
        assert!(metadata.author.is_none());
    }

    #[test]
    fn missing_items_is_not_found() {
        assert!(first_metadata(parse(r#"{}"#)).is_none());
        assert!(first_metadata(parse(r#"{"items": []}"#)).is_none());
    }

    #[test]
    fn missing_isbn_13_entry_is_not_found() {
        let volumes = parse(
            r#"{
              "items": [{
                "volumeInfo": {
                  "title": "Untracked",
                  "industryIdentifiers": [{"type": "ISBN_10", "identifier": "0000000000"}]
                }
              }]
            }"#,
        );
        assert!(first_metadata(volumes).is_none());
    }

    #[test]
    fn missing_volume_info_is_not_found() {
        assert!(first_metadata(parse(r#"{"items": [{}]}"#)).is_none());
    }
}

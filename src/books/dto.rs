use serde::{Deserialize, Serialize};

/// Sparse search request; every field is optional and a blank value counts
/// as absent. Never persisted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchCriteria {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publish_year: Option<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct IsbnQuery {
    #[serde(default)]
    pub isbn: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

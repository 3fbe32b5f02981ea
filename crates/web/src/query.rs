//! GET-style query parameters.
//!
//! The query string is decoded with `serde_urlencoded`. Lookups by name return
//! the last occurrence, and every occurrence stays available through
//! [`QueryParams::get_all`]. Typed access goes through
//! [`QueryParams::deserialize`]:
//!
//! ```
//! # use serde::Deserialize;
//! # use sealed_web::QueryParams;
//! #[derive(Deserialize)]
//! struct Download {
//!     chunked: Option<u8>,
//! }
//!
//! let params = QueryParams::parse("chunked=1").unwrap();
//! let download: Download = params.deserialize().unwrap();
//! assert_eq!(download.chunked, Some(1));
//! ```

use sealed_http::protocol::StatusError;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    raw: String,
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decodes `query`, the part of the target after `?`.
    pub fn parse(query: &str) -> Result<Self, StatusError> {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .map_err(|e| StatusError::bad_request().with_reason(format!("Bad Query String {e}")))?;
        Ok(Self { raw: query.to_owned(), pairs })
    }

    /// The last value given for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().rev().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs.iter().filter(move |(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(key, _)| key == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Deserializes the whole query into `T`, failing with 400.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, StatusError> {
        serde_urlencoded::from_str::<T>(&self.raw)
            .map_err(|e| StatusError::bad_request().with_reason(format!("Bad Query String {e}")))
    }
}

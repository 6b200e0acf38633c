use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const MAX_PER_PAGE: u32 = 100;

fn default_page() -> u32 {
	1
}

fn default_per_page() -> u32 {
	10
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub filters: SearchFilters,
	#[serde(default)]
	pub sort: SortMode,
	#[serde(default = "default_page")]
	pub page: u32,
	#[serde(default = "default_per_page")]
	pub per_page: u32,
	#[serde(default)]
	pub search_in: Option<Vec<SearchField>>,
}
impl SearchRequest {
	pub fn validate(&self) -> Result<()> {
		if self.query.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}
		if self.page == 0 {
			return Err(Error::InvalidRequest {
				message: "page must be at least 1.".to_string(),
			});
		}
		if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
			return Err(Error::InvalidRequest {
				message: format!("per_page must be between 1 and {MAX_PER_PAGE}."),
			});
		}

		Ok(())
	}
}

/// Enumerated filter options. Absent and empty values are equivalent: both
/// compile to nothing and are dropped from the cache key.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchFilters {
	#[serde(default)]
	pub year_from: Option<i32>,
	#[serde(default)]
	pub year_to: Option<i32>,
	#[serde(default)]
	pub field_associated: Option<String>,
	#[serde(default)]
	pub document_type: Option<String>,
	#[serde(default)]
	pub document_types: Option<Vec<String>>,
	#[serde(default)]
	pub subject_area: Option<Vec<String>>,
	#[serde(default)]
	pub author_id: Option<String>,
	#[serde(default)]
	pub affiliation: Option<String>,
	#[serde(default)]
	pub first_author_only: Option<bool>,
	#[serde(default)]
	pub interdisciplinary: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
	#[default]
	Relevance,
	Date,
	Citations,
	Impact,
	Normalized,
}
impl SortMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Relevance => "relevance",
			Self::Date => "date",
			Self::Citations => "citations",
			Self::Impact => "impact",
			Self::Normalized => "normalized",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
	Title,
	Abstract,
	Author,
	SubjectArea,
	Field,
}
impl SearchField {
	pub const DEFAULT_SET: [Self; 5] =
		[Self::Title, Self::Abstract, Self::Author, Self::SubjectArea, Self::Field];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Title => "title",
			Self::Abstract => "abstract",
			Self::Author => "author",
			Self::SubjectArea => "subject_area",
			Self::Field => "field",
		}
	}
}

/// The effective `search_in` set: the default five logical fields when the
/// request leaves it absent or empty.
pub fn effective_search_in(search_in: Option<&[SearchField]>) -> Vec<SearchField> {
	match search_in {
		Some(fields) if !fields.is_empty() => fields.to_vec(),
		_ => SearchField::DEFAULT_SET.to_vec(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(query: &str, per_page: u32) -> SearchRequest {
		SearchRequest {
			query: query.to_string(),
			filters: SearchFilters::default(),
			sort: SortMode::default(),
			page: 1,
			per_page,
			search_in: None,
		}
	}

	#[test]
	fn rejects_empty_query() {
		assert!(request("", 10).validate().is_err());
		assert!(request("   ", 10).validate().is_err());
		assert!(request("nanotubes", 10).validate().is_ok());
	}

	#[test]
	fn per_page_bounds() {
		assert!(request("q", 0).validate().is_err());
		assert!(request("q", 1).validate().is_ok());
		assert!(request("q", 100).validate().is_ok());
		assert!(request("q", 101).validate().is_err());
	}

	#[test]
	fn sort_mode_deserializes_lowercase() {
		let sort: SortMode = serde_json::from_str("\"impact\"").expect("parse sort");

		assert_eq!(sort, SortMode::Impact);

		let default: SortMode = SortMode::default();

		assert_eq!(default, SortMode::Relevance);
	}

	#[test]
	fn effective_search_in_defaults_when_absent_or_empty() {
		assert_eq!(effective_search_in(None), SearchField::DEFAULT_SET.to_vec());
		assert_eq!(effective_search_in(Some(&[])), SearchField::DEFAULT_SET.to_vec());
		assert_eq!(
			effective_search_in(Some(&[SearchField::Title])),
			vec![SearchField::Title]
		);
	}
}

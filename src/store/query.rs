//! List queries shared by every repository: case-insensitive search across a
//! record's text fields, equality filters on categorical fields, skip/limit
//! pagination.
//!
//! A query renders to a BSON filter for MongoDB and evaluates directly against
//! a JSON rendering of a record for the in-memory backend. Both paths follow
//! the same rules: search matches a substring of any search field (or any
//! element of an array field), filters match a string field exactly (or any
//! element of an array field).

use std::collections::HashMap;

use mongodb::bson::{doc, Bson, Document};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub filters: Vec<(String, String)>,
    pub skip: u64,
    pub limit: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self { search: None, filters: Vec::new(), skip: 0, limit: DEFAULT_LIMIT }
    }
}

impl ListQuery {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let s = search.into();
        let trimmed = s.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    /// Build from raw query-string parameters.
    ///
    /// Recognises `search`, `skip`, `page` (1-based, wins over `skip`),
    /// `limit`, and any of `filter_fields` with a non-empty value.
    pub fn from_params(params: &HashMap<String, String>, filter_fields: &[&str]) -> Result<Self, AppError> {
        let mut query = ListQuery::default();
        if let Some(search) = params.get("search") {
            query = query.with_search(search.as_str());
        }
        for field in filter_fields {
            if let Some(value) = params.get(*field).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                query = query.with_filter(*field, value);
            }
        }
        if let Some(limit) = params.get("limit") {
            let limit: i64 = limit
                .parse()
                .map_err(|_| AppError::validation(format!("invalid limit: {limit}")))?;
            query = query.with_limit(limit);
        }
        if let Some(skip) = params.get("skip") {
            query.skip = skip
                .parse()
                .ok()
                .filter(|s| *s <= i64::MAX as u64)
                .ok_or_else(|| AppError::validation(format!("invalid skip: {skip}")))?;
        }
        if let Some(page) = params.get("page") {
            let page: u64 = page
                .parse()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| AppError::validation(format!("invalid page: {page}")))?;
            query.skip = (page - 1)
                .checked_mul(query.limit as u64)
                .filter(|skip| *skip <= i64::MAX as u64)
                .ok_or_else(|| AppError::validation(format!("invalid page: {page}")))?;
        }
        Ok(query)
    }

    /// MongoDB filter document for this query.
    pub fn to_filter(&self, search_fields: &[&str]) -> Document {
        let mut filter = Document::new();
        for (field, value) in &self.filters {
            filter.insert(field.clone(), value.clone());
        }
        if let Some(search) = &self.search {
            let pattern = regex::escape(search);
            let clauses: Vec<Bson> = search_fields
                .iter()
                .map(|f| {
                    let mut clause = Document::new();
                    clause.insert(*f, doc! { "$regex": pattern.clone(), "$options": "i" });
                    Bson::Document(clause)
                })
                .collect();
            if !clauses.is_empty() {
                filter.insert("$or", clauses);
            }
        }
        filter
    }

    /// Compiled search matcher for the in-memory backend.
    pub fn search_matcher(&self) -> Option<Regex> {
        self.search.as_ref().and_then(|s| {
            RegexBuilder::new(&regex::escape(s)).case_insensitive(true).build().ok()
        })
    }

    /// In-memory equivalent of [`to_filter`](Self::to_filter).
    pub fn matches(&self, record: &Value, search_fields: &[&str], matcher: Option<&Regex>) -> bool {
        let filters_ok = self.filters.iter().all(|(field, expected)| match record.get(field) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Array(items)) => items.iter().any(|i| i.as_str() == Some(expected.as_str())),
            _ => false,
        });
        if !filters_ok {
            return false;
        }
        let Some(re) = matcher else { return true };
        search_fields.iter().any(|f| match record.get(*f) {
            Some(Value::String(s)) => re.is_match(s),
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).any(|s| re.is_match(s)),
            _ => false,
        })
    }
}

/// One page of results plus the total matching count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub skip: u64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            skip: self.skip,
            limit: self.limit,
        }
    }
}

/// Result row of a count-by-field breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCount {
    pub value: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn params_build_filters_and_page() {
        let q = ListQuery::from_params(
            &params(&[("search", " quad "), ("subject", "Maths"), ("level", ""), ("page", "3"), ("limit", "10")]),
            &["subject", "level"],
        )
        .unwrap();
        assert_eq!(q.search.as_deref(), Some("quad"));
        assert_eq!(q.filters, vec![("subject".to_string(), "Maths".to_string())]);
        assert_eq!(q.limit, 10);
        assert_eq!(q.skip, 20);
    }

    #[test]
    fn limit_is_clamped() {
        let q = ListQuery::from_params(&params(&[("limit", "5000")]), &[]).unwrap();
        assert_eq!(q.limit, MAX_LIMIT);
    }

    #[test]
    fn bad_numbers_are_validation_errors() {
        assert!(ListQuery::from_params(&params(&[("page", "0")]), &[]).is_err());
        assert!(ListQuery::from_params(&params(&[("skip", "-1")]), &[]).is_err());
        assert!(ListQuery::from_params(&params(&[("limit", "ten")]), &[]).is_err());
    }

    #[test]
    fn page_past_the_addressable_range_is_rejected() {
        let err = ListQuery::from_params(&params(&[("page", "1000000000000000000")]), &[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let q = ListQuery::from_params(&params(&[("page", "1000000000000000000"), ("limit", "1")]), &[]).unwrap();
        assert_eq!(q.skip, 999_999_999_999_999_999);
    }

    #[test]
    fn mongo_filter_escapes_search() {
        let q = ListQuery::default().with_search("a+b").with_filter("role", "student");
        let filter = q.to_filter(&["name", "email"]);
        assert_eq!(filter.get_str("role").unwrap(), "student");
        let or = filter.get_array("$or").unwrap();
        assert_eq!(or.len(), 2);
        let first = or[0].as_document().unwrap().get_document("name").unwrap();
        assert_eq!(first.get_str("$regex").unwrap(), r"a\+b");
        assert_eq!(first.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn memory_match_is_case_insensitive_and_covers_arrays() {
        let record = json!({ "title": "Quadratic Equations", "tags": ["Factorising"], "subject": "Maths" });
        let q = ListQuery::default().with_search("factor").with_filter("subject", "Maths");
        let re = q.search_matcher();
        assert!(q.matches(&record, &["title", "tags"], re.as_ref()));

        let q = ListQuery::default().with_filter("subject", "maths");
        assert!(!q.matches(&record, &["title"], None));
    }
}

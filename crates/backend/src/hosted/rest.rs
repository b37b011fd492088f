//! Query-string builder for the hosted REST API.
//!
//! Tables are exposed at `rest/v1/{table}`. Filters are query parameters of
//! the form `column=operator.value`, ordering is `order=column.asc`, and row
//! limits are `limit=n`.

use std::fmt::Display;

use url::Url;

/// A request against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestQuery {
    table: &'static str,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
    on_conflict: Option<&'static str>,
}

impl RestQuery {
    /// Select all columns of `table`.
    #[must_use]
    pub const fn table(table: &'static str) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            on_conflict: None,
        }
    }

    /// `column = value`
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Case-insensitive substring match.
    ///
    /// Wildcards and reserved characters in `needle` are stripped so user
    /// input cannot widen the pattern.
    #[must_use]
    pub fn contains_ci(mut self, column: &str, needle: &str) -> Self {
        let cleaned: String = needle
            .trim()
            .chars()
            .filter(|c| !matches!(c, '*' | '%' | ',' | '(' | ')' | '"' | '\\'))
            .collect();
        if !cleaned.is_empty() {
            self.filters
                .push((column.to_string(), format!("ilike.*{cleaned}*")));
        }
        self
    }

    #[must_use]
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{column}.{direction}"));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Column used to detect duplicates on upsert.
    #[must_use]
    pub const fn on_conflict(mut self, column: &'static str) -> Self {
        self.on_conflict = Some(column);
        self
    }

    #[must_use]
    pub const fn table_name(&self) -> &'static str {
        self.table
    }

    /// Absolute URL of the request beneath `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table path cannot be joined onto `base`.
    pub fn url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut url = base.join(&format!("rest/v1/{}", self.table))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for (column, filter) in &self.filters {
                pairs.append_pair(column, filter);
            }
            if !self.order.is_empty() {
                pairs.append_pair("order", &self.order.join(","));
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(column) = self.on_conflict {
                pairs.append_pair("on_conflict", column);
            }
        }
        Ok(url)
    }
}

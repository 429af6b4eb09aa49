use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Sort key accepted by the upstream search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    Title,
    #[default]
    Score,
    ScoredBy,
    Rank,
    Popularity,
    Members,
    Episodes,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Score => "score",
            Self::ScoredBy => "scored_by",
            Self::Rank => "rank",
            Self::Popularity => "popularity",
            Self::Members => "members",
            Self::Episodes => "episodes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Structured search criteria, compiled into upstream query parameters.
///
/// A value equal to a field's unset sentinel (empty string, empty list,
/// 0/10 score bounds, 1960/next-year year bounds) omits that parameter so
/// the upstream default applies. Immutable per search: build a new value
/// for each invocation.
///
/// Fields deserialize individually with defaults, so a partially valid
/// stored document merges over the default filter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub query: String,
    pub genres: Vec<i64>,
    pub media_type: String,
    pub status: String,
    pub min_score: f64,
    pub max_score: f64,
    pub start_year: i32,
    pub end_year: i32,
    pub order_by: OrderBy,
    pub sort: SortDirection,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            query: String::new(),
            genres: Vec::new(),
            media_type: String::new(),
            status: String::new(),
            min_score: 0.0,
            max_score: 10.0,
            start_year: 1960,
            end_year: current_year() + 1,
            order_by: OrderBy::default(),
            sort: SortDirection::default(),
        }
    }
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

impl SearchFilters {
    /// Compile into the upstream query-parameter list.
    ///
    /// Conditional parameters are appended in a fixed order, then
    /// `order_by`, `sort`, `page` and `limit` are always appended. The
    /// upper year bound is compared against the calendar year at call
    /// time, not the year the filter value was built.
    pub fn query_params(&self, page: u32, limit: u32) -> Vec<(&'static str, String)> {
        self.query_params_at(page, limit, current_year())
    }

    fn query_params_at(
        &self,
        page: u32,
        limit: u32,
        current_year: i32,
    ) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if !self.query.is_empty() {
            params.push(("q", self.query.clone()));
        }
        if !self.media_type.is_empty() {
            params.push(("type", self.media_type.clone()));
        }
        if !self.status.is_empty() {
            params.push(("status", self.status.clone()));
        }
        if !self.genres.is_empty() {
            let joined = self
                .genres
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            params.push(("genres", joined));
        }
        if self.min_score > 0.0 {
            params.push(("min_score", self.min_score.to_string()));
        }
        if self.max_score < 10.0 {
            params.push(("max_score", self.max_score.to_string()));
        }
        if self.start_year > 1960 {
            params.push(("start_date", format!("{}-01-01", self.start_year)));
        }
        if self.end_year < current_year + 1 {
            params.push(("end_date", format!("{}-12-31", self.end_year)));
        }

        params.push(("order_by", self.order_by.as_str().to_string()));
        params.push(("sort", self.sort.as_str().to_string()));
        params.push(("page", page.to_string()));
        params.push(("limit", limit.to_string()));

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(params: &[(&'static str, String)]) -> Vec<&'static str> {
        params.iter().map(|(key, _)| *key).collect()
    }

    fn value<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn default_filters_emit_only_mandatory_params() {
        let params = SearchFilters::default().query_params(1, 25);
        assert_eq!(keys(&params), vec!["order_by", "sort", "page", "limit"]);
        assert_eq!(value(&params, "order_by"), Some("score"));
        assert_eq!(value(&params, "sort"), Some("desc"));
        assert_eq!(value(&params, "page"), Some("1"));
        assert_eq!(value(&params, "limit"), Some("25"));
    }

    #[test]
    fn min_score_included_only_when_positive() {
        let mut filters = SearchFilters::default();
        filters.min_score = 7.5;
        let params = filters.query_params(1, 25);
        assert_eq!(value(&params, "min_score"), Some("7.5"));

        filters.min_score = 0.0;
        let params = filters.query_params(1, 25);
        assert_eq!(value(&params, "min_score"), None);
    }

    #[test]
    fn max_score_included_only_below_ten() {
        let mut filters = SearchFilters::default();
        filters.max_score = 8.0;
        let params = filters.query_params(1, 25);
        assert_eq!(value(&params, "max_score"), Some("8"));

        filters.max_score = 10.0;
        let params = filters.query_params(1, 25);
        assert_eq!(value(&params, "max_score"), None);
    }

    #[test]
    fn genres_join_in_stored_order() {
        let mut filters = SearchFilters::default();
        filters.genres = vec![4, 1, 22];
        let params = filters.query_params(1, 25);
        assert_eq!(value(&params, "genres"), Some("4,1,22"));
    }

    #[test]
    fn year_bounds_use_sentinels() {
        let mut filters = SearchFilters::default();
        filters.start_year = 1999;
        filters.end_year = 2005;
        let params = filters.query_params(1, 25);
        assert_eq!(value(&params, "start_date"), Some("1999-01-01"));
        assert_eq!(value(&params, "end_date"), Some("2005-12-31"));

        filters.start_year = 1960;
        filters.end_year = current_year() + 1;
        let params = filters.query_params(1, 25);
        assert_eq!(value(&params, "start_date"), None);
        assert_eq!(value(&params, "end_date"), None);
    }

    #[test]
    fn end_year_bound_is_evaluated_at_call_time() {
        // Default end_year is the sentinel for the year the value is built.
        let filters = SearchFilters::default();
        let params = filters.query_params_at(1, 25, current_year());
        assert_eq!(value(&params, "end_date"), None);

        // One calendar year later, the same stored value is below the new
        // sentinel and must be emitted.
        let params = filters.query_params_at(1, 25, current_year() + 1);
        let expected = format!("{}-12-31", filters.end_year);
        assert_eq!(value(&params, "end_date"), Some(expected.as_str()));
    }

    #[test]
    fn text_and_type_params_skip_empty_values() {
        let mut filters = SearchFilters::default();
        filters.query = "frieren".to_string();
        filters.media_type = "tv".to_string();
        filters.status = "airing".to_string();
        let params = filters.query_params(2, 10);
        assert_eq!(
            keys(&params),
            vec!["q", "type", "status", "order_by", "sort", "page", "limit"]
        );
        assert_eq!(value(&params, "q"), Some("frieren"));
        assert_eq!(value(&params, "page"), Some("2"));
    }

    #[test]
    fn partial_stored_document_merges_over_defaults() {
        let filters: SearchFilters =
            serde_json::from_str(r#"{ "query": "bebop", "min_score": 8.0 }"#).unwrap();
        assert_eq!(filters.query, "bebop");
        assert_eq!(filters.min_score, 8.0);
        assert_eq!(filters.max_score, 10.0);
        assert_eq!(filters.start_year, 1960);
        assert_eq!(filters.order_by, OrderBy::Score);
    }
}

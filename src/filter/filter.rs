use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{AgeFilter, CatQuery, Comparison, SqlParam, SqlResult};
use crate::config::FilterConfig;
use crate::database::models::{Cat, Race, Sex};

pub(crate) const CAT_COLUMNS: &str = "\"id\", \"owner_user_id\", \"name\", \"race\", \"sex\", \"age_in_month\", \
     \"description\", \"image_urls\", \"has_matched\", \"created_at\", \"deleted_at\"";

/// Typed listing criteria for cats. Soft-deleted cats are always excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct CatFilter {
    pub id: Option<i64>,
    pub race: Option<Race>,
    pub sex: Option<Sex>,
    pub has_matched: Option<bool>,
    pub age: Option<AgeFilter>,
    /// `Some(true)`: only the caller's cats; `Some(false)`: only other users' cats.
    pub owned: Option<bool>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl CatFilter {
    pub fn new(limit: i64) -> Self {
        Self {
            id: None,
            race: None,
            sex: None,
            has_matched: None,
            age: None,
            owned: None,
            search: None,
            limit,
            offset: 0,
        }
    }

    /// Parse raw query parameters. Empty strings count as absent.
    pub fn from_query(query: &CatQuery, config: &FilterConfig) -> Result<Self, FilterError> {
        let mut filter = Self::new(config.default_limit);

        if let Some(v) = present(&query.id) {
            filter.id = Some(v.parse().map_err(|_| invalid("id", v))?);
        }
        if let Some(v) = present(&query.race) {
            filter.race = Some(v.parse().map_err(|_| invalid("race", v))?);
        }
        if let Some(v) = present(&query.sex) {
            filter.sex = Some(v.parse().map_err(|_| invalid("sex", v))?);
        }
        if let Some(v) = present(&query.has_matched) {
            filter.has_matched = Some(parse_bool("hasMatched", v)?);
        }
        if let Some(v) = present(&query.age_in_month) {
            filter.age = Some(parse_age(v)?);
        }
        if let Some(v) = present(&query.owned) {
            filter.owned = Some(parse_bool("owned", v)?);
        }
        if let Some(v) = present(&query.search) {
            filter.search = Some(v.to_string());
        }
        if let Some(v) = present(&query.limit) {
            let limit: i64 = v.parse().map_err(|_| FilterError::InvalidLimit(v.to_string()))?;
            if limit < 0 {
                return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
            }
            if limit > config.max_limit {
                tracing::debug!("Limit {} exceeds max {}, capping to max", limit, config.max_limit);
            }
            filter.limit = limit.min(config.max_limit);
        }
        if let Some(v) = present(&query.offset) {
            let offset: i64 = v.parse().map_err(|_| FilterError::InvalidOffset(v.to_string()))?;
            if offset < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
            filter.offset = offset;
        }

        Ok(filter)
    }

    /// Parameterized `SELECT` for this filter as seen by `caller_id`.
    pub fn to_sql(&self, caller_id: i64) -> SqlResult {
        let mut w = FilterWhere::new(0);
        w.raw("\"deleted_at\" IS NULL");

        if let Some(id) = self.id {
            w.eq("id", SqlParam::Int(id));
        }
        if let Some(race) = self.race {
            w.eq("race", SqlParam::Text(race.as_str().to_string()));
        }
        if let Some(sex) = self.sex {
            w.eq("sex", SqlParam::Text(sex.as_str().to_string()));
        }
        if let Some(has_matched) = self.has_matched {
            w.eq("has_matched", SqlParam::Bool(has_matched));
        }
        if let Some(age) = self.age {
            w.compare("age_in_month", age.comparison, SqlParam::Int(age.value as i64));
        }
        match self.owned {
            Some(true) => {
                w.eq("owner_user_id", SqlParam::Int(caller_id));
            }
            Some(false) => {
                w.ne("owner_user_id", SqlParam::Int(caller_id));
            }
            None => {}
        }
        if let Some(search) = &self.search {
            w.contains("name", search);
        }

        let limit = w.param(SqlParam::Int(self.limit));
        let offset = w.param(SqlParam::Int(self.offset));
        let (where_clause, params) = w.build();

        let query = [
            format!("SELECT {}", CAT_COLUMNS),
            "FROM \"cats\"".to_string(),
            format!("WHERE {}", where_clause),
            FilterOrder::generate(&FilterOrder::newest_first()),
            format!("LIMIT {} OFFSET {}", limit, offset),
        ]
        .join(" ");

        SqlResult { query, params }
    }

    /// In-process evaluation of the same predicate as `to_sql`, without paging.
    pub fn matches(&self, cat: &Cat, caller_id: i64) -> bool {
        if cat.is_deleted() {
            return false;
        }
        if self.id.is_some_and(|id| cat.id != id) {
            return false;
        }
        if self.race.is_some_and(|race| cat.race != race) {
            return false;
        }
        if self.sex.is_some_and(|sex| cat.sex != sex) {
            return false;
        }
        if self.has_matched.is_some_and(|m| cat.has_matched != m) {
            return false;
        }
        if let Some(age) = self.age {
            if !age.comparison.holds(cat.age_in_month, age.value) {
                return false;
            }
        }
        if let Some(owned) = self.owned {
            if (cat.owner_user_id == caller_id) != owned {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !cat.name.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(name: &'static str, value: &str) -> FilterError {
    FilterError::InvalidParameter { name, value: value.to_string() }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, FilterError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(invalid(name, other)),
    }
}

/// `">4"`, `"<4"`, `"=4"` or a bare `"4"` (equality).
fn parse_age(value: &str) -> Result<AgeFilter, FilterError> {
    let (comparison, number) = if let Some(rest) = value.strip_prefix('>') {
        (Comparison::Gt, rest)
    } else if let Some(rest) = value.strip_prefix('<') {
        (Comparison::Lt, rest)
    } else if let Some(rest) = value.strip_prefix('=') {
        (Comparison::Eq, rest)
    } else {
        (Comparison::Eq, value)
    };

    let value = number
        .trim()
        .parse::<i32>()
        .map_err(|_| invalid("ageInMonth", value))?;
    Ok(AgeFilter { comparison, value })
}

use serde::Deserialize;

/// Raw `GET /v1/cat` query string. Every field is optional and still
/// unparsed; `CatFilter::from_query` turns it into typed criteria.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatQuery {
    pub id: Option<String>,
    pub race: Option<String>,
    pub sex: Option<String>,
    pub has_matched: Option<String>,
    pub age_in_month: Option<String>,
    pub owned: Option<String>,
    pub search: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Gt,
    Eq,
}

impl Comparison {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Gt => ">",
            Comparison::Eq => "=",
        }
    }

    pub fn holds<T: PartialOrd>(&self, left: T, right: T) -> bool {
        match self {
            Comparison::Lt => left < right,
            Comparison::Gt => left > right,
            Comparison::Eq => left == right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeFilter {
    pub comparison: Comparison,
    pub value: i32,
}

/// A sort key; listings only ever sort descending.
#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
}

/// A bind parameter; SQL text only ever references it as `$n`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

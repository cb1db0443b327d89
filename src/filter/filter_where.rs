use super::types::{Comparison, SqlParam};

/// Accumulates AND-ed predicates and their positional parameters.
pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
    conditions: Vec<String>,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            conditions: vec![],
        }
    }

    /// Predicate without parameters, e.g. `"deleted_at" IS NULL`.
    pub fn raw(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    pub fn compare(&mut self, column: &str, comparison: Comparison, value: SqlParam) -> &mut Self {
        let placeholder = self.param(value);
        self.conditions.push(format!(
            "{} {} {}",
            quote(column),
            comparison.to_sql(),
            placeholder
        ));
        self
    }

    pub fn eq(&mut self, column: &str, value: SqlParam) -> &mut Self {
        self.compare(column, Comparison::Eq, value)
    }

    pub fn ne(&mut self, column: &str, value: SqlParam) -> &mut Self {
        let placeholder = self.param(value);
        self.conditions.push(format!("{} <> {}", quote(column), placeholder));
        self
    }

    /// Case-insensitive substring match; LIKE metacharacters in `needle`
    /// are escaped so they match literally.
    pub fn contains(&mut self, column: &str, needle: &str) -> &mut Self {
        let pattern = format!("%{}%", escape_like(needle));
        let placeholder = self.param(SqlParam::Text(pattern));
        self.conditions.push(format!("{} ILIKE {}", quote(column), placeholder));
        self
    }

    pub fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }

    pub fn build(self) -> (String, Vec<SqlParam>) {
        let where_clause = if self.conditions.is_empty() {
            "1=1".to_string()
        } else {
            self.conditions.join(" AND ")
        };
        (where_clause, self.param_values)
    }
}

pub(crate) fn quote(column: &str) -> String {
    format!("\"{}\"", column.replace('"', "\"\""))
}

pub(crate) fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

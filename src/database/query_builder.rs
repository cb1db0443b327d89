use sqlx::{self, postgres::PgArguments, FromRow, PgConnection};

use crate::database::manager::DatabaseError;
use crate::filter::{SqlParam, SqlResult};

/// Runs a generated `SqlResult`, binding its parameters positionally.
pub struct QueryBuilder<T> {
    sql: SqlResult,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(sql: SqlResult) -> Self {
        Self {
            sql,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_all(&self, conn: &mut PgConnection) -> Result<Vec<T>, DatabaseError> {
        let mut q = sqlx::query_as::<_, T>(&self.sql.query);
        for p in self.sql.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(conn).await?;
        Ok(rows)
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        SqlParam::Int(i) => q.bind(*i),
        SqlParam::Text(s) => q.bind(s.clone()),
        SqlParam::Bool(b) => q.bind(*b),
    }
}

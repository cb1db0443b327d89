use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, Row, Transaction};

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Cat, MatchDetail, MatchRequest, NewCat, NewMatchRequest, NewUser, User, UserSummary,
};
use crate::database::query_builder::QueryBuilder;
use crate::database::store::{MatchScope, Store, UnitOfWork};
use crate::filter::filter::CAT_COLUMNS;
use crate::filter::CatFilter;

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at";
const MATCH_COLUMNS: &str = "id, issuer_user_id, issuer_cat_id, receiver_user_id, \
     receiver_cat_id, message, status, created_at, deleted_at";

/// PostgreSQL-backed store. Each unit of work is one database transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx }))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn insert_user(&mut self, user: &NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(DatabaseError::from_insert)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn insert_cat(&mut self, owner_user_id: i64, cat: &NewCat) -> Result<Cat, DatabaseError> {
        let sql = format!(
            "INSERT INTO cats (owner_user_id, name, race, sex, age_in_month, description, image_urls) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            CAT_COLUMNS
        );
        let row = sqlx::query_as::<_, Cat>(&sql)
            .bind(owner_user_id)
            .bind(&cat.name)
            .bind(cat.race.as_str())
            .bind(cat.sex.as_str())
            .bind(cat.age_in_month)
            .bind(&cat.description)
            .bind(&cat.image_urls)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(DatabaseError::from_insert)?;
        Ok(row)
    }

    async fn find_cat(&mut self, id: i64) -> Result<Option<Cat>, DatabaseError> {
        let sql = format!("SELECT {} FROM cats WHERE id = $1", CAT_COLUMNS);
        let cat = sqlx::query_as::<_, Cat>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(cat)
    }

    async fn lock_cats(&mut self, ids: &[i64]) -> Result<Vec<Cat>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM cats WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            CAT_COLUMNS
        );
        let cats = sqlx::query_as::<_, Cat>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(cats)
    }

    async fn list_cats(&mut self, filter: &CatFilter, caller_id: i64) -> Result<Vec<Cat>, DatabaseError> {
        QueryBuilder::<Cat>::new(filter.to_sql(caller_id))
            .select_all(&mut *self.tx)
            .await
    }

    async fn update_cat(&mut self, id: i64, cat: &NewCat) -> Result<Cat, DatabaseError> {
        let sql = format!(
            "UPDATE cats SET name = $2, race = $3, sex = $4, age_in_month = $5, \
             description = $6, image_urls = $7 WHERE id = $1 RETURNING {}",
            CAT_COLUMNS
        );
        let row = sqlx::query_as::<_, Cat>(&sql)
            .bind(id)
            .bind(&cat.name)
            .bind(cat.race.as_str())
            .bind(cat.sex.as_str())
            .bind(cat.age_in_month)
            .bind(&cat.description)
            .bind(&cat.image_urls)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn soft_delete_cat(&mut self, id: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE cats SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn mark_cats_matched(&mut self, ids: &[i64]) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE cats SET has_matched = TRUE WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn cat_has_match(&mut self, cat_id: i64, scope: MatchScope) -> Result<bool, DatabaseError> {
        let state = match scope {
            MatchScope::Active => "status = FALSE AND deleted_at IS NULL",
            MatchScope::NotClosed => "(status = TRUE OR deleted_at IS NULL)",
        };
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM match_requests \
             WHERE (issuer_cat_id = $1 OR receiver_cat_id = $1) AND {})",
            state
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(cat_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn insert_match(&mut self, request: &NewMatchRequest) -> Result<MatchRequest, DatabaseError> {
        let sql = format!(
            "INSERT INTO match_requests \
             (issuer_user_id, issuer_cat_id, receiver_user_id, receiver_cat_id, message) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            MATCH_COLUMNS
        );
        sqlx::query_as::<_, MatchRequest>(&sql)
            .bind(request.issuer_user_id)
            .bind(request.issuer_cat_id)
            .bind(request.receiver_user_id)
            .bind(request.receiver_cat_id)
            .bind(&request.message)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(DatabaseError::from_insert)
    }

    async fn find_match(&mut self, id: i64) -> Result<Option<MatchRequest>, DatabaseError> {
        let sql = format!("SELECT {} FROM match_requests WHERE id = $1", MATCH_COLUMNS);
        let request = sqlx::query_as::<_, MatchRequest>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(request)
    }

    async fn lock_match(&mut self, id: i64) -> Result<Option<MatchRequest>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM match_requests WHERE id = $1 FOR UPDATE",
            MATCH_COLUMNS
        );
        let request = sqlx::query_as::<_, MatchRequest>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(request)
    }

    async fn approve_match(&mut self, id: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE match_requests SET status = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn close_match(&mut self, id: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE match_requests SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn close_matches_for_cats(&mut self, cat_ids: &[i64], except_id: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE match_requests SET deleted_at = NOW() \
             WHERE id <> $2 AND status = FALSE AND deleted_at IS NULL \
             AND (issuer_cat_id = ANY($1) OR receiver_cat_id = ANY($1))",
        )
        .bind(cat_ids.to_vec())
        .bind(except_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_matches_for_user(&mut self, user_id: i64) -> Result<Vec<MatchDetail>, DatabaseError> {
        let sql = format!(
            "SELECT m.id, m.issuer_user_id, m.issuer_cat_id, m.receiver_user_id, m.receiver_cat_id, \
             m.message, m.status, m.created_at, m.deleted_at, \
             iu.name AS issuer_name, iu.email AS issuer_email, iu.created_at AS issuer_created_at, \
             ru.name AS receiver_name, ru.email AS receiver_email, ru.created_at AS receiver_created_at, \
             {}, {} \
             FROM match_requests m \
             JOIN users iu ON iu.id = m.issuer_user_id \
             JOIN users ru ON ru.id = m.receiver_user_id \
             JOIN cats ic ON ic.id = m.issuer_cat_id \
             JOIN cats rc ON rc.id = m.receiver_cat_id \
             WHERE (m.status = TRUE OR m.deleted_at IS NULL) \
             AND (m.issuer_user_id = $1 OR m.receiver_user_id = $1) \
             ORDER BY m.created_at DESC, m.id DESC",
            prefixed_cat_columns("ic"),
            prefixed_cat_columns("rc"),
        );
        let mut rows = sqlx::query(&sql).bind(user_id).fetch(&mut *self.tx);
        let mut details = Vec::new();
        while let Some(row) = rows.try_next().await? {
            details.push(decode_match_detail(&row)?);
        }
        Ok(details)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// `ic.id AS ic_id, ic.name AS ic_name, ...`
fn prefixed_cat_columns(alias: &str) -> String {
    CAT_COLUMNS
        .split(',')
        .map(|c| {
            let c = c.trim().trim_matches('"');
            format!("{alias}.{c} AS {alias}_{c}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn decode_match_detail(row: &PgRow) -> Result<MatchDetail, DatabaseError> {
    Ok(MatchDetail {
        request: MatchRequest::from_row(row)?,
        issuer: UserSummary {
            name: row.try_get("issuer_name")?,
            email: row.try_get("issuer_email")?,
            created_at: row.try_get("issuer_created_at")?,
        },
        receiver: UserSummary {
            name: row.try_get("receiver_name")?,
            email: row.try_get("receiver_email")?,
            created_at: row.try_get("receiver_created_at")?,
        },
        issuer_cat: Cat::from_prefixed_row(row, "ic_")?,
        receiver_cat: Cat::from_prefixed_row(row, "rc_")?,
    })
}

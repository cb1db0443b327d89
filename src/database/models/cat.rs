use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use std::fmt;
use std::str::FromStr;

/// The ten breeds a cat listing may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    #[serde(rename = "Persian")]
    Persian,
    #[serde(rename = "Maine Coon")]
    MaineCoon,
    #[serde(rename = "Siamese")]
    Siamese,
    #[serde(rename = "Ragdoll")]
    Ragdoll,
    #[serde(rename = "Bengal")]
    Bengal,
    #[serde(rename = "Sphynx")]
    Sphynx,
    #[serde(rename = "British Shorthair")]
    BritishShorthair,
    #[serde(rename = "Abyssinian")]
    Abyssinian,
    #[serde(rename = "Scottish Fold")]
    ScottishFold,
    #[serde(rename = "Birman")]
    Birman,
}

impl Race {
    pub const ALL: [Race; 10] = [
        Race::Persian,
        Race::MaineCoon,
        Race::Siamese,
        Race::Ragdoll,
        Race::Bengal,
        Race::Sphynx,
        Race::BritishShorthair,
        Race::Abyssinian,
        Race::ScottishFold,
        Race::Birman,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Race::Persian => "Persian",
            Race::MaineCoon => "Maine Coon",
            Race::Siamese => "Siamese",
            Race::Ragdoll => "Ragdoll",
            Race::Bengal => "Bengal",
            Race::Sphynx => "Sphynx",
            Race::BritishShorthair => "British Shorthair",
            Race::Abyssinian => "Abyssinian",
            Race::ScottishFold => "Scottish Fold",
            Race::Birman => "Birman",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Race {
    type Err = String;

    /// Case-insensitive, whitespace-insensitive: "maine coon", "MaineCoon"
    /// and "Maine Coon" all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = squash(s);
        Race::ALL
            .iter()
            .copied()
            .find(|race| squash(race.as_str()) == wanted)
            .ok_or_else(|| format!("Unknown race: {}", s))
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            other => Err(format!("Unknown sex: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cat {
    pub id: i64,
    pub owner_user_id: i64,
    pub name: String,
    pub race: Race,
    pub sex: Sex,
    pub age_in_month: i32,
    pub description: String,
    pub image_urls: Vec<String>,
    pub has_matched: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Cat {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Cat {
    /// Decode a cat whose columns are named `{prefix}{column}`, as produced by
    /// joins that select more than one cat per row.
    pub fn from_prefixed_row(row: &PgRow, prefix: &str) -> Result<Self, sqlx::Error> {
        let col = |name: &str| format!("{}{}", prefix, name);

        // race and sex are stored as text; decode them through FromStr
        let race: String = row.try_get(col("race").as_str())?;
        let sex: String = row.try_get(col("sex").as_str())?;

        Ok(Self {
            id: row.try_get(col("id").as_str())?,
            owner_user_id: row.try_get(col("owner_user_id").as_str())?,
            name: row.try_get(col("name").as_str())?,
            race: race.parse().map_err(|e: String| decode_error(&col("race"), e))?,
            sex: sex.parse().map_err(|e: String| decode_error(&col("sex"), e))?,
            age_in_month: row.try_get(col("age_in_month").as_str())?,
            description: row.try_get(col("description").as_str())?,
            image_urls: row.try_get(col("image_urls").as_str())?,
            has_matched: row.try_get(col("has_matched").as_str())?,
            created_at: row.try_get(col("created_at").as_str())?,
            deleted_at: row.try_get(col("deleted_at").as_str())?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Cat {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Cat::from_prefixed_row(row, "")
    }
}

pub(crate) fn decode_error(column: &str, message: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: message.into(),
    }
}

/// Validated cat attributes, used for both create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCat {
    pub name: String,
    pub race: Race,
    pub sex: Sex,
    pub age_in_month: i32,
    pub description: String,
    pub image_urls: Vec<String>,
}

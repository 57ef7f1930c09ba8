use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, sqlite::SqliteRow};
use thiserror::Error;
use time::OffsetDateTime;

/// Stable identifier handed to us by the chat platform.
pub type UserId = i64;

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 120;

#[derive(Debug, Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            _ => Err(UnknownVariant { kind: "gender", value: s.to_owned() }),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookingFor {
    Male,
    Female,
    NoPreference,
}

impl LookingFor {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookingFor::Male => "Male",
            LookingFor::Female => "Female",
            LookingFor::NoPreference => "Doesn't matter",
        }
    }

    /// `None` means any gender qualifies.
    pub fn gender(&self) -> Option<Gender> {
        match self {
            LookingFor::Male => Some(Gender::Male),
            LookingFor::Female => Some(Gender::Female),
            LookingFor::NoPreference => None,
        }
    }
}

impl FromStr for LookingFor {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(LookingFor::Male),
            "Female" => Ok(LookingFor::Female),
            "Doesn't matter" => Ok(LookingFor::NoPreference),
            _ => Err(UnknownVariant { kind: "gender preference", value: s.to_owned() }),
        }
    }
}

impl fmt::Display for LookingFor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim and case-fold a city so " paris " and "Paris" compare equal.
pub fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: UserId,
    pub name: String,
    pub age: u32,
    pub city: String,
    pub gender: Gender,
    pub looking_for: LookingFor,
    pub looking_age_min: u32,
    pub looking_age_max: u32,
    pub description: String,
    pub photo: String,
    pub active: bool,
    pub created_at: OffsetDateTime,
}

impl Profile {
    pub fn city_key(&self) -> String {
        normalize_city(&self.city)
    }
}

fn decode_err(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_owned(),
        source: Box::new(source),
    }
}

impl<'r> FromRow<'r, SqliteRow> for Profile {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let gender: String = row.try_get("gender")?;
        let looking_for: String = row.try_get("looking_for")?;
        let created_at: i64 = row.try_get("created_at")?;

        Ok(Profile {
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            age: row.try_get("age")?,
            city: row.try_get("city")?,
            gender: gender.parse().map_err(|e| decode_err("gender", e))?,
            looking_for: looking_for.parse().map_err(|e| decode_err("looking_for", e))?,
            looking_age_min: row.try_get("looking_age_min")?,
            looking_age_max: row.try_get("looking_age_max")?,
            description: row.try_get("description")?,
            photo: row.try_get("photo")?,
            active: row.try_get("is_active")?,
            created_at: OffsetDateTime::from_unix_timestamp(created_at)
                .map_err(|e| decode_err("created_at", e))?,
        })
    }
}

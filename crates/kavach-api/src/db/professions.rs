//! Profession record persistence operations.
//!
//! One row per user (`user_id` is unique); resubmission replaces the
//! previous record. GSTINs are stored as encrypted tokens.

use chrono::{DateTime, Utc};
use kavach_core::{AnnualIncome, Profession, Sector, UserProfession};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert or replace a user's profession record.
pub async fn upsert(pool: &PgPool, record: &UserProfession) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_professions (id, user_id, profession, sector, platform,
         company_name, gstin, annual_income, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (user_id) DO UPDATE SET
           id = EXCLUDED.id,
           profession = EXCLUDED.profession,
           sector = EXCLUDED.sector,
           platform = EXCLUDED.platform,
           company_name = EXCLUDED.company_name,
           gstin = EXCLUDED.gstin,
           annual_income = EXCLUDED.annual_income,
           created_at = EXCLUDED.created_at",
    )
    .bind(record.id)
    .bind(&record.user_id)
    .bind(record.profession.as_str())
    .bind(record.sector.map(|s| s.as_str()))
    .bind(&record.platform)
    .bind(&record.company_name)
    .bind(&record.gstin)
    .bind(record.annual_income.as_str())
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all profession records into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<UserProfession>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProfessionRow>(
        "SELECT id, user_id, profession, sector, platform, company_name,
         gstin, annual_income, created_at
         FROM user_professions ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(ProfessionRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ProfessionRow {
    id: Uuid,
    user_id: String,
    profession: String,
    sector: Option<String>,
    platform: Option<String>,
    company_name: Option<String>,
    gstin: Option<String>,
    annual_income: String,
    created_at: DateTime<Utc>,
}

impl ProfessionRow {
    fn into_record(self) -> Option<UserProfession> {
        let profession = match Profession::parse(&self.profession) {
            Some(p) => p,
            None => {
                tracing::warn!(
                    id = %self.id,
                    profession = %self.profession,
                    "unknown profession in database — skipping row"
                );
                return None;
            }
        };
        let annual_income = match AnnualIncome::parse(&self.annual_income) {
            Some(a) => a,
            None => {
                tracing::warn!(
                    id = %self.id,
                    annual_income = %self.annual_income,
                    "unknown annual_income in database — skipping row"
                );
                return None;
            }
        };
        let sector = match &self.sector {
            Some(raw) => match Sector::parse(raw) {
                Some(s) => Some(s),
                None => {
                    tracing::warn!(id = %self.id, sector = %raw, "unknown sector in database — skipping row");
                    return None;
                }
            },
            None => None,
        };

        Some(UserProfession {
            id: self.id,
            user_id: self.user_id,
            profession,
            sector,
            platform: self.platform,
            company_name: self.company_name,
            gstin: self.gstin,
            annual_income,
            created_at: self.created_at,
        })
    }
}

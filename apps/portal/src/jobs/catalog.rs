//! Home-page and filter-form data: categories with counts, zones, recent jobs.

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::job::{JobCategory, JobRow, JOB_SELECT};
use crate::models::zone::Zone;

pub const RECENT_JOB_DAYS: i64 = 15;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub count: i64,
}

/// Every category in declaration order, including those with no postings.
pub fn merge_category_counts(rows: &[(String, i64)]) -> Vec<CategoryCount> {
    JobCategory::ALL
        .iter()
        .map(|category| CategoryCount {
            key: category.as_str(),
            name: category.display_name(),
            icon: category.icon(),
            count: rows
                .iter()
                .find(|(key, _)| key == category.as_str())
                .map(|(_, n)| *n)
                .unwrap_or(0),
        })
        .collect()
}

pub async fn category_counts(pool: &PgPool) -> Result<Vec<CategoryCount>, AppError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT category, COUNT(*) FROM jobs WHERE is_active GROUP BY category",
    )
    .fetch_all(pool)
    .await?;
    Ok(merge_category_counts(&rows))
}

pub async fn list_zones(pool: &PgPool) -> Result<Vec<Zone>, AppError> {
    Ok(sqlx::query_as("SELECT id, name FROM zones ORDER BY name")
        .fetch_all(pool)
        .await?)
}

/// Active postings from the last fifteen days, newest first.
pub async fn recent_jobs(pool: &PgPool) -> Result<Vec<JobRow>, AppError> {
    let since = Utc::now() - Duration::days(RECENT_JOB_DAYS);
    let sql = format!("{JOB_SELECT} WHERE j.is_active AND j.timestamp >= $1 ORDER BY j.timestamp DESC");
    Ok(sqlx::query_as::<_, JobRow>(&sql)
        .bind(since)
        .fetch_all(pool)
        .await?)
}

/// Open, active postings still accepting applications.
pub async fn latest_open_jobs(pool: &PgPool, limit: i64) -> Result<Vec<JobRow>, AppError> {
    let sql = format!(
        "{JOB_SELECT} WHERE j.is_active AND j.status = 'open' \
         AND (j.application_deadline IS NULL OR j.application_deadline >= $1) \
         ORDER BY j.timestamp DESC LIMIT $2"
    );
    Ok(sqlx::query_as::<_, JobRow>(&sql)
        .bind(Utc::now().date_naive())
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_categories_count_zero() {
        let rows = vec![("teaching".to_string(), 7), ("medical".to_string(), 2)];
        let merged = merge_category_counts(&rows);
        assert_eq!(merged.len(), 6);
        assert_eq!(merged[0].key, "teaching");
        assert_eq!(merged[0].count, 7);
        assert_eq!(merged[0].icon, "fa-chalkboard-teacher");
        let non_teaching = merged.iter().find(|c| c.key == "non-teaching").unwrap();
        assert_eq!(non_teaching.count, 0);
        assert_eq!(non_teaching.name, "Non-Teaching");
    }
}

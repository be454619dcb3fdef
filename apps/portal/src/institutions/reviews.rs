use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::review::ReviewRow;

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewSummary {
    pub institution_id: Uuid,
    pub average_rating: Option<f64>,
    pub review_count: usize,
    pub reviews: Vec<ReviewRow>,
}

pub fn validate_rating(rating: i16) -> Result<(), AppError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(AppError::Validation("Rating must be between 1 and 5.".to_string()))
    }
}

/// Mean rating rounded to one decimal place; `None` with no reviews.
pub fn average_rating(reviews: &[ReviewRow]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: f64 = reviews.iter().map(|r| f64::from(r.rating)).sum();
    Some((sum / reviews.len() as f64 * 10.0).round() / 10.0)
}

/// One review per (institution, user); posting again replaces the earlier one.
pub async fn upsert_review(
    pool: &PgPool,
    institution_id: Uuid,
    user_id: Uuid,
    req: &ReviewRequest,
) -> Result<Uuid, AppError> {
    validate_rating(req.rating)?;
    Ok(sqlx::query_scalar(
        r#"
        INSERT INTO employer_reviews (institution_id, user_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (institution_id, user_id)
        DO UPDATE SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, created_at = NOW()
        RETURNING id
        "#,
    )
    .bind(institution_id)
    .bind(user_id)
    .bind(req.rating)
    .bind(req.comment.trim())
    .fetch_one(pool)
    .await?)
}

pub async fn review_summary(pool: &PgPool, institution_id: Uuid) -> Result<ReviewSummary, AppError> {
    let reviews: Vec<ReviewRow> = sqlx::query_as(
        r#"
        SELECT er.id, er.institution_id, er.user_id, u.username, er.rating, er.comment, er.created_at
        FROM employer_reviews er
        JOIN users u ON u.id = er.user_id
        WHERE er.institution_id = $1
        ORDER BY er.created_at DESC
        "#,
    )
    .bind(institution_id)
    .fetch_all(pool)
    .await?;
    Ok(ReviewSummary {
        institution_id,
        average_rating: average_rating(&reviews),
        review_count: reviews.len(),
        reviews,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review(rating: i16) -> ReviewRow {
        ReviewRow {
            id: Uuid::new_v4(),
            institution_id: Uuid::nil(),
            user_id: Uuid::new_v4(),
            username: "kiran".into(),
            rating,
            comment: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[review(4), review(5), review(5)]), Some(4.7));
    }
}

use super::DBClient;
use crate::dtos::ReviewDto;
use crate::models::Review;
use uuid::Uuid;

/// Review database operations trait
pub trait ReviewExt {
    /// Paginated reviews of a title, newest first, author expanded to a
    /// username.
    async fn get_reviews(
        &self,
        title_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ReviewDto>, sqlx::Error>;

    async fn get_review_count(&self, title_id: i64) -> Result<i64, sqlx::Error>;

    /// Raw review row scoped to its title; used for ownership checks.
    async fn get_review(
        &self,
        title_id: i64,
        review_id: i64,
    ) -> Result<Option<Review>, sqlx::Error>;

    async fn get_review_dto(
        &self,
        title_id: i64,
        review_id: i64,
    ) -> Result<Option<ReviewDto>, sqlx::Error>;

    /// The one-review-per-title pre-check. The unique index covers the
    /// race this cannot.
    async fn user_has_review(&self, title_id: i64, author_id: Uuid)
    -> Result<bool, sqlx::Error>;

    async fn create_review(
        &self,
        title_id: i64,
        author_id: Uuid,
        text: &str,
        score: i16,
    ) -> Result<ReviewDto, sqlx::Error>;

    async fn update_review(
        &self,
        review_id: i64,
        text: &str,
        score: i16,
    ) -> Result<ReviewDto, sqlx::Error>;

    async fn delete_review(&self, review_id: i64) -> Result<(), sqlx::Error>;
}

impl ReviewExt for DBClient {
    async fn get_reviews(
        &self,
        title_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ReviewDto>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let reviews = sqlx::query_as::<_, ReviewDto>(
            "SELECT r.id, r.text, u.username AS author, r.score, r.pub_date
             FROM reviews r
             INNER JOIN users u ON u.id = r.author_id
             WHERE r.title_id = $1
             ORDER BY r.pub_date DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(title_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn get_review_count(&self, title_id: i64) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
            .bind(title_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn get_review(
        &self,
        title_id: i64,
        review_id: i64,
    ) -> Result<Option<Review>, sqlx::Error> {
        let review = sqlx::query_as::<_, Review>(
            "SELECT id, title_id, author_id, text, score, pub_date
             FROM reviews
             WHERE id = $1 AND title_id = $2",
        )
        .bind(review_id)
        .bind(title_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    async fn get_review_dto(
        &self,
        title_id: i64,
        review_id: i64,
    ) -> Result<Option<ReviewDto>, sqlx::Error> {
        let review = sqlx::query_as::<_, ReviewDto>(
            "SELECT r.id, r.text, u.username AS author, r.score, r.pub_date
             FROM reviews r
             INNER JOIN users u ON u.id = r.author_id
             WHERE r.id = $1 AND r.title_id = $2",
        )
        .bind(review_id)
        .bind(title_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    async fn user_has_review(
        &self,
        title_id: i64,
        author_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE title_id = $1 AND author_id = $2)",
        )
        .bind(title_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create_review(
        &self,
        title_id: i64,
        author_id: Uuid,
        text: &str,
        score: i16,
    ) -> Result<ReviewDto, sqlx::Error> {
        let review = sqlx::query_as::<_, ReviewDto>(
            "WITH new_review AS (
                 INSERT INTO reviews (title_id, author_id, text, score)
                 VALUES ($1, $2, $3, $4)
                 RETURNING *
             )
             SELECT nr.id, nr.text, u.username AS author, nr.score, nr.pub_date
             FROM new_review nr
             JOIN users u ON u.id = nr.author_id",
        )
        .bind(title_id)
        .bind(author_id)
        .bind(text)
        .bind(score)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: i64,
        text: &str,
        score: i16,
    ) -> Result<ReviewDto, sqlx::Error> {
        let review = sqlx::query_as::<_, ReviewDto>(
            "WITH updated_review AS (
                 UPDATE reviews
                 SET text = $1, score = $2
                 WHERE id = $3
                 RETURNING *
             )
             SELECT ur.id, ur.text, u.username AS author, ur.score, ur.pub_date
             FROM updated_review ur
             JOIN users u ON u.id = ur.author_id",
        )
        .bind(text)
        .bind(score)
        .bind(review_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    async fn delete_review(&self, review_id: i64) -> Result<(), sqlx::Error> {
        // comments on the review go with it through the FK cascade
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}

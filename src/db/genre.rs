use super::DBClient;
use crate::models::Genre;

/// Genre database operations trait
pub trait GenreExt {
    async fn get_genres(
        &self,
        page: i64,
        limit: i64,
        search: Option<&str>,
    ) -> Result<Vec<Genre>, sqlx::Error>;

    async fn get_genre_count(&self, search: Option<&str>) -> Result<i64, sqlx::Error>;

    async fn get_genre_by_slug(&self, slug: &str) -> Result<Option<Genre>, sqlx::Error>;

    /// Resolve a batch of slugs in one round trip. The caller compares
    /// lengths to detect unknown slugs.
    async fn get_genres_by_slugs(&self, slugs: &[String]) -> Result<Vec<Genre>, sqlx::Error>;

    async fn save_genre(&self, name: &str, slug: &str) -> Result<Genre, sqlx::Error>;

    async fn delete_genre_by_slug(&self, slug: &str) -> Result<(), sqlx::Error>;
}

impl GenreExt for DBClient {
    async fn get_genres(
        &self,
        page: i64,
        limit: i64,
        search: Option<&str>,
    ) -> Result<Vec<Genre>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let genres = if let Some(search) = search {
            sqlx::query_as::<_, Genre>(
                "SELECT id, name, slug FROM genres
                 WHERE name ILIKE '%' || $1 || '%' OR slug ILIKE '%' || $1 || '%'
                 ORDER BY slug LIMIT $2 OFFSET $3",
            )
            .bind(search)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Genre>(
                "SELECT id, name, slug FROM genres ORDER BY slug LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(genres)
    }

    async fn get_genre_count(&self, search: Option<&str>) -> Result<i64, sqlx::Error> {
        let count: i64 = if let Some(search) = search {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM genres
                 WHERE name ILIKE '%' || $1 || '%' OR slug ILIKE '%' || $1 || '%'",
            )
            .bind(search)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM genres")
                .fetch_one(&self.pool)
                .await?
        };

        Ok(count)
    }

    async fn get_genre_by_slug(&self, slug: &str) -> Result<Option<Genre>, sqlx::Error> {
        let genre =
            sqlx::query_as::<_, Genre>("SELECT id, name, slug FROM genres WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;

        Ok(genre)
    }

    async fn get_genres_by_slugs(&self, slugs: &[String]) -> Result<Vec<Genre>, sqlx::Error> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT id, name, slug FROM genres WHERE slug = ANY($1) ORDER BY slug",
        )
        .bind(slugs)
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }

    async fn save_genre(&self, name: &str, slug: &str) -> Result<Genre, sqlx::Error> {
        let genre = sqlx::query_as::<_, Genre>(
            "INSERT INTO genres (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(genre)
    }

    async fn delete_genre_by_slug(&self, slug: &str) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM genres WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}

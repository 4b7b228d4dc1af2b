use super::DBClient;
use crate::models::Category;

/// Category database operations trait
pub trait CategoryExt {
    /// Paginated listing, optionally filtered by a substring over name
    /// and slug.
    async fn get_categories(
        &self,
        page: i64,
        limit: i64,
        search: Option<&str>,
    ) -> Result<Vec<Category>, sqlx::Error>;

    async fn get_category_count(&self, search: Option<&str>) -> Result<i64, sqlx::Error>;

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error>;

    async fn save_category(&self, name: &str, slug: &str) -> Result<Category, sqlx::Error>;

    async fn delete_category_by_slug(&self, slug: &str) -> Result<(), sqlx::Error>;
}

impl CategoryExt for DBClient {
    async fn get_categories(
        &self,
        page: i64,
        limit: i64,
        search: Option<&str>,
    ) -> Result<Vec<Category>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let categories = if let Some(search) = search {
            sqlx::query_as::<_, Category>(
                "SELECT id, name, slug FROM categories
                 WHERE name ILIKE '%' || $1 || '%' OR slug ILIKE '%' || $1 || '%'
                 ORDER BY slug LIMIT $2 OFFSET $3",
            )
            .bind(search)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Category>(
                "SELECT id, name, slug FROM categories ORDER BY slug LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(categories)
    }

    async fn get_category_count(&self, search: Option<&str>) -> Result<i64, sqlx::Error> {
        let count: i64 = if let Some(search) = search {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM categories
                 WHERE name ILIKE '%' || $1 || '%' OR slug ILIKE '%' || $1 || '%'",
            )
            .bind(search)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM categories")
                .fetch_one(&self.pool)
                .await?
        };

        Ok(count)
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn save_category(&self, name: &str, slug: &str) -> Result<Category, sqlx::Error> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    async fn delete_category_by_slug(&self, slug: &str) -> Result<(), sqlx::Error> {
        // titles referencing this category keep their row; category_id
        // goes NULL via the FK rule
        let result = sqlx::query("DELETE FROM categories WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}

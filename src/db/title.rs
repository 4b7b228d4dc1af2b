use super::DBClient;
use crate::dtos::TitlesQueryDto;
use crate::models::{Genre, Title};

/// Title row as read back for API responses: category denormalized via
/// LEFT JOIN, rating averaged over the title's reviews (NULL with none).
#[derive(Debug, sqlx::FromRow)]
pub struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: i16,
    pub description: String,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct TitleGenreRow {
    pub title_id: i64,
    pub name: String,
    pub slug: String,
}

const TITLE_SELECT: &str = "SELECT t.id, t.name, t.year, t.description,
        c.name AS category_name, c.slug AS category_slug,
        r.rating
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
    LEFT JOIN (
        SELECT title_id, AVG(score)::float8 AS rating
        FROM reviews GROUP BY title_id
    ) r ON r.title_id = t.id";

/// Title database operations trait
pub trait TitleExt {
    /// Raw title row, as stored; partial updates merge against this.
    async fn get_title(&self, title_id: i64) -> Result<Option<Title>, sqlx::Error>;

    async fn get_title_row(&self, title_id: i64) -> Result<Option<TitleRow>, sqlx::Error>;

    /// Filtered, paginated title listing. Filters: category slug, genre
    /// slug, name substring, exact year.
    async fn get_title_rows(
        &self,
        page: i64,
        limit: i64,
        filters: &TitlesQueryDto,
    ) -> Result<Vec<TitleRow>, sqlx::Error>;

    async fn get_title_count(&self, filters: &TitlesQueryDto) -> Result<i64, sqlx::Error>;

    async fn title_exists(&self, title_id: i64) -> Result<bool, sqlx::Error>;

    /// Genres of one title, ordered by slug.
    async fn get_title_genres(&self, title_id: i64) -> Result<Vec<Genre>, sqlx::Error>;

    /// Genres for a page of titles in one query, keyed by title id.
    async fn get_genres_for_titles(
        &self,
        title_ids: &[i64],
    ) -> Result<Vec<TitleGenreRow>, sqlx::Error>;

    async fn save_title(
        &self,
        name: &str,
        year: i16,
        description: &str,
        category_id: Option<i64>,
        genre_ids: &[i64],
    ) -> Result<i64, sqlx::Error>;

    /// Overwrite a title. `genre_ids = Some` replaces the genre set;
    /// `None` leaves it untouched.
    async fn update_title(
        &self,
        title_id: i64,
        name: &str,
        year: i16,
        description: &str,
        category_id: Option<i64>,
        genre_ids: Option<&[i64]>,
    ) -> Result<(), sqlx::Error>;

    async fn delete_title(&self, title_id: i64) -> Result<(), sqlx::Error>;
}

/// Append the WHERE clause for the supported filters. Bind order must
/// match `bind_title_filters`.
fn push_title_filters(sql: &mut String, filters: &TitlesQueryDto, mut arg: usize) -> usize {
    if filters.category.is_some() {
        arg += 1;
        sql.push_str(&format!(" AND c.slug = ${arg}"));
    }
    if filters.genre.is_some() {
        arg += 1;
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM title_genre tg
                 JOIN genres g ON g.id = tg.genre_id
                 WHERE tg.title_id = t.id AND g.slug = ${arg})"
        ));
    }
    if filters.name.is_some() {
        arg += 1;
        sql.push_str(&format!(" AND t.name ILIKE '%' || ${arg} || '%'"));
    }
    if filters.year.is_some() {
        arg += 1;
        sql.push_str(&format!(" AND t.year = ${arg}"));
    }
    arg
}

macro_rules! bind_title_filters {
    ($query:expr, $filters:expr) => {{
        let mut q = $query;
        if let Some(ref category) = $filters.category {
            q = q.bind(category);
        }
        if let Some(ref genre) = $filters.genre {
            q = q.bind(genre);
        }
        if let Some(ref name) = $filters.name {
            q = q.bind(name);
        }
        if let Some(year) = $filters.year {
            q = q.bind(year);
        }
        q
    }};
}

impl TitleExt for DBClient {
    async fn get_title(&self, title_id: i64) -> Result<Option<Title>, sqlx::Error> {
        let title = sqlx::query_as::<_, Title>(
            "SELECT id, name, year, description, category_id FROM titles WHERE id = $1",
        )
        .bind(title_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(title)
    }

    async fn get_title_row(&self, title_id: i64) -> Result<Option<TitleRow>, sqlx::Error> {
        let sql = format!("{TITLE_SELECT} WHERE t.id = $1");
        let row = sqlx::query_as::<_, TitleRow>(&sql)
            .bind(title_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn get_title_rows(
        &self,
        page: i64,
        limit: i64,
        filters: &TitlesQueryDto,
    ) -> Result<Vec<TitleRow>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let mut sql = format!("{TITLE_SELECT} WHERE TRUE");
        let arg = push_title_filters(&mut sql, filters, 0);
        sql.push_str(&format!(
            " ORDER BY t.name, t.id LIMIT ${} OFFSET ${}",
            arg + 1,
            arg + 2
        ));

        let query = bind_title_filters!(sqlx::query_as::<_, TitleRow>(&sql), filters)
            .bind(limit)
            .bind(offset);

        query.fetch_all(&self.pool).await
    }

    async fn get_title_count(&self, filters: &TitlesQueryDto) -> Result<i64, sqlx::Error> {
        let mut sql = String::from(
            "SELECT COUNT(*) FROM titles t
             LEFT JOIN categories c ON c.id = t.category_id
             WHERE TRUE",
        );
        push_title_filters(&mut sql, filters, 0);

        let query = bind_title_filters!(sqlx::query_scalar::<_, i64>(&sql), filters);
        query.fetch_one(&self.pool).await
    }

    async fn title_exists(&self, title_id: i64) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE id = $1)")
                .bind(title_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn get_title_genres(&self, title_id: i64) -> Result<Vec<Genre>, sqlx::Error> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT g.id, g.name, g.slug
             FROM genres g
             JOIN title_genre tg ON tg.genre_id = g.id
             WHERE tg.title_id = $1
             ORDER BY g.slug",
        )
        .bind(title_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }

    async fn get_genres_for_titles(
        &self,
        title_ids: &[i64],
    ) -> Result<Vec<TitleGenreRow>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TitleGenreRow>(
            "SELECT tg.title_id, g.name, g.slug
             FROM genres g
             JOIN title_genre tg ON tg.genre_id = g.id
             WHERE tg.title_id = ANY($1)
             ORDER BY tg.title_id, g.slug",
        )
        .bind(title_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn save_title(
        &self,
        name: &str,
        year: i16,
        description: &str,
        category_id: Option<i64>,
        genre_ids: &[i64],
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let title_id: i64 = sqlx::query_scalar(
            "INSERT INTO titles (name, year, description, category_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(name)
        .bind(year)
        .bind(description)
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;

        for genre_id in genre_ids {
            sqlx::query("INSERT INTO title_genre (title_id, genre_id) VALUES ($1, $2)")
                .bind(title_id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(title_id)
    }

    async fn update_title(
        &self,
        title_id: i64,
        name: &str,
        year: i16,
        description: &str,
        category_id: Option<i64>,
        genre_ids: Option<&[i64]>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE titles
             SET name = $1, year = $2, description = $3, category_id = $4
             WHERE id = $5",
        )
        .bind(name)
        .bind(year)
        .bind(description)
        .bind(category_id)
        .bind(title_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        if let Some(genre_ids) = genre_ids {
            sqlx::query("DELETE FROM title_genre WHERE title_id = $1")
                .bind(title_id)
                .execute(&mut *tx)
                .await?;

            for genre_id in genre_ids {
                sqlx::query("INSERT INTO title_genre (title_id, genre_id) VALUES ($1, $2)")
                    .bind(title_id)
                    .bind(genre_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        Ok(())
    }

    async fn delete_title(&self, title_id: i64) -> Result<(), sqlx::Error> {
        // reviews and their comments go with it through the FK cascade
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(title_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}

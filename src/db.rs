use sqlx::{Pool, Postgres};

pub mod scheduler;

mod user;
pub use user::UserExt;

mod category;
pub use category::CategoryExt;

mod genre;
pub use genre::GenreExt;

mod title;
pub use title::{TitleExt, TitleGenreRow, TitleRow};

mod review;
pub use review::ReviewExt;

mod comment;
pub use comment::CommentExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}
impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::domain::{NewSource, Source};
use crate::errors::{FeederError, FeederResult};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::SourceRepository;

const SELECT_SOURCE: &str = "SELECT id, name, feed_url, created_at FROM sources";

#[derive(Clone)]
pub struct SqliteSourceRepository {
    storage: SqliteStorage,
}

impl SqliteSourceRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<Source> {
    Ok(Source {
        id: row.get(0)?,
        name: row.get(1)?,
        feed_url: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn source_exists(conn: &Connection, feed_url: &str) -> FeederResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sources WHERE feed_url = ?1)",
        [feed_url],
        |row| row.get(0),
    )?;
    Ok(exists)
}

#[async_trait]
impl SourceRepository for SqliteSourceRepository {
    async fn add(&self, source: &NewSource) -> FeederResult<i64> {
        let source = source.clone();
        self.storage
            .call(move |conn| {
                // Check within the same lock so two adds cannot race
                if source_exists(conn, &source.feed_url)? {
                    return Err(FeederError::SourceAlreadyExists(source.feed_url));
                }

                conn.execute(
                    "INSERT INTO sources (name, feed_url) VALUES (?1, ?2)",
                    (&source.name, &source.feed_url),
                )?;

                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn remove(&self, id: i64) -> FeederResult<bool> {
        self.storage
            .call(move |conn| {
                let removed = conn.execute("DELETE FROM sources WHERE id = ?1", [id])?;
                Ok(removed > 0)
            })
            .await
    }

    async fn get_all(&self) -> FeederResult<Vec<Source>> {
        self.storage
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_SOURCE))?;
                let sources = stmt.query_map([], source_from_row)?;
                sources.collect::<Result<Vec<_>, _>>().map_err(FeederError::from)
            })
            .await
    }

    async fn get_by_id(&self, id: i64) -> FeederResult<Option<Source>> {
        self.storage
            .call(move |conn| {
                let source = conn
                    .query_row(&format!("{} WHERE id = ?1", SELECT_SOURCE), [id], source_from_row)
                    .optional()?;
                Ok(source)
            })
            .await
    }

    async fn exists(&self, feed_url: &str) -> FeederResult<bool> {
        let feed_url = feed_url.to_string();
        self.storage
            .call(move |conn| source_exists(conn, &feed_url))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_repo() -> SqliteSourceRepository {
        let storage = SqliteStorage::in_memory().unwrap();
        SqliteSourceRepository::new(storage)
    }

    #[tokio::test]
    async fn test_add_and_get_source() {
        let repo = setup_repo();
        let id = repo
            .add(&NewSource::new("Rust Blog", "https://blog.rust-lang.org/feed.xml"))
            .await
            .unwrap();
        assert!(id > 0);

        let retrieved = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(retrieved.name, "Rust Blog");
        assert_eq!(retrieved.feed_url, "https://blog.rust-lang.org/feed.xml");
        assert!(retrieved.created_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_url_rejected() {
        let repo = setup_repo();
        let source = NewSource::new("Example", "https://example.com/feed");

        repo.add(&source).await.unwrap();
        let result = repo.add(&source).await;

        assert!(matches!(result, Err(FeederError::SourceAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_remove_source() {
        let repo = setup_repo();
        let id = repo
            .add(&NewSource::new("Example", "https://example.com/feed"))
            .await
            .unwrap();

        assert!(repo.remove(id).await.unwrap());
        assert!(repo.get_by_id(id).await.unwrap().is_none());
        assert!(!repo.remove(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_all_sources_in_insertion_order() {
        let repo = setup_repo();
        repo.add(&NewSource::new("Feed 1", "https://example1.com/feed"))
            .await
            .unwrap();
        repo.add(&NewSource::new("Feed 2", "https://example2.com/feed"))
            .await
            .unwrap();

        let all = repo.get_all().await.unwrap();
        let names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Feed 1", "Feed 2"]);
    }

    #[tokio::test]
    async fn test_exists() {
        let repo = setup_repo();

        assert!(!repo.exists("https://example.com/feed").await.unwrap());
        repo.add(&NewSource::new("Example", "https://example.com/feed"))
            .await
            .unwrap();
        assert!(repo.exists("https://example.com/feed").await.unwrap());
    }
}

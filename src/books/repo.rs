use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::filter::{like_pattern, Predicate, SearchFilter};

/// Catalog record. The storage id is never selected into this struct, so
/// search results carry no internal identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publish_year: String, // string-typed on the wire and in storage
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

const BOOK_COLUMNS: &str = "title, author, isbn, publish_year, publisher, genres, description";

impl Book {
    pub async fn isbn_exists(db: &PgPool, isbn: &str) -> anyhow::Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as(r#"SELECT EXISTS (SELECT 1 FROM books WHERE isbn = $1)"#)
                .bind(isbn)
                .fetch_one(db)
                .await?;
        Ok(exists)
    }

    pub async fn insert(db: &PgPool, book: &Book) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (title, author, isbn, publish_year, publisher, genres, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publish_year)
        .bind(&book.publisher)
        .bind(&book.genres)
        .bind(&book.description)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Run the filter against the catalog, binding values in the same
    /// order the clause numbered them.
    pub async fn search(db: &PgPool, filter: &SearchFilter) -> anyhow::Result<Vec<Book>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books{} ORDER BY title",
            filter.where_clause()
        );
        let mut query = sqlx::query_as::<_, Book>(&sql);
        for predicate in filter.predicates() {
            query = match predicate {
                Predicate::ContainsCi { needle, .. } => query.bind(like_pattern(needle)),
                Predicate::Equals { value, .. } => query.bind(value.clone()),
                Predicate::GenresAll(tags) => query.bind(tags.clone()),
            };
        }
        let books = query.fetch_all(db).await?;
        Ok(books)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_serializes_camel_case_without_storage_id() {
        let book = Book {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            isbn: "9780441013593".into(),
            publish_year: "1965".into(),
            publisher: None,
            genres: vec!["Science Fiction".into()],
            description: None,
        };
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["publishYear"], "1965");
        assert!(json.get("id").is_none());
        assert!(json.get("_id").is_none());
    }

    #[test]
    fn book_deserializes_with_sparse_optional_fields() {
        let book: Book = serde_json::from_str(
            r#"{"title": "Dune", "author": "Frank Herbert",
                "isbn": "9780441013593", "publishYear": "1965"}"#,
        )
        .unwrap();
        assert!(book.publisher.is_none());
        assert!(book.genres.is_empty());
    }
}

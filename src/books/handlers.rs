use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{auth::services::AuthUser, state::AppState};

use super::dto::{IsbnQuery, MessageResponse, SearchCriteria};
use super::filter::SearchFilter;
use super::google::BookMetadata;
use super::repo::Book;

pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/book/registerBook", post(register_book))
        .route("/book/searchBooks", post(search_books))
        .route("/book/searchGoogleAPI", get(search_google_api))
}

#[instrument(skip(state, book))]
pub async fn register_book(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(book): Json<Book>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    if book.title.trim().is_empty()
        || book.author.trim().is_empty()
        || book.isbn.trim().is_empty()
        || book.publish_year.trim().is_empty()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "Title, author, ISBN and publish year are required.".into(),
        ));
    }

    let exists = Book::isbn_exists(&state.db, &book.isbn)
        .await
        .map_err(internal)?;
    if exists {
        return Err((
            StatusCode::CONFLICT,
            "Book with the same ISBN already exists.".into(),
        ));
    }

    Book::insert(&state.db, &book).await.map_err(internal)?;

    info!(user = %claims.sub, isbn = %book.isbn, "book registered");
    Ok(Json(MessageResponse {
        message: "Book saved successfully.".into(),
    }))
}

// Search stays unauthenticated: browsing the catalog needs no account.
#[instrument(skip(state))]
pub async fn search_books(
    State(state): State<AppState>,
    Json(criteria): Json<SearchCriteria>,
) -> Result<Json<Vec<Book>>, (StatusCode, String)> {
    let filter = SearchFilter::build(&criteria);
    let books = Book::search(&state.db, &filter).await.map_err(internal)?;
    Ok(Json(books))
}

#[instrument(skip(state))]
pub async fn search_google_api(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(query): Query<IsbnQuery>,
) -> Result<Json<BookMetadata>, (StatusCode, String)> {
    let isbn = query.isbn.trim();
    if isbn.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "ISBN cannot be empty.".into()));
    }

    match state.metadata.lookup(isbn).await.map_err(internal)? {
        Some(metadata) => Ok(Json(metadata)),
        None => Err((
            StatusCode::NOT_FOUND,
            "No book found with the given ISBN.".into(),
        )),
    }
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".into())
}

#[cfg(test)]
mod criteria_tests {
    use super::*;

    #[test]
    fn criteria_deserializes_with_every_field_absent() {
        let criteria: SearchCriteria = serde_json::from_str("{}").unwrap();
        assert!(SearchFilter::build(&criteria).is_unrestricted());
    }

    #[test]
    fn criteria_uses_camel_case_field_names() {
        let criteria: SearchCriteria = serde_json::from_str(
            r#"{"publishYear": "1954", "genres": ["Fiction", "Fantasy"]}"#,
        )
        .unwrap();
        assert_eq!(criteria.publish_year.as_deref(), Some("1954"));
        assert_eq!(criteria.genres.len(), 2);
    }
}

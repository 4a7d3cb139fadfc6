//! Search filter builder: turns a sparse [`SearchCriteria`] into a
//! conjunction of predicates. Building is pure; the same predicate list
//! drives both the SQL rendering used against the catalog table and the
//! in-memory match semantics the tests pin down.

use crate::books::dto::SearchCriteria;
use crate::books::repo::Book;

/// Text columns a criteria field can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Title,
    Author,
    Isbn,
    PublishYear,
    Publisher,
    Description,
}

impl TextField {
    pub(crate) fn column(self) -> &'static str {
        match self {
            TextField::Title => "title",
            TextField::Author => "author",
            TextField::Isbn => "isbn",
            TextField::PublishYear => "publish_year",
            TextField::Publisher => "publisher",
            TextField::Description => "description",
        }
    }

    fn text(self, book: &Book) -> Option<&str> {
        match self {
            TextField::Title => Some(&book.title),
            TextField::Author => Some(&book.author),
            TextField::Isbn => Some(&book.isbn),
            TextField::PublishYear => Some(&book.publish_year),
            TextField::Publisher => book.publisher.as_deref(),
            TextField::Description => book.description.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring match.
    ContainsCi { field: TextField, needle: String },
    /// Exact string equality.
    Equals { field: TextField, value: String },
    /// The record's genre set must contain every listed tag, not merely any.
    GenresAll(Vec<String>),
}

impl Predicate {
    pub fn matches(&self, book: &Book) -> bool {
        match self {
            Predicate::ContainsCi { field, needle } => field
                .text(book)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
            Predicate::Equals { field, value } => {
                field.text(book).is_some_and(|text| text == value)
            }
            Predicate::GenresAll(tags) => tags.iter().all(|tag| book.genres.contains(tag)),
        }
    }
}

/// Conjunctive filter over the catalog. Empty means unrestricted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    predicates: Vec<Predicate>,
}

impl SearchFilter {
    /// Build the filter from criteria. A string field participates only
    /// when non-null and non-blank; genres only when at least one non-blank
    /// tag remains.
    pub fn build(criteria: &SearchCriteria) -> Self {
        let mut predicates = Vec::new();

        push_contains(&mut predicates, TextField::Title, &criteria.title);
        push_contains(&mut predicates, TextField::Author, &criteria.author);
        push_equals(&mut predicates, TextField::Isbn, &criteria.isbn);
        push_equals(&mut predicates, TextField::PublishYear, &criteria.publish_year);
        push_contains(&mut predicates, TextField::Publisher, &criteria.publisher);
        push_contains(&mut predicates, TextField::Description, &criteria.description);

        let genres: Vec<String> = criteria
            .genres
            .iter()
            .filter(|g| !g.trim().is_empty())
            .cloned()
            .collect();
        if !genres.is_empty() {
            predicates.push(Predicate::GenresAll(genres));
        }

        Self { predicates }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// SQL `WHERE` clause (with leading space) binding `$1..$n` in
    /// predicate order; empty string when unrestricted.
    pub fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }
        let clauses: Vec<String> = self
            .predicates
            .iter()
            .enumerate()
            .map(|(i, predicate)| {
                let n = i + 1;
                match predicate {
                    Predicate::ContainsCi { field, .. } => {
                        format!("{} ILIKE ${n}", field.column())
                    }
                    Predicate::Equals { field, .. } => format!("{} = ${n}", field.column()),
                    Predicate::GenresAll(_) => format!("genres @> ${n}"),
                }
            })
            .collect();
        format!(" WHERE {}", clauses.join(" AND "))
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.predicates.iter().all(|p| p.matches(book))
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn push_contains(predicates: &mut Vec<Predicate>, field: TextField, value: &Option<String>) {
    if let Some(needle) = present(value) {
        predicates.push(Predicate::ContainsCi {
            field,
            needle: needle.to_owned(),
        });
    }
}

fn push_equals(predicates: &mut Vec<Predicate>, field: TextField, value: &Option<String>) {
    if let Some(value) = present(value) {
        predicates.push(Predicate::Equals {
            field,
            value: value.to_owned(),
        });
    }
}

/// `%needle%` with LIKE metacharacters escaped; Postgres' default escape
/// character is the backslash.
pub(crate) fn like_pattern(needle: &str) -> String {
    format!(
        "%{}%",
        needle
            .replace('\\', r"\\")
            .replace('%', r"\%")
            .replace('_', r"\_")
    )
}

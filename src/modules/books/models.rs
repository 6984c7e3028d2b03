use serde::{Deserialize, Serialize};
use shelf_db::{Record, RecordId};
use shelf_http::error::FieldErrors;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Assigned by the store on first save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub description: String,
}

impl Record for Book {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn with_id(self, id: RecordId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }
}

/// Request body for creating or replacing a book.
///
/// Every field is optional so that missing values surface as validation
/// messages instead of decoder errors. Any `id` in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub description: Option<String>,
}

struct TextRule {
    field: &'static str,
    required: &'static str,
    min: usize,
    max: usize,
    length: &'static str,
}

const TITLE: TextRule = TextRule {
    field: "title",
    required: "Title is required",
    min: 0,
    max: 180,
    length: "Title must be at most 180 characters",
};

const AUTHOR: TextRule = TextRule {
    field: "author",
    required: "Author is required",
    min: 0,
    max: 50,
    length: "Author name must be at most 50 characters",
};

const ISBN: TextRule = TextRule {
    field: "isbn",
    required: "ISBN is required",
    min: 10,
    max: 13,
    length: "ISBN must be between 10 and 13 characters",
};

const DESCRIPTION: TextRule = TextRule {
    field: "description",
    required: "Description is required",
    min: 0,
    max: 500,
    length: "Description must be at most 500 characters",
};

impl TextRule {
    /// Blank values fail the required rule before length is looked at.
    fn check(&self, value: Option<String>, errors: &mut FieldErrors) -> Option<String> {
        let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
            errors.insert(self.field.to_string(), self.required.to_string());
            return None;
        };

        let len = value.chars().count();
        if len < self.min || len > self.max {
            errors.insert(self.field.to_string(), self.length.to_string());
            return None;
        }

        Some(value)
    }
}

impl BookInput {
    /// Check every constraint and build an unsaved [`Book`], or report one
    /// message per offending field.
    pub fn validate(self) -> Result<Book, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = TITLE.check(self.title, &mut errors);
        let author = AUTHOR.check(self.author, &mut errors);
        let isbn = ISBN.check(self.isbn, &mut errors);
        let publication_year = self.publication_year;
        if publication_year.is_none() {
            errors.insert(
                "publicationYear".to_string(),
                "Publication year is required".to_string(),
            );
        }
        let description = DESCRIPTION.check(self.description, &mut errors);

        match (title, author, isbn, publication_year, description) {
            (Some(title), Some(author), Some(isbn), Some(publication_year), Some(description)) => {
                Ok(Book {
                    id: None,
                    title,
                    author,
                    isbn,
                    publication_year,
                    description,
                })
            }
            _ => Err(errors),
        }
    }
}

impl From<Book> for BookInput {
    fn from(book: Book) -> Self {
        Self {
            title: Some(book.title),
            author: Some(book.author),
            isbn: Some(book.isbn),
            publication_year: Some(book.publication_year),
            description: Some(book.description),
        }
    }
}

/// Query string of `GET /books/search`; absent parameters are empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

/// A book together with its generated tagline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookInsights {
    pub book: Book,
    pub insights: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> BookInput {
        BookInput {
            title: Some("Effective Java".to_string()),
            author: Some("Joshua Bloch".to_string()),
            isbn: Some("9780134685991".to_string()),
            publication_year: Some(2018),
            description: Some("A must-read for Java developers.".to_string()),
        }
    }

    fn single_violation(input: BookInput) -> (String, String) {
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.len(), 1, "unexpected violations: {errors:?}");
        errors.into_iter().next().unwrap()
    }

    #[test]
    fn valid_book_passes() {
        let book = valid_input().validate().unwrap();
        assert_eq!(book.id, None);
        assert_eq!(book.title, "Effective Java");
        assert_eq!(book.publication_year, 2018);
    }

    #[test]
    fn blank_title_is_required() {
        let input = BookInput {
            title: Some(String::new()),
            ..valid_input()
        };
        assert_eq!(
            single_violation(input),
            ("title".to_string(), "Title is required".to_string())
        );
    }

    #[test]
    fn whitespace_author_is_blank() {
        let input = BookInput {
            author: Some("   ".to_string()),
            ..valid_input()
        };
        assert_eq!(single_violation(input).1, "Author is required");
    }

    #[test]
    fn long_author_is_rejected() {
        let input = BookInput {
            author: Some("a".repeat(51)),
            ..valid_input()
        };
        assert_eq!(
            single_violation(input).1,
            "Author name must be at most 50 characters"
        );
    }

    #[test]
    fn short_isbn_is_rejected() {
        let input = BookInput {
            isbn: Some("1234".to_string()),
            ..valid_input()
        };
        assert_eq!(
            single_violation(input),
            (
                "isbn".to_string(),
                "ISBN must be between 10 and 13 characters".to_string()
            )
        );
    }

    #[test]
    fn missing_publication_year_is_required() {
        let input = BookInput {
            publication_year: None,
            ..valid_input()
        };
        assert_eq!(
            single_violation(input),
            (
                "publicationYear".to_string(),
                "Publication year is required".to_string()
            )
        );
    }

    #[test]
    fn description_limits() {
        let blank = BookInput {
            description: Some(String::new()),
            ..valid_input()
        };
        assert_eq!(single_violation(blank).1, "Description is required");

        let long = BookInput {
            description: Some("A".repeat(501)),
            ..valid_input()
        };
        assert_eq!(
            single_violation(long).1,
            "Description must be at most 500 characters"
        );

        let at_limit = BookInput {
            description: Some("A".repeat(500)),
            ..valid_input()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn title_length_counts_characters() {
        let input = BookInput {
            title: Some("é".repeat(180)),
            ..valid_input()
        };
        assert!(input.validate().is_ok());

        let input = BookInput {
            title: Some("é".repeat(181)),
            ..valid_input()
        };
        assert_eq!(
            single_violation(input).1,
            "Title must be at most 180 characters"
        );
    }

    #[test]
    fn every_offending_field_is_reported() {
        let errors = BookInput::default().validate().unwrap_err();
        let fields: Vec<_> = errors.keys().map(String::as_str).collect();
        assert_eq!(
            fields,
            vec!["author", "description", "isbn", "publicationYear", "title"]
        );
    }

    #[test]
    fn book_json_uses_camel_case() {
        let book = valid_input().validate().unwrap().with_id(4);
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["publicationYear"], 2018);
    }

    #[test]
    fn input_ignores_client_id() {
        let input: BookInput = serde_json::from_value(serde_json::json!({
            "id": 99,
            "title": "Spring Boot Guide",
            "author": "John Doe",
            "isbn": "1234567890",
            "publicationYear": 2021,
            "description": "Learn Spring Boot"
        }))
        .unwrap();
        assert_eq!(input.validate().unwrap().id, None);
    }
}

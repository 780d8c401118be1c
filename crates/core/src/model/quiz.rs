use thiserror::Error;

use crate::model::ids::{CategoryId, QuizId};
use crate::slug::slugify;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz url is empty after removing unsupported characters")]
    EmptyUrl,
}

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// Display flags for a quiz. Everything is off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct QuizOptions {
    /// Shuffle the question order for every new sitting.
    pub random_order: bool,
    /// Hold back per-question feedback until the results page.
    pub answers_at_end: bool,
    /// Keep completed sittings so they can be reviewed later.
    pub exam_paper: bool,
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// A named collection of questions reachable under a url slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    description: String,
    url: String,
    category: Option<CategoryId>,
    options: QuizOptions,
}

impl Quiz {
    /// Creates a quiz, cleaning `url` into a slug.
    ///
    /// When the cleaned url is empty the title is slugified instead.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` if the title is blank and
    /// `QuizError::EmptyUrl` if neither url nor title yield a slug.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        description: impl Into<String>,
        url: &str,
        category: Option<CategoryId>,
        options: QuizOptions,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }

        let mut slug = slugify(url);
        if slug.is_empty() {
            slug = slugify(title);
        }
        if slug.is_empty() {
            return Err(QuizError::EmptyUrl);
        }

        Ok(Self {
            id,
            title: title.to_owned(),
            description: description.into().trim().to_owned(),
            url: slug,
            category,
            options,
        })
    }

    /// Returns a copy carrying the given id, used once storage assigns one.
    #[must_use]
    pub fn with_id(mut self, id: QuizId) -> Self {
        self.id = id;
        self
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }

    #[must_use]
    pub fn options(&self) -> QuizOptions {
        self.options
    }

    #[must_use]
    pub fn random_order(&self) -> bool {
        self.options.random_order
    }

    #[must_use]
    pub fn answers_at_end(&self) -> bool {
        self.options.answers_at_end
    }

    #[must_use]
    pub fn exam_paper(&self) -> bool {
        self.options.exam_paper
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(id: u64, url: &str) -> Quiz {
        Quiz::new(
            QuizId::new(id),
            format!("test quiz {id}"),
            format!("d{id}"),
            url,
            None,
            QuizOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn url_is_slugified() {
        assert_eq!(quiz(1, "tq1").url(), "tq1");
        assert_eq!(quiz(2, "t q2").url(), "t-q2");
        assert_eq!(quiz(3, "t   q3").url(), "t-q3");
        assert_eq!(quiz(4, "t-!£$%^&*q4").url(), "t-q4");
    }

    #[test]
    fn options_default_to_false() {
        let q = quiz(1, "tq1");
        assert!(!q.random_order());
        assert!(!q.answers_at_end());
        assert!(!q.exam_paper());
    }

    #[test]
    fn explicit_options_and_category_are_kept() {
        let q = Quiz::new(
            QuizId::new(5),
            "test quiz 5",
            "d5",
            "tq5",
            Some(CategoryId::new(1)),
            QuizOptions {
                exam_paper: true,
                ..QuizOptions::default()
            },
        )
        .unwrap();

        assert_eq!(q.category(), Some(CategoryId::new(1)));
        assert!(!q.random_order());
        assert!(!q.answers_at_end());
        assert!(q.exam_paper());
    }

    #[test]
    fn empty_url_falls_back_to_title() {
        let q = Quiz::new(
            QuizId::new(1),
            "Fruit Basics",
            "",
            "!!!",
            None,
            QuizOptions::default(),
        )
        .unwrap();
        assert_eq!(q.url(), "fruit-basics");
    }

    #[test]
    fn rejects_blank_title_and_unusable_url() {
        let err = Quiz::new(QuizId::new(1), "  ", "", "x", None, QuizOptions::default())
            .unwrap_err();
        assert_eq!(err, QuizError::EmptyTitle);

        let err = Quiz::new(QuizId::new(1), "???", "", "", None, QuizOptions::default())
            .unwrap_err();
        assert_eq!(err, QuizError::EmptyUrl);
    }
}

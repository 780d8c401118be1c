use async_trait::async_trait;
use quiz_core::model::{
    Category, CategoryId, CategoryName, Progress, Question, QuestionId, Quiz, QuizId, Sitting,
    SittingId, User, UserId,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Store a new category under the next free id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the name is already taken.
    async fn insert_category(&self, name: &CategoryName) -> Result<Category, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StorageError>;

    /// Fetch a category by its normalized name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_category(&self, name: &CategoryName)
    -> Result<Option<Category>, StorageError>;

    /// All categories ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError>;
}

/// Repository contract for quizzes.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Store a new quiz, ignoring its id and returning the assigned one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the url is already taken.
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_quiz_by_url(&self, url: &str) -> Result<Option<Quiz>, StorageError>;

    /// Quizzes ordered by id, optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_quizzes(&self, category: Option<CategoryId>) -> Result<Vec<Quiz>, StorageError>;
}

/// Repository contract for questions of every variant.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Store a new question, ignoring its id and returning the assigned one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_question(&self, question: &Question) -> Result<QuestionId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    /// Questions linked to a quiz, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_questions_for_quiz(&self, quiz: QuizId) -> Result<Vec<Question>, StorageError>;
}

/// Repository contract for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is already taken.
    async fn insert_user(&self, user: &User) -> Result<UserId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;
}

/// Repository contract for per-user progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read or the stored
    /// score string is malformed.
    async fn get_progress(&self, user: UserId) -> Result<Option<Progress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the progress cannot be stored.
    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError>;
}

/// Repository contract for sittings.
#[async_trait]
pub trait SittingRepository: Send + Sync {
    /// Store a new sitting, ignoring its id and returning the assigned one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the sitting cannot be stored.
    async fn insert_sitting(&self, sitting: &Sitting) -> Result<SittingId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_sitting(&self, id: SittingId) -> Result<Option<Sitting>, StorageError>;

    /// The most recent incomplete sitting of a user for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn find_open_sitting(
        &self,
        user: UserId,
        quiz: QuizId,
    ) -> Result<Option<Sitting>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the sitting does not exist.
    async fn update_sitting(&self, sitting: &Sitting) -> Result<(), StorageError>;

    /// Removing a sitting that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete_sitting(&self, id: SittingId) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

struct Table<K, V> {
    rows: BTreeMap<K, V>,
    next_id: u64,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<K: Ord, V> Table<K, V> {
    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    categories: Arc<Mutex<Table<CategoryId, Category>>>,
    quizzes: Arc<Mutex<Table<QuizId, Quiz>>>,
    questions: Arc<Mutex<Table<QuestionId, Question>>>,
    users: Arc<Mutex<Table<UserId, User>>>,
    progress: Arc<Mutex<BTreeMap<UserId, Progress>>>,
    sittings: Arc<Mutex<Table<SittingId, Sitting>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryRepository for InMemoryRepository {
    async fn insert_category(&self, name: &CategoryName) -> Result<Category, StorageError> {
        let mut guard = lock(&self.categories)?;
        if guard.rows.values().any(|c| c.name() == name) {
            return Err(StorageError::Conflict);
        }
        let id = CategoryId::new(guard.allocate());
        let category = Category::new(id, name.clone());
        guard.rows.insert(id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StorageError> {
        let guard = lock(&self.categories)?;
        Ok(guard.rows.get(&id).cloned())
    }

    async fn find_category(
        &self,
        name: &CategoryName,
    ) -> Result<Option<Category>, StorageError> {
        let guard = lock(&self.categories)?;
        Ok(guard.rows.values().find(|c| c.name() == name).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let guard = lock(&self.categories)?;
        Ok(guard.rows.values().cloned().collect())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<QuizId, StorageError> {
        let mut guard = lock(&self.quizzes)?;
        if guard.rows.values().any(|q| q.url() == quiz.url()) {
            return Err(StorageError::Conflict);
        }
        let id = QuizId::new(guard.allocate());
        guard.rows.insert(id, quiz.clone().with_id(id));
        Ok(id)
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let guard = lock(&self.quizzes)?;
        Ok(guard.rows.get(&id).cloned())
    }

    async fn find_quiz_by_url(&self, url: &str) -> Result<Option<Quiz>, StorageError> {
        let guard = lock(&self.quizzes)?;
        Ok(guard.rows.values().find(|q| q.url() == url).cloned())
    }

    async fn list_quizzes(&self, category: Option<CategoryId>) -> Result<Vec<Quiz>, StorageError> {
        let guard = lock(&self.quizzes)?;
        Ok(guard
            .rows
            .values()
            .filter(|q| category.is_none() || q.category() == category)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(&self, question: &Question) -> Result<QuestionId, StorageError> {
        let mut guard = lock(&self.questions)?;
        let id = QuestionId::new(guard.allocate());
        guard.rows.insert(id, question.clone().with_id(id));
        Ok(id)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let guard = lock(&self.questions)?;
        Ok(guard.rows.get(&id).cloned())
    }

    async fn list_questions_for_quiz(&self, quiz: QuizId) -> Result<Vec<Question>, StorageError> {
        let guard = lock(&self.questions)?;
        Ok(guard
            .rows
            .values()
            .filter(|q| q.belongs_to(quiz))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: &User) -> Result<UserId, StorageError> {
        let mut guard = lock(&self.users)?;
        if guard.rows.values().any(|u| u.username() == user.username()) {
            return Err(StorageError::Conflict);
        }
        let id = UserId::new(guard.allocate());
        guard.rows.insert(id, user.clone().with_id(id));
        Ok(id)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let guard = lock(&self.users)?;
        Ok(guard.rows.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let guard = lock(&self.users)?;
        Ok(guard
            .rows
            .values()
            .find(|u| u.username() == username)
            .cloned())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(&self, user: UserId) -> Result<Option<Progress>, StorageError> {
        let guard = lock(&self.progress)?;
        Ok(guard.get(&user).cloned())
    }

    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        let mut guard = lock(&self.progress)?;
        guard.insert(progress.user_id(), progress.clone());
        Ok(())
    }
}

#[async_trait]
impl SittingRepository for InMemoryRepository {
    async fn insert_sitting(&self, sitting: &Sitting) -> Result<SittingId, StorageError> {
        let mut guard = lock(&self.sittings)?;
        let id = SittingId::new(guard.allocate());
        guard.rows.insert(id, sitting.clone().with_id(id));
        Ok(id)
    }

    async fn get_sitting(&self, id: SittingId) -> Result<Option<Sitting>, StorageError> {
        let guard = lock(&self.sittings)?;
        Ok(guard.rows.get(&id).cloned())
    }

    async fn find_open_sitting(
        &self,
        user: UserId,
        quiz: QuizId,
    ) -> Result<Option<Sitting>, StorageError> {
        let guard = lock(&self.sittings)?;
        Ok(guard
            .rows
            .values()
            .rev()
            .find(|s| s.user_id() == user && s.quiz_id() == quiz && !s.is_complete())
            .cloned())
    }

    async fn update_sitting(&self, sitting: &Sitting) -> Result<(), StorageError> {
        let mut guard = lock(&self.sittings)?;
        match guard.rows.get_mut(&sitting.id()) {
            Some(slot) => {
                *slot = sitting.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound),
        }
    }

    async fn delete_sitting(&self, id: SittingId) -> Result<(), StorageError> {
        let mut guard = lock(&self.sittings)?;
        guard.rows.remove(&id);
        Ok(())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates every repository behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub categories: Arc<dyn CategoryRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub users: Arc<dyn UserRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub sittings: Arc<dyn SittingRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Wires every repository slot to clones of one backend.
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CategoryRepository
            + QuizRepository
            + QuestionRepository
            + UserRepository
            + ProgressRepository
            + SittingRepository
            + Clone
            + 'static,
    {
        Self {
            categories: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            users: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            sittings: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionKind, QuizOptions};
    use quiz_core::time::fixed_now;

    fn build_quiz(url: &str) -> Quiz {
        Quiz::new(
            QuizId::new(0),
            format!("Quiz {url}"),
            "",
            url,
            None,
            QuizOptions::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn category_names_are_unique() {
        let repo = InMemoryRepository::new();
        let name = CategoryName::new("black berries");
        let first = repo.insert_category(&name).await.unwrap();
        assert_eq!(first.id(), CategoryId::new(1));

        let err = repo.insert_category(&name).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let found = repo.find_category(&CategoryName::new("black  berries")).await.unwrap();
        assert_eq!(found, Some(first));
    }

    #[tokio::test]
    async fn quiz_urls_are_unique() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.insert_quiz(&build_quiz("one")).await.unwrap(), QuizId::new(1));

        let id = repo.insert_quiz(&build_quiz("two")).await.unwrap();
        assert_eq!(id, QuizId::new(2));

        let err = repo.insert_quiz(&build_quiz("one")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn open_sitting_skips_completed_attempts() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let quiz = QuizId::new(1);

        let mut done = Sitting::new(SittingId::new(0), user, quiz, vec![], fixed_now()).unwrap();
        done.mark_quiz_complete(fixed_now());
        repo.insert_sitting(&done).await.unwrap();
        assert!(repo.find_open_sitting(user, quiz).await.unwrap().is_none());

        let open = Sitting::new(
            SittingId::new(0),
            user,
            quiz,
            vec![QuestionId::new(1)],
            fixed_now(),
        )
        .unwrap();
        let id = repo.insert_sitting(&open).await.unwrap();
        let found = repo.find_open_sitting(user, quiz).await.unwrap().unwrap();
        assert_eq!(found.id(), id);

        repo.delete_sitting(id).await.unwrap();
        repo.delete_sitting(id).await.unwrap();
        assert!(repo.get_sitting(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn questions_are_listed_per_quiz() {
        let repo = InMemoryRepository::new();
        let mut q = Question::new(
            QuestionId::new(0),
            "squawk",
            None,
            None,
            QuestionKind::TrueFalse { correct: true },
        )
        .unwrap();
        q.add_to_quiz(QuizId::new(1));
        let id = repo.insert_question(&q).await.unwrap();

        let listed = repo.list_questions_for_quiz(QuizId::new(1)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), id);
        assert!(repo
            .list_questions_for_quiz(QuizId::new(2))
            .await
            .unwrap()
            .is_empty());
    }
}

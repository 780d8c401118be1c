use quiz_core::model::{Answer, CategoryScore, Guess, Question, QuestionId, QuestionKind, QuizOptions};
use quiz_core::time::fixed_now;
use services::{AppServices, Clock};
use storage::repository::Storage;
use storage::sqlite::SqliteRepository;

fn services() -> AppServices {
    AppServices::from_storage(&Storage::in_memory(), Clock::fixed(fixed_now()))
}

async fn sqlite_services(name: &str) -> (AppServices, SqliteRepository) {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .unwrap();
    repo.migrate().await.unwrap();
    let app = AppServices::from_storage(
        &Storage::from_repository(repo.clone()),
        Clock::fixed(fixed_now()),
    );
    (app, repo)
}

async fn delete_question(repo: &SqliteRepository, id: QuestionId) {
    sqlx::query("DELETE FROM questions WHERE id = ?1")
        .bind(i64::try_from(id.value()).unwrap())
        .execute(repo.pool())
        .await
        .unwrap();
}

fn true_false(content: &str) -> Question {
    Question::new(
        QuestionId::new(0),
        content,
        None,
        None,
        QuestionKind::TrueFalse { correct: true },
    )
    .unwrap()
}

#[tokio::test]
async fn full_attempt_updates_progress_per_category() {
    let app = services();
    let elder = app.categories().new_category("elderberries").await.unwrap();
    app.categories().new_category("straw.berries").await.unwrap();

    let quiz = app
        .quizzes()
        .create_quiz(
            "test quiz 1",
            "d1",
            "tq1",
            Some(elder.id()),
            QuizOptions::default(),
        )
        .await
        .unwrap();

    let mut tf = Question::new(
        QuestionId::new(0),
        "Elderberries are poisonous raw.",
        None,
        Some(elder.id()),
        QuestionKind::TrueFalse { correct: true },
    )
    .unwrap();
    tf.add_to_quiz(quiz.id());
    let tf = app.quizzes().add_question(tf).await.unwrap();

    let mut mc = Question::new(
        QuestionId::new(0),
        "Pick the berry",
        None,
        Some(elder.id()),
        QuestionKind::MultipleChoice {
            answers: vec![
                Answer::new("elder", true).unwrap(),
                Answer::new("apple", false).unwrap(),
            ],
        },
    )
    .unwrap();
    mc.add_to_quiz(quiz.id());
    let mc = app.quizzes().add_question(mc).await.unwrap();

    let user = app
        .auth()
        .register("jacob", "jacob@jacob.com", "top_secret")
        .await
        .unwrap();

    let sittings = app.sittings();
    let mut sitting = sittings.load_or_create(user.id(), &quiz).await.unwrap();
    sittings
        .answer(&mut sitting, &quiz, tf.id(), Guess::TrueFalse(true))
        .await
        .unwrap();
    sittings
        .answer(&mut sitting, &quiz, mc.id(), Guess::Choice(1))
        .await
        .unwrap();
    assert!(sitting.is_complete());
    assert_eq!(sitting.current_score(), 1);
    assert_eq!(sitting.percent_correct(), 50);

    let incorrect = app
        .quizzes()
        .questions_by_id(sitting.incorrect_questions())
        .await
        .unwrap();
    assert_eq!(incorrect.len(), 1);
    assert_eq!(incorrect[0].content(), "Pick the berry");

    let scores = app.progress().list_all_cat_scores(user.id()).await.unwrap();
    let by_name: Vec<(String, CategoryScore)> = scores
        .iter()
        .map(|(name, score)| (name.to_string(), *score))
        .collect();
    assert_eq!(
        by_name,
        vec![
            ("elderberries".to_string(), CategoryScore::new(1, 2)),
            ("straw.berries".to_string(), CategoryScore::new(0, 0)),
        ]
    );
}

#[tokio::test]
async fn empty_quiz_sitting_reports_zero_percent() {
    let app = services();
    let quiz = app
        .quizzes()
        .create_quiz("empty", "", "empty", None, QuizOptions::default())
        .await
        .unwrap();
    let user = app.auth().register("jacob", "", "pw").await.unwrap();

    let mut sitting = app.sittings().load_or_create(user.id(), &quiz).await.unwrap();
    assert_eq!(sitting.next_question(), None);
    assert_eq!(sitting.percent_correct(), 0);

    app.sittings().finish(&mut sitting, &quiz).await.unwrap();
    assert!(sitting.is_complete());
    assert!(app.sittings().get_sitting(sitting.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn deleted_question_is_skipped_and_the_attempt_can_finish() {
    let (app, repo) = sqlite_services("memdb_deleted_question").await;
    let quiz = app
        .quizzes()
        .create_quiz("test quiz 1", "", "tq1", None, QuizOptions::default())
        .await
        .unwrap();
    let mut first = true_false("oink");
    first.add_to_quiz(quiz.id());
    let first = app.quizzes().add_question(first).await.unwrap();
    let mut second = true_false("squawk");
    second.add_to_quiz(quiz.id());
    let second = app.quizzes().add_question(second).await.unwrap();
    let user = app.auth().register("jacob", "", "pw").await.unwrap();

    let sittings = app.sittings();
    let sitting = sittings.load_or_create(user.id(), &quiz).await.unwrap();
    assert_eq!(sitting.next_question(), Some(first.id()));
    delete_question(&repo, first.id()).await;

    // every request reloads the stored sitting, so the skip has to be saved
    let mut reloaded = sittings.load_or_create(user.id(), &quiz).await.unwrap();
    let shown = sittings.pending_question(&mut reloaded, &quiz).await.unwrap();
    assert_eq!(shown.map(|q| q.id()), Some(second.id()));
    let stored = sittings.get_sitting(sitting.id()).await.unwrap().unwrap();
    assert_eq!(stored.next_question(), Some(second.id()));

    let mut reloaded = sittings.load_or_create(user.id(), &quiz).await.unwrap();
    let feedback = sittings
        .answer(&mut reloaded, &quiz, second.id(), Guess::TrueFalse(false))
        .await
        .unwrap()
        .unwrap();
    assert!(!feedback.correct);
    assert!(feedback.finished);
    assert!(reloaded.is_complete());
    assert!(sittings.pending_question(&mut reloaded, &quiz).await.unwrap().is_none());
    assert!(sittings.get_sitting(sitting.id()).await.unwrap().is_none());

    // a sitting whose questions are all gone finishes on the next look
    let mut next = sittings.load_or_create(user.id(), &quiz).await.unwrap();
    delete_question(&repo, second.id()).await;
    assert!(sittings.pending_question(&mut next, &quiz).await.unwrap().is_none());
    assert!(next.is_complete());
    assert!(sittings.get_sitting(next.id()).await.unwrap().is_none());
}

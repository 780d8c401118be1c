use quiz_core::model::{Answer, Question, QuestionId, QuestionKind, QuizId, QuizOptions};
use quiz_core::time::fixed_now;
use services::{AppServices, Clock};
use storage::repository::Storage;
use storage::sqlite::SqliteRepository;
use warp::http::Response;
use warp::hyper::body::Bytes;
use web::{AppState, SessionData, routes};

struct Fixture {
    state: AppState,
    tf: QuestionId,
    mc: QuestionId,
}

async fn add_question(state: &AppState, quiz: QuizId, content: &str, kind: QuestionKind) -> QuestionId {
    let elder = state
        .services
        .categories()
        .find_category("elderberries")
        .await
        .unwrap()
        .unwrap();
    let mut question = Question::new(
        QuestionId::new(0),
        content,
        Some(format!("about {content}")),
        Some(elder.id()),
        kind,
    )
    .unwrap();
    question.add_to_quiz(quiz);
    state
        .services
        .quizzes()
        .add_question(question)
        .await
        .unwrap()
        .id()
}

fn two_answers() -> QuestionKind {
    QuestionKind::MultipleChoice {
        answers: vec![
            Answer::new("parrot", true).unwrap(),
            Answer::new("mouse", false).unwrap(),
        ],
    }
}

async fn setup() -> Fixture {
    setup_with(&Storage::in_memory()).await
}

async fn setup_with(storage: &Storage) -> Fixture {
    let services = AppServices::from_storage(storage, Clock::fixed(fixed_now()));
    let state = AppState::new(services);

    let categories = state.services.categories();
    let elder = categories.new_category("elderberries").await.unwrap();
    categories.new_category("straw.berries").await.unwrap();
    categories.new_category("black berries").await.unwrap();

    let quizzes = state.services.quizzes();
    let quiz1 = quizzes
        .create_quiz(
            "test quiz 1",
            "d1",
            "tq1",
            Some(elder.id()),
            QuizOptions::default(),
        )
        .await
        .unwrap();
    quizzes
        .create_quiz("test quiz 2", "d2", "t q2", None, QuizOptions::default())
        .await
        .unwrap();

    let tf = add_question(
        &state,
        quiz1.id(),
        "oink",
        QuestionKind::TrueFalse { correct: true },
    )
    .await;
    let mc = add_question(&state, quiz1.id(), "squawk", two_answers()).await;

    Fixture { state, tf, mc }
}

fn body(resp: &Response<Bytes>) -> String {
    String::from_utf8(resp.body().to_vec()).unwrap()
}

fn cookie_of(resp: &Response<Bytes>) -> String {
    resp.headers()
        .get("set-cookie")
        .expect("set-cookie header")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn get(state: &AppState, path: &str, cookie: Option<&str>) -> Response<Bytes> {
    let mut req = warp::test::request().method("GET").path(path);
    if let Some(cookie) = cookie {
        req = req.header("cookie", cookie);
    }
    req.reply(&routes(state.clone())).await
}

async fn post(state: &AppState, path: &str, form: &str, cookie: Option<&str>) -> Response<Bytes> {
    let mut req = warp::test::request()
        .method("POST")
        .path(path)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(form.to_owned());
    if let Some(cookie) = cookie {
        req = req.header("cookie", cookie);
    }
    req.reply(&routes(state.clone())).await
}

#[tokio::test]
async fn index_lists_quizzes() {
    let fx = setup().await;
    let resp = get(&fx.state, "/q/", None).await;
    assert_eq!(resp.status(), 200);
    assert!(body(&resp).contains("test quiz 1"));
    assert!(body(&resp).contains("test quiz 2"));

    let root = get(&fx.state, "/", None).await;
    assert_eq!(root.status(), 303);
}

#[tokio::test]
async fn category_list_shows_normalized_names() {
    let fx = setup().await;
    let resp = get(&fx.state, "/q/category/", None).await;
    assert_eq!(resp.status(), 200);
    let page = body(&resp);
    assert!(page.contains("elderberries"));
    assert!(page.contains("straw.berries"));
    assert!(page.contains("black-berries"));
}

#[tokio::test]
async fn category_detail_filters_quizzes() {
    let fx = setup().await;
    let resp = get(&fx.state, "/q/category/elderberries/", None).await;
    assert_eq!(resp.status(), 200);
    assert!(body(&resp).contains("test quiz 1"));
    assert!(!body(&resp).contains("test quiz 2"));

    let empty = get(&fx.state, "/q/category/black-berries/", None).await;
    assert_eq!(empty.status(), 200);
    assert!(!body(&empty).contains("test quiz 1"));

    let missing = get(&fx.state, "/q/category/monkey/", None).await;
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn quiz_detail_by_slug() {
    let fx = setup().await;
    let resp = get(&fx.state, "/q/t-q2/", None).await;
    assert_eq!(resp.status(), 200);
    assert!(body(&resp).contains("test quiz 2"));

    let missing = get(&fx.state, "/q/nope/", None).await;
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn anonymous_progress_prompts_sign_up() {
    let fx = setup().await;
    let resp = get(&fx.state, "/q/progress/", None).await;
    assert_eq!(resp.status(), 200);
    assert!(body(&resp).contains("Sign up"));
    assert!(!body(&resp).contains("out of"));

    let token = fx.state.sessions.create(SessionData {
        score: Some(1),
        possible: Some(2),
        ..SessionData::default()
    });
    let cookie = format!("quiz_session={token}");
    let resp = get(&fx.state, "/q/progress/", Some(&cookie)).await;
    assert!(body(&resp).contains("1 out of 2"));
}

#[tokio::test]
async fn anonymous_attempt_counts_in_session() {
    let fx = setup().await;
    let take = "/q/tq1/take/";

    let first = get(&fx.state, take, None).await;
    assert_eq!(first.status(), 200);
    assert!(body(&first).contains("oink"));
    assert!(body(&first).contains("Question 1 of 2"));
    let cookie = cookie_of(&first);

    let second = post(
        &fx.state,
        take,
        &format!("question_id={}&guess=true", fx.tf),
        Some(&cookie),
    )
    .await;
    let page = body(&second);
    assert!(page.contains("You answered the above question correctly"));
    assert!(page.contains("about oink"));
    assert!(page.contains("squawk"));

    let done = post(
        &fx.state,
        take,
        &format!("question_id={}&guess=1", fx.mc),
        Some(&cookie),
    )
    .await;
    let page = body(&done);
    assert!(page.contains("You answered the above question incorrectly"));
    assert!(page.contains("50 percent"));

    let progress = get(&fx.state, "/q/progress/", Some(&cookie)).await;
    assert!(body(&progress).contains("1 out of 2"));
}

#[tokio::test]
async fn out_of_turn_and_malformed_answers() {
    let fx = setup().await;
    let take = "/q/tq1/take/";
    let cookie = cookie_of(&get(&fx.state, take, None).await);

    let skipped = post(
        &fx.state,
        take,
        &format!("question_id={}&guess=0", fx.mc),
        Some(&cookie),
    )
    .await;
    assert_eq!(skipped.status(), 200);
    let page = body(&skipped);
    assert!(page.contains("oink"));
    assert!(!page.contains("You answered the above question"));

    let bad = post(
        &fx.state,
        take,
        &format!("question_id={}&guess=maybe", fx.tf),
        Some(&cookie),
    )
    .await;
    assert_eq!(bad.status(), 400);
}

#[tokio::test]
async fn answers_at_end_lists_mistakes_on_results() {
    let fx = setup().await;
    let quiz = fx
        .state
        .services
        .quizzes()
        .create_quiz(
            "held back",
            "",
            "tq3",
            None,
            QuizOptions {
                answers_at_end: true,
                ..QuizOptions::default()
            },
        )
        .await
        .unwrap();
    let only = add_question(&fx.state, quiz.id(), "honk", two_answers()).await;

    let cookie = cookie_of(&get(&fx.state, "/q/tq3/take/", None).await);
    let done = post(
        &fx.state,
        "/q/tq3/take/",
        &format!("question_id={only}&guess=1"),
        Some(&cookie),
    )
    .await;
    let page = body(&done);
    assert!(!page.contains("You answered the above question"));
    assert!(page.contains("Questions you got wrong"));
    assert!(page.contains("honk"));
    assert!(page.contains("0 percent"));
}

#[tokio::test]
async fn registered_user_progress_and_attempt() {
    let fx = setup().await;

    let registered = post(
        &fx.state,
        "/accounts/register/",
        "username=jacob&email=jacob%40jacob.com&password=top_secret",
        None,
    )
    .await;
    assert_eq!(registered.status(), 303);
    let cookie = cookie_of(&registered);

    let progress = get(&fx.state, "/q/progress/", Some(&cookie)).await;
    let page = body(&progress);
    assert!(page.contains("Signed in as jacob"));
    assert!(page.contains("elderberries"));
    assert!(page.contains("straw.berries"));

    let take = "/q/tq1/take/";
    get(&fx.state, take, Some(&cookie)).await;
    post(
        &fx.state,
        take,
        &format!("question_id={}&guess=true", fx.tf),
        Some(&cookie),
    )
    .await;
    let done = post(
        &fx.state,
        take,
        &format!("question_id={}&guess=0", fx.mc),
        Some(&cookie),
    )
    .await;
    assert!(body(&done).contains("100 percent"));

    let user = fx
        .state
        .services
        .auth()
        .authenticate("jacob", "top_secret")
        .await
        .unwrap();
    let score = fx
        .state
        .services
        .progress()
        .check_cat_score(user.id(), "elderberries")
        .await
        .unwrap();
    assert_eq!((score.correct, score.possible), (2, 2));
}

#[tokio::test]
async fn login_and_logout() {
    let fx = setup().await;
    fx.state
        .services
        .auth()
        .register("jacob", "", "top_secret")
        .await
        .unwrap();

    let form = get(&fx.state, "/accounts/login/", None).await;
    assert_eq!(form.status(), 200);

    let wrong = post(
        &fx.state,
        "/accounts/login/",
        "username=jacob&password=nope",
        None,
    )
    .await;
    assert_eq!(wrong.status(), 200);
    assert!(body(&wrong).contains("correct username and password"));

    let ok = post(
        &fx.state,
        "/accounts/login/",
        "username=jacob&password=top_secret",
        None,
    )
    .await;
    assert_eq!(ok.status(), 303);
    let cookie = cookie_of(&ok);
    assert!(body(&get(&fx.state, "/q/", Some(&cookie)).await).contains("Signed in as jacob"));

    let out = post(&fx.state, "/accounts/logout/", "", Some(&cookie)).await;
    assert_eq!(out.status(), 303);
    assert!(
        out.headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );

    let after = get(&fx.state, "/q/progress/", Some(&cookie)).await;
    assert!(body(&after).contains("Sign up"));
    assert!(!body(&after).contains("Signed in as"));
}

#[tokio::test]
async fn signed_in_attempt_survives_a_deleted_question() {
    let repo = SqliteRepository::connect("sqlite:file:web_deleted_question?mode=memory&cache=shared")
        .await
        .unwrap();
    repo.migrate().await.unwrap();
    let fx = setup_with(&Storage::from_repository(repo.clone())).await;

    let registered = post(
        &fx.state,
        "/accounts/register/",
        "username=jacob&password=top_secret",
        None,
    )
    .await;
    let cookie = cookie_of(&registered);
    let take = "/q/tq1/take/";
    assert!(body(&get(&fx.state, take, Some(&cookie)).await).contains("oink"));

    sqlx::query("DELETE FROM questions WHERE id = ?1")
        .bind(i64::try_from(fx.tf.value()).unwrap())
        .execute(repo.pool())
        .await
        .unwrap();

    for _ in 0..2 {
        let page = body(&get(&fx.state, take, Some(&cookie)).await);
        assert!(page.contains("squawk"));
    }
    let done = post(
        &fx.state,
        take,
        &format!("question_id={}&guess=0", fx.mc),
        Some(&cookie),
    )
    .await;
    assert_eq!(done.status(), 200);
    let page = body(&done);
    assert!(page.contains("You answered the above question correctly"));
    assert!(page.contains("50 percent"));
}

use std::str::FromStr;

use serde::Deserialize;
use warp::Reply;
use warp::http::header::{HeaderValue, SET_COOKIE};
use warp::http::Uri;
use warp::reject::Rejection;
use warp::reply::Response;

use quiz_core::model::{Guess, QuestionId, QuestionSequence, Quiz, Sitting, User};
use services::{AnswerFeedback, AuthError};

use crate::AppState;
use crate::names;
use crate::rejections::{InputError, NotFound, internal};
use crate::session::Session;
use crate::views::{self, Results};

#[derive(Debug, Deserialize)]
pub struct AnswerForm {
    question_id: String,
    guess: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    username: String,
    #[serde(default)]
    email: String,
    password: String,
}

fn respond(reply: impl Reply, cookie: Option<String>) -> Response {
    let mut response = reply.into_response();
    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

fn redirect(to: &'static str, cookie: Option<String>) -> Response {
    respond(warp::redirect::see_other(Uri::from_static(to)), cookie)
}

/// The signed-in user behind a session, if any.
async fn viewer(state: &AppState, session: &Session) -> Result<Option<User>, Rejection> {
    let Some(id) = session.data.user_id else {
        return Ok(None);
    };
    state
        .services
        .auth()
        .get_user(id)
        .await
        .map_err(|e| internal("could not load session user", e))
}

async fn find_quiz(state: &AppState, slug: &str) -> Result<Quiz, Rejection> {
    state
        .services
        .quizzes()
        .get_by_url(slug)
        .await
        .map_err(|e| internal("could not load quiz", e))?
        .ok_or_else(|| warp::reject::custom(NotFound))
}

fn position(sequence: &QuestionSequence) -> (u32, u32) {
    let remaining = u32::try_from(sequence.remaining()).unwrap_or(u32::MAX);
    let total = sequence.total();
    (total.saturating_sub(remaining).saturating_add(1), total)
}

//
// ─── LISTINGS ──────────────────────────────────────────────────────────────────
//

pub async fn index(state: AppState, session: Session) -> Result<Response, Rejection> {
    let user = viewer(&state, &session).await?;
    let quizzes = state
        .services
        .quizzes()
        .list_quizzes()
        .await
        .map_err(|e| internal("could not list quizzes", e))?;
    Ok(views::index(user.as_ref().map(User::username), &quizzes).into_response())
}

pub async fn category_list(state: AppState, session: Session) -> Result<Response, Rejection> {
    let user = viewer(&state, &session).await?;
    let categories = state
        .services
        .categories()
        .list_categories()
        .await
        .map_err(|e| internal("could not list categories", e))?;
    Ok(views::category_list(user.as_ref().map(User::username), &categories).into_response())
}

pub async fn category_detail(
    raw_name: String,
    state: AppState,
    session: Session,
) -> Result<Response, Rejection> {
    let name = urlencoding::decode(&raw_name).map_err(|_| warp::reject::custom(NotFound))?;
    let user = viewer(&state, &session).await?;
    let Some((category, quizzes)) = state
        .services
        .quizzes()
        .quizzes_in_category(&name)
        .await
        .map_err(|e| internal("could not list quizzes for category", e))?
    else {
        return Err(warp::reject::custom(NotFound));
    };
    Ok(
        views::category_detail(user.as_ref().map(User::username), &category, &quizzes)
            .into_response(),
    )
}

pub async fn progress(state: AppState, session: Session) -> Result<Response, Rejection> {
    if let Some(user) = viewer(&state, &session).await? {
        let scores = state
            .services
            .progress()
            .list_all_cat_scores(user.id())
            .await
            .map_err(|e| internal("could not load progress", e))?;
        return Ok(views::progress_user(user.username(), &scores).into_response());
    }

    let totals = match (session.data.score, session.data.possible) {
        (Some(score), Some(possible)) => Some((score, possible)),
        _ => None,
    };
    Ok(views::progress_anonymous(totals).into_response())
}

pub async fn quiz_detail(
    slug: String,
    state: AppState,
    session: Session,
) -> Result<Response, Rejection> {
    let quiz = find_quiz(&state, &slug).await?;
    let user = viewer(&state, &session).await?;
    let questions = state
        .services
        .quizzes()
        .questions_for(quiz.id())
        .await
        .map_err(|e| internal("could not list questions", e))?;
    Ok(
        views::quiz_detail(user.as_ref().map(User::username), &quiz, questions.len())
            .into_response(),
    )
}

//
// ─── TAKING A QUIZ ─────────────────────────────────────────────────────────────
//

pub async fn take_get(
    slug: String,
    state: AppState,
    session: Session,
) -> Result<Response, Rejection> {
    take(slug, state, session, None).await
}

pub async fn take_post(
    slug: String,
    state: AppState,
    session: Session,
    form: AnswerForm,
) -> Result<Response, Rejection> {
    let question_id = QuestionId::from_str(form.question_id.trim()).map_err(|e| {
        tracing::warn!("rejected answer: {e}");
        warp::reject::custom(InputError)
    })?;
    let guess = Guess::parse(&form.guess).ok_or_else(|| {
        tracing::warn!(guess = %form.guess, "rejected answer: unreadable guess");
        warp::reject::custom(InputError)
    })?;
    take(slug, state, session, Some((question_id, guess))).await
}

async fn take(
    slug: String,
    state: AppState,
    session: Session,
    answer: Option<(QuestionId, Guess)>,
) -> Result<Response, Rejection> {
    let quiz = find_quiz(&state, &slug).await?;
    match viewer(&state, &session).await? {
        Some(user) => take_as_user(&state, &quiz, &user, answer).await,
        None => take_anonymously(&state, &quiz, session, answer).await,
    }
}

async fn take_as_user(
    state: &AppState,
    quiz: &Quiz,
    user: &User,
    answer: Option<(QuestionId, Guess)>,
) -> Result<Response, Rejection> {
    let sittings = state.services.sittings();
    let mut sitting = sittings
        .load_or_create(user.id(), quiz)
        .await
        .map_err(|e| internal("could not load sitting", e))?;

    let feedback = match answer {
        Some((question_id, guess)) => sittings
            .answer(&mut sitting, quiz, question_id, guess)
            .await
            .map_err(|e| internal("could not record answer", e))?,
        None => None,
    };
    let shown = feedback.as_ref().filter(|_| !quiz.answers_at_end());

    let pending = sittings
        .pending_question(&mut sitting, quiz)
        .await
        .map_err(|e| internal("could not load question", e))?;
    if let Some(question) = pending {
        let page = views::question_page(
            Some(user.username()),
            quiz,
            &question,
            position(sitting.sequence()),
            shown,
        );
        return Ok(page.into_response());
    }

    let summary = sitting_summary(&sitting);
    let page = results(state, quiz, Some(user.username()), &summary, shown).await?;
    Ok(page.into_response())
}

async fn take_anonymously(
    state: &AppState,
    quiz: &Quiz,
    mut session: Session,
    answer: Option<(QuestionId, Guess)>,
) -> Result<Response, Rejection> {
    let sittings = state.services.sittings();
    let mut sequence = match session.data.sequences.remove(&quiz.id()) {
        Some(existing) => existing,
        None => sittings
            .new_sequence(quiz)
            .await
            .map_err(|e| internal("could not start quiz", e))?,
    };

    let feedback = match answer {
        Some((question_id, guess)) => sittings
            .answer_anonymous(&mut sequence, question_id, guess)
            .await
            .map_err(|e| internal("could not grade answer", e))?,
        None => None,
    };
    if let Some(graded) = &feedback {
        session.data.record_answer(graded.correct);
    }
    let shown = feedback.as_ref().filter(|_| !quiz.answers_at_end());

    let pending = sittings
        .pending_question_anonymous(&mut sequence)
        .await
        .map_err(|e| internal("could not load question", e))?;

    let page = match pending {
        Some(question) => {
            let page = views::question_page(None, quiz, &question, position(&sequence), shown);
            session.data.sequences.insert(quiz.id(), sequence);
            page
        }
        None => results(state, quiz, None, &sequence_summary(&sequence), shown).await?,
    };

    let cookie = state.sessions.commit(session);
    Ok(respond(page, cookie))
}

struct Summary {
    score: u32,
    total: u32,
    percent: u32,
    incorrect: Vec<QuestionId>,
}

fn sitting_summary(sitting: &Sitting) -> Summary {
    Summary {
        score: sitting.current_score(),
        total: sitting.sequence().total(),
        percent: sitting.percent_correct(),
        incorrect: sitting.incorrect_questions().to_vec(),
    }
}

fn sequence_summary(sequence: &QuestionSequence) -> Summary {
    Summary {
        score: sequence.current_score(),
        total: sequence.total(),
        percent: sequence.percent_correct(),
        incorrect: sequence.incorrect_questions().to_vec(),
    }
}

async fn results(
    state: &AppState,
    quiz: &Quiz,
    username: Option<&str>,
    summary: &Summary,
    previous: Option<&AnswerFeedback>,
) -> Result<maud::Markup, Rejection> {
    let incorrect = if quiz.answers_at_end() {
        state
            .services
            .quizzes()
            .questions_by_id(&summary.incorrect)
            .await
            .map_err(|e| internal("could not load incorrect questions", e))?
    } else {
        Vec::new()
    };
    Ok(views::results_page(
        username,
        quiz,
        &Results {
            score: summary.score,
            total: summary.total,
            percent: summary.percent,
            previous,
            incorrect: &incorrect,
        },
    ))
}

//
// ─── ACCOUNTS ──────────────────────────────────────────────────────────────────
//

pub async fn login_form() -> Result<Response, Rejection> {
    Ok(views::login_page(None).into_response())
}

pub async fn login(
    state: AppState,
    mut session: Session,
    form: LoginForm,
) -> Result<Response, Rejection> {
    match state
        .services
        .auth()
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => {
            session.data.user_id = Some(user.id());
            let cookie = state.sessions.renew(session);
            Ok(redirect(names::QUIZ_INDEX_URL, Some(cookie)))
        }
        Err(AuthError::InvalidCredentials) => Ok(views::login_page(Some(
            "Please enter a correct username and password.",
        ))
        .into_response()),
        Err(e) => Err(internal("could not log in", e)),
    }
}

pub async fn logout(state: AppState, session: Session) -> Result<Response, Rejection> {
    let cookie = state.sessions.destroy(&session);
    Ok(redirect(names::QUIZ_INDEX_URL, Some(cookie)))
}

pub async fn register_form() -> Result<Response, Rejection> {
    Ok(views::register_page(None).into_response())
}

pub async fn register(
    state: AppState,
    mut session: Session,
    form: RegisterForm,
) -> Result<Response, Rejection> {
    match state
        .services
        .auth()
        .register(&form.username, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            session.data.user_id = Some(user.id());
            let cookie = state.sessions.renew(session);
            Ok(redirect(names::PROGRESS_URL, Some(cookie)))
        }
        Err(e @ (AuthError::UsernameTaken | AuthError::EmptyPassword | AuthError::User(_))) => {
            Ok(views::register_page(Some(&e.to_string())).into_response())
        }
        Err(e) => Err(internal("could not register", e)),
    }
}

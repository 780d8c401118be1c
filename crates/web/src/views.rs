use std::collections::BTreeMap;

use maud::{DOCTYPE, Markup, html};
use warp::http::StatusCode;

use quiz_core::model::{
    Category, CategoryName, CategoryScore, Guess, Question, QuestionKind, Quiz,
};
use services::AnswerFeedback;

use crate::names;

pub fn page(title: &str, username: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | Quiz" }
            }
            body {
                nav {
                    a href=(names::QUIZ_INDEX_URL) { "Quizzes" } " "
                    a href=(names::CATEGORY_LIST_URL) { "Categories" } " "
                    a href=(names::PROGRESS_URL) { "Progress" } " "
                    @if let Some(name) = username {
                        span { "Signed in as " (name) } " "
                        form method="post" action=(names::LOGOUT_URL) style="display:inline" {
                            button type="submit" { "Log out" }
                        }
                    } @else {
                        a href=(names::LOGIN_URL) { "Log in" } " "
                        a href=(names::REGISTER_URL) { "Sign up" }
                    }
                }
                main {
                    h1 { (title) }
                    (content)
                }
            }
        }
    }
}

pub fn error_page(status: StatusCode, message: &str) -> Markup {
    let title = status.canonical_reason().unwrap_or("Error");
    page(title, None, html! { p { (message) } })
}

fn quiz_list(quizzes: &[Quiz]) -> Markup {
    html! {
        @if quizzes.is_empty() {
            p { "There are no available quizzes." }
        } @else {
            ul {
                @for quiz in quizzes {
                    li {
                        a href=(names::quiz_url(quiz.url())) { (quiz.title()) }
                        @if !quiz.description().is_empty() {
                            " - " (quiz.description())
                        }
                    }
                }
            }
        }
    }
}

pub fn index(username: Option<&str>, quizzes: &[Quiz]) -> Markup {
    page("All quizzes", username, quiz_list(quizzes))
}

pub fn category_list(username: Option<&str>, categories: &[Category]) -> Markup {
    page(
        "Categories",
        username,
        html! {
            @if categories.is_empty() {
                p { "There are no categories yet." }
            } @else {
                ul {
                    @for category in categories {
                        li {
                            a href=(names::category_url(category.name().as_str())) {
                                (category.name().as_str())
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn category_detail(username: Option<&str>, category: &Category, quizzes: &[Quiz]) -> Markup {
    page(
        &format!("Quizzes in the {} category", category.name()),
        username,
        quiz_list(quizzes),
    )
}

pub fn progress_anonymous(totals: Option<(u32, u32)>) -> Markup {
    page(
        "Progress",
        None,
        html! {
            @if let Some((score, possible)) = totals {
                p { "You have answered " (score) " out of " (possible) " questions correctly." }
                p {
                    "Your progress is only kept until you leave. "
                    a href=(names::REGISTER_URL) { "Sign up" }
                    " to track it per category."
                }
            } @else {
                p {
                    a href=(names::REGISTER_URL) { "Sign up" }
                    " to keep track of your progress across quizzes and categories."
                }
            }
        },
    )
}

pub fn progress_user(username: &str, scores: &BTreeMap<CategoryName, CategoryScore>) -> Markup {
    page(
        "Progress",
        Some(username),
        html! {
            @if scores.is_empty() {
                p { "No categories have been created yet." }
            } @else {
                table {
                    thead {
                        tr { th { "Category" } th { "Correct" } th { "Possible" } th { "%" } }
                    }
                    tbody {
                        @for (name, score) in scores {
                            tr {
                                td { (name.as_str()) }
                                td { (score.correct) }
                                td { (score.possible) }
                                td { (score.percent()) }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn quiz_detail(username: Option<&str>, quiz: &Quiz, question_count: usize) -> Markup {
    page(
        quiz.title(),
        username,
        html! {
            @if !quiz.description().is_empty() {
                p { (quiz.description()) }
            }
            p { (question_count) " questions" }
            @if quiz.answers_at_end() {
                p { "Answers are revealed at the end of the quiz." }
            }
            @if quiz.exam_paper() && username.is_some() {
                p { "Your completed attempt will be kept for review." }
            }
            a href=(names::take_url(quiz.url())) { "Start quiz" }
        },
    )
}

fn describe_guess(question: &Question, guess: Guess) -> String {
    match (question.kind(), guess) {
        (QuestionKind::MultipleChoice { answers }, Guess::Choice(index)) => answers
            .get(index)
            .map_or_else(|| "an unknown option".to_owned(), |a| a.content().to_owned()),
        (_, Guess::TrueFalse(value)) => value.to_string(),
        (QuestionKind::TrueFalse { .. }, Guess::Choice(_)) => "an unknown option".to_owned(),
    }
}

fn correct_answer(question: &Question) -> String {
    match question.kind() {
        QuestionKind::MultipleChoice { answers } => answers
            .iter()
            .filter(|a| a.is_correct())
            .map(|a| a.content())
            .collect::<Vec<_>>()
            .join(", "),
        QuestionKind::TrueFalse { correct } => correct.to_string(),
    }
}

fn feedback(previous: &AnswerFeedback) -> Markup {
    html! {
        section class="previous" {
            p { "The previous question: " strong { (previous.question.content()) } }
            p { "You answered " (describe_guess(&previous.question, previous.guess)) "." }
            @if previous.correct {
                p class="correct" { "You answered the above question correctly" }
            } @else {
                p class="incorrect" { "You answered the above question incorrectly" }
                p { "The correct answer is " (correct_answer(&previous.question)) "." }
            }
            @if let Some(explanation) = previous.question.explanation() {
                p class="explanation" { (explanation) }
            }
        }
    }
}

pub fn question_page(
    username: Option<&str>,
    quiz: &Quiz,
    question: &Question,
    position: (u32, u32),
    previous: Option<&AnswerFeedback>,
) -> Markup {
    page(
        quiz.title(),
        username,
        html! {
            @if let Some(previous) = previous {
                (feedback(previous))
            }
            p { "Question " (position.0) " of " (position.1) }
            form method="post" action=(names::take_url(quiz.url())) {
                input type="hidden" name="question_id" value=(question.id().to_string());
                p { (question.content()) }
                @match question.kind() {
                    QuestionKind::MultipleChoice { answers } => {
                        @for (index, answer) in answers.iter().enumerate() {
                            label {
                                input type="radio" name="guess" value=(index) required;
                                " " (answer.content())
                            }
                            br;
                        }
                    }
                    QuestionKind::TrueFalse { .. } => {
                        label { input type="radio" name="guess" value="true" required; " True" }
                        br;
                        label { input type="radio" name="guess" value="false" required; " False" }
                        br;
                    }
                }
                button type="submit" { "Check" }
            }
        },
    )
}

/// Summary shown once every question has been answered.
pub struct Results<'a> {
    pub score: u32,
    pub total: u32,
    pub percent: u32,
    pub previous: Option<&'a AnswerFeedback>,
    pub incorrect: &'a [Question],
}

pub fn results_page(username: Option<&str>, quiz: &Quiz, results: &Results<'_>) -> Markup {
    page(
        quiz.title(),
        username,
        html! {
            @if let Some(previous) = results.previous {
                (feedback(previous))
            }
            h2 { "Quiz results" }
            p { "You answered " (results.score) " questions correctly out of " (results.total) ", giving you " (results.percent) " percent correct." }
            @if username.is_some() {
                p { "Your category scores have been added to your " a href=(names::PROGRESS_URL) { "progress" } "." }
            } @else {
                p { a href=(names::REGISTER_URL) { "Sign up" } " to keep your scores." }
            }
            @if !results.incorrect.is_empty() {
                h3 { "Questions you got wrong" }
                ul {
                    @for question in results.incorrect {
                        li {
                            (question.content())
                            " - correct answer: " (correct_answer(question))
                            @if let Some(explanation) = question.explanation() {
                                br; em { (explanation) }
                            }
                        }
                    }
                }
            }
            a href=(names::QUIZ_INDEX_URL) { "Back to quizzes" }
        },
    )
}

pub fn login_page(error: Option<&str>) -> Markup {
    page(
        "Log in",
        None,
        html! {
            @if let Some(error) = error {
                p class="error" { (error) }
            }
            form method="post" action=(names::LOGIN_URL) {
                label { "Username " input type="text" name="username" required; }
                br;
                label { "Password " input type="password" name="password" required; }
                br;
                button type="submit" { "Log in" }
            }
            p { "No account yet? " a href=(names::REGISTER_URL) { "Sign up" } }
        },
    )
}

pub fn register_page(error: Option<&str>) -> Markup {
    page(
        "Sign up",
        None,
        html! {
            @if let Some(error) = error {
                p class="error" { (error) }
            }
            form method="post" action=(names::REGISTER_URL) {
                label { "Username " input type="text" name="username" required; }
                br;
                label { "Email " input type="email" name="email"; }
                br;
                label { "Password " input type="password" name="password" required; }
                br;
                button type="submit" { "Sign up" }
            }
        },
    )
}

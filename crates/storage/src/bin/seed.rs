use std::fmt;

use quiz_core::model::{
    Answer, CategoryName, Question, QuestionId, QuestionKind, Quiz, QuizId, QuizOptions,
};
use storage::repository::{Storage, StorageError};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    category: String,
    quiz_title: String,
    quiz_url: String,
    exam_paper: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    EmptyCategory,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::EmptyCategory => write!(f, "--category must not be blank"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut category =
            std::env::var("QUIZ_SEED_CATEGORY").unwrap_or_else(|_| "berries".into());
        let mut quiz_title =
            std::env::var("QUIZ_SEED_TITLE").unwrap_or_else(|_| "Berry basics".into());
        let mut quiz_url = std::env::var("QUIZ_SEED_URL").unwrap_or_else(|_| "berry basics".into());
        let mut exam_paper = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--category" => category = require_value(args, "--category")?,
                "--title" => quiz_title = require_value(args, "--title")?,
                "--url" => quiz_url = require_value(args, "--url")?,
                "--exam-paper" => exam_paper = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        // a blank name would be stored as "" and break every progress record
        if category.trim().is_empty() {
            return Err(ArgsError::EmptyCategory);
        }

        Ok(Self {
            db_url,
            category,
            quiz_title,
            quiz_url,
            exam_paper,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --category <name>         Category for the sample quiz (default: berries)");
    eprintln!("  --title <text>            Quiz title (default: Berry basics)");
    eprintln!("  --url <text>              Quiz url, slugified (default: berry basics)");
    eprintln!("  --exam-paper              Keep completed sittings for review");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_SEED_CATEGORY, QUIZ_SEED_TITLE, QUIZ_SEED_URL");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(&mut std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let name = CategoryName::new(&args.category);
    let category = match storage.categories.find_category(&name).await? {
        Some(existing) => existing,
        None => storage.categories.insert_category(&name).await?,
    };

    let draft = Quiz::new(
        QuizId::new(0),
        args.quiz_title.clone(),
        format!("Sample questions about {}", category.name()),
        &args.quiz_url,
        Some(category.id()),
        QuizOptions {
            exam_paper: args.exam_paper,
            ..QuizOptions::default()
        },
    )?;

    let quiz_id = match storage.quizzes.insert_quiz(&draft).await {
        Ok(id) => id,
        Err(StorageError::Conflict) => {
            eprintln!("seed: quiz url {:?} already exists, nothing to do.", draft.url());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let samples = [
        (
            "Which of these is a berry in the botanical sense?",
            QuestionKind::MultipleChoice {
                answers: vec![
                    Answer::new("Banana", true)?,
                    Answer::new("Strawberry", false)?,
                    Answer::new("Raspberry", false)?,
                ],
            },
            Some("Strawberries and raspberries are aggregate fruits."),
        ),
        (
            "Elderberries should be cooked before eating.",
            QuestionKind::TrueFalse { correct: true },
            None,
        ),
        (
            "Blackberries turn red when fully ripe.",
            QuestionKind::TrueFalse { correct: false },
            Some("They are red while unripe and black when ripe."),
        ),
    ];

    let mut inserted = 0_u32;
    for (content, kind, explanation) in samples {
        let mut question = Question::new(
            QuestionId::new(0),
            content,
            explanation.map(str::to_owned),
            Some(category.id()),
            kind,
        )?;
        question.add_to_quiz(quiz_id);
        storage.questions.insert_question(&question).await?;
        inserted += 1;
    }

    eprintln!(
        "seed: quiz {} ({}) with {inserted} questions in category {}",
        quiz_id,
        draft.url(),
        category.name()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

use studyhall_api::catalog::InMemoryCatalog;
use studyhall_api::config::Config;
use studyhall_api::models::{
    AnswerOption, MultiAnswerPolicy, Question, QuestionType, QuizDefinition, QuizPolicy,
    QuizSection,
};
use studyhall_api::store::InMemoryAttemptStore;
use studyhall_api::{create_router, AppState};

/// Builds the real router over in-memory collaborators seeded with the given
/// quizzes. Returns the state too so tests can drive the deadline worker.
pub fn create_test_app(quizzes: Vec<(QuizDefinition, QuizPolicy)>) -> (Router, Arc<AppState>) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let catalog = InMemoryCatalog::new();
    for (definition, policy) in quizzes {
        catalog.insert(definition, policy);
    }

    let state = Arc::new(AppState::with_collaborators(
        Config::for_tests(),
        Arc::new(catalog),
        Arc::new(InMemoryAttemptStore::new()),
    ));

    (create_router(state.clone()), state)
}

fn option(id: &str, correct: bool) -> AnswerOption {
    AnswerOption {
        id: id.to_string(),
        text: format!("Option {}", id),
        is_correct: correct,
    }
}

/// Two-question quiz: q1 single-choice (correct option `q1-a`, 5 points) and
/// q2 fill-blank (accepts "Ottawa", 5 points). Pass mark 50%.
pub fn two_question_quiz(
    quiz_id: &str,
    duration_seconds: Option<i64>,
    max_attempts: Option<u32>,
) -> (QuizDefinition, QuizPolicy) {
    let definition = QuizDefinition {
        id: quiz_id.to_string(),
        title: "Geography basics".to_string(),
        sections: vec![QuizSection {
            id: "s1".to_string(),
            title: "Capitals".to_string(),
            questions: vec![
                Question {
                    id: "q1".to_string(),
                    prompt: "Which city is the capital of France?".to_string(),
                    question_type: QuestionType::SingleChoice,
                    points: 5,
                    options: vec![
                        option("q1-a", true),
                        option("q1-b", false),
                        option("q1-c", false),
                    ],
                    accepted_texts: vec![],
                },
                Question {
                    id: "q2".to_string(),
                    prompt: "Name the capital of Canada.".to_string(),
                    question_type: QuestionType::FillBlank,
                    points: 5,
                    options: vec![],
                    accepted_texts: vec!["Ottawa".to_string()],
                },
            ],
            groups: vec![],
        }],
    };

    let policy = QuizPolicy {
        duration_seconds,
        passing_threshold: 50.0,
        shuffle_questions: true,
        shuffle_answers: true,
        max_attempts,
        multi_answer_policy: MultiAnswerPolicy::Strict,
    };

    (definition, policy)
}

pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            builder.body(Body::from(json.to_string())).unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Question ids in learner-visible order, walking the snapshot tree.
pub fn snapshot_question_ids(snapshot: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    for section in snapshot["sections"].as_array().unwrap() {
        for question in section["questions"].as_array().unwrap() {
            ids.push(question["id"].as_str().unwrap().to_string());
        }
        for group in section["groups"].as_array().unwrap() {
            for question in group["questions"].as_array().unwrap() {
                ids.push(question["id"].as_str().unwrap().to_string());
            }
        }
    }
    ids
}

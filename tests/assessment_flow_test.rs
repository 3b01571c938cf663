use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

fn sign_token(sub: Uuid, role: &str) -> String {
    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        role: Option<String>,
    }
    let exp = (Utc::now() + Duration::hours(1)).timestamp() as usize;
    let token = encode(
        &Header::default(),
        &Claims {
            sub: sub.to_string(),
            exp,
            role: Some(role.to_string()),
        },
        &EncodingKey::from_secret(lms_backend::config::get_config().jwt_secret.as_bytes()),
    )
    .expect("sign token");
    format!("Bearer {}", token)
}

fn staff_router(state: lms_backend::AppState) -> Router {
    Router::new()
        .route(
            "/api/assessments",
            get(lms_backend::routes::assessment::list_assessments)
                .post(lms_backend::routes::assessment::create_assessment),
        )
        .route(
            "/api/assessments/:id",
            get(lms_backend::routes::assessment::get_assessment)
                .put(lms_backend::routes::assessment::update_assessment)
                .delete(lms_backend::routes::assessment::delete_assessment),
        )
        .route(
            "/api/assessments/:id/publish",
            post(lms_backend::routes::assessment::publish_assessment),
        )
        .route(
            "/api/assessments/:id/analytics",
            get(lms_backend::routes::assessment::assessment_analytics),
        )
        .layer(axum::middleware::from_fn(
            lms_backend::middleware::auth::require_staff,
        ))
        .with_state(state)
}

fn student_router(state: lms_backend::AppState) -> Router {
    Router::new()
        .route(
            "/api/student-assessments/available",
            get(lms_backend::routes::student_assessment::available_assessments),
        )
        .route(
            "/api/student-assessments/results",
            get(lms_backend::routes::student_assessment::my_results),
        )
        .route(
            "/api/student-assessments/:id/start",
            post(lms_backend::routes::student_assessment::start_assessment),
        )
        .route(
            "/api/student-assessments/:id/answer",
            axum::routing::put(lms_backend::routes::student_assessment::submit_answer),
        )
        .route(
            "/api/student-assessments/:id/submit",
            post(lms_backend::routes::student_assessment::submit_assessment),
        )
        .layer(axum::middleware::from_fn(
            lms_backend::middleware::auth::require_student,
        ))
        .with_state(state)
}

async fn body_json(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn assessment_lifecycle_end_to_end() {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set; skipping assessment_lifecycle_end_to_end");
        return;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("STAFF_RPS", "100");
    env::set_var("STUDENT_RPS", "100");

    lms_backend::config::init_config().expect("init config");

    let pool = lms_backend::database::pool::create_pool().await.expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    // Seed a school, a mentor assigned to it, a student in it, and two
    // approved bank questions.
    let mentor_uid = Uuid::new_v4();
    let student_uid = Uuid::new_v4();

    let school_id: Uuid =
        sqlx::query_scalar(r#"INSERT INTO schools (name) VALUES ($1) RETURNING id"#)
            .bind(format!("Test School {}", Uuid::new_v4()))
            .fetch_one(&pool)
            .await
            .expect("seed school");

    sqlx::query(r#"INSERT INTO mentors (user_id, assigned_schools) VALUES ($1, $2)"#)
        .bind(mentor_uid)
        .bind(vec![school_id])
        .execute(&pool)
        .await
        .expect("seed mentor");

    sqlx::query(
        r#"INSERT INTO students (user_id, school_id, student_code, grade, section)
           VALUES ($1, $2, $3, 'Grade 7', 'A')"#,
    )
    .bind(student_uid)
    .bind(school_id)
    .bind(format!("ST-{}", Uuid::new_v4()))
    .execute(&pool)
    .await
    .expect("seed student");

    let mut question_ids = Vec::new();
    for text in ["2 + 2 = ?", "3 * 3 = ?"] {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO questions
                (question_text, grade, subject, module, answer_choices, correct_answers,
                 created_by, approved_by, approved_at)
            VALUES ($1, 'Grade 7', 'Math', 'Arithmetic', $2, $3, $4, $4, NOW())
            RETURNING id
            "#,
        )
        .bind(text)
        .bind(json!([
            {"text": "wrong", "order": 1},
            {"text": "right", "order": 2},
        ]))
        .bind(vec![1i32])
        .bind(mentor_uid)
        .fetch_one(&pool)
        .await
        .expect("seed question");
        question_ids.push(id);
    }

    let state = lms_backend::AppState::new(pool.clone());
    let staff = staff_router(state.clone());
    let student = student_router(state);

    let mentor_auth = sign_token(mentor_uid, "mentor");
    let student_auth = sign_token(student_uid, "student");

    // Create a draft scheduled in the future.
    let create_body = json!({
        "title": "Arithmetic Check",
        "instructions": "Answer every question.",
        "grade": "Grade 7",
        "subject": "Math",
        "modules": ["Arithmetic"],
        "start_date": Utc::now() + Duration::hours(1),
        "end_date": Utc::now() + Duration::hours(3),
        "duration_minutes": 30,
        "questions": [
            {"question_id": question_ids[0], "order": 1, "marks": 2},
            {"question_id": question_ids[1], "order": 2}
        ],
        "target_students": [{"grade": "Grade 7", "sections": []}]
    });
    let req = Request::builder()
        .method("POST")
        .uri("/api/assessments")
        .header("content-type", "application/json")
        .header("authorization", mentor_auth.clone())
        .body(Body::from(create_body.to_string()))
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["success"], json!(true));
    // marks default to 1, so 2 + 1
    assert_eq!(created["data"]["total_marks"], json!(3));
    let assessment_id = Uuid::parse_str(created["data"]["id"].as_str().unwrap()).unwrap();

    // Open the window now so the student can start, then publish.
    let patch_body = json!({ "start_date": Utc::now() - Duration::minutes(1) });
    let req = Request::builder()
        .method("PUT")
        .uri(format!("/api/assessments/{}", assessment_id))
        .header("content-type", "application/json")
        .header("authorization", mentor_auth.clone())
        .body(Body::from(patch_body.to_string()))
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/assessments/{}/publish", assessment_id))
        .header("content-type", "application/json")
        .header("authorization", mentor_auth.clone())
        .body(Body::from(json!({"notification_message": "Go!"}).to_string()))
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let published = body_json(resp).await;
    assert_eq!(published["data"]["status"], json!("published"));

    // The student sees it listed.
    let req = Request::builder()
        .method("GET")
        .uri("/api/student-assessments/available")
        .header("authorization", student_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let available = body_json(resp).await;
    let listed = available["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["id"] == json!(assessment_id.to_string()));
    assert!(listed, "published assessment should be available");

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/student-assessments/{}/start", assessment_id))
        .header("authorization", student_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let started = body_json(resp).await;
    assert!(started["data"]["time_remaining"].as_i64().unwrap() > 0);

    // Starting again resumes rather than conflicting.
    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/student-assessments/{}/start", assessment_id))
        .header("authorization", student_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Correct answer on the 2-mark question.
    let answer_body = json!({
        "question_id": question_ids[0],
        "selected_answers": [1],
        "time_spent_seconds": 20
    });
    let req = Request::builder()
        .method("PUT")
        .uri(format!("/api/student-assessments/{}/answer", assessment_id))
        .header("content-type", "application/json")
        .header("authorization", student_auth.clone())
        .body(Body::from(answer_body.to_string()))
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let answered = body_json(resp).await;
    assert_eq!(answered["data"]["is_correct"], json!(true));
    assert_eq!(answered["data"]["marks_obtained"], json!(2));

    // Wrong answer on the second question.
    let answer_body = json!({
        "question_id": question_ids[1],
        "selected_answers": [0],
        "time_spent_seconds": 10
    });
    let req = Request::builder()
        .method("PUT")
        .uri(format!("/api/student-assessments/{}/answer", assessment_id))
        .header("content-type", "application/json")
        .header("authorization", student_auth.clone())
        .body(Body::from(answer_body.to_string()))
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let answered = body_json(resp).await;
    assert_eq!(answered["data"]["is_correct"], json!(false));
    assert_eq!(answered["data"]["marks_obtained"], json!(0));

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/student-assessments/{}/submit", assessment_id))
        .header("authorization", student_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let submitted = body_json(resp).await;
    assert_eq!(submitted["data"]["obtained_marks"], json!(2));
    assert_eq!(submitted["data"]["total_marks"], json!(3));
    // 2/3 = 66.67, grade band B; Decimal serializes as a string
    assert_eq!(submitted["data"]["percentage"], json!("66.67"));
    assert_eq!(submitted["data"]["grade"], json!("B"));

    // Submitting twice is a conflict, and so is restarting.
    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/student-assessments/{}/submit", assessment_id))
        .header("authorization", student_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/student-assessments/{}/start", assessment_id))
        .header("authorization", student_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Results reflect the graded attempt.
    let req = Request::builder()
        .method("GET")
        .uri("/api/student-assessments/results")
        .header("authorization", student_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let results = body_json(resp).await;
    let result = &results["data"].as_array().unwrap()[0];
    assert_eq!(result["grade"], json!("B"));
    assert_eq!(result["assessment"]["title"], json!("Arithmetic Check"));

    // Staff analytics over the single submitted attempt.
    let req = Request::builder()
        .method("GET")
        .uri(format!("/api/assessments/{}/analytics", assessment_id))
        .header("authorization", mentor_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let analytics = body_json(resp).await;
    assert_eq!(analytics["data"]["total_attempts"], json!(1));
    assert_eq!(analytics["data"]["completed_attempts"], json!(1));
    let completion_rate: f64 = analytics["data"]["completion_rate"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(completion_rate, 100.0);
    assert_eq!(analytics["data"]["grade_distribution"]["B"], json!(1));

    // Delete is blocked while attempts exist.
    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/assessments/{}", assessment_id))
        .header("authorization", &mentor_auth)
        .body(Body::empty())
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // A student token cannot reach the staff surface.
    let req = Request::builder()
        .method("GET")
        .uri("/api/assessments")
        .header("authorization", student_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Second assessment for the edit-lock, timeout and delete-retry paths.
    let create_body = json!({
        "title": "Times Tables",
        "instructions": "One question.",
        "grade": "Grade 7",
        "subject": "Math",
        "modules": ["Arithmetic"],
        "start_date": Utc::now() + Duration::hours(1),
        "end_date": Utc::now() + Duration::hours(3),
        "duration_minutes": 30,
        "questions": [
            {"question_id": question_ids[0], "order": 1}
        ],
        "target_students": [{"grade": "Grade 7", "sections": []}]
    });
    let req = Request::builder()
        .method("POST")
        .uri("/api/assessments")
        .header("content-type", "application/json")
        .header("authorization", mentor_auth.clone())
        .body(Body::from(create_body.to_string()))
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    let second_id = Uuid::parse_str(created["data"]["id"].as_str().unwrap()).unwrap();

    let req = Request::builder()
        .method("PUT")
        .uri(format!("/api/assessments/{}", second_id))
        .header("content-type", "application/json")
        .header("authorization", mentor_auth.clone())
        .body(Body::from(
            json!({ "start_date": Utc::now() - Duration::minutes(1) }).to_string(),
        ))
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/assessments/{}/publish", second_id))
        .header("authorization", mentor_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Published and past its start date: structural edits are frozen.
    let req = Request::builder()
        .method("PUT")
        .uri(format!("/api/assessments/{}", second_id))
        .header("content-type", "application/json")
        .header("authorization", mentor_auth.clone())
        .body(Body::from(json!({ "title": "Renamed" }).to_string()))
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/student-assessments/{}/start", second_id))
        .header("authorization", student_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Run the clock out, then try to answer: the attempt flips to timeout
    // and the mutation is rejected.
    sqlx::query(
        r#"UPDATE assessment_attempts SET end_time = NOW() - INTERVAL '1 minute'
           WHERE assessment_id = $1"#,
    )
    .bind(second_id)
    .execute(&pool)
    .await
    .expect("expire attempt");

    let answer_body = json!({
        "question_id": question_ids[0],
        "selected_answers": [1],
        "time_spent_seconds": 5
    });
    let req = Request::builder()
        .method("PUT")
        .uri(format!("/api/student-assessments/{}/answer", second_id))
        .header("content-type", "application/json")
        .header("authorization", student_auth.clone())
        .body(Body::from(answer_body.to_string()))
        .unwrap();
    let resp = student.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (status, auto_submitted): (String, bool) = sqlx::query_as(
        r#"SELECT status, auto_submitted FROM assessment_attempts WHERE assessment_id = $1"#,
    )
    .bind(second_id)
    .fetch_one(&pool)
    .await
    .expect("fetch expired attempt");
    assert_eq!(status, "timeout");
    assert!(auto_submitted);

    // Delete is blocked by the timed-out attempt; once the attempt is gone
    // the same delete succeeds.
    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/assessments/{}", second_id))
        .header("authorization", mentor_auth.clone())
        .body(Body::empty())
        .unwrap();
    let resp = staff.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    sqlx::query(r#"DELETE FROM assessment_attempts WHERE assessment_id = $1"#)
        .bind(second_id)
        .execute(&pool)
        .await
        .expect("remove attempt");

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/assessments/{}", second_id))
        .header("authorization", mentor_auth)
        .body(Body::empty())
        .unwrap();
    let resp = staff.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

mod common;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{state, user_row, RecordingDatabase};
use restframe::controller::unknown_action;
use restframe::{app_routes, AppError, AppState, Controller, ControllerRegistry, Params};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Clone, Default)]
struct StatusController {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Controller for StatusController {
    async fn call(&self, action: &str, _params: &Params, _state: &AppState) -> Result<Value, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match action {
            "ping" => Ok(json!({ "pong": true })),
            other => Err(unknown_action(other)),
        }
    }
}

fn app(db: RecordingDatabase) -> Router {
    app_with(db, StatusController::default())
}

fn app_with(db: RecordingDatabase, controller: StatusController) -> Router {
    let controllers = ControllerRegistry::new().register("status", controller);
    app_routes(state(db).with_controllers(controllers))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String, String) {
    let res = app.oneshot(request).await.unwrap();
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn get_by_id_as_json() {
    let db = RecordingDatabase {
        rows: vec![user_row()],
        ..Default::default()
    };
    let log = db.clone();
    let (status, content_type, body) = send(app(db), get("/users/42?xformat=json")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/json; charset=UTF-8");
    let rows: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(rows[0]["name"], "Ann");
    let sql = log.statements();
    assert_eq!(sql.len(), 1);
    assert!(sql[0].starts_with("SELECT "));
    assert!(sql[0].contains("`users`.`id` = '42'"));
}

#[tokio::test]
async fn site_default_format_is_xml() {
    let db = RecordingDatabase {
        rows: vec![user_row()],
        ..Default::default()
    };
    let (status, content_type, body) = send(app(db), get("/users")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/xml; charset=UTF-8");
    assert!(body.starts_with("<?xml"));
    assert!(body.contains("<name>"));
    assert!(body.contains("Ann"));
}

#[tokio::test]
async fn put_inserts_from_json_body() {
    let db = RecordingDatabase::default();
    let log = db.clone();
    let request = Request::put("/users?xformat=json")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name": "Ann", "email": "ann@example.com"}"#))
        .unwrap();
    let (status, _, body) = send(app(db), request).await;

    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(summary["xsuccess"], true);
    assert_eq!(summary["xinsertid"], 7);
    assert!(log.statements()[0].starts_with("INSERT INTO `users`"));
}

#[tokio::test]
async fn invalid_field_is_rejected_before_sql() {
    let db = RecordingDatabase::default();
    let log = db.clone();
    let request = Request::put("/users?xformat=json&name=Ann&email=nope")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app(db), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(err["status"], 400);
    assert!(err["data"]["invalids"]["email"].is_string());
    assert!(log.statements().is_empty());
}

#[tokio::test]
async fn batch_runs_in_one_transaction() {
    let db = RecordingDatabase::default();
    let log = db.clone();
    let ops = r#"{"xoperations": [{"xmodel": "user", "name": "Ann"}, {"xmodel": "user", "xmethod": "delete", "id": 3}]}"#;
    let request = Request::post("/batch?xformat=json")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(ops))
        .unwrap();
    let (status, _, body) = send(app(db), request).await;

    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(summary["xaffectedrows"], 2);
    let sql = log.statements();
    assert_eq!(sql.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(sql.last().map(String::as_str), Some("COMMIT"));
}

#[tokio::test]
async fn controller_action_from_path() {
    let (status, _, body) = send(app(RecordingDatabase::default()), get("/status/ping?xformat=json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"pong":true}"#);

    let (status, _, _) = send(app(RecordingDatabase::default()), get("/status/_hidden")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn redirect_route() {
    let res = app(RecordingDatabase::default()).oneshot(get("/home")).await.unwrap();
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[header::LOCATION], "/users");
}

#[tokio::test]
async fn unmatched_route_dispatches_nothing() {
    let db = RecordingDatabase::default();
    let log = db.clone();
    let controller = StatusController::default();
    let calls = controller.calls.clone();
    for uri in ["/nothing/here", "/status/ping/extra", "/users/1/2"] {
        let (status, _, _) = send(app_with(db.clone(), controller.clone()), get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
    assert!(log.statements().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn routing_errors() {
    let (status, _, _) = send(app(RecordingDatabase::default()), get("/nothing/here")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(app(RecordingDatabase::default()), get("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::patch("/users/1").body(Body::empty()).unwrap();
    let (status, _, _) = send(app(RecordingDatabase::default()), request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _, _) = send(app(RecordingDatabase::default()), get("/users/1?xformat=yaml")).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn health_is_served_outside_the_router() {
    let (status, _, body) = send(app(RecordingDatabase::default()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok"}"#);
}

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use ballot_app::config::AppConfig;
use ballot_app::AppContext;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let config = AppConfig::from_lookup(|key| match key {
        "ADMIN_USER" => Some("admin".to_string()),
        "ADMIN_PASS" => Some("admin123".to_string()),
        _ => None,
    })
    .unwrap();
    let ctx = AppContext::in_memory(config).await.unwrap();
    ballot_api::router(ctx)
}

/// One browser: carries its session cookie between requests.
struct Client {
    app: Router,
    cookie: Option<String>,
}

struct Reply {
    status: StatusCode,
    headers: header::HeaderMap,
    text: String,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap()
    }
}

impl Client {
    fn new(app: &Router) -> Self {
        Self {
            app: app.clone(),
            cookie: None,
        }
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            if let Some(pair) = value.split(';').next() {
                if pair.starts_with(ballot_api::SESSION_COOKIE) {
                    self.cookie = Some(pair.to_string());
                }
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Reply {
            status,
            headers,
            text: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    async fn get(&mut self, uri: &str) -> Reply {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&mut self, uri: &str, body: Value) -> Reply {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn login(&mut self, username: &str, password: &str, is_admin: bool) -> Reply {
        self.post(
            "/api/login",
            json!({ "username": username, "password": password, "isAdmin": is_admin }),
        )
        .await
    }
}

async fn admin_client(app: &Router) -> Client {
    let mut admin = Client::new(app);
    let reply = admin.login("admin", "admin123", true).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    admin
}

async fn add_voter(admin: &mut Client, username: &str) -> i64 {
    let reply = admin
        .post(
            "/api/admin/add-user",
            json!({ "username": username, "password": "secret1" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    reply.json()["userId"].as_i64().unwrap()
}

async fn start_vote(admin: &mut Client, anonymous: bool) -> Value {
    let reply = admin
        .post(
            "/api/admin/start-vote",
            json!({
                "title": "Class President",
                "options": ["A", "B", "C"],
                "maxSelections": 1,
                "anonymous": anonymous,
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    reply.json()["vote"].clone()
}

async fn voter(app: &Router, username: &str) -> Client {
    let mut client = Client::new(app);
    let reply = client.login(username, "secret1", false).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    client
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let reply = Client::new(&app).get("/api/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["status"], "ok");
}

#[tokio::test]
async fn test_full_round() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    for name in ["user1", "user2", "user3"] {
        add_voter(&mut admin, name).await;
    }
    let vote = start_vote(&mut admin, false).await;

    for (name, choice) in [("user1", "A"), ("user2", "B"), ("user3", "A")] {
        let mut client = voter(&app, name).await;
        let reply = client
            .post("/api/submit-vote", json!({ "choices": [choice] }))
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);

        let status = client.get("/api/user-vote-status").await.json();
        assert_eq!(status["hasVoted"], true);
        assert_eq!(status["submission"], json!([choice]));
    }

    let results = admin.get("/api/admin/results").await;
    assert_eq!(results.status, StatusCode::OK);
    let results = results.json();
    assert_eq!(results["results"][0]["option"], "A");
    assert_eq!(results["results"][0]["count"], 2);
    assert_eq!(results["results"][0]["voters"], json!(["user1", "user3"]));
    assert_eq!(results["results"][1]["voters"], json!(["user2"]));
    assert_eq!(results["results"][2]["count"], 0);

    let details = admin
        .get(&format!("/api/admin/vote-details/{}", vote["id"]))
        .await
        .json();
    assert_eq!(details["voterDetails"].as_array().unwrap().len(), 3);

    let reply = admin.post("/api/admin/end-vote", json!({})).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(Client::new(&app).get("/api/current-vote").await.json()["vote"], Value::Null);
}

#[tokio::test]
async fn test_second_submission_conflicts() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    add_voter(&mut admin, "alice").await;
    start_vote(&mut admin, false).await;

    let mut alice = voter(&app, "alice").await;
    let first = alice.post("/api/submit-vote", json!({ "choices": ["A"] })).await;
    assert_eq!(first.status, StatusCode::OK);
    let second = alice.post("/api/submit-vote", json!({ "choices": ["B"] })).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.json()["error"], "You have already voted");
}

#[tokio::test]
async fn test_ballot_validation() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    add_voter(&mut admin, "alice").await;
    start_vote(&mut admin, false).await;
    let mut alice = voter(&app, "alice").await;

    let too_many = alice
        .post("/api/submit-vote", json!({ "choices": ["A", "B"] }))
        .await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);

    let unknown = alice.post("/api/submit-vote", json!({ "choices": ["Z"] })).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let status = alice.get("/api/user-vote-status").await.json();
    assert_eq!(status["hasVoted"], false);
}

#[tokio::test]
async fn test_guards() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    add_voter(&mut admin, "alice").await;

    let mut anonymous = Client::new(&app);
    let reply = anonymous.post("/api/submit-vote", json!({ "choices": ["A"] })).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.json()["error"].is_string());
    assert_eq!(anonymous.get("/api/admin/users").await.status, StatusCode::UNAUTHORIZED);

    let mut alice = voter(&app, "alice").await;
    assert_eq!(alice.get("/api/admin/users").await.status, StatusCode::FORBIDDEN);

    // The configured superuser has no user row to vote with.
    assert_eq!(admin.get("/api/user-vote-status").await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_failures() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    add_voter(&mut admin, "alice").await;

    let mut client = Client::new(&app);
    assert_eq!(
        client.login("alice", "wrong-pass", false).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        client.login("admin", "nope", true).await.status,
        StatusCode::UNAUTHORIZED
    );

    voter(&app, "alice").await;
    let again = Client::new(&app).login("alice", "secret1", false).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_logout_and_session() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    add_voter(&mut admin, "alice").await;

    let mut alice = voter(&app, "alice").await;
    let session = alice.get("/api/session").await.json();
    assert_eq!(session["authenticated"], true);
    assert_eq!(session["user"]["username"], "alice");
    assert_eq!(session["user"]["isAdmin"], false);

    assert_eq!(alice.post("/api/logout", json!({})).await.status, StatusCode::OK);
    assert_eq!(alice.get("/api/session").await.json()["authenticated"], false);

    // Logging out released the single-session lock.
    voter(&app, "alice").await;
}

#[tokio::test]
async fn test_switching_accounts_releases_the_previous_login() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    add_voter(&mut admin, "alice").await;
    add_voter(&mut admin, "bob").await;

    let mut browser = voter(&app, "alice").await;
    let reply = browser.login("bob", "secret1", false).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    assert_eq!(browser.get("/api/session").await.json()["user"]["username"], "bob");

    // Alice is free to log in elsewhere.
    voter(&app, "alice").await;

    // Re-entering the same account from the same browser is not a second session.
    let reply = browser.login("bob", "secret1", false).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
}

#[tokio::test]
async fn test_force_logout_ends_session() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    let alice_id = add_voter(&mut admin, "alice").await;
    let mut alice = voter(&app, "alice").await;

    let reply = admin
        .post("/api/admin/logout-user", json!({ "userId": alice_id }))
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    assert_eq!(
        alice.get("/api/user-vote-status").await.status,
        StatusCode::UNAUTHORIZED
    );
    let missing = admin
        .post("/api/admin/logout-user", json!({ "userId": 9999 }))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_anonymous_vote_hides_voters() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    add_voter(&mut admin, "alice").await;
    let vote = start_vote(&mut admin, true).await;

    let mut alice = voter(&app, "alice").await;
    alice.post("/api/submit-vote", json!({ "choices": ["B"] })).await;

    let details = admin
        .get(&format!("/api/admin/vote-details/{}", vote["id"]))
        .await
        .json();
    assert_eq!(details["anonymous"], true);
    assert_eq!(details["voterDetails"], json!([]));
    assert_eq!(details["results"][0]["option"], "B");
    assert_eq!(details["results"][0]["count"], 1);
}

#[tokio::test]
async fn test_export_csv() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    add_voter(&mut admin, "alice").await;
    let vote = start_vote(&mut admin, false).await;
    let mut alice = voter(&app, "alice").await;
    alice.post("/api/submit-vote", json!({ "choices": ["C"] })).await;

    let reply = admin.get("/api/admin/export?format=csv").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert_eq!(
        reply.headers[header::CONTENT_DISPOSITION].to_str().unwrap(),
        format!("attachment; filename=\"vote-results-{}.csv\"", vote["id"])
    );
    let mut lines = reply.text.lines();
    assert_eq!(lines.next(), Some("Username,Choices,Submitted At"));
    assert!(lines.next().unwrap().starts_with("\"alice\",\"C\","));

    let bad = admin.get("/api/admin/export?format=xml").await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_input_errors() {
    let app = app().await;
    let mut admin = admin_client(&app).await;

    let one_option = admin
        .post(
            "/api/admin/start-vote",
            json!({ "title": "Lunch", "options": ["Pizza"], "maxSelections": 1 }),
        )
        .await;
    assert_eq!(one_option.status, StatusCode::BAD_REQUEST);

    let malformed = admin
        .send(Method::POST, "/api/admin/start-vote", Some(json!({ "title": 5 })))
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert!(malformed.json()["error"].is_string());

    let no_vote = admin.post("/api/admin/end-vote", json!({})).await;
    assert_eq!(no_vote.status, StatusCode::CONFLICT);

    add_voter(&mut admin, "alice").await;
    let duplicate = admin
        .post(
            "/api/admin/add-user",
            json!({ "username": "alice", "password": "secret1" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let missing = admin
        .send(Method::DELETE, "/api/admin/delete-user/9999", None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user_shrinks_tally() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    let alice_id = add_voter(&mut admin, "alice").await;
    add_voter(&mut admin, "bob").await;
    let vote = start_vote(&mut admin, false).await;

    for name in ["alice", "bob"] {
        let mut client = voter(&app, name).await;
        client.post("/api/submit-vote", json!({ "choices": ["A"] })).await;
    }

    let reply = admin
        .send(Method::DELETE, &format!("/api/admin/delete-user/{alice_id}"), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["submissionsRemoved"], 1);

    let details = admin
        .get(&format!("/api/admin/vote-details/{}", vote["id"]))
        .await
        .json();
    assert_eq!(details["results"][0]["count"], 1);
}

#[tokio::test]
async fn test_dashboard_and_history() {
    let app = app().await;
    let mut admin = admin_client(&app).await;
    add_voter(&mut admin, "alice").await;
    start_vote(&mut admin, false).await;
    voter(&app, "alice").await;

    let dashboard = admin.get("/api/admin/dashboard").await.json();
    assert_eq!(dashboard["currentVote"]["title"], "Class President");
    // The seeded admin row counts as a user.
    assert_eq!(dashboard["stats"]["totalUsers"], 2);
    assert_eq!(dashboard["stats"]["loggedInUsers"], 1);
    assert_eq!(dashboard["stats"]["votedUsers"], 0);

    let history = admin.get("/api/admin/all-votes").await.json();
    assert_eq!(history["votes"].as_array().unwrap().len(), 1);
    assert_eq!(history["votes"][0]["totalSubmissions"], 0);

    let users = admin.get("/api/admin/users").await.json();
    let names: Vec<&str> = users["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["admin", "alice"]);
}

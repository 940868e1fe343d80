use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

fn lens_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("lens");
    path
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn setup_server_env(port: u16) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/lens.sqlite"

[server]
bind = "127.0.0.1:{}"

[auth]
token_secret = "http-api-test-secret-0123"

[search]
result_limit = 2
snippet_chars = 20

[logging]
filter = "warn"
"#,
        root.display(),
        port
    );
    let config_path = config_dir.join("lens.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

/// Kills the server process when the test ends, pass or fail.
struct Server {
    child: Child,
    base: String,
    config_path: PathBuf,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

impl Server {
    fn start(config_path: &Path, port: u16) -> Server {
        let child = Command::new(lens_binary())
            .arg("--config")
            .arg(config_path.to_str().unwrap())
            .arg("serve")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap_or_else(|e| panic!("Failed to start server: {}", e));

        let server = Server {
            child,
            base: format!("http://127.0.0.1:{}", port),
            config_path: config_path.to_path_buf(),
        };
        server.wait_ready();
        server
    }

    fn wait_ready(&self) {
        let url = format!("{}/health", self.base);
        for _ in 0..50 {
            std::thread::sleep(std::time::Duration::from_millis(100));
            if let Ok(resp) = reqwest::blocking::get(&url) {
                if resp.status().is_success() {
                    return;
                }
            }
        }
        panic!("Server did not become ready within 5 seconds");
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn token(&self, user: &str) -> String {
        let output = Command::new(lens_binary())
            .arg("--config")
            .arg(self.config_path.to_str().unwrap())
            .args(["token", user])
            .output()
            .unwrap();
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

fn start() -> (TempDir, Server) {
    let port = find_free_port();
    let (tmp, config_path) = setup_server_env(port);
    let server = Server::start(&config_path, port);
    (tmp, server)
}

fn page(title: &str, chunks: &[&str], scope: Option<&str>) -> Value {
    let mut body = json!({
        "url": format!("https://example.org/{}", title.to_lowercase()),
        "title": title,
        "content": chunks.join(" "),
        "chunks": chunks,
        "metadata": { "description": "", "ogImage": "", "sourceURL": "" }
    });
    if let Some(scope) = scope {
        body["scopeId"] = json!(scope);
    }
    body
}

fn ingest(client: &Client, server: &Server, token: &str, body: &Value) -> String {
    let resp = client
        .post(server.url("/websites"))
        .bearer_auth(token)
        .json(body)
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[test]
fn test_server_health() {
    let (_tmp, server) = start();

    let resp = reqwest::blocking::get(server.url("/health")).unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[test]
fn test_mutations_require_token() {
    let (_tmp, server) = start();
    let client = Client::new();

    let resp = client
        .post(server.url("/websites"))
        .json(&page("Cells", &["cells divide"], None))
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "unauthenticated");

    // A forged token is no better than none.
    let resp = client
        .post(server.url("/websites"))
        .bearer_auth("YWxpY2U.deadbeef")
        .json(&page("Cells", &["cells divide"], None))
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_queries_without_token_are_empty() {
    let (_tmp, server) = start();
    let client = Client::new();
    let alice = server.token("alice");
    ingest(&client, &server, &alice, &page("Cells", &["cells divide"], None));

    let resp = client.get(server.url("/websites")).send().unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().unwrap();
    assert_eq!(body, json!([]));

    let resp = client
        .post(server.url("/websites/search"))
        .json(&json!({ "query": "cells" }))
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.json::<Value>().unwrap(), json!([]));
}

#[test]
fn test_ingest_list_search_delete() {
    let (_tmp, server) = start();
    let client = Client::new();
    let alice = server.token("alice");

    let cells = ingest(
        &client,
        &server,
        &alice,
        &page("Cells", &["cells divide", "mitosis mitosis makes cells"], None),
    );
    ingest(&client, &server, &alice, &page("Mitosis", &["mitosis"], None));
    ingest(&client, &server, &alice, &page("Weather", &["rain clouds"], None));

    let listed: Value = client
        .get(server.url("/websites"))
        .bearer_auth(&alice)
        .send()
        .unwrap()
        .json()
        .unwrap();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0]["title"], "Weather");
    assert_eq!(listed[2]["ownerId"], "alice");

    let hits: Value = client
        .post(server.url("/websites/search"))
        .bearer_auth(&alice)
        .json(&json!({ "query": "Mitosis cells" }))
        .send()
        .unwrap()
        .json()
        .unwrap();
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["websiteId"], cells.as_str());
    assert_eq!(hits[0]["relevanceScore"], 4);
    assert_eq!(hits[0]["content"], "mitosis mitosis make...");

    let resp = client
        .delete(server.url(&format!("/websites/{}", cells)))
        .bearer_auth(&alice)
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .delete(server.url(&format!("/websites/{}", cells)))
        .bearer_auth(&alice)
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[test]
fn test_spaces_over_http() {
    let (_tmp, server) = start();
    let client = Client::new();
    let alice = server.token("alice");
    let bob = server.token("bob");

    let resp = client
        .post(server.url("/spaces"))
        .bearer_auth(&alice)
        .json(&json!({ "name": "Biology Team" }))
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let space = resp.json::<Value>().unwrap()["id"].as_str().unwrap().to_string();

    let shared = page("Cells", &["cells divide"], Some(&space));
    let resp = client
        .post(server.url("/websites"))
        .bearer_auth(&bob)
        .json(&shared)
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.json::<Value>().unwrap()["error"]["code"], "forbidden");

    let id = ingest(&client, &server, &alice, &shared);

    let resp = client
        .post(server.url(&format!("/spaces/{}/members", space)))
        .bearer_auth(&alice)
        .json(&json!({ "userId": "bob" }))
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.json::<Value>().unwrap()["membership"]["status"], "pending");

    let scoped = server.url(&format!("/websites?scopeId={}", space));
    let before: Value = client.get(&scoped).bearer_auth(&bob).send().unwrap().json().unwrap();
    assert_eq!(before, json!([]));

    let resp = client
        .post(server.url(&format!("/spaces/{}/accept", space)))
        .bearer_auth(&bob)
        .send()
        .unwrap();
    assert_eq!(resp.status(), 200);

    let after: Value = client.get(&scoped).bearer_auth(&bob).send().unwrap().json().unwrap();
    assert_eq!(after[0]["id"], id.as_str());
    assert_eq!(after[0]["scopeId"], space.as_str());

    let spaces: Value = client
        .get(server.url("/spaces"))
        .bearer_auth(&bob)
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(spaces[0]["name"], "Biology Team");

    // Bob leaves; the space's websites disappear for him again.
    let resp = client
        .delete(server.url(&format!("/spaces/{}/members/bob", space)))
        .bearer_auth(&bob)
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let gone: Value = client.get(&scoped).bearer_auth(&bob).send().unwrap().json().unwrap();
    assert_eq!(gone, json!([]));

    let audit: Value = client
        .get(server.url(&format!("/audit?scopeId={}", space)))
        .bearer_auth(&alice)
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(audit[0]["action"], "space.remove_member");
}

#[test]
fn test_malformed_body_is_bad_request() {
    let (_tmp, server) = start();
    let client = Client::new();
    let alice = server.token("alice");

    let resp = client
        .post(server.url("/websites"))
        .bearer_auth(&alice)
        .header("content-type", "application/json")
        .body("{\"title\": 1}")
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.json::<Value>().unwrap()["error"]["code"], "bad_request");
}

#[test]
fn test_search_without_query_is_empty() {
    let (_tmp, server) = start();
    let client = Client::new();
    let alice = server.token("alice");
    ingest(&client, &server, &alice, &page("Cells", &["cells divide"], None));

    for body in [json!({}), json!({ "scopeId": null })] {
        let resp = client
            .post(server.url("/websites/search"))
            .bearer_auth(&alice)
            .json(&body)
            .send()
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.json::<Value>().unwrap(), json!([]));
    }
}

#[test]
fn test_documents_over_http() {
    let (_tmp, server) = start();
    let client = Client::new();
    let alice = server.token("alice");
    let bob = server.token("bob");

    let resp = client
        .post(server.url("/documents"))
        .json(&json!({ "title": "Week 3", "content": "fractions" }))
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(server.url("/documents"))
        .bearer_auth(&alice)
        .json(&json!({ "title": "Week 3", "content": "fractions" }))
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let id = resp.json::<Value>().unwrap()["id"].as_str().unwrap().to_string();
    let doc_url = server.url(&format!("/documents/{}", id));

    let doc: Value = client.get(&doc_url).bearer_auth(&alice).send().unwrap().json().unwrap();
    assert_eq!(doc["title"], "Week 3");
    assert_eq!(doc["ownerId"], "alice");

    // Someone else's personal document is indistinguishable from a missing one.
    let resp = client.get(&doc_url).bearer_auth(&bob).send().unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = client.delete(&doc_url).bearer_auth(&bob).send().unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let listed: Value = client
        .get(server.url("/documents"))
        .bearer_auth(&alice)
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let resp = client.delete(&doc_url).bearer_auth(&alice).send().unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let audit: Value = client
        .get(server.url("/audit"))
        .bearer_auth(&alice)
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(audit[0]["action"], "document.delete");
    assert_eq!(audit[1]["action"], "document.create");
}

#[test]
fn test_chat_over_http() {
    let (_tmp, server) = start();
    let client = Client::new();
    let alice = server.token("alice");
    let bob = server.token("bob");

    for (role, content) in [("user", "What is a fraction?"), ("assistant", "A part of a whole.")] {
        let resp = client
            .post(server.url("/chat/messages"))
            .bearer_auth(&alice)
            .json(&json!({ "conversationId": "c1", "role": role, "content": content }))
            .send()
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.json::<Value>().unwrap()["authorId"], "alice");
    }

    let resp = client
        .post(server.url("/chat/messages"))
        .bearer_auth(&alice)
        .json(&json!({ "conversationId": "c1", "role": "system", "content": "x" }))
        .send()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let history: Value = client
        .get(server.url("/chat/c1/messages"))
        .bearer_auth(&alice)
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(history[0]["content"], "What is a fraction?");
    assert_eq!(history[1]["role"], "assistant");

    let other: Value = client
        .get(server.url("/chat/c1/messages"))
        .bearer_auth(&bob)
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(other, json!([]));
}

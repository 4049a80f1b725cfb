use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn recall_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("recall");
    path
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Writes a config that runs the whole pipeline against test doubles:
/// the in-memory store, and an OpenAI-shaped embeddings endpoint served
/// by httpmock at `embed_base`.
fn write_config(root: &Path, bind: &str, policy: &str, embed_base: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[server]
bind = "{bind}"
cors_origin = "http://localhost:3000"

[extract]
policy = "{policy}"

[chunking]
max_chars = 1000
overlap = 200

[embedding]
provider = "openai"
model = "test-embed"
dims = 2
api_base = "{embed_base}"

[store]
provider = "memory"

[retrieval]
top_n = 10
"#
    );

    let config_path = config_dir.join("recall.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn run_recall(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = recall_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("OPENAI_API_KEY", "test-key")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run recall binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// A spawned `recall serve` process, killed on drop.
struct ServerGuard {
    child: Child,
    base_url: String,
}

impl ServerGuard {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Spawns `recall serve` and waits until `/health` answers.
fn spawn_server(config_path: &Path, port: u16) -> ServerGuard {
    let binary = recall_binary();
    let child = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("serve")
        .env("OPENAI_API_KEY", "test-key")
        .stdout(Stdio::null())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to run recall binary at {:?}: {}", binary, e));

    let guard = ServerGuard {
        child,
        base_url: format!("http://127.0.0.1:{}", port),
    };

    let client = reqwest::blocking::Client::new();
    for _ in 0..50 {
        let up = client
            .get(guard.url("/health"))
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        if up {
            return guard;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    panic!("recall server did not come up at {}", guard.base_url);
}

/// Registers an embeddings mock answering one exact `input` array with the
/// given vectors. Disjoint bodies keep concurrent mocks unambiguous.
fn mock_embedding<'a>(
    server: &'a MockServer,
    inputs: &[&str],
    vectors: &[[f64; 2]],
) -> httpmock::Mock<'a> {
    let body = json!({ "model": "test-embed", "input": inputs });
    let data: Vec<Value> = vectors
        .iter()
        .map(|v| json!({ "embedding": v }))
        .collect();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings").json_body(body);
        then.status(200).json_body(json!({ "data": data }));
    })
}

fn mock_page<'a>(server: &'a MockServer, path: &str, html: &str) -> httpmock::Mock<'a> {
    let body = html.to_string();
    server.mock(move |when, then| {
        when.method(GET).path(path);
        then.status(200)
            .header("content-type", "text/html")
            .body(&body);
    })
}

#[test]
fn test_health_endpoint() {
    let tmp = TempDir::new().unwrap();
    let mock = MockServer::start();
    let port = free_port();
    let config = write_config(
        tmp.path(),
        &format!("127.0.0.1:{}", port),
        "page",
        &mock.base_url(),
    );
    let server = spawn_server(&config, port);

    let resp = reqwest::blocking::get(server.url("/health")).unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_search_returns_indexed_page_text() {
    let tmp = TempDir::new().unwrap();
    let mock = MockServer::start();
    let port = free_port();
    let config = write_config(
        tmp.path(),
        &format!("127.0.0.1:{}", port),
        "page",
        &mock.base_url(),
    );

    let page = mock_page(&mock, "/alpha", "<html><body><p>alpha one</p></body></html>");
    let embed = mock_embedding(&mock, &["alpha one"], &[[1.0, 0.0]]);

    let server = spawn_server(&config, port);
    let client = reqwest::blocking::Client::new();

    let resp = client
        .post(server.url("/search"))
        .json(&json!({ "url": mock.url("/alpha"), "query": "alpha one" }))
        .send()
        .unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().unwrap();
    assert_eq!(body, json!(["alpha one"]));

    page.assert_hits(1);
    // One call for the chunk, one for the query
    embed.assert_hits(2);
}

#[test]
fn test_search_ranks_closest_page_first() {
    let tmp = TempDir::new().unwrap();
    let mock = MockServer::start();
    let port = free_port();
    let config = write_config(
        tmp.path(),
        &format!("127.0.0.1:{}", port),
        "page",
        &mock.base_url(),
    );

    mock_page(&mock, "/alpha", "<html><body><p>alpha one</p></body></html>");
    mock_page(&mock, "/beta", "<html><body><p>beta two</p></body></html>");
    mock_embedding(&mock, &["alpha one"], &[[1.0, 0.0]]);
    mock_embedding(&mock, &["beta two"], &[[0.0, 1.0]]);

    let server = spawn_server(&config, port);
    let client = reqwest::blocking::Client::new();

    client
        .post(server.url("/search"))
        .json(&json!({ "url": mock.url("/alpha"), "query": "alpha one" }))
        .send()
        .unwrap();

    let resp = client
        .post(server.url("/search"))
        .json(&json!({ "url": mock.url("/beta"), "query": "beta two" }))
        .send()
        .unwrap();
    assert!(resp.status().is_success());

    // Both stored pages come back, the one matching the query first.
    let body: Value = resp.json().unwrap();
    assert_eq!(body, json!(["beta two", "alpha one"]));
}

#[test]
fn test_search_is_deduplicated_across_repeats() {
    let tmp = TempDir::new().unwrap();
    let mock = MockServer::start();
    let port = free_port();
    let config = write_config(
        tmp.path(),
        &format!("127.0.0.1:{}", port),
        "page",
        &mock.base_url(),
    );

    mock_page(&mock, "/alpha", "<html><body><p>alpha one</p></body></html>");
    let embed = mock_embedding(&mock, &["alpha one"], &[[1.0, 0.0]]);

    let server = spawn_server(&config, port);
    let client = reqwest::blocking::Client::new();
    let request = json!({ "url": mock.url("/alpha"), "query": "alpha one" });

    client
        .post(server.url("/search"))
        .json(&request)
        .send()
        .unwrap();
    let resp = client
        .post(server.url("/search"))
        .json(&request)
        .send()
        .unwrap();

    // Re-indexing the same page must not duplicate its chunks.
    let body: Value = resp.json().unwrap();
    assert_eq!(body, json!(["alpha one"]));
    embed.assert_hits(4);
}

#[test]
fn test_elements_policy_returns_matched_markup() {
    let tmp = TempDir::new().unwrap();
    let mock = MockServer::start();
    let port = free_port();
    let config = write_config(
        tmp.path(),
        &format!("127.0.0.1:{}", port),
        "elements",
        &mock.base_url(),
    );

    mock_page(
        &mock,
        "/gamma",
        "<html><body><p>gamma three</p><p>delta four</p></body></html>",
    );
    mock_embedding(&mock, &["gamma threedelta four"], &[[1.0, 0.0]]);

    let server = spawn_server(&config, port);
    let client = reqwest::blocking::Client::new();

    let resp = client
        .post(server.url("/search"))
        .json(&json!({ "url": mock.url("/gamma"), "query": "gamma threedelta four" }))
        .send()
        .unwrap();
    assert!(resp.status().is_success());

    // The single chunk spans both paragraphs, so it carries both fragments.
    let body: Value = resp.json().unwrap();
    assert_eq!(
        body,
        json!([{
            "text": "gamma threedelta four",
            "html": ["<p>gamma three</p>", "<p>delta four</p>"]
        }])
    );
}

#[test]
fn test_unfetchable_page_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let mock = MockServer::start();
    let port = free_port();
    let config = write_config(
        tmp.path(),
        &format!("127.0.0.1:{}", port),
        "page",
        &mock.base_url(),
    );

    let missing = mock.mock(|when, then| {
        when.method(GET).path("/gone");
        then.status(404).body("not found");
    });
    let embed = mock_embedding(&mock, &["anything"], &[[1.0, 0.0]]);

    let server = spawn_server(&config, port);
    let client = reqwest::blocking::Client::new();

    let resp = client
        .post(server.url("/search"))
        .json(&json!({ "url": mock.url("/gone"), "query": "anything" }))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let body: Value = resp.json().unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(body["error"]["message"], "Failed to fetch content.");

    missing.assert_hits(1);
    // The pipeline stops before embedding anything.
    embed.assert_hits(0);
}

#[test]
fn test_missing_store_credentials_fail_startup() {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("recall.toml");
    fs::write(&config_path, "[store]\nprovider = \"weaviate\"\n").unwrap();

    let binary = recall_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("serve")
        .env_remove("API_KEY")
        .env_remove("SECRET_KEY")
        .env_remove("CLUSTER_URL")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run recall binary at {:?}: {}", binary, e));

    assert!(!output.status.success(), "serve should refuse to start");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("API_KEY, SECRET_KEY, or CLUSTER_URL is missing from environment variables."),
        "Should name the missing credentials, got: {}",
        stderr
    );
}

#[test]
fn test_cors_preflight_allows_configured_origin() {
    let tmp = TempDir::new().unwrap();
    let mock = MockServer::start();
    let port = free_port();
    let config = write_config(
        tmp.path(),
        &format!("127.0.0.1:{}", port),
        "page",
        &mock.base_url(),
    );
    let server = spawn_server(&config, port);

    let client = reqwest::blocking::Client::new();
    let resp = client
        .request(reqwest::Method::OPTIONS, server.url("/search"))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .unwrap();

    let headers = resp.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        headers.get("access-control-allow-credentials").unwrap(),
        "true"
    );
    assert_eq!(headers.get("access-control-allow-methods").unwrap(), "POST");
}

#[test]
fn test_cors_preflight_ignores_unknown_origin() {
    let tmp = TempDir::new().unwrap();
    let mock = MockServer::start();
    let port = free_port();
    let config = write_config(
        tmp.path(),
        &format!("127.0.0.1:{}", port),
        "page",
        &mock.base_url(),
    );
    let server = spawn_server(&config, port);

    let client = reqwest::blocking::Client::new();
    let resp = client
        .request(reqwest::Method::OPTIONS, server.url("/search"))
        .header("Origin", "http://evil.example")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .unwrap();

    assert!(resp.headers().get("access-control-allow-origin").is_none());
}

#[test]
fn test_cli_search_prints_ranked_texts() {
    let tmp = TempDir::new().unwrap();
    let mock = MockServer::start();
    let config = write_config(tmp.path(), "127.0.0.1:0", "page", &mock.base_url());

    mock_page(&mock, "/alpha", "<html><body><p>alpha one</p></body></html>");
    mock_embedding(&mock, &["alpha one"], &[[1.0, 0.0]]);

    let url = mock.url("/alpha");
    let (stdout, stderr, success) = run_recall(&config, &["search", &url, "alpha one"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(
        stdout.contains("1. alpha one"),
        "Expected ranked text in output, got: {}",
        stdout
    );
}

#[test]
fn test_cli_rejects_invalid_chunking_config() {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("recall.toml");
    fs::write(&config_path, "[chunking]\nmax_chars = 100\noverlap = 100\n").unwrap();

    let (_, stderr, success) = run_recall(&config_path, &["search", "http://x", "q"]);
    assert!(!success, "Invalid chunking config should fail");
    assert!(
        stderr.contains("chunking.overlap"),
        "Should mention the bad field, got: {}",
        stderr
    );
}

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cmd(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("skrivpartner").unwrap();
    cmd.env("SKRIVPARTNER_CONFIG_DIR", config_dir.path())
        .env("SKRIVPARTNER_DISABLE_FILE_LOG", "1")
        .env_remove("GEMINI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("SKRIVPARTNER_GEMINI_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("SKRIVPARTNER_OPENAI_API_KEY")
        .env_remove("GEMINI_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn blank_idea_is_a_validation_error() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["optimize", "   "])
        .assert()
        .code(2)
        .stderr(contains("Berätta din idé eller klistra in din text först."));
}

#[test]
fn blank_idea_json_reports_kind() {
    let dir = TempDir::new().unwrap();
    let out = cmd(&dir)
        .args(["--json", "optimize", ""])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["kind"], "validation");
}

#[test]
fn blank_idea_is_rejected_before_config_and_provider() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.json"), "{not json").unwrap();

    cmd(&dir)
        .args(["--provider", "glm", "optimize", " \n "])
        .assert()
        .code(2)
        .stderr(contains("Berätta din idé eller klistra in din text först."))
        .stderr(contains("Fel:").not());
}

#[test]
fn missing_key_is_a_processing_error_with_hint() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["optimize", "skolan borde börja senare"])
        .assert()
        .code(1)
        .stderr(contains("Bearbetningen misslyckades"))
        .stderr(contains("config set-key gemini"));
}

#[test]
fn config_set_key_is_masked_in_show() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["config", "set-key", "gemini", "abcdefgh1234"])
        .assert()
        .success();
    cmd(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("********1234"))
        .stdout(contains("\"provider\": \"gemini\""));
}

#[test]
fn config_rejects_unknown_provider() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["config", "set-provider", "glm:glm-4"])
        .assert()
        .failure()
        .stderr(contains("Unknown provider"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn optimize_renders_result_panel() {
    let server = MockServer::start().await;
    let answer = json!({
        "optimizedText": "Skolan borde ju börja senare.",
        "improvements": ["la till argument om sömnforskning"],
        "defenseTips": ["Förklara att..."],
        "humanScore": 87
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/models/gemini-3-flash-preview:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": answer }] } }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uri = server.uri();

    let dir = tokio::task::spawn_blocking(move || {
        cmd(&dir)
            .args(["config", "set-url", "gemini", &uri])
            .assert()
            .success();

        cmd(&dir)
            .env("GEMINI_API_KEY", "test-key")
            .args([
                "optimize",
                "--help-level",
                "expand",
                "--text-type",
                "essay",
                "--grade",
                "C",
                "skolan borde börja senare",
            ])
            .assert()
            .success()
            .stdout(contains("[Mål: C]  [Human: 87%]"))
            .stdout(contains("• la till argument om sömnforskning"))
            .stdout(contains("Förklara att...").not());

        cmd(&dir)
            .env("GEMINI_API_KEY", "test-key")
            .args(["--json", "optimize", "--tips", "skolan borde börja senare"])
            .assert()
            .success()
            .stdout(contains("\"humanScore\": 87"))
            .stdout(contains("\"originalText\": \"skolan borde börja senare\""));
        dir
    })
    .await
    .unwrap();
    drop(dir);
}

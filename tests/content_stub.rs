use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Chat-completions stub that always returns one quiz question and one
/// vocabulary word, wrapped in the provider response envelope.
fn spawn_chat_stub() -> (String, mpsc::Sender<()>, thread::JoinHandle<usize>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let addr = server.server_addr();
    let base_url = format!("http://{addr}");

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        let mut requests = 0usize;
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            if request.url() != "/chat/completions" {
                let _ = request
                    .respond(tiny_http::Response::from_string("not found").with_status_code(404));
                continue;
            }

            requests += 1;
            let content = r#"{\"quiz\":[{\"question\":\"Where do the fish live?\",\"options\":[\"river\",\"desert\",\"sky\"],\"correctAnswer\":0}],\"vocabulary\":[{\"word\":\"river\",\"definition\":\"a large natural stream of water\"}]}"#;
            let body = format!(
                r#"{{"choices":[{{"message":{{"role":"assistant","content":"{content}"}}}}]}}"#
            );
            let response = tiny_http::Response::from_string(body).with_header(
                tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .unwrap(),
            );
            let _ = request.respond(response);
        }
        requests
    });

    (base_url, shutdown_tx, handle)
}

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn content_command_generates_and_merges_quiz_json() {
    let (base_url, shutdown_tx, handle) = spawn_chat_stub();

    let temp = tempfile::TempDir::new().unwrap();
    let books_path = temp.path().join("books.json");
    let out_path = temp.path().join("books-content.json");

    write_file(
        &books_path,
        r#"{
  "J": [
    {
      "id": "1",
      "number": "1",
      "title": "River Fish",
      "level": "J",
      "pdfPath": "1-River Fish.pdf",
      "audioPath": "1-River Fish.mp3"
    },
    {
      "id": "2",
      "number": "2",
      "title": "No Text Yet",
      "level": "J",
      "pdfPath": "2-No Text Yet.pdf",
      "audioPath": ""
    }
  ]
}"#,
    );
    write_file(
        &temp.path().join("texts/J/1.txt"),
        "River fish live in fresh moving water. Glossary: river - a large natural stream.",
    );

    let mut cmd = assert_cmd::Command::cargo_bin("razshelf").unwrap();
    cmd.env("DEEPSEEK_API_KEY", "test-key")
        .env("RAZSHELF_LLM_BASE_URL", &base_url)
        .args([
            "content",
            "--books",
            books_path.to_str().unwrap(),
            "--text-dir",
            temp.path().join("texts").to_str().unwrap(),
            "--out",
            out_path.to_str().unwrap(),
            "--level",
            "J",
        ])
        .assert()
        .success();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
    let book = &content["J"]["1"];
    assert_eq!(
        book["quiz"][0]["question"].as_str().unwrap(),
        "Where do the fish live?"
    );
    assert_eq!(book["quiz"][0]["correctAnswer"].as_u64().unwrap(), 0);
    assert_eq!(book["vocabulary"][0]["word"].as_str().unwrap(), "river");

    // Book 2 has no extracted text and is skipped, not failed.
    assert!(content["J"].get("2").is_none());

    let _ = shutdown_tx.send(());
    let requests = handle.join().expect("join stub server");
    // One book had text, one did not.
    assert_eq!(requests, 1);
}

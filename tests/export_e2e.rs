//! End-to-end export over HTTP
//!
//! These tests run the real [`TrelloClient`] against a wiremock server standing in for
//! the board API and check the directory tree the exporter leaves behind.
//!
//! # Running the tests
//!
//! ```bash
//! cargo test --test export_e2e
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use trello_dump::config::{ApiConfig, ApiCredentials, Config, ExportConfig, RetryConfig};
use trello_dump::{Event, Exporter};
use walkdir::WalkDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

fn config_for(server: &MockServer, storage: &Path) -> Config {
    Config {
        board_ids: vec!["b1".to_string()],
        export: ExportConfig {
            storage_dir: storage.to_path_buf(),
            include_archived: true,
            split_archived: true,
            concurrency: 2,
            ..Default::default()
        },
        api: ApiConfig {
            base_url: format!("{}/1", server.uri()),
            credentials: ApiCredentials::new("test-key", "test-token"),
            request_timeout: Duration::from_secs(5),
        },
        retry: RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            jitter: false,
        },
    }
}

fn lightweight(id: &str, name: &str, list: &str, closed: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "closed": closed,
        "idList": list,
        "idChecklists": [],
    })
}

fn empty_comprehensive(id: &str, name: &str, list: &str, closed: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "closed": closed,
        "idList": list,
        "idChecklists": [],
        "attachments": [],
        "actions": [],
        "members": [],
        "labels": [],
        "checklists": [],
    })
}

/// Board b1 "Home Projects": two lists, a fully populated card, a plain card, an
/// archived card and a link card
async fn mount_board(server: &MockServer) {
    let get = |p: String| Mock::given(method("GET")).and(path(p));

    get("/1/boards/b1".into())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "b1",
            "name": "Home Projects",
            "prefs": {"backgroundImage": format!("{}/bg/mountains.jpg", server.uri())},
        })))
        .mount(server)
        .await;
    get("/bg/mountains.jpg".into())
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
        .mount(server)
        .await;
    get("/1/boards/b1/lists".into())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "l1", "name": "To Do", "idBoard": "b1"},
            {"id": "l2", "name": "Done", "idBoard": "b1"},
        ])))
        .mount(server)
        .await;
    get("/1/boards/b1/labels".into())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "lb1", "name": "Urgent", "color": "red"},
        ])))
        .mount(server)
        .await;
    get("/1/boards/b1/members".into())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "m1", "fullName": "Ada Lovelace", "username": "ada"},
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/boards/b1/cards"))
        .and(query_param("filter", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            lightweight("c1", "Paint fence", "l1", false),
            lightweight("c2", "Fix sink", "l1", false),
            lightweight("c3", "Old shed", "l2", true),
            lightweight("c4", "https://example.com/paint-guide", "l1", false),
        ])))
        .mount(server)
        .await;

    for (id, role) in [("c1", None), ("c2", None), ("c3", None), ("c4", Some("link"))] {
        Mock::given(method("GET"))
            .and(path(format!("/1/cards/{id}")))
            .and(query_param("fields", "name,cardRole"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": id, "cardRole": role})),
            )
            .mount(server)
            .await;
    }
}

fn mount_comprehensive(card_id: &str, body: Value) -> Mock {
    Mock::given(method("GET"))
        .and(path(format!("/1/cards/{card_id}")))
        .and(query_param("attachments", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

fn populated_card() -> Value {
    json!({
        "id": "c1",
        "name": "Paint fence",
        "desc": "Two coats, white",
        "closed": false,
        "idList": "l1",
        "idChecklists": ["ck1"],
        "due": "2024-03-05T17:00:00.000Z",
        "dueComplete": true,
        "cover": {"idAttachment": "a1"},
        "attachments": [
            {"id": "a1", "name": "fence.jpg", "url": "https://files.example.com/fence.jpg", "isUpload": true},
            {"id": "a2", "name": "guide", "url": "https://example.com/guide", "isUpload": false},
        ],
        "actions": [{
            "id": "ac1",
            "type": "commentCard",
            "date": "2024-03-01T09:30:00.000Z",
            "memberCreator": {"id": "m1", "fullName": "Ada Lovelace"},
            "data": {"text": "Bought paint"},
        }],
        "members": [{"id": "m1", "fullName": "Ada Lovelace"}],
        "labels": [{"id": "lb1", "name": "Urgent", "color": "red"}],
        "checklists": [{
            "id": "ck1",
            "name": "Supplies",
            "checkItems": [
                {"id": "i1", "name": "Brushes", "state": "complete"},
                {"id": "i2", "name": "Tape", "state": "incomplete"},
            ],
        }],
    })
}

fn relative_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .display()
                .to_string()
        })
        .collect();
    files.sort();
    files
}

fn read(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path).unwrap()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn exports_board_tree_over_http() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    mount_comprehensive("c1", populated_card()).mount(&server).await;
    mount_comprehensive("c2", empty_comprehensive("c2", "Fix sink", "l1", false))
        .mount(&server)
        .await;
    mount_comprehensive("c3", empty_comprehensive("c3", "Old shed", "l2", true))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/cards/c1/attachments/a1/download/fence.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fence-pixels".to_vec()))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let exporter = Exporter::connect(config_for(&server, temp_dir.path())).unwrap();
    let mut events = exporter.subscribe();

    let status = exporter.run().await.unwrap();

    assert!(!status.had_errors, "{status:?}");
    assert_eq!(status.error_count, 0);
    assert_eq!(status.processed_boards, vec!["Home Projects (b1)"]);

    let board = temp_dir.path().join("Home Projects");
    let files = relative_files(&board);
    for expected in [
        "BoardBackground-mountains.jpg",
        "BoardLabels.md",
        "BoardMembers.md",
        "To Do/Paint fence/CardDescription.md",
        "To Do/Paint fence/attachments/fence (Card Cover).jpg",
        "To Do/Paint fence/attachments/URL-Attachments.md",
        "To Do/Paint fence/checklists/Supplies.md",
        "To Do/Paint fence/CardComments.md",
        "To Do/Paint fence/CardUsers.md",
        "To Do/Paint fence/CardLabels.md",
        "To Do/Paint fence/CardHistory.md",
        "To Do/Paint fence/CardDueDate (Completed).md",
        "To Do/Paint fence/CardStartDate.md",
        "To Do/Fix sink/CardDescription.md",
        "To Do/Fix sink/CardDueDate.md",
        "ARCHIVED/Done/Old shed/CardDescription.md",
        "To Do/Link Cards Only/CARD - example.com-paint-guide.md",
    ] {
        assert!(files.iter().any(|f| f == expected), "{expected} missing: {files:#?}");
    }
    assert!(!board.join("Done").exists());

    let card = board.join("To Do/Paint fence");
    assert_eq!(read(card.join("CardDescription.md")), "Two coats, white");
    assert_eq!(
        std::fs::read(card.join("attachments/fence (Card Cover).jpg")).unwrap(),
        b"fence-pixels"
    );
    assert_eq!(
        read(card.join("attachments/URL-Attachments.md")),
        "https://example.com/guide\n"
    );
    assert_eq!(
        read(card.join("checklists/Supplies.md")),
        "- [x] Brushes\n- [ ] Tape\n"
    );
    assert_eq!(
        read(card.join("CardComments.md")),
        "**Ada Lovelace** (2024-03-01 09:30:00): Bought paint\n"
    );
    assert_eq!(read(card.join("CardLabels.md")), "**Urgent** - red (lb1)\n");
    assert_eq!(
        read(board.join("To Do/Link Cards Only/CARD - example.com-paint-guide.md")),
        "https://example.com/paint-guide"
    );
    assert_eq!(
        std::fs::read(board.join("BoardBackground-mountains.jpg")).unwrap(),
        b"jpeg-bytes"
    );

    let mut exported = 0;
    while let Ok(event) = events.try_recv() {
        if let Event::CardExported { .. } = event {
            exported += 1;
        }
    }
    assert_eq!(exported, 4);
}

#[tokio::test]
async fn comprehensive_failure_falls_back_to_targeted_requests() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    Mock::given(method("GET"))
        .and(path("/1/cards/c1"))
        .and(query_param("attachments", "true"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    for id in ["c2", "c3"] {
        mount_comprehensive(id, empty_comprehensive(id, "", "l1", false))
            .mount(&server)
            .await;
    }

    let get = |p: &str| Mock::given(method("GET")).and(path(p.to_string()));
    get("/1/cards/c1/attachments")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/cards/c1/actions"))
        .and(query_param("filter", "commentCard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "ac1",
            "type": "commentCard",
            "date": "2024-03-01T09:30:00.000Z",
            "memberCreator": {"id": "m1", "fullName": "Ada Lovelace"},
            "data": {"text": "Bought paint"},
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/cards/c1/actions"))
        .and(query_param("filter", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    get("/1/cards/c1/members")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/cards/c1"))
        .and(query_param("fields", "labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c1",
            "labels": [{"id": "lb1", "name": "Urgent", "color": "red"}],
        })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let exporter = Exporter::connect(config_for(&server, temp_dir.path())).unwrap();

    let status = exporter.run().await.unwrap();

    // The failed comprehensive fetch is a warning, every field was still retrieved
    assert!(!status.had_errors, "{status:?}");
    assert_eq!(status.error_count, 0);
    let card = temp_dir.path().join("Home Projects/To Do/Paint fence");
    assert_eq!(
        read(card.join("CardComments.md")),
        "**Ada Lovelace** (2024-03-01 09:30:00): Bought paint\n"
    );
    assert_eq!(read(card.join("CardLabels.md")), "**Urgent** - red (lb1)\n");
    assert_eq!(read(card.join("CardHistory.md")), "");
}

#[tokio::test]
async fn failed_attachment_download_skips_only_that_file() {
    let server = MockServer::start().await;
    mount_board(&server).await;
    mount_comprehensive("c1", populated_card()).mount(&server).await;
    for id in ["c2", "c3"] {
        mount_comprehensive(id, empty_comprehensive(id, "", "l1", false))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/1/cards/c1/attachments/a1/download/fence.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let exporter = Exporter::connect(config_for(&server, temp_dir.path())).unwrap();

    let status = exporter.run().await.unwrap();

    assert!(!status.had_errors);
    assert_eq!(status.error_count, 1);
    let card = temp_dir.path().join("Home Projects/To Do/Paint fence");
    assert!(!card.join("attachments/fence (Card Cover).jpg").exists());
    assert!(card.join("attachments/URL-Attachments.md").is_file());
    assert!(card.join("CardComments.md").is_file());
}

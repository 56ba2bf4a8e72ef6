//! The dispatcher schema end to end, with Telegram mocked by wiremock
//!
//! Updates are fed straight into the handler tree; Telegram API calls land on the mock
//! server and are inspected afterwards.

mod mocks;

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{Me, Update};
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivelink::core::{UserKey, WorkerPool};
use drivelink::download::{Pipeline, SourceResolver};
use drivelink::i18n;
use drivelink::storage::CredentialStore;
use drivelink::telegram::{schema, HandlerDeps, HandlerError};

use mocks::{credentials_expiring_in, FakeFetcher, FakeMega, FakeOAuth, FakeUploader, FetchBehavior};

const CHAT_ID: i64 = 123456789;

struct HandlerTest {
    _root: TempDir,
    mock_server: MockServer,
    bot: Bot,
    fetcher: Arc<FakeFetcher>,
    store: Arc<CredentialStore>,
    handler: UpdateHandler<HandlerError>,
}

impl HandlerTest {
    async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let bot = Bot::new("test_token_12345:ABCDEF").set_api_url(mock_server.uri().parse().unwrap());

        let root = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new("http", FetchBehavior::write("a.zip", b"zip bytes"));
        let store = Arc::new(CredentialStore::new(root.path().join("credentials"), FakeOAuth::new()));
        let lang = i18n::lang_from_code("en");

        let resolver = SourceResolver::new(
            fetcher.clone(),
            FakeFetcher::new("segmented", FetchBehavior::Fail("unused".into())),
            FakeMega::new(FetchBehavior::Fail("unused".into())),
            true,
            lang.clone(),
        );
        let pipeline = Pipeline::new(
            resolver,
            FakeUploader::ok(),
            Arc::clone(&store),
            root.path().join("downloads"),
            "drivelink",
            lang.clone(),
        );
        let deps = HandlerDeps::new(Arc::new(pipeline), WorkerPool::new(2), lang);

        let test = Self {
            _root: root,
            mock_server,
            bot,
            fetcher,
            store,
            handler: schema(deps),
        };
        test.mock_telegram_api().await;
        test
    }

    async fn mock_telegram_api(&self) {
        let message = serde_json::json!({
            "ok": true,
            "result": {
                "message_id": 42,
                "from": { "id": 987654321, "is_bot": true, "first_name": "TestBot" },
                "chat": { "id": CHAT_ID, "type": "private" },
                "date": 1735992000,
                "text": "Response"
            }
        });

        Mock::given(method("POST"))
            .and(path_regex("(?i)/bot[^/]+/(sendMessage|editMessageText)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message))
            .mount(&self.mock_server)
            .await;
    }

    fn me() -> Me {
        serde_json::from_value(serde_json::json!({
            "id": 987654321,
            "is_bot": true,
            "first_name": "TestBot",
            "username": "test_bot",
            "can_join_groups": true,
            "can_read_all_group_messages": false,
            "supports_inline_queries": false,
            "can_connect_to_business": false,
            "has_main_web_app": false
        }))
        .unwrap()
    }

    fn update(text: &str) -> Update {
        // Parsed from a string: teloxide's `UpdateKind` deserializer needs borrowed keys,
        // which `serde_json::from_value` cannot provide.
        serde_json::from_str(&serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "date": 1735992000,
                "chat": { "id": CHAT_ID, "type": "private", "first_name": "Test" },
                "from": { "id": CHAT_ID, "is_bot": false, "first_name": "Test" },
                "text": text
            }
        })
        .to_string())
        .unwrap()
    }

    async fn send(&self, text: &str) {
        let result = self
            .handler
            .dispatch(dptree::deps![self.bot.clone(), Self::me(), Self::update(text)])
            .await;
        assert!(matches!(result, ControlFlow::Break(Ok(()))), "update was not handled");
    }

    /// Texts sent to Telegram so far, in order, for the given API method.
    async fn texts(&self, api_method: &str) -> Vec<String> {
        self.mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            // Bot API method names are case-insensitive; teloxide sends them capitalized
            .filter(|r| {
                let path = r.url.path().to_ascii_lowercase();
                path.ends_with(&api_method.to_ascii_lowercase())
            })
            .filter_map(|r| serde_json::from_slice::<serde_json::Value>(&r.body).ok())
            .filter_map(|body| body["text"].as_str().map(str::to_string))
            .collect()
    }

    async fn wait_for_edit(&self, needle: &str) -> bool {
        for _ in 0..100 {
            if self.texts("editMessageText").await.iter().any(|t| t.contains(needle)) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}

#[tokio::test]
async fn revoke_without_credentials_replies_failure() {
    let test = HandlerTest::new().await;

    test.send("/revoke").await;

    assert_eq!(test.texts("sendMessage").await, vec!["❌ There are no credentials to delete."]);
}

#[tokio::test]
async fn auth_command_sends_consent_link() {
    let test = HandlerTest::new().await;

    test.send("/auth").await;

    let texts = test.texts("sendMessage").await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains(mocks::AUTH_URL));
}

#[tokio::test]
async fn plain_text_is_ignored_silently() {
    let test = HandlerTest::new().await;

    test.send("hello there").await;

    assert!(test.texts("sendMessage").await.is_empty());
    assert!(!test.store.exists(UserKey(CHAT_ID)).await);
}

#[tokio::test]
async fn link_before_auth_asks_to_authorize() {
    let test = HandlerTest::new().await;

    test.send("http://example.com/a.zip").await;

    let texts = test.texts("sendMessage").await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("/auth"));
    assert!(test.fetcher.calls().is_empty());
}

#[tokio::test]
async fn link_runs_a_job_and_edits_the_status_message() {
    let test = HandlerTest::new().await;
    test.store
        .save(UserKey(CHAT_ID), &credentials_expiring_in(3600, "tok"))
        .await
        .unwrap();

    test.send("please mirror http://example.com/a.zip").await;

    assert!(test.wait_for_edit("Download link").await, "job never finished");
    assert_eq!(test.texts("sendMessage").await.len(), 1);
    assert_eq!(test.fetcher.calls(), vec!["http://example.com/a.zip"]);

    let edits = test.texts("editMessageText").await;
    assert!(edits.first().unwrap().contains("Downloading"));
    assert!(edits.last().unwrap().contains("https://drive.example/a.zip"));
}

//! reqwest-backed [`BoardSource`] implementation

use super::models::{CardRole, SearchResponse};
use super::{Action, Attachment, Board, BoardSource, Card, Checklist, Label, List, Member};
use crate::config::{ApiConfig, ApiCredentials, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::{ActionFilter, CardFilter};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

/// Maximum number of actions requested with a comprehensive card fetch
const ACTIONS_LIMIT: &str = "1000";

/// Maximum number of cards requested from the search endpoint
const SEARCH_CARDS_LIMIT: &str = "1000";

/// HTTP client for the board REST API
///
/// Key and token travel as query parameters on API calls. Attachment downloads use the
/// OAuth-style `Authorization` header instead, since the download endpoint rejects
/// query credentials. All calls are retried on transient failures per [`RetryConfig`].
#[derive(Clone)]
pub struct TrelloClient {
    http: reqwest::Client,
    base_url: String,
    credentials: ApiCredentials,
    retry: RetryConfig,
}

impl std::fmt::Debug for TrelloClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl TrelloClient {
    /// Create a client from the API and retry settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the credentials are incomplete or the base URL does
    /// not parse, and [`Error::Network`] if the HTTP client cannot be built.
    pub fn new(api: &ApiConfig, retry: RetryConfig) -> Result<Self> {
        if !api.credentials.is_complete() {
            return Err(Error::config("credentials", "API key and token are required"));
        }
        Url::parse(&api.base_url)
            .map_err(|e| Error::config("base_url", format!("invalid base URL: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(api.request_timeout)
            .user_agent(concat!("trello-dump/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            credentials: api.credentials.clone(),
            retry,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}/{}", self.base_url, path))?)
    }

    fn oauth_header(&self) -> String {
        format!(
            "OAuth oauth_consumer_key=\"{}\", oauth_token=\"{}\"",
            self.credentials.key, self.credentials.token
        )
    }

    /// GET an API path with credentials and extra query parameters, decoding JSON
    async fn get_json<T>(&self, path: &str, params: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        let url = self.endpoint(path)?;
        let auth = [
            ("key", self.credentials.key.as_str()),
            ("token", self.credentials.token.as_str()),
        ];

        tracing::debug!(path, "GET");
        with_retry(&self.retry, || {
            let request = self.http.get(url.clone()).query(&auth).query(params);
            async move {
                let response = check_status(request.send().await?, path).await?;
                Ok::<T, Error>(response.json::<T>().await?)
            }
        })
        .await
    }

    /// GET raw bytes, optionally with the OAuth header
    async fn get_bytes(&self, url: Url, authorized: bool, what: &str) -> Result<Vec<u8>> {
        with_retry(&self.retry, || {
            let mut request = self.http.get(url.clone());
            if authorized {
                request = request.header(reqwest::header::AUTHORIZATION, self.oauth_header());
            }
            async move {
                let response = check_status(request.send().await?, what).await?;
                Ok::<Vec<u8>, Error>(response.bytes().await?.to_vec())
            }
        })
        .await
    }
}

/// Map non-success statuses onto [`Error::NotFound`] / [`Error::Api`]
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(what.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let message = match body.trim() {
        "" => status.canonical_reason().unwrap_or("request failed").to_string(),
        text => text.to_string(),
    };
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl BoardSource for TrelloClient {
    async fn fetch_board(&self, board_id: &str) -> Result<Board> {
        self.get_json(&format!("boards/{board_id}"), &[]).await
    }

    async fn fetch_lists(&self, board_id: &str) -> Result<Vec<List>> {
        self.get_json(&format!("boards/{board_id}/lists"), &[]).await
    }

    async fn fetch_list(&self, list_id: &str) -> Result<List> {
        self.get_json(&format!("lists/{list_id}"), &[]).await
    }

    async fn fetch_board_labels(&self, board_id: &str) -> Result<Vec<Label>> {
        self.get_json(&format!("boards/{board_id}/labels"), &[])
            .await
    }

    async fn fetch_board_members(&self, board_id: &str) -> Result<Vec<Member>> {
        self.get_json(&format!("boards/{board_id}/members"), &[])
            .await
    }

    async fn fetch_cards(&self, board_id: &str, filter: CardFilter) -> Result<Vec<Card>> {
        self.get_json(
            &format!("boards/{board_id}/cards"),
            &[("filter", filter.as_str())],
        )
        .await
    }

    async fn search_cards_by_label(
        &self,
        board_id: &str,
        label_name: &str,
    ) -> Result<Vec<Card>> {
        let query = format!("board:{board_id} label:\"{label_name}\" is:open");
        let response: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("query", query.as_str()),
                    ("modelTypes", "cards"),
                    ("cards_limit", SEARCH_CARDS_LIMIT),
                ],
            )
            .await?;
        Ok(response.cards)
    }

    async fn fetch_card_role(&self, card_id: &str) -> Result<Option<String>> {
        let role: CardRole = self
            .get_json(&format!("cards/{card_id}"), &[("fields", "name,cardRole")])
            .await?;
        Ok(role.card_role)
    }

    async fn fetch_card_comprehensive(&self, card_id: &str) -> Result<Card> {
        self.get_json(
            &format!("cards/{card_id}"),
            &[
                ("attachments", "true"),
                ("actions", "all"),
                ("actions_limit", ACTIONS_LIMIT),
                ("members", "true"),
                ("labels", "all"),
                ("checklists", "all"),
                ("checkItemStates", "true"),
            ],
        )
        .await
    }

    async fn fetch_attachments(&self, card_id: &str) -> Result<Vec<Attachment>> {
        self.get_json(&format!("cards/{card_id}/attachments"), &[])
            .await
    }

    async fn fetch_checklist(&self, checklist_id: &str) -> Result<Checklist> {
        self.get_json(
            &format!("checklists/{checklist_id}"),
            &[("checkItems", "all")],
        )
        .await
    }

    async fn fetch_actions(&self, card_id: &str, filter: ActionFilter) -> Result<Vec<Action>> {
        self.get_json(
            &format!("cards/{card_id}/actions"),
            &[("filter", filter.as_str())],
        )
        .await
    }

    async fn fetch_card_members(&self, card_id: &str) -> Result<Vec<Member>> {
        self.get_json(&format!("cards/{card_id}/members"), &[])
            .await
    }

    async fn fetch_card_labels(&self, card_id: &str) -> Result<Vec<Label>> {
        let card: Card = self
            .get_json(&format!("cards/{card_id}"), &[("fields", "labels")])
            .await?;
        Ok(card.labels.unwrap_or_default())
    }

    async fn download_file(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url)?;
        let what = parsed.path().to_string();
        self.get_bytes(parsed, false, &what).await
    }

    async fn download_attachment(
        &self,
        card_id: &str,
        attachment_id: &str,
        file_name: &str,
    ) -> Result<Vec<u8>> {
        let path = format!(
            "cards/{card_id}/attachments/{attachment_id}/download/{}",
            urlencoding::encode(file_name)
        );
        let url = self.endpoint(&path)?;
        self.get_bytes(url, true, &path).await
    }
}

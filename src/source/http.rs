// src/source/http.rs

//! HTTP gateway adapter.
//!
//! Talks JSON to a gateway that holds the authenticated API session:
//!
//! ```text
//! GET {base}/entities/resolve?ref=<group>
//! GET {base}/channels/{id}/messages?offset_date=<rfc3339>&add_offset=<n>&limit=<n>
//! GET {base}/channels/{id}/participants?filter=<kind>&q=<term>&offset=<n>&limit=<n>
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, EntityHandle, GroupRef, ParticipantFilter, RawRecord};
use crate::source::{EntityResolver, MessageSource, ParticipantSource};

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Remote API reached through an HTTP gateway.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(client: Client, base_url: &str, token: Option<String>) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            token,
        })
    }

    fn get(&self, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path)?;
        let request = self.client.get(url);
        Ok(match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn fetch_records(&self, request: RequestBuilder) -> Result<Vec<RawRecord>> {
        let records = request
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<RawRecord>>()
            .await?;
        Ok(records)
    }
}

#[async_trait]
impl EntityResolver for HttpGateway {
    async fn resolve(&self, group: &GroupRef) -> Result<EntityHandle> {
        let reference = group.to_string();
        let response = self
            .get("entities/resolve")?
            .query(&[("ref", reference.as_str())])
            .send()
            .await
            .map_err(|e| AppError::unknown_group(&reference, e))?;

        match response.status() {
            StatusCode::OK => response
                .json::<EntityHandle>()
                .await
                .map_err(|e| AppError::unknown_group(&reference, e)),
            status => Err(AppError::unknown_group(
                &reference,
                format!("gateway answered {}", status),
            )),
        }
    }
}

#[async_trait]
impl MessageSource for HttpGateway {
    async fn fetch_messages(
        &self,
        entity: &EntityHandle,
        end_of_window: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRecord>> {
        let request = self
            .get(&format!("channels/{}/messages", entity.id))?
            .query(&[
                (
                    "offset_date",
                    end_of_window.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                ("add_offset", offset.to_string()),
                ("limit", limit.to_string()),
            ]);
        self.fetch_records(request).await
    }
}

#[async_trait]
impl ParticipantSource for HttpGateway {
    async fn fetch_participants(
        &self,
        entity: &EntityHandle,
        filter: &ParticipantFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRecord>> {
        let mut request = self
            .get(&format!("channels/{}/participants", entity.id))?
            .query(&[
                ("filter", filter.kind().to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ]);
        if let Some(term) = filter.query() {
            request = request.query(&[("q", term)]);
        }
        self.fetch_records(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer, token: Option<&str>) -> HttpGateway {
        let client = create_async_client(&CrawlerConfig::default()).unwrap();
        HttpGateway::new(client, &server.uri(), token.map(str::to_string)).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_returns_entity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/entities/resolve"))
            .and(query_param("ref", "https://t.me/somegroup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 77, "title": "Some"})))
            .mount(&server)
            .await;

        let group: GroupRef = "https://t.me/somegroup".parse().unwrap();
        let entity = gateway(&server, None).resolve(&group).await.unwrap();
        assert_eq!(entity.id, 77);
        assert_eq!(entity.title.as_deref(), Some("Some"));
    }

    #[tokio::test]
    async fn test_resolve_not_found_is_unknown_group() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/entities/resolve"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let group: GroupRef = "12345".parse().unwrap();
        let err = gateway(&server, None).resolve(&group).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownGroup { .. }));
    }

    #[tokio::test]
    async fn test_fetch_messages_sends_cursor_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/77/messages"))
            .and(query_param("offset_date", "2023-03-02T00:00:00Z"))
            .and(query_param("add_offset", "500"))
            .and(query_param("limit", "500"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "from_id": 5, "date": 1677665700, "message": "hello"}
            ])))
            .mount(&server)
            .await;

        let entity = EntityHandle { id: 77, title: None };
        let end = Utc.with_ymd_and_hms(2023, 3, 2, 0, 0, 0).unwrap();
        let records = gateway(&server, Some("secret"))
            .fetch_messages(&entity, end, 500, 500)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_participants_search_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/77/participants"))
            .and(query_param("filter", "search"))
            .and(query_param("q", "m"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
            .mount(&server)
            .await;

        let entity = EntityHandle { id: 77, title: None };
        let filter = ParticipantFilter::Search("m".into());
        let records = gateway(&server, None)
            .fetch_participants(&entity, &filter, 0, 200)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let entity = EntityHandle { id: 77, title: None };
        let result = gateway(&server, None)
            .fetch_participants(&entity, &ParticipantFilter::Bots, 0, 200)
            .await;
        assert!(matches!(result, Err(AppError::Http(_))));
    }
}

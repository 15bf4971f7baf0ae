//! HubSpot CRM contacts API client.
//!
//! Implements [`ContactStore`] over the v3 contacts endpoints:
//! `POST {base}/search`, `PATCH {base}/{id}` and `POST {base}`. Every request carries
//! the private app access token as a bearer token.

use crate::contact::{ContactProperties, ContactStore, RemoteContact, EMAIL_PROPERTY};
use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use async_trait::async_trait;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use service::config::Config;
use std::collections::HashMap;
use std::time::Duration;

/// HubSpot CRM API client
pub struct HubSpotClient {
    client: reqwest::Client,
    base_url: String,
}

/// Request payload for `POST /search`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub filter_groups: Vec<FilterGroup>,
}

#[derive(Debug, Serialize)]
pub struct FilterGroup {
    pub filters: Vec<Filter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub property_name: String,
    pub operator: String,
    pub value: String,
}

impl SearchRequest {
    /// Exact match on the contact's email property.
    pub fn email_equals(email: &str) -> Self {
        SearchRequest {
            filter_groups: vec![FilterGroup {
                filters: vec![Filter {
                    property_name: EMAIL_PROPERTY.to_string(),
                    operator: "EQ".to_string(),
                    value: email.to_string(),
                }],
            }],
        }
    }
}

/// Response from `POST /search`
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Option<String>>,
}

impl From<SearchResult> for RemoteContact {
    fn from(result: SearchResult) -> Self {
        let email = result.properties.get(EMAIL_PROPERTY).cloned().flatten();
        RemoteContact {
            id: result.id,
            email,
        }
    }
}

/// Body shared by the create and update endpoints
#[derive(Debug, Serialize)]
pub struct PropertiesRequest<'a> {
    pub properties: &'a ContactProperties,
}

impl HubSpotClient {
    /// Create a new HubSpot client authenticated with the configured access token
    pub fn new(config: &Config) -> Result<Self, Error> {
        let token = SecretString::new(config.hubspot_access_token().to_string());
        let headers = build_auth_headers(&token)?;

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.crm_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.hubspot_base_url().to_string(),
        })
    }

    /// Send `request`, turning transport failures and non-2xx statuses into errors that
    /// carry the response body for the logs.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<reqwest::Response, Error> {
        let response = request.send().await.map_err(|e| {
            warn!("Failed to send HubSpot {action} request: {e:?}");
            Error::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        warn!("HubSpot {action} failed: {status} - {error_text}");
        Err(Error {
            source: Some(format!("HubSpot {action} returned {status}: {error_text}").into()),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Upstream(status.as_u16())),
        })
    }
}

#[async_trait]
impl ContactStore for HubSpotClient {
    async fn search_by_email(&self, email: &str) -> Result<Vec<RemoteContact>, Error> {
        let url = format!("{}/search", self.base_url);
        debug!("Searching HubSpot contacts for {email}");

        let response = self
            .send(
                self.client.post(&url).json(&SearchRequest::email_equals(email)),
                "search",
            )
            .await?;

        let search: SearchResponse = response.json().await.map_err(|e| {
            warn!("Failed to decode HubSpot search response: {e:?}");
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Invalid HubSpot search response".to_string(),
                )),
            }
        })?;

        debug!("HubSpot search returned {} result(s)", search.results.len());
        Ok(search.results.into_iter().map(RemoteContact::from).collect())
    }

    async fn update(&self, id: &str, properties: &ContactProperties) -> Result<(), Error> {
        let url = format!("{}/{}", self.base_url, id);

        self.send(
            self.client.patch(&url).json(&PropertiesRequest { properties }),
            "update",
        )
        .await?;
        Ok(())
    }

    async fn create(&self, properties: &ContactProperties) -> Result<(), Error> {
        self.send(
            self.client
                .post(&self.base_url)
                .json(&PropertiesRequest { properties }),
            "create",
        )
        .await?;
        Ok(())
    }
}

/// Build authentication headers for the HubSpot API
fn build_auth_headers(token: &SecretString) -> Result<reqwest::header::HeaderMap, Error> {
    let mut headers = reqwest::header::HeaderMap::new();
    let auth_value = format!("Bearer {}", token.expose_secret());
    let mut auth_header = reqwest::header::HeaderValue::from_str(&auth_value).map_err(|err| {
        warn!("Failed to create authorization header value: {err:?}");
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    })?;
    auth_header.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, auth_header);

    headers.insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const CONTACTS_PATH: &str = "/crm/v3/objects/contacts";

    fn config_for(server_url: &str, token: &str) -> Config {
        let base_url = format!("{server_url}{CONTACTS_PATH}");
        Config::try_from_args([
            "csat_sync",
            "--intercom-client-secret",
            "intercom-secret",
            "--hubspot-access-token",
            token,
            "--hubspot-base-url",
            base_url.as_str(),
        ])
        .unwrap()
    }

    fn client_for(server_url: &str) -> HubSpotClient {
        HubSpotClient::new(&config_for(server_url, "test_token_123")).unwrap()
    }

    fn properties() -> ContactProperties {
        ContactProperties::from([
            ("intercom_csat_remark".to_string(), "great".to_string()),
            ("intercom_csat_score".to_string(), "5".to_string()),
        ])
    }

    #[test]
    fn test_new_rejects_token_that_is_not_a_header_value() {
        let result = HubSpotClient::new(&config_for("http://127.0.0.1:1", "bad\ntoken"));

        assert_eq!(
            result.err().map(|e| e.error_kind),
            Some(DomainErrorKind::Internal(InternalErrorKind::Config))
        );
    }

    #[test]
    fn test_search_request_serialization() {
        let json = serde_json::to_value(SearchRequest::email_equals("a@b.com")).unwrap();

        assert_eq!(
            json,
            json!({
                "filterGroups": [{
                    "filters": [{ "propertyName": "email", "operator": "EQ", "value": "a@b.com" }]
                }]
            })
        );
    }

    #[tokio::test]
    async fn test_search_by_email_preserves_result_order() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/crm/v3/objects/contacts/search")
            .match_header("authorization", "Bearer test_token_123")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "filterGroups": [{
                    "filters": [{ "propertyName": "email", "operator": "EQ", "value": "a@b.com" }]
                }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "total": 2,
                    "results": [
                        { "id": "9", "properties": { "email": "a@b.com", "firstname": null } },
                        { "id": "4", "properties": { "email": null } }
                    ]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let contacts = client_for(&server.url())
            .search_by_email("a@b.com")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            contacts,
            vec![
                RemoteContact {
                    id: "9".to_string(),
                    email: Some("a@b.com".to_string())
                },
                RemoteContact {
                    id: "4".to_string(),
                    email: None
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_search_with_no_results() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/crm/v3/objects/contacts/search")
            .with_status(200)
            .with_body(r#"{"total":0,"results":[]}"#)
            .create_async()
            .await;

        let contacts = client_for(&server.url())
            .search_by_email("nobody@b.com")
            .await
            .unwrap();

        assert!(contacts.is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_reports_upstream_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/crm/v3/objects/contacts/search")
            .with_status(401)
            .with_body(r#"{"status":"error","message":"Authentication credentials not found"}"#)
            .create_async()
            .await;

        let err = client_for(&server.url())
            .search_by_email("a@b.com")
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Upstream(401))
        );
        let detail = std::error::Error::source(&err).map(|s| s.to_string()).unwrap();
        assert!(detail.contains("Authentication credentials not found"));
    }

    #[tokio::test]
    async fn test_search_with_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/crm/v3/objects/contacts/search")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = client_for(&server.url())
            .search_by_email("a@b.com")
            .await
            .unwrap_err();

        assert!(err.is_external());
    }

    #[tokio::test]
    async fn test_update_patches_only_given_properties() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/crm/v3/objects/contacts/101")
            .match_header("authorization", "Bearer test_token_123")
            .match_body(Matcher::Json(json!({
                "properties": {
                    "intercom_csat_score": "5",
                    "intercom_csat_remark": "great"
                }
            })))
            .with_status(200)
            .with_body(r#"{"id":"101","properties":{}}"#)
            .expect(1)
            .create_async()
            .await;

        client_for(&server.url())
            .update("101", &properties())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_posts_properties() {
        let mut server = Server::new_async().await;
        let mut create_properties = properties();
        create_properties.insert("email".to_string(), "a@b.com".to_string());

        let mock = server
            .mock("POST", CONTACTS_PATH)
            .match_header("authorization", "Bearer test_token_123")
            .match_body(Matcher::Json(json!({
                "properties": {
                    "email": "a@b.com",
                    "intercom_csat_score": "5",
                    "intercom_csat_remark": "great"
                }
            })))
            .with_status(201)
            .with_body(r#"{"id":"202","properties":{}}"#)
            .expect(1)
            .create_async()
            .await;

        client_for(&server.url())
            .create(&create_properties)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_conflict_is_upstream_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", CONTACTS_PATH)
            .with_status(409)
            .with_body(r#"{"status":"error","message":"Contact already exists"}"#)
            .create_async()
            .await;

        let err = client_for(&server.url())
            .create(&properties())
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Upstream(409))
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Nothing listens on port 1
        let client = client_for("http://127.0.0.1:1");

        let err = client.search_by_email("a@b.com").await.unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Network)
        );
    }
}

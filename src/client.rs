//! HTTP client for the health board API

use crate::errors::{DashboardError, Result};
use crate::models::{validate_name, HealthData, ItemUpdate, StatusConfig};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Where the dashboard gets its data from
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn status_config(&self) -> Result<StatusConfig>;
    async fn health(&self) -> Result<HealthData>;
}

/// Client for the board's REST API
#[derive(Debug, Clone)]
pub struct HealthBoardClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HealthBoardClient {
    /// Create a client for an API root such as `http://127.0.0.1:5000/api`
    pub fn new(base_url: &str, http_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DashboardError::Config(format!("invalid base url '{}': {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(DashboardError::Config(format!(
                "base url '{}' cannot carry a path",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(format!("health-board/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DashboardError::Http)?;

        Ok(Self {
            client,
            base_url,
            timeout: http_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DashboardError::Config(format!("base url '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch the full health snapshot
    pub async fn get_health(&self) -> Result<HealthData> {
        let url = self.endpoint(&["health"])?;
        let response = self.send(self.client.get(url), "health data").await?;
        Ok(response.json().await?)
    }

    /// Fetch the status name → style map
    pub async fn get_status_config(&self) -> Result<StatusConfig> {
        let url = self.endpoint(&["status-config"])?;
        let response = self.send(self.client.get(url), "status config").await?;
        Ok(response.json().await?)
    }

    pub async fn create_category(&self, category: &str) -> Result<Value> {
        validate_name("category_name", category)?;
        let url = self.endpoint(&["categories"])?;
        let request = self.client.post(url).json(&json!({ "category_name": category }));
        let response = self.send(request, &format!("category '{}'", category)).await?;
        info!("Created category '{}'", category);
        Ok(response.json().await?)
    }

    pub async fn delete_category(&self, category: &str) -> Result<Value> {
        let url = self.endpoint(&["categories", category])?;
        let response = self
            .send(self.client.delete(url), &format!("category '{}'", category))
            .await?;
        info!("Deleted category '{}'", category);
        Ok(response.json().await?)
    }

    /// Create an item, first creating its category when `upsert` is set
    pub async fn create_item(&self, category: &str, item: &str, upsert: bool) -> Result<Value> {
        validate_name("item_name", item)?;
        if upsert {
            self.create_category(category).await?;
        }

        let url = self.endpoint(&["categories", category, "items"])?;
        let request = self.client.post(url).json(&json!({ "item_name": item }));
        let response = self
            .send(request, &format!("item '{}' in '{}'", item, category))
            .await?;
        info!("Created item '{}' in category '{}'", item, category);
        Ok(response.json().await?)
    }

    pub async fn delete_item(&self, category: &str, item: &str) -> Result<Value> {
        let url = self.endpoint(&["categories", category, "items", item])?;
        let response = self
            .send(self.client.delete(url), &format!("item '{}' in '{}'", item, category))
            .await?;
        info!("Deleted item '{}' from category '{}'", item, category);
        Ok(response.json().await?)
    }

    /// Update an item's status, message or url.
    ///
    /// With `upsert` the category and item are created first. An update
    /// without fields sends nothing and returns [`DashboardError::NoChanges`].
    pub async fn update_item(
        &self,
        category: &str,
        item: &str,
        update: ItemUpdate,
        upsert: bool,
    ) -> Result<Value> {
        if update.is_empty() {
            return Err(DashboardError::NoChanges);
        }
        let update = update.normalized()?;

        if upsert {
            match self.create_item(category, item, true).await {
                Ok(_) => {}
                Err(e) if e.status_code() == Some(409) => {
                    debug!("Item '{}' in '{}' already exists", item, category);
                }
                Err(e) => return Err(e),
            }
        }

        let url = self.endpoint(&["categories", category, "items", item])?;
        let request = self.client.put(url).json(&update);
        let response = self
            .send(request, &format!("item '{}' in '{}'", item, category))
            .await?;
        info!("Updated item '{}' in category '{}'", item, category);
        Ok(response.json().await?)
    }

    /// Ask the board to write its state to its checkpoint file
    pub async fn checkpoint(&self) -> Result<Value> {
        let url = self.endpoint(&["checkpoint"])?;
        let response = self.send(self.client.post(url), "checkpoint").await?;
        Ok(response.json().await?)
    }

    /// Ask the board to reload its state from its checkpoint file
    pub async fn restore(&self) -> Result<Value> {
        let url = self.endpoint(&["restore"])?;
        let response = self.send(self.client.post(url), "restore").await?;
        Ok(response.json().await?)
    }

    async fn send(&self, request: RequestBuilder, subject: &str) -> Result<Response> {
        let response = timeout(self.timeout, request.send())
            .await
            .map_err(|_| DashboardError::Other(format!("Request for {} timed out", subject)))?
            .map_err(DashboardError::Http)?;

        self.handle_response(response, subject).await
    }

    /// Turn non-success answers into errors carrying the board's message
    async fn handle_response(&self, response: Response, subject: &str) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            debug!("Board accepted request for {} ({})", subject, status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| if body.is_empty() { "no details".to_string() } else { body });

        let message = match status.as_u16() {
            400 => format!("Bad request for {}: {}", subject, detail),
            404 => format!("Not found: {}: {}", subject, detail),
            409 => format!("Conflict for {}: {}", subject, detail),
            500..=599 => format!("Board server error for {}: {}", subject, detail),
            _ => format!("Unexpected response {} for {}: {}", status, subject, detail),
        };

        warn!("{}", message);

        Err(DashboardError::Status {
            code: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl HealthSource for HealthBoardClient {
    async fn status_config(&self) -> Result<StatusConfig> {
        self.get_status_config().await
    }

    async fn health(&self) -> Result<HealthData> {
        self.get_health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HealthBoardClient::new("http://localhost:5000/api", Duration::from_secs(10));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url().as_str(), "http://localhost:5000/api");

        assert!(HealthBoardClient::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HealthBoardClient::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client =
            HealthBoardClient::new("http://localhost:5000/api/", Duration::from_secs(10)).unwrap();

        let url = client
            .endpoint(&["categories", "Hosts Online", "items", "mars"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/categories/Hosts%20Online/items/mars"
        );

        let url = client.endpoint(&["categories", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/categories/a%2Fb");
    }

    #[tokio::test]
    async fn test_validation_happens_before_sending() {
        // nothing listens on this port; validation must fail first
        let client =
            HealthBoardClient::new("http://127.0.0.1:9/api", Duration::from_secs(1)).unwrap();

        let err = client.create_category("<script>").await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));

        let err = client
            .update_item("Cat", "Item", ItemUpdate::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::NoChanges));

        let update = ItemUpdate {
            url: Some("ftp://example.com".to_string()),
            ..Default::default()
        };
        let err = client.update_item("Cat", "Item", update, true).await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));
    }
}

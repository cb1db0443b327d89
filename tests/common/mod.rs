#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use cats_social::config::AppConfig;
use cats_social::database::MemoryStore;
use cats_social::server::{app, AppState};

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Serve a fresh in-memory app on the current test's runtime.
    async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = port;
        config.api.enable_request_logging = false;

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        let router = app(AppState::new(config, Arc::new(MemoryStore::new())));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self { port, base_url, client: reqwest::Client::new() })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a user and return its bearer token.
    pub async fn register(&self, email: &str, name: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/v1/user/register"))
            .json(&json!({ "email": email, "name": name, "password": "whiskers" }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["accessToken"]
            .as_str()
            .map(str::to_string)
            .context("accessToken missing from register response")
    }

    /// Create a cat for `token` and return its string id.
    pub async fn create_cat(&self, token: &str, name: &str, sex: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/v1/cat"))
            .bearer_auth(token)
            .json(&cat_body(name, sex))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create cat failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["id"]
            .as_str()
            .map(str::to_string)
            .context("id missing from create cat response")
    }

    /// Propose a match and return the raw response.
    pub async fn propose(&self, token: &str, user_cat: &str, match_cat: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/v1/cat/match"))
            .bearer_auth(token)
            .json(&json!({
                "userCatId": user_cat,
                "matchCatId": match_cat,
                "message": "would they get along?"
            }))
            .send()
            .await?)
    }

    pub async fn get_json(&self, token: &str, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).bearer_auth(token).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }
}

pub fn cat_body(name: &str, sex: &str) -> Value {
    json!({
        "name": name,
        "race": "Persian",
        "sex": sex,
        "ageInMonth": 12,
        "description": "Fluffy and calm",
        "imageUrls": ["https://example.com/cat.jpg"]
    })
}

pub async fn ensure_server() -> Result<TestServer> {
    let server = TestServer::spawn().await?;
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

//! OAuth2 client-credentials exchange for service-to-service access tokens.

use reqwest::Client;
use serde::Deserialize;

use crate::error::{ApiError, Result};

const AUTHORITY_BASE: &str = "https://login.microsoftonline.com";

#[derive(Debug, Deserialize, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

/// Scope requesting the app's configured permissions on a resource,
/// e.g. `https://org.crm.dynamics.com/.default`.
pub fn default_scope(resource: &str) -> String {
    format!("{}/.default", resource.trim_end_matches('/'))
}

pub async fn exchange_client_credentials(
    tenant: &str,
    client_id: &str,
    client_secret: &str,
    scope: &str,
) -> Result<TokenResponse> {
    exchange_client_credentials_at(AUTHORITY_BASE, tenant, client_id, client_secret, scope).await
}

/// Same exchange against an explicit authority, used for sovereign clouds and tests.
pub async fn exchange_client_credentials_at(
    authority: &str,
    tenant: &str,
    client_id: &str,
    client_secret: &str,
    scope: &str,
) -> Result<TokenResponse> {
    let url = format!(
        "{}/{}/oauth2/v2.0/token",
        authority.trim_end_matches('/'),
        tenant.trim()
    );
    let client = Client::new();
    let response = client
        .post(url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", scope),
        ])
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        response.json::<TokenResponse>().await.map_err(ApiError::from)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Authentication(auth_failure_message(&body, status.as_u16())))
    }
}

fn auth_failure_message(body: &str, status: u16) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error_description")
                .or_else(|| value.get("error"))
                .and_then(|text| text.as_str())
                .map(|text| text.lines().next().unwrap_or(text).to_string())
        })
        .unwrap_or_else(|| format!("token endpoint returned {}", status))
}

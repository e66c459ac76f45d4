use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::provider::AuthError;

/// Response of the external API, body kept verbatim.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Calls the external API once with `token` as bearer credential.
///
/// The status is not turned into an error: the body is returned as-is for
/// display. A body that is not JSON fails with
/// [`AuthError::InvalidResponse`].
///
/// # Example
///
/// ```
/// let url = "http://localhost:3001/api/external";
/// let res = call_external(&Client::new(), url, &token).await?;
/// println!("{}", res.body);
/// ```
pub async fn call_external(
    client: &Client,
    url: &str,
    token: &str,
) -> Result<ApiResponse, AuthError> {
    let response = client.get(url).bearer_auth(token).send().await?;
    let status = response.status();
    let body = response
        .json::<Value>()
        .await
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

    Ok(ApiResponse { status, body })
}

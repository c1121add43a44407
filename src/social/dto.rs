use serde::Deserialize;

/// Normalized profile handed over by the OAuth callback layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLoginRequest {
    pub email: String,
    pub full_name: String,
    pub provider_id: String,
    pub provider: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAccountRequest {
    pub email: String,
    pub otp: String,
    pub provider_id: String,
    pub provider: String,
}

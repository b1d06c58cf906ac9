use serde::Deserialize;

/// Body of `GET /health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub lm: Option<ModelServer>,
}

/// Language-model server the service talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelServer {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default)]
    pub chat_model: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

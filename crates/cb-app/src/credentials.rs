use async_trait::async_trait;

pub const TOKEN_ENV_VAR: &str = "CRAYONBOX_TOKEN";

/// Where the signed-in user's bearer token lives.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn retrieve_token(&self) -> Option<String>;
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvTokenStore {
    var: String,
}

impl EnvTokenStore {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenStore {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VAR)
    }
}

#[async_trait]
impl TokenStore for EnvTokenStore {
    async fn retrieve_token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

/// A fixed token, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenStore(Option<String>);

impl StaticTokenStore {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenStore for StaticTokenStore {
    async fn retrieve_token(&self) -> Option<String> {
        self.0.clone()
    }
}

//! Authentication API client methods

use super::{AuthMode, CampusClient, ClientError, RequestBody, RequestOptions};
use campuskart_core::{LoginRequest, RegisterRequest, TokenPair, TokenResponse, User};

impl CampusClient {
    /// Exchange credentials for a token pair and cache it in the session
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<TokenResponse, ClientError> {
        let body = RequestBody::json(&LoginRequest {
            email: email.into(),
            password: password.into(),
        })?;

        let tokens: TokenResponse = self
            .request_json("/token/", &RequestOptions::post(body), AuthMode::Public)
            .await?;

        self.session()
            .store_tokens(tokens.access.as_deref(), tokens.refresh.as_deref())
            .await?;
        info!("Logged in");
        Ok(tokens)
    }

    /// Create an account; sent as multipart when a profile picture is attached
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ClientError> {
        let body =
            RequestBody::with_files(request, [("profile_picture", request.profile_picture.as_ref())])?;
        self.request_json("/register/", &RequestOptions::post(body), AuthMode::Public)
            .await
    }

    /// Current user's profile
    pub async fn profile(&self) -> Result<User, ClientError> {
        self.request_json("/profile/", &RequestOptions::get(), AuthMode::Required)
            .await
    }

    /// Drop both cached tokens
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session().clear().await?;
        info!("Logged out");
        Ok(())
    }

    pub async fn tokens(&self) -> Option<TokenPair> {
        self.session().tokens().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session().is_authenticated().await
    }
}

//! HTTP client for the backend API. The auth token lives in the client's
//! [`Preferences`] so it survives restarts.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::dto::{AuthResponse, MessageResponse, PublicUser};
use crate::auth::password::MIN_PASSWORD_LEN;
use crate::auth::{Role, AUTH_TOKEN_HEADER};
use crate::history::dto::HistoryResponse;
use crate::prefs::{KeyValueStore, Preferences};
use crate::stylist::Outfit;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error; `message` is its `msg` field.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Sign-up form as filled in by the user.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(ClientError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long."
            )));
        }
        if self.password != self.confirm_password {
            return Err(ClientError::Validation("Passwords do not match.".into()));
        }
        Ok(())
    }
}

pub struct ApiClient<S> {
    http: Client,
    base_url: String,
    prefs: Preferences<S>,
}

impl<S: KeyValueStore> ApiClient<S> {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: impl Into<String>, prefs: Preferences<S>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            prefs,
        }
    }

    pub fn prefs(&self) -> &Preferences<S> {
        &self.prefs
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = self.prefs.token()? {
            req = req.header(AUTH_TOKEN_HEADER, token);
        }
        Ok(req)
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ClientError> {
        let res = req.send().await?;
        Ok(Self::check(res).await?.json::<T>().await?)
    }

    async fn check(res: Response) -> Result<Response, ClientError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<MessageResponse>(&body)
            .map(|m| m.msg)
            .unwrap_or(body);
        debug!(%status, %message, "api error");
        Err(ClientError::Api { status, message })
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        Self::send(self.request(Method::POST, path)?.json(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        Self::send(self.request(Method::GET, path)?).await
    }

    async fn delete(&self, path: &str) -> Result<String, ClientError> {
        let res: MessageResponse = Self::send(self.request(Method::DELETE, path)?).await?;
        Ok(res.msg)
    }

    /// Validates locally, then registers and keeps the returned token.
    pub async fn register(&self, form: &RegistrationForm) -> Result<PublicUser, ClientError> {
        form.validate()?;
        let res: AuthResponse = self
            .post(
                "/auth/register",
                &json!({
                    "name": form.name,
                    "email": form.email,
                    "password": form.password,
                    "role": form.role,
                }),
            )
            .await?;
        self.prefs.set_token(&res.token)?;
        info!(user_id = %res.user.id, "registered");
        Ok(res.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, ClientError> {
        let res: AuthResponse = self
            .post(
                "/auth/login",
                &json!({ "email": email, "password": password }),
            )
            .await?;
        self.prefs.set_token(&res.token)?;
        info!(user_id = %res.user.id, "logged in");
        Ok(res.user)
    }

    /// The signed-in user, or `None` without a token. A token the server
    /// rejects is forgotten.
    pub async fn current_user(&self) -> Result<Option<PublicUser>, ClientError> {
        if self.prefs.token()?.is_none() {
            return Ok(None);
        }
        match self.get::<PublicUser>("/auth/me").await {
            Ok(user) => Ok(Some(user)),
            Err(ClientError::Api { status, .. })
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND =>
            {
                warn!(%status, "stored token rejected, signing out");
                self.prefs.clear_token()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.prefs.clear_token()?;
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<PublicUser>, ClientError> {
        self.get("/auth/").await
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<String, ClientError> {
        self.delete(&format!("/auth/{id}")).await
    }

    pub async fn save_history(&self, outfit: &Outfit) -> Result<HistoryResponse, ClientError> {
        self.post("/history/", &json!({ "outfit": outfit })).await
    }

    pub async fn list_history(&self) -> Result<Vec<HistoryResponse>, ClientError> {
        self.get("/history/").await
    }

    pub async fn delete_history(&self, id: Uuid) -> Result<String, ClientError> {
        self.delete(&format!("/history/{id}")).await
    }
}

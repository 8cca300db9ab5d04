//! HTTP client for the scheduler backend.

use super::envelope::{Envelope, UNAUTHORIZED_CODE};
use super::error::Error;
use crate::auth::{SessionEvent, SessionStore};
use crate::config::Config;
use crate::model::{
    AddedTask, FileList, FileRef, LogPage, LogQuery, NewShellTask, Task, TaskList, TaskRef,
    UploadedFile,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::path::Path;
use std::sync::RwLock;
use tokio::sync::mpsc;

/// What goes out with a request besides headers.
#[derive(Debug)]
pub enum Payload {
    Empty,
    Json(Value),
    Query(Vec<(&'static str, String)>),
    /// Multipart body. Content type (with boundary) is left to the transport.
    Multipart(Form),
}

impl Payload {
    fn json<T: Serialize>(body: &T) -> Result<Self, Error> {
        serde_json::to_value(body)
            .map(Self::Json)
            .map_err(|e| Error::Decode(format!("Failed to encode request: {e}")))
    }

    fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

/// In-memory credential. Loaded from the session store on first use.
#[derive(Debug, Clone)]
enum CredentialSlot {
    Unloaded,
    Loaded(Option<String>),
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

/// The one gateway to backend state.
///
/// Attaches the bearer credential, unwraps the `{code, msg, data}` envelope,
/// and turns every failure into an [`Error`]. A rejected credential is cleared
/// and reported both as [`Error::Unauthorized`] and as a
/// [`SessionEvent::Unauthenticated`] for subscribers. Nothing is retried.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: SessionStore,
    credential: RwLock<CredentialSlot>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    max_upload_bytes: u64,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("store", &self.store)
            .field("credential", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: &Config, store: SessionStore) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            http,
            base_url: config.api_root()?,
            store,
            credential: RwLock::new(CredentialSlot::Unloaded),
            events: None,
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    /// Receive lifecycle events. Replaces any earlier subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    #[must_use]
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Installed credential, reading the session store if none was set yet.
    pub fn credential(&self) -> Result<Option<String>, Error> {
        {
            let slot = self.credential.read().unwrap_or_else(|e| e.into_inner());
            if let CredentialSlot::Loaded(token) = &*slot {
                return Ok(token.clone());
            }
        }

        let mut slot = self.credential.write().unwrap_or_else(|e| e.into_inner());
        if let CredentialSlot::Loaded(token) = &*slot {
            return Ok(token.clone());
        }
        let token = self.store.load_token()?;
        tracing::debug!(found = token.is_some(), "Loaded credential from session store");
        *slot = CredentialSlot::Loaded(token.clone());
        Ok(token)
    }

    /// Install or clear the credential, keeping the persisted copy in sync.
    ///
    /// Clearing erases the whole persisted identity, so it is the same as logging out.
    pub fn set_credential(&self, token: Option<&str>) -> Result<(), Error> {
        {
            let mut slot = self.credential.write().unwrap_or_else(|e| e.into_inner());
            *slot = CredentialSlot::Loaded(token.map(str::to_string));
        }
        match token {
            Some(token) => {
                tracing::debug!("Credential installed");
                self.store.save_token(token)?;
            }
            None => {
                tracing::debug!("Credential cleared");
                self.store.clear()?;
            }
        }
        Ok(())
    }

    /// Build headers including authentication.
    fn build_headers(token: Option<&str>, multipart: bool) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        if !multipart {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                Error::Validation("Bearer token contains invalid header characters".into())
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Shared request primitive. Every typed call funnels through here.
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Payload,
    ) -> Result<R, Error> {
        let url = format!("{}{endpoint}", self.base_url);
        let token = self.credential()?;
        let headers = Self::build_headers(token.as_deref(), payload.is_multipart())?;

        tracing::debug!(%method, endpoint, authenticated = token.is_some(), "API request");

        let builder = self.http.request(method.clone(), &url).headers(headers);
        let builder = match payload {
            Payload::Empty => builder,
            Payload::Json(body) => builder.json(&body),
            Payload::Query(params) => builder.query(&params),
            Payload::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let envelope = match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                tracing::debug!(%status, endpoint, "Response is not an envelope: {e}");
                None
            }
        };
        let code = envelope.as_ref().map(|e| e.code);
        tracing::debug!(%method, endpoint, %status, ?code, "API response");

        if status == StatusCode::UNAUTHORIZED || code == Some(UNAUTHORIZED_CODE) {
            return Err(self.reject_credential(endpoint));
        }

        match envelope {
            None if status.is_success() => Err(Error::Decode(format!(
                "Expected response envelope from {endpoint}"
            ))),
            None => Err(Error::RequestFailed(format!("HTTP {status}"))),
            Some(envelope) if !status.is_success() || !envelope.is_success() => {
                Err(Error::RequestFailed(envelope.error_message()))
            }
            Some(envelope) => serde_json::from_value(envelope.data)
                .map_err(|e| Error::Decode(format!("Unexpected data from {endpoint}: {e}"))),
        }
    }

    /// Forced logout: clear the credential, notify subscribers.
    fn reject_credential(&self, endpoint: &str) -> Error {
        tracing::warn!(endpoint, "Credential rejected, clearing session");
        if let Err(e) = self.set_credential(None) {
            tracing::warn!("Failed to clear persisted session: {e}");
        }
        if let Some(events) = &self.events {
            let _ = events.send(SessionEvent::Unauthenticated);
        }
        Error::Unauthorized
    }

    /// Exchange username and password for a fresh credential.
    ///
    /// Does not install the credential; see [`crate::dashboard::Dashboard::login`].
    pub async fn login(&self, username: &str, password: &str) -> Result<String, Error> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(Error::Validation("Username and password are required".into()));
        }
        let body = Payload::json(&LoginRequest { username, password })?;
        let response: LoginResponse = self.request(Method::POST, "/auth/login", body).await?;
        Ok(response.token)
    }

    /// All tasks visible to the caller. An absent list is empty.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, Error> {
        let list: Option<TaskList> = self
            .request(Method::GET, "/tasks/list", Payload::Empty)
            .await?;
        Ok(list.unwrap_or_default().tasks)
    }

    pub async fn add_task(&self, task: &NewShellTask) -> Result<AddedTask, Error> {
        task.validate()?;
        self.request(
            Method::POST,
            "/tasks/add_shell_task",
            Payload::json(task)?,
        )
        .await
    }

    /// Trigger an immediate run of a task.
    pub async fn run_task(&self, task_id: &str) -> Result<(), Error> {
        let body = Payload::json(&TaskRef {
            task_id: require("task_id", task_id)?,
            user_name: None,
        })?;
        let _: Value = self.request(Method::POST, "/tasks/run", body).await?;
        Ok(())
    }

    pub async fn delete_task(&self, task_id: &str, user_name: Option<&str>) -> Result<(), Error> {
        let body = Payload::json(&TaskRef {
            task_id: require("task_id", task_id)?,
            user_name,
        })?;
        let _: Value = self.request(Method::DELETE, "/tasks/delete", body).await?;
        Ok(())
    }

    /// Uploaded script names. An absent list is empty.
    pub async fn list_files(&self) -> Result<Vec<String>, Error> {
        let list: Option<FileList> = self
            .request(Method::GET, "/tasks/list_files", Payload::Empty)
            .await?;
        Ok(list.unwrap_or_default().files)
    }

    /// Upload a script from disk. Oversized files are rejected without a request.
    pub async fn upload_file(&self, path: &Path) -> Result<UploadedFile, Error> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Validation(format!("Not a file: {}", path.display())))?
            .to_string();

        let size = tokio::fs::metadata(path).await?.len();
        self.check_upload_size(&file_name, size)?;

        let bytes = tokio::fs::read(path).await?;
        self.upload_bytes(&file_name, bytes).await
    }

    /// Upload an in-memory blob under the given file name.
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, Error> {
        let file_name = require("file_name", file_name)?.to_string();
        self.check_upload_size(&file_name, bytes.len() as u64)?;

        let part = Part::bytes(bytes).file_name(file_name);
        let form = Form::new().part("file", part);
        self.request(Method::POST, "/tasks/upload_file", Payload::Multipart(form))
            .await
    }

    fn check_upload_size(&self, file_name: &str, size: u64) -> Result<(), Error> {
        if size > self.max_upload_bytes {
            return Err(Error::Validation(format!(
                "{file_name} is too large ({size} bytes, max {} bytes)",
                self.max_upload_bytes
            )));
        }
        Ok(())
    }

    pub async fn delete_file(&self, file_name: &str) -> Result<(), Error> {
        let body = Payload::json(&FileRef {
            file_name: require("file_name", file_name)?,
        })?;
        let _: Value = self
            .request(Method::DELETE, "/tasks/delete_file", body)
            .await?;
        Ok(())
    }

    /// One page of execution logs, newest first as ordered by the backend.
    pub async fn task_logs(&self, query: &LogQuery) -> Result<LogPage, Error> {
        if query.page == 0 || query.page_size == 0 {
            return Err(Error::Validation("page and page_size must be at least 1".into()));
        }
        let page: Option<LogPage> = self
            .request(Method::GET, "/tasks/logs", Payload::Query(query.to_pairs()))
            .await?;
        Ok(page.unwrap_or_default())
    }
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, Error> {
    if value.trim().is_empty() {
        Err(Error::Validation(format!("{field} is required")))
    } else {
        Ok(value)
    }
}

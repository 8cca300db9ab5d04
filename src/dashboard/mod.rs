//! Session lifecycle and view state for the dashboard front end.
//!
//! [`Dashboard`] owns the [`ApiClient`], the current [`Session`], and the list
//! snapshots shown to the user. Every snapshot is replaced wholesale by the
//! most recent completed fetch.

mod table;

pub use table::Table;

use crate::api::{ApiClient, Error};
use crate::auth::{Session, SessionEvent, StoreError};
use crate::config::Config;
use crate::model::{AddedTask, LogPage, LogQuery, NewShellTask, Task, TaskLog, UploadedFile};
use std::path::Path;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Tasks,
    Files,
    Logs,
}

#[derive(Debug)]
pub struct Dashboard {
    client: ApiClient,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    session: Option<Session>,
    view: ViewState,
    log_page_size: u32,
    tasks: Vec<Task>,
    files: Vec<String>,
    logs: LogPage,
    log_page: u32,
}

impl Dashboard {
    pub fn new(mut client: ApiClient, config: &Config) -> Self {
        let events = client.subscribe();
        Self {
            client,
            events,
            session: None,
            view: ViewState::default(),
            log_page_size: config.log_page_size.max(1),
            tasks: Vec::new(),
            files: Vec::new(),
            logs: LogPage::default(),
            log_page: 1,
        }
    }

    /// Restore a persisted session, without network I/O.
    ///
    /// Returns whether the user is authenticated. A stale token is only
    /// detected when the first request using it is rejected. An unreadable
    /// or incomplete store is cleared and treated as logged out.
    pub fn start(&mut self) -> Result<bool, Error> {
        let restored = match self.client.store().restore() {
            Ok(restored) => restored,
            Err(StoreError::Json(e)) => {
                tracing::warn!("Ignoring unreadable session store: {e}");
                None
            }
            Err(e) => return Err(e.into()),
        };
        match restored {
            Some(session) => {
                self.client.set_credential(Some(&session.token))?;
                tracing::info!(username = %session.username, "Restored session");
                self.session = Some(session);
            }
            None => {
                self.client.set_credential(None)?;
                self.session = None;
            }
        }
        Ok(self.session.is_some())
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<&Session, Error> {
        let username = username.trim();
        let token = self.client.login(username, password).await;
        self.drain_events();
        let token = token?;

        let session = Session {
            username: username.to_string(),
            token,
        };
        self.client.set_credential(Some(&session.token))?;
        self.client.store().save(&session)?;
        tracing::info!(username = %session.username, "Logged in");
        Ok(self.session.insert(session))
    }

    pub fn logout(&mut self) -> Result<(), Error> {
        self.client.set_credential(None)?;
        if let Some(session) = self.session.take() {
            tracing::info!(username = %session.username, "Logged out");
        }
        self.reset_views();
        Ok(())
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    #[must_use]
    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn set_view(&mut self, view: ViewState) {
        self.view = view;
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    #[must_use]
    pub fn logs(&self) -> &LogPage {
        &self.logs
    }

    #[must_use]
    pub fn log_page(&self) -> u32 {
        self.log_page
    }

    #[must_use]
    pub fn log_page_size(&self) -> u32 {
        self.log_page_size
    }

    /// Look up a log on the current page.
    #[must_use]
    pub fn find_log(&self, id: u64) -> Option<&TaskLog> {
        self.logs.list.iter().find(|log| log.id == id)
    }

    pub async fn refresh_tasks(&mut self) -> Result<&[Task], Error> {
        self.require_session()?;
        let result = self.client.list_tasks().await;
        self.drain_events();
        self.tasks = result?;
        Ok(&self.tasks)
    }

    /// Create a task, then refresh the list. A failed refresh keeps the old list.
    pub async fn create_task(&mut self, task: &NewShellTask) -> Result<AddedTask, Error> {
        self.require_session()?;
        task.validate()?;
        let result = self.client.add_task(task).await;
        self.drain_events();
        let added = result?;
        self.refresh_after("create_task", ViewState::Tasks).await?;
        Ok(added)
    }

    pub async fn run_task(&mut self, task_id: &str) -> Result<(), Error> {
        self.require_session()?;
        let result = self.client.run_task(task_id).await;
        self.drain_events();
        result
    }

    pub async fn delete_task(&mut self, task_id: &str) -> Result<(), Error> {
        let username = self.require_session()?.username.clone();
        let result = self.client.delete_task(task_id, Some(&username)).await;
        self.drain_events();
        result?;
        self.refresh_after("delete_task", ViewState::Tasks).await
    }

    pub async fn refresh_files(&mut self) -> Result<&[String], Error> {
        self.require_session()?;
        let result = self.client.list_files().await;
        self.drain_events();
        self.files = result?;
        Ok(&self.files)
    }

    pub async fn upload_file(&mut self, path: &Path) -> Result<UploadedFile, Error> {
        self.require_session()?;
        let result = self.client.upload_file(path).await;
        self.drain_events();
        let uploaded = result?;
        self.refresh_after("upload_file", ViewState::Files).await?;
        Ok(uploaded)
    }

    /// Delete a file and drop it from the local snapshot without refetching.
    pub async fn delete_file(&mut self, file_name: &str) -> Result<(), Error> {
        self.require_session()?;
        let result = self.client.delete_file(file_name).await;
        self.drain_events();
        result?;
        self.files.retain(|f| f != file_name);
        Ok(())
    }

    /// Fetch one page of the current user's execution logs.
    pub async fn fetch_logs(&mut self, page: u32) -> Result<&LogPage, Error> {
        let username = self.require_session()?.username.clone();
        let query = LogQuery {
            page: page.max(1),
            page_size: self.log_page_size,
            user_name: Some(username),
        };
        let result = self.client.task_logs(&query).await;
        self.drain_events();
        self.logs = result?;
        self.log_page = query.page;
        Ok(&self.logs)
    }

    /// Refresh the list behind `view` after a mutation. Only a rejected
    /// credential is reported; other refresh failures leave the old snapshot.
    async fn refresh_after(&mut self, action: &str, view: ViewState) -> Result<(), Error> {
        let page = self.log_page;
        let result = match view {
            ViewState::Tasks => self.refresh_tasks().await.map(|_| ()),
            ViewState::Files => self.refresh_files().await.map(|_| ()),
            ViewState::Logs => self.fetch_logs(page).await.map(|_| ()),
        };
        match result {
            Err(e) if e.is_unauthorized() => Err(e),
            Err(e) => {
                tracing::warn!(action, "Refresh failed: {e}");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    fn require_session(&self) -> Result<&Session, Error> {
        self.session.as_ref().ok_or(Error::Unauthorized)
    }

    /// Apply lifecycle events the client emitted during the last call.
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                SessionEvent::Unauthenticated => {
                    if let Some(session) = self.session.take() {
                        tracing::info!(username = %session.username, "Session ended by backend");
                    }
                    self.reset_views();
                }
            }
        }
    }

    fn reset_views(&mut self) {
        self.view = ViewState::Tasks;
        self.tasks.clear();
        self.files.clear();
        self.logs = LogPage::default();
        self.log_page = 1;
    }
}

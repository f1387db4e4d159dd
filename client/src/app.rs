//! Wiring: one storage, one session, one API client per process.

use std::sync::Arc;
use std::time::Duration;

use shared::types::AppConfig;
use tracing::info;

use crate::admin::UserDirectory;
use crate::auth::Auth;
use crate::gateway::{ApiClient, HyperTransport, Transport};
use crate::menu::{DrinkReviews, Menu};
use crate::news::{CommentThread, NewsFeed};
use crate::profile::Profile;
use crate::reputation::Reputation;
use crate::schedule::Schedule;
use crate::session::{Session, StorageKeys};
use crate::storage::{FileStorage, Storage};

pub struct App {
    api: ApiClient,
    primary_creator: String,
    undo_window: Duration,
}

impl App {
    /// Build everything from config and pick up any stored login.
    pub fn create(config: &AppConfig) -> Self {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(config.storage.path.clone()));
        let transport: Arc<dyn Transport> = Arc::new(HyperTransport::new(config.api.timeout()));
        Self::with_parts(config, storage, transport)
    }

    /// Same as [`App::create`] with the storage and transport supplied.
    pub fn with_parts(config: &AppConfig, storage: Arc<dyn Storage>, transport: Arc<dyn Transport>) -> Self {
        let session = Session::create(storage, StorageKeys::from(&config.storage));
        let signed_in = session.check_auth();

        let base_url = config.api.resolved_base_url();
        info!("Client ready for {} (signed in: {})", base_url, signed_in);

        Self {
            api: ApiClient::new(base_url, transport, session),
            primary_creator: config.admin.primary_creator.clone(),
            undo_window: config.admin.undo_window(),
        }
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn auth(&self) -> Auth {
        Auth::new(self.api.clone())
    }

    pub fn user_directory(&self) -> UserDirectory {
        UserDirectory::new(self.api.clone(), self.primary_creator.clone(), self.undo_window)
    }

    pub fn reputation(&self) -> Reputation {
        Reputation::new(self.api.clone())
    }

    pub fn profile(&self) -> Profile {
        Profile::new(self.api.clone())
    }

    pub fn menu(&self) -> Menu {
        Menu::new(self.api.clone())
    }

    pub fn reviews(&self, drink_id: i64) -> DrinkReviews {
        DrinkReviews::new(self.api.clone(), drink_id)
    }

    pub fn news(&self) -> NewsFeed {
        NewsFeed::new(self.api.clone())
    }

    pub fn comments(&self, post_id: i64) -> CommentThread {
        CommentThread::new(self.api.clone(), post_id)
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(self.api.clone())
    }

    pub fn dispose(&self) {
        self.session().dispose();
    }
}

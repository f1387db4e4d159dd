//! Client core for the coffee-shop site: session, access rules, the API
//! gateway, undoable admin edits and the per-page services built on them.

pub mod admin;
pub mod app;
pub mod auth;
pub mod confirm;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod menu;
pub mod news;
pub mod profile;
pub mod reputation;
pub mod schedule;
pub mod session;
pub mod storage;
pub mod view;

pub use app::App;
pub use error::{ApiError, ApiResult};
pub use session::{AuthState, Session, SessionSnapshot};

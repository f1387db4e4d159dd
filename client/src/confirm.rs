//! Explicit confirmation for irreversible deletes.

use std::future::Future;

use tracing::{debug, info};

use crate::error::ApiResult;

/// Asks the person at the keyboard a yes/no question.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Always says yes. For `--yes` on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// The user said no; no request was sent.
    Declined,
    Deleted,
}

/// Ask first, then send. A declined prompt sends nothing.
pub async fn delete_confirmed<C, F, Fut, R>(confirm: &C, prompt: &str, send: F) -> ApiResult<Deletion>
where
    C: Confirm + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<R>>,
{
    if !confirm.confirm(prompt) {
        debug!("Declined: {}", prompt);
        return Ok(Deletion::Declined);
    }

    send().await?;
    info!("Confirmed and deleted: {}", prompt);
    Ok(Deletion::Deleted)
}

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::collections::Collection;

/// Installs the fmt subscriber. `RUST_LOG` wins over the default `info` level. Calling it
/// twice is harmless, which keeps test binaries happy.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Patch,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::Patch => "patch",
        }
    }
}

/// One audit line per successful mutation.
pub fn audit(action: AuditAction, collection: Collection, id: &str) {
    info!(
        target: "movie_reporter::audit",
        action = action.as_str(),
        collection = %collection,
        id,
        "content mutated"
    );
}

/// Audit line for a mutation made on behalf of an authenticated caller.
pub fn audit_by(action: AuditAction, collection: Collection, id: &str, actor: &str) {
    info!(
        target: "movie_reporter::audit",
        action = action.as_str(),
        collection = %collection,
        id,
        actor,
        "content mutated"
    );
}

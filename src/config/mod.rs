pub mod paths;
pub mod profile;
pub mod settings;

pub use paths::AppPaths;
pub use profile::resolve_profile;
pub use settings::{BrowserSettings, OracleSettings, Settings, SyncSettings};

use tracing::debug;

use crate::error::AppResult;

/// Profile file, then the shared `.env`, then the process environment (which wins).
pub fn load_settings(paths: &AppPaths, profile: &str) -> AppResult<Settings> {
    let env_file = paths.env_file();
    if env_file.exists() {
        match dotenvy::from_path(&env_file) {
            Ok(()) => debug!(path = %env_file.display(), "loaded env file"),
            Err(err) => debug!(path = %env_file.display(), error = %err, "ignoring env file"),
        }
    }

    let mut settings = settings::load(paths.settings_file(profile))?;
    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

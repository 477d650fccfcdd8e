//! Application state for the SQL panel service.

use common::config::AppConfig;
#[cfg(feature = "database")]
use common::errors::{AppError, AppResult};

use crate::availability::RecordingMode;
#[cfg(feature = "database")]
use crate::availability::recording_enabled;
#[cfg(feature = "database")]
use crate::db::Database;
use crate::signer::QuerySigner;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub signer: QuerySigner,
    /// Registered database extension, if any.
    #[cfg(feature = "database")]
    pub database: Option<Database>,
}

impl AppState {
    /// Creates a new application state with no database extension registered.
    pub fn new(config: AppConfig) -> Self {
        Self {
            signer: QuerySigner::new(&config.secret_key),
            config,
            #[cfg(feature = "database")]
            database: None,
        }
    }

    /// Registers the database extension.
    ///
    /// Whether it records queries is fixed here from the configuration and
    /// the extension's recording mode.
    #[cfg(feature = "database")]
    pub fn with_database(mut self, database: Database) -> Self {
        let recording = recording_enabled(&self.config, Some(database.mode()));
        tracing::info!(
            db_type = %database.db_type(),
            mode = ?database.mode(),
            recording,
            "database extension registered"
        );
        self.database = Some(database.with_recording(recording));
        self
    }

    /// The registered database extension.
    #[cfg(feature = "database")]
    pub fn database(&self) -> AppResult<&Database> {
        self.database.as_ref().ok_or(AppError::ExtensionNotRegistered)
    }

    /// Whether a database extension is registered.
    pub fn extension_used(&self) -> bool {
        #[cfg(feature = "database")]
        {
            self.database.is_some()
        }
        #[cfg(not(feature = "database"))]
        {
            false
        }
    }

    /// Recording mode of the registered extension.
    pub fn recording_mode(&self) -> Option<RecordingMode> {
        #[cfg(feature = "database")]
        {
            self.database.as_ref().map(Database::mode)
        }
        #[cfg(not(feature = "database"))]
        {
            None
        }
    }
}

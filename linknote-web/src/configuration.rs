use linknote::errors::StoreError;
use linknote::{Storage, StorageSettings};
use std::time::Duration;

#[derive(serde::Deserialize, Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    #[serde(default)]
    pub storage: StorageSettings,
    /// Seconds between two reminder sweeps.
    pub reminderinterval: u64,
}

impl Settings {
    pub async fn get_storage(&self) -> Result<Storage, StoreError> {
        Storage::initialize(&self.storage).await
    }

    pub fn reminder_interval(&self) -> Duration {
        Duration::from_secs(self.reminderinterval)
    }
}

lazy_static! {
    pub static ref CONFIGURATION: Settings =
        get_configuration().expect("Failed to read configuration.yml.");
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("debug", false)?
        .set_default("host", "localhost")?
        .set_default("port", 8000)?
        .set_default("reminderinterval", 60)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::default()
                .prefix("linknote")
                .separator("_"),
        )
        .build()?;
    config.try_deserialize()
}

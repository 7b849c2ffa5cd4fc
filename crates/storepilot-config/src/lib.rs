pub mod loader;
pub mod model;

pub use loader::ConfigLoader;
pub use model::{
    AppConfig, AssistantConfig, DEFAULT_ASSISTANT_BASE_URL, GatewayConfig, MISSING_CREDENTIALS_NOTICE,
    PollingConfig, StorageConfig, StoreConfig,
};

//! Shared constants and defaults.

/// Generic definition that marks a message as a failed delivery
pub const DEFAULT_REDELIVERY_WRAPPER: &str = "Failed";

/// Shared-store key under which a unit of work keeps its service scope
pub const DEFAULT_SCOPE_ITEM_KEY: &str = "dispatch-core:service-scope";

/// Name of the generic "handles this type" interface, used for display only
pub const HANDLER_INTERFACE_NAME: &str = "HandleMessages";

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "DISPATCH";

pub mod environments {
    pub const DEVELOPMENT: &str = "development";
    pub const TEST: &str = "test";
    pub const PRODUCTION: &str = "production";
}

//! Shared constants and invariants

pub const DEFAULT_API_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CONFIG_PATH: &str = "leave-client.yaml";

// Local store location under $HOME when `auth.store_path` is unset
pub const DEFAULT_STORE_DIR: &str = ".leave-client";
pub const DEFAULT_STORE_FILE: &str = "store.json";

// Local store keys
pub const DEFAULT_CREDENTIAL_KEY: &str = "jwt";
pub const ALLOW_ANNUAL_KEY: &str = "allow-annual";
pub const ALLOW_SICK_KEY: &str = "allow-sick";
pub const ALLOW_CASUAL_KEY: &str = "allow-casual";

// Page address parameters that may carry a credential, in lookup order
pub const URL_TOKEN_PARAMS: [&str; 3] = ["token", "jwt", "access_token"];

// Environment overrides, resolved once at startup
pub const ENV_API_BASE: &str = "API_BASE";
pub const ENV_API_TIMEOUT_MS: &str = "API_TIMEOUT_MS";
pub const ENV_DEBUG_API: &str = "DEBUG_API";
pub const ENV_STATIC_TOKEN: &str = "STATIC_TOKEN";
pub const ENV_PAGE_URL: &str = "PAGE_URL";

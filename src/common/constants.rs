// Documents
pub const ID_FIELD: &str = "_id";
pub const FIELD_PATH_PREFIX: char = '$';
pub const PATH_SEPARATOR: char = '.';

// Settings
pub const DEFAULT_DATABASE: &str = "test";
pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const DEFAULT_HISTORY_SIZE: usize = 1000;
pub const CONFIG_FILE: &str = "rustydoc.toml";
pub const CONFIG_FILE_ENV: &str = "RUSTYDOC_CONFIG";
pub const ENV_PREFIX: &str = "RUSTYDOC";

// Shell
pub const PROMPT: &str = "> ";

mod dirs;
mod settings;
mod validation;

pub use dirs::Directories;
pub use settings::ClientConfig;
pub use validation::warn_unknown_fields;

pub mod content_option;
pub mod provider;
pub mod settings;

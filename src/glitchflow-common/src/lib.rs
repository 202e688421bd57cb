mod message;
pub mod fs;
pub mod layout;

// used by the `message` macros
pub use colored::Colorize;

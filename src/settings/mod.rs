//! Layered settings: a TOML file, then `SESSIONGATE__SECTION__KEY`
//! environment overrides.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;

pub mod config;
pub mod core;
pub mod domain;
pub mod frame;
pub mod io;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

#[cfg(feature = "s3")]
pub use config::s3::{S3Storage, S3Target};

pub use core::{etl::EtlEngine, pipeline::HandsOnPipeline};
pub use frame::{DataFrame, Session};
pub use utils::error::{EtlError, Result};

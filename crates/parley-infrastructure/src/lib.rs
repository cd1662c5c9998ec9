//! Infrastructure for Parley: filesystem paths, configuration, the local
//! operation gateway, the TOML model catalog and logging setup.

pub mod config_service;
pub mod local_gateway;
pub mod logging;
pub mod paths;
pub mod toml_model_catalog;

#[cfg(test)]
mod test_import_workflow;

pub use config_service::ConfigService;
pub use local_gateway::LocalGateway;
pub use logging::{LoggingOptions, init_tracing};
pub use paths::ParleyPaths;
pub use toml_model_catalog::TomlModelCatalog;

//! openapi-from-rails - Command-line tool for auditing Rails HTTP endpoints.
//!
//! This binary statically discovers the HTTP endpoints of a Rails-style
//! application, determines whether each is protected by an authentication
//! filter, and emits an OpenAPI 3.0 description plus a console summary of
//! unprotected ("shadow") endpoints.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-rails [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! openapi-from-rails ./my-rails-app -o openapi.yaml
//! ```
//!
//! Generate JSON and include env-conditional routes:
//! ```bash
//! openapi-from-rails ./my-rails-app -f json --include-conditional
//! ```

mod ast;
mod cli;
mod controller_analyzer;
mod detector;
mod error;
mod inflector;
mod model;
mod openapi_builder;
mod parser;
mod reporter;
mod resolver;
mod route_evaluator;
mod serializer;
mod vfs;

use anyhow::Result;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    // Parse first so the verbose flag can drive logger initialization
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-rails starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("API discovery completed successfully");

    Ok(())
}

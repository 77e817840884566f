//! openapi-from-rails - Static endpoint discovery for Rails codebases.
//!
//! This library discovers the HTTP endpoints of a Rails-style application by
//! static analysis (no target code is ever executed) and resolves whether
//! each endpoint is protected by an authentication filter. The result feeds
//! an OpenAPI 3.0 document and a console audit summary, so security teams
//! can find undocumented or unprotected ("shadow") endpoints.
//!
//! # Architecture
//!
//! The analysis is a pipeline over an in-memory view of the repository:
//!
//! 1. [`vfs`] - Read-only virtual filesystem over the project tree
//! 2. [`detector`] - Recognizes the Rails manifest and version
//! 3. [`parser`] - Tolerant mini-parser for the Ruby subset the DSL needs
//! 4. [`route_evaluator`] - Evaluates the routing DSL into endpoint records
//! 5. [`controller_analyzer`] - Indexes controllers, composes filter chains,
//!    extracts strong-parameter schemas
//! 6. [`resolver`] - Joins routes with controller analysis into resolved
//!    endpoints with an auth status
//! 7. [`openapi_builder`] - Constructs the OpenAPI document
//! 8. [`serializer`] - Serializes the document to YAML or JSON
//! 9. [`reporter`] - Renders the console summary table
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_rails::controller_analyzer::ControllerAnalyzer;
//! use openapi_from_rails::openapi_builder::{BuildOptions, OpenApiBuilder};
//! use openapi_from_rails::resolver::EndpointResolver;
//! use openapi_from_rails::route_evaluator::RouteEvaluator;
//! use openapi_from_rails::serializer::serialize_yaml;
//! use openapi_from_rails::vfs::DiskFs;
//! use std::path::PathBuf;
//!
//! // Scan the project tree
//! let vfs = DiskFs::scan(PathBuf::from("./my-rails-app")).unwrap();
//!
//! // Evaluate routes and analyze controllers
//! let eval = RouteEvaluator::evaluate(&vfs);
//! let analyzer = ControllerAnalyzer::analyze(&vfs);
//! let resolution = EndpointResolver::resolve(eval.endpoints, &analyzer);
//!
//! // Build and serialize the OpenAPI document
//! let mut builder = OpenApiBuilder::new(BuildOptions::default());
//! for endpoint in &resolution.endpoints {
//!     builder.add_endpoint(endpoint);
//! }
//! let yaml = serialize_yaml(&builder.build()).unwrap();
//! println!("{}", yaml);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides the
//! complete application.

pub mod ast;
pub mod cli;
pub mod controller_analyzer;
pub mod detector;
pub mod error;
pub mod inflector;
pub mod model;
pub mod openapi_builder;
pub mod parser;
pub mod reporter;
pub mod resolver;
pub mod route_evaluator;
pub mod serializer;
pub mod vfs;

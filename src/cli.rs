use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Discover API endpoints and shadow APIs in a Rails codebase by static analysis
#[derive(Parser, Debug)]
#[command(name = "openapi-from-rails")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Rails project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Show all endpoints in the console table, not only unprotected/unknown
    #[arg(long = "show-all")]
    pub show_all: bool,

    /// Include routes declared inside environment conditionals
    #[arg(long = "include-conditional")]
    pub include_conditional: bool,

    /// Drop mounted-engine endpoints from the document
    #[arg(long = "exclude-engines")]
    pub exclude_engines: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }
    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    use crate::controller_analyzer::ControllerAnalyzer;
    use crate::detector::FrameworkDetector;
    use crate::error::Error;
    use crate::model::{Diagnostic, Severity};
    use crate::openapi_builder::{BuildOptions, OpenApiBuilder};
    use crate::reporter::print_report;
    use crate::resolver::EndpointResolver;
    use crate::route_evaluator::RouteEvaluator;
    use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
    use crate::vfs::{DiskFs, VirtualFS};

    let log_diagnostics = |diagnostics: &[Diagnostic]| {
        for diag in diagnostics {
            let location = match (&diag.file, diag.line) {
                (Some(file), Some(line)) => format!(" [{}:{}]", file, line),
                (Some(file), None) => format!(" [{}]", file),
                _ => String::new(),
            };
            match diag.severity {
                Severity::Info => info!("{}{}", diag.message, location),
                _ => warn!("{}{}", diag.message, location),
            }
        }
    };

    info!("Starting API discovery...");

    // Step 1: Scan the project tree
    info!("Scanning project directory...");
    let vfs = DiskFs::scan(args.project_path.clone())?;
    info!("Found {} files", vfs.list("").len());

    // Step 2: Detect Rails (advisory)
    let detection = FrameworkDetector::detect(&vfs);
    if detection.is_rails {
        info!(
            "Rails detected: {}",
            detection.version.as_deref().unwrap_or("unknown version")
        );
    } else {
        warn!("Rails gem not found in Gemfile; proceeding on routes.rb alone");
    }

    // Step 3: Evaluate routes
    info!("Evaluating routes...");
    let eval = RouteEvaluator::evaluate(&vfs);
    log_diagnostics(&eval.diagnostics);
    if eval
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Fatal)
    {
        return Err(Error::RouteFileMissing {
            path: args.project_path.join("config/routes.rb"),
        }
        .into());
    }
    info!("Discovered {} endpoint records", eval.endpoints.len());

    // Step 4: Analyze controllers
    info!("Analyzing controllers...");
    let analyzer = ControllerAnalyzer::analyze(&vfs);
    log_diagnostics(&analyzer.diagnostics);

    // Step 5: Resolve endpoints against controller analysis
    let resolution = EndpointResolver::resolve(eval.endpoints, &analyzer);
    log_diagnostics(&resolution.diagnostics);

    let authenticated = resolution
        .endpoints
        .iter()
        .filter(|e| e.auth_status == crate::model::AuthStatus::Authenticated)
        .count();
    let unprotected = resolution
        .endpoints
        .iter()
        .filter(|e| e.auth_status == crate::model::AuthStatus::Unprotected)
        .count();
    info!(
        "Auth analysis: {} authenticated, {} unprotected",
        authenticated, unprotected
    );

    // Step 6: Build the OpenAPI document
    info!("Building OpenAPI document...");
    let project_name = args
        .project_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "rails-app".to_string());
    let mut builder = OpenApiBuilder::new(BuildOptions {
        include_conditional: args.include_conditional,
        exclude_engines: args.exclude_engines,
    })
    .with_info(
        project_name,
        "1.0.0".to_string(),
        Some("API documentation discovered by static route analysis".to_string()),
    );
    for endpoint in &resolution.endpoints {
        builder.add_endpoint(endpoint);
    }
    let document = builder.build();

    // Step 7: Serialize to the requested format
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document)?,
    };

    // Step 8: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!("OpenAPI document written to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    // Step 9: Console report (stderr, so stdout stays machine-readable)
    print_report(&resolution.endpoints, args.show_all);

    Ok(())
}

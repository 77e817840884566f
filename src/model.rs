//! Core data model shared by the route evaluator, controller analyzer, and
//! endpoint resolver.
//!
//! Everything here is a plain value type: records are write-once, contexts
//! are cloned as evaluation descends into nested DSL blocks, and failures
//! travel as [`Diagnostic`] values rather than errors.

use serde::Serialize;

/// HTTP verbs recognized by the route evaluator.
///
/// `Any` is reserved for mounted engines, which claim a whole URL prefix
/// rather than a single method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    /// Wildcard verb emitted only for engine mounts (`*`).
    Any,
}

impl HttpVerb {
    /// The seven standard verbs, in the order `via: :all` expands to.
    pub const ALL: [HttpVerb; 7] = [
        HttpVerb::Get,
        HttpVerb::Post,
        HttpVerb::Put,
        HttpVerb::Patch,
        HttpVerb::Delete,
        HttpVerb::Head,
        HttpVerb::Options,
    ];

    /// Parse a lowercase DSL verb name (`get`, `post`, ...).
    pub fn from_dsl(name: &str) -> Option<HttpVerb> {
        match name {
            "get" => Some(HttpVerb::Get),
            "post" => Some(HttpVerb::Post),
            "put" => Some(HttpVerb::Put),
            "patch" => Some(HttpVerb::Patch),
            "delete" => Some(HttpVerb::Delete),
            "head" => Some(HttpVerb::Head),
            "options" => Some(HttpVerb::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Any => "*",
        }
    }

    /// Lowercase name used as the OpenAPI path-item key.
    pub fn as_openapi_key(&self) -> Option<&'static str> {
        match self {
            HttpVerb::Get => Some("get"),
            HttpVerb::Post => Some("post"),
            HttpVerb::Put => Some("put"),
            HttpVerb::Patch => Some("patch"),
            HttpVerb::Delete => Some("delete"),
            HttpVerb::Head => Some("head"),
            HttpVerb::Options => Some("options"),
            HttpVerb::Any => None,
        }
    }
}

/// Where an endpoint declaration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Path relative to the repository root (e.g. `config/routes.rb`).
    pub file: String,
    /// 1-based line number.
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// Flags attached to an endpoint during evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointFlags {
    /// Declared inside a branch whose condition is not statically true.
    pub conditional: bool,
    /// Declared inside an iteration whose iterable cannot be resolved.
    pub dynamic: bool,
    /// The endpoint is a mounted engine prefix, not a single handler.
    pub engine_mount: bool,
    /// Declared inside a `constraints(...)` block.
    pub constraint_present: bool,
    /// The controller class could not be located on disk.
    pub unknown_controller: bool,
}

impl EndpointFlags {
    pub fn is_empty(&self) -> bool {
        !(self.conditional
            || self.dynamic
            || self.engine_mount
            || self.constraint_present
            || self.unknown_controller)
    }

    /// Flag names in a fixed order, for the `x-flags` extension.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.conditional {
            names.push("conditional");
        }
        if self.dynamic {
            names.push("dynamic");
        }
        if self.engine_mount {
            names.push("engine_mount");
        }
        if self.constraint_present {
            names.push("constraint_present");
        }
        if self.unknown_controller {
            names.push("unknown_controller");
        }
        names
    }

    /// Set union, used when duplicate (verb, path) records collapse.
    pub fn union(&self, other: &EndpointFlags) -> EndpointFlags {
        EndpointFlags {
            conditional: self.conditional || other.conditional,
            dynamic: self.dynamic || other.dynamic,
            engine_mount: self.engine_mount || other.engine_mount,
            constraint_present: self.constraint_present || other.constraint_present,
            unknown_controller: self.unknown_controller || other.unknown_controller,
        }
    }
}

/// A single endpoint discovered by the route evaluator.
///
/// The path keeps Rails-style `:name` placeholders; conversion to OpenAPI
/// `{name}` form happens only in the document builder.
#[derive(Debug, Clone)]
pub struct EndpointRecord {
    pub verb: HttpVerb,
    pub path: String,
    /// Canonical controller class name (e.g. `Api::V1::UsersController`).
    /// For engine mounts this is the stringified mount target.
    pub controller_class: String,
    pub action: String,
    pub source: SourceLocation,
    pub flags: EndpointFlags,
    /// Keyword options preserved verbatim from the declaration.
    pub raw_options: Vec<(String, String)>,
}

impl EndpointRecord {
    pub fn new(
        verb: HttpVerb,
        path: impl Into<String>,
        controller_class: impl Into<String>,
        action: impl Into<String>,
        source: SourceLocation,
    ) -> Self {
        Self {
            verb,
            path: path.into(),
            controller_class: controller_class.into(),
            action: action.into(),
            source,
            flags: EndpointFlags::default(),
            raw_options: Vec::new(),
        }
    }
}

/// Scope of a verb call nested inside a `resources` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberScope {
    /// `member do ... end`: routes act on one record (`/:id/<action>`).
    Member,
    /// `collection do ... end`: routes act on the whole set (`/<action>`).
    Collection,
}

/// The resource a context is nested under, when inside `resources`/`resource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScope {
    /// Resource name as given in the DSL (snake_case).
    pub name: String,
    /// Path parameter name, `id` unless overridden by `param:`.
    pub param: String,
    /// Singular resources never take a path parameter.
    pub singular: bool,
}

/// Accumulated lexical state at a point in the routing DSL.
///
/// Contexts are immutable: each nested block derives a new value, so state
/// unwinds automatically when evaluation leaves the block.
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    /// Normalized URL prefix; empty at the root, never trailing-slashed.
    pub path_prefix: String,
    /// Module segments (snake_case) that qualify controller class names.
    pub module_prefix: Vec<String>,
    /// Controller binding from `scope(controller:)` / `with_options(controller:)`.
    pub controller_override: Option<String>,
    /// Inside an `if` branch whose condition is not statically true.
    pub conditional: bool,
    /// Inside a `.each`-style iteration that cannot be resolved statically.
    pub dynamic: bool,
    /// Inside a `constraints(...)` block.
    pub constrained: bool,
    /// Innermost enclosing resource, if any.
    pub resource: Option<ResourceScope>,
    /// Inside a `member`/`collection` block of the enclosing resource.
    pub member_scope: Option<MemberScope>,
    /// Simple keyword defaults accumulated from `with_options`.
    pub default_options: Vec<(String, String)>,
}

impl RouteContext {
    /// Look up a default from the innermost `with_options` bag.
    pub fn default_option(&self, key: &str) -> Option<&str> {
        self.default_options
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A `before_action` / `skip_before_action` declaration.
///
/// `only` and `except` are mutually exclusive; when a declaration carries
/// both, the analyzer keeps `only` and records a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDecl {
    pub filter_name: String,
    pub only: Option<Vec<String>>,
    pub except: Option<Vec<String>>,
}

impl FilterDecl {
    pub fn new(filter_name: impl Into<String>) -> Self {
        Self {
            filter_name: filter_name.into(),
            only: None,
            except: None,
        }
    }

    /// Whether this declaration applies to the given action.
    pub fn applies_to(&self, action: &str) -> bool {
        if let Some(only) = &self.only {
            return only.iter().any(|a| a == action);
        }
        if let Some(except) = &self.except {
            return !except.iter().any(|a| a == action);
        }
        true
    }
}

/// Request-body field set extracted from a `*_params` method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSchema {
    /// The `params.require(:KEY)` root, when present.
    pub root_key: Option<String>,
    /// `(field_name, type_hint)` pairs; hints are `string`, `integer`, or
    /// `boolean` per the naming heuristics.
    pub fields: Vec<(String, String)>,
}

/// Everything the analyzer learned about one controller class.
#[derive(Debug, Clone, Default)]
pub struct ControllerSummary {
    pub class_name: String,
    pub parent_class: Option<String>,
    pub before_actions: Vec<FilterDecl>,
    pub skip_before_actions: Vec<FilterDecl>,
    /// `*_params` method name → extracted schema, in declaration order.
    pub param_methods: Vec<(String, RequestSchema)>,
    pub file: String,
    pub line: usize,
}

/// Authentication state resolved for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Authenticated,
    Unprotected,
    Unknown,
}

impl AuthStatus {
    /// Display form used in the `x-auth-status` extension; unprotected
    /// endpoints are shouted so they stand out in diffs and review.
    pub fn as_extension_str(&self) -> &'static str {
        match self {
            AuthStatus::Authenticated => "authenticated",
            AuthStatus::Unprotected => "UNPROTECTED",
            AuthStatus::Unknown => "unknown",
        }
    }
}

/// Final output of the pipeline: an endpoint joined with its controller
/// analysis.
#[derive(Debug, Clone)]
pub struct ResolvedEndpoint {
    pub record: EndpointRecord,
    pub auth_status: AuthStatus,
    /// Filter names that apply to this action after inheritance and skips.
    pub effective_filters: Vec<String>,
    pub request_schema: Option<RequestSchema>,
}

/// Diagnostic severity. `Fatal` is reserved for a missing route root file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Fatal => "fatal",
        }
    }
}

/// A non-fatal (or, once, fatal) condition encountered during analysis.
///
/// The core never throws across its boundary; everything that goes wrong
/// becomes one of these.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            file: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            file: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            file: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: usize) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

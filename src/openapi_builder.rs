//! OpenAPI 3.0 document model and builder.
//!
//! Builds the document from resolved endpoints, carrying the audit metadata
//! (`x-controller`, `x-auth-status`, ...) that security tooling consumes.
//! `paths` is an insertion-ordered map so the document follows routing order
//! and output is stable across runs.

use crate::controller_analyzer::type_hint;
use crate::model::ResolvedEndpoint;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// OpenAPI document builder
pub struct OpenApiBuilder {
    info: Info,
    paths: IndexMap<String, PathItem>,
    options: BuildOptions,
}

/// Output gating options.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Include endpoints declared inside env-conditional branches.
    pub include_conditional: bool,
    /// Drop engine-mount path items entirely.
    pub exclude_engines: bool,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - all operations for a single path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// Mount target of an engine claiming this prefix; such paths carry no
    /// operations because their routes are opaque.
    #[serde(rename = "x-mounted-engine", skip_serializing_if = "Option::is_none")]
    pub x_mounted_engine: Option<String>,
}

/// OpenAPI Operation object, extended with audit metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, Response>,
    #[serde(rename = "x-controller", skip_serializing_if = "Option::is_none")]
    pub x_controller: Option<String>,
    #[serde(rename = "x-action", skip_serializing_if = "Option::is_none")]
    pub x_action: Option<String>,
    #[serde(rename = "x-auth-status")]
    pub x_auth_status: String,
    #[serde(rename = "x-auth-filters", skip_serializing_if = "Option::is_none")]
    pub x_auth_filters: Option<Vec<String>>,
    #[serde(rename = "x-source")]
    pub x_source: String,
    #[serde(rename = "x-flags", skip_serializing_if = "Option::is_none")]
    pub x_flags: Option<Vec<String>>,
    #[serde(rename = "x-conditional", skip_serializing_if = "Option::is_none")]
    pub x_conditional: Option<bool>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: Schema,
}

/// OpenAPI Schema object (the subset the analyzer produces)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
}

impl Schema {
    fn primitive(schema_type: &str) -> Schema {
        Schema {
            schema_type: schema_type.to_string(),
            properties: None,
        }
    }
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    pub paths: IndexMap<String, PathItem>,
}

impl OpenApiBuilder {
    /// Create a builder with default info.
    pub fn new(options: BuildOptions) -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info {
                title: "Discovered API".to_string(),
                version: "1.0.0".to_string(),
                description: Some(
                    "API documentation discovered by static route analysis".to_string(),
                ),
            },
            paths: IndexMap::new(),
            options,
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    /// Add one resolved endpoint, honoring the gating options.
    pub fn add_endpoint(&mut self, ep: &ResolvedEndpoint) {
        let record = &ep.record;

        if record.flags.conditional && !self.options.include_conditional {
            debug!(
                "skipping conditional endpoint {} {}",
                record.verb.as_str(),
                record.path
            );
            return;
        }

        let openapi_path = convert_path_format(&record.path);

        if record.flags.engine_mount {
            if self.options.exclude_engines {
                return;
            }
            let item = self.paths.entry(openapi_path).or_default();
            item.x_mounted_engine = Some(record.controller_class.clone());
            return;
        }

        let verb_key = match record.verb.as_openapi_key() {
            Some(key) => key,
            None => return,
        };

        let parameters = path_parameters(&record.path);
        let request_body = ep.request_body();

        let auth_filters: Vec<String> = ep
            .effective_filters
            .iter()
            .filter(|f| crate::controller_analyzer::is_auth_filter(f))
            .cloned()
            .collect();
        let flags = record.flags.names();

        let mut responses = IndexMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful response".to_string(),
            },
        );

        let operation = Operation {
            summary: Some(format!("{} {}", record.verb.as_str(), record.path)),
            operation_id: operation_id(&record.path, &record.action),
            tags: vec![tag_for(&record.path)],
            parameters: if parameters.is_empty() {
                None
            } else {
                Some(parameters)
            },
            request_body,
            responses,
            x_controller: non_empty(&record.controller_class),
            x_action: non_empty(&record.action),
            x_auth_status: ep.auth_status.as_extension_str().to_string(),
            x_auth_filters: if auth_filters.is_empty() {
                None
            } else {
                Some(auth_filters)
            },
            x_source: format!("{}:{}", record.source.file, record.source.line),
            x_flags: if flags.is_empty() {
                None
            } else {
                Some(flags.iter().map(|f| f.to_string()).collect())
            },
            x_conditional: if record.flags.conditional {
                Some(true)
            } else {
                None
            },
        };

        let item = self.paths.entry(openapi_path).or_default();
        match verb_key {
            "get" => item.get = Some(operation),
            "post" => item.post = Some(operation),
            "put" => item.put = Some(operation),
            "patch" => item.patch = Some(operation),
            "delete" => item.delete = Some(operation),
            "head" => item.head = Some(operation),
            _ => item.options = Some(operation),
        }
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> OpenApiDocument {
        debug!("Building final OpenAPI document");
        OpenApiDocument {
            openapi: "3.0.3".to_string(),
            info: self.info,
            paths: self.paths,
        }
    }
}

impl ResolvedEndpoint {
    fn request_body(&self) -> Option<RequestBody> {
        let schema = self.request_schema.as_ref()?;
        let mut properties = IndexMap::new();
        for (name, hint) in &schema.fields {
            properties.insert(name.clone(), Schema::primitive(hint));
        }
        let mut content = IndexMap::new();
        content.insert(
            "application/json".to_string(),
            MediaType {
                schema: Schema {
                    schema_type: "object".to_string(),
                    properties: Some(properties),
                },
            },
        );
        Some(RequestBody {
            required: true,
            content,
        })
    }
}

/// Convert Rails `:param` segments to OpenAPI `{param}` form.
fn convert_path_format(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{}}}", name)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Required path parameters, typed by the field-name heuristics.
fn path_parameters(path: &str) -> Vec<Parameter> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .map(|name| Parameter {
            name: name.to_string(),
            location: "path".to_string(),
            required: true,
            schema: Schema::primitive(type_hint(name)),
        })
        .collect()
}

/// `operationId` slug: lowercased `path_action` with non-alphanumeric runs
/// collapsed to single underscores.
fn operation_id(path: &str, action: &str) -> String {
    let raw = format!("{}_{}", path, action);
    let mut slug = String::with_capacity(raw.len());
    let mut prev_underscore = false;
    for c in raw.to_ascii_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_underscore = false;
        } else if !prev_underscore {
            slug.push('_');
            prev_underscore = true;
        }
    }
    slug.trim_matches('_').to_string()
}

/// Tag: the first two path segments joined by a slash.
fn tag_for(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with(':'))
        .take(2)
        .collect();
    if segments.is_empty() {
        "root".to_string()
    } else {
        segments.join("/")
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AuthStatus, EndpointRecord, HttpVerb, RequestSchema, ResolvedEndpoint, SourceLocation,
    };

    fn resolved(
        verb: HttpVerb,
        path: &str,
        controller: &str,
        action: &str,
        auth: AuthStatus,
    ) -> ResolvedEndpoint {
        ResolvedEndpoint {
            record: EndpointRecord::new(
                verb,
                path,
                controller,
                action,
                SourceLocation::new("config/routes.rb", 12),
            ),
            auth_status: auth,
            effective_filters: Vec::new(),
            request_schema: None,
        }
    }

    #[test]
    fn test_convert_path_format() {
        assert_eq!(
            convert_path_format("/users/:id/posts/:post_id"),
            "/users/{id}/posts/{post_id}"
        );
        assert_eq!(convert_path_format("/users"), "/users");
    }

    #[test]
    fn test_operation_id_slug() {
        assert_eq!(operation_id("/api/v1/users/:id", "show"), "api_v1_users_id_show");
        assert_eq!(operation_id("/", "root"), "root");
        assert_eq!(operation_id("/users", "index"), "users_index");
    }

    #[test]
    fn test_tag_first_two_segments() {
        assert_eq!(tag_for("/api/v1/users"), "api/v1");
        assert_eq!(tag_for("/users/:id"), "users");
        assert_eq!(tag_for("/"), "root");
    }

    #[test]
    fn test_add_simple_endpoint() {
        let mut builder = OpenApiBuilder::new(BuildOptions::default());
        let ep = resolved(
            HttpVerb::Get,
            "/users",
            "UsersController",
            "index",
            AuthStatus::Authenticated,
        );
        builder.add_endpoint(&ep);

        let doc = builder.build();
        assert_eq!(doc.openapi, "3.0.3");
        let item = &doc.paths["/users"];
        let op = item.get.as_ref().expect("get operation");
        assert_eq!(op.operation_id, "users_index");
        assert_eq!(op.x_auth_status, "authenticated");
        assert_eq!(op.x_controller.as_deref(), Some("UsersController"));
        assert_eq!(op.x_source, "config/routes.rb:12");
        assert!(op.responses.contains_key("200"));
    }

    #[test]
    fn test_unprotected_status_is_shouted() {
        let mut builder = OpenApiBuilder::new(BuildOptions::default());
        builder.add_endpoint(&resolved(
            HttpVerb::Post,
            "/webhooks/stripe",
            "WebhooksController",
            "stripe",
            AuthStatus::Unprotected,
        ));
        let doc = builder.build();
        let op = doc.paths["/webhooks/stripe"].post.as_ref().unwrap();
        assert_eq!(op.x_auth_status, "UNPROTECTED");
    }

    #[test]
    fn test_path_parameters_typed() {
        let mut builder = OpenApiBuilder::new(BuildOptions::default());
        builder.add_endpoint(&resolved(
            HttpVerb::Get,
            "/posts/:id",
            "PostsController",
            "show",
            AuthStatus::Unknown,
        ));
        let doc = builder.build();
        let op = doc.paths["/posts/{id}"].get.as_ref().unwrap();
        let params = op.parameters.as_ref().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "id");
        assert_eq!(params[0].location, "path");
        assert!(params[0].required);
        assert_eq!(params[0].schema.schema_type, "integer");
    }

    #[test]
    fn test_request_body_from_schema() {
        let mut builder = OpenApiBuilder::new(BuildOptions::default());
        let mut ep = resolved(
            HttpVerb::Post,
            "/posts",
            "PostsController",
            "create",
            AuthStatus::Authenticated,
        );
        ep.request_schema = Some(RequestSchema {
            root_key: Some("post".to_string()),
            fields: vec![
                ("title".to_string(), "string".to_string()),
                ("author_id".to_string(), "integer".to_string()),
            ],
        });
        builder.add_endpoint(&ep);

        let doc = builder.build();
        let op = doc.paths["/posts"].post.as_ref().unwrap();
        let body = op.request_body.as_ref().expect("request body");
        let media = &body.content["application/json"];
        assert_eq!(media.schema.schema_type, "object");
        let props = media.schema.properties.as_ref().unwrap();
        assert_eq!(props["title"].schema_type, "string");
        assert_eq!(props["author_id"].schema_type, "integer");
    }

    #[test]
    fn test_conditional_suppressed_by_default() {
        let mut builder = OpenApiBuilder::new(BuildOptions::default());
        let mut ep = resolved(
            HttpVerb::Get,
            "/debug",
            "DebugController",
            "index",
            AuthStatus::Unknown,
        );
        ep.record.flags.conditional = true;
        builder.add_endpoint(&ep);
        let doc = builder.build();
        assert!(doc.paths.is_empty());
    }

    #[test]
    fn test_conditional_included_when_opted_in() {
        let mut builder = OpenApiBuilder::new(BuildOptions {
            include_conditional: true,
            exclude_engines: false,
        });
        let mut ep = resolved(
            HttpVerb::Get,
            "/debug",
            "DebugController",
            "index",
            AuthStatus::Unknown,
        );
        ep.record.flags.conditional = true;
        builder.add_endpoint(&ep);
        let doc = builder.build();
        let op = doc.paths["/debug"].get.as_ref().unwrap();
        assert_eq!(op.x_conditional, Some(true));
        assert_eq!(
            op.x_flags.as_ref().unwrap(),
            &vec!["conditional".to_string()]
        );
    }

    #[test]
    fn test_engine_mount_path_item() {
        let mut builder = OpenApiBuilder::new(BuildOptions::default());
        let mut ep = resolved(
            HttpVerb::Any,
            "/sidekiq",
            "Sidekiq::Web",
            "(engine)",
            AuthStatus::Unknown,
        );
        ep.record.flags.engine_mount = true;
        builder.add_endpoint(&ep);
        let doc = builder.build();
        let item = &doc.paths["/sidekiq"];
        assert_eq!(item.x_mounted_engine.as_deref(), Some("Sidekiq::Web"));
        assert!(item.get.is_none());
    }

    #[test]
    fn test_engine_mount_excluded() {
        let mut builder = OpenApiBuilder::new(BuildOptions {
            include_conditional: false,
            exclude_engines: true,
        });
        let mut ep = resolved(
            HttpVerb::Any,
            "/sidekiq",
            "Sidekiq::Web",
            "(engine)",
            AuthStatus::Unknown,
        );
        ep.record.flags.engine_mount = true;
        builder.add_endpoint(&ep);
        let doc = builder.build();
        assert!(doc.paths.is_empty());
    }

    #[test]
    fn test_auth_filters_extension() {
        let mut builder = OpenApiBuilder::new(BuildOptions::default());
        let mut ep = resolved(
            HttpVerb::Get,
            "/users",
            "UsersController",
            "index",
            AuthStatus::Authenticated,
        );
        ep.effective_filters = vec!["set_locale".to_string(), "authenticate_user!".to_string()];
        builder.add_endpoint(&ep);
        let doc = builder.build();
        let op = doc.paths["/users"].get.as_ref().unwrap();
        assert_eq!(
            op.x_auth_filters.as_ref().unwrap(),
            &vec!["authenticate_user!".to_string()]
        );
    }

    #[test]
    fn test_multiple_verbs_share_path_item() {
        let mut builder = OpenApiBuilder::new(BuildOptions::default());
        builder.add_endpoint(&resolved(
            HttpVerb::Get,
            "/users",
            "UsersController",
            "index",
            AuthStatus::Authenticated,
        ));
        builder.add_endpoint(&resolved(
            HttpVerb::Post,
            "/users",
            "UsersController",
            "create",
            AuthStatus::Authenticated,
        ));
        let doc = builder.build();
        assert_eq!(doc.paths.len(), 1);
        let item = &doc.paths["/users"];
        assert!(item.get.is_some());
        assert!(item.post.is_some());
    }

    #[test]
    fn test_paths_preserve_routing_order() {
        let mut builder = OpenApiBuilder::new(BuildOptions::default());
        for path in ["/zebra", "/alpha", "/middle"] {
            builder.add_endpoint(&resolved(
                HttpVerb::Get,
                path,
                "XController",
                "index",
                AuthStatus::Unknown,
            ));
        }
        let doc = builder.build();
        let keys: Vec<&String> = doc.paths.keys().collect();
        assert_eq!(keys, vec!["/zebra", "/alpha", "/middle"]);
    }

    #[test]
    fn test_with_info() {
        let builder = OpenApiBuilder::new(BuildOptions::default()).with_info(
            "my-app".to_string(),
            "2.0.0".to_string(),
            None,
        );
        let doc = builder.build();
        assert_eq!(doc.info.title, "my-app");
        assert_eq!(doc.info.version, "2.0.0");
        assert!(doc.info.description.is_none());
    }
}

//! Endpoint resolver: joins route records with controller analysis.
//!
//! The final stage of the pipeline. Emission order matches routing order;
//! duplicate `(verb, path)` pairs collapse into the first-seen record with
//! their flags unioned and a diagnostic recorded.

use crate::controller_analyzer::{is_auth_filter, ControllerAnalyzer};
use crate::model::{
    AuthStatus, Diagnostic, EndpointRecord, HttpVerb, ResolvedEndpoint,
};
use log::debug;
use std::collections::HashMap;

/// Output of the resolution stage.
pub struct Resolution {
    pub endpoints: Vec<ResolvedEndpoint>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Joins endpoint records with controller summaries.
pub struct EndpointResolver;

impl EndpointResolver {
    pub fn resolve(records: Vec<EndpointRecord>, analyzer: &ControllerAnalyzer) -> Resolution {
        let mut endpoints: Vec<ResolvedEndpoint> = Vec::new();
        let mut seen: HashMap<(HttpVerb, String), usize> = HashMap::new();
        let mut diagnostics = Vec::new();

        for record in records {
            let key = (record.verb, record.path.clone());
            if let Some(&index) = seen.get(&key) {
                diagnostics.push(
                    Diagnostic::warn(format!(
                        "duplicate route {} {} collapsed (kept {}#{})",
                        record.verb.as_str(),
                        record.path,
                        endpoints[index].record.controller_class,
                        endpoints[index].record.action,
                    ))
                    .at(record.source.file.clone(), record.source.line),
                );
                let merged = endpoints[index].record.flags.union(&record.flags);
                endpoints[index].record.flags = merged;
                continue;
            }

            let resolved = Self::resolve_one(record, analyzer, &mut diagnostics);
            seen.insert(key, endpoints.len());
            endpoints.push(resolved);
        }

        debug!("resolved {} endpoints", endpoints.len());
        Resolution {
            endpoints,
            diagnostics,
        }
    }

    fn resolve_one(
        mut record: EndpointRecord,
        analyzer: &ControllerAnalyzer,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ResolvedEndpoint {
        // engine mounts are opaque: no controller to analyze
        if record.flags.engine_mount {
            return ResolvedEndpoint {
                record,
                auth_status: AuthStatus::Unknown,
                effective_filters: Vec::new(),
                request_schema: None,
            };
        }

        if record.controller_class.is_empty() || analyzer.get(&record.controller_class).is_none()
        {
            if record.controller_class.is_empty() {
                diagnostics.push(
                    Diagnostic::warn(format!(
                        "no controller resolvable for {} {}",
                        record.verb.as_str(),
                        record.path
                    ))
                    .at(record.source.file.clone(), record.source.line),
                );
            } else {
                diagnostics.push(
                    Diagnostic::warn(format!(
                        "controller {} not found under app/controllers",
                        record.controller_class
                    ))
                    .at(record.source.file.clone(), record.source.line),
                );
            }
            record.flags.unknown_controller = true;
            return ResolvedEndpoint {
                record,
                auth_status: AuthStatus::Unknown,
                effective_filters: Vec::new(),
                request_schema: None,
            };
        }

        let effective = analyzer.effective_filters(&record.controller_class, &record.action);
        let has_auth = effective.filters.iter().any(|f| is_auth_filter(f));
        let has_block = effective.filters.iter().any(|f| f == "(block)");

        let auth_status = if has_auth {
            AuthStatus::Authenticated
        } else if !effective.resolved_cleanly || has_block {
            // ancestry cut off or only opaque block filters: can't rule
            // authentication out
            AuthStatus::Unknown
        } else {
            AuthStatus::Unprotected
        };

        let request_schema = analyzer.request_schema(&record.controller_class, &record.action);

        ResolvedEndpoint {
            record,
            auth_status,
            effective_filters: effective.filters,
            request_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EndpointFlags, SourceLocation};
    use crate::vfs::MemoryFs;

    fn record(verb: HttpVerb, path: &str, controller: &str, action: &str) -> EndpointRecord {
        EndpointRecord::new(
            verb,
            path,
            controller,
            action,
            SourceLocation::new("config/routes.rb", 1),
        )
    }

    fn analyzer_for(files: &[(&str, &str)]) -> ControllerAnalyzer {
        let mut vfs = MemoryFs::new();
        for (path, content) in files {
            vfs = vfs.add(path, content);
        }
        ControllerAnalyzer::analyze(&vfs)
    }

    #[test]
    fn test_authenticated_endpoint() {
        let analyzer = analyzer_for(&[(
            "app/controllers/users_controller.rb",
            "class UsersController < ApplicationController\n  before_action :authenticate_api_user!\nend\n",
        )]);
        let resolution = EndpointResolver::resolve(
            vec![record(HttpVerb::Get, "/users", "UsersController", "index")],
            &analyzer,
        );
        let ep = &resolution.endpoints[0];
        assert_eq!(ep.auth_status, AuthStatus::Authenticated);
        assert_eq!(ep.effective_filters, vec!["authenticate_api_user!"]);
    }

    #[test]
    fn test_unprotected_endpoint() {
        let analyzer = analyzer_for(&[(
            "app/controllers/webhooks_controller.rb",
            "class WebhooksController < ActionController::Base\n  before_action :parse_payload\nend\n",
        )]);
        let resolution = EndpointResolver::resolve(
            vec![record(
                HttpVerb::Post,
                "/webhooks/stripe",
                "WebhooksController",
                "stripe",
            )],
            &analyzer,
        );
        let ep = &resolution.endpoints[0];
        assert_eq!(ep.auth_status, AuthStatus::Unprotected);
        assert_eq!(ep.effective_filters, vec!["parse_payload"]);
    }

    #[test]
    fn test_inherited_auth_skipped_per_action() {
        let analyzer = analyzer_for(&[
            (
                "app/controllers/application_controller.rb",
                "class ApplicationController < ActionController::Base\n  before_action :authenticate_user!\nend\n",
            ),
            (
                "app/controllers/posts_controller.rb",
                "class PostsController < ApplicationController\n  before_action :set_post, only: [:show]\n  skip_before_action :authenticate_user!, only: [:index, :show]\nend\n",
            ),
        ]);

        let resolution = EndpointResolver::resolve(
            vec![
                record(HttpVerb::Get, "/posts", "PostsController", "index"),
                record(HttpVerb::Get, "/posts/:id", "PostsController", "show"),
                record(HttpVerb::Patch, "/posts/:id", "PostsController", "update"),
            ],
            &analyzer,
        );

        assert_eq!(resolution.endpoints[0].auth_status, AuthStatus::Unprotected);
        assert_eq!(resolution.endpoints[1].auth_status, AuthStatus::Unprotected);
        assert_eq!(
            resolution.endpoints[1].effective_filters,
            vec!["set_post"]
        );
        assert_eq!(
            resolution.endpoints[2].auth_status,
            AuthStatus::Authenticated
        );
    }

    #[test]
    fn test_missing_controller_is_unknown() {
        let analyzer = analyzer_for(&[]);
        let resolution = EndpointResolver::resolve(
            vec![record(HttpVerb::Get, "/ghosts", "GhostsController", "index")],
            &analyzer,
        );
        let ep = &resolution.endpoints[0];
        assert_eq!(ep.auth_status, AuthStatus::Unknown);
        assert!(ep.record.flags.unknown_controller);
        assert!(!resolution.diagnostics.is_empty());
    }

    #[test]
    fn test_unresolved_ancestry_is_unknown() {
        let analyzer = analyzer_for(&[(
            "app/controllers/sso_controller.rb",
            "class SsoController < SomeGem::Base\nend\n",
        )]);
        let resolution = EndpointResolver::resolve(
            vec![record(HttpVerb::Get, "/sso", "SsoController", "new")],
            &analyzer,
        );
        assert_eq!(resolution.endpoints[0].auth_status, AuthStatus::Unknown);
    }

    #[test]
    fn test_metal_parent_is_unknown() {
        let analyzer = analyzer_for(&[(
            "app/controllers/stream_controller.rb",
            "class StreamController < ActionController::Metal\n  def show\n  end\nend\n",
        )]);
        let resolution = EndpointResolver::resolve(
            vec![record(HttpVerb::Get, "/stream", "StreamController", "show")],
            &analyzer,
        );
        assert_eq!(resolution.endpoints[0].auth_status, AuthStatus::Unknown);
    }

    #[test]
    fn test_block_filter_is_unknown() {
        let analyzer = analyzer_for(&[(
            "app/controllers/gate_controller.rb",
            "class GateController < ActionController::Base\n  before_action do\n    custom_gate\n  end\nend\n",
        )]);
        let resolution = EndpointResolver::resolve(
            vec![record(HttpVerb::Get, "/gate", "GateController", "show")],
            &analyzer,
        );
        assert_eq!(resolution.endpoints[0].auth_status, AuthStatus::Unknown);
    }

    #[test]
    fn test_engine_mount_untouched() {
        let analyzer = analyzer_for(&[]);
        let mut mount = record(HttpVerb::Any, "/sidekiq", "Sidekiq::Web", "(engine)");
        mount.flags.engine_mount = true;
        let resolution = EndpointResolver::resolve(vec![mount], &analyzer);
        let ep = &resolution.endpoints[0];
        assert_eq!(ep.auth_status, AuthStatus::Unknown);
        assert!(!ep.record.flags.unknown_controller);
        assert!(resolution.diagnostics.is_empty());
    }

    #[test]
    fn test_duplicate_routes_collapse_with_flag_union() {
        let analyzer = analyzer_for(&[]);
        let first = record(HttpVerb::Get, "/ping", "PingController", "show");
        let mut second = record(HttpVerb::Get, "/ping", "OtherController", "index");
        second.flags = EndpointFlags {
            conditional: true,
            ..Default::default()
        };

        let resolution = EndpointResolver::resolve(vec![first, second], &analyzer);
        assert_eq!(resolution.endpoints.len(), 1);
        let ep = &resolution.endpoints[0];
        // first-seen controller wins, flags union
        assert_eq!(ep.record.controller_class, "PingController");
        assert!(ep.record.flags.conditional);
        assert!(resolution
            .diagnostics
            .iter()
            .any(|d| d.message.contains("duplicate route")));
    }

    #[test]
    fn test_request_schema_joined_for_create() {
        let analyzer = analyzer_for(&[(
            "app/controllers/posts_controller.rb",
            "class PostsController < ApplicationController\n  def post_params\n    params.require(:post).permit(:title, :body)\n  end\nend\n",
        )]);
        let resolution = EndpointResolver::resolve(
            vec![
                record(HttpVerb::Post, "/posts", "PostsController", "create"),
                record(HttpVerb::Get, "/posts", "PostsController", "index"),
            ],
            &analyzer,
        );
        assert!(resolution.endpoints[0].request_schema.is_some());
        assert!(resolution.endpoints[1].request_schema.is_none());
    }

    #[test]
    fn test_order_preserved() {
        let analyzer = analyzer_for(&[]);
        let records = vec![
            record(HttpVerb::Get, "/b", "BController", "index"),
            record(HttpVerb::Get, "/a", "AController", "index"),
            record(HttpVerb::Post, "/b", "BController", "create"),
        ];
        let resolution = EndpointResolver::resolve(records, &analyzer);
        let paths: Vec<(&str, &str)> = resolution
            .endpoints
            .iter()
            .map(|e| (e.record.verb.as_str(), e.record.path.as_str()))
            .collect();
        assert_eq!(paths, vec![("GET", "/b"), ("GET", "/a"), ("POST", "/b")]);
    }
}

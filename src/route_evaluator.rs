//! Route evaluator: walks route-file ASTs and emits endpoint records.
//!
//! Evaluation starts at `config/routes.rb` inside the implicit
//! `Rails.application.routes.draw` block. Each recognized DSL form either
//! emits endpoints or recurses with a derived [`RouteContext`]; contexts are
//! values, so nesting state unwinds for free when a block ends.

use crate::ast::{CallNode, Node, NodeKind};
use crate::inflector::{camelize, singularize};
use crate::model::{
    Diagnostic, EndpointRecord, HttpVerb, MemberScope, ResourceScope, RouteContext,
    SourceLocation,
};
use crate::parser;
use crate::vfs::VirtualFS;
use log::debug;
use std::collections::HashMap;
use std::rc::Rc;

/// The seven standard resource actions, in emission order.
const RESOURCE_ACTIONS: [&str; 7] = ["index", "new", "create", "show", "edit", "update", "destroy"];

/// Actions of a singular `resource` (no `index`, no `:id` segment).
const SINGULAR_ACTIONS: [&str; 6] = ["show", "new", "create", "edit", "update", "destroy"];

/// Output of route evaluation.
pub struct EvalResult {
    pub endpoints: Vec<EndpointRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Evaluator for the routing DSL.
pub struct RouteEvaluator<'a> {
    vfs: &'a dyn VirtualFS,
    endpoints: Vec<EndpointRecord>,
    diagnostics: Vec<Diagnostic>,
    concerns: HashMap<String, Rc<Vec<Node>>>,
    current_file: String,
}

impl<'a> RouteEvaluator<'a> {
    /// Evaluate all route files reachable from `config/routes.rb`.
    ///
    /// A missing root file is the one fatal condition: the result carries an
    /// empty endpoint list and a fatal diagnostic.
    pub fn evaluate(vfs: &'a dyn VirtualFS) -> EvalResult {
        let mut evaluator = RouteEvaluator {
            vfs,
            endpoints: Vec::new(),
            diagnostics: Vec::new(),
            concerns: HashMap::new(),
            current_file: String::new(),
        };

        const ROOT: &str = "config/routes.rb";
        if !evaluator.eval_file(ROOT, &RouteContext::default()) {
            return EvalResult {
                endpoints: Vec::new(),
                diagnostics: vec![Diagnostic::fatal(format!(
                    "{} is missing or unreadable",
                    ROOT
                ))],
            };
        }

        EvalResult {
            endpoints: evaluator.endpoints,
            diagnostics: evaluator.diagnostics,
        }
    }

    /// Parse and evaluate one route file. Returns false if it cannot be read.
    fn eval_file(&mut self, path: &str, ctx: &RouteContext) -> bool {
        let source = match self.vfs.read(path) {
            Some(source) => source,
            None => return false,
        };
        debug!("evaluating route file {}", path);

        let (parsed, mut parse_diags) = parser::parse_source(path, &source);
        self.diagnostics.append(&mut parse_diags);

        let saved = std::mem::replace(&mut self.current_file, path.to_string());
        self.eval_nodes(&parsed.nodes, ctx);
        self.current_file = saved;
        true
    }

    fn eval_nodes(&mut self, nodes: &[Node], ctx: &RouteContext) {
        for node in nodes {
            self.eval_node(node, ctx);
        }
    }

    fn eval_node(&mut self, node: &Node, ctx: &RouteContext) {
        match &node.kind {
            NodeKind::Call(call) => self.eval_call(call, node.line, ctx),
            NodeKind::IfExpr {
                cond,
                then_body,
                else_body,
            } => {
                if cond.is_literal_true() {
                    self.eval_nodes(then_body, ctx);
                } else {
                    let mut branch_ctx = ctx.clone();
                    branch_ctx.conditional = true;
                    self.eval_nodes(then_body, &branch_ctx);
                    self.eval_nodes(else_body, &branch_ctx);
                }
            }
            NodeKind::Unknown(raw) => {
                self.warn_at(node.line, format!("unparsed route line: {}", raw));
            }
            // assignments and stray definitions carry no routes
            _ => {}
        }
    }

    fn eval_call(&mut self, call: &CallNode, line: usize, ctx: &RouteContext) {
        if let Some(verb) = HttpVerb::from_dsl(&call.method) {
            self.handle_verb(verb, call, line, ctx);
            return;
        }
        match call.method.as_str() {
            "draw" => self.handle_draw(call, line, ctx),
            "match" => self.handle_match(call, line, ctx),
            "root" => self.handle_root(call, line, ctx),
            "resources" => self.handle_resources(call, line, ctx, false),
            "resource" => self.handle_resources(call, line, ctx, true),
            "namespace" => self.handle_namespace(call, line, ctx),
            "scope" => self.handle_scope(call, ctx),
            "member" => self.handle_member_scope(call, ctx, MemberScope::Member),
            "collection" => self.handle_member_scope(call, ctx, MemberScope::Collection),
            "concern" => self.handle_concern_def(call, line),
            "concerns" => self.handle_concerns_use(call, line, ctx),
            "mount" => self.handle_mount(call, line, ctx),
            "with_options" => self.handle_with_options(call, ctx),
            "constraints" => self.handle_constraints(call, ctx),
            "defaults" => self.walk_block(call, ctx),
            "direct" | "resolve" => {} // route helpers, no endpoints
            "each" if call.block.is_some() => self.handle_each(call, ctx),
            other => {
                self.warn_at(line, format!("unrecognized route DSL call: {}", other));
                // walk the block anyway so wrapped declarations stay visible
                self.walk_block(call, ctx);
            }
        }
    }

    // ---- DSL handlers ----

    /// `draw do ... end` (the root block) or `draw :fragment`.
    fn handle_draw(&mut self, call: &CallNode, line: usize, ctx: &RouteContext) {
        if let Some(block) = &call.block {
            self.eval_nodes(&block.body, ctx);
            return;
        }
        let name = match call.first_arg().and_then(Node::as_name) {
            Some(name) => name.to_string(),
            None => return,
        };
        let candidates = [
            format!("config/routes/{}.rb", name),
            format!("config/routes/{}.routes.rb", name),
        ];
        for candidate in &candidates {
            if self.vfs.exists(candidate) {
                self.eval_file(candidate, ctx);
                return;
            }
        }
        self.warn_at(
            line,
            format!("draw(:{}) referenced but no route fragment found", name),
        );
    }

    /// `get '/path', to: 'c#a'` and the other six verb forms.
    fn handle_verb(&mut self, verb: HttpVerb, call: &CallNode, line: usize, ctx: &RouteContext) {
        let name = match call.first_arg().and_then(Node::as_name) {
            Some(name) => name.to_string(),
            None => {
                self.warn_at(line, format!("{} call without a path", verb.as_str()));
                return;
            }
        };

        let (controller, action) = self.resolve_target(&name, call, ctx);
        let path = self.build_verb_path(&name, call, ctx);
        let mut record = EndpointRecord::new(
            verb,
            path,
            canonical_controller(&controller),
            action,
            SourceLocation::new(self.current_file.clone(), line),
        );
        self.finish_record(&mut record, call, ctx);
        self.endpoints.push(record);
    }

    /// `match '/path', via: [:get, :post]`. No `via:` behaves as `via: :all`.
    fn handle_match(&mut self, call: &CallNode, line: usize, ctx: &RouteContext) {
        let name = match call.first_arg().and_then(Node::as_name) {
            Some(name) => name.to_string(),
            None => return,
        };

        let verbs: Vec<HttpVerb> = match call.kwarg("via") {
            Some(via) => {
                let names = via.as_name_list();
                if names.iter().any(|v| v == "all") {
                    HttpVerb::ALL.to_vec()
                } else {
                    names
                        .iter()
                        .filter_map(|v| HttpVerb::from_dsl(v))
                        .collect()
                }
            }
            None => HttpVerb::ALL.to_vec(),
        };

        let (controller, action) = self.resolve_target(&name, call, ctx);
        let path = self.build_verb_path(&name, call, ctx);

        for verb in verbs {
            let mut record = EndpointRecord::new(
                verb,
                path.clone(),
                canonical_controller(&controller),
                action.clone(),
                SourceLocation::new(self.current_file.clone(), line),
            );
            self.finish_record(&mut record, call, ctx);
            self.endpoints.push(record);
        }
    }

    /// `root 'c#a'` or `root to: 'c#a'`.
    fn handle_root(&mut self, call: &CallNode, line: usize, ctx: &RouteContext) {
        let target = call
            .kwarg("to")
            .and_then(Node::as_name)
            .or_else(|| call.first_arg().and_then(Node::as_name));

        let (controller, action) = match target.and_then(|t| t.split_once('#')) {
            Some((ctrl, action)) => (
                self.resolve_controller(ctx, ctrl),
                action.to_string(),
            ),
            None => (String::new(), "root".to_string()),
        };

        let path = if ctx.path_prefix.is_empty() {
            "/".to_string()
        } else {
            ctx.path_prefix.clone()
        };
        let mut record = EndpointRecord::new(
            HttpVerb::Get,
            path,
            canonical_controller(&controller),
            action,
            SourceLocation::new(self.current_file.clone(), line),
        );
        self.finish_record(&mut record, call, ctx);
        self.endpoints.push(record);
    }

    /// `resources :name` / `resource :name` with options and nested block.
    fn handle_resources(
        &mut self,
        call: &CallNode,
        line: usize,
        ctx: &RouteContext,
        singular: bool,
    ) {
        let name = match call.first_arg().and_then(Node::as_name) {
            Some(name) => name.to_string(),
            None => {
                self.warn_at(line, "resources call without a name".to_string());
                return;
            }
        };

        let path_name = call
            .kwarg("path")
            .and_then(Node::as_name)
            .unwrap_or(&name)
            .to_string();
        let controller_name = call
            .kwarg("controller")
            .and_then(Node::as_name)
            .unwrap_or(&name)
            .to_string();
        let param = call
            .kwarg("param")
            .and_then(Node::as_name)
            .or_else(|| ctx.default_option("param"))
            .unwrap_or("id")
            .to_string();

        let actions = self.filter_actions(call, line, singular);

        // nested resources insert the parent's member segment
        let base_prefix = match (&ctx.resource, singular) {
            (Some(parent), false) if !parent.singular => {
                let parent_id = format!("{}_{}", singularize(&parent.name), parent.param);
                join_path(&ctx.path_prefix, &format!(":{}", parent_id))
            }
            _ => ctx.path_prefix.clone(),
        };

        let mut child = ctx.clone();
        child.path_prefix = join_path(&base_prefix, &path_name);
        child.controller_override = Some(self.resolve_controller(ctx, &controller_name));
        child.resource = Some(ResourceScope {
            name: name.clone(),
            param: param.clone(),
            singular,
        });
        child.member_scope = None;

        for action in &actions {
            self.emit_resource_action(action, call, line, &child, singular);
        }

        if let Some(concerns) = call.kwarg("concerns") {
            for concern_name in concerns.as_name_list() {
                self.replay_concern(&concern_name, line, &child);
            }
        }

        if let Some(block) = &call.block {
            self.eval_nodes(&block.body, &child);
        }
    }

    fn emit_resource_action(
        &mut self,
        action: &str,
        call: &CallNode,
        line: usize,
        ctx: &RouteContext,
        singular: bool,
    ) {
        let resource = match &ctx.resource {
            Some(resource) => resource,
            None => return,
        };
        let member_base = if singular {
            ctx.path_prefix.clone()
        } else {
            join_path(&ctx.path_prefix, &format!(":{}", resource.param))
        };

        let (verb, path) = match action {
            "index" => (HttpVerb::Get, ctx.path_prefix.clone()),
            "new" => (HttpVerb::Get, join_path(&ctx.path_prefix, "new")),
            "create" => (HttpVerb::Post, ctx.path_prefix.clone()),
            "show" => (HttpVerb::Get, member_base),
            "edit" => (HttpVerb::Get, join_path(&member_base, "edit")),
            "update" => (HttpVerb::Patch, member_base),
            "destroy" => (HttpVerb::Delete, member_base),
            _ => return,
        };

        let controller = ctx.controller_override.clone().unwrap_or_default();
        let mut record = EndpointRecord::new(
            verb,
            path,
            canonical_controller(&controller),
            action,
            SourceLocation::new(self.current_file.clone(), line),
        );
        self.finish_record(&mut record, call, ctx);
        self.endpoints.push(record);
    }

    /// Resolve `only:`/`except:` into the action list, honoring the
    /// `only:`-wins tie-break when both are present.
    fn filter_actions(&mut self, call: &CallNode, line: usize, singular: bool) -> Vec<String> {
        let all: &[&str] = if singular {
            &SINGULAR_ACTIONS
        } else {
            &RESOURCE_ACTIONS
        };
        let only = call.kwarg("only").map(Node::as_name_list);
        let except = call.kwarg("except").map(Node::as_name_list);

        if only.is_some() && except.is_some() {
            self.warn_at(
                line,
                "both only: and except: given; honoring only: and dropping except:".to_string(),
            );
        }

        if let Some(only) = only {
            return all
                .iter()
                .filter(|a| only.iter().any(|o| o == *a))
                .map(|a| a.to_string())
                .collect();
        }
        if let Some(except) = except {
            return all
                .iter()
                .filter(|a| !except.iter().any(|e| e == *a))
                .map(|a| a.to_string())
                .collect();
        }
        all.iter().map(|a| a.to_string()).collect()
    }

    /// `namespace :name`: extends both the URL and the controller module.
    fn handle_namespace(&mut self, call: &CallNode, line: usize, ctx: &RouteContext) {
        let name = match call.first_arg().and_then(Node::as_name) {
            Some(name) => name.to_string(),
            None => {
                self.warn_at(line, "namespace call without a name".to_string());
                return;
            }
        };
        let path_part = call
            .kwarg("path")
            .and_then(Node::as_name)
            .unwrap_or(&name)
            .to_string();
        let module_part = call
            .kwarg("module")
            .and_then(Node::as_name)
            .unwrap_or(&name)
            .to_string();

        let mut child = ctx.clone();
        child.path_prefix = join_path(&ctx.path_prefix, &path_part);
        child.module_prefix.push(module_part);
        child.controller_override = None;

        if let Some(block) = &call.block {
            self.eval_nodes(&block.body, &child);
        }
    }

    /// `scope` is selective: `path:`, `module:`, `controller:`, or a bare
    /// positional treated as `path:`.
    fn handle_scope(&mut self, call: &CallNode, ctx: &RouteContext) {
        let mut child = ctx.clone();

        if let Some(name) = call.first_arg().and_then(Node::as_name) {
            child.path_prefix = join_path(&ctx.path_prefix, name);
        }
        if let Some(path) = call.kwarg("path").and_then(Node::as_name) {
            child.path_prefix = join_path(&ctx.path_prefix, path);
        }
        if let Some(module) = call.kwarg("module").and_then(Node::as_name) {
            child.module_prefix.push(module.to_string());
        }
        if let Some(controller) = call.kwarg("controller").and_then(Node::as_name) {
            child.controller_override = Some(self.resolve_controller(&child, controller));
        }

        if let Some(block) = &call.block {
            self.eval_nodes(&block.body, &child);
        }
    }

    fn handle_member_scope(&mut self, call: &CallNode, ctx: &RouteContext, scope: MemberScope) {
        let mut child = ctx.clone();
        child.member_scope = Some(scope);
        if let Some(block) = &call.block {
            self.eval_nodes(&block.body, &child);
        }
    }

    /// `concern :name do ... end` stores the block body for later replay.
    fn handle_concern_def(&mut self, call: &CallNode, line: usize) {
        let name = match call.first_arg().and_then(Node::as_name) {
            Some(name) => name.to_string(),
            None => return,
        };
        match &call.block {
            Some(block) => {
                self.concerns.insert(name, Rc::new(block.body.clone()));
            }
            None => self.warn_at(line, format!("concern :{} defined without a block", name)),
        }
    }

    /// Standalone `concerns :name` / `concerns [:a, :b]` inside a block.
    fn handle_concerns_use(&mut self, call: &CallNode, line: usize, ctx: &RouteContext) {
        for arg in &call.args {
            for name in arg.as_name_list() {
                self.replay_concern(&name, line, ctx);
            }
        }
    }

    fn replay_concern(&mut self, name: &str, line: usize, ctx: &RouteContext) {
        match self.concerns.get(name).cloned() {
            Some(body) => self.eval_nodes(&body, ctx),
            None => self.warn_at(
                line,
                format!("concern :{} referenced but never defined", name),
            ),
        }
    }

    /// `mount Engine => '/path'` / `mount Engine, at: '/path'`.
    fn handle_mount(&mut self, call: &CallNode, line: usize, ctx: &RouteContext) {
        let mut engine = call.first_arg().map(Node::to_source);
        let mut mount_path = call.kwarg("at").and_then(Node::as_name).map(str::to_string);

        // rocket form: the engine is the key of the first non-`at` pair
        if engine.is_none() || mount_path.is_none() {
            for (key, value) in &call.kwargs {
                if key == "at" {
                    continue;
                }
                if engine.is_none() {
                    engine = Some(key.clone());
                }
                if mount_path.is_none() {
                    mount_path = value.as_name().map(str::to_string);
                }
                break;
            }
        }

        let mount_path = match mount_path {
            Some(path) => path,
            None => {
                self.warn_at(line, "mount call without a path".to_string());
                return;
            }
        };
        let engine = engine.unwrap_or_else(|| "(unknown engine)".to_string());

        let mut record = EndpointRecord::new(
            HttpVerb::Any,
            join_path(&ctx.path_prefix, &mount_path),
            engine,
            "(engine)",
            SourceLocation::new(self.current_file.clone(), line),
        );
        record.flags.engine_mount = true;
        self.finish_record(&mut record, call, ctx);
        self.endpoints.push(record);
    }

    /// `with_options KW do ... end` pushes context defaults for contained calls.
    fn handle_with_options(&mut self, call: &CallNode, ctx: &RouteContext) {
        let mut child = ctx.clone();
        for (key, value) in &call.kwargs {
            let text = value
                .as_name()
                .map(str::to_string)
                .unwrap_or_else(|| value.to_source());
            match key.as_str() {
                "controller" => {
                    child.controller_override = Some(self.resolve_controller(&child, &text));
                }
                "path" => child.path_prefix = join_path(&ctx.path_prefix, &text),
                "module" => child.module_prefix.push(text.clone()),
                _ => {}
            }
            child.default_options.push((key.clone(), text));
        }
        if let Some(block) = &call.block {
            self.eval_nodes(&block.body, &child);
        }
    }

    /// `constraints(...) do ... end` contents are flagged, not filtered.
    fn handle_constraints(&mut self, call: &CallNode, ctx: &RouteContext) {
        let mut child = ctx.clone();
        child.constrained = true;
        if let Some(block) = &call.block {
            self.eval_nodes(&block.body, &child);
        }
    }

    /// `X.each do |…| ... end`: body evaluated once, endpoints flagged.
    fn handle_each(&mut self, call: &CallNode, ctx: &RouteContext) {
        let mut child = ctx.clone();
        child.dynamic = true;
        if let Some(block) = &call.block {
            self.eval_nodes(&block.body, &child);
        }
    }

    fn walk_block(&mut self, call: &CallNode, ctx: &RouteContext) {
        if let Some(block) = &call.block {
            self.eval_nodes(&block.body, ctx);
        }
    }

    // ---- target and path resolution ----

    /// Resolve the `(controller, action)` pair of a verb/match call.
    fn resolve_target(&self, name: &str, call: &CallNode, ctx: &RouteContext) -> (String, String) {
        // `to: 'controller#action'`
        if let Some(target) = call.kwarg("to").and_then(Node::as_name) {
            if let Some((ctrl, action)) = target.split_once('#') {
                return (self.resolve_controller(ctx, ctrl), action.to_string());
            }
            // `to:` with a bare action name
            let controller = self.context_controller(ctx);
            return (controller, target.to_string());
        }

        // `controller: 'x', action: 'y'`
        let mut controller = call
            .kwarg("controller")
            .and_then(Node::as_name)
            .map(|c| self.resolve_controller(ctx, c));
        let mut action = call
            .kwarg("action")
            .and_then(Node::as_name)
            .map(str::to_string);

        // `get 'dashboard#show'`: target embedded in the path position
        if action.is_none() {
            if let Some((ctrl, act)) = name.split_once('#') {
                return (self.resolve_controller(ctx, ctrl), act.to_string());
            }
        }

        if controller.is_none() {
            controller = Some(self.context_controller(ctx));
        }
        if action.is_none() {
            // infer from the last non-parameter path segment
            let stem = name
                .trim_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or("")
                .to_string();
            action = Some(if stem.starts_with(':') {
                String::new()
            } else {
                stem
            });
        }

        (controller.unwrap_or_default(), action.unwrap_or_default())
    }

    /// The controller implied by context alone: an explicit override, or a
    /// `with_options controller:` default.
    fn context_controller(&self, ctx: &RouteContext) -> String {
        if let Some(controller) = &ctx.controller_override {
            return controller.clone();
        }
        if let Some(controller) = ctx.default_option("controller") {
            return self.resolve_controller(ctx, controller);
        }
        String::new()
    }

    /// Qualify a controller name with the module prefix. A name that already
    /// contains `/` is taken as fully qualified.
    fn resolve_controller(&self, ctx: &RouteContext, name: &str) -> String {
        if name.is_empty() {
            return ctx.module_prefix.join("/");
        }
        if name.contains('/') {
            return name.to_string();
        }
        if ctx.module_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", ctx.module_prefix.join("/"), name)
        }
    }

    /// Build the URL for a verb call, honoring `member`/`collection` scope
    /// and the `on:` shorthand.
    fn build_verb_path(&self, name: &str, call: &CallNode, ctx: &RouteContext) -> String {
        if name.contains('#') {
            // target-in-path form has no URL of its own; use the prefix
            return if ctx.path_prefix.is_empty() {
                "/".to_string()
            } else {
                ctx.path_prefix.clone()
            };
        }

        let on = call.kwarg("on").and_then(Node::as_name);
        let member = matches!(ctx.member_scope, Some(MemberScope::Member)) || on == Some("member");
        let collection = matches!(ctx.member_scope, Some(MemberScope::Collection))
            || on == Some("collection");

        let base = match &ctx.resource {
            Some(resource) if member && !resource.singular => {
                join_path(&ctx.path_prefix, &format!(":{}", resource.param))
            }
            Some(_) if member || collection => ctx.path_prefix.clone(),
            _ => ctx.path_prefix.clone(),
        };
        join_path(&base, name)
    }

    /// Apply context flags and preserve raw keyword options on a record.
    fn finish_record(&mut self, record: &mut EndpointRecord, call: &CallNode, ctx: &RouteContext) {
        record.flags.conditional = ctx.conditional;
        record.flags.dynamic = ctx.dynamic;
        record.flags.constraint_present =
            record.flags.constraint_present || ctx.constrained || call.kwarg("constraints").is_some();
        record.raw_options = call
            .kwargs
            .iter()
            .map(|(k, v)| (k.clone(), v.to_source()))
            .collect();
    }

    fn warn_at(&mut self, line: usize, message: String) {
        self.diagnostics
            .push(Diagnostic::warn(message).at(self.current_file.clone(), line));
    }
}

/// Canonical controller class name: `api/v1/users` → `Api::V1::UsersController`.
fn canonical_controller(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    // engine mounts arrive already in constant form
    if path.contains("::") || path.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        return path.to_string();
    }
    format!("{}Controller", camelize(path))
}

/// Join URL segments: leading `/` guaranteed, no doubled or trailing slashes
/// (except for the root itself).
fn join_path(prefix: &str, suffix: &str) -> String {
    let suffix = suffix.trim_start_matches('/');
    if suffix.is_empty() {
        return if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        };
    }
    let joined = if prefix.is_empty() {
        format!("/{}", suffix)
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), suffix)
    };
    // collapse any doubled slashes from odd inputs
    let mut out = String::with_capacity(joined.len());
    let mut prev_slash = false;
    for c in joined.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

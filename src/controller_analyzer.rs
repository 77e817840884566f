//! Controller analyzer: indexes controller classes, composes inherited
//! filter chains, and extracts strong-parameter schemas.
//!
//! The analyzer walks `app/controllers/**` once, indexing every
//! `class X < Y` by its fully-qualified name (module nesting included).
//! Queries then compose the effective filter set for a `(class, action)`
//! pair across the ancestor chain, and look up `*_params` request schemas.

use crate::ast::{CallNode, Node, NodeKind};
use crate::inflector::{singularize, underscore};
use crate::model::{ControllerSummary, Diagnostic, FilterDecl, RequestSchema};
use crate::parser;
use crate::vfs::VirtualFS;
use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Inheritance walk bound. Chasing deeper ancestry than this buys nothing:
/// real Rails apps bottom out in ApplicationController within a hop or two,
/// and unresolved chains past this point are treated as unknown.
const MAX_ANCESTRY_HOPS: usize = 3;

/// Superclasses that terminate the walk cleanly: the framework bases whose
/// filters we cannot see but which add none of the app's own. Anything else
/// that cannot be resolved on disk leaves the chain unresolved.
const FRAMEWORK_BASES: [&str; 2] = ["ActionController::Base", "ActionController::API"];

/// Filter names that always count as authentication.
const AUTH_EXACT: [&str; 7] = [
    "authenticate_user!",
    "authorize!",
    "require_login",
    "doorkeeper_authorize!",
    "authenticate!",
    "login_required",
    "require_user",
];

fn auth_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)auth|login|session|token|verify|signed[_ ]in").expect("auth pattern")
    })
}

fn integer_hint_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"_id$|_count$|^(id|age|quantity|size|limit|offset)$").expect("integer hint")
    })
}

fn boolean_hint_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(is_|has_|published|active|enabled)").expect("boolean hint"))
}

/// Whether a filter name looks like an authentication filter.
pub fn is_auth_filter(name: &str) -> bool {
    AUTH_EXACT.contains(&name) || auth_pattern().is_match(name)
}

/// Type hint for a request-body field, from its name.
pub fn type_hint(field: &str) -> &'static str {
    if integer_hint_pattern().is_match(field) {
        "integer"
    } else if boolean_hint_pattern().is_match(field) || field.ends_with('?') {
        "boolean"
    } else {
        "string"
    }
}

/// The effective filter set for one `(class, action)` pair.
#[derive(Debug, Clone)]
pub struct EffectiveFilters {
    /// Applicable filter names after inheritance composition and skips.
    pub filters: Vec<String>,
    /// False when the ancestor chain hit an unresolved class or the hop cap.
    pub resolved_cleanly: bool,
}

/// Index of analyzed controllers, keyed by fully-qualified class name.
pub struct ControllerAnalyzer {
    controllers: HashMap<String, ControllerSummary>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ControllerAnalyzer {
    /// Walk `app/controllers/**` and index every class found.
    pub fn analyze(vfs: &dyn VirtualFS) -> ControllerAnalyzer {
        let mut analyzer = ControllerAnalyzer {
            controllers: HashMap::new(),
            diagnostics: Vec::new(),
        };

        for path in vfs.list("app/controllers/") {
            if !path.ends_with(".rb") {
                continue;
            }
            let source = match vfs.read(&path) {
                Some(source) => source,
                None => {
                    analyzer
                        .diagnostics
                        .push(Diagnostic::warn(format!("cannot read {}", path)));
                    continue;
                }
            };
            let (parsed, mut parse_diags) = parser::parse_source(&path, &source);
            analyzer.diagnostics.append(&mut parse_diags);
            analyzer.index_nodes(&parsed.nodes, &mut Vec::new(), &path);
        }

        debug!("indexed {} controller classes", analyzer.controllers.len());
        analyzer
    }

    pub fn get(&self, class_name: &str) -> Option<&ControllerSummary> {
        self.controllers.get(class_name)
    }

    /// Compose the effective filter set for an action, walking up to
    /// [`MAX_ANCESTRY_HOPS`] ancestors. Starting from the chain root:
    /// applied filters accumulate, then each class's matching skips remove.
    pub fn effective_filters(&self, class_name: &str, action: &str) -> EffectiveFilters {
        let (chain, resolved_cleanly) = self.ancestor_chain(class_name);

        let mut applied: Vec<String> = Vec::new();
        for summary in chain.iter().rev() {
            for decl in &summary.before_actions {
                if decl.applies_to(action) && !applied.contains(&decl.filter_name) {
                    applied.push(decl.filter_name.clone());
                }
            }
            for skip in &summary.skip_before_actions {
                if skip.applies_to(action) {
                    applied.retain(|name| *name != skip.filter_name);
                }
            }
        }

        EffectiveFilters {
            filters: applied,
            resolved_cleanly,
        }
    }

    /// Best-matching request schema for an action.
    ///
    /// Preference order: an action-named method (`create_params`), then the
    /// resource-named method (`post_params` on `PostsController`) for
    /// `create`/`update`, then the only method when exactly one exists.
    pub fn request_schema(&self, class_name: &str, action: &str) -> Option<RequestSchema> {
        let summary = self.controllers.get(class_name)?;
        if summary.param_methods.is_empty() {
            return None;
        }

        let action_method = format!("{}_params", action);
        if let Some((_, schema)) = summary
            .param_methods
            .iter()
            .find(|(name, _)| *name == action_method)
        {
            return Some(schema.clone());
        }

        if action != "create" && action != "update" {
            return None;
        }

        let resource_method = format!("{}_params", resource_stem(class_name));
        if let Some((_, schema)) = summary
            .param_methods
            .iter()
            .find(|(name, _)| *name == resource_method)
        {
            return Some(schema.clone());
        }

        if summary.param_methods.len() == 1 {
            return Some(summary.param_methods[0].1.clone());
        }
        None
    }

    // ---- indexing ----

    fn index_nodes(&mut self, nodes: &[Node], module_stack: &mut Vec<String>, file: &str) {
        for node in nodes {
            match &node.kind {
                NodeKind::ModuleDef { name, body } => {
                    module_stack.push(name.clone());
                    self.index_nodes(body, module_stack, file);
                    module_stack.pop();
                }
                NodeKind::ClassDef { name, parent, body } => {
                    let full_name = if module_stack.is_empty() {
                        name.clone()
                    } else {
                        format!("{}::{}", module_stack.join("::"), name)
                    };
                    let summary = self.build_summary(&full_name, parent, body, file, node.line);
                    self.controllers.insert(full_name.clone(), summary);

                    // nested classes keep their lexical qualification
                    module_stack.push(name.clone());
                    self.index_nodes(
                        &body
                            .iter()
                            .filter(|n| matches!(n.kind, NodeKind::ClassDef { .. } | NodeKind::ModuleDef { .. }))
                            .cloned()
                            .collect::<Vec<_>>(),
                        module_stack,
                        file,
                    );
                    module_stack.pop();
                }
                _ => {}
            }
        }
    }

    fn build_summary(
        &mut self,
        class_name: &str,
        parent: &Option<String>,
        body: &[Node],
        file: &str,
        line: usize,
    ) -> ControllerSummary {
        let mut summary = ControllerSummary {
            class_name: class_name.to_string(),
            parent_class: parent.clone(),
            file: file.to_string(),
            line,
            ..Default::default()
        };

        for node in body {
            match &node.kind {
                NodeKind::Call(call) => match call.method.as_str() {
                    "before_action" | "before_filter" => {
                        let decls = self.filter_decls(call, file, node.line);
                        summary.before_actions.extend(decls);
                    }
                    "skip_before_action" | "skip_before_filter" => {
                        let decls = self.filter_decls(call, file, node.line);
                        summary.skip_before_actions.extend(decls);
                    }
                    _ => {}
                },
                NodeKind::MethodDef { name, body } if name.ends_with("_params") => {
                    if let Some(schema) = extract_request_schema(body) {
                        summary.param_methods.push((name.clone(), schema));
                    }
                }
                _ => {}
            }
        }

        summary
    }

    /// Build FilterDecls from a `before_action`-style call. One declaration
    /// per positional filter symbol; a block argument yields `"(block)"`.
    fn filter_decls(&mut self, call: &CallNode, file: &str, line: usize) -> Vec<FilterDecl> {
        let only = call.kwarg("only").map(Node::as_name_list);
        let mut except = call.kwarg("except").map(Node::as_name_list);

        // only/except are mutually exclusive; only wins
        if only.is_some() && except.is_some() {
            self.diagnostics.push(
                Diagnostic::warn(
                    "filter declares both only: and except:; dropping except:".to_string(),
                )
                .at(file, line),
            );
            except = None;
        }

        let mut names: Vec<String> = call
            .args
            .iter()
            .filter_map(|arg| arg.as_name().map(str::to_string))
            .collect();
        if names.is_empty() && call.block.is_some() {
            names.push("(block)".to_string());
        }

        // all filters named on one call share the same predicates
        names
            .into_iter()
            .map(|filter_name| FilterDecl {
                filter_name,
                only: only.clone(),
                except: except.clone(),
            })
            .collect()
    }

    /// Chain from the class itself up through resolvable ancestors.
    /// Returns the summaries (leaf first) and whether the walk terminated
    /// cleanly (framework base, parentless class, or missing
    /// ApplicationController) rather than at an unresolved class or the cap.
    fn ancestor_chain(&self, class_name: &str) -> (Vec<&ControllerSummary>, bool) {
        let mut chain = Vec::new();
        let mut current = match self.controllers.get(class_name) {
            Some(summary) => summary,
            None => return (chain, false),
        };
        chain.push(current);

        for _ in 0..MAX_ANCESTRY_HOPS {
            let parent_name = match &current.parent_class {
                Some(parent) => parent.clone(),
                None => return (chain, true),
            };
            if FRAMEWORK_BASES.contains(&parent_name.as_str()) {
                return (chain, true);
            }
            match self.resolve_parent(&parent_name, &current.class_name) {
                Some(parent) => {
                    chain.push(parent);
                    current = parent;
                }
                None => {
                    // an absent ApplicationController is a clean boundary;
                    // any other missing parent leaves the chain unresolved
                    let clean = parent_name == "ApplicationController";
                    return (chain, clean);
                }
            }
        }

        // hop cap reached with ancestry remaining
        let exhausted = matches!(
            &current.parent_class,
            Some(p) if !FRAMEWORK_BASES.contains(&p.as_str())
        );
        (chain, !exhausted)
    }

    /// Resolve a parent class name relative to the child's module.
    fn resolve_parent(&self, parent: &str, child: &str) -> Option<&ControllerSummary> {
        if let Some(summary) = self.controllers.get(parent) {
            return Some(summary);
        }
        // simple name: try the child's enclosing module first
        if !parent.contains("::") {
            if let Some((module, _)) = child.rsplit_once("::") {
                let qualified = format!("{}::{}", module, parent);
                if let Some(summary) = self.controllers.get(&qualified) {
                    return Some(summary);
                }
            }
        }
        None
    }
}

/// Resource stem of a controller class: `Api::V1::PostsController` → `post`.
fn resource_stem(class_name: &str) -> String {
    let path = underscore(class_name);
    let stem = path
        .rsplit('/')
        .next()
        .unwrap_or(&path)
        .trim_end_matches("_controller");
    singularize(stem)
}

/// Search a method body for `params.require(:KEY).permit(...)` (or a bare
/// `params.permit(...)`) and build a schema from the permitted fields.
fn extract_request_schema(body: &[Node]) -> Option<RequestSchema> {
    for node in body {
        if let Some(schema) = find_permit(node) {
            return Some(schema);
        }
    }
    None
}

fn find_permit(node: &Node) -> Option<RequestSchema> {
    match &node.kind {
        NodeKind::Call(call) => {
            if call.method == "permit" {
                if let Some(schema) = permit_schema(call) {
                    return Some(schema);
                }
            }
            if let Some(receiver) = &call.receiver {
                if let Some(schema) = find_permit(receiver) {
                    return Some(schema);
                }
            }
            for arg in &call.args {
                if let Some(schema) = find_permit(arg) {
                    return Some(schema);
                }
            }
            None
        }
        NodeKind::Assign { value, .. } => find_permit(value),
        NodeKind::IfExpr {
            then_body,
            else_body,
            ..
        } => then_body
            .iter()
            .chain(else_body.iter())
            .find_map(find_permit),
        NodeKind::MethodDef { body, .. } => body.iter().find_map(find_permit),
        _ => None,
    }
}

/// Build a schema from a `.permit(...)` call whose receiver chain starts at
/// `params` (optionally through `.require(:key)` / `.fetch(:key, ...)`).
fn permit_schema(permit: &CallNode) -> Option<RequestSchema> {
    let receiver = permit.receiver.as_ref()?;
    let root_key = match &receiver.kind {
        NodeKind::Ident(name) if name == "params" => None,
        NodeKind::Call(inner)
            if (inner.method == "require" || inner.method == "fetch")
                && matches!(
                    inner.receiver.as_deref().map(|r| &r.kind),
                    Some(NodeKind::Ident(name)) if name == "params"
                ) =>
        {
            inner.first_arg().and_then(Node::as_name).map(str::to_string)
        }
        _ => return None,
    };

    let mut fields = Vec::new();
    for arg in &permit.args {
        match &arg.kind {
            NodeKind::Symbol(name) | NodeKind::StringLit(name) => {
                push_field(&mut fields, name);
            }
            NodeKind::ArrayLit(items) => {
                for item in items {
                    if let Some(name) = item.as_name() {
                        push_field(&mut fields, name);
                    }
                }
            }
            _ => {}
        }
    }
    // hash leaves: `tags: []` list fields and `author: [:name]` nested permits
    for (key, _) in &permit.kwargs {
        push_field(&mut fields, key);
    }

    Some(RequestSchema { root_key, fields })
}

fn push_field(fields: &mut Vec<(String, String)>, name: &str) {
    if fields.iter().any(|(existing, _)| existing == name) {
        return;
    }
    fields.push((name.to_string(), type_hint(name).to_string()));
}

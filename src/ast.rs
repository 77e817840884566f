//! Lightweight AST for the Ruby subset the analyzer understands.
//!
//! The node set is deliberately small: just enough structure to evaluate the
//! routing DSL and scan controller bodies. Anything the parser cannot shape
//! into these forms becomes [`NodeKind::Unknown`] carrying the raw line, so
//! downstream passes can surface it as a diagnostic instead of failing.

/// A parsed source file: its repo-relative path plus top-level statements.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: String,
    pub nodes: Vec<Node>,
}

/// One AST node. Nodes carry the 1-based line they started on; the owning
/// [`ParsedFile`] supplies the file half of the provenance pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub line: usize,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(line: usize, kind: NodeKind) -> Self {
        Self { line, kind }
    }

    /// The call payload, when this node is a method call.
    pub fn as_call(&self) -> Option<&CallNode> {
        match &self.kind {
            NodeKind::Call(call) => Some(call),
            _ => None,
        }
    }

    /// String content of a symbol, string literal, or bare identifier.
    ///
    /// This is the accessor the DSL handlers use for arguments that may be
    /// written `:users`, `'users'`, or `users` interchangeably.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Symbol(name) => Some(name),
            NodeKind::StringLit(value) => Some(value),
            NodeKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this node is the literal `true`.
    pub fn is_literal_true(&self) -> bool {
        matches!(&self.kind, NodeKind::Ident(name) if name == "true")
    }

    /// Collect symbol/string names from this node, treating a bare value as
    /// a one-element list (`only: :show` vs `only: [:show, :edit]`).
    pub fn as_name_list(&self) -> Vec<String> {
        match &self.kind {
            NodeKind::ArrayLit(items) => items
                .iter()
                .filter_map(|item| item.as_name().map(str::to_string))
                .collect(),
            _ => self.as_name().map(str::to_string).into_iter().collect(),
        }
    }

    /// Best-effort source rendering, used for diagnostics and for keyword
    /// options preserved on endpoint records.
    pub fn to_source(&self) -> String {
        match &self.kind {
            NodeKind::Call(call) => call.to_source(),
            NodeKind::Symbol(name) => format!(":{}", name),
            NodeKind::StringLit(value) => format!("'{}'", value),
            NodeKind::IntLit(n) => n.to_string(),
            NodeKind::Ident(name) => name.clone(),
            NodeKind::ArrayLit(items) => {
                let inner: Vec<String> = items.iter().map(Node::to_source).collect();
                format!("[{}]", inner.join(", "))
            }
            NodeKind::HashLit(pairs) => {
                let inner: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{} => {}", k.to_source(), v.to_source()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            NodeKind::ClassDef { name, .. } => format!("class {}", name),
            NodeKind::ModuleDef { name, .. } => format!("module {}", name),
            NodeKind::MethodDef { name, .. } => format!("def {}", name),
            NodeKind::IfExpr { cond, .. } => format!("if {}", cond.to_source()),
            NodeKind::Assign { target, value } => {
                format!("{} = {}", target, value.to_source())
            }
            NodeKind::Unknown(raw) => raw.clone(),
        }
    }
}

/// The tagged node forms.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Call(CallNode),
    Symbol(String),
    StringLit(String),
    IntLit(i64),
    /// Identifier or constant path (`users`, `Rails`, `Sidekiq::Web`).
    Ident(String),
    ArrayLit(Vec<Node>),
    HashLit(Vec<(Node, Node)>),
    ClassDef {
        name: String,
        parent: Option<String>,
        body: Vec<Node>,
    },
    ModuleDef {
        name: String,
        body: Vec<Node>,
    },
    MethodDef {
        name: String,
        body: Vec<Node>,
    },
    IfExpr {
        cond: Box<Node>,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
    Assign {
        target: String,
        value: Box<Node>,
    },
    /// A line or region the parser could not interpret. Legal everywhere;
    /// surfaces as a diagnostic downstream.
    Unknown(String),
}

/// A method call: optional receiver chain, positional arguments, keyword
/// arguments (both `key: value` and `key => value` spellings), and an
/// optional trailing block.
#[derive(Debug, Clone, PartialEq)]
pub struct CallNode {
    pub receiver: Option<Box<Node>>,
    pub method: String,
    pub args: Vec<Node>,
    /// Keyword pairs in source order. Rocket keys (`'x' => y`,
    /// `Engine => '/path'`) are stored as their rendered key text.
    pub kwargs: Vec<(String, Node)>,
    pub block: Option<BlockNode>,
}

impl CallNode {
    /// Value of a keyword argument, by key.
    pub fn kwarg(&self, key: &str) -> Option<&Node> {
        self.kwargs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// First positional argument, if any.
    pub fn first_arg(&self) -> Option<&Node> {
        self.args.first()
    }

    /// Receiver chain rendered as text (`Rails.application.routes`).
    pub fn receiver_source(&self) -> Option<String> {
        self.receiver.as_ref().map(|r| r.to_source())
    }

    fn to_source(&self) -> String {
        let mut parts: Vec<String> = self.args.iter().map(Node::to_source).collect();
        parts.extend(
            self.kwargs
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v.to_source())),
        );
        let head = match &self.receiver {
            Some(receiver) => format!("{}.{}", receiver.to_source(), self.method),
            None => self.method.clone(),
        };
        if parts.is_empty() {
            head
        } else {
            format!("{}({})", head, parts.join(", "))
        }
    }
}

/// A `do…end` or `{…}` block attached to a call.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub params: Vec<String>,
    pub body: Vec<Node>,
}

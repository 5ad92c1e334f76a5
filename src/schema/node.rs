use super::{
    Callback, EQUALS, EXPECT, NodeDocument, Param, ParamKind, SUITE, SchemaError, TEST,
};

const ROOT_PATH: &str = "$";

/// Evaluable schema tree.
///
/// Built from a [`NodeDocument`] with `Node::try_from`. Construction is where
/// every structural rule is enforced, so evaluation can assume a well-formed
/// tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Suite(Group),
    Test(Group),
    /// An Expect (or piping custom node) paired with the Equals that follows it.
    Assertion(Assertion),
    Custom(CustomNode),
}

/// Suite or Test: a described scope with a callback and ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub description: String,
    pub callback: Callback,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub subject: Subject,
    pub expected: Param,
}

/// Where the piped value of an assertion comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    Expect(Param),
    Custom(CustomNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomNode {
    pub kind: String,
    pub params: Vec<Param>,
    pub handler: Callback,
    pub children: Vec<Node>,
}

impl Node {
    pub fn kind(&self) -> &str {
        match self {
            Node::Suite(_) => SUITE,
            Node::Test(_) => TEST,
            Node::Assertion(_) => EQUALS,
            Node::Custom(custom) => &custom.kind,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Suite(group) | Node::Test(group) => &group.children,
            Node::Custom(custom) => &custom.children,
            Node::Assertion(_) => &[],
        }
    }

    /// Number of Expect/Equals pairs in the tree.
    pub fn assertion_count(&self) -> usize {
        match self {
            Node::Assertion(_) => 1,
            _ => self.children().iter().map(Node::assertion_count).sum(),
        }
    }

    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(Node::depth).max().unwrap_or(0)
    }
}

impl TryFrom<&NodeDocument> for Node {
    type Error = SchemaError;

    fn try_from(doc: &NodeDocument) -> Result<Self, Self::Error> {
        let is_group = doc.kind == SUITE || doc.kind == TEST;
        if doc.kind == EXPECT || doc.kind == EQUALS || (!is_group && doc.is_pipe()) {
            return Err(SchemaError::InvalidRoot {
                kind: doc.kind.clone(),
            });
        }

        parse_node(doc, ROOT_PATH)
    }
}

fn child_path(parent: &str, index: usize) -> String {
    format!("{}.children[{}]", parent, index)
}

fn parse_node(doc: &NodeDocument, path: &str) -> Result<Node, SchemaError> {
    match doc.kind.as_str() {
        SUITE => Ok(Node::Suite(parse_group(doc, path)?)),
        TEST => Ok(Node::Test(parse_group(doc, path)?)),
        EQUALS => Err(SchemaError::OrphanEquals {
            path: path.to_string(),
        }),
        EXPECT => Err(SchemaError::ExpectWithoutPipe {
            path: path.to_string(),
        }),
        _ => Ok(Node::Custom(parse_custom(doc, path)?)),
    }
}

fn parse_children(docs: &[NodeDocument], parent: &str) -> Result<Vec<Node>, SchemaError> {
    let mut nodes = Vec::with_capacity(docs.len());
    let mut iter = docs.iter().enumerate().peekable();

    while let Some((index, doc)) = iter.next() {
        let path = child_path(parent, index);

        if !doc.is_pipe() {
            nodes.push(parse_node(doc, &path)?);
            continue;
        }

        let subject = parse_subject(doc, &path)?;
        let Some((equals_index, equals)) = iter.next_if(|(_, next)| next.kind == EQUALS) else {
            return Err(SchemaError::UnpairedPipe {
                kind: doc.kind.clone(),
                path,
            });
        };
        let expected = parse_equals(equals, &child_path(parent, equals_index))?;

        nodes.push(Node::Assertion(Assertion { subject, expected }));
    }

    Ok(nodes)
}

fn parse_group(doc: &NodeDocument, path: &str) -> Result<Group, SchemaError> {
    if doc.is_pipe() {
        return Err(unexpected_pipe(doc, path));
    }
    check_arity(doc, path, 2)?;

    let description = match &doc.params[0] {
        Param::Value(serde_json::Value::String(s)) => s.clone(),
        _ => {
            return Err(SchemaError::InvalidDescription {
                kind: doc.kind.clone(),
                path: path.to_string(),
            });
        }
    };

    let callback = match &doc.params[1] {
        Param::Callback(callback) => callback.clone(),
        Param::Value(_) => {
            return Err(SchemaError::MissingCallback {
                kind: doc.kind.clone(),
                path: path.to_string(),
                position: 1,
            });
        }
    };

    Ok(Group {
        description,
        callback,
        children: parse_children(&doc.children, path)?,
    })
}

fn parse_subject(doc: &NodeDocument, path: &str) -> Result<Subject, SchemaError> {
    match doc.kind.as_str() {
        EXPECT => {
            check_arity(doc, path, 1)?;
            check_leaf(doc, path)?;
            Ok(Subject::Expect(doc.params[0].clone()))
        }
        SUITE | TEST | EQUALS => Err(unexpected_pipe(doc, path)),
        _ => {
            check_leaf(doc, path)?;
            Ok(Subject::Custom(parse_custom(doc, path)?))
        }
    }
}

fn parse_equals(doc: &NodeDocument, path: &str) -> Result<Param, SchemaError> {
    if doc.is_pipe() {
        return Err(unexpected_pipe(doc, path));
    }
    check_arity(doc, path, 1)?;
    check_leaf(doc, path)?;

    Ok(doc.params[0].clone())
}

fn parse_custom(doc: &NodeDocument, path: &str) -> Result<CustomNode, SchemaError> {
    let handler = doc
        .custom_function()
        .map(|f| Callback::new(f.script.clone()))
        .ok_or_else(|| SchemaError::UnknownKind {
            kind: doc.kind.clone(),
            path: path.to_string(),
        })?;

    if let Some(schema) = &doc.custom_schema {
        check_arity(doc, path, schema.params.len())?;

        let missing = schema
            .params
            .iter()
            .zip(&doc.params)
            .position(|(kind, param)| {
                *kind == ParamKind::Callback && !matches!(param, Param::Callback(_))
            });
        if let Some(position) = missing {
            return Err(SchemaError::MissingCallback {
                kind: doc.kind.clone(),
                path: path.to_string(),
                position,
            });
        }

        if !schema.allows_children {
            check_leaf(doc, path)?;
        }
    }

    Ok(CustomNode {
        kind: doc.kind.clone(),
        params: doc.params.clone(),
        handler,
        children: parse_children(&doc.children, path)?,
    })
}

fn check_arity(doc: &NodeDocument, path: &str, expected: usize) -> Result<(), SchemaError> {
    if doc.params.len() != expected {
        return Err(SchemaError::ArityMismatch {
            kind: doc.kind.clone(),
            path: path.to_string(),
            expected,
            found: doc.params.len(),
        });
    }
    Ok(())
}

fn check_leaf(doc: &NodeDocument, path: &str) -> Result<(), SchemaError> {
    if !doc.children.is_empty() {
        return Err(SchemaError::UnexpectedChildren {
            kind: doc.kind.clone(),
            path: path.to_string(),
        });
    }
    Ok(())
}

fn unexpected_pipe(doc: &NodeDocument, path: &str) -> SchemaError {
    SchemaError::UnexpectedPipe {
        kind: doc.kind.clone(),
        path: path.to_string(),
    }
}

//! Indented tree rendering of JSON documents.
//!
//! ```text
//! root
//!  ├─ type: Add
//!  ├─ metric1
//!  │   ├─ type: Const
//!  │   └─ value: 1.0
//!  └─ metric2: {type: Const, value: 2.0}
//! ```
//!
//! Containers are expanded one child per line unless the [`ExpandRule`]
//! excludes their kind or expansion is disabled, in which case they are
//! written inline as `{key: value, ...}` or `[value, ...]`.

use serde_json::Value;

/// Kinds of container a document can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Object,
    Array,
}

impl ContainerKind {
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Object(_) => Some(ContainerKind::Object),
            Value::Array(_) => Some(ContainerKind::Array),
            _ => None,
        }
    }
}

/// Which container kinds are expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExpandRule {
    #[default]
    All,
    Only(Vec<ContainerKind>),
    Except(Vec<ContainerKind>),
}

impl ExpandRule {
    pub fn allows(&self, kind: ContainerKind) -> bool {
        match self {
            ExpandRule::All => true,
            ExpandRule::Only(kinds) => kinds.contains(&kind),
            ExpandRule::Except(kinds) => !kinds.contains(&kind),
        }
    }
}

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOptions {
    /// Prefix of a child that has later siblings
    pub child_birth: String,
    /// Indentation below such a child
    pub child_alive: String,
    /// Prefix of the last child
    pub last_child_birth: String,
    /// Indentation below the last child
    pub last_child_alive: String,
    pub rule: ExpandRule,
    /// When false, the whole document is written on one line
    pub expand: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            child_birth: " ├─ ".to_string(),
            child_alive: " │  ".to_string(),
            last_child_birth: " └─ ".to_string(),
            last_child_alive: "    ".to_string(),
            rule: ExpandRule::All,
            expand: true,
        }
    }
}

impl TreeOptions {
    /// Plain ASCII branch symbols.
    pub fn ascii() -> Self {
        Self {
            child_birth: " |- ".to_string(),
            child_alive: " |  ".to_string(),
            last_child_birth: " `- ".to_string(),
            last_child_alive: "    ".to_string(),
            ..Self::default()
        }
    }

    pub fn flat() -> Self {
        Self {
            expand: false,
            ..Self::default()
        }
    }

    pub fn with_rule(mut self, rule: ExpandRule) -> Self {
        self.rule = rule;
        self
    }

    fn expands(&self, value: &Value) -> bool {
        self.expand && ContainerKind::of(value).is_some_and(|kind| self.rule.allows(kind))
    }
}

/// Render `value` as a tree whose root line is `name`.
pub fn render(value: &Value, name: &str, options: &TreeOptions) -> String {
    let mut out = String::new();
    write_node(&mut out, options, value, name, "", "", "");
    out
}

/// Render to stdout.
pub fn print(value: &Value, name: &str, options: &TreeOptions) {
    print!("{}", render(value, name, options));
}

fn write_node(
    out: &mut String,
    options: &TreeOptions,
    value: &Value,
    name: &str,
    base: &str,
    branch: &str,
    indent: &str,
) {
    out.push_str(base);
    out.push_str(branch);
    out.push_str(name);

    if !options.expands(value) {
        if !name.is_empty() {
            out.push_str(": ");
        }
        write_inline(out, value);
        out.push('\n');
        return;
    }

    out.push('\n');
    let children = children(value);
    let child_base = format!("{base}{indent}");
    for (i, (child_name, child)) in children.iter().enumerate() {
        let (branch, indent) = if i + 1 < children.len() {
            (&options.child_birth, &options.child_alive)
        } else {
            (&options.last_child_birth, &options.last_child_alive)
        };
        write_node(out, options, child, child_name, &child_base, branch, indent);
    }
}

fn children(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("[{i}]"), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn write_inline(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(key);
                out.push_str(": ");
                write_inline(out, item);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_inline(out, item);
            }
            out.push(']');
        }
        Value::String(text) => out.push_str(text),
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_nested() {
        let doc = json!({"a": 1, "b": {"c": [true, null]}});
        let expected = "\
root
 ├─ a: 1
 └─ b
     └─ c
         ├─ [0]: true
         └─ [1]: null
";
        assert_eq!(render(&doc, "root", &TreeOptions::default()), expected);
    }

    #[test]
    fn test_render_scalar_root() {
        assert_eq!(render(&json!("hi"), "greeting", &TreeOptions::default()), "greeting: hi\n");
        assert_eq!(render(&json!(2.5), "", &TreeOptions::default()), "2.5\n");
    }

    #[test]
    fn test_only_objects_expand() {
        let doc = json!({"values": [1, 2], "n": {"x": "y"}});
        let options = TreeOptions::ascii().with_rule(ExpandRule::Only(vec![ContainerKind::Object]));
        let expected = "\
m
 |- n
 |   `- x: y
 `- values: [1, 2]
";
        assert_eq!(render(&doc, "m", &options), expected);
    }

    #[test]
    fn test_except_arrays() {
        let doc = json!([[1, 2], {"k": [3]}]);
        let options =
            TreeOptions::default().with_rule(ExpandRule::Except(vec![ContainerKind::Array]));
        assert_eq!(render(&doc, "list", &options), "list: [[1, 2], {k: [3]}]\n");
    }

    #[test]
    fn test_flat_mode() {
        let doc = json!({"type": "Const", "value": 1.0, "tags": ["a", "b"]});
        assert_eq!(
            render(&doc, "root", &TreeOptions::flat()),
            "root: {tags: [a, b], type: Const, value: 1.0}\n"
        );
    }

    #[test]
    fn test_empty_container_expands_to_bare_name() {
        assert_eq!(render(&json!({}), "empty", &TreeOptions::default()), "empty\n");
    }
}

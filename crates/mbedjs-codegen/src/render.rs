//! Substitution-only template rendering.
//!
//! Two constructs are supported:
//!
//! - `{{ path.to.value }}` inserts a value from the context
//! - `{{#each list}} ... {{/each}}` repeats its body once per list element,
//!   with the element's fields in scope (and the element itself as `this`)
//!
//! A newline directly after a block tag is dropped so that block tags can sit
//! on their own lines. Strings are inserted verbatim: values must be escaped
//! before they go into the context.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CodegenError, Result};

/// Named values injected into a single template render.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    values: Map<String, Value>,
}

impl RenderContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value, converting it through serde.
    pub fn with<T: Serialize>(mut self, name: &str, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|source| CodegenError::Value {
            name: name.to_string(),
            source,
        })?;
        self.values.insert(name.to_string(), value);
        Ok(self)
    }

    /// Look up a top-level value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    fn root(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    Each { path: String, body: Vec<Node> },
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse template text.
    pub fn parse(text: &str) -> Result<Self> {
        // Each frame is an open `each` block: (path, tag offset, body so far).
        let mut stack: Vec<(String, usize, Vec<Node>)> = Vec::new();
        let mut current: Vec<Node> = Vec::new();
        let mut rest = text;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                current.push(Node::Text(rest[..start].to_string()));
            }
            let tag_offset = offset + start;
            let after_open = &rest[start + 2..];
            let end = after_open.find("}}").ok_or_else(|| CodegenError::Syntax {
                offset: tag_offset,
                detail: "unterminated tag".into(),
            })?;
            let tag = after_open[..end].trim();
            let mut consumed = start + 2 + end + 2;

            let each_path = tag
                .strip_prefix("#each")
                .filter(|p| p.is_empty() || p.starts_with(char::is_whitespace));

            if let Some(path) = each_path {
                let path = path.trim();
                if path.is_empty() {
                    return Err(CodegenError::Syntax {
                        offset: tag_offset,
                        detail: "each block without a list name".into(),
                    });
                }
                stack.push((path.to_string(), tag_offset, std::mem::take(&mut current)));
                consumed += skip_newline(&rest[consumed..]);
            } else if tag == "/each" {
                let (path, _, parent) = stack.pop().ok_or_else(|| CodegenError::Syntax {
                    offset: tag_offset,
                    detail: "'/each' without matching '#each'".into(),
                })?;
                let body = std::mem::replace(&mut current, parent);
                current.push(Node::Each { path, body });
                consumed += skip_newline(&rest[consumed..]);
            } else if tag.is_empty() || tag.starts_with('#') || tag.starts_with('/') {
                return Err(CodegenError::Syntax {
                    offset: tag_offset,
                    detail: format!("unsupported tag '{tag}'"),
                });
            } else {
                current.push(Node::Var(tag.to_string()));
            }

            rest = &rest[consumed..];
            offset += consumed;
        }

        if let Some((path, tag_offset, _)) = stack.pop() {
            return Err(CodegenError::Syntax {
                offset: tag_offset,
                detail: format!("'#each {path}' is never closed"),
            });
        }
        if !rest.is_empty() {
            current.push(Node::Text(rest.to_string()));
        }

        Ok(Self { nodes: current })
    }

    /// Render the template against a context.
    pub fn render(&self, context: &RenderContext) -> Result<String> {
        let root = context.root();
        let mut scopes = vec![&root];
        let mut out = String::new();
        render_nodes(&self.nodes, &mut scopes, &mut out)?;
        Ok(out)
    }
}

fn skip_newline(s: &str) -> usize {
    if s.starts_with("\r\n") {
        2
    } else if s.starts_with('\n') {
        1
    } else {
        0
    }
}

fn render_nodes<'a>(nodes: &'a [Node], scopes: &mut Vec<&'a Value>, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => {
                let value = lookup(scopes, path)?;
                write_value(value, out);
            }
            Node::Each { path, body } => {
                let items = match lookup(scopes, path)? {
                    Value::Array(items) => items,
                    _ => return Err(CodegenError::NotAList { name: path.clone() }),
                };
                for item in items {
                    scopes.push(item);
                    let result = render_nodes(body, scopes, out);
                    scopes.pop();
                    result?;
                }
            }
        }
    }
    Ok(())
}

fn lookup<'a>(scopes: &[&'a Value], path: &str) -> Result<&'a Value> {
    let unknown = || CodegenError::UnknownVariable {
        name: path.to_string(),
    };
    let mut segments = path.split('.');
    let head = segments.next().ok_or_else(unknown)?;

    let mut value = if head == "this" {
        *scopes.last().ok_or_else(unknown)?
    } else {
        scopes
            .iter()
            .rev()
            .find_map(|scope| (*scope).get(head))
            .ok_or_else(unknown)?
    };

    for segment in segments {
        value = value.get(segment).ok_or_else(unknown)?;
    }
    Ok(value)
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(item, out);
            }
        }
        Value::Object(_) => out.push_str(&value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(template: &str, context: &RenderContext) -> String {
        Template::parse(template).unwrap().render(context).unwrap()
    }

    #[test]
    fn substitutes_scalars() {
        let ctx = RenderContext::new()
            .with("name", &"fade_led")
            .unwrap()
            .with("length", &42usize)
            .unwrap();
        assert_eq!(
            render("const char* {{ name }}_js; // {{length}}", &ctx),
            "const char* fade_led_js; // 42"
        );
    }

    #[test]
    fn iterates_records_with_outer_scope() {
        let ctx = RenderContext::new()
            .with("prefix", &"PIN")
            .unwrap()
            .with("pins", &json!([{"name": "D0", "value": "3"}, {"name": "D1", "value": "4"}]))
            .unwrap();
        let out = render(
            "{{#each pins}}\n#define {{prefix}}_{{name}} {{ value }}\n{{/each}}\nend",
            &ctx,
        );
        assert_eq!(out, "#define PIN_D0 3\n#define PIN_D1 4\nend");
    }

    #[test]
    fn nested_lists_and_this() {
        let ctx = RenderContext::new()
            .with(
                "libraries",
                &json!([{"name": "a", "dirs": ["x", "y"]}, {"name": "b", "dirs": []}]),
            )
            .unwrap();
        let out = render(
            "{{#each libraries}}{{name}}:{{#each dirs}}[{{this}}]{{/each}};{{/each}}",
            &ctx,
        );
        assert_eq!(out, "a:[x][y];b:;");
    }

    #[test]
    fn arrays_join_with_spaces_and_objects_as_json() {
        let ctx = RenderContext::new()
            .with("dirs", &vec!["a/src", "b/src"])
            .unwrap()
            .with("config", &json!({"source": ["src"]}))
            .unwrap();
        assert_eq!(render("{{dirs}}|{{config}}", &ctx), "a/src b/src|{\"source\":[\"src\"]}");
    }

    #[test]
    fn dotted_paths() {
        let ctx = RenderContext::new()
            .with("lib", &json!({"config": {"version": "1.2"}}))
            .unwrap();
        assert_eq!(render("v{{lib.config.version}}", &ctx), "v1.2");
    }

    #[test]
    fn text_without_tags_is_unchanged() {
        let text = "all: build\n\tmake -C jerryscript\n";
        assert_eq!(render(text, &RenderContext::new()), text);
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let template = Template::parse("{{ missing }}").unwrap();
        let err = template.render(&RenderContext::new()).unwrap_err();
        assert!(matches!(err, CodegenError::UnknownVariable { name } if name == "missing"));
    }

    #[test]
    fn each_over_non_list_is_an_error() {
        let ctx = RenderContext::new().with("pins", &"nope").unwrap();
        let template = Template::parse("{{#each pins}}x{{/each}}").unwrap();
        assert!(matches!(
            template.render(&ctx),
            Err(CodegenError::NotAList { .. })
        ));
    }

    #[test]
    fn syntax_errors() {
        assert!(Template::parse("{{ open").is_err());
        assert!(Template::parse("{{#each a}}body").is_err());
        assert!(Template::parse("{{/each}}").is_err());
        assert!(Template::parse("{{#if a}}{{/if}}").is_err());
        assert!(Template::parse("{{#each}}{{/each}}").is_err());
    }
}

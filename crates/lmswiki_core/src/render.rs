//! Page rendering from a small placeholder template language.
//!
//! `{{ item.path.to.field }}` is replaced with the value at that path and
//! `{% if item.field %}...{% else %}...{% endif %}` keeps one branch; if blocks
//! may nest. Any other `{{` is wiki markup and passes through untouched. A
//! block tag alone on its line also swallows the line break after it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use crate::enrich::RenderFields;
use crate::item::ItemRecord;

pub const DEFAULT_TEMPLATE_NAME: &str = "lms_item.wikitext";

const EMBEDDED_TEMPLATE: &str = include_str!("../templates/lms_item.wikitext");
const ROOT_VARIABLE: &str = "item";

pub trait PageRenderer {
    fn render(&self, fields: &Map<String, Value>) -> Result<String>;
}

/// Flatten a record and its enrichment into the mapping handed to templates.
/// Enriched keys win, so `release_date` is the formatted date markup.
pub fn render_fields(record: &ItemRecord, enriched: &RenderFields) -> Result<Map<String, Value>> {
    let Value::Object(mut fields) =
        serde_json::to_value(record).context("failed to serialize item record")?
    else {
        bail!("item record did not serialize to an object");
    };
    let Value::Object(extra) =
        serde_json::to_value(enriched).context("failed to serialize render fields")?
    else {
        bail!("render fields did not serialize to an object");
    };
    fields.extend(extra);
    Ok(fields)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Field(Vec<String>),
    If {
        path: Vec<String>,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTemplate {
    name: String,
    nodes: Vec<Node>,
}

enum Tag {
    If(Vec<String>),
    Else,
    EndIf,
}

#[derive(Default)]
struct OpenIf {
    path: Vec<String>,
    then: Vec<Node>,
    otherwise: Vec<Node>,
    in_else: bool,
    line: usize,
}

impl PageTemplate {
    pub fn embedded() -> Result<Self> {
        Self::parse(DEFAULT_TEMPLATE_NAME, EMBEDDED_TEMPLATE)
    }

    pub fn embedded_source() -> &'static str {
        EMBEDDED_TEMPLATE
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parse(name: &str, source: &str) -> Result<Self> {
        let mut nodes = Vec::new();
        let mut open: Vec<OpenIf> = Vec::new();
        let mut text = String::new();
        let mut rest = source;
        let mut line = 1usize;
        let mut at_line_start = true;

        while !rest.is_empty() {
            let advance = if let Some(after) = rest.strip_prefix("{%") {
                let end = after
                    .find("%}")
                    .with_context(|| format!("{name}:{line}: unterminated block tag"))?;
                let tag = parse_tag(after[..end].trim())
                    .with_context(|| format!("{name}:{line}: invalid block tag"))?;
                let mut advance = 2 + end + 2;
                if at_line_start {
                    let after_tag = &rest[advance..];
                    if after_tag.starts_with("\r\n") {
                        advance += 2;
                    } else if after_tag.starts_with('\n') {
                        advance += 1;
                    }
                }

                flush_text(&mut text, target(&mut nodes, &mut open));
                match tag {
                    Tag::If(path) => open.push(OpenIf {
                        path,
                        line,
                        ..OpenIf::default()
                    }),
                    Tag::Else => match open.last_mut() {
                        Some(block) if !block.in_else => block.in_else = true,
                        Some(_) => bail!("{name}:{line}: duplicate else"),
                        None => bail!("{name}:{line}: else outside of an if block"),
                    },
                    Tag::EndIf => {
                        let Some(block) = open.pop() else {
                            bail!("{name}:{line}: endif without a matching if");
                        };
                        target(&mut nodes, &mut open).push(Node::If {
                            path: block.path,
                            then: block.then,
                            otherwise: block.otherwise,
                        });
                    }
                }
                advance
            } else if opens_placeholder(rest) {
                let end = rest
                    .find("}}")
                    .with_context(|| format!("{name}:{line}: unterminated placeholder"))?;
                let expr = rest[2..end].trim();
                let path = parse_path(expr)
                    .with_context(|| format!("{name}:{line}: invalid placeholder `{expr}`"))?;
                flush_text(&mut text, target(&mut nodes, &mut open));
                target(&mut nodes, &mut open).push(Node::Field(path));
                end + 2
            } else {
                let ch = rest.chars().next().unwrap_or_default();
                text.push(ch);
                ch.len_utf8()
            };

            let consumed = &rest[..advance];
            line += consumed.matches('\n').count();
            at_line_start = consumed.ends_with('\n');
            rest = &rest[advance..];
        }

        if let Some(block) = open.last() {
            bail!("{name}:{}: if block is never closed", block.line);
        }
        flush_text(&mut text, &mut nodes);

        Ok(Self {
            name: name.to_string(),
            nodes,
        })
    }
}

impl PageRenderer for PageTemplate {
    fn render(&self, fields: &Map<String, Value>) -> Result<String> {
        let mut output = String::new();
        render_nodes(&self.nodes, fields, &mut output);
        Ok(output)
    }
}

/// Use `<templates_dir>/<template_name>` when present, else the embedded default.
pub fn load_template(templates_dir: &Path, template_name: &str) -> Result<PageTemplate> {
    let path = templates_dir.join(template_name);
    if !path.exists() {
        if template_name != DEFAULT_TEMPLATE_NAME {
            bail!("template {} does not exist", path.display());
        }
        tracing::debug!(path = %path.display(), "using embedded page template");
        return PageTemplate::embedded();
    }
    let source = fs::read_to_string(&path)
        .with_context(|| format!("failed to read template {}", path.display()))?;
    PageTemplate::parse(template_name, &source)
}

fn render_nodes(nodes: &[Node], fields: &Map<String, Value>, output: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => output.push_str(text),
            Node::Field(path) => {
                if let Some(value) = lookup(fields, path) {
                    output.push_str(&display_value(value));
                }
            }
            Node::If {
                path,
                then,
                otherwise,
            } => {
                let branch = if lookup(fields, path).is_some_and(is_truthy) {
                    then
                } else {
                    otherwise
                };
                render_nodes(branch, fields, output);
            }
        }
    }
}

fn lookup<'a>(fields: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = fields.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

fn opens_placeholder(rest: &str) -> bool {
    rest.strip_prefix("{{")
        .map(|body| body.trim_start_matches([' ', '\t']))
        .and_then(|body| body.strip_prefix(ROOT_VARIABLE))
        .is_some_and(|after_root| after_root.starts_with('.'))
}

fn parse_tag(body: &str) -> Result<Tag> {
    if body == "else" {
        return Ok(Tag::Else);
    }
    if body == "endif" {
        return Ok(Tag::EndIf);
    }
    if let Some(expr) = body.strip_prefix("if ") {
        return Ok(Tag::If(parse_path(expr.trim())?));
    }
    bail!("unknown tag `{body}`")
}

fn parse_path(expr: &str) -> Result<Vec<String>> {
    let Some(path) = expr
        .strip_prefix(ROOT_VARIABLE)
        .and_then(|rest| rest.strip_prefix('.'))
    else {
        bail!("expected `{ROOT_VARIABLE}.<field>`, found `{expr}`");
    };
    let segments = path.split('.').map(str::to_string).collect::<Vec<_>>();
    if segments.iter().any(|segment| {
        segment.is_empty()
            || !segment
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    }) {
        bail!("invalid field path `{expr}`");
    }
    Ok(segments)
}

/// Where parsed nodes go: the innermost open branch, else the top level.
fn target<'a>(nodes: &'a mut Vec<Node>, open: &'a mut [OpenIf]) -> &'a mut Vec<Node> {
    match open.last_mut() {
        Some(block) => {
            if block.in_else {
                &mut block.otherwise
            } else {
                &mut block.then
            }
        }
        None => nodes,
    }
}

fn flush_text(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}

//! Compilation pipeline: assembles a deck source and resolves it with Tera.
//!
//! A compiled deck is built from four parts, in this order:
//!
//! | Part          | Content                                                  |
//! |---------------|----------------------------------------------------------|
//! | front-matter  | fixed YAML header (see [`crate::frontmatter`])           |
//! | assignments   | one `{%- set name = literal -%}` per bound variable      |
//! | macros        | the template's `slides/*.tera` fragments, verbatim       |
//! | slides        | one macro invocation per block, `---` between slides     |
//!
//! Tera only resolves macros through an import, so the macro part is
//! registered as its own template ([`MACRO_TEMPLATE`]) and the document
//! template opens with `{% import "blocks" as blocks %}`. The assignments
//! render nothing and trim the whitespace around them, so the document
//! template puts them ahead of the front-matter, where there is none to
//! trim.

use std::fmt;

use serde::{Deserialize, Serialize};
use tera::Tera;

use slidekit_core::{Block, BoundVariables, MacroFragment, TemplateId, TemplateStore};

use crate::binder::{assignments, is_identifier};
use crate::context::DeckContext;
use crate::error::CompileError;
use crate::frontmatter::FrontMatter;
use crate::order::order_blocks;

/// Marker placed between consecutive slides.
pub const SLIDE_BREAK: &str = "\n---\n";

/// Tera template name the macro part is registered under.
pub const MACRO_TEMPLATE: &str = "blocks";

/// Namespace invocations use to reach the macro part.
pub const MACRO_NAMESPACE: &str = "blocks";

/// Tera template name of the document part.
pub const DOCUMENT_TEMPLATE: &str = "document";

// ---------------------------------------------------------------------------
// Assembled source
// ---------------------------------------------------------------------------

/// Unresolved deck source, kept as its four parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledSource {
    pub front_matter: String,
    pub assignments: String,
    pub macros: String,
    pub slides: String,
}

impl AssembledSource {
    /// Everything except the macro part, preceded by the macro import.
    pub fn document_template(&self) -> String {
        format!(
            "{{% import \"{MACRO_TEMPLATE}\" as {MACRO_NAMESPACE} %}}{}{}\n\n{}\n",
            self.assignments, self.front_matter, self.slides
        )
    }
}

impl fmt::Display for AssembledSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n\n{}{}\n{}\n",
            self.front_matter, self.assignments, self.macros, self.slides
        )
    }
}

/// Resolved deck text handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompiledDocument(String);

impl CompiledDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CompiledDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CompiledDocument {
    fn from(s: String) -> Self {
        CompiledDocument(s)
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// `{{ blocks::fn(a=a, b=b) }}` for one block.
pub fn invocation(block: &Block) -> Result<String, CompileError> {
    if !is_identifier(&block.function) {
        return Err(CompileError::InvalidName {
            what: "block function",
            name: block.function.clone(),
        });
    }
    let mut args = Vec::with_capacity(block.variables.len());
    for name in block.argument_names() {
        if !is_identifier(name) {
            return Err(CompileError::InvalidName {
                what: "variable",
                name: name.to_string(),
            });
        }
        args.push(format!("{name}={name}"));
    }
    Ok(format!(
        "{{{{ {MACRO_NAMESPACE}::{}({}) }}}}",
        block.function,
        args.join(", ")
    ))
}

/// Ordered invocations joined by [`SLIDE_BREAK`].
pub fn slide_sequence(blocks: &[Block]) -> Result<String, CompileError> {
    let calls = order_blocks(blocks)
        .into_iter()
        .map(invocation)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(calls.join(SLIDE_BREAK))
}

/// Build the four source parts. Pure; touches neither disk nor engine.
pub fn assemble(
    fragments: &[MacroFragment],
    variables: &BoundVariables,
    blocks: &[Block],
) -> Result<AssembledSource, CompileError> {
    let macros = fragments
        .iter()
        .map(|f| format!("{}\n", f.source))
        .collect::<String>();
    Ok(AssembledSource {
        front_matter: FrontMatter::from_variables(variables).to_source(),
        assignments: assignments(variables)?,
        macros,
        slides: slide_sequence(blocks)?,
    })
}

/// Resolve an assembled source through Tera.
pub fn render(
    source: &AssembledSource,
    context: &DeckContext,
) -> Result<CompiledDocument, CompileError> {
    let document = source.document_template();
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_templates(vec![
        (MACRO_TEMPLATE, source.macros.as_str()),
        (DOCUMENT_TEMPLATE, document.as_str()),
    ])?;
    let text = tera.render(DOCUMENT_TEMPLATE, &context.to_tera_context()?)?;
    Ok(CompiledDocument(text))
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// Body of a compile call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileRequest {
    #[serde(alias = "templateId", default)]
    pub template_id: String,
    #[serde(default)]
    pub variables: BoundVariables,
    #[serde(default)]
    pub blocks: Option<Vec<Block>>,
}

impl CompileRequest {
    /// Check required fields, returning the template id and blocks.
    pub fn validate(&self) -> Result<(TemplateId, &[Block]), CompileError> {
        if self.template_id.trim().is_empty() {
            return Err(CompileError::MissingParameter("template_id"));
        }
        let blocks = self
            .blocks
            .as_deref()
            .ok_or(CompileError::MissingParameter("blocks"))?;
        Ok((TemplateId::from(self.template_id.as_str()), blocks))
    }
}

/// Compiles decks from the templates in a [`TemplateStore`].
#[derive(Debug, Clone)]
pub struct Compiler {
    store: TemplateStore,
}

impl Compiler {
    pub fn new(store: TemplateStore) -> Self {
        Compiler { store }
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Compile `blocks` of `template_id` with `variables` bound.
    ///
    /// All-or-nothing: any failure yields no document.
    pub fn compile(
        &self,
        template_id: &TemplateId,
        variables: &BoundVariables,
        blocks: &[Block],
    ) -> Result<CompiledDocument, CompileError> {
        let fragments = self.store.macro_fragments(template_id)?;
        let context = DeckContext::resolve(variables, blocks);
        let source = assemble(&fragments, context.variables(), blocks)?;
        let document = render(&source, &context).map_err(|err| {
            tracing::warn!(template = %template_id, error = %err, "compilation failed");
            err
        })?;
        tracing::debug!(
            template = %template_id,
            blocks = blocks.len(),
            bytes = document.as_str().len(),
            "compiled deck"
        );
        Ok(document)
    }

    pub fn compile_request(
        &self,
        request: &CompileRequest,
    ) -> Result<CompiledDocument, CompileError> {
        let (template_id, blocks) = request.validate()?;
        self.compile(&template_id, &request.variables, blocks)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use slidekit_core::{BoundValue, ErrorKind, VariableKind, VariableSpec};

    fn var(name: &str) -> VariableSpec {
        VariableSpec {
            name: name.to_string(),
            label: name.to_string(),
            kind: VariableKind::Input,
            description: None,
            default: None,
            options: vec![],
        }
    }

    fn block(function: &str, order: i64, vars: &[&str]) -> Block {
        Block {
            id: function.to_string(),
            function: function.to_string(),
            label: String::new(),
            description: String::new(),
            variables: vars.iter().map(|v| var(v)).collect(),
            order,
        }
    }

    fn fragment(source: &str) -> MacroFragment {
        MacroFragment {
            name: "f.tera".to_string(),
            source: source.to_string(),
        }
    }

    #[test]
    fn invocation_passes_variables_by_name() {
        let b = block("titleMacro", 0, &["title", "subtitle"]);
        assert_eq!(
            invocation(&b).expect("invocation"),
            "{{ blocks::titleMacro(title=title, subtitle=subtitle) }}"
        );
    }

    #[test]
    fn zero_variable_block_has_empty_argument_list() {
        let b = block("endMacro", 0, &[]);
        assert_eq!(invocation(&b).expect("invocation"), "{{ blocks::endMacro() }}");
    }

    #[test]
    fn invalid_function_name_is_bad_request() {
        let b = block("end-macro", 0, &[]);
        assert_eq!(invocation(&b).unwrap_err().kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn slides_follow_order_with_single_breaks() {
        let blocks = vec![block("second", 2, &[]), block("first", 1, &[])];
        let slides = slide_sequence(&blocks).expect("slides");
        assert_eq!(slides, "{{ blocks::first() }}\n---\n{{ blocks::second() }}");
        assert!(slide_sequence(&[]).expect("slides").is_empty());
    }

    #[test]
    fn display_concatenates_parts_in_order() {
        let mut vars = BoundVariables::new();
        vars.insert("x".into(), BoundValue::from("1"));
        let source = assemble(
            &[fragment("{% macro m() %}M{% endmacro m %}")],
            &vars,
            &[block("m", 0, &[])],
        )
        .expect("assemble");
        let text = source.to_string();
        let fm = text.find("title:").expect("front-matter");
        let set = text.find("{%- set x").expect("assignment");
        let mac = text.find("{% macro m()").expect("macro");
        let slide = text.find("{{ blocks::m() }}").expect("slide");
        assert!(fm < set && set < mac && mac < slide, "{text}");
        assert!(!source.document_template().contains("{% macro"));
    }

    #[test]
    fn render_resolves_macros_and_front_matter() {
        let mut vars = BoundVariables::new();
        vars.insert("companyName".into(), BoundValue::from("Acme {{ Co }}"));
        let source = assemble(
            &[fragment(
                "{% macro hello(companyName) %}# Hello {{ companyName }}{% endmacro hello %}",
            )],
            &vars,
            &[block("hello", 0, &["companyName"])],
        )
        .expect("assemble");
        let doc = render(&source, &DeckContext::from(vars)).expect("render");
        assert!(doc.as_str().starts_with("---\ntheme: apple-basic\n"), "{doc}");
        assert!(doc.as_str().contains("title: Acme {{ Co }}\n"), "{doc}");
        assert!(doc.as_str().contains("# Hello Acme {{ Co }}"), "{doc}");
    }

    #[test]
    fn front_matter_closer_keeps_its_own_line() {
        let fragments = [fragment(
            "{% macro plain(x) %}# Slide {{ x }}{% endmacro plain %}",
        )];
        let blocks = [block("plain", 0, &["x"])];
        let mut vars = BoundVariables::new();
        vars.insert("x".into(), BoundValue::from("x"));
        vars.insert("y".into(), BoundValue::from("unused"));

        let source = assemble(&fragments, &vars, &blocks).expect("assemble");
        let doc = render(&source, &DeckContext::from(vars)).expect("render");
        let text = doc.as_str();
        assert!(text.starts_with("---\ntheme: "), "{text}");
        assert!(text.contains("---\n\n# Slide x"), "{text}");
        assert!(!text.contains("---#"), "{text}");
    }

    #[test]
    fn engine_failure_is_compilation_failed() {
        let source = assemble(
            &[fragment("{% macro broken( %}")],
            &BoundVariables::new(),
            &[],
        )
        .expect("assemble");
        let err = render(&source, &DeckContext::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CompilationFailed);
        assert!(matches!(err, CompileError::Engine { ref diagnostic, .. } if !diagnostic.is_empty()));
    }

    #[test]
    fn request_requires_template_and_blocks() {
        let req = CompileRequest::default();
        assert!(matches!(
            req.validate(),
            Err(CompileError::MissingParameter("template_id"))
        ));
        let req = CompileRequest {
            template_id: "demo".into(),
            ..Default::default()
        };
        assert!(matches!(
            req.validate(),
            Err(CompileError::MissingParameter("blocks"))
        ));
    }

    #[test]
    fn request_accepts_camel_case_template_id() {
        let req: CompileRequest =
            serde_json::from_str(r#"{"templateId":"demo","blocks":[]}"#).expect("parse");
        let (id, blocks) = req.validate().expect("valid");
        assert_eq!(id, TemplateId::from("demo"));
        assert!(blocks.is_empty());
    }
}

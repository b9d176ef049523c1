//! Deck front-matter: the fixed YAML header the renderer reads.
//!
//! Values are written as inert Tera expressions (`{{ "apple-basic" }}`) so
//! that a title containing `{{` or `{%` passes through the templating pass
//! unchanged.

use slidekit_core::BoundVariables;

use crate::binder::string_literal;

pub const DEFAULT_THEME: &str = "apple-basic";
pub const DEFAULT_BACKGROUND: &str = "https://source.unsplash.com/1920x1080/gradient";
pub const DEFAULT_TITLE: &str = "Slidev Presentation";

/// Bound variables consulted for the title, first non-empty wins.
pub const TITLE_VARIABLES: &[&str] = &["companyName", "presentationTitle"];

const GENERATOR_LINE: &str = "Generated with slidekit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    pub theme: String,
    pub background: String,
    pub title: String,
}

impl FrontMatter {
    pub fn from_variables(vars: &BoundVariables) -> Self {
        let title = TITLE_VARIABLES
            .iter()
            .find_map(|key| non_empty_text(vars, key))
            .unwrap_or(DEFAULT_TITLE)
            .to_string();
        FrontMatter {
            theme: non_empty_text(vars, "theme")
                .unwrap_or(DEFAULT_THEME)
                .to_string(),
            background: non_empty_text(vars, "backgroundImage")
                .unwrap_or(DEFAULT_BACKGROUND)
                .to_string(),
            title,
        }
    }

    /// Header source, delimited by `---` lines, ready for the templating pass.
    pub fn to_source(&self) -> String {
        let theme = inert(&self.theme);
        let background = inert(&self.background);
        let title = inert(&self.title);
        format!(
            "---\n\
             theme: {theme}\n\
             background: {background}\n\
             class: text-center\n\
             highlighter: shiki\n\
             lineNumbers: false\n\
             info: |\n  \
             ## {title}\n  \
             {GENERATOR_LINE}\n\
             drawings:\n  \
             persist: false\n\
             transition: slide-left\n\
             title: {title}\n\
             ---"
        )
    }
}

fn non_empty_text<'a>(vars: &'a BoundVariables, key: &str) -> Option<&'a str> {
    vars.get(key)
        .and_then(|v| v.as_text())
        .filter(|s| !s.trim().is_empty())
}

fn inert(text: &str) -> String {
    format!("{{{{ {} }}}}", string_literal(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidekit_core::BoundValue;

    #[test]
    fn defaults_when_nothing_bound() {
        let fm = FrontMatter::from_variables(&BoundVariables::new());
        assert_eq!(fm.theme, DEFAULT_THEME);
        assert_eq!(fm.background, DEFAULT_BACKGROUND);
        assert_eq!(fm.title, DEFAULT_TITLE);
    }

    #[test]
    fn title_prefers_company_name_then_presentation_title() {
        let mut vars = BoundVariables::new();
        vars.insert("presentationTitle".into(), BoundValue::from("Q3 Review"));
        assert_eq!(FrontMatter::from_variables(&vars).title, "Q3 Review");

        vars.insert("companyName".into(), BoundValue::from("Acme"));
        assert_eq!(FrontMatter::from_variables(&vars).title, "Acme");

        vars.insert("companyName".into(), BoundValue::from("  "));
        assert_eq!(FrontMatter::from_variables(&vars).title, "Q3 Review");
    }

    #[test]
    fn source_has_fixed_keys_and_inert_values() {
        let mut vars = BoundVariables::new();
        vars.insert("theme".into(), BoundValue::from("seriph"));
        let src = FrontMatter::from_variables(&vars).to_source();
        assert!(src.starts_with("---\n"));
        assert!(src.ends_with("\n---"));
        assert!(src.contains("theme: {{ \"seriph\" }}\n"));
        assert!(src.contains("class: text-center\n"));
        assert!(src.contains("transition: slide-left\n"));
        assert!(src.contains("drawings:\n  persist: false\n"));
    }
}

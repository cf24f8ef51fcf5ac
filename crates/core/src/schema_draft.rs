use std::time::Duration;

use thiserror::Error;

use crate::workflow::{AppView, PendingTransition};

pub const DEFAULT_SCHEMA_TEMPLATE: &str = r#"{
  "collection": "users",
  "fields": {
    "id": "string",
    "name": "string",
    "email": "string",
    "age": "number",
    "isActive": "boolean"
  },
  "indexes": ["email", "id"]
}"#;

#[derive(Debug, Error)]
#[error("Invalid JSON schema format")]
pub struct SchemaParseError {
    #[source]
    source: serde_json::Error,
}

impl SchemaParseError {
    #[must_use]
    pub fn location(&self) -> (usize, usize) {
        (self.source.line(), self.source.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDraft {
    text: String,
}

impl Default for SchemaDraft {
    fn default() -> Self {
        Self {
            text: DEFAULT_SCHEMA_TEMPLATE.to_string(),
        }
    }
}

impl SchemaDraft {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    #[must_use]
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn submit(&self, delay: Duration) -> Result<PendingTransition, SchemaParseError> {
        serde_json::from_str::<serde_json::Value>(&self.text)
            .map_err(|source| SchemaParseError { source })?;
        Ok(PendingTransition::new(AppView::Editor, delay))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{SchemaDraft, DEFAULT_SCHEMA_TEMPLATE};
    use crate::workflow::AppView;

    #[test]
    fn default_template_is_valid_json() {
        let draft = SchemaDraft::default();
        assert_eq!(draft.text(), DEFAULT_SCHEMA_TEMPLATE);
        let transition = draft
            .submit(Duration::from_millis(1_000))
            .expect("template should parse");
        assert_eq!(transition.target, AppView::Editor);
        assert_eq!(transition.delay, Duration::from_millis(1_000));
    }

    #[test]
    fn invalid_text_reports_fixed_message_and_keeps_draft() {
        let cases = ["", "{", "{\"collection\": }", "not json", "[1, 2,]"];
        for raw in cases {
            let draft = SchemaDraft::new(raw);
            let err = draft
                .submit(Duration::ZERO)
                .expect_err("invalid json should fail");
            assert_eq!(err.to_string(), "Invalid JSON schema format");
            assert_eq!(draft.text(), raw);
        }
    }

    #[test]
    fn any_well_formed_json_is_accepted() {
        let cases = ["{}", "[]", "42", "\"text\"", "null", "{\"a\": [1, {\"b\": true}]}"];
        for raw in cases {
            assert!(SchemaDraft::new(raw).submit(Duration::ZERO).is_ok(), "{raw}");
        }
    }

    #[test]
    fn parse_error_exposes_location() {
        let draft = SchemaDraft::new("{\n  \"a\": ,\n}");
        let err = draft.submit(Duration::ZERO).expect_err("should fail");
        assert_eq!(err.location().0, 2);
    }

    #[test]
    fn char_count_counts_characters_not_bytes() {
        let draft = SchemaDraft::new("{\"name\":\"Zoë\"}");
        assert_eq!(draft.char_count(), 14);
    }
}

//! Form schemas: which fields a composite form has and how each is validated.

use core_text::ItemKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, trimmed at submit time.
    Text,
    /// Delimited batch parsed into entries (`strict` layers the format check).
    Batch { item: ItemKind, strict: bool },
    /// One of a fixed set of lowercase options; empty falls back to `default`.
    Choice {
        options: Vec<String>,
        default: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl FormSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, required: bool) -> Self {
        self.push(name, FieldKind::Text, required);
        self
    }

    pub fn batch(mut self, name: &str, item: ItemKind, strict: bool, required: bool) -> Self {
        self.push(name, FieldKind::Batch { item, strict }, required);
        self
    }

    pub fn choice(mut self, name: &str, options: &[&str], default: Option<&str>) -> Self {
        let kind = FieldKind::Choice {
            options: options.iter().map(|o| o.to_string()).collect(),
            default: default.map(str::to_string),
        };
        self.push(name, kind, default.is_none());
        self
    }

    fn push(&mut self, name: &str, kind: FieldKind, required: bool) {
        // Later declarations of the same name replace earlier ones.
        self.fields.retain(|f| f.name != name);
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind,
            required,
        });
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Email marketing campaign: comma-separated recipients, optional schedule.
    pub fn email_campaign() -> Self {
        Self::new("email_campaign")
            .text("name", true)
            .text("subject", true)
            .text("content", true)
            .batch("recipients", ItemKind::Email, false, true)
            .text("scheduled_for", false)
    }

    /// Bulk URL queue: newline-separated URLs plus category, priority, and notes.
    pub fn bulk_urls() -> Self {
        Self::new("bulk_urls")
            .batch("urls", ItemKind::Url, false, true)
            .text("category", true)
            .choice("priority", &["low", "medium", "high"], Some("medium"))
            .text("notes", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_schemas_declare_their_batch_fields() {
        let email = FormSchema::email_campaign();
        assert!(matches!(
            email.field("recipients").map(|f| &f.kind),
            Some(FieldKind::Batch { item: ItemKind::Email, .. })
        ));
        let urls = FormSchema::bulk_urls();
        assert!(matches!(
            urls.field("urls").map(|f| &f.kind),
            Some(FieldKind::Batch { item: ItemKind::Url, .. })
        ));
        assert!(!urls.field("priority").unwrap().required);
    }

    #[test]
    fn redeclaring_a_field_replaces_it() {
        let schema = FormSchema::new("f").text("a", false).text("a", true);
        assert_eq!(schema.fields.len(), 1);
        assert!(schema.fields[0].required);
    }
}

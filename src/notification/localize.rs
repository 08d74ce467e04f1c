use std::collections::HashMap;
use std::sync::Arc;

/// Options for resolving a translator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslatorOptions {
    pub locale: String,
    pub namespace: String,
}

/// A pure `(key, params) -> string` function for one locale/namespace.
pub trait Translator: Send + Sync {
    fn t(&self, key: &str, params: &HashMap<&str, String>) -> String;
}

/// Localization provider injected into the dispatcher.
///
/// An explicit dependency rather than a process-wide lookup: dispatch logic
/// stays testable without a live i18n runtime.
pub trait Localizer: Send + Sync {
    fn translator(&self, options: &TranslatorOptions) -> Arc<dyn Translator>;
}

struct TableTranslator {
    table: HashMap<String, String>,
}

impl Translator for TableTranslator {
    fn t(&self, key: &str, params: &HashMap<&str, String>) -> String {
        let Some(template) = self.table.get(key) else {
            // Unknown key: surface the key itself rather than failing the
            // notification.
            return key.to_string();
        };
        let mut out = template.clone();
        for (name, value) in params {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        out
    }
}

/// In-memory localizer backed by static string tables, with a built-in
/// English table. Unknown locales fall back to the first table registered.
pub struct StaticLocalizer {
    tables: HashMap<String, HashMap<String, String>>,
    fallback_locale: String,
}

impl StaticLocalizer {
    pub fn new(fallback_locale: impl Into<String>) -> Self {
        Self {
            tables: HashMap::new(),
            fallback_locale: fallback_locale.into(),
        }
    }

    pub fn with_table(
        mut self,
        locale: impl Into<String>,
        entries: &[(&str, &str)],
    ) -> Self {
        self.tables.insert(
            locale.into(),
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    /// English strings for the lifecycle mails and cards.
    pub fn english() -> Self {
        Self::new("en").with_table(
            "en",
            &[
                ("created_on_behalf.subject", "A request was created for you"),
                (
                    "created_on_behalf.body",
                    "{creator} created a {leave_type} request for you: {range}",
                ),
                ("approved.subject", "Your request was approved"),
                ("approved.body", "Your {leave_type} request for {range} was approved."),
                ("declined.subject", "Your request was declined"),
                ("declined.body", "Your {leave_type} request for {range} was declined."),
                ("approval_needed.subject", "A request needs your approval"),
                (
                    "approval_needed.body",
                    "{requester} requests {leave_type}: {range}",
                ),
                ("canceled.subject", "A request was canceled"),
                (
                    "canceled.body",
                    "The {leave_type} request of {requester} for {range} was canceled.",
                ),
            ],
        )
    }
}

impl Localizer for StaticLocalizer {
    fn translator(&self, options: &TranslatorOptions) -> Arc<dyn Translator> {
        let table = self
            .tables
            .get(&options.locale)
            .or_else(|| self.tables.get(&self.fallback_locale))
            .cloned()
            .unwrap_or_default();
        Arc::new(TableTranslator { table })
    }
}

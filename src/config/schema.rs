use crate::patch::Rule;
use crate::runner::ErrorPolicy;
use crate::xml::query::is_valid_name;
use crate::xml::{PathQuery, QueryError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_EXTENSION: &str = "xml";
pub const DEFAULT_OUTPUT: &str = "output.xml";
pub const DEFAULT_ROOT: &str = "~/.emulationstation/themes/oldroom 720p/";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ThemeConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl ThemeConfig {
    /// The rule table the tool ships with: z-order fixes for the
    /// "oldroom 720p" theme.
    pub fn builtin() -> Self {
        let rule = |id: &str, query: &str, z_index: &str| RuleDefinition {
            id: Some(id.to_string()),
            query: query.to_string(),
            fields: BTreeMap::from([("zIndex".to_string(), z_index.to_string())]),
        };
        Self {
            meta: Metadata {
                name: "oldroom-720p".to_string(),
                description: Some("z-order fixes for the oldroom 720p theme".to_string()),
                root: Some(PathBuf::from(DEFAULT_ROOT)),
                ..Metadata::default()
            },
            rules: vec![
                rule("scanlines", "./view/image[@name='scanlines']", "60"),
                rule("borders", "./view/image[@name='borders']", "70"),
                rule("md-video", "./view/video[@name='md_video']", "50"),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        if let Some(extension) = &self.meta.extension {
            let bare = extension.trim_start_matches('.');
            if bare.is_empty() || bare.contains(|c| c == '/' || c == '\\') {
                issues.push(ValidationIssue::InvalidExtension {
                    extension: extension.clone(),
                });
            }
        }

        for (idx, rule) in self.rules.iter().enumerate() {
            let label = rule.label(idx);

            if rule.query.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule: label.clone(),
                    field: "query",
                });
            } else if let Err(source) = PathQuery::parse(&rule.query) {
                issues.push(ValidationIssue::InvalidQuery {
                    rule: label.clone(),
                    source,
                });
            }

            if rule.fields.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule: label.clone(),
                    field: "fields",
                });
            }

            for name in rule.fields.keys() {
                if !is_valid_name(name) {
                    issues.push(ValidationIssue::InvalidFieldName {
                        rule: label.clone(),
                        name: name.clone(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Compile the rule definitions, in configuration order.
    pub fn rules(&self) -> Result<Vec<Rule>, ValidationError> {
        self.validate()?;
        self.rules
            .iter()
            .enumerate()
            .map(|(idx, definition)| {
                let query =
                    PathQuery::parse(&definition.query).map_err(|source| ValidationError {
                        issues: vec![ValidationIssue::InvalidQuery {
                            rule: definition.label(idx),
                            source,
                        }],
                    })?;
                Ok(Rule {
                    query,
                    fields: definition.fields.clone(),
                })
            })
            .collect()
    }

    pub fn extension(&self) -> &str {
        self.meta
            .extension
            .as_deref()
            .map(|ext| ext.trim_start_matches('.'))
            .unwrap_or(DEFAULT_EXTENSION)
    }

    pub fn output(&self) -> PathBuf {
        self.meta
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Directory scanned for theme files; a leading `~` is expanded
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub on_error: ErrorPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    #[serde(default)]
    pub id: Option<String>,
    pub query: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl RuleDefinition {
    fn label(&self, idx: usize) -> String {
        match &self.id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => format!("rules[{idx}]"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule: String,
        field: &'static str,
    },
    InvalidQuery {
        rule: String,
        source: QueryError,
    },
    InvalidFieldName {
        rule: String,
        name: String,
    },
    InvalidExtension {
        extension: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "theme config contains no rules"),
            ValidationIssue::MissingField { rule, field } => {
                write!(f, "rule '{rule}' missing required field '{field}'")
            }
            ValidationIssue::InvalidQuery { rule, source } => {
                write!(f, "rule '{rule}' has an invalid query: {source}")
            }
            ValidationIssue::InvalidFieldName { rule, name } => {
                write!(f, "rule '{rule}' sets '{name}', which is not a valid element name")
            }
            ValidationIssue::InvalidExtension { extension } => {
                write!(f, "invalid markup extension '{extension}'")
            }
        }
    }
}

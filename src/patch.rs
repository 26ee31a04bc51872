//! Field patching - force child-element text onto matched nodes
//!
//! A [`Rule`] pairs a [`PathQuery`] with a field map. For each node the query
//! matches, every field is either updated (all existing children with that
//! name get the new text) or inserted (one new child appended last).

use crate::xml::{Element, PathQuery};
use std::collections::BTreeMap;
use std::fmt;

/// A compiled rule: which nodes to touch and which child values to force.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub query: PathQuery,
    pub fields: BTreeMap<String, String>,
}

impl Rule {
    pub fn new(query: PathQuery) -> Self {
        Self {
            query,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// One mutation made to a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    /// An existing child's text was overwritten
    Updated {
        field: String,
        old: Option<String>,
        new: String,
    },
    /// The child was missing and has been appended
    Inserted { field: String, value: String },
}

impl FieldChange {
    pub fn field(&self) -> &str {
        match self {
            FieldChange::Updated { field, .. } | FieldChange::Inserted { field, .. } => field,
        }
    }

    /// True when the change left the text as it was.
    pub fn is_noop(&self) -> bool {
        match self {
            FieldChange::Updated { old, new, .. } => old.as_deref() == Some(new.as_str()),
            FieldChange::Inserted { .. } => false,
        }
    }
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldChange::Updated { field, old, new } => write!(
                f,
                "Setting <{field}>{}</{field}> to {new}",
                old.as_deref().unwrap_or("")
            ),
            FieldChange::Inserted { field, value } => {
                write!(f, "Inserting <{field}>{value}</{field}>")
            }
        }
    }
}

/// Force `value` onto the `field` children of `node`.
///
/// Every existing child named `field` is overwritten, not just the first; a
/// node with duplicated fields reports one change per duplicate.
pub fn apply_field(node: &mut Element, field: &str, value: &str) -> Vec<FieldChange> {
    let mut changes: Vec<FieldChange> = node
        .children_named_mut(field)
        .map(|child| {
            let old = child.text.replace(value.to_string());
            FieldChange::Updated {
                field: field.to_string(),
                old,
                new: value.to_string(),
            }
        })
        .collect();

    if changes.is_empty() {
        node.push_child(Element::new(field).with_text(value));
        changes.push(FieldChange::Inserted {
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    changes
}

/// Apply one rule to every node it matches under `root`.
pub fn apply_rule(root: &mut Element, rule: &Rule) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    rule.query.for_each_match_mut(root, |node| {
        for (field, value) in &rule.fields {
            changes.extend(apply_field(node, field, value));
        }
    });
    changes
}

/// Changes made by one rule, kept with the query that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub query: PathQuery,
    pub changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub outcomes: Vec<RuleOutcome>,
}

impl PatchReport {
    pub fn changes(&self) -> impl Iterator<Item = &FieldChange> {
        self.outcomes.iter().flat_map(|outcome| outcome.changes.iter())
    }

    pub fn change_count(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.changes.len()).sum()
    }

    pub fn inserted_count(&self) -> usize {
        self.changes()
            .filter(|change| matches!(change, FieldChange::Inserted { .. }))
            .count()
    }

    /// True when applying the rules left every value as it was.
    pub fn is_noop(&self) -> bool {
        self.changes().all(FieldChange::is_noop)
    }
}

/// Apply all rules in order.
pub fn apply_rules(root: &mut Element, rules: &[Rule]) -> PatchReport {
    let outcomes = rules
        .iter()
        .map(|rule| RuleOutcome {
            query: rule.query.clone(),
            changes: apply_rule(root, rule),
        })
        .collect();
    PatchReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_str;

    fn scanlines_rule() -> Rule {
        Rule::new(PathQuery::parse("./view/image[@name='scanlines']").unwrap())
            .field("zIndex", "60")
    }

    #[test]
    fn inserts_missing_field_as_last_child() {
        let mut node = Element::new("image")
            .with_attribute("name", "scanlines")
            .with_child(Element::new("path").with_text("./scanlines.png"));

        let changes = apply_field(&mut node, "zIndex", "60");

        assert_eq!(
            changes,
            vec![FieldChange::Inserted {
                field: "zIndex".to_string(),
                value: "60".to_string(),
            }]
        );
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[1], Element::new("zIndex").with_text("60"));
    }

    #[test]
    fn updates_every_existing_field() {
        let mut node = Element::new("image")
            .with_child(Element::new("zIndex").with_text("10"))
            .with_child(Element::new("path"))
            .with_child(Element::new("zIndex").with_text("20"));

        let changes = apply_field(&mut node, "zIndex", "60");

        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[0].to_string(),
            "Setting <zIndex>10</zIndex> to 60"
        );
        assert_eq!(
            changes[1].to_string(),
            "Setting <zIndex>20</zIndex> to 60"
        );
        let values: Vec<_> = node.children_named("zIndex").map(|c| c.text()).collect();
        assert_eq!(values, vec![Some("60"), Some("60")]);
        assert_eq!(node.children.len(), 3);
    }

    #[test]
    fn changes_name_their_field() {
        let mut node = Element::new("video").with_child(Element::new("zIndex").with_text("80"));
        let mut changes = apply_field(&mut node, "zIndex", "50");
        changes.extend(apply_field(&mut node, "visible", "true"));

        let fields: Vec<&str> = changes.iter().map(FieldChange::field).collect();
        assert_eq!(fields, vec!["zIndex", "visible"]);
    }

    #[test]
    fn inserted_field_follows_tail_text() {
        let mut doc = parse_str("<image><path>a.png</path>note</image>").unwrap();
        apply_field(&mut doc.root, "zIndex", "60");

        assert_eq!(doc.root.children[0].tail.as_deref(), Some("note"));
        assert_eq!(
            doc.root.to_pretty_string(),
            "<image>\n\t<path>a.png</path>\n\tnote\n\t<zIndex>60</zIndex>\n</image>"
        );
    }

    #[test]
    fn empty_existing_field_is_updated_not_duplicated() {
        let mut node = Element::new("image").with_child(Element::new("zIndex"));
        let changes = apply_field(&mut node, "zIndex", "60");

        assert_eq!(changes[0].to_string(), "Setting <zIndex></zIndex> to 60");
        assert_eq!(node.children.len(), 1);
    }

    #[test]
    fn rule_inserts_field_into_matching_node() {
        let mut doc =
            parse_str(r#"<theme><view><image name="scanlines"/></view></theme>"#).unwrap();

        let changes = apply_rule(&mut doc.root, &scanlines_rule());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].to_string(), "Inserting <zIndex>60</zIndex>");
        let expected = parse_str(
            r#"<theme><view><image name="scanlines"><zIndex>60</zIndex></image></view></theme>"#,
        )
        .unwrap();
        assert_eq!(doc.root, expected.root);
    }

    #[test]
    fn rule_overwrites_existing_field_without_duplicate() {
        let mut doc = parse_str(
            r#"<theme><view><image name="scanlines"><zIndex>10</zIndex></image></view></theme>"#,
        )
        .unwrap();

        apply_rule(&mut doc.root, &scanlines_rule());

        let image = &doc.root.children[0].children[0];
        assert_eq!(image.children.len(), 1);
        assert_eq!(image.children[0].text(), Some("60"));
    }

    #[test]
    fn rules_are_idempotent() {
        let rules = vec![
            scanlines_rule(),
            Rule::new(PathQuery::parse("./view/video[@name='md_video']").unwrap())
                .field("zIndex", "50"),
        ];
        let mut doc = parse_str(
            r#"<theme>
                <view name="a"><image name="scanlines"/><video name="md_video"><zIndex>1</zIndex></video></view>
                <view name="b"><image name="scanlines"/></view>
            </theme>"#,
        )
        .unwrap();

        let first = apply_rules(&mut doc.root, &rules);
        let after_first = doc.clone();
        let second = apply_rules(&mut doc.root, &rules);

        assert_eq!(first.change_count(), 3);
        assert_eq!(first.inserted_count(), 2);
        assert!(!first.is_noop());
        assert_eq!(second.inserted_count(), 0);
        assert!(second.is_noop());
        assert_eq!(doc, after_first);
    }

    #[test]
    fn unmatched_rule_changes_nothing() {
        let mut doc = parse_str(r#"<theme><view><image name="borders"/></view></theme>"#).unwrap();
        let before = doc.clone();

        let report = apply_rules(&mut doc.root, &[scanlines_rule()]);

        assert_eq!(report.change_count(), 0);
        assert_eq!(doc, before);
    }
}

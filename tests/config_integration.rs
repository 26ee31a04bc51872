//! Integration tests for the rule configuration
//!
//! Tests loading, validation, and running with a config file

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use theme_patcher::config::{
    load_from_path, load_from_str, ConfigError, ThemeConfig, ValidationIssue,
};
use theme_patcher::{run, ErrorPolicy, RunOptions};

#[test]
fn shipped_rule_file_matches_builtin_rules() {
    let config = load_from_path("rules/oldroom-720p.toml").expect("load shipped rules");
    let builtin = ThemeConfig::builtin();

    assert_eq!(config.meta.name, "oldroom-720p");
    assert_eq!(config.meta.root, builtin.meta.root);
    assert_eq!(config.meta.on_error, ErrorPolicy::Abort);
    assert_eq!(config.rules().unwrap(), builtin.rules().unwrap());
}

#[test]
fn test_load_config_basic() {
    let toml = r#"
[meta]
name = "test-rules"
description = "Test rule set"
root = "themes"
extension = "xml"
output = "out/last.xml"

[[rules]]
id = "scanlines"
query = "./view/image[@name='scanlines']"

[rules.fields]
zIndex = "60"
visible = "true"
"#;

    let config = load_from_str(toml).expect("Failed to parse config");

    assert_eq!(config.meta.name, "test-rules");
    assert_eq!(config.meta.root, Some(PathBuf::from("themes")));
    assert_eq!(config.output(), PathBuf::from("out/last.xml"));
    assert_eq!(config.rules.len(), 1);
    assert_eq!(config.rules[0].id.as_deref(), Some("scanlines"));

    let rules = config.rules().unwrap();
    let fields: Vec<_> = rules[0].fields.iter().collect();
    assert_eq!(
        fields,
        vec![
            (&"visible".to_string(), &"true".to_string()),
            (&"zIndex".to_string(), &"60".to_string()),
        ]
    );

    let options = RunOptions::from_config(&config);
    assert_eq!(options.root, PathBuf::from("themes"));
    assert_eq!(options.output, Some(PathBuf::from("out/last.xml")));
    assert_eq!(options.extension, "xml");
}

#[test]
fn test_invalid_query_is_rejected() {
    let toml = r#"
[[rules]]
id = "descendant"
query = ".//image[@name='scanlines']"
fields = { zIndex = "60" }

[[rules]]
query = "./view/image[@name='borders']"
"#;

    let err = load_from_str(toml).unwrap_err();
    let Some(source) = err.validation() else {
        panic!("expected validation error, got {err}");
    };
    assert_eq!(source.issues.len(), 2);
    assert!(matches!(
        &source.issues[0],
        ValidationIssue::InvalidQuery { rule, .. } if rule == "descendant"
    ));
    assert!(matches!(
        &source.issues[1],
        ValidationIssue::MissingField { rule, field: "fields" } if rule == "rules[1]"
    ));
}

#[test]
fn test_unknown_policy_is_a_toml_error() {
    let toml = r#"
[meta]
on_error = "retry"

[[rules]]
query = "./view"
fields = { a = "b" }
"#;
    assert!(matches!(
        load_from_str(toml),
        Err(ConfigError::Toml(_))
    ));
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    let err = load_from_path(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("missing.toml"));
}

#[test]
fn test_run_with_config_file() {
    let dir = TempDir::new().unwrap();
    let themes = dir.path().join("themes");
    fs::create_dir_all(themes.join("megadrive")).unwrap();
    fs::write(
        themes.join("megadrive/theme.thm"),
        r#"<theme><view><text name="title"><color>FFFFFF</color></text></view></theme>"#,
    )
    .unwrap();
    fs::write(themes.join("megadrive/notes.xml"), "not parsed").unwrap();

    let config_path = dir.path().join("rules.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[meta]
root = "{}"
extension = ".thm"
output = "{}"

[[rules]]
query = "./view/text[@name='title']"
fields = {{ color = "000000", fontSize = "0.05" }}
"#,
            themes.display(),
            dir.path().join("last.xml").display()
        ),
    )
    .unwrap();

    let config = load_from_path(&config_path).unwrap();
    let rules = config.rules().unwrap();
    let summary = run(&rules, &RunOptions::from_config(&config), |_| {}).unwrap();

    assert_eq!(summary.files_processed, 1);
    assert_eq!(summary.changes, 2);
    assert_eq!(summary.inserted, 1);
    let output = fs::read_to_string(dir.path().join("last.xml")).unwrap();
    assert!(output.contains("\t\t\t<color>000000</color>\n\t\t\t<fontSize>0.05</fontSize>"));
}

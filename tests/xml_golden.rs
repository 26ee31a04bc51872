use std::fs;
use theme_patcher::config::ThemeConfig;
use theme_patcher::{apply_rules, parse_file, parse_str, to_pretty_string, FieldChange};

fn load_fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{name}"))
        .unwrap_or_else(|err| panic!("failed to load fixture {name}: {err}"))
}

#[test]
fn builtin_rules_render_expected_fixture() {
    let input = load_fixture("theme.xml.input");
    let expected = load_fixture("theme.xml.expected");
    let rules = ThemeConfig::builtin().rules().expect("rules");

    let mut document = parse_str(&input).expect("parse");
    let report = apply_rules(&mut document.root, &rules);

    let trace: Vec<String> = report.changes().map(ToString::to_string).collect();
    assert_eq!(
        trace,
        vec![
            "Inserting <zIndex>60</zIndex>",
            "Setting <zIndex>35</zIndex> to 70",
            "Setting <zIndex>80</zIndex> to 50",
        ]
    );
    assert_eq!(to_pretty_string(&document), expected);
}

#[test]
fn expected_fixture_is_a_fixed_point() {
    let expected = load_fixture("theme.xml.expected");
    let rules = ThemeConfig::builtin().rules().expect("rules");

    let mut document = parse_str(&expected).expect("parse");
    let report = apply_rules(&mut document.root, &rules);

    assert!(report.is_noop());
    assert!(report
        .changes()
        .all(|change| matches!(change, FieldChange::Updated { .. })));
    assert_eq!(to_pretty_string(&document), expected);
}

#[test]
fn rendering_drops_comments_and_blank_lines() {
    let input = load_fixture("theme.xml.input");
    let document = parse_str(&input).expect("parse");
    let rendered = to_pretty_string(&document);

    assert!(!rendered.contains("<!--"));
    assert!(rendered.lines().all(|line| !line.trim().is_empty()));
    assert!(rendered
        .lines()
        .skip(1)
        .all(|line| !line.starts_with(' ')));
}

#[test]
fn latin1_fixture_is_decoded_and_rendered_as_utf8() {
    let rules = ThemeConfig::builtin().rules().expect("rules");

    let mut document = parse_file("tests/fixtures/latin1.xml.input").expect("parse");
    let report = apply_rules(&mut document.root, &rules);
    assert_eq!(report.inserted_count(), 1);

    let rendered = to_pretty_string(&document);
    assert_eq!(
        rendered,
        "<?xml version=\"1.0\" ?>\n\
         <theme>\n\
         \t<view name=\"caf\u{e9}\">\n\
         \t\t<image name=\"scanlines\">\n\
         \t\t\t<path>./art/d\u{e9}cor.png</path>\n\
         \t\t\t<zIndex>60</zIndex>\n\
         \t\t</image>\n\
         \t</view>\n\
         </theme>"
    );
    assert_eq!(parse_str(&rendered).expect("reparse").root, document.root);
}

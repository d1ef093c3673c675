//! End-to-end template resolution tests through the public API

use anatomy::{Anatomy, AnatomyConfig, Context, ConfigError, Platform, Value};
use pretty_assertions::assert_eq;

const CONFIG: &str = r#"
    project = "demo"

    [roots.work]
    windows = "P:/proj"
    linux = "/mnt/proj"

    [templates]
    version_padding = 3

    [templates.work]
    folder = "{root[work]}/{project[name]}/{task[name]}"
    file = "{project[name]}_{task[name]}<_{comment}>_v{version:0>{@version_padding}}.ma"
    path = "{root[work]}/{project[name]}/{task[name]}/{project[name]}_v{version:0>{@version_padding}}.ma"
"#;

fn build() -> Anatomy {
    let config = AnatomyConfig::from_str(CONFIG).expect("Should parse");
    Anatomy::with_platform(config, Platform::Windows).expect("Should build")
}

fn full_context() -> Context {
    Context::new()
        .with("project", Value::map([("name", Value::from("demo"))]))
        .with("task", Value::map([("name", Value::from("lighting"))]))
        .with("version", 7)
}

#[test]
fn test_fully_solved_template_with_root() {
    let resolved = build().resolve_all(&full_context());
    let folder = resolved.template(&["work", "folder"]).expect("Should read");
    assert_eq!(folder.text(), "P:/proj/demo/lighting");
    assert_eq!(folder.rootless_text(), "{root[work]}/demo/lighting");
    assert!(folder.solved());
}

#[test]
fn test_missing_context_key_stays_visible() {
    let context = Context::new()
        .with("project", Value::map([("name", Value::from("demo"))]))
        .with("version", 7);
    let resolved = build().resolve_all_lenient(&context);
    let folder = resolved.template(&["work", "folder"]).expect("Should read");
    assert_eq!(folder.text(), "P:/proj/demo/{task[name]}");
    assert!(!folder.solved());
    assert_eq!(folder.missing_keys(), &["task[name]".to_string()]);
}

#[test]
fn test_optional_group_elided_without_comment() {
    let resolved = build().resolve_all(&full_context());
    let file = resolved.template(&["work", "file"]).expect("Should read");
    assert_eq!(file.text(), "demo_lighting_v007.ma");
    assert!(file.solved());
}

#[test]
fn test_optional_group_kept_with_comment() {
    let context = full_context().with("comment", "wip");
    let resolved = build().resolve_all(&context);
    let file = resolved.template(&["work", "file"]).expect("Should read");
    assert_eq!(file.text(), "demo_lighting_wip_v007.ma");
    assert!(file.solved());
}

#[test]
fn test_optional_group_monotonicity() {
    // Removing the key an optional group depends on removes exactly that
    // group's content and never changes solved
    let with_comment = build().resolve_all(&full_context().with("comment", "wip"));
    let without_comment = build().resolve_all(&full_context());
    let kept = with_comment.template(&["work", "file"]).expect("Should read");
    let dropped = without_comment
        .template(&["work", "file"])
        .expect("Should read");
    assert_eq!(kept.text().replace("_wip", ""), dropped.text());
    assert_eq!(kept.solved(), dropped.solved());
}

#[test]
fn test_resolution_idempotent() {
    let anatomy = build();
    let context = full_context();
    let first = anatomy.resolve_all(&context);
    let second = anatomy.resolve_all(&context);
    let a = first.template(&["work", "path"]).expect("Should read");
    let b = second.template(&["work", "path"]).expect("Should read");
    assert_eq!(a.text(), b.text());
    assert_eq!(a.rootless_text(), b.rootless_text());
}

#[test]
fn test_inner_reference_expanded_at_load() {
    let resolved = build().resolve_all_lenient(&full_context());
    let file = resolved.template(&["work", "file"]).expect("Should read");
    // `{@version_padding}` became `3` when the templates were loaded
    assert_eq!(
        file.template(),
        "{project[name]}_{task[name]}<_{comment}>_v{version:0>3}.ma"
    );
}

#[test]
fn test_direct_inner_cycle_rejected_at_load() {
    let result = Anatomy::from_toml_str(
        r#"
        [templates.work]
        file = "{@file}"
        "#,
    );
    assert!(matches!(result, Err(ConfigError::InnerReferenceCycle { .. })));
}

#[test]
fn test_indirect_inner_cycle_rejected_at_load() {
    let result = Anatomy::from_toml_str(
        r#"
        [templates]
        a = "{@b}"
        b = "{@a}"
        "#,
    );
    assert!(matches!(result, Err(ConfigError::InnerReferenceCycle { .. })));
}

#[test]
fn test_unknown_inner_reference_rejected_at_load() {
    let result = Anatomy::from_toml_str(
        r#"
        [templates.work]
        file = "{@nonexistent}.ma"
        "#,
    );
    assert!(matches!(
        result,
        Err(ConfigError::UnknownInnerReference { .. })
    ));
}

#[test]
fn test_strict_read_fails_on_unsolved() {
    let context = Context::new().with("project", Value::map([("name", Value::from("demo"))]));
    let resolved = build().resolve_all(&context);
    let err = resolved
        .template(&["work", "folder"])
        .expect_err("Should fail");
    let message = err.to_string();
    assert!(message.contains("is unsolved"));
    assert!(message.contains("task[name]"));
}

#[test]
fn test_strict_error_message_shape() {
    let resolved = build().resolve_all(&Context::new().with("version", 7));
    let err = resolved
        .template(&["work", "file"])
        .expect_err("Should fail");
    insta::assert_snapshot!(
        err.to_string(),
        @r###"anatomy template "{project[name]}_{task[name]}<_{comment}>_v{version:0>3}.ma" is unsolved. Missing keys: "project[name]", "task[name]", "comment"."###
    );
}

#[test]
fn test_strict_and_lenient_agree_on_solved_leaves() {
    let anatomy = build();
    let context = full_context();
    let strict = anatomy.resolve_all(&context);
    let lenient = anatomy.resolve_all_lenient(&context);
    for (name, leaf) in strict.leaves() {
        if leaf.solved() {
            let segments: Vec<&str> = name.split('.').collect();
            let other = lenient.try_template(&segments).expect("Should exist");
            assert_eq!(leaf.text(), other.text());
        }
    }
}

#[test]
fn test_missing_anatomy_key_is_structured() {
    let resolved = build().resolve_all(&full_context());
    let err = resolved
        .template(&["publish", "folder"])
        .expect_err("Should fail");
    assert_eq!(
        err.to_string(),
        "anatomy key does not exist: `templates[\"publish\"]`"
    );
}

#[test]
fn test_solved_only_projection() {
    let context = Context::new()
        .with("project", Value::map([("name", Value::from("demo"))]))
        .with("version", 7);
    let resolved = build().resolve_all_lenient(&context);
    let solved = resolved.solved_only();
    // Every leaf needed `task[name]` except the shared padding default
    assert!(solved.try_template(&["work", "folder"]).is_none());
    assert!(solved.try_template(&["version_padding"]).is_some());
}

#[test]
fn test_invalid_type_recorded_not_raised() {
    let context = full_context().with("task", "not a mapping");
    let resolved = build().resolve_all_lenient(&context);
    let folder = resolved.template(&["work", "folder"]).expect("Should read");
    assert!(!folder.solved());
    assert_eq!(
        folder.invalid_types().get("task"),
        Some(&"string".to_string())
    );
}

#[test]
fn test_root_round_trip_through_strip() {
    let anatomy = build();
    let resolved = anatomy.resolve_all(&full_context());
    let folder = resolved.template(&["work", "folder"]).expect("Should read");
    // Stripping the built path recovers the formattable root fragment
    assert_eq!(
        anatomy.strip_to_key(folder.text()),
        Some(folder.rootless_text().to_string())
    );
}

#[test]
fn test_fill_root_reverses_rootless() {
    let anatomy = build();
    let resolved = anatomy.resolve_all(&full_context());
    let path = resolved.template(&["work", "path"]).expect("Should read");
    assert_eq!(
        anatomy.fill_root(path.rootless_text()),
        Some(path.text().to_string())
    );
}

#[test]
fn test_used_values_mirror_bracket_paths() {
    let resolved = build().resolve_all(&full_context());
    let folder = resolved.template(&["work", "folder"]).expect("Should read");
    let used = folder.used_values();
    match used.get("root") {
        Some(Value::Map(root)) => {
            assert_eq!(root.get("work"), Some(&Value::Str("P:/proj".to_string())));
        }
        other => panic!("Expected nested root map, got {:?}", other),
    }
    match used.get("task") {
        Some(Value::Map(task)) => {
            assert_eq!(task.get("name"), Some(&Value::Str("lighting".to_string())));
        }
        other => panic!("Expected nested task map, got {:?}", other),
    }
}

#[test]
fn test_lenient_tree_aggregates() {
    let resolved = build().resolve_all_lenient(&Context::new());
    let missing = resolved.missing_keys();
    assert!(missing.contains(&"project[name]".to_string()));
    assert!(missing.contains(&"task[name]".to_string()));
    assert!(missing.contains(&"version".to_string()));
}

//! Property-based tests for block annotations.
//!
//! Block names and content are generated so that the template itself always
//! compiles, the properties then check how the rendered block is wrapped.

use proptest::prelude::*;
use template_unwind::unwind::{interpolate, Role};
use template_unwind::{value, Engine, ErrorKind, Request, UnwindMode};

/// Generate a block name, the prefix keeps it clear of keywords.
fn block_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("b_[a-z0-9_]{0,8}").expect("valid regex")
}

/// Generate a template name.
fn template_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,8}(\\.html)?").expect("valid regex")
}

/// Generate plain text that contains neither markup nor line breaks.
fn inline_content_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 .,!?]{0,30}").expect("valid regex")
}

/// Generate text with markup or line breaks.
fn block_content_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-z ]{0,10}<[a-z]{1,5}>[a-z ]{0,10}").expect("valid regex"),
        prop::string::string_regex("[a-z ]{0,10}\n[a-z ]{0,10}").expect("valid regex"),
    ]
}

/// Generate a selector that is not one of the known modes.
fn unknown_selector_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,10}")
        .expect("valid regex")
        .prop_filter("not a mode", |s| s != "comments" && s != "elements")
}

fn render_block(name: &str, content: &str, mode: UnwindMode) -> template_unwind::Result<String> {
    let source = format!("{{% block {name} %}}{content}{{% endblock %}}");
    Engine::new()
        .compile(source)?
        .render(value! {})
        .with_unwind_mode(mode)
        .to_string()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    /// Plain text blocks are annotated inline in both debug modes.
    #[test]
    fn prop_inline_block(name in block_name_strategy(), content in inline_content_strategy()) {
        let exp = format!("{{% block {name} [<anonymous>] %}}{content}{{% endblock %}}");
        prop_assert_eq!(&render_block(&name, &content, UnwindMode::Comments).unwrap(), &exp);
        prop_assert_eq!(&render_block(&name, &content, UnwindMode::Elements).unwrap(), &exp);
    }

    /// Blocks with markup or line breaks use the multi-line annotation.
    #[test]
    fn prop_multiline_block(name in block_name_strategy(), content in block_content_strategy()) {
        prop_assert_eq!(Role::for_content(&content), Role::Block);
        let exp = format!(
            "<!-- {{% block {name} [<anonymous>] %}} -->\n{content}\n<!-- {{% endblock {name} [<anonymous>] %}} -->\n"
        );
        prop_assert_eq!(render_block(&name, &content, UnwindMode::Comments).unwrap(), exp);
    }

    /// Annotations follow the mode's format for every role.
    #[test]
    fn prop_annotation_matches_format(
        name in block_name_strategy(),
        content in prop_oneof![inline_content_strategy(), block_content_strategy()],
        mode in prop_oneof![Just(UnwindMode::Comments), Just(UnwindMode::Elements)],
    ) {
        let format = mode.formats().get(Role::for_content(&content));
        let exp = interpolate(format, &name, &content, "<anonymous>");
        prop_assert_eq!(render_block(&name, &content, mode).unwrap(), exp);
    }

    /// Without a debug mode the block content is emitted unchanged.
    #[test]
    fn prop_none_mode_unchanged(
        name in block_name_strategy(),
        content in prop_oneof![inline_content_strategy(), block_content_strategy()],
    ) {
        prop_assert_eq!(render_block(&name, &content, UnwindMode::None).unwrap(), content);
    }

    /// The annotation names the template that provided the override.
    #[test]
    fn prop_override_reports_child(
        (base, child) in (template_name_strategy(), template_name_strategy())
            .prop_filter("distinct names", |(a, b)| a != b),
        name in block_name_strategy(),
        content in inline_content_strategy(),
    ) {
        let mut engine = Engine::new();
        engine.add_template(base.clone(), format!("{{% block {name} %}}base{{% endblock %}}")).unwrap();
        engine.add_template(
            child.clone(),
            format!("{{% extends \"{base}\" %}}{{% block {name} %}}{content}{{% endblock %}}"),
        ).unwrap();
        let result = engine
            .get_template(&child)
            .unwrap()
            .render(value! {})
            .with_unwind_mode(UnwindMode::Comments)
            .to_string()
            .unwrap();
        prop_assert_eq!(result, format!("{{% block {name} [{child}] %}}{content}{{% endblock %}}"));
    }

    /// Unknown selectors fail the render.
    #[test]
    fn prop_unknown_selector(selector in unknown_selector_strategy()) {
        let request = Request::new().with_query("unwind-template-as", selector);
        let err = Engine::new()
            .compile("{% block a %}x{% endblock %}")
            .unwrap()
            .render(value! {})
            .with_request(&request)
            .to_string()
            .unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::UnknownMode);
    }
}

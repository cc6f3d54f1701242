mod helpers;

use template_unwind::{value, Engine, ErrorKind, Request, Result, UnwindMode};

use crate::helpers::Writer;

fn engine() -> Engine<'static> {
    let mut engine = Engine::new();
    engine
        .add_template("base.html", "{% block content %}{% endblock %}")
        .unwrap();
    engine
        .add_template(
            "page.html",
            "{% extends \"base.html\" %}{% block content %}<p>hi</p>{% endblock %}",
        )
        .unwrap();
    engine
        .add_template(
            "short.html",
            "{% extends \"base.html\" %}{% block content %}hi{% endblock %}",
        )
        .unwrap();
    engine
}

fn render(engine: &Engine<'_>, name: &str, mode: UnwindMode) -> Result<String> {
    engine
        .get_template(name)
        .unwrap()
        .render(value! {})
        .with_unwind_mode(mode)
        .to_string()
}

#[test]
fn unwind_none() -> Result<()> {
    let engine = engine();
    assert_eq!(render(&engine, "page.html", UnwindMode::None)?, "<p>hi</p>");
    Ok(())
}

#[test]
fn unwind_comments_block() -> Result<()> {
    let engine = engine();
    assert_eq!(
        render(&engine, "page.html", UnwindMode::Comments)?,
        "<!-- {% block content [page.html] %} -->\n\
         <p>hi</p>\n\
         <!-- {% endblock content [page.html] %} -->\n"
    );
    Ok(())
}

#[test]
fn unwind_comments_block_in_element() -> Result<()> {
    let engine = engine();
    assert_eq!(
        render(&engine, "short.html", UnwindMode::Comments)?,
        "{% block content [short.html] %}hi{% endblock %}"
    );
    Ok(())
}

#[test]
fn unwind_elements_block() -> Result<()> {
    let engine = engine();
    assert_eq!(
        render(&engine, "page.html", UnwindMode::Elements)?,
        "<django:block name=\"content\" template=\"page.html\">\n    \
         <p>hi</p>\n\
         </django:block>\n"
    );
    Ok(())
}

#[test]
fn unwind_elements_block_in_element() -> Result<()> {
    let engine = engine();
    assert_eq!(
        render(&engine, "short.html", UnwindMode::Elements)?,
        "{% block content [short.html] %}hi{% endblock %}"
    );
    Ok(())
}

#[test]
fn unwind_multiline_plain_text_is_block() -> Result<()> {
    let result = Engine::new()
        .compile("{% block a %}one\ntwo{% endblock %}")?
        .render(value! {})
        .with_unwind_mode(UnwindMode::Comments)
        .to_string()?;
    assert_eq!(
        result,
        "<!-- {% block a [<anonymous>] %} -->\none\ntwo\n<!-- {% endblock a [<anonymous>] %} -->\n"
    );
    Ok(())
}

#[test]
fn unwind_anonymous_template() -> Result<()> {
    let result = Engine::new()
        .compile("{% block a %}x{% endblock %}")?
        .render(value! {})
        .with_unwind_mode(UnwindMode::Comments)
        .to_string()?;
    assert_eq!(result, "{% block a [<anonymous>] %}x{% endblock %}");
    Ok(())
}

#[test]
fn unwind_reports_declaring_template() -> Result<()> {
    let mut engine = Engine::new();
    engine.add_template("base", "{% block a %}A{% endblock %}{% block b %}B{% endblock %}")?;
    engine.add_template("page", "{% extends \"base\" %}{% block a %}A2{% endblock %}")?;
    assert_eq!(
        render(&engine, "page", UnwindMode::Comments)?,
        "{% block a [page] %}A2{% endblock %}{% block b [base] %}B{% endblock %}"
    );
    Ok(())
}

#[test]
fn unwind_raw_content_outside_blocks_untouched() -> Result<()> {
    let mut engine = Engine::new();
    engine.add_template("base", "<html>{% block a %}x{% endblock %}</html>")?;
    assert_eq!(
        render(&engine, "base", UnwindMode::Elements)?,
        "<html>{% block a [base] %}x{% endblock %}</html>"
    );
    Ok(())
}

#[test]
fn unwind_nested_block_path() -> Result<()> {
    let mut engine = Engine::new();
    engine.add_template(
        "base.html",
        "{% block outer %}<div>{% block inner %}x{% endblock %}</div>{% endblock %}",
    )?;
    assert_eq!(
        render(&engine, "base.html", UnwindMode::Comments)?,
        "<!-- {% block outer [base.html] %} -->\n\
         <div>{% block outer/inner [base.html] %}x{% endblock %}</div>\n\
         <!-- {% endblock outer [base.html] %} -->\n"
    );
    Ok(())
}

#[test]
fn unwind_include_path() -> Result<()> {
    let mut engine = Engine::new();
    engine.add_template("part", "{% block inner %}p{% endblock %}")?;
    engine.add_template("base", "{% block outer %}{% include \"part\" %}{% endblock %}")?;
    assert_eq!(
        render(&engine, "base", UnwindMode::Comments)?,
        "{% block outer [base] %}{% block outer/inner [part] %}p{% endblock %}{% endblock %}"
    );
    Ok(())
}

#[test]
fn unwind_comments_super() -> Result<()> {
    let mut engine = Engine::new();
    engine.add_template("base.html", "{% block title %}Site{% endblock %}")?;
    engine.add_template(
        "page.html",
        "{% extends \"base.html\" %}{% block title %}Page {{ block.super }}{% endblock %}",
    )?;
    assert_eq!(
        render(&engine, "page.html", UnwindMode::Comments)?,
        "<!-- {% block title [page.html] %} -->\n\
         Page <!-- {{ block.super title [base.html] }} -->\n\
         {% block title [base.html] %}Site{% endblock %}\n\
         <!-- {{ /block.super title [base.html] }} -->\n\
         \n\
         <!-- {% endblock title [page.html] %} -->\n"
    );
    Ok(())
}

#[test]
fn unwind_elements_super() -> Result<()> {
    let mut engine = Engine::new();
    engine.add_template("base", "{% block a %}<b>x</b>{% endblock %}")?;
    engine.add_template(
        "page",
        "{% extends \"base\" %}{% block a %}<p>{{ block.super }}</p>{% endblock %}",
    )?;

    let inner = "<django:block name=\"a\" template=\"base\">\n    <b>x</b>\n</django:block>\n";
    let sup = format!(
        "<django:block-super name=\"a\" template=\"base\">\n    {inner}\n</django:block-super>\n"
    );
    let exp = format!("<django:block name=\"a\" template=\"page\">\n    <p>{sup}</p>\n</django:block>\n");
    assert_eq!(render(&engine, "page", UnwindMode::Elements)?, exp);
    Ok(())
}

#[test]
fn unwind_super_empty_base() -> Result<()> {
    let mut engine = Engine::new();
    engine.add_template("base", "{% block a %}{% endblock %}")?;
    engine.add_template(
        "child",
        "{% extends \"base\" %}{% block a %}x{{ block.super }}{% endblock %}",
    )?;
    let tests = [
        (UnwindMode::None, "x"),
        (UnwindMode::Comments, "{% block a [child] %}x{% endblock %}"),
        (UnwindMode::Elements, "{% block a [child] %}x{% endblock %}"),
    ];
    for (mode, exp) in tests {
        assert_eq!(render(&engine, "child", mode)?, exp);
    }
    Ok(())
}

#[test]
fn unwind_request_selects_mode() -> Result<()> {
    let engine = engine();
    let template = engine.get_template("short.html").unwrap();

    let request = Request::new().with_query("unwind-template-as", "elements");
    let result = template
        .render(value! {})
        .with_request(&request)
        .to_string()?;
    assert_eq!(result, "{% block content [short.html] %}hi{% endblock %}");

    let request = Request::new().with_query("other", "comments");
    let result = template
        .render(value! {})
        .with_request(&request)
        .to_string()?;
    assert_eq!(result, "hi");

    let request = Request::new().with_query("unwind-template-as", "");
    let result = template
        .render(value! {})
        .with_request(&request)
        .to_string()?;
    assert_eq!(result, "hi");
    Ok(())
}

#[test]
fn unwind_request_custom_param() -> Result<()> {
    let mut engine = engine();
    engine.set_unwind_param("debug");
    let template = engine.get_template("short.html").unwrap();

    let request: Request = [("debug", "comments")].into_iter().collect();
    let result = template
        .render(value! {})
        .with_request(&request)
        .to_string()?;
    assert_eq!(result, "{% block content [short.html] %}hi{% endblock %}");

    let request = Request::new().with_query("unwind-template-as", "comments");
    let result = template
        .render(value! {})
        .with_request(&request)
        .to_string()?;
    assert_eq!(result, "hi");
    Ok(())
}

#[test]
fn unwind_explicit_mode_overrides_request() -> Result<()> {
    let engine = engine();
    let template = engine.get_template("short.html").unwrap();
    let request = Request::new().with_query("unwind-template-as", "bogus");
    let result = template
        .render(value! {})
        .with_request(&request)
        .with_unwind_mode(UnwindMode::None)
        .to_string()?;
    assert_eq!(result, "hi");
    Ok(())
}

#[test]
fn unwind_err_unknown_mode() {
    let engine = engine();
    let request = Request::new().with_query("unwind-template-as", "bogus");
    let mut w = Writer::new();
    let err = engine
        .get_template("page.html")
        .unwrap()
        .render(value! {})
        .with_request(&request)
        .to_writer(&mut w)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownMode);
    assert_eq!(err.to_string(), "unknown unwind mode `bogus`");
    assert_eq!(w.into_string(), "");
}

#[test]
fn unwind_mode_from_str() {
    assert_eq!("comments".parse::<UnwindMode>().unwrap(), UnwindMode::Comments);
    assert_eq!("elements".parse::<UnwindMode>().unwrap(), UnwindMode::Elements);
    assert_eq!(
        "Comments".parse::<UnwindMode>().unwrap_err().kind(),
        ErrorKind::UnknownMode
    );
}

#[test]
fn unwind_concurrent_renders_are_isolated() -> Result<()> {
    fn assert_send_sync<T: Send + Sync>(_: &T) {}

    let mut engine = Engine::new();
    engine.add_template("base", "{% block a %}A{% endblock %}")?;
    engine.add_template(
        "page",
        "{% extends \"base\" %}{% block a %}<p>{{ block.super }}</p>{% endblock %}",
    )?;
    assert_send_sync(&engine);
    assert_send_sync(&engine.get_template("page").unwrap());

    let plain = render(&engine, "page", UnwindMode::None)?;
    let annotated = render(&engine, "page", UnwindMode::Comments)?;
    assert_eq!(plain, "<p>A</p>");
    assert!(annotated.starts_with("<!-- {% block a [page] %} -->\n<p>"));

    let engine = &engine;
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let mode = if i % 2 == 0 {
                    UnwindMode::None
                } else {
                    UnwindMode::Comments
                };
                s.spawn(move || (mode, render(engine, "page", mode)))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect()
    });

    for (mode, result) in results {
        let exp = match mode {
            UnwindMode::None => &plain,
            _ => &annotated,
        };
        assert_eq!(&result?, exp);
    }
    Ok(())
}

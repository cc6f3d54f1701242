//! The annotation templates for each debug mode.

/// The annotation templates used by a single [`UnwindMode`][super::UnwindMode].
///
/// Each template may reference `{name}`, `{result}` and `{tmplsrc}` which are
/// replaced by the block path, the rendered content and the name of the
/// template that declared the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formats {
    /// Used for block output that spans multiple lines or contains markup.
    pub block: &'static str,
    /// Used for short plain-text block output, e.g. inside an attribute.
    pub block_in_element: &'static str,
    /// Used to wrap the output of `{{ block.super }}`.
    pub super_: &'static str,
}

/// The role a piece of annotated output plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Block,
    BlockInElement,
    Super,
}

pub(crate) static NONE: Formats = Formats {
    block: "{result}",
    block_in_element: "{result}",
    super_: "{result}",
};

pub(crate) static COMMENTS: Formats = Formats {
    block: "<!-- {% block {name} [{tmplsrc}] %} -->\n\
            {result}\n\
            <!-- {% endblock {name} [{tmplsrc}] %} -->\n",
    block_in_element: "{% block {name} [{tmplsrc}] %}{result}{% endblock %}",
    super_: "<!-- {{ block.super {name} [{tmplsrc}] }} -->\n\
             {result}\n\
             <!-- {{ /block.super {name} [{tmplsrc}] }} -->\n",
};

pub(crate) static ELEMENTS: Formats = Formats {
    block: "<django:block name=\"{name}\" template=\"{tmplsrc}\">\n    \
            {result}\n\
            </django:block>\n",
    block_in_element: "{% block {name} [{tmplsrc}] %}{result}{% endblock %}",
    super_: "<django:block-super name=\"{name}\" template=\"{tmplsrc}\">\n    \
             {result}\n\
             </django:block-super>\n",
};

impl Formats {
    /// Returns the template for the given role.
    pub fn get(&self, role: Role) -> &'static str {
        match role {
            Role::Block => self.block,
            Role::BlockInElement => self.block_in_element,
            Role::Super => self.super_,
        }
    }
}

impl Role {
    /// Picks the block role for rendered content.
    ///
    /// Content without any markup or line breaks is assumed to sit inside an
    /// element or attribute where a multi-line comment would break the page.
    pub fn for_content(content: &str) -> Self {
        if content.contains(['<', '\n']) {
            Self::Block
        } else {
            Self::BlockInElement
        }
    }
}

/// Substitutes the placeholders in `template`.
///
/// Substituted values are never rescanned, so content that happens to contain
/// `{name}` is emitted verbatim.
pub fn interpolate(template: &str, name: &str, result: &str, tmplsrc: &str) -> String {
    let mut out = String::with_capacity(template.len() + name.len() + result.len() + tmplsrc.len());
    let mut rest = template;
    while let Some(i) = rest.find('{') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        let (value, len) = if rest.starts_with("{name}") {
            (name, "{name}".len())
        } else if rest.starts_with("{result}") {
            (result, "{result}".len())
        } else if rest.starts_with("{tmplsrc}") {
            (tmplsrc, "{tmplsrc}".len())
        } else {
            ("{", 1)
        };
        out.push_str(value);
        rest = &rest[len..];
    }
    out.push_str(rest);
    out
}

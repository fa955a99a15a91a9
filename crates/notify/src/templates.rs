//! Template rendering seam and its default handlebars implementation.
//!
//! A message is rendered from a JSON context in four steps: the per-class
//! `{class}-headline`, then `subject`, `body` and, when HTML mail is on,
//! `body-html`. The rendered headline is handed to the later templates as
//! `headline`.
//!
//! Text templates use triple braces so nothing is HTML-escaped; the HTML
//! template relies on the default escaping.

use handlebars::Handlebars;
use serde_json::Value;

use crate::error::TemplateError;

pub const SUBJECT_TEMPLATE: &str = "subject";
pub const BODY_TEMPLATE: &str = "body";
pub const HTML_BODY_TEMPLATE: &str = "body-html";

/// Name of the one-line summary template for a message class.
pub fn headline_template(message_class: &str) -> String {
    format!("{message_class}-headline")
}

pub trait TemplateRenderer: Send + Sync {
    fn has_template(&self, name: &str) -> bool;

    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError>;
}

const HEADLINES: [(&str, &str); 10] = [
    (
        "newchange",
        r#"{{#if addedReviewers}}{{{fromName}}} would like {{{addedReviewers}}} to review this change.{{else}}{{{fromName}}} has uploaded this change for review.{{/if}}"#,
    ),
    (
        "newpatchset",
        r#"{{{fromName}}} has uploaded a new patch set (#{{change.patchSet}})."#,
    ),
    ("comment", r#"{{{fromName}}} has posted comments on this change."#),
    ("abandon", r#"{{{fromName}}} has abandoned this change."#),
    ("restore", r#"{{{fromName}}} has restored this change."#),
    ("merged", r#"{{{fromName}}} has submitted this change."#),
    (
        "deleteReviewer",
        r#"{{{fromName}}} has removed {{{reviewerName}}} from this change."#,
    ),
    (
        "deleteVote",
        r#"{{{fromName}}} has removed a vote{{#if label}} on {{{label}}}{{/if}} from {{{reviewerName}}} on this change."#,
    ),
    (
        "setassignee",
        r#"{{{fromName}}} has assigned this change to {{{assigneeName}}}."#,
    ),
    ("revert", r#"{{{fromName}}} has created a revert of this change."#),
];

const SUBJECT: &str =
    r#"Change in {{{change.project}}}[{{{change.branch}}}]: {{{change.shortSubject}}}"#;

const BODY: &str = r#"{{#if fromLine}}{{{fromLine}}}

{{/if}}{{{headline}}}{{#if change.url}} ( {{{change.url}}} ){{/if}}

Change subject: {{{change.subject}}}
......................................................................
{{#if message}}

{{{message}}}
{{/if}}
{{> footer}}"#;

const FOOTER: &str = r#"
--
To view, visit {{#if change.url}}{{{change.url}}}{{else}}change {{change.number}} in {{{change.project}}}{{/if}}
{{#each footers}}
{{{this}}}
{{/each}}"#;

const HTML_BODY: &str = r#"<div>
{{#if fromLine}}<p>{{fromLine}}</p>
{{/if}}<p>{{headline}}</p>
{{#if change.url}}<p><a href="{{change.url}}">View Change</a></p>
{{/if}}<p>{{change.subject}}</p>
{{#if message}}<pre style="white-space: pre-wrap;">{{message}}</pre>
{{/if}}<div style="display:none">
{{#each footers}}{{this}}<br>
{{/each}}</div>
</div>"#;

/// Default renderer with built-in templates for every message class.
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Result<Self, TemplateError> {
        let mut renderer = Self {
            registry: Handlebars::new(),
        };
        for (class, source) in HEADLINES {
            renderer.register(&headline_template(class), source)?;
        }
        renderer.register(SUBJECT_TEMPLATE, SUBJECT)?;
        renderer.register(BODY_TEMPLATE, BODY)?;
        renderer.register("footer", FOOTER)?;
        renderer.register(HTML_BODY_TEMPLATE, HTML_BODY)?;
        Ok(renderer)
    }

    /// Add or replace a template.
    pub fn register(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.registry
            .register_template_string(name, source)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError> {
        if !self.registry.has_template(name) {
            return Err(TemplateError::Missing(name.to_string()));
        }
        self.registry
            .render(name, context)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

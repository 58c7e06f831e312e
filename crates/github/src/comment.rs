//! Build log comments posted on pull requests.
//!
//! Every comment starts with a hidden marker derived from the build project
//! name, which is how a later build of the same project finds and replaces it.

use minijinja::{Environment, context};
use pipeline_monitor_core::RelayError;

pub const TAG_PREFIX: &str = "PIPELINE_MONITOR_GENERATED_LOG_COMMENT";

/// GitHub rejects comment bodies longer than this many characters.
pub const MAX_COMMENT_CHARS: usize = 65_536;

const TEMPLATE_NAME: &str = "log_comment.md";
const TEMPLATE: &str = r#"<!-- {{ tag }} -->
## First {{ shown_lines }} lines of {{ project_name }} latest build log{% if truncated %} (truncated to fit a comment){% endif %}
<details>
  <summary>Click to expand the latest build log!</summary>

  ## Link to [original cloudwatch log]({{ deep_link }})

{{ fence }}
{{ log }}
{{ fence }}
</details>
"#;

/// A rendered, tagged build log comment.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LogComment {
    tag: String,
    body: String,
    truncated: bool,
}

impl LogComment {
    /// Render the first lines of a build log. Whole lines are dropped from the
    /// end until the body fits in [`MAX_COMMENT_CHARS`].
    pub fn render(
        project_name: &str,
        log_lines: &[String],
        deep_link: &str,
        line_limit: u32,
    ) -> Result<Self, RelayError> {
        let tag = comment_tag(project_name);
        let lines: Vec<&str> =
            log_lines.iter().map(|line| line.trim_end_matches(['\r', '\n'])).collect();
        let frame = Frame { tag: &tag, project_name, deep_link };

        let mut body = frame.render(line_limit as usize, &lines, false)?;
        let truncated = body.chars().count() > MAX_COMMENT_CHARS;
        if truncated {
            // Everything but the log itself, with the widest possible line count.
            let overhead = frame.render(lines.len(), &[], true)?.chars().count();
            let mut shown = fit_lines(&lines, MAX_COMMENT_CHARS.saturating_sub(overhead));
            loop {
                // A longer fence may still push the body over.
                body = frame.render(shown, &lines[..shown], true)?;
                if shown == 0 || body.chars().count() <= MAX_COMMENT_CHARS {
                    break;
                }
                shown -= 1;
            }
        }
        Ok(Self { tag, body, truncated })
    }

    pub fn tag(&self) -> &str { &self.tag }

    pub fn body(&self) -> &str { &self.body }

    /// Whether lines were dropped to respect the comment size limit.
    pub fn is_truncated(&self) -> bool { self.truncated }

    /// The hidden line identifying comments generated for this project.
    pub fn marker(&self) -> String { marker(&self.tag) }

    /// Whether `body` was generated for the same project as this comment.
    pub fn matches(&self, body: &str) -> bool { body.contains(&self.marker()) }
}

struct Frame<'a> {
    tag: &'a str,
    project_name: &'a str,
    deep_link: &'a str,
}

impl Frame<'_> {
    fn render(
        &self,
        shown_lines: usize,
        lines: &[&str],
        truncated: bool,
    ) -> Result<String, RelayError> {
        let log = lines.join("\n");
        let fence = fence_for(&log);
        render_template(context! {
            tag => self.tag,
            project_name => self.project_name,
            shown_lines => shown_lines,
            truncated => truncated,
            deep_link => self.deep_link,
            fence => &fence,
            log => &log,
        })
        .map_err(|e| RelayError::RenderError(e.into()))
    }
}

fn render_template(ctx: minijinja::Value) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, TEMPLATE)?;
    let template = env.get_template(TEMPLATE_NAME)?;
    template.render(ctx)
}

/// Number of leading lines whose newline-joined length fits in `budget` chars.
fn fit_lines(lines: &[&str], budget: usize) -> usize {
    let mut used = 0;
    for (i, line) in lines.iter().enumerate() {
        used += line.chars().count() + usize::from(i > 0);
        if used > budget {
            return i;
        }
    }
    lines.len()
}

/// Deterministic tag for a build project. Anything outside `[A-Z0-9_-]` is
/// replaced so the tag cannot terminate the HTML comment it lives in.
pub fn comment_tag(project_name: &str) -> String {
    let name: String = project_name
        .to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("{TAG_PREFIX}_{name}")
}

pub fn marker(tag: &str) -> String { format!("<!-- {tag} -->") }

/// A backtick fence longer than any backtick run inside `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

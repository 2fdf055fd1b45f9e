//! Instruction-prompt builder for the analysis agent.
//!
//! The template is rendered with minijinja, then split into marked sections
//! so a byte budget can drop the less critical ones before the prompt is
//! handed to the runner.

use minijinja::{Environment, context};
use tracing::debug;

use crate::agent::tools::ToolSpec;

const ANALYST_TEMPLATE: &str = include_str!("prompts/analyst.md");

/// Inputs for rendering the analyst instruction prompt.
#[derive(Debug, Clone)]
pub struct PromptInputs {
    /// The caller's analysis request (free text).
    pub project_input: String,
    /// File name the agent must save the report under.
    pub report_filename: String,
    /// Registered tools, listed in the prompt by name and description.
    pub tools: Vec<ToolSpec>,
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("analyst", ANALYST_TEMPLATE)
            .expect("analyst template should be valid");
        Self { env }
    }

    fn render_analyst(&self, input: &PromptInputs) -> Result<String, minijinja::Error> {
        let template = self.env.get_template("analyst")?;
        template.render(context! {
            input => input.project_input.trim(),
            report_filename => input.report_filename,
            tools => input.tools,
        })
    }
}

/// A parsed section from rendered template output.
#[derive(Debug, Clone)]
struct ParsedSection {
    key: String,
    required: bool,
    content: String,
}

/// Parse sections from rendered template output using HTML comment markers.
///
/// Markers follow format: `<!-- section:KEY required|droppable -->`
fn parse_sections(rendered: &str) -> Vec<ParsedSection> {
    use std::sync::LazyLock;
    static SECTION_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->").unwrap()
    });

    let mut sections = Vec::new();
    let matches: Vec<_> = SECTION_RE.captures_iter(rendered).collect();

    for (i, caps) in matches.iter().enumerate() {
        let key = caps.get(1).unwrap().as_str().to_string();
        let required = caps.get(2).unwrap().as_str() == "required";
        let start = caps.get(0).unwrap().end();
        let end = matches
            .get(i + 1)
            .map(|m| m.get(0).unwrap().start())
            .unwrap_or(rendered.len());

        let content = rendered[start..end].trim().to_string();
        if !content.is_empty() || required {
            sections.push(ParsedSection {
                key,
                required,
                content,
            });
        }
    }

    sections
}

/// Apply budget to parsed sections, dropping droppable sections as needed.
///
/// Drop order: guidance -> format
fn apply_budget_to_sections(sections: &mut Vec<ParsedSection>, budget: usize) {
    let total_len =
        |secs: &[ParsedSection]| -> usize { secs.iter().map(|s| s.content.len()).sum() };

    if total_len(sections) <= budget {
        return;
    }

    for key in ["guidance", "format"] {
        if total_len(sections) <= budget {
            break;
        }
        if let Some(idx) = sections.iter().position(|s| s.key == key && !s.required) {
            let dropped_len = sections[idx].content.len();
            debug!(
                section = key,
                bytes_dropped = dropped_len,
                "dropped section for budget"
            );
            sections.remove(idx);
        }
    }

    // If still over budget, truncate the last section
    if total_len(sections) > budget && !sections.is_empty() {
        let other_len: usize = sections
            .iter()
            .take(sections.len() - 1)
            .map(|s| s.content.len())
            .sum();
        let allowed = budget.saturating_sub(other_len);
        let last = sections.last_mut().unwrap();
        if last.content.len() > allowed {
            let before_len = last.content.len();
            if allowed > 12 {
                last.content.truncate(allowed - 12);
                last.content.push_str("\n[truncated]");
            } else {
                last.content.truncate(allowed);
            }
            debug!(
                section = last.key,
                before_len,
                after_len = last.content.len(),
                "truncated section for budget"
            );
        }
    }
}

/// Builds the instruction prompt within a byte budget, dropping less critical
/// sections first.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_bytes: usize,
}

impl PromptBuilder {
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    /// Build the instruction prompt for the analysis agent.
    pub fn build_analyst(&self, input: &PromptInputs) -> PromptPack {
        let engine = PromptEngine::new();
        let rendered = engine
            .render_analyst(input)
            .expect("analyst template rendering should not fail");

        let mut sections = parse_sections(&rendered);
        apply_budget_to_sections(&mut sections, self.budget_bytes);

        PromptPack {
            content: sections
                .iter()
                .map(|s| s.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// A rendered prompt ready to hand to the agent runner.
#[derive(Debug, Clone)]
pub struct PromptPack {
    content: String,
}

impl PromptPack {
    pub fn render(&self) -> String {
        self.content.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_inputs() -> PromptInputs {
        PromptInputs {
            project_input: "Analyze requirements for project".to_string(),
            report_filename: "requirements_analysis.md".to_string(),
            tools: vec![
                ToolSpec {
                    name: "load_backlog".to_string(),
                    description: "Load the project backlog.".to_string(),
                    parameters: json!({"type": "object"}),
                },
                ToolSpec {
                    name: "write_file".to_string(),
                    description: "Write a text file under the output directory.".to_string(),
                    parameters: json!({"type": "object"}),
                },
            ],
        }
    }

    /// Section order matters for prompt consistency: persona -> request ->
    /// tools -> phases -> guidance -> format -> output.
    #[test]
    fn prompt_ordering_is_stable() {
        let content = PromptBuilder::new(50_000)
            .build_analyst(&sample_inputs())
            .render();

        let persona_pos = content.find("### Persona & Role ###").expect("persona");
        let request_pos = content.find("### Request ###").expect("request");
        let tools_pos = content.find("### Tools ###").expect("tools");
        let phases_pos = content.find("### Tasks ###").expect("phases");
        let guidance_pos = content
            .find("### Additional Instructions ###")
            .expect("guidance");
        let format_pos = content.find("### Report Format ###").expect("format");
        let output_pos = content.find("### Output ###").expect("output");

        assert!(persona_pos < request_pos, "persona before request");
        assert!(request_pos < tools_pos, "request before tools");
        assert!(tools_pos < phases_pos, "tools before phases");
        assert!(phases_pos < guidance_pos, "phases before guidance");
        assert!(guidance_pos < format_pos, "guidance before format");
        assert!(format_pos < output_pos, "format before output");
    }

    #[test]
    fn prompt_names_tools_input_and_report() {
        let content = PromptBuilder::new(50_000)
            .build_analyst(&sample_inputs())
            .render();

        assert!(content.contains("`load_backlog`"), "names the backlog tool");
        assert!(content.contains("`write_file`"), "names the write tool");
        assert!(
            content.contains("Analyze requirements for project"),
            "carries the request"
        );
        assert!(
            content.contains("requirements_analysis.md"),
            "names the report file"
        );
    }

    /// With a tight budget the droppable guidance and format sections go
    /// first; required sections survive.
    #[test]
    fn budget_drops_droppable_sections_first() {
        let content = PromptBuilder::new(2_300)
            .build_analyst(&sample_inputs())
            .render();

        assert!(
            !content.contains("### Additional Instructions ###"),
            "guidance should be dropped"
        );
        assert!(
            !content.contains("### Report Format ###"),
            "format should be dropped"
        );
        assert!(
            content.contains("### Persona & Role ###"),
            "persona should remain"
        );
        assert!(content.contains("### Output ###"), "output should remain");
    }
}

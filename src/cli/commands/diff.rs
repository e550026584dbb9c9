//! Diff command
//!
//! Compares the synthesized template with an existing template file.

use super::{CommandContext, Runnable};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use vpcsynth::diff::{render_text_diff, DiffOptions, TemplateDiff};
use vpcsynth::template::{Template, TemplateFormat};

/// Arguments for the diff command
#[derive(Parser, Debug, Clone)]
pub struct DiffArgs {
    /// Existing template (JSON or YAML)
    #[arg(required = true)]
    pub existing: PathBuf,

    /// Lines of context around each change
    #[arg(long, default_value = "3")]
    pub context: usize,

    /// Only print the resource summary
    #[arg(long)]
    pub summary: bool,
}

impl DiffArgs {
    /// Execute the diff command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let content = tokio::fs::read_to_string(&self.existing)
            .await
            .with_context(|| format!("Failed to read {}", self.existing.display()))?;
        let existing = Template::parse(&content)
            .with_context(|| format!("Failed to parse {}", self.existing.display()))?;

        let synthesized = ctx.synthesize().await?;
        let diff = TemplateDiff::compute(&existing, &synthesized);

        // Both sides are re-rendered in the existing file's format so that
        // formatting alone never shows up as a change.
        let format = if content.trim_start().starts_with('{') {
            TemplateFormat::Json
        } else {
            TemplateFormat::Yaml
        };
        let old_text = existing.render(format)?;
        let new_text = synthesized.render(format)?;
        let changed = diff.has_changes() || old_text != new_text;

        if ctx.output.is_structured() {
            ctx.output.document(&serde_json::json!({
                "existing": self.existing,
                "changed": changed,
                "resources": diff,
            }))?;
            return Ok(i32::from(changed));
        }

        ctx.output.section(&format!(
            "Resources: {}",
            diff.summary(ctx.output.use_color())
        ));
        for change in diff.changes() {
            let mut line = format!(
                "  {} {} ({})",
                change.kind.marker(),
                change.logical_id,
                change.resource_type
            );
            if !change.changed_properties.is_empty() {
                line.push_str(&format!(": {}", change.changed_properties.join(", ")));
            }
            ctx.output.line(&line);
        }
        if !diff.outputs_changed.is_empty() {
            ctx.output
                .line(&format!("  outputs: {}", diff.outputs_changed.join(", ")));
        }

        if !self.summary && old_text != new_text {
            let options = DiffOptions {
                context_lines: self.context,
                use_color: ctx.output.use_color(),
                old_name: self.existing.display().to_string(),
                new_name: "synthesized".to_string(),
            };
            print!("\n{}", render_text_diff(&old_text, &new_text, &options));
        }

        if changed {
            Ok(1)
        } else {
            ctx.output.success("Templates are identical");
            Ok(0)
        }
    }
}

#[async_trait::async_trait]
impl Runnable for DiffArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}

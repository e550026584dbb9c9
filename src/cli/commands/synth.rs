//! Synth command
//!
//! Validates the topology, builds the stack and writes the template.

use super::{parse_template_format, CommandContext, Runnable};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use vpcsynth::stack::VpcStack;
use vpcsynth::template::TemplateFormat;
use vpcsynth::validate::validate;

/// Arguments for the synth command
#[derive(Parser, Debug, Clone)]
pub struct SynthArgs {
    /// Template format (json or yaml); defaults to the configured format
    #[arg(long, short = 'f', value_parser = parse_template_format)]
    pub format: Option<TemplateFormat>,

    /// Write the template to this file instead of stdout
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

impl SynthArgs {
    /// Resolve the output path; bare file names go into the configured
    /// output directory
    fn out_path(&self, ctx: &CommandContext) -> Option<PathBuf> {
        let out = self.out.as_ref()?;
        match &ctx.config.defaults.out_dir {
            Some(dir) if out.parent().map_or(true, |p| p.as_os_str().is_empty()) => {
                Some(dir.join(out))
            }
            _ => Some(out.clone()),
        }
    }

    /// Execute the synth command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let topology = ctx.load_topology().await?;

        let report = validate(&topology);
        if !report.is_valid() {
            ctx.output.issues(&report.errors, &report.warnings);
            ctx.output.error(&format!(
                "Topology validation failed with {} error(s)",
                report.errors.len()
            ));
            return Ok(vpcsynth::Error::Validation(report.errors).exit_code());
        }
        ctx.output.issues(&[], &report.warnings);

        let stack = VpcStack::build(&topology)?;
        let template = stack.template();
        let format = ctx.template_format(self.format);
        let rendered = template.render(format)?;

        let Some(path) = self.out_path(ctx) else {
            print!("{}", rendered);
            if !rendered.ends_with('\n') {
                println!();
            }
            return Ok(0);
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, &rendered)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        if ctx.output.is_structured() {
            ctx.output.document(&serde_json::json!({
                "stack": topology.stack.name,
                "path": path,
                "format": format.to_string(),
                "resources": template.resources.len(),
                "outputs": template.outputs.len(),
            }))?;
        } else {
            ctx.output.success(&format!(
                "Wrote {} template for '{}' to {} ({} resources, {} outputs)",
                format,
                topology.stack.name,
                path.display(),
                template.resources.len(),
                template.outputs.len()
            ));
        }
        ctx.output.elapsed("Synthesis");

        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for SynthArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}

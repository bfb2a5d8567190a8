//! lite-render 命令行 - 渲染模板、模拟事件

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lite_render::bridge::RecordingHost;
use lite_render::config::EngineConfig;
use lite_render::js::ScriptComponent;
use lite_render::parser::TemplateDocument;
use lite_render::runtime::ComponentInstance;
use lite_render::{DataContext, UiEvent};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lite-render")]
#[command(about = "Declarative template binding core")]
#[command(version)]
struct Cli {
    /// engine.json 配置文件
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template and print the node tree as JSON
    Render {
        /// Template JSON file
        template: PathBuf,

        /// Data context JSON file (replaces the template's own data)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// JS file assigning `component = { computed, methods }`
        #[arg(short, long)]
        script: Option<PathBuf>,
    },

    /// Render, fire one event, re-render and print the result
    Fire {
        template: PathBuf,

        /// Ref of the target node
        #[arg(short, long)]
        target: String,

        /// Event type, e.g. click
        #[arg(short, long, default_value = "click")]
        event: String,

        /// Event payload as inline JSON
        #[arg(short, long)]
        payload: Option<String>,

        #[arg(short, long)]
        data: Option<PathBuf>,

        #[arg(short, long)]
        script: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    // RUST_LOG 优先于配置里的 logFilter
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render { template, data, script } => {
            let mut instance = load_instance(&template, data.as_deref(), script.as_deref(), config)?;
            let pass = instance.render();
            report_diagnostics(pass);
            println!("{}", serde_json::to_string_pretty(&pass.to_json())?);

            let mut host = RecordingHost::new();
            if let Some(root) = instance.mount(&mut host) {
                tracing::info!(elements = host.tags(root).len(), "mounted on recording host");
            }
        }
        Commands::Fire {
            template,
            target,
            event,
            payload,
            data,
            script,
        } => {
            let mut instance = load_instance(&template, data.as_deref(), script.as_deref(), config)?;
            instance.render();

            let payload: JsonValue = match payload {
                Some(text) => serde_json::from_str(&text).context("invalid --payload JSON")?,
                None => JsonValue::Null,
            };
            let outcome = instance.fire_event(&UiEvent::new(&event, &target, payload));
            for error in &outcome.errors {
                tracing::warn!(%error, "dispatch error");
            }
            if !outcome.is_handled() {
                tracing::warn!(target_ref = %target, event = %event, "no handler ran");
            }

            match instance.flush() {
                Some(pass) => {
                    report_diagnostics(pass);
                    println!("{}", serde_json::to_string_pretty(&pass.to_json())?);
                }
                None => println!("(no state change)"),
            }
        }
    }

    Ok(())
}

fn load_instance(
    template: &Path,
    data: Option<&Path>,
    script: Option<&Path>,
    config: EngineConfig,
) -> Result<ComponentInstance> {
    let document = TemplateDocument::from_file(template)?;

    let script_source = match script {
        Some(path) => Some(
            std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => document.script.clone(),
    };

    let mut instance = ComponentInstance::new(document, config);
    if let Some(source) = script_source {
        instance = instance.with_script(ScriptComponent::new(&source)?);
    }
    if let Some(path) = data {
        let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let json: JsonValue = serde_json::from_str(&text)?;
        instance = instance.with_data(DataContext::from_json(&json)?);
    }
    Ok(instance)
}

fn report_diagnostics(pass: &lite_render::RenderPass) {
    for diagnostic in &pass.diagnostics {
        tracing::warn!(%diagnostic, "recovered");
    }
}

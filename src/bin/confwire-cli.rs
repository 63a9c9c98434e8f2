//! Confwire CLI - inspect and dry-run object graph documents
//!
//! Provides subcommands for planning, resolving and fingerprinting JSON
//! documents without any application types registered.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use confwire::{
    Instance, Node, Params, Registry, Resolver, ResolverConfig, TypeDescriptor, ValidationError,
    load_document,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "confwire")]
#[command(about = "Configuration-driven object graph builder", long_about = None)]
struct Cli {
    /// Resolver configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the construction order and alias table
    Plan {
        /// Document to plan
        file: PathBuf,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build every directive and print the materialized document
    Resolve {
        /// Document to resolve
        file: PathBuf,
    },

    /// Print the document's identity hash
    Fingerprint {
        /// Document to hash
        file: PathBuf,
    },
}

/// Accepts every type id. An instance is its parameter map as JSON.
#[derive(Debug)]
struct EchoRegistry;

impl Registry for EchoRegistry {
    fn lookup(&self, type_id: &str) -> Option<TypeDescriptor> {
        Some(TypeDescriptor::new(type_id, "serde_json::Value"))
    }

    fn construct(
        &self,
        _descriptor: &TypeDescriptor,
        params: Params,
    ) -> Result<Instance, ValidationError> {
        Ok(Arc::new(render(&Node::Fields(params))) as Instance)
    }
}

/// JSON rendering where echoed instances print as their parameters.
fn render(node: &Node) -> Value {
    match node {
        Node::Sequence(items) => Value::Array(items.iter().map(render).collect()),
        Node::Fields(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.to_string(), render(value)))
                .collect(),
        ),
        Node::Instance(instance) => instance
            .downcast_ref::<Value>()
            .cloned()
            .unwrap_or_else(|| Value::String("<instance>".to_string())),
        scalar => scalar.to_json().unwrap_or(Value::Null),
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ResolverConfig::load(path)
            .with_context(|| format!("loading resolver config {}", path.display()))?,
        None => ResolverConfig::default(),
    };
    let resolver = Resolver::with_config(EchoRegistry, config);

    match cli.command {
        Commands::Plan { file, json } => {
            let document = load(&file)?;
            let plan = resolver.plan(document)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("{} directive(s) in construction order:", plan.len());
                for (index, step) in plan.steps.iter().enumerate() {
                    let alias = step
                        .directive
                        .alias
                        .as_deref()
                        .map(|alias| format!(" as {}", alias))
                        .unwrap_or_default();
                    println!(
                        "  {}. {} [{}{}]",
                        index + 1,
                        step.directive.path,
                        step.directive.type_id,
                        alias
                    );
                    for dependency in &step.dependencies {
                        println!("       after {}", dependency);
                    }
                }

                if !plan.aliases.is_empty() {
                    println!("Aliases:");
                    for (alias, path) in plan.aliases.iter() {
                        println!("  {} -> {}", alias, path);
                    }
                }
            }
        }

        Commands::Resolve { file } => {
            let document = load(&file)?;
            let (materialized, reflections) = resolver.materialize(document)?;
            tracing::info!(instances = reflections.len(), "resolved {}", file.display());
            println!("{}", serde_json::to_string_pretty(&render(&materialized))?);
        }

        Commands::Fingerprint { file } => {
            let document = load(&file)?;
            println!("{}", document.fingerprint());
        }
    }

    Ok(())
}

fn load(file: &Path) -> Result<Node> {
    load_document(file).with_context(|| format!("loading document {}", file.display()))
}

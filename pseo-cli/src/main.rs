//! PSEO Agents CLI
//!
//! Multi-agent generation of programmatic SEO landing pages.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pseo_agents::{render_json_ld, BackendSettings, ProviderKind, SharedBackend};
use pseo_core::{PageOutput, Variables};
use pseo_kb::KnowledgeBase;
use pseo_runtime::{Orchestrator, PipelineConfig, DEFAULT_KB_PATH};

#[derive(Parser)]
#[command(name = "pseo")]
#[command(author, version, about = "PSEO Agents: multi-agent landing page generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Provider {
    Gemini,
    Openai,
    Openrouter,
    Anthropic,
    /// OpenAI-compatible local server
    Local,
}

impl Provider {
    fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.0-flash-exp",
            Provider::Openai => "gpt-4o",
            Provider::Openrouter => "google/gemini-2.0-flash-exp",
            Provider::Anthropic => "claude-sonnet-4-20250514",
            Provider::Local => "llama3.1",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Openai => "OpenAI",
            Provider::Openrouter => "OpenRouter",
            Provider::Anthropic => "Anthropic",
            Provider::Local => "Local",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one landing page
    Generate {
        /// Pattern id (1-6)
        #[arg(short, long)]
        pattern: String,

        /// Page variable as name=value (repeatable)
        #[arg(long = "var", value_parser = parse_variable)]
        variables: Vec<(String, String)>,

        /// LLM provider
        #[arg(long, value_enum, default_value = "gemini")]
        provider: Provider,

        /// Model name (defaults per provider)
        #[arg(short, long)]
        model: Option<String>,

        /// Gemini API key (or set GEMINI_API_KEY env var)
        #[arg(long, env = "GEMINI_API_KEY")]
        gemini_key: Option<String>,

        /// OpenAI API key (or set OPENAI_API_KEY env var)
        #[arg(long, env = "OPENAI_API_KEY")]
        api_key: Option<String>,

        /// OpenRouter API key (or set OPENROUTER_API_KEY env var)
        #[arg(long, env = "OPENROUTER_API_KEY")]
        openrouter_key: Option<String>,

        /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
        #[arg(long, env = "ANTHROPIC_API_KEY")]
        anthropic_key: Option<String>,

        /// Base URL for the local provider
        #[arg(long, default_value = "http://localhost:11434/v1")]
        base_url: String,

        /// Knowledge base file
        #[arg(long, default_value = DEFAULT_KB_PATH)]
        kb: PathBuf,

        /// Directory with patterns.toml / hooks.toml overrides
        #[arg(long)]
        config_dir: Option<PathBuf>,

        /// FAQ pairs per page
        #[arg(long)]
        faq_count: Option<usize>,

        /// Upper bound for each LLM call, in seconds
        #[arg(long, default_value = "60")]
        llm_timeout: u64,

        /// Output directory for page JSON
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Print the public view instead of the summary
        #[arg(long)]
        public: bool,
    },

    /// Inspect the competitor knowledge base
    Kb {
        #[command(subcommand)]
        action: KbAction,

        /// Knowledge base file
        #[arg(long, default_value = DEFAULT_KB_PATH)]
        kb: PathBuf,
    },

    /// List the available page patterns
    Patterns {
        /// Directory with a patterns.toml override
        #[arg(long)]
        config_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum KbAction {
    /// List stored competitors
    List,
    /// Print one competitor profile
    Show { competitor: String },
    /// Summary statistics
    Stats,
}

fn parse_variable(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty variable name in '{}'", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Generate {
            pattern,
            variables,
            provider,
            model,
            gemini_key,
            api_key,
            openrouter_key,
            anthropic_key,
            base_url,
            kb,
            config_dir,
            faq_count,
            llm_timeout,
            output,
            public,
        } => {
            let model = model.unwrap_or_else(|| provider.default_model().to_string());
            let keys = ApiKeys {
                gemini: gemini_key,
                openai: api_key,
                openrouter: openrouter_key,
                anthropic: anthropic_key,
            };
            let backend = build_backend(provider, &model, keys, &base_url)?;
            println!("🧭 PSEO Agents - landing page generation\n");
            println!("📡 Provider: {} | Model: {}", provider.label(), model);

            let config = PipelineConfig::new(backend)
                .with_kb_path(Some(kb))
                .with_config_dir(config_dir)
                .with_faq_count(faq_count)
                .with_timeout(Duration::from_secs(llm_timeout));

            generate(config, &pattern, variables.into_iter().collect(), &output, public).await?;
        }
        Commands::Kb { action, kb } => {
            inspect_kb(&kb, action)?;
        }
        Commands::Patterns { config_dir } => {
            list_patterns(config_dir)?;
        }
    }

    Ok(())
}

struct ApiKeys {
    gemini: Option<String>,
    openai: Option<String>,
    openrouter: Option<String>,
    anthropic: Option<String>,
}

fn require_key(key: Option<String>, provider: &str, env: &str, flag: &str) -> Result<String> {
    key.ok_or_else(|| anyhow::anyhow!("{} API key required. Set {} or use {}", provider, env, flag))
}

fn build_backend(provider: Provider, model: &str, keys: ApiKeys, base_url: &str) -> Result<SharedBackend> {
    let settings = match provider {
        Provider::Gemini => {
            let key = require_key(keys.gemini, "Gemini", "GEMINI_API_KEY", "--gemini-key")?;
            BackendSettings::new(ProviderKind::Gemini, &key, model)
        }
        Provider::Openai => {
            let key = require_key(keys.openai, "OpenAI", "OPENAI_API_KEY", "--api-key")?;
            BackendSettings::new(ProviderKind::OpenAi, &key, model)
        }
        Provider::Openrouter => {
            let key = require_key(keys.openrouter, "OpenRouter", "OPENROUTER_API_KEY", "--openrouter-key")?;
            BackendSettings::new(ProviderKind::OpenRouter, &key, model)
        }
        Provider::Anthropic => {
            let key = require_key(keys.anthropic, "Anthropic", "ANTHROPIC_API_KEY", "--anthropic-key")?;
            BackendSettings::new(ProviderKind::Anthropic, &key, model)
        }
        Provider::Local => BackendSettings::local(base_url, model),
    };
    Ok(settings.connect()?)
}

async fn generate(
    config: PipelineConfig,
    pattern_id: &str,
    variables: Variables,
    output: &Path,
    public: bool,
) -> Result<()> {
    let orchestrator = Orchestrator::new(config)?;

    let Some(pattern) = orchestrator.library().get(pattern_id) else {
        anyhow::bail!(
            "Pattern '{}' not found. Available: {}",
            pattern_id,
            orchestrator.library().ids().join(", ")
        );
    };
    println!("📐 Pattern {}: {}", pattern.id, pattern.name);
    for (name, value) in &variables {
        println!("   {} = {}", name, value);
    }
    println!();

    let run = orchestrator.generate_run(pattern_id, variables).await?;
    let page = &run.page;

    let (full_path, public_path) = write_page(page, output)?;

    if public {
        println!("{}", page.to_json(true)?);
        return Ok(());
    }

    println!("\n✅ Page generation complete!");
    println!("🆔 Page ID: {}", page.page_id);
    println!("🔗 URL: {}", page.url_slug);
    println!("📰 H1: {}", page.post_title);
    println!("⭐ Quality: {:.2} ({:?})", page.quality_score, page.uniqueness_check);
    println!(
        "📦 {} FAQs, {} comparison rows, {} schema records",
        page.faq_json.len(),
        page.comparison_table_json.len(),
        page.schema_markup.len()
    );
    println!("⏱️  {:.2}s, {} messages exchanged", run.elapsed.as_secs_f64(), run.messages_exchanged);
    for (phase, elapsed) in &run.phases {
        println!("   {:<16} {:>6.2}s", phase.to_string(), elapsed.as_secs_f64());
    }
    println!("📄 Full page saved to: {}", full_path.display());
    println!("📄 Public view saved to: {}", public_path.display());

    Ok(())
}

/// Write `<page_id>.json`, `<page_id>.public.json` and the JSON-LD snippet
fn write_page(page: &PageOutput, output: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    let full_path = output.join(format!("{}.json", page.page_id));
    let public_path = output.join(format!("{}.public.json", page.page_id));
    fs::write(&full_path, page.to_json(false)?)?;
    fs::write(&public_path, page.to_json(true)?)?;
    if !page.schema_markup.is_empty() {
        let snippet = render_json_ld(&page.schema_markup)?;
        fs::write(output.join(format!("{}.schema.html", page.page_id)), snippet)?;
    }
    Ok((full_path, public_path))
}

fn inspect_kb(path: &Path, action: KbAction) -> Result<()> {
    let kb = KnowledgeBase::open(path)
        .with_context(|| format!("opening knowledge base {}", path.display()))?;

    match action {
        KbAction::List => {
            let competitors = kb.list_competitors()?;
            println!("📚 {} competitors in {}", competitors.len(), path.display());
            for name in competitors {
                println!("   - {}", name);
            }
        }
        KbAction::Show { competitor } => match kb.get_profile(&competitor)? {
            Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            None => println!("❌ No profile for '{}'", competitor),
        },
        KbAction::Stats => {
            let stats = kb.stats()?;
            println!("📊 Knowledge base: {}", path.display());
            println!("   Competitors: {}", stats.total_competitors);
            println!(
                "   Last updated: {}",
                stats.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }

    Ok(())
}

fn list_patterns(config_dir: Option<PathBuf>) -> Result<()> {
    let library = match config_dir.map(|dir| dir.join(pseo_runtime::PATTERNS_FILE)) {
        Some(path) if path.exists() => pseo_core::PatternLibrary::load_from_file(&path)?,
        _ => pseo_core::PatternLibrary::load_embedded()?,
    };

    println!("📐 {} patterns\n", library.len());
    for pattern in library.iter() {
        println!("{}. {} [{}]", pattern.id, pattern.name, pattern.priority);
        println!("   H1:  {}", pattern.h1_formula);
        println!("   URL: {}", pattern.url_formula);
        println!("   Variables: {}", pattern.variables.join(", "));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable() {
        assert_eq!(
            parse_variable("audience=OnlyFans Creators").unwrap(),
            ("audience".to_string(), "OnlyFans Creators".to_string())
        );
        assert_eq!(parse_variable("note=a=b").unwrap().1, "a=b");
        assert!(parse_variable("competitor").is_err());
        assert!(parse_variable("=Krea").is_err());
    }

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "pseo",
            "generate",
            "-p",
            "1",
            "--var",
            "competitor=Higgsfield",
            "--var",
            "audience=OnlyFans Creators",
            "--provider",
            "local",
        ])
        .unwrap();

        let Commands::Generate { pattern, variables, provider, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(pattern, "1");
        assert_eq!(variables.len(), 2);
        assert_eq!(provider.default_model(), "llama3.1");
    }
}

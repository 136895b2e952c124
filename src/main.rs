use clap::{Parser, Subcommand};
use multipage::config::{self, Mode};
use multipage::manifest::{self, Project};
use multipage::{assets, generate, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "multipage")]
#[command(about = "Plan entry points and HTML documents for multi-page builds")]
#[command(long_about = "\
Plan entry points and HTML documents for multi-page builds

Pages are listed in a TOML file, one table per page. Each page becomes a
bundler entry at src/<id> and a document at dist/<id>/index.html that loads
only that page's chunk.

Project structure:

  project/
  ├── multipage.toml        # Build settings (optional)
  ├── config/
  │   ├── index.toml        # Pages for production builds
  │   └── index.dev.toml    # Pages for --dev builds
  ├── src/
  │   ├── home/index.tsx    # Entry for page `home`
  │   └── about/index.tsx
  └── tpl/index.html        # Shared template, {{ title }} placeholder (optional)

Page file:

  [home]
  title = \"Home\"

Run 'multipage gen-config' to print a documented multipage.toml.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Build in development mode (reads index.dev.toml, adds dev-server settings)
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the planned entries and documents
    Plan {
        /// Print the full build manifest as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plan and write documents, assets and the manifest
    Build,
    /// Validate pages and entry sources without writing anything
    Check,
    /// Print a stock multipage.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = Mode::from_dev_flag(cli.dev);
    let node_env = std::env::var("NODE_ENV").ok();

    match cli.command {
        Command::Plan { json } => {
            let config = config::load_config(&cli.root)?;
            let project = Project {
                root: &cli.root,
                config: &config,
                mode,
            };
            let manifest = manifest::prepare(&project, node_env.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&manifest)?);
            } else {
                output::print_plan_output(&manifest, &cli.root);
            }
        }
        Command::Build => {
            let config = config::load_config(&cli.root)?;
            let project = Project {
                root: &cli.root,
                config: &config,
                mode,
            };
            println!("==> Planning ({mode})");
            let manifest = manifest::prepare(&project, node_env.as_deref())?;
            output::print_plan_output(&manifest, &cli.root);

            let out = config.output_root(&cli.root);
            println!("==> Generating → {}", out.display());
            let result = generate::generate(&manifest, &project)?;
            output::print_build_output(&result, &config.output.public_path);
            println!("==> Build complete: {}", result.output_dir.display());
        }
        Command::Check => {
            let config = config::load_config(&cli.root)?;
            let project = Project {
                root: &cli.root,
                config: &config,
                mode,
            };
            println!("==> Checking {} ({mode})", cli.root.display());
            let (manifest, scanned) =
                manifest::prepare_with_sources(&project, node_env.as_deref())?;
            let unresolved = manifest::unresolved_entries(&manifest);
            let counts = assets::count_by_kind(&scanned);
            output::print_check_output(&manifest, &unresolved, &counts);
            if !unresolved.is_empty() {
                let count = unresolved.len();
                return Err(format!("{count} entries do not resolve").into());
            }
            println!("==> Project is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

//! Anatomy CLI
//!
//! Usage:
//!   anatomy --config <FILE> resolve [--data <FILE>] [--set k=v]... [PATH]...
//!   anatomy --config <FILE> remap <PATH> --to <PLATFORM> [--from <PLATFORM>]
//!   anatomy --config <FILE> strip <PATH>
//!   anatomy --config <FILE> roots-env

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use anatomy::{Anatomy, AnatomyConfig, Context, Platform, ResolvedTemplate, Value};

#[derive(Parser)]
#[command(name = "anatomy")]
#[command(about = "Resolve studio path templates and remap rooted paths")]
struct Cli {
    /// Anatomy configuration file (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Platform to resolve root values for (defaults to the current one)
    #[arg(short, long)]
    platform: Option<Platform>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve templates against context data and print them
    Resolve {
        /// TOML file with context data
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Extra context entries as key=value; nested keys use dots
        /// (e.g. project.name=demo)
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Print best-effort values instead of failing on unsolved templates
        #[arg(long)]
        lenient: bool,

        /// Print the rootless variant instead of the concrete text
        #[arg(long)]
        rootless: bool,

        /// Dotted template paths to print (all templates when empty)
        paths: Vec<String>,
    },

    /// Remap a rooted path onto another platform's root value
    Remap {
        path: String,

        /// Destination platform
        #[arg(long)]
        to: Platform,

        /// Source platform; inferred from the path when omitted
        #[arg(long)]
        from: Option<Platform>,
    },

    /// Replace a recognized root prefix with its formattable key
    Strip { path: String },

    /// Print root environment pairs, one KEY=VALUE per line
    RootsEnv,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match AnatomyConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration '{}': {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };
    let platform = cli.platform.unwrap_or_else(Platform::current);
    let anatomy = match Anatomy::with_platform(config, platform) {
        Ok(anatomy) => anatomy,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Resolve {
            data,
            set,
            lenient,
            rootless,
            paths,
        } => resolve(&anatomy, data, &set, lenient, rootless, &paths),
        Command::Remap { path, to, from } => match anatomy.remap(&path, to, from) {
            Some(remapped) => println!("{}", remapped),
            None => {
                eprintln!("Error: no known root matches '{}'", path);
                std::process::exit(1);
            }
        },
        Command::Strip { path } => match anatomy.strip_to_key(&path) {
            Some(stripped) => println!("{}", stripped),
            None => {
                eprintln!("Error: no known root matches '{}'", path);
                std::process::exit(1);
            }
        },
        Command::RootsEnv => {
            for (key, value) in anatomy.root_environment_pairs() {
                println!("{}={}", key, value);
            }
        }
    }
}

fn resolve(
    anatomy: &Anatomy,
    data: Option<PathBuf>,
    set: &[String],
    lenient: bool,
    rootless: bool,
    paths: &[String],
) {
    let mut context = match &data {
        Some(path) => {
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("Error reading data file '{}': {}", path.display(), e);
                    std::process::exit(1);
                }
            };
            match Context::from_toml_str(&content) {
                Ok(context) => context,
                Err(e) => {
                    eprintln!("Error parsing data file '{}': {}", path.display(), e);
                    std::process::exit(1);
                }
            }
        }
        None => Context::new(),
    };

    for entry in set {
        let Some((key, raw_value)) = entry.split_once('=') else {
            eprintln!("Error: --set expects KEY=VALUE, got '{}'", entry);
            std::process::exit(1);
        };
        let segments: Vec<&str> = key.split('.').collect();
        let value = match raw_value.parse::<i64>() {
            Ok(number) => Value::Int(number),
            Err(_) => Value::Str(raw_value.to_string()),
        };
        context.insert_path(&segments, value);
    }

    let resolved = if lenient {
        anatomy.resolve_all_lenient(&context)
    } else {
        anatomy.resolve_all(&context)
    };

    let print = |name: &str, template: &ResolvedTemplate| {
        let text = if rootless {
            template.rootless_text()
        } else {
            template.text()
        };
        println!("{} = {}", name, text);
    };

    if paths.is_empty() {
        for (name, template) in resolved.leaves() {
            if !lenient && !template.solved() {
                // Route through the strict accessor for the structured error
                let segments: Vec<&str> = name.split('.').collect();
                if let Err(e) = resolved.template(&segments) {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
            print(&name, template);
        }
        return;
    }

    for name in paths {
        let segments: Vec<&str> = name.split('.').collect();
        if lenient {
            match resolved.try_template(&segments) {
                Some(template) => print(name, template),
                None => println!("{} =", name),
            }
            continue;
        }
        match resolved.template(&segments) {
            Ok(template) => print(name, template),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

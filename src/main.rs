//! cfgm CLI
//!
//! Entry point for the `cfgm` command-line tool.

use cfgm::context::DEFAULT_CONFIG_FILE_PREFIX;
use cfgm::{ConfigContext, ContextOptions};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "cfgm")]
#[command(about = "Merge and inspect relaxed JSON configuration", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a config file and properties, then print the result
    Dump {
        /// Config file (must end in .json)
        file: String,

        /// Property assignment, e.g. -Dserver.port=9090 or -Dlist[+0]=x
        #[arg(short = 'D', value_name = "PATH[=VALUE]")]
        define: Vec<String>,

        /// Label for prototype entries
        #[arg(long, default_value = "Key")]
        label: String,

        /// Output plain JSON instead of the annotated dump
        #[arg(long)]
        json: bool,

        /// Also print the provenance report to stderr
        #[arg(long)]
        report: bool,
    },

    /// Parse a config file and report the first error
    Check {
        /// Config file to parse
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            file,
            define,
            label,
            json,
            report,
        } => {
            run_dump(&file, &define, label, json, report);
        }
        Commands::Check { file } => {
            run_check(&file);
        }
    }
}

fn run_dump(file: &str, define: &[String], label: String, json: bool, report: bool) {
    let options = ContextOptions {
        prototype_label: label,
        ..ContextOptions::default()
    };
    let mut ctx = ConfigContext::new(options);

    let mut args = vec![format!("{}{}", DEFAULT_CONFIG_FILE_PREFIX, file)];
    args.extend(
        define
            .iter()
            .map(|d| format!("{}{}", ctx.options().command_line_prefix, d)),
    );

    let errors = ctx.init_from_args(&args);
    if report {
        if let Some(report) = ctx.report() {
            match report.to_json() {
                Ok(text) => eprintln!("{}", text),
                Err(e) => eprintln!("Error serializing report: {}", e),
            }
        }
    }
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("Error: {}", error);
        }
        process::exit(1);
    }

    if json {
        match serde_json::to_string_pretty(&ctx.root().to_json_value()) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("{}", ctx.dump());
    }
}

fn run_check(file: &Path) {
    let text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {}", file.display(), e);
            process::exit(1);
        }
    };

    let mut root = cfgm::tree::Node::new();
    match cfgm::json::merge_str(&mut root, &text, cfgm::priority::MERGE) {
        Ok(()) => println!("ok"),
        Err(e) => {
            eprintln!("{}: {}", file.display(), e);
            process::exit(1);
        }
    }
}

use livecanvas::{address_of, compile, AddressableTree, CanvasConfig, CanvasError, Dialect, MountOutcome, Sandbox};
use std::env;
use std::fs;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let config = match take_config(&mut args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(1);
        }
    };

    if args.is_empty() {
        eprintln!("Usage: livecanvas-inspect [--config canvas.yaml] <file.jsx|file.tsx>...");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  livecanvas-inspect Card.jsx");
        eprintln!("  RUST_LOG=debug livecanvas-inspect snippets/*.tsx");
        process::exit(1);
    }

    let mut exit_code = 0;
    for file_path in &args {
        match inspect_file(file_path, &config) {
            Ok(addresses) => {
                println!("✓ {} ({} elements)", file_path, addresses.len());
                for address in addresses {
                    println!("    {}", address);
                }
            }
            Err(e) => {
                eprintln!("✗ {} has errors:", file_path);
                print_error(&e);
                exit_code = 1;
            }
        }
    }

    process::exit(exit_code);
}

fn take_config(args: &mut Vec<String>) -> Result<CanvasConfig, CanvasError> {
    let Some(i) = args.iter().position(|a| a == "--config") else {
        return Ok(CanvasConfig::default());
    };
    if i + 1 >= args.len() {
        return Err(CanvasError::Config("--config needs a file".to_string()));
    }
    let path = args.remove(i + 1);
    args.remove(i);
    CanvasConfig::from_file(path)
}

fn inspect_file(path: &str, config: &CanvasConfig) -> Result<Vec<String>, CanvasError> {
    let content = fs::read_to_string(path)
        .map_err(|e| CanvasError::Config(format!("Failed to read file: {}", e)))?;
    let dialect = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(Dialect::from_extension)
        .unwrap_or(config.dialect);

    let component = compile(&content, dialect, config)?;
    let (mut sandbox, _events) = Sandbox::new(config.clone());
    if let MountOutcome::Failed(message) = sandbox.mount(&component) {
        return Err(CanvasError::Render { message });
    }

    let dom = sandbox.dom();
    Ok(dom
        .addressable_nodes()
        .into_iter()
        .map(|node| address_of(dom, node).to_string())
        .collect())
}

fn print_error(error: &CanvasError) {
    match error {
        CanvasError::Compile {
            line,
            column,
            message,
        } => {
            eprintln!("  Compile error at line {}, column {}:", line, column);
            eprintln!("    {}", message);
        }
        CanvasError::UnsupportedSyntax { dialect, construct } => {
            eprintln!("  Not valid {}:", dialect);
            eprintln!("    {}", construct);
        }
        CanvasError::NoComponent { name } if name.is_empty() => {
            eprintln!("  No component definition found");
        }
        CanvasError::NoComponent { name } => {
            eprintln!("  Component '{}' does not return JSX", name);
        }
        CanvasError::Render { message } => {
            eprintln!("  Render error:");
            eprintln!("    {}", message);
        }
        other => {
            eprintln!("  {}", other);
        }
    }
}

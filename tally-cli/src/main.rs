use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use tally_cache::config::LoggingConfig;
use tally_cache::{Cache, OperationId, TallyConfig, Value, backend};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Tally CLI - instrumented cache with call replay", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Synap server URL (selects the Synap backend)
    #[arg(short, long)]
    url: Option<String>,

    /// Attach to the backend without flushing it
    #[arg(long)]
    keep: bool,

    /// Command to execute (interactive mode if omitted)
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a value and print its key
    Store {
        value: String,
        #[arg(short = 't', long = "type", value_enum, default_value_t = ValueType::Str)]
        kind: ValueType,
    },
    /// Print the value stored under a key
    Get {
        key: String,
        #[arg(long = "as", value_enum, default_value_t = Decode::Raw)]
        decode: Decode,
    },
    /// Print the recorded calls of an operation
    Replay {
        #[arg(short, long, default_value = "Cache.store")]
        operation: String,
    },
    /// Store a few values and replay the calls
    Demo,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ValueType {
    Str,
    Int,
    Float,
    Bytes,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Decode {
    Raw,
    Str,
    Int,
}

fn parse_value(kind: ValueType, text: &str) -> Result<Value> {
    Ok(match kind {
        ValueType::Str => Value::from(text),
        ValueType::Int => Value::from(
            text.parse::<i64>()
                .with_context(|| format!("'{}' is not an integer", text))?,
        ),
        ValueType::Float => Value::from(
            text.parse::<f64>()
                .with_context(|| format!("'{}' is not a float", text))?,
        ),
        ValueType::Bytes => Value::from(text.as_bytes()),
    })
}

async fn cmd_store(cache: &Cache, kind: ValueType, text: &str) -> Result<String> {
    let value = parse_value(kind, text)?;
    let key = cache.store(value).await?;
    Ok(format!("{:?}", key))
}

async fn cmd_get(cache: &Cache, key: &str, decode: Decode) -> Result<String> {
    let nil = || "(nil)".dimmed().to_string();

    let output = match decode {
        Decode::Raw => cache
            .retrieve(key)
            .await?
            .map(|bytes| Value::Bytes(bytes).repr()),
        Decode::Str => cache
            .retrieve_string(key)
            .await?
            .map(|s| format!("{:?}", s)),
        Decode::Int => cache
            .retrieve_integer(key)
            .await?
            .map(|n| format!("(integer) {}", n)),
    };

    Ok(output.unwrap_or_else(nil))
}

async fn cmd_replay(cache: &Cache, operation: &str) -> Result<String> {
    let log = cache.replay(&OperationId::new(operation)).await?;
    let mut lines = log.lines();
    if let Some(summary) = lines.first_mut() {
        *summary = summary.bold().to_string();
    }
    Ok(lines.join("\n"))
}

async fn cmd_demo(cache: &Cache) -> Result<String> {
    for value in [
        Value::from("foo"),
        Value::from("bar"),
        Value::from(42),
        Value::from(3.5),
    ] {
        cache.store(value).await?;
    }
    cmd_replay(cache, Cache::STORE.as_str()).await
}

/// Split a shell line into arguments
///
/// Double-quoted arguments may contain whitespace and the escapes `\"` and
/// `\\`; single-quoted arguments are taken literally.
fn split_line(line: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut arg = String::new();
        if first == '"' || first == '\'' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    c if c == first => {
                        closed = true;
                        break;
                    }
                    '\\' if first == '"' => match chars.next() {
                        Some(escaped @ ('"' | '\\')) => arg.push(escaped),
                        Some(other) => {
                            arg.push('\\');
                            arg.push(other);
                        }
                        None => arg.push('\\'),
                    },
                    c => arg.push(c),
                }
            }
            if !closed {
                anyhow::bail!("unterminated quote in: {}", line);
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                arg.push(c);
            }
        }
        args.push(arg);
    }

    Ok(args)
}

/// Dispatch one interactive command line
async fn execute_line(cache: &Cache, command: &str, args: &[String]) -> Result<String> {
    let arg = |i: usize, usage: &str| {
        args.get(i)
            .map(String::as_str)
            .ok_or_else(|| anyhow::anyhow!("Usage: {}", usage))
    };

    match command.to_uppercase().as_str() {
        "STORE" => {
            let value = arg(0, "STORE value [str|int|float|bytes]")?;
            let kind = match args.get(1) {
                Some(kind) => ValueType::from_str(kind, true).map_err(|e| anyhow::anyhow!(e))?,
                None => ValueType::Str,
            };
            cmd_store(cache, kind, value).await
        }
        "GET" => {
            let key = arg(0, "GET key [raw|str|int]")?;
            let decode = match args.get(1) {
                Some(decode) => Decode::from_str(decode, true).map_err(|e| anyhow::anyhow!(e))?,
                None => Decode::Raw,
            };
            cmd_get(cache, key, decode).await
        }
        "REPLAY" => {
            let operation = args.first().map(String::as_str).unwrap_or("Cache.store");
            cmd_replay(cache, operation).await
        }
        "DEMO" => cmd_demo(cache).await,
        "HELP" => Ok(help_text()),
        _ => Err(anyhow::anyhow!("Unknown command: {}", command)),
    }
}

fn help_text() -> String {
    format!(
        r#"{}

  STORE value [type]         Store value (str, int, float, bytes) and print its key
                             Quote values containing spaces: STORE "hello world"
  GET key [decode]           Print the value under key (raw, str, int)
  REPLAY [operation]         Print recorded calls (default Cache.store)
  DEMO                       Store a few values and replay them
  HELP                       Show this help message
  QUIT                       Exit the CLI
"#,
        "Tally CLI - Available Commands".bold().cyan()
    )
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> Result<TallyConfig> {
    let mut config = match &cli.config {
        Some(path) => TallyConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => TallyConfig::default(),
    };

    if let Some(url) = &cli.url {
        config = config.with_url(url.clone());
    }

    Ok(config)
}

async fn open_cache(config: &TallyConfig, keep: bool) -> Result<Cache> {
    let cache = if keep {
        Cache::attach(backend::connect(&config.backend)?)
    } else {
        Cache::new(backend::connect(&config.backend)?)
            .await
            .context("failed to initialize cache")?
    };
    info!("Using {:?} backend", config.backend.kind);
    Ok(cache)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging);

    let cache = open_cache(&config, cli.keep).await?;

    let result = match cli.command {
        Some(Command::Store { value, kind }) => cmd_store(&cache, kind, &value).await,
        Some(Command::Get { key, decode }) => cmd_get(&cache, &key, decode).await,
        Some(Command::Replay { operation }) => cmd_replay(&cache, &operation).await,
        Some(Command::Demo) => cmd_demo(&cache).await,
        None => return run_interactive(&cache).await,
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "{}", format!("Error: {}", e).red());
            std::process::exit(1);
        }
    }
}

async fn run_interactive(cache: &Cache) -> Result<()> {
    println!(
        "{}",
        format!("Tally CLI v{}", env!("CARGO_PKG_VERSION"))
            .bold()
            .cyan()
    );
    println!("Type {} for available commands\n", "HELP".bold());

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline(&format!("{}> ", "tally".green()));

        match readline {
            Ok(line) => {
                let parts = match split_line(&line) {
                    Ok(parts) => parts,
                    Err(e) => {
                        error!(error = %e, "{}", format!("Error: {}", e).red());
                        continue;
                    }
                };
                let Some((cmd, args)) = parts.split_first() else {
                    continue;
                };

                rl.add_history_entry(line.as_str())?;

                if cmd.eq_ignore_ascii_case("QUIT") || cmd.eq_ignore_ascii_case("EXIT") {
                    println!("Goodbye!");
                    break;
                }

                match execute_line(cache, cmd, args).await {
                    Ok(output) => println!("{}", output),
                    Err(e) => {
                        error!(error = %e, "{}", format!("Error: {}", e).red());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                error!(error = ?err, "Readline error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

//! Moonware CLI
//!
//! Command-line interface for the Moonware script obfuscator and host.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use moonware_core::{reveal, Obfuscator, TransformOptions};
use moonware_server::{run_server, ServerConfig, CONFIG_FILE_NAME};

const DEFAULT_SERVER: &str = "http://localhost:3000";

#[derive(Parser)]
#[command(name = "moonware")]
#[command(about = "Luau script obfuscator and loadstring host")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Config file (default: ./moonware.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Obfuscate a local script
    Obfuscate {
        /// Script to obfuscate
        input: PathBuf,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        stages: StageFlags,
    },

    /// Print the script embedded in a generated loader
    Decode {
        /// Obfuscated artifact
        input: PathBuf,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a script to a running server
    Upload {
        /// Script to upload
        input: PathBuf,

        #[command(flatten)]
        stages: StageFlags,

        /// Server base URL
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },

    /// Show server health and statistics
    Status {
        /// Server base URL
        #[arg(long, default_value = DEFAULT_SERVER)]
        server: String,
    },
}

/// Protection stage switches shared by `obfuscate` and `upload`
#[derive(Args, Debug, Clone, Copy)]
struct StageFlags {
    /// Rename local variables
    #[arg(long)]
    rename: bool,

    /// Encode the script into a self-decoding loader
    #[arg(long)]
    encode: bool,

    /// Prepend the Vanguard banner
    #[arg(long)]
    vanguard: bool,

    /// Prepend the syntax check bypass comment
    #[arg(long)]
    bypass_syntax: bool,

    /// Enable every stage
    #[arg(long)]
    all: bool,
}

impl StageFlags {
    fn options(&self) -> TransformOptions {
        if self.all {
            return TransformOptions::all();
        }
        TransformOptions {
            var_rename: self.rename,
            payload_encode: self.encode,
            header_banner: self.vanguard,
            syntax_bypass_comment: self.bypass_syntax,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for script output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("moonware=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host, config } => {
            cmd_serve(port, host, config).await?;
        }
        Commands::Obfuscate {
            input,
            output,
            stages,
        } => {
            cmd_obfuscate(&input, output.as_deref(), stages.options(), &mut std::io::stdout())?;
        }
        Commands::Decode { input, output } => {
            cmd_decode(&input, output.as_deref(), &mut std::io::stdout())?;
        }
        Commands::Upload {
            input,
            stages,
            server,
        } => {
            cmd_upload(&input, stages.options(), &server).await?;
        }
        Commands::Status { server } => {
            cmd_status(&server).await?;
        }
    }

    Ok(())
}

/// Resolve server configuration: file, then PORT, then flags
fn load_server_config(
    port: Option<u16>,
    host: Option<String>,
    config: Option<PathBuf>,
) -> Result<ServerConfig> {
    let mut server_config = match config {
        Some(path) => ServerConfig::from_config_file(&path)?,
        None if Path::new(CONFIG_FILE_NAME).exists() => {
            ServerConfig::from_config_file(Path::new(CONFIG_FILE_NAME))?
        }
        None => ServerConfig::default(),
    }
    .with_env_overrides();

    if let Some(port) = port {
        server_config.port = port;
    }
    if let Some(host) = host {
        server_config.host = host;
    }
    Ok(server_config)
}

/// Start the server
async fn cmd_serve(port: Option<u16>, host: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let config = load_server_config(port, host, config)?;
    println!("Starting Moonware server on {}...", config.addr());
    run_server(config).await
}

/// Obfuscate a file locally; without `output` the artifact alone goes to `out`
fn cmd_obfuscate(
    input: &Path,
    output: Option<&Path>,
    options: TransformOptions,
    out: &mut impl Write,
) -> Result<()> {
    if !options.any() {
        tracing::warn!("No stages enabled; output will match the input");
    }

    let result = Obfuscator::new(options).obfuscate_file(input)?;

    match output {
        Some(path) => {
            std::fs::write(path, &result.source)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} ({} bytes)", path.display(), result.size());
        }
        None => {
            out.write_all(result.source.as_bytes())?;
            out.flush()?;
        }
    }

    tracing::info!(
        "Applied {} transforms: {} identifiers renamed, payload encoded: {}, {} banners",
        result.total_transforms(),
        result.identifiers_renamed,
        result.payload_encoded,
        result.banners_applied
    );

    Ok(())
}

/// Recover the script inside a loader
fn cmd_decode(input: &Path, output: Option<&Path>, out: &mut impl Write) -> Result<()> {
    let artifact = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read file: {}", input.display()))?;
    let Some(source) = reveal(&artifact) else {
        bail!("No Moonware loader found in {}", input.display());
    };

    match output {
        Some(path) => {
            std::fs::write(path, &source)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Decoded {} bytes to {}", source.len(), path.display());
        }
        None => {
            out.write_all(source.as_bytes())?;
            out.flush()?;
        }
    }
    Ok(())
}

/// Upload a script to a running server
async fn cmd_upload(input: &Path, options: TransformOptions, server: &str) -> Result<()> {
    let script = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read file: {}", input.display()))?;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/upload", server.trim_end_matches('/')))
        .json(&serde_json::json!({
            "script": script,
            "options": options,
        }))
        .send()
        .await
        .context("Failed to reach Moonware server")?;

    let status = response.status();
    let text = response.text().await?;
    let body: serde_json::Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(_) if !status.is_success() => bail!("Upload failed ({}): {}", status, text.trim()),
        Err(e) => return Err(e).context("Server returned an invalid upload response"),
    };
    if !status.is_success() {
        let error = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error");
        bail!("Upload failed ({}): {}", status, error);
    }

    println!("Script id: {}", body["scriptId"].as_str().unwrap_or_default());
    println!("Size:      {} bytes", body["size"]);
    println!("\n{}", body["loadstring"].as_str().unwrap_or_default());
    Ok(())
}

/// Show status
async fn cmd_status(server: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let base = server.trim_end_matches('/');

    match client.get(format!("{}/health", base)).send().await {
        Ok(response) => {
            let health: serde_json::Value = response.json().await?;
            println!("Server status: {}", serde_json::to_string_pretty(&health)?);

            let stats = client
                .get(format!("{}/api/stats", base))
                .send()
                .await?
                .json::<serde_json::Value>()
                .await?;

            println!("Storage: {}", serde_json::to_string_pretty(&stats)?);
        }
        Err(_) => {
            println!("Server is not running at {}.", base);
            println!("Start it with: moonware serve");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_for(args: &[&str]) -> TransformOptions {
        let mut argv = vec!["moonware", "obfuscate", "script.lua"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Obfuscate { stages, .. } => stages.options(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_stage_flags() {
        assert_eq!(options_for(&[]), TransformOptions::default());
        assert_eq!(options_for(&["--all"]), TransformOptions::all());

        let options = options_for(&["--rename", "--bypass-syntax"]);
        assert!(options.var_rename && options.syntax_bypass_comment);
        assert!(!options.payload_encode && !options.header_banner);
    }

    #[test]
    fn test_serve_flags_override_config() {
        let config = load_server_config(Some(9000), Some("127.0.0.1".into()), None).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = load_server_config(None, None, Some(PathBuf::from("/nonexistent/moonware.toml")));
        assert!(result.is_err());
    }

    const SCRIPT: &str = "local x = 1\nprint(x)\n";

    fn script_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCRIPT.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_obfuscate_stdout_is_only_the_artifact() {
        let input = script_file();
        let options = TransformOptions {
            syntax_bypass_comment: true,
            ..Default::default()
        };

        let mut out = Vec::new();
        cmd_obfuscate(input.path(), None, options, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, format!("-- [SYNTAX CHECK BYPASS ENABLED]\n{}", SCRIPT));
        assert!(!out.contains("Applied"));
        assert!(!out.contains('\u{1b}'));
    }

    #[test]
    fn test_obfuscated_stdout_decodes_back() {
        let input = script_file();
        let mut out = Vec::new();
        cmd_obfuscate(input.path(), None, TransformOptions::all(), &mut out).unwrap();

        let artifact = String::from_utf8(out).unwrap();
        assert!(artifact.starts_with("-- [SYNTAX CHECK BYPASS ENABLED]\n"));
        assert!(reveal(&artifact).is_some());

        let mut loader = tempfile::NamedTempFile::new().unwrap();
        loader.write_all(artifact.as_bytes()).unwrap();
        let mut decoded = Vec::new();
        cmd_decode(loader.path(), None, &mut decoded).unwrap();
        assert!(String::from_utf8(decoded).unwrap().contains("print(_0x"));
    }

    #[test]
    fn test_obfuscate_to_file_leaves_stdout_empty() {
        let input = script_file();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.lua");

        let mut out = Vec::new();
        cmd_obfuscate(input.path(), Some(&output), TransformOptions::default(), &mut out).unwrap();

        assert!(out.is_empty());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), SCRIPT);
    }
}

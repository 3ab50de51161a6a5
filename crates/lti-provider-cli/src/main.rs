// crates/lti-provider-cli/src/main.rs
// ============================================================================
// Module: LTI Provider CLI Entry Point
// Description: Command dispatcher for serving and exercising the LTI provider.
// Purpose: Run the HTTP server, check configuration, and sign test launches.
// Dependencies: clap, lti-provider-config, lti-provider-server, thiserror, tokio
// ============================================================================

//! ## Overview
//! `lti-provider serve` runs the launch/run endpoints. `config validate` and
//! `config example` work with `lti-provider.toml`. `launch sign` plays the
//! tool consumer: it prints a signed form body that can be posted to a launch
//! URL with any HTTP client.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use lti_provider_cli::serve_policy::serve_warnings;
use lti_provider_cli::signing::SignRequest;
use lti_provider_cli::signing::form_encode;
use lti_provider_cli::signing::parse_parameter;
use lti_provider_cli::signing::sign_launch;
use lti_provider_config::LtiProviderConfig;
use lti_provider_config::config_toml_example;
use lti_provider_core::LaunchParameters;
use lti_provider_oauth::SignatureMethod;
use lti_provider_server::LtiServer;
use lti_provider_server::LtiServerError;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "lti-provider", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the LTI provider HTTP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Tool-consumer utilities.
    Launch {
        /// Selected launch subcommand.
        #[command(subcommand)]
        command: LaunchCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to lti-provider.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an LTI provider configuration file.
    Validate(ConfigValidateCommand),
    /// Print a canonical example configuration.
    Example,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to lti-provider.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Launch subcommands.
#[derive(Subcommand, Debug)]
enum LaunchCommand {
    /// Print a signed launch form body.
    Sign(LaunchSignCommand),
}

/// Arguments for `launch sign`.
#[derive(Args, Debug)]
struct LaunchSignCommand {
    /// Absolute launch URL the body will be posted to.
    #[arg(long, value_name = "URL")]
    url: String,
    /// OAuth consumer key.
    #[arg(long, value_name = "KEY")]
    consumer_key: String,
    /// OAuth consumer secret.
    #[arg(long, value_name = "SECRET")]
    secret: String,
    /// Signature method.
    #[arg(long, value_enum, default_value_t = MethodArg::HmacSha1)]
    method: MethodArg,
    /// Value for the `roles` parameter.
    #[arg(long, default_value = "Learner")]
    roles: String,
    /// Value for the `context_id` parameter.
    #[arg(long, value_name = "ID", default_value = "lti-provider-context")]
    context_id: String,
    /// Extra launch parameter as name=value (repeatable).
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,
    /// Fixed nonce (random when omitted).
    #[arg(long)]
    nonce: Option<String>,
    /// Fixed timestamp in seconds (current time when omitted).
    #[arg(long)]
    timestamp: Option<u64>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = SignFormat::Form)]
    format: SignFormat,
}

/// Signature method selector.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MethodArg {
    /// HMAC-SHA1 (LTI 1.1 default).
    HmacSha1,
    /// HMAC-SHA256.
    HmacSha256,
}

impl From<MethodArg> for SignatureMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::HmacSha1 => Self::HmacSha1,
            MethodArg::HmacSha256 => Self::HmacSha256,
        }
    }
}

/// Output format for `launch sign`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SignFormat {
    /// One url-encoded form body.
    Form,
    /// One `name=value` pair per line, unencoded.
    Lines,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("lti-provider {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Launch {
            command,
        } => command_launch(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = LtiProviderConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    for warning in serve_warnings(&config) {
        write_stderr_line(&warning.to_string())
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    let server = LtiServer::from_config(config)
        .map_err(|err| CliError::new(format!("failed to initialize server: {err}")))?;
    write_stderr_line(&format!("lti-provider listening on {}", server.bind_addr()))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server
        .serve()
        .await
        .map_err(|err: LtiServerError| CliError::new(format!("server failed: {err}")))?;

    Ok(ExitCode::SUCCESS)
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => command_config_example(),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = LtiProviderConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    for warning in serve_warnings(&config) {
        write_stderr_line(&warning.to_string())
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the canonical example configuration.
fn command_config_example() -> CliResult<ExitCode> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(config_toml_example().as_bytes())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Launch Commands
// ============================================================================

/// Dispatches launch subcommands.
fn command_launch(command: LaunchCommand) -> CliResult<ExitCode> {
    match command {
        LaunchCommand::Sign(command) => command_launch_sign(command),
    }
}

/// Executes `launch sign`.
fn command_launch_sign(command: LaunchSignCommand) -> CliResult<ExitCode> {
    let format = command.format;
    let request = sign_request(command)?;
    let signed = sign_launch(&request).map_err(|err| CliError::new(err.to_string()))?;
    let written = match format {
        SignFormat::Form => write_stdout_line(&form_encode(&signed)),
        SignFormat::Lines => signed
            .iter()
            .try_for_each(|(name, value)| write_stdout_line(&format!("{name}={value}"))),
    };
    written.map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds a [`SignRequest`] from `launch sign` arguments.
fn sign_request(command: LaunchSignCommand) -> CliResult<SignRequest> {
    let mut parameters = LaunchParameters::new();
    parameters.push("roles", command.roles);
    parameters.push("context_id", command.context_id);
    for arg in &command.params {
        let (name, value) = parse_parameter(arg).map_err(|err| CliError::new(err.to_string()))?;
        parameters.push(name, value);
    }
    Ok(SignRequest {
        consumer_key: command.consumer_key,
        consumer_secret: command.secret,
        url: command.url,
        method: command.method.into(),
        parameters,
        nonce: command.nonce,
        timestamp: command.timestamp,
    })
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

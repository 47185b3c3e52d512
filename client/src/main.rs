//! `powerbridge-ctl`: a command line stand-in for the UI, talking to the PowerBridge service over
//! its named pipe.

use clap::{Parser, Subcommand};
use shared_std::ipc::PIPE_NAME;
use tracing_subscriber::EnvFilter;

/// Talks to the PowerBridge service over its named pipe
#[derive(Parser, Debug)]
#[command(name = "powerbridge-ctl", version)]
struct Cli {
    /// Named pipe the service listens on
    #[arg(long, env = "POWERBRIDGE_PIPE", default_value = PIPE_NAME)]
    pipe: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Show the service status
    Status,
    /// Show host resource usage
    Stats,
    /// List the saved apps
    Apps,
    /// Execute a power command, by display name or identifier
    Exec { command: String },
    /// Save a new app
    SaveApp {
        name: String,
        path: String,
        /// Arguments passed to the app, joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Remove an app by id
    DeleteApp { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    run(&cli.pipe, cli.command).await
}

#[cfg(windows)]
async fn run(pipe_name: &str, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    use shared_std::{commands, models::AppEntry};

    let mut client = client::IpcClient::connect(pipe_name)?;

    match command {
        Command::Status => print_json(&client.get_status().await?)?,
        Command::Stats => print_json(&client.get_stats().await?)?,
        Command::Apps => print_json(&client.get_apps().await?)?,
        Command::Exec { command: name } => {
            let command = commands::try_get_command_by_name(&name)
                .ok_or_else(|| format!("unknown command '{name}'"))?;
            client.execute_command(command.command_type).await?;
            println!("{} requested", command.name);
        }
        Command::SaveApp { name, path, args } => {
            let app = AppEntry {
                id: String::new(),
                name,
                path,
                arguments: args.join(" "),
            };
            print_json(&client.save_app(app).await?)?;
        }
        Command::DeleteApp { id } => {
            if client.delete_app(&id).await? {
                println!("deleted {id}");
            } else {
                println!("no app with id {id}");
            }
        }
    }

    Ok(())
}

#[cfg(not(windows))]
async fn run(pipe_name: &str, _command: Command) -> Result<(), Box<dyn std::error::Error>> {
    Err(format!("cannot open {pipe_name}: named pipes are only available on Windows").into())
}

#[cfg(windows)]
fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gradewatch::app::AppContext;
use gradewatch::cli::commands::{self, NewUser};
use gradewatch::cli::{ClassAction, Cli, Commands, DaemonAction, UserAction};
use gradewatch::config::Config;
use gradewatch::daemon;
use gradewatch::domain::ClassSpec;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gradewatch=info")))
        .init();

    let cli = Cli::parse();

    // Stop and status only look at the PID file.
    if let Commands::Daemon { action } = &cli.command {
        match action {
            DaemonAction::Stop => {
                match daemon::stop_daemon() {
                    Ok(()) => println!("Daemon stopped"),
                    Err(e) => eprintln!("{}", e),
                }
                return Ok(());
            }
            DaemonAction::Status => {
                println!("{}", daemon::daemon_status());
                return Ok(());
            }
            DaemonAction::Start { .. } => {}
        }
    }

    let config = Config::load(cli.config.as_deref())?;
    let ctx = if cli.in_memory {
        AppContext::in_memory(config)?
    } else {
        AppContext::new(config)?
    };

    match cli.command {
        Commands::User {
            action:
                UserAction::Add {
                    email,
                    first,
                    last,
                    code,
                    nip,
                    notify,
                },
        } => {
            commands::add_user(
                &ctx,
                NewUser {
                    email,
                    first,
                    last,
                    code,
                    nip,
                    notify,
                },
            )?;
        }
        Commands::Class {
            action:
                ClassAction::Add {
                    user_id,
                    name,
                    group,
                    year,
                },
        } => {
            commands::add_class(&ctx, &user_id, ClassSpec::new(name, group, year))?;
        }
        Commands::List => {
            commands::list(&ctx)?;
        }
        Commands::Refresh { user_id } => {
            commands::refresh(&ctx, &user_id).await?;
        }
        Commands::Daemon {
            action:
                DaemonAction::Start {
                    foreground,
                    no_initial_refresh,
                },
        } => {
            commands::start_daemon(&ctx, cli.config.as_deref(), foreground, no_initial_refresh)
                .await?;
        }
        Commands::Daemon { .. } => {}
    }

    Ok(())
}

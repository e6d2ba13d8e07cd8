//! warden - guarded SQL access to Amazon Redshift.

mod cli;
mod output;

use anyhow::{bail, Context};
use cli::{Cli, Command};
use redshift_warden::config::Config;
use redshift_warden::db::QueryResult;
use redshift_warden::logging::{self, LogTarget};
use redshift_warden::Warden;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let target = if cli.log_file {
        LogTarget::file()
    } else {
        LogTarget::Stderr
    };
    logging::init_logging(target);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let mut config = Config::load(Some(&config_path)).context("Failed to load configuration")?;
    cli.apply_to(&mut config)?;

    let mut warden = Warden::from_config(&config);

    if !cli.command.needs_connection() {
        return dispatch(&mut warden, &cli).await;
    }

    info!(
        "Connecting to {} ({} mode, {} driver)",
        config.connection.display_string(),
        config.access_mode,
        config.driver
    );
    let (connected, message) = warden.connect_with_config(&config).await;
    if !connected {
        bail!(message);
    }
    info!("{}", message);

    let outcome = dispatch(&mut warden, &cli).await;

    let (disconnected, message) = warden.disconnect().await;
    if !disconnected {
        error!("{}", message);
    }

    outcome
}

async fn dispatch(warden: &mut Warden, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Query { sql, .. } => {
            let result = warden
                .execute_query(sql, &cli.command.query_params())
                .await?;
            print_result(&result, cli.json)
        }
        Command::Schemas => print_result(&warden.list_schemas().await?, cli.json),
        Command::Tables { schema } => print_result(&warden.list_tables(schema).await?, cli.json),
        Command::Describe { table, schema } => {
            let result = warden.describe_table(table, Some(schema)).await?;
            print_result(&result, cli.json)
        }
        Command::Summary { schema, max_tables } => {
            let summary = warden
                .get_table_schema_info(Some(schema), *max_tables)
                .await;
            if cli.json {
                println!("{}", output::to_json(&summary)?);
            } else {
                println!("{}", summary);
            }
            Ok(())
        }
        Command::Status => {
            let info = warden.connection_info();
            if cli.json {
                println!("{}", output::to_json(&info)?);
            } else {
                println!(
                    "Connected to {}/{} as {} ({} mode, {} driver)",
                    info.host.as_deref().unwrap_or("-"),
                    info.database.as_deref().unwrap_or("-"),
                    info.user.as_deref().unwrap_or("-"),
                    info.mode,
                    info.driver
                );
            }
            Ok(())
        }
        Command::SystemTables => {
            println!("{}", warden.system_tables_reference());
            Ok(())
        }
    }
}

fn print_result(result: &QueryResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", output::to_json(result)?);
    } else {
        println!("{}", output::format_result(result));
    }
    Ok(())
}

mod inspect;
mod lifecycle;
mod list;
mod set;
mod settings;
mod status;
mod table;
mod ui;

use anyhow::Result;

use crate::backend::IpcClient;
use crate::cli::Commands;
use crate::config::AppConfig;
use crate::status::ServiceAction;

pub async fn run(command: Commands, config: &AppConfig) -> Result<()> {
    if let Commands::Inspect { snapshot, settings } = &command {
        return inspect::run(snapshot.as_deref(), settings.as_deref());
    }

    let client = IpcClient::from_config(config);

    match command {
        Commands::Ui { interval_ms } => {
            ui::run(&client, config.refresh_interval_or(interval_ms)).await
        }
        Commands::List => list::run(&client).await,
        Commands::Status { service } => status::run(&client, &service).await,
        Commands::Start { service } => {
            lifecycle::run(&client, &service, ServiceAction::Start).await
        }
        Commands::Stop { service } => lifecycle::run(&client, &service, ServiceAction::Stop).await,
        Commands::Restart { service } => {
            lifecycle::run(&client, &service, ServiceAction::Restart).await
        }
        Commands::Settings { service } => settings::run(&client, &service).await,
        Commands::Set {
            service,
            field,
            value,
        } => set::run(&client, &service, &field, &value).await,
        Commands::Inspect { .. } => unreachable!("inspect is handled before connecting"),
    }
}

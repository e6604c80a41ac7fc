//! curio is a CLI tool to deploy, upgrade and administer the Curio collection contract.

mod cli;

use std::process::ExitCode;

use alloy_core::primitives::Address;
use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};
use curio_lifecycle::{
    AdminOperator, DeploymentOrchestrator, DeploymentRecord, Identity, LifecycleConfig,
    LifecycleError, RemoteContract, TxJournal, UpgradeOrchestrator, parse_address,
    parse_proxy_address, summary,
};

/// Exit code when a transaction is still outstanding after the confirmation deadline.
const EXIT_CONFIRMATION_TIMEOUT: u8 = 3;
/// Conventional exit code for SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let journal = TxJournal::default();

    tokio::select! {
        result = run(&cli, journal.clone()) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                let code = report_error(&err);
                if !journal.is_empty() {
                    eprintln!("Transactions submitted during this run:");
                    eprintln!("{}", summary::outstanding_table(&journal.entries()));
                }
                code
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(command = %cli.command, "Interrupted");
            if journal.is_empty() {
                eprintln!("Interrupted before any transaction was submitted.");
            } else {
                eprintln!("Interrupted. These transactions were submitted and may still land:");
                eprintln!("{}", summary::outstanding_table(&journal.entries()));
            }
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn run(cli: &Cli, journal: TxJournal) -> Result<()> {
    let config = LifecycleConfig::load(cli.config.as_deref(), &cli.overrides())?;
    let profile = config.network_profile()?;
    let identity = Identity::from_secret(config.private_key.as_ref())?.with_journal(journal);

    tracing::info!(
        command = %cli.command,
        network = %profile.name,
        chain_id = profile.chain_id,
        identity = %identity.address(),
        "Starting..."
    );

    let client = RemoteContract::connect(profile.clone(), config.rpc_retry_policy())?;
    let policy = config.confirmation_policy(&profile);

    match &cli.command {
        Command::Deploy { .. } => {
            let artifact = config.artifact()?;
            client.verify_chain_id().await?;

            let result = DeploymentOrchestrator::new(&client, &identity, policy)
                .run(&artifact)
                .await?;

            println!("{}", summary::deployment_table(&profile, &result));
            save_record(
                &config,
                DeploymentRecord::deployment(&profile, identity.address(), &artifact.name, &result),
            );
        }
        Command::Upgrade { .. } => {
            // Rejected before any network access.
            parse_proxy_address(config.proxy_address.as_deref())?;
            let artifact = config.artifact()?;
            client.verify_chain_id().await?;

            let result = UpgradeOrchestrator::new(&client, &identity, policy)
                .run(config.proxy_address.as_deref(), &artifact)
                .await?;

            println!("{}", summary::upgrade_table(&profile, &result));
            save_record(
                &config,
                DeploymentRecord::upgrade(&profile, identity.address(), &artifact.name, &result),
            );
        }
        Command::AddAdmin { .. } => {
            let (contract, target) = admin_targets(&config)?;
            client.verify_chain_id().await?;

            let result = AdminOperator::new(&client, policy)
                .add_admin(contract, target, &identity)
                .await?;

            println!("{}", summary::admin_table(&profile, &result));
            if let Some(record) = DeploymentRecord::admin_grant(&profile, identity.address(), &result)
            {
                save_record(&config, record);
            }
        }
    }

    Ok(())
}

/// Contract and admin addresses for `add-admin`, both validated before any network access.
fn admin_targets(config: &LifecycleConfig) -> curio_lifecycle::Result<(Address, &str)> {
    let contract = config.contract_address.as_deref().ok_or_else(|| {
        LifecycleError::Configuration("no contract address configured".to_string())
    })?;
    let contract = parse_address(contract)?;

    let target = config.admin_address.as_deref().ok_or_else(|| {
        LifecycleError::Configuration("no admin address configured".to_string())
    })?;
    parse_address(target)?;

    Ok((contract, target))
}

/// The on-chain change already happened; a failed write is reported but does not fail the run.
fn save_record(config: &LifecycleConfig, record: DeploymentRecord) {
    let Some(dir) = &config.record_dir else {
        return;
    };

    if let Err(err) = record.append_to(dir) {
        tracing::warn!(error = %format!("{err:#}"), "Failed to save deployment record");
    }
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    let Some(lifecycle) = err.downcast_ref::<LifecycleError>() else {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    };

    eprintln!("error[{}]: {lifecycle}", lifecycle.kind());
    eprintln!("hint: {}", lifecycle.hint());

    match lifecycle {
        LifecycleError::ConfirmationTimeout { hash, .. } => {
            eprintln!("outstanding transaction: {hash}");
            ExitCode::from(EXIT_CONFIRMATION_TIMEOUT)
        }
        _ => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(contract: Option<&str>, admin: Option<&str>) -> LifecycleConfig {
        LifecycleConfig {
            contract_address: contract.map(str::to_string),
            admin_address: admin.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_admin_targets_validated_locally() {
        let contract = "0x0000000000000000000000000000000000000001";
        let admin = "0x00000000000000000000000000000000000000aa";

        let valid = config(Some(contract), Some(admin));
        let (parsed, target) = admin_targets(&valid).unwrap();
        assert_eq!(parsed, parse_address(contract).unwrap());
        assert_eq!(target, admin);

        assert!(matches!(
            admin_targets(&config(Some(contract), Some("0x1234"))),
            Err(LifecycleError::InvalidAddress { .. })
        ));
        assert!(matches!(
            admin_targets(&config(Some(contract), None)),
            Err(LifecycleError::Configuration(_))
        ));
    }
}

//! Human-readable run summaries.

use comfy_table::{Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::{
    admin::{AdminGrantResult, AdminOutcome},
    deploy::{ConstantCheck, DeploymentResult},
    network::NetworkProfile,
    tx::{JournalEntry, TransactionReceipt},
    upgrade::UpgradeResult,
};

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(vec!["Field", "Value"]);
    table
}

fn network_row(table: &mut Table, profile: &NetworkProfile) {
    table.add_row(vec![
        "Network".to_string(),
        format!("{} (chain {})", profile.name, profile.chain_id),
    ]);
}

fn receipt_cell(receipt: &TransactionReceipt) -> String {
    match receipt.block_number {
        Some(block) => format!(
            "{} (block {block}, {} confirmations)",
            receipt.hash, receipt.confirmations
        ),
        None => format!("{} ({})", receipt.hash, receipt.status),
    }
}

fn constant_cell(check: &ConstantCheck) -> String {
    match check {
        ConstantCheck::Matched => "ok".to_string(),
        ConstantCheck::Mismatched { expected, observed } => {
            format!("MISMATCH: expected {expected}, found {observed}")
        }
        ConstantCheck::Unreadable { reason } => format!("unreadable: {reason}"),
    }
}

pub fn deployment_table(profile: &NetworkProfile, result: &DeploymentResult) -> Table {
    let mut table = table();
    network_row(&mut table, profile);
    table
        .add_row(vec!["Contract".to_string(), result.contract_address.to_string()])
        .add_row(vec![
            "Deployment tx".to_string(),
            receipt_cell(&result.deployment_transaction),
        ])
        .add_row(vec![
            "OPERATIONS_ADDRESS".to_string(),
            constant_cell(&result.constants.operations_address),
        ])
        .add_row(vec![
            "OPERATIONS_FEE".to_string(),
            constant_cell(&result.constants.operations_fee),
        ]);
    table
}

pub fn upgrade_table(profile: &NetworkProfile, result: &UpgradeResult) -> Table {
    let mut table = table();
    network_row(&mut table, profile);
    table
        .add_row(vec!["Proxy".to_string(), result.proxy_address.to_string()])
        .add_row(vec![
            "Previous implementation".to_string(),
            result.previous_implementation.to_string(),
        ])
        .add_row(vec![
            "New implementation".to_string(),
            result.new_implementation.to_string(),
        ])
        .add_row(vec![
            "Implementation tx".to_string(),
            receipt_cell(&result.implementation_deployment),
        ])
        .add_row(vec![
            "Upgrade tx".to_string(),
            receipt_cell(&result.upgrade_transaction),
        ])
        .add_row(vec!["Outcome".to_string(), result.outcome.to_string()]);
    table
}

pub fn admin_table(profile: &NetworkProfile, result: &AdminGrantResult) -> Table {
    let mut table = table();
    network_row(&mut table, profile);
    table
        .add_row(vec!["Contract".to_string(), result.contract_address.to_string()])
        .add_row(vec!["Admin".to_string(), result.target.to_string()]);

    match &result.outcome {
        AdminOutcome::Granted { transaction } => {
            table.add_row(vec!["Grant tx".to_string(), receipt_cell(transaction)]);
        }
        AdminOutcome::AlreadyAdmin => {
            table.add_row(vec!["Grant tx".to_string(), "none (already an admin)".to_string()]);
        }
    }
    table
}

/// Transactions submitted before a run was cut short.
pub fn outstanding_table(entries: &[JournalEntry]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Transaction", "Hash"]);
    for entry in entries {
        table.add_row(vec![entry.label.clone(), entry.hash.to_string()]);
    }
    table
}

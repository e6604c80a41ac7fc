//! curio-lifecycle - Contract lifecycle orchestration for the Curio collection contract.
//!
//! This crate deploys, upgrades and administers the on-chain contract through a
//! remote JSON-RPC endpoint, verifying remote state before and after every
//! state-changing transaction.

pub mod admin;
pub mod confirmation;
pub mod config;
pub mod contract;
pub mod deploy;
mod error;
pub mod identity;
pub mod network;
pub mod record;
pub mod rpc;
pub mod summary;
pub mod tx;
pub mod upgrade;

pub use admin::{AdminGrantResult, AdminOperator, AdminOutcome};
pub use config::{ConfigOverrides, LifecycleConfig};
pub use confirmation::{ConfirmationPolicy, RetryPolicy, await_confirmations, retry_bounded};
pub use contract::{
    AdminManageable, ChainClient, ContractArtifact, Deployable, PendingDeployment,
    RemoteContract, Upgradeable, parse_address,
};
pub use deploy::{ConstantCheck, ConstantsReport, DeploymentOrchestrator, DeploymentResult};
pub use error::{LifecycleError, Result};
pub use identity::{Identity, SecretKey};
pub use network::{KnownNetwork, NetworkOverrides, NetworkProfile};
pub use record::DeploymentRecord;
pub use tx::{TransactionReceipt, TxJournal, TxStatus};
pub use upgrade::{UpgradeOrchestrator, UpgradeOutcome, UpgradeResult, parse_proxy_address};

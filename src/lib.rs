//! Repo (repurchase agreement) contract lifecycle over an append-only sled ledger.

pub mod config;
pub mod confirmation;
pub mod contract;
pub mod error;
pub mod index;
pub mod interest;
pub mod operation;
pub mod query;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

pub use config::ServiceConfig;
pub use contract::{ContractRecord, ContractStatus};
pub use error::{ContractError, ErrorKind};
pub use operation::{Operation, Response};
pub use service::ContractService;

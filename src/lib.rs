pub mod advisory;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod provider;
pub mod report;
pub mod store;
pub mod strategy;

pub use advisory::{Advisor, ChatClient, FailPolicy, LlmAdvisor, Verdict};
pub use config::AppConfig;
pub use coordinator::RoundCoordinator;
pub use domain::TreasuryView;
pub use error::{GambitError, GatewayError, Result, StoreError};
pub use gateway::{ApiCredentials, ClobGateway, ExecutionGateway, PaperGateway};
pub use provider::{GammaProvider, SnapshotProvider};
pub use report::RunReport;
pub use store::StateStore;
pub use strategy::{Strategy, StrategyKind};

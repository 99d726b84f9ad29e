pub mod config;
pub mod error;
pub mod generator;
pub mod history;
pub mod notify;
pub mod provider;
pub mod request;
pub mod resolver;
pub mod response;

pub use config::{GeneratorConfig, ProviderConfig};
pub use error::EngineError;
pub use generator::{AlbumMove, GeneratorOptions, TickReport};
pub use history::HistoryRecorder;
pub use notify::{ChangeEvent, ChangeNotifier};
pub use provider::Provider;
pub use request::{BulkItem, DEFAULT_AUTHORITY, Operation, Request, ResourceKind, ResourceRef};
pub use resolver::Resolver;
pub use response::{Outcome, Record, Response};

//! Infrastructure layer: DB, route cache, config, and the invoice mutation service.

pub mod config;
pub mod invoice_service;
pub mod repository;
pub mod route_cache;


pub use config::{AppConfig, ConfigError};
pub use invoice_service::{
    ActionError, ActionOutcome, Committed, InvoiceMutationService, MutationSettings, Rejection,
    RejectionKind,
};
pub use repository::{InMemoryInvoiceRepository, InvoiceRepository, PostgresInvoiceRepository, RepositoryError};
pub use route_cache::{INVOICES_PATH, InMemoryRouteCache, Revalidation, RouteCache};

//! bms-service: multi-tenant building management backend.
//!
//! Buildings, units and rent; tenants, leases, invoices and payments; utility
//! meters; assets and maintenance; site security; feature flags and reports.
//! Every record is scoped to an organization.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

pub use startup::{build_router, AppState, Application};

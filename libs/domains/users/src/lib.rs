//! Users Domain
//!
//! This module provides a complete domain implementation for managing users,
//! including a batched CSV export with a time-based file cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints (CRUD + CSV export)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Business logic, validation
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Data access (trait + implementations)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs, pagination
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_users::{
//!     export::ExportService,
//!     handlers,
//!     repository::InMemoryUserRepository,
//!     service::UserService,
//! };
//!
//! // Create repository and services
//! let repository = Arc::new(InMemoryUserRepository::new());
//! let service = UserService::new(repository.clone());
//! let export = ExportService::new(repository, "exports_cache");
//!
//! // Create Axum router
//! let router = handlers::router(service, export);
//! ```

pub mod entity;
pub mod error;
pub mod export;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use error::{UserError, UserResult};
pub use export::ExportService;
pub use models::{CreateUser, NewUser, Page, PageRequest, UpdateUser, User};
pub use postgres::PgUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;

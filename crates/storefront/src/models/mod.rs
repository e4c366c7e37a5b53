//! Domain models for the storefront auth service.

pub mod audit;
pub mod session;
pub mod user;

pub use audit::{AuditEvent, AuditEventKind};
pub use session::CurrentUser;
pub use user::{AdminUserUpdate, NewUser, PageRequest, Pagination, PublicUser, User};

//! Application state traits for dependency injection
//!
//! Handlers are generic over [`HasGrants`] so the same router runs against
//! the production `AppState` and against test states with in-memory stores
//! and a mock provider.

use crate::config::Config;
use crate::provider::MessagingProvider;
use crate::repository::GrantRepository;
use crate::service::{
    AuthorizationFlow, DispatchService, GrantGate, GrantService, MailboxService,
};

/// Trait for application state that provides the grant-aware services
pub trait HasGrants: Clone + Send + Sync + 'static {
    /// The grant store type
    type Repo: GrantRepository;
    /// The mail provider type
    type Provider: MessagingProvider;

    /// Get the application configuration
    fn config(&self) -> &Config;

    fn grant_service(&self) -> &GrantService<Self::Repo>;

    fn authorization_flow(&self) -> &AuthorizationFlow<Self::Repo, Self::Provider>;

    fn grant_gate(&self) -> &GrantGate<Self::Repo>;

    fn dispatch_service(&self) -> &DispatchService<Self::Repo, Self::Provider>;

    fn mailbox_service(&self) -> &MailboxService<Self::Provider>;

    /// Check if the grant store answers
    fn check_ready(&self) -> impl std::future::Future<Output = bool> + Send;
}

//! Business logic layer

pub mod authorization;
pub mod dispatch;
pub mod gate;
pub mod grant;
pub mod mailbox;

pub use authorization::{AuthorizationFlow, AuthorizeHints};
pub use dispatch::DispatchService;
pub use gate::{GrantGate, UserIdHint};
pub use grant::GrantService;
pub use mailbox::MailboxService;

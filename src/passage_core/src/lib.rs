pub mod authenticator;
pub mod chain;
pub mod error;
pub mod http_abstraction;
pub mod options;
pub mod ports;
pub mod request;
pub mod response;
pub mod session;
pub mod strategies;

// Re-export commonly used types for convenience
pub use authenticator::{Authenticator, SharedStrategy};

pub use chain::{
    ChainHandler, ChainKind, Done, Resolved, SharedHandler, Step, from_async, from_callback,
    from_fn,
};

pub use error::{AuthError, BoxError};

pub use options::{AuthenticateOptions, FlashOption, MessageOption};

pub use ports::host::{Flash, FlashHandle, HostSession, SessionError, SessionHandle};

pub use request::{LoginOptions, RequestContext, Scratch};

pub use response::{AuthResponse, Disposition};

pub use session::{SessionManager, SessionPersistence, SessionRecord, memory::MemorySession};

pub use strategies::{
    session::SessionStrategy,
    strategy::{Action, Failure, Strategy},
};

pub use http_abstraction::{AuthRequest, AuthResponseBuilder, AuthResponseHelpers};

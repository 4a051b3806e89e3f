pub mod authenticate;
pub mod callback;
pub mod flash;

// Re-export for convenience
pub use authenticate::{Authenticate, RETURN_TO_KEY, StrategyNames};
pub use callback::{AuthenticateCallback, CallbackOutcome, Failures};
pub use flash::MESSAGES_KEY;

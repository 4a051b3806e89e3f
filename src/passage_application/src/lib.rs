pub mod ext;
pub mod use_cases;

pub use ext::{AUTHORIZE_PROPERTY, AuthenticatorExt};
pub use use_cases::*;

//! # Passage - Authentication Dispatch Library
//!
//! This is a facade crate that re-exports the public APIs of the Passage
//! components. Use it to get the whole authentication stack in one place.
//!
//! ## Usage
//!
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! passage = { path = "../passage" }
//! ```
//!
//! ## Structure
//!
//! - **Core**: `Authenticator`, `RequestContext`, `Strategy`, chain handlers
//! - **Use cases**: `Authenticate` and its options and callbacks
//! - **Adapters**: configuration, session flash store, tracing setup
//! - **Axum**: `initialize` / `authenticate` middleware and the `Auth` extractor

// ============================================================================
// Core
// ============================================================================

/// Registry, request state, strategies and session persistence
pub mod core {
    pub use passage_core::*;
}

// Re-export most commonly used core types at the root level
pub use passage_core::{
    Action, AuthError, AuthRequest, AuthenticateOptions, Authenticator, Failure, FlashOption,
    HostSession, LoginOptions, MemorySession, MessageOption, RequestContext, SessionHandle,
    SessionStrategy, Step, Strategy,
};

// ============================================================================
// Use Cases (Application Layer)
// ============================================================================

/// Application use cases
pub mod use_cases {
    pub use passage_application::*;
}

// Re-export use cases at root level
pub use passage_application::{
    Authenticate, AuthenticateCallback, AuthenticatorExt, CallbackOutcome, Failures,
    StrategyNames,
};

// ============================================================================
// Adapters (Infrastructure)
// ============================================================================

/// Infrastructure adapters
pub mod adapters {
    /// Configuration
    pub mod config {
        pub use passage_adapters::config::*;
    }

    /// Flash message store
    pub mod flash {
        pub use passage_adapters::flash::*;
    }

    /// Tracing setup
    pub mod telemetry {
        pub use passage_adapters::telemetry::*;
    }
}

pub use passage_adapters::{AuthenticatorSettings, SessionFlash, init_tracing};

// ============================================================================
// Axum Integration
// ============================================================================

/// Axum middleware, extractor and response builder
pub mod web {
    pub use passage_axum::*;
}

// ============================================================================
// Re-export common external dependencies
// ============================================================================

/// Re-export async-trait for implementing `Strategy` and `ChainHandler`
pub use async_trait::async_trait;

pub use http;
pub use serde_json;

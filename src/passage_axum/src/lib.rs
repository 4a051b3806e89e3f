//! Axum integration for the Passage authentication library.
//!
//! The core crates never name a web framework; this crate plugs them into
//! axum's middleware stack.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  passage_core / passage_application      │
//! │  RequestContext, Authenticate, ...       │
//! └──────────────┬───────────────────────────┘
//!                │
//!                ▼
//! ┌──────────────────────────────────────────┐
//! │  passage_axum: Axum implementations      │
//! │  - initialize / authenticate middleware  │
//! │  - Auth<U> extractor                     │
//! │  - AxumResponseBuilder                   │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The host installs a [`passage_core::SessionHandle`] extension on each
//! request (from whatever session layer it uses), then layers [`initialize`]
//! outside any route-level [`authenticate`] layers.
//!
//! # Usage
//!
//! ```ignore
//! use axum::{Router, middleware, routing::{get, post}};
//! use passage_application::AuthenticatorExt;
//!
//! let login = auth.authenticate("local", AuthenticateOptions::new().success_redirect("/"));
//!
//! let app = Router::new()
//!     .route("/login", post(|| async {}).layer(middleware::from_fn_with_state(login, authenticate::<User>)))
//!     .route("/me", get(me))
//!     .layer(middleware::from_fn_with_state(auth.session(), authenticate::<User>))
//!     .layer(middleware::from_fn_with_state(auth.clone(), initialize::<User>));
//! ```

pub mod adapters;
pub mod error;
pub mod extract;
pub mod middleware;

pub use adapters::{AxumResponseBuilder, response_builder};
pub use error::AuthRejection;
pub use extract::Auth;
pub use middleware::{authenticate, initialize};

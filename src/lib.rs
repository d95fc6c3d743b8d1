//! steward: turn-based decision and orchestration core for a
//! personal-assistant application.
//!
//! Given one user utterance, already reduced to classified sub-intents, the
//! core decides which role posture to adopt, whether to proceed against the
//! active goal context, which capabilities to invoke with what parameters,
//! and in what order. Natural-language classification, response generation
//! and every read/write adapter are external collaborators behind the traits
//! in [`external`].
//!
//! Typical embedding:
//!
//! ```no_run
//! use std::sync::Arc;
//! use steward::config::Config;
//! use steward::router::HandlerRegistry;
//! use steward::turn::{Session, TurnEngine};
//! # use steward::external::{Classifier, ConditionSource, GoalSource, LedgerSink, RecoverySource};
//! # async fn run(
//! #     classifier: Arc<dyn Classifier>,
//! #     goals: Arc<dyn GoalSource>,
//! #     recovery: Arc<dyn RecoverySource>,
//! #     conditions: Arc<dyn ConditionSource>,
//! #     ledger: Arc<dyn LedgerSink>,
//! # ) {
//! let engine = TurnEngine::new(
//!     classifier,
//!     goals,
//!     recovery,
//!     conditions,
//!     ledger,
//!     HandlerRegistry::default(),
//!     Config::default(),
//! );
//! let mut session = Session::new("user-1");
//! let output = engine.process_turn(&mut session, "schedule a sync tomorrow at 3pm").await;
//! println!("{}", output.unified_summary);
//! # }
//! ```

pub mod alignment;
pub mod capability;
pub mod compiler;
pub mod config;
pub mod conversation;
pub mod error;
pub mod external;
pub mod observability;
pub mod points;
pub mod roles;
pub mod router;
pub mod scheduler;
pub mod signals;
pub mod timeparse;
pub mod turn;

pub use error::{Result, StewardError};

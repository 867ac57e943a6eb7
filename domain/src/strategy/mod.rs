//! Strategy domain module
//!
//! A strategy is a named, validated team of agents plus the rules of their
//! exchange:
//!
//! - [`StrategyKind`]: the catalogue of known strategies
//! - [`TurnSelector`]: who speaks next, as a pure function of the transcript
//! - [`TerminationCondition`]: when the exchange is over
//! - [`StrategyConfig`]: agents + selector + termination + round cap
//!
//! ```text
//!            ┌────────── TerminationCondition ──────────┐
//!            ▼                                          │
//! user ask ─▶ TurnSelector ─▶ agent ─▶ (tools)* ─▶ transcript
//!                 ▲                                     │
//!                 └─────────────────────────────────────┘
//! ```

pub mod config;
pub mod kind;
pub mod selection;
pub mod termination;

pub use config::{StrategyConfig, StrategyConfigBuilder};
pub use kind::StrategyKind;
pub use selection::{
    AllowListSelector, DATASOURCE_SELECTED_MARKER, NextSpeaker, QUESTION_ANSWERED_MARKER,
    RoutingSelector, SpeakerSelector, TurnSelector,
};
pub use termination::{DEFAULT_TERMINATE_MARKER, TerminationCondition, TerminationReason};

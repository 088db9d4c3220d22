// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! latch-core: message-join resolution for suspended continuations.
//!
//! One locally executing parallel entity suspends fragments of control
//! flow until a set of asynchronously arriving, tagged messages has been
//! buffered, then resumes exactly the right continuation exactly once.
//! The [`DependencyResolver`] is the join engine; the
//! [`TimeOrderedDeliveryQueue`] imposes a total timestamp order on
//! messages before they are fed in.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::use_self
)]

mod buffer;
mod ident;
mod index;
mod queue;
mod registry;
mod resolver;
mod trigger;

// Re-exports for stable public API
/// Identifier and handle types for entries, whens, tags, and messages.
pub use ident::{CorrelationTag, EntryId, MessageHandle, TriggerHandle, WhenId};
/// Time-ordered delivery queue and its ticket/capability types.
pub use queue::{DeliveryTicket, QueueError, TimeKeyed, TimeOrderedDeliveryQueue};
/// The join resolution engine and its outcome/error types.
pub use resolver::{DependencyResolver, RegisterOutcome, ResolverError};
/// Continuation descriptors.
pub use trigger::{SpecificDep, Trigger};

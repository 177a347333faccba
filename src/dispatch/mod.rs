//! Observer notification
//!
//! Events flow from subscriptions into a per-session [`EventDispatcher`],
//! which delivers them to each subscription's [`SubscriberObserver`] on a
//! single task.
//!
//! ```text
//!   caller ──start()──┐
//!                     ├──► EventDispatcher queue ──► dispatch task ──► observer
//!   transport pump ───┘         (FIFO, unbounded)     (gate + Weak upgrade)
//! ```

pub mod dispatcher;
pub mod event;
pub mod observer;

pub use dispatcher::EventDispatcher;
pub use event::SubscriberEvent;
pub use observer::SubscriberObserver;

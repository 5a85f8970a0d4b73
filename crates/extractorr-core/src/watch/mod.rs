//! Directory watching and job dispatch.

pub mod dispatcher;
pub mod event;
pub mod inflight;
pub mod notifier;

pub use dispatcher::DispatchSummary;
pub use dispatcher::DispatcherState;
pub use dispatcher::WatchDispatcher;
pub use event::Operation;
pub use event::WatchEvent;
pub use inflight::Admission;
pub use inflight::InFlight;
pub use notifier::EventReceiver;
pub use notifier::Notifier;
pub use notifier::NotifierError;
pub use notifier::NotifierMessage;
pub use notifier::WatchError;

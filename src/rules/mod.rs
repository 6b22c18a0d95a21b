pub mod diagnostic;
pub mod finding;
pub mod policy;
pub mod sinks;

pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use finding::{Confidence, Finding, LeakReason};
pub use sinks::{SinkKind, SinkMatcher, SinkPattern};

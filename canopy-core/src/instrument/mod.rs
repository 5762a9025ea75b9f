//! Instrumented Stores
//!
//! Decorators that wrap a store, forward every call to it, and add an
//! observable side effect once a mutation has committed. They never change
//! what the wrapped store returns and never swallow its errors.
//!
//! - `LoggingStore` records each mutation with `tracing`.
//! - `DevtoolsStore` mirrors each mutation to an external state inspector
//!   and accepts "jump to state" commands back from it.

mod devtools;
mod logging;

pub use devtools::{
    DevtoolsConnection, DevtoolsMessage, DevtoolsStore, InboundListener, LoopbackConnection,
    MessageKind, MessagePayload, PayloadKind,
};
pub use logging::LoggingStore;

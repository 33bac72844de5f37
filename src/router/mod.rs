//! Message Router
//!
//! Decides for every incoming request whether it is served, deferred to a
//! human decision in the popup, or answered with `locked`.

mod dispatcher;
mod error;
pub mod protocol;

pub use dispatcher::{ClearPolicy, MessageRouter, PopupRoute, REDIRECT_KEY};
pub use error::RouterError;
pub use protocol::{Request, RequestApi, RequestEnvelope, Response, ResponseApi, ResponseEnvelope};

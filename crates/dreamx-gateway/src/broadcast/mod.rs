//! Bus to socket fan-out

mod dispatcher;

pub use dispatcher::EventDispatcher;

pub mod connection;
pub mod directory;
pub mod machine;
pub mod room;
pub mod stream;

pub use connection::ConnectionSession;
pub use machine::{ChatSessionStateMachine, Screen, Signal};
pub use stream::SendOutcome;

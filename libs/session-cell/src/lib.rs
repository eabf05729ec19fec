pub mod channel;
pub mod clock;
pub mod models;
pub mod reminders;
pub mod services;

pub use channel::*;
pub use clock::*;
pub use models::*;
pub use reminders::*;
pub use services::*;

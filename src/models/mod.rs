pub mod presence;
pub mod rule;
pub mod window;

pub use presence::{FriendPayload, FriendPresence, TitlePayload};
pub use rule::Rule;
pub use window::WindowRecord;

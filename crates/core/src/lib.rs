pub mod album_id_list;
pub mod clock;
pub mod entity;
pub mod error;
pub mod history;
pub mod ids;

pub use clock::MonotonicClock;
pub use entity::{Album, Artist};
pub use error::CoreError;
pub use history::{ActionResult, ActionType, HistoryStamp};
pub use ids::*;

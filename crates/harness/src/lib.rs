pub mod invariants;
pub mod observer;
pub mod provider;

pub use invariants::assert_linked;
pub use observer::TestObservers;
pub use provider::TestProvider;

mod blocking;
mod handle;
mod store;
mod wild;

pub use blocking::BlockingStore;
pub use handle::StoreHandle;
pub use store::Store;
pub use wild::WildStore;

mod dispatch;
mod handle;
mod server;

pub use dispatch::Dispatcher;
pub use handle::CoordinatorHandle;
pub use server::ControlServer;

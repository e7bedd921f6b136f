//! The minibatch data channel, kept apart from the control channel.

mod recv_minibatch;
mod send_minibatch;

pub use recv_minibatch::recv_minibatch;
pub use send_minibatch::send_minibatch;

mod session;
mod state;
mod subscription;

pub use session::*;
pub use state::*;
pub use subscription::*;

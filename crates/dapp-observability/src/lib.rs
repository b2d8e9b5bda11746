mod blockchain;
mod multicall;
mod task;
mod transactions;

pub use blockchain::*;
pub use multicall::*;
pub use task::*;
pub use transactions::*;

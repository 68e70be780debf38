pub mod position;
pub mod stock;
pub mod response;

pub use position::*;
pub use stock::*;
pub use response::*;

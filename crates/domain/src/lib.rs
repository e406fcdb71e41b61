pub mod due_date;
pub mod errors;
pub mod todo;

pub use due_date::*;
pub use errors::*;
pub use todo::*;

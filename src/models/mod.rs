pub mod quote;
pub mod symbol;
pub mod table;

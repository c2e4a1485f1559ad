pub mod admission;
pub mod catalog;
pub mod forms;
pub mod money;

mod common;
mod forms;
mod payments;

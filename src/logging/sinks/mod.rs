pub mod console;
pub mod file;

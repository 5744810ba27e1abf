pub mod symbol;
pub mod symbol_library;

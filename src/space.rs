pub mod element;
pub mod function_space;

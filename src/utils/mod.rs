pub mod arg_aliases;
pub mod text;

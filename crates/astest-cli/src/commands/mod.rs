pub mod ast;
pub mod run;

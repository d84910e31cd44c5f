pub mod asm;
pub mod domain;
pub mod error;
pub mod protocol;

//! Tree‑walking interpreter for the **mad** scripting language.
//!
//! The pipeline is `scan` → `parse` → [`Interpreter::interpret`];
//! [`session::Session`] strings the three together and applies the
//! batch/interactive error policy.

pub mod ast;
pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod session;
pub mod token;
pub mod value;

pub use error::{MadError, Result};
pub use interpreter::Interpreter;
pub use parser::parse;
pub use scanner::scan;
pub use session::{Mode, Session, Status};

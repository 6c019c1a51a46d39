//! The backend translates the SSA module into textual LLVM IR; the driver
//! hands that text to clang together with the C runtime to produce a
//! native binary.

pub mod llvm;

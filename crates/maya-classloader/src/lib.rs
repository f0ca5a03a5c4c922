//! Wires the class-file parser and format checker into a running method
//! area: resolve a binary name to bytes, parse and validate it, install it,
//! then run its ancestors' and its own `<clinit>`.

pub mod init;
pub mod loader;
pub mod registry;

use maya_classfile_io::ClassfileIOError;
use maya_classfile_ir::class_pool::IRClassfileError;
use maya_classfile_verifier::ClassFormatError;
use thiserror::Error;

/// Reported by the interpreter collaborator when running a `<clinit>` frame
/// fails for a reason this crate doesn't model (e.g. an uncaught exception
/// escaping the class initializer).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct VmError(pub String);

#[derive(Debug, Error)]
pub enum LoaderError {
	#[error("class not found: {0}")]
	ClassNotFound(String),
	#[error("class circularity error: {0} is already being loaded on this chain")]
	ClassCircularityError(String),
	#[error("no class def found: {0} failed initialization previously")]
	NoClassDefFoundError(String),
	#[error("class file for \"{expected}\" actually describes \"{actual}\"")]
	ClassNameMismatch { expected: String, actual: String },
	#[error("{0}")]
	Io(#[from] ClassfileIOError),
	#[error("{0}")]
	Format(#[from] ClassFormatError),
	#[error("{0}")]
	Ir(#[from] IRClassfileError),
	#[error("{0}")]
	Vm(#[from] VmError),
}

pub use init::{Initializer, Interpreter};
pub use loader::{ClassLoader, ClassSource};
pub use registry::{InitState, InstalledClass, MethodArea, MethodRef};

//! Structural validation of a parsed class file: constant pool cross-reference
//! integrity, method-handle/type/invokedynamic constraints, and field
//! name/descriptor legality.
//!
//! This is the "format check" the class loader runs before a class is
//! installed in the method area. It does not verify bytecode type-safety —
//! that's stage 3 verification and out of scope here.

use maya_classfile_io::class_pool::CpTag;
use maya_classfile_io::ClassFile;
use thiserror::Error;

const FIELD_DESCRIPTOR_STARTERS: &[u8] = b"BCDFIJLSZ[";

#[derive(Debug, Error)]
pub enum ClassFormatError {
	#[error("constant pool size mismatch: expected {expected}, got {actual}")]
	CpSizeMismatch { expected: usize, actual: usize },
	#[error("missing dummy entry in first slot of constant pool")]
	MissingInitialDummy,
	#[error("missing dummy entry after wide constant at CP entry #{0}")]
	MissingWideDummy(usize),
	#[error("UTF8 string for CP entry #{0} contains an invalid byte (0x00 or 0xf0..=0xff)")]
	InvalidUtf8Bytes(usize),
	#[error("CP entry #{index} ({what}) points to an invalid or wrong-kind CP index {target}")]
	InvalidReference {
		index: usize,
		what: &'static str,
		target: usize,
	},
	#[error("Method Ref at CP entry #{index} has an invalid method name: {name}")]
	InvalidMethodRefName { index: usize, name: String },
	#[error("NameAndType at CP entry #{index} has an invalid descriptor: {descriptor}")]
	InvalidDescriptor { index: usize, descriptor: String },
	#[error("MethodHandle at CP entry #{index} has an invalid reference_kind: {kind}")]
	InvalidMethodHandleKind { index: usize, kind: u8 },
	#[error(
		"MethodHandle at CP entry #{index} (reference_kind {kind}) does not point to a {expected}"
	)]
	MethodHandleKindMismatch {
		index: usize,
		kind: u8,
		expected: &'static str,
	},
	#[error(
		"MethodHandle at CP entry #{index} has an invalid method name for reference_kind {kind}: {name}"
	)]
	InvalidMethodHandleName { index: usize, kind: u8, name: String },
	#[error("MethodType at CP entry #{0} does not start with '('")]
	InvalidMethodTypeDescriptor(usize),
	#[error("field #{0} has an invalid name index")]
	InvalidFieldNameIndex(usize),
	#[error("field #{0} has an invalid descriptor index")]
	InvalidFieldDescriptorIndex(usize),
	#[error("field \"{0}\" has a name starting with a digit")]
	FieldNameStartsWithDigit(String),
	#[error("field \"{0}\" has a name containing whitespace")]
	FieldNameContainsWhitespace(String),
	#[error("field \"{name}\" has an invalid descriptor: {descriptor}")]
	InvalidFieldDescriptor { name: String, descriptor: String },
}

/// Runs the full format check: constant pool invariants, then field legality.
/// The first violation short-circuits the whole check.
pub fn validate_class(class: &ClassFile) -> Result<(), ClassFormatError> {
	validate_constant_pool(class)?;
	validate_fields(class)?;
	Ok(())
}

fn validate_constant_pool(class: &ClassFile) -> Result<(), ClassFormatError> {
	let cp = &class.cp;
	if cp.len() != class.cp_count as usize {
		return Err(ClassFormatError::CpSizeMismatch {
			expected: class.cp_count as usize,
			actual: cp.len(),
		});
	}
	if !matches!(cp.first(), Some(CpTag::Dummy)) {
		return Err(ClassFormatError::MissingInitialDummy);
	}

	let mut j = 1usize;
	while j < cp.len() {
		match &cp[j] {
			CpTag::Dummy => {}
			CpTag::Utf8 { bytes } => {
				if bytes
					.iter()
					.any(|&b| b == 0x00 || (0xF0..=0xFF).contains(&b))
				{
					return Err(ClassFormatError::InvalidUtf8Bytes(j));
				}
			}
			CpTag::Integer { .. } | CpTag::Float { .. } => {}
			CpTag::Long { .. } | CpTag::Double { .. } => {
				if !matches!(cp.get(j + 1), Some(CpTag::Dummy)) {
					return Err(ClassFormatError::MissingWideDummy(j));
				}
				j += 1;
			}
			CpTag::Class { name_index } => {
				resolve_utf8(cp, *name_index as usize, j, "ClassRef name_index")?;
			}
			CpTag::String { utf8_index } => {
				resolve_utf8(cp, *utf8_index as usize, j, "StringConst utf8_index")?;
			}
			CpTag::FieldRef {
				class_index,
				name_and_type_index,
			} => {
				resolve_class(cp, *class_index as usize, j, "FieldRef class_index")?;
				resolve_name_and_type(
					cp,
					*name_and_type_index as usize,
					j,
					"FieldRef name_and_type_index",
				)?;
			}
			CpTag::MethodRef {
				class_index,
				name_and_type_index,
			} => {
				resolve_class(cp, *class_index as usize, j, "MethodRef class_index")?;
				let nt_idx = *name_and_type_index as usize;
				resolve_name_and_type(cp, nt_idx, j, "MethodRef name_and_type_index")?;

				let name = method_ref_name(cp, nt_idx)?;
				if name.starts_with('<') && name != "<init>" {
					return Err(ClassFormatError::InvalidMethodRefName { index: j, name });
				}
			}
			CpTag::InterfaceMethodRef {
				class_index,
				name_and_type_index,
			} => {
				resolve_class(cp, *class_index as usize, j, "InterfaceMethodRef class_index")?;
				resolve_name_and_type(
					cp,
					*name_and_type_index as usize,
					j,
					"InterfaceMethodRef name_and_type_index",
				)?;
			}
			CpTag::NameAndType {
				name_index,
				descriptor_index,
			} => {
				resolve_utf8(cp, *name_index as usize, j, "NameAndType name_index")?;
				let descriptor = resolve_utf8(
					cp,
					*descriptor_index as usize,
					j,
					"NameAndType descriptor_index",
				)?;
				if !is_valid_field_or_method_descriptor(descriptor) {
					return Err(ClassFormatError::InvalidDescriptor {
						index: j,
						descriptor: String::from_utf8_lossy(descriptor).into_owned(),
					});
				}
			}
			CpTag::MethodHandle {
				reference_kind,
				reference_index,
			} => {
				validate_method_handle(cp, j, *reference_kind, *reference_index, class.major_version)?;
			}
			CpTag::MethodType { descriptor_index } => {
				let descriptor = resolve_utf8(
					cp,
					*descriptor_index as usize,
					j,
					"MethodType descriptor_index",
				)?;
				if descriptor.first() != Some(&b'(') {
					return Err(ClassFormatError::InvalidMethodTypeDescriptor(j));
				}
			}
			CpTag::InvokeDynamic {
				name_and_type_index,
				..
			} => {
				resolve_name_and_type(
					cp,
					*name_and_type_index as usize,
					j,
					"InvokeDynamic name_and_type_index",
				)?;
				// The interface-chain/bootstrap-table cross-check is intentionally
				// skipped: resolving it requires the bootstrap method table, which
				// this crate never sees, and the original implementation leaves the
				// matching check unchecked for the same reason.
			}
		}
		j += 1;
	}

	Ok(())
}

fn validate_fields(class: &ClassFile) -> Result<(), ClassFormatError> {
	for (i, field) in class.fields.iter().enumerate() {
		let name = match class.cp.get(field.name_index as usize) {
			Some(CpTag::Utf8 { bytes }) => bytes,
			_ => return Err(ClassFormatError::InvalidFieldNameIndex(i)),
		};
		let descriptor = match class.cp.get(field.descriptor_index as usize) {
			Some(CpTag::Utf8 { bytes }) => bytes,
			_ => return Err(ClassFormatError::InvalidFieldDescriptorIndex(i)),
		};

		if name.first().is_some_and(|b| b.is_ascii_digit()) {
			return Err(ClassFormatError::FieldNameStartsWithDigit(
				String::from_utf8_lossy(name).into_owned(),
			));
		}

		const WHITESPACE: &[u8] = &[0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x20, 0x85, 0xA0];
		if name.iter().any(|b| WHITESPACE.contains(b)) {
			return Err(ClassFormatError::FieldNameContainsWhitespace(
				String::from_utf8_lossy(name).into_owned(),
			));
		}

		if !is_valid_field_or_method_descriptor(descriptor) {
			return Err(ClassFormatError::InvalidFieldDescriptor {
				name: String::from_utf8_lossy(name).into_owned(),
				descriptor: String::from_utf8_lossy(descriptor).into_owned(),
			});
		}
	}
	Ok(())
}

fn is_valid_field_or_method_descriptor(desc: &[u8]) -> bool {
	match desc.first() {
		Some(b'(') => true,
		Some(c) => FIELD_DESCRIPTOR_STARTERS.contains(c),
		None => false,
	}
}

fn resolve_utf8<'cp>(
	cp: &'cp [CpTag],
	index: usize,
	at: usize,
	what: &'static str,
) -> Result<&'cp [u8], ClassFormatError> {
	match cp.get(index) {
		Some(CpTag::Utf8 { bytes }) => Ok(bytes),
		_ => Err(ClassFormatError::InvalidReference {
			index: at,
			what,
			target: index,
		}),
	}
}

fn resolve_class(
	cp: &[CpTag],
	index: usize,
	at: usize,
	what: &'static str,
) -> Result<(), ClassFormatError> {
	match cp.get(index) {
		Some(CpTag::Class { .. }) => Ok(()),
		_ => Err(ClassFormatError::InvalidReference {
			index: at,
			what,
			target: index,
		}),
	}
}

fn resolve_name_and_type(
	cp: &[CpTag],
	index: usize,
	at: usize,
	what: &'static str,
) -> Result<(), ClassFormatError> {
	match cp.get(index) {
		Some(CpTag::NameAndType { .. }) => Ok(()),
		_ => Err(ClassFormatError::InvalidReference {
			index: at,
			what,
			target: index,
		}),
	}
}

/// Resolves a MethodRef's name via NameAndType -> Utf8, returning it as a
/// lossily-decoded string (method names are always ASCII, so this never
/// loses information in practice).
fn method_ref_name(cp: &[CpTag], name_and_type_index: usize) -> Result<String, ClassFormatError> {
	let name_index = match cp.get(name_and_type_index) {
		Some(CpTag::NameAndType { name_index, .. }) => *name_index as usize,
		_ => {
			return Err(ClassFormatError::InvalidReference {
				index: name_and_type_index,
				what: "NameAndType name_index",
				target: name_and_type_index,
			})
		}
	};
	let bytes = resolve_utf8(cp, name_index, name_and_type_index, "NameAndType name_index")?;
	Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn validate_method_handle(
	cp: &[CpTag],
	at: usize,
	ref_kind: u8,
	ref_index: u16,
	major_version: u16,
) -> Result<(), ClassFormatError> {
	if !(1..=9).contains(&ref_kind) {
		return Err(ClassFormatError::InvalidMethodHandleKind { index: at, kind: ref_kind });
	}

	let ref_index = ref_index as usize;
	let referent = cp.get(ref_index);

	match ref_kind {
		1..=4 => {
			if !matches!(referent, Some(CpTag::FieldRef { .. })) {
				return Err(ClassFormatError::MethodHandleKindMismatch {
					index: at,
					kind: ref_kind,
					expected: "FieldRef",
				});
			}
			return Ok(());
		}
		5 | 8 => {
			if !matches!(referent, Some(CpTag::MethodRef { .. })) {
				return Err(ClassFormatError::MethodHandleKindMismatch {
					index: at,
					kind: ref_kind,
					expected: "MethodRef",
				});
			}
		}
		6 | 7 => {
			let ok = matches!(referent, Some(CpTag::MethodRef { .. }))
				|| (major_version >= 52 && matches!(referent, Some(CpTag::InterfaceMethodRef { .. })));
			if !ok {
				return Err(ClassFormatError::MethodHandleKindMismatch {
					index: at,
					kind: ref_kind,
					expected: "MethodRef or (>= Java 52) InterfaceMethodRef",
				});
			}
		}
		9 => {
			if !matches!(referent, Some(CpTag::InterfaceMethodRef { .. })) {
				return Err(ClassFormatError::MethodHandleKindMismatch {
					index: at,
					kind: ref_kind,
					expected: "InterfaceMethodRef",
				});
			}
			return Ok(());
		}
		_ => unreachable!("ref_kind already range-checked"),
	}

	let name_and_type_index = match referent {
		Some(CpTag::MethodRef { name_and_type_index, .. })
		| Some(CpTag::InterfaceMethodRef { name_and_type_index, .. }) => *name_and_type_index as usize,
		_ => unreachable!("checked above"),
	};
	let name = method_ref_name(cp, name_and_type_index)?;

	if (5..=7).contains(&ref_kind) {
		if name == "<init>" || name == "<clinit>" {
			return Err(ClassFormatError::InvalidMethodHandleName {
				index: at,
				kind: ref_kind,
				name,
			});
		}
	} else if ref_kind == 8 && name != "<init>" {
		return Err(ClassFormatError::InvalidMethodHandleName {
			index: at,
			kind: ref_kind,
			name,
		});
	}

	log::trace!("MethodHandle at CP entry #{at} resolves to method name {name:?}");
	Ok(())
}

#[cfg(test)]
mod tests {
	use maya_classfile_io::class_pool::CpTag;
	use maya_classfile_io::ClassFile;

	use super::*;

	fn empty_class(cp: Vec<CpTag>) -> ClassFile {
		ClassFile {
			magic: maya_classfile_io::MAGIC,
			minor_version: 0,
			major_version: 52,
			cp_count: cp.len() as u16,
			cp,
			access_flags: 0,
			this_class: 0,
			super_class: 0,
			interfaces: vec![],
			fields: vec![],
			methods: vec![],
			attributes: vec![],
		}
	}

	#[test]
	fn method_handle_referencing_wrong_kind_fails() {
		let cp = vec![
			CpTag::Dummy,
			CpTag::NameAndType {
				name_index: 0,
				descriptor_index: 0,
			},
			CpTag::MethodHandle {
				reference_kind: 5,
				reference_index: 1,
			},
		];
		let class = empty_class(cp);
		assert!(matches!(
			validate_class(&class),
			Err(ClassFormatError::MethodHandleKindMismatch { index: 2, .. })
		));
	}

	#[test]
	fn utf8_with_invalid_byte_fails() {
		let cp = vec![CpTag::Dummy, CpTag::Utf8 { bytes: vec![0xFF] }];
		let class = empty_class(cp);
		assert!(matches!(
			validate_class(&class),
			Err(ClassFormatError::InvalidUtf8Bytes(1))
		));
	}

	#[test]
	fn method_type_must_start_with_open_paren() {
		let cp = vec![
			CpTag::Dummy,
			CpTag::Utf8 {
				bytes: b"Lfoo/Bar;".to_vec(),
			},
			CpTag::MethodType { descriptor_index: 1 },
		];
		let class = empty_class(cp);
		assert!(matches!(
			validate_class(&class),
			Err(ClassFormatError::InvalidMethodTypeDescriptor(2))
		));
	}

	#[test]
	fn method_ref_name_must_be_init_if_bracketed() {
		let cp = vec![
			CpTag::Dummy,
			CpTag::Utf8 {
				bytes: b"<oops>".to_vec(),
			},
			CpTag::Utf8 {
				bytes: b"()V".to_vec(),
			},
			CpTag::NameAndType {
				name_index: 1,
				descriptor_index: 2,
			},
			CpTag::Utf8 {
				bytes: b"Foo".to_vec(),
			},
			CpTag::Class { name_index: 4 },
			CpTag::MethodRef {
				class_index: 5,
				name_and_type_index: 3,
			},
		];
		let class = empty_class(cp);
		assert!(matches!(
			validate_class(&class),
			Err(ClassFormatError::InvalidMethodRefName { index: 6, .. })
		));
	}

	#[test]
	fn field_name_starting_with_digit_fails() {
		let cp = vec![
			CpTag::Dummy,
			CpTag::Utf8 {
				bytes: b"1bad".to_vec(),
			},
			CpTag::Utf8 { bytes: b"I".to_vec() },
		];
		let mut class = empty_class(cp);
		class.fields.push(maya_classfile_io::FieldInfo {
			access_flags: 0,
			name_index: 1,
			descriptor_index: 2,
			attributes: vec![],
		});
		assert!(matches!(
			validate_class(&class),
			Err(ClassFormatError::FieldNameStartsWithDigit(_))
		));
	}

	#[test]
	fn cp_size_mismatch_fails() {
		let mut class = empty_class(vec![CpTag::Dummy]);
		class.cp_count = 5;
		assert!(matches!(
			validate_class(&class),
			Err(ClassFormatError::CpSizeMismatch { .. })
		));
	}
}

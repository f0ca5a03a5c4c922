use maya_bytes::*;

use crate::ClassfileIOError;

// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-5.html#jvms-5.4.3.5
#[repr(u8)]
pub enum MethodRefKind {
	GetField = 1,
	GetStatic,
	PutField,
	PutStatic,
	InvokeVirtual,
	InvokeStatic,
	InvokeSpecial,
	NewInvokeSpecial,
	InvokeInterface,
}

/// One constant pool slot, wire-exact.
///
/// `Dummy` is never written to the wire; it only ever appears at index 0
/// and at the slot following a `Long`/`Double`, reconstructed by
/// [`read_constant_pool`] to keep indices 1-based the way the class file
/// format requires.
#[derive(Debug, Clone)]
pub enum CpTag {
	Dummy,
	// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.4.7
	Utf8 {
		bytes: Vec<u8>,
	},
	Integer {
		bytes: [u8; 4],
	},
	Float {
		bytes: [u8; 4],
	},
	// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.4.5
	// All 8-byte constants take up two entries in the constant_pool table of the class file.
	// If a CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table-
	// at index n, then the next usable item in the pool is located at index n+2.
	// The constant_pool index n+1 must be valid but is considered unusable.
	Long {
		bytes: [u8; 8],
	},
	Double {
		bytes: [u8; 8],
	},
	Class {
		name_index: u16,
	},
	String {
		utf8_index: u16,
	},
	FieldRef {
		class_index: u16,
		name_and_type_index: u16,
	},
	MethodRef {
		class_index: u16,
		name_and_type_index: u16,
	},
	InterfaceMethodRef {
		class_index: u16,
		name_and_type_index: u16,
	},
	NameAndType {
		name_index: u16,
		descriptor_index: u16,
	},
	// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.4.8
	MethodHandle {
		reference_kind: u8,
		reference_index: u16,
	},
	// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.4.9
	MethodType {
		descriptor_index: u16,
	},
	// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.4.10
	InvokeDynamic {
		bootstrap_method_attr_index: u16,
		name_and_type_index: u16,
	},
}

impl CpTag {
	fn read_one<B: BytesExt>(buffer: &mut B) -> Result<CpTag, ClassfileIOError> {
		let tag = buffer.read_u8()?;
		match tag {
			1 => {
				let len = buffer.read_u16()?;
				let bytes = buffer.read_n_bytes_vec(len as usize)?;
				Ok(CpTag::Utf8 { bytes })
			}
			3 => Ok(CpTag::Integer {
				bytes: buffer.read_n_bytes::<4>()?,
			}),
			4 => Ok(CpTag::Float {
				bytes: buffer.read_n_bytes::<4>()?,
			}),
			5 => Ok(CpTag::Long {
				bytes: buffer.read_n_bytes::<8>()?,
			}),
			6 => Ok(CpTag::Double {
				bytes: buffer.read_n_bytes::<8>()?,
			}),
			7 => Ok(CpTag::Class {
				name_index: buffer.read_u16()?,
			}),
			8 => Ok(CpTag::String {
				utf8_index: buffer.read_u16()?,
			}),
			9 => Ok(CpTag::FieldRef {
				class_index: buffer.read_u16()?,
				name_and_type_index: buffer.read_u16()?,
			}),
			10 => Ok(CpTag::MethodRef {
				class_index: buffer.read_u16()?,
				name_and_type_index: buffer.read_u16()?,
			}),
			11 => Ok(CpTag::InterfaceMethodRef {
				class_index: buffer.read_u16()?,
				name_and_type_index: buffer.read_u16()?,
			}),
			12 => Ok(CpTag::NameAndType {
				name_index: buffer.read_u16()?,
				descriptor_index: buffer.read_u16()?,
			}),
			15 => Ok(CpTag::MethodHandle {
				reference_kind: buffer.read_u8()?,
				reference_index: buffer.read_u16()?,
			}),
			16 => Ok(CpTag::MethodType {
				descriptor_index: buffer.read_u16()?,
			}),
			18 => Ok(CpTag::InvokeDynamic {
				bootstrap_method_attr_index: buffer.read_u16()?,
				name_and_type_index: buffer.read_u16()?,
			}),
			_ => Err(ClassfileIOError::UnknownConstantTag(tag)),
		}
	}

	pub fn is_wide(&self) -> bool {
		matches!(self, CpTag::Long { .. } | CpTag::Double { .. })
	}

	pub fn id(&self) -> Option<u8> {
		match self {
			CpTag::Dummy => None,
			CpTag::Utf8 { .. } => Some(1),
			CpTag::Integer { .. } => Some(3),
			CpTag::Float { .. } => Some(4),
			CpTag::Long { .. } => Some(5),
			CpTag::Double { .. } => Some(6),
			CpTag::Class { .. } => Some(7),
			CpTag::String { .. } => Some(8),
			CpTag::FieldRef { .. } => Some(9),
			CpTag::MethodRef { .. } => Some(10),
			CpTag::InterfaceMethodRef { .. } => Some(11),
			CpTag::NameAndType { .. } => Some(12),
			CpTag::MethodHandle { .. } => Some(15),
			CpTag::MethodType { .. } => Some(16),
			CpTag::InvokeDynamic { .. } => Some(18),
		}
	}

	fn write_one<B: BytesExt>(&self, buffer: &mut B) -> Result<(), ClassfileIOError> {
		let id = self.id().expect("Dummy entries are never written standalone");
		buffer.write_u8(id)?;
		match self {
			CpTag::Dummy => unreachable!(),
			CpTag::Utf8 { bytes } => {
				buffer.write_u16(bytes.len() as u16)?;
				buffer.write_all(bytes)?;
			}
			CpTag::Integer { bytes } | CpTag::Float { bytes } => buffer.write_all(bytes)?,
			CpTag::Long { bytes } | CpTag::Double { bytes } => buffer.write_all(bytes)?,
			CpTag::Class { name_index } => buffer.write_u16(*name_index)?,
			CpTag::String { utf8_index } => buffer.write_u16(*utf8_index)?,
			CpTag::FieldRef {
				class_index,
				name_and_type_index,
			}
			| CpTag::MethodRef {
				class_index,
				name_and_type_index,
			}
			| CpTag::InterfaceMethodRef {
				class_index,
				name_and_type_index,
			} => {
				buffer.write_u16(*class_index)?;
				buffer.write_u16(*name_and_type_index)?;
			}
			CpTag::NameAndType {
				name_index,
				descriptor_index,
			} => {
				buffer.write_u16(*name_index)?;
				buffer.write_u16(*descriptor_index)?;
			}
			CpTag::MethodHandle {
				reference_kind,
				reference_index,
			} => {
				buffer.write_u8(*reference_kind)?;
				buffer.write_u16(*reference_index)?;
			}
			CpTag::MethodType { descriptor_index } => {
				buffer.write_u16(*descriptor_index)?;
			}
			CpTag::InvokeDynamic {
				bootstrap_method_attr_index,
				name_and_type_index,
			} => {
				buffer.write_u16(*bootstrap_method_attr_index)?;
				buffer.write_u16(*name_and_type_index)?;
			}
		}
		Ok(())
	}
}

/// Reads the constant pool given the declared `constant_pool_count`.
///
/// `cp_count` is `N` as it appears on the wire: entries are numbered
/// `1..N-1`, but the returned `Vec` has length `N` because index 0 is a
/// reserved dummy and a `Long`/`Double` at index `j` consumes index `j+1`
/// as a second, unusable dummy. Only real entries are read off the wire;
/// dummy continuation slots are synthesized, never decoded.
pub fn read_constant_pool<B: BytesExt>(
	buffer: &mut B,
	cp_count: u16,
) -> Result<Vec<CpTag>, ClassfileIOError> {
	let cp_count = cp_count as usize;
	let mut cp = Vec::with_capacity(cp_count);
	cp.push(CpTag::Dummy);

	let mut index = 1usize;
	while index < cp_count {
		let tag = CpTag::read_one(buffer)?;
		let wide = tag.is_wide();
		cp.push(tag);
		index += 1;

		if wide {
			cp.push(CpTag::Dummy);
			index += 1;
		}
	}

	Ok(cp)
}

/// Re-encodes a constant pool exactly as [`read_constant_pool`] would have
/// consumed it off the wire: dummy slots produce no bytes, everything else
/// is written in index order.
pub fn write_constant_pool<B: BytesExt>(cp: &[CpTag], buffer: &mut B) -> Result<(), ClassfileIOError> {
	for entry in &cp[1..] {
		if matches!(entry, CpTag::Dummy) {
			continue;
		}
		entry.write_one(buffer)?;
	}
	Ok(())
}

pub struct AccessFlags;
impl AccessFlags {
	pub const ACC_PUBLIC: u16 = 0x0001;
	pub const ACC_FINAL: u16 = 0x0010;
	pub const ACC_SUPER: u16 = 0x0020;
	pub const ACC_INTERFACE: u16 = 0x0200;
	pub const ACC_ABSTRACT: u16 = 0x0400;
	pub const ACC_SYNTHETIC: u16 = 0x1000;
	pub const ACC_ANNOTATION: u16 = 0x2000;
	pub const ACC_ENUM: u16 = 0x4000;
}

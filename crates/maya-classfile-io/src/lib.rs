pub mod class_pool;

use class_pool::{read_constant_pool, write_constant_pool, CpTag};
use maya_bytes::*;
use thiserror::Error;

pub const MAGIC: u32 = 0xCAFEBABE;

#[derive(Debug, Error)]
pub enum ClassfileIOError {
	#[error("First 4 bytes were not 0xCAFEBABE")]
	InvalidMagic,
	#[error("Unknown constant pool tag: {0}")]
	UnknownConstantTag(u8),
	#[error("{0}")]
	Bytes(#[from] BytesError),
	#[error("IO Error: {0}")]
	IO(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct ClassFile {
	pub magic: u32,
	pub minor_version: u16,
	pub major_version: u16,
	pub cp_count: u16,
	pub cp: Vec<CpTag>,
	pub access_flags: u16,
	pub this_class: u16,
	pub super_class: u16,
	pub interfaces: Vec<u16>,
	pub fields: Vec<FieldInfo>,
	pub methods: Vec<MethodInfo>,
	pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
	pub fn read<B: BytesExt>(
		buffer: &mut B,
	) -> Result<ClassFile, ClassfileIOError> {
		let magic = buffer.read_u32()?;
		if magic != MAGIC {
			return Err(ClassfileIOError::InvalidMagic);
		}

		let minor_version = buffer.read_u16()?;
		let major_version = buffer.read_u16()?;
		let cp_count = buffer.read_u16()?;
		let cp = read_constant_pool(buffer, cp_count)?;

		let access_flags = buffer.read_u16()?;
		let this_class = buffer.read_u16()?;
		let super_class = buffer.read_u16()?;

		let interface_count = buffer.read_u16()?;
		let mut interfaces = Vec::with_capacity(interface_count as usize);
		for _ in 0..interface_count {
			interfaces.push(buffer.read_u16()?);
		}

		let field_count = buffer.read_u16()?;
		let mut fields = Vec::with_capacity(field_count as usize);
		for _ in 0..field_count {
			fields.push(FieldInfo::read(buffer)?);
		}

		let method_count = buffer.read_u16()?;
		let mut methods = Vec::with_capacity(method_count as usize);
		for _ in 0..method_count {
			methods.push(MethodInfo::read(buffer)?);
		}

		let attribute_count = buffer.read_u16()?;
		let mut attributes = Vec::with_capacity(attribute_count as usize);
		for _ in 0..attribute_count {
			attributes.push(AttributeInfo::read(buffer)?);
		}

		Ok(Self {
			magic,
			minor_version,
			major_version,
			cp_count,
			cp,
			access_flags,
			this_class,
			super_class,
			interfaces,
			fields,
			methods,
			attributes,
		})
	}

	pub fn write<B: BytesExt>(
		&self,
		buffer: &mut B,
	) -> Result<(), ClassfileIOError> {
		buffer.write_u32(self.magic)?;
		buffer.write_u16(self.minor_version)?;
		buffer.write_u16(self.major_version)?;
		buffer.write_u16(self.cp_count)?;
		write_constant_pool(&self.cp, buffer)?;

		buffer.write_u16(self.access_flags)?;
		buffer.write_u16(self.this_class)?;
		buffer.write_u16(self.super_class)?;

		buffer.write_u16(self.interfaces.len() as u16)?;
		for iface in &self.interfaces {
			buffer.write_u16(*iface)?;
		}

		buffer.write_u16(self.fields.len() as u16)?;
		for field in &self.fields {
			field.write(buffer)?;
		}

		buffer.write_u16(self.methods.len() as u16)?;
		for method in &self.methods {
			method.write(buffer)?;
		}

		buffer.write_u16(self.attributes.len() as u16)?;
		for attr in &self.attributes {
			attr.write(buffer)?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone)]
pub struct AttributeInfo {
	pub attribute_name_index: u16,
	pub attribute_length: u32,
	pub info: Vec<u8>,
}

impl AttributeInfo {
	pub fn read<B: BytesExt>(
		buffer: &mut B,
	) -> Result<AttributeInfo, BytesError> {
		let attribute_name_index = buffer.read_u16()?;
		let attribute_length = buffer.read_u32()?;
		Ok(AttributeInfo {
			attribute_name_index,
			attribute_length,
			info: buffer.read_n_bytes_vec(attribute_length as usize)?,
		})
	}

	pub fn write<B: BytesExt>(
		&self,
		buffer: &mut B,
	) -> Result<(), ClassfileIOError> {
		buffer.write_u16(self.attribute_name_index)?;
		buffer.write_u32(self.attribute_length)?;
		buffer.write_all(&self.info)?;
		Ok(())
	}
}

#[derive(Debug)]
pub struct FieldInfo {
	pub access_flags: u16,
	pub name_index: u16,
	pub descriptor_index: u16,
	pub attributes: Vec<AttributeInfo>,
}

impl FieldInfo {
	pub fn read<B: BytesExt>(
		buffer: &mut B,
	) -> Result<FieldInfo, BytesError> {
		let access_flags = buffer.read_u16()?;
		let name_index = buffer.read_u16()?;
		let descriptor_index = buffer.read_u16()?;
		let attributes_count = buffer.read_u16()?;
		let mut attributes = Vec::with_capacity(attributes_count as usize);
		for _ in 0..attributes_count {
			attributes.push(AttributeInfo::read(buffer)?);
		}

		Ok(FieldInfo {
			access_flags,
			name_index,
			descriptor_index,
			attributes,
		})
	}

	pub fn write<B: BytesExt>(
		&self,
		buffer: &mut B,
	) -> Result<(), ClassfileIOError> {
		buffer.write_u16(self.access_flags)?;
		buffer.write_u16(self.name_index)?;
		buffer.write_u16(self.descriptor_index)?;
		buffer.write_u16(self.attributes.len() as u16)?;
		for attr in &self.attributes {
			attr.write(buffer)?;
		}
		Ok(())
	}
}

#[derive(Debug)]
pub struct MethodInfo {
	pub access_flags: u16,
	pub name_index: u16,
	pub descriptor_index: u16,
	pub attributes: Vec<AttributeInfo>,
}

impl MethodInfo {
	pub fn read<B: BytesExt>(
		buffer: &mut B,
	) -> Result<MethodInfo, ClassfileIOError> {
		let access_flags = buffer.read_u16()?;
		let name_index = buffer.read_u16()?;
		let descriptor_index = buffer.read_u16()?;
		let attributes_count = buffer.read_u16()?;
		let mut attributes = Vec::with_capacity(attributes_count as usize);
		for _ in 0..attributes_count {
			attributes.push(AttributeInfo::read(buffer)?);
		}

		Ok(MethodInfo {
			access_flags,
			name_index,
			descriptor_index,
			attributes,
		})
	}

	pub fn write<B: BytesExt>(
		&self,
		buffer: &mut B,
	) -> Result<(), ClassfileIOError> {
		buffer.write_u16(self.access_flags)?;
		buffer.write_u16(self.name_index)?;
		buffer.write_u16(self.descriptor_index)?;
		buffer.write_u16(self.attributes.len() as u16)?;
		for attr in &self.attributes {
			attr.write(buffer)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use crate::class_pool::CpTag;

	use super::*;

	#[test]
	fn utf8_entry() {
		let bytes = [0x01u8, 0x00, 0x04, b'J', b'A', b'C', b'O'];
		let mut buffer = Cursor::new(bytes.to_vec());
		let cp = read_constant_pool(&mut buffer, 2).expect("parse cp");

		assert_eq!(cp.len(), 2);
		assert!(matches!(cp[0], CpTag::Dummy));
		match &cp[1] {
			CpTag::Utf8 { bytes } => assert_eq!(bytes, b"JACO"),
			other => panic!("expected Utf8, got {other:?}"),
		}
	}

	#[test]
	fn integer_entry() {
		let bytes = [0x03u8, 0x01, 0x05, 0x20, 0x44];
		let mut buffer = Cursor::new(bytes.to_vec());
		let cp = read_constant_pool(&mut buffer, 2).expect("parse cp");

		match &cp[1] {
			CpTag::Integer { bytes } => assert_eq!(i32::from_be_bytes(*bytes), 17_113_156),
			other => panic!("expected Integer, got {other:?}"),
		}
	}

	#[test]
	fn long_entry_reserves_dummy_slot() {
		let bytes = [
			0x05u8, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02,
		];
		let mut buffer = Cursor::new(bytes.to_vec());
		let cp = read_constant_pool(&mut buffer, 3).expect("parse cp");

		assert_eq!(cp.len(), 3);
		match &cp[1] {
			CpTag::Long { bytes } => assert_eq!(i64::from_be_bytes(*bytes), 4_294_967_298),
			other => panic!("expected Long, got {other:?}"),
		}
		assert!(matches!(cp[2], CpTag::Dummy));
	}

	#[test]
	fn double_entry_reserves_dummy_slot() {
		let bytes = [
			0x06u8, 0x40, 0x09, 0x21, 0xF9, 0xF0, 0x1B, 0x86, 0x6E,
		];
		let mut buffer = Cursor::new(bytes.to_vec());
		let cp = read_constant_pool(&mut buffer, 3).expect("parse cp");

		assert_eq!(cp.len(), 3);
		match &cp[1] {
			CpTag::Double { bytes } => {
				assert!((f64::from_be_bytes(*bytes) - std::f64::consts::PI).abs() < 1e-5)
			}
			other => panic!("expected Double, got {other:?}"),
		}
		assert!(matches!(cp[2], CpTag::Dummy));
	}

	#[test]
	fn field_ref_entry() {
		let bytes = [0x09u8, 0x00, 0x14, 0x01, 0x01];
		let mut buffer = Cursor::new(bytes.to_vec());
		let cp = read_constant_pool(&mut buffer, 2).expect("parse cp");

		match &cp[1] {
			CpTag::FieldRef {
				class_index,
				name_and_type_index,
			} => {
				assert_eq!(*class_index, 20);
				assert_eq!(*name_and_type_index, 257);
			}
			other => panic!("expected FieldRef, got {other:?}"),
		}
	}

	#[test]
	fn unknown_tag_is_rejected() {
		let bytes = [0xFFu8];
		let mut buffer = Cursor::new(bytes.to_vec());
		let err = read_constant_pool(&mut buffer, 2).unwrap_err();
		assert!(matches!(err, ClassfileIOError::UnknownConstantTag(0xFF)));
	}

	#[test]
	fn round_trip_constant_pool() {
		let bytes = [
			0x01u8, 0x00, 0x04, b'J', b'A', b'C', b'O', // utf8
			0x03, 0x00, 0x00, 0x00, 0x2A, // integer
			0x05, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, // long (+dummy)
		];
		let mut buffer = Cursor::new(bytes.to_vec());
		let cp = read_constant_pool(&mut buffer, 5).expect("parse cp");

		let mut out: Cursor<Vec<u8>> = Cursor::new(Vec::new());
		write_constant_pool(&cp, &mut out).expect("write cp");
		assert_eq!(out.into_inner(), bytes.to_vec());
	}
}

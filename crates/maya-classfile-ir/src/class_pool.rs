use std::rc::Rc;

use maya_bytes::BytesError;
use maya_classfile_io::class_pool::CpTag;
use maya_mutf8::MUTFError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IRClassfileError {
	#[error("{0}")]
	Mutf8(#[from] MUTFError),
	#[error("{0}")]
	Bytes(#[from] BytesError),
	#[error("constant pool entry #{0} does not exist")]
	MissingCpEntry(u16),
	#[error("constant pool entry #{0} is a dummy/continuation slot")]
	DummyCpEntry(u16),
	#[error("constant pool entry #{index} has the wrong kind, expected {expected}")]
	WrongCpEntryKind { index: u16, expected: &'static str },
	#[error("invalid method handle reference_kind {0}, must be 1-9")]
	InvalidMethodHandleKind(u8),
	#[error("invalid verification_type_info tag {0}")]
	InvalidVerificationTypeTag(u8),
	#[error("invalid stack map frame tag {0}")]
	InvalidStackMapFrameTag(u8),
	#[error("invalid element_value tag {0:?}")]
	InvalidElementValueTag(u8),
}

// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-5.html#jvms-5.4.3.5
#[derive(Debug, Clone)]
#[repr(u8)]
pub enum IRMethodRefKind {
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

impl IRMethodRefKind {
	pub fn from(value: u8) -> Result<IRMethodRefKind, IRClassfileError> {
		Ok(match value {
			1 => Self::GetField,
			2 => Self::GetStatic,
			3 => Self::PutField,
			4 => Self::PutStatic,
			5 => Self::InvokeVirtual,
			6 => Self::InvokeStatic,
			7 => Self::InvokeSpecial,
			8 => Self::NewInvokeSpecial,
			9 => Self::InvokeInterface,
			_ => return Err(IRClassfileError::InvalidMethodHandleKind(value)),
		})
	}
}

#[derive(Debug, Clone)]
pub enum CPConstValueRefKind {
	Double(f64),
	Float(f32),
	Int(i32),
	Long(i64),
	String(Rc<String>),
}

#[derive(Debug, Clone)]
pub struct CPConstValueRef {
	pub index: u16,
	pub kind: CPConstValueRefKind,
}

impl CPConstValueRef {
	pub fn new(index: u16, tag: &IRCpTag) -> Result<Self, IRClassfileError> {
		Ok(match tag {
			IRCpTag::Double(data) => Self {
				kind: CPConstValueRefKind::Double(*data),
				index,
			},
			IRCpTag::Float(data) => Self {
				kind: CPConstValueRefKind::Float(*data),
				index,
			},
			IRCpTag::Integer(data) => Self {
				kind: CPConstValueRefKind::Int(*data),
				index,
			},
			IRCpTag::Long(data) => Self {
				kind: CPConstValueRefKind::Long(*data),
				index,
			},
			IRCpTag::Utf8(data) => Self {
				kind: CPConstValueRefKind::String(data.clone()),
				index,
			},
			_ => {
				return Err(IRClassfileError::WrongCpEntryKind {
					index,
					expected: "a constant value",
				})
			}
		})
	}

	pub fn from_cp(cp: &[IRCpTag], index: u16) -> Result<Self, IRClassfileError> {
		Self::new(index, tag_at(cp, index)?)
	}
}

#[derive(Debug, Clone)]
pub struct CPUtf8Ref {
	pub data: Rc<String>,
	pub index: u16,
}

impl CPUtf8Ref {
	pub fn new(index: u16, tag: &IRCpTag) -> Result<Self, IRClassfileError> {
		match tag {
			IRCpTag::Utf8(data) => Ok(Self { data: data.clone(), index }),
			_ => Err(IRClassfileError::WrongCpEntryKind { index, expected: "Utf8" }),
		}
	}

	pub fn from_cp(cp: &[IRCpTag], index: u16) -> Result<Self, IRClassfileError> {
		Self::new(index, tag_at(cp, index)?)
	}
}

#[derive(Debug, Clone)]
pub struct CPClassRef {
	pub data: CPUtf8Ref,
	pub index: u16,
}

impl CPClassRef {
	pub fn new(index: u16, tag: &IRCpTag) -> Result<Self, IRClassfileError> {
		match tag {
			IRCpTag::Class(this) => Ok(Self { data: this.clone(), index }),
			_ => Err(IRClassfileError::WrongCpEntryKind { index, expected: "Class" }),
		}
	}

	pub fn from_cp(cp: &[IRCpTag], index: u16) -> Result<Self, IRClassfileError> {
		Self::new(index, tag_at(cp, index)?)
	}

	pub fn name(&self) -> &str {
		&self.data.data
	}
}

#[derive(Debug, Clone)]
pub struct CPNameAndTypeRef {
	pub index: u16,
	pub name: CPUtf8Ref,
	pub ty: CPUtf8Ref,
}

impl CPNameAndTypeRef {
	pub fn new(index: u16, tag: &IRCpTag) -> Result<Self, IRClassfileError> {
		match tag {
			IRCpTag::NameAndType { name, descriptor } => Ok(Self {
				index,
				name: name.clone(),
				ty: descriptor.clone(),
			}),
			_ => Err(IRClassfileError::WrongCpEntryKind { index, expected: "NameAndType" }),
		}
	}

	pub fn from_cp(cp: &[IRCpTag], index: u16) -> Result<Self, IRClassfileError> {
		Self::new(index, tag_at(cp, index)?)
	}
}

// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.4.8
#[derive(Debug, Clone)]
pub struct CPMethodHandleRef {
	pub ref_kind: IRMethodRefKind,
	pub ref_tag: Box<IRCpTag>,
	pub ref_index: u16,
	pub index: u16,
}

impl CPMethodHandleRef {
	pub fn new(index: u16, tag: &IRCpTag) -> Result<Self, IRClassfileError> {
		match tag {
			IRCpTag::MethodHandle {
				ref_kind,
				ref_index,
				ref_tag,
			} => Ok(Self {
				ref_kind: ref_kind.clone(),
				ref_tag: ref_tag.clone(),
				ref_index: *ref_index,
				index,
			}),
			_ => Err(IRClassfileError::WrongCpEntryKind { index, expected: "MethodHandle" }),
		}
	}

	pub fn from_cp(cp: &[IRCpTag], index: u16) -> Result<Self, IRClassfileError> {
		Self::new(index, tag_at(cp, index)?)
	}
}

#[derive(Debug, Clone)]
pub struct CPTagRef {
	pub tag: IRCpTag,
	pub index: u16,
}

impl CPTagRef {
	pub fn from_cp(cp: &[IRCpTag], index: u16) -> Result<Self, IRClassfileError> {
		Ok(Self {
			tag: tag_at(cp, index)?.clone(),
			index,
		})
	}
}

/// Looks a constant pool entry up by its 1-based class-file index. `cp` must
/// already carry the phantom dummy slot at index 0 the way [`IRCpTag::from_io`]
/// produces it, so this never subtracts 1.
fn tag_at(cp: &[IRCpTag], index: u16) -> Result<&IRCpTag, IRClassfileError> {
	match cp.get(index as usize) {
		Some(IRCpTag::Dummy) | None => Err(IRClassfileError::MissingCpEntry(index)),
		Some(tag) => Ok(tag),
	}
}

#[derive(Debug, Clone)]
#[repr(u8)]
pub enum IRCpTag {
	/// Occupies the 0th slot and any slot following a `Long`/`Double` entry.
	/// Never produced from or resolved against by name; purely positional.
	Dummy = 0,
	Utf8(Rc<String>) = 1,
	Integer(i32) = 3,
	Float(f32) = 4,
	Long(i64) = 5,
	Double(f64) = 6,
	Class(CPUtf8Ref) = 7,
	String(CPUtf8Ref) = 8,
	FieldRef {
		class_index: u16,
		name_and_ty: CPNameAndTypeRef,
	} = 9,
	MethodRef {
		class_index: u16,
		name_and_ty: CPNameAndTypeRef,
	} = 10,
	InterfaceMethodRef {
		class_index: u16,
		name_and_ty: CPNameAndTypeRef,
	} = 11,
	NameAndType {
		name: CPUtf8Ref,
		descriptor: CPUtf8Ref,
	} = 12,
	// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.4.8
	MethodHandle {
		ref_kind: IRMethodRefKind,
		ref_index: u16,
		ref_tag: Box<IRCpTag>,
	} = 15,
	// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.4.9
	MethodType(CPUtf8Ref) = 16,
	// https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.4.10
	InvokeDynamic {
		bootstrap_method_attr_index: u16,
		name_and_ty: CPNameAndTypeRef,
	} = 18,
}

macro_rules! parse_tag_idx {
	($idx:ident, $raw_tags:ident, $formed_tags:ident) => {
		match $formed_tags.get(*$idx as usize).cloned() {
			Some(tag) => tag,
			None => Self::parse_tag($idx, $raw_tags, $formed_tags)?,
		}
	};
}

impl IRCpTag {
	fn parse_tag(index: &u16, raw_tags: &[CpTag], formed_tags: &[IRCpTag]) -> Result<IRCpTag, IRClassfileError> {
		let tag = raw_tags
			.get(*index as usize)
			.ok_or(IRClassfileError::MissingCpEntry(*index))?;

		Ok(match tag {
			CpTag::Dummy => IRCpTag::Dummy,
			CpTag::Utf8 { bytes } => IRCpTag::Utf8(Rc::new(maya_mutf8::decode(bytes)?)),
			CpTag::Integer { bytes } => IRCpTag::Integer(i32::from_be_bytes(*bytes)),
			CpTag::Float { bytes } => IRCpTag::Float(f32::from_be_bytes(*bytes)),
			CpTag::Long { bytes } => IRCpTag::Long(i64::from_be_bytes(*bytes)),
			CpTag::Double { bytes } => IRCpTag::Double(f64::from_be_bytes(*bytes)),
			CpTag::Class { name_index } => {
				let utf8_tag = parse_tag_idx!(name_index, raw_tags, formed_tags);
				IRCpTag::Class(CPUtf8Ref::new(*name_index, &utf8_tag)?)
			}
			CpTag::String { utf8_index } => {
				let utf8_tag = parse_tag_idx!(utf8_index, raw_tags, formed_tags);
				IRCpTag::String(CPUtf8Ref::new(*utf8_index, &utf8_tag)?)
			}
			CpTag::FieldRef {
				class_index,
				name_and_type_index,
			} => {
				let name_and_ty = Self::resolve_name_and_type(*name_and_type_index, raw_tags, formed_tags)?;
				IRCpTag::FieldRef {
					class_index: *class_index,
					name_and_ty,
				}
			}
			CpTag::MethodRef {
				class_index,
				name_and_type_index,
			} => {
				let name_and_ty = Self::resolve_name_and_type(*name_and_type_index, raw_tags, formed_tags)?;
				IRCpTag::MethodRef {
					class_index: *class_index,
					name_and_ty,
				}
			}
			CpTag::InterfaceMethodRef {
				class_index,
				name_and_type_index,
			} => {
				let name_and_ty = Self::resolve_name_and_type(*name_and_type_index, raw_tags, formed_tags)?;
				IRCpTag::InterfaceMethodRef {
					class_index: *class_index,
					name_and_ty,
				}
			}
			CpTag::NameAndType {
				name_index,
				descriptor_index,
			} => {
				let name_tag = parse_tag_idx!(name_index, raw_tags, formed_tags);
				let descriptor_tag = parse_tag_idx!(descriptor_index, raw_tags, formed_tags);
				IRCpTag::NameAndType {
					name: CPUtf8Ref::new(*name_index, &name_tag)?,
					descriptor: CPUtf8Ref::new(*descriptor_index, &descriptor_tag)?,
				}
			}
			CpTag::MethodHandle {
				reference_kind,
				reference_index,
			} => {
				let kind = IRMethodRefKind::from(*reference_kind)?;
				let referent = parse_tag_idx!(reference_index, raw_tags, formed_tags);
				IRCpTag::MethodHandle {
					ref_kind: kind,
					ref_tag: Box::new(referent.clone()),
					ref_index: *reference_index,
				}
			}
			CpTag::MethodType { descriptor_index } => {
				let descriptor_tag = parse_tag_idx!(descriptor_index, raw_tags, formed_tags);
				IRCpTag::MethodType(CPUtf8Ref::new(*descriptor_index, &descriptor_tag)?)
			}
			CpTag::InvokeDynamic {
				bootstrap_method_attr_index,
				name_and_type_index,
			} => {
				let name_and_ty = Self::resolve_name_and_type(*name_and_type_index, raw_tags, formed_tags)?;
				IRCpTag::InvokeDynamic {
					bootstrap_method_attr_index: *bootstrap_method_attr_index,
					name_and_ty,
				}
			}
		})
	}

	fn resolve_name_and_type(
		name_and_type_index: u16,
		raw_tags: &[CpTag],
		formed_tags: &[IRCpTag],
	) -> Result<CPNameAndTypeRef, IRClassfileError> {
		let idx = &name_and_type_index;
		let resolved = parse_tag_idx!(idx, raw_tags, formed_tags);
		match resolved {
			IRCpTag::NameAndType { name, descriptor } => Ok(CPNameAndTypeRef {
				index: name_and_type_index,
				name,
				ty: descriptor,
			}),
			_ => Err(IRClassfileError::WrongCpEntryKind {
				index: name_and_type_index,
				expected: "NameAndType",
			}),
		}
	}

	/// Decodes a whole wire-format constant pool (phantom dummy slots and
	/// all) into its resolved form. The returned `Vec` has the same length
	/// and the same slot layout as `raw_tags` — index `n` here is index `n`
	/// on the class file.
	pub fn from_io(raw_tags: Vec<CpTag>) -> Result<Vec<IRCpTag>, IRClassfileError> {
		let mut res = Vec::with_capacity(raw_tags.len());

		for index in 0..raw_tags.len() as u16 {
			let tag = Self::parse_tag(&index, &raw_tags, &res)?;
			res.push(tag);
		}

		Ok(res)
	}
}

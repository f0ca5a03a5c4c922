use class_pool::{CPClassRef, IRClassfileError, IRCpTag};
use maya_classfile_io::ClassFile;

pub mod attribute;
pub mod class_pool;

use attribute::IRAttributeInfo;

#[derive(Debug, PartialEq, Eq)]
pub struct ClassFileVersion {
	pub major: u16,
	pub minor: u16,
}

impl PartialOrd for ClassFileVersion {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ClassFileVersion {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		match self.major.cmp(&other.major) {
			std::cmp::Ordering::Less => std::cmp::Ordering::Less,
			std::cmp::Ordering::Equal => self.minor.cmp(&other.minor),
			std::cmp::Ordering::Greater => std::cmp::Ordering::Greater,
		}
	}
}

pub struct AccessFlags;
impl AccessFlags {
	pub const PUBLIC: u16 = 0x0001;
	pub const FINAL: u16 = 0x0010;
	pub const SUPER: u16 = 0x0020;
	pub const INTERFACE: u16 = 0x0200;
	pub const ABSTRACT: u16 = 0x0400;
	pub const SYNTHETIC: u16 = 0x1000;
	pub const ANNOTATION: u16 = 0x2000;
	pub const ENUM: u16 = 0x4000;
}

#[derive(Debug, Clone)]
pub struct IRFieldInfo {
	pub access_flags: u16,
	pub name: class_pool::CPUtf8Ref,
	pub descriptor: class_pool::CPUtf8Ref,
	pub attributes: Vec<IRAttributeInfo>,
}

#[derive(Debug, Clone)]
pub struct IRMethodInfo {
	pub access_flags: u16,
	pub name: class_pool::CPUtf8Ref,
	pub descriptor: class_pool::CPUtf8Ref,
	pub attributes: Vec<IRAttributeInfo>,
}

impl IRMethodInfo {
	pub fn is_class_init(&self) -> bool {
		self.name.data.as_str() == "<clinit>"
	}

	/// The method's `Code` attribute, if it has one (abstract and native
	/// methods don't).
	pub fn code(&self) -> Option<&attribute::CodeAttribute> {
		self.attributes.iter().find_map(|attr| match &attr.attr {
			attribute::IRAttribute::Code(code) => Some(code),
			_ => None,
		})
	}
}

#[derive(Debug)]
pub struct IRClassFile {
	pub magic: u32,
	pub version: ClassFileVersion,
	pub cp: Vec<IRCpTag>,
	pub access_flags: u16,
	pub this_class: CPClassRef,
	/// `None` only for `java/lang/Object`, the one class with no superclass.
	pub super_class: Option<CPClassRef>,
	pub interfaces: Vec<CPClassRef>,
	pub fields: Vec<IRFieldInfo>,
	pub methods: Vec<IRMethodInfo>,
}

impl IRClassFile {
	pub fn from_io(raw: ClassFile) -> Result<Self, IRClassfileError> {
		let magic = raw.magic;
		let version = ClassFileVersion {
			major: raw.major_version,
			minor: raw.minor_version,
		};
		let cp = IRCpTag::from_io(raw.cp)?;

		let this_class = CPClassRef::from_cp(&cp, raw.this_class)?;
		let super_class = if raw.super_class == 0 {
			None
		} else {
			Some(CPClassRef::from_cp(&cp, raw.super_class)?)
		};
		let interfaces = raw
			.interfaces
			.iter()
			.copied()
			.map(|idx| CPClassRef::from_cp(&cp, idx))
			.collect::<Result<Vec<_>, _>>()?;

		let fields = raw
			.fields
			.into_iter()
			.map(|field| {
				Ok(IRFieldInfo {
					access_flags: field.access_flags,
					name: class_pool::CPUtf8Ref::from_cp(&cp, field.name_index)?,
					descriptor: class_pool::CPUtf8Ref::from_cp(&cp, field.descriptor_index)?,
					attributes: field
						.attributes
						.into_iter()
						.map(|attr| IRAttributeInfo::from_io(&cp, attr))
						.collect::<Result<Vec<_>, _>>()?,
				})
			})
			.collect::<Result<Vec<_>, IRClassfileError>>()?;

		let methods = raw
			.methods
			.into_iter()
			.map(|method| {
				Ok(IRMethodInfo {
					access_flags: method.access_flags,
					name: class_pool::CPUtf8Ref::from_cp(&cp, method.name_index)?,
					descriptor: class_pool::CPUtf8Ref::from_cp(&cp, method.descriptor_index)?,
					attributes: method
						.attributes
						.into_iter()
						.map(|attr| IRAttributeInfo::from_io(&cp, attr))
						.collect::<Result<Vec<_>, _>>()?,
				})
			})
			.collect::<Result<Vec<_>, IRClassfileError>>()?;

		Ok(Self {
			magic,
			version,
			cp,
			access_flags: raw.access_flags,
			this_class,
			super_class,
			interfaces,
			fields,
			methods,
		})
	}

	pub fn name(&self) -> &str {
		self.this_class.name()
	}

	pub fn superclass_name(&self) -> Option<&str> {
		self.super_class.as_ref().map(|c| c.name())
	}

	pub fn is_interface(&self) -> bool {
		self.access_flags & AccessFlags::INTERFACE != 0
	}

	pub fn class_init(&self) -> Option<&IRMethodInfo> {
		self.methods.iter().find(|m| m.is_class_init())
	}
}

#[cfg(test)]
mod tests {
	use maya_classfile_io::class_pool::CpTag;
	use maya_classfile_io::{ClassFile, FieldInfo};

	use super::*;

	fn class_ref_chain(name: &str) -> Vec<CpTag> {
		vec![
			CpTag::Dummy,
			CpTag::Utf8 { bytes: name.as_bytes().to_vec() },
			CpTag::Class { name_index: 1 },
		]
	}

	#[test]
	fn resolves_this_class_name_through_two_hops() {
		let raw = ClassFile {
			magic: maya_classfile_io::MAGIC,
			minor_version: 0,
			major_version: 52,
			cp_count: 3,
			cp: class_ref_chain("com/example/Widget"),
			access_flags: AccessFlags::SUPER,
			this_class: 2,
			super_class: 0,
			interfaces: vec![],
			fields: vec![],
			methods: vec![],
			attributes: vec![],
		};

		let class = IRClassFile::from_io(raw).expect("valid class");
		assert_eq!(class.name(), "com/example/Widget");
		assert_eq!(class.superclass_name(), None);
	}

	#[test]
	fn field_resolves_name_and_descriptor() {
		let mut cp = class_ref_chain("com/example/Widget");
		cp.push(CpTag::Utf8 { bytes: b"count".to_vec() });
		cp.push(CpTag::Utf8 { bytes: b"I".to_vec() });

		let raw = ClassFile {
			magic: maya_classfile_io::MAGIC,
			minor_version: 0,
			major_version: 52,
			cp_count: cp.len() as u16,
			cp,
			access_flags: 0,
			this_class: 2,
			super_class: 0,
			interfaces: vec![],
			fields: vec![FieldInfo {
				access_flags: 0,
				name_index: 3,
				descriptor_index: 4,
				attributes: vec![],
			}],
			methods: vec![],
			attributes: vec![],
		};

		let class = IRClassFile::from_io(raw).expect("valid class");
		assert_eq!(class.fields[0].name.data.as_str(), "count");
		assert_eq!(class.fields[0].descriptor.data.as_str(), "I");
	}

	#[test]
	fn class_init_method_is_found_by_name() {
		let mut cp = class_ref_chain("com/example/Widget");
		cp.push(CpTag::Utf8 { bytes: b"<clinit>".to_vec() });
		cp.push(CpTag::Utf8 { bytes: b"()V".to_vec() });

		let raw = ClassFile {
			magic: maya_classfile_io::MAGIC,
			minor_version: 0,
			major_version: 52,
			cp_count: cp.len() as u16,
			cp,
			access_flags: 0,
			this_class: 2,
			super_class: 0,
			interfaces: vec![],
			fields: vec![],
			methods: vec![maya_classfile_io::MethodInfo {
				access_flags: 0,
				name_index: 3,
				descriptor_index: 4,
				attributes: vec![],
			}],
			attributes: vec![],
		};

		let class = IRClassFile::from_io(raw).expect("valid class");
		assert!(class.class_init().is_some());
		assert!(class.class_init().unwrap().code().is_none());
	}
}

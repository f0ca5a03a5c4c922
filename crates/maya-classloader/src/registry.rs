use std::collections::HashMap;
use std::sync::Arc;
use std::thread::ThreadId;

use maya_classfile_ir::{IRClassFile, IRMethodInfo};
use parking_lot::{Condvar, Mutex, RwLock};

/// Where a class sits in the `<clinit>` lifecycle. Mirrors the JVM spec's
/// class initialization state machine one-to-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
	Uninit,
	Initializing(ThreadId),
	Initialized,
	Failed,
}

/// A class that has passed the format check and been installed in the
/// method area. Immutable apart from its init state: once installed, the
/// parsed class data itself never changes.
pub struct InstalledClass {
	pub class: IRClassFile,
	pub init_state: Mutex<InitState>,
	pub init_cond: Condvar,
}

impl InstalledClass {
	fn new(class: IRClassFile) -> Self {
		Self {
			class,
			init_state: Mutex::new(InitState::Uninit),
			init_cond: Condvar::new(),
		}
	}

	pub fn name(&self) -> &str {
		self.class.name()
	}

	pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&IRMethodInfo> {
		self.class
			.methods
			.iter()
			.find(|m| m.name.data.as_str() == name && m.descriptor.data.as_str() == descriptor)
	}
}

/// A method resolved by name and descriptor, together with the installed
/// class that declares it. What `MethodArea::fetch_method` hands back to an
/// interpreter collaborator so it can build a frame without a second lookup.
pub struct MethodRef {
	pub class: Arc<InstalledClass>,
	pub method: IRMethodInfo,
}

/// Name-keyed store of installed classes, shared across every loader and
/// initializer in a VM instance. Install is idempotent: a class already
/// present under its own name is never replaced, so concurrent loaders
/// racing to install the same class converge on a single entry.
#[derive(Default)]
pub struct MethodArea {
	classes: RwLock<HashMap<String, Arc<InstalledClass>>>,
}

impl MethodArea {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fetch(&self, name: &str) -> Option<Arc<InstalledClass>> {
		self.classes.read().get(name).cloned()
	}

	pub fn fetch_method(&self, class_name: &str, method_name: &str, descriptor: &str) -> Option<MethodRef> {
		let installed = self.fetch(class_name)?;
		let method = installed.find_method(method_name, descriptor)?.clone();
		Some(MethodRef { class: installed, method })
	}

	/// Installs a freshly-parsed class, or hands back the entry some other
	/// loader already installed under the same name.
	pub fn insert(&self, class: IRClassFile) -> Arc<InstalledClass> {
		let name = class.name().to_string();
		let mut classes = self.classes.write();
		if let Some(existing) = classes.get(&name) {
			return existing.clone();
		}

		let installed = Arc::new(InstalledClass::new(class));
		classes.insert(name, installed.clone());
		installed
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use maya_classfile_io::class_pool::{AccessFlags, CpTag};
	use maya_classfile_io::ClassFile;

	use super::*;

	fn encode_with_method(class_name: &str, method_name: &str, descriptor: &str) -> IRClassFile {
		let mut cp = vec![
			CpTag::Dummy,
			CpTag::Utf8 { bytes: class_name.as_bytes().to_vec() },
			CpTag::Class { name_index: 1 },
		];
		let this_class = 2u16;

		let method_name_index = cp.len() as u16;
		cp.push(CpTag::Utf8 { bytes: method_name.as_bytes().to_vec() });
		let descriptor_index = cp.len() as u16;
		cp.push(CpTag::Utf8 { bytes: descriptor.as_bytes().to_vec() });

		let class = ClassFile {
			magic: maya_classfile_io::MAGIC,
			minor_version: 0,
			major_version: 52,
			cp_count: cp.len() as u16,
			cp,
			access_flags: AccessFlags::ACC_SUPER,
			this_class,
			super_class: 0,
			interfaces: vec![],
			fields: vec![],
			methods: vec![maya_classfile_io::MethodInfo {
				access_flags: 0,
				name_index: method_name_index,
				descriptor_index,
				attributes: vec![],
			}],
			attributes: vec![],
		};

		let mut buffer: Cursor<Vec<u8>> = Cursor::new(Vec::new());
		class.write(&mut buffer).expect("encode fixture");
		buffer.set_position(0);
		let raw = ClassFile::read(&mut buffer).expect("parse fixture");
		IRClassFile::from_io(raw).expect("resolve fixture")
	}

	#[test]
	fn fetch_method_returns_the_matched_method() {
		let method_area = MethodArea::new();
		let class = encode_with_method("com/example/Widget", "doThing", "()V");
		method_area.insert(class);

		let method_ref = method_area
			.fetch_method("com/example/Widget", "doThing", "()V")
			.expect("method is found");

		assert_eq!(method_ref.class.name(), "com/example/Widget");
		assert_eq!(method_ref.method.name.data.as_str(), "doThing");
		assert_eq!(method_ref.method.descriptor.data.as_str(), "()V");
	}

	#[test]
	fn fetch_method_is_none_for_unknown_descriptor() {
		let method_area = MethodArea::new();
		let class = encode_with_method("com/example/Widget", "doThing", "()V");
		method_area.insert(class);

		assert!(method_area.fetch_method("com/example/Widget", "doThing", "(I)V").is_none());
	}
}

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use maya_classfile_io::ClassFile;
use maya_classfile_ir::IRClassFile;
use maya_classfile_verifier::validate_class;

use crate::registry::{InstalledClass, MethodArea};
use crate::LoaderError;

/// Supplies class bytes by binary name (e.g. `java/lang/Object`). The only
/// collaborator the loader needs from whatever hosts it — a classpath
/// scanner, a JAR reader, a network fetch, anything.
pub trait ClassSource {
	fn fetch_class_bytes(&self, name: &str) -> Result<Vec<u8>, LoaderError>;
}

/// Parses, format-checks, and installs classes into a [`MethodArea`],
/// recursively resolving superclasses and interfaces first.
pub struct ClassLoader<'a, S: ClassSource> {
	source: &'a S,
	method_area: &'a MethodArea,
}

impl<'a, S: ClassSource> ClassLoader<'a, S> {
	pub fn new(source: &'a S, method_area: &'a MethodArea) -> Self {
		Self { source, method_area }
	}

	pub fn load_class(&self, name: &str) -> Result<Arc<InstalledClass>, LoaderError> {
		let mut in_progress = HashSet::new();
		self.load_class_inner(name, &mut in_progress)
	}

	fn load_class_inner(
		&self,
		name: &str,
		in_progress: &mut HashSet<String>,
	) -> Result<Arc<InstalledClass>, LoaderError> {
		if let Some(installed) = self.method_area.fetch(name) {
			return Ok(installed);
		}

		if !in_progress.insert(name.to_string()) {
			return Err(LoaderError::ClassCircularityError(name.to_string()));
		}

		log::debug!("loading class {name}");
		let bytes = self.source.fetch_class_bytes(name)?;
		let mut cursor = Cursor::new(bytes);
		let raw = ClassFile::read(&mut cursor)?;
		validate_class(&raw)?;
		let class = IRClassFile::from_io(raw)?;

		if class.name() != name {
			return Err(LoaderError::ClassNameMismatch {
				expected: name.to_string(),
				actual: class.name().to_string(),
			});
		}

		if let Some(super_name) = class.superclass_name() {
			self.load_class_inner(super_name, in_progress)?;
		}
		for iface in &class.interfaces {
			self.load_class_inner(iface.name(), in_progress)?;
		}

		in_progress.remove(name);
		Ok(self.method_area.insert(class))
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;
	use std::io::Cursor as IoCursor;

	use maya_classfile_io::class_pool::CpTag;

	use super::*;

	struct FixtureSource {
		classes: HashMap<String, Vec<u8>>,
	}

	impl ClassSource for FixtureSource {
		fn fetch_class_bytes(&self, name: &str) -> Result<Vec<u8>, LoaderError> {
			self.classes
				.get(name)
				.cloned()
				.ok_or_else(|| LoaderError::ClassNotFound(name.to_string()))
		}
	}

	fn encode(name: &str, super_name: Option<&str>) -> Vec<u8> {
		let mut cp = vec![
			CpTag::Dummy,
			CpTag::Utf8 { bytes: name.as_bytes().to_vec() },
			CpTag::Class { name_index: 1 },
		];
		let this_class = 2u16;
		let super_class = match super_name {
			None => 0,
			Some(super_name) => {
				let name_index = cp.len() as u16;
				cp.push(CpTag::Utf8 { bytes: super_name.as_bytes().to_vec() });
				let class_index = cp.len() as u16;
				cp.push(CpTag::Class { name_index });
				class_index
			}
		};

		let class = ClassFile {
			magic: maya_classfile_io::MAGIC,
			minor_version: 0,
			major_version: 52,
			cp_count: cp.len() as u16,
			cp,
			access_flags: maya_classfile_io::class_pool::AccessFlags::ACC_SUPER,
			this_class,
			super_class,
			interfaces: vec![],
			fields: vec![],
			methods: vec![],
			attributes: vec![],
		};

		let mut buffer: IoCursor<Vec<u8>> = IoCursor::new(Vec::new());
		class.write(&mut buffer).expect("encode fixture");
		buffer.into_inner()
	}

	#[test]
	fn loads_superclass_before_subclass() {
		let mut classes = HashMap::new();
		classes.insert("java/lang/Object".to_string(), encode("java/lang/Object", None));
		classes.insert("com/example/Widget".to_string(), encode("com/example/Widget", Some("java/lang/Object")));
		let source = FixtureSource { classes };
		let method_area = MethodArea::new();
		let loader = ClassLoader::new(&source, &method_area);

		let widget = loader.load_class("com/example/Widget").expect("loads");
		assert_eq!(widget.name(), "com/example/Widget");
		assert!(method_area.fetch("java/lang/Object").is_some());
	}

	#[test]
	fn missing_class_surfaces_source_error() {
		let source = FixtureSource { classes: HashMap::new() };
		let method_area = MethodArea::new();
		let loader = ClassLoader::new(&source, &method_area);

		assert!(matches!(
			loader.load_class("com/example/Missing"),
			Err(LoaderError::ClassNotFound(_))
		));
	}

	#[test]
	fn self_referential_superclass_is_circularity_error() {
		let mut classes = HashMap::new();
		classes.insert("com/example/Loopy".to_string(), encode("com/example/Loopy", Some("com/example/Loopy")));
		let source = FixtureSource { classes };
		let method_area = MethodArea::new();
		let loader = ClassLoader::new(&source, &method_area);

		assert!(matches!(
			loader.load_class("com/example/Loopy"),
			Err(LoaderError::ClassCircularityError(_))
		));
	}

	#[test]
	fn repeated_load_is_idempotent_and_returns_same_entry() {
		let mut classes = HashMap::new();
		classes.insert("java/lang/Object".to_string(), encode("java/lang/Object", None));
		let source = FixtureSource { classes };
		let method_area = MethodArea::new();
		let loader = ClassLoader::new(&source, &method_area);

		let first = loader.load_class("java/lang/Object").expect("loads");
		let second = loader.load_class("java/lang/Object").expect("loads");
		assert!(Arc::ptr_eq(&first, &second));
	}
}

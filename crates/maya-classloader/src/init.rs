use std::sync::Arc;

use crate::loader::{ClassLoader, ClassSource};
use crate::registry::{InitState, InstalledClass, MethodArea};
use crate::{LoaderError, VmError};

/// Runs a class's `<clinit>` frame. The only thing the initializer needs
/// from whatever hosts the interpreter loop; classes with no `<clinit>`
/// never call this.
pub trait Interpreter {
	fn execute_frame(&self, class: &Arc<InstalledClass>) -> Result<(), VmError>;
}

/// Drives class initialization: loads a class and its ancestors, then runs
/// `<clinit>` for each, oldest ancestor first, exactly once per class.
pub struct Initializer<'a, S: ClassSource, I: Interpreter> {
	loader: &'a ClassLoader<'a, S>,
	interpreter: &'a I,
}

impl<'a, S: ClassSource, I: Interpreter> Initializer<'a, S, I> {
	pub fn new(loader: &'a ClassLoader<'a, S>, interpreter: &'a I) -> Self {
		Self { loader, interpreter }
	}

	pub fn initialize(&self, name: &str) -> Result<Arc<InstalledClass>, LoaderError> {
		let installed = self.loader.load_class(name)?;
		self.initialize_chain(&installed)?;
		Ok(installed)
	}

	/// Walks from `installed` up to but not including `java/lang/Object`,
	/// then runs each class's `<clinit>` in root-to-leaf order. The root
	/// itself is never an ancestor to initialize here; it is loaded and
	/// initialized independently, the same way the original initializer
	/// excludes it by breaking before appending it to the chain.
	fn initialize_chain(&self, installed: &Arc<InstalledClass>) -> Result<(), LoaderError> {
		let mut chain = vec![installed.clone()];
		let mut current = installed.clone();
		while let Some(super_name) = current.class.superclass_name() {
			if super_name == "java/lang/Object" {
				break;
			}
			let parent = self.loader.load_class(super_name)?;
			chain.push(parent.clone());
			current = parent;
		}
		chain.reverse();

		for class in chain {
			self.initialize_one(&class)?;
		}
		Ok(())
	}

	fn initialize_one(&self, installed: &Arc<InstalledClass>) -> Result<(), LoaderError> {
		let this_thread = std::thread::current().id();

		{
			let mut state = installed.init_state.lock();
			loop {
				match *state {
					InitState::Initialized => return Ok(()),
					InitState::Failed => {
						return Err(LoaderError::NoClassDefFoundError(installed.name().to_string()))
					}
					InitState::Initializing(owner) if owner == this_thread => return Ok(()),
					InitState::Initializing(_) => {
						installed.init_cond.wait(&mut state);
					}
					InitState::Uninit => {
						*state = InitState::Initializing(this_thread);
						break;
					}
				}
			}
		}

		log::debug!("running <clinit> for {}", installed.name());
		let result = match installed.class.class_init() {
			Some(_) => self.interpreter.execute_frame(installed).map_err(LoaderError::from),
			None => Ok(()),
		};

		let mut state = installed.init_state.lock();
		*state = if result.is_ok() { InitState::Initialized } else { InitState::Failed };
		installed.init_cond.notify_all();
		drop(state);

		result
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex as StdMutex;

	use maya_classfile_io::class_pool::{AccessFlags, CpTag};
	use maya_classfile_io::ClassFile;

	use super::*;
	use crate::loader::ClassLoader;
	use crate::registry::MethodArea;

	struct FixtureSource {
		classes: std::collections::HashMap<String, Vec<u8>>,
	}

	impl ClassSource for FixtureSource {
		fn fetch_class_bytes(&self, name: &str) -> Result<Vec<u8>, LoaderError> {
			self.classes
				.get(name)
				.cloned()
				.ok_or_else(|| LoaderError::ClassNotFound(name.to_string()))
		}
	}

	#[derive(Default)]
	struct CountingInterpreter {
		calls: AtomicUsize,
		order: StdMutex<Vec<String>>,
		fail_for: Option<&'static str>,
	}

	impl Interpreter for CountingInterpreter {
		fn execute_frame(&self, class: &Arc<InstalledClass>) -> Result<(), VmError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.order.lock().unwrap().push(class.name().to_string());
			if self.fail_for == Some(class.name()) {
				return Err(VmError("boom".to_string()));
			}
			Ok(())
		}
	}

	fn encode_with_clinit(name: &str, super_name: Option<&str>) -> Vec<u8> {
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

		let clinit_name_index = cp.len() as u16;
		cp.push(CpTag::Utf8 { bytes: b"<clinit>".to_vec() });
		let clinit_descriptor_index = cp.len() as u16;
		cp.push(CpTag::Utf8 { bytes: b"()V".to_vec() });

		let class = ClassFile {
			magic: maya_classfile_io::MAGIC,
			minor_version: 0,
			major_version: 52,
			cp_count: cp.len() as u16,
			cp,
			access_flags: AccessFlags::ACC_SUPER,
			this_class,
			super_class,
			interfaces: vec![],
			fields: vec![],
			methods: vec![maya_classfile_io::MethodInfo {
				access_flags: 0,
				name_index: clinit_name_index,
				descriptor_index: clinit_descriptor_index,
				attributes: vec![],
			}],
			attributes: vec![],
		};

		let mut buffer: Cursor<Vec<u8>> = Cursor::new(Vec::new());
		class.write(&mut buffer).expect("encode fixture");
		buffer.into_inner()
	}

	#[test]
	fn initializes_ancestors_before_subclass_excluding_object() {
		let mut classes = std::collections::HashMap::new();
		classes.insert("java/lang/Object".to_string(), encode_with_clinit("java/lang/Object", None));
		classes.insert(
			"com/example/Base".to_string(),
			encode_with_clinit("com/example/Base", Some("java/lang/Object")),
		);
		classes.insert(
			"com/example/Widget".to_string(),
			encode_with_clinit("com/example/Widget", Some("com/example/Base")),
		);
		let source = FixtureSource { classes };
		let method_area = MethodArea::new();
		let loader = ClassLoader::new(&source, &method_area);
		let interpreter = CountingInterpreter::default();
		let initializer = Initializer::new(&loader, &interpreter);

		initializer.initialize("com/example/Widget").expect("initializes");

		let order = interpreter.order.lock().unwrap();
		assert_eq!(*order, vec!["com/example/Base".to_string(), "com/example/Widget".to_string()]);
	}

	#[test]
	fn second_initialize_does_not_rerun_clinit() {
		let mut classes = std::collections::HashMap::new();
		classes.insert("java/lang/Object".to_string(), encode_with_clinit("java/lang/Object", None));
		let source = FixtureSource { classes };
		let method_area = MethodArea::new();
		let loader = ClassLoader::new(&source, &method_area);
		let interpreter = CountingInterpreter::default();
		let initializer = Initializer::new(&loader, &interpreter);

		initializer.initialize("java/lang/Object").expect("initializes");
		initializer.initialize("java/lang/Object").expect("initializes");

		assert_eq!(interpreter.calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn failed_clinit_surfaces_as_no_class_def_found_on_retry() {
		let mut classes = std::collections::HashMap::new();
		classes.insert("com/example/Bomb".to_string(), encode_with_clinit("com/example/Bomb", None));
		let source = FixtureSource { classes };
		let method_area = MethodArea::new();
		let loader = ClassLoader::new(&source, &method_area);
		let interpreter = CountingInterpreter {
			fail_for: Some("com/example/Bomb"),
			..Default::default()
		};
		let initializer = Initializer::new(&loader, &interpreter);

		assert!(initializer.initialize("com/example/Bomb").is_err());
		assert!(matches!(
			initializer.initialize("com/example/Bomb"),
			Err(LoaderError::NoClassDefFoundError(_))
		));
	}
}

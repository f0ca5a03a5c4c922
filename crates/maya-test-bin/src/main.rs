use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use maya_classfile_io::class_pool::{AccessFlags, CpTag};
use maya_classfile_io::ClassFile;
use maya_classfile_ir::IRClassFile;
use maya_classloader::{ClassLoader, ClassSource, Initializer, InstalledClass, Interpreter, LoaderError, MethodArea, VmError};

/// A classpath of classes held in memory, keyed by binary name. Stands in
/// for a real classpath/JAR scanner.
struct InMemoryClasspath {
	classes: HashMap<String, Vec<u8>>,
}

impl ClassSource for InMemoryClasspath {
	fn fetch_class_bytes(&self, name: &str) -> Result<Vec<u8>, LoaderError> {
		self.classes
			.get(name)
			.cloned()
			.ok_or_else(|| LoaderError::ClassNotFound(name.to_string()))
	}
}

/// Logs `<clinit>` dispatch instead of actually running bytecode — this
/// binary exercises the loading pipeline, not the interpreter.
struct LoggingInterpreter;

impl Interpreter for LoggingInterpreter {
	fn execute_frame(&self, class: &Arc<InstalledClass>) -> Result<(), VmError> {
		log::info!("would run <clinit> for {}", class.name());
		Ok(())
	}
}

/// Builds a minimal but format-valid class file for `name`, with an
/// optional superclass and an empty `<clinit>`.
fn build_demo_class(name: &str, super_name: Option<&str>) -> Vec<u8> {
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
	class.write(&mut buffer).expect("demo class should always encode cleanly");
	buffer.into_inner()
}

fn run_loader_demo() -> eyre::Result<()> {
	let mut classes = HashMap::new();
	classes.insert("java/lang/Object".to_string(), build_demo_class("java/lang/Object", None));
	classes.insert(
		"com/example/Widget".to_string(),
		build_demo_class("com/example/Widget", Some("java/lang/Object")),
	);
	let classpath = InMemoryClasspath { classes };

	let method_area = MethodArea::new();
	let loader = ClassLoader::new(&classpath, &method_area);
	let interpreter = LoggingInterpreter;
	let initializer = Initializer::new(&loader, &interpreter);

	let widget = initializer.initialize("com/example/Widget")?;
	println!("loaded and initialized {}", widget.name());

	Ok(())
}

/// Parses and format-checks every `.class` file under `crates/maya-test-bin/demos`,
/// if that directory exists. Useful for throwing real-world class files at
/// the parser during manual testing.
fn run_demos_directory() -> eyre::Result<()> {
	let path = Path::new("crates/maya-test-bin/demos");
	let Ok(dir) = path.read_dir() else {
		return Ok(());
	};

	for entry in dir.flatten() {
		let name = entry.file_name();
		if !name.to_string_lossy().ends_with(".class") {
			continue;
		}

		let class_bytes = std::fs::read(entry.path())?;
		let mut buffer = Cursor::new(class_bytes);

		println!("parsing {name:?}");
		let raw = ClassFile::read(&mut buffer)?;
		maya_classfile_verifier::validate_class(&raw)?;
		let class = IRClassFile::from_io(raw)?;
		println!("parsed {:?} as {}", name, class.name());
	}

	Ok(())
}

fn main() -> eyre::Result<()> {
	pretty_env_logger::init();

	run_loader_demo()?;
	run_demos_directory()?;

	Ok(())
}

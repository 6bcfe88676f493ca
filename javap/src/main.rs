use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use jvm_class::access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use jvm_class::attributes::code::Code;
use jvm_class::attributes::Attribute;
use jvm_class::descriptor::{self, Type};
use jvm_class::pool::{ConstantPool, Entry};
use jvm_class::{ClassFile, FieldInfo, MethodInfo};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(value_name = "CLASSES", required = true)]
    class_file: Vec<PathBuf>,

    /// Print line number and local variable tables
    #[arg(short, long)]
    line: bool,

    /// Show only public classes and members
    #[arg(long)]
    public: bool,

    /// Show protected/public classes and members
    #[arg(long)]
    protected: bool,

    /// Show package/protected/public classes and members (default)
    #[arg(long, default_value_t = true)]
    package: bool,

    /// Show all classes and members
    #[arg(long)]
    private: bool,

    /// Disassemble the code
    #[arg(short = 'c', long)]
    disassemble: bool,

    /// Print internal type signatures
    #[arg(short, long)]
    signatures: bool,

    /// Show system info (path, size, last-modified) of class being processed
    #[arg(long)]
    sysinfo: bool,

    /// Show final constants
    #[arg(long)]
    constants: bool,
}

fn main() {
    let args = Args::parse();
    let mut had_error = false;

    for path in &args.class_file {
        match jvm_class::read_path(path) {
            Ok((class, diagnostics)) => {
                for diagnostic in diagnostics.entries() {
                    eprintln!("warning: {}: {}", path.display(), diagnostic.message);
                }
                print!("{}", render_class(&class, &args, path));
            }
            Err(err) => {
                eprintln!("error: {}: {err}", path.display());
                had_error = true;
            }
        }
    }

    if had_error {
        std::process::exit(1);
    }
}

/// Visibility threshold selected by the `--public`/`--protected`/`--package`/
/// `--private` flags, as a rank comparable against [`member_rank`]. The most
/// specific flag wins; with none of them the default is package-private.
fn visibility_threshold(args: &Args) -> u8 {
    if args.private {
        3
    } else if args.protected {
        1
    } else if args.public {
        0
    } else {
        2
    }
}

fn member_rank(public: bool, protected: bool, private: bool) -> u8 {
    if public {
        0
    } else if protected {
        1
    } else if private {
        3
    } else {
        2
    }
}

fn render_type(ty: &Type) -> String {
    match ty {
        Type::Byte => "byte".to_string(),
        Type::Short => "short".to_string(),
        Type::Int => "int".to_string(),
        Type::Long => "long".to_string(),
        Type::Char => "char".to_string(),
        Type::Float => "float".to_string(),
        Type::Double => "double".to_string(),
        Type::Boolean => "boolean".to_string(),
        Type::Void => "void".to_string(),
        Type::Class(name) => name.replace('/', "."),
        Type::Array(element) => format!("{}[]", render_type(element)),
        Type::Invalid(raw) => raw.clone(),
        other => format!("{other:?}"),
    }
}

fn class_modifiers(access: ClassAccessFlags) -> Vec<&'static str> {
    let mut mods = Vec::new();
    if access.contains(ClassAccessFlags::PUBLIC) {
        mods.push("public");
    }
    if access.contains(ClassAccessFlags::FINAL) {
        mods.push("final");
    }
    if access.contains(ClassAccessFlags::ABSTRACT) && !access.contains(ClassAccessFlags::INTERFACE) {
        mods.push("abstract");
    }
    mods
}

fn class_keyword(access: ClassAccessFlags) -> &'static str {
    if access.contains(ClassAccessFlags::ANNOTATION) {
        "@interface"
    } else if access.contains(ClassAccessFlags::INTERFACE) {
        "interface"
    } else if access.contains(ClassAccessFlags::ENUM) {
        "enum"
    } else {
        "class"
    }
}

fn field_modifiers(access: FieldAccessFlags) -> Vec<&'static str> {
    let mut mods = Vec::new();
    if access.contains(FieldAccessFlags::PUBLIC) {
        mods.push("public");
    } else if access.contains(FieldAccessFlags::PROTECTED) {
        mods.push("protected");
    } else if access.contains(FieldAccessFlags::PRIVATE) {
        mods.push("private");
    }
    if access.contains(FieldAccessFlags::STATIC) {
        mods.push("static");
    }
    if access.contains(FieldAccessFlags::FINAL) {
        mods.push("final");
    }
    if access.contains(FieldAccessFlags::VOLATILE) {
        mods.push("volatile");
    }
    if access.contains(FieldAccessFlags::TRANSIENT) {
        mods.push("transient");
    }
    mods
}

fn method_modifiers(access: MethodAccessFlags) -> Vec<&'static str> {
    let mut mods = Vec::new();
    if access.contains(MethodAccessFlags::PUBLIC) {
        mods.push("public");
    } else if access.contains(MethodAccessFlags::PROTECTED) {
        mods.push("protected");
    } else if access.contains(MethodAccessFlags::PRIVATE) {
        mods.push("private");
    }
    if access.contains(MethodAccessFlags::STATIC) {
        mods.push("static");
    }
    if access.contains(MethodAccessFlags::FINAL) {
        mods.push("final");
    }
    if access.contains(MethodAccessFlags::SYNCHRONIZED) {
        mods.push("synchronized");
    }
    if access.contains(MethodAccessFlags::NATIVE) {
        mods.push("native");
    }
    if access.contains(MethodAccessFlags::ABSTRACT) {
        mods.push("abstract");
    }
    if access.contains(MethodAccessFlags::STRICT) {
        mods.push("strictfp");
    }
    mods
}

fn render_class(class: &ClassFile, args: &Args, path: &Path) -> String {
    let mut out = String::new();

    if args.sysinfo {
        writeln!(out, "Classfile {}", path.display()).unwrap();
        if let Ok(meta) = fs::metadata(path) {
            write!(out, "  Size {} bytes", meta.len()).unwrap();
            if let Ok(modified) = meta.modified() {
                writeln!(out, ", last modified {modified:?}").unwrap();
            } else {
                writeln!(out).unwrap();
            }
        }
        writeln!(out, "  {}", class.version).unwrap();
    }

    for info in &class.attributes {
        if let Attribute::SourceFile { sourcefile_index } = &info.attribute {
            if let Some(name) = class.pool.utf8(*sourcefile_index) {
                writeln!(out, "Compiled from \"{name}\"").unwrap();
            }
        }
    }

    writeln!(out, "{} {{", class_header(class)).unwrap();

    let threshold = visibility_threshold(args);

    for field in &class.fields {
        let rank = member_rank(
            field.access.contains(FieldAccessFlags::PUBLIC),
            field.access.contains(FieldAccessFlags::PROTECTED),
            field.access.contains(FieldAccessFlags::PRIVATE),
        );
        if rank > threshold {
            continue;
        }
        render_field(field, class, args, &mut out);
    }
    if !class.fields.is_empty() {
        writeln!(out).unwrap();
    }

    for method in &class.methods {
        let rank = member_rank(
            method.access.contains(MethodAccessFlags::PUBLIC),
            method.access.contains(MethodAccessFlags::PROTECTED),
            method.access.contains(MethodAccessFlags::PRIVATE),
        );
        if rank > threshold {
            continue;
        }
        render_method(method, class, args, &mut out);
    }

    writeln!(out, "}}").unwrap();
    out
}

fn class_header(class: &ClassFile) -> String {
    let mods = class_modifiers(class.access).join(" ");
    let keyword = class_keyword(class.access);
    let this_name = class.this_name().unwrap_or("UnknownClass").replace('/', ".");

    let mut header = String::new();
    if !mods.is_empty() {
        header.push_str(&mods);
        header.push(' ');
    }
    header.push_str(keyword);
    header.push(' ');
    header.push_str(&this_name);

    if !class.access.contains(ClassAccessFlags::INTERFACE) {
        if let Some(super_name) = class.super_name() {
            if super_name != "java/lang/Object" {
                write!(header, " extends {}", super_name.replace('/', ".")).unwrap();
            }
        }
    }

    if !class.interfaces.is_empty() {
        let names: Vec<String> = class
            .interfaces
            .iter()
            .filter_map(|index| class.pool.class_name(*index))
            .map(|name| name.replace('/', "."))
            .collect();
        let keyword = if class.access.contains(ClassAccessFlags::INTERFACE) { "extends" } else { "implements" };
        write!(header, " {keyword} {}", names.join(", ")).unwrap();
    }

    header
}

fn render_field(field: &FieldInfo, class: &ClassFile, args: &Args, out: &mut String) {
    let name = field.name(&class.pool).unwrap_or("<unknown>");
    let descriptor = field.descriptor(&class.pool).unwrap_or("");
    let ty = descriptor::parse_field(descriptor).map(|ty| render_type(&ty)).unwrap_or_else(|_| descriptor.to_string());
    let mods = field_modifiers(field.access).join(" ");

    let mut line = String::from("    ");
    if !mods.is_empty() {
        write!(line, "{mods} ").unwrap();
    }
    write!(line, "{ty} {name}").unwrap();

    if args.constants {
        if let Some(value) = constant_value(field, class) {
            write!(line, " = {value}").unwrap();
        }
    }
    line.push(';');
    writeln!(out, "{line}").unwrap();

    if args.signatures {
        writeln!(out, "      descriptor: {descriptor}").unwrap();
    }
}

fn constant_value(field: &FieldInfo, class: &ClassFile) -> Option<String> {
    field.attributes.iter().find_map(|info| match &info.attribute {
        Attribute::ConstantValue { const_value_index } => render_constant(&class.pool, *const_value_index),
        _ => None,
    })
}

fn render_constant(pool: &ConstantPool, index: u16) -> Option<String> {
    match pool.get(index).entry()? {
        Entry::Integer(v) => Some(v.to_string()),
        Entry::Float(v) => Some(format!("{v}f")),
        Entry::Long(v) => Some(format!("{v}l")),
        Entry::Double(v) => Some(v.to_string()),
        Entry::String { string_index } => pool.utf8(*string_index).map(|s| format!("{s:?}")),
        _ => None,
    }
}

fn render_method(method: &MethodInfo, class: &ClassFile, args: &Args, out: &mut String) {
    let raw_name = method.name(&class.pool).unwrap_or("<unknown>");
    let descriptor = method.descriptor(&class.pool).unwrap_or("()V");
    let this_name = class.this_name().unwrap_or("");
    let simple_this = this_name.rsplit('/').next().unwrap_or(this_name);
    let mods = method_modifiers(method.access).join(" ");

    let mut line = String::from("    ");
    if !mods.is_empty() {
        write!(line, "{mods} ").unwrap();
    }

    if raw_name == "<clinit>" {
        write!(line, "{{}}").unwrap();
    } else {
        match descriptor::parse_method(descriptor) {
            Ok((arg_types, ret)) => {
                let params = arg_types.iter().map(render_type).collect::<Vec<_>>().join(", ");
                if raw_name == "<init>" {
                    write!(line, "{simple_this}({params})").unwrap();
                } else {
                    write!(line, "{} {raw_name}({params})", render_type(&ret)).unwrap();
                }
            }
            Err(_) => write!(line, "{raw_name}{descriptor}").unwrap(),
        }
    }
    line.push(';');
    writeln!(out, "{line}").unwrap();

    if args.signatures {
        writeln!(out, "      descriptor: {descriptor}").unwrap();
    }

    if let Some(code) = method.code() {
        if args.disassemble {
            render_code(code, &class.pool, out);
        }
        if args.line {
            render_line_numbers(code, out);
        }
    }

    writeln!(out).unwrap();
}

fn render_code(code: &Code, pool: &ConstantPool, out: &mut String) {
    writeln!(out, "      Code:").unwrap();
    for (offset, insn) in &code.insns {
        let mut lines = render_insn_lines(*offset, insn, pool).into_iter();
        if let Some(first) = lines.next() {
            writeln!(out, "       {offset:>5}: {first}").unwrap();
        }
        for line in lines {
            writeln!(out, "              {line}").unwrap();
        }
    }
}

/// One or more display lines for `insn` at `offset`: branch targets are
/// resolved to absolute offsets and constant-pool references get a
/// trailing `// ...` comment, both of which need more context than
/// `Instruction`'s bare `Display` impl has.
fn render_insn_lines(offset: u32, insn: &jvm_class::instruction::Instruction, pool: &ConstantPool) -> Vec<String> {
    use jvm_class::instruction::Instruction;

    let target = |delta: i32| (offset as i64 + delta as i64) as u32;

    match insn {
        Instruction::Wide(inner) => render_insn_lines(offset, inner, pool),
        Instruction::Branch { opcode, delta } => vec![format!("{} {}", opcode.mnemonic(), target(*delta))],
        Instruction::ConstRef { opcode, index } => {
            vec![format!("{} #{index}{}", opcode.mnemonic(), comment(pool, *index))]
        }
        Instruction::InvokeInterface { index, count, .. } => {
            vec![format!("invokeinterface #{index}, {count}{}", comment(pool, *index))]
        }
        Instruction::InvokeDynamic { index, .. } => {
            vec![format!("invokedynamic #{index}{}", comment(pool, *index))]
        }
        Instruction::MultiANewArray { index, dimensions } => {
            vec![format!("multianewarray #{index}, {dimensions}{}", comment(pool, *index))]
        }
        Instruction::TableSwitch { default, low, offsets, .. } => {
            let mut lines = vec![format!("tableswitch {{ // {low} to {}", low + offsets.len() as i32 - 1)];
            for (i, delta) in offsets.iter().enumerate() {
                lines.push(format!("    {}: {}", low + i as i32, target(*delta)));
            }
            lines.push(format!("    default: {}", target(*default)));
            lines.push("}".to_string());
            lines
        }
        Instruction::LookupSwitch { default, pairs } => {
            let mut lines = vec!["lookupswitch {".to_string()];
            for (value, delta) in pairs {
                lines.push(format!("    {value}: {}", target(*delta)));
            }
            lines.push(format!("    default: {}", target(*default)));
            lines.push("}".to_string());
            lines
        }
        other => vec![other.to_string()],
    }
}

fn comment(pool: &ConstantPool, index: u16) -> String {
    render_pool_comment(pool, index).map(|text| format!(" // {text}")).unwrap_or_default()
}

fn render_pool_comment(pool: &ConstantPool, index: u16) -> Option<String> {
    match pool.get(index).entry()? {
        Entry::Methodref { class_index, name_and_type_index } => {
            let class = pool.class_name(*class_index)?;
            let (name, desc) = pool.name_and_type(*name_and_type_index)?;
            Some(format!("Method {class}.{name}:{desc}"))
        }
        Entry::InterfaceMethodref { class_index, name_and_type_index } => {
            let class = pool.class_name(*class_index)?;
            let (name, desc) = pool.name_and_type(*name_and_type_index)?;
            Some(format!("InterfaceMethod {class}.{name}:{desc}"))
        }
        Entry::Fieldref { class_index, name_and_type_index } => {
            let class = pool.class_name(*class_index)?;
            let (name, desc) = pool.name_and_type(*name_and_type_index)?;
            Some(format!("Field {class}.{name}:{desc}"))
        }
        Entry::Class { name_index } => pool.utf8(*name_index).map(|name| format!("class {name}")),
        Entry::String { string_index } => pool.utf8(*string_index).map(|s| format!("String {s}")),
        Entry::InvokeDynamic { name_and_type_index, .. } => {
            let (name, desc) = pool.name_and_type(*name_and_type_index)?;
            Some(format!("InvokeDynamic {name}:{desc}"))
        }
        Entry::MethodHandle { .. } => Some("MethodHandle".to_string()),
        _ => None,
    }
}

fn render_line_numbers(code: &Code, out: &mut String) {
    let table = code.attributes.iter().find_map(|info| match &info.attribute {
        Attribute::LineNumberTable(entries) => Some(entries),
        _ => None,
    });
    let Some(table) = table else { return };
    writeln!(out, "      LineNumberTable:").unwrap();
    for entry in table {
        writeln!(out, "        line {}: {}", entry.line_number, entry.start_pc).unwrap();
    }
}

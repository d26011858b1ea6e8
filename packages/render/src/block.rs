use model::{
    Accessibility, Class, Declaration, EnumerationType, Field, Member, Method, Namespace, Struct,
    Type, TypeDef, Union,
};

const INDENT: &str = "    ";

/// Bare `ns1::ns2::name<modifiers>` rendering of a type, with no trailing
/// separator added when there are no modifiers (used standalone, e.g. for a
/// base-class name).
pub fn type_string(ty: &Type) -> String {
    if ty.is_unresolved() {
        return match ty.unresolved_offset {
            Some(off) => format!("void * /*<<ERROR_UNKNOWN - {off:#x}>>*/"),
            None => "void * /*<<ERROR_UNKNOWN>>*/".to_string(),
        };
    }
    let mut out = String::new();
    for ns in &ty.namespaces {
        out.push_str(ns);
        out.push_str("::");
    }
    out.push_str(&ty.name);
    if !ty.modifiers.is_empty() {
        out.push(' ');
        let tokens: Vec<&str> = ty.modifiers.iter().map(|m| m.token()).collect();
        out.push_str(&tokens.join(" "));
        out.push(' ');
    }
    out
}

/// Type rendering used right before a declared name (field, parameter,
/// method return type): always ends in exactly one separating space.
fn type_decl_string(ty: &Type) -> String {
    let mut s = type_string(ty);
    if !s.ends_with(' ') {
        s.push(' ');
    }
    s
}

fn render_const_value(ty: &Type, array_size: Option<u64>, bytes: &[u8]) -> String {
    if array_size.is_none() {
        if ty.modifiers.contains(&model::Modifier::Pointer) && ty.name.as_ref() == "char"
            && let Ok(s) = std::str::from_utf8(bytes) {
                let s = s.trim_end_matches('\0');
                return format!("\"{s}\"");
            }
        if !bytes.is_empty() && bytes.len() <= 8 {
            let mut buf = [0u8; 8];
            buf[..bytes.len()].copy_from_slice(bytes);
            return i64::from_le_bytes(buf).to_string();
        }
        return format!("/* {bytes:?} */");
    }
    let n = array_size.unwrap() as usize;
    let chunk = ty.byte_size.unwrap_or(4).max(1) as usize;
    let is_float = matches!(ty.name.as_ref(), "float" | "double");
    let mut parts = Vec::with_capacity(n);
    for i in 0..n {
        let start = i * chunk;
        if start >= bytes.len() {
            break;
        }
        let end = (start + chunk).min(bytes.len());
        let slice = &bytes[start..end];
        if is_float && chunk == 4 {
            let mut b = [0u8; 4];
            b[..slice.len()].copy_from_slice(slice);
            parts.push(format!("{}f", f32::from_le_bytes(b)));
        } else if is_float && chunk == 8 {
            let mut b = [0u8; 8];
            b[..slice.len()].copy_from_slice(slice);
            parts.push(f64::from_le_bytes(b).to_string());
        } else {
            let mut b = [0u8; 8];
            b[..slice.len()].copy_from_slice(slice);
            parts.push(i64::from_le_bytes(b).to_string());
        }
    }
    format!("{{ {} }}", parts.join(", "))
}

fn render_field(f: &Field) -> String {
    let mut out = String::new();
    if f.is_static {
        out.push_str("static ");
    }
    out.push_str(&type_decl_string(&f.ty));
    out.push_str(&f.name);
    if let Some(n) = f.array_size {
        out.push_str(&format!("[{n}]"));
    }
    if let Some(bytes) = &f.const_value {
        out.push_str(" = ");
        out.push_str(&render_const_value(&f.ty, f.array_size, bytes));
    }
    out.push(';');
    out
}

fn render_params(method: &Method) -> String {
    if method.is_destructor() {
        return String::new();
    }
    method
        .rendered_parameters()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let name = p
                .name
                .clone()
                .unwrap_or_else(|| format!("arg{i}").into());
            format!("{}{}", type_decl_string(&p.ty), name)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_method(class_name: &str, method: &Method) -> String {
    let mut out = String::new();
    if method.is_static {
        out.push_str("static ");
    }
    if method.is_virtual {
        out.push_str("virtual ");
    }
    let is_ctor = method.name.as_ref() == class_name && !method.is_destructor();
    match &method.return_type {
        Some(rt) => out.push_str(&type_decl_string(rt)),
        None if !is_ctor && !method.is_destructor() => out.push_str("void "),
        None => {}
    }
    out.push_str(&method.name);
    out.push('(');
    out.push_str(&render_params(method));
    out.push_str(");");
    out
}

fn indent_block(text: &str) -> String {
    text.lines()
        .map(|l| if l.is_empty() { String::new() } else { format!("{INDENT}{l}") })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a class/struct/union member list, prefixing accessibility labels
/// at every point where the label differs from the implicit `private`
/// default it started at (which is what makes the "first member private"
/// case suppress a leading label instead of a special case).
fn render_members(class_name: &str, members: &[Member], labels: bool) -> String {
    let mut lines = Vec::new();
    let mut prev = Accessibility::Private;
    for member in members {
        if labels {
            let acc = member.accessibility();
            if acc != prev {
                lines.push(format!("{}:", acc.keyword()));
                prev = acc;
            }
        }
        match member {
            Member::Field(f) => lines.push(render_field(f)),
            Member::Method(m) => lines.push(render_method(class_name, m)),
            Member::AnonymousUnion(inner) => {
                lines.push("union {".to_string());
                lines.push(indent_block(&render_members(class_name, inner, false)));
                lines.push("};".to_string());
            }
            Member::NestedEnum(e) => lines.push(render_enum(e)),
        }
    }
    lines.join("\n")
}

pub fn render_enum(e: &EnumerationType) -> String {
    let mut out = format!("enum {} : {}{{\n", e.name, type_decl_string(&e.backing_type));
    let body: Vec<String> = e
        .enumerators
        .iter()
        .map(|en| format!("{} = {}", en.name, en.value))
        .collect();
    out.push_str(&indent_block(&body.join(",\n")));
    out.push_str("\n};");
    out
}

fn render_class_like(
    keyword: &str,
    name: &str,
    inheritance_suffix: &str,
    members: &[Member],
) -> String {
    let body = render_members(name, members, true);
    format!(
        "{keyword} {name}{inheritance_suffix} {{\n{}\n}};",
        indent_block(&body)
    )
}

pub fn render_class(c: &Class) -> String {
    let suffix = match &c.inheritance {
        Some(inh) => {
            let kw = match inh.accessibility {
                Accessibility::Private => String::new(),
                other => format!("{} ", other.keyword()),
            };
            format!(" : {kw}{}", type_string(&inh.class))
        }
        None => String::new(),
    };
    render_class_like("class", &c.name, &suffix, &c.members)
}

pub fn render_struct(s: &Struct) -> String {
    render_class_like("struct", &s.name, "", &s.members)
}

pub fn render_union(u: &Union) -> String {
    format!(
        "union {} {{\n{}\n}};",
        u.name,
        indent_block(&render_members(&u.name, &u.members, false))
    )
}

pub fn render_namespace(ns: &Namespace, render_entity: impl Fn(&Declaration) -> String) -> String {
    let body: Vec<String> = ns.entities.iter().map(render_entity).collect();
    format!(
        "namespace {} {{\n{}\n}};",
        ns.name,
        indent_block(&body.join("\n\n"))
    )
}

pub fn render_typedef(t: &TypeDef) -> String {
    format!("typedef {}{};", type_decl_string(&t.target), t.name)
}

pub fn render_declaration(decl: &Declaration) -> String {
    match decl {
        Declaration::Class(c) => render_class(c),
        Declaration::Struct(s) => render_struct(s),
        Declaration::Union(u) => render_union(u),
        Declaration::Namespace(ns) => render_namespace(ns, render_declaration),
        Declaration::TypeDef(t) => render_typedef(t),
        Declaration::Enum(e) => render_enum(e),
    }
}

#[cfg(test)]
mod tests {
    use model::{Inheritance, Parameter};

    use super::*;

    #[test]
    fn const_char_pointer_renders_as_string() {
        let ty = Type {
            name: "char".into(),
            modifiers: vec![model::Modifier::Constant, model::Modifier::Pointer],
            ..Default::default()
        };
        assert_eq!(
            render_const_value(&ty, None, b"hi\0"),
            "\"hi\""
        );
    }

    #[test]
    fn int_array_decodes_le_chunks() {
        let ty = Type {
            name: "int".into(),
            byte_size: Some(2),
            ..Default::default()
        };
        let bytes = [1u8, 0, 2, 0, 3, 0, 4, 0];
        assert_eq!(render_const_value(&ty, Some(4), &bytes), "{ 1, 2, 3, 4 }");
    }

    #[test]
    fn private_inheritance_omits_keyword() {
        let c = Class {
            name: "D".into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            inheritance: Some(Inheritance {
                class: Type {
                    name: "B".into(),
                    ..Default::default()
                },
                accessibility: Accessibility::Private,
            }),
            members: Vec::new(),
        };
        let rendered = render_class(&c);
        assert!(rendered.starts_with("class D : B {"), "{rendered}");
    }

    #[test]
    fn public_inheritance_keeps_keyword() {
        let c = Class {
            name: "D".into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            inheritance: Some(Inheritance {
                class: Type {
                    name: "B".into(),
                    ..Default::default()
                },
                accessibility: Accessibility::Public,
            }),
            members: Vec::new(),
        };
        assert!(render_class(&c).starts_with("class D : public B {"));
    }

    #[test]
    fn first_private_member_suppresses_label() {
        let field = |acc| {
            Member::Field(Field {
                name: "x".into(),
                ty: Type {
                    name: "int".into(),
                    ..Default::default()
                },
                accessibility: acc,
                is_static: false,
                const_value: None,
                array_size: None,
                data_member_location: Some(0),
            })
        };
        let members = vec![field(Accessibility::Private), field(Accessibility::Public)];
        let rendered = render_members("C", &members, true);
        assert!(!rendered.trim_start().starts_with("private:"));
        assert!(rendered.contains("public:"));
    }

    #[test]
    fn destructor_has_no_parameters() {
        let m = Method {
            name: "~Foo".into(),
            return_type: None,
            accessibility: Accessibility::Public,
            is_static: false,
            is_virtual: false,
            parameters: vec![Parameter {
                name: Some("x".into()),
                ty: Type::default(),
                offset: 0,
            }],
            direct_parameters: Vec::new(),
            low_pc: None,
            offset: 0,
            decl_file: None,
            fully_defined: true,
            linkage_name: None,
        };
        assert_eq!(render_method("Foo", &m), "~Foo();");
    }
}

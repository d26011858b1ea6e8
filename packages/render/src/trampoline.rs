use model::{Class, Declaration, Member, Method, Modifier, Namespace, Struct, Type, Union};

use crate::block::type_string;

const INDENT: &str = "    ";

fn type_decl_string(ty: &Type) -> String {
    let mut s = type_string(ty);
    if !s.ends_with(' ') {
        s.push(' ');
    }
    s
}

struct MethodEntry<'a> {
    class_name: &'a str,
    method: &'a Method,
}

fn collect_methods<'a>(decl: &'a Declaration, out: &mut Vec<MethodEntry<'a>>) {
    let (name, members): (&str, &[Member]) = match decl {
        Declaration::Class(c) => (&c.name, &c.members),
        Declaration::Struct(s) => (&s.name, &s.members),
        Declaration::Union(u) => (&u.name, &u.members),
        Declaration::Namespace(ns) => {
            for child in &ns.entities {
                collect_methods(child, out);
            }
            return;
        }
        Declaration::TypeDef(_) | Declaration::Enum(_) => return,
    };
    for member in members {
        if let Member::Method(m) = member
            && m.low_pc.is_some() && !m.is_destructor() {
                out.push(MethodEntry {
                    class_name: name,
                    method: m,
                });
            }
    }
}

fn params_with_names(method: &Method) -> Vec<(String, String)> {
    method
        .rendered_parameters()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let name = p
                .name
                .clone()
                .unwrap_or_else(|| format!("arg{i}").into())
                .to_string();
            (type_decl_string(&p.ty), name)
        })
        .collect()
}

fn render_pointer_namespace(class_name: &str, methods: &[&Method]) -> String {
    let mut body = String::new();
    for m in methods {
        let low_pc = m.low_pc.unwrap();
        body.push_str(&format!(
            "{INDENT}unsigned long long {} = {low_pc:#x};\n",
            m.name
        ));
    }
    format!("namespace PTR_{class_name} {{\n{body}}};")
}

/// Renders the out-of-class definition for a non-constructor method: its
/// signature matches the in-class declaration exactly (no injected
/// parameter), and the body casts the recovered address to a function
/// pointer whose parameter list is prepended with `<Class> *` for
/// non-static methods, calling it with `this` as the receiver.
fn render_method_definition(class_name: &str, method: &Method) -> String {
    let params = params_with_names(method);
    let sig_params: Vec<String> = params.iter().map(|(ty, name)| format!("{ty}{name}")).collect();

    let ret = match &method.return_type {
        Some(rt) => type_decl_string(rt),
        None => "void ".to_string(),
    };
    let ret_ty = match &method.return_type {
        Some(rt) => type_string(rt),
        None => "void".to_string(),
    };

    let fnptr_params: Vec<String> = if method.is_static {
        params.iter().map(|(ty, _)| ty.trim_end().to_string()).collect()
    } else {
        std::iter::once(format!("{class_name} *"))
            .chain(params.iter().map(|(ty, _)| ty.trim_end().to_string()))
            .collect()
    };
    let call_args: Vec<String> = if method.is_static {
        params.iter().map(|(_, n)| n.clone()).collect()
    } else {
        std::iter::once("this".to_string())
            .chain(params.iter().map(|(_, n)| n.clone()))
            .collect()
    };

    let call = format!(
        "(({ret_ty} (*)({}))(BASE_ADDRESS + PTR_{class_name}::{}))({})",
        fnptr_params.join(", "),
        method.name,
        call_args.join(", "),
    );

    format!(
        "{ret}{class_name}::{}({}) {{\n{INDENT}{}{call};\n}}",
        method.name,
        sig_params.join(", "),
        if method.return_type.is_some() { "return " } else { "" },
    )
}

/// Renders the `static <Class> * <Class>::construct(<params>)` out-of-class
/// body for a recovered constructor: allocates storage for the instance,
/// calls the raw constructor address with that storage as the receiver,
/// and returns it.
fn render_construct_definition(class_name: &str, ctor: &Method) -> String {
    let params = params_with_names(ctor);
    let ctor_params: Vec<String> = params.iter().map(|(ty, name)| format!("{ty}{name}")).collect();

    let fnptr_params: Vec<String> = std::iter::once(format!("{class_name} *"))
        .chain(params.iter().map(|(ty, _)| ty.trim_end().to_string()))
        .collect();
    let call_args: Vec<String> = std::iter::once("self".to_string())
        .chain(params.iter().map(|(_, n)| n.clone()))
        .collect();

    let call = format!(
        "((void (*)({}))(BASE_ADDRESS + PTR_{class_name}::{}))({})",
        fnptr_params.join(", "),
        ctor.name,
        call_args.join(", "),
    );

    format!(
        "static {class_name} * {class_name}::construct({}) {{\n{INDENT}{class_name} * self = ({class_name} *)::operator new(sizeof({class_name}));\n{INDENT}{call};\n{INDENT}return self;\n}}",
        ctor_params.join(", ")
    )
}

fn render_definitions(class_name: &str, methods: &[&Method]) -> Vec<String> {
    methods
        .iter()
        .map(|method| {
            if method.name.as_ref() == class_name {
                render_construct_definition(class_name, method)
            } else {
                render_method_definition(class_name, method)
            }
        })
        .collect()
}

/// Renders the `pointers_cpp` trampoline output: a `PTR_<Class>` namespace
/// per class with recovered method addresses, plus inline out-of-class
/// definitions that call through those addresses.
pub fn render_trampolines(decls: &[Declaration]) -> String {
    let mut entries = Vec::new();
    for decl in decls {
        collect_methods(decl, &mut entries);
    }
    if entries.is_empty() {
        return String::new();
    }

    let mut by_class: Vec<(&str, Vec<&Method>)> = Vec::new();
    for entry in &entries {
        match by_class.iter_mut().find(|(name, _)| *name == entry.class_name) {
            Some((_, methods)) => methods.push(entry.method),
            None => by_class.push((entry.class_name, vec![entry.method])),
        }
    }

    let mut out = String::from("extern unsigned long long BASE_ADDRESS;\n\n");
    let mut blocks = Vec::new();
    for (class_name, methods) in &by_class {
        blocks.push(render_pointer_namespace(class_name, methods));
        blocks.extend(render_definitions(class_name, methods));
    }
    out.push_str(&blocks.join("\n\n"));
    out
}

fn synthesize_construct(class_name: &str, ctor: &Method) -> Method {
    Method {
        name: "construct".into(),
        return_type: Some(Type {
            name: class_name.into(),
            modifiers: vec![Modifier::Pointer],
            ..Default::default()
        }),
        accessibility: ctor.accessibility,
        is_static: true,
        is_virtual: false,
        parameters: ctor.parameters.clone(),
        direct_parameters: ctor.direct_parameters.clone(),
        low_pc: None,
        offset: ctor.offset,
        decl_file: None,
        fully_defined: true,
        linkage_name: None,
    }
}

fn with_constructs(class_name: &str, members: &[Member]) -> Vec<Member> {
    let mut out = members.to_vec();
    let constructs = members.iter().filter_map(|m| match m {
        Member::Method(method) if method.name.as_ref() == class_name && method.low_pc.is_some() => {
            Some(Member::Method(synthesize_construct(class_name, method)))
        }
        _ => None,
    });
    out.extend(constructs);
    out
}

fn inject_construct(decl: &Declaration) -> Declaration {
    match decl {
        Declaration::Class(c) => Declaration::Class(Class {
            members: with_constructs(&c.name, &c.members),
            ..c.clone()
        }),
        Declaration::Struct(s) => Declaration::Struct(Struct {
            members: with_constructs(&s.name, &s.members),
            ..s.clone()
        }),
        Declaration::Union(u) => Declaration::Union(Union {
            members: with_constructs(&u.name, &u.members),
            ..u.clone()
        }),
        Declaration::Namespace(ns) => Declaration::Namespace(Namespace {
            name: ns.name.clone(),
            decl_file: ns.decl_file.clone(),
            entities: ns.entities.iter().map(inject_construct).collect(),
        }),
        other => other.clone(),
    }
}

/// Appends a synthesized `construct` declaration to the member list of
/// every class/struct/union with a recovered constructor address, so the
/// class block rendered for `pointers_cpp` carries the member the
/// trampoline section's `construct` definition is declared against.
pub fn inject_constructs(decls: &[Declaration]) -> Vec<Declaration> {
    decls.iter().map(inject_construct).collect()
}

#[cfg(test)]
mod tests {
    use model::{Accessibility, Parameter};

    use super::*;

    fn method(name: &str, low_pc: Option<u64>, is_static: bool) -> Method {
        Method {
            name: name.into(),
            return_type: Some(Type {
                name: "int".into(),
                base: true,
                ..Default::default()
            }),
            accessibility: Accessibility::Public,
            is_static,
            is_virtual: false,
            parameters: vec![Parameter {
                name: Some("x".into()),
                ty: Type {
                    name: "int".into(),
                    base: true,
                    ..Default::default()
                },
                offset: 0,
            }],
            direct_parameters: Vec::new(),
            low_pc,
            offset: 0,
            decl_file: None,
            fully_defined: true,
            linkage_name: None,
        }
    }

    #[test]
    fn class_with_recovered_pc_gets_trampoline() {
        let decl = Declaration::Class(Class {
            name: "Foo".into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            inheritance: None,
            members: vec![Member::Method(method("bar", Some(0x1000), false))],
        });
        let out = render_trampolines(std::slice::from_ref(&decl));
        assert!(out.contains("namespace PTR_Foo"));
        assert!(out.contains("bar = 0x1000"));
        assert!(out.contains("Foo::bar(int x)"));
        assert!(out.contains("((int (*)(Foo *, int))(BASE_ADDRESS + PTR_Foo::bar))(this, x)"));
    }

    #[test]
    fn no_recovered_pc_yields_empty_output() {
        let decl = Declaration::Class(Class {
            name: "Foo".into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            inheritance: None,
            members: vec![Member::Method(method("bar", None, false))],
        });
        assert_eq!(render_trampolines(std::slice::from_ref(&decl)), "");
    }

    #[test]
    fn constructor_synthesizes_construct_function() {
        let decl = Declaration::Class(Class {
            name: "Foo".into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            inheritance: None,
            members: vec![Member::Method(method("Foo", Some(0x2000), false))],
        });
        let out = render_trampolines(std::slice::from_ref(&decl));
        assert!(out.contains("static Foo * Foo::construct(int x)"));
    }

    #[test]
    fn construct_member_is_injected_into_class() {
        let decl = Declaration::Class(Class {
            name: "Foo".into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            inheritance: None,
            members: vec![Member::Method(method("Foo", Some(0x2000), false))],
        });
        let injected = inject_constructs(std::slice::from_ref(&decl));
        let Declaration::Class(c) = &injected[0] else {
            panic!("expected class");
        };
        assert!(c.members.iter().any(|m| matches!(
            m,
            Member::Method(method) if method.name.as_ref() == "construct"
        )));
    }
}

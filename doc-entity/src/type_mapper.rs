//! Mapping from Rust type names to canonical field types.
//!
//! Type names arrive as written in source (`Vec<Vec<f64>>`, `Option<String>`,
//! `chrono::DateTime<Utc>`), possibly with the token spacing produced by
//! `stringify!`. `Option`, `Box`, `Rc` and `Arc` are transparent.

use crate::meta::FieldType;

/// Shape of a native type after mapping: its top-level tag and, for
/// array-like containers, the nesting depth and the element tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeShape {
    pub field_type: FieldType,
    /// `None` when the element type is not a known primitive, either a
    /// nested model or a type that needs an explicit annotation.
    pub element: Option<FieldType>,
    pub array_depth: u32,
}

/// Maps a native type name to its canonical tag, `None` when the name is
/// not recognised.
pub fn map_native_type(type_name: &str) -> Option<FieldType> {
    map_normalized(&normalize(type_name))
}

/// Whether the native type is an array-like container.
pub fn is_container(type_name: &str) -> bool {
    map_native_type(type_name) == Some(FieldType::Array)
}

/// Maps a native type and, for containers, walks nested containers to find
/// the array depth and the element type.
pub fn resolve_native_type(type_name: &str) -> Option<NativeShape> {
    let normalized = normalize(type_name);
    let mut current = unwrap_transparent(&normalized);
    let field_type = map_normalized(current)?;
    if field_type != FieldType::Array {
        return Some(NativeShape {
            field_type,
            element: None,
            array_depth: 1,
        });
    }

    let mut array_depth = 0;
    while map_normalized(current) == Some(FieldType::Array) {
        array_depth += 1;
        match element_of(current) {
            Some(inner) => current = unwrap_transparent(inner),
            None => {
                return Some(NativeShape {
                    field_type,
                    element: None,
                    array_depth,
                });
            }
        }
    }

    Some(NativeShape {
        field_type,
        element: map_normalized(current),
        array_depth,
    })
}

fn map_normalized(t: &str) -> Option<FieldType> {
    if t.starts_with('[') {
        return Some(FieldType::Array);
    }
    let (base, args) = split_generic(t);
    let field_type = match base {
        "Option" | "Box" | "Rc" | "Arc" => return args.and_then(|a| map_normalized(first_arg(a))),
        "String" | "str" | "char" | "Cow" => FieldType::String,
        "bool" => FieldType::Boolean,
        "i8" | "i16" | "i32" | "u8" | "u16" => FieldType::Int32,
        "i64" | "u32" | "u64" | "isize" | "usize" => FieldType::Int64,
        "f32" | "f64" => FieldType::Number,
        "Uuid" => FieldType::Uuid,
        "DateTime" | "NaiveDateTime" | "SystemTime" | "OffsetDateTime" => FieldType::DateTime,
        "Bytes" | "ByteBuf" => FieldType::Bytes,
        "Vec" if args == Some("u8") => FieldType::Bytes,
        "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet" => {
            FieldType::Array
        }
        "HashMap" | "BTreeMap" | "IndexMap" | "Map" | "Value" => FieldType::Object,
        _ => return None,
    };
    Some(field_type)
}

fn normalize(type_name: &str) -> String {
    let mut rest = type_name.trim();
    while let Some(stripped) = rest.strip_prefix('&') {
        rest = stripped.trim_start();
        if rest.starts_with('\'') {
            rest = rest
                .split_once(char::is_whitespace)
                .map_or("", |(_, tail)| tail)
                .trim_start();
        }
        if let Some(tail) = rest.strip_prefix("mut ") {
            rest = tail.trim_start();
        }
    }
    rest.chars().filter(|c| !c.is_whitespace()).collect()
}

fn unwrap_transparent(mut t: &str) -> &str {
    loop {
        let (base, args) = split_generic(t);
        match (base, args) {
            ("Option" | "Box" | "Rc" | "Arc", Some(args)) => t = first_arg(args),
            _ => return t,
        }
    }
}

/// Splits `path::Base<Args>` into `("Base", Some("Args"))`.
fn split_generic(t: &str) -> (&str, Option<&str>) {
    let (head, args) = match t.find('<') {
        Some(open) if t.ends_with('>') => (&t[..open], Some(&t[open + 1..t.len() - 1])),
        _ => (t, None),
    };
    let base = head.rsplit("::").next().unwrap_or(head);
    (base, args)
}

fn first_arg(args: &str) -> &str {
    let mut depth = 0usize;
    for (i, c) in args.char_indices() {
        match c {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return &args[..i],
            _ => {}
        }
    }
    args
}

fn element_of(t: &str) -> Option<&str> {
    if let Some(inner) = t.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return Some(match inner.rfind(';') {
            Some(split) => &inner[..split],
            None => inner,
        });
    }
    split_generic(t).1.map(first_arg)
}

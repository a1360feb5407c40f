//! Naming and type mapping shared by every renderer.
//!
//! Everything here is a pure function of its input: identifier case
//! conversion, Python literal escaping and the field-type DSL resolved to
//! SQLAlchemy column expressions and Python type hints.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::warn;

use crate::spec::{FieldDef, FieldType};

static CAMEL_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("camel word regex should be valid"));
static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("camel boundary regex should be valid"));
static WORD_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9A-Za-z]+").expect("separator regex should be valid"));
static INTEGER_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+$").expect("integer regex should be valid"));

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Convert a camelCase / PascalCase / kebab-case name to snake_case.
///
/// ```rust,ignore
/// assert_eq!(snake_case("SysUser"), "sys_user");
/// assert_eq!(snake_case("HTTPServer"), "http_server");
/// ```
pub fn snake_case(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let s1 = CAMEL_WORD.replace_all(name, "${1}_${2}");
    let s2 = CAMEL_BOUNDARY.replace_all(&s1, "${1}_${2}");
    s2.replace('-', "_").to_lowercase()
}

/// Convert a snake/kebab/space separated name to PascalCase.
///
/// Any run of non-alphanumeric characters separates parts and is dropped.
/// Only the first character of each part is upper-cased; the rest is kept.
pub fn title_case(name: &str) -> String {
    WORD_SEPARATORS
        .split(name.trim())
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut chars = p.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Whether `name` is a reserved Python keyword.
pub fn is_python_keyword(name: &str) -> bool {
    PYTHON_KEYWORDS.contains(&name)
}

/// Python enum member symbol for a raw enum value.
///
/// Non-identifier characters become `_`; a symbol that would not start with
/// a letter or underscore is prefixed with `V_`. Keywords get a trailing `_`.
pub fn enum_symbol(value: &str) -> String {
    let s: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let s = match s.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => s,
        _ => format!("V_{s}"),
    };
    if is_python_keyword(&s) {
        format!("{s}_")
    } else {
        s
    }
}

/// Escape text for use inside a double-quoted Python string literal.
pub fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Double-quoted Python string literal.
pub fn py_quote(s: &str) -> String {
    format!("\"{}\"", py_str(s))
}

/// Flatten text so it fits on a single `#` comment line.
pub fn py_comment(s: &str) -> String {
    s.split(['\r', '\n'])
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Make a name usable as a Python function or method name.
///
/// Keywords and the `list` builtin get a trailing underscore.
pub fn py_ident(name: &str) -> String {
    let base = enum_symbol(name);
    if base == "list" {
        format!("{base}_")
    } else {
        base
    }
}

/// Reserve a unique name in `seen`, suffixing `_1`, `_2`, ... on collision.
///
/// `kind` only labels the warning logged on a rename.
pub(crate) fn unique_name(seen: &mut HashSet<String>, name: &str, kind: &str) -> String {
    if seen.insert(name.to_string()) {
        return name.to_string();
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{name}_{counter}");
        if seen.insert(candidate.clone()) {
            warn!(kind, name, renamed = %candidate, "duplicate generated name");
            return candidate;
        }
        counter += 1;
    }
}

/// Python type hint for a type tag.
///
/// Enum references resolve to the enum class; an enum without a reference
/// (only possible as a `List<enum>` element) degrades to `str`. Unknown tags
/// become `Any`.
pub fn type_hint(ty: &FieldType, enum_name: Option<&str>) -> String {
    match ty {
        FieldType::String => "str".to_string(),
        FieldType::Integer | FieldType::Long => "int".to_string(),
        FieldType::Boolean => "bool".to_string(),
        FieldType::LocalDateTime => "datetime".to_string(),
        FieldType::Json => "Dict[str, Any]".to_string(),
        FieldType::Enum => enum_name.unwrap_or("str").to_string(),
        FieldType::List(inner) => format!("List[{}]", type_hint(inner, None)),
        FieldType::Other(_) => "Any".to_string(),
    }
}

/// SQLAlchemy column type expression for a field.
pub fn column_type(field: &FieldDef) -> String {
    match &field.ty {
        FieldType::String => match field.length {
            Some(n) if n > 0 => format!("String({n})"),
            _ => "Text".to_string(),
        },
        FieldType::Integer => "Integer".to_string(),
        FieldType::Long => "BigInteger".to_string(),
        FieldType::Boolean => "Boolean".to_string(),
        FieldType::LocalDateTime => "DateTime(timezone=False)".to_string(),
        FieldType::Json | FieldType::List(_) => "JSON".to_string(),
        FieldType::Enum => {
            let name = field.enum_name.as_deref().unwrap_or("str");
            format!(
                "SAEnum({name}, name='enum_{}', native_enum=False)",
                snake_case(name)
            )
        }
        FieldType::Other(_) => "Text".to_string(),
    }
}

/// Python literal for a field default.
///
/// `true`/`false` (any case) become booleans, integer text becomes an int,
/// anything else is a string literal.
pub fn python_default(raw: &str) -> String {
    let dv = raw.trim();
    match dv.to_ascii_lowercase().as_str() {
        "true" => return "True".to_string(),
        "false" => return "False".to_string(),
        _ => {}
    }
    if INTEGER_LITERAL.is_match(dv) {
        if let Ok(n) = dv.parse::<i128>() {
            return n.to_string();
        }
        return dv.to_string();
    }
    py_quote(dv)
}

/// Resolved Python/SQLAlchemy typing of one entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Attribute / column name.
    pub name: String,
    /// Bare type hint (`str`, `List[int]`, enum class name, ...).
    pub hint: String,
    /// SQLAlchemy column type expression.
    pub column: String,
    pub nullable: bool,
}

impl ResolvedField {
    pub fn from_field(field: &FieldDef) -> Self {
        Self {
            name: field.column_name(),
            hint: type_hint(&field.ty, field.enum_name.as_deref()),
            column: column_type(field),
            nullable: !field.not_null,
        }
    }

    /// Hint used on the `Mapped[...]` annotation.
    pub fn mapped_hint(&self) -> String {
        if self.nullable {
            format!("Optional[{}]", self.hint)
        } else {
            self.hint.clone()
        }
    }
}

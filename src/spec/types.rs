use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

use crate::generator::snake_case;

/// Columns contributed by the shared mixins, in declaration order.
pub const ID_COLUMN: &str = "id";
pub const TIMESTAMP_COLUMNS: [&str; 2] = ["created_at", "updated_at"];
pub const SOFT_DELETE_COLUMN: &str = "deleted";

/// One declared enumeration. Value order is the generated member order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// Raw value as it appears on the wire.
    pub value: String,
    /// Human-readable label, empty when absent.
    pub label: String,
}

/// Type tag of a field or custom API parameter.
///
/// `Other` keeps unrecognized tags so they can degrade to an untyped
/// placeholder instead of failing the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Long,
    Boolean,
    LocalDateTime,
    Json,
    Enum,
    List(Box<FieldType>),
    Other(String),
}

impl FieldType {
    /// Parse a type tag. `List<T>` admits one level of nesting; the inner tag
    /// must be a bare identifier and is parsed as a scalar.
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        if let Some(inner) = tag
            .strip_prefix("List<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            let inner = inner.trim();
            if !inner.is_empty()
                && inner
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return FieldType::List(Box::new(Self::parse_scalar(inner)));
            }
            return FieldType::Other(tag.to_string());
        }
        Self::parse_scalar(tag)
    }

    fn parse_scalar(tag: &str) -> Self {
        match tag {
            "String" => FieldType::String,
            "Integer" => FieldType::Integer,
            "Long" => FieldType::Long,
            "Boolean" => FieldType::Boolean,
            "LocalDateTime" => FieldType::LocalDateTime,
            "Json" => FieldType::Json,
            "enum" => FieldType::Enum,
            other => FieldType::Other(other.to_string()),
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, FieldType::Enum)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Integer => write!(f, "Integer"),
            FieldType::Long => write!(f, "Long"),
            FieldType::Boolean => write!(f, "Boolean"),
            FieldType::LocalDateTime => write!(f, "LocalDateTime"),
            FieldType::Json => write!(f, "Json"),
            FieldType::Enum => write!(f, "enum"),
            FieldType::List(inner) => write!(f, "List<{inner}>"),
            FieldType::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// A persisted field of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
    pub not_null: bool,
    /// Bounded length; only meaningful for `String`.
    pub length: Option<i64>,
    /// Enum reference; only set when `ty` is `Enum`.
    pub enum_name: Option<String>,
    /// Default value literal as written in the spec.
    pub default_value: Option<String>,
    pub comment: Option<String>,
}

impl FieldDef {
    /// Column / attribute name in generated code.
    pub fn column_name(&self) -> String {
        snake_case(&self.name)
    }
}

/// A parameter of a CUSTOM API entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiParamDef {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
    pub comment: Option<String>,
    pub enum_name: Option<String>,
}

/// How an API entry receives its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamMode {
    /// Entity-shaped body (`save`, `update`, `list`).
    Entity,
    /// Paged query body.
    Query,
    /// Id list body.
    Ids,
    /// Purpose-built request type assembled from declared params.
    Custom {
        dto_name: Option<String>,
        params: Vec<ApiParamDef>,
    },
}

/// Parameter-mode keyword without the CUSTOM payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamModeKind {
    Entity,
    Query,
    Ids,
    Custom,
}

impl FromStr for ParamModeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "ENTITY" => Ok(ParamModeKind::Entity),
            "QUERY" => Ok(ParamModeKind::Query),
            "IDS" => Ok(ParamModeKind::Ids),
            "CUSTOM" => Ok(ParamModeKind::Custom),
            other => Err(format!(
                "unknown paramMode {other:?} (expected ENTITY, QUERY, IDS or CUSTOM)"
            )),
        }
    }
}

impl ParamMode {
    pub fn kind(&self) -> ParamModeKind {
        match self {
            ParamMode::Entity => ParamModeKind::Entity,
            ParamMode::Query => ParamModeKind::Query,
            ParamMode::Ids => ParamModeKind::Ids,
            ParamMode::Custom { .. } => ParamModeKind::Custom,
        }
    }
}

/// One endpoint declared on an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiDef {
    pub name: String,
    pub summary: String,
    pub path: String,
    pub mode: ParamMode,
    /// Permissions the caller must hold; blank entries already dropped.
    pub required_perms: Vec<String>,
    pub auth_required: bool,
}

impl ApiDef {
    /// Whether the endpoint rejects anonymous callers.
    pub fn requires_auth(&self) -> bool {
        self.auth_required || !self.required_perms.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: String,
    /// Snake-cased column names.
    pub columns: Vec<String>,
}

/// Optional generic-service behaviors, fixed at normalization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityCapabilities {
    pub soft_delete: bool,
    pub timestamps: bool,
}

impl Default for EntityCapabilities {
    fn default() -> Self {
        Self {
            soft_delete: true,
            timestamps: true,
        }
    }
}

/// One business object: persisted fields, constraints and API surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    pub class_name: String,
    pub table_name: String,
    pub module_name: String,
    pub comment: String,
    pub display_name: String,
    pub fields: Vec<FieldDef>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub apis: Vec<ApiDef>,
    pub capabilities: EntityCapabilities,
}

impl EntityDef {
    /// File stem shared by the entity's model/schema/service/api modules.
    ///
    /// `SysUser` in module `sys` becomes `user`; everything else is the
    /// snake-cased class name.
    pub fn file_stem(&self) -> String {
        if self.module_name == "sys" && self.class_name.len() > 3 {
            if let Some(rest) = self.class_name.strip_prefix("Sys") {
                return snake_case(rest);
            }
        }
        snake_case(&self.class_name)
    }

    /// Every column of the persisted record: mixin columns first, then
    /// declared fields.
    pub fn column_names(&self) -> Vec<String> {
        let mut cols = vec![ID_COLUMN.to_string()];
        if self.capabilities.timestamps {
            cols.extend(TIMESTAMP_COLUMNS.iter().map(|c| c.to_string()));
        }
        if self.capabilities.soft_delete {
            cols.push(SOFT_DELETE_COLUMN.to_string());
        }
        cols.extend(self.fields.iter().map(FieldDef::column_name));
        cols
    }

    /// CUSTOM API entries, in declaration order.
    pub fn custom_apis(&self) -> impl Iterator<Item = &ApiDef> {
        self.apis
            .iter()
            .filter(|a| a.mode.kind() == ParamModeKind::Custom)
    }
}

/// The canonical IR of one spec file. Built once per run, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spec {
    pub enums: IndexMap<String, EnumDef>,
    pub entities: Vec<EntityDef>,
}

impl Spec {
    /// Distinct module names, sorted.
    pub fn module_names(&self) -> Vec<String> {
        let mut mods: Vec<String> = self
            .entities
            .iter()
            .map(|e| e.module_name.clone())
            .collect();
        mods.sort();
        mods.dedup();
        mods
    }
}

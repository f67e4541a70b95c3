/// Column, parameter and return type references
use phf::phf_set;
use serde::{Deserialize, Serialize};
use std::fmt;

// Base types every catalog accepts without a declaration.
// Multi-word spellings are stored with single spaces.
static BUILTIN_TYPES: phf::Set<&'static str> = phf_set! {
    // numeric
    "smallint", "int2", "integer", "int", "int4", "bigint", "int8",
    "serial", "serial4", "smallserial", "serial2", "bigserial", "serial8",
    "real", "float4", "double precision", "float8", "float",
    "numeric", "decimal", "money",
    // character
    "text", "citext", "varchar", "character varying", "char", "character", "bpchar", "name",
    // boolean / binary
    "boolean", "bool", "bytea", "bit", "bit varying", "varbit",
    // date and time
    "date", "time", "time without time zone", "time with time zone", "timetz",
    "timestamp", "timestamp without time zone", "timestamp with time zone", "timestamptz",
    "interval",
    // ranges
    "int4range", "int8range", "numrange", "tsrange", "tstzrange", "daterange",
    "int4multirange", "int8multirange", "nummultirange", "tsmultirange", "tstzmultirange", "datemultirange",
    // network / misc
    "inet", "cidr", "macaddr", "macaddr8", "uuid", "xml", "json", "jsonb", "jsonpath",
    "tsvector", "tsquery", "oid", "regclass", "regtype", "pg_lsn",
    // geometric
    "point", "line", "lseg", "box", "path", "polygon", "circle",
    // routine pseudo-types
    "void", "trigger", "event_trigger", "record", "anyelement", "anyarray",
    "anynonarray", "anyenum", "anyrange", "anymultirange", "internal", "cstring",
};

/// Whether `name` (lower case, single-spaced) is a built-in PostgreSQL type
pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.contains(name)
}

/// A parsed type reference such as `numeric(10,2)`, `app.mood[]` or
/// `double precision[6]`.
///
/// Array dimensions are flat: `float[][]` is one `TypeRef` with two
/// dimensions, never a nested array type. Declared sizes are recorded but
/// not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Schema qualifier as written
    pub schema: Option<String>,
    /// Base type name, lower case unless quoted
    pub name: String,
    /// First type modifier: precision, length or fixed dimension count
    pub precision: Option<u32>,
    /// Second type modifier (numeric scale)
    pub scale: Option<u32>,
    /// One entry per array dimension, holding the declared size if any
    pub array_dims: Vec<Option<u32>>,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            precision: None,
            scale: None,
            array_dims: Vec::new(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: Option<u32>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    pub fn with_array_dims(mut self, dims: Vec<Option<u32>>) -> Self {
        self.array_dims = dims;
        self
    }

    /// Number of array dimensions (0 for a scalar)
    pub fn dimensions(&self) -> usize {
        self.array_dims.len()
    }

    pub fn is_array(&self) -> bool {
        !self.array_dims.is_empty()
    }

    /// Same type without array dimensions
    pub fn element_type(&self) -> TypeRef {
        TypeRef {
            array_dims: Vec::new(),
            ..self.clone()
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.schema.is_none() && is_builtin_type(&self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }

        let modifier = match (self.precision, self.scale) {
            (Some(p), Some(s)) => format!("({},{})", p, s),
            (Some(p), None) => format!("({})", p),
            _ => String::new(),
        };

        // time(3) with time zone: the modifier follows the first word
        match self.name.split_once(' ') {
            Some((head @ ("time" | "timestamp"), tail)) => write!(f, "{}{} {}", head, modifier, tail)?,
            _ => write!(f, "{}{}", self.name, modifier)?,
        }

        for dim in &self.array_dims {
            match dim {
                Some(size) => write!(f, "[{}]", size)?,
                None => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        assert!(is_builtin_type("double precision"));
        assert!(is_builtin_type("tstzrange"));
        assert!(!is_builtin_type("widget_types"));
    }

    #[test]
    fn test_display() {
        let t = TypeRef::new("numeric").with_precision(10, Some(2));
        assert_eq!(t.to_string(), "numeric(10,2)");

        let t = TypeRef::new("timestamp with time zone").with_precision(3, None);
        assert_eq!(t.to_string(), "timestamp(3) with time zone");

        let t = TypeRef::new("mood").with_schema("app").with_array_dims(vec![None, Some(3)]);
        assert_eq!(t.to_string(), "app.mood[][3]");
    }

    #[test]
    fn test_element_type() {
        let t = TypeRef::new("float").with_array_dims(vec![None, None]);
        assert_eq!(t.dimensions(), 2);
        assert_eq!(t.element_type(), TypeRef::new("float"));
        assert!(!t.element_type().is_array());
    }
}

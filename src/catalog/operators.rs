//! Operator signature catalog
//!
//! Two JSON shapes are accepted:
//!
//! * an ordered list of records
//!   `[{"name": "ts_mean", "min_args": 2, "max_args": 2, "named_args": [...]}]`
//! * the object form keyed by operator name, as used by `valid_ops.json`
//!   (`{"ts_mean": {"min_args": 2, "arg_types": ["expr", "number"], "kwarg_types": {...}}}`)
//!
//! `max_args` may be an integer, `null`, `"unbounded"` or absent; the last three mean the
//! operator is variadic.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    path::Path,
};

use serde::{Deserialize, Serialize};

use super::{closest_match, read_catalog_file, CatalogError};

// ============================================================================
// ARGUMENT KINDS
// ============================================================================

/// What an argument position accepts, or what an operator returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    Field,
    Expr,
    Number,
    String,
    Boolean,
    Any,
}

impl ArgKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "field" => Self::Field,
            "expr" | "expression" => Self::Expr,
            "number" | "int" | "float" => Self::Number,
            "string" | "str" => Self::String,
            "boolean" | "bool" => Self::Boolean,
            "any" => Self::Any,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Expr => "expr",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ArgKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        // Kinds this validator does not model are accepted as `any`.
        Ok(ArgKind::from_name(&name).unwrap_or_else(|| {
            tracing::warn!(kind = %name, "unrecognised argument kind, treating as any");
            ArgKind::Any
        }))
    }
}

// ============================================================================
// SIGNATURE TYPES
// ============================================================================

/// Upper bound on positional arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxArgs {
    Bounded(usize),
    Unbounded,
}

impl MaxArgs {
    pub fn allows(&self, count: usize) -> bool {
        match self {
            MaxArgs::Bounded(max) => count <= *max,
            MaxArgs::Unbounded => true,
        }
    }
}

/// A single value in an enumerated named-argument set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowedValue {
    Num(f64),
    Str(String),
}

impl AllowedValue {
    /// Textual comparison, used for string literals and bare symbolic constants.
    pub fn matches_text(&self, text: &str) -> bool {
        match self {
            AllowedValue::Str(s) => s == text,
            AllowedValue::Num(n) => text.parse::<f64>().map_or(false, |v| v == *n),
        }
    }

    pub fn matches_number(&self, value: f64) -> bool {
        match self {
            AllowedValue::Num(n) => *n == value,
            AllowedValue::Str(s) => s.parse::<f64>().map_or(false, |v| v == value),
        }
    }
}

impl fmt::Display for AllowedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowedValue::Num(n) => write!(f, "{}", n),
            AllowedValue::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// Values a named argument may take.
#[derive(Debug, Clone, PartialEq)]
pub enum AllowedValues {
    Any,
    OneOf(Vec<AllowedValue>),
}

impl AllowedValues {
    pub fn describe(&self) -> String {
        match self {
            AllowedValues::Any => "any value".to_string(),
            AllowedValues::OneOf(values) => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                format!("one of {}", rendered.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgSpec {
    pub name: String,
    pub allowed: AllowedValues,
    pub kind: ArgKind,
}

impl NamedArgSpec {
    /// A named argument accepting any value.
    pub fn any(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed: AllowedValues::Any,
            kind: ArgKind::Any,
        }
    }

    /// A named argument restricted to an enumerated set of values.
    pub fn one_of(name: impl Into<String>, values: impl IntoIterator<Item = AllowedValue>) -> Self {
        Self {
            name: name.into(),
            allowed: AllowedValues::OneOf(values.into_iter().collect()),
            kind: ArgKind::Any,
        }
    }

    pub fn with_kind(mut self, kind: ArgKind) -> Self {
        self.kind = kind;
        self
    }
}

/// The signature of one catalog operator.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorSpec {
    pub name: String,
    pub min_args: usize,
    pub max_args: MaxArgs,
    pub named_args: Vec<NamedArgSpec>,
    /// Expected kind per positional index.
    pub arg_kinds: Vec<ArgKind>,
    /// Expected kind for positional arguments past `arg_kinds`.
    pub variadic_kind: Option<ArgKind>,
    pub return_kind: ArgKind,
}

impl OperatorSpec {
    pub fn new(name: impl Into<String>, min_args: usize, max_args: MaxArgs) -> Self {
        Self {
            name: name.into(),
            min_args,
            max_args,
            named_args: Vec::new(),
            arg_kinds: Vec::new(),
            variadic_kind: None,
            return_kind: ArgKind::Expr,
        }
    }

    pub fn with_arg_kinds(mut self, kinds: impl IntoIterator<Item = ArgKind>) -> Self {
        self.arg_kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_variadic_kind(mut self, kind: ArgKind) -> Self {
        self.variadic_kind = Some(kind);
        self
    }

    pub fn with_named_arg(mut self, named: NamedArgSpec) -> Self {
        self.named_args.push(named);
        self
    }

    pub fn returning(mut self, kind: ArgKind) -> Self {
        self.return_kind = kind;
        self
    }

    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.allows(count)
    }

    /// Human description of the arity bounds, e.g. `exactly 2` or `at least 1`.
    pub fn arity_description(&self) -> String {
        match self.max_args {
            MaxArgs::Bounded(max) if max == self.min_args => format!("exactly {}", max),
            MaxArgs::Bounded(max) => format!("{} to {}", self.min_args, max),
            MaxArgs::Unbounded => format!("at least {}", self.min_args),
        }
    }

    /// Kind expected at a positional index, if the signature constrains it.
    pub fn expected_kind(&self, index: usize) -> Option<ArgKind> {
        self.arg_kinds
            .get(index)
            .copied()
            .or(self.variadic_kind)
            .or_else(|| self.arg_kinds.last().copied())
    }

    pub fn named_arg(&self, name: &str) -> Option<&NamedArgSpec> {
        self.named_args.iter().find(|arg| arg.name == name)
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// All known operators, in catalog order, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct OperatorCatalog {
    specs: Vec<OperatorSpec>,
    index: HashMap<String, usize>,
}

impl OperatorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: impl IntoIterator<Item = OperatorSpec>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for spec in specs {
            catalog.insert(spec)?;
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, spec: OperatorSpec) -> Result<(), CatalogError> {
        if self.index.contains_key(&spec.name) {
            return Err(CatalogError::DuplicateOperator(spec.name));
        }
        if let MaxArgs::Bounded(max) = spec.max_args {
            if max < spec.min_args {
                return Err(CatalogError::InvalidOperator {
                    name: spec.name,
                    message: format!("max_args {} is below min_args {}", max, spec.min_args),
                });
            }
        }
        self.index.insert(spec.name.clone(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument =
            serde_json::from_str(json).map_err(|e| CatalogError::Format {
                what: "operator",
                message: e.to_string(),
            })?;

        let records: Vec<(String, OperatorRecord)> = match document {
            CatalogDocument::List(records) => records
                .into_iter()
                .enumerate()
                .filter_map(|(position, record)| match record.name.clone() {
                    Some(name) => Some((name, record)),
                    None => {
                        tracing::warn!(position, "skipping operator record without a name");
                        None
                    }
                })
                .collect(),
            CatalogDocument::Map(map) => map.into_iter().collect(),
        };

        let specs = records
            .into_iter()
            .map(|(name, record)| record.into_spec(name))
            .collect::<Result<Vec<_>, _>>()?;
        let catalog = Self::from_specs(specs)?;
        tracing::info!(operators = catalog.len(), "loaded operator catalog");
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_json_str(&read_catalog_file(path.as_ref())?)
    }

    pub fn get(&self, name: &str) -> Option<&OperatorSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperatorSpec> {
        self.specs.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|spec| spec.name.as_str())
    }

    /// Closest operator name to a misspelled one.
    pub fn suggest(&self, name: &str) -> Option<&str> {
        closest_match(name, self.names())
    }
}

// ============================================================================
// JSON RECORDS
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    List(Vec<OperatorRecord>),
    Map(BTreeMap<String, OperatorRecord>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaxArgsRecord {
    Count(usize),
    Word(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AllowedValuesRecord {
    List(Vec<AllowedValue>),
    Word(String),
}

#[derive(Deserialize)]
struct NamedArgRecord {
    name: String,
    #[serde(default)]
    allowed_values: Option<AllowedValuesRecord>,
    #[serde(default)]
    kind: Option<ArgKind>,
}

#[derive(Deserialize)]
struct OperatorRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    min_args: usize,
    #[serde(default)]
    max_args: Option<MaxArgsRecord>,
    #[serde(default)]
    named_args: Vec<NamedArgRecord>,
    #[serde(default, alias = "arg_types")]
    arg_kinds: Vec<ArgKind>,
    #[serde(default, alias = "var_args_type")]
    variadic_kind: Option<ArgKind>,
    #[serde(default, alias = "return_type")]
    return_kind: Option<ArgKind>,
    // `valid_ops.json` spells named arguments as a kind map plus a choices map.
    #[serde(default)]
    kwarg_types: BTreeMap<String, ArgKind>,
    #[serde(default)]
    choices: BTreeMap<String, Vec<AllowedValue>>,
}

impl OperatorRecord {
    fn into_spec(self, name: String) -> Result<OperatorSpec, CatalogError> {
        let invalid = |message: String| CatalogError::InvalidOperator {
            name: name.clone(),
            message,
        };

        let max_args = match self.max_args {
            None => MaxArgs::Unbounded,
            Some(MaxArgsRecord::Count(max)) => MaxArgs::Bounded(max),
            Some(MaxArgsRecord::Word(word)) if word.eq_ignore_ascii_case("unbounded") => {
                MaxArgs::Unbounded
            }
            Some(MaxArgsRecord::Word(word)) => {
                return Err(invalid(format!("unsupported max_args `{}`", word)))
            }
        };

        let mut named_args = Vec::with_capacity(self.named_args.len() + self.kwarg_types.len());
        for record in self.named_args {
            let allowed = match record.allowed_values {
                None => AllowedValues::Any,
                Some(AllowedValuesRecord::List(values)) => AllowedValues::OneOf(values),
                Some(AllowedValuesRecord::Word(word)) if word.eq_ignore_ascii_case("any") => {
                    AllowedValues::Any
                }
                Some(AllowedValuesRecord::Word(word)) => {
                    return Err(invalid(format!(
                        "named argument `{}` has unsupported allowed_values `{}`",
                        record.name, word
                    )))
                }
            };
            named_args.push(NamedArgSpec {
                name: record.name,
                allowed,
                kind: record.kind.unwrap_or(ArgKind::Any),
            });
        }

        let mut choices = self.choices;
        for (arg_name, kind) in self.kwarg_types {
            if named_args.iter().any(|arg| arg.name == arg_name) {
                tracing::warn!(operator = %name, argument = %arg_name, "duplicate named argument record");
                continue;
            }
            let allowed = match choices.remove(&arg_name) {
                Some(values) => AllowedValues::OneOf(values),
                None => AllowedValues::Any,
            };
            named_args.push(NamedArgSpec {
                name: arg_name,
                allowed,
                kind,
            });
        }
        for arg_name in choices.keys() {
            tracing::warn!(operator = %name, argument = %arg_name, "choices given for an undeclared named argument");
        }

        Ok(OperatorSpec {
            name,
            min_args: self.min_args,
            max_args,
            named_args,
            arg_kinds: self.arg_kinds,
            variadic_kind: self.variadic_kind,
            return_kind: self.return_kind.unwrap_or(ArgKind::Expr),
        })
    }
}

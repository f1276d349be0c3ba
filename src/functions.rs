//! Function registry: declarative parameter signatures and derived arity.
//!
//! Signatures are written the way they appear in the host's function picker
//! (`"condition, trueValue, falseValue"`, `"...values"`). [`FunctionSpec::parse`]
//! turns them into required/optional/variadic counts once, when the registry
//! is built.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Function category, mirroring the groups of the function picker
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Basic,
    Logic,
    Lookup,
    Data,
    Date,
    Text,
    Statistics,
    #[default]
    Custom,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Basic => "basic",
            Category::Logic => "logic",
            Category::Lookup => "lookup",
            Category::Data => "data",
            Category::Date => "date",
            Category::Text => "text",
            Category::Statistics => "statistics",
            Category::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "basic" => Some(Category::Basic),
            "logic" => Some(Category::Logic),
            "lookup" => Some(Category::Lookup),
            "data" => Some(Category::Data),
            "date" => Some(Category::Date),
            "text" => Some(Category::Text),
            "statistics" | "stats" => Some(Category::Statistics),
            "custom" => Some(Category::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function definition as written in a schema document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub params: String,
    #[serde(default)]
    pub category: Category,
}

/// Arity derived from a parameter-spec string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    /// Parameter-spec string as declared
    pub params: String,
    pub category: Category,
    pub required: usize,
    pub optional: usize,
    pub variadic: bool,
}

/// Logical functions whose two-parameter signature understates their arity
const VARIADIC_OVERRIDES: &[&str] = &["AND", "OR", "XOR", "SWITCH"];

impl FunctionSpec {
    /// Derive a spec from its declared parameter string.
    ///
    /// Parameters are split on `,`; a trailing `?` marks an optional parameter
    /// and any parameter containing `...` makes the function variadic (and is
    /// not counted). `AND`, `OR`, `XOR` are always variadic; `SWITCH` is forced
    /// to three required parameters plus a variadic tail.
    pub fn parse(name: &str, params: &str, category: Category) -> Self {
        let name = name.trim().to_uppercase();
        let raw = params.trim();

        let mut required = 0;
        let mut optional = 0;
        let mut variadic = VARIADIC_OVERRIDES.contains(&name.as_str());

        if !raw.is_empty() {
            for part in raw.split(',').map(str::trim) {
                if part.contains("...") {
                    variadic = true;
                } else if part.ends_with('?') {
                    optional += 1;
                } else {
                    required += 1;
                }
            }
        }

        if name == "SWITCH" {
            required = 3;
            variadic = true;
        }

        Self {
            name,
            params: raw.to_string(),
            category,
            required,
            optional,
            variadic,
        }
    }

    pub fn min_args(&self) -> usize {
        self.required
    }

    /// Maximum argument count, `None` when unbounded
    pub fn max_args(&self) -> Option<usize> {
        if self.variadic {
            None
        } else {
            Some(self.required + self.optional)
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args() && self.max_args().map_or(true, |max| count <= max)
    }
}

/// Built-in catalogue: (name, parameter spec, category)
const BUILTIN_FUNCTIONS: &[(&str, &str, Category)] = &[
    ("SUM", "...values", Category::Basic),
    ("AVERAGE", "...values", Category::Basic),
    ("MAX", "...values", Category::Basic),
    ("MIN", "...values", Category::Basic),
    ("FILTER", "range, condition?", Category::Data),
    ("IF", "condition, trueValue, falseValue", Category::Logic),
    ("AND", "cond1, cond2", Category::Logic),
    ("OR", "cond1, cond2", Category::Logic),
    ("NOT", "condition", Category::Logic),
    ("XOR", "cond1, cond2", Category::Logic),
    ("IFS", "cond1, value1, cond2, value2, ...", Category::Logic),
    ("SWITCH", "expr, val1, res1, val2, res2, default?", Category::Logic),
    ("IFERROR", "value, value_if_error", Category::Logic),
    ("IFNA", "value, value_if_na", Category::Logic),
    ("VLOOKUP", "lookup, range, colIndex, exact", Category::Lookup),
    ("INDEX", "range, row", Category::Lookup),
    ("MATCH", "lookup, range, 0", Category::Lookup),
    ("COUNTIF", "range, criteria", Category::Data),
    ("COUNTIFS", "range1, criteria1, range2, criteria2", Category::Data),
    ("TODAY", "", Category::Date),
    ("NOW", "", Category::Date),
    ("DATE", "year, month, day", Category::Date),
    ("DATEDIF", "startDate, endDate, unit", Category::Date),
    ("DAY", "date", Category::Date),
    ("DAYS", "endDate, startDate", Category::Date),
    ("EDATE", "startDate, months", Category::Date),
    ("EOMONTH", "startDate, months", Category::Date),
    ("HOUR", "time", Category::Date),
    ("MINUTE", "time", Category::Date),
    ("MONTH", "date", Category::Date),
    ("NETWORKDAYS", "startDate, endDate, holidays?", Category::Date),
    ("SECOND", "time", Category::Date),
    ("WEEKDAY", "date, type?", Category::Date),
    ("WEEKNUM", "date, type?", Category::Date),
    ("WORKDAY", "startDate, days, holidays?", Category::Date),
    ("YEAR", "date", Category::Date),
    ("LEN", "text", Category::Text),
    ("CONCAT", "text1, text2", Category::Text),
    ("CONTAINS", "text, sub", Category::Text),
    ("CONTAINSALL", "text, sub1, sub2", Category::Text),
    ("CONTAINSANY", "text, sub1, sub2", Category::Text),
    ("LEFT", "text, count", Category::Text),
    ("RIGHT", "text, count", Category::Text),
    ("MID", "text, start, count", Category::Text),
    ("UPPER", "text", Category::Text),
    ("LOWER", "text", Category::Text),
    ("SUBSTITUTE", "text, old, new", Category::Text),
    ("REPLACE", "text, start, count, newText", Category::Text),
    ("TRIM", "text", Category::Text),
    ("VALUE", "text", Category::Text),
    ("TEXT", "value, format", Category::Text),
    ("COUNT", "range", Category::Statistics),
    ("COUNTA", "range", Category::Statistics),
    ("COUNTBLANK", "range", Category::Statistics),
    ("SUMIF", "range, criteria, sumRange", Category::Statistics),
    ("SUMIFS", "sumRange, range1, criteria1, range2, criteria2", Category::Statistics),
    ("AVERAGEIF", "range, criteria, avgRange?", Category::Statistics),
    ("AVERAGEIFS", "avgRange, range1, criteria1, range2, criteria2", Category::Statistics),
    ("ABS", "number", Category::Statistics),
    ("ROUND", "number, digits", Category::Statistics),
    ("ROUNDUP", "number, digits", Category::Statistics),
    ("ROUNDDOWN", "number, digits", Category::Statistics),
    ("CEILING", "number, significance", Category::Statistics),
    ("FLOOR", "number, significance", Category::Statistics),
    ("POWER", "number, power", Category::Statistics),
    ("SQRT", "number", Category::Statistics),
    ("SUMPRODUCT", "array1, array2", Category::Statistics),
];

/// Read-only catalogue of known functions, keyed by upper-case name
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    specs: HashMap<String, FunctionSpec>,
    /// Declaration order, for listings
    order: Vec<String>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in catalogue
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, params, category) in BUILTIN_FUNCTIONS {
            registry.insert(FunctionSpec::parse(name, params, *category));
        }
        registry
    }

    /// Built-ins extended (or overridden by name) with extra definitions
    pub fn with_functions(defs: &[FunctionDef]) -> Self {
        let mut registry = Self::builtin();
        for def in defs {
            registry.insert(FunctionSpec::parse(&def.name, &def.params, def.category));
        }
        registry
    }

    pub fn insert(&mut self, spec: FunctionSpec) {
        if !self.specs.contains_key(&spec.name) {
            self.order.push(spec.name.clone());
        }
        self.specs.insert(spec.name.clone(), spec);
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.specs.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Specs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.order.iter().filter_map(|name| self.specs.get(name))
    }

    /// Specs grouped by category, each group in declaration order
    pub fn by_category(&self) -> BTreeMap<Category, Vec<&FunctionSpec>> {
        let mut groups: BTreeMap<Category, Vec<&FunctionSpec>> = BTreeMap::new();
        for spec in self.iter() {
            groups.entry(spec.category).or_default().push(spec);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_defaults_to_custom() {
        assert_eq!(Category::default(), Category::Custom);
        let def: FunctionDef = serde_yaml::from_str("name: TRIPLE\nparams: value").unwrap();
        assert_eq!(def.category, Category::Custom);
    }

    #[test]
    fn test_parse_fixed_arity() {
        let spec = FunctionSpec::parse("IF", "condition, trueValue, falseValue", Category::Logic);
        assert_eq!(spec.required, 3);
        assert_eq!(spec.optional, 0);
        assert!(!spec.variadic);
        assert_eq!(spec.max_args(), Some(3));
    }

    #[test]
    fn test_parse_optional_params() {
        let spec = FunctionSpec::parse("WEEKDAY", "date, type?", Category::Date);
        assert_eq!(spec.required, 1);
        assert_eq!(spec.optional, 1);
        assert!(spec.accepts(1));
        assert!(spec.accepts(2));
        assert!(!spec.accepts(3));
        assert!(!spec.accepts(0));
    }

    #[test]
    fn test_parse_ellipsis_is_variadic() {
        let spec = FunctionSpec::parse("SUM", "...values", Category::Basic);
        assert_eq!(spec.required, 0);
        assert!(spec.variadic);
        assert_eq!(spec.max_args(), None);
        assert!(spec.accepts(0));
        assert!(spec.accepts(40));
    }

    #[test]
    fn test_parse_empty_params() {
        let spec = FunctionSpec::parse("TODAY", "", Category::Date);
        assert_eq!(spec.required, 0);
        assert_eq!(spec.optional, 0);
        assert!(!spec.variadic);
        assert!(!spec.accepts(1));
    }

    #[test]
    fn test_logical_overrides_are_variadic() {
        for name in ["AND", "OR", "XOR"] {
            let spec = FunctionSpec::parse(name, "cond1, cond2", Category::Logic);
            assert_eq!(spec.required, 2, "{name}");
            assert!(spec.variadic, "{name}");
            assert!(spec.accepts(5), "{name}");
        }
    }

    #[test]
    fn test_switch_forced_arity() {
        let spec = FunctionSpec::parse(
            "SWITCH",
            "expr, val1, res1, val2, res2, default?",
            Category::Logic,
        );
        assert_eq!(spec.required, 3);
        assert!(spec.variadic);
        assert!(!spec.accepts(2));
        assert!(spec.accepts(3));
        assert!(spec.accepts(8));
    }

    #[test]
    fn test_ifs_counts_named_pairs() {
        let spec = FunctionSpec::parse("IFS", "cond1, value1, cond2, value2, ...", Category::Logic);
        assert_eq!(spec.required, 4);
        assert!(spec.variadic);
    }

    #[test]
    fn test_registry_case_insensitive() {
        let registry = FunctionRegistry::builtin();
        assert!(registry.contains("sum"));
        assert!(registry.contains("Sum"));
        assert!(registry.contains("LEN"));
        assert!(!registry.contains("FOO"));
    }

    #[test]
    fn test_registry_override_keeps_order() {
        let defs = vec![
            FunctionDef {
                name: "sum".to_string(),
                params: "a, b".to_string(),
                category: Category::Basic,
            },
            FunctionDef {
                name: "DOUBLE".to_string(),
                params: "value".to_string(),
                category: Category::Custom,
            },
        ];
        let registry = FunctionRegistry::with_functions(&defs);
        let sum = registry.get("SUM").unwrap();
        assert_eq!(sum.required, 2);
        assert!(!sum.variadic);
        assert_eq!(registry.iter().next().unwrap().name, "SUM");
        assert_eq!(registry.iter().last().unwrap().name, "DOUBLE");
    }

    #[test]
    fn test_registry_groups() {
        let registry = FunctionRegistry::builtin();
        let groups = registry.by_category();
        let logic: Vec<_> = groups[&Category::Logic].iter().map(|s| s.name.as_str()).collect();
        assert_eq!(logic.first(), Some(&"IF"));
        assert!(logic.contains(&"SWITCH"));
        assert!(groups[&Category::Date].iter().any(|s| s.name == "TODAY"));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("Logic"), Some(Category::Logic));
        assert_eq!(Category::parse("stats"), Some(Category::Statistics));
        assert_eq!(Category::parse("nope"), None);
    }
}

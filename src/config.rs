//! Template configuration consumed by the code generator
//!
//! The configuration is target-language-agnostic: a set of string
//! templates keyed by role and scalar type, plus per-dimensionality
//! sequence templates and loop header/footer templates. Placeholders
//! use `{name}` syntax; an unknown placeholder is left verbatim so a
//! configuration can carry literal braces (loop headers usually do).
//!
//! The default instance targets C++, matching the shape a caller-
//! supplied JSON file must have.

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};
use crate::typing::VarType;

/// Templates for one scalar type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarTemplate {
    /// Target-language type name
    pub type_name: String,
    /// Default value used when allocating sequences
    pub default: String,
    /// Declaration statement; placeholders: {type} {name} {default}
    pub declare: String,
    /// Input-read statement; placeholders: {access} {name} {type}
    pub input: String,
}

/// Per-scalar-type template table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarTypes {
    pub int: ScalarTemplate,
    pub index_int: ScalarTemplate,
    pub float: ScalarTemplate,
    #[serde(rename = "char")]
    pub char_: ScalarTemplate,
    pub string: ScalarTemplate,
}

/// Templates for one-dimensional sequences.
///
/// Placeholders: {type} {name} {default} {length} {index}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeqTemplates {
    pub declare: String,
    pub allocate: String,
    pub access: String,
    pub argument: String,
}

/// Templates for two-dimensional sequences.
///
/// Placeholders: {type} {name} {default} {length_i} {length_j}
/// {index_i} {index_j}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seq2dTemplates {
    pub declare: String,
    pub allocate: String,
    pub access: String,
    pub argument: String,
}

/// Loop rendering templates; placeholders: {loop_var} {length}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopTemplates {
    pub header: String,
    pub footer: String,
}

/// Full template configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Base indentation width in spaces
    #[serde(default = "default_indent")]
    pub indent: usize,
    pub types: ScalarTypes,
    pub seq: SeqTemplates,
    #[serde(rename = "2d_seq")]
    pub seq_2d: Seq2dTemplates,
    #[serde(rename = "loop")]
    pub loops: LoopTemplates,
}

fn default_indent() -> usize {
    4
}

impl TemplateConfig {
    /// Deserialize a configuration from JSON text
    pub fn from_json(text: &str) -> CompileResult<Self> {
        serde_json::from_str(text).map_err(|e| CompileError::config(e.to_string()))
    }

    /// Template entry for one scalar type. Query-typed variables are
    /// discriminator values and read like plain integers.
    pub fn scalar(&self, var_type: VarType) -> &ScalarTemplate {
        match var_type {
            VarType::Int => &self.types.int,
            VarType::IndexInt => &self.types.index_int,
            VarType::Float => &self.types.float,
            VarType::Char => &self.types.char_,
            VarType::Str => &self.types.string,
            VarType::Query => &self.types.int,
        }
    }

    pub fn indent_unit(&self) -> String {
        " ".repeat(self.indent)
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        let int = ScalarTemplate {
            type_name: "int".to_string(),
            default: "0".to_string(),
            declare: "{type} {name};".to_string(),
            input: "std::cin >> {access};".to_string(),
        };
        Self {
            indent: default_indent(),
            types: ScalarTypes {
                index_int: int.clone(),
                float: ScalarTemplate {
                    type_name: "double".to_string(),
                    default: "0.0".to_string(),
                    ..int.clone()
                },
                char_: ScalarTemplate {
                    type_name: "char".to_string(),
                    default: "' '".to_string(),
                    ..int.clone()
                },
                string: ScalarTemplate {
                    type_name: "std::string".to_string(),
                    default: "\"\"".to_string(),
                    ..int.clone()
                },
                int,
            },
            seq: SeqTemplates {
                declare: "std::vector<{type}> {name};".to_string(),
                allocate: "{name}.assign({length}, {default});".to_string(),
                access: "{name}[{index}]".to_string(),
                argument: "const std::vector<{type}> &{name}".to_string(),
            },
            seq_2d: Seq2dTemplates {
                declare: "std::vector<std::vector<{type}>> {name};".to_string(),
                allocate: "{name}.assign({length_i}, std::vector<{type}>({length_j}, {default}));"
                    .to_string(),
                access: "{name}[{index_i}][{index_j}]".to_string(),
                argument: "const std::vector<std::vector<{type}>> &{name}".to_string(),
            },
            loops: LoopTemplates {
                header: "for (int {loop_var} = 0; {loop_var} < {length}; {loop_var}++) {"
                    .to_string(),
                footer: "}".to_string(),
            },
        }
    }
}

/// Substitute `{name}` placeholders. Unknown placeholders and stray
/// braces are emitted verbatim.
pub fn substitute(template: &str, bindings: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match bindings.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => {
                        out.push_str(value);
                    }
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_basic() {
        assert_eq!(
            substitute("{type} {name};", &[("type", "int"), ("name", "N")]),
            "int N;"
        );
    }

    #[test]
    fn test_substitute_unknown_placeholder_verbatim() {
        assert_eq!(
            substitute("{name} = {missing};", &[("name", "a")]),
            "a = {missing};"
        );
    }

    #[test]
    fn test_substitute_trailing_brace() {
        let header = substitute(
            "for (int {loop_var} = 0; {loop_var} < {length}; {loop_var}++) {",
            &[("loop_var", "i"), ("length", "N")],
        );
        assert_eq!(header, "for (int i = 0; i < N; i++) {");
    }

    #[test]
    fn test_default_roundtrips_through_json() {
        let config = TemplateConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back = TemplateConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = TemplateConfig::from_json("{").unwrap_err();
        assert!(matches!(err, CompileError::Config { .. }));
    }
}

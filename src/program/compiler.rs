//! Text Program Compiler
//!
//! Lowers the small textual program format into a [`CompiledBuffer`]:
//!
//! ```text
//! func @add_one(%x: !t.tensor) -> (!t.tensor) {
//!   %one = t.constant() {dtype = i32, shape = [1], value = 1}
//!   %y = t.add(%x, %one)
//!   return %y
//! }
//! ```
//!
//! Only structure is checked here (types, SSA names, operand definitions). Kernel
//! names and value types are checked by the engine when the function runs.

use super::artifact::{
    Attribute, Attributes, CompiledBuffer, DebugInfo, FunctionDef, Instruction, Param,
    ProgramImage,
};
use super::types::TypeId;

use regex::Regex;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Drop optional sections (per-function source text) from the image.
    pub disable_optional_sections: bool,
}

/// Error reported by a compiler, pointing at the offending source line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Turns program source into an executable buffer.
pub trait Compiler: Send + Sync {
    fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledBuffer, Diagnostic>;
}

pub struct TextCompiler {
    header: Regex,
    param: Regex,
    instruction: Regex,
    ret: Regex,
    identifier: Regex,
}

/// Function being assembled while its body is parsed.
struct OpenFunction {
    def: FunctionDef,
    defined: HashSet<String>,
    source: Vec<String>,
    returned: bool,
    line: usize,
}

impl TextCompiler {
    pub fn new() -> Self {
        Self {
            header: Regex::new(
                r"^func\s+@([A-Za-z_][\w.]*)\s*\(([^)]*)\)\s*(?:->\s*(?:\(([^)]*)\)|([^\s{()]+)))?\s*\{$",
            )
            .expect("valid header regex"),
            param: Regex::new(r"^%(\w+)\s*:\s*(\S+)$").expect("valid param regex"),
            instruction: Regex::new(
                r"^(?:((?:%\w+\s*,\s*)*%\w+)\s*=\s*)?([A-Za-z_][\w.]*)\(([^)]*)\)\s*(?:\{(.*)\})?$",
            )
            .expect("valid instruction regex"),
            ret: Regex::new(r"^return(?:\s+(.*))?$").expect("valid return regex"),
            identifier: Regex::new(r"^[A-Za-z_][\w.]*$").expect("valid identifier regex"),
        }
    }

    fn parse_type(&self, line: usize, name: &str) -> Result<TypeId, Diagnostic> {
        TypeId::parse(name.trim())
            .ok_or_else(|| Diagnostic::new(line, format!("unknown type '{}'", name.trim())))
    }

    fn parse_header(&self, line: usize, text: &str) -> Result<OpenFunction, Diagnostic> {
        let caps = self
            .header
            .captures(text)
            .ok_or_else(|| Diagnostic::new(line, format!("expected function header, got '{}'", text)))?;

        let name = caps[1].to_string();
        let mut arguments = Vec::new();
        let mut defined = HashSet::new();
        for raw in split_list(&caps[2]) {
            let param = self
                .param
                .captures(&raw)
                .ok_or_else(|| Diagnostic::new(line, format!("malformed parameter '{}'", raw)))?;
            let param_name = param[1].to_string();
            if !defined.insert(param_name.clone()) {
                return Err(Diagnostic::new(line, format!("duplicate parameter %{}", param_name)));
            }
            arguments.push(Param {
                name: param_name,
                ty: self.parse_type(line, &param[2])?,
            });
        }

        let result_types = match (caps.get(3), caps.get(4)) {
            (Some(list), _) => split_list(list.as_str())
                .iter()
                .map(|ty| self.parse_type(line, ty))
                .collect::<Result<Vec<_>, _>>()?,
            (None, Some(single)) => vec![self.parse_type(line, single.as_str())?],
            (None, None) => Vec::new(),
        };

        Ok(OpenFunction {
            def: FunctionDef {
                name,
                arguments,
                result_types,
                body: Vec::new(),
                returns: Vec::new(),
            },
            defined,
            source: vec![text.to_string()],
            returned: false,
            line,
        })
    }

    fn parse_operands(
        &self,
        line: usize,
        list: &str,
        defined: &HashSet<String>,
    ) -> Result<Vec<String>, Diagnostic> {
        split_list(list)
            .into_iter()
            .map(|operand| {
                let name = operand
                    .strip_prefix('%')
                    .ok_or_else(|| Diagnostic::new(line, format!("expected operand, got '{}'", operand)))?;
                if !defined.contains(name) {
                    return Err(Diagnostic::new(line, format!("use of undefined value %{}", name)));
                }
                Ok(name.to_string())
            })
            .collect()
    }

    fn parse_body_line(
        &self,
        line: usize,
        text: &str,
        function: &mut OpenFunction,
    ) -> Result<(), Diagnostic> {
        if function.returned {
            return Err(Diagnostic::new(line, "instruction after return"));
        }

        if let Some(caps) = self.ret.captures(text) {
            let operands = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let returns = self.parse_operands(line, operands, &function.defined)?;
            if returns.len() != function.def.result_types.len() {
                return Err(Diagnostic::new(
                    line,
                    format!(
                        "@{} declares {} results but returns {}",
                        function.def.name,
                        function.def.result_types.len(),
                        returns.len()
                    ),
                ));
            }
            function.def.returns = returns;
            function.returned = true;
            return Ok(());
        }

        let caps = self
            .instruction
            .captures(text)
            .ok_or_else(|| Diagnostic::new(line, format!("malformed instruction '{}'", text)))?;

        let operands = self.parse_operands(line, &caps[3], &function.defined)?;
        let attributes = match caps.get(4) {
            Some(attrs) => self.parse_attributes(line, attrs.as_str())?,
            None => Attributes::default(),
        };

        let mut results = Vec::new();
        if let Some(list) = caps.get(1) {
            for raw in split_list(list.as_str()) {
                let name = raw.trim_start_matches('%').to_string();
                if !function.defined.insert(name.clone()) {
                    return Err(Diagnostic::new(line, format!("redefinition of %{}", name)));
                }
                results.push(name);
            }
        }

        function.def.body.push(Instruction {
            results,
            kernel: caps[2].to_string(),
            operands,
            attributes,
        });
        Ok(())
    }

    fn parse_attributes(&self, line: usize, text: &str) -> Result<Attributes, Diagnostic> {
        let mut attributes = Attributes::default();
        for entry in split_list(text) {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| Diagnostic::new(line, format!("malformed attribute '{}'", entry)))?;
            let key = key.trim();
            if !self.identifier.is_match(key) {
                return Err(Diagnostic::new(line, format!("invalid attribute name '{}'", key)));
            }
            let value = self.parse_literal(line, value.trim())?;
            if attributes.insert(key, value).is_some() {
                return Err(Diagnostic::new(line, format!("duplicate attribute '{}'", key)));
            }
        }
        Ok(attributes)
    }

    fn parse_literal(&self, line: usize, text: &str) -> Result<Attribute, Diagnostic> {
        if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            let items = split_list(inner)
                .iter()
                .map(|item| self.parse_literal(line, item))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Attribute::List(items));
        }
        if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            return Ok(Attribute::Str(inner.to_string()));
        }
        if let Ok(value) = text.parse::<i64>() {
            return Ok(Attribute::Int(value));
        }
        if let Ok(value) = text.parse::<f64>() {
            return Ok(Attribute::Float(value));
        }
        if self.identifier.is_match(text) {
            return Ok(Attribute::Str(text.to_string()));
        }
        Err(Diagnostic::new(line, format!("invalid literal '{}'", text)))
    }
}

impl Default for TextCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler for TextCompiler {
    fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledBuffer, Diagnostic> {
        let mut functions: Vec<FunctionDef> = Vec::new();
        let mut debug_info = Vec::new();
        let mut names = HashSet::new();
        let mut current: Option<OpenFunction> = None;

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with("//") {
                continue;
            }

            match current.take() {
                None => {
                    let function = self.parse_header(line, text)?;
                    if !names.insert(function.def.name.clone()) {
                        return Err(Diagnostic::new(
                            line,
                            format!("duplicate function @{}", function.def.name),
                        ));
                    }
                    current = Some(function);
                }
                Some(mut function) => {
                    function.source.push(text.to_string());
                    if text == "}" {
                        if !function.returned {
                            return Err(Diagnostic::new(
                                line,
                                format!("@{} has no return", function.def.name),
                            ));
                        }
                        debug_info.push(DebugInfo {
                            function: function.def.name.clone(),
                            source: function.source.join("\n"),
                        });
                        functions.push(function.def);
                    } else {
                        self.parse_body_line(line, text, &mut function)?;
                        current = Some(function);
                    }
                }
            }
        }

        if let Some(function) = current {
            return Err(Diagnostic::new(
                function.line,
                format!("unterminated function @{}", function.def.name),
            ));
        }
        if functions.is_empty() {
            return Err(Diagnostic::new(0, "program defines no functions"));
        }

        let debug_info = if options.disable_optional_sections {
            None
        } else {
            Some(debug_info)
        };

        tracing::debug!(
            "Compiled {} function(s), optional sections {}",
            functions.len(),
            if debug_info.is_some() { "kept" } else { "dropped" }
        );

        ProgramImage::new(functions, debug_info)
            .encode()
            .map_err(|e| Diagnostic::new(0, e.to_string()))
    }
}

/// Splits a comma-separated list, ignoring commas inside brackets or quotes.
fn split_list(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut current = String::new();

    for ch in text.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            _ if quoted => current.push(ch),
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                items.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items.retain(|item| !item.is_empty());
    items
}

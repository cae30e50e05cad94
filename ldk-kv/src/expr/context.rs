//! Path resolution and name/value substitution shared by the condition
//! and update expression evaluators (spec §4.8).

use std::collections::BTreeMap;

use crate::value::{AttributeValue, Item};

use super::ast::{Operand, Path, PathSegment};

pub struct ExprContext<'a> {
    pub names: &'a BTreeMap<String, String>,
    pub values: &'a BTreeMap<String, AttributeValue>,
}

impl<'a> ExprContext<'a> {
    fn resolve_segment_name<'s>(&self, raw: &'s str) -> Result<&'s str, String>
    where
        'a: 's,
    {
        if let Some(placeholder) = raw.strip_prefix('#') {
            self.names
                .get(placeholder)
                .map(|s| s.as_str())
                .ok_or_else(|| format!("no expression_attribute_names entry for '#{placeholder}'"))
        } else {
            Ok(raw)
        }
    }

    pub fn get<'i>(&self, path: &Path, item: &'i Item) -> Result<Option<&'i AttributeValue>, String> {
        let mut segments = path.iter();
        let first = match segments.next() {
            Some(PathSegment::Attribute(name)) => self.resolve_segment_name(name)?,
            _ => return Err("path must start with an attribute name".to_string()),
        };
        let mut current = match item.get(first) {
            Some(v) => v,
            None => return Ok(None),
        };
        for segment in segments {
            current = match (segment, current) {
                (PathSegment::Attribute(name), AttributeValue::M(map)) => {
                    let resolved = self.resolve_segment_name(name)?;
                    match map.get(resolved) {
                        Some(v) => v,
                        None => return Ok(None),
                    }
                }
                (PathSegment::Index(idx), AttributeValue::L(list)) => match list.get(*idx) {
                    Some(v) => v,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            };
        }
        Ok(Some(current))
    }

    pub fn resolve_operand(&self, operand: &Operand, item: &Item) -> Result<Option<AttributeValue>, String> {
        match operand {
            Operand::Value(name) => Ok(self.values.get(name).cloned()),
            Operand::Path(path) => Ok(self.get(path, item)?.cloned()),
            Operand::Size(path) => Ok(self
                .get(path, item)?
                .map(|v| AttributeValue::N(rust_decimal::Decimal::from(v.size())))),
            Operand::IfNotExists(path, fallback) => match self.get(path, item)? {
                Some(v) => Ok(Some(v.clone())),
                None => self.resolve_operand(fallback, item),
            },
            Operand::ListAppend(a, b) => {
                let (Some(AttributeValue::L(mut x)), Some(AttributeValue::L(y))) =
                    (self.resolve_operand(a, item)?, self.resolve_operand(b, item)?)
                else {
                    return Err("list_append requires two list operands".to_string());
                };
                x.extend(y);
                Ok(Some(AttributeValue::L(x)))
            }
        }
    }

    pub fn resolved_path_names(&self, path: &Path) -> Result<Vec<PathSegment>, String> {
        path.iter()
            .map(|segment| match segment {
                PathSegment::Attribute(raw) => Ok(PathSegment::Attribute(self.resolve_segment_name(raw)?.to_string())),
                PathSegment::Index(i) => Ok(PathSegment::Index(*i)),
            })
            .collect()
    }
}

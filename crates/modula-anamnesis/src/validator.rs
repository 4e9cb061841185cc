//! 部分数据验证
//!
//! 在持久化之前根据模板验证提交的部分数据。收集全部违规后一次返回，
//! 不做快速失败，前端可以同时展示所有错误。

use crate::completion::value_has_content;
use crate::schema::{FieldSchema, FieldType, SchemaRegistry};
use modula_core::SectionName;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// 验证结果
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: String) {
        self.errors.push(message);
        self.valid = false;
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// 部分验证器
#[derive(Debug, Default)]
pub struct SectionValidator {
    registry: SchemaRegistry,
}

impl SectionValidator {
    pub fn new() -> Self {
        Self {
            registry: SchemaRegistry::new(),
        }
    }

    /// 验证一个部分的提交负载
    pub fn validate(&self, section: SectionName, data: &Value) -> ValidationReport {
        let mut report = ValidationReport::new();

        // 没有模板的部分视为总是有效
        let Some(template) = self.registry.get(section) else {
            return report;
        };

        for field in template.fields {
            self.validate_field(field, data.get(field.name), &mut report);
        }

        debug!(
            "validated section {} with {} errors",
            section,
            report.errors.len()
        );
        report
    }

    fn validate_field(
        &self,
        field: &FieldSchema,
        value: Option<&Value>,
        report: &mut ValidationReport,
    ) {
        let present = value.map(value_has_content).unwrap_or(false);

        if field.required && !present {
            report.add_error(format!("{} é obrigatório", field.label));
            return;
        }

        // 值缺失或为null时跳过类型检查
        let Some(value) = value else {
            return;
        };
        if value.is_null() {
            return;
        }

        match field.field_type {
            FieldType::Number => match value.as_f64() {
                Some(n) => {
                    if let Some(min) = field.min {
                        if n < min {
                            report.add_error(format!("{} deve ser no mínimo {}", field.label, min));
                        }
                    }
                    if let Some(max) = field.max {
                        if n > max {
                            report.add_error(format!("{} deve ser no máximo {}", field.label, max));
                        }
                    }
                }
                None => {
                    report.add_error(format!("{} deve ser um número", field.label));
                }
            },
            FieldType::Select => match value.as_str() {
                Some(choice) if field.options.contains(&choice) => {}
                _ => {
                    report.add_error(format!(
                        "{} deve ser uma das opções: {}",
                        field.label,
                        field.options.join(", ")
                    ));
                }
            },
            FieldType::Array => match value.as_array() {
                Some(items) => {
                    if let Some(min_items) = field.min_items {
                        if items.len() < min_items {
                            report.add_error(format!(
                                "{} deve ter pelo menos {} itens",
                                field.label, min_items
                            ));
                        }
                    }
                }
                None => {
                    report.add_error(format!("{} deve ser uma lista", field.label));
                }
            },
            _ => {}
        }
    }
}

//! 部分模板注册表
//!
//! 八个固定部分的字段模式定义。进程级只读常量，启动后从不修改。

use modula_core::SectionName;
use serde::Serialize;

/// 没有模板估时的部分使用的默认估时（分钟）
pub const DEFAULT_ESTIMATED_MINUTES: u32 = 5;

/// 字段类型
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Select,
    Array,
    Object,
    Text,
}

/// 单个字段的模式定义
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    pub label: &'static str,
    pub field_type: FieldType,
    pub required: bool,
    /// select类型的合法取值
    pub options: &'static [&'static str],
    /// number类型的下界
    pub min: Option<f64>,
    /// number类型的上界
    pub max: Option<f64>,
    /// array类型的最少元素数
    pub min_items: Option<usize>,
    /// object类型的嵌套字段
    pub fields: &'static [FieldSchema],
}

impl FieldSchema {
    pub const fn new(name: &'static str, label: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            label,
            field_type,
            required: false,
            options: &[],
            min: None,
            max: None,
            min_items: None,
            fields: &[],
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn with_options(mut self, options: &'static [&'static str]) -> Self {
        self.options = options;
        self
    }

    pub const fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub const fn with_min_items(mut self, min_items: usize) -> Self {
        self.min_items = Some(min_items);
        self
    }

    pub const fn with_fields(mut self, fields: &'static [FieldSchema]) -> Self {
        self.fields = fields;
        self
    }
}

/// 一个部分的完整模板
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SectionTemplate {
    pub section: SectionName,
    /// 展示给用户的标题（pt-BR）
    pub title: &'static str,
    /// 填写该部分的预估时间（分钟）
    pub estimated_minutes: u32,
    pub fields: &'static [FieldSchema],
}

const IDENTIFICATION_FIELDS: [FieldSchema; 5] = [
    FieldSchema::new("full_name", "Nome completo", FieldType::String).required(),
    FieldSchema::new("birth_date", "Data de nascimento", FieldType::String).required(),
    FieldSchema::new("gender", "Gênero", FieldType::Select).with_options(&[
        "feminino",
        "masculino",
        "nao_binario",
        "prefiro_nao_informar",
    ]),
    FieldSchema::new("profession", "Profissão", FieldType::String),
    FieldSchema::new("marital_status", "Estado civil", FieldType::Select).with_options(&[
        "solteiro",
        "casado",
        "divorciado",
        "viuvo",
        "uniao_estavel",
    ]),
];

const FAMILY_HISTORY_FIELDS: [FieldSchema; 3] = [
    FieldSchema::new("family_mental_health", "Saúde mental na família", FieldType::Text)
        .required(),
    FieldSchema::new(
        "family_medical_conditions",
        "Condições médicas na família",
        FieldType::Text,
    ),
    FieldSchema::new("family_relationships", "Relações familiares", FieldType::Text),
];

const CURRENT_COMPLAINT_FIELDS: [FieldSchema; 4] = [
    FieldSchema::new("main_complaint", "Queixa principal", FieldType::Text).required(),
    FieldSchema::new("symptom_duration", "Duração dos sintomas", FieldType::String).required(),
    FieldSchema::new(
        "symptom_intensity",
        "Intensidade dos sintomas (0-10)",
        FieldType::Number,
    )
    .required()
    .with_range(0.0, 10.0),
    FieldSchema::new("triggers", "Gatilhos identificados", FieldType::Array),
];

const TREATMENT_GOALS_FIELDS: [FieldSchema; 3] = [
    FieldSchema::new("main_goals", "Objetivos principais", FieldType::Array)
        .required()
        .with_min_items(1),
    FieldSchema::new("expectations", "Expectativas com o tratamento", FieldType::Text),
    FieldSchema::new("previous_treatments", "Tratamentos anteriores", FieldType::Text),
];

const MEDICAL_HISTORY_FIELDS: [FieldSchema; 4] = [
    FieldSchema::new("current_medications", "Medicações em uso", FieldType::Array),
    FieldSchema::new("chronic_conditions", "Condições crônicas", FieldType::Array),
    FieldSchema::new("surgeries", "Cirurgias", FieldType::Text),
    FieldSchema::new("allergies", "Alergias", FieldType::Array),
];

const PSYCHOLOGICAL_HISTORY_FIELDS: [FieldSchema; 4] = [
    FieldSchema::new("previous_therapy", "Já fez terapia?", FieldType::Boolean),
    FieldSchema::new("previous_diagnoses", "Diagnósticos anteriores", FieldType::Array),
    FieldSchema::new("hospitalizations", "Internações", FieldType::Text),
    FieldSchema::new("self_harm_history", "Histórico de autolesão", FieldType::Text),
];

const SUBSTANCE_USE_FIELDS: [FieldSchema; 3] = [
    FieldSchema::new("alcohol", "Álcool", FieldType::Select).with_options(&[
        "nunca",
        "social",
        "frequente",
    ]),
    FieldSchema::new("tobacco", "Tabaco", FieldType::Boolean),
    FieldSchema::new("others", "Outras substâncias", FieldType::Text),
];

const LIFESTYLE_FIELDS: [FieldSchema; 4] = [
    FieldSchema::new("sleep_quality", "Qualidade do sono", FieldType::Select).with_options(&[
        "boa",
        "regular",
        "ruim",
    ]),
    FieldSchema::new("physical_activity", "Atividade física", FieldType::Select).with_options(&[
        "sedentario",
        "leve",
        "moderada",
        "intensa",
    ]),
    FieldSchema::new("substance_use", "Uso de substâncias", FieldType::Object)
        .with_fields(&SUBSTANCE_USE_FIELDS),
    FieldSchema::new("diet", "Alimentação", FieldType::Text),
];

const RELATIONSHIPS_FIELDS: [FieldSchema; 3] = [
    FieldSchema::new("family_dynamics", "Dinâmica familiar", FieldType::Text),
    FieldSchema::new("social_support", "Rede de apoio", FieldType::Select).with_options(&[
        "forte",
        "moderada",
        "fraca",
    ]),
    FieldSchema::new("romantic_relationship", "Relacionamento amoroso", FieldType::Text),
];

static TEMPLATES: [SectionTemplate; 8] = [
    SectionTemplate {
        section: SectionName::Identification,
        title: "Identificação",
        estimated_minutes: 5,
        fields: &IDENTIFICATION_FIELDS,
    },
    SectionTemplate {
        section: SectionName::FamilyHistory,
        title: "Histórico familiar",
        estimated_minutes: 8,
        fields: &FAMILY_HISTORY_FIELDS,
    },
    SectionTemplate {
        section: SectionName::CurrentComplaint,
        title: "Queixa atual",
        estimated_minutes: 10,
        fields: &CURRENT_COMPLAINT_FIELDS,
    },
    SectionTemplate {
        section: SectionName::TreatmentGoals,
        title: "Objetivos do tratamento",
        estimated_minutes: 8,
        fields: &TREATMENT_GOALS_FIELDS,
    },
    SectionTemplate {
        section: SectionName::MedicalHistory,
        title: "Histórico médico",
        estimated_minutes: 10,
        fields: &MEDICAL_HISTORY_FIELDS,
    },
    SectionTemplate {
        section: SectionName::PsychologicalHistory,
        title: "Histórico psicológico",
        estimated_minutes: 12,
        fields: &PSYCHOLOGICAL_HISTORY_FIELDS,
    },
    SectionTemplate {
        section: SectionName::Lifestyle,
        title: "Estilo de vida",
        estimated_minutes: 7,
        fields: &LIFESTYLE_FIELDS,
    },
    SectionTemplate {
        section: SectionName::Relationships,
        title: "Relacionamentos",
        estimated_minutes: 6,
        fields: &RELATIONSHIPS_FIELDS,
    },
];

/// 部分模板注册表
///
/// 只读查询接口：给定部分名返回字段模式，找不到返回None。无副作用。
#[derive(Debug, Default)]
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn new() -> Self {
        Self
    }

    /// 查询部分模板
    pub fn get(&self, section: SectionName) -> Option<&'static SectionTemplate> {
        TEMPLATES.iter().find(|t| t.section == section)
    }

    /// 全部模板，按数据模型顺序
    pub fn all(&self) -> &'static [SectionTemplate] {
        &TEMPLATES
    }
}

//! Controlled vocabularies for entity types and relationship labels.
//!
//! The built-in alias and priority tables carry the multilingual variants
//! observed in real extractions; curated alias side-files extend them at
//! runtime without code changes.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Entity type assigned when nothing better can be determined.
pub const DEFAULT_ENTITY_TYPE: &str = "Concept";

/// Relationship label assigned when nothing better can be determined.
pub const DEFAULT_RELATION: &str = "RelatedTo";

/// Closed vocabulary of entity types, with prompt descriptions.
pub const ENTITY_TYPE_CHOICES: &[(&str, &str)] = &[
    ("Person", "person / author / researcher / speaker"),
    ("Organization", "company / team / community / institution"),
    ("Event", "conference / launch / milestone / incident"),
    ("Paper", "paper / report / publication / reference"),
    ("Technology", "technical approach / capability / stack"),
    ("ResearchDirection", "research direction / theme / topic"),
    ("Concept", "abstract concept / methodology / model"),
    ("Product", "commercial product / suite / platform"),
    ("Tool", "engineering tool / CLI / library"),
    ("Domain", "industry / business domain / field"),
    ("Framework", "framework / SDK / runtime"),
    ("Language", "programming or markup language"),
    ("Dataset", "dataset / corpus / evaluation set"),
    ("Metric", "metric / evaluation standard / scoring scheme"),
    ("Project", "project / initiative / consortium"),
    ("Service", "hosted service / API / platform"),
];

/// Closed vocabulary of relationship labels, with prompt descriptions.
pub const RELATION_CHOICES: &[(&str, &str)] = &[
    ("RelatedTo", "generic semantic association / mutual reference"),
    ("Mentions", "source mentions or cites the target"),
    ("PartOf", "source is a component or section of the target"),
    ("BelongsTo", "source belongs to or is affiliated with the target"),
    ("Uses", "source uses / integrates / depends on the target"),
    ("BasedOn", "source is based on or derived from the target"),
    ("Produces", "source produces or publishes the target"),
    ("CollaboratesWith", "the two entities cooperate or co-maintain"),
    ("CompetesWith", "competition, opposition, or replacement"),
    ("Supports", "source supports or strengthens the target"),
    ("Opposes", "source opposes or hinders the target"),
    ("LocatedIn", "geographic or organizational containment"),
    ("Leads", "source leads, maintains, or is responsible for the target"),
    ("Evaluates", "evaluation, measurement, or review"),
    ("Compares", "comparison, benchmark, or differential analysis"),
];

static TYPE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("person", "Person"),
        ("人", "Person"),
        ("人物", "Person"),
        ("作者", "Person"),
        ("author", "Person"),
        ("organization", "Organization"),
        ("company", "Organization"),
        ("enterprise", "Organization"),
        ("组织", "Organization"),
        ("机构", "Organization"),
        ("公司", "Organization"),
        ("社区", "Organization"),
        ("event", "Event"),
        ("事件", "Event"),
        ("paper", "Paper"),
        ("article", "Paper"),
        ("文献", "Paper"),
        ("论文", "Paper"),
        ("参考文献", "Paper"),
        ("reference paper", "Paper"),
        ("technology", "Technology"),
        ("技术", "Technology"),
        ("researchdirection", "ResearchDirection"),
        ("research direction", "ResearchDirection"),
        ("研究方向", "ResearchDirection"),
        ("concept", "Concept"),
        ("概念", "Concept"),
        ("product", "Product"),
        ("产品", "Product"),
        ("tool", "Tool"),
        ("工具", "Tool"),
        ("domain", "Domain"),
        ("领域", "Domain"),
        ("framework", "Framework"),
        ("框架", "Framework"),
        ("language", "Language"),
        ("语言", "Language"),
        ("dataset", "Dataset"),
        ("数据集", "Dataset"),
        ("metric", "Metric"),
        ("指标", "Metric"),
        ("project", "Project"),
        ("项目", "Project"),
        ("service", "Service"),
        ("服务", "Service"),
    ])
});

/// Priority scores used when two extractions disagree on an entity's type.
/// Higher wins; unknown labels score [`DEFAULT_TYPE_PRIORITY`].
static TYPE_PRIORITY: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    HashMap::from([
        ("person", 100),
        ("人", 100),
        ("人物", 100),
        ("organization", 90),
        ("组织", 90),
        ("机构", 90),
        ("公司", 90),
        ("event", 85),
        ("事件", 85),
        ("paper", 80),
        ("article", 80),
        ("参考文献", 80),
        ("technology", 70),
        ("技术", 70),
        ("researchdirection", 70),
        ("research direction", 70),
        ("研究方向", 70),
        ("concept", 60),
        ("概念", 60),
        ("product", 60),
        ("产品", 60),
        ("tool", 60),
        ("工具", 60),
        ("domain", 60),
        ("领域", 60),
        ("framework", 55),
        ("language", 50),
    ])
});

/// Score assigned to type labels absent from the priority table.
pub const DEFAULT_TYPE_PRIORITY: i32 = 10;

/// Map a raw type label onto its canonical vocabulary member, if the
/// built-in alias table knows it. Unknown labels pass through trimmed;
/// empty input yields `None`.
pub fn normalize_type_label(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match TYPE_ALIASES.get(trimmed.to_lowercase().as_str()) {
        Some(canonical) => Some((*canonical).to_string()),
        None => Some(trimmed.to_string()),
    }
}

/// Priority score for a type label.
pub fn type_priority(label: &str) -> i32 {
    TYPE_PRIORITY
        .get(label.to_lowercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_TYPE_PRIORITY)
}

/// Pick the winning type when two extractions disagree: the candidate
/// replaces the current label only with a strictly higher priority.
pub fn select_type(current: Option<&str>, candidate: Option<&str>) -> String {
    let current = current
        .and_then(normalize_type_label_opt)
        .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string());
    let candidate = candidate
        .and_then(normalize_type_label_opt)
        .unwrap_or_else(|| DEFAULT_ENTITY_TYPE.to_string());
    if type_priority(&candidate) > type_priority(&current) {
        candidate
    } else {
        current
    }
}

fn normalize_type_label_opt(value: &str) -> Option<String> {
    normalize_type_label(value)
}

/// True when `label` is a member of the entity type vocabulary.
pub fn is_entity_type(label: &str) -> bool {
    ENTITY_TYPE_CHOICES.iter().any(|(value, _)| *value == label)
}

/// True when `label` is a member of the relationship vocabulary.
pub fn is_relation(label: &str) -> bool {
    RELATION_CHOICES.iter().any(|(value, _)| *value == label)
}

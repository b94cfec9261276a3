// Typed lecture content as authored in JSON.
// Sections are a tagged union so a code section can never also carry a diagram.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotationRule, CodeBlock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecture {
    /// Falls back to the file stem when the authored JSON omits it
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Lecture {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid lecture JSON")
    }

    /// Every code section as a resolvable block, ids formatted `"{lecture_id}#{section_index}"`
    pub fn code_blocks(&self) -> Vec<(CodeBlock, Vec<AnnotationRule>)> {
        (0..self.sections.len()).filter_map(|index| self.code_block(index)).collect()
    }

    /// The code block of one section, or None if that section is missing or carries no code example
    pub fn code_block(&self, section_index: usize) -> Option<(CodeBlock, Vec<AnnotationRule>)> {
        match &self.sections.get(section_index)?.kind {
            SectionKind::Code(example) => {
                let block = example.to_code_block(format!("{}#{}", self.id, section_index));
                Some((block, example.rules()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSection", into = "RawSection")]
pub struct Section {
    pub title: String,
    /// Prose shown above the section payload
    pub body: Option<String>,
    pub key_points: Vec<String>,
    pub kind: SectionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionKind {
    Text,
    Code(CodeExample),
    Diagram(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExample {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub annotations: Vec<AuthoredAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredAnnotation {
    #[serde(rename = "match")]
    pub pattern: String,
    pub explanation: String,
}

impl CodeExample {
    pub fn to_code_block(&self, id: impl Into<String>) -> CodeBlock {
        CodeBlock::new(id, self.language.clone(), self.code.clone())
    }

    /// Authored annotations in array order; `order` is the array index
    pub fn rules(&self) -> Vec<AnnotationRule> {
        self.annotations
            .iter()
            .enumerate()
            .map(|(order, a)| AnnotationRule::new(order, a.pattern.clone(), a.explanation.clone()))
            .collect()
    }
}

/// Authored, duck-typed section shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSection {
    #[serde(default)]
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code_example: Option<CodeExample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    diagram: Option<String>,
}

impl TryFrom<RawSection> for Section {
    type Error = String;

    fn try_from(raw: RawSection) -> Result<Self, Self::Error> {
        let kind = match (raw.code_example, raw.diagram) {
            (Some(_), Some(_)) => {
                return Err(format!(
                    "section {:?} has both a codeExample and a diagram",
                    raw.title
                ))
            }
            (Some(example), None) => SectionKind::Code(example),
            (None, Some(diagram)) => SectionKind::Diagram(diagram),
            (None, None) => SectionKind::Text,
        };

        Ok(Section {
            title: raw.title,
            body: raw.content,
            key_points: raw.key_points,
            kind,
        })
    }
}

impl From<Section> for RawSection {
    fn from(section: Section) -> Self {
        let mut raw = RawSection {
            title: section.title,
            content: section.body,
            key_points: section.key_points,
            ..Default::default()
        };
        match section.kind {
            SectionKind::Text => {}
            SectionKind::Code(example) => raw.code_example = Some(example),
            SectionKind::Diagram(diagram) => raw.diagram = Some(diagram),
        }
        raw
    }
}

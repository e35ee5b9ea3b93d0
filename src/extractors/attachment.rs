use crate::config::ExtensionRiskConfig;
use crate::extractors::SignalExtractor;
use crate::facts::{names, FactMap};
use crate::message::{Enrichment, RawEmail};
use std::collections::HashSet;

/// Risk class of an attachment, by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionRisk {
    Executable,
    MacroDocument,
    Archive,
    Other,
}

/// Attachment signals: counts per extension-risk class.
pub struct AttachmentExtractor {
    executable: HashSet<String>,
    macro_document: HashSet<String>,
    archive: HashSet<String>,
}

impl AttachmentExtractor {
    pub fn new(config: &ExtensionRiskConfig) -> Self {
        let lower = |list: &[String]| list.iter().map(|e| e.to_lowercase()).collect();
        Self {
            executable: lower(&config.executable),
            macro_document: lower(&config.macro_document),
            archive: lower(&config.archive),
        }
    }

    fn extension(filename: &str) -> Option<String> {
        filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    pub fn classify(&self, filename: &str) -> ExtensionRisk {
        let ext = match Self::extension(filename) {
            Some(ext) => ext,
            None => return ExtensionRisk::Other,
        };
        if self.executable.contains(&ext) {
            ExtensionRisk::Executable
        } else if self.macro_document.contains(&ext) {
            ExtensionRisk::MacroDocument
        } else if self.archive.contains(&ext) {
            ExtensionRisk::Archive
        } else {
            ExtensionRisk::Other
        }
    }
}

impl SignalExtractor for AttachmentExtractor {
    fn name(&self) -> &str {
        "attachment"
    }

    fn extract(&self, email: &RawEmail, _enrichment: &Enrichment, facts: &mut FactMap) {
        let mut executable = 0usize;
        let mut macro_doc = 0usize;
        let mut archive = 0usize;

        for attachment in &email.attachments {
            match self.classify(&attachment.filename) {
                ExtensionRisk::Executable => executable += 1,
                ExtensionRisk::MacroDocument => macro_doc += 1,
                ExtensionRisk::Archive => archive += 1,
                ExtensionRisk::Other => {}
            }
        }

        let count = email.attachments.len();
        facts.insert(names::HAS_ATTACHMENT, count > 0);
        facts.insert(names::ATTACHMENT_COUNT, count);
        facts.insert(names::ATTACHMENT_EXECUTABLE_COUNT, executable);
        facts.insert(names::ATTACHMENT_MACRO_DOC_COUNT, macro_doc);
        facts.insert(names::ATTACHMENT_ARCHIVE_COUNT, archive);
        facts.insert(names::ATTACHMENT_RISKY_EXT_COUNT, executable + macro_doc);
    }
}

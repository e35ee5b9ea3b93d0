use crate::facts::names;
use crate::rules::Operator;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Value type of a rule-addressable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Number,
    Text,
    TextSet,
}

/// Static description of one legal rule field: its type and the operators
/// that make sense for it.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub field_type: FieldType,
    pub operators: &'static [Operator],
}

const BOOL_OPS: &[Operator] = &[Operator::Equals, Operator::NotEquals];

const NUMBER_OPS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::GreaterThan,
    Operator::LessThan,
    Operator::GreaterOrEqual,
    Operator::LessOrEqual,
];

const TEXT_OPS: &[Operator] = &[
    Operator::Equals,
    Operator::NotEquals,
    Operator::Contains,
    Operator::MatchesRegex,
];

const SET_OPS: &[Operator] = &[Operator::Equals, Operator::NotEquals, Operator::Contains];

/// Closed registry of every field a rule condition may reference: all
/// extractor facts plus the pseudo-facts `riskScore` and `severity`.
/// Built once, immutable afterwards.
pub struct FieldRegistry {
    fields: HashMap<&'static str, FieldDescriptor>,
}

lazy_static! {
    static ref REGISTRY: FieldRegistry = FieldRegistry::builtin();
}

impl FieldRegistry {
    pub fn global() -> &'static FieldRegistry {
        &REGISTRY
    }

    pub fn descriptor(&self, field: &str) -> Option<&FieldDescriptor> {
        self.fields.get(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    fn builtin() -> Self {
        let mut fields = HashMap::new();

        register(
            &mut fields,
            FieldType::Bool,
            BOOL_OPS,
            &[
                names::SENDER_DISPLAY_MISMATCH,
                names::REPLY_TO_MISMATCH,
                names::SUSPICIOUS_ROUTING,
                names::REGISTRAR_FLAGGED,
                names::CLOUD_HOSTED,
                names::HAS_ATTACHMENT,
            ],
        );
        register(
            &mut fields,
            FieldType::Number,
            NUMBER_OPS,
            &[
                names::URL_COUNT,
                names::SUSPICIOUS_TLD_COUNT,
                names::SHORTENER_URL_COUNT,
                names::IP_LITERAL_URL_COUNT,
                names::HOMOGRAPH_URL_COUNT,
                names::DOMAIN_AGE_DAYS,
                names::ATTACHMENT_COUNT,
                names::ATTACHMENT_EXECUTABLE_COUNT,
                names::ATTACHMENT_MACRO_DOC_COUNT,
                names::ATTACHMENT_ARCHIVE_COUNT,
                names::ATTACHMENT_RISKY_EXT_COUNT,
                names::URGENCY_KEYWORD_HITS,
                names::CREDENTIAL_KEYWORD_HITS,
                names::RISK_SCORE,
            ],
        );
        register(
            &mut fields,
            FieldType::Text,
            TEXT_OPS,
            &[
                names::SPF_RESULT,
                names::DKIM_RESULT,
                names::DMARC_RESULT,
                names::SUBJECT,
                names::SENDER_DOMAIN,
                names::REPLY_TO_DOMAIN,
                names::SEVERITY,
            ],
        );
        register(
            &mut fields,
            FieldType::TextSet,
            SET_OPS,
            &[names::KEYWORD_MATCHES],
        );

        FieldRegistry { fields }
    }
}

fn register(
    fields: &mut HashMap<&'static str, FieldDescriptor>,
    field_type: FieldType,
    operators: &'static [Operator],
    names: &[&'static str],
) {
    for &name in names {
        fields.insert(
            name,
            FieldDescriptor {
                field_type,
                operators,
            },
        );
    }
}

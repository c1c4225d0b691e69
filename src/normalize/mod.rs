use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::constants::{BILINGUAL_SEPARATOR, MISSING_ID_SEGMENT, SCHEDULE_NOT_APPLICABLE};
use crate::types::{BirthDate, BirthDateQuality, Entity, EntityType, SemaRecord};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_spaces(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").into_owned()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Trait for turning a parsed source record into a canonical entity
pub trait Normalizer {
    /// Identifier the entity is created under
    fn identifier(&self, record: &SemaRecord) -> String;

    /// Fill an entity created for `record` with its normalized fields
    fn populate(&self, entity: &mut Entity, record: &SemaRecord);

    fn normalize(&self, record: &SemaRecord) -> Entity {
        let mut entity = Entity::new(self.identifier(record));
        self.populate(&mut entity, record);
        entity
    }
}

/// Field mapping for the SEMA consolidated list
#[derive(Debug, Default, Clone, Copy)]
pub struct SemaNormalizer;

impl SemaNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// An `Entity` element, even an empty one, marks an organization.
    pub fn entity_type(record: &SemaRecord) -> EntityType {
        if record.entity.is_some() {
            EntityType::Entity
        } else {
            EntityType::Individual
        }
    }

    /// English half of the bilingual country value.
    pub fn country(record: &SemaRecord) -> Option<String> {
        let names = record.country.as_deref()?;
        let english = names.split(BILINGUAL_SEPARATOR).next().unwrap_or_default();
        non_empty(collapse_spaces(english))
    }

    fn parse_individual(entity: &mut Entity, record: &SemaRecord) {
        entity.entity_type = EntityType::Individual;
        entity.first_name = record.given_name.as_deref().map(collapse_spaces).and_then(non_empty);
        entity.last_name = record.last_name.as_deref().map(collapse_spaces).and_then(non_empty);

        // Some individuals are listed with only one name part
        let parts: Vec<&str> = [entity.first_name.as_deref(), entity.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        entity.name = parts.join(" ");

        if let Some(dob) = record.date_of_birth.as_deref().and_then(parse_birth_date) {
            *entity.create_birth_date() = dob;
        }
    }

    fn parse_entity(entity: &mut Entity, record: &SemaRecord) {
        entity.entity_type = EntityType::Entity;

        // Names may carry a French translation after a slash
        let raw = record.entity.as_deref().unwrap_or_default();
        let mut names = raw.split('/');
        entity.name = collapse_spaces(names.next().unwrap_or_default());
        for translation in names.map(collapse_spaces).filter(|n| !n.is_empty()) {
            entity.create_alias(translation);
        }
    }

    fn parse_aliases(entity: &mut Entity, record: &SemaRecord) {
        let Some(names) = record.aliases.as_deref() else {
            return;
        };

        for name in names.split(',').map(collapse_spaces) {
            if name.is_empty() {
                continue;
            }
            for part in name.split('/').map(str::trim).filter(|p| !p.is_empty()) {
                entity.create_alias(part);
            }
        }
    }

    fn parse_schedule(entity: &mut Entity, record: &SemaRecord) {
        let Some(schedule) = record.schedule.as_deref().map(str::trim) else {
            return;
        };
        if schedule.is_empty() || schedule == SCHEDULE_NOT_APPLICABLE {
            return;
        }
        entity.summary = Some(format!("Schedule {}", schedule));
    }
}

/// `DD/MM/YYYY` becomes a strong `YYYY-MM-DD`; anything else is kept verbatim as weak.
pub fn parse_birth_date(raw: &str) -> Option<BirthDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parts: Vec<&str> = raw.splitn(3, '/').map(str::trim).collect();
    let birth_date = match parts.as_slice() {
        [day, month, year] => BirthDate {
            date: Some(format!("{}-{}-{}", year, month, day)),
            quality: BirthDateQuality::Strong,
        },
        _ => BirthDate {
            date: Some(raw.to_string()),
            quality: BirthDateQuality::Weak,
        },
    };
    Some(birth_date)
}

impl Normalizer for SemaNormalizer {
    /// Ids are only unique per country and entry type.
    fn identifier(&self, record: &SemaRecord) -> String {
        let country = Self::country(record);
        let item = record.item.as_deref().map(str::trim);
        format!(
            "{}-{}-{}",
            country.as_deref().unwrap_or(MISSING_ID_SEGMENT),
            Self::entity_type(record).id_tag(),
            item.unwrap_or(MISSING_ID_SEGMENT)
        )
    }

    fn populate(&self, entity: &mut Entity, record: &SemaRecord) {
        if let Some(country) = Self::country(record) {
            entity.create_nationality().country = Some(country);
        }

        match Self::entity_type(record) {
            EntityType::Individual => Self::parse_individual(entity, record),
            EntityType::Entity => Self::parse_entity(entity, record),
        }

        Self::parse_aliases(entity, record);
        Self::parse_schedule(entity, record);

        debug!(
            id = %entity.id,
            aliases = entity.aliases.len(),
            "Normalized record"
        );
    }
}

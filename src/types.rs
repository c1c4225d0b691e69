use serde::{Deserialize, Serialize};

/// One sanctioned party as it appears in the SEMA XML document.
///
/// Every field holds the text of the first element with that tag inside the
/// record: `None` when the element is missing, `Some("")` when it is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaRecord {
    pub item: Option<String>,
    pub entity: Option<String>,
    pub given_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub country: Option<String>,
    pub aliases: Option<String>,
    pub schedule: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    #[default]
    Individual,
    Entity,
}

impl EntityType {
    /// Short tag used inside identifiers
    pub fn id_tag(&self) -> &'static str {
        match self {
            EntityType::Individual => "ind",
            EntityType::Entity => "ent",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BirthDateQuality {
    /// Free text kept as published
    #[default]
    Weak,
    /// Fully parsed into `YYYY-MM-DD`
    Strong,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nationality {
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthDate {
    pub date: Option<String>,
    pub quality: BirthDateQuality,
}

/// Canonical sanctions entity handed to a storage batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<Alias>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<Nationality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<BirthDate>,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn create_alias(&mut self, name: impl Into<String>) -> &mut Alias {
        self.aliases.push(Alias { name: name.into() });
        let last = self.aliases.len() - 1;
        &mut self.aliases[last]
    }

    /// Returns the entity's nationality, creating an empty one if needed.
    pub fn create_nationality(&mut self) -> &mut Nationality {
        self.nationality.get_or_insert_with(Nationality::default)
    }

    /// Returns the entity's birth date, creating an empty one if needed.
    pub fn create_birth_date(&mut self) -> &mut BirthDate {
        self.birth_date.get_or_insert_with(BirthDate::default)
    }

    pub fn alias_names(&self) -> Vec<&str> {
        self.aliases.iter().map(|a| a.name.as_str()).collect()
    }
}

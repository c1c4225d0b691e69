/// Source name under which SEMA batches are published
pub const SEMA_SOURCE_NAME: &str = "dfatd-sema";

/// Published location of the consolidated SEMA list
pub const SEMA_XML_URL: &str =
    "http://www.international.gc.ca/sanctions/assets/office_docs/sema-lmes.xml";

/// Element wrapping one sanctioned party in the XML document
pub const RECORD_TAG: &str = "record";

// Field element names inside a record
pub const ITEM_TAG: &str = "Item";
pub const ENTITY_TAG: &str = "Entity";
pub const GIVEN_NAME_TAG: &str = "GivenName";
pub const LAST_NAME_TAG: &str = "LastName";
pub const DATE_OF_BIRTH_TAG: &str = "DateOfBirth";
pub const COUNTRY_TAG: &str = "Country";
pub const ALIASES_TAG: &str = "Aliases";
pub const SCHEDULE_TAG: &str = "Schedule";

/// Separator between the English and French halves of a country value
pub const BILINGUAL_SEPARATOR: &str = " / ";

/// Schedule value meaning "no schedule"
pub const SCHEDULE_NOT_APPLICABLE: &str = "N/A";

/// Stand-in for an absent country or item id inside an identifier.
/// Kept so identifiers match batches published before the rewrite.
pub const MISSING_ID_SEGMENT: &str = "None";

// Environment overrides
pub const ENV_XML_URL: &str = "SEMA_XML_URL";
pub const ENV_OUTPUT_DIR: &str = "SEMA_OUTPUT_DIR";

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

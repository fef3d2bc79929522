//! Catalogue-aware validation of a product mapping: the choice of format, papers, binding and
//! finish a book is going to be printed with. The vendor catalogue answers in several shapes over
//! time; they are all normalized into one substrate table, and when none of them is usable the
//! validation falls back to a table of weights known to be valid and says so.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};
use crate::validation::{PrintProductSpecification, ValidationResult};

/// The revision of the fallback weights, quoted in the warning raised when they are used.
pub const FALLBACK_TABLE_VERSION: &str = "2024-05";

/// The weight ids confirmed to be valid for each component at the time of the fallback revision.
pub const FALLBACK_WEIGHT_IDS: [(Component, &[&str]); 3] = [
    (Component::Book, &["115", "150", "170", "200"]),
    (Component::Cover, &["250", "300", "350"]),
    (Component::Endpaper, &["120", "140", "170"]),
];

/// The parts of a book which are printed on their own substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Component {
    /// The bound interior.
    Book,
    Cover,
    Endpaper,
}

impl Component {
    pub fn from_key(key: &str) -> Option<Component> {
        match key.to_lowercase().as_str() {
            "book" | "body" | "interior" => Some(Component::Book),
            "cover" => Some(Component::Cover),
            "endpaper" | "endpapers" => Some(Component::Endpaper),
            _ => None,
        }
    }
}

/// A paper stock, chosen by type and weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstrateChoice {
    pub type_id: String,
    pub weight_id: String,
}

/// The color treatment of the two faces of the cover sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverColor {
    pub front: String,
    /// The inner face, left blank when absent or `none`.
    #[serde(default)]
    pub back: Option<String>,
}

impl CoverColor {
    pub fn has_back_color(&self) -> bool {
        self.back
            .as_deref()
            .map(|back| !back.trim().is_empty() && !back.eq_ignore_ascii_case("none"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingChoice {
    pub binding_type: String,
    #[serde(default)]
    pub binding_edge: Option<String>,
}

/// The vendor-side identifiers a book is going to be produced with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMapping {
    pub format_id: String,
    pub book: SubstrateChoice,
    pub cover: SubstrateChoice,
    #[serde(default)]
    pub endpaper: Option<SubstrateChoice>,
    pub cover_color: CoverColor,
    #[serde(default)]
    pub lamination: Option<String>,
    pub binding: BindingChoice,
}

impl ProductMapping {
    fn substrates(&self) -> Vec<(Component, &SubstrateChoice)> {
        let mut substrates = vec![(Component::Book, &self.book), (Component::Cover, &self.cover)];
        substrates.extend(self.endpaper.iter().map(|endpaper| (Component::Endpaper, endpaper)));
        substrates
    }
}

/// Vendor identifiers come both as strings and as numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Text(String),
    Number(u64),
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        match value {
            Identifier::Text(text) => text,
            Identifier::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatSubstrate {
    pub component: String,
    pub type_id: Identifier,
    pub weight_ids: Vec<Identifier>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightEntry {
    pub id: Identifier,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedSubstrate {
    pub component: String,
    pub type_id: Identifier,
    pub weights: Vec<WeightEntry>,
}

/// The shapes the substrate section of the catalogue has been seen in.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawSubstrates {
    /// Component, then type id, then the list of weight ids.
    Nested(BTreeMap<String, BTreeMap<String, Vec<Identifier>>>),
    /// One entry per component and type with the weight ids inline.
    Flat(Vec<FlatSubstrate>),
    /// One entry per component and type with the weights as objects.
    Detailed(Vec<DetailedSubstrate>),
    Unknown(serde_json::Value),
}

/// The catalogue as it comes over the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueResponse {
    #[serde(default)]
    pub formats: Vec<Identifier>,
    #[serde(default)]
    pub binding_types: Vec<Identifier>,
    #[serde(default)]
    pub laminations: Vec<Identifier>,
    #[serde(default)]
    pub substrates: Option<RawSubstrates>,
}

/// For every component, the weight ids available for each substrate type id.
pub type SubstrateTable = BTreeMap<Component, BTreeMap<String, BTreeSet<String>>>;

/// The normalized vendor catalogue. Empty sets mean the catalogue did not say anything about
/// that aspect, which is then left unchecked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorCatalogue {
    pub formats: BTreeSet<String>,
    pub binding_types: BTreeSet<String>,
    pub laminations: BTreeSet<String>,
    pub substrates: SubstrateTable,
}

impl From<CatalogueResponse> for VendorCatalogue {
    fn from(response: CatalogueResponse) -> Self {
        let identifiers =
            |values: Vec<Identifier>| values.into_iter().map(String::from).collect::<BTreeSet<_>>();

        VendorCatalogue {
            formats: identifiers(response.formats),
            binding_types: identifiers(response.binding_types),
            laminations: identifiers(response.laminations),
            substrates: response
                .substrates
                .map(normalize_substrates)
                .unwrap_or_default(),
        }
    }
}

impl VendorCatalogue {
    pub fn from_json(json: &str) -> Result<Self, ContextError> {
        let response: CatalogueResponse = serde_json::from_str(json).map_err(|error| {
            ContextError::with_error("Failed to parse the vendor catalogue", &error)
                .kind(ErrorKind::Catalogue)
        })?;

        Ok(response.into())
    }
}

/// Brings the known shapes of the substrate section into one table. Unknown shapes and entries of
/// unknown components are dropped.
pub fn normalize_substrates(raw: RawSubstrates) -> SubstrateTable {
    let mut table = SubstrateTable::new();
    let mut insert = |component: &str, type_id: String, weight_ids: Vec<String>| {
        let Some(component) = Component::from_key(component) else {
            log::debug!("Ignoring the substrates of the unknown component {:?}", component);
            return;
        };
        table
            .entry(component)
            .or_default()
            .entry(type_id)
            .or_default()
            .extend(weight_ids);
    };

    match raw {
        RawSubstrates::Nested(components) => {
            for (component, types) in components {
                for (type_id, weight_ids) in types {
                    insert(
                        &component,
                        type_id,
                        weight_ids.into_iter().map(String::from).collect(),
                    );
                }
            }
        }
        RawSubstrates::Flat(entries) => {
            for entry in entries {
                insert(
                    &entry.component,
                    entry.type_id.into(),
                    entry.weight_ids.into_iter().map(String::from).collect(),
                );
            }
        }
        RawSubstrates::Detailed(entries) => {
            for entry in entries {
                insert(
                    &entry.component,
                    entry.type_id.into(),
                    entry
                        .weights
                        .into_iter()
                        .map(|weight| weight.id.into())
                        .collect(),
                );
            }
        }
        RawSubstrates::Unknown(value) => {
            log::warn!(
                "The substrates of the vendor catalogue have an unknown shape: {}",
                value
            );
        }
    }

    table
}

/// Anything able to provide the current vendor catalogue.
pub trait CatalogueSource {
    fn fetch_catalogue(&self) -> Result<VendorCatalogue, ContextError>;
}

/// Fetches the catalogue with a single blocking HTTP request, without retrying.
pub struct HttpCatalogueSource {
    agent: ureq::Agent,
    url: String,
}

impl HttpCatalogueSource {
    pub fn new<S: Into<String>>(url: S, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            url: url.into(),
        }
    }
}

impl CatalogueSource for HttpCatalogueSource {
    fn fetch_catalogue(&self) -> Result<VendorCatalogue, ContextError> {
        let response = self.agent.get(&self.url).call().map_err(|error| {
            ContextError::with_error("Failed to reach the vendor catalogue", &error)
                .kind(ErrorKind::Catalogue)
        })?;
        let catalogue: CatalogueResponse = response.into_json().map_err(|error| {
            ContextError::with_error("Failed to parse the vendor catalogue", &error)
                .kind(ErrorKind::Catalogue)
        })?;

        Ok(catalogue.into())
    }
}

/// Checks a product mapping against the vendor catalogue, when there is one. Without a catalogue,
/// or with one that has no usable substrate data, the substrate weights are checked against the
/// fallback table and a warning says that the mapping could not be fully validated.
pub fn validate_product_mapping(
    mapping: &ProductMapping,
    specification: &PrintProductSpecification,
    catalogue: Option<&VendorCatalogue>,
) -> ValidationResult {
    let mut result = ValidationResult::new();

    if let Some(catalogue) = catalogue {
        check_membership(&mut result, "format", &mapping.format_id, &catalogue.formats);
        check_membership(
            &mut result,
            "binding type",
            &mapping.binding.binding_type,
            &catalogue.binding_types,
        );
        if let Some(lamination) = &mapping.lamination {
            check_membership(&mut result, "lamination", lamination, &catalogue.laminations);
        }
    }

    match catalogue.filter(|catalogue| !catalogue.substrates.is_empty()) {
        Some(catalogue) => {
            for (component, substrate) in mapping.substrates() {
                check_substrate(&mut result, component, substrate, &catalogue.substrates);
            }
        }
        None => {
            result.warning(format!(
                "Could not fully validate the product mapping: the vendor catalogue has no usable \
                 substrate data, only the weights of the fallback table {} were checked",
                FALLBACK_TABLE_VERSION
            ));
            for (component, substrate) in mapping.substrates() {
                check_fallback_weight(&mut result, component, substrate);
            }
        }
    }

    if specification.binding_type.is_case_bound() {
        if mapping.endpaper.is_none() {
            result.error("A case binding needs an endpaper substrate");
        }
        if mapping.cover_color.has_back_color() {
            result.error("A case binding cannot print on the inner face of the cover");
        }
    }

    result
}

/// Fetches the catalogue and validates the mapping against it. An unreachable catalogue is not an
/// error: the validation degrades to the fallback table.
pub fn validate_with_catalogue(
    mapping: &ProductMapping,
    specification: &PrintProductSpecification,
    source: &dyn CatalogueSource,
) -> ValidationResult {
    let catalogue = source
        .fetch_catalogue()
        .map_err(|error| log::warn!("{}", error))
        .ok();

    validate_product_mapping(mapping, specification, catalogue.as_ref())
}

fn check_membership(
    result: &mut ValidationResult,
    aspect: &str,
    identifier: &str,
    known: &BTreeSet<String>,
) {
    if !known.is_empty() && !known.contains(identifier) {
        result.error(format!(
            "The {} {:?} is not offered by the vendor",
            aspect, identifier
        ));
    }
}

fn check_substrate(
    result: &mut ValidationResult,
    component: Component,
    substrate: &SubstrateChoice,
    table: &SubstrateTable,
) {
    let Some(weights) = table
        .get(&component)
        .and_then(|types| types.get(&substrate.type_id))
    else {
        result.error(format!(
            "The substrate type {:?} is not offered for the {:?} component",
            substrate.type_id, component
        ));
        return;
    };

    if !weights.contains(&substrate.weight_id) {
        result.error(format!(
            "The weight {:?} is not offered for the substrate type {:?} of the {:?} component",
            substrate.weight_id, substrate.type_id, component
        ));
    }
}

fn check_fallback_weight(
    result: &mut ValidationResult,
    component: Component,
    substrate: &SubstrateChoice,
) {
    let confirmed = FALLBACK_WEIGHT_IDS
        .iter()
        .find(|(known, _)| *known == component)
        .map(|(_, weight_ids)| weight_ids.contains(&substrate.weight_id.as_str()))
        .unwrap_or(false);
    if !confirmed {
        result.error(format!(
            "The weight {:?} is not a confirmed weight for the {:?} component",
            substrate.weight_id, component
        ));
    }
}

//! Fixed registry of gallery collections
//!
//! Each collection is one page on the gallery site. The sentinel [`ALL`]
//! stands for every concrete collection.

use crate::config::ConfigStore;
use crate::error::{Result, WallError};

/// Sentinel name selecting every collection
pub const ALL: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    TalesFromTheLoop,
    ThingsFromTheFlood,
    ElectricState,
    Labyrinth,
    Paleo,
    Steel,
}

impl Collection {
    /// Every concrete collection, in display order
    pub const EVERY: &'static [Collection] = &[
        Collection::TalesFromTheLoop,
        Collection::ThingsFromTheFlood,
        Collection::ElectricState,
        Collection::Labyrinth,
        Collection::Paleo,
        Collection::Steel,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::TalesFromTheLoop => "tftl",
            Collection::ThingsFromTheFlood => "flood",
            Collection::ElectricState => "es",
            Collection::Labyrinth => "labyrinth",
            Collection::Paleo => "paleo",
            Collection::Steel => "steel",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Collection::TalesFromTheLoop => "Tales from the Loop",
            Collection::ThingsFromTheFlood => "Things from the Flood",
            Collection::ElectricState => "The Electric State",
            Collection::Labyrinth => "The Labyrinth",
            Collection::Paleo => "Paleo",
            Collection::Steel => "Steel",
        }
    }

    /// Gallery page, relative to the site base URL
    pub fn page(&self) -> &'static str {
        match self {
            Collection::TalesFromTheLoop => "tftl.html",
            Collection::ThingsFromTheFlood => "flood.html",
            Collection::ElectricState => "es.html",
            Collection::Labyrinth => "labyrinth.html",
            Collection::Paleo => "paleo.html",
            Collection::Steel => "steel.html",
        }
    }

    /// `base_url` must end with a slash (see `Settings::base_url`)
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.page())
    }

    /// Case-insensitive lookup of a concrete collection
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::EVERY
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

/// A validated choice of collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Some(Vec<Collection>),
}

impl Scope {
    pub fn collections(&self) -> Vec<Collection> {
        match self {
            Scope::All => Collection::EVERY.to_vec(),
            Scope::Some(list) => list.clone(),
        }
    }

    /// Names as persisted in the config
    pub fn names(&self) -> Vec<String> {
        match self {
            Scope::All => vec![ALL.to_string()],
            Scope::Some(list) => list.iter().map(|c| c.name().to_string()).collect(),
        }
    }
}

/// Every valid name, `ALL` first
pub fn all_names() -> Vec<&'static str> {
    std::iter::once(ALL)
        .chain(Collection::EVERY.iter().map(|c| c.name()))
        .collect()
}

fn is_all(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(ALL)
}

/// Validate user-chosen names. Unknown names are returned in the error.
pub fn parse_scope(names: &[String]) -> std::result::Result<Scope, Vec<String>> {
    let mut chosen = Vec::new();
    let mut invalid = Vec::new();
    let mut all = false;

    for name in names {
        if is_all(name) {
            all = true;
        } else if let Some(c) = Collection::from_name(name) {
            if !chosen.contains(&c) {
                chosen.push(c);
            }
        } else {
            invalid.push(name.clone());
        }
    }

    if !invalid.is_empty() {
        return Err(invalid);
    }

    if all || chosen.is_empty() {
        Ok(Scope::All)
    } else {
        chosen.sort();
        Ok(Scope::Some(chosen))
    }
}

/// Split persisted names into the normalized valid set and the rejects
pub fn partition_names(names: &[String]) -> (Vec<String>, Vec<String>) {
    let (known, unknown): (Vec<String>, Vec<String>) = names
        .iter()
        .cloned()
        .partition(|n| is_all(n) || Collection::from_name(n).is_some());

    let scope = parse_scope(&known).unwrap_or(Scope::All);
    (scope.names(), unknown)
}

fn invalid_collection(invalid: Vec<String>, active: Vec<String>) -> WallError {
    WallError::InvalidCollection {
        invalid,
        valid: all_names().into_iter().map(String::from).collect(),
        active,
    }
}

/// Page URLs for the given names; `ALL` expands to every collection
pub fn resolve(names: &[String], base_url: &str) -> Result<Vec<String>> {
    let scope = parse_scope(names).map_err(|invalid| invalid_collection(invalid, Vec::new()))?;
    Ok(scope
        .collections()
        .iter()
        .map(|c| c.url(base_url))
        .collect())
}

/// Validate and persist the active collections. On failure the config is
/// left untouched and the error carries the current setting.
pub fn set_active(store: &ConfigStore, names: &[String]) -> Result<Scope> {
    let mut config = store.load_or_init()?;

    let scope = match parse_scope(names) {
        Ok(scope) => scope,
        Err(invalid) => return Err(invalid_collection(invalid, config.collections)),
    };

    config.collections = scope.names();
    store.save(&config)?;
    tracing::info!("Active collections: {}", config.collections.join(", "));
    Ok(scope)
}

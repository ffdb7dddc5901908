//! Option types searched by the wizard

use super::{SearchEngine, SearchOption};
use crate::api::{Department, Location, OnboardApi, OptionId};
use crate::config::SearchConfig;

impl SearchOption for Department {
    fn option_id(&self) -> &OptionId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl SearchOption for Location {
    fn option_id(&self) -> &OptionId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.city
    }
}

/// Department picker: `GET /departments?name_like=`
pub fn department_search(api: &OnboardApi, config: &SearchConfig) -> SearchEngine<Department> {
    SearchEngine::builder(api.clone(), api.departments_url(), "name")
        .config(config)
        .build()
}

/// Location picker: `GET /locations?city_like=`
pub fn location_search(api: &OnboardApi, config: &SearchConfig) -> SearchEngine<Location> {
    SearchEngine::builder(api.clone(), api.locations_url(), "city")
        .config(config)
        .build()
}

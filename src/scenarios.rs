use crate::logger::Logger;
use std::error::Error;

/// Function type for scenario entry functions. The first argument is the
/// scenario's short name, used for log file paths and error messages.
pub type ScenarioFn = fn(short_name: &'static str, logger: &mut Logger) -> Result<(), Box<dyn Error>>;

/// Entry in the scenario catalog
#[derive(Clone)]
pub struct ScenarioEntry {
    pub short_name: &'static str,
    pub description: &'static str,
    pub run: ScenarioFn,
}

// Create an inventory collection for scenario entries
inventory::collect!(ScenarioEntry);

/// Get all registered scenarios from the catalog
pub fn get_scenario_catalog() -> Vec<ScenarioEntry> {
    inventory::iter::<ScenarioEntry>
        .into_iter()
        .cloned()
        .collect()
}

// Scenario files register themselves with inventory::submit!:
//
// inventory::submit!(scenarios::ScenarioEntry {
//     short_name: "name",
//     description: "desc",
//     run,
// });

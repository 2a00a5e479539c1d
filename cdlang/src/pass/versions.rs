//! Keeps the newest version of each scenario that the target accepts.

use std::collections::BTreeMap;
use tracing::debug;

use crate::dom::{Dom, Scenario, Version};

/// Move the chosen version of every pending scenario into the resolved maps.
/// Names with no version at or below `target` are dropped.
pub fn run(dom: &mut Dom, target: Version) {
    resolve(&mut dom.pending_scenario_versions, &mut dom.scenarios, target);
    resolve(
        &mut dom.pending_sub_scenario_versions,
        &mut dom.sub_scenarios,
        target,
    );
}

fn resolve(
    pending: &mut BTreeMap<String, BTreeMap<String, Scenario>>,
    resolved: &mut BTreeMap<String, Scenario>,
    target: Version,
) {
    for (name, versions) in std::mem::take(pending) {
        let selected = versions
            .into_values()
            .filter(|scenario| scenario.version <= target)
            .max_by_key(|scenario| scenario.version);

        match selected {
            Some(scenario) => {
                debug!(scenario = %name, version = %scenario.version, "selected version");
                resolved.insert(name, scenario);
            }
            None => debug!(scenario = %name, %target, "no compatible version"),
        }
    }
}

use cucumber::World;

use itas_e2e::{Page, ScenarioWorld};

/// Cucumber world wrapping the harness world of the running scenario
///
/// The inner world is attached by the before hook; steps never run
/// without it.
#[derive(Debug, Default, World)]
pub struct UiWorld {
    scenario: Option<ScenarioWorld>,
}

impl UiWorld {
    pub fn attach(&mut self, scenario: ScenarioWorld) {
        self.scenario = Some(scenario);
    }

    pub fn scenario_mut(&mut self) -> Option<&mut ScenarioWorld> {
        self.scenario.as_mut()
    }

    pub fn scenario(&mut self) -> &mut ScenarioWorld {
        self.scenario
            .as_mut()
            .expect("scenario world is attached by the before hook")
    }

    pub fn page(&mut self) -> Page {
        self.scenario()
            .require_page()
            .expect("page is opened by the before hook")
            .clone()
    }
}

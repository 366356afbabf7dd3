use cucumber::{given, when};

use itas_e2e::playwright::LoadState;

use crate::world::UiWorld;

const SEARCH_BOX: &str = "[name=\"q\"]";

#[given("user is on google page")]
async fn on_search_page(world: &mut UiWorld) {
    let url = world
        .scenario()
        .config()
        .base_url
        .clone()
        .expect("base URL is not configured");
    world.page().goto(&url).await.expect("failed to open the search page");
}

#[when(expr = "user enter {string} into search box")]
async fn enter_search_text(world: &mut UiWorld, text: String) {
    world
        .page()
        .locator(SEARCH_BOX)
        .fill(&text)
        .await
        .expect("failed to fill the search box");
}

#[when("user enter the enter botton")]
async fn submit_search(world: &mut UiWorld) {
    let page = world.page();
    page.locator(SEARCH_BOX)
        .press("Enter")
        .await
        .expect("failed to submit the search");
    page.wait_for_load_state(LoadState::NetworkIdle)
        .await
        .expect("results did not finish loading");
}

use cucumber::{given, then, when};

use itas_common::Credentials;
use itas_e2e::LoginPage;

use crate::world::UiWorld;

fn login_page(world: &mut UiWorld) -> LoginPage {
    let page = world.page();
    LoginPage::new(page, world.scenario().config().base_url.clone())
}

#[given("I am on the login page")]
async fn on_login_page(world: &mut UiWorld) {
    login_page(world)
        .goto("/")
        .await
        .expect("failed to open the login page");
}

#[when(expr = "I login as {string}")]
async fn login_as(world: &mut UiWorld, username: String) {
    let password = world
        .scenario()
        .config()
        .default_credentials
        .password
        .clone();
    world
        .scenario()
        .set_current_user(Credentials::new(username.clone(), password.clone()));

    login_page(world)
        .login(&username, &password)
        .await
        .expect("failed to submit the login form");
}

#[when("I login with that user")]
async fn login_with_that_user(world: &mut UiWorld) {
    let user = world
        .scenario()
        .current_user()
        .cloned()
        .expect("no user was prepared by an earlier step");

    login_page(world)
        .login(&user.username, &user.password)
        .await
        .expect("failed to submit the login form");
}

#[then("I should see the dashboard")]
async fn see_dashboard(world: &mut UiWorld) {
    login_page(world)
        .assert_dashboard_visible()
        .await
        .expect("dashboard is not visible");
}

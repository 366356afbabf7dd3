use cucumber::{given, then};
use serde_json::Value;

use itas_common::{Credentials, FakeData, Params};

use crate::world::UiWorld;

#[given("I have a random user in the database")]
async fn random_user_in_database(world: &mut UiWorld) {
    let mut fake = FakeData::new();
    let email = fake.email();
    let password = fake.password(12);

    world
        .scenario()
        .query_cache()
        .await
        .insert(
            "INSERT INTO Users (Email, Password) VALUES (@email, @password)",
            &Params::new()
                .with("email", email.as_str())
                .with("password", password.as_str()),
        )
        .await
        .expect("failed to insert the user");

    world
        .scenario()
        .set_current_user(Credentials::new(email, password));
}

#[then("that user should exist in the database")]
async fn user_exists(world: &mut UiWorld) {
    let email = world
        .scenario()
        .current_user()
        .map(|u| u.username.clone())
        .expect("no user was prepared by an earlier step");

    let cache = world.scenario().query_cache().await;
    cache
        .execute_and_store(
            "stored_user",
            "SELECT Email FROM Users WHERE Email = @email",
            Params::new().with("email", email.as_str()),
        )
        .await
        .expect("failed to look the user up");

    assert_eq!(
        cache.result_value("stored_user", "Email", 0),
        Some(&Value::String(email))
    );
}

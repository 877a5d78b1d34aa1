//! The reqres.in contract, one scenario per test.
//!
//! By default every scenario answers from its recording in `playback_data/`.
//! `API_CONTRACT_MODE=live` runs the same scenarios against the real API.

use crate::{
    models::{ApiError, Credentials, RegisteredUser, UpdateUser, UpdatedUser, UserData, UsersPage},
    ReqresApi,
};
use api_contract::{
    check, check_eq, contract_test, Error, HarnessConfiguration, Scenario,
};

const USERS_TOTAL: u32 = 12;
const USERS_PER_PAGE: u32 = 6;

fn configure(configuration: &mut HarnessConfiguration) {
    if configuration.playback_dir().is_none() {
        configuration.set_playback_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/playback_data"));
    }
}

#[contract_test("register_successful", configure)]
fn register_successful(scenario: &Scenario) -> Result<(), Error> {
    let api = ReqresApi::new(scenario);

    let registered: RegisteredUser = scenario.step("Register eve.holt@reqres.in", || {
        let response = api.register(&Credentials::new("eve.holt@reqres.in", "pistol"))?;
        scenario.expect(
            &response,
            &scenario.response_spec().with_schema("UserRegistrationSchema"),
        )?;
        response.deserialize()
    })?;

    scenario.step("Check the issued id and token", || {
        check_eq!(registered.id, 4);
        check!(!registered.token.is_empty(), "the token is empty");
        Ok(())
    })
}

#[contract_test("register_without_email", configure)]
fn register_without_email(scenario: &Scenario) -> Result<(), Error> {
    let api = ReqresApi::new(scenario);

    scenario.step("Register without an email", || {
        let response = api.register(&Credentials::without_email("pistol"))?;
        scenario.expect(
            &response,
            &scenario
                .response_spec()
                .with_status(400)
                .with_schema("RegistrationErrorSchema"),
        )?;
        check_eq!(response.body, r#"{"error":"Missing email or username"}"#);
        Ok(response.body)
    })?;

    Ok(())
}

#[contract_test("register_undefined_user", configure)]
fn register_undefined_user(scenario: &Scenario) -> Result<(), Error> {
    let api = ReqresApi::new(scenario);

    let rejection: ApiError = scenario.step("Register a user unknown to the API", || {
        let response = api.register(&Credentials::new("jane.roe@example.com", "correct-horse"))?;
        scenario.expect(
            &response,
            &scenario
                .response_spec()
                .with_status(400)
                .with_schema("RegistrationErrorSchema"),
        )?;
        response.deserialize()
    })?;

    check_eq!(
        rejection.error,
        "Note: Only defined users succeed registration"
    );
    Ok(())
}

#[contract_test("list_users_page_two", configure)]
fn list_users_page_two(scenario: &Scenario) -> Result<(), Error> {
    let api = ReqresApi::new(scenario);

    let page: UsersPage = scenario.step("Fetch the second page of users", || {
        let response = api.list_users(Some(2))?;
        scenario.expect(
            &response,
            &scenario.response_spec().with_schema("ListUsersSchema"),
        )?;
        response.deserialize()
    })?;

    scenario.step("Check the page size", || {
        check_eq!(page.page, 2);
        check_eq!(page.per_page, USERS_PER_PAGE);
        check_eq!(page.data.len(), USERS_PER_PAGE as usize);
        Ok(())
    })
}

#[contract_test("users_count_in_list", configure)]
fn users_count_in_list(scenario: &Scenario) -> Result<(), Error> {
    let api = ReqresApi::new(scenario);

    let page: UsersPage = scenario.step("Fetch the user list", || {
        let response = api.list_users(None)?;
        let body = scenario.expect(
            &response,
            &scenario.response_spec().with_schema("ListUsersSchema"),
        )?;
        check_eq!(body["total"], USERS_TOTAL);
        check_eq!(body["per_page"], USERS_PER_PAGE);
        response.deserialize()
    })?;

    scenario.step("Check the number of users on the page", || {
        check_eq!(page.data.len(), USERS_PER_PAGE as usize);
        Ok(())
    })
}

#[contract_test("register_and_get_user", configure)]
fn register_and_get_user(scenario: &Scenario) -> Result<(), Error> {
    let api = ReqresApi::new(scenario);

    let (registered, user) = scenario.step("Register and fetch Emma Wong", || {
        let registered: RegisteredUser = scenario.step("Register emma.wong@reqres.in", || {
            let response = api.register(&Credentials::new("emma.wong@reqres.in", "pistol"))?;
            scenario.expect(
                &response,
                &scenario.response_spec().with_schema("UserRegistrationSchema"),
            )?;
            response.deserialize()
        })?;

        let user: UserData = scenario.step("Fetch the registered user", || {
            let response = api.get_user(registered.id)?;
            scenario.expect(
                &response,
                &scenario.response_spec().with_schema("GetUserSchema"),
            )?;
            response.deserialize()
        })?;

        Ok((registered, user))
    })?;

    scenario.step("Check the fetched user", || {
        check_eq!(user.data.id, registered.id);
        check_eq!(user.data.email, "emma.wong@reqres.in");
        check_eq!(user.data.first_name, "Emma");
        check_eq!(user.data.last_name, "Wong");
        Ok(())
    })
}

#[contract_test("user_in_list", configure)]
fn user_in_list(scenario: &Scenario) -> Result<(), Error> {
    let api = ReqresApi::new(scenario);

    let user: UserData = scenario.step("Fetch user 2", || {
        let response = api.get_user(2)?;
        scenario.expect(
            &response,
            &scenario.response_spec().with_schema("GetUserSchema"),
        )?;
        response.deserialize()
    })?;

    scenario.step("Find user 2 in the user list", || {
        let response = api.list_users(None)?;
        scenario.expect(
            &response,
            &scenario.response_spec().with_schema("ListUsersSchema"),
        )?;
        let page: UsersPage = response.deserialize()?;

        let listed = page.find(user.data.id).ok_or_else(|| {
            Error::AssertionFailed(format!("user {} is not in the list", user.data.id))
        })?;
        check!(listed.email.ends_with("@reqres.in"));
        check_eq!(listed.email, user.data.email);
        check_eq!(listed.first_name, user.data.first_name);
        check_eq!(listed.last_name, user.data.last_name);
        Ok(())
    })
}

#[contract_test("update_user", configure)]
fn update_user(scenario: &Scenario) -> Result<(), Error> {
    let api = ReqresApi::new(scenario);
    let update = UpdateUser {
        name: "morpheus".into(),
        job: "zion resident".into(),
    };

    let updated: UpdatedUser = scenario.step("Update user 2", || {
        let response = api.update_user(2, &update)?;
        scenario.expect(
            &response,
            &scenario
                .response_spec()
                .with_status(201)
                .with_schema("UpdateUserSchema"),
        )?;
        response.deserialize()
    })?;

    scenario.step("Check the echoed profile", || {
        check_eq!(updated.name, update.name);
        check_eq!(updated.job, update.job);
        check!(!updated.updated_at.is_empty());
        Ok(())
    })
}
